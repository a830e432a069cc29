//! Communication frames.
//!
//! Every exchange with the ADS131M04 is a frame of exactly six 24-bit words.
//! On the way in (MOSI) the frame carries a command, possibly a data word, and
//! then null fillers. On the way out (MISO) it carries:
//!
//! | Word | Contents                                  |
//! |------|-------------------------------------------|
//! | 0    | Response to the command in the *previous* frame |
//! | 1..4 | Conversion result for channels 0 to 3     |
//! | 5    | CRC over words 0 to 4                     |
//!
//! Nothing in this module interprets the words - that's up to the caller,
//! because the response word and the channel words are decoded differently.

use crate::bus::{BusSettings, Selected, WordBus};

//
// Public Types
//

/// A 24-bit quantity, held in the low 24 bits of a `u32`.
pub type Word = u32;

/// The six raw words received during one frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame {
    words: [Word; FRAME_WORDS],
}

//
// Public Data
//

/// The number of words in every frame.
pub const FRAME_WORDS: usize = 6;

/// The number of ADC channels carried in every frame.
pub const NUM_CHANNELS: usize = 4;

/// Only the low 24 bits of a [`Word`] go on the wire.
pub const WORD_MASK: Word = 0x00FF_FFFF;

//
// Private Data
//

/// The CRC word sits after the response word and the four channels.
const CRC_WORD: usize = FRAME_WORDS - 1;

const CRC_POLY: u16 = 0x1021;

const CRC_INIT: u16 = 0xFFFF;

//
// Public Functions
//

/// Decode a 24-bit two's-complement conversion result.
///
/// The word is shifted into the top 24 bits of a 32-bit container, so the
/// sign bit lands in bit 31, and then arithmetically shifted back down by 8.
///
/// ```rust
/// assert_eq!(ads131m04::decode_sample(0x000000), 0);
/// assert_eq!(ads131m04::decode_sample(0x7FFFFF), 8_388_607);
/// assert_eq!(ads131m04::decode_sample(0x800000), -8_388_608);
/// assert_eq!(ads131m04::decode_sample(0xFFFFFF), -1);
/// ```
pub fn decode_sample(word: Word) -> i32 {
    ((word << 8) as i32) >> 8
}

/// Place a 16-bit command or register value in the top of a 24-bit word.
///
/// The ADS131M04 works with 24-bit words by default, and 16-bit quantities are
/// MSB-aligned with a zero pad byte.
pub const fn word_from_u16(value: u16) -> Word {
    (value as Word) << 8
}

/// Recover a 16-bit quantity from the top of a 24-bit word.
pub const fn u16_from_word(word: Word) -> u16 {
    ((word & WORD_MASK) >> 8) as u16
}

/// CRC-16-CCITT (polynomial 0x1021, initial value 0xFFFF), as used by the
/// ADS131M04 on its output frames.
pub fn crc16_ccitt(bytes: &[u8]) -> u16 {
    let mut crc = CRC_INIT;
    for &b in bytes {
        crc ^= (b as u16) << 8;
        for _ in 0..8 {
            if (crc & 0x8000) != 0 {
                crc = (crc << 1) ^ CRC_POLY;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

//
// impls on Public Types
//

impl Frame {
    /// Wrap six raw words. Anything above bit 23 is discarded.
    pub fn new(words: [Word; FRAME_WORDS]) -> Frame {
        Frame {
            words: words.map(|w| w & WORD_MASK),
        }
    }

    /// All six raw words, exactly as received.
    pub fn words(&self) -> &[Word; FRAME_WORDS] {
        &self.words
    }

    /// Word 0 - the device's response to the command sent in the previous
    /// frame.
    pub fn response(&self) -> Word {
        self.words[0]
    }

    /// The raw word for channel `index`, or `None` if there's no such channel.
    pub fn channel_word(&self, index: usize) -> Option<Word> {
        if index < NUM_CHANNELS {
            Some(self.words[index + 1])
        } else {
            None
        }
    }

    /// The decoded sample for channel `index`, or `None` if there's no such
    /// channel.
    pub fn sample(&self, index: usize) -> Option<i32> {
        self.channel_word(index).map(decode_sample)
    }

    /// The CRC the device sent, from the top 16 bits of word 5.
    pub fn received_crc(&self) -> u16 {
        u16_from_word(self.words[CRC_WORD])
    }

    /// The CRC calculated over the 15 bytes of words 0 to 4.
    pub fn calculated_crc(&self) -> u16 {
        let mut bytes = [0u8; CRC_WORD * 3];
        for (chunk, word) in bytes.chunks_exact_mut(3).zip(self.words.iter()) {
            chunk.copy_from_slice(&word.to_be_bytes()[1..]);
        }
        crc16_ccitt(&bytes)
    }

    /// Does the CRC word match the rest of the frame?
    pub fn crc_ok(&self) -> bool {
        self.received_crc() == self.calculated_crc()
    }
}

//
// Crate Functions
//

/// Perform one frame exchange, sending `outgoing` and returning what came
/// back.
///
/// Chip-select is held for the whole frame and released on every exit path.
pub(crate) fn exchange<B: WordBus>(
    bus: &mut B,
    settings: &BusSettings,
    outgoing: &[Word; FRAME_WORDS],
) -> Result<Frame, B::Error> {
    let mut selected = Selected::acquire(bus, settings)?;
    let mut incoming = [0; FRAME_WORDS];
    for (rx, tx) in incoming.iter_mut().zip(outgoing.iter()) {
        *rx = selected.transfer_word(*tx)?;
    }
    selected.release()?;
    Ok(Frame { words: incoming })
}

//
// Tests
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_extension() {
        assert_eq!(decode_sample(0x000001), 1);
        assert_eq!(decode_sample(0x7FFFFF), 8_388_607);
        assert_eq!(decode_sample(0x800000), -8_388_608);
        assert_eq!(decode_sample(0xFFFFFE), -2);
        // Junk above bit 23 must not leak into the result
        assert_eq!(decode_sample(0xAB00_0010), 16);
    }

    #[test]
    fn container_view_of_decode() {
        // 0x7FFFFF00 / 0x80000000 are the 32-bit containers for these words
        assert_eq!((0x7FFF_FF00u32 as i32) >> 8, decode_sample(0x7FFFFF));
        assert_eq!((0x8000_0000u32 as i32) >> 8, decode_sample(0x800000));
        assert!(decode_sample(0x800000) < 0);
    }

    #[test]
    fn sixteen_bit_alignment() {
        assert_eq!(word_from_u16(0xA300), 0xA3_0000);
        assert_eq!(u16_from_word(0x428000), 0x4280);
        assert_eq!(u16_from_word(word_from_u16(0xFFFF)), 0xFFFF);
    }

    #[test]
    fn crc_reference_value() {
        // CRC-16/CCITT-FALSE check value
        assert_eq!(crc16_ccitt(b"123456789"), 0x29B1);
        assert_eq!(crc16_ccitt(&[]), 0xFFFF);
    }

    #[test]
    fn frame_accessors() {
        let frame = Frame::new([0x0500_0000 | 0x050000, 1, 2, 0xFFFFFF, 4, 0]);
        assert_eq!(frame.response(), 0x050000);
        assert_eq!(frame.sample(0), Some(1));
        assert_eq!(frame.sample(2), Some(-1));
        assert_eq!(frame.sample(4), None);
        assert_eq!(frame.words().len(), FRAME_WORDS);
    }

    #[test]
    fn crc_detects_corruption() {
        let mut words = [0x050000, 0x123456, 0xFEDCBA, 0x000001, 0x7FFFFF, 0];
        let good = Frame::new(words).calculated_crc();
        words[5] = word_from_u16(good);
        assert!(Frame::new(words).crc_ok());
        words[2] ^= 0x000100;
        assert!(!Frame::new(words).crc_ok());
    }
}

//
// End of file
//
