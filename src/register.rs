//! Commands, registers and the bit-fields packed inside them.

use crate::frame::{u16_from_word, word_from_u16, Word};

//
// Public Types
//

/// The registers in the ADS131M04 register map.
///
/// The driver also accepts raw `u8` addresses, for anything not listed here.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[allow(missing_docs)]
pub enum Register {
    Id = 0x00,
    Status = 0x01,
    Mode = 0x02,
    Clock = 0x03,
    Gain1 = 0x04,
    Cfg = 0x06,
    ThresholdMsb = 0x07,
    ThresholdLsb = 0x08,
    Ch0Cfg = 0x09,
    Ch0OffsetCalMsb = 0x0A,
    Ch0OffsetCalLsb = 0x0B,
    Ch0GainCalMsb = 0x0C,
    Ch0GainCalLsb = 0x0D,
    Ch1Cfg = 0x0E,
    Ch1OffsetCalMsb = 0x0F,
    Ch1OffsetCalLsb = 0x10,
    Ch1GainCalMsb = 0x11,
    Ch1GainCalLsb = 0x12,
    Ch2Cfg = 0x13,
    Ch2OffsetCalMsb = 0x14,
    Ch2OffsetCalLsb = 0x15,
    Ch2GainCalMsb = 0x16,
    Ch2GainCalLsb = 0x17,
    Ch3Cfg = 0x18,
    Ch3OffsetCalMsb = 0x19,
    Ch3OffsetCalLsb = 0x1A,
    Ch3GainCalMsb = 0x1B,
    Ch3GainCalLsb = 0x1C,
    RegisterMapCrc = 0x3E,
}

/// A command, as sent in word 0 of a frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Do nothing. The response is the STATUS register.
    Null,
    /// Reset the device
    Reset,
    /// Enter low-power standby
    Standby,
    /// Leave standby
    Wakeup,
    /// Ignore everything except NULL, RREG and UNLOCK
    Lock,
    /// Leave the locked state
    Unlock,
    /// Read one register. The response is the register contents.
    ReadRegister(u8),
    /// Write one register. The data goes in word 1 of the same frame.
    WriteRegister(u8),
}

/// The raw word 0 of the frame *after* a command: the device's response to it.
///
/// Responses compare as whole 24-bit words, so a corrupted pad byte makes an
/// acknowledgement mismatch.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Response(pub Word);

/// The log2 PGA gain of each channel, as held in the GAIN1 register.
///
/// Each field is a power of two: 0 is 1x, 7 is 128x.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GainConfig {
    /// log2 gain for each of channels 0 to 3
    pub log2_gain: [u8; 4],
}

/// Global-chop settings, held in the CFG register.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChopConfig {
    /// Is global-chop mode on?
    pub enabled: bool,
    /// The delay after each chop, as log2 of the number of modulator clock
    /// periods (1 to 16).
    pub log2_delay: u8,
}

/// The STATUS word, which comes back in response to every NULL command.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Status(pub u16);

/// How wide the data words are, from the STATUS WLENGTH field.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WordLength {
    /// 16-bit words
    B16,
    /// 24-bit words (the reset default, and the only width this driver uses)
    B24,
    /// 32-bit words, zero padded
    B32Zero,
    /// 32-bit words, sign extended
    B32SignExtend,
}

//
// Public Data
//

/// The largest address that fits in a command's address field.
pub const MAX_ADDRESS: u8 = 0x3F;

/// The response to a RESET command from a 4-channel part.
pub const RESET_ACK: u16 = 0xFF24;

/// The most gain the PGA offers, as log2 (128x).
pub const MAX_LOG2_GAIN: u8 = 7;

//
// Private Data
//

const OPCODE_NULL: u16 = 0x0000;
const OPCODE_RESET: u16 = 0x0011;
const OPCODE_STANDBY: u16 = 0x0022;
const OPCODE_WAKEUP: u16 = 0x0033;
const OPCODE_LOCK: u16 = 0x0555;
const OPCODE_UNLOCK: u16 = 0x0655;

const PREFIX_SHIFT: u16 = 12;
const PREFIX_READ: u16 = 0x0A;
const PREFIX_WRITE: u16 = 0x06;
const PREFIX_WRITE_ACK: u16 = 0x04;

const ADDRESS_SHIFT: u16 = 7;
const ADDRESS_MASK: u16 = MAX_ADDRESS as u16;

const GAIN_FIELD_BITS: u16 = 4;
const GAIN_FIELD_MASK: u16 = 0x0F;

const CHOP_ENABLE_BIT: u16 = 1 << 8;
const CHOP_DELAY_SHIFT: u16 = 12;
const CHOP_DELAY_MASK: u16 = 0x0F << CHOP_DELAY_SHIFT;
/// Every CFG bit that [`ChopConfig`] owns. The rest must be preserved.
const CHOP_FIELD_MASK: u16 = CHOP_DELAY_MASK | CHOP_ENABLE_BIT;

const STATUS_LOCK: u16 = 1 << 15;
const STATUS_F_RESYNC: u16 = 1 << 14;
const STATUS_REG_MAP: u16 = 1 << 13;
const STATUS_CRC_ERR: u16 = 1 << 12;
const STATUS_CRC_TYPE: u16 = 1 << 11;
const STATUS_RESET: u16 = 1 << 10;
const STATUS_WLENGTH_SHIFT: u16 = 8;
const STATUS_DRDY_MASK: u16 = 0x0F;

//
// impls on Public Types
//

impl From<Register> for u8 {
    fn from(reg: Register) -> u8 {
        reg as u8
    }
}

impl Command {
    /// The 16-bit opcode for this command.
    ///
    /// Register addresses are masked to the six-bit address field; the driver
    /// rejects larger addresses before building a command.
    pub fn opcode(self) -> u16 {
        match self {
            Command::Null => OPCODE_NULL,
            Command::Reset => OPCODE_RESET,
            Command::Standby => OPCODE_STANDBY,
            Command::Wakeup => OPCODE_WAKEUP,
            Command::Lock => OPCODE_LOCK,
            Command::Unlock => OPCODE_UNLOCK,
            Command::ReadRegister(address) => register_opcode(PREFIX_READ, address),
            Command::WriteRegister(address) => register_opcode(PREFIX_WRITE, address),
        }
    }

    /// The opcode as a 24-bit word, ready to send.
    pub fn word(self) -> Word {
        word_from_u16(self.opcode())
    }

    /// The response this command should produce in the next frame, if it
    /// produces a fixed one.
    ///
    /// Reads and NULL return data, so there's nothing to check.
    pub fn expected_response(self) -> Option<Response> {
        match self {
            Command::Null | Command::ReadRegister(_) => None,
            Command::Reset => Some(Response::from_u16(RESET_ACK)),
            Command::Standby | Command::Wakeup | Command::Lock | Command::Unlock => {
                Some(Response::from_u16(self.opcode()))
            }
            Command::WriteRegister(address) => Some(Response::from_u16(register_opcode(
                PREFIX_WRITE_ACK,
                address,
            ))),
        }
    }
}

impl Response {
    /// The response a device sends for the 16-bit value `value`.
    pub const fn from_u16(value: u16) -> Response {
        Response(word_from_u16(value))
    }

    /// The 16-bit value in the top of the response word. For a register read
    /// this is the register contents.
    pub fn value(self) -> u16 {
        u16_from_word(self.0)
    }
}

impl GainConfig {
    /// Build a gain configuration from the four log2 gains.
    pub const fn new(g0: u8, g1: u8, g2: u8, g3: u8) -> GainConfig {
        GainConfig {
            log2_gain: [g0, g1, g2, g3],
        }
    }

    /// Pack into a GAIN1 register value.
    ///
    /// The low byte holds channels 1 (high nibble) and 0 (low nibble), the
    /// high byte holds channels 3 and 2.
    ///
    /// ```rust
    /// let gain = ads131m04::GainConfig::new(1, 2, 3, 0);
    /// assert_eq!(gain.to_register(), 0x0321);
    /// ```
    pub fn to_register(&self) -> u16 {
        self.log2_gain
            .iter()
            .enumerate()
            .fold(0, |acc, (channel, &gain)| {
                acc | ((gain as u16 & GAIN_FIELD_MASK) << (channel as u16 * GAIN_FIELD_BITS))
            })
    }

    /// Unpack a GAIN1 register value.
    pub fn from_register(value: u16) -> GainConfig {
        let mut log2_gain = [0u8; 4];
        for (channel, gain) in log2_gain.iter_mut().enumerate() {
            *gain = ((value >> (channel as u16 * GAIN_FIELD_BITS)) & GAIN_FIELD_MASK) as u8;
        }
        GainConfig { log2_gain }
    }

    /// The first gain that's too big for the PGA, if any.
    pub fn first_invalid(&self) -> Option<u8> {
        self.log2_gain.iter().copied().find(|&g| g > MAX_LOG2_GAIN)
    }
}

impl ChopConfig {
    /// Is `log2_delay` one the device can encode?
    pub fn delay_valid(log2_delay: u8) -> bool {
        (1..=16).contains(&log2_delay)
    }

    /// Merge these settings into an existing CFG register value, leaving every
    /// bit outside the chop fields alone.
    ///
    /// ```rust
    /// let chop = ads131m04::ChopConfig { enabled: true, log2_delay: 4 };
    /// assert_eq!(chop.apply(0x00A5), 0x31A5);
    /// ```
    pub fn apply(&self, cfg: u16) -> u16 {
        let delay_field = (self.log2_delay.wrapping_sub(1) as u16) << CHOP_DELAY_SHIFT;
        let enable = if self.enabled { CHOP_ENABLE_BIT } else { 0 };
        (cfg & !CHOP_FIELD_MASK) | ((delay_field | enable) & CHOP_FIELD_MASK)
    }

    /// Pull the chop settings out of a CFG register value.
    pub fn from_register(cfg: u16) -> ChopConfig {
        ChopConfig {
            enabled: cfg & CHOP_ENABLE_BIT != 0,
            log2_delay: ((cfg & CHOP_DELAY_MASK) >> CHOP_DELAY_SHIFT) as u8 + 1,
        }
    }
}

impl Default for ChopConfig {
    /// Chop off, with a delay of 2^4 modulator clocks.
    fn default() -> ChopConfig {
        ChopConfig {
            enabled: false,
            log2_delay: 4,
        }
    }
}

impl Status {
    /// Is the register map locked?
    pub fn locked(&self) -> bool {
        self.0 & STATUS_LOCK != 0
    }

    /// Have the ADC channels lost sync?
    pub fn resync_fault(&self) -> bool {
        self.0 & STATUS_F_RESYNC != 0
    }

    /// Has the register map CRC changed?
    pub fn register_map_changed(&self) -> bool {
        self.0 & STATUS_REG_MAP != 0
    }

    /// Did the device see a bad CRC on its input?
    pub fn input_crc_error(&self) -> bool {
        self.0 & STATUS_CRC_ERR != 0
    }

    /// Is the device using the ANSI CRC rather than CCITT?
    pub fn ansi_crc(&self) -> bool {
        self.0 & STATUS_CRC_TYPE != 0
    }

    /// Has the device reset since this flag was last cleared?
    pub fn reset_occurred(&self) -> bool {
        self.0 & STATUS_RESET != 0
    }

    /// The configured data word length.
    pub fn word_length(&self) -> WordLength {
        match (self.0 >> STATUS_WLENGTH_SHIFT) & 0b11 {
            0b00 => WordLength::B16,
            0b01 => WordLength::B24,
            0b10 => WordLength::B32Zero,
            _ => WordLength::B32SignExtend,
        }
    }

    /// Does channel `index` have fresh data waiting?
    pub fn data_ready(&self, index: usize) -> bool {
        index < 4 && (self.0 & STATUS_DRDY_MASK) & (1 << index) != 0
    }
}

//
// Private Functions
//

fn register_opcode(prefix: u16, address: u8) -> u16 {
    (prefix << PREFIX_SHIFT) | ((address as u16 & ADDRESS_MASK) << ADDRESS_SHIFT)
}

//
// Tests
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_opcodes() {
        assert_eq!(Command::ReadRegister(0x05).opcode(), 0xA280);
        assert_eq!(Command::WriteRegister(0x05).opcode(), 0x6280);
        assert_eq!(Command::ReadRegister(0x3E).opcode(), 0xBF00);
        assert_eq!(Command::Null.word(), 0x000000);
        assert_eq!(Command::WriteRegister(0x04).word(), 0x620000);
    }

    #[test]
    fn write_ack_echoes_address() {
        let expected = Command::WriteRegister(0x05).expected_response();
        assert_eq!(expected, Some(Response(0x428000)));
        assert_eq!(Command::ReadRegister(0x05).expected_response(), None);
        assert_eq!(
            Command::Reset.expected_response(),
            Some(Response::from_u16(RESET_ACK))
        );
        assert_eq!(Command::Standby.expected_response(), Some(Response(0x002200)));
        // A flipped pad bit is not the same response
        assert_ne!(expected, Some(Response(0x428001)));
        assert_eq!(Response(0x428001).value(), 0x4280);
    }

    #[test]
    fn gain_packing() {
        assert_eq!(GainConfig::new(1, 2, 3, 0).to_register(), 0x0321);
        assert_eq!(GainConfig::new(7, 0, 0, 7).to_register(), 0x7007);
        assert_eq!(GainConfig::from_register(0x0321), GainConfig::new(1, 2, 3, 0));
        assert_eq!(GainConfig::new(0, 8, 0, 0).first_invalid(), Some(8));
        assert_eq!(GainConfig::default().first_invalid(), None);
    }

    #[test]
    fn chop_only_touches_its_fields() {
        let chop = ChopConfig {
            enabled: true,
            log2_delay: 16,
        };
        assert_eq!(chop.apply(0x0EFF), 0xFFFF);
        assert_eq!(chop.apply(0xFFFF) & !CHOP_FIELD_MASK, 0xFFFF & !CHOP_FIELD_MASK);
        let off = ChopConfig {
            enabled: false,
            log2_delay: 1,
        };
        assert_eq!(off.apply(0xFFFF), 0x0EFF);
        assert_eq!(ChopConfig::from_register(chop.apply(0)), chop);
        assert!(!ChopConfig::delay_valid(0));
        assert!(!ChopConfig::delay_valid(17));
    }

    #[test]
    fn status_fields() {
        let status = Status(0x0500 | 0b1010);
        assert!(status.reset_occurred());
        assert!(!status.locked());
        assert_eq!(status.word_length(), WordLength::B24);
        assert!(status.data_ready(1));
        assert!(!status.data_ready(0));
        assert!(!status.data_ready(7));
    }
}

//
// End of file
//
