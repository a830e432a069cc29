//! Shared test doubles for the integration tests.
//!
//! [`SimulatedAdc`] is a behavioural model of an ADS131M04 sitting on a
//! [`WordBus`]: it decodes the command in each frame, applies it when
//! chip-select goes high, and plays the response back in word 0 of the next
//! frame, exactly like the real device. [`ScriptedBus`] just plays back canned
//! frames and records what was sent.

#![allow(dead_code)]

use ads131m04::{crc16_ccitt, BusSettings, WordBus, FRAME_WORDS};

pub const FRAME_BYTES: usize = FRAME_WORDS * 3;

pub const STATUS_DEFAULT: u16 = 0x0500;

/// Register contents after a reset.
pub const REGISTER_DEFAULTS: [(usize, u16); 6] = [
    (0x00, 0x2400), // ID
    (0x01, STATUS_DEFAULT),
    (0x02, 0x0510), // MODE
    (0x03, 0x0F0E), // CLOCK
    (0x04, 0x0000), // GAIN1
    (0x06, 0x0600), // CFG
];

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SimError {
    /// Injected fault
    Fault,
    /// A byte was clocked without chip-select asserted
    NotSelected,
}

/// A behavioural model of the ADS131M04 frame interface.
pub struct SimulatedAdc {
    pub registers: [u16; 64],
    pub channels: [u32; 4],
    /// Word 0 of the next frame
    pub pending_response: u32,
    pub selected: bool,
    pub selects: usize,
    pub deselects: usize,
    pub frames: usize,
    pub bytes_clocked: usize,
    pub last_settings: Option<BusSettings>,
    /// Fail the n'th byte transfer from now (0 = the next one)
    pub fail_after: Option<usize>,
    /// XOR this into the next response word
    pub corrupt_next_response: u32,
    /// XOR this into the next CRC word
    pub corrupt_next_crc: u32,
    /// Commands received, in order
    pub commands: Vec<u16>,
    tx: [u8; FRAME_BYTES],
    rx: [u8; FRAME_BYTES],
    position: usize,
}

impl SimulatedAdc {
    pub fn new() -> SimulatedAdc {
        let mut sim = SimulatedAdc {
            registers: [0; 64],
            channels: [0; 4],
            pending_response: u32::from(STATUS_DEFAULT) << 8,
            selected: false,
            selects: 0,
            deselects: 0,
            frames: 0,
            bytes_clocked: 0,
            last_settings: None,
            fail_after: None,
            corrupt_next_response: 0,
            corrupt_next_crc: 0,
            commands: Vec::new(),
            tx: [0; FRAME_BYTES],
            rx: [0; FRAME_BYTES],
            position: 0,
        };
        sim.load_defaults();
        sim
    }

    pub fn with_channels(channels: [u32; 4]) -> SimulatedAdc {
        let mut sim = SimulatedAdc::new();
        sim.channels = channels;
        sim
    }

    fn load_defaults(&mut self) {
        self.registers = [0; 64];
        for (address, value) in REGISTER_DEFAULTS {
            self.registers[address] = value;
        }
    }

    fn build_outgoing(&mut self) {
        let mut words = [0u32; FRAME_WORDS];
        words[0] = (self.pending_response ^ self.corrupt_next_response) & 0xFF_FFFF;
        self.corrupt_next_response = 0;
        words[1..5].copy_from_slice(&self.channels);
        for (chunk, word) in self.tx.chunks_exact_mut(3).zip(words.iter()) {
            chunk.copy_from_slice(&word.to_be_bytes()[1..]);
        }
        let crc = u32::from(crc16_ccitt(&self.tx[..15])) << 8;
        let crc = crc ^ self.corrupt_next_crc;
        self.corrupt_next_crc = 0;
        self.tx[15..].copy_from_slice(&crc.to_be_bytes()[1..]);
    }

    fn incoming_word(&self, index: usize) -> u32 {
        let b = &self.rx[index * 3..index * 3 + 3];
        (u32::from(b[0]) << 16) | (u32::from(b[1]) << 8) | u32::from(b[2])
    }

    fn apply_frame(&mut self) {
        let command = (self.incoming_word(0) >> 8) as u16;
        let data = (self.incoming_word(1) >> 8) as u16;
        self.commands.push(command);
        let address = usize::from((command >> 7) & 0x3F);
        let response: u16 = match command {
            0x0000 => self.registers[0x01],
            0x0011 => {
                self.load_defaults();
                0xFF24
            }
            0x0022 | 0x0033 | 0x0555 | 0x0655 => command,
            c if (c >> 13) == 0b101 => self.registers[address],
            c if (c >> 13) == 0b011 => {
                self.registers[address] = data;
                0x4000 | ((address as u16) << 7)
            }
            // Unknown commands get no meaningful response
            _ => 0x0000,
        };
        self.pending_response = u32::from(response) << 8;
        self.frames += 1;
    }
}

impl WordBus for SimulatedAdc {
    type Error = SimError;

    fn configure(&mut self, settings: &BusSettings) -> Result<(), SimError> {
        self.last_settings = Some(*settings);
        Ok(())
    }

    fn select(&mut self) -> Result<(), SimError> {
        self.selects += 1;
        if !self.selected {
            self.selected = true;
            self.position = 0;
            self.build_outgoing();
        }
        Ok(())
    }

    fn deselect(&mut self) -> Result<(), SimError> {
        self.deselects += 1;
        if self.selected && self.position == FRAME_BYTES {
            self.apply_frame();
        }
        self.selected = false;
        self.position = 0;
        Ok(())
    }

    fn transfer_byte(&mut self, out: u8) -> Result<u8, SimError> {
        if let Some(n) = self.fail_after {
            if n == 0 {
                self.fail_after = None;
                return Err(SimError::Fault);
            }
            self.fail_after = Some(n - 1);
        }
        if !self.selected {
            return Err(SimError::NotSelected);
        }
        self.bytes_clocked += 1;
        let index = self.position % FRAME_BYTES;
        self.rx[index] = out;
        let reply = self.tx[index];
        self.position += 1;
        Ok(reply)
    }
}

/// Plays back canned frames, one per chip-select, and records everything
/// sent.
pub struct ScriptedBus {
    pub replies: Vec<[u32; FRAME_WORDS]>,
    pub sent: Vec<u8>,
    pub frames_started: usize,
    byte_in_frame: usize,
}

impl ScriptedBus {
    pub fn new(replies: Vec<[u32; FRAME_WORDS]>) -> ScriptedBus {
        ScriptedBus {
            replies,
            sent: Vec::new(),
            frames_started: 0,
            byte_in_frame: 0,
        }
    }

    /// The words sent in frame `n`.
    pub fn sent_frame(&self, n: usize) -> [u32; FRAME_WORDS] {
        let mut words = [0u32; FRAME_WORDS];
        for (i, word) in words.iter_mut().enumerate() {
            let b = &self.sent[n * FRAME_BYTES + i * 3..n * FRAME_BYTES + i * 3 + 3];
            *word = (u32::from(b[0]) << 16) | (u32::from(b[1]) << 8) | u32::from(b[2]);
        }
        words
    }
}

impl WordBus for ScriptedBus {
    type Error = SimError;

    fn configure(&mut self, _settings: &BusSettings) -> Result<(), SimError> {
        Ok(())
    }

    fn select(&mut self) -> Result<(), SimError> {
        self.frames_started += 1;
        self.byte_in_frame = 0;
        Ok(())
    }

    fn deselect(&mut self) -> Result<(), SimError> {
        Ok(())
    }

    fn transfer_byte(&mut self, out: u8) -> Result<u8, SimError> {
        self.sent.push(out);
        let frame = self
            .replies
            .get(self.frames_started - 1)
            .copied()
            .unwrap_or([0; FRAME_WORDS]);
        let word = frame[self.byte_in_frame / 3];
        let byte = word.to_be_bytes()[1 + self.byte_in_frame % 3];
        self.byte_in_frame += 1;
        Ok(byte)
    }
}
