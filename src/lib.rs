//! # ADS131M04 Driver
//!
//! This is a driver for the Texas Instruments ADS131M04 four-channel,
//! simultaneously-sampling, 24-bit delta-sigma ADC.
//!
//! Specifically, this driver handles the SPI communication frames: sending
//! commands, reading and writing registers, and decoding conversion results.
//! It does not generate the CLKIN signal the ADS131M04 needs - you must supply
//! that yourself, at the frequency you tell the driver about.
//!
//! Every exchange with the ADS131M04 is a six-word *frame*, and the response
//! to any command only arrives in the *next* frame. The driver models this
//! with [`Ads131m04::send_command`], which returns a [`Pending`] command that
//! must be turned into a [`Response`] with [`Pending::fetch_response`]. While
//! the [`Pending`] exists, nothing else can use the bus.
//!
//! # Example
//!
//! You might setup the ADC like this:
//!
//! ```rust
//! # use ads131m04::WordBus;
//! # struct Bus;
//! # impl WordBus for Bus {
//! #     type Error = ();
//! #     fn configure(&mut self, _settings: &ads131m04::BusSettings) -> Result<(), ()> { Ok(()) }
//! #     fn select(&mut self) -> Result<(), ()> { Ok(()) }
//! #     fn deselect(&mut self) -> Result<(), ()> { Ok(()) }
//! #     fn transfer_byte(&mut self, _out: u8) -> Result<u8, ()> { Ok(0) }
//! # }
//! # let bus = Bus;
//! let mut adc = ads131m04::Ads131m04::new(bus);
//! adc.set_clk_adc(8_192_000).unwrap();
//! adc.begin().unwrap();
//! if !adc.set_gain(1, 0, 0, 0).unwrap() {
//!     // ADC didn't acknowledge the write
//! }
//! adc.global_chop(true, 4).unwrap();
//! let [ch0, ch2] = adc.read_channels([0, 2]).unwrap();
//! # let _ = (ch0, ch2);
//! ```
//!
//! # Features
//!
//! * `defmt-log` - log frames and handshakes with `defmt`.

#![no_std]
#![deny(unsafe_code)]
#![deny(missing_docs)]

mod bus;
mod error;
mod frame;
mod register;

pub use bus::{BitOrder, BusSettings, SpiBus, WordBus};
pub use error::{BusError, Error};
pub use frame::{
    crc16_ccitt, decode_sample, u16_from_word, word_from_u16, Frame, Word, FRAME_WORDS,
    NUM_CHANNELS, WORD_MASK,
};
pub use register::{
    ChopConfig, Command, GainConfig, Register, Response, Status, WordLength, MAX_ADDRESS,
    MAX_LOG2_GAIN, RESET_ACK,
};

use core::fmt;

use embedded_hal::spi::{Mode, MODE_0};

//
// Public Types
//

/// Settings that must be chosen before [`Ads131m04::begin`].
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Config {
    /// SPI clock (SCLK) frequency, in Hz
    pub sclk_hz: u32,
    /// The CLKIN frequency you are feeding the ADC, in Hz
    pub clkin_hz: u32,
    /// SPI mode for every frame
    pub spi_mode: Mode,
    /// Check the CRC word on every frame, and fail with [`Error::Crc`] if it
    /// doesn't match. Off by default.
    pub verify_crc: bool,
}

/// Where we are in the command/response pipeline.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pipeline {
    /// The last frame carried a NULL command, so the next response word is
    /// just the STATUS register.
    Idle,
    /// The last frame carried this command, and the next frame will carry
    /// its response in word 0.
    CommandSent(Command),
}

/// Represents our ADS131M04 chip, and the bus it sits on.
pub struct Ads131m04<B> {
    bus: B,
    config: Config,
    pipeline: Pipeline,
    started: bool,
}

/// A command that has been sent, whose response hasn't been fetched yet.
///
/// This holds the driver mutably borrowed, so the only thing you can do with
/// the bus is fetch the response - which is always in the very next frame.
/// If you drop this without fetching, the response turns up as word 0 of
/// whatever frame goes out next and is ignored.
#[must_use = "the response only arrives with the next frame"]
pub struct Pending<'a, B: WordBus> {
    adc: &'a mut Ads131m04<B>,
    command: Command,
    frame: Frame,
}

//
// Public Data
//

/// Default SCLK frequency: 25 MHz.
pub const DEFAULT_SCLK_HZ: u32 = 25_000_000;

/// Default CLKIN frequency: 8.192 MHz, for 4 kSPS at the default OSR.
pub const DEFAULT_CLKIN_HZ: u32 = 8_192_000;

//
// impls on Public Types
//

impl Default for Config {
    fn default() -> Config {
        Config {
            sclk_hz: DEFAULT_SCLK_HZ,
            clkin_hz: DEFAULT_CLKIN_HZ,
            spi_mode: MODE_0,
            verify_crc: false,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("sclk_hz", &self.sclk_hz)
            .field("clkin_hz", &self.clkin_hz)
            .field("polarity", &bus::PolarityDebug(self.spi_mode.polarity))
            .field("phase", &bus::PhaseDebug(self.spi_mode.phase))
            .field("verify_crc", &self.verify_crc)
            .finish()
    }
}

impl<B> Ads131m04<B>
where
    B: WordBus,
{
    /// Create a new ADS131M04 driver with the default [`Config`].
    ///
    /// Nothing happens on the bus until you call a method.
    pub fn new(bus: B) -> Ads131m04<B> {
        Ads131m04::with_config(bus, Config::default())
    }

    /// Create a new ADS131M04 driver with the given [`Config`].
    pub fn with_config(bus: B, config: Config) -> Ads131m04<B> {
        Ads131m04 {
            bus,
            config,
            pipeline: Pipeline::Idle,
            started: false,
        }
    }

    /// Give back the bus.
    pub fn release(self) -> B {
        self.bus
    }

    /// The current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Where we are in the command/response pipeline.
    pub fn pipeline(&self) -> Pipeline {
        self.pipeline
    }

    /// The bus settings used for every frame.
    pub fn bus_settings(&self) -> BusSettings {
        BusSettings::new(self.config.sclk_hz, self.config.spi_mode)
    }

    /// Set the SPI clock frequency. Only allowed before [`Ads131m04::begin`].
    pub fn set_clk_spi(&mut self, clk_hz: u32) -> Result<(), Error<B::Error>> {
        if self.started {
            return Err(Error::AlreadyStarted);
        }
        self.config.sclk_hz = clk_hz;
        Ok(())
    }

    /// Record the CLKIN frequency you are supplying to the ADC. Only allowed
    /// before [`Ads131m04::begin`].
    pub fn set_clk_adc(&mut self, clk_hz: u32) -> Result<(), Error<B::Error>> {
        if self.started {
            return Err(Error::AlreadyStarted);
        }
        self.config.clkin_hz = clk_hz;
        Ok(())
    }

    /// Turn CRC checking of received frames on or off.
    pub fn set_verify_crc(&mut self, verify_crc: bool) {
        self.config.verify_crc = verify_crc;
    }

    /// Park chip-select in its idle (high) state and freeze the clock
    /// settings.
    ///
    /// CLKIN must already be running at [`Config::clkin_hz`].
    pub fn begin(&mut self) -> Result<(), Error<B::Error>> {
        self.bus.deselect().map_err(Error::Bus)?;
        self.started = true;
        #[cfg(feature = "defmt")]
        defmt::debug!(
            "ADS131M04 started: SCLK {=u32} Hz, CLKIN {=u32} Hz",
            self.config.sclk_hz,
            self.config.clkin_hz
        );
        Ok(())
    }

    /// Perform one complete frame exchange, with `command` in word 0 and null
    /// fillers after it.
    ///
    /// Word 0 of the returned [`Frame`] is the response to whatever command
    /// went out in the *previous* frame, not to `command`. Use
    /// [`Ads131m04::send_command`] if you want that response.
    ///
    /// Register commands must have an address that fits the address field,
    /// and [`Command::WriteRegister`] is refused because it needs a value -
    /// use [`Ads131m04::send_write`] for that.
    pub fn exchange_frame(&mut self, command: Command) -> Result<Frame, Error<B::Error>> {
        check_command(command)?;
        self.transact(command, 0)
    }

    /// Send a command. The response arrives with the next frame, which you
    /// get by calling [`Pending::fetch_response`].
    ///
    /// The same checks as [`Ads131m04::exchange_frame`] apply, so a register
    /// write goes through [`Ads131m04::send_write`] instead.
    pub fn send_command(&mut self, command: Command) -> Result<Pending<'_, B>, Error<B::Error>> {
        check_command(command)?;
        self.send(command, 0)
    }

    /// Send a register write, with `value` in word 1 of the same frame. The
    /// acknowledgement arrives with the next frame.
    pub fn send_write(
        &mut self,
        address: u8,
        value: u16,
    ) -> Result<Pending<'_, B>, Error<B::Error>> {
        check_address(address)?;
        self.send(Command::WriteRegister(address), word_from_u16(value))
    }

    /// Read the latest conversion result from each of the given channels.
    ///
    /// All four channels arrive in every frame, so this takes exactly one
    /// frame however many channels you ask for. Results come back in the
    /// order requested, and asking for a channel twice gives you the same
    /// value twice.
    ///
    /// ```rust
    /// # use ads131m04::WordBus;
    /// # struct Bus;
    /// # impl WordBus for Bus {
    /// #     type Error = ();
    /// #     fn configure(&mut self, _settings: &ads131m04::BusSettings) -> Result<(), ()> { Ok(()) }
    /// #     fn select(&mut self) -> Result<(), ()> { Ok(()) }
    /// #     fn deselect(&mut self) -> Result<(), ()> { Ok(()) }
    /// #     fn transfer_byte(&mut self, _out: u8) -> Result<u8, ()> { Ok(0xFF) }
    /// # }
    /// # let mut adc = ads131m04::Ads131m04::new(Bus);
    /// let [a, b, c] = adc.read_channels([3, 1, 3]).unwrap();
    /// assert_eq!([a, b, c], [-1, -1, -1]);
    /// ```
    pub fn read_channels<const N: usize>(
        &mut self,
        channels: [u8; N],
    ) -> Result<[i32; N], Error<B::Error>> {
        let mut samples = [0; N];
        self.read_channels_into(&channels, &mut samples)?;
        Ok(samples)
    }

    /// Like [`Ads131m04::read_channels`], but for a list of channels only
    /// known at run-time. `samples` must be the same length as `channels`.
    pub fn read_channels_into(
        &mut self,
        channels: &[u8],
        samples: &mut [i32],
    ) -> Result<(), Error<B::Error>> {
        if channels.len() != samples.len() {
            return Err(Error::LengthMismatch);
        }
        if let Some(&bad) = channels.iter().find(|&&c| c as usize >= NUM_CHANNELS) {
            return Err(Error::InvalidChannel(bad));
        }
        #[cfg(feature = "defmt")]
        {
            if let Pipeline::CommandSent(stale) = self.pipeline {
                defmt::trace!("Discarding response to {} while sampling", stale);
            }
        }
        let frame = self.transact(Command::Null, 0)?;
        for (sample, &channel) in samples.iter_mut().zip(channels.iter()) {
            *sample = frame
                .sample(channel as usize)
                .ok_or(Error::InvalidChannel(channel))?;
        }
        Ok(())
    }

    /// Read the latest conversion result from one channel (0 to 3).
    pub fn read_channel_single(&mut self, channel: u8) -> Result<i32, Error<B::Error>> {
        let [sample] = self.read_channels([channel])?;
        Ok(sample)
    }

    /// Read the latest conversion result from all four channels.
    pub fn read_all(&mut self) -> Result<[i32; NUM_CHANNELS], Error<B::Error>> {
        self.read_channels([0, 1, 2, 3])
    }

    /// Read a register, by address.
    ///
    /// This takes two frames: one to send the read command, and one to
    /// collect the contents.
    ///
    /// Note that a register that doesn't exist usually reads back as zero,
    /// and there's no way to tell that apart from a real zero unless CRC
    /// checking is on and something on the bus went wrong.
    pub fn read_reg(&mut self, address: u8) -> Result<u16, Error<B::Error>> {
        check_address(address)?;
        let response = self
            .send_command(Command::ReadRegister(address))?
            .fetch_response()?;
        #[cfg(feature = "defmt")]
        defmt::debug!(
            "Read ADS131M04 0x{:02x} as 0x{:04x}",
            address,
            response.value()
        );
        Ok(response.value())
    }

    /// Write a register, by address.
    ///
    /// The value travels in the same frame as the write command, and the
    /// acknowledgement comes back in the next one. Returns `Ok(true)` if the
    /// ADS131M04 acknowledged the write for this exact address, `Ok(false)`
    /// if the acknowledgement was wrong or missing.
    pub fn write_reg(&mut self, address: u8, value: u16) -> Result<bool, Error<B::Error>> {
        let command = Command::WriteRegister(address);
        #[cfg(feature = "defmt")]
        defmt::debug!("Setting ADS131M04 0x{:02x} to 0x{:04x}", address, value);
        let response = self.send_write(address, value)?.fetch_response()?;
        let acked = command.expected_response() == Some(response);
        #[cfg(feature = "defmt")]
        {
            if !acked {
                defmt::warn!(
                    "ADS131M04 write to 0x{:02x} not acknowledged: got 0x{:06x}",
                    address,
                    response.0
                );
            }
        }
        Ok(acked)
    }

    /// Read a named register.
    pub fn read_register(&mut self, register: Register) -> Result<u16, Error<B::Error>> {
        self.read_reg(register.into())
    }

    /// Write a named register. See [`Ads131m04::write_reg`].
    pub fn write_register(
        &mut self,
        register: Register,
        value: u16,
    ) -> Result<bool, Error<B::Error>> {
        self.write_reg(register.into(), value)
    }

    /// Set the PGA gain of all four channels, as powers of two (0 is 1x, 7
    /// is 128x). Values 8 to 15 fit the 4-bit fields but return
    /// [`Error::InvalidGain`].
    ///
    /// Returns `Ok(true)` if the ADS131M04 acknowledged the write.
    pub fn set_gain(
        &mut self,
        log2_gain0: u8,
        log2_gain1: u8,
        log2_gain2: u8,
        log2_gain3: u8,
    ) -> Result<bool, Error<B::Error>> {
        self.set_gain_config(GainConfig::new(
            log2_gain0, log2_gain1, log2_gain2, log2_gain3,
        ))
    }

    /// Set the PGA gain of all four channels from a [`GainConfig`].
    pub fn set_gain_config(&mut self, gain: GainConfig) -> Result<bool, Error<B::Error>> {
        if let Some(bad) = gain.first_invalid() {
            return Err(Error::InvalidGain(bad));
        }
        self.write_register(Register::Gain1, gain.to_register())
    }

    /// Read back the PGA gain of all four channels.
    pub fn gain(&mut self) -> Result<GainConfig, Error<B::Error>> {
        self.read_register(Register::Gain1)
            .map(GainConfig::from_register)
    }

    /// Turn global-chop mode on or off, with a delay of `2^log2_delay`
    /// modulator clock periods after each chop (`log2_delay` is 1 to 16).
    ///
    /// This reads the CFG register and writes it back with only the chop
    /// fields changed, so the current-detect settings survive. It is not
    /// atomic.
    pub fn global_chop(&mut self, enabled: bool, log2_delay: u8) -> Result<bool, Error<B::Error>> {
        if !ChopConfig::delay_valid(log2_delay) {
            return Err(Error::InvalidChopDelay(log2_delay));
        }
        let chop = ChopConfig {
            enabled,
            log2_delay,
        };
        let current = self.read_register(Register::Cfg)?;
        self.write_register(Register::Cfg, chop.apply(current))
    }

    /// Read back the global-chop settings.
    pub fn chop(&mut self) -> Result<ChopConfig, Error<B::Error>> {
        self.read_register(Register::Cfg)
            .map(ChopConfig::from_register)
    }

    /// Read the STATUS word, which is the response to a NULL command.
    pub fn status(&mut self) -> Result<Status, Error<B::Error>> {
        let response = self.send_command(Command::Null)?.fetch_response()?;
        Ok(Status(response.value()))
    }

    /// Reset the ADS131M04. Returns `Ok(true)` if it gave the 4-channel reset
    /// acknowledgement.
    pub fn reset(&mut self) -> Result<bool, Error<B::Error>> {
        self.simple_command(Command::Reset)
    }

    /// Put the ADS131M04 into standby.
    pub fn standby(&mut self) -> Result<bool, Error<B::Error>> {
        self.simple_command(Command::Standby)
    }

    /// Wake the ADS131M04 from standby.
    pub fn wakeup(&mut self) -> Result<bool, Error<B::Error>> {
        self.simple_command(Command::Wakeup)
    }

    /// Lock the register map against writes.
    pub fn lock(&mut self) -> Result<bool, Error<B::Error>> {
        self.simple_command(Command::Lock)
    }

    /// Unlock the register map.
    pub fn unlock(&mut self) -> Result<bool, Error<B::Error>> {
        self.simple_command(Command::Unlock)
    }

    /// Send a command with a fixed response and check it.
    fn simple_command(&mut self, command: Command) -> Result<bool, Error<B::Error>> {
        let response = self.send_command(command)?.fetch_response()?;
        Ok(command.expected_response() == Some(response))
    }

    /// Send `command`, with `data` in word 1.
    fn send(&mut self, command: Command, data: Word) -> Result<Pending<'_, B>, Error<B::Error>> {
        let frame = self.transact(command, data)?;
        Ok(Pending {
            adc: self,
            command,
            frame,
        })
    }

    /// Run one frame and move the pipeline on.
    fn transact(&mut self, command: Command, data: Word) -> Result<Frame, Error<B::Error>> {
        let outgoing = [command.word(), data & WORD_MASK, 0, 0, 0, 0];
        let settings = self.bus_settings();
        let result = frame::exchange(&mut self.bus, &settings, &outgoing);
        // Even a failed frame may have got the command to the device
        self.pipeline = match command {
            Command::Null => Pipeline::Idle,
            other => Pipeline::CommandSent(other),
        };
        let frame = result.map_err(Error::Bus)?;
        #[cfg(feature = "defmt")]
        defmt::trace!("Frame {} -> {}", command, frame);
        if self.config.verify_crc && !frame.crc_ok() {
            return Err(Error::Crc {
                expected: frame.calculated_crc(),
                received: frame.received_crc(),
            });
        }
        Ok(frame)
    }
}

impl<'a, B> Pending<'a, B>
where
    B: WordBus,
{
    /// The command that was sent.
    pub fn command(&self) -> Command {
        self.command
    }

    /// The frame the command went out in.
    ///
    /// Its word 0 answers the command before this one, but the channel data
    /// is fresh.
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Send a NULL frame and collect the response to our command from its
    /// word 0.
    pub fn fetch_response(self) -> Result<Response, Error<B::Error>> {
        self.fetch_frame()
            .map(|frame| Response(frame.response()))
    }

    /// Send a NULL frame and return the whole thing. Word 0 is the response
    /// to our command.
    pub fn fetch_frame(self) -> Result<Frame, Error<B::Error>> {
        self.adc.transact(Command::Null, 0)
    }
}

//
// Private Functions
//

fn check_address<E>(address: u8) -> Result<(), Error<E>> {
    if address > MAX_ADDRESS {
        Err(Error::InvalidAddress(address))
    } else {
        Ok(())
    }
}

fn check_command<E>(command: Command) -> Result<(), Error<E>> {
    match command {
        Command::ReadRegister(address) => check_address(address),
        Command::WriteRegister(address) => {
            check_address(address)?;
            Err(Error::WriteNeedsValue(address))
        }
        _ => Ok(()),
    }
}

//
// End of file
//
