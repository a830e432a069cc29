//! The byte-level bus underneath the frame protocol.
//!
//! The ADS131M04 driver never talks to an SPI peripheral directly. Instead it
//! talks to a [`WordBus`], which offers exactly the four primitives the frame
//! protocol needs. [`SpiBus`] implements [`WordBus`] for any `embedded-hal`
//! SPI peripheral plus chip-select pin, but you can implement it yourself if
//! your platform needs to do something special (e.g. re-clock a shared SPI
//! bus before every frame).

use core::fmt;

use embedded_hal::blocking::spi::Transfer;
use embedded_hal::digital::v2::OutputPin;
use embedded_hal::spi::{Mode, Phase, Polarity};

use crate::error::BusError;

//
// Public Types
//

/// Which bit goes on the wire first.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BitOrder {
    /// Most significant bit first. The ADS131M04 only speaks this.
    MsbFirst,
    /// Least significant bit first.
    LsbFirst,
}

/// How the bus must be set up for the duration of one frame.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct BusSettings {
    /// SCLK frequency, in Hz
    pub sclk_hz: u32,
    /// Bit order - always [`BitOrder::MsbFirst`] for this device
    pub bit_order: BitOrder,
    /// SPI clock polarity and phase
    pub mode: Mode,
}

/// The primitives the frame protocol is built from.
///
/// Every frame is bracketed as `configure`, `select`, 18 x `transfer_byte`,
/// `deselect`. The driver guarantees `deselect` is called even if a transfer
/// fails part-way through.
pub trait WordBus {
    /// The error produced by any of the primitives
    type Error;

    /// Claim the bus with the given settings, ready for a frame.
    fn configure(&mut self, settings: &BusSettings) -> Result<(), Self::Error>;

    /// Assert chip-select (drive it low).
    fn select(&mut self) -> Result<(), Self::Error>;

    /// De-assert chip-select (drive it high).
    fn deselect(&mut self) -> Result<(), Self::Error>;

    /// Clock one byte out and return the byte clocked in at the same time.
    fn transfer_byte(&mut self, out: u8) -> Result<u8, Self::Error>;
}

/// A [`WordBus`] built from an `embedded-hal` SPI peripheral and a GPIO
/// chip-select pin.
///
/// `embedded-hal` 0.2 SPI peripherals are configured when they are created,
/// so [`WordBus::configure`] only records the requested settings. Check
/// [`SpiBus::settings`] when you build your SPI peripheral.
pub struct SpiBus<SPI, CS> {
    spi: SPI,
    cs: CS,
    settings: Option<BusSettings>,
}

//
// impls on Public Types
//

impl BusSettings {
    /// Settings for the given SCLK frequency and SPI mode, MSB first.
    pub const fn new(sclk_hz: u32, mode: Mode) -> BusSettings {
        BusSettings {
            sclk_hz,
            bit_order: BitOrder::MsbFirst,
            mode,
        }
    }
}

// `Mode`, `Polarity` and `Phase` have no `Debug` in embedded-hal 0.2.
pub(crate) struct PolarityDebug(pub(crate) Polarity);

impl fmt::Debug for PolarityDebug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Polarity::IdleLow => f.write_str("IdleLow"),
            Polarity::IdleHigh => f.write_str("IdleHigh"),
        }
    }
}

pub(crate) struct PhaseDebug(pub(crate) Phase);

impl fmt::Debug for PhaseDebug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Phase::CaptureOnFirstTransition => f.write_str("CaptureOnFirstTransition"),
            Phase::CaptureOnSecondTransition => f.write_str("CaptureOnSecondTransition"),
        }
    }
}

impl fmt::Debug for BusSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BusSettings")
            .field("sclk_hz", &self.sclk_hz)
            .field("bit_order", &self.bit_order)
            .field("polarity", &PolarityDebug(self.mode.polarity))
            .field("phase", &PhaseDebug(self.mode.phase))
            .finish()
    }
}

impl<SPI, CS, S, P> SpiBus<SPI, CS>
where
    SPI: Transfer<u8, Error = S>,
    CS: OutputPin<Error = P>,
{
    /// Wrap an SPI peripheral and chip-select pin.
    pub fn new(spi: SPI, cs: CS) -> SpiBus<SPI, CS> {
        SpiBus {
            spi,
            cs,
            settings: None,
        }
    }

    /// The settings most recently requested by the driver, if any.
    pub fn settings(&self) -> Option<BusSettings> {
        self.settings
    }

    /// Give back the SPI peripheral and chip-select pin.
    pub fn release(self) -> (SPI, CS) {
        (self.spi, self.cs)
    }
}

impl<SPI, CS, S, P> WordBus for SpiBus<SPI, CS>
where
    SPI: Transfer<u8, Error = S>,
    CS: OutputPin<Error = P>,
{
    type Error = BusError<S, P>;

    fn configure(&mut self, settings: &BusSettings) -> Result<(), Self::Error> {
        self.settings = Some(*settings);
        Ok(())
    }

    fn select(&mut self) -> Result<(), Self::Error> {
        self.cs.set_low().map_err(BusError::Pin)
    }

    fn deselect(&mut self) -> Result<(), Self::Error> {
        self.cs.set_high().map_err(BusError::Pin)
    }

    fn transfer_byte(&mut self, out: u8) -> Result<u8, Self::Error> {
        let mut buffer = [out];
        let received = self.spi.transfer(&mut buffer).map_err(BusError::Spi)?;
        Ok(received[0])
    }
}

//
// Private Types
//

/// Holds chip-select low for the lifetime of one frame.
///
/// Call [`Selected::release`] on the happy path so a failure to de-assert is
/// reported. If the guard is dropped early (because a transfer failed and we
/// bailed out with `?`), chip-select is de-asserted on a best-effort basis.
pub(crate) struct Selected<'a, B: WordBus> {
    bus: &'a mut B,
    held: bool,
}

//
// impls on Private Types
//

impl<'a, B: WordBus> Selected<'a, B> {
    /// Configure the bus and assert chip-select.
    pub(crate) fn acquire(bus: &'a mut B, settings: &BusSettings) -> Result<Self, B::Error> {
        bus.configure(settings)?;
        bus.select()?;
        Ok(Selected { bus, held: true })
    }

    /// Send a 24-bit word as three bytes, MSB first, and collect the 24-bit
    /// word that comes back.
    pub(crate) fn transfer_word(&mut self, word: u32) -> Result<u32, B::Error> {
        let mut received = 0u32;
        for shift in [16u32, 8, 0] {
            let byte = self.bus.transfer_byte((word >> shift) as u8)?;
            received = (received << 8) | u32::from(byte);
        }
        Ok(received)
    }

    /// De-assert chip-select and report whether that worked.
    pub(crate) fn release(mut self) -> Result<(), B::Error> {
        self.held = false;
        self.bus.deselect()
    }
}

impl<'a, B: WordBus> Drop for Selected<'a, B> {
    fn drop(&mut self) {
        if self.held {
            // We're already on an error path, so the original error wins.
            let _ = self.bus.deselect();
        }
    }
}

//
// End of file
//
