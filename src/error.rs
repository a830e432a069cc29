//! Error types for the ADS131M04 driver.

//
// Public Types
//

/// Everything that can go wrong when talking to the ADS131M04.
///
/// `E` is the error type of the underlying [`WordBus`](crate::WordBus).
///
/// A register write that the device does not acknowledge is *not* an error -
/// those methods return `Ok(false)` instead.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// The bus failed part-way through a frame. The chip-select line has been
    /// released (as far as the bus allows) but the frame is lost.
    Bus(E),
    /// A channel index outside `0..=3` was requested.
    InvalidChannel(u8),
    /// A register address that does not fit in the six-bit address field.
    InvalidAddress(u8),
    /// A log2 gain above 7 (128x) was requested.
    InvalidGain(u8),
    /// A log2 chop delay outside `1..=16` was requested.
    InvalidChopDelay(u8),
    /// A register write was passed where only a command is taken. Use
    /// [`Ads131m04::send_write`](crate::Ads131m04::send_write) so the value
    /// goes out with it.
    WriteNeedsValue(u8),
    /// The output slice is not the same length as the list of channels.
    LengthMismatch,
    /// CRC checking is enabled and the CRC word did not match the frame.
    Crc {
        /// The CRC we calculated over words 0 to 4
        expected: u16,
        /// The CRC the device sent in word 5
        received: u16,
    },
    /// The clock rates cannot be changed once [`Ads131m04::begin`](crate::Ads131m04::begin)
    /// has been called.
    AlreadyStarted,
}

/// Errors from the [`SpiBus`](crate::SpiBus) adapter.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError<S, P> {
    /// The SPI peripheral failed
    Spi(S),
    /// The chip-select pin failed
    Pin(P),
}

//
// impls on Public Types
//

impl<E> Error<E> {
    /// Is this a fault on the bus, rather than a bad argument or bad data?
    pub fn is_bus_fault(&self) -> bool {
        matches!(self, Error::Bus(_))
    }
}

//
// End of file
//
