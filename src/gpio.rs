//! Per-pin direction and level operations.
//!
//! The [`Pin`] wrapper implements the `embedded-hal` digital traits on top of
//! the index-based controller API, with the pin index validated once at
//! handle creation.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin, PinState, StatefulOutputPin};

use crate::SchGpio;
use crate::regs::{InvalidPinOffset, PortIo, RegisterKind};

impl<I: PortIo> SchGpio<I> {
    /// Configure the pin as an input.
    pub fn direction_input(&self, pin: usize) -> Result<(), InvalidPinOffset> {
        self.bank.layout().check_pin(pin)?;
        self.with_inner(|inner, bank| {
            bank.write_bit(&mut inner.io, pin, RegisterKind::Direction, true);
        });
        Ok(())
    }

    /// Configure the pin as an output driving `level`.
    ///
    /// The level register is read-only while the pin is configured as an
    /// input, so the level cannot be preset before switching the direction.
    /// The direction bit is programmed first and the level bit second, which
    /// allows a short transient at the previous level before the new one
    /// takes effect (for example a low pulse when driving high against an
    /// external pull-up).
    pub fn direction_output(&self, pin: usize, level: PinState) -> Result<(), InvalidPinOffset> {
        self.bank.layout().check_pin(pin)?;
        self.with_inner(|inner, bank| {
            bank.write_bit(&mut inner.io, pin, RegisterKind::Direction, false);
            bank.write_bit(&mut inner.io, pin, RegisterKind::Level, level == PinState::High);
        });
        Ok(())
    }

    /// Read the pin level. Holds the exclusion for exactly one register read.
    pub fn get(&self, pin: usize) -> Result<PinState, InvalidPinOffset> {
        self.bank.layout().check_pin(pin)?;
        Ok(PinState::from(self.read_level_bit(pin)))
    }

    /// Drive the pin level. Accepted but without effect while the pin is
    /// configured as an input, matching the hardware behavior.
    pub fn set(&self, pin: usize, level: PinState) -> Result<(), InvalidPinOffset> {
        self.bank.layout().check_pin(pin)?;
        self.write_level_bit(pin, level == PinState::High);
        Ok(())
    }

    /// Route the pin to GPIO mode instead of its native function.
    pub fn enable_pin(&self, pin: usize) -> Result<(), InvalidPinOffset> {
        self.bank.layout().check_pin(pin)?;
        self.with_inner(|inner, bank| {
            bank.write_bit(&mut inner.io, pin, RegisterKind::GpioEnable, true);
        });
        Ok(())
    }

    /// A pin handle implementing the `embedded-hal` digital traits.
    pub fn pin(&self, pin: usize) -> Result<Pin<'_, I>, InvalidPinOffset> {
        self.bank.layout().check_pin(pin)?;
        Ok(Pin { gpio: self, pin })
    }

    pub(crate) fn read_level_bit(&self, pin: usize) -> bool {
        self.with_inner(|inner, bank| bank.read_bit(&mut inner.io, pin, RegisterKind::Level))
    }

    pub(crate) fn write_level_bit(&self, pin: usize, high: bool) {
        self.with_inner(|inner, bank| {
            bank.write_bit(&mut inner.io, pin, RegisterKind::Level, high);
        });
    }
}

/// Handle to one pin of a [`SchGpio`] controller.
pub struct Pin<'a, I: PortIo> {
    gpio: &'a SchGpio<I>,
    pin: usize,
}

impl<I: PortIo> Pin<'_, I> {
    #[inline]
    pub fn offset(&self) -> usize {
        self.pin
    }

    pub fn into_input(&mut self) {
        // Unwrap okay, index was validated when the handle was created.
        self.gpio.direction_input(self.pin).unwrap();
    }

    pub fn into_output(&mut self, level: PinState) {
        self.gpio.direction_output(self.pin, level).unwrap();
    }
}

impl<I: PortIo> ErrorType for Pin<'_, I> {
    type Error = Infallible;
}

impl<I: PortIo> InputPin for Pin<'_, I> {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.gpio.read_level_bit(self.pin))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.gpio.read_level_bit(self.pin))
    }
}

impl<I: PortIo> OutputPin for Pin<'_, I> {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.gpio.write_level_bit(self.pin, false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.gpio.write_level_bit(self.pin, true);
        Ok(())
    }
}

impl<I: PortIo> StatefulOutputPin for Pin<'_, I> {
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.gpio.read_level_bit(self.pin))
    }

    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.gpio.read_level_bit(self.pin))
    }
}
