//! Wake-source bookkeeping.
//!
//! Only resume well pins can bring the system out of the low-power state,
//! because only that well is still powered to generate the signal. Requests
//! for core well pins are a caller bug and rejected, never silently ignored.

use crate::regs::{InvalidPinOffset, MAX_PINS, PinLayout, Well};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WakeError {
    #[error(transparent)]
    InvalidPin(#[from] InvalidPinOffset),
    #[error("pin {0} is in the core well and cannot act as a wake source")]
    CoreWellPin(usize),
}

/// Fixed-capacity bitmap over resume well pin indices.
#[derive(Debug, Clone, Copy, Default)]
pub struct WakeSet {
    bits: u64,
}

static_assertions::const_assert!(MAX_PINS <= u64::BITS as usize);

impl WakeSet {
    pub const fn new() -> Self {
        Self { bits: 0 }
    }

    /// Mark or unmark `pin` as a wake source. Idempotent.
    pub fn update(&mut self, layout: &PinLayout, pin: usize, on: bool) -> Result<(), WakeError> {
        layout.check_pin(pin)?;
        if matches!(layout.well(pin), Well::Core) {
            return Err(WakeError::CoreWellPin(pin));
        }
        if on {
            self.bits |= 1 << pin;
        } else {
            self.bits &= !(1 << pin);
        }
        Ok(())
    }

    #[inline]
    pub fn contains(&self, pin: usize) -> bool {
        pin < MAX_PINS && self.bits & (1 << pin) != 0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }
}
