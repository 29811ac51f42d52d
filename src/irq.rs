//! Edge interrupt control and the shared-line demultiplexer.
//!
//! All pins of the block share one physical interrupt line. The host binds a
//! contiguous range of virtual interrupt numbers to the controller at attach
//! time and invokes [`SchGpio::handle_shared_irq`] whenever the line signals;
//! the dispatcher scans the status registers and fans the event out to the
//! per-pin virtual interrupts.

use crate::SchGpio;
use crate::regs::{InvalidPinOffset, PortIo, RegisterKind, Well};
use crate::wake::WakeError;

/// Per-pin trigger type, raw values matching the host trigger-type encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, num_enum::TryFromPrimitive)]
#[repr(u8)]
pub enum TriggerEdge {
    None = 0,
    Rising = 1,
    Falling = 2,
    Both = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized trigger type {0:#04x}")]
pub struct InvalidTriggerType(pub u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SetTypeError {
    #[error(transparent)]
    InvalidPin(#[from] InvalidPinOffset),
    #[error(transparent)]
    InvalidTriggerType(#[from] InvalidTriggerType),
}

/// Outcome of one shared-line dispatch, so a shared-line host dispatcher can
/// pass the event on to other handlers when it was not ours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum IrqStatus {
    Handled,
    NotMine,
}

impl<I: PortIo> SchGpio<I> {
    /// Program the edge trigger type of a pin.
    pub fn irq_set_type(&self, pin: usize, edge: TriggerEdge) -> Result<(), InvalidPinOffset> {
        self.bank.layout().check_pin(pin)?;
        let (rising, falling) = match edge {
            TriggerEdge::None => (false, false),
            TriggerEdge::Rising => (true, false),
            TriggerEdge::Falling => (false, true),
            TriggerEdge::Both => (true, true),
        };
        self.with_inner(|inner, bank| {
            bank.write_bit(&mut inner.io, pin, RegisterKind::PositiveTrigger, rising);
            bank.write_bit(&mut inner.io, pin, RegisterKind::NegativeTrigger, falling);
        });
        Ok(())
    }

    /// [`Self::irq_set_type`] taking the host's raw trigger-type value.
    pub fn irq_set_type_raw(&self, pin: usize, raw: u8) -> Result<(), SetTypeError> {
        let edge = TriggerEdge::try_from(raw).map_err(|_| InvalidTriggerType(raw))?;
        self.irq_set_type(pin, edge)?;
        Ok(())
    }

    /// Enable the pin's group interrupt.
    pub fn irq_enable(&self, pin: usize) -> Result<(), InvalidPinOffset> {
        self.bank.layout().check_pin(pin)?;
        self.with_inner(|inner, bank| {
            bank.write_bit(&mut inner.io, pin, RegisterKind::GroupEnable, true);
        });
        Ok(())
    }

    /// Disable the pin's group interrupt.
    pub fn irq_disable(&self, pin: usize) -> Result<(), InvalidPinOffset> {
        self.bank.layout().check_pin(pin)?;
        self.with_inner(|inner, bank| {
            bank.write_bit(&mut inner.io, pin, RegisterKind::GroupEnable, false);
        });
        Ok(())
    }

    /// Acknowledge a pending event on `pin`.
    pub fn irq_ack(&self, pin: usize) -> Result<(), InvalidPinOffset> {
        self.bank.layout().check_pin(pin)?;
        self.with_inner(|inner, bank| {
            // Status is write-one-to-clear. Write only this pin's bit so other
            // pending pins sharing the byte keep their state; a read-modify-
            // write would acknowledge them as a side effect.
            let port = bank.offset(pin, RegisterKind::TriggerStatus);
            inner.io.write8(port, 1 << bank.bit(pin));
        });
        Ok(())
    }

    /// Mark or unmark `pin` as a wake source. Only resume well pins qualify.
    pub fn irq_set_wake(&self, pin: usize, on: bool) -> Result<(), WakeError> {
        self.with_inner(|inner, bank| inner.wake.update(&bank.layout(), pin, on))
    }

    /// Whether `pin` is currently marked as a wake source.
    pub fn wake_enabled(&self, pin: usize) -> bool {
        self.with_inner(|inner, _| inner.wake.contains(pin))
    }

    /// Disable every trigger enable, group enable and SMI/NMI routing
    /// register in both wells and drop all latched events. Used at attach,
    /// before the host binds the shared line, and again at teardown.
    pub fn disable_all_interrupts(&self) {
        self.with_inner(|inner, bank| {
            for well in [Well::Core, Well::Resume] {
                for kind in [
                    RegisterKind::PositiveTrigger,
                    RegisterKind::NegativeTrigger,
                    RegisterKind::GroupEnable,
                    RegisterKind::SmiEnable,
                    RegisterKind::NmiEnable,
                ] {
                    inner.io.write32(bank.reg32(kind, well), 0);
                }
            }
            inner
                .io
                .write32(bank.reg32(RegisterKind::TriggerStatus, Well::Core), 0xffff_ffff);
            inner
                .io
                .write32(bank.reg32(RegisterKind::TriggerStatus, Well::Resume), 0xffff_ffff);
        });
        log::debug!("sch-gpio: interrupt routing disabled, pending events cleared");
    }

    /// Virtual interrupt number bound to `pin`, if interrupt plumbing was
    /// configured and the pin is valid.
    pub fn pin_to_virq(&self, pin: usize) -> Option<u32> {
        if self.bank.layout().check_pin(pin).is_err() {
            return None;
        }
        self.irq.map(|cfg| cfg.virq_base + pin as u32)
    }

    /// Demultiplex one event on the shared physical line.
    ///
    /// Scans every pin, acknowledges each pending status bit and notifies the
    /// pin's virtual interrupt. The scan never stops at the first hit because
    /// several pins can be pending at once. The notifications run after the
    /// scan, outside the critical section, so handlers may call back into the
    /// controller.
    pub fn handle_shared_irq(&self, mut notify: impl FnMut(u32)) -> IrqStatus {
        let Some(cfg) = self.irq else {
            return IrqStatus::NotMine;
        };
        let pin_count = self.bank.layout().pin_count();
        let pending = self.with_inner(|inner, bank| {
            let mut pending = 0u64;
            for pin in 0..pin_count {
                let port = bank.offset(pin, RegisterKind::TriggerStatus);
                let mask = 1u8 << bank.bit(pin);
                if inner.io.read8(port) & mask != 0 {
                    inner.io.write8(port, mask);
                    pending |= 1 << pin;
                }
            }
            pending
        });
        if pending == 0 {
            return IrqStatus::NotMine;
        }
        for pin in 0..pin_count {
            if pending & (1 << pin) != 0 {
                notify(cfg.virq_base + pin as u32);
            }
        }
        IrqStatus::Handled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regs::PinLayout;
    use crate::sim::SimDevice;
    use crate::{IrqConfig, SchGpio};
    use std::vec::Vec;

    const IO_BASE: u16 = 0x1080;
    const VIRQ_BASE: u32 = 64;

    fn poulsbo_with_irq() -> SchGpio<SimDevice> {
        SchGpio::new_with_layout(
            SimDevice::new(IO_BASE),
            IO_BASE,
            PinLayout::new(14, 10).unwrap(),
            Some(IrqConfig {
                virq_base: VIRQ_BASE,
            }),
        )
    }

    fn raw(gpio: &SchGpio<SimDevice>, off: usize) -> u8 {
        gpio.with_inner(|inner, _| inner.io.raw(off))
    }

    #[test]
    fn trigger_type_bit_patterns() {
        let gpio = poulsbo_with_irq();
        let pin = 4;
        let gtpe = 0x0C;
        let gtne = 0x10;
        gpio.irq_set_type(pin, TriggerEdge::Rising).unwrap();
        assert_eq!(raw(&gpio, gtpe), 1 << 4);
        assert_eq!(raw(&gpio, gtne), 0);
        gpio.irq_set_type(pin, TriggerEdge::Falling).unwrap();
        assert_eq!(raw(&gpio, gtpe), 0);
        assert_eq!(raw(&gpio, gtne), 1 << 4);
        gpio.irq_set_type(pin, TriggerEdge::Both).unwrap();
        assert_eq!(raw(&gpio, gtpe), 1 << 4);
        assert_eq!(raw(&gpio, gtne), 1 << 4);
        gpio.irq_set_type(pin, TriggerEdge::None).unwrap();
        assert_eq!(raw(&gpio, gtpe), 0);
        assert_eq!(raw(&gpio, gtne), 0);
    }

    #[test]
    fn raw_trigger_type_rejects_unknown_values() {
        let gpio = poulsbo_with_irq();
        gpio.irq_set_type_raw(4, 1).unwrap();
        assert_eq!(
            gpio.irq_set_type_raw(4, 0x08),
            Err(SetTypeError::InvalidTriggerType(InvalidTriggerType(0x08)))
        );
        assert_eq!(
            gpio.irq_set_type_raw(14, 1),
            Err(SetTypeError::InvalidPin(InvalidPinOffset(14)))
        );
    }

    #[test]
    fn group_enable_bit() {
        let gpio = poulsbo_with_irq();
        gpio.irq_enable(11).unwrap();
        // Resume well pin 1.
        assert_eq!(raw(&gpio, 0x34), 1 << 1);
        gpio.irq_disable(11).unwrap();
        assert_eq!(raw(&gpio, 0x34), 0);
    }

    #[test]
    fn ack_clears_only_the_target_pin() {
        let gpio = poulsbo_with_irq();
        gpio.with_inner(|inner, _| inner.io.set_raw(0x1C, (1 << 3) | (1 << 4)));
        gpio.irq_ack(3).unwrap();
        assert_eq!(raw(&gpio, 0x1C), 1 << 4);
    }

    #[test]
    fn set_wake_policy() {
        let gpio = poulsbo_with_irq();
        gpio.irq_set_wake(12, true).unwrap();
        gpio.irq_set_wake(12, true).unwrap();
        assert!(gpio.wake_enabled(12));
        gpio.irq_set_wake(12, false).unwrap();
        assert!(!gpio.wake_enabled(12));
        for pin in 0..10 {
            assert_eq!(
                gpio.irq_set_wake(pin, true),
                Err(WakeError::CoreWellPin(pin))
            );
        }
        assert_eq!(
            gpio.irq_set_wake(14, true),
            Err(WakeError::InvalidPin(InvalidPinOffset(14)))
        );
    }

    #[test]
    fn dispatch_handles_all_pending_pins() {
        let gpio = poulsbo_with_irq();
        // Pins 3 and 7 in the core well status byte, pin 11 in the resume
        // well status byte.
        gpio.with_inner(|inner, _| {
            inner.io.set_raw(0x1C, (1 << 3) | (1 << 7));
            inner.io.set_raw(0x3C, 1 << 1);
        });
        let mut virqs = Vec::new();
        let status = gpio.handle_shared_irq(|virq| virqs.push(virq));
        assert_eq!(status, IrqStatus::Handled);
        assert_eq!(virqs, [VIRQ_BASE + 3, VIRQ_BASE + 7, VIRQ_BASE + 11]);
        assert_eq!(raw(&gpio, 0x1C), 0);
        assert_eq!(raw(&gpio, 0x3C), 0);
    }

    #[test]
    fn dispatch_without_pending_events_is_not_ours() {
        let gpio = poulsbo_with_irq();
        let status = gpio.handle_shared_irq(|_| panic!("no notification expected"));
        assert_eq!(status, IrqStatus::NotMine);
    }

    #[test]
    fn dispatch_without_irq_plumbing_is_not_ours() {
        let gpio = SchGpio::new_with_layout(
            SimDevice::new(IO_BASE),
            IO_BASE,
            PinLayout::new(14, 10).unwrap(),
            None,
        );
        let status = gpio.handle_shared_irq(|_| panic!("no notification expected"));
        assert_eq!(status, IrqStatus::NotMine);
    }

    #[test]
    fn virq_mapping() {
        let gpio = poulsbo_with_irq();
        assert_eq!(gpio.pin_to_virq(0), Some(VIRQ_BASE));
        assert_eq!(gpio.pin_to_virq(13), Some(VIRQ_BASE + 13));
        assert_eq!(gpio.pin_to_virq(14), None);
    }
}
