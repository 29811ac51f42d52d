//! Suspend/resume handling for the core power well.
//!
//! The resume well stays powered through the low-power state, so only the
//! core well configuration has to be saved. The host drives the transition
//! through four calls in order: [`SchGpio::suspend`] (mask the shared line),
//! [`SchGpio::suspend_noirq`] (capture), [`SchGpio::resume_noirq`] (restore)
//! and [`SchGpio::resume`] (unmask). The split guarantees that the registers
//! are captured only after every interrupt-capable subsystem has quiesced and
//! restored before any of them runs again.

use crate::SchGpio;
use crate::regs::{PortIo, RegisterKind, Well};

/// Control over the shared physical interrupt line, supplied by the host's
/// interrupt plumbing.
pub trait IrqLine {
    /// Mask delivery of the line.
    fn mask(&mut self) -> Result<(), LineBusy>;
    /// Re-enable delivery of the line.
    fn unmask(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("shared interrupt line is busy and cannot be masked")]
pub struct LineBusy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PmError {
    /// The shared line could not be masked; the transition was aborted
    /// without touching hardware state.
    #[error(transparent)]
    LineBusy(#[from] LineBusy),
    /// Resume was requested without a matching prior suspend. Restoring
    /// zeros to live configuration registers could silently disable working
    /// hardware, so this is reported instead of defaulted.
    #[error("resume without a matching suspend snapshot")]
    MissingSnapshot,
}

/// Power state of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PmState {
    Active,
    Suspending,
    Suspended,
    Resuming,
}

/// The five core well configuration registers tracked across suspend.
///
/// The core well trigger enables are deliberately absent: they belong to the
/// interrupt-routing subsystem. Resume well registers stay powered and are
/// not captured either.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PmSnapshot {
    gpio_enable: u32,
    direction: u32,
    level: u32,
    smi_enable: u32,
    nmi_enable: u32,
}

pub(crate) struct PmContext {
    pub(crate) state: PmState,
    pub(crate) snapshot: Option<PmSnapshot>,
}

impl PmContext {
    pub(crate) const fn new() -> Self {
        Self {
            state: PmState::Active,
            snapshot: None,
        }
    }
}

impl<I: PortIo> SchGpio<I> {
    /// First suspend step: mask the shared physical line so no late device
    /// event can race the snapshot. A mask failure aborts the transition
    /// before any register state is touched.
    pub fn suspend(&self, line: &mut impl IrqLine) -> Result<(), PmError> {
        line.mask()?;
        self.with_inner(|inner, _| inner.pm.state = PmState::Suspending);
        log::debug!("sch-gpio: shared line masked, suspending");
        Ok(())
    }

    /// Second suspend step: capture the core well configuration.
    ///
    /// A still unconsumed snapshot is overwritten; that is permitted but
    /// means the host did not pair suspend and resume calls.
    pub fn suspend_noirq(&self) {
        self.with_inner(|inner, bank| {
            let io = &mut inner.io;
            let snapshot = PmSnapshot {
                gpio_enable: io.read32(bank.reg32(RegisterKind::GpioEnable, Well::Core)),
                direction: io.read32(bank.reg32(RegisterKind::Direction, Well::Core)),
                level: io.read32(bank.reg32(RegisterKind::Level, Well::Core)),
                smi_enable: io.read32(bank.reg32(RegisterKind::SmiEnable, Well::Core)),
                nmi_enable: io.read32(bank.reg32(RegisterKind::NmiEnable, Well::Core)),
            };
            if inner.pm.snapshot.replace(snapshot).is_some() {
                log::warn!("sch-gpio: overwriting an unconsumed suspend snapshot");
            }
            inner.pm.state = PmState::Suspended;
        });
    }

    /// First resume step: write the snapshot back, in capture order.
    pub fn resume_noirq(&self) -> Result<(), PmError> {
        self.with_inner(|inner, bank| {
            let snapshot = inner.pm.snapshot.take().ok_or(PmError::MissingSnapshot)?;
            let io = &mut inner.io;
            io.write32(
                bank.reg32(RegisterKind::GpioEnable, Well::Core),
                snapshot.gpio_enable,
            );
            io.write32(
                bank.reg32(RegisterKind::Direction, Well::Core),
                snapshot.direction,
            );
            io.write32(bank.reg32(RegisterKind::Level, Well::Core), snapshot.level);
            io.write32(
                bank.reg32(RegisterKind::SmiEnable, Well::Core),
                snapshot.smi_enable,
            );
            io.write32(
                bank.reg32(RegisterKind::NmiEnable, Well::Core),
                snapshot.nmi_enable,
            );
            inner.pm.state = PmState::Resuming;
            Ok(())
        })
    }

    /// Final resume step: re-enable delivery of the shared line.
    pub fn resume(&self, line: &mut impl IrqLine) {
        line.unmask();
        self.with_inner(|inner, _| inner.pm.state = PmState::Active);
        log::debug!("sch-gpio: shared line unmasked, resume complete");
    }

    pub fn pm_state(&self) -> PmState {
        self.with_inner(|inner, _| inner.pm.state)
    }
}
