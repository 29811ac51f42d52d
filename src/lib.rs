//! # HAL for the Intel SCH family legacy GPIO block
//!
//! This crate drives the segmented, port-mapped GPIO controller found in the
//! Intel SCH (Poulsbo), Tunnel Creek, Centerton and Quark X1000 chipsets. The
//! block is split across two power domains: the core well, which loses its
//! register state in the low-power suspend state, and the resume well, which
//! stays powered. The crate provides per-pin direction and level control, a
//! demultiplexing dispatcher for the single shared interrupt line, wake-source
//! bookkeeping for the resume well, and snapshot/restore of the core well
//! configuration registers across a suspend cycle.
//!
//! Resource discovery, chip registration and interrupt descriptor allocation
//! stay with the host: it hands the controller an exclusive [`regs::PortIo`]
//! endpoint, the validated I/O base, the device variant and optionally the
//! base of a contiguous virtual interrupt range. Pin-level code can use the
//! [`embedded-hal`](https://github.com/rust-embedded/embedded-hal) digital
//! traits through [`gpio::Pin`].
#![no_std]

#[cfg(test)]
extern crate std;

pub mod gpio;
pub mod irq;
pub mod pm;
pub mod regs;
pub mod wake;

#[cfg(test)]
pub(crate) mod sim;

use core::cell::RefCell;

use critical_section::Mutex;

use crate::pm::PmContext;
use crate::regs::{PinLayout, PortIo, RegisterBank};
use crate::wake::WakeSet;

pub use crate::regs::{InvalidPinLayout, InvalidPinOffset};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unsupported GPIO device id {0:#06x}")]
pub struct UnsupportedDevice(pub u16);

/// Known device variants, keyed by the PCI device ID of the hosting LPC/ILB
/// function. Each variant selects a fixed pin count and well boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, num_enum::TryFromPrimitive)]
#[repr(u16)]
pub enum DeviceId {
    Poulsbo = 0x5031,
    TunnelCreek = 0x8186,
    Centerton = 0x0c60,
    QuarkX1000 = 0x095e,
}

impl DeviceId {
    /// Identify a variant from its PCI device ID.
    pub fn from_pci_id(id: u16) -> Result<Self, UnsupportedDevice> {
        Self::try_from(id).map_err(|_| UnsupportedDevice(id))
    }

    /// Pin count and resume well boundary of this variant.
    pub const fn pin_layout(self) -> PinLayout {
        let (pin_count, resume_well_start) = match self {
            DeviceId::Poulsbo => (14, 10),
            DeviceId::TunnelCreek => (14, 5),
            DeviceId::Centerton => (30, 21),
            DeviceId::QuarkX1000 => (8, 2),
        };
        match PinLayout::new(pin_count, resume_well_start) {
            Ok(layout) => layout,
            // The variant table only contains valid layouts.
            Err(_) => unreachable!(),
        }
    }
}

/// Interrupt plumbing supplied by the host: the base of a block of
/// `pin_count` contiguous virtual interrupt numbers, one per pin.
#[derive(Debug, Clone, Copy)]
pub struct IrqConfig {
    pub virq_base: u32,
}

pub(crate) struct Inner<I> {
    pub(crate) io: I,
    pub(crate) wake: WakeSet,
    pub(crate) pm: PmContext,
}

/// Driver for one legacy GPIO block.
///
/// All mutable state is carried inside the controller behind a
/// [`critical_section::Mutex`]; there is no ambient global state and multiple
/// controllers can coexist. Entering the critical section both provides the
/// non-sleeping exclusion and suppresses local asynchronous delivery, so the
/// register helpers can be shared between ordinary calling contexts and the
/// shared-line dispatcher without self-deadlock.
pub struct SchGpio<I: PortIo> {
    bank: RegisterBank,
    irq: Option<IrqConfig>,
    inner: Mutex<RefCell<Inner<I>>>,
}

impl<I: PortIo> SchGpio<I> {
    /// Create a controller for a known device variant.
    ///
    /// If `irq` is given, all interrupt routing is disabled and latched events
    /// are cleared before the host binds the shared line. For the Poulsbo
    /// variant the pins which firmware does not enable by default are routed
    /// to GPIO mode here.
    pub fn new(io: I, io_base: u16, device: DeviceId, irq: Option<IrqConfig>) -> Self {
        let gpio = Self::new_with_layout(io, io_base, device.pin_layout(), irq);
        if device == DeviceId::Poulsbo {
            // GPIO[6:0] and SUS_GPIO[2:0] are enabled by default and GPIO7 is
            // claimed by the CMC as SLPIOVR. Enable the remaining core well
            // pins and SUS_GPIO3 explicitly.
            for pin in [8, 9, 13] {
                // Unwrap okay, the pins are part of the Poulsbo layout.
                gpio.enable_pin(pin).unwrap();
            }
        }
        gpio
    }

    /// Create a controller from an externally validated layout.
    pub fn new_with_layout(
        io: I,
        io_base: u16,
        layout: PinLayout,
        irq: Option<IrqConfig>,
    ) -> Self {
        let gpio = Self {
            bank: RegisterBank::new(io_base, layout),
            irq,
            inner: Mutex::new(RefCell::new(Inner {
                io,
                wake: WakeSet::new(),
                pm: PmContext::new(),
            })),
        };
        if gpio.irq.is_some() {
            gpio.disable_all_interrupts();
        }
        log::info!(
            "sch-gpio: {} pins at {:#06x}, resume well starts at pin {}",
            layout.pin_count(),
            io_base,
            layout.resume_well_start()
        );
        gpio
    }

    #[inline]
    pub fn pin_count(&self) -> usize {
        self.bank.layout().pin_count()
    }

    #[inline]
    pub fn layout(&self) -> PinLayout {
        self.bank.layout()
    }

    #[inline]
    pub fn irq_config(&self) -> Option<IrqConfig> {
        self.irq
    }

    /// Quiesce the block before the host unregisters it. All interrupt
    /// routing is disabled and pending events are dropped.
    pub fn shutdown(&self) {
        if self.irq.is_some() {
            self.disable_all_interrupts();
        }
    }

    /// Run `f` with the exclusion primitive held and asynchronous delivery
    /// suppressed.
    pub(crate) fn with_inner<R>(&self, f: impl FnOnce(&mut Inner<I>, &RegisterBank) -> R) -> R {
        critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            f(&mut inner, &self.bank)
        })
    }
}
