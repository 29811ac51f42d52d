//! Register layout of the legacy GPIO block and the port access primitives.
//!
//! The block exposes a page of byte-addressable registers per power well. The
//! core well page starts at the I/O base, the resume well page follows at a
//! fixed stride of [`RESUME_WELL_STRIDE`]. Within a page, every register kind
//! holds one bit per pin, packed into consecutive bytes.

/// Largest number of pins supported by any layout of this device family.
pub const MAX_PINS: usize = 64;

/// Byte distance between the core well and resume well register pages.
pub const RESUME_WELL_STRIDE: u16 = 0x20;

/// The resume well NMI enable register sits outside the banked pages.
const RESUME_NMI_ENABLE: u16 = 0x44;

// The status register is the last one in the page; the resume well page must
// start right behind it.
static_assertions::const_assert_eq!(
    RegisterKind::TriggerStatus.base() + 4,
    RESUME_WELL_STRIDE
);

/// Control registers of the GPIO block.
///
/// The discriminant is the register's byte offset within a well's page. The
/// NMI enable registers are the one exception to the banking scheme: the
/// resume well copy lives at `0x44` instead of `base + stride`, which
/// [`RegisterBank::reg32`] accounts for. They are never addressed per pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum RegisterKind {
    /// GEN: routes the pin to GPIO mode instead of its native function.
    GpioEnable = 0x00,
    /// GIO: direction select, 1 = input.
    Direction = 0x04,
    /// GLV: pin level. Read-only while the pin is configured as an input.
    Level = 0x08,
    /// GTPE: rising edge trigger enable.
    PositiveTrigger = 0x0C,
    /// GTNE: falling edge trigger enable.
    NegativeTrigger = 0x10,
    /// GGPE: group interrupt enable.
    GroupEnable = 0x14,
    /// GSMI: routes the pin's event to SMI.
    SmiEnable = 0x18,
    /// GTS: pending event status, write-one-to-clear.
    TriggerStatus = 0x1C,
    /// GNMIEN/RGNMIEN: routes the pin's event to NMI.
    NmiEnable = 0x40,
}

impl RegisterKind {
    /// Byte offset of this register within a well's page.
    pub const fn base(self) -> u16 {
        self as u16
    }
}

/// Power well a pin belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Well {
    /// Loses register state in the low-power suspend state.
    Core,
    /// Stays powered through suspend.
    Resume,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid pin layout with {pin_count} pins and resume well start {resume_well_start}")]
pub struct InvalidPinLayout {
    pub pin_count: usize,
    pub resume_well_start: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid GPIO pin offset {0}")]
pub struct InvalidPinOffset(pub usize);

impl embedded_hal::digital::Error for InvalidPinOffset {
    fn kind(&self) -> embedded_hal::digital::ErrorKind {
        embedded_hal::digital::ErrorKind::Other
    }
}

/// Pin count and well boundary of one device variant.
///
/// Pins `0..resume_well_start` belong to the core well, the remainder to the
/// resume well.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinLayout {
    pin_count: usize,
    resume_well_start: usize,
}

impl PinLayout {
    /// Create a layout, enforcing `resume_well_start <= pin_count <= 64`.
    pub const fn new(
        pin_count: usize,
        resume_well_start: usize,
    ) -> Result<Self, InvalidPinLayout> {
        if pin_count > MAX_PINS || resume_well_start > pin_count {
            return Err(InvalidPinLayout {
                pin_count,
                resume_well_start,
            });
        }
        Ok(Self {
            pin_count,
            resume_well_start,
        })
    }

    #[inline]
    pub const fn pin_count(&self) -> usize {
        self.pin_count
    }

    #[inline]
    pub const fn resume_well_start(&self) -> usize {
        self.resume_well_start
    }

    /// Power well of a valid pin.
    #[inline]
    pub const fn well(&self, pin: usize) -> Well {
        if pin < self.resume_well_start {
            Well::Core
        } else {
            Well::Resume
        }
    }

    #[inline]
    pub const fn check_pin(&self, pin: usize) -> Result<(), InvalidPinOffset> {
        if pin >= self.pin_count {
            return Err(InvalidPinOffset(pin));
        }
        Ok(())
    }
}

/// Byte and doubleword access to the I/O port range owned by the controller.
///
/// The host hands the controller exclusive ownership of the range at attach
/// time; implementations do not need to be re-entrant because all accesses go
/// through the controller's exclusion primitive.
pub trait PortIo {
    fn read8(&mut self, port: u16) -> u8;
    fn write8(&mut self, port: u16, value: u8);
    fn read32(&mut self, port: u16) -> u32;
    fn write32(&mut self, port: u16, value: u32);
}

/// Pure addressing arithmetic for the segmented register file.
#[derive(Debug, Clone, Copy)]
pub struct RegisterBank {
    io_base: u16,
    layout: PinLayout,
}

impl RegisterBank {
    pub const fn new(io_base: u16, layout: PinLayout) -> Self {
        Self { io_base, layout }
    }

    #[inline]
    pub const fn io_base(&self) -> u16 {
        self.io_base
    }

    #[inline]
    pub const fn layout(&self) -> PinLayout {
        self.layout
    }

    /// Absolute port of the register byte holding `pin`'s bit.
    ///
    /// Total over valid pins; callers reject `pin >= pin_count` beforehand.
    /// Not meaningful for [`RegisterKind::NmiEnable`], which is not banked.
    pub const fn offset(&self, pin: usize, kind: RegisterKind) -> u16 {
        let (stride, pin_in_well) = match self.layout.well(pin) {
            Well::Core => (0, pin),
            Well::Resume => (RESUME_WELL_STRIDE, pin - self.layout.resume_well_start),
        };
        self.io_base + kind.base() + stride + (pin_in_well / 8) as u16
    }

    /// Bit index of `pin` within its register byte.
    pub const fn bit(&self, pin: usize) -> u8 {
        let pin_in_well = match self.layout.well(pin) {
            Well::Core => pin,
            Well::Resume => pin - self.layout.resume_well_start,
        };
        (pin_in_well % 8) as u8
    }

    /// Absolute port of a whole 32-bit register in the given well.
    pub const fn reg32(&self, kind: RegisterKind, well: Well) -> u16 {
        match (kind, well) {
            (RegisterKind::NmiEnable, Well::Core) => self.io_base + RegisterKind::NmiEnable.base(),
            (RegisterKind::NmiEnable, Well::Resume) => self.io_base + RESUME_NMI_ENABLE,
            (_, Well::Core) => self.io_base + kind.base(),
            (_, Well::Resume) => self.io_base + kind.base() + RESUME_WELL_STRIDE,
        }
    }

    /// Read a single pin bit. Must be called with the exclusion held.
    pub(crate) fn read_bit(&self, io: &mut impl PortIo, pin: usize, kind: RegisterKind) -> bool {
        io.read8(self.offset(pin, kind)) & (1 << self.bit(pin)) != 0
    }

    /// Read-modify-write a single pin bit. The full register byte is read,
    /// masked and written back; must be called with the exclusion held so no
    /// other operation observes the intermediate value.
    pub(crate) fn write_bit(
        &self,
        io: &mut impl PortIo,
        pin: usize,
        kind: RegisterKind,
        value: bool,
    ) {
        let port = self.offset(pin, kind);
        let mask = 1u8 << self.bit(pin);
        let curr = io.read8(port);
        if value {
            io.write8(port, curr | mask);
        } else {
            io.write8(port, curr & !mask);
        }
    }
}

/// Port I/O backend using the x86 `in`/`out` instructions.
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub struct X86PortIo(());

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
impl X86PortIo {
    /// # Safety
    ///
    /// The caller must have exclusive ownership of the I/O port range accessed
    /// through this handle and sufficient privilege to execute port I/O.
    pub const unsafe fn new() -> Self {
        Self(())
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
impl PortIo for X86PortIo {
    #[inline]
    fn read8(&mut self, port: u16) -> u8 {
        let value: u8;
        // Safety: port range ownership is guaranteed by the constructor contract.
        unsafe {
            core::arch::asm!("in al, dx", in("dx") port, out("al") value,
                options(nomem, nostack, preserves_flags));
        }
        value
    }

    #[inline]
    fn write8(&mut self, port: u16, value: u8) {
        // Safety: port range ownership is guaranteed by the constructor contract.
        unsafe {
            core::arch::asm!("out dx, al", in("dx") port, in("al") value,
                options(nomem, nostack, preserves_flags));
        }
    }

    #[inline]
    fn read32(&mut self, port: u16) -> u32 {
        let value: u32;
        // Safety: port range ownership is guaranteed by the constructor contract.
        unsafe {
            core::arch::asm!("in eax, dx", in("dx") port, out("eax") value,
                options(nomem, nostack, preserves_flags));
        }
        value
    }

    #[inline]
    fn write32(&mut self, port: u16, value: u32) {
        // Safety: port range ownership is guaranteed by the constructor contract.
        unsafe {
            core::arch::asm!("out dx, eax", in("dx") port, in("eax") value,
                options(nomem, nostack, preserves_flags));
        }
    }
}
