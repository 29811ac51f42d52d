//! Simulated register file backing the unit tests.
//!
//! Models the documented behavior of the block: the level register is
//! read-only for pins configured as inputs and the status register is
//! write-one-to-clear. Everything else is plain storage. All writes are logged
//! so tests can assert ordering.

use std::vec::Vec;

use crate::regs::PortIo;

/// Covers both well pages plus the NMI enable registers.
const REG_FILE_SIZE: usize = 0x48;

const LEVEL: usize = 0x08;
const TRIGGER_STATUS: usize = 0x1C;

pub(crate) struct SimDevice {
    base: u16,
    regs: [u8; REG_FILE_SIZE],
    pub writes: Vec<(u16, u32)>,
}

impl SimDevice {
    pub fn new(base: u16) -> Self {
        Self {
            base,
            regs: [0; REG_FILE_SIZE],
            writes: Vec::new(),
        }
    }

    fn index(&self, port: u16) -> usize {
        let off = port.checked_sub(self.base).expect("port below io base") as usize;
        assert!(off < REG_FILE_SIZE, "port beyond register file");
        off
    }

    /// Raw register byte at `off` relative to the I/O base.
    pub fn raw(&self, off: usize) -> u8 {
        self.regs[off]
    }

    pub fn raw32(&self, off: usize) -> u32 {
        u32::from_le_bytes(self.regs[off..off + 4].try_into().unwrap())
    }

    /// Inject register state directly, bypassing the write semantics. Used to
    /// model external events (pin level changes, latched interrupts).
    pub fn set_raw(&mut self, off: usize, value: u8) {
        self.regs[off] = value;
    }

    /// Model the S3 power loss of the core well: the core page and the core
    /// NMI enable register revert to zero, the resume well keeps its state.
    pub fn zero_core_well(&mut self) {
        self.regs[0x00..0x20].fill(0);
        self.regs[0x40..0x44].fill(0);
    }

    fn store8(&mut self, off: usize, value: u8) {
        let page_off = match off {
            0x00..=0x1F => off,
            0x20..=0x3F => off - 0x20,
            _ => {
                self.regs[off] = value;
                return;
            }
        };
        match page_off {
            // Level bits of input pins (direction bit set) are read-only.
            LEVEL..=0x0B => {
                let dir = self.regs[off - (LEVEL - 0x04)];
                self.regs[off] = (self.regs[off] & dir) | (value & !dir);
            }
            // Write-one-to-clear.
            TRIGGER_STATUS..=0x1F => self.regs[off] &= !value,
            _ => self.regs[off] = value,
        }
    }
}

impl PortIo for SimDevice {
    fn read8(&mut self, port: u16) -> u8 {
        self.regs[self.index(port)]
    }

    fn write8(&mut self, port: u16, value: u8) {
        self.writes.push((port, u32::from(value)));
        let off = self.index(port);
        self.store8(off, value);
    }

    fn read32(&mut self, port: u16) -> u32 {
        let off = self.index(port);
        self.raw32(off)
    }

    fn write32(&mut self, port: u16, value: u32) {
        self.writes.push((port, value));
        let off = self.index(port);
        for (i, byte) in value.to_le_bytes().into_iter().enumerate() {
            self.store8(off + i, byte);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_is_read_only_for_inputs() {
        let mut dev = SimDevice::new(0);
        // Pins 0 and 1 input, rest output.
        dev.set_raw(0x04, 0b11);
        dev.set_raw(0x08, 0b01);
        dev.write8(0x08, 0b110);
        // Bit 0 kept, bit 1 still zero, bit 2 taken.
        assert_eq!(dev.raw(0x08), 0b101);
    }

    #[test]
    fn status_is_write_one_to_clear() {
        let mut dev = SimDevice::new(0);
        dev.set_raw(0x1C, 0b1011);
        dev.write8(0x1C, 0b0010);
        assert_eq!(dev.raw(0x1C), 0b1001);
        dev.write32(0x1C, 0xffff_ffff);
        assert_eq!(dev.raw(0x1C), 0);
    }
}
