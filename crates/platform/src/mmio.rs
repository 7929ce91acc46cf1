//! Memory-mapped register access
//!
//! Every IP core on the IOP fabric (VDMA, IIC, SPI, GPIO, the mailbox BRAM)
//! is driven through 32-bit registers at fixed byte offsets from a base
//! address. Drivers never dereference raw pointers themselves; they go through
//! [`RegisterIo`], which lets tests substitute a recording mock register file.
//!
//! # Example
//!
//! ```
//! use platform::mmio::RegisterIo;
//!
//! fn enable<R: RegisterIo>(io: &mut R) {
//!     // Set the run bit without disturbing the rest of the control word.
//!     io.set_bits(0x00, 0x1);
//! }
//! ```

/// 32-bit register window addressed by byte offset.
///
/// Offsets are relative to the start of the window and must be 4-byte
/// aligned. Implementations decide what happens on out-of-window accesses
/// (the MMIO window trusts the caller; mocks ignore them).
pub trait RegisterIo {
    /// Read the register at `offset`.
    fn read(&self, offset: u32) -> u32;

    /// Write `value` to the register at `offset`.
    fn write(&mut self, offset: u32, value: u32);

    /// Read-modify-write: clear `clear`, then set `set`, in one write.
    fn modify(&mut self, offset: u32, clear: u32, set: u32) {
        let value = self.read(offset);
        self.write(offset, (value & !clear) | set);
    }

    /// Set the bits in `mask`, leaving all others untouched.
    fn set_bits(&mut self, offset: u32, mask: u32) {
        self.modify(offset, 0, mask);
    }

    /// Clear the bits in `mask`, leaving all others untouched.
    fn clear_bits(&mut self, offset: u32, mask: u32) {
        self.modify(offset, mask, 0);
    }

    /// Replace a multi-bit field: bits outside `mask` keep their value.
    ///
    /// `value` is already shifted into position; bits outside `mask` are
    /// discarded.
    fn write_field(&mut self, offset: u32, mask: u32, value: u32) {
        self.modify(offset, mask, value & mask);
    }
}

impl<R: RegisterIo + ?Sized> RegisterIo for &mut R {
    fn read(&self, offset: u32) -> u32 {
        (**self).read(offset)
    }

    fn write(&mut self, offset: u32, value: u32) {
        (**self).write(offset, value);
    }
}

/// Volatile MMIO window over a physical register block.
#[derive(Debug)]
pub struct Mmio {
    base: *mut u32,
}

impl Mmio {
    /// Create a window at `base`.
    ///
    /// # Safety
    ///
    /// `base` must be the 4-byte aligned address of a device register block
    /// that stays mapped for the lifetime of the returned value, and no other
    /// code may hold a `Mmio` for the same block while this one is in use.
    pub const unsafe fn new(base: usize) -> Self {
        Self {
            base: base as *mut u32,
        }
    }

    /// Base address of the window.
    pub fn base(&self) -> usize {
        self.base as usize
    }

    fn word(&self, offset: u32) -> *mut u32 {
        // Byte offsets are converted to word steps; wrapping_add keeps this
        // free of arithmetic panics for any offset.
        self.base.wrapping_add((offset >> 2) as usize)
    }
}

impl RegisterIo for Mmio {
    fn read(&self, offset: u32) -> u32 {
        // SAFETY: `new` requires `base` to address a mapped register block;
        // offsets come from the driver's register map, inside that block.
        unsafe { core::ptr::read_volatile(self.word(offset)) }
    }

    fn write(&mut self, offset: u32, value: u32) {
        // SAFETY: see `read`; `&mut self` guarantees exclusive access.
        unsafe { core::ptr::write_volatile(self.word(offset), value) }
    }
}

// SAFETY: the window is a plain device address; exclusive access is enforced
// by `&mut self` on writes and the uniqueness contract of `Mmio::new`.
unsafe impl Send for Mmio {}

/// Lower 32 bits of a bus address.
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation)] // Safety: masked to 32 bits first
pub const fn lower_32_bits(addr: u64) -> u32 {
    (addr & 0xFFFF_FFFF) as u32
}

/// Upper 32 bits of a bus address.
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation)] // Safety: shift leaves at most 32 significant bits
pub const fn upper_32_bits(addr: u64) -> u32 {
    (addr >> 32) as u32
}
