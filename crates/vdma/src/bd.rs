//! Scatter-gather buffer descriptors.
//!
//! Each channel owns a ring of up to [`MAX_FRAMESTORE`] descriptors, one per
//! frame store. The hardware follows `next_desc` from descriptor to
//! descriptor; the last one points back at the first.
//!
//! ```text
//! bus_base + 0x00  Bd[0] ──▶ Bd[1] ──▶ ... ──▶ Bd[n-1] ─┐
//!        ▲                                              │
//!        └──────────────────────────────────────────────┘
//! ```
//!
//! Setters validate against the hardware field widths and never clamp: an
//! out-of-range value is rejected with [`VdmaError::InvalidParam`] and the
//! descriptor is left unchanged.

use platform::mmio::{lower_32_bits, upper_32_bits};

use crate::error::VdmaError;
use crate::regs::{
    field_get, field_prep, FRMDLY_MASK, FRMDLY_SHIFT, FRM_MAX, MAX_FRAMESTORE, MAX_HSIZE,
    MAX_STRIDE, MAX_VSIZE, STRIDE_MASK,
};

/// Size of one descriptor in bytes; also its required alignment.
pub const BD_SIZE: u32 = 32;

/// Mask of the descriptor alignment bits.
pub const BD_ALIGN_MASK: u32 = 0x1F;

/// One hardware buffer descriptor.
///
/// Layout is fixed by the DMA engine: eight little-endian words, 32-byte
/// aligned.
#[repr(C, align(32))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bd {
    next_desc: u32,
    next_desc_msb: u32,
    start_addr: u32,
    start_addr_msb: u32,
    vsize: u32,
    hsize: u32,
    stride_frmdly: u32,
    reserved: u32,
}

impl Bd {
    /// An all-zero descriptor.
    pub const ZERO: Self = Self {
        next_desc: 0,
        next_desc_msb: 0,
        start_addr: 0,
        start_addr_msb: 0,
        vsize: 0,
        hsize: 0,
        stride_frmdly: 0,
        reserved: 0,
    };

    /// Lines per frame, `1..=0x1FFF`.
    pub fn set_vsize(&mut self, vsize: u32) -> Result<(), VdmaError> {
        if vsize == 0 || vsize > MAX_VSIZE {
            return Err(VdmaError::InvalidParam);
        }
        self.vsize = vsize;
        Ok(())
    }

    /// Bytes per line, `1..=0xFFFF`.
    pub fn set_hsize(&mut self, hsize: u32) -> Result<(), VdmaError> {
        if hsize == 0 || hsize > MAX_HSIZE {
            return Err(VdmaError::InvalidParam);
        }
        self.hsize = hsize;
        Ok(())
    }

    /// Line pitch, `1..=0xFFFF`. The frame delay field is preserved.
    pub fn set_stride(&mut self, stride: u32) -> Result<(), VdmaError> {
        if stride == 0 || stride > MAX_STRIDE {
            return Err(VdmaError::InvalidParam);
        }
        self.stride_frmdly = (self.stride_frmdly & !STRIDE_MASK) | stride;
        Ok(())
    }

    /// Frame delay, `0..=15`. The stride field is preserved.
    pub fn set_frame_delay(&mut self, delay: u32) -> Result<(), VdmaError> {
        if delay > FRM_MAX {
            return Err(VdmaError::InvalidParam);
        }
        self.stride_frmdly =
            (self.stride_frmdly & !FRMDLY_MASK) | field_prep(delay, FRMDLY_MASK, FRMDLY_SHIFT);
        Ok(())
    }

    /// Frame buffer start address (both halves).
    pub fn set_addr(&mut self, addr: u64) {
        self.start_addr = lower_32_bits(addr);
        self.start_addr_msb = upper_32_bits(addr);
    }

    pub(crate) fn set_next(&mut self, next: u32) {
        self.next_desc = next;
        self.next_desc_msb = 0;
    }

    /// Bus address of the next descriptor.
    pub fn next(&self) -> u32 {
        self.next_desc
    }

    /// Frame buffer start address.
    pub fn addr(&self) -> u64 {
        u64::from(self.start_addr_msb).wrapping_shl(32) | u64::from(self.start_addr)
    }

    /// Lines per frame.
    pub fn vsize(&self) -> u32 {
        self.vsize
    }

    /// Bytes per line.
    pub fn hsize(&self) -> u32 {
        self.hsize
    }

    /// Line pitch.
    pub fn stride(&self) -> u32 {
        self.stride_frmdly & STRIDE_MASK
    }

    /// Frame delay.
    pub fn frame_delay(&self) -> u32 {
        field_get(self.stride_frmdly, FRMDLY_MASK, FRMDLY_SHIFT)
    }
}

/// Circular chain of descriptors owned by one channel.
///
/// The descriptors live either in the ring's own array or in caller storage
/// handed over with [`BdRing::attach`] (a region in on-chip or uncached
/// memory). `bus_base` is the address at which the DMA master sees
/// descriptor 0.
///
/// The own array is linked at its current address, and
/// [`BdRing::follow_storage`] relinks it if the ring has moved since.
/// Caller storage is `'static` and never moves.
#[derive(Debug)]
pub struct BdRing {
    local: [Bd; MAX_FRAMESTORE],
    external: Option<&'static mut [Bd]>,
    bus_base: u32,
    count: usize,
}

impl Default for BdRing {
    fn default() -> Self {
        Self::new()
    }
}

impl BdRing {
    /// An empty ring on its own storage.
    pub fn new() -> Self {
        Self {
            local: [Bd::ZERO; MAX_FRAMESTORE],
            external: None,
            bus_base: 0,
            count: 0,
        }
    }

    /// Zero `count` descriptors and link them into a ring.
    ///
    /// `count` is capped at [`MAX_FRAMESTORE`]. Attached caller storage is
    /// kept (at its bus address) while it still holds `count` descriptors;
    /// otherwise the ring falls back to its own array.
    pub fn init(&mut self, count: usize) {
        self.count = count.min(MAX_FRAMESTORE);
        if self
            .external
            .as_ref()
            .is_some_and(|storage| storage.len() < self.count)
        {
            self.external = None;
        }
        for bd in self.slots_mut() {
            *bd = Bd::ZERO;
        }
        let base = if self.external.is_some() {
            self.bus_base
        } else {
            self.storage_address()
        };
        self.relink(base);
    }

    /// Move the ring into caller `storage`, reached by the DMA master at
    /// `bus_base`.
    ///
    /// The first [`len`](Self::len) descriptors of `storage` are zeroed and
    /// linked; descriptor contents held before are dropped. Fails with
    /// [`VdmaError::InvalidParam`], leaving the ring unchanged, if `bus_base`
    /// is not 32-byte aligned or `storage` is too short.
    pub fn attach(&mut self, storage: &'static mut [Bd], bus_base: u32) -> Result<(), VdmaError> {
        if bus_base & BD_ALIGN_MASK != 0 || storage.len() < self.count {
            return Err(VdmaError::InvalidParam);
        }
        for bd in storage.iter_mut().take(self.count) {
            *bd = Bd::ZERO;
        }
        self.external = Some(storage);
        self.relink(bus_base);
        Ok(())
    }

    /// Relink the ring's own array if it is no longer at `bus_base`.
    ///
    /// Does nothing for caller storage. Returns true if the links changed.
    pub fn follow_storage(&mut self) -> bool {
        if self.external.is_some() {
            return false;
        }
        let base = self.storage_address();
        if base == self.bus_base {
            return false;
        }
        self.relink(base);
        true
    }

    fn relink(&mut self, bus_base: u32) {
        self.bus_base = bus_base;
        let count = self.count;
        for (i, bd) in self.slots_mut().iter_mut().take(count).enumerate() {
            let next = i.wrapping_add(1);
            let next = if next >= count { 0 } else { next };
            bd.set_next(slot_address(bus_base, next));
        }
    }

    fn slots(&self) -> &[Bd] {
        match &self.external {
            Some(storage) => &**storage,
            None => self.local.as_slice(),
        }
    }

    fn slots_mut(&mut self) -> &mut [Bd] {
        match &mut self.external {
            Some(storage) => &mut **storage,
            None => self.local.as_mut_slice(),
        }
    }

    /// True if the descriptors live in caller storage.
    pub fn is_attached(&self) -> bool {
        self.external.is_some()
    }

    /// Lower 32 bits of the address of descriptor 0 in this address space.
    pub fn storage_address(&self) -> u32 {
        lower_32_bits(self.slots().as_ptr() as usize as u64)
    }

    /// Bus address of descriptor 0.
    pub fn bus_base(&self) -> u32 {
        self.bus_base
    }

    /// Number of descriptors in the ring.
    pub fn len(&self) -> usize {
        self.count
    }

    /// True if the ring has no descriptors.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Bus address of descriptor `index`.
    pub fn bus_address(&self, index: usize) -> u32 {
        slot_address(self.bus_base, index)
    }

    /// Bus address of the first descriptor (loaded into CDESC).
    pub fn head(&self) -> u32 {
        self.bus_base
    }

    /// Bus address of the last descriptor (loaded into TDESC).
    pub fn tail(&self) -> u32 {
        self.bus_address(self.count.saturating_sub(1))
    }

    /// Ring index of the descriptor at bus address `addr`, if it is one.
    pub fn index_of(&self, addr: u32) -> Option<usize> {
        let delta = addr.wrapping_sub(self.bus_base);
        if delta & BD_ALIGN_MASK != 0 {
            return None;
        }
        let index = usize::try_from(delta.checked_div(BD_SIZE)?).ok()?;
        (index < self.count).then_some(index)
    }

    /// Descriptor `index`.
    pub fn get(&self, index: usize) -> Option<&Bd> {
        self.slots().get(..self.count).and_then(|bds| bds.get(index))
    }

    /// Mutable descriptor `index`.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Bd> {
        let count = self.count;
        self.slots_mut().get_mut(..count).and_then(|bds| bds.get_mut(index))
    }

    /// Descriptors in ring order.
    pub fn iter(&self) -> impl Iterator<Item = &Bd> {
        self.slots().iter().take(self.count)
    }

    /// Mutable descriptors in ring order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Bd> {
        let count = self.count;
        self.slots_mut().iter_mut().take(count)
    }
}

#[allow(clippy::cast_possible_truncation)] // Safety: index < MAX_FRAMESTORE (32)
fn slot_address(bus_base: u32, index: usize) -> u32 {
    bus_base.wrapping_add((index as u32).wrapping_mul(BD_SIZE))
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::arithmetic_side_effects,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_layout_matches_hardware() {
        assert_eq!(core::mem::size_of::<Bd>(), BD_SIZE as usize);
        assert_eq!(core::mem::align_of::<Bd>(), BD_SIZE as usize);
    }

    #[test]
    fn setters_reject_out_of_range_without_clamping() {
        let mut bd = Bd::ZERO;
        bd.set_vsize(720).unwrap();
        assert_eq!(bd.set_vsize(0), Err(VdmaError::InvalidParam));
        assert_eq!(bd.set_vsize(MAX_VSIZE + 1), Err(VdmaError::InvalidParam));
        assert_eq!(bd.vsize(), 720);

        bd.set_hsize(MAX_HSIZE).unwrap();
        assert_eq!(bd.set_hsize(MAX_HSIZE + 1), Err(VdmaError::InvalidParam));
        assert_eq!(bd.hsize(), MAX_HSIZE);

        assert_eq!(bd.set_stride(0), Err(VdmaError::InvalidParam));
        assert_eq!(bd.set_frame_delay(16), Err(VdmaError::InvalidParam));
    }

    #[test]
    fn stride_and_frame_delay_share_a_word() {
        let mut bd = Bd::ZERO;
        bd.set_stride(0x1400).unwrap();
        bd.set_frame_delay(9).unwrap();
        bd.set_stride(0x0F00).unwrap();
        assert_eq!(bd.stride(), 0x0F00);
        assert_eq!(bd.frame_delay(), 9);
        bd.set_frame_delay(0).unwrap();
        assert_eq!(bd.stride(), 0x0F00);
    }

    #[test]
    fn addr_is_split_into_halves() {
        let mut bd = Bd::ZERO;
        bd.set_addr(0x0000_0001_2345_6780);
        assert_eq!(bd.addr(), 0x0000_0001_2345_6780);
    }

    #[test]
    fn init_links_a_closed_ring() {
        let mut ring = BdRing::new();
        ring.init(3);
        let base = ring.bus_base();
        assert_eq!(base, ring.storage_address());
        assert_eq!(ring.get(0).unwrap().next(), base + 32);
        assert_eq!(ring.get(1).unwrap().next(), base + 64);
        assert_eq!(ring.get(2).unwrap().next(), base);
        assert_eq!(ring.tail(), base + 64);
        assert!(ring.get(3).is_none());
    }

    #[test]
    fn single_descriptor_points_at_itself() {
        let mut ring = BdRing::new();
        ring.init(1);
        assert_eq!(ring.get(0).unwrap().next(), ring.head());
        assert_eq!(ring.head(), ring.tail());
    }

    fn leaked(len: usize) -> &'static mut [Bd] {
        Box::leak(vec![Bd::ZERO; len].into_boxed_slice())
    }

    #[test]
    fn attach_moves_the_ring_into_caller_storage() {
        let mut ring = BdRing::new();
        ring.init(2);
        ring.get_mut(1).unwrap().set_vsize(10).unwrap();

        let storage = leaked(4);
        storage[3].set_vsize(77).unwrap();
        let virt = lower_32_bits(storage.as_ptr() as usize as u64);
        ring.attach(storage, 0x1000_0000).unwrap();

        assert!(ring.is_attached());
        assert_eq!(ring.storage_address(), virt);
        assert_eq!(ring.get(0).unwrap().next(), 0x1000_0020);
        assert_eq!(ring.get(1).unwrap().next(), 0x1000_0000);
        // Previous contents are not carried over.
        assert_eq!(ring.get(1).unwrap().vsize(), 0);
        assert_eq!(ring.index_of(0x1000_0020), Some(1));
        assert_eq!(ring.index_of(0x1000_0040), None);
        assert_eq!(ring.index_of(0x1000_0004), None);

        ring.get_mut(0).unwrap().set_hsize(256).unwrap();
        assert_eq!(ring.iter().next().unwrap().hsize(), 256);
    }

    #[test]
    fn attach_rejects_bad_storage_without_changes() {
        let mut ring = BdRing::new();
        ring.init(3);
        let base = ring.bus_base();
        assert_eq!(ring.attach(leaked(4), 0x1000_0010), Err(VdmaError::InvalidParam));
        assert_eq!(ring.attach(leaked(2), 0x1000_0000), Err(VdmaError::InvalidParam));
        assert!(!ring.is_attached());
        assert_eq!(ring.bus_base(), base);
    }

    #[test]
    fn init_keeps_caller_storage_that_still_fits() {
        let mut ring = BdRing::new();
        ring.init(2);
        ring.attach(leaked(3), 0x2000_0000).unwrap();
        ring.init(3);
        assert!(ring.is_attached());
        assert_eq!(ring.get(2).unwrap().next(), 0x2000_0000);

        ring.init(4);
        assert!(!ring.is_attached());
        assert_eq!(ring.bus_base(), ring.storage_address());
    }

    #[test]
    fn moved_ring_relinks_at_its_new_address() {
        let mut ring = BdRing::new();
        ring.init(3);
        let mut moved = Box::new(ring);
        assert!(moved.follow_storage());
        let base = moved.storage_address();
        assert_eq!(moved.head(), base);
        assert_eq!(moved.get(0).unwrap().next(), base + 32);
        assert_eq!(moved.get(2).unwrap().next(), base);
        assert!(!moved.follow_storage());
    }

    #[test]
    fn caller_storage_is_never_relinked() {
        let mut ring = BdRing::new();
        ring.init(1);
        ring.attach(leaked(1), 0x3000_0000).unwrap();
        assert!(!ring.follow_storage());
        assert_eq!(ring.head(), 0x3000_0000);
    }

    #[test]
    fn oversized_ring_is_capped() {
        let mut ring = BdRing::new();
        ring.init(MAX_FRAMESTORE + 5);
        assert_eq!(ring.len(), MAX_FRAMESTORE);
    }
}
