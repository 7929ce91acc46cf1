//! AXI VDMA register map.
//!
//! Reference: Xilinx PG020 (AXI Video Direct Memory Access), register space
//! and scatter-gather descriptor chapters.
//!
//! All offsets are byte offsets. Channel registers are relative to the
//! channel base ([`TX_OFFSET`] for MM2S, [`RX_OFFSET`] for S2MM); engine
//! registers are relative to the engine base; direct-register-mode geometry
//! and start addresses are relative to the channel's address bank
//! ([`MM2S_ADDR_OFFSET`] / [`S2MM_ADDR_OFFSET`]).

// ── Limits ───────────────────────────────────────────────────────────────────

/// Maximum number of frame stores with 32-bit addressing.
pub const MAX_FRAMESTORE: usize = 32;
/// Maximum number of frame stores with 64-bit addressing.
pub const MAX_FRAMESTORE_64: usize = 16;
/// Largest vertical size (lines).
pub const MAX_VSIZE: u32 = 0x1FFF;
/// Largest horizontal size (bytes).
pub const MAX_HSIZE: u32 = 0xFFFF;
/// Largest stride (bytes).
pub const MAX_STRIDE: u32 = 0xFFFF;
/// Largest frame delay and park frame index.
pub const FRM_MAX: u32 = 0xF;

/// Reset polls performed by engine initialization before giving up.
pub const INITIALIZATION_POLLING: u32 = 100_000;
/// Reset polls performed by the self-test before giving up.
pub const RESET_TIMEOUT: u32 = 500;

// ── Engine registers ─────────────────────────────────────────────────────────

/// MM2S (read) channel register block.
pub const TX_OFFSET: u32 = 0x00;
/// S2MM (write) channel register block.
pub const RX_OFFSET: u32 = 0x30;
/// Park pointer register (shared by both directions).
pub const PARKPTR_OFFSET: u32 = 0x28;
/// Version register.
pub const VERSION_OFFSET: u32 = 0x2C;
/// MM2S direct-register address bank.
pub const MM2S_ADDR_OFFSET: u32 = 0x50;
/// S2MM direct-register address bank.
pub const S2MM_ADDR_OFFSET: u32 = 0xA0;

// ── Channel registers ────────────────────────────────────────────────────────

/// Control register.
pub const CR_OFFSET: u32 = 0x00;
/// Status register.
pub const SR_OFFSET: u32 = 0x04;
/// Current descriptor pointer (SG only).
pub const CDESC_OFFSET: u32 = 0x08;
/// Tail descriptor pointer (SG only).
pub const TDESC_OFFSET: u32 = 0x10;
/// High frame-buffer bank select (direct mode, more than 16 frame stores).
pub const HI_FRMBUF_OFFSET: u32 = 0x14;
/// Frame store count.
pub const FRMSTORE_OFFSET: u32 = 0x18;
/// Line buffer threshold.
pub const BUFTHRES_OFFSET: u32 = 0x1C;
/// Error interrupt mask (S2MM block only; reserved before v6.01).
pub const S2MM_DMA_IRQ_MASK_OFFSET: u32 = 0x3C;

// ── Direct-register address bank ─────────────────────────────────────────────

/// Vertical size; writing it starts a direct-mode transfer.
pub const VSIZE_OFFSET: u32 = 0x00;
/// Horizontal size.
pub const HSIZE_OFFSET: u32 = 0x04;
/// Packed stride and frame delay.
pub const STRD_FRMDLY_OFFSET: u32 = 0x08;
/// First frame start address.
pub const START_ADDR_OFFSET: u32 = 0x0C;
/// Upper half of the first start address (64-bit builds).
pub const START_ADDR_MSB_OFFSET: u32 = 0x10;
/// Bytes per start address entry with 32-bit addressing.
pub const START_ADDR_LEN: u32 = 4;
/// Bytes per start address entry with 64-bit addressing (low and high word).
pub const START_ADDR_LEN_64: u32 = 8;

// ── Control register bits ────────────────────────────────────────────────────

/// Run/stop.
pub const CR_RUNSTOP_MASK: u32 = 0x0000_0001;
/// Circular (tail-enable) mode; clear for parking.
pub const CR_TAIL_EN_MASK: u32 = 0x0000_0002;
/// Soft reset.
pub const CR_RESET_MASK: u32 = 0x0000_0004;
/// Gen-lock sync enable.
pub const CR_SYNC_EN_MASK: u32 = 0x0000_0008;
/// Frame count enable.
pub const CR_FRMCNT_EN_MASK: u32 = 0x0000_0010;
/// Frame-sync source select field.
pub const CR_FSYNC_SRC_MASK: u32 = 0x0000_0060;
/// Frame-sync source: other channel.
pub const CR_FSYNC_SRC_OTHER: u32 = 0x0000_0020;
/// Frame-sync source: S2MM TUSER start-of-frame.
pub const CR_FSYNC_SRC_TUSER: u32 = 0x0000_0040;
/// Gen-lock source: internal.
pub const CR_GENLCK_SRC_MASK: u32 = 0x0000_0080;
/// Read-pointer (gen-lock master select) field.
pub const CR_RD_PTR_MASK: u32 = 0x0000_0F00;
/// Shift of [`CR_RD_PTR_MASK`].
pub const CR_RD_PTR_SHIFT: u32 = 8;
/// Gen-lock repeat on frame error.
pub const CR_GENLCK_RPT_MASK: u32 = 0x0000_8000;
/// Interrupt delay-timer threshold field.
pub const CR_DELAY_MASK: u32 = 0xFF00_0000;
/// Shift of [`CR_DELAY_MASK`].
pub const CR_DELAY_SHIFT: u32 = 24;
/// Interrupt frame-count threshold field.
pub const CR_FRMCNT_MASK: u32 = 0x00FF_0000;
/// Shift of [`CR_FRMCNT_MASK`].
pub const CR_FRMCNT_SHIFT: u32 = 16;

// ── Status register bits ─────────────────────────────────────────────────────

/// Channel halted.
pub const SR_HALTED_MASK: u32 = 0x0000_0001;
/// Channel idle.
pub const SR_IDLE_MASK: u32 = 0x0000_0002;
/// Internal error.
pub const SR_ERR_INTERNAL_MASK: u32 = 0x0000_0010;
/// AXI slave error.
pub const SR_ERR_SLAVE_MASK: u32 = 0x0000_0020;
/// AXI decode error.
pub const SR_ERR_DECODE_MASK: u32 = 0x0000_0040;
/// Frame size less than expected.
pub const SR_ERR_FSZ_LESS_MASK: u32 = 0x0000_0080;
/// Line size less than expected.
pub const SR_ERR_LSZ_LESS_MASK: u32 = 0x0000_0100;
/// Descriptor fetch slave error.
pub const SR_ERR_SG_SLV_MASK: u32 = 0x0000_0200;
/// Descriptor fetch decode error.
pub const SR_ERR_SG_DEC_MASK: u32 = 0x0000_0400;
/// Frame size more than expected.
pub const SR_ERR_FSZ_MORE_MASK: u32 = 0x0000_0800;
/// Every error bit.
pub const SR_ERR_ALL_MASK: u32 = 0x0000_0FF0;

// ── Interrupt bits (enable in CR, pending in SR) ─────────────────────────────

/// Frame-count interrupt.
pub const IXR_FRMCNT_MASK: u32 = 0x0000_1000;
/// Delay-timer interrupt.
pub const IXR_DELAYCNT_MASK: u32 = 0x0000_2000;
/// Error interrupt.
pub const IXR_ERROR_MASK: u32 = 0x0000_4000;
/// Completion interrupts.
pub const IXR_COMPLETION_MASK: u32 = 0x0000_3000;
/// Every interrupt.
pub const IXR_ALL_MASK: u32 = 0x0000_7000;

// ── Other engine fields ──────────────────────────────────────────────────────

/// Bank select value enabling the high start-address bank.
pub const REGINDEX_MASK: u32 = 0x1;
/// Descriptor pointers must be 32-byte aligned.
pub const DESC_LSB_MASK: u32 = 0xFFFF_FFE0;
/// Frame store count field.
pub const FRMSTORE_MASK: u32 = 0x3F;

/// Park pointer: read target frame.
pub const PARKPTR_READREF_MASK: u32 = 0x0000_001F;
/// Park pointer: write target frame.
pub const PARKPTR_WRTREF_MASK: u32 = 0x0000_1F00;
/// Shift of [`PARKPTR_WRTREF_MASK`].
pub const PARKPTR_WRTREF_SHIFT: u32 = 8;
/// Park pointer: current read frame.
pub const PARKPTR_READSTR_MASK: u32 = 0x001F_0000;
/// Shift of [`PARKPTR_READSTR_MASK`].
pub const PARKPTR_READSTR_SHIFT: u32 = 16;
/// Park pointer: current write frame.
pub const PARKPTR_WRTSTR_MASK: u32 = 0x1F00_0000;
/// Shift of [`PARKPTR_WRTSTR_MASK`].
pub const PARKPTR_WRTSTR_SHIFT: u32 = 24;

/// Version: major.
pub const VERSION_MAJOR_MASK: u32 = 0xF000_0000;
/// Shift of [`VERSION_MAJOR_MASK`].
pub const VERSION_MAJOR_SHIFT: u32 = 28;
/// Version: minor.
pub const VERSION_MINOR_MASK: u32 = 0x0FF0_0000;
/// Shift of [`VERSION_MINOR_MASK`].
pub const VERSION_MINOR_SHIFT: u32 = 20;
/// Version: revision.
pub const VERSION_REV_MASK: u32 = 0x000F_0000;
/// Shift of [`VERSION_REV_MASK`].
pub const VERSION_REV_SHIFT: u32 = 16;

/// S2MM error mask: frame-size-less / early start-of-frame.
pub const S2MM_IRQ_FSZLESS_SOF_ERLY_MASK: u32 = 0x1;
/// Line-size-less / early end-of-line.
pub const S2MM_IRQ_LSZLESS_EOL_ERLY_MASK: u32 = 0x2;
/// Frame-size-more / late start-of-frame.
pub const S2MM_IRQ_FSZMORE_SOF_LATE_MASK: u32 = 0x4;
/// Line-size-more / late end-of-line.
pub const S2MM_IRQ_LSZMORE_EOL_LATE_MASK: u32 = 0x8;
/// All S2MM error interrupt masks.
pub const S2MM_IRQ_ERR_ALL_MASK: u32 = 0xF;

/// Stride field of the packed stride/frame-delay word.
pub const STRIDE_MASK: u32 = 0x0000_FFFF;
/// Frame delay field of the packed stride/frame-delay word.
pub const FRMDLY_MASK: u32 = 0x0F00_0000;
/// Shift of [`FRMDLY_MASK`].
pub const FRMDLY_SHIFT: u32 = 24;

// ── Field helpers ────────────────────────────────────────────────────────────

/// Extract a field: `(reg & mask) >> shift`.
#[inline]
#[must_use]
pub const fn field_get(reg: u32, mask: u32, shift: u32) -> u32 {
    (reg & mask).wrapping_shr(shift)
}

/// Position a field value: `(value << shift) & mask`.
#[inline]
#[must_use]
pub const fn field_prep(value: u32, mask: u32, shift: u32) -> u32 {
    value.wrapping_shl(shift) & mask
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_bits_are_covered_by_err_all() {
        let bits = SR_ERR_INTERNAL_MASK
            | SR_ERR_SLAVE_MASK
            | SR_ERR_DECODE_MASK
            | SR_ERR_FSZ_LESS_MASK
            | SR_ERR_LSZ_LESS_MASK
            | SR_ERR_SG_SLV_MASK
            | SR_ERR_SG_DEC_MASK
            | SR_ERR_FSZ_MORE_MASK;
        assert_eq!(bits, SR_ERR_ALL_MASK);
    }

    #[test]
    fn interrupt_bits_do_not_overlap_status_flags() {
        assert_eq!(IXR_ALL_MASK & (SR_ERR_ALL_MASK | SR_HALTED_MASK | SR_IDLE_MASK), 0);
        assert_eq!(IXR_COMPLETION_MASK | IXR_ERROR_MASK, IXR_ALL_MASK);
    }

    #[test]
    fn coalescing_fields_do_not_touch_control_bits() {
        let control = CR_RUNSTOP_MASK
            | CR_TAIL_EN_MASK
            | CR_RESET_MASK
            | CR_SYNC_EN_MASK
            | CR_FRMCNT_EN_MASK
            | CR_FSYNC_SRC_MASK
            | CR_GENLCK_SRC_MASK
            | CR_RD_PTR_MASK
            | CR_GENLCK_RPT_MASK
            | IXR_ALL_MASK;
        assert_eq!(control & (CR_DELAY_MASK | CR_FRMCNT_MASK), 0);
    }

    #[test]
    fn park_pointer_fields_are_disjoint() {
        let f = [
            PARKPTR_READREF_MASK,
            PARKPTR_WRTREF_MASK,
            PARKPTR_READSTR_MASK,
            PARKPTR_WRTSTR_MASK,
        ];
        for (i, a) in f.iter().enumerate() {
            for b in f.iter().skip(i + 1) {
                assert_eq!(a & b, 0);
            }
        }
    }

    #[test]
    fn field_helpers_round_trip_through_masks() {
        assert_eq!(field_prep(0x7, CR_RD_PTR_MASK, CR_RD_PTR_SHIFT), 0x700);
        assert_eq!(field_get(0x1F00_0000, PARKPTR_WRTSTR_MASK, PARKPTR_WRTSTR_SHIFT), 0x1F);
        // Values wider than the field are truncated, never spill over.
        assert_eq!(field_prep(0x1FF, CR_FRMCNT_MASK, CR_FRMCNT_SHIFT), 0x00FF_0000);
    }

    #[test]
    #[allow(clippy::assertions_on_constants)]
    fn channel_blocks_fit_before_engine_registers() {
        assert!(BUFTHRES_OFFSET < RX_OFFSET);
        assert!(TX_OFFSET + BUFTHRES_OFFSET < PARKPTR_OFFSET);
        assert!(RX_OFFSET + BUFTHRES_OFFSET < MM2S_ADDR_OFFSET);
    }
}
