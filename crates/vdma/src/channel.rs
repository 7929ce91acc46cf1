//! One VDMA channel (MM2S or S2MM).
//!
//! A [`Channel`] holds the driver-side state of one direction: its build
//! parameters, the last programmed geometry, and (in scatter-gather builds)
//! the descriptor ring. Register access goes through the [`RegisterIo`] the
//! caller passes in, which always covers the whole engine register block.
//!
//! # Lifecycle
//!
//! ```text
//! new ──▶ populate ──▶ init ──▶ reset ──▶ config ──▶ set_buffer_addr ──▶ start
//!                        ▲                   ▲                            │
//!                        │                   └──────────── stop ◀─────────┘
//!                        └──────── set_frm_store (frame count changed)
//! ```
//!
//! Every validating operation checks all of its inputs before the first
//! register or descriptor write, so a rejected call changes nothing.

use core::sync::atomic::{compiler_fence, Ordering};

use platform::mmio::{lower_32_bits, upper_32_bits, RegisterIo};

use crate::bd::{Bd, BdRing};
use crate::config::{
    AddrWidth, ChannelConfig, DebugFeatures, Direction, DmaSetup, GenLockRole, VdmaConfig,
};
use crate::error::VdmaError;
use crate::regs::{
    field_get, field_prep, BUFTHRES_OFFSET, CDESC_OFFSET, CR_DELAY_MASK, CR_DELAY_SHIFT,
    CR_FRMCNT_EN_MASK, CR_FRMCNT_MASK, CR_FRMCNT_SHIFT, CR_GENLCK_RPT_MASK, CR_OFFSET,
    CR_RD_PTR_MASK, CR_RD_PTR_SHIFT, CR_RESET_MASK, CR_RUNSTOP_MASK, CR_SYNC_EN_MASK,
    CR_TAIL_EN_MASK, DESC_LSB_MASK, FRMDLY_MASK, FRMDLY_SHIFT, FRMSTORE_MASK, FRMSTORE_OFFSET,
    FRM_MAX, HI_FRMBUF_OFFSET, HSIZE_OFFSET, MAX_HSIZE, MAX_STRIDE, MAX_VSIZE, MM2S_ADDR_OFFSET,
    PARKPTR_OFFSET, PARKPTR_READREF_MASK, PARKPTR_WRTREF_MASK, PARKPTR_WRTREF_SHIFT,
    REGINDEX_MASK, RX_OFFSET, S2MM_ADDR_OFFSET, SR_ERR_ALL_MASK, SR_HALTED_MASK, SR_IDLE_MASK,
    SR_OFFSET, START_ADDR_LEN, START_ADDR_LEN_64, START_ADDR_MSB_OFFSET, START_ADDR_OFFSET,
    STRD_FRMDLY_OFFSET, TDESC_OFFSET, TX_OFFSET, VSIZE_OFFSET,
};

/// Registers captured by [`Channel::register_dump`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegisterSnapshot {
    /// Control register.
    pub control: u32,
    /// Status register.
    pub status: u32,
    /// Current descriptor pointer.
    pub current_desc: u32,
    /// Tail descriptor pointer.
    pub tail_desc: u32,
    /// Frame store count register (0 if not built).
    pub frame_store: u32,
    /// Shared park pointer register.
    pub park_ptr: u32,
}

/// Driver state of one channel.
#[derive(Debug)]
pub struct Channel {
    direction: Direction,
    chan_base: u32,
    start_addr_base: u32,
    is_valid: bool,
    has_sg: bool,
    has_dre: bool,
    num_frames: usize,
    word_length: u32,
    stream_width: u32,
    line_buf_depth: u32,
    line_buf_threshold: u32,
    genlock: Option<GenLockRole>,
    debug: DebugFeatures,
    addr_width: AddrWidth,
    hsize: u32,
    vsize: u32,
    stride: u32,
    frame_delay: u32,
    ring: BdRing,
}

impl Channel {
    /// A channel that is not yet initialized.
    pub fn new(direction: Direction) -> Self {
        let (chan_base, start_addr_base) = match direction {
            Direction::Read => (TX_OFFSET, MM2S_ADDR_OFFSET),
            Direction::Write => (RX_OFFSET, S2MM_ADDR_OFFSET),
        };
        Self {
            direction,
            chan_base,
            start_addr_base,
            is_valid: false,
            has_sg: false,
            has_dre: false,
            num_frames: 0,
            word_length: 0,
            stream_width: 0,
            line_buf_depth: 0,
            line_buf_threshold: 0,
            genlock: None,
            debug: DebugFeatures::NONE,
            addr_width: AddrWidth::Bits32,
            hsize: 0,
            vsize: 0,
            stride: 0,
            frame_delay: 0,
            ring: BdRing::new(),
        }
    }

    /// Copy the build parameters of this direction into the channel.
    ///
    /// `has_sg` is the engine-level decision (legacy cores always use
    /// scatter-gather). Reads the line buffer threshold if a line buffer is
    /// present.
    pub(crate) fn populate<R: RegisterIo>(
        &mut self,
        io: &R,
        cfg: &ChannelConfig,
        vdma: &VdmaConfig,
        has_sg: bool,
    ) {
        self.has_sg = has_sg;
        self.has_dre = cfg.has_dre;
        self.num_frames = usize::from(vdma.max_frame_store_num);
        self.word_length = cfg.word_len_bits >> 3;
        self.stream_width = cfg.stream_width_bits >> 3;
        self.line_buf_depth = cfg.line_buf_depth;
        self.genlock = cfg.genlock;
        self.debug = if vdma.enable_all_dbg_features {
            DebugFeatures::ALL
        } else {
            cfg.debug
        };
        self.addr_width = vdma.addr_width;
        self.line_buf_threshold = if self.line_buf_depth > 0 {
            io.read(self.reg(BUFTHRES_OFFSET))
        } else {
            0
        };
    }

    /// Mark the channel as absent from the hardware build.
    pub(crate) fn invalidate(&mut self) {
        self.is_valid = false;
    }

    pub(crate) fn set_num_frames(&mut self, num_frames: usize) {
        self.num_frames = num_frames;
    }

    pub(crate) fn set_line_buf_threshold_cache(&mut self, value: u32) {
        self.line_buf_threshold = value;
    }

    // ── Register addressing ──────────────────────────────────────────────────

    /// Offset of channel register `offset` within the engine block.
    pub(crate) fn reg(&self, offset: u32) -> u32 {
        self.chan_base.wrapping_add(offset)
    }

    /// Offset of direct-mode register `offset` within the engine block.
    pub(crate) fn addr_reg(&self, offset: u32) -> u32 {
        self.start_addr_base.wrapping_add(offset)
    }

    // ── Initialization and reset ─────────────────────────────────────────────

    /// Rebuild the descriptor ring for the current frame count and mark the
    /// channel valid.
    ///
    /// Caller storage from [`set_bd_addrs`](Self::set_bd_addrs) is reused
    /// while it still holds every frame store.
    pub fn init(&mut self) {
        self.is_valid = false;
        self.ring.init(self.num_frames);
        self.is_valid = true;
    }

    /// Soft-reset the channel.
    ///
    /// Clears run state, gen-lock, frame counters and the hardware's
    /// descriptor pointers. The driver-side ring survives; the next
    /// [`start`](Self::start) reloads the pointers.
    pub fn reset<R: RegisterIo>(&self, io: &mut R) {
        io.write(self.reg(CR_OFFSET), CR_RESET_MASK);
    }

    /// True while the hardware is still executing a soft reset.
    pub fn reset_not_done<R: RegisterIo>(&self, io: &R) -> bool {
        io.read(self.reg(CR_OFFSET)) & CR_RESET_MASK != 0
    }

    // ── Status ───────────────────────────────────────────────────────────────

    /// True if run is commanded and the channel is not halted.
    pub fn is_running<R: RegisterIo>(&self, io: &R) -> bool {
        let halted = io.read(self.reg(SR_OFFSET)) & SR_HALTED_MASK != 0;
        let run = io.read(self.reg(CR_OFFSET)) & CR_RUNSTOP_MASK != 0;
        !halted && run
    }

    /// True if the channel is neither idle nor halted.
    pub fn is_busy<R: RegisterIo>(&self, io: &R) -> bool {
        let sr = io.read(self.reg(SR_OFFSET));
        sr & SR_IDLE_MASK == 0 && sr & SR_HALTED_MASK == 0
    }

    /// Raw status register.
    pub fn status<R: RegisterIo>(&self, io: &R) -> u32 {
        io.read(self.reg(SR_OFFSET))
    }

    /// Latched error bits.
    pub fn errors<R: RegisterIo>(&self, io: &R) -> u32 {
        io.read(self.reg(SR_OFFSET)) & SR_ERR_ALL_MASK
    }

    /// Clear the latched error bits in `mask` (write-one-to-clear).
    ///
    /// Only error bits are written, so pending interrupt bits are untouched.
    pub fn clear_errors<R: RegisterIo>(&self, io: &mut R, mask: u32) {
        let bits = mask & SR_ERR_ALL_MASK;
        if bits != 0 {
            io.write(self.reg(SR_OFFSET), bits);
        }
    }

    // ── Transfer setup ───────────────────────────────────────────────────────

    /// Program geometry, circular/park mode and gen-lock options.
    ///
    /// Without a data realignment engine, the horizontal size is rounded up
    /// to the memory word length (write channel) or stream width (read
    /// channel), and the stride to the word length. The rounded values are
    /// what [`hsize`](Self::hsize) and [`stride`](Self::stride) report
    /// afterwards; `setup` is not modified.
    pub fn config<R: RegisterIo>(&mut self, io: &mut R, setup: &DmaSetup) -> Result<(), VdmaError> {
        if !self.is_valid {
            return Err(VdmaError::Failure);
        }
        if self.has_sg && self.is_busy(io) {
            return Err(VdmaError::DeviceBusy);
        }

        let (hsize, stride) = self.aligned_geometry(setup.hori_size, setup.stride)?;
        check_geometry(setup.vert_size, hsize, stride, setup.frame_delay)?;
        if setup.point_num > field_get(CR_RD_PTR_MASK, CR_RD_PTR_MASK, CR_RD_PTR_SHIFT) {
            return Err(VdmaError::InvalidParam);
        }
        if !setup.circular {
            if self.has_sg && !self.is_running(io) {
                return Err(VdmaError::InvalidParam);
            }
            if setup.fixed_frame_store > FRM_MAX {
                return Err(VdmaError::InvalidParam);
            }
        }

        if !setup.circular {
            let (mask, value) = park_ref_field(self.direction, setup.fixed_frame_store);
            io.write_field(PARKPTR_OFFSET, mask, value);
        }

        let mut cr = io.read(self.reg(CR_OFFSET))
            & !(CR_TAIL_EN_MASK
                | CR_SYNC_EN_MASK
                | CR_FRMCNT_EN_MASK
                | CR_RD_PTR_MASK
                | CR_GENLCK_RPT_MASK);
        if setup.circular {
            cr |= CR_TAIL_EN_MASK;
        }
        if setup.enable_sync && self.genlock != Some(GenLockRole::Master) {
            cr |= CR_SYNC_EN_MASK;
        }
        if setup.genlock_repeat && self.genlock.is_some_and(GenLockRole::is_master) {
            cr |= CR_GENLCK_RPT_MASK;
        }
        if setup.enable_frame_counter {
            cr |= CR_FRMCNT_EN_MASK;
        }
        cr |= field_prep(setup.point_num, CR_RD_PTR_MASK, CR_RD_PTR_SHIFT);
        io.write(self.reg(CR_OFFSET), cr);

        if self.has_sg {
            for bd in self.ring.iter_mut() {
                bd.set_vsize(setup.vert_size)?;
                bd.set_hsize(hsize)?;
                bd.set_stride(stride)?;
                bd.set_frame_delay(setup.frame_delay)?;
            }
        } else {
            io.write(self.addr_reg(HSIZE_OFFSET), hsize);
            io.write(
                self.addr_reg(STRD_FRMDLY_OFFSET),
                field_prep(setup.frame_delay, FRMDLY_MASK, FRMDLY_SHIFT) | stride,
            );
        }

        self.vsize = setup.vert_size;
        self.hsize = hsize;
        self.stride = stride;
        self.frame_delay = setup.frame_delay;
        Ok(())
    }

    fn aligned_geometry(&self, hsize: u32, stride: u32) -> Result<(u32, u32), VdmaError> {
        if self.has_dre {
            return Ok((hsize, stride));
        }
        let h_align = match self.direction {
            Direction::Write => self.word_length,
            Direction::Read => self.stream_width,
        };
        let hsize = align_up(hsize, h_align).ok_or(VdmaError::InvalidParam)?;
        let stride = align_up(stride, self.word_length).ok_or(VdmaError::InvalidParam)?;
        Ok((hsize, stride))
    }

    /// Load frame store start addresses, one per frame, in ring order.
    ///
    /// Between 1 and [`num_frames`](Self::num_frames) addresses are accepted.
    /// Without a data realignment engine every address must be a multiple of
    /// the memory word length; with 32-bit addressing none may exceed
    /// `u32::MAX`.
    pub fn set_buffer_addr<R: RegisterIo>(
        &mut self,
        io: &mut R,
        addrs: &[u64],
    ) -> Result<(), VdmaError> {
        if !self.is_valid {
            return Err(VdmaError::Failure);
        }
        if addrs.is_empty() || addrs.len() > self.num_frames {
            return Err(VdmaError::InvalidParam);
        }
        for &addr in addrs {
            self.check_buffer_addr(addr)?;
        }

        if self.has_sg {
            for (bd, &addr) in self.ring.iter_mut().zip(addrs) {
                bd.set_addr(addr);
            }
            return Ok(());
        }

        // Direct mode: start addresses live in two banks selected by
        // HI_FRMBUF, each holding half of the maximum frame store count.
        let bank_size = self.addr_width.max_frame_stores() >> 1;
        let entry_len = match self.addr_width {
            AddrWidth::Bits32 => START_ADDR_LEN,
            AddrWidth::Bits64 => START_ADDR_LEN_64,
        };
        let mut high_bank = false;
        for (i, &addr) in addrs.iter().enumerate() {
            let slot = if i >= bank_size {
                if !high_bank {
                    io.write(self.reg(HI_FRMBUF_OFFSET), REGINDEX_MASK);
                    high_bank = true;
                }
                i.wrapping_sub(bank_size)
            } else {
                i
            };
            let step = slot_u32(slot).wrapping_mul(entry_len);
            io.write(
                self.addr_reg(START_ADDR_OFFSET.wrapping_add(step)),
                lower_32_bits(addr),
            );
            if self.addr_width == AddrWidth::Bits64 {
                io.write(
                    self.addr_reg(START_ADDR_MSB_OFFSET.wrapping_add(step)),
                    upper_32_bits(addr),
                );
            }
        }
        if high_bank {
            io.write(self.reg(HI_FRMBUF_OFFSET), 0);
        }
        Ok(())
    }

    fn check_buffer_addr(&self, addr: u64) -> Result<(), VdmaError> {
        if self.addr_width == AddrWidth::Bits32 && addr > u64::from(u32::MAX) {
            return Err(VdmaError::InvalidParam);
        }
        if !self.has_dre
            && self.word_length > 1
            && addr.checked_rem(u64::from(self.word_length)) != Some(0)
        {
            #[cfg(feature = "defmt")]
            defmt::warn!(
                "vdma {=str}: unaligned frame address {=u64:#x} (word {=u32})",
                self.direction.name(),
                addr,
                self.word_length
            );
            #[cfg(feature = "tracing")]
            tracing::warn!(
                channel = self.direction.name(),
                addr,
                word_length = self.word_length,
                "unaligned frame address"
            );
            return Err(VdmaError::InvalidParam);
        }
        Ok(())
    }

    // ── Run control ──────────────────────────────────────────────────────────

    /// Start (or continue) the channel.
    ///
    /// A halted channel is pointed at the head of the ring (scatter-gather)
    /// and then commanded to run. A ring in the channel's own storage is
    /// relinked first if the channel has moved since it was linked. Once running, scatter-gather transfers
    /// are kicked by loading the tail pointer and direct-mode transfers by
    /// writing the vertical size.
    pub fn start<R: RegisterIo>(&mut self, io: &mut R) -> Result<(), VdmaError> {
        if !self.is_valid {
            return Err(VdmaError::Failure);
        }
        if self.has_sg && self.is_busy(io) {
            return Err(VdmaError::DeviceBusy);
        }
        if self.has_sg {
            self.ring.follow_storage();
        }

        // Descriptor and buffer updates must land before the engine sees
        // a new pointer.
        compiler_fence(Ordering::SeqCst);

        if !self.is_running(io) {
            if self.has_sg {
                io.write(self.reg(CDESC_OFFSET), self.ring.head() & DESC_LSB_MASK);
            }
            io.set_bits(self.reg(CR_OFFSET), CR_RUNSTOP_MASK);
        }

        if !self.is_running(io) {
            #[cfg(feature = "defmt")]
            defmt::error!(
                "vdma {=str}: failed to start, SR={=u32:#x}",
                self.direction.name(),
                self.status(io)
            );
            #[cfg(feature = "tracing")]
            tracing::error!(
                channel = self.direction.name(),
                status = self.status(io),
                "failed to start"
            );
            return Err(VdmaError::DmaError);
        }

        if self.has_sg {
            io.write(self.reg(TDESC_OFFSET), self.ring.tail() & DESC_LSB_MASK);
        } else {
            io.write(self.addr_reg(VSIZE_OFFSET), self.vsize);
        }
        Ok(())
    }

    /// Stop the channel. Does nothing if it is not running.
    pub fn stop<R: RegisterIo>(&self, io: &mut R) {
        if self.is_running(io) {
            io.clear_bits(self.reg(CR_OFFSET), CR_RUNSTOP_MASK);
        }
    }

    /// [`config`](Self::config), [`set_buffer_addr`](Self::set_buffer_addr)
    /// with the first [`num_frames`](Self::num_frames) addresses of `setup`,
    /// then [`start`](Self::start).
    pub fn start_transfer<R: RegisterIo>(
        &mut self,
        io: &mut R,
        setup: &DmaSetup,
    ) -> Result<(), VdmaError> {
        if !self.is_valid {
            return Err(VdmaError::Failure);
        }
        if self.has_sg && self.is_busy(io) {
            return Err(VdmaError::DeviceBusy);
        }
        let addrs = setup
            .frame_store_start_addr
            .get(..self.num_frames)
            .ok_or(VdmaError::InvalidParam)?;
        self.config(io, setup)?;
        self.set_buffer_addr(io, addrs)?;
        self.start(io)
    }

    /// Switch from park mode to circular mode. The channel must be running.
    pub fn start_parking<R: RegisterIo>(&self, io: &mut R) -> Result<(), VdmaError> {
        if !self.is_running(io) {
            return Err(VdmaError::Failure);
        }
        io.clear_bits(self.reg(CR_OFFSET), CR_TAIL_EN_MASK);
        Ok(())
    }

    /// Return to circular mode.
    pub fn stop_parking<R: RegisterIo>(&self, io: &mut R) {
        io.set_bits(self.reg(CR_OFFSET), CR_TAIL_EN_MASK);
    }

    /// Enable the frame-count stop condition.
    pub fn start_frm_cnt_enable<R: RegisterIo>(&self, io: &mut R) {
        io.set_bits(self.reg(CR_OFFSET), CR_FRMCNT_EN_MASK);
    }

    /// Rebuild the descriptor ring in `storage`, which the DMA master
    /// reaches at `bus_base`.
    ///
    /// The descriptors are zeroed and linked, so geometry and addresses must
    /// be programmed again afterwards; every later setter writes to
    /// `storage`. `bus_base` must be 32-byte aligned and `storage` must hold
    /// [`num_frames`](Self::num_frames) descriptors.
    pub fn set_bd_addrs<R: RegisterIo>(
        &mut self,
        io: &R,
        storage: &'static mut [Bd],
        bus_base: u32,
    ) -> Result<(), VdmaError> {
        if self.has_sg && self.is_busy(io) {
            return Err(VdmaError::DeviceBusy);
        }
        if bus_base & !DESC_LSB_MASK != 0 {
            return Err(VdmaError::InvalidParam);
        }
        let was_valid = self.is_valid;
        self.is_valid = false;
        let linked = self.ring.attach(storage, bus_base);
        self.is_valid = was_valid;
        linked
    }

    // ── Interrupt coalescing ─────────────────────────────────────────────────

    /// Program the interrupt frame-count and delay-timer thresholds.
    ///
    /// A zero frame count is rejected before the counters are looked at;
    /// both the frame and the delay counter must be built in.
    pub fn set_frm_cnt<R: RegisterIo>(
        &self,
        io: &mut R,
        frame_count: u8,
        delay_count: u8,
    ) -> Result<(), VdmaError> {
        self.check_frm_cnt(frame_count)?;
        let value = field_prep(u32::from(frame_count), CR_FRMCNT_MASK, CR_FRMCNT_SHIFT)
            | field_prep(u32::from(delay_count), CR_DELAY_MASK, CR_DELAY_SHIFT);
        io.modify(self.reg(CR_OFFSET), CR_FRMCNT_MASK | CR_DELAY_MASK, value);
        Ok(())
    }

    pub(crate) fn check_frm_cnt(&self, frame_count: u8) -> Result<(), VdmaError> {
        if !self.is_valid {
            return Err(VdmaError::Failure);
        }
        if frame_count == 0 {
            return Err(VdmaError::InvalidParam);
        }
        if !self.debug.contains(DebugFeatures::FRM_CNTR) {
            return Err(VdmaError::NoFeature);
        }
        if !self.debug.contains(DebugFeatures::DLY_CNTR) {
            return Err(VdmaError::NoFeature);
        }
        Ok(())
    }

    /// Current `(frame_count, delay_count)` thresholds. Counters missing from
    /// the build read as zero.
    pub fn frm_cnt<R: RegisterIo>(&self, io: &R) -> (u8, u8) {
        let cr = io.read(self.reg(CR_OFFSET));
        let frames = if self.debug.contains(DebugFeatures::FRM_CNTR) {
            field_u8(cr, CR_FRMCNT_MASK, CR_FRMCNT_SHIFT)
        } else {
            0
        };
        let delay = if self.debug.contains(DebugFeatures::DLY_CNTR) {
            field_u8(cr, CR_DELAY_MASK, CR_DELAY_SHIFT)
        } else {
            0
        };
        (frames, delay)
    }

    /// Raw frame store count register.
    pub(crate) fn read_frm_store<R: RegisterIo>(&self, io: &R) -> u32 {
        io.read(self.reg(FRMSTORE_OFFSET)) & FRMSTORE_MASK
    }

    // ── Diagnostics ──────────────────────────────────────────────────────────

    /// Capture and log the channel's registers.
    pub fn register_dump<R: RegisterIo>(&self, io: &R) -> RegisterSnapshot {
        let snapshot = RegisterSnapshot {
            control: io.read(self.reg(CR_OFFSET)),
            status: io.read(self.reg(SR_OFFSET)),
            current_desc: io.read(self.reg(CDESC_OFFSET)),
            tail_desc: io.read(self.reg(TDESC_OFFSET)),
            frame_store: if self.debug.contains(DebugFeatures::FRMSTORE) {
                self.read_frm_store(io)
            } else {
                0
            },
            park_ptr: io.read(PARKPTR_OFFSET),
        };
        #[cfg(feature = "defmt")]
        defmt::info!("vdma {=str}: {}", self.direction.name(), snapshot);
        #[cfg(feature = "tracing")]
        tracing::info!(
            channel = self.direction.name(),
            control = snapshot.control,
            status = snapshot.status,
            current_desc = snapshot.current_desc,
            tail_desc = snapshot.tail_desc,
            frame_store = snapshot.frame_store,
            park_ptr = snapshot.park_ptr,
            "register dump"
        );
        snapshot
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    /// Direction of this channel.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// True once the channel is populated and its ring is linked.
    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    /// Scatter-gather mode.
    pub fn has_sg(&self) -> bool {
        self.has_sg
    }

    /// Data realignment engine present.
    pub fn has_dre(&self) -> bool {
        self.has_dre
    }

    /// Frame stores in use.
    pub fn num_frames(&self) -> usize {
        self.num_frames
    }

    /// Memory word length in bytes.
    pub fn word_length(&self) -> u32 {
        self.word_length
    }

    /// Stream width in bytes.
    pub fn stream_width(&self) -> u32 {
        self.stream_width
    }

    /// Line buffer depth in bytes.
    pub fn line_buf_depth(&self) -> u32 {
        self.line_buf_depth
    }

    /// Last known line buffer threshold.
    pub fn line_buf_threshold(&self) -> u32 {
        self.line_buf_threshold
    }

    /// Gen-lock role.
    pub fn genlock(&self) -> Option<GenLockRole> {
        self.genlock
    }

    /// Debug registers available.
    pub fn debug_features(&self) -> DebugFeatures {
        self.debug
    }

    /// Address width.
    pub fn addr_width(&self) -> AddrWidth {
        self.addr_width
    }

    /// Programmed horizontal size, after alignment.
    pub fn hsize(&self) -> u32 {
        self.hsize
    }

    /// Programmed vertical size.
    pub fn vsize(&self) -> u32 {
        self.vsize
    }

    /// Programmed stride, after alignment.
    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// Programmed frame delay.
    pub fn frame_delay(&self) -> u32 {
        self.frame_delay
    }

    /// Descriptor ring.
    pub fn ring(&self) -> &BdRing {
        &self.ring
    }
}

/// Round `value` up to a multiple of `align`, with a minimum of one `align`.
///
/// `align` of 0 or 1 leaves `value` unchanged. Returns `None` on overflow.
pub fn align_up(value: u32, align: u32) -> Option<u32> {
    if align <= 1 {
        return Some(value);
    }
    value.checked_next_multiple_of(align).map(|v| v.max(align))
}

/// Park pointer field and positioned value selecting `frame` for `dir`.
pub(crate) fn park_ref_field(dir: Direction, frame: u32) -> (u32, u32) {
    match dir {
        Direction::Read => (PARKPTR_READREF_MASK, frame & PARKPTR_READREF_MASK),
        Direction::Write => (
            PARKPTR_WRTREF_MASK,
            field_prep(frame, PARKPTR_WRTREF_MASK, PARKPTR_WRTREF_SHIFT),
        ),
    }
}

fn check_geometry(vsize: u32, hsize: u32, stride: u32, delay: u32) -> Result<(), VdmaError> {
    let ok = (1..=MAX_VSIZE).contains(&vsize)
        && (1..=MAX_HSIZE).contains(&hsize)
        && (1..=MAX_STRIDE).contains(&stride)
        && delay <= FRM_MAX;
    if ok {
        Ok(())
    } else {
        Err(VdmaError::InvalidParam)
    }
}

fn field_u8(reg: u32, mask: u32, shift: u32) -> u8 {
    u8::try_from(field_get(reg, mask, shift)).unwrap_or(u8::MAX)
}

#[allow(clippy::cast_possible_truncation)] // Safety: slot < MAX_FRAMESTORE (32)
fn slot_u32(slot: usize) -> u32 {
    slot as u32
}
