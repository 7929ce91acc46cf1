//! Register-level VDMA model for tests.
//!
//! [`MockVdma`] is a [`MockRegisters`] window with just enough channel
//! behaviour for the driver's state machine:
//!
//! - writing `CR.RESET` clears the control register, halts the channel and
//!   drops latched errors (unless the channel is stuck in reset)
//! - setting `CR.RUNSTOP` clears `SR.HALTED` (unless the channel refuses to
//!   run); clearing it halts the channel
//! - `SR` is write-one-to-clear for interrupt and error bits, and latched
//!   errors re-assert themselves together with the error interrupt
//!
//! Everything else behaves as plain memory. Like the platform mocks this
//! builds for `no_std`, so integration tests and host tools can use it.

use platform::mmio::RegisterIo;
use platform::mocks::{MockRegisters, RegisterWrite};

use crate::config::{
    AddrWidth, ChannelConfig, DebugFeatures, Direction, FsyncMode, GenLockRole, VdmaConfig,
};
use crate::regs::{
    CR_OFFSET, CR_RESET_MASK, CR_RUNSTOP_MASK, IXR_ALL_MASK, IXR_ERROR_MASK, RX_OFFSET,
    SR_ERR_ALL_MASK, SR_HALTED_MASK, SR_IDLE_MASK, SR_OFFSET, TX_OFFSET, VERSION_OFFSET,
};

/// 32-bit words in the modelled register window (0x000..0x200).
pub const WINDOW_WORDS: usize = 128;

/// Version register value of a current core (v6.3).
pub const DEFAULT_VERSION: u32 = 0x6300_0000;

#[derive(Debug, Clone, Copy, Default)]
struct ChannelModel {
    stuck_in_reset: bool,
    refuse_run: bool,
    idle: bool,
    latched: u32,
}

/// Register model of one VDMA instance.
pub struct MockVdma {
    regs: MockRegisters<WINDOW_WORDS>,
    read: ChannelModel,
    write: ChannelModel,
}

impl MockVdma {
    /// A current-version core with both channels halted.
    pub fn new() -> Self {
        Self::with_version(DEFAULT_VERSION)
    }

    /// A core reporting `version` in its version register.
    pub fn with_version(version: u32) -> Self {
        let mut regs = MockRegisters::new();
        regs.poke(VERSION_OFFSET, version);
        regs.poke(TX_OFFSET.wrapping_add(SR_OFFSET), SR_HALTED_MASK);
        regs.poke(RX_OFFSET.wrapping_add(SR_OFFSET), SR_HALTED_MASK);
        Self {
            regs,
            read: ChannelModel::default(),
            write: ChannelModel::default(),
        }
    }

    /// Underlying register file.
    pub fn regs(&self) -> &MockRegisters<WINDOW_WORDS> {
        &self.regs
    }

    /// Current value at `offset`.
    pub fn peek(&self, offset: u32) -> u32 {
        self.regs.peek(offset)
    }

    /// Overwrite `offset` without logging or modelling side effects.
    pub fn poke(&mut self, offset: u32, value: u32) {
        self.regs.poke(offset, value);
    }

    /// All logged driver writes, oldest first.
    pub fn writes(&self) -> &[RegisterWrite] {
        self.regs.writes()
    }

    /// Forget the write log.
    pub fn clear_writes(&mut self) {
        self.regs.clear_writes();
    }

    /// Report `dir` as idle (or not) while it is running.
    pub fn set_idle(&mut self, dir: Direction, idle: bool) {
        self.model_mut(dir).idle = idle;
        let sr = status_offset(dir);
        let value = self.regs.peek(sr);
        let value = if idle && value & SR_HALTED_MASK == 0 {
            value | SR_IDLE_MASK
        } else {
            value & !SR_IDLE_MASK
        };
        self.regs.poke(sr, value);
    }

    /// Latch the error bits in `bits` on `dir` and raise the error interrupt.
    pub fn inject_error(&mut self, dir: Direction, bits: u32) {
        let model = self.model_mut(dir);
        model.latched |= bits & SR_ERR_ALL_MASK;
        let latched = model.latched;
        let sr = status_offset(dir);
        let value = self.regs.peek(sr) | latched | IXR_ERROR_MASK;
        self.regs.poke(sr, value);
    }

    /// Mark the interrupt bits in `bits` pending on `dir`.
    pub fn raise(&mut self, dir: Direction, bits: u32) {
        let sr = status_offset(dir);
        let value = self.regs.peek(sr) | (bits & IXR_ALL_MASK);
        self.regs.poke(sr, value);
    }

    /// Make soft resets of `dir` never complete.
    pub fn stick_in_reset(&mut self, dir: Direction, stuck: bool) {
        self.model_mut(dir).stuck_in_reset = stuck;
    }

    /// Make `dir` stay halted when commanded to run.
    pub fn refuse_run(&mut self, dir: Direction, refuse: bool) {
        self.model_mut(dir).refuse_run = refuse;
    }

    fn model_mut(&mut self, dir: Direction) -> &mut ChannelModel {
        match dir {
            Direction::Read => &mut self.read,
            Direction::Write => &mut self.write,
        }
    }

    fn write_control(&mut self, dir: Direction, value: u32) {
        let model = *self.model_mut(dir);
        let cr = control_offset(dir);
        let sr = status_offset(dir);
        if value & CR_RESET_MASK != 0 {
            if model.stuck_in_reset {
                self.regs.poke(cr, CR_RESET_MASK);
                return;
            }
            self.regs.poke(cr, 0);
            self.regs.poke(sr, SR_HALTED_MASK);
            self.model_mut(dir).latched = 0;
            return;
        }
        self.regs.poke(cr, value);
        let status = self.regs.peek(sr);
        let status = if value & CR_RUNSTOP_MASK != 0 && !model.refuse_run {
            let running = status & !SR_HALTED_MASK;
            if model.idle {
                running | SR_IDLE_MASK
            } else {
                running & !SR_IDLE_MASK
            }
        } else if value & CR_RUNSTOP_MASK == 0 {
            (status | SR_HALTED_MASK) & !SR_IDLE_MASK
        } else {
            status
        };
        self.regs.poke(sr, status);
    }

    fn write_status(&mut self, dir: Direction, value: u32) {
        let model = self.model_mut(dir);
        model.latched &= !(value & SR_ERR_ALL_MASK);
        let latched = model.latched;
        let sr = status_offset(dir);
        let mut status = self.regs.peek(sr) & !(value & (IXR_ALL_MASK | SR_ERR_ALL_MASK));
        if latched != 0 {
            status |= latched | IXR_ERROR_MASK;
        }
        self.regs.poke(sr, status);
    }
}

impl Default for MockVdma {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterIo for MockVdma {
    fn read(&self, offset: u32) -> u32 {
        self.regs.peek(offset)
    }

    fn write(&mut self, offset: u32, value: u32) {
        self.regs.write(offset, value);
        for dir in Direction::ALL {
            if offset == control_offset(dir) {
                self.write_control(dir, value);
            } else if offset == status_offset(dir) {
                self.write_status(dir, value);
            }
        }
    }
}

fn channel_base(dir: Direction) -> u32 {
    match dir {
        Direction::Read => TX_OFFSET,
        Direction::Write => RX_OFFSET,
    }
}

fn control_offset(dir: Direction) -> u32 {
    channel_base(dir).wrapping_add(CR_OFFSET)
}

fn status_offset(dir: Direction) -> u32 {
    channel_base(dir).wrapping_add(SR_OFFSET)
}

/// Build parameters for tests: both channels, three frame stores, 64-bit
/// memory words and streams, a 4 KiB line buffer, every debug register,
/// and a master (read) / slave (write) gen-lock pair.
pub fn test_config(has_sg: bool) -> VdmaConfig {
    let channel = |genlock| ChannelConfig {
        has_dre: false,
        word_len_bits: 64,
        stream_width_bits: 64,
        line_buf_depth: 4096,
        genlock: Some(genlock),
        debug: DebugFeatures::NONE,
    };
    VdmaConfig {
        device_id: 0x7F,
        base_address: 0,
        max_frame_store_num: 3,
        mm2s: Some(channel(GenLockRole::Master)),
        s2mm: Some(channel(GenLockRole::Slave)),
        has_sg,
        enable_vid_param_read: false,
        use_fsync: FsyncMode::Both,
        flush_on_fsync: true,
        internal_genlock: true,
        s2mm_sof: true,
        enable_all_dbg_features: true,
        addr_width: AddrWidth::Bits32,
    }
}
