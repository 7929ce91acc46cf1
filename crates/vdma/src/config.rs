//! Hardware build configuration, transfer setup records, and the device table.
//!
//! A [`VdmaConfig`] describes one VDMA instance as synthesized: which
//! directions exist, their data widths, and which optional registers were
//! built in. It is static data produced alongside the bitstream and looked up
//! by device id with [`lookup_config`].

use crate::error::VdmaError;
use crate::regs::MAX_FRAMESTORE;

// ── Direction ────────────────────────────────────────────────────────────────

/// Transfer direction, selecting one of the engine's two channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// MM2S: memory to stream (frames are read from memory).
    Read,
    /// S2MM: stream to memory (frames are written to memory).
    Write,
}

impl Direction {
    /// Both directions, read first.
    pub const ALL: [Direction; 2] = [Direction::Read, Direction::Write];

    /// Raw code used on the host interface.
    pub const fn code(self) -> u32 {
        match self {
            Self::Write => 1,
            Self::Read => 2,
        }
    }

    /// Short channel name used in log output.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Read => "mm2s",
            Self::Write => "s2mm",
        }
    }

    /// The opposite channel.
    pub const fn other(self) -> Self {
        match self {
            Self::Read => Self::Write,
            Self::Write => Self::Read,
        }
    }
}

impl TryFrom<u32> for Direction {
    type Error = VdmaError;

    /// Decode a host direction code: 1 = write, 2 = read.
    fn try_from(code: u32) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::Write),
            2 => Ok(Self::Read),
            _ => Err(VdmaError::InvalidParam),
        }
    }
}

// ── Build options ────────────────────────────────────────────────────────────

/// Gen-lock role of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GenLockRole {
    /// Drives the frame cadence.
    Master,
    /// Follows a master.
    Slave,
    /// Dynamic master.
    DynamicMaster,
    /// Dynamic slave.
    DynamicSlave,
}

impl GenLockRole {
    /// Master or dynamic master.
    pub const fn is_master(self) -> bool {
        matches!(self, Self::Master | Self::DynamicMaster)
    }

    /// True when `self` and `other` form a master/slave pair of the same kind.
    pub const fn complements(self, other: Self) -> bool {
        matches!(
            (self, other),
            (Self::Master, Self::Slave)
                | (Self::Slave, Self::Master)
                | (Self::DynamicMaster, Self::DynamicSlave)
                | (Self::DynamicSlave, Self::DynamicMaster)
        )
    }
}

/// Which channels have a selectable frame-sync input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FsyncMode {
    /// No frame-sync inputs.
    None,
    /// Both channels.
    Both,
    /// MM2S only.
    ReadOnly,
    /// S2MM only.
    WriteOnly,
}

impl FsyncMode {
    /// True if `dir` has a frame-sync input.
    pub const fn allows(self, dir: Direction) -> bool {
        match (self, dir) {
            (Self::Both, _) => true,
            (Self::ReadOnly, Direction::Read) | (Self::WriteOnly, Direction::Write) => true,
            _ => false,
        }
    }
}

/// Width of buffer and descriptor addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AddrWidth {
    /// 32-bit addressing.
    Bits32,
    /// Addresses wider than 32 bits (low and high register words).
    Bits64,
}

impl AddrWidth {
    /// Frame stores supported with this address width.
    pub const fn max_frame_stores(self) -> usize {
        match self {
            Self::Bits32 => MAX_FRAMESTORE,
            Self::Bits64 => crate::regs::MAX_FRAMESTORE_64,
        }
    }
}

/// Optional debug registers compiled into one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DebugFeatures(u8);

impl DebugFeatures {
    /// Line-buffer threshold register.
    pub const THRESHOLD: Self = Self(0x1);
    /// Frame-store count register.
    pub const FRMSTORE: Self = Self(0x2);
    /// Interrupt frame counter.
    pub const FRM_CNTR: Self = Self(0x4);
    /// Interrupt delay counter.
    pub const DLY_CNTR: Self = Self(0x8);
    /// No debug registers.
    pub const NONE: Self = Self(0);
    /// Every debug register.
    pub const ALL: Self = Self(0xF);

    /// Raw flag bits.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// True if every flag in `other` is present.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Union of two flag sets.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl core::ops::BitOr for DebugFeatures {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// Build parameters of one direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelConfig {
    /// Data realignment engine present (unaligned addresses allowed).
    pub has_dre: bool,
    /// Memory-map data width in bits.
    pub word_len_bits: u32,
    /// AXI4-Stream data width in bits.
    pub stream_width_bits: u32,
    /// Line buffer depth in bytes (0 = no line buffer).
    pub line_buf_depth: u32,
    /// Gen-lock role, if gen-lock is used.
    pub genlock: Option<GenLockRole>,
    /// Debug registers built in.
    pub debug: DebugFeatures,
}

/// Build parameters of one VDMA instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VdmaConfig {
    /// Device id used by [`lookup_config`].
    pub device_id: u16,
    /// Physical base address of the register block.
    pub base_address: usize,
    /// Frame stores per channel.
    pub max_frame_store_num: u16,
    /// MM2S channel, if built.
    pub mm2s: Option<ChannelConfig>,
    /// S2MM channel, if built.
    pub s2mm: Option<ChannelConfig>,
    /// Scatter-gather engine present.
    pub has_sg: bool,
    /// Video parameters can be read back.
    pub enable_vid_param_read: bool,
    /// Frame-sync inputs.
    pub use_fsync: FsyncMode,
    /// Flush on frame sync.
    pub flush_on_fsync: bool,
    /// Internal gen-lock bus between the channels.
    pub internal_genlock: bool,
    /// S2MM start-of-frame taken from TUSER.
    pub s2mm_sof: bool,
    /// Build every debug register regardless of the per-channel flags.
    pub enable_all_dbg_features: bool,
    /// Address width.
    pub addr_width: AddrWidth,
}

impl VdmaConfig {
    /// Build parameters of `dir`, if that channel exists.
    pub const fn channel(&self, dir: Direction) -> Option<&ChannelConfig> {
        match dir {
            Direction::Read => self.mm2s.as_ref(),
            Direction::Write => self.s2mm.as_ref(),
        }
    }
}

// ── Device table ─────────────────────────────────────────────────────────────

/// Video VDMA of the base overlay (HDMI in and out).
const BASE_VIDEO_VDMA: VdmaConfig = VdmaConfig {
    device_id: 0,
    base_address: 0x4300_0000,
    max_frame_store_num: 3,
    mm2s: Some(ChannelConfig {
        has_dre: false,
        word_len_bits: 64,
        stream_width_bits: 24,
        line_buf_depth: 4096,
        genlock: Some(GenLockRole::Master),
        debug: DebugFeatures::NONE,
    }),
    s2mm: Some(ChannelConfig {
        has_dre: false,
        word_len_bits: 64,
        stream_width_bits: 24,
        line_buf_depth: 4096,
        genlock: Some(GenLockRole::Slave),
        debug: DebugFeatures::NONE,
    }),
    has_sg: false,
    enable_vid_param_read: false,
    use_fsync: FsyncMode::Both,
    flush_on_fsync: true,
    internal_genlock: true,
    s2mm_sof: true,
    enable_all_dbg_features: true,
    addr_width: AddrWidth::Bits32,
};

/// Camera capture VDMA (write only).
const CAMERA_VDMA: VdmaConfig = VdmaConfig {
    device_id: 1,
    base_address: 0x4301_0000,
    max_frame_store_num: 3,
    mm2s: None,
    s2mm: Some(ChannelConfig {
        has_dre: false,
        word_len_bits: 128,
        stream_width_bits: 32,
        line_buf_depth: 2048,
        genlock: None,
        debug: DebugFeatures::NONE,
    }),
    has_sg: false,
    enable_vid_param_read: false,
    use_fsync: FsyncMode::WriteOnly,
    flush_on_fsync: true,
    internal_genlock: true,
    s2mm_sof: true,
    enable_all_dbg_features: true,
    addr_width: AddrWidth::Bits32,
};

/// VDMA instances of the hardware build.
pub static CONFIG_TABLE: [VdmaConfig; 2] = [BASE_VIDEO_VDMA, CAMERA_VDMA];

/// Find the build parameters of `device_id`.
pub fn lookup_config(device_id: u16) -> Option<&'static VdmaConfig> {
    CONFIG_TABLE.iter().find(|c| c.device_id == device_id)
}

// ── Transfer setup ───────────────────────────────────────────────────────────

/// Per-transfer setup of one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DmaSetup {
    /// Lines per frame.
    pub vert_size: u32,
    /// Bytes per line.
    pub hori_size: u32,
    /// Bytes between the starts of consecutive lines.
    pub stride: u32,
    /// Frame delay behind the gen-lock master.
    pub frame_delay: u32,
    /// Circular mode; `false` parks on [`fixed_frame_store`](Self::fixed_frame_store).
    pub circular: bool,
    /// Gen-lock sync enable.
    pub enable_sync: bool,
    /// Master to follow (read-pointer field).
    pub point_num: u32,
    /// Stop after the frame count interrupt threshold.
    pub enable_frame_counter: bool,
    /// Start address of every frame store.
    pub frame_store_start_addr: [u64; MAX_FRAMESTORE],
    /// Frame to park on.
    pub fixed_frame_store: u32,
    /// Gen-lock repeat on frame error (masters only).
    pub genlock_repeat: bool,
}

impl Default for DmaSetup {
    fn default() -> Self {
        Self {
            vert_size: 0,
            hori_size: 0,
            stride: 0,
            frame_delay: 0,
            circular: true,
            enable_sync: false,
            point_num: 0,
            enable_frame_counter: false,
            frame_store_start_addr: [0; MAX_FRAMESTORE],
            fixed_frame_store: 0,
            genlock_repeat: false,
        }
    }
}

/// Interrupt coalescing thresholds for both channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameCounter {
    /// MM2S frames per interrupt.
    pub read_frame_count: u8,
    /// MM2S delay timer.
    pub read_delay_timer_count: u8,
    /// S2MM frames per interrupt.
    pub write_frame_count: u8,
    /// S2MM delay timer.
    pub write_delay_timer_count: u8,
}

/// Frame-sync source of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FsyncSource {
    /// The channel's own fsync input.
    Channel,
    /// The other channel's fsync.
    Other,
    /// S2MM TUSER start-of-frame.
    S2mmTuser,
}

/// Gen-lock source of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GenLockSource {
    /// External gen-lock bus.
    External,
    /// Internal gen-lock between the two channels.
    Internal,
}
