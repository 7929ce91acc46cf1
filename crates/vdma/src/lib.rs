//! Driver for the AXI Video DMA (VDMA) engine
//!
//! A VDMA instance moves video frames between memory and AXI4-Stream
//! interfaces through two independent channels: MM2S ("read", memory to
//! stream) and S2MM ("write", stream to memory). Each channel cycles through
//! a set of frame stores, either programmed directly into registers or
//! described by a ring of 32-byte scatter-gather descriptors.
//!
//! # Architecture Layers
//!
//! ```text
//! Application (display pipeline, capture, host tools)
//!         ↓
//! Vdma engine (this crate: dispatch by Direction, interrupts, self-test)
//!         ↓
//! Channel + BdRing (per-direction state machine, descriptor ring)
//!         ↓
//! platform::mmio::RegisterIo (Mmio on hardware, MockVdma in tests)
//! ```
//!
//! # Modules
//!
//! - [`regs`] - register map and bit fields
//! - [`config`] - build parameters, device table, per-transfer setup
//! - [`bd`] - scatter-gather descriptors and the descriptor ring
//! - [`channel`] - one channel's state machine
//! - [`engine`] - [`Vdma`], the instance-level API
//! - [`intr`] - interrupt control and callback dispatch
//! - [`host`] - host commands over the IOP mailbox
//! - [`mocks`] - register model for tests and host tools
//!
//! # Features
//!
//! - `std`: `std::error::Error` for [`VdmaError`]
//! - `defmt`: `defmt::Format` derives and defmt logging
//! - `tracing`: tracing events (host builds)
//!
//! # Example
//!
//! ```
//! use vdma::mocks::{test_config, MockVdma};
//! use vdma::{Direction, Vdma, IXR_FRMCNT_MASK};
//!
//! let mut vdma = Vdma::new(MockVdma::new());
//! vdma.cfg_initialize(&test_config(true))?;
//! vdma.intr_enable(IXR_FRMCNT_MASK, Direction::Read);
//! assert_eq!(vdma.intr_enabled(Direction::Read), IXR_FRMCNT_MASK);
//! # Ok::<(), vdma::VdmaError>(())
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(unused_must_use)]
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)]
// Pedantic lints suppressed for this driver crate:
#![allow(clippy::doc_markdown)] // register and signal names in doc comments
#![allow(clippy::must_use_candidate)] // register accessors, callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // VdmaError variants are documented per operation

pub mod bd;
pub mod channel;
pub mod config;
pub mod engine;
pub mod error;
pub mod host;
pub mod intr;
pub mod mocks;
pub mod regs;
mod selftest;

pub use bd::{Bd, BdRing, BD_SIZE};
pub use channel::{align_up, Channel, RegisterSnapshot};
pub use config::{
    lookup_config, AddrWidth, ChannelConfig, DebugFeatures, Direction, DmaSetup, FrameCounter,
    FsyncMode, FsyncSource, GenLockRole, GenLockSource, VdmaConfig, CONFIG_TABLE,
};
pub use engine::{Vdma, VdmaVersion};
pub use error::VdmaError;
pub use host::HostCommands;
pub use intr::{CallbackType, IntrCallback};

// Interrupt masks used with the intr_* API.
pub use regs::{
    IXR_ALL_MASK, IXR_COMPLETION_MASK, IXR_DELAYCNT_MASK, IXR_ERROR_MASK, IXR_FRMCNT_MASK,
};
