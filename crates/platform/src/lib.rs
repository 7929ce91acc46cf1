//! Platform layer for IOP firmware drivers
//!
//! This crate provides the register access abstraction every driver is
//! written against, plus the shared-memory interfaces the I/O processor uses
//! to talk to the host, enabling development and testing without hardware.
//!
//! # Architecture Layers
//!
//! ```text
//! Firmware images / host tools
//!         ↓
//! Drivers (vdma, ...)
//!         ↓
//! Platform (this crate - RegisterIo, Mailbox, LogRing)
//!         ↓
//! Hardware (volatile MMIO) or mocks::MockRegisters
//! ```
//!
//! # Modules
//!
//! - [`mmio`] - [`RegisterIo`] trait and the volatile [`Mmio`] window
//! - [`mailbox`] - host/IOP command mailbox
//! - [`log_ring`] - circular sample log mirrored into the mailbox
//! - [`mocks`] - recording register file for tests
//!
//! # Features
//!
//! - `std`: `std::error::Error` implementations (host builds and tests)
//! - `defmt`: `defmt::Format` derives and defmt logging
//!
//! # Example
//!
//! ```
//! use platform::mailbox::{Dispatch, Mailbox, MAILBOX_DATA_WORDS};
//! use platform::mocks::MockRegisters;
//!
//! let mut mailbox = Mailbox::new(MockRegisters::<{ MAILBOX_DATA_WORDS + 1 }>::new());
//! mailbox.set_data(0, 42)?;
//! assert_eq!(mailbox.pending_command(), None);
//! assert_eq!(mailbox.data(0)?, 42);
//! # Ok::<(), platform::mailbox::MailboxError>(())
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
// Pedantic lints suppressed for this hardware platform crate:
#![allow(clippy::doc_markdown)] // hex addresses and register names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors, callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod log_ring;
pub mod mailbox;
pub mod mmio;
pub mod mocks;

pub use log_ring::LogRing;
pub use mailbox::{CommandHandler, Dispatch, Mailbox, MailboxError};
pub use mmio::{Mmio, RegisterIo};
