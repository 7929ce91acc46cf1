//! Interrupt control and dispatch.
//!
//! Each channel has three interrupt sources sharing one bit position in the
//! control register (enable) and the status register (pending,
//! write-one-to-clear): frame count, delay timer and error.
//!
//! # Error callback contract
//!
//! The error callback is handed the register window and the channel and must
//! reset the channel (`channel.reset(io)`). The handler never resets on its
//! own: an error callback that returns without resetting leaves the error
//! latched, and every later interrupt on that channel is dispatched to the
//! error callback again.

use platform::mmio::RegisterIo;

use crate::channel::Channel;
use crate::config::Direction;
use crate::engine::Vdma;
use crate::regs::{CR_OFFSET, IXR_ALL_MASK, IXR_COMPLETION_MASK, IXR_ERROR_MASK, SR_OFFSET};

/// Interrupt callback: register window, channel, and an interrupt mask.
///
/// Completion callbacks receive the full pending mask; error callbacks
/// receive only the error bit (zero for a spurious interrupt).
pub type IntrCallback<'a, R> = &'a mut dyn FnMut(&mut R, &mut Channel, u32);

/// Which callback slot to register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CallbackType {
    /// Frame-count or delay-timer completion.
    General,
    /// Channel error.
    Error,
}

/// Callback slots of one direction.
pub(crate) struct Callbacks<'a, R> {
    pub(crate) completion: Option<IntrCallback<'a, R>>,
    pub(crate) error: Option<IntrCallback<'a, R>>,
}

impl<R> Callbacks<'_, R> {
    pub(crate) const fn new() -> Self {
        Self {
            completion: None,
            error: None,
        }
    }

    fn is_empty(&self) -> bool {
        self.completion.is_none() && self.error.is_none()
    }
}

// ── Channel-level interrupt registers ────────────────────────────────────────

impl Channel {
    /// Enable the interrupts in `mask`, keeping those already enabled.
    pub fn intr_enable<R: RegisterIo>(&self, io: &mut R, mask: u32) {
        let bits = mask & IXR_ALL_MASK;
        if bits != 0 {
            io.set_bits(self.reg(CR_OFFSET), bits);
        }
    }

    /// Disable the interrupts in `mask`.
    pub fn intr_disable<R: RegisterIo>(&self, io: &mut R, mask: u32) {
        let bits = mask & IXR_ALL_MASK;
        if bits != 0 {
            io.clear_bits(self.reg(CR_OFFSET), bits);
        }
    }

    /// Pending interrupt bits.
    pub fn intr_pending<R: RegisterIo>(&self, io: &R) -> u32 {
        io.read(self.reg(SR_OFFSET)) & IXR_ALL_MASK
    }

    /// Acknowledge the pending interrupts in `mask`.
    pub fn intr_clear<R: RegisterIo>(&self, io: &mut R, mask: u32) {
        let bits = mask & IXR_ALL_MASK;
        if bits != 0 {
            io.write(self.reg(SR_OFFSET), bits);
        }
    }

    /// Enabled interrupt bits.
    pub fn intr_enabled<R: RegisterIo>(&self, io: &R) -> u32 {
        io.read(self.reg(CR_OFFSET)) & IXR_ALL_MASK
    }
}

// ── Engine-level interrupt API ───────────────────────────────────────────────

impl<'a, R: RegisterIo> Vdma<'a, R> {
    /// Enable interrupts on `dir`. Ignored for an absent channel.
    pub fn intr_enable(&mut self, mask: u32, dir: Direction) {
        let (channel, io) = self.split(dir);
        if channel.is_valid() {
            channel.intr_enable(io, mask);
        }
    }

    /// Disable interrupts on `dir`. Ignored for an absent channel.
    pub fn intr_disable(&mut self, mask: u32, dir: Direction) {
        let (channel, io) = self.split(dir);
        if channel.is_valid() {
            channel.intr_disable(io, mask);
        }
    }

    /// Pending interrupts on `dir` (0 for an absent channel).
    pub fn intr_pending(&self, dir: Direction) -> u32 {
        let channel = self.channel(dir);
        if channel.is_valid() {
            channel.intr_pending(self.io())
        } else {
            0
        }
    }

    /// Acknowledge interrupts on `dir`. Ignored for an absent channel.
    pub fn intr_clear(&mut self, mask: u32, dir: Direction) {
        let (channel, io) = self.split(dir);
        if channel.is_valid() {
            channel.intr_clear(io, mask);
        }
    }

    /// Enabled interrupts on `dir` (0 for an absent channel).
    pub fn intr_enabled(&self, dir: Direction) -> u32 {
        let channel = self.channel(dir);
        if channel.is_valid() {
            channel.intr_enabled(self.io())
        } else {
            0
        }
    }

    /// Register `callback` in the `kind` slot of `dir`, replacing any
    /// previous one.
    pub fn set_callback(
        &mut self,
        dir: Direction,
        kind: CallbackType,
        callback: IntrCallback<'a, R>,
    ) {
        let slots = self.callbacks_mut(dir);
        match kind {
            CallbackType::General => slots.completion = Some(callback),
            CallbackType::Error => slots.error = Some(callback),
        }
    }

    /// Remove the callback in the `kind` slot of `dir`.
    pub fn clear_callback(&mut self, dir: Direction, kind: CallbackType) {
        let slots = self.callbacks_mut(dir);
        match kind {
            CallbackType::General => slots.completion = None,
            CallbackType::Error => slots.error = None,
        }
    }

    /// Service an interrupt of `dir`.
    ///
    /// Pending and enabled bits are acknowledged first. With no callbacks
    /// registered the interrupt is then dropped. An empty pending set or
    /// one containing the error bit goes to the error callback with only
    /// the error bit; otherwise completion bits go to the completion
    /// callback with the full pending mask.
    pub fn intr_handler(&mut self, dir: Direction) {
        let (channel, io, callbacks) = self.parts(dir);
        if !channel.is_valid() {
            return;
        }

        let pending = channel.intr_pending(io) & channel.intr_enabled(io);
        channel.intr_clear(io, pending);

        if callbacks.is_empty() {
            return;
        }

        if pending == 0 || pending & IXR_ERROR_MASK != 0 {
            #[cfg(feature = "defmt")]
            defmt::warn!(
                "vdma {=str}: error interrupt, SR={=u32:#x}",
                dir.name(),
                channel.status(io)
            );
            #[cfg(feature = "tracing")]
            tracing::warn!(
                channel = dir.name(),
                status = channel.status(io),
                "error interrupt"
            );
            if let Some(callback) = callbacks.error.as_deref_mut() {
                callback(io, channel, pending & IXR_ERROR_MASK);
            }
            return;
        }

        if pending & IXR_COMPLETION_MASK != 0 {
            if let Some(callback) = callbacks.completion.as_deref_mut() {
                callback(io, channel, pending);
            }
        }
    }

    /// Read channel interrupt entry point.
    pub fn read_intr_handler(&mut self) {
        self.intr_handler(Direction::Read);
    }

    /// Write channel interrupt entry point.
    pub fn write_intr_handler(&mut self) {
        self.intr_handler(Direction::Write);
    }
}
