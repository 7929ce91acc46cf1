//! Power-on self-test.

use platform::mmio::RegisterIo;

use crate::config::Direction;
use crate::engine::Vdma;
use crate::error::VdmaError;
use crate::regs::RESET_TIMEOUT;

impl<R: RegisterIo> Vdma<'_, R> {
    /// Reset every present channel and check that each reset completes
    /// within [`RESET_TIMEOUT`] polls.
    ///
    /// Leaves the channels reset: program them again before starting.
    pub fn selftest(&mut self) -> Result<(), VdmaError> {
        for dir in Direction::ALL {
            let (channel, io) = self.split(dir);
            if !channel.is_valid() {
                continue;
            }
            channel.reset(io);

            let mut polls = RESET_TIMEOUT;
            while polls > 0 && channel.reset_not_done(io) {
                polls = polls.saturating_sub(1);
            }
            if channel.reset_not_done(io) {
                #[cfg(feature = "defmt")]
                defmt::error!("vdma {=str}: self-test reset timed out", dir.name());
                #[cfg(feature = "tracing")]
                tracing::error!(channel = dir.name(), "self-test reset timed out");
                return Err(VdmaError::Failure);
            }
        }
        Ok(())
    }
}
