//! Host command interface over the IOP mailbox.
//!
//! [`HostCommands`] lets a host drive a [`Vdma`] through the shared-memory
//! [`Mailbox`]: the host writes parameters into the data words and a command
//! code into the command word; the firmware loop calls
//! [`Mailbox::dispatch`], which runs the command and clears the command word.
//!
//! Every recognised command publishes a status in data word 0: zero on
//! success, otherwise [`VdmaError::status_code`].
//!
//! | Command | Parameters (data words) | Results (data words) |
//! |---------|-------------------------|----------------------|
//! | [`CMD_START`] | 0 dir, 1 vsize, 2 hsize, 3 stride, 4 count, 5.. addresses | 0 status |
//! | [`CMD_STOP`] | 0 dir | 0 status |
//! | [`CMD_PARK`] | 0 dir, 1 frame | 0 status |
//! | [`CMD_STATUS`] | 0 dir | 0 status, 1 SR, 2 current frame, 3 errors |
//! | [`CMD_RESET`] | 0 dir | 0 status |
//!
//! Directions use the host codes of [`Direction::try_from`]; addresses are
//! 32-bit.

use platform::mailbox::{CommandHandler, Mailbox};
use platform::mmio::RegisterIo;

use crate::config::{Direction, DmaSetup};
use crate::engine::Vdma;
use crate::error::VdmaError;
use crate::regs::MAX_FRAMESTORE;

/// Configure, load addresses and start a channel.
pub const CMD_START: u32 = 0x1;
/// Stop a channel.
pub const CMD_STOP: u32 = 0x2;
/// Park a running channel on one frame.
pub const CMD_PARK: u32 = 0x3;
/// Report channel status.
pub const CMD_STATUS: u32 = 0x4;
/// Soft-reset a channel.
pub const CMD_RESET: u32 = 0x5;

/// Data word receiving the command status.
pub const STATUS_WORD: usize = 0;
/// First data word of the [`CMD_START`] address list.
pub const START_ADDR_WORD: usize = 5;

/// Mailbox command handler driving one engine.
pub struct HostCommands<'v, 'a, R> {
    vdma: &'v mut Vdma<'a, R>,
}

impl<'v, 'a, R: RegisterIo> HostCommands<'v, 'a, R> {
    /// Serve host commands for `vdma`.
    pub fn new(vdma: &'v mut Vdma<'a, R>) -> Self {
        Self { vdma }
    }

    fn execute<M: RegisterIo>(
        &mut self,
        command: u32,
        mailbox: &mut Mailbox<M>,
    ) -> Result<(), VdmaError> {
        let dir = Direction::try_from(word(mailbox, 0)?)?;
        match command {
            CMD_START => self.start(dir, mailbox),
            CMD_STOP => {
                self.vdma.dma_stop(dir);
                Ok(())
            }
            CMD_PARK => self.vdma.start_parking(word(mailbox, 1)?, dir),
            CMD_STATUS => {
                let errors = self.vdma.dma_channel_errors(dir)?;
                put(mailbox, 1, self.vdma.status(dir))?;
                put(mailbox, 2, self.vdma.curr_frame_store(dir))?;
                put(mailbox, 3, errors)
            }
            CMD_RESET => {
                self.vdma.reset(dir);
                Ok(())
            }
            _ => Err(VdmaError::InvalidParam),
        }
    }

    fn start<M: RegisterIo>(
        &mut self,
        dir: Direction,
        mailbox: &Mailbox<M>,
    ) -> Result<(), VdmaError> {
        let count = usize::try_from(word(mailbox, 4)?).map_err(|_| VdmaError::InvalidParam)?;
        if count == 0 || count > MAX_FRAMESTORE {
            return Err(VdmaError::InvalidParam);
        }
        let setup = DmaSetup {
            vert_size: word(mailbox, 1)?,
            hori_size: word(mailbox, 2)?,
            stride: word(mailbox, 3)?,
            ..DmaSetup::default()
        };
        let mut addrs = [0u64; MAX_FRAMESTORE];
        for (i, slot) in addrs.iter_mut().take(count).enumerate() {
            *slot = u64::from(word(mailbox, START_ADDR_WORD.saturating_add(i))?);
        }
        let addrs = addrs.get(..count).ok_or(VdmaError::InvalidParam)?;

        self.vdma.dma_config(dir, &setup)?;
        self.vdma.dma_set_buffer_addr(dir, addrs)?;
        self.vdma.dma_start(dir)
    }
}

impl<R: RegisterIo> CommandHandler for HostCommands<'_, '_, R> {
    fn handle<M: RegisterIo>(&mut self, command: u32, mailbox: &mut Mailbox<M>) -> bool {
        if !matches!(command, CMD_START..=CMD_RESET) {
            return false;
        }
        let status = match self.execute(command, mailbox) {
            Ok(()) => 0,
            Err(e) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("vdma: host command {=u32:#x} failed: {}", command, e);
                #[cfg(feature = "tracing")]
                tracing::warn!(command, error = %e, "host command failed");
                e.status_code()
            }
        };
        let written = mailbox.set_data(STATUS_WORD, status);
        debug_assert!(written.is_ok(), "status word out of mailbox range");
        true
    }
}

fn word<M: RegisterIo>(mailbox: &Mailbox<M>, index: usize) -> Result<u32, VdmaError> {
    mailbox.data(index).map_err(|_| VdmaError::InvalidParam)
}

fn put<M: RegisterIo>(
    mailbox: &mut Mailbox<M>,
    index: usize,
    value: u32,
) -> Result<(), VdmaError> {
    mailbox.set_data(index, value).map_err(|_| VdmaError::InvalidParam)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use crate::mocks::{test_config, MockVdma};
    use crate::regs::{CR_RUNSTOP_MASK, RX_OFFSET, SR_HALTED_MASK};
    use platform::mailbox::{Dispatch, MAILBOX_DATA_WORDS};
    use platform::mocks::MockRegisters;

    type HostMailbox = Mailbox<MockRegisters<{ MAILBOX_DATA_WORDS + 1 }>>;

    fn engine() -> Vdma<'static, MockVdma> {
        let mut vdma = Vdma::new(MockVdma::new());
        vdma.cfg_initialize(&test_config(false)).unwrap();
        vdma
    }

    fn post(mailbox: &mut HostMailbox, command: u32, params: &[u32]) {
        for (i, &p) in params.iter().enumerate() {
            mailbox.set_data(i, p).unwrap();
        }
        mailbox.post(command);
    }

    #[test]
    fn start_command_runs_the_write_channel() {
        let mut vdma = engine();
        let mut mailbox = HostMailbox::new(MockRegisters::new());
        post(
            &mut mailbox,
            CMD_START,
            &[1, 480, 2560, 2560, 2, 0x1000_0000, 0x1010_0000],
        );
        let outcome = mailbox.dispatch(&mut HostCommands::new(&mut vdma));
        assert_eq!(outcome, Dispatch::Handled(CMD_START));
        assert_eq!(mailbox.data(STATUS_WORD), Ok(0));
        assert_eq!(mailbox.pending_command(), None);
        assert_ne!(vdma.io().peek(RX_OFFSET) & CR_RUNSTOP_MASK, 0);
    }

    #[test]
    fn failures_publish_a_status_code() {
        let mut vdma = engine();
        let mut mailbox = HostMailbox::new(MockRegisters::new());
        post(&mut mailbox, CMD_STOP, &[3]);
        mailbox.dispatch(&mut HostCommands::new(&mut vdma));
        assert_eq!(
            mailbox.data(STATUS_WORD),
            Ok(VdmaError::InvalidParam.status_code())
        );

        post(&mut mailbox, CMD_PARK, &[2, 4]);
        mailbox.dispatch(&mut HostCommands::new(&mut vdma));
        assert_eq!(mailbox.data(STATUS_WORD), Ok(VdmaError::Failure.status_code()));
    }

    #[test]
    fn status_command_reports_registers() {
        let mut vdma = engine();
        let mut mailbox = HostMailbox::new(MockRegisters::new());
        post(&mut mailbox, CMD_STATUS, &[2]);
        mailbox.dispatch(&mut HostCommands::new(&mut vdma));
        assert_eq!(mailbox.data(STATUS_WORD), Ok(0));
        assert_eq!(mailbox.data(1), Ok(SR_HALTED_MASK));
        assert_eq!(mailbox.data(3), Ok(0));
    }

    #[test]
    fn unknown_command_is_dropped() {
        let mut vdma = engine();
        let mut mailbox = HostMailbox::new(MockRegisters::new());
        post(&mut mailbox, 0x77, &[0xAB]);
        let outcome = mailbox.dispatch(&mut HostCommands::new(&mut vdma));
        assert_eq!(outcome, Dispatch::Ignored(0x77));
        assert_eq!(mailbox.data(STATUS_WORD), Ok(0xAB));
    }
}
