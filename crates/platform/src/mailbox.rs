//! IOP shared-memory mailbox
//!
//! The host and the I/O processor share a small BRAM window. The host writes
//! a non-zero command code into the last word of the window and parameters
//! into the data words; the IOP firmware polls the command word, executes the
//! command, publishes results in the data words, and clears the command word
//! to signal completion.
//!
//! ```text
//! window + 0x000  data[0]
//! window + 0x004  data[1]
//!       ...
//! window + 0xFF8  data[1022]
//! window + 0xFFC  command (0 = idle)
//! ```
//!
//! Unrecognised command codes are dropped: the command word is cleared and the
//! loop continues. There is no error acknowledgement beyond whatever status
//! word a firmware image chooses to publish.

use crate::mmio::RegisterIo;

/// IOP-local address of the mailbox window.
pub const MAILBOX_BASE: u32 = 0x0000_F000;

/// Byte offset of the command word within the window.
pub const MAILBOX_COMMAND_OFFSET: u32 = 0xFFC;

/// Number of data words preceding the command word.
pub const MAILBOX_DATA_WORDS: usize = 1023;

/// Value of an idle command word.
pub const COMMAND_IDLE: u32 = 0;

/// Mailbox access errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MailboxError {
    /// Data word index past the end of the data area.
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Largest valid index.
        max: usize,
    },
    /// Log ring geometry does not fit (zero capacity, zero channels, more
    /// channels than slots, or a region larger than the address space).
    InvalidLayout,
}

#[cfg(feature = "std")]
impl std::error::Error for MailboxError {}

impl core::fmt::Display for MailboxError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::IndexOutOfRange { index, max } => {
                write!(f, "Mailbox data index {index} out of range (max {max})")
            }
            Self::InvalidLayout => write!(f, "Invalid log ring layout"),
        }
    }
}

/// Outcome of one [`Mailbox::dispatch`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Dispatch {
    /// No command was pending.
    Idle,
    /// The handler executed the command.
    Handled(u32),
    /// The handler did not recognise the command; it was dropped.
    Ignored(u32),
}

/// Firmware-side command executor.
pub trait CommandHandler {
    /// Execute `command`, reading parameters from and writing results to
    /// `mailbox`. Return `false` for codes this firmware does not implement.
    fn handle<R: RegisterIo>(&mut self, command: u32, mailbox: &mut Mailbox<R>) -> bool;
}

/// Mailbox over a register window.
pub struct Mailbox<R> {
    io: R,
}

impl<R: RegisterIo> Mailbox<R> {
    /// Wrap the mailbox window.
    pub const fn new(io: R) -> Self {
        Self { io }
    }

    /// Raw command word.
    pub fn command(&self) -> u32 {
        self.io.read(MAILBOX_COMMAND_OFFSET)
    }

    /// Pending command code, if any.
    pub fn pending_command(&self) -> Option<u32> {
        match self.command() {
            COMMAND_IDLE => None,
            code => Some(code),
        }
    }

    /// Signal completion by clearing the command word.
    pub fn complete(&mut self) {
        self.io.write(MAILBOX_COMMAND_OFFSET, COMMAND_IDLE);
    }

    /// Host side: post a command code.
    pub fn post(&mut self, command: u32) {
        self.io.write(MAILBOX_COMMAND_OFFSET, command);
    }

    /// Read data word `index`.
    pub fn data(&self, index: usize) -> Result<u32, MailboxError> {
        Ok(self.io.read(data_offset(index)?))
    }

    /// Write data word `index`.
    pub fn set_data(&mut self, index: usize, value: u32) -> Result<(), MailboxError> {
        let offset = data_offset(index)?;
        self.io.write(offset, value);
        Ok(())
    }

    /// Write an IEEE-754 value into data word `index`.
    pub fn set_data_f32(&mut self, index: usize, value: f32) -> Result<(), MailboxError> {
        self.set_data(index, value.to_bits())
    }

    /// Run one iteration of the firmware command loop.
    ///
    /// The command word is cleared after the handler returns, whether or not
    /// the code was recognised.
    pub fn dispatch<H: CommandHandler>(&mut self, handler: &mut H) -> Dispatch {
        let Some(command) = self.pending_command() else {
            return Dispatch::Idle;
        };
        let handled = handler.handle(command, self);
        self.complete();
        if handled {
            Dispatch::Handled(command)
        } else {
            #[cfg(feature = "defmt")]
            defmt::debug!("mailbox: dropped unknown command {=u32:#x}", command);
            Dispatch::Ignored(command)
        }
    }

    /// Borrow the underlying window.
    pub fn io(&self) -> &R {
        &self.io
    }

    /// Release the underlying window.
    pub fn into_inner(self) -> R {
        self.io
    }
}

fn data_offset(index: usize) -> Result<u32, MailboxError> {
    if index >= MAILBOX_DATA_WORDS {
        return Err(MailboxError::IndexOutOfRange {
            index,
            max: MAILBOX_DATA_WORDS.saturating_sub(1),
        });
    }
    u32::try_from(index)
        .ok()
        .and_then(|i| i.checked_mul(4))
        .ok_or(MailboxError::IndexOutOfRange {
            index,
            max: MAILBOX_DATA_WORDS.saturating_sub(1),
        })
}
