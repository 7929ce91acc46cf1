//! Mock implementations for testing
//!
//! [`MockRegisters`] is a plain register file: reads return the last value
//! written (or poked), and every driver write is appended to an ordered log so
//! tests can assert on register programming sequences.
//!
//! Only `heapless` storage is used, so the mocks build for `no_std` targets
//! and downstream crates can drive them from their own integration tests.

use crate::mmio::RegisterIo;

/// Maximum number of writes retained in the log.
pub const WRITE_LOG_DEPTH: usize = 512;

/// One logged register write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterWrite {
    /// Byte offset written.
    pub offset: u32,
    /// Value written.
    pub value: u32,
}

/// Mock register file of `WORDS` 32-bit registers.
///
/// Accesses outside the window read as zero and are otherwise ignored, but
/// writes are still logged. Once [`WRITE_LOG_DEPTH`] writes are logged,
/// further writes still reach the registers but are only counted; check
/// [`overflowed`](Self::overflowed) before asserting on a long sequence.
pub struct MockRegisters<const WORDS: usize> {
    words: [u32; WORDS],
    writes: heapless::Vec<RegisterWrite, WRITE_LOG_DEPTH>,
    dropped: usize,
}

impl<const WORDS: usize> MockRegisters<WORDS> {
    /// Create a register file with every register reading zero.
    pub fn new() -> Self {
        Self {
            words: [0; WORDS],
            writes: heapless::Vec::new(),
            dropped: 0,
        }
    }

    /// Current value at `offset` without logging anything.
    pub fn peek(&self, offset: u32) -> u32 {
        self.words.get(index(offset)).copied().unwrap_or(0)
    }

    /// Set the value at `offset` as hardware would, without logging.
    pub fn poke(&mut self, offset: u32, value: u32) {
        if let Some(word) = self.words.get_mut(index(offset)) {
            *word = value;
        }
    }

    /// All logged writes, oldest first.
    pub fn writes(&self) -> &[RegisterWrite] {
        &self.writes
    }

    /// Forget the write log (register contents are kept).
    pub fn clear_writes(&mut self) {
        self.writes.clear();
        self.dropped = 0;
    }

    /// Writes that arrived after the log was full.
    pub fn dropped_writes(&self) -> usize {
        self.dropped
    }

    /// True if the log is missing writes.
    pub fn overflowed(&self) -> bool {
        self.dropped > 0
    }

    /// Values written to `offset`, oldest first.
    pub fn writes_to(&self, offset: u32) -> impl Iterator<Item = u32> + '_ {
        self.writes
            .iter()
            .filter(move |w| w.offset == offset)
            .map(|w| w.value)
    }

    /// Log position of the first write matching `pred`.
    pub fn position(&self, mut pred: impl FnMut(&RegisterWrite) -> bool) -> Option<usize> {
        self.writes.iter().position(|w| pred(w))
    }
}

impl<const WORDS: usize> Default for MockRegisters<WORDS> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const WORDS: usize> RegisterIo for MockRegisters<WORDS> {
    fn read(&self, offset: u32) -> u32 {
        self.peek(offset)
    }

    fn write(&mut self, offset: u32, value: u32) {
        if self.writes.push(RegisterWrite { offset, value }).is_err() {
            self.dropped = self.dropped.saturating_add(1);
        }
        self.poke(offset, value);
    }
}

fn index(offset: u32) -> usize {
    (offset >> 2) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_return_last_written_value() {
        let mut regs = MockRegisters::<16>::new();
        regs.write(0x08, 7);
        regs.write(0x08, 9);
        assert_eq!(regs.read(0x08), 9);
        assert_eq!(regs.writes_to(0x08).collect::<std::vec::Vec<_>>(), [7, 9]);
    }

    #[test]
    fn poke_does_not_log() {
        let mut regs = MockRegisters::<4>::new();
        regs.poke(0x04, 0x55);
        assert_eq!(regs.read(0x04), 0x55);
        assert!(regs.writes().is_empty());
    }

    #[test]
    fn out_of_window_access_is_harmless() {
        let mut regs = MockRegisters::<4>::new();
        regs.write(0x100, 1);
        assert_eq!(regs.read(0x100), 0);
        assert_eq!(regs.writes().len(), 1);
    }

    #[test]
    fn full_log_counts_dropped_writes() {
        let mut regs = MockRegisters::<4>::new();
        for i in 0..WRITE_LOG_DEPTH {
            regs.write(0x00, i as u32);
        }
        assert!(!regs.overflowed());

        regs.write(0x04, 0xAA);
        regs.write(0x04, 0xBB);
        assert!(regs.overflowed());
        assert_eq!(regs.dropped_writes(), 2);
        assert_eq!(regs.writes().len(), WRITE_LOG_DEPTH);
        // The register file itself saw every write.
        assert_eq!(regs.read(0x04), 0xBB);

        regs.clear_writes();
        assert!(!regs.overflowed());
    }

    #[test]
    fn modify_logs_a_single_write() {
        let mut regs = MockRegisters::<4>::new();
        regs.poke(0x00, 0xF0);
        regs.modify(0x00, 0x30, 0x01);
        assert_eq!(regs.read(0x00), 0xC1);
        assert_eq!(
            regs.writes(),
            &[RegisterWrite {
                offset: 0x00,
                value: 0xC1
            }]
        );
        assert_eq!(regs.position(|w| w.value == 0xC1), Some(0));
    }
}
