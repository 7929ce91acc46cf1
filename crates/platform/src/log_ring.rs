//! Circular sample log shared with the host
//!
//! Firmware images that stream sensor readings push fixed-size word items into
//! a ring in shared memory. The ring never blocks: when the tail catches up
//! with the head, the head is pushed forward by one whole record (`channels`
//! items) so the host always sees complete records.
//!
//! The ring state is mirrored into the mailbox so the host can read it without
//! talking to the IOP:
//!
//! | Data word | Contents |
//! |-----------|----------|
//! | 0 | most recent item (`0xFFFF_FFFF` right after init) |
//! | 2 | bus address of the head item |
//! | 3 | bus address of the tail slot |

use crate::mailbox::{Mailbox, MailboxError};
use crate::mmio::RegisterIo;

/// Size of one log item in bytes.
pub const LOG_ITEM_SIZE: u32 = 4;

/// Mailbox data word holding the most recent item.
pub const LOG_LATEST_WORD: usize = 0;
/// Mailbox data word holding the head bus address.
pub const LOG_HEAD_WORD: usize = 2;
/// Mailbox data word holding the tail bus address.
pub const LOG_TAIL_WORD: usize = 3;

/// Value published in [`LOG_LATEST_WORD`] before the first push.
pub const LOG_EMPTY_MARKER: u32 = 0xFFFF_FFFF;

/// Ring of word items in a shared region.
pub struct LogRing<L> {
    io: L,
    bus_base: u32,
    capacity: u32,
    channels: u32,
    head: u32,
    tail: u32,
}

impl<L: RegisterIo> LogRing<L> {
    /// Lay out a ring of `capacity` items over `io`, whose first word the host
    /// sees at `bus_base`, and publish the empty state into `mailbox`.
    pub fn init<M: RegisterIo>(
        io: L,
        bus_base: u32,
        capacity: u32,
        channels: u32,
        mailbox: &mut Mailbox<M>,
    ) -> Result<Self, MailboxError> {
        if capacity == 0 || channels == 0 || channels > capacity {
            return Err(MailboxError::InvalidLayout);
        }
        capacity
            .checked_mul(LOG_ITEM_SIZE)
            .and_then(|len| bus_base.checked_add(len))
            .ok_or(MailboxError::InvalidLayout)?;

        let ring = Self {
            io,
            bus_base,
            capacity,
            channels,
            head: 0,
            tail: 0,
        };
        mailbox.set_data(LOG_LATEST_WORD, LOG_EMPTY_MARKER)?;
        ring.publish(mailbox)?;
        Ok(ring)
    }

    /// Append one item.
    pub fn push<M: RegisterIo>(
        &mut self,
        item: u32,
        mailbox: &mut Mailbox<M>,
    ) -> Result<(), MailboxError> {
        self.io.write(self.slot_offset(self.tail), item);
        self.advance();
        mailbox.set_data(LOG_LATEST_WORD, item)?;
        self.publish(mailbox)
    }

    /// Append one IEEE-754 item.
    pub fn push_f32<M: RegisterIo>(
        &mut self,
        item: f32,
        mailbox: &mut Mailbox<M>,
    ) -> Result<(), MailboxError> {
        self.push(item.to_bits(), mailbox)
    }

    /// Index of the oldest retained item.
    pub fn head(&self) -> u32 {
        self.head
    }

    /// Index of the next slot to be written.
    pub fn tail(&self) -> u32 {
        self.tail
    }

    /// Capacity in items.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Number of items a host reader would currently see.
    pub fn len(&self) -> u32 {
        if self.tail >= self.head {
            self.tail.saturating_sub(self.head)
        } else {
            self.capacity
                .saturating_sub(self.head)
                .saturating_add(self.tail)
        }
    }

    /// True when head and tail coincide.
    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    /// Bus address of item `index`, as published to the host.
    pub fn bus_address(&self, index: u32) -> u32 {
        self.bus_base.wrapping_add(self.slot_offset(index))
    }

    /// Borrow the backing region.
    pub fn io(&self) -> &L {
        &self.io
    }

    fn slot_offset(&self, index: u32) -> u32 {
        index.wrapping_mul(LOG_ITEM_SIZE)
    }

    fn advance(&mut self) {
        self.tail = self.tail.saturating_add(1);
        if self.tail >= self.capacity {
            self.tail = 0;
        }
        if self.tail == self.head {
            self.head = self.head.saturating_add(self.channels);
            if self.head >= self.capacity {
                self.head = 0;
            }
        }
    }

    fn publish<M: RegisterIo>(&self, mailbox: &mut Mailbox<M>) -> Result<(), MailboxError> {
        mailbox.set_data(LOG_HEAD_WORD, self.bus_address(self.head))?;
        mailbox.set_data(LOG_TAIL_WORD, self.bus_address(self.tail))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mocks::MockRegisters;

    const LOG_BUS_BASE: u32 = 0x0000_C000;

    fn setup(capacity: u32, channels: u32) -> (LogRing<MockRegisters<64>>, Mailbox<MockRegisters<1024>>) {
        let mut mb = Mailbox::new(MockRegisters::new());
        let ring = LogRing::init(MockRegisters::new(), LOG_BUS_BASE, capacity, channels, &mut mb)
            .unwrap();
        (ring, mb)
    }

    #[test]
    fn init_publishes_empty_state() {
        let (ring, mb) = setup(8, 1);
        assert!(ring.is_empty());
        assert_eq!(mb.data(LOG_LATEST_WORD), Ok(LOG_EMPTY_MARKER));
        assert_eq!(mb.data(LOG_HEAD_WORD), Ok(LOG_BUS_BASE));
        assert_eq!(mb.data(LOG_TAIL_WORD), Ok(LOG_BUS_BASE));
    }

    #[test]
    fn push_writes_slot_and_mirrors_tail() {
        let (mut ring, mut mb) = setup(8, 1);
        ring.push(0xAB, &mut mb).unwrap();
        assert_eq!(ring.io().peek(0), 0xAB);
        assert_eq!(ring.len(), 1);
        assert_eq!(mb.data(LOG_LATEST_WORD), Ok(0xAB));
        assert_eq!(mb.data(LOG_TAIL_WORD), Ok(LOG_BUS_BASE + 4));
    }

    #[test]
    fn full_ring_drops_a_whole_record() {
        // Two channels per record: temperature, humidity.
        let (mut ring, mut mb) = setup(4, 2);
        for v in 0..4 {
            ring.push(v, &mut mb).unwrap();
        }
        // Tail wrapped onto the head, so the oldest record (2 items) went.
        assert_eq!(ring.tail(), 0);
        assert_eq!(ring.head(), 2);
        assert_eq!(mb.data(LOG_HEAD_WORD), Ok(LOG_BUS_BASE + 8));
    }

    #[test]
    fn head_wraps_to_start() {
        let (mut ring, mut mb) = setup(3, 2);
        for v in 0..6 {
            ring.push(v, &mut mb).unwrap();
        }
        assert!(ring.head() < ring.capacity());
        assert!(ring.tail() < ring.capacity());
    }

    #[test]
    fn rejects_impossible_layouts() {
        let mut mb = Mailbox::new(MockRegisters::<1024>::new());
        for (cap, ch) in [(0, 1), (4, 0), (2, 3)] {
            assert_eq!(
                LogRing::init(MockRegisters::<4>::new(), 0, cap, ch, &mut mb).err(),
                Some(MailboxError::InvalidLayout)
            );
        }
        assert_eq!(
            LogRing::init(MockRegisters::<4>::new(), u32::MAX - 4, 4, 1, &mut mb).err(),
            Some(MailboxError::InvalidLayout)
        );
    }
}
