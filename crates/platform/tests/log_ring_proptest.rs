//! Property tests: log ring indices and the mailbox mirror.

// Test files legitimately use arithmetic for verification; allow at file level.
#![allow(clippy::arithmetic_side_effects)]
#![allow(clippy::unwrap_used)]

use platform::log_ring::{LogRing, LOG_HEAD_WORD, LOG_LATEST_WORD, LOG_TAIL_WORD};
use platform::mailbox::{Mailbox, MAILBOX_DATA_WORDS};
use platform::mocks::MockRegisters;
use platform::RegisterIo;

const BUS_BASE: u32 = 0x0000_C000;

type HostMailbox = Mailbox<MockRegisters<{ MAILBOX_DATA_WORDS + 1 }>>;

proptest::proptest! {
    /// Head and tail stay inside the ring and the mailbox always mirrors them.
    #[test]
    fn indices_stay_in_range_and_are_mirrored(
        capacity in 1u32..=64,
        channels_seed in 1u32..=8,
        items in proptest::collection::vec(proptest::num::u32::ANY, 0..200),
    ) {
        let channels = channels_seed.min(capacity);
        let mut mailbox = HostMailbox::new(MockRegisters::new());
        let mut ring =
            LogRing::init(MockRegisters::<64>::new(), BUS_BASE, capacity, channels, &mut mailbox)
                .unwrap();

        for &item in &items {
            ring.push(item, &mut mailbox).unwrap();
            assert!(ring.head() < capacity);
            assert!(ring.tail() < capacity);
            assert!(ring.len() < capacity);
            assert_eq!(mailbox.data(LOG_LATEST_WORD).unwrap(), item);
            assert_eq!(mailbox.data(LOG_HEAD_WORD).unwrap(), BUS_BASE + 4 * ring.head());
            assert_eq!(mailbox.data(LOG_TAIL_WORD).unwrap(), BUS_BASE + 4 * ring.tail());
        }
    }

    /// The most recent item is always stored just behind the tail.
    #[test]
    fn last_item_precedes_tail(capacity in 2u32..=64, items in 1usize..300) {
        let mut mailbox = HostMailbox::new(MockRegisters::new());
        let mut ring =
            LogRing::init(MockRegisters::<64>::new(), BUS_BASE, capacity, 1, &mut mailbox)
                .unwrap();
        for i in 0..items {
            ring.push(u32::try_from(i).unwrap(), &mut mailbox).unwrap();
        }
        let last_slot = (ring.tail() + capacity - 1) % capacity;
        let last = u32::try_from(items - 1).unwrap();
        assert_eq!(ring.io().read(last_slot * 4), last);
    }
}
