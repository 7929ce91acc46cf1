//! Transfer programming against the register model: direct-register mode,
//! scatter-gather mode, busy handling and wide address layouts.

// Test files legitimately use arithmetic for verification; allow at file level.
#![allow(clippy::arithmetic_side_effects)]
#![allow(clippy::indexing_slicing)]
#![allow(clippy::unwrap_used)]

use vdma::mocks::{test_config, MockVdma};
use vdma::regs::{
    CDESC_OFFSET, CR_OFFSET, CR_RUNSTOP_MASK, CR_TAIL_EN_MASK, FRMSTORE_OFFSET, HI_FRMBUF_OFFSET,
    HSIZE_OFFSET, MM2S_ADDR_OFFSET, PARKPTR_OFFSET, RX_OFFSET, S2MM_ADDR_OFFSET, START_ADDR_MSB_OFFSET,
    START_ADDR_OFFSET, STRD_FRMDLY_OFFSET, TDESC_OFFSET, TX_OFFSET, VSIZE_OFFSET,
};
use vdma::{AddrWidth, Bd, Direction, DmaSetup, Vdma, VdmaError, BD_SIZE};

const FRAMES: [u64; 3] = [0x1000_0000, 0x1020_0000, 0x1040_0000];

fn setup_720p() -> DmaSetup {
    let mut setup = DmaSetup {
        vert_size: 720,
        hori_size: 1280 * 4,
        stride: 1280 * 4,
        ..DmaSetup::default()
    };
    setup.frame_store_start_addr[..3].copy_from_slice(&FRAMES);
    setup
}

fn bd_storage(len: usize) -> &'static mut [Bd] {
    Box::leak(vec![Bd::ZERO; len].into_boxed_slice())
}

fn engine(has_sg: bool) -> Vdma<'static, MockVdma> {
    let mut vdma = Vdma::new(MockVdma::new());
    vdma.cfg_initialize(&test_config(has_sg)).unwrap();
    vdma.io_mut().clear_writes();
    vdma
}

// Test 1: direct-mode write channel is programmed and running after one call
#[test]
fn direct_write_frame_end_to_end() {
    let mut vdma = engine(false);
    vdma.start_write_frame(&setup_720p()).unwrap();

    let io = vdma.io();
    assert_eq!(io.peek(S2MM_ADDR_OFFSET + HSIZE_OFFSET), 5120);
    assert_eq!(io.peek(S2MM_ADDR_OFFSET + STRD_FRMDLY_OFFSET), 5120);
    for (i, addr) in FRAMES.iter().enumerate() {
        let slot = S2MM_ADDR_OFFSET + START_ADDR_OFFSET + 4 * i as u32;
        assert_eq!(u64::from(io.peek(slot)), *addr);
    }
    assert_eq!(io.peek(S2MM_ADDR_OFFSET + VSIZE_OFFSET), 720);

    let cr = io.peek(RX_OFFSET + CR_OFFSET);
    assert_ne!(cr & CR_RUNSTOP_MASK, 0);
    assert_ne!(cr & CR_TAIL_EN_MASK, 0);
    assert!(vdma.channel(Direction::Write).is_running(vdma.io()));
    assert_eq!(vdma.dma_channel_errors(Direction::Write), Ok(0));

    // The read channel was never touched.
    assert!(io.writes().iter().all(|w| w.offset >= RX_OFFSET));
}

// Test 2: vertical size is written last; it is what kicks a direct-mode frame
#[test]
fn direct_mode_vsize_follows_run() {
    let mut vdma = engine(false);
    vdma.start_read_frame(&setup_720p()).unwrap();
    let regs = vdma.io().regs();
    let run = regs
        .position(|w| w.offset == TX_OFFSET + CR_OFFSET && w.value & CR_RUNSTOP_MASK != 0)
        .unwrap();
    let vsize = regs
        .position(|w| w.offset == MM2S_ADDR_OFFSET + VSIZE_OFFSET)
        .unwrap();
    assert!(!regs.overflowed());
    assert!(run < vsize);
    assert_eq!(vsize, regs.writes().len() - 1);
}

// Test 3: scatter-gather start loads CDESC, then runs, then loads TDESC
#[test]
fn sg_start_orders_descriptor_pointers_around_run() {
    let mut vdma = engine(true);
    vdma.start_read_frame(&setup_720p()).unwrap();

    let regs = vdma.io().regs();
    let cdesc = regs.position(|w| w.offset == TX_OFFSET + CDESC_OFFSET).unwrap();
    let run = regs
        .position(|w| w.offset == TX_OFFSET + CR_OFFSET && w.value & CR_RUNSTOP_MASK != 0)
        .unwrap();
    let tdesc = regs.position(|w| w.offset == TX_OFFSET + TDESC_OFFSET).unwrap();
    assert!(cdesc < run && run < tdesc);

    let ring = vdma.channel(Direction::Read).ring();
    assert_eq!(vdma.io().peek(TX_OFFSET + CDESC_OFFSET), ring.head());
    assert_eq!(vdma.io().peek(TX_OFFSET + TDESC_OFFSET), ring.head() + 2 * BD_SIZE);

    // No direct-mode registers in SG mode.
    assert_eq!(vdma.io().regs().writes_to(MM2S_ADDR_OFFSET + VSIZE_OFFSET).count(), 0);
}

// Test 4: scatter-gather descriptors carry geometry and one frame each
#[test]
fn sg_descriptors_hold_the_setup() {
    let mut vdma = engine(true);
    vdma.start_write_frame(&setup_720p()).unwrap();
    let ring = vdma.channel(Direction::Write).ring();
    assert_eq!(ring.len(), 3);
    for (bd, addr) in ring.iter().zip(FRAMES) {
        assert_eq!(bd.vsize(), 720);
        assert_eq!(bd.hsize(), 5120);
        assert_eq!(bd.stride(), 5120);
        assert_eq!(bd.addr(), addr);
    }
    assert_eq!(ring.get(2).unwrap().next(), ring.head());
}

// Test 5: a busy scatter-gather channel refuses reprogramming until idle
#[test]
fn busy_sg_channel_rejects_config_and_start() {
    let mut vdma = engine(true);
    let setup = setup_720p();
    vdma.start_read_frame(&setup).unwrap();
    assert!(vdma.is_busy(Direction::Read));

    vdma.io_mut().clear_writes();
    assert_eq!(vdma.dma_config(Direction::Read, &setup), Err(VdmaError::DeviceBusy));
    assert_eq!(vdma.dma_start(Direction::Read), Err(VdmaError::DeviceBusy));
    assert_eq!(vdma.start_read_frame(&setup), Err(VdmaError::DeviceBusy));
    assert!(vdma.io().writes().is_empty());

    vdma.io_mut().set_idle(Direction::Read, true);
    vdma.dma_config(Direction::Read, &setup).unwrap();
    vdma.dma_start(Direction::Read).unwrap();
    // Already running: only the tail pointer is reloaded.
    assert_eq!(vdma.io().regs().writes_to(TX_OFFSET + CDESC_OFFSET).count(), 0);
    assert_eq!(vdma.io().regs().writes_to(TX_OFFSET + TDESC_OFFSET).count(), 1);
}

// Test 6: a channel that never leaves halt reports a DMA error
#[test]
fn channel_that_will_not_run_is_a_dma_error() {
    let mut vdma = engine(false);
    vdma.io_mut().refuse_run(Direction::Write, true);
    assert_eq!(vdma.start_write_frame(&setup_720p()), Err(VdmaError::DmaError));
    assert_eq!(vdma.io().regs().writes_to(S2MM_ADDR_OFFSET + VSIZE_OFFSET).count(), 0);
}

// Test 7: stop clears run and leaves the channel halted
#[test]
fn stop_halts_a_running_channel() {
    let mut vdma = engine(false);
    vdma.start_write_frame(&setup_720p()).unwrap();
    vdma.dma_stop(Direction::Write);
    assert!(!vdma.channel(Direction::Write).is_running(vdma.io()));
    assert_eq!(vdma.io().peek(RX_OFFSET + CR_OFFSET) & CR_RUNSTOP_MASK, 0);
}

// Test 8: legacy cores always use descriptors
#[test]
fn legacy_core_programs_descriptors() {
    let mut vdma = Vdma::new(MockVdma::with_version(0x2100_0000));
    vdma.cfg_initialize(&test_config(false)).unwrap();
    vdma.start_read_frame(&setup_720p()).unwrap();
    assert_eq!(vdma.io().regs().writes_to(TX_OFFSET + CDESC_OFFSET).count(), 1);
    assert_eq!(vdma.io().regs().writes_to(MM2S_ADDR_OFFSET + HSIZE_OFFSET).count(), 0);
}

// Test 9: more than 16 frame stores switch to the high register bank and back
#[test]
fn high_frame_stores_use_the_second_bank() {
    let mut cfg = test_config(false);
    cfg.max_frame_store_num = 20;
    let mut vdma = Vdma::new(MockVdma::new());
    vdma.cfg_initialize(&cfg).unwrap();

    let addrs: Vec<u64> = (0..20u64).map(|i| 0x2000_0000 + i * 0x10_0000).collect();
    vdma.dma_set_buffer_addr(Direction::Write, &addrs).unwrap();

    let regs = vdma.io().regs();
    assert_eq!(
        regs.writes_to(RX_OFFSET + HI_FRMBUF_OFFSET).collect::<Vec<_>>(),
        [1, 0]
    );
    let first_slot = S2MM_ADDR_OFFSET + START_ADDR_OFFSET;
    assert_eq!(
        regs.writes_to(first_slot).collect::<Vec<_>>(),
        [0x2000_0000, 0x2100_0000]
    );
    let bank_switch = regs.position(|w| w.offset == RX_OFFSET + HI_FRMBUF_OFFSET).unwrap();
    let slot16 = regs
        .position(|w| w.offset == first_slot && w.value == 0x2100_0000)
        .unwrap();
    assert!(bank_switch < slot16);
}

// Test 10: 64-bit builds split each address into low and high words
#[test]
fn wide_addresses_use_low_and_high_words() {
    let mut cfg = test_config(false);
    cfg.addr_width = AddrWidth::Bits64;
    let mut vdma = Vdma::new(MockVdma::new());
    vdma.cfg_initialize(&cfg).unwrap();

    vdma.dma_set_buffer_addr(Direction::Read, &[0x1_2000_0000, 0x3_4000_0000])
        .unwrap();
    let bank = MM2S_ADDR_OFFSET;
    assert_eq!(vdma.io().peek(bank + START_ADDR_OFFSET), 0x2000_0000);
    assert_eq!(vdma.io().peek(bank + START_ADDR_MSB_OFFSET), 0x1);
    assert_eq!(vdma.io().peek(bank + START_ADDR_OFFSET + 8), 0x4000_0000);
    assert_eq!(vdma.io().peek(bank + START_ADDR_MSB_OFFSET + 8), 0x3);
    assert_eq!(vdma.io().regs().writes_to(TX_OFFSET + HI_FRMBUF_OFFSET).count(), 0);
}

// Test 11: direction codes from the host interface
#[test]
fn direction_codes_dispatch_to_channels() {
    assert_eq!(Direction::try_from(1), Ok(Direction::Write));
    assert_eq!(Direction::try_from(2), Ok(Direction::Read));
    assert_eq!(Direction::try_from(3), Err(VdmaError::InvalidParam));
    assert_eq!(Direction::try_from(0), Err(VdmaError::InvalidParam));

    let mut vdma = engine(false);
    let dir = Direction::try_from(2).unwrap();
    vdma.dma_config(dir, &setup_720p()).unwrap();
    assert_eq!(vdma.io().peek(MM2S_ADDR_OFFSET + HSIZE_OFFSET), 5120);
    assert_eq!(vdma.io().peek(S2MM_ADDR_OFFSET + HSIZE_OFFSET), 0);
}

// Test 12: park mode in SG needs a running channel, then pins one frame
#[test]
fn park_mode_setup_in_sg_mode() {
    let mut vdma = engine(true);
    let mut setup = setup_720p();
    setup.circular = false;
    setup.fixed_frame_store = 1;
    assert_eq!(vdma.dma_config(Direction::Write, &setup), Err(VdmaError::InvalidParam));

    setup.circular = true;
    vdma.start_write_frame(&setup).unwrap();
    vdma.io_mut().set_idle(Direction::Write, true);
    setup.circular = false;
    vdma.dma_config(Direction::Write, &setup).unwrap();
    assert_eq!(vdma.io().peek(RX_OFFSET + CR_OFFSET) & CR_TAIL_EN_MASK, 0);
    assert_eq!(vdma.io().peek(PARKPTR_OFFSET), 1 << 8);
    assert_eq!(vdma.curr_frame_store(Direction::Write), 0);
}

// Test 13: two small frames through config, addresses, start, busy and stop
#[test]
fn two_frame_read_lifecycle() {
    let mut cfg = test_config(false);
    cfg.max_frame_store_num = 2;
    if let Some(mm2s) = cfg.mm2s.as_mut() {
        mm2s.has_dre = false;
        mm2s.word_len_bits = 32;
        mm2s.stream_width_bits = 32;
    }
    let mut vdma = Vdma::new(MockVdma::new());
    vdma.cfg_initialize(&cfg).unwrap();

    let setup = DmaSetup {
        vert_size: 32,
        hori_size: 64,
        stride: 64,
        ..DmaSetup::default()
    };
    let addrs: [u64; 2] = [0x1000_0000, 0x1010_0000];
    vdma.dma_config(Direction::Read, &setup).unwrap();
    vdma.dma_set_buffer_addr(Direction::Read, &addrs).unwrap();
    vdma.dma_start(Direction::Read).unwrap();

    let io = vdma.io();
    assert_eq!(io.peek(MM2S_ADDR_OFFSET + HSIZE_OFFSET), 64);
    assert_eq!(io.peek(MM2S_ADDR_OFFSET + STRD_FRMDLY_OFFSET), 64);
    assert_eq!(io.peek(MM2S_ADDR_OFFSET + VSIZE_OFFSET), 32);
    assert_eq!(io.peek(MM2S_ADDR_OFFSET + START_ADDR_OFFSET), 0x1000_0000);
    assert_eq!(io.peek(MM2S_ADDR_OFFSET + START_ADDR_OFFSET + 4), 0x1010_0000);

    vdma.io_mut().set_idle(Direction::Read, true);
    assert!(!vdma.is_busy(Direction::Read));
    vdma.io_mut().set_idle(Direction::Read, false);
    assert!(vdma.is_busy(Direction::Read));

    let frm_store = vdma.io().peek(TX_OFFSET + FRMSTORE_OFFSET);
    let slots = [
        vdma.io().peek(MM2S_ADDR_OFFSET + START_ADDR_OFFSET),
        vdma.io().peek(MM2S_ADDR_OFFSET + START_ADDR_OFFSET + 4),
    ];
    vdma.dma_stop(Direction::Read);
    assert!(!vdma.channel(Direction::Read).is_running(vdma.io()));
    assert!(!vdma.is_busy(Direction::Read));
    assert_eq!(vdma.io().peek(TX_OFFSET + FRMSTORE_OFFSET), frm_store);
    assert_eq!(vdma.io().peek(MM2S_ADDR_OFFSET + START_ADDR_OFFSET), slots[0]);
    assert_eq!(vdma.io().peek(MM2S_ADDR_OFFSET + START_ADDR_OFFSET + 4), slots[1]);
}

// Test 14: configuring twice gives the same rounded geometry
#[test]
fn repeated_config_keeps_rounded_geometry() {
    let mut vdma = engine(false);
    let setup = DmaSetup {
        vert_size: 10,
        hori_size: 60,
        stride: 60,
        ..DmaSetup::default()
    };
    vdma.dma_config(Direction::Read, &setup).unwrap();
    let ch = vdma.channel(Direction::Read);
    let first = (ch.hsize(), ch.stride());
    assert_eq!(first, (64, 64));

    vdma.dma_config(Direction::Read, &setup).unwrap();
    let ch = vdma.channel(Direction::Read);
    assert_eq!((ch.hsize(), ch.stride()), first);

    let rounded = DmaSetup {
        hori_size: first.0,
        stride: first.1,
        ..setup
    };
    vdma.dma_config(Direction::Read, &rounded).unwrap();
    let ch = vdma.channel(Direction::Read);
    assert_eq!((ch.hsize(), ch.stride()), first);
    assert_eq!(vdma.io().peek(MM2S_ADDR_OFFSET + HSIZE_OFFSET), 64);
}

// Test 15: descriptors cannot be relocated while the hardware walks them
#[test]
fn busy_sg_channel_rejects_new_descriptor_storage() {
    let mut vdma = engine(true);
    vdma.start_read_frame(&setup_720p()).unwrap();
    assert!(vdma.is_busy(Direction::Read));

    assert_eq!(
        vdma.set_bd_addrs(Direction::Read, bd_storage(3), 0x0010_0000),
        Err(VdmaError::DeviceBusy)
    );
    let ring = vdma.channel(Direction::Read).ring();
    assert!(!ring.is_attached());
    assert_eq!(ring.get(0).unwrap().vsize(), 720);

    vdma.io_mut().set_idle(Direction::Read, true);
    vdma.set_bd_addrs(Direction::Read, bd_storage(3), 0x0010_0000)
        .unwrap();
    assert!(vdma.channel(Direction::Read).ring().is_attached());
}

// Test 16: a caller descriptor region receives the geometry and is walked
#[test]
fn caller_descriptor_storage_holds_the_ring() {
    let mut vdma = engine(true);
    let storage = bd_storage(4);
    let virt = storage.as_ptr() as usize as u64 as u32;
    vdma.set_bd_addrs(Direction::Read, storage, 0x0010_0000)
        .unwrap();
    assert_eq!(
        vdma.set_bd_addrs(Direction::Write, bd_storage(2), 0x0010_0000),
        Err(VdmaError::InvalidParam)
    );
    assert_eq!(
        vdma.set_bd_addrs(Direction::Write, bd_storage(3), 0x0010_0008),
        Err(VdmaError::InvalidParam)
    );

    vdma.start_read_frame(&setup_720p()).unwrap();
    let ring = vdma.channel(Direction::Read).ring();
    assert_eq!(ring.storage_address(), virt);
    assert_eq!(ring.head(), 0x0010_0000);
    for (bd, addr) in ring.iter().zip(FRAMES) {
        assert_eq!(bd.vsize(), 720);
        assert_eq!(bd.hsize(), 5120);
        assert_eq!(bd.addr(), addr);
    }
    assert_eq!(ring.get(0).unwrap().next(), 0x0010_0020);
    assert_eq!(ring.get(2).unwrap().next(), 0x0010_0000);
    assert_eq!(vdma.io().peek(TX_OFFSET + CDESC_OFFSET), 0x0010_0000);
    assert_eq!(vdma.io().peek(TX_OFFSET + TDESC_OFFSET), 0x0010_0040);
}

// Test 17: an engine moved after initialization points the hardware at the
// ring where it now lives
#[test]
fn moved_engine_loads_current_ring_address() {
    let vdma = engine(true);
    let mut vdma = Box::new(vdma);
    vdma.start_read_frame(&setup_720p()).unwrap();

    let ring = vdma.channel(Direction::Read).ring();
    let base = ring.storage_address();
    assert_eq!(ring.head(), base);
    assert_eq!(ring.get(2).unwrap().next(), base);
    assert_eq!(vdma.io().peek(TX_OFFSET + CDESC_OFFSET), base);
    assert_eq!(vdma.io().peek(TX_OFFSET + TDESC_OFFSET), base + 2 * BD_SIZE);
}
