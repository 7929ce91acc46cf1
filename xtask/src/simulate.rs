use std::cell::Cell;

use anyhow::{Context, Result};
use colored::Colorize;
use tracing_subscriber::EnvFilter;
use vdma::mocks::{test_config, MockVdma};
use vdma::regs::{IXR_ALL_MASK, IXR_FRMCNT_MASK, SR_ERR_SLAVE_MASK};
use vdma::{Bd, CallbackType, Channel, Direction, DmaSetup, Vdma, VdmaError};

const LINES: u32 = 480;
const LINE_BYTES: u32 = 640 * 4;
const FRAME_BASE: u64 = 0x1000_0000;
const BD_BUS_BASE: u32 = 0x0010_0000;

/// Drive the write channel of a modelled VDMA through a capture session.
///
/// Driver events are printed through `tracing`; set `RUST_LOG` to change
/// the level (default `info`).
pub fn run(frames: usize, sg: bool, interrupts: u32) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    println!();
    let mode = if sg { "scatter-gather" } else { "direct register" };
    println!(
        "{}",
        format!("🎞  Simulating {frames}-frame capture ({mode} mode)...")
            .cyan()
            .bold()
    );
    println!();

    let completed = Cell::new(0u32);
    let recovered = Cell::new(false);
    let mut on_frame = |_: &mut MockVdma, _: &mut Channel, mask: u32| {
        if mask & IXR_FRMCNT_MASK != 0 {
            completed.set(completed.get() + 1);
        }
    };
    let mut on_error = |io: &mut MockVdma, channel: &mut Channel, _: u32| {
        channel.reset(io);
        recovered.set(true);
    };

    let mut config = test_config(sg);
    config.max_frame_store_num =
        u16::try_from(frames).context("frame count does not fit the frame store register")?;

    let mut vdma = Vdma::new(MockVdma::new());
    vdma.cfg_initialize(&config)
        .map_err(driver_error)
        .context("initialization failed")?;
    println!(
        "  {} {}",
        "core version".dimmed(),
        vdma.version_info()
    );

    if sg {
        // Stands in for a descriptor region reserved in on-chip memory.
        let descriptors = Box::leak(vec![Bd::ZERO; frames].into_boxed_slice());
        vdma.set_bd_addrs(Direction::Write, descriptors, BD_BUS_BASE)
            .map_err(driver_error)
            .context("descriptor ring setup failed")?;
    }

    let frame_bytes = u64::from(LINES * LINE_BYTES);
    let mut setup = DmaSetup {
        vert_size: LINES,
        hori_size: LINE_BYTES,
        stride: LINE_BYTES,
        ..DmaSetup::default()
    };
    for (i, addr) in setup
        .frame_store_start_addr
        .iter_mut()
        .take(frames)
        .enumerate()
    {
        *addr = FRAME_BASE + frame_bytes * i as u64;
    }

    vdma.set_callback(Direction::Write, CallbackType::General, &mut on_frame);
    vdma.set_callback(Direction::Write, CallbackType::Error, &mut on_error);
    vdma.intr_enable(IXR_ALL_MASK, Direction::Write);
    vdma.start_write_frame(&setup)
        .map_err(driver_error)
        .context("write channel did not start")?;
    vdma.dma_register_dump(Direction::Write);

    for _ in 0..interrupts {
        vdma.io_mut().raise(Direction::Write, IXR_FRMCNT_MASK);
        vdma.write_intr_handler();
    }

    vdma.io_mut().inject_error(Direction::Write, SR_ERR_SLAVE_MASK);
    vdma.write_intr_handler();
    let after_recovery = vdma.dma_register_dump(Direction::Write);

    println!();
    println!(
        "  {} {}",
        "frame interrupts".dimmed(),
        completed.get()
    );
    println!(
        "  {} {}",
        "error recovered".dimmed(),
        recovered.get()
    );
    if let Some(snapshot) = after_recovery {
        println!(
            "  {} CR={:#010x} SR={:#010x}",
            "after reset".dimmed(),
            snapshot.control,
            snapshot.status
        );
    }
    println!();
    println!("{}", "✓ Simulation finished".green().bold());
    println!();

    Ok(())
}

fn driver_error(e: VdmaError) -> anyhow::Error {
    anyhow::anyhow!("{e} (status {})", e.status_code())
}
