// Host tooling crate: unwrap/expect/panic acceptable outside the drivers.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(clippy::arithmetic_side_effects, clippy::indexing_slicing, clippy::use_debug)]
#![allow(missing_docs)]

mod check;
mod decode;
mod doc;
mod simulate;
mod test;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "VDMA driver development tasks", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the drivers build for the bare-metal target and the host
    Check,
    /// Run all tests (unit, integration, and doc)
    Test {
        /// Run only unit tests
        #[arg(long)]
        unit: bool,
        /// Run only integration tests
        #[arg(long)]
        integration: bool,
    },
    /// Build and optionally open documentation
    Doc {
        /// Open documentation in browser
        #[arg(long)]
        open: bool,
    },
    /// Decode a raw VDMA register value into its fields
    Decode {
        /// Register the value was read from
        #[arg(value_enum)]
        register: decode::Register,
        /// Raw value, decimal or 0x-prefixed hex
        value: String,
    },
    /// Run a transfer against the register model with driver tracing enabled
    Simulate {
        /// Number of frame stores to program
        #[arg(long, default_value_t = 3)]
        frames: usize,
        /// Use scatter-gather descriptors instead of direct registers
        #[arg(long)]
        sg: bool,
        /// Frame-count interrupts to deliver before the injected error
        #[arg(long, default_value_t = 4)]
        interrupts: u32,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check => check::run(),
        Commands::Test { unit, integration } => test::run(unit, integration),
        Commands::Doc { open } => doc::run(open),
        Commands::Decode { register, value } => decode::run(register, &value),
        Commands::Simulate {
            frames,
            sg,
            interrupts,
        } => simulate::run(frames, sg, interrupts),
    }
}
