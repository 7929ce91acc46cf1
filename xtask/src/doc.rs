use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;
use std::time::Instant;

use crate::check::IOP_TARGET;

/// Driver crates and the feature sets their docs are built with. The host
/// pass is the one that gets opened; the target pass only has to build, so
/// the `defmt`-gated items are covered too.
const PASSES: &[DocPass] = &[
    DocPass {
        label: "host (std + tracing)",
        args: &["--features", "platform/std,vdma/std,vdma/tracing"],
        openable: true,
    },
    DocPass {
        label: "IOP target (defmt)",
        args: &["--target", IOP_TARGET, "--features", "vdma/defmt"],
        openable: false,
    },
];

struct DocPass {
    label: &'static str,
    args: &'static [&'static str],
    openable: bool,
}

pub fn run(open: bool) -> Result<()> {
    println!();
    println!("{}", "📚 Building platform and vdma docs...".cyan().bold());
    println!();

    let start = Instant::now();
    for pass in PASSES {
        build(pass, open && pass.openable)?;
    }

    println!(
        "{}",
        format!("✓ Docs built in {:.2}s", start.elapsed().as_secs_f64()).green()
    );
    if !open {
        println!(
            "   {}",
            "target/doc/vdma/index.html (or: cargo xtask doc --open)".dimmed()
        );
    }
    println!();
    Ok(())
}

fn build(pass: &DocPass, open: bool) -> Result<()> {
    println!("{}", format!("  Documenting {}...", pass.label).cyan());

    let mut cmd = Command::new("cargo");
    cmd.args(["doc", "-p", "platform", "-p", "vdma", "--no-deps"])
        .args(pass.args)
        // Register and operation links must resolve.
        .env("RUSTDOCFLAGS", "-D rustdoc::broken_intra_doc_links");
    if open {
        cmd.arg("--open");
    }

    let output = cmd
        .output()
        .with_context(|| format!("Failed to document {}", pass.label))?;
    if !output.status.success() {
        eprintln!("{}", format!("  ✗ {} docs failed", pass.label).red().bold());
        eprintln!();
        eprintln!("{}", String::from_utf8_lossy(&output.stderr));
        anyhow::bail!("{} docs failed", pass.label);
    }
    println!("{}", format!("  ✓ {}", pass.label).green());
    Ok(())
}
