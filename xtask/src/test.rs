use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Unit,
    Integration,
    Doc,
}

/// One `cargo test` invocation.
struct Suite {
    label: &'static str,
    kind: Kind,
    args: &'static [&'static str],
}

const SUITES: &[Suite] = &[
    Suite {
        label: "platform unit",
        kind: Kind::Unit,
        args: &["-p", "platform", "--lib"],
    },
    // Host logging compiled in so the tracing call sites are built.
    Suite {
        label: "vdma unit",
        kind: Kind::Unit,
        args: &["-p", "vdma", "--lib", "--features", "std,tracing"],
    },
    Suite {
        label: "xtask unit",
        kind: Kind::Unit,
        args: &["-p", "xtask", "--bins"],
    },
    Suite {
        label: "platform integration",
        kind: Kind::Integration,
        args: &["-p", "platform", "--test", "*"],
    },
    Suite {
        label: "vdma integration",
        kind: Kind::Integration,
        args: &["-p", "vdma", "--test", "*"],
    },
    Suite {
        label: "doc",
        kind: Kind::Doc,
        args: &["-p", "platform", "-p", "vdma", "--doc"],
    },
];

pub fn run(unit_only: bool, integration_only: bool) -> Result<()> {
    println!();
    println!("{}", "🧪 Running driver tests...".cyan().bold());
    println!();

    let total_start = Instant::now();
    let selected = SUITES.iter().filter(|suite| match suite.kind {
        Kind::Unit => !integration_only,
        Kind::Integration => !unit_only,
        Kind::Doc => !unit_only && !integration_only,
    });
    for suite in selected {
        run_suite(suite)?;
    }

    println!(
        "{}",
        format!(
            "✓ All tests completed in {:.2}s",
            total_start.elapsed().as_secs_f64()
        )
        .green()
        .bold()
    );
    println!();
    Ok(())
}

fn run_suite(suite: &Suite) -> Result<()> {
    println!("{}", format!("  Running {} tests...", suite.label).cyan());
    let start = Instant::now();

    let output = Command::new("cargo")
        .arg("test")
        .args(suite.args)
        .output()
        .with_context(|| format!("Failed to run {} tests", suite.label))?;
    let stdout = String::from_utf8_lossy(&output.stdout);

    if !output.status.success() {
        // Doc examples are advisory.
        if suite.kind == Kind::Doc {
            eprintln!("{}", "  ⚠ Doc tests failed".yellow().bold());
            println!();
            return Ok(());
        }
        eprintln!("{}", format!("  ✗ {} tests failed", suite.label).red().bold());
        eprintln!();
        for line in stdout.lines() {
            eprintln!("  {line}");
        }
        eprintln!("{}", String::from_utf8_lossy(&output.stderr));
        anyhow::bail!("{} tests failed", suite.label);
    }

    println!(
        "{}",
        format!(
            "  ✓ {} tests passed {} in {:.2}s",
            suite.label,
            extract_test_summary(&stdout),
            start.elapsed().as_secs_f64()
        )
        .green()
    );
    println!();
    Ok(())
}

fn extract_test_summary(output: &str) -> String {
    // One "test result:" line per test binary; sum them.
    let mut passed = 0u32;
    let mut binaries = 0u32;
    for line in output.lines() {
        if let Some(summary) = line.split("test result:").nth(1) {
            binaries += 1;
            // "ok. 5 passed; 0 failed; ..."
            let first = summary.split(';').next().unwrap_or_default();
            passed += first
                .split_whitespace()
                .find_map(|word| word.parse::<u32>().ok())
                .unwrap_or(0);
        }
    }
    if binaries == 0 {
        return "(summary not available)".to_string();
    }
    format!("({passed} passed across {binaries} binaries)")
}

#[cfg(test)]
mod tests {
    use super::extract_test_summary;

    #[test]
    fn sums_every_test_binary() {
        let output = "\
running 3 tests
test result: ok. 3 passed; 0 failed; 0 ignored; 0 measured; 0 filtered out

running 12 tests
test result: ok. 12 passed; 0 failed; 0 ignored; 0 measured; 0 filtered out
";
        assert_eq!(extract_test_summary(output), "(15 passed across 2 binaries)");
    }

    #[test]
    fn unit_and_integration_suites_are_disjoint() {
        use super::{Kind, SUITES};
        let unit = SUITES.iter().filter(|s| s.kind == Kind::Unit);
        assert!(unit.clone().all(|s| !s.args.contains(&"--test")));
        assert_eq!(unit.count(), 3);
        assert!(SUITES
            .iter()
            .filter(|s| s.kind == Kind::Integration)
            .all(|s| s.args.contains(&"--test")));
    }

    #[test]
    fn missing_summary() {
        assert_eq!(extract_test_summary("error: no test target"), "(summary not available)");
    }
}
