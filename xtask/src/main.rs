use anyhow::{bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use std::path::Path;
use std::process::Command;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "x")]
#[command(about = "Development automation for gdrom")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Format check, clippy and the full test run
    Ci,
    /// Format code (or only check formatting)
    Fmt {
        #[arg(long)]
        check: bool,
    },
    /// Run clippy with warnings denied
    Clippy,
    /// Run tests, optionally a single suite
    Test {
        #[arg(value_enum)]
        suite: Option<Suite>,
    },
    /// Run the criterion benchmarks
    Bench,
    /// Print disc info and both TOCs of an image with gdinfo
    Inspect {
        /// Disc image (.gdi, .cdi or .chd)
        image: String,
        #[arg(long)]
        release: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Suite {
    /// ATA/packet controller unit tests
    Gdrom,
    /// Mount registry and image backend unit tests
    Mount,
    /// Register-level tests against fixture images
    Integration,
    /// Doc tests
    Doc,
}

impl Suite {
    fn cargo_args(self) -> &'static [&'static str] {
        match self {
            Suite::Gdrom => &["--lib", "core::gdrom"],
            Suite::Mount => &["--lib", "core::mount"],
            Suite::Integration => &["--test", "gdrom_integration"],
            Suite::Doc => &["--doc"],
        }
    }
}

fn main() -> Result<()> {
    match Cli::parse().command {
        Commands::Ci => ci(),
        Commands::Fmt { check } => fmt(check),
        Commands::Clippy => clippy(),
        Commands::Test { suite } => test(suite),
        Commands::Bench => cargo(&["bench"]),
        Commands::Inspect { image, release } => inspect(&image, release),
    }
}

fn ci() -> Result<()> {
    println!("{}", "=== gdrom CI ===".bold().blue());
    let start = Instant::now();

    let steps: [(&str, fn() -> Result<()>); 3] = [
        ("fmt", || fmt(true)),
        ("clippy", clippy),
        ("test", || test(None)),
    ];
    for (name, step) in steps {
        println!("{} {}", "→".blue(), name.bold());
        if let Err(e) = step() {
            println!("{} {} failed", "✗".red().bold(), name);
            return Err(e);
        }
    }

    println!(
        "{} CI passed in {:.2}s",
        "✓".green().bold(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

fn fmt(check: bool) -> Result<()> {
    if check {
        cargo(&["fmt", "--all", "--", "--check"])
    } else {
        cargo(&["fmt", "--all"])
    }
}

fn clippy() -> Result<()> {
    cargo(&["clippy", "--all-targets", "--", "-D", "warnings"])
}

fn test(suite: Option<Suite>) -> Result<()> {
    let mut args = vec!["test"];
    if let Some(suite) = suite {
        args.extend_from_slice(suite.cargo_args());
    }
    cargo(&args)
}

fn inspect(image: &str, release: bool) -> Result<()> {
    let path = Path::new(image);
    if !path.is_file() {
        bail!("image not found: {}", image);
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !matches!(ext.as_str(), "gdi" | "cdi" | "chd") {
        bail!("{} is not a .gdi, .cdi or .chd image", image);
    }

    println!("{} {}", "Image:".bold(), image.cyan());
    let runs: [&[&str]; 3] = [&["info"], &["toc"], &["toc", "--hd"]];
    for sub in runs {
        let mut args = vec!["run", "--quiet", "--bin", "gdinfo"];
        if release {
            args.push("--release");
        }
        args.extend(["--", sub[0], image]);
        args.extend_from_slice(&sub[1..]);
        cargo(&args)?;
        println!();
    }
    Ok(())
}

fn cargo(args: &[&str]) -> Result<()> {
    let status = Command::new("cargo").args(args).status()?;
    if !status.success() {
        bail!("cargo {} exited with {}", args.join(" "), status);
    }
    Ok(())
}
