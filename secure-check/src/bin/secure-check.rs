// Licensed under the Apache-2.0 license

//! Command line front end for the OTA secure check.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::LevelFilter;
use ota_secure_check::{
    classify, ImageKind, SecureBootImageHeader, SecureCheck, SecureCheckConfig,
};
use simple_logger::SimpleLogger;

#[derive(Parser, Debug)]
#[command(
    name = "secure-check",
    author,
    version,
    about = "Check that an OTA package matches the platform's secure-boot state",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check every boot-chain image of an update package against the platform
    Check {
        /// The update package (zip) to check
        package: PathBuf,

        #[command(flatten)]
        resources: Resources,
    },

    /// Report whether a single image is encrypted
    Classify {
        /// Raw image file
        image: PathBuf,

        /// Image kind: bootloader, boot or recovery
        #[arg(short, long)]
        kind: ImageKind,
    },

    /// Report the platform encryption state
    Platform {
        #[command(flatten)]
        resources: Resources,
    },
}

/// Locations of the kernel resources.
#[derive(Args, Debug, Clone)]
struct Resources {
    /// TOML file overriding the default kernel resource locations
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Platform encryption status file
    #[arg(long)]
    status_path: Option<PathBuf>,

    /// Signature verification channel
    #[arg(long)]
    channel_path: Option<PathBuf>,
}

impl Resources {
    fn load(&self) -> Result<SecureCheckConfig> {
        let mut config = match &self.config {
            Some(path) => SecureCheckConfig::from_file(path)?,
            None => SecureCheckConfig::default(),
        };
        if let Some(path) = &self.status_path {
            config.status_path = path.clone();
        }
        if let Some(path) = &self.channel_path {
            config.channel_path = path.clone();
        }
        Ok(config)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match (cli.quiet, cli.verbose) {
        (true, _) => LevelFilter::Error,
        (false, 0) => LevelFilter::Info,
        (false, 1) => LevelFilter::Debug,
        (false, _) => LevelFilter::Trace,
    };
    if let Err(e) = SimpleLogger::new().with_level(level).init() {
        eprintln!("Failed to initialize logger: {e}");
    }

    match run(cli.command) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<ExitCode> {
    match command {
        Commands::Check { package, resources } => run_check(&package, &resources),
        Commands::Classify { image, kind } => run_classify(&image, kind),
        Commands::Platform { resources } => run_platform(&resources),
    }
}

fn run_check(package: &Path, resources: &Resources) -> Result<ExitCode> {
    let config = resources.load()?;
    let verdict = SecureCheck::new(config).run(package);

    println!("{}", verdict.code());
    if verdict.allows_install() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

fn run_classify(path: &Path, kind: ImageKind) -> Result<ExitCode> {
    let image = std::fs::read(path)
        .with_context(|| format!("Failed to read image file '{}'", path.display()))?;
    let state = classify(kind, &image)?;

    println!("{kind}: {state}");
    if kind.has_secure_boot_header() {
        if let Some(header) = SecureBootImageHeader::parse(&image) {
            println!(
                "  magic: {:?}, version: {:#06x}, totalLenAfterEncrypted: {:#x}",
                String::from_utf8_lossy(header.magic()),
                header.version(),
                header.total_len_after_encrypted()
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn run_platform(resources: &Resources) -> Result<ExitCode> {
    let config = resources.load()?;
    if !config.kernel_supported() {
        println!("kernel doesn't support secure check");
        return Ok(ExitCode::SUCCESS);
    }

    let state = SecureCheck::new(config).probe_platform()?;
    println!("platform: {state}");
    Ok(ExitCode::SUCCESS)
}
