mod cli;
mod commands;
mod config;
mod error;

use clap::Parser;
use tracing::subscriber::set_global_default;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::Registry;

use crate::cli::{
    Args,
    Commands,
};
use crate::commands::{
    main_bin_mobilograms,
    main_detect_peaks,
    main_refine_annotations,
    main_write_template,
};
use crate::error::CliError;

// Without mimalloc the rayon heavy paths crawl on windows.
#[cfg(target_os = "windows")]
use mimalloc::MiMalloc;

#[cfg(target_os = "windows")]
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> Result<(), CliError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = Registry::default()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_span_events(FmtSpan::CLOSE));

    set_global_default(subscriber).expect("Setting default subscriber failed");
    let args = Args::parse();

    match args.command {
        Some(Commands::DetectPeaks(args)) => main_detect_peaks(args)?,
        Some(Commands::BinMobilograms(args)) => main_bin_mobilograms(args)?,
        Some(Commands::RefineAnnotations(args)) => main_refine_annotations(args)?,
        Some(Commands::WriteTemplate(args)) => main_write_template(args)?,
        None => {
            println!("No command provided");
        }
    }
    Ok(())
}
