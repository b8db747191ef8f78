// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod analyze;
pub mod annotate;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// HealVision CLI
#[derive(Parser, Debug)]
#[command(name = "healvision-cli")]
#[command(version = "1.0.0")]
#[command(about = "Offline chest X-ray analysis with the HealVision pipeline", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze a single chest X-ray image
    Analyze(analyze::AnalyzeArgs),
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Analyze(args) => analyze::run_analyze(args).await,
    }
}
