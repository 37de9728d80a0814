//! nether-anim - skeletal animation compression tool for Nethercore
//!
//! # Commands
//!
//! - `nether-anim build` - Compress every clip listed in anim.toml
//! - `nether-anim compress` - Compress a single raw clip
//! - `nether-anim inspect` - Print statistics and track tables of a .nanim file
//! - `nether-anim sample` - Print interpolated bone atoms at a playback time
//! - `nether-anim gen-test` - Write a synthetic skeleton, clips and anim.toml
//!
//! # Manifest (anim.toml)
//!
//! ```toml
//! skeleton = "skeleton.json"
//!
//! [output]
//! dir = "build"
//!
//! [compression]
//! rotation_format = "Fixed48NoW"
//!
//! [compression.scheme]
//! kind = "remove_linear_keys"
//! max_pos_diff = 0.1
//!
//! [[clips]]
//! id = "walk"
//! path = "clips/walk.json"
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};

use nether_anim_cli::{build, compress, gen_test, inspect, sample};

/// nether-anim - skeletal animation compression tool
#[derive(Parser)]
#[command(name = "nether-anim")]
#[command(about = "Skeletal animation compression tool for Nethercore")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress every clip listed in anim.toml
    Build(build::BuildArgs),

    /// Compress a single raw clip
    Compress(compress::CompressArgs),

    /// Print statistics and track tables of a .nanim file
    Inspect(inspect::InspectArgs),

    /// Print interpolated bone atoms at a playback time
    Sample(sample::SampleArgs),

    /// Write a synthetic skeleton, clips and anim.toml
    GenTest(gen_test::GenTestArgs),
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build(args) => build::execute(args),
        Commands::Compress(args) => compress::execute(args),
        Commands::Inspect(args) => inspect::execute(args),
        Commands::Sample(args) => sample::execute(args),
        Commands::GenTest(args) => gen_test::execute(args),
    }
}
