use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use env_logger::Env;
use log::info;

use blocksig::block_checksum::crc32::Crc32;
use blocksig::signature_generation::{generate_signature, SignatureOptions};

#[derive(Parser, Debug)]
#[clap(version, about)]
/// Computes a per-block CRC-32 signature of a file: the input is split into
/// fixed-size blocks and one decimal checksum per block is written to the
/// signature file, in block order
struct Cli {
    #[clap(short, long)]
    /// The file to fingerprint
    input: PathBuf,
    #[clap(short, long)]
    /// The resulting signature file, one checksum per line
    output: PathBuf,
    #[clap(short = 's', long, default_value_t = 0)]
    /// Block size in bytes; 0 selects the 1 MiB default
    block_size: u32,
    #[clap(short = 'j', long, default_value_t = 0)]
    /// Number of worker threads; 0 selects one per available CPU
    workers: usize,
    #[clap(long, default_value_t = 0)]
    /// Blocks gathered per write batch; 0 selects the default of 20
    batch_size: usize,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli: Cli = Cli::parse();

    info!(
        "Generating signature of {} into {}",
        cli.input.display(),
        cli.output.display()
    );

    let options = SignatureOptions {
        block_size: cli.block_size,
        batch_size: cli.batch_size,
        workers: cli.workers,
    };

    let started = Instant::now();
    let stats = generate_signature::<Crc32>(&cli.input, &cli.output, &options)?;
    info!(
        "Done: {} blocks, {} bytes, {} ms",
        stats.block_count,
        stats.bytes_read,
        started.elapsed().as_millis()
    );
    Ok(())
}
