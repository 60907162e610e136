//! LogFS CLI
//!
//! Command-line interface for creating, appending to and reading a
//! file-backed log device.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process;

use clap::{Args as ClapArgs, Parser, Subcommand};
use logfs::{BlockDevice, Config, FileDevice, LogFs, LogFsError, TrailingBlock};
use tracing_subscriber::{fmt, EnvFilter};

/// LogFS CLI
#[derive(Parser, Debug)]
#[command(name = "logfs-cli")]
#[command(about = "Append-only log over a block device file")]
#[command(version)]
struct Args {
    #[command(flatten)]
    tuning: Tuning,

    #[command(subcommand)]
    command: Commands,
}

#[derive(ClapArgs, Debug)]
struct Tuning {
    /// Device block size in bytes
    #[arg(short, long, global = true, default_value = "4096")]
    block_size: usize,

    /// Write buffer capacity in blocks
    #[arg(long, global = true, default_value = "32")]
    wcache_blocks: usize,

    /// Read cache entries
    #[arg(long, global = true, default_value = "256")]
    rcache_blocks: usize,

    /// Keep a trailing partial block in memory instead of padding it
    #[arg(long, global = true)]
    defer_trailing: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a zero-filled device file
    Create {
        /// Path of the device file
        device: PathBuf,

        /// Number of blocks
        #[arg(short = 'n', long)]
        blocks: u64,
    },

    /// Append a file (or stdin) to the log, starting at offset 0
    Append {
        /// Path of the device file
        device: PathBuf,

        /// Input file; stdin if omitted
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Read a byte range from the log
    Read {
        /// Path of the device file
        device: PathBuf,

        /// Logical start offset
        #[arg(short, long, default_value = "0")]
        offset: u64,

        /// Number of bytes
        #[arg(short, long)]
        len: usize,

        /// Output file; stdout if omitted
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Show device geometry
    Info {
        /// Path of the device file
        device: PathBuf,
    },
}

fn main() {
    // Initialize tracing/logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,logfs=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> logfs::Result<()> {
    let config = Config::builder()
        .block_size(args.tuning.block_size)
        .wcache_blocks(args.tuning.wcache_blocks)
        .rcache_blocks(args.tuning.rcache_blocks)
        .trailing_block(if args.tuning.defer_trailing {
            TrailingBlock::Defer
        } else {
            TrailingBlock::Pad
        })
        .build();
    config.validate()?;

    match args.command {
        Commands::Create { device, blocks } => {
            let dev = FileDevice::create(&device, config.block_size, blocks).map_err(|source| {
                LogFsError::Device {
                    path: device.clone(),
                    source,
                }
            })?;
            println!(
                "created {} ({} blocks of {} bytes)",
                device.display(),
                blocks,
                dev.block_size()
            );
        }
        Commands::Append { device, input } => {
            let mut reader: Box<dyn Read> = match input {
                Some(path) => Box::new(File::open(path)?),
                None => Box::new(io::stdin().lock()),
            };
            let log = LogFs::open_with_config(&device, config)?;
            let written = append_all(&log, &mut reader)?;
            log.close()?;
            println!("{}", written);
        }
        Commands::Read {
            device,
            offset,
            len,
            output,
        } => {
            let log = LogFs::open_with_config(&device, config)?;
            let data = log.read(offset, len)?;
            log.close()?;
            match output {
                Some(path) => File::create(path)?.write_all(&data)?,
                None => io::stdout().lock().write_all(&data)?,
            }
        }
        Commands::Info { device } => {
            let dev = FileDevice::open(&device, config.block_size).map_err(|source| {
                LogFsError::Device {
                    path: device.clone(),
                    source,
                }
            })?;
            println!("device:     {}", dev.path().display());
            println!("block size: {}", dev.block_size());
            println!("capacity:   {}", dev.capacity());
            println!("blocks:     {}", dev.capacity() / dev.block_size() as u64);
        }
    }
    Ok(())
}

/// Stream `reader` into the log in chunks that fit the write buffer
///
/// When the buffer is full, a forced flush drains it before retrying. At
/// most one partial block survives a flush, so a chunk of
/// `capacity - block_size + 1` bytes always fits afterwards.
fn append_all(log: &LogFs, reader: &mut dyn Read) -> logfs::Result<u64> {
    let mut chunk = vec![0u8; log.capacity() - log.block_size() + 1];
    let mut total = 0u64;
    loop {
        let n = reader.read(&mut chunk)?;
        if n == 0 {
            return Ok(total);
        }
        loop {
            match log.append(&chunk[..n]) {
                Ok(()) => break,
                Err(e) if e.is_out_of_space() => {
                    log.flush()?;
                }
                Err(e) => return Err(e),
            }
        }
        total += n as u64;
    }
}
