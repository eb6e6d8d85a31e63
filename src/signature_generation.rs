use std::fmt::Display;
use std::fs::File;
use std::io::{self, BufWriter, ErrorKind, Read, Write};
use std::mem;
use std::panic;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use log::{debug, info};
use thiserror::Error;

use crate::block_checksum::BlockChecksum;
use crate::task_future::{TaskError, TaskFuture};
use crate::worker_pool::WorkerPool;

/// Block size used when the caller passes zero.
pub const DEFAULT_BLOCK_SIZE: u32 = 1 << 20;
/// Blocks gathered into one write batch when the caller passes zero.
pub const DEFAULT_BATCH_SIZE: usize = 20;

#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("cannot open input file {path}: {source}")]
    InputOpen { path: PathBuf, source: io::Error },
    #[error("cannot create output file {path}: {source}")]
    OutputOpen { path: PathBuf, source: io::Error },
    #[error("checksum task failed: {0}")]
    Task(#[from] TaskError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy)]
pub struct SignatureOptions {
    /// Bytes per block; 0 selects [`DEFAULT_BLOCK_SIZE`].
    pub block_size: u32,
    /// Blocks per write batch; 0 selects [`DEFAULT_BATCH_SIZE`].
    pub batch_size: usize,
    /// Worker threads; 0 selects one per available hardware unit.
    pub workers: usize,
}

impl Default for SignatureOptions {
    fn default() -> Self {
        SignatureOptions {
            block_size: DEFAULT_BLOCK_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            workers: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureStats {
    pub block_count: u64,
    pub bytes_read: u64,
}

/// Writes the signature of `input_path` into `output_path`: one decimal
/// checksum per block, newline-terminated, in block order.
///
/// Fails with [`SignatureError::InputOpen`] before the output is touched,
/// so a bad input path never truncates an existing signature file. Once
/// the output opens it is already truncated; a mid-run failure leaves it
/// in whatever partial state the run reached.
pub fn generate_signature<C>(
    input_path: &Path,
    output_path: &Path,
    options: &SignatureOptions,
) -> Result<SignatureStats, SignatureError>
where
    C: BlockChecksum + 'static,
    <C as BlockChecksum>::ChecksumType: Display + Send + 'static,
{
    let input = File::open(input_path).map_err(|source| SignatureError::InputOpen {
        path: input_path.to_path_buf(),
        source,
    })?;
    let output = File::create(output_path).map_err(|source| SignatureError::OutputOpen {
        path: output_path.to_path_buf(),
        source,
    })?;

    let stats = write_signature::<C, _, _>(input, BufWriter::new(output), options)?;
    info!(
        "signature of {}: {} blocks over {} bytes",
        input_path.display(),
        stats.block_count,
        stats.bytes_read
    );
    Ok(stats)
}

/// The sink is in exactly one of two places at any instant: held by the
/// read loop, or travelling through a batch-write thread. Reclaiming it
/// joins that thread first, which is what serializes batch writes and
/// bounds buffered blocks to roughly twice the batch size.
enum SinkState<W> {
    Idle(W),
    Writing(JoinHandle<Result<W, SignatureError>>),
}

impl<W> SinkState<W> {
    fn reclaim(self) -> Result<W, SignatureError> {
        match self {
            SinkState::Idle(sink) => Ok(sink),
            SinkState::Writing(handle) => match handle.join() {
                Ok(outcome) => outcome,
                Err(cause) => panic::resume_unwind(cause),
            },
        }
    }
}

/// Pipelined core of [`generate_signature`], generic over the byte source
/// and sink.
///
/// Reads blocks sequentially, checksums them on a worker pool, and flushes
/// completed checksums in batches while the read loop keeps going. Output
/// is byte-identical to a sequential run for any worker count.
pub fn write_signature<C, R, W>(
    mut input: R,
    output: W,
    options: &SignatureOptions,
) -> Result<SignatureStats, SignatureError>
where
    C: BlockChecksum + 'static,
    <C as BlockChecksum>::ChecksumType: Display + Send + 'static,
    R: Read,
    W: Write + Send + 'static,
{
    let block_size = match options.block_size {
        0 => DEFAULT_BLOCK_SIZE as usize,
        set => set as usize,
    };
    let batch_size = match options.batch_size {
        0 => DEFAULT_BATCH_SIZE,
        set => set,
    };
    let pool = match options.workers {
        0 => WorkerPool::new(),
        set => WorkerPool::with_workers(set),
    };
    info!(
        "block size: {}; batch size: {}; {} workers",
        block_size,
        batch_size,
        pool.worker_count()
    );

    let mut pending: Vec<TaskFuture<C::ChecksumType>> = Vec::with_capacity(batch_size);
    let mut sink = SinkState::Idle(output);
    let mut stats = SignatureStats {
        block_count: 0,
        bytes_read: 0,
    };

    loop {
        let block = match read_block(&mut input, block_size) {
            Ok(block) => block,
            Err(source) => {
                // reclaim so no write thread outlives this call; the read
                // error is the one worth reporting
                let _ = sink.reclaim();
                return Err(source.into());
            }
        };
        if block.is_empty() {
            break;
        }
        stats.block_count += 1;
        stats.bytes_read += block.len() as u64;

        pending.push(pool.submit(move || C::checksum(&block)));

        if pending.len() == batch_size {
            let writer = sink.reclaim()?;
            let batch = mem::replace(&mut pending, Vec::with_capacity(batch_size));
            debug!("handing off batch ending at block {}", stats.block_count);
            sink = SinkState::Writing(thread::spawn(move || write_batch(batch, writer)));
        }
    }

    // the final (possibly partial, possibly empty) batch is flushed on this
    // thread; every future ever created has been waited on once this returns
    let writer = sink.reclaim()?;
    let mut writer = write_batch(pending, writer)?;
    writer.flush()?;

    Ok(stats)
}

/// Resolves each future in submission order and writes its checksum as one
/// decimal line. Returns the sink so the next batch can reuse it.
fn write_batch<T, W>(batch: Vec<TaskFuture<T>>, mut sink: W) -> Result<W, SignatureError>
where
    T: Display,
    W: Write,
{
    for future in batch {
        let checksum = future.wait()?;
        writeln!(sink, "{}", checksum)?;
    }
    Ok(sink)
}

/// Reads up to `block_size` bytes; a short block means end of input is
/// next. Interrupted reads are retried.
fn read_block<R: Read>(input: &mut R, block_size: usize) -> io::Result<Vec<u8>> {
    let mut buffer = vec![0u8; block_size];
    let mut filled = 0;
    while filled < block_size {
        match input.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(count) => filled += count,
            Err(source) if source.kind() == ErrorKind::Interrupted => continue,
            Err(source) => return Err(source),
        }
    }
    buffer.truncate(filled);
    Ok(buffer)
}
