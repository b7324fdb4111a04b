//! Pipeline coordination.
//!
//! One producer (the decode loop, on a blocking thread) feeds a bounded
//! queue; a fixed pool of loader workers drains it. The queue bound is the
//! backpressure mechanism: the producer blocks when the workers fall behind.
//! Records are enqueued in input order, but with several consumers the
//! relative write order across records is not guaranteed.

use crate::error::EtlError;
use crate::load::decoder::{LineItem, RecordDecoder};
use crate::load::loader::{DEFAULT_WORKERS, LoadError, LoaderPool};
use crate::load::stats::RunSummary;
use sqlx::PgPool;
use std::io::Read;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Default capacity of the decoder-to-loader queue. Sized to smooth
/// producer/consumer rate mismatch, not for durability.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub workers: usize,
    pub queue_capacity: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

#[derive(Debug, Default)]
struct DecodeCounts {
    attempted: u64,
    errors: u64,
}

/// Run the extract-transform-load phase over `input`.
///
/// Decodes rows, normalizes addresses, routes records through the bounded
/// queue to the worker pool, and tallies the run. Per-row decode and
/// address failures are counted and skipped; the first write error aborts
/// the run and is returned instead of a summary.
pub async fn run<R>(input: R, pool: PgPool, options: PipelineOptions) -> Result<RunSummary, EtlError>
where
    R: Read + Send + 'static,
{
    let started = Instant::now();

    let (sender, receiver) = mpsc::channel(options.queue_capacity);
    let cancel = CancellationToken::new();

    log::info!(
        "starting load: {} workers, queue capacity {}",
        options.workers,
        options.queue_capacity
    );

    let workers = LoaderPool::new(pool).spawn(options.workers, receiver, cancel.clone());

    // The decode loop is blocking file I/O, so it runs off the async
    // runtime. Dropping the sender at the end closes the queue and lets the
    // workers drain and terminate.
    let producer = tokio::task::spawn_blocking(move || decode_loop(input, sender, cancel));
    let counts = producer.await?;

    let mut loaded = 0u64;
    let mut write_error: Option<LoadError> = None;

    for handle in workers {
        match handle.await? {
            Ok(count) => loaded += count,
            Err(error) => {
                // Keep the first failure; later ones are echoes of the
                // same underlying outage.
                write_error.get_or_insert(error);
            }
        }
    }

    if let Some(error) = write_error {
        return Err(EtlError::Load(error));
    }

    let summary = RunSummary {
        attempted: counts.attempted,
        decode_errors: counts.errors,
        loaded,
        elapsed: started.elapsed(),
    };

    log::info!(
        "load complete: {} attempted, {} loaded, {} errors",
        summary.attempted,
        summary.loaded,
        summary.decode_errors
    );

    Ok(summary)
}

fn decode_loop<R: Read>(
    input: R,
    sender: mpsc::Sender<LineItem>,
    cancel: CancellationToken,
) -> DecodeCounts {
    let mut decoder = RecordDecoder::new(input);
    let mut counts = DecodeCounts::default();

    while let Some(result) = decode_next(&mut decoder, &mut counts) {
        if cancel.is_cancelled() {
            log::warn!("decode loop stopping early: a loader worker failed");
            break;
        }

        let Some(item) = result else {
            continue;
        };

        // blocking_send is the backpressure point; it fails only once every
        // worker is gone, in which case the run is already doomed.
        if sender.blocking_send(item).is_err() {
            log::warn!("decode loop stopping early: record queue closed");
            break;
        }
    }

    counts
}

/// Pull one row off the decoder and account for it.
///
/// The attempted counter is bumped before the result is inspected, so it
/// always reflects rows attempted. Decode and address-shape failures are
/// counted, logged with their row index and folded to `Some(None)` so the
/// caller skips them. `None` is end of stream.
fn decode_next<R: Read>(
    decoder: &mut RecordDecoder<R>,
    counts: &mut DecodeCounts,
) -> Option<Option<LineItem>> {
    let result = decoder.next_record()?;
    counts.attempted += 1;

    let mut item = match result {
        Ok(item) => item,
        Err(error) => {
            log::warn!("{}", error);
            counts.errors += 1;
            return Some(None);
        }
    };

    if let Err(error) = item.normalize_address() {
        log::warn!("row {}: {}", counts.attempted, error);
        counts.errors += 1;
        return Some(None);
    }

    Some(Some(item))
}
