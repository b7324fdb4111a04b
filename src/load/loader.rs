//! Concurrent loader workers.
//!
//! A fixed number of identical worker tasks drain one shared bounded queue
//! and persist each record across the three destination tables. Per record
//! the three writes run in a fixed order inside a single transaction:
//!
//! 1. upsert the order header (`purchase_orders`, insert-or-ignore on
//!    `order_id`)
//! 2. insert the line-item detail row (`line_items`)
//! 3. insert the address detail row (`order_address`)
//!
//! The header write must happen-before the detail inserts because the detail
//! rows reference it by foreign key. Workers do not coordinate with each
//! other; this per-record ordering is the only cross-table guarantee.
//!
//! Any write error is fatal for the run: the worker cancels the shared token
//! so the producer stops decoding, and returns the typed error to the
//! coordinator. No retry, no skip.

use crate::load::decoder::LineItem;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use thiserror::Error;

/// Default number of loader workers.
pub const DEFAULT_WORKERS: usize = 4;

const UPSERT_ORDER: &str = "INSERT INTO purchase_orders (order_id, order_date)
     VALUES ($1, $2)
     ON CONFLICT (order_id) DO NOTHING";

const INSERT_LINE_ITEM: &str = "INSERT INTO line_items (order_id, product, product_ean, quantity, price, cost_price, price_total)
     VALUES ($1, $2, $3, $4, $5, $6, $7)";

const INSERT_ADDRESS: &str = "INSERT INTO order_address (order_id, street, city, state, zip)
     VALUES ($1, $2, $3, $4, $5)";

/// A write that failed while persisting one record.
#[derive(Debug, Error)]
#[error("failed to write order {order_id}: {source}")]
pub struct LoadError {
    pub order_id: u64,
    #[source]
    pub source: sqlx::Error,
}

/// Spawns identical loader tasks over one shared record queue.
pub struct LoaderPool {
    pool: PgPool,
}

impl LoaderPool {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Start `workers` tasks draining `receiver`.
    ///
    /// Each task runs until the queue is closed and drained, then returns
    /// its loaded-record count, or the first fatal write error. On error the
    /// task cancels `cancel` so the producer stops feeding the queue.
    pub fn spawn(
        &self,
        workers: usize,
        receiver: mpsc::Receiver<LineItem>,
        cancel: CancellationToken,
    ) -> Vec<JoinHandle<Result<u64, LoadError>>> {
        let receiver = Arc::new(Mutex::new(receiver));

        (0..workers)
            .map(|id| {
                let pool = self.pool.clone();
                let receiver = Arc::clone(&receiver);
                let cancel = cancel.clone();
                tokio::spawn(worker_loop(id, pool, receiver, cancel))
            })
            .collect()
    }
}

async fn worker_loop(
    id: usize,
    pool: PgPool,
    receiver: Arc<Mutex<mpsc::Receiver<LineItem>>>,
    cancel: CancellationToken,
) -> Result<u64, LoadError> {
    let mut loaded = 0u64;

    loop {
        // Hold the lock only while waiting for the next record, so the
        // other workers can pick up work during the writes.
        let item = {
            let mut receiver = receiver.lock().await;
            receiver.recv().await
        };

        let Some(item) = item else {
            break;
        };

        if let Err(source) = write_record(&pool, &item).await {
            let error = LoadError {
                order_id: item.order_id,
                source,
            };
            log::error!("worker {}: {}", id, error);
            cancel.cancel();
            return Err(error);
        }

        loaded += 1;
    }

    log::debug!("worker {}: queue drained after {} records", id, loaded);
    Ok(loaded)
}

/// Persist one normalized record: header upsert, then the two detail
/// inserts, all inside one transaction so a record is either fully loaded
/// or not at all.
async fn write_record(pool: &PgPool, item: &LineItem) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query(UPSERT_ORDER)
        .bind(item.order_id as i64)
        .bind(item.order_date)
        .execute(&mut *tx)
        .await?;

    sqlx::query(INSERT_LINE_ITEM)
        .bind(item.order_id as i64)
        .bind(&item.product)
        .bind(&item.product_ean)
        .bind(item.quantity as i64)
        .bind(item.price)
        .bind(item.cost_price)
        .bind(item.price_total)
        .execute(&mut *tx)
        .await?;

    sqlx::query(INSERT_ADDRESS)
        .bind(item.order_id as i64)
        .bind(&item.street)
        .bind(&item.city)
        .bind(&item.state)
        .bind(&item.zip)
        .execute(&mut *tx)
        .await?;

    tx.commit().await
}
