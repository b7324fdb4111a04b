//! Sales-record load pipeline.
//!
//! The pipeline turns a delimited sales export into rows across three
//! related tables:
//!
//! - **`decoder`**: streams typed [`LineItem`] records out of the raw CSV,
//!   applying the timestamp-composition and product-code rules the export
//!   format requires.
//!
//! - **`address`**: decomposes the composite purchase address into the four
//!   derived fields on the record.
//!
//! - **`loader`**: a fixed pool of identical worker tasks, each writing one
//!   record at a time across `purchase_orders`, `line_items` and
//!   `order_address` in a per-record transaction.
//!
//! - **`pipeline`**: the coordinator. Owns the bounded queue between the
//!   decode loop and the workers, counts attempted and failed rows, and
//!   produces the final [`RunSummary`].
//!
//! Data flows decode → normalize → queue → any available worker → database.
//! Decode failures skip the row and keep the run alive; write failures abort
//! the whole run.

pub mod address;
pub mod decoder;
pub mod loader;
pub mod pipeline;
pub mod stats;

pub use address::AddressError;
pub use decoder::{DecodeError, LineItem, RecordDecoder};
pub use loader::{DEFAULT_WORKERS, LoadError, LoaderPool};
pub use pipeline::{DEFAULT_QUEUE_CAPACITY, PipelineOptions, run};
pub use stats::RunSummary;
