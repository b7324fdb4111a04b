//! Sales-record decoding.
//!
//! This module turns raw delimited-text rows into typed [`LineItem`] records.
//! It uses the `csv` crate with serde derive, so column mapping is by header
//! name rather than position, and applies two field-specific overrides the
//! upstream export requires:
//!
//! - **Order Date**: the source carries two space-separated tokens
//!   (`2019-01-22 21:25`). They are composed into `2019-01-22T21:25Z` and
//!   parsed as a UTC instant; seconds are optional.
//! - **Product_ean**: spreadsheet exports serialize the code as a float and
//!   append a `.0` suffix. Only the substring before the first `.` is kept.
//!
//! A decode failure carries the 1-based row number and does not end the
//! stream; the caller decides whether to skip and continue. End of stream is
//! `None`, a distinct non-error signal.

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use std::io::Read;
use thiserror::Error;

/// One ordered product line; the pipeline's unit of work.
///
/// Constructed fresh per input row. The four derived address fields are not
/// present in the source and stay empty until
/// [`normalize_address`](LineItem::normalize_address) runs; a record is only
/// eligible for loading after that succeeds.
#[derive(Debug, Clone, Deserialize)]
pub struct LineItem {
    #[serde(rename = "Order ID")]
    pub order_id: u64,
    #[serde(rename = "Order Date", deserialize_with = "deserialize_order_date")]
    pub order_date: DateTime<Utc>,
    #[serde(rename = "Product")]
    pub product: String,
    #[serde(rename = "Product_ean", deserialize_with = "deserialize_product_ean")]
    pub product_ean: String,
    #[serde(rename = "Quantity Ordered")]
    pub quantity: u64,
    #[serde(rename = "Purchase Address")]
    pub address: String,
    #[serde(skip)]
    pub street: String,
    #[serde(skip)]
    pub city: String,
    #[serde(skip)]
    pub state: String,
    #[serde(skip)]
    pub zip: String,
    #[serde(rename = "Price Each")]
    pub price: Decimal,
    #[serde(rename = "Cost price")]
    pub cost_price: Decimal,
    #[serde(rename = "turnover")]
    pub price_total: Decimal,
}

/// A row that failed to decode, tagged with its 1-based sequence number.
#[derive(Debug, Error)]
#[error("row {row}: {source}")]
pub struct DecodeError {
    pub row: u64,
    #[source]
    pub source: csv::Error,
}

/// Streaming decoder over a delimited-text input with a header row.
///
/// Yields records lazily in input order until the stream is exhausted.
pub struct RecordDecoder<R: Read> {
    records: csv::DeserializeRecordsIntoIter<R, LineItem>,
    row: u64,
}

impl<R: Read> RecordDecoder<R> {
    pub fn new(input: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(input);

        Self {
            records: reader.into_deserialize(),
            row: 0,
        }
    }

    /// Decode the next data row.
    ///
    /// Returns `None` once the input is exhausted. A malformed row yields
    /// `Some(Err(..))` with its row number; the iterator stays usable, so
    /// the caller can skip bad rows and keep going.
    pub fn next_record(&mut self) -> Option<Result<LineItem, DecodeError>> {
        self.row += 1;
        let row = self.row;

        self.records
            .next()
            .map(|result| result.map_err(|source| DecodeError { row, source }))
    }
}

/// Compose the two-token `Order Date` field into a normalized UTC instant.
///
/// `"2019-01-22 21:25"` becomes `"2019-01-22T21:25Z"` before parsing. The
/// export sometimes carries seconds, so both `%H:%M:%S` and `%H:%M` are
/// accepted.
fn parse_order_date(raw: &str) -> Option<DateTime<Utc>> {
    let (date, time) = raw.trim().split_once(' ')?;
    let composed = format!("{date}T{time}Z");

    for format in ["%Y-%m-%dT%H:%M:%SZ", "%Y-%m-%dT%H:%MZ"] {
        if let Ok(instant) = NaiveDateTime::parse_from_str(&composed, format) {
            return Some(instant.and_utc());
        }
    }

    None
}

fn deserialize_order_date<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;

    parse_order_date(&raw).ok_or_else(|| {
        serde::de::Error::custom(format!("invalid order date `{raw}`, expected `<date> <time>`"))
    })
}

/// Keep only the integral prefix of the product code, dropping the `.0`
/// serialization artifact.
fn deserialize_product_ean<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let code = raw.split_once('.').map_or(raw.as_str(), |(head, _)| head);

    Ok(code.to_string())
}
