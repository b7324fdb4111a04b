//! Composite-address normalization.
//!
//! The export stores the full postal address as one string in the fixed form
//! `"<street>, <city>, <region> <postal-code>"`. Normalization decomposes it
//! into the four derived fields on [`LineItem`]. A string that does not match
//! the shape is a recoverable error, handled by the coordinator the same way
//! as a decode failure.

use crate::load::decoder::LineItem;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AddressError {
    #[error("address `{raw}` does not split into street, city and region parts")]
    Parts { raw: String },
    #[error("address `{raw}` region part `{tail}` does not split into region and postal code")]
    RegionZip { raw: String, tail: String },
}

impl LineItem {
    /// Decompose the raw composite address into street, city, region and
    /// postal code.
    ///
    /// Expects exactly three comma-separated parts, the third holding
    /// exactly two whitespace-separated tokens. Touches nothing but the four
    /// derived fields.
    pub fn normalize_address(&mut self) -> Result<(), AddressError> {
        let parts: Vec<&str> = self.address.split(", ").collect();
        let &[street, city, tail] = parts.as_slice() else {
            return Err(AddressError::Parts {
                raw: self.address.clone(),
            });
        };

        let mut tokens = tail.split_whitespace();
        let (Some(state), Some(zip), None) = (tokens.next(), tokens.next(), tokens.next()) else {
            return Err(AddressError::RegionZip {
                raw: self.address.clone(),
                tail: tail.to_string(),
            });
        };

        self.street = street.to_string();
        self.city = city.to_string();
        self.state = state.to_string();
        self.zip = zip.to_string();

        Ok(())
    }
}
