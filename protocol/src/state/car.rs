//! The car record: the asset this ledger exists to track.
//!
//! A car is jointly held by three parties: the bank that finances it, the
//! dealer that holds it on the lot, and the manufacturer that built it. All
//! three are participants, so all three must sign anything that creates or
//! consumes one.

use serde::{Deserialize, Serialize};

use crate::encoding::CanonicalWriter;
use crate::identity::Party;

/// Domain fields of a car state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarState {
    pub owning_bank: Party,
    pub holding_dealer: Party,
    pub manufacturer: Party,
    /// Vehicle identification number.
    pub vin: String,
    /// Plate code. The contract insists on exactly seven characters.
    pub license_plate_number: String,
    pub make: String,
    pub model: String,
    pub dealership_location: String,
}

impl CarState {
    /// Bank, dealer and manufacturer, in that order, duplicates removed.
    pub fn participants(&self) -> Vec<Party> {
        let mut parties: Vec<Party> = Vec::with_capacity(3);
        for p in [&self.owning_bank, &self.holding_dealer, &self.manufacturer] {
            if !parties.contains(p) {
                parties.push(p.clone());
            }
        }
        parties
    }

    pub(crate) fn write_canonical(&self, w: &mut CanonicalWriter) {
        w.put_bytes(&self.owning_bank.canonical_bytes())
            .put_bytes(&self.holding_dealer.canonical_bytes())
            .put_bytes(&self.manufacturer.canonical_bytes())
            .put_str(&self.vin)
            .put_str(&self.license_plate_number)
            .put_str(&self.make)
            .put_str(&self.model)
            .put_str(&self.dealership_location);
    }
}
