//! # Identity Module
//!
//! Who is who on the ledger. Every participant is a [`Party`]: a legal name
//! bound to an Ed25519 key. A node's view of the wider network is a
//! [`NetworkMap`], passed explicitly into every flow.

pub mod network_map;
pub mod party;

pub use network_map::{IdentityError, NetworkMap};
pub use party::Party;
