// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # accord: Core Library
//!
//! A shared ledger for parties who do not trust each other. They agree on
//! immutable facts (states) by jointly signing rule-checked transactions, and
//! a notary makes sure no state is ever spent twice.
//!
//! The hard part is not any single piece. It is a deterministic verifier
//! that every party runs on its own, a multi-party signing handshake where
//! any one refusal kills the round, and a notary round trip that turns two
//! racing spends into exactly one winner.
//!
//! ## Architecture
//!
//! - **crypto**: Ed25519 keys, SHA-256 / BLAKE3 hashing. Don't roll your own.
//! - **identity**: Parties and the network map. Who is who, passed explicitly.
//! - **state**: Ledger states: immutable, linear, referenced by `StateRef`.
//! - **transaction**: Proposals, signatures, notary attestations, wire codec.
//! - **contract**: The car rules. Pure, deterministic, run by everyone.
//! - **services**: Signing, sessions, notary, vault: the seams to the outside.
//! - **flows**: Signature collection, finality and the responder loop.
//! - **encoding**: The canonical byte writer that signatures depend on.
//! - **config**: Protocol constants and flow timeouts.
//!
//! ## Design Philosophy
//!
//! 1. Never trust the initiator's verdict. Re-verify everything locally.
//! 2. Canonical bytes are hand-built. serde decides the wire, not the signature.
//! 3. The notary is the only judge of uniqueness. Vaults can be stale.
//! 4. Every wait is bounded. Nobody is left hanging on a dead session.

pub mod config;
pub mod contract;
pub mod crypto;
pub mod encoding;
pub mod flows;
pub mod identity;
pub mod services;
pub mod state;
pub mod transaction;
