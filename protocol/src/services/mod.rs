//! # Services
//!
//! The narrow interfaces the flows call out through, plus reference
//! implementations of each.
//!
//! ```text
//! signing.rs  : SigningService, KeyStore
//! messaging.rs: Messaging / Session, InMemoryNetwork
//! notary.rs   : NotaryService, InMemoryNotary
//! vault.rs    : VaultStore, InMemoryVault, SledVault
//! ```
//!
//! Every trait is `async_trait` and object safe. Flows only ever see
//! `Arc<dyn Trait>`, so a node wires in whatever backends it likes.

pub mod messaging;
pub mod notary;
pub mod signing;
pub mod vault;

pub use messaging::{
    ChannelSession, InMemoryMessaging, InMemoryNetwork, Inbox, Messaging, Session, SessionError,
};
pub use notary::{Conflict, InMemoryNotary, NotarisationRequest, NotaryError, NotaryService};
pub use signing::{KeyStore, SigningError, SigningService};
pub use vault::{InMemoryVault, SledVault, VaultError, VaultStore};
