//! Everything a flow needs, passed in explicitly.

use std::sync::Arc;

use crate::config::FlowConfig;
use crate::identity::{NetworkMap, Party};
use crate::services::{Messaging, NotaryService, SigningService, VaultStore};

/// A node's identity plus handles to its services. Cheap to clone.
///
/// There is no ambient state: the network map, the notary and the timeouts
/// a flow uses are whatever is in here.
#[derive(Clone)]
pub struct FlowContext {
    /// Who we are. Our signing key is `identity.owning_key`.
    pub identity: Party,
    pub signer: Arc<dyn SigningService>,
    pub messaging: Arc<dyn Messaging>,
    pub notary: Arc<dyn NotaryService>,
    pub vault: Arc<dyn VaultStore>,
    pub network_map: Arc<NetworkMap>,
    pub config: FlowConfig,
}

impl FlowContext {
    pub fn our_key(&self) -> &crate::crypto::keys::PartyPublicKey {
        &self.identity.owning_key
    }
}

impl std::fmt::Debug for FlowContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowContext")
            .field("identity", &self.identity)
            .field("notary", self.notary.identity())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
