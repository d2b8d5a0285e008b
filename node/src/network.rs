//! # Network File
//!
//! The JSON file that tells a node who is on the network: one entry per
//! party with its X.500-style name, its role and its Ed25519 secret key,
//! plus the flow timeouts.
//!
//! ```json
//! {
//!   "parties": [
//!     { "name": "O=Northwind Bank,L=London,C=GB", "role": "bank", "secret_key": "9f1c..." },
//!     { "name": "O=Notary Service,L=Zurich,C=CH", "role": "notary", "secret_key": "04ab..." }
//!   ],
//!   "flow": { "session_timeout_ms": 30000, "notary_timeout_ms": 30000, "finality_timeout_ms": 60000 }
//! }
//! ```
//!
//! Secret keys sit in the file because the demo runs every party in one
//! process. `init` writes it with owner-only permissions.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use accord_protocol::config::FlowConfig;
use accord_protocol::crypto::PartyKeypair;
use accord_protocol::identity::{NetworkMap, Party};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Bank,
    Dealer,
    Manufacturer,
    Notary,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Bank, Role::Dealer, Role::Manufacturer, Role::Notary];
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartyEntry {
    pub name: String,
    pub role: Role,
    /// Hex-encoded 32-byte Ed25519 secret key.
    pub secret_key: String,
}

impl PartyEntry {
    pub fn keypair(&self) -> Result<PartyKeypair> {
        PartyKeypair::from_hex(&self.secret_key)
            .with_context(|| format!("bad secret key for {}", self.name))
    }

    pub fn party(&self) -> Result<Party> {
        Ok(Party::new(self.name.clone(), self.keypair()?.public_key()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkFile {
    pub parties: Vec<PartyEntry>,
    #[serde(default)]
    pub flow: FlowConfig,
}

impl NetworkFile {
    /// A fresh network: one party per role, new random keys, default timeouts.
    pub fn generate() -> Self {
        let names = [
            (Role::Bank, "O=Northwind Bank,L=London,C=GB"),
            (Role::Dealer, "O=Harbour Motors,L=Busan,C=KR"),
            (Role::Manufacturer, "O=Hanul Automotive,L=Ulsan,C=KR"),
            (Role::Notary, "O=Notary Service,L=Zurich,C=CH"),
        ];
        let parties = names
            .into_iter()
            .map(|(role, name)| PartyEntry {
                name: name.to_string(),
                role,
                secret_key: hex::encode(PartyKeypair::generate().secret_key_bytes()),
            })
            .collect();
        Self {
            parties,
            flow: FlowConfig::default(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read network file {}", path.display()))?;
        let file: Self = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse network file {}", path.display()))?;
        file.validate()
            .with_context(|| format!("invalid network file {}", path.display()))?;
        Ok(file)
    }

    /// Every role present exactly once, names unique, keys well-formed.
    pub fn validate(&self) -> Result<()> {
        for role in Role::ALL {
            let count = self.parties.iter().filter(|p| p.role == role).count();
            if count != 1 {
                bail!("expected exactly one {:?}, found {}", role, count);
            }
        }
        let mut names = HashSet::new();
        let mut keys = HashSet::new();
        for entry in &self.parties {
            if !names.insert(entry.name.as_str()) {
                bail!("duplicate party name {}", entry.name);
            }
            if !keys.insert(entry.keypair()?.public_key()) {
                bail!("{} reuses another party's key", entry.name);
            }
        }
        Ok(())
    }

    pub fn entry(&self, role: Role) -> Result<&PartyEntry> {
        self.parties
            .iter()
            .find(|p| p.role == role)
            .with_context(|| format!("no {:?} in network file", role))
    }

    /// Parties and notaries as a [`NetworkMap`].
    pub fn network_map(&self) -> Result<NetworkMap> {
        let mut map = NetworkMap::new();
        for entry in &self.parties {
            let party = entry.party()?;
            match entry.role {
                Role::Notary => map.add_notary(party),
                _ => map.add_party(party),
            };
        }
        Ok(map)
    }
}
