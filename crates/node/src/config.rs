//! Node configuration file.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use vault_crypto::{CryptoProvider, KeyPairProvider, NodeKeys, PeerKeys};
use vault_rpc::{MessageTypeRegistry, RpcConfig, RpcContext};
use vault_services::DEFAULT_CACHE_CAPACITY;
use vault_transport_tcp::TcpConfig;

use crate::error::{Error, Result};

/// Storage offered by a node unless configured otherwise.
pub const DEFAULT_CAPACITY: u64 = 64 * 1024 * 1024;

/// Main configuration for a vault node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Address the server binds.
    pub listen: SocketAddr,

    /// Identity reported to peers arranging storage.
    pub vault_id: String,

    /// Bytes of chunk storage offered.
    pub capacity: u64,

    /// Bytes of cached chunks held on behalf of other vaults.
    pub cache_capacity: u64,

    /// Message types, security policy and timeouts.
    pub rpc: RpcConfig,

    /// Outbound connection settings.
    pub tcp: TcpConfig,

    /// Key material; required whenever a strict policy applies.
    pub identity: Option<IdentityConfig>,
}

/// Key material of the node and its peer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Hex-encoded 32-byte seed of the local keys.
    pub seed_hex: String,
    /// Hex-encoded public keys of the peer.
    pub peer_public_hex: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 7100)),
            vault_id: "vault".to_string(),
            capacity: DEFAULT_CAPACITY,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            rpc: RpcConfig::default(),
            tcp: TcpConfig::default(),
            identity: None,
        }
    }
}

impl NodeConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!(
                "Failed to read {}: {e}",
                path.as_ref().display()
            ))
        })?;
        Self::from_toml(&contents)
    }

    /// Load configuration from `path`, or the defaults when absent.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Parse and validate TOML.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)
            .map_err(|e| Error::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.vault_id.is_empty() {
            return Err(Error::Config("vault_id must not be empty".to_string()));
        }
        self.rpc.validate()?;
        MessageTypeRegistry::allocate(self.rpc.base_layer_max_type, &vault_services::definitions())?;
        self.crypto()?;
        Ok(())
    }

    /// Crypto provider built from the identity section.
    pub fn crypto(&self) -> Result<Option<Arc<dyn CryptoProvider>>> {
        let Some(identity) = &self.identity else {
            return Ok(None);
        };
        let local = NodeKeys::from_hex_seed(&identity.seed_hex)?;
        let peer = PeerKeys::from_hex(&identity.peer_public_hex)?;
        Ok(Some(Arc::new(KeyPairProvider::new(local, peer))))
    }

    /// RPC context covering every service group.
    pub fn context(&self) -> Result<RpcContext> {
        Ok(RpcContext::new(
            &self.rpc,
            &vault_services::definitions(),
            self.crypto()?,
        )?)
    }
}
