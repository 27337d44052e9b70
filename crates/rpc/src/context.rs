//! State shared by every handler and client of one deployment.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;
use vault_crypto::CryptoProvider;

use crate::config::RpcConfig;
use crate::envelope::EnvelopeCodec;
use crate::error::{Error, Result};
use crate::message::{Operation, ServiceGroup};
use crate::message_type::{MessageTypeRegistry, OperationDefinition, OperationIds};
use crate::security::{PolicyTable, SecurityPolicy};
use crate::timeout::TimeoutPolicy;

/// Registry, codec and policies agreed on by all peers.
#[derive(Debug)]
pub struct RpcContext {
    registry: MessageTypeRegistry,
    codec: EnvelopeCodec,
    policies: PolicyTable,
    timeouts: TimeoutPolicy,
}

impl RpcContext {
    /// Build a context for `definitions` under `config`.
    ///
    /// # Errors
    ///
    /// Fails when the configuration names unknown groups or operations, when
    /// the definitions do not fit above the base layer, or when a strict
    /// policy applies but no crypto provider is given.
    pub fn new(
        config: &RpcConfig,
        definitions: &[OperationDefinition],
        crypto: Option<Arc<dyn CryptoProvider>>,
    ) -> Result<Self> {
        config.validate()?;
        let registry = MessageTypeRegistry::allocate(config.base_layer_max_type, definitions)?;

        let groups: HashSet<&str> = definitions.iter().map(|d| d.group).collect();
        if let Some(group) = config
            .security
            .groups
            .keys()
            .find(|group| !groups.contains(group.as_str()))
        {
            return Err(Error::Configuration(format!(
                "security policy names unknown group {group}"
            )));
        }

        for name in config.security.operations.keys() {
            let known = name
                .split_once('.')
                .and_then(|(group, operation)| registry.index_of(group, operation))
                .is_some();
            if !known {
                return Err(Error::Configuration(format!(
                    "security policy names unknown operation {name}"
                )));
            }
        }

        if crypto.is_none() {
            let strict = definitions
                .iter()
                .find(|d| config.security.policy_for(d) == SecurityPolicy::Strict);
            if let Some(definition) = strict {
                return Err(Error::Configuration(format!(
                    "{} is strict but no crypto provider is configured",
                    definition.qualified_name()
                )));
            }
        }

        debug!(
            operations = definitions.len(),
            first = config.base_layer_max_type.saturating_add(1),
            max = %registry.max_type(),
            "message types allocated"
        );

        Ok(Self {
            registry,
            codec: EnvelopeCodec::new(crypto),
            policies: config.security.clone(),
            timeouts: config.timeout_policy(),
        })
    }

    /// The message-type allocation.
    #[must_use]
    pub const fn registry(&self) -> &MessageTypeRegistry {
        &self.registry
    }

    /// The envelope codec.
    #[must_use]
    pub const fn codec(&self) -> &EnvelopeCodec {
        &self.codec
    }

    /// The timeout policy.
    #[must_use]
    pub const fn timeouts(&self) -> &TimeoutPolicy {
        &self.timeouts
    }

    /// Policy governing `definition`.
    #[must_use]
    pub fn policy_for(&self, definition: &OperationDefinition) -> SecurityPolicy {
        self.policies.policy_for(definition)
    }

    /// Message types and policy of operation `O`.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownOperation`] if `O` was not part of the definitions.
    pub fn operation<O: Operation>(&self) -> Result<(OperationIds, SecurityPolicy)> {
        let group = <O::Group as ServiceGroup>::NAME;
        let ids = self
            .registry
            .ids(group, O::NAME)
            .ok_or_else(|| Error::UnknownOperation {
                group: group.to_string(),
                operation: O::NAME.to_string(),
            })?;
        Ok((ids, self.policy_for(&O::definition())))
    }
}
