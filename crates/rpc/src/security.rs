//! Security preconditions for dispatch.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::envelope::{Envelope, SecurityFlags};
use crate::error::PolicyViolation;
use crate::message_type::OperationDefinition;

/// Whether messages of an operation must be signed and encrypted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityPolicy {
    /// Require a non-empty signature and asymmetric encryption.
    #[default]
    Strict,
    /// Accept any structurally valid envelope.
    Permissive,
}

impl SecurityPolicy {
    /// Flags applied when wrapping under this policy.
    #[must_use]
    pub const fn flags(self) -> SecurityFlags {
        match self {
            Self::Strict => SecurityFlags::SIGNED_AND_ENCRYPTED,
            Self::Permissive => SecurityFlags::NONE,
        }
    }

    /// Check a received envelope against this policy.
    ///
    /// # Errors
    ///
    /// Returns the first unmet requirement.
    pub fn check(self, envelope: &Envelope) -> Result<(), PolicyViolation> {
        match self {
            Self::Permissive => Ok(()),
            Self::Strict => {
                if !envelope.flags.signed || envelope.signature.is_empty() {
                    Err(PolicyViolation::MissingSignature)
                } else if !envelope.flags.asymmetric_encrypted {
                    Err(PolicyViolation::NotEncrypted)
                } else {
                    Ok(())
                }
            }
        }
    }
}

impl fmt::Display for SecurityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => f.write_str("strict"),
            Self::Permissive => f.write_str("permissive"),
        }
    }
}

/// Policy resolution: operation override, then group, then default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyTable {
    /// Policy for operations without a more specific entry.
    pub default: SecurityPolicy,
    /// Per service group.
    pub groups: BTreeMap<String, SecurityPolicy>,
    /// Per `Group.Operation`.
    pub operations: BTreeMap<String, SecurityPolicy>,
}

impl PolicyTable {
    /// Table applying `policy` everywhere.
    #[must_use]
    pub fn uniform(policy: SecurityPolicy) -> Self {
        Self {
            default: policy,
            ..Self::default()
        }
    }

    /// Set the policy of a whole group.
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>, policy: SecurityPolicy) -> Self {
        self.groups.insert(group.into(), policy);
        self
    }

    /// Set the policy of a single `Group.Operation`.
    #[must_use]
    pub fn with_operation(mut self, qualified: impl Into<String>, policy: SecurityPolicy) -> Self {
        self.operations.insert(qualified.into(), policy);
        self
    }

    /// Policy governing `definition`.
    #[must_use]
    pub fn policy_for(&self, definition: &OperationDefinition) -> SecurityPolicy {
        self.operations
            .get(&definition.qualified_name())
            .or_else(|| self.groups.get(definition.group))
            .copied()
            .unwrap_or(self.default)
    }
}
