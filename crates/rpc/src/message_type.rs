//! Message-type numbering.
//!
//! Every operation of every service group owns two consecutive IDs, request
//! first. Numbering starts right above the base dispatch layer's range and
//! follows declaration order, so every node derives the same table from the
//! same definition list without negotiating.

use std::collections::HashMap;
use std::fmt;

use tracing::warn;

use crate::error::{Error, Result};

/// Process-wide identifier of one request or response schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageType(pub u32);

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Which half of an operation a message type carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Caller to callee.
    Request,
    /// Callee back to caller.
    Response,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request => f.write_str("request"),
            Self::Response => f.write_str("response"),
        }
    }
}

/// Static description of one RPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OperationDefinition {
    /// Service group the operation belongs to.
    pub group: &'static str,
    /// Operation name, unique within its group.
    pub operation: &'static str,
    /// One-line human description.
    pub description: &'static str,
}

impl OperationDefinition {
    /// Describe an operation.
    #[must_use]
    pub const fn new(
        group: &'static str,
        operation: &'static str,
        description: &'static str,
    ) -> Self {
        Self {
            group,
            operation,
            description,
        }
    }

    /// `Group.Operation`, the key used in configuration.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.group, self.operation)
    }
}

/// Message types allocated to one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationIds {
    /// Type of the request.
    pub request: MessageType,
    /// Type of the response, always `request + 1`.
    pub response: MessageType,
}

/// A resolved message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved<'a> {
    /// Position of the operation in declaration order.
    pub index: usize,
    /// The operation.
    pub definition: &'a OperationDefinition,
    /// Request or response half.
    pub direction: Direction,
}

/// Immutable allocation of message types to operations.
#[derive(Debug, Clone)]
pub struct MessageTypeRegistry {
    first: u32,
    max: u32,
    definitions: Vec<OperationDefinition>,
    by_name: HashMap<&'static str, HashMap<&'static str, usize>>,
}

impl MessageTypeRegistry {
    /// Allocate IDs for `definitions` above `base_layer_max_type`.
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`] when the allocation does not fit in `u32`.
    pub fn allocate(base_layer_max_type: u32, definitions: &[OperationDefinition]) -> Result<Self> {
        let max = u32::try_from(definitions.len())
            .ok()
            .and_then(|count| count.checked_mul(2))
            .and_then(|span| base_layer_max_type.checked_add(span))
            .ok_or_else(|| {
                Error::Configuration(format!(
                    "{} operations do not fit above base layer maximum {base_layer_max_type}",
                    definitions.len()
                ))
            })?;

        let mut by_name: HashMap<&'static str, HashMap<&'static str, usize>> = HashMap::new();
        for (index, definition) in definitions.iter().enumerate() {
            let group = by_name.entry(definition.group).or_default();
            if group.contains_key(definition.operation) {
                warn!(
                    group = definition.group,
                    operation = definition.operation,
                    "duplicate operation definition; name lookups resolve to the first"
                );
                continue;
            }
            group.insert(definition.operation, index);
        }

        Ok(Self {
            first: base_layer_max_type.saturating_add(1),
            max,
            definitions: definitions.to_vec(),
            by_name,
        })
    }

    /// IDs of the operation at `index`.
    #[must_use]
    pub fn ids_at(&self, index: usize) -> Option<OperationIds> {
        if index >= self.definitions.len() {
            return None;
        }
        let request = u32::try_from(index)
            .ok()?
            .checked_mul(2)?
            .checked_add(self.first)?;
        Some(OperationIds {
            request: MessageType(request),
            response: MessageType(request.checked_add(1)?),
        })
    }

    /// IDs of `group.operation`.
    #[must_use]
    pub fn ids(&self, group: &str, operation: &str) -> Option<OperationIds> {
        self.index_of(group, operation)
            .and_then(|index| self.ids_at(index))
    }

    /// Declaration index of `group.operation`.
    #[must_use]
    pub fn index_of(&self, group: &str, operation: &str) -> Option<usize> {
        self.by_name.get(group)?.get(operation).copied()
    }

    /// Map a message type back to its operation and direction.
    #[must_use]
    pub fn resolve(&self, message_type: MessageType) -> Option<Resolved<'_>> {
        if message_type.0 > self.max {
            return None;
        }
        let offset = message_type.0.checked_sub(self.first)?;
        let index = usize::try_from(offset / 2).ok()?;
        let definition = self.definitions.get(index)?;
        let direction = if offset % 2 == 0 {
            Direction::Request
        } else {
            Direction::Response
        };
        Some(Resolved {
            index,
            definition,
            direction,
        })
    }

    /// Whether `message_type` belongs to this layer.
    #[must_use]
    pub fn owns(&self, message_type: MessageType) -> bool {
        self.resolve(message_type).is_some()
    }

    /// Highest ID allocated, or the base layer's maximum when empty.
    ///
    /// A layer stacked on top of this one allocates from here.
    #[must_use]
    pub fn max_type(&self) -> MessageType {
        MessageType(self.max)
    }

    /// All definitions in declaration order.
    #[must_use]
    pub fn definitions(&self) -> &[OperationDefinition] {
        &self.definitions
    }

    /// Iterate over `(ids, definition)` in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (OperationIds, &OperationDefinition)> {
        self.definitions.iter().enumerate().filter_map(|(index, definition)| {
            self.ids_at(index).map(|ids| (ids, definition))
        })
    }
}
