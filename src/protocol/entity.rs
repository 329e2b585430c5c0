//! Entity addressing and attribute scopes.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================================================
// EntityType
// ============================================================================

/// Kind of platform entity a subscription targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Device,
    Asset,
    EntityView,
    Customer,
    Tenant,
    User,
    Dashboard,
    Edge,
    RuleChain,
}

impl EntityType {
    /// Returns the wire name (`DEVICE`, `ENTITY_VIEW`, ...).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Device => "DEVICE",
            Self::Asset => "ASSET",
            Self::EntityView => "ENTITY_VIEW",
            Self::Customer => "CUSTOMER",
            Self::Tenant => "TENANT",
            Self::User => "USER",
            Self::Dashboard => "DASHBOARD",
            Self::Edge => "EDGE",
            Self::RuleChain => "RULE_CHAIN",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "DEVICE" => Self::Device,
            "ASSET" => Self::Asset,
            "ENTITY_VIEW" => Self::EntityView,
            "CUSTOMER" => Self::Customer,
            "TENANT" => Self::Tenant,
            "USER" => Self::User,
            "DASHBOARD" => Self::Dashboard,
            "EDGE" => Self::Edge,
            "RULE_CHAIN" => Self::RuleChain,
            other => return Err(Error::config(format!("Unknown entity type: {other}"))),
        })
    }
}

// ============================================================================
// AttributeScope
// ============================================================================

/// Attribute namespace for attribute subscriptions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttributeScope {
    /// Reported by the device itself.
    #[default]
    ClientScope,
    /// Owned by the server.
    ServerScope,
    /// Set by the server, visible to the device.
    SharedScope,
}

impl AttributeScope {
    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ClientScope => "CLIENT_SCOPE",
            Self::ServerScope => "SERVER_SCOPE",
            Self::SharedScope => "SHARED_SCOPE",
        }
    }
}

impl fmt::Display for AttributeScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// EntityRef
// ============================================================================

/// An addressable entity: `(entityType, entityId)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityRef {
    pub entity_type: EntityType,
    pub entity_id: String,
}

impl EntityRef {
    #[inline]
    #[must_use]
    pub fn new(entity_type: EntityType, entity_id: impl Into<String>) -> Self {
        Self {
            entity_type,
            entity_id: entity_id.into(),
        }
    }

    /// Shorthand for a device.
    #[inline]
    #[must_use]
    pub fn device(entity_id: impl Into<String>) -> Self {
        Self::new(EntityType::Device, entity_id)
    }

    /// Shorthand for an asset.
    #[inline]
    #[must_use]
    pub fn asset(entity_id: impl Into<String>) -> Self {
        Self::new(EntityType::Asset, entity_id)
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.entity_type, self.entity_id)
    }
}

// ============================================================================
// Tests
// ============================================================================
