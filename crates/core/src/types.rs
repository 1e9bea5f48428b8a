//! Identity types for holons and sessions
//!
//! This module defines the identifiers used throughout the system:
//! - [`LocalId`]: Durable, server-assigned id of a persisted holon
//! - [`TemporaryId`]: Session-local id of a not-yet-persisted holon
//! - [`TxId`]: Transaction scope that temporary ids are relative to
//! - [`HolonId`]: Local or external reference to a persisted holon

use crate::value::MapString;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque byte sequence identifying a persisted holon
///
/// Stable once assigned and never reused. Displayed as uppercase hex.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalId(pub Vec<u8>);

impl LocalId {
    /// Borrow the raw bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for LocalId {
    fn from(bytes: Vec<u8>) -> Self {
        LocalId(bytes)
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}

/// Id of the proxy through which an external space is reached
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutboundProxyId(pub LocalId);

/// Reference to a holon persisted in another space
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExternalId {
    /// Proxy for the owning space
    pub space_id: OutboundProxyId,
    /// Id of the holon within that space
    pub local_id: LocalId,
}

/// Identifier of a persisted holon
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HolonId {
    /// Holon in the local space
    Local(LocalId),
    /// Holon in another space
    External(ExternalId),
}

impl HolonId {
    /// The local id of the holon, whichever space it lives in
    pub fn local_id(&self) -> &LocalId {
        match self {
            HolonId::Local(id) => id,
            HolonId::External(ext) => &ext.local_id,
        }
    }

    /// Check if this id refers to the local space
    pub fn is_local(&self) -> bool {
        matches!(self, HolonId::Local(_))
    }
}

impl From<LocalId> for HolonId {
    fn from(id: LocalId) -> Self {
        HolonId::Local(id)
    }
}

impl fmt::Display for HolonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HolonId::Local(id) => write!(f, "Local({})", id),
            HolonId::External(ext) => write!(f, "External({}:{})", ext.space_id.0, ext.local_id),
        }
    }
}

/// Session-local identifier for a not-yet-persisted holon
///
/// Only meaningful relative to the [`TxId`] it was issued under, and never
/// sent as a durable reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemporaryId(Uuid);

impl TemporaryId {
    /// Create a new random TemporaryId
    ///
    /// # Examples
    ///
    /// ```
    /// use holons_core::types::TemporaryId;
    ///
    /// let id1 = TemporaryId::new();
    /// let id2 = TemporaryId::new();
    /// assert_ne!(id1, id2);
    /// ```
    pub fn new() -> Self {
        TemporaryId(Uuid::new_v4())
    }

    /// Derive a TemporaryId from a (versioned) key
    ///
    /// The same key always yields the same id.
    pub fn from_key(key: &MapString) -> Self {
        TemporaryId(Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_str().as_bytes()))
    }

    /// Get raw bytes representation
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for TemporaryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TemporaryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transaction (session) scope identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxId(pub u64);

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx-{}", self.0)
    }
}

/// Reference to the space a session operates in
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpaceId(pub String);

impl fmt::Display for SpaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SpaceId {
    fn from(s: &str) -> Self {
        SpaceId(s.to_string())
    }
}

/// Name of a relationship between holons
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelationshipName(pub MapString);

impl RelationshipName {
    /// Borrow the name as a string slice
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for RelationshipName {
    fn from(s: &str) -> Self {
        RelationshipName(MapString::from(s))
    }
}

impl fmt::Display for RelationshipName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_id_displays_uppercase_hex() {
        let id = LocalId(vec![0x0a, 0xff, 0x10]);
        assert_eq!(id.to_string(), "0AFF10");
    }

    #[test]
    fn test_temporary_id_from_key_is_stable() {
        let key = MapString::from("book__1_staged");
        assert_eq!(TemporaryId::from_key(&key), TemporaryId::from_key(&key));
        assert_ne!(
            TemporaryId::from_key(&key),
            TemporaryId::from_key(&MapString::from("book__2_staged"))
        );
    }

    #[test]
    fn test_holon_id_local_id() {
        let local = LocalId(vec![1, 2]);
        let external = HolonId::External(ExternalId {
            space_id: OutboundProxyId(LocalId(vec![9])),
            local_id: local.clone(),
        });

        assert_eq!(external.local_id(), &local);
        assert!(!external.is_local());
        assert!(HolonId::from(local).is_local());
    }

    #[test]
    fn test_temporary_id_serializes_as_string() {
        let id = TemporaryId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
    }
}
