//! # Identity Newtypes
//!
//! Domain-primitive newtypes for identifiers throughout Starlift. Each
//! identifier is a distinct type — you cannot pass an [`ExportId`] where a
//! [`TransferId`] is expected.
//!
//! Transfer identifiers carry their creation time in the value itself
//! (`transfer_{unixMillis}_{random}`), which keeps log lines greppable and
//! lets operators eyeball transfer age without a lookup.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Error constructing a string-based identifier.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IdentityError {
    /// The identifier value was empty.
    #[error("identifier must not be empty")]
    Empty,
}

// ---------------------------------------------------------------------------
// InstanceId
// ---------------------------------------------------------------------------

/// Numeric identifier of a game-server instance under the coordinator.
///
/// Instance ids are assigned by cluster administration outside the core;
/// the core treats them as opaque, unique integers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct InstanceId(u32);

impl InstanceId {
    /// Wrap a raw instance id.
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Access the raw integer value.
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl From<u32> for InstanceId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for InstanceId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u32>().map(Self)
    }
}

/// A reference to an instance by numeric id or by display name.
///
/// Operator-facing requests accept either form; resolution to a canonical
/// [`InstanceId`] happens against the instance directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InstanceRef {
    /// Reference by numeric id.
    Id(u32),
    /// Reference by display name.
    Name(String),
}

impl std::fmt::Display for InstanceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

impl From<InstanceId> for InstanceRef {
    fn from(id: InstanceId) -> Self {
        Self::Id(id.value())
    }
}

// ---------------------------------------------------------------------------
// ExportId
// ---------------------------------------------------------------------------

/// Globally unique identifier of a stored platform export.
///
/// Normally minted by the source instance; the coordinator mints one itself
/// only for operator-uploaded payloads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExportId(String);

impl ExportId {
    /// Wrap an export id received from an instance. Rejects empty values.
    pub fn new(id: impl Into<String>) -> Result<Self, IdentityError> {
        let id = id.into();
        if id.is_empty() {
            return Err(IdentityError::Empty);
        }
        Ok(Self(id))
    }

    /// Mint a fresh export id for an uploaded payload.
    pub fn generate(now_ms: i64) -> Self {
        Self(format!("export_{}_{}", now_ms, short_suffix()))
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExportId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// TransferId
// ---------------------------------------------------------------------------

/// Unique identifier of a platform transfer saga.
///
/// Generated as `transfer_{unixMillis}_{random}` so the creation instant is
/// visible in the id itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransferId(String);

impl TransferId {
    /// Wrap a transfer id received on the wire. Rejects empty values.
    pub fn new(id: impl Into<String>) -> Result<Self, IdentityError> {
        let id = id.into();
        if id.is_empty() {
            return Err(IdentityError::Empty);
        }
        Ok(Self(id))
    }

    /// Mint a fresh transfer id stamped with the given creation time.
    pub fn generate(now_ms: i64) -> Self {
        Self(format!("transfer_{}_{}", now_ms, short_suffix()))
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TransferId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// ClientId
// ---------------------------------------------------------------------------

/// Identifier of a connected UI/control client session.
///
/// Assigned by the coordinator when the client socket attaches; not
/// persisted anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(Uuid);

impl ClientId {
    /// Create a new random client identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Eight hex characters of a fresh UUID — enough entropy to disambiguate
/// ids minted within the same millisecond.
fn short_suffix() -> String {
    let id = Uuid::new_v4().simple().to_string();
    id[..8].to_string()
}
