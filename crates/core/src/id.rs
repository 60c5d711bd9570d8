//! Strongly-typed identifiers used across the domain.

use core::str::FromStr;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Identifier of a store (the isolation boundary for stock and mappings).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreId(Uuid);

/// Identifier of one physical SKU at one store.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InventoryStockId(Uuid);

/// Identifier of a recipe-ingredient to stock-item conversion mapping.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MappingId(Uuid);

/// Identifier of a composite product (bundle).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BundleId(Uuid);

/// Identifier of a recipe.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipeId(Uuid);

/// Identifier of one inventory movement record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MovementId(Uuid);

macro_rules! impl_uuid_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Create a new identifier.
            ///
            /// Uses UUIDv7 (time-ordered). Prefer passing IDs explicitly in tests
            /// for determinism.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $t {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $t {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$t> for Uuid {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid = Uuid::from_str(s)
                    .map_err(|e| DomainError::invalid_id(format!("{}: {}", $name, e)))?;
                Ok(Self(uuid))
            }
        }
    };
}

impl_uuid_newtype!(StoreId, "StoreId");
impl_uuid_newtype!(InventoryStockId, "InventoryStockId");
impl_uuid_newtype!(MappingId, "MappingId");
impl_uuid_newtype!(BundleId, "BundleId");
impl_uuid_newtype!(RecipeId, "RecipeId");
impl_uuid_newtype!(MovementId, "MovementId");

/// The sale's own transaction id, binding every movement of one deduction.
///
/// Always a concrete, non-nil UUID: it is parsed and validated once at the API
/// boundary and never regenerated afterwards, so reversal can locate the exact
/// movement set a sale produced.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ReferenceId(Uuid);

impl ReferenceId {
    /// Generate a fresh reference for a new sale (UUIDv7).
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    /// Wrap an existing transaction id. The nil UUID is rejected.
    pub fn from_uuid(uuid: Uuid) -> Result<Self, DomainError> {
        if uuid.is_nil() {
            return Err(DomainError::invalid_id("ReferenceId: nil uuid"));
        }
        Ok(Self(uuid))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl core::fmt::Display for ReferenceId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<ReferenceId> for Uuid {
    fn from(value: ReferenceId) -> Self {
        value.0
    }
}

impl TryFrom<Uuid> for ReferenceId {
    type Error = DomainError;

    fn try_from(value: Uuid) -> Result<Self, Self::Error> {
        Self::from_uuid(value)
    }
}

impl FromStr for ReferenceId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(DomainError::invalid_id("ReferenceId: empty"));
        }
        let uuid = Uuid::from_str(trimmed)
            .map_err(|e| DomainError::invalid_id(format!("ReferenceId: {e}")))?;
        Self::from_uuid(uuid)
    }
}

impl<'de> Deserialize<'de> for ReferenceId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let uuid = Uuid::deserialize(deserializer)?;
        Self::from_uuid(uuid).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_id_rejects_nil_and_garbage() {
        assert!(ReferenceId::from_uuid(Uuid::nil()).is_err());
        assert!("".parse::<ReferenceId>().is_err());
        assert!("not-a-uuid".parse::<ReferenceId>().is_err());
        assert!("00000000-0000-0000-0000-000000000000".parse::<ReferenceId>().is_err());
    }

    #[test]
    fn reference_id_round_trips_through_display() {
        let id = ReferenceId::generate();
        let parsed: ReferenceId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn reference_id_deserialize_validates() {
        let nil = serde_json::json!("00000000-0000-0000-0000-000000000000");
        assert!(serde_json::from_value::<ReferenceId>(nil).is_err());

        let id = ReferenceId::generate();
        let json = serde_json::to_value(id).unwrap();
        assert_eq!(serde_json::from_value::<ReferenceId>(json).unwrap(), id);
    }

    #[test]
    fn typed_ids_parse_errors_name_the_type() {
        let err = "xyz".parse::<InventoryStockId>().unwrap_err();
        match err {
            DomainError::InvalidId(msg) => assert!(msg.starts_with("InventoryStockId")),
            other => panic!("expected InvalidId, got {other:?}"),
        }
    }
}
