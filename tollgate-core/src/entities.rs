//! Core entity structures

use crate::{Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// Behaviour shared by every entity the stores and caches handle.
///
/// The storage crate is generic over this trait so the cache-aside
/// protocol is written once. `Department` is the only implementation.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Partial update applied by `update` operations.
    type Patch: Send + 'static;

    /// Display name used in error messages.
    const KIND: &'static str;

    /// Unique, immutable identifier.
    fn entity_id(&self) -> &str;

    /// Secondary attribute that must also be unique, if any.
    fn unique_attribute(&self) -> Option<&str> {
        None
    }

    /// Merge a patch into this entity. Identity and creation audit
    /// fields must be left untouched.
    fn apply_patch(&mut self, patch: Self::Patch);
}

/// Department - the resource exposed by the CRUD endpoints.
///
/// `id` and `name` are unique across all departments. All audit
/// fields are required once persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub id: String,
    #[serde(rename = "deptName")]
    pub name: String,
    pub active: bool,
    pub created_by: UserId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_date: Timestamp,
    pub updated_by: UserId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub updated_date: Timestamp,
}

impl Department {
    /// Build a department whose modification audit fields mirror its creation.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        active: bool,
        created_by: UserId,
        created_date: Timestamp,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            active,
            created_by,
            created_date,
            updated_by: created_by,
            updated_date: created_date,
        }
    }
}

/// Fields an update may change on an existing department.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct DepartmentPatch {
    #[serde(rename = "deptName")]
    pub name: String,
    pub active: bool,
    pub updated_by: UserId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub updated_date: Timestamp,
}

impl Entity for Department {
    type Patch = DepartmentPatch;

    const KIND: &'static str = "Department";

    fn entity_id(&self) -> &str {
        &self.id
    }

    fn unique_attribute(&self) -> Option<&str> {
        Some(&self.name)
    }

    fn apply_patch(&mut self, patch: DepartmentPatch) {
        self.name = patch.name;
        self.active = patch.active;
        self.updated_by = patch.updated_by;
        self.updated_date = patch.updated_date;
    }
}
