//! Response records.
//!
//! Remote responses are dynamically shaped. Each record below names only the
//! fields the client reads. Optional fields are `Option` and a missing one is
//! left to the caller.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Cursor field of a collection response.
pub const NEXT_LINK_FIELD: &str = "@odata.nextLink";

// ─────────────────────────────────────────────────────────────────────────────
// Collections
// ─────────────────────────────────────────────────────────────────────────────

/// One entry of a collection (a user, a drive item, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceItem(Map<String, Value>);

impl ResourceItem {
    /// Wrap a JSON value; `None` unless it is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self(fields)),
            _ => None,
        }
    }

    /// The item's `id` field.
    pub fn id(&self) -> Option<&str> {
        self.get_str("id")
    }

    /// The item's `name` field (drive items).
    pub fn name(&self) -> Option<&str> {
        self.get_str("name")
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }
}

/// Shape of one collection response.
#[derive(Debug, Deserialize)]
pub(crate) struct PageBody {
    #[serde(default)]
    pub value: Option<Vec<Value>>,
    #[serde(default, rename = "@odata.nextLink")]
    pub next_link: Option<String>,
}

/// One fetched page.
#[derive(Debug, Clone)]
pub struct Page {
    pub items: Vec<ResourceItem>,
    /// Absolute URL of the next page, verbatim from the server.
    pub next_link: Option<String>,
}

/// A fully traversed collection in server order.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct CollectionResult {
    items: Vec<ResourceItem>,
}

impl CollectionResult {
    pub(crate) fn push(&mut self, item: ResourceItem) {
        self.items.push(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceItem> {
        self.items.iter()
    }

    pub fn items(&self) -> &[ResourceItem] {
        &self.items
    }

    pub fn into_items(self) -> Vec<ResourceItem> {
        self.items
    }
}

impl IntoIterator for CollectionResult {
    type Item = ResourceItem;
    type IntoIter = std::vec::IntoIter<ResourceItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Users
// ─────────────────────────────────────────────────────────────────────────────

/// Basic profile of the signed-in user (`GET /me`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_principal_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Drives
// ─────────────────────────────────────────────────────────────────────────────

/// A drive or drive item lookup result.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemRef {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Body of a copy request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyRequest {
    pub parent_reference: ParentReference,
    pub name: String,
}

/// Destination of a copy.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentReference {
    pub drive_id: String,
    pub id: String,
}

/// Body of a range read.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RangeBody {
    #[serde(default)]
    pub values: Option<Vec<Vec<Value>>>,
}

/// Body of a range write.
#[derive(Debug, Clone, Serialize)]
pub struct RangeUpdate {
    pub values: Vec<Vec<String>>,
}
