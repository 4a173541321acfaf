//! Baseline, override and effective items, plus batch submissions.

use crate::kind::ItemKind;
use crate::wire;
use serde::de::{self, Deserializer, Unexpected, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// STORED ROWS
// ============================================================================

/// Administrator-authored definition, unique per `(module_id, value)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound = "")]
pub struct BaselineItem<K: ItemKind> {
    pub id: Uuid,
    pub module_id: String,
    /// Stable key of the column/filter within its module.
    pub value: String,
    /// Display label.
    pub name: String,
    /// Pinned: the user cannot hide it.
    #[serde(default, deserialize_with = "wire::flag")]
    pub fixed: bool,
    pub seq: i32,
    #[serde(flatten)]
    pub attrs: K::Attrs,
}

/// Sparse per-user customization, unique per `(user_id, module_id, value)`.
///
/// Every nullable field inherits the baseline when `None`; a missing row is
/// equivalent to a row with every field `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound = "")]
pub struct OverrideItem<K: ItemKind> {
    pub id: Uuid,
    pub module_id: String,
    pub user_id: String,
    pub value: String,
    #[serde(default, deserialize_with = "wire::opt_flag")]
    pub hidden: Option<bool>,
    #[serde(default)]
    pub seq: Option<i32>,
    #[serde(flatten)]
    pub overrides: K::Overrides,
}

impl<K: ItemKind> OverrideItem<K> {
    /// A row with nothing customized yet.
    pub fn blank(
        id: Uuid,
        module_id: impl Into<String>,
        user_id: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            id,
            module_id: module_id.into(),
            user_id: user_id.into(),
            value: value.into(),
            hidden: None,
            seq: None,
            overrides: K::Overrides::default(),
        }
    }
}

/// Read-time merge of a baseline row with at most one override row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound = "")]
pub struct EffectiveItem<K: ItemKind> {
    /// Override id when the user has a row, else the baseline id.
    pub id: Uuid,
    pub value: String,
    pub name: String,
    pub fixed: bool,
    pub hidden: bool,
    pub seq: i32,
    #[serde(flatten)]
    pub resolved: K::Resolved,
}

// ============================================================================
// STATUS TAG
// ============================================================================

/// Per-row instruction in a submitted batch.
///
/// `Unchanged` rows keep their place in the sequence but issue no statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StatusTag {
    #[default]
    Unchanged,
    Create,
    Update,
    Delete,
}

impl StatusTag {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusTag::Unchanged => "",
            StatusTag::Create => "create",
            StatusTag::Update => "update",
            StatusTag::Delete => "delete",
        }
    }
}

impl fmt::Display for StatusTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusTag::Unchanged => f.write_str("unchanged"),
            other => f.write_str(other.as_str()),
        }
    }
}

impl Serialize for StatusTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

struct StatusTagVisitor;

impl<'de> Visitor<'de> for StatusTagVisitor {
    type Value = StatusTag;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a status of \"0\"/\"1\"/\"2\", create/update/delete, or empty")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<StatusTag, E> {
        match v {
            0 => Ok(StatusTag::Create),
            1 => Ok(StatusTag::Update),
            2 => Ok(StatusTag::Delete),
            _ => Err(E::invalid_value(Unexpected::Unsigned(v), &self)),
        }
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<StatusTag, E> {
        match u64::try_from(v) {
            Ok(v) => self.visit_u64(v),
            Err(_) => Err(E::invalid_value(Unexpected::Signed(v), &self)),
        }
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<StatusTag, E> {
        match v.trim() {
            "" => Ok(StatusTag::Unchanged),
            "0" => Ok(StatusTag::Create),
            "1" => Ok(StatusTag::Update),
            "2" => Ok(StatusTag::Delete),
            s if s.eq_ignore_ascii_case("create") => Ok(StatusTag::Create),
            s if s.eq_ignore_ascii_case("update") => Ok(StatusTag::Update),
            s if s.eq_ignore_ascii_case("delete") => Ok(StatusTag::Delete),
            _ => Err(E::invalid_value(Unexpected::Str(v), &self)),
        }
    }

    fn visit_unit<E: de::Error>(self) -> Result<StatusTag, E> {
        Ok(StatusTag::Unchanged)
    }

    fn visit_none<E: de::Error>(self) -> Result<StatusTag, E> {
        Ok(StatusTag::Unchanged)
    }

    fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<StatusTag, D::Error> {
        d.deserialize_any(StatusTagVisitor)
    }
}

impl<'de> Deserialize<'de> for StatusTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(StatusTagVisitor)
    }
}

// ============================================================================
// SUBMISSIONS
// ============================================================================

/// One row of an administrator baseline batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound = "")]
pub struct BaselineSubmission<K: ItemKind> {
    /// Required for updates; ignored otherwise.
    #[serde(default, deserialize_with = "wire::opt_uuid")]
    pub id: Option<Uuid>,
    #[serde(default, deserialize_with = "wire::text")]
    pub value: String,
    #[serde(default, deserialize_with = "wire::text")]
    pub name: String,
    #[serde(default, deserialize_with = "wire::flag")]
    pub fixed: bool,
    #[serde(flatten)]
    pub attrs: K::Attrs,
    #[serde(default)]
    pub status: StatusTag,
}

impl<K: ItemKind> BaselineSubmission<K> {
    pub fn new(status: StatusTag, value: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: None,
            value: value.into(),
            name: name.into(),
            fixed: false,
            attrs: K::Attrs::default(),
            status,
        }
    }

    pub fn create(value: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(StatusTag::Create, value, name)
    }

    pub fn update(id: Uuid, value: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(StatusTag::Update, value, name).with_id(id)
    }

    pub fn delete(value: impl Into<String>) -> Self {
        Self::new(StatusTag::Delete, value, "")
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_fixed(mut self, fixed: bool) -> Self {
        self.fixed = fixed;
        self
    }

    pub fn with_attrs(mut self, attrs: K::Attrs) -> Self {
        self.attrs = attrs;
        self
    }
}

/// One row of a user override batch.
///
/// Clients usually echo back their effective rows; identity, name and
/// fixed fields in that echo are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound = "")]
pub struct OverrideSubmission<K: ItemKind> {
    #[serde(default, deserialize_with = "wire::text")]
    pub value: String,
    #[serde(default, deserialize_with = "wire::opt_flag")]
    pub hidden: Option<bool>,
    #[serde(flatten)]
    pub overrides: K::Overrides,
    #[serde(default)]
    pub status: StatusTag,
}

impl<K: ItemKind> OverrideSubmission<K> {
    pub fn new(status: StatusTag, value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            hidden: None,
            overrides: K::Overrides::default(),
            status,
        }
    }

    pub fn update(value: impl Into<String>) -> Self {
        Self::new(StatusTag::Update, value)
    }

    pub fn with_hidden(mut self, hidden: bool) -> Self {
        self.hidden = Some(hidden);
        self
    }

    pub fn with_overrides(mut self, overrides: K::Overrides) -> Self {
        self.overrides = overrides;
        self
    }
}
