//! Item-kind descriptors.
//!
//! Columns and filters share one layered model: a baseline row per module
//! and a sparse override row per user. A kind names the extra fields each
//! layer carries, how those fields resolve, and which override fields an
//! administrator may null out.

use crate::entities::OverrideItem;
use crate::error::ValidationError;
use crate::wire;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt::{self, Debug};
use std::hash::Hash;

// ============================================================================
// KIND TAG
// ============================================================================

/// Runtime discriminator for a kind, used in logs and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KindTag {
    Column,
    Filter,
}

impl KindTag {
    pub fn as_str(self) -> &'static str {
        match self {
            KindTag::Column => "column",
            KindTag::Filter => "filter",
        }
    }
}

impl fmt::Display for KindTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// DESCRIPTOR TRAITS
// ============================================================================

/// Bounds shared by every per-kind extra field group.
pub trait ExtraFields:
    Clone + Debug + Default + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

impl<T> ExtraFields for T where
    T: Clone + Debug + Default + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

/// An override field that may be reset to null.
///
/// `ALL` is the whitelist. Client-supplied names are only ever matched
/// against it; the storage column comes from [`OverrideField::name`].
pub trait OverrideField: Copy + Eq + Ord + Hash + Debug + Send + Sync + 'static {
    const ALL: &'static [Self];

    fn name(self) -> &'static str;

    fn parse(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|field| field.name() == name)
    }
}

/// Descriptor for one instantiation of the layered model.
pub trait ItemKind: Copy + Debug + Default + PartialEq + Eq + Hash + Send + Sync + 'static {
    const TAG: KindTag;

    /// Baseline-only fields beyond the shared identity/name/fixed/seq set.
    type Attrs: ExtraFields;
    /// Nullable override fields beyond the shared hidden/seq pair.
    type Overrides: ExtraFields;
    /// Effective values of the extra fields after the merge.
    type Resolved: ExtraFields;
    /// Whitelisted nullable fields.
    type Field: OverrideField;

    fn resolve(attrs: &Self::Attrs, overrides: Option<&Self::Overrides>) -> Self::Resolved;

    fn clear_field(item: &mut OverrideItem<Self>, field: Self::Field);

    fn validate_overrides(_overrides: &Self::Overrides) -> Result<(), ValidationError> {
        Ok(())
    }
}

/// Extra field group for kinds that carry none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoExtras {}

// ============================================================================
// COLUMNS
// ============================================================================

/// Table column layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Column;

/// Baseline column attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnAttrs {
    /// Position code, e.g. "l" / "r" / "c".
    #[serde(default, deserialize_with = "wire::text")]
    pub location: String,
    /// Formatting or validation rule.
    #[serde(default, deserialize_with = "wire::text")]
    pub rule: String,
}

/// Per-user column overrides; `None` inherits the baseline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnOverrides {
    #[serde(default, deserialize_with = "wire::opt_flag")]
    pub frozen: Option<bool>,
    #[serde(default, deserialize_with = "wire::opt_text")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "wire::opt_text")]
    pub rule: Option<String>,
    #[serde(default, deserialize_with = "wire::opt_width")]
    pub width: Option<f64>,
}

/// Effective column attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedColumn {
    pub frozen: bool,
    pub location: String,
    pub rule: String,
    pub width: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ColumnField {
    Hidden,
    Frozen,
    Location,
    Width,
}

impl OverrideField for ColumnField {
    const ALL: &'static [Self] = &[
        ColumnField::Hidden,
        ColumnField::Frozen,
        ColumnField::Location,
        ColumnField::Width,
    ];

    fn name(self) -> &'static str {
        match self {
            ColumnField::Hidden => "hidden",
            ColumnField::Frozen => "frozen",
            ColumnField::Location => "location",
            ColumnField::Width => "width",
        }
    }
}

impl ItemKind for Column {
    const TAG: KindTag = KindTag::Column;

    type Attrs = ColumnAttrs;
    type Overrides = ColumnOverrides;
    type Resolved = ResolvedColumn;
    type Field = ColumnField;

    fn resolve(attrs: &ColumnAttrs, overrides: Option<&ColumnOverrides>) -> ResolvedColumn {
        ResolvedColumn {
            frozen: overrides.and_then(|o| o.frozen).unwrap_or(false),
            location: overrides
                .and_then(|o| o.location.clone())
                .unwrap_or_else(|| attrs.location.clone()),
            rule: overrides
                .and_then(|o| o.rule.clone())
                .unwrap_or_else(|| attrs.rule.clone()),
            width: overrides.and_then(|o| o.width),
        }
    }

    fn clear_field(item: &mut OverrideItem<Self>, field: ColumnField) {
        match field {
            ColumnField::Hidden => item.hidden = None,
            ColumnField::Frozen => item.overrides.frozen = None,
            ColumnField::Location => item.overrides.location = None,
            ColumnField::Width => item.overrides.width = None,
        }
    }

    fn validate_overrides(overrides: &ColumnOverrides) -> Result<(), ValidationError> {
        match overrides.width {
            Some(width) => validate_width(width),
            None => Ok(()),
        }
    }
}

/// Widths must be finite and strictly positive.
pub fn validate_width(width: f64) -> Result<(), ValidationError> {
    if width.is_finite() && width > 0.0 {
        Ok(())
    } else {
        Err(ValidationError::malformed(format!(
            "width must be a positive number, got {}",
            width
        )))
    }
}

// ============================================================================
// FILTERS
// ============================================================================

/// Search/filter widget layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Filter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FilterField {
    Hidden,
}

impl OverrideField for FilterField {
    const ALL: &'static [Self] = &[FilterField::Hidden];

    fn name(self) -> &'static str {
        match self {
            FilterField::Hidden => "hidden",
        }
    }
}

impl ItemKind for Filter {
    const TAG: KindTag = KindTag::Filter;

    type Attrs = NoExtras;
    type Overrides = NoExtras;
    type Resolved = NoExtras;
    type Field = FilterField;

    fn resolve(_attrs: &NoExtras, _overrides: Option<&NoExtras>) -> NoExtras {
        NoExtras {}
    }

    fn clear_field(item: &mut OverrideItem<Self>, field: FilterField) {
        match field {
            FilterField::Hidden => item.hidden = None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_whitelist() {
        assert_eq!(ColumnField::parse("hidden"), Some(ColumnField::Hidden));
        assert_eq!(ColumnField::parse("frozen"), Some(ColumnField::Frozen));
        assert_eq!(ColumnField::parse("location"), Some(ColumnField::Location));
        assert_eq!(ColumnField::parse("width"), Some(ColumnField::Width));
        // rule and seq are overridable but not nullable through the whitelist
        assert_eq!(ColumnField::parse("rule"), None);
        assert_eq!(ColumnField::parse("seq"), None);
        assert_eq!(ColumnField::parse("Hidden"), None);
        assert_eq!(ColumnField::parse("width; drop table"), None);
    }

    #[test]
    fn test_filter_whitelist() {
        assert_eq!(FilterField::parse("hidden"), Some(FilterField::Hidden));
        assert_eq!(FilterField::parse("width"), None);
        assert_eq!(FilterField::parse("frozen"), None);
    }

    #[test]
    fn test_column_resolve_prefers_override() {
        let attrs = ColumnAttrs {
            location: "l".to_string(),
            rule: "money".to_string(),
        };
        let overrides = ColumnOverrides {
            frozen: Some(true),
            location: Some("r".to_string()),
            rule: None,
            width: Some(140.0),
        };

        let resolved = Column::resolve(&attrs, Some(&overrides));
        assert!(resolved.frozen);
        assert_eq!(resolved.location, "r");
        assert_eq!(resolved.rule, "money");
        assert_eq!(resolved.width, Some(140.0));
    }

    #[test]
    fn test_column_resolve_defaults_without_override() {
        let attrs = ColumnAttrs {
            location: "c".to_string(),
            rule: String::new(),
        };

        let resolved = Column::resolve(&attrs, None);
        assert!(!resolved.frozen);
        assert_eq!(resolved.location, "c");
        assert_eq!(resolved.width, None);
    }

    #[test]
    fn test_validate_width() {
        assert!(validate_width(1.0).is_ok());
        assert!(validate_width(0.0).is_err());
        assert!(validate_width(-12.0).is_err());
        assert!(validate_width(f64::NAN).is_err());
        assert!(validate_width(f64::INFINITY).is_err());
    }

    #[test]
    fn test_kind_tag_display() {
        assert_eq!(Column::TAG.to_string(), "column");
        assert_eq!(Filter::TAG.to_string(), "filter");
    }
}
