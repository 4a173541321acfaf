//! Selective nullify planning.
//!
//! Client-supplied field names are matched against the kind's whitelist;
//! anything else is dropped and reported back for logging.

use crate::entities::OverrideItem;
use crate::kind::{ItemKind, OverrideField};
use std::collections::{BTreeMap, BTreeSet};

/// Fields to clear on every override row for one value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NullifyEntry<K: ItemKind> {
    pub value: String,
    pub fields: BTreeSet<K::Field>,
}

impl<K: ItemKind> NullifyEntry<K> {
    pub fn apply(&self, item: &mut OverrideItem<K>) {
        for field in &self.fields {
            K::clear_field(item, *field);
        }
    }
}

/// A requested field name that is not on the whitelist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedField {
    pub value: String,
    pub field: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NullifyPlan<K: ItemKind> {
    pub entries: Vec<NullifyEntry<K>>,
    pub dropped: Vec<DroppedField>,
}

/// Filter a `value -> field names` request down to whitelisted fields.
///
/// Values whose filtered set is empty get no entry.
pub fn plan_nullify<K: ItemKind>(request: &BTreeMap<String, Vec<String>>) -> NullifyPlan<K> {
    let mut entries = Vec::new();
    let mut dropped = Vec::new();

    for (value, names) in request {
        let mut fields = BTreeSet::new();
        for name in names {
            match K::Field::parse(name) {
                Some(field) => {
                    fields.insert(field);
                }
                None => dropped.push(DroppedField {
                    value: value.clone(),
                    field: name.clone(),
                }),
            }
        }
        if !fields.is_empty() {
            entries.push(NullifyEntry {
                value: value.clone(),
                fields,
            });
        }
    }

    NullifyPlan { entries, dropped }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::{Column, ColumnField, Filter, FilterField};
    use uuid::Uuid;

    fn request(pairs: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
        pairs
            .iter()
            .map(|(v, fields)| (v.to_string(), fields.iter().map(|f| f.to_string()).collect()))
            .collect()
    }

    #[test]
    fn test_unknown_fields_are_dropped() {
        let plan = plan_nullify::<Column>(&request(&[("v1", &["width", "madeUpField"])]));
        assert_eq!(plan.entries.len(), 1);
        assert_eq!(plan.entries[0].value, "v1");
        assert_eq!(
            plan.entries[0].fields.iter().copied().collect::<Vec<_>>(),
            vec![ColumnField::Width]
        );
        assert_eq!(
            plan.dropped,
            vec![DroppedField {
                value: "v1".to_string(),
                field: "madeUpField".to_string(),
            }]
        );
    }

    #[test]
    fn test_empty_filtered_set_issues_no_entry() {
        let plan = plan_nullify::<Filter>(&request(&[("v1", &["width", "frozen"]), ("v2", &[])]));
        assert!(plan.entries.is_empty());
        assert_eq!(plan.dropped.len(), 2);
    }

    #[test]
    fn test_duplicate_names_collapse() {
        let plan = plan_nullify::<Filter>(&request(&[("v1", &["hidden", "hidden"])]));
        assert_eq!(plan.entries.len(), 1);
        assert!(plan.entries[0].fields.contains(&FilterField::Hidden));
        assert_eq!(plan.entries[0].fields.len(), 1);
    }

    #[test]
    fn test_entry_clears_only_named_fields() {
        let mut item = OverrideItem::<Column>::blank(Uuid::now_v7(), "M1", "U1", "v1");
        item.hidden = Some(true);
        item.seq = Some(2);
        item.overrides.frozen = Some(true);
        item.overrides.width = Some(100.0);
        item.overrides.rule = Some("int".to_string());

        let plan = plan_nullify::<Column>(&request(&[("v1", &["width", "hidden"])]));
        plan.entries[0].apply(&mut item);

        assert_eq!(item.hidden, None);
        assert_eq!(item.overrides.width, None);
        assert_eq!(item.overrides.frozen, Some(true));
        assert_eq!(item.overrides.rule.as_deref(), Some("int"));
        assert_eq!(item.seq, Some(2));
    }
}
