//! Request payload decoding.
//!
//! Every decode failure surfaces as `ValidationError::MalformedPayload`.

use crate::entities::{BaselineSubmission, OverrideSubmission};
use crate::error::ValidationError;
use crate::kind::ItemKind;
use crate::wire;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ValidationError> {
    serde_json::from_slice(bytes).map_err(|e| ValidationError::malformed(e.to_string()))
}

/// Decode an administrator baseline batch: a JSON array of rows.
pub fn decode_baseline_batch<K: ItemKind>(
    bytes: &[u8],
) -> Result<Vec<BaselineSubmission<K>>, ValidationError> {
    decode(bytes)
}

/// Decode a user override batch: a JSON array of rows.
pub fn decode_override_batch<K: ItemKind>(
    bytes: &[u8],
) -> Result<Vec<OverrideSubmission<K>>, ValidationError> {
    decode(bytes)
}

/// Decode a nullify request: a JSON object mapping item values to lists of
/// field names.
pub fn decode_nullify_request(bytes: &[u8]) -> Result<BTreeMap<String, Vec<String>>, ValidationError> {
    decode(bytes)
}

/// Single-column width change.
///
/// Legacy clients send the module id under `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidthRequest {
    #[serde(rename = "id", alias = "moduleId", default, deserialize_with = "wire::text")]
    pub module_id: String,
    #[serde(default, deserialize_with = "wire::text")]
    pub value: String,
    #[serde(default, deserialize_with = "wire::opt_width")]
    pub width: Option<f64>,
}

pub fn decode_width_request(bytes: &[u8]) -> Result<WidthRequest, ValidationError> {
    decode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::StatusTag;
    use crate::kind::{Column, Filter};

    #[test]
    fn test_decode_baseline_batch() {
        let body = br#"[
            {"id":"","name":"Age","value":"age","fixed":"1","location":"l","rule":"","status":"0"},
            {"id":"","name":"Name","value":"name","fixed":"0","location":"","rule":"","status":""}
        ]"#;
        let rows = decode_baseline_batch::<Column>(body).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].status, StatusTag::Create);
        assert!(rows[0].fixed);
        assert_eq!(rows[1].status, StatusTag::Unchanged);
    }

    #[test]
    fn test_decode_rejects_non_array() {
        let err = decode_override_batch::<Filter>(br#"{"value":"age"}"#).unwrap_err();
        assert!(matches!(err, ValidationError::MalformedPayload { .. }));
    }

    #[test]
    fn test_decode_rejects_unknown_status() {
        let err = decode_override_batch::<Filter>(br#"[{"value":"age","status":"9"}]"#).unwrap_err();
        assert!(matches!(err, ValidationError::MalformedPayload { .. }));
    }

    #[test]
    fn test_decode_nullify_request() {
        let req = decode_nullify_request(br#"{"age":["width","madeUpField"],"name":[]}"#).unwrap();
        assert_eq!(req["age"], vec!["width".to_string(), "madeUpField".to_string()]);
        assert!(req["name"].is_empty());

        assert!(decode_nullify_request(br#"{"age":"width"}"#).is_err());
    }

    #[test]
    fn test_decode_width_request_legacy_shape() {
        let req = decode_width_request(br#"{"id":"M1","value":"age","width":"132"}"#).unwrap();
        assert_eq!(req.module_id, "M1");
        assert_eq!(req.value, "age");
        assert_eq!(req.width, Some(132.0));

        let req = decode_width_request(br#"{"moduleId":"M1","value":"age","width":""}"#).unwrap();
        assert_eq!(req.module_id, "M1");
        assert_eq!(req.width, None);
    }

    #[test]
    fn test_decode_garbage() {
        assert!(decode_width_request(b"not json").is_err());
        assert!(decode_baseline_batch::<Column>(b"").is_err());
    }
}
