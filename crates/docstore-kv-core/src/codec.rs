//! Value codec
//!
//! Converts between caller content (a JSON-like structured value) and the
//! backend's native BSON documents. The reserved identifier field is handled
//! here and only here: [`to_document`] injects it, [`to_content`] strips it.

use bson::{Bson, Document};
use serde_json::{Number, Value as JsonValue};

use crate::constants::ID_FIELD;
use crate::types::{CodecError, Content, ValueRef};

/// Encode caller content into the document stored under `value_ref.key`.
///
/// Content that uses the reserved identifier field at the top level is
/// rejected rather than silently overwritten.
pub fn to_document(value_ref: &ValueRef, content: &Content) -> Result<Document, CodecError> {
    let mut doc = Document::new();
    doc.insert(ID_FIELD, value_ref.key.clone());

    for (name, value) in content {
        if name == ID_FIELD {
            return Err(CodecError::ReservedField(name.clone()));
        }
        doc.insert(name.clone(), encode_value(value, name)?);
    }

    Ok(doc)
}

/// Decode a stored document back into caller content, dropping the identifier.
pub fn to_content(doc: Document) -> Result<Content, CodecError> {
    let mut content = Content::new();

    for (name, value) in doc {
        if name == ID_FIELD {
            continue;
        }
        let decoded = decode_value(value, &name)?;
        content.insert(name, decoded);
    }

    Ok(content)
}

/// Extract the key a document is stored under.
pub fn document_key(doc: &Document) -> Result<String, CodecError> {
    match doc.get(ID_FIELD) {
        Some(Bson::String(key)) => Ok(key.clone()),
        Some(other) => Err(CodecError::NonStringId(other.to_string())),
        None => Err(CodecError::MissingId),
    }
}

fn encode_value(value: &JsonValue, path: &str) -> Result<Bson, CodecError> {
    let bson = match value {
        JsonValue::Null => Bson::Null,
        JsonValue::Bool(b) => Bson::Boolean(*b),
        JsonValue::Number(n) => encode_number(n, path)?,
        JsonValue::String(s) => Bson::String(s.clone()),
        JsonValue::Array(items) => {
            let mut array = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                array.push(encode_value(item, &format!("{}.{}", path, index))?);
            }
            Bson::Array(array)
        }
        JsonValue::Object(map) => {
            let mut nested = Document::new();
            for (name, item) in map {
                nested.insert(name.clone(), encode_value(item, &format!("{}.{}", path, name))?);
            }
            Bson::Document(nested)
        }
    };
    Ok(bson)
}

fn encode_number(n: &Number, path: &str) -> Result<Bson, CodecError> {
    if let Some(i) = n.as_i64() {
        return Ok(Bson::Int64(i));
    }
    // Integers that only fit in u64 have no BSON representation
    if n.is_u64() {
        return Err(CodecError::NumberOutOfRange {
            path: path.to_string(),
            value: n.to_string(),
        });
    }
    n.as_f64()
        .map(Bson::Double)
        .ok_or_else(|| CodecError::NumberOutOfRange {
            path: path.to_string(),
            value: n.to_string(),
        })
}

fn decode_value(value: Bson, path: &str) -> Result<JsonValue, CodecError> {
    let json = match value {
        Bson::Null => JsonValue::Null,
        Bson::Boolean(b) => JsonValue::Bool(b),
        Bson::Int32(i) => JsonValue::Number(Number::from(i64::from(i))),
        Bson::Int64(i) => JsonValue::Number(Number::from(i)),
        Bson::Double(f) => {
            let number = Number::from_f64(f).ok_or_else(|| CodecError::NumberOutOfRange {
                path: path.to_string(),
                value: f.to_string(),
            })?;
            JsonValue::Number(number)
        }
        Bson::String(s) => JsonValue::String(s),
        Bson::Array(items) => {
            let mut array = Vec::with_capacity(items.len());
            for (index, item) in items.into_iter().enumerate() {
                array.push(decode_value(item, &format!("{}.{}", path, index))?);
            }
            JsonValue::Array(array)
        }
        Bson::Document(nested) => {
            let mut map = Content::new();
            for (name, item) in nested {
                let decoded = decode_value(item, &format!("{}.{}", path, name))?;
                map.insert(name, decoded);
            }
            JsonValue::Object(map)
        }
        other => {
            return Err(CodecError::Unsupported {
                path: path.to_string(),
                kind: type_name(&other),
            })
        }
    };
    Ok(json)
}

fn type_name(value: &Bson) -> &'static str {
    match value {
        Bson::ObjectId(_) => "objectId",
        Bson::DateTime(_) => "date",
        Bson::Binary(_) => "binData",
        Bson::Decimal128(_) => "decimal",
        Bson::RegularExpression(_) => "regex",
        Bson::JavaScriptCode(_) | Bson::JavaScriptCodeWithScope(_) => "javascript",
        Bson::Timestamp(_) => "timestamp",
        Bson::Symbol(_) => "symbol",
        Bson::Undefined => "undefined",
        Bson::MaxKey => "maxKey",
        Bson::MinKey => "minKey",
        Bson::DbPointer(_) => "dbPointer",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use serde_json::json;

    fn content(value: JsonValue) -> Content {
        match value {
            JsonValue::Object(map) => map,
            _ => panic!("test content must be an object"),
        }
    }

    #[test]
    fn test_encode_injects_identifier() {
        let value_ref = ValueRef::new("profiles", "alice");
        let doc = to_document(&value_ref, &content(json!({ "name": "Alice" }))).unwrap();

        assert_eq!(doc.get_str("_id").unwrap(), "alice");
        assert_eq!(doc.get_str("name").unwrap(), "Alice");
        assert_eq!(doc.len(), 2);
    }

    #[test]
    fn test_nested_content_survives_round_trip() {
        let original = content(json!({
            "name": "Alice",
            "age": 42,
            "score": 97.5,
            "active": true,
            "nickname": null,
            "tags": ["admin", 7, false, [1, 2]],
            "address": { "city": "Sydney", "geo": { "lat": -33.86, "lng": 151.2 } },
            "negative": -12,
            "empty_list": [],
            "empty_map": {}
        }));

        let doc = to_document(&ValueRef::new("s", "k"), &original).unwrap();
        let decoded = to_content(doc).unwrap();

        assert_eq!(decoded, original);
    }

    #[test]
    fn test_decode_strips_identifier() {
        let decoded = to_content(doc! { "_id": "k", "a": 1_i32 }).unwrap();

        assert!(!decoded.contains_key("_id"));
        assert_eq!(decoded.get("a"), Some(&json!(1)));
    }

    #[test]
    fn test_reserved_field_rejected() {
        let result = to_document(&ValueRef::new("s", "k"), &content(json!({ "_id": "other" })));
        assert_eq!(result, Err(CodecError::ReservedField("_id".to_string())));
    }

    #[test]
    fn test_nested_identifier_is_ordinary_content() {
        let original = content(json!({ "inner": { "_id": "x" } }));
        let doc = to_document(&ValueRef::new("s", "k"), &original).unwrap();
        assert_eq!(to_content(doc).unwrap(), original);
    }

    #[test]
    fn test_u64_beyond_i64_rejected() {
        let result = to_document(&ValueRef::new("s", "k"), &content(json!({ "big": u64::MAX })));
        assert!(matches!(
            result,
            Err(CodecError::NumberOutOfRange { ref path, .. }) if path == "big"
        ));
    }

    #[test]
    fn test_unsupported_type_reports_path() {
        let doc = doc! { "_id": "k", "meta": { "owner": bson::oid::ObjectId::new() } };
        let result = to_content(doc);

        assert_eq!(
            result,
            Err(CodecError::Unsupported {
                path: "meta.owner".to_string(),
                kind: "objectId",
            })
        );
    }

    #[test]
    fn test_non_finite_double_rejected() {
        let result = to_content(doc! { "_id": "k", "ratio": f64::NAN });
        assert!(matches!(result, Err(CodecError::NumberOutOfRange { .. })));
    }

    #[test]
    fn test_document_key() {
        assert_eq!(document_key(&doc! { "_id": "a1" }).unwrap(), "a1");
        assert_eq!(document_key(&doc! { "x": 1 }), Err(CodecError::MissingId));
        assert!(matches!(
            document_key(&doc! { "_id": 5_i32 }),
            Err(CodecError::NonStringId(_))
        ));
    }
}
