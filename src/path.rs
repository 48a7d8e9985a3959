//! Dotted-path resolution over nested document mappings.
//!
//! A path such as `"user.name"` addresses a nested field. A literal key
//! takes priority over descent at every level, so documents produced by
//! projection or join flattening (keys like `"left.id"`) resolve the same
//! paths they were built from.

use crate::value::Value;

/// Resolve a dotted path against a document.
///
/// Traversal descends through nested objects only; a missing key or a
/// non-object intermediate resolves to `None`. Resolution never fails.
pub fn resolve<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    let Value::Object(map) = doc else {
        return None;
    };
    if let Some(value) = map.get(path) {
        return Some(value);
    }
    let (head, rest) = path.split_once('.')?;
    resolve(map.get(head)?, rest)
}

#[test]
fn test_nested_resolution() {
    let doc = crate::parser::parse(r#"{"user": {"name": "Alice", "age": 30}}"#).unwrap();
    assert_eq!(
        resolve(&doc, "user.name"),
        Some(&Value::String("Alice".to_string()))
    );
    assert_eq!(resolve(&doc, "user.age"), Some(&Value::Integer(30)));
    assert_eq!(resolve(&doc, "user.email"), None);
    assert_eq!(resolve(&doc, "account.name"), None);
}

#[test]
fn test_literal_key_wins() {
    let doc = crate::parser::parse(r#"{"user.name": "flat", "user": {"name": "nested"}}"#).unwrap();
    assert_eq!(
        resolve(&doc, "user.name"),
        Some(&Value::String("flat".to_string()))
    );
}

#[test]
fn test_scalar_documents_resolve_nothing() {
    assert_eq!(resolve(&Value::Integer(1), "field"), None);
}
