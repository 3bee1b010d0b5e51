//! Principal/secret credential lists.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use trustseed_types::{Result, SetupError};

/// One principal/secret pair in an append-only credential list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CredentialEntry {
    /// Authentication identity
    pub principal: String,
    /// Shared secret
    pub secret: String,
}

impl CredentialEntry {
    /// Create a new entry.
    pub fn new(principal: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            principal: principal.into(),
            secret: secret.into(),
        }
    }
}

/// Raw elements of a stored credential list. An absent value is an empty list.
pub fn elements<'a>(key: &str, value: Option<&'a Value>) -> Result<&'a [Value]> {
    match value {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(SetupError::Config(format!(
            "Stored value for {} is not a list of principal/secret entries",
            key
        ))),
    }
}

/// Well-formed entries of a stored credential list.
///
/// Elements without a string `principal` and `secret` are skipped; they are
/// kept in the document untouched.
pub fn decode(key: &str, value: Option<&Value>) -> Result<Vec<CredentialEntry>> {
    Ok(elements(key, value)?
        .iter()
        .filter_map(|item| serde_json::from_value(item.clone()).ok())
        .collect())
}

/// Whether the stored element carries the same principal and secret as `entry`.
pub fn matches(item: &Value, entry: &CredentialEntry) -> bool {
    item.get("principal").and_then(Value::as_str) == Some(entry.principal.as_str())
        && item.get("secret").and_then(Value::as_str) == Some(entry.secret.as_str())
}

/// Encode one entry for storage.
pub fn encode(entry: &CredentialEntry) -> Result<Value> {
    Ok(serde_json::to_value(entry)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_absent_is_empty() {
        assert!(decode("mesos_credentials", None).unwrap().is_empty());
    }

    #[test]
    fn test_decode_entries() {
        let stored = json!([{"principal": "marathon", "secret": "s3cret"}]);
        let entries = decode("mesos_credentials", Some(&stored)).unwrap();
        assert_eq!(entries, vec![CredentialEntry::new("marathon", "s3cret")]);
        assert_eq!(encode(&entries[0]).unwrap(), stored[0]);
    }

    #[test]
    fn test_decode_skips_incomplete_entries() {
        let stored = json!([{"principal": "chronos"}, {"principal": "marathon", "secret": "s3cret", "note": "x"}]);
        let entries = decode("mesos_credentials", Some(&stored)).unwrap();
        assert_eq!(entries, vec![CredentialEntry::new("marathon", "s3cret")]);
    }

    #[test]
    fn test_matches_ignores_extra_fields() {
        let entry = CredentialEntry::new("marathon", "s3cret");
        assert!(matches(&json!({"principal": "marathon", "secret": "s3cret", "note": "x"}), &entry));
        assert!(!matches(&json!({"principal": "marathon"}), &entry));
    }

    #[test]
    fn test_decode_rejects_wrong_shape() {
        let stored = json!("marathon:s3cret");
        assert!(decode("mesos_credentials", Some(&stored)).is_err());
    }
}
