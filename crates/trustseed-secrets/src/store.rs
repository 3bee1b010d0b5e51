//! The persisted secret document.
//!
//! The document is a single pretty-printed JSON object. Every task that
//! touches it goes through a [`Transaction`]: load the whole document, mutate
//! it in memory, write the whole document back. There is no locking; one
//! operator runs one process against a state directory at a time.

use serde_json::{Map, Value};
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use trustseed_core::util::fs::write_atomic;
use trustseed_types::{Result, SetupError, TaskOutcome};

use crate::credentials::{self, CredentialEntry};

/// Reserved key set after every committed transaction.
///
/// Downstream playbooks gate on it; trustseed never reads it.
pub const SECURITY_ENABLED: &str = "security_enabled";

/// In-memory view of the secret document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Secrets(Map<String, Value>);

impl Secrets {
    /// Empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw value for `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String value for `key`, if present and a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Boolean value for `key`, if present and a boolean.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(Value::as_bool)
    }

    /// Whether `key` is present at all.
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Write `value` unconditionally. Reserved for derived values.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Write the value produced by `make` only if `key` is absent.
    ///
    /// Returns whether a value was written; `make` is not called otherwise.
    pub fn set_if_absent<V: Into<Value>>(&mut self, key: &str, make: impl FnOnce() -> V) -> bool {
        if self.contains(key) {
            tracing::debug!("{} already set", key);
            return false;
        }
        tracing::debug!("setting {}", key);
        self.0.insert(key.to_string(), make().into());
        true
    }

    /// Write `default` for `key` only if the key is entirely absent.
    pub fn ensure_default(&mut self, key: &str, default: impl Into<Value>) -> bool {
        self.set_if_absent(key, || default)
    }

    /// Well-formed credential entries stored under `key`.
    pub fn credentials(&self, key: &str) -> Result<Vec<CredentialEntry>> {
        credentials::decode(key, self.get(key))
    }

    /// Whether the list under `key` holds an element matching `entry`.
    pub fn has_credential(&self, key: &str, entry: &CredentialEntry) -> Result<bool> {
        Ok(credentials::elements(key, self.get(key))?
            .iter()
            .any(|item| credentials::matches(item, entry)))
    }

    /// Append `entry` to the list under `key` unless a matching element exists.
    ///
    /// Existing elements are left exactly as stored. Returns whether the
    /// entry was appended.
    pub fn append_credential(&mut self, key: &str, entry: CredentialEntry) -> Result<bool> {
        if self.has_credential(key, &entry)? {
            return Ok(false);
        }
        tracing::debug!("appending {} to {}", entry.principal, key);
        let element = credentials::encode(&entry)?;
        match self.0.get_mut(key) {
            Some(Value::Array(items)) => items.push(element),
            _ => {
                self.0.insert(key.to_string(), Value::Array(vec![element]));
            }
        }
        Ok(true)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the document is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Pretty-printed JSON with a trailing newline.
    pub fn to_pretty_json(&self) -> String {
        // Serializing a map of JSON values cannot fail
        let mut text = serde_json::to_string_pretty(&self.0).unwrap_or_default();
        text.push('\n');
        text
    }
}

/// Handle to the secret document on disk.
#[derive(Debug, Clone)]
pub struct SecretStore {
    path: PathBuf,
}

impl SecretStore {
    /// Handle for the document at `path`. Nothing is read until `load`.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the document; a missing file is an empty document.
    pub fn load(&self) -> Result<Secrets> {
        let content = match std::fs::read(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("{} does not exist yet, starting empty", self.path.display());
                return Ok(Secrets::new());
            }
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(Secrets(map)),
            Ok(other) => Err(SetupError::MalformedState {
                path: self.path.clone(),
                message: format!("expected a JSON object at the top level, found {}", json_kind(&other)),
            }),
            Err(e) => Err(SetupError::MalformedState {
                path: self.path.clone(),
                message: e.to_string(),
            }),
        }
    }

    /// Write the whole document, replacing the file in one rename.
    pub fn save(&self, secrets: &Secrets) -> Result<()> {
        let content = secrets.to_pretty_json();
        write_atomic(&self.path, content.as_bytes()).map_err(|source| SetupError::Persistence {
            path: self.path.clone(),
            content,
            source,
        })
    }

    /// Begin a load/mutate/commit transaction.
    pub fn transaction(&self) -> Result<Transaction<'_>> {
        let secrets = self.load()?;
        Ok(Transaction {
            store: self,
            snapshot: secrets.clone(),
            secrets,
            committed: false,
        })
    }

    /// Run `mutate` inside a transaction.
    ///
    /// Commits on `Ok`. On `Err` the partial mutation is still written back
    /// (without the completion flag) before the error is returned.
    pub fn transact(&self, mutate: impl FnOnce(&mut Secrets) -> Result<()>) -> Result<TaskOutcome> {
        let mut tx = self.transaction()?;
        mutate(&mut *tx)?;
        tx.commit()
    }
}

/// Scoped read-modify-write over the secret document.
///
/// Derefs to [`Secrets`]. [`Transaction::commit`] sets `security_enabled` and
/// persists. Dropping an uncommitted transaction still persists any changes
/// made so far, leaving the completion flag untouched.
#[derive(Debug)]
pub struct Transaction<'a> {
    store: &'a SecretStore,
    snapshot: Secrets,
    secrets: Secrets,
    committed: bool,
}

impl Transaction<'_> {
    /// Whether the document differs from what was loaded.
    pub fn changed(&self) -> bool {
        self.secrets != self.snapshot
    }

    /// Mark the document active and persist it.
    ///
    /// The outcome reflects changes made by the task, not the flag itself.
    pub fn commit(mut self) -> Result<TaskOutcome> {
        let outcome = TaskOutcome::from_changed(self.changed());
        self.secrets.set(SECURITY_ENABLED, true);
        self.committed = true;
        self.store.save(&self.secrets)?;
        Ok(outcome)
    }
}

impl Deref for Transaction<'_> {
    type Target = Secrets;

    fn deref(&self) -> &Secrets {
        &self.secrets
    }
}

impl DerefMut for Transaction<'_> {
    fn deref_mut(&mut self) -> &mut Secrets {
        &mut self.secrets
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.committed || !self.changed() {
            return;
        }
        tracing::warn!("Saving partial changes to {} before aborting", self.store.path().display());
        if let Err(e) = self.store.save(&self.secrets) {
            tracing::error!("{}", e);
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
