//! Field-path keyed validation failures.
//!
//! A validation pass collects every violation it finds. Each violation is
//! addressed by the sequence of property names (and array indices) leading to
//! the offending value, and the aggregate renders to the nested JSON object
//! clients receive under `error`:
//!
//! ```text
//! [contacts, 0, email] "must be a valid email"
//!     => {"contacts": {"0": {"email": {"message": "..."}}}}
//! ```

use serde::{Serialize, Serializer};
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::fmt;

/// One failed rule, addressed by field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub path: Vec<String>,
    pub message: String,
}

impl Violation {
    pub fn new(path: Vec<String>, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
        }
    }

    pub fn dotted_path(&self) -> String {
        self.path.join(".")
    }
}

/// The aggregate error object returned for a rejected payload.
///
/// Holds at most one violation per distinct path; the first message recorded
/// for a path is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorDetails {
    violations: Vec<Violation>,
}

impl ErrorDetails {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, violation: Violation) {
        if self.contains_path(&violation.path) {
            return;
        }
        self.violations.push(violation);
    }

    pub fn contains_path<S: AsRef<str>>(&self, path: &[S]) -> bool {
        self.find(path).is_some()
    }

    /// Message recorded for an exact path, if any.
    pub fn message_for<S: AsRef<str>>(&self, path: &[S]) -> Option<&str> {
        self.find(path).map(|violation| violation.message.as_str())
    }

    fn find<S: AsRef<str>>(&self, path: &[S]) -> Option<&Violation> {
        self.violations
            .iter()
            .find(|existing| same_path(&existing.path, path))
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// Nested JSON rendering; distinct paths sharing a prefix are merged.
    pub fn to_json(&self) -> JsonValue {
        let mut root = JsonMap::new();
        for violation in &self.violations {
            insert_violation(&mut root, &violation.path, &violation.message);
        }
        JsonValue::Object(root)
    }
}

fn same_path<S: AsRef<str>>(left: &[String], right: &[S]) -> bool {
    left.len() == right.len()
        && left
            .iter()
            .zip(right)
            .all(|(left, right)| left == right.as_ref())
}

fn insert_violation(node: &mut JsonMap<String, JsonValue>, path: &[String], message: &str) {
    let Some((head, rest)) = path.split_first() else {
        node.entry("message".to_string())
            .or_insert_with(|| JsonValue::String(message.to_string()));
        return;
    };

    let child = node
        .entry(head.clone())
        .or_insert_with(|| JsonValue::Object(JsonMap::new()));
    if !child.is_object() {
        *child = JsonValue::Object(JsonMap::new());
    }
    if let JsonValue::Object(child) = child {
        insert_violation(child, rest, message);
    }
}

impl Serialize for ErrorDetails {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl fmt::Display for ErrorDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for violation in &self.violations {
            if !first {
                f.write_str("; ")?;
            }
            first = false;
            write!(f, "{}: {}", violation.dotted_path(), violation.message)?;
        }
        Ok(())
    }
}

impl FromIterator<Violation> for ErrorDetails {
    fn from_iter<I: IntoIterator<Item = Violation>>(iter: I) -> Self {
        let mut details = Self::new();
        for violation in iter {
            details.push(violation);
        }
        details
    }
}
