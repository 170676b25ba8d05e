//! Collect-all payload validation.
//!
//! Every field rule runs, then every conditional rule runs against the raw
//! payload. Nothing short-circuits: the caller gets either the normalised
//! document or the full [`ErrorDetails`] set.

use super::ENTITY_TAG;
use super::details::{ErrorDetails, Violation};
use super::rules::{ConditionalRule, Effect, FieldKind, FieldRule, Schema};
use crate::gateway::Document;
use serde_json::Value as JsonValue;

impl Schema {
    /// Validates `payload`, returning the normalised document on success.
    ///
    /// The normalised document carries declared fields only, with defaults
    /// filled in for absent optional fields. The entity tag is accepted at the
    /// top level and dropped from the result.
    pub fn validate(&self, payload: &Document) -> Result<Document, ErrorDetails> {
        let mut details = ErrorDetails::new();
        let normalised = self.validate_at(payload, &[], &mut details);
        if details.is_empty() {
            Ok(normalised)
        } else {
            Err(details)
        }
    }

    fn validate_at(
        &self,
        payload: &Document,
        prefix: &[String],
        details: &mut ErrorDetails,
    ) -> Document {
        let mut normalised = Document::new();

        for rule in &self.fields {
            let path = child_path(prefix, rule.name);
            match payload.get(rule.name) {
                None => {
                    if rule.is_required() {
                        details.push(Violation::new(
                            path,
                            format!("\"{}\" is required", rule.display_name()),
                        ));
                    } else if let Some(default) = rule.default {
                        normalised.insert(
                            rule.name.to_string(),
                            JsonValue::String(default.to_string()),
                        );
                    }
                }
                Some(value) => {
                    if let Some(value) = validate_value(rule, value, &path, details) {
                        normalised.insert(rule.name.to_string(), value);
                    }
                }
            }
        }

        for key in payload.keys() {
            if prefix.is_empty() && key == ENTITY_TAG {
                continue;
            }
            if self.rule(key).is_none() {
                details.push(Violation::new(
                    child_path(prefix, key),
                    format!("\"{key}\" is not allowed"),
                ));
            }
        }

        for condition in &self.conditions {
            self.apply_condition(condition, payload, prefix, details);
        }

        normalised
    }

    fn apply_condition(
        &self,
        condition: &ConditionalRule,
        payload: &Document,
        prefix: &[String],
        details: &mut ErrorDetails,
    ) {
        if !condition.matches(payload.get(condition.trigger)) {
            return;
        }

        let label = self
            .rule(condition.dependent)
            .map(FieldRule::display_name)
            .unwrap_or(condition.dependent);
        let path = child_path(prefix, condition.dependent);
        let dependent = payload.get(condition.dependent);

        match condition.effect {
            Effect::Require => match dependent {
                None | Some(JsonValue::Null) => {
                    details.push(Violation::new(path, format!("\"{label}\" is required")));
                }
                Some(JsonValue::String(value)) if value.is_empty() => {
                    details.push(Violation::new(
                        path,
                        format!("\"{label}\" is not allowed to be empty"),
                    ));
                }
                Some(_) => {}
            },
            Effect::Forbid => {
                if !is_blank(dependent) {
                    details.push(Violation::new(path, format!("\"{label}\" is not allowed")));
                }
            }
        }
    }
}

fn validate_value(
    rule: &FieldRule,
    value: &JsonValue,
    path: &[String],
    details: &mut ErrorDetails,
) -> Option<JsonValue> {
    let label = rule.display_name();
    match &rule.kind {
        FieldKind::String => {
            let Some(text) = value.as_str() else {
                details.push(Violation::new(
                    path.to_vec(),
                    format!("\"{label}\" must be a string"),
                ));
                return None;
            };
            match check_string(rule, text) {
                Ok(()) => Some(value.clone()),
                Err(message) => {
                    details.push(Violation::new(path.to_vec(), message));
                    None
                }
            }
        }
        FieldKind::Object(schema) => {
            let Some(object) = value.as_object() else {
                details.push(Violation::new(
                    path.to_vec(),
                    format!("\"{label}\" must be of type object"),
                ));
                return None;
            };
            Some(JsonValue::Object(schema.validate_at(object, path, details)))
        }
        FieldKind::Array(item_schema) => {
            let Some(items) = value.as_array() else {
                details.push(Violation::new(
                    path.to_vec(),
                    format!("\"{label}\" must be an array"),
                ));
                return None;
            };
            let mut normalised = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                let item_path = child_path(path, &index.to_string());
                match item.as_object() {
                    Some(object) => normalised.push(JsonValue::Object(
                        item_schema.validate_at(object, &item_path, details),
                    )),
                    None => details.push(Violation::new(
                        item_path,
                        format!("\"{label}[{index}]\" must be of type object"),
                    )),
                }
            }
            Some(JsonValue::Array(normalised))
        }
    }
}

fn check_string(rule: &FieldRule, text: &str) -> Result<(), String> {
    let label = rule.display_name();

    if text.is_empty() {
        return if rule.allow_empty {
            Ok(())
        } else {
            Err(format!("\"{label}\" is not allowed to be empty"))
        };
    }

    if let Some(allowed) = &rule.allowed {
        if !allowed.iter().any(|candidate| *candidate == text) {
            let mut listed = allowed.join(", ");
            if rule.allow_empty {
                listed.push_str(", ");
            }
            return Err(format!("\"{label}\" must be one of [{listed}]"));
        }
    }

    let length = text.chars().count();
    if let Some(min) = rule.min_len {
        if length < min {
            return Err(format!(
                "\"{label}\" length must be at least {min} characters long"
            ));
        }
    }
    if let Some(max) = rule.max_len {
        if length > max {
            return Err(format!(
                "\"{label}\" length must be less than or equal to {max} characters long"
            ));
        }
    }

    if rule.email.as_ref().is_some_and(|email| !email.is_match(text)) {
        return Err(format!("\"{label}\" must be a valid email"));
    }

    if let Some(pattern) = &rule.pattern {
        if !pattern.is_match(text) {
            return Err(format!(
                "\"{label}\" with value \"{text}\" fails to match the required pattern: {}",
                pattern.as_str()
            ));
        }
    }

    Ok(())
}

fn is_blank(value: Option<&JsonValue>) -> bool {
    match value {
        None | Some(JsonValue::Null) => true,
        Some(JsonValue::String(text)) => text.is_empty(),
        Some(_) => false,
    }
}

fn child_path(prefix: &[String], name: &str) -> Vec<String> {
    let mut path = prefix.to_vec();
    path.push(name.to_string());
    path
}
