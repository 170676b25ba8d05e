//! Declarative field rules.
//!
//! A [`Schema`] is an ordered list of [`FieldRule`]s plus a list of
//! [`ConditionalRule`]s. Field rules describe the base shape of each property;
//! conditional rules are evaluated afterwards against the raw submitted values
//! of sibling fields.

use super::error::{SchemaError, SchemaResult};
use regex::Regex;
use std::collections::HashSet;

/// `local@domain.tld`: no whitespace, one `@`, at least two non-empty domain
/// labels. Top-level domains are not checked against a list.
const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@.]+(\.[^\s@.]+)+$";

#[derive(Debug, Clone)]
pub enum FieldKind {
    String,
    Object(Schema),
    Array(Schema),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Required,
    Optional,
}

#[derive(Debug, Clone)]
pub struct FieldRule {
    pub(crate) name: &'static str,
    pub(crate) label: Option<&'static str>,
    pub(crate) kind: FieldKind,
    pub(crate) presence: Presence,
    pub(crate) allow_empty: bool,
    pub(crate) default: Option<&'static str>,
    pub(crate) min_len: Option<usize>,
    pub(crate) max_len: Option<usize>,
    pub(crate) allowed: Option<Vec<&'static str>>,
    pub(crate) email: Option<Regex>,
    pub(crate) pattern: Option<Regex>,
}

impl FieldRule {
    fn with_kind(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            label: None,
            kind,
            presence: Presence::Optional,
            allow_empty: false,
            default: None,
            min_len: None,
            max_len: None,
            allowed: None,
            email: None,
            pattern: None,
        }
    }

    pub fn string(name: &'static str) -> Self {
        Self::with_kind(name, FieldKind::String)
    }

    pub fn object(name: &'static str, schema: Schema) -> Self {
        Self::with_kind(name, FieldKind::Object(schema))
    }

    pub fn array(name: &'static str, item: Schema) -> Self {
        Self::with_kind(name, FieldKind::Array(item))
    }

    pub fn label(mut self, label: &'static str) -> Self {
        self.label = Some(label);
        self
    }

    pub fn required(mut self) -> Self {
        self.presence = Presence::Required;
        self
    }

    /// Accept `""` as a value. Empty values skip the remaining string checks.
    pub fn allow_empty(mut self) -> Self {
        self.allow_empty = true;
        self
    }

    /// Value written into the normalised document when the field is absent.
    pub fn default_value(mut self, value: &'static str) -> Self {
        self.default = Some(value);
        self
    }

    pub fn min(mut self, len: usize) -> Self {
        self.min_len = Some(len);
        self
    }

    pub fn max(mut self, len: usize) -> Self {
        self.max_len = Some(len);
        self
    }

    pub fn one_of(mut self, values: &[&'static str]) -> Self {
        self.allowed = Some(values.to_vec());
        self
    }

    pub fn email(mut self) -> SchemaResult<Self> {
        self.email = Some(self.compile(EMAIL_PATTERN)?);
        Ok(self)
    }

    pub fn pattern(mut self, pattern: &str) -> SchemaResult<Self> {
        self.pattern = Some(self.compile(pattern)?);
        Ok(self)
    }

    fn compile(&self, pattern: &str) -> SchemaResult<Regex> {
        Regex::new(pattern).map_err(|source| SchemaError::InvalidPattern {
            field: self.name,
            source,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_required(&self) -> bool {
        self.presence == Presence::Required
    }

    /// Name shown in messages: the label when set, the property name otherwise.
    pub fn display_name(&self) -> &'static str {
        self.label.unwrap_or(self.name)
    }
}

/// What happens to the dependent field when the trigger matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Dependent must be present and non-empty.
    Require,
    /// Dependent must be absent or empty.
    Forbid,
}

/// `(trigger-field, triggering-values, dependent-field, effect)`.
#[derive(Debug, Clone)]
pub struct ConditionalRule {
    pub(crate) trigger: &'static str,
    pub(crate) values: Vec<&'static str>,
    pub(crate) dependent: &'static str,
    pub(crate) effect: Effect,
}

impl ConditionalRule {
    pub fn new(
        trigger: &'static str,
        values: &[&'static str],
        dependent: &'static str,
        effect: Effect,
    ) -> Self {
        Self {
            trigger,
            values: values.to_vec(),
            dependent,
            effect,
        }
    }

    pub fn require_when(
        dependent: &'static str,
        trigger: &'static str,
        values: &[&'static str],
    ) -> Self {
        Self::new(trigger, values, dependent, Effect::Require)
    }

    pub fn forbid_when(
        dependent: &'static str,
        trigger: &'static str,
        values: &[&'static str],
    ) -> Self {
        Self::new(trigger, values, dependent, Effect::Forbid)
    }

    /// True when the raw trigger value exists and equals one of the values.
    pub(crate) fn matches(&self, raw: Option<&serde_json::Value>) -> bool {
        match raw.and_then(|value| value.as_str()) {
            Some(value) => self.values.iter().any(|candidate| *candidate == value),
            None => false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub(crate) fields: Vec<FieldRule>,
    pub(crate) conditions: Vec<ConditionalRule>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, rule: FieldRule) -> Self {
        self.fields.push(rule);
        self
    }

    pub fn fields(mut self, rules: impl IntoIterator<Item = FieldRule>) -> Self {
        self.fields.extend(rules);
        self
    }

    pub fn when(mut self, rule: ConditionalRule) -> Self {
        self.conditions.push(rule);
        self
    }

    pub fn rule(&self, name: &str) -> Option<&FieldRule> {
        self.fields.iter().find(|rule| rule.name == name)
    }

    /// Rejects schemas whose rules cannot be evaluated: repeated fields and
    /// conditional rules naming fields the schema never declares.
    pub fn check(&self, entity: &str) -> SchemaResult<()> {
        let mut seen = HashSet::new();
        for rule in &self.fields {
            if !seen.insert(rule.name) {
                return Err(SchemaError::DuplicateField {
                    entity: entity.to_string(),
                    field: rule.name.to_string(),
                });
            }
            match &rule.kind {
                FieldKind::Object(nested) | FieldKind::Array(nested) => {
                    nested.check(&format!("{entity}.{}", rule.name))?;
                }
                FieldKind::String => {}
            }
        }

        for condition in &self.conditions {
            for field in [condition.trigger, condition.dependent] {
                if !seen.contains(field) {
                    return Err(SchemaError::UndeclaredField {
                        entity: entity.to_string(),
                        field: field.to_string(),
                    });
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_rejects_conditions_on_undeclared_fields() {
        let schema = Schema::new()
            .field(FieldRule::string("typeOfDeveloper"))
            .when(ConditionalRule::require_when(
                "nationality",
                "typeOfDeveloper",
                &["Individual"],
            ));

        let err = schema.check("organisation").unwrap_err();
        assert!(matches!(err, SchemaError::UndeclaredField { ref field, .. } if field == "nationality"));
    }

    #[test]
    fn check_rejects_duplicate_fields() {
        let schema = Schema::new()
            .field(FieldRule::string("email"))
            .field(FieldRule::string("email"));

        assert!(matches!(
            schema.check("contact"),
            Err(SchemaError::DuplicateField { .. })
        ));
    }

    #[test]
    fn invalid_pattern_is_a_schema_error() {
        let err = FieldRule::string("phone").pattern("^(\\d").unwrap_err();
        assert!(matches!(err, SchemaError::InvalidPattern { field: "phone", .. }));
    }

    #[test]
    fn email_rule_accepts_addresses_with_a_dotted_domain() {
        let rule = FieldRule::string("email").email().unwrap();
        let email = rule.email.as_ref().unwrap();

        assert!(email.is_match("jo@example.com"));
        assert!(email.is_match("jo.lee@mail.example.co.uk"));
        assert!(!email.is_match("jo@example"));
        assert!(!email.is_match("jo@example."));
        assert!(!email.is_match("@example.com"));
        assert!(!email.is_match("jo @example.com"));
        assert!(!email.is_match("jo@@example.com"));
    }

    #[test]
    fn condition_matches_only_listed_string_values() {
        let rule = ConditionalRule::require_when("b", "a", &["X"]);
        assert!(rule.matches(Some(&serde_json::json!("X"))));
        assert!(!rule.matches(Some(&serde_json::json!("Y"))));
        assert!(!rule.matches(Some(&serde_json::json!(1))));
        assert!(!rule.matches(None));
    }
}
