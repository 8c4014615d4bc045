pub mod patterns;
pub mod schema;

pub use schema::{
    parse_record, FieldSpec, FromRecord, ParsedRecord, ParsedValue, RecordError, RecordSchema,
};

use std::borrow::Cow;
use std::collections::BTreeMap;

use regex::{Regex, RegexBuilder};
use serde_json::{Map, Value};
use tracing::warn;

/// Validation rule for one field of a request body.
#[derive(Debug, Clone)]
pub enum FieldRule {
    /// Field is accepted without inspection.
    NoCheck,
    /// Value's string form must match the pattern (case-insensitive).
    Pattern(Regex),
    /// Value must be an array; elements are checked against the pattern
    /// registered under `<field>_list`.
    ScalarList,
    /// Value must be an object; sub-keys are checked against this same
    /// ruleset.
    Object,
    /// Value must be an array of objects, each checked like `Object`.
    ObjectList,
}

/// Field rules for one record type. Scoped per record so unrelated
/// payloads cannot collide on a field name.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: BTreeMap<&'static str, FieldRule>,
}

#[derive(Debug, Default)]
pub struct RuleSetBuilder {
    rules: BTreeMap<&'static str, FieldRule>,
}

impl RuleSetBuilder {
    pub fn no_check(mut self, name: &'static str) -> Self {
        self.rules.insert(name, FieldRule::NoCheck);
        self
    }

    pub fn pattern(mut self, name: &'static str, pattern: &str) -> Self {
        let compiled = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .expect("field rule pattern must compile");
        self.rules.insert(name, FieldRule::Pattern(compiled));
        self
    }

    pub fn scalar_list(mut self, name: &'static str) -> Self {
        self.rules.insert(name, FieldRule::ScalarList);
        self
    }

    pub fn object(mut self, name: &'static str) -> Self {
        self.rules.insert(name, FieldRule::Object);
        self
    }

    pub fn object_list(mut self, name: &'static str) -> Self {
        self.rules.insert(name, FieldRule::ObjectList);
        self
    }

    pub fn build(self) -> RuleSet {
        RuleSet { rules: self.rules }
    }
}

impl RuleSet {
    pub fn builder() -> RuleSetBuilder {
        RuleSetBuilder::default()
    }

    pub fn rule(&self, name: &str) -> Option<&FieldRule> {
        self.rules.get(name)
    }

    /// Accept/reject decision for a decoded request body. Rejection is a
    /// return of `false`, never an error; each rejection reason is logged.
    /// The first failing field short-circuits the whole call.
    pub fn validate(&self, body: &Map<String, Value>, required: &[&str], optional: &[&str]) -> bool {
        if !required_validation(body, required, optional) {
            return false;
        }

        for (key, value) in body {
            let Some(rule) = self.rules.get(key.as_str()) else {
                warn!(field = %key, "REQUEST: no rule registered for field");
                return false;
            };

            let valid = match rule {
                FieldRule::NoCheck => true,
                FieldRule::Pattern(pattern) => {
                    regex_validation(Some(pattern), &value_text(value), key)
                }
                FieldRule::ScalarList => self.validate_scalar_list(key, value),
                FieldRule::Object => self.validate_object(key, value),
                FieldRule::ObjectList => self.validate_object_list(key, value),
            };

            if !valid {
                return false;
            }
        }

        true
    }

    fn validate_scalar_list(&self, key: &str, value: &Value) -> bool {
        let element_rule = format!("{key}_list");
        let pattern = match self.rules.get(element_rule.as_str()) {
            Some(FieldRule::Pattern(pattern)) => pattern,
            _ => {
                warn!(field = %key, "REQUEST: list field has no element pattern registered");
                return false;
            }
        };

        let Some(items) = value.as_array() else {
            warn!(field = %key, "REQUEST: expected a list value");
            return false;
        };

        items
            .iter()
            .all(|item| regex_validation(Some(pattern), &value_text(item), key))
    }

    fn validate_object(&self, key: &str, value: &Value) -> bool {
        let Some(object) = value.as_object() else {
            warn!(field = %key, "REQUEST: expected an object value");
            return false;
        };

        object
            .iter()
            .all(|(sub_key, sub_value)| self.validate_sub_field(sub_key, sub_value))
    }

    fn validate_object_list(&self, key: &str, value: &Value) -> bool {
        let Some(items) = value.as_array() else {
            warn!(field = %key, "REQUEST: expected a list of objects");
            return false;
        };

        items.iter().all(|item| self.validate_object(key, item))
    }

    // Sub-keys of object fields resolve against the same flat ruleset.
    // A sub-key without a registered rule is invalid here, unlike the
    // top-level path where unknown keys are rejected by the set check
    // before any rule lookup.
    fn validate_sub_field(&self, sub_key: &str, sub_value: &Value) -> bool {
        match self.rules.get(sub_key) {
            None => regex_validation(None, &value_text(sub_value), sub_key),
            Some(FieldRule::Pattern(pattern)) => {
                regex_validation(Some(pattern), &value_text(sub_value), sub_key)
            }
            Some(FieldRule::NoCheck) => true,
            Some(_) => {
                warn!(field = %sub_key, "REQUEST: structural rules cannot nest inside objects");
                false
            }
        }
    }
}

fn required_validation(body: &Map<String, Value>, required: &[&str], optional: &[&str]) -> bool {
    let keys: Vec<&str> = body.keys().map(String::as_str).collect();

    let missing_required = required.iter().any(|field| !body.contains_key(*field));
    let unexpected = keys
        .iter()
        .any(|key| !required.contains(key) && !optional.contains(key));

    if missing_required || unexpected {
        warn!(keys = ?keys, "REQUEST: unsupported request body received");
        return false;
    }

    true
}

fn regex_validation(pattern: Option<&Regex>, text: &str, key_name: &str) -> bool {
    let Some(pattern) = pattern else {
        warn!(field = %key_name, "REQUEST: invalid data provided for field");
        return false;
    };

    if !pattern.is_match(text) {
        warn!(field = %key_name, "REQUEST: invalid data provided for field");
        return false;
    }

    true
}

pub(crate) fn value_text(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(text) => Cow::Borrowed(text.as_str()),
        other => Cow::Owned(other.to_string()),
    }
}
