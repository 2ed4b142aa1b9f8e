//! Constraint checking of resolved configurations.
//!
//! Rules are attached to fields with [`Field::validate`][crate::Field::validate]
//! as a comma-separated list:
//!
//! | rule         | meaning                                                  |
//! |--------------|----------------------------------------------------------|
//! | `required`   | the value is not its zero value                          |
//! | `omitempty`  | skip the remaining rules when the value is its zero value |
//! | `min=N`      | numbers: value >= N; text and lists: length >= N; durations: >= N |
//! | `max=N`      | the upper bound counterpart of `min`                     |
//! | `len=N`      | text and lists: length == N; numbers: value == N          |
//! | `oneof=a b`  | the value (as text) is one of the space-separated options |

use std::fmt;
use std::time::Duration;

use serde_json::Value;

use crate::decode::{duration_value, is_zero, zero_value};
use crate::descriptor::{Descriptors, FieldDescriptor};
use crate::schema::FieldKind;
use crate::store::ResolvedStore;


/// One failed constraint.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Violation {
    /// Dotted path of the offending field.
    pub path: String,

    /// The rule that failed, without its parameter (`min`).
    pub rule: String,

    pub parameter: Option<String>,

    pub message: String,
}

impl Violation {
    pub fn new<P, R, M>(path: P, rule: R, message: M) -> Self
    where
        P: Into<String>,
        R: Into<String>,
        M: Into<String>,
    {
        Self {
            path: path.into(),
            rule: rule.into(),
            parameter: None,
            message: message.into(),
        }
    }

    pub fn with_parameter<S: Into<String>>(mut self, parameter: S) -> Self {
        self.parameter = Some(parameter.into());
        self
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "field \"{}\" failed on the \"{}\" rule: {}",
            self.path, self.rule, self.message
        )
    }
}


/// All violations of one read. Never empty.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ValidationErrors {
    violations: Vec<Violation>,
}

impl ValidationErrors {
    /// Returns `None` if there is nothing to report.
    pub fn from_violations(violations: Vec<Violation>) -> Option<Self> {
        (!violations.is_empty()).then_some(Self { violations })
    }

    pub fn first(&self) -> &Violation {
        // PANIC SAFETY: constructed only from a non-empty vector.
        &self.violations[0]
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let first = self.first();
        write!(
            f,
            "field \"{}\" failed on the \"{}\" rule",
            first.path, first.rule
        )?;

        if self.violations.len() > 1 {
            write!(f, " (and {} more)", self.violations.len() - 1)?;
        }

        Ok(())
    }
}


/// Checks a resolved configuration.
pub trait Validator: Send + Sync {
    fn validate(&self, descriptors: &Descriptors, store: &ResolvedStore) -> Vec<Violation>;
}


/// Evaluates the rule expressions declared on each field.
#[derive(Clone, Copy, Default, Debug)]
pub struct RuleValidator;

impl Validator for RuleValidator {
    fn validate(&self, descriptors: &Descriptors, store: &ResolvedStore) -> Vec<Violation> {
        let mut violations = Vec::new();

        for descriptor in descriptors {
            let Some(rules) = descriptor.rules.as_deref() else {
                continue;
            };

            let zero = zero_value(descriptor.kind);
            let value = store.get(&descriptor.path).unwrap_or(&zero);

            for rule in rules.split(',').map(str::trim).filter(|rule| !rule.is_empty()) {
                let (name, parameter) = match rule.split_once('=') {
                    Some((name, parameter)) => (name.trim(), Some(parameter.trim())),
                    None => (rule, None),
                };

                if name == "omitempty" {
                    if is_zero(descriptor.kind, value) {
                        break;
                    }
                    continue;
                }

                if let Some(message) = check_rule(descriptor, value, name, parameter) {
                    let violation = Violation::new(&descriptor.path, name, message);
                    violations.push(match parameter {
                        Some(parameter) => violation.with_parameter(parameter),
                        None => violation,
                    });
                }
            }
        }

        violations
    }
}


/// Returns a message if `value` breaks the rule.
fn check_rule(
    descriptor: &FieldDescriptor,
    value: &Value,
    name: &str,
    parameter: Option<&str>,
) -> Option<String> {
    let kind = descriptor.kind;

    match (name, parameter) {
        ("required", None) => is_zero(kind, value).then(|| "a value is required".to_string()),
        ("min", Some(parameter)) => {
            compare(kind, value, parameter, |actual, bound| actual >= bound, "at least")
        }
        ("max", Some(parameter)) => {
            compare(kind, value, parameter, |actual, bound| actual <= bound, "at most")
        }
        ("len", Some(parameter)) => {
            compare(kind, value, parameter, |actual, bound| actual == bound, "exactly")
        }
        ("oneof", Some(parameter)) => {
            let actual = match value {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };

            (!parameter.split_whitespace().any(|option| option == actual))
                .then(|| format!("must be one of [{}]", parameter))
        }
        _ => Some(format!("unsupported validation rule \"{}\"", name)),
    }
}

/// The quantity `min`, `max` and `len` compare, and the parsed bound.
fn measure(kind: FieldKind, value: &Value, parameter: &str) -> Option<(f64, f64)> {
    match kind {
        FieldKind::Duration => {
            let bound = humantime::parse_duration(parameter).ok()?;
            let actual = nanoseconds(value)?;
            Some((actual, nanoseconds(&duration_value(bound))?))
        }
        kind if kind.is_numeric() => Some((value.as_f64()?, parameter.parse().ok()?)),
        _ => {
            let length = match value {
                Value::String(text) => text.chars().count(),
                Value::Array(items) => items.len(),
                _ => return None,
            };
            Some((length as f64, parameter.parse().ok()?))
        }
    }
}

fn compare(
    kind: FieldKind,
    value: &Value,
    parameter: &str,
    holds: impl Fn(f64, f64) -> bool,
    relation: &str,
) -> Option<String> {
    let Some((actual, bound)) = measure(kind, value, parameter) else {
        return Some(format!("cannot compare {} against \"{}\"", kind, parameter));
    };

    if holds(actual, bound) {
        return None;
    }

    let subject = match kind {
        kind if kind.is_numeric() || kind == FieldKind::Duration => "value",
        _ => "length",
    };

    Some(format!("{} must be {} {}", subject, relation, parameter))
}

fn nanoseconds(value: &Value) -> Option<f64> {
    let seconds = value.get("secs")?.as_f64()?;
    let nanos = value.get("nanos")?.as_f64()?;
    Some(seconds * 1e9 + nanos)
}
