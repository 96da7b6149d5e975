use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use poke_storage::{Entity, FindOptions};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidateOptions {
    /// Report only the first failed rule of each property.
    pub stop_at_first_error: bool,
    /// Ignore properties that are absent from the record.
    pub skip_missing_properties: bool,
    pub echo_target: bool,
    pub echo_value: bool,
}

impl ValidateOptions {
    pub const fn strict() -> Self {
        Self {
            stop_at_first_error: true,
            skip_missing_properties: false,
            echo_target: false,
            echo_value: false,
        }
    }

    /// Every failed rule, echoing the offending value and the whole record.
    pub const fn verbose() -> Self {
        Self {
            stop_at_first_error: false,
            skip_missing_properties: false,
            echo_target: true,
            echo_value: true,
        }
    }
}

/// One property that failed validation, with every failed rule keyed by its
/// code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub property: String,
    pub constraints: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<Value>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Validator {
    options: ValidateOptions,
}

impl Validator {
    pub fn new(options: ValidateOptions) -> Self {
        Self { options }
    }

    /// Violations in declared field order; empty when the record is valid.
    pub fn validate<T: Entity>(&self, record: &T) -> Vec<Violation> {
        let Err(errs) = record.validate() else {
            return Vec::new();
        };
        let fields = errs.field_errors();
        let serialized = serde_json::to_value(record).ok();

        let mut violations = Vec::new();
        for property in T::FIELDS {
            let wanted = normalize(property);
            let Some(failures) = fields
                .iter()
                .find(|(key, _)| normalize(key) == wanted)
                .map(|(_, failures)| *failures)
            else {
                continue;
            };

            let mut constraints = BTreeMap::new();
            for failure in failures.iter() {
                let code = failure.code.to_string();
                if self.options.skip_missing_properties && code == "required" {
                    continue;
                }
                let message = failure
                    .message
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| format!("{property} is invalid"));
                constraints.entry(code).or_insert(message);
                if self.options.stop_at_first_error {
                    break;
                }
            }
            if constraints.is_empty() {
                continue;
            }

            violations.push(self.violation(property, constraints, serialized.as_ref()));
        }
        violations
    }

    /// A unique property whose value another record already holds.
    pub fn taken<T: Entity>(&self, record: &T, property: &str) -> Violation {
        let constraints = BTreeMap::from([(
            "isUnique".to_owned(),
            format!("{property} is already in use"),
        )]);
        let serialized = serde_json::to_value(record).ok();
        self.violation(property, constraints, serialized.as_ref())
    }

    fn violation(
        &self,
        property: &str,
        constraints: BTreeMap<String, String>,
        serialized: Option<&Value>,
    ) -> Violation {
        Violation {
            property: property.to_owned(),
            constraints,
            value: self
                .options
                .echo_value
                .then(|| serialized.and_then(|v| v.get(property)).cloned())
                .flatten(),
            target: self
                .options
                .echo_target
                .then(|| serialized.cloned())
                .flatten(),
        }
    }
}

/// Rust field names and JSON property names differ only in case and
/// underscores (`poke_type1` / `pokeType1`).
fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Query string accepted by every collection read.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ListParams {
    pub sortby: Option<String>,
    pub reverse: Option<String>,
    pub searchwherelike: Option<String>,
}

impl ListParams {
    pub fn options<T: Entity>(&self) -> FindOptions {
        FindOptions::new::<T>(
            self.sortby.as_deref(),
            truthy(self.reverse.as_deref()),
            self.searchwherelike.as_deref(),
        )
    }
}

fn truthy(flag: Option<&str>) -> bool {
    !matches!(flag, None | Some("" | "false" | "0"))
}
