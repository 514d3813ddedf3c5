//! Address payload validation.
//!
//! # Responsibility
//! - Check raw inputs before they reach the service layer.
//! - Report every failing field, keyed by its wire name.
//!
//! # Invariants
//! - Latitude and longitude are range-checked independently; supplying only
//!   one of them is valid.
//! - Bulk keys are prefixed `{list_key}.{index}.`; the list key defaults to
//!   `addresses` and can be chosen by the caller.
//! - A bulk item's `id`, when present, must name a stored address.

use crate::config::AddressConfig;
use crate::model::address::AddressId;
use crate::model::payload::AddressInput;
use std::error::Error;
use std::fmt::{Display, Formatter};

const TYPE_MAX_CHARS: usize = 50;
const TEXT_MAX_CHARS: usize = 255;
const POSTAL_CODE_MAX_CHARS: usize = 20;
const COUNTRY_CODE_MIN_CHARS: usize = 2;
const COUNTRY_CODE_MAX_CHARS: usize = 3;

/// Default list key for bulk submissions.
pub const DEFAULT_LIST_KEY: &str = "addresses";

/// Reason a single field was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldRule {
    Required,
    MaxChars(usize),
    CharsBetween { min: usize, max: usize },
    NotAllowedType(String),
    OutOfRange { min: f64, max: f64, value: f64 },
    NotAnObject,
    UnknownAddress(AddressId),
}

impl Display for FieldRule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Required => write!(f, "is required"),
            Self::MaxChars(max) => write!(f, "must not exceed {max} characters"),
            Self::CharsBetween { min, max } => {
                write!(f, "must be between {min} and {max} characters")
            }
            Self::NotAllowedType(value) => write!(f, "`{value}` is not an allowed address type"),
            Self::OutOfRange { min, max, value } => {
                write!(f, "must be between {min} and {max}, got {value}")
            }
            Self::NotAnObject => write!(f, "must be an object"),
            Self::UnknownAddress(id) => write!(f, "references unknown address {id}"),
        }
    }
}

/// One rejected field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    /// Wire key, e.g. `city` or `addresses.2.city`.
    pub field: String,
    pub rule: FieldRule,
}

impl Display for FieldError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.field, self.rule)
    }
}

/// All field failures for one validation pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns every rule that failed for `field`.
    pub fn for_field<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a FieldRule> + 'a {
        self.errors
            .iter()
            .filter(move |error| error.field == field)
            .map(|error| &error.rule)
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.for_field(field).next().is_some()
    }

    /// Appends every failure from `other`.
    pub fn merge(&mut self, other: ValidationErrors) {
        self.errors.extend(other.errors);
    }

    /// `Ok(())` when nothing failed.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    fn push(&mut self, field: String, rule: FieldRule) {
        self.errors.push(FieldError { field, rule });
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let joined = self
            .errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        write!(f, "address validation failed: {joined}")
    }
}

impl Error for ValidationErrors {}

/// Validates one standalone address input.
pub fn validate_input(input: &AddressInput, config: &AddressConfig) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    collect_errors(input, config, "", &mut errors);
    errors.into_result()
}

/// Validates the field rules of a bulk list submitted under `list_key`.
///
/// Id existence needs storage and is checked by [`check_batch_ids`].
pub fn validate_batch(
    inputs: &[AddressInput],
    config: &AddressConfig,
    list_key: &str,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    for (index, input) in inputs.iter().enumerate() {
        collect_errors(input, config, &item_prefix(list_key, index), &mut errors);
    }
    errors.into_result()
}

/// Reports `{list_key}.{index}.id` for every submitted id `exists` rejects.
///
/// Lookup failures abort the pass and are returned as-is.
pub fn check_batch_ids<E, F>(
    inputs: &[AddressInput],
    list_key: &str,
    mut exists: F,
) -> Result<ValidationErrors, E>
where
    F: FnMut(AddressId) -> Result<bool, E>,
{
    let mut errors = ValidationErrors::default();
    for (index, input) in inputs.iter().enumerate() {
        if let Some(id) = input.id {
            if !exists(id)? {
                errors.push(
                    format!("{}id", item_prefix(list_key, index)),
                    FieldRule::UnknownAddress(id),
                );
            }
        }
    }
    Ok(errors)
}

fn item_prefix(list_key: &str, index: usize) -> String {
    format!("{list_key}.{index}.")
}

fn collect_errors(
    input: &AddressInput,
    config: &AddressConfig,
    prefix: &str,
    errors: &mut ValidationErrors,
) {
    let key = |name: &str| format!("{prefix}{name}");

    if let Some(kind) = input.kind.as_deref() {
        if config.allow_custom_types {
            if char_len(kind) > TYPE_MAX_CHARS {
                errors.push(key("type"), FieldRule::MaxChars(TYPE_MAX_CHARS));
            }
        } else if !config.accepts_type(kind) {
            errors.push(key("type"), FieldRule::NotAllowedType(kind.to_string()));
        }
    }

    check_required_text(
        input.address_line_1.as_deref(),
        TEXT_MAX_CHARS,
        key("address_line_1"),
        errors,
    );
    check_optional_text(
        input.address_line_2.as_deref(),
        TEXT_MAX_CHARS,
        key("address_line_2"),
        errors,
    );
    check_required_text(input.city.as_deref(), TEXT_MAX_CHARS, key("city"), errors);
    check_optional_text(input.state.as_deref(), TEXT_MAX_CHARS, key("state"), errors);
    check_optional_text(
        input.postal_code.as_deref(),
        POSTAL_CODE_MAX_CHARS,
        key("postal_code"),
        errors,
    );

    match input.country_code.as_deref().filter(|value| !value.trim().is_empty()) {
        None => errors.push(key("country_code"), FieldRule::Required),
        Some(code) => {
            let len = char_len(code);
            if !(COUNTRY_CODE_MIN_CHARS..=COUNTRY_CODE_MAX_CHARS).contains(&len) {
                errors.push(
                    key("country_code"),
                    FieldRule::CharsBetween {
                        min: COUNTRY_CODE_MIN_CHARS,
                        max: COUNTRY_CODE_MAX_CHARS,
                    },
                );
            }
        }
    }

    check_range(input.latitude, 90.0, key("latitude"), errors);
    check_range(input.longitude, 180.0, key("longitude"), errors);

    if let Some(metadata) = &input.metadata {
        if !metadata.is_object() && !metadata.is_null() {
            errors.push(key("metadata"), FieldRule::NotAnObject);
        }
    }
}

fn check_required_text(
    value: Option<&str>,
    max: usize,
    field: String,
    errors: &mut ValidationErrors,
) {
    match value.filter(|value| !value.trim().is_empty()) {
        None => errors.push(field, FieldRule::Required),
        Some(value) if char_len(value) > max => errors.push(field, FieldRule::MaxChars(max)),
        Some(_) => {}
    }
}

fn check_optional_text(
    value: Option<&str>,
    max: usize,
    field: String,
    errors: &mut ValidationErrors,
) {
    if let Some(value) = value {
        if char_len(value) > max {
            errors.push(field, FieldRule::MaxChars(max));
        }
    }
}

fn check_range(value: Option<f64>, bound: f64, field: String, errors: &mut ValidationErrors) {
    if let Some(value) = value {
        if !value.is_finite() || value < -bound || value > bound {
            errors.push(
                field,
                FieldRule::OutOfRange {
                    min: -bound,
                    max: bound,
                    value,
                },
            );
        }
    }
}

fn char_len(value: &str) -> usize {
    value.chars().count()
}

#[cfg(test)]
mod tests {
    use super::{check_batch_ids, validate_batch, validate_input, FieldRule, DEFAULT_LIST_KEY};
    use crate::config::AddressConfig;
    use crate::model::payload::AddressInput;
    use serde_json::json;

    fn valid_input() -> AddressInput {
        AddressInput {
            address_line_1: Some("123 Main St".to_string()),
            city: Some("Springfield".to_string()),
            country_code: Some("US".to_string()),
            ..AddressInput::default()
        }
    }

    #[test]
    fn minimal_input_passes() {
        validate_input(&valid_input(), &AddressConfig::default()).unwrap();
    }

    #[test]
    fn missing_required_fields_are_all_reported() {
        let errors = validate_input(&AddressInput::default(), &AddressConfig::default())
            .unwrap_err();
        assert!(errors.has_field("address_line_1"));
        assert!(errors.has_field("city"));
        assert!(errors.has_field("country_code"));
        assert_eq!(errors.errors.len(), 3);
    }

    #[test]
    fn blank_required_text_counts_as_missing() {
        let mut input = valid_input();
        input.city = Some("   ".to_string());
        let errors = validate_input(&input, &AddressConfig::default()).unwrap_err();
        assert_eq!(errors.for_field("city").next(), Some(&FieldRule::Required));
    }

    #[test]
    fn country_code_length_is_bounded() {
        let mut input = valid_input();
        input.country_code = Some("USAX".to_string());
        assert!(validate_input(&input, &AddressConfig::default())
            .unwrap_err()
            .has_field("country_code"));

        input.country_code = Some("USA".to_string());
        validate_input(&input, &AddressConfig::default()).unwrap();
    }

    #[test]
    fn coordinates_are_range_checked_independently() {
        let mut input = valid_input();
        input.latitude = Some(45.0);
        validate_input(&input, &AddressConfig::default()).unwrap();

        input.latitude = Some(90.5);
        input.longitude = Some(-180.5);
        let errors = validate_input(&input, &AddressConfig::default()).unwrap_err();
        assert!(errors.has_field("latitude"));
        assert!(errors.has_field("longitude"));
    }

    #[test]
    fn type_allow_list_applies_only_when_custom_types_are_disabled() {
        let mut input = valid_input();
        input.kind = Some("warehouse".to_string());
        validate_input(&input, &AddressConfig::default()).unwrap();

        let strict = AddressConfig {
            allow_custom_types: false,
            ..AddressConfig::default()
        };
        let errors = validate_input(&input, &strict).unwrap_err();
        assert_eq!(
            errors.for_field("type").next(),
            Some(&FieldRule::NotAllowedType("warehouse".to_string()))
        );

        input.kind = Some("x".repeat(51));
        assert!(validate_input(&input, &AddressConfig::default())
            .unwrap_err()
            .has_field("type"));
    }

    #[test]
    fn metadata_must_be_an_object() {
        let mut input = valid_input();
        input.metadata = Some(json!({ "gate": "B" }));
        validate_input(&input, &AddressConfig::default()).unwrap();

        input.metadata = Some(json!("gate B"));
        assert!(validate_input(&input, &AddressConfig::default())
            .unwrap_err()
            .has_field("metadata"));
    }

    #[test]
    fn batch_errors_are_prefixed_with_index() {
        let mut broken = valid_input();
        broken.postal_code = Some("1".repeat(21));
        let errors =
            validate_batch(&[valid_input(), broken], &AddressConfig::default(), DEFAULT_LIST_KEY)
                .unwrap_err();
        assert!(errors.has_field("addresses.1.postal_code"));
        assert!(!errors.has_field("addresses.0.postal_code"));
        assert!(errors.to_string().contains("addresses.1.postal_code"));
    }

    #[test]
    fn batch_errors_use_caller_list_key() {
        let errors = validate_batch(
            &[AddressInput::default()],
            &AddressConfig::default(),
            "billing_addresses",
        )
        .unwrap_err();
        assert!(errors.has_field("billing_addresses.0.city"));
        assert!(errors.has_field("billing_addresses.0.country_code"));
        assert!(!errors.has_field("addresses.0.city"));
    }

    #[test]
    fn batch_ids_must_exist() {
        let mut known = valid_input();
        known.id = Some(7);
        let mut unknown = valid_input();
        unknown.id = Some(8);

        let errors = check_batch_ids(&[valid_input(), known, unknown], DEFAULT_LIST_KEY, |id| {
            Ok::<_, ()>(id == 7)
        })
        .unwrap();

        assert_eq!(errors.errors.len(), 1);
        assert_eq!(
            errors.for_field("addresses.2.id").next(),
            Some(&FieldRule::UnknownAddress(8))
        );
    }

    #[test]
    fn batch_id_lookup_failure_is_returned() {
        let mut input = valid_input();
        input.id = Some(1);
        let result = check_batch_ids(&[input], DEFAULT_LIST_KEY, |_| Err("storage down"));
        assert_eq!(result.unwrap_err(), "storage down");
    }
}
