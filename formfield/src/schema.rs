//! Request payloads accepted for field creation and updates.
//!
//! Payloads deserialize from camelCase JSON. `validate` collects every problem as a
//! [`ValidationIssue`] keyed by the offending request key, and the `into_*` methods
//! turn a valid payload into the typed values the assembly service consumes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    errors::{ValidationError, ValidationIssue, ValidationResult},
    types::{AutocompleteSettings, FieldType, FieldUpdate, NewField, RangeBounds, RangeChange},
    validators::{
        checkbox_range_issues, choice_option_change_issues, is_valid_url, repeated_values, selective_range_issues,
        text_range_issues,
    },
};

const SCHEMA: &str = "schema";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeRequest {
    #[serde(default)]
    pub min: Option<i64>,
    #[serde(default)]
    pub max: Option<i64>,
}

impl RangeRequest {
    pub fn bounds(&self) -> RangeBounds {
        RangeBounds::new(self.min, self.max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingAutocompleteRequest {
    pub data_url: String,
    pub sheet: String,
    pub from_row: String,
    pub to_row: String,
}

impl SettingAutocompleteRequest {
    fn issues(&self, key: &str) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        if !is_valid_url(&self.data_url) {
            issues.push(ValidationIssue::new(key, "validation.url", "dataUrl: Not a valid URL."));
        }
        for (name, value) in [("sheet", &self.sheet), ("fromRow", &self.from_row), ("toRow", &self.to_row)] {
            if value.trim().is_empty() {
                issues.push(ValidationIssue::new(key, "required", format!("{name}: Field may not be empty.")));
            }
        }
        issues
    }

    pub fn into_settings(self) -> AutocompleteSettings {
        AutocompleteSettings {
            data_url: self.data_url,
            sheet: self.sheet,
            from_row: self.from_row,
            to_row: self.to_row,
        }
    }
}

/// Body of a field creation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FieldPostRequest {
    pub name: String,
    #[serde(default)]
    pub owner_id: Option<i64>,
    pub field_type: i64,
    #[serde(default)]
    pub is_strict: Option<bool>,
    #[serde(default)]
    pub range: Option<RangeRequest>,
    #[serde(default)]
    pub setting_autocomplete: Option<SettingAutocompleteRequest>,
    #[serde(default)]
    pub choice_options: Option<Vec<String>>,
}

impl FieldPostRequest {
    pub fn validate(&self) -> ValidationResult<FieldType> {
        let mut issues = Vec::new();
        if self.name.trim().is_empty() {
            issues.push(ValidationIssue::new("name", "required", "Field may not be empty."));
        }
        let field_type = match FieldType::from_code(self.field_type) {
            Ok(field_type) => field_type,
            Err(err) => {
                issues.push(ValidationIssue::new("fieldType", SCHEMA, err.to_string()));
                return Err(ValidationError::new(issues));
            }
        };

        if field_type.has_choice_options() {
            match &self.choice_options {
                None => issues.push(ValidationIssue::new(
                    "choiceOptions",
                    "required",
                    "Missing data for required field.",
                )),
                Some(options) => {
                    if options.is_empty() {
                        issues.push(ValidationIssue::new("choiceOptions", SCHEMA, "choiceOptions is empty"));
                    }
                    if !repeated_values(options).is_empty() {
                        issues.push(ValidationIssue::new("choiceOptions", SCHEMA, "Repeated values"));
                    }
                }
            }
        } else if self.choice_options.is_some() {
            issues.push(not_allowed("choiceOptions", field_type));
        }

        if let Some(range) = &self.range {
            let bounds = range.bounds();
            let messages = match field_type {
                FieldType::Text => text_range_issues(&bounds),
                FieldType::Number => ordered_only(&bounds),
                FieldType::Checkbox => {
                    let mut messages = checkbox_range_issues(&bounds);
                    let option_count = self.choice_options.as_ref().map_or(0, Vec::len);
                    messages.extend(selective_range_issues(&bounds, option_count));
                    messages
                }
                other => {
                    issues.push(not_allowed("range", other));
                    Vec::new()
                }
            };
            issues.extend(messages.into_iter().map(|message| ValidationIssue::new("range", SCHEMA, message)));
        }

        match (&self.setting_autocomplete, field_type) {
            (Some(settings), FieldType::Autocomplete) => issues.extend(settings.issues("settingAutocomplete")),
            (None, FieldType::Autocomplete) => issues.push(ValidationIssue::new(
                "settingAutocomplete",
                "required",
                "Missing data for required field.",
            )),
            (Some(_), other) => issues.push(not_allowed("settingAutocomplete", other)),
            (None, _) => {}
        }

        ValidationError::check(issues)?;
        Ok(field_type)
    }

    /// Validates and converts into the variant-typed creation command.
    pub fn into_new_field(self) -> ValidationResult<NewField> {
        let field_type = self.validate()?;
        let owner_id = self
            .owner_id
            .ok_or_else(|| ValidationError::single("ownerId", "required", "Missing data for required field."))?;
        let range = self.range.as_ref().and_then(|range| RangeBounds::from_parts(range.min, range.max));
        let name = self.name;

        let command = match field_type {
            FieldType::Text | FieldType::Number => NewField::TextOrNumber {
                name,
                owner_id,
                field_type,
                is_strict: self.is_strict.unwrap_or(false),
                range,
            },
            FieldType::TextArea => NewField::TextArea { name, owner_id },
            FieldType::Radio => NewField::Radio {
                name,
                owner_id,
                choice_options: self.choice_options.unwrap_or_default(),
                is_strict: self.is_strict,
            },
            FieldType::Checkbox => NewField::Checkbox {
                name,
                owner_id,
                choice_options: self.choice_options.unwrap_or_default(),
                is_strict: self.is_strict,
                range,
            },
            FieldType::Autocomplete => {
                let settings = self.setting_autocomplete.ok_or_else(|| {
                    ValidationError::single("settingAutocomplete", "required", "Missing data for required field.")
                })?;
                NewField::Autocomplete {
                    name,
                    owner_id,
                    settings: settings.into_settings(),
                }
            }
        };
        Ok(command)
    }
}

/// Body of a field update request. Which keys are legal depends on the stored field type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FieldPutRequest {
    #[serde(default)]
    pub updated_name: Option<String>,
    #[serde(default)]
    pub is_strict: Option<bool>,
    #[serde(default)]
    pub range: Option<RangeRequest>,
    #[serde(default)]
    pub added_choice_options: Option<Vec<String>>,
    #[serde(default)]
    pub removed_choice_options: Option<Vec<String>>,
    #[serde(default)]
    pub updated_autocomplete: Option<SettingAutocompleteRequest>,
    #[serde(default)]
    pub delete_range: Option<bool>,
}

impl FieldPutRequest {
    pub fn validate(&self, field_type: FieldType) -> ValidationResult<()> {
        let mut issues = Vec::new();

        if self.updated_name.as_ref().is_some_and(|name| name.trim().is_empty()) {
            issues.push(ValidationIssue::new("updatedName", "required", "Field may not be empty."));
        }

        let allowed: &[&str] = match field_type {
            FieldType::Text | FieldType::Number => &["isStrict", "range", "deleteRange"],
            FieldType::TextArea => &[],
            FieldType::Radio => &["addedChoiceOptions", "removedChoiceOptions"],
            FieldType::Checkbox => &["range", "addedChoiceOptions", "removedChoiceOptions", "deleteRange"],
            FieldType::Autocomplete => &["updatedAutocomplete"],
        };
        for key in self.present_variant_keys() {
            if !allowed.contains(&key) {
                issues.push(not_allowed(key, field_type));
            }
        }

        if self.range.is_some() && self.delete_range == Some(true) {
            issues.push(ValidationIssue::new("range", SCHEMA, "Can't update and delete range"));
        }

        if let Some(range) = &self.range {
            let bounds = range.bounds();
            let messages = match field_type {
                FieldType::Text => text_range_issues(&bounds),
                FieldType::Checkbox => checkbox_range_issues(&bounds),
                _ => ordered_only(&bounds),
            };
            issues.extend(messages.into_iter().map(|message| ValidationIssue::new("range", SCHEMA, message)));
        }

        let added = self.added_choice_options.as_deref().unwrap_or_default();
        let removed = self.removed_choice_options.as_deref().unwrap_or_default();
        issues.extend(
            choice_option_change_issues(added, removed)
                .into_iter()
                .map(|message| ValidationIssue::new("choiceOptions", SCHEMA, message)),
        );

        if let Some(settings) = &self.updated_autocomplete {
            issues.extend(settings.issues("updatedAutocomplete"));
        }

        ValidationError::check(issues)
    }

    /// Validates against the stored field type and converts into a [`FieldUpdate`].
    pub fn into_update(self, field_type: FieldType) -> ValidationResult<FieldUpdate> {
        self.validate(field_type)?;
        let range = match (self.range, self.delete_range) {
            (Some(range), _) => RangeChange::Replace(range.bounds()),
            (None, Some(true)) => RangeChange::Delete,
            _ => RangeChange::Keep,
        };
        Ok(FieldUpdate {
            name: self.updated_name,
            is_strict: self.is_strict,
            range,
            added_choice_options: self.added_choice_options.unwrap_or_default(),
            removed_choice_options: self.removed_choice_options.unwrap_or_default(),
            setting_autocomplete: self.updated_autocomplete.map(SettingAutocompleteRequest::into_settings),
        })
    }

    fn present_variant_keys(&self) -> Vec<&'static str> {
        let mut keys = Vec::new();
        if self.is_strict.is_some() {
            keys.push("isStrict");
        }
        if self.range.is_some() {
            keys.push("range");
        }
        if self.added_choice_options.is_some() {
            keys.push("addedChoiceOptions");
        }
        if self.removed_choice_options.is_some() {
            keys.push("removedChoiceOptions");
        }
        if self.updated_autocomplete.is_some() {
            keys.push("updatedAutocomplete");
        }
        if self.delete_range.is_some() {
            keys.push("deleteRange");
        }
        keys
    }
}

/// Extracts `(min, max)` from a payload carrying an optional nested `range` object.
pub fn check_for_range(data: &Value) -> (Option<i64>, Option<i64>) {
    match data.get("range") {
        Some(range) => (
            range.get("min").and_then(Value::as_i64),
            range.get("max").and_then(Value::as_i64),
        ),
        None => (None, None),
    }
}

pub(crate) fn ordered_only(bounds: &RangeBounds) -> Vec<String> {
    if bounds.is_ordered() {
        Vec::new()
    } else {
        vec!["Min value must be less than or equal to max value".to_string()]
    }
}

pub(crate) fn not_allowed(key: &str, field_type: FieldType) -> ValidationIssue {
    ValidationIssue::new(
        key,
        "unknown",
        format!("Not allowed for {} fields.", field_type.label()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn post(value: Value) -> FieldPostRequest {
        serde_json::from_value(value).expect("request deserializes")
    }

    #[test]
    fn check_for_range_extracts_bounds() {
        assert_eq!(check_for_range(&json!({})), (None, None));
        assert_eq!(check_for_range(&json!({"range": {"min": 2, "max": 4}})), (Some(2), Some(4)));
        assert_eq!(check_for_range(&json!({"range": {"max": 9}})), (None, Some(9)));
    }

    #[test]
    fn rejects_out_of_range_field_type() {
        let err = post(json!({"name": "age", "ownerId": 1, "fieldType": 7})).validate().unwrap_err();
        assert_eq!(
            err.messages_for("fieldType"),
            vec!["Must be greater than or equal to 1 and less than or equal to 6."]
        );
    }

    #[test]
    fn radio_requires_distinct_options() {
        let empty = post(json!({"name": "c", "ownerId": 1, "fieldType": 4, "choiceOptions": []}));
        assert_eq!(empty.validate().unwrap_err().messages_for("choiceOptions"), vec!["choiceOptions is empty"]);

        let repeated = post(json!({"name": "c", "ownerId": 1, "fieldType": 4, "choiceOptions": ["a", "a"]}));
        assert_eq!(repeated.validate().unwrap_err().messages_for("choiceOptions"), vec!["Repeated values"]);
    }

    #[test]
    fn checkbox_range_cannot_exceed_option_count() {
        let request = post(json!({
            "name": "pick",
            "ownerId": 1,
            "fieldType": 6,
            "choiceOptions": ["a", "b"],
            "range": {"min": 3, "max": -1}
        }));
        let err = request.validate().unwrap_err();
        let messages = err.messages_for("range");
        assert!(messages.contains(&"Max selective options must be positive"));
        assert!(messages.contains(&"Min selective options must be less than list of options"));
    }

    #[test]
    fn autocomplete_requires_settings_with_url() {
        let missing = post(json!({"name": "town", "ownerId": 1, "fieldType": 5}));
        assert_eq!(
            missing.validate().unwrap_err().messages_for("settingAutocomplete"),
            vec!["Missing data for required field."]
        );

        let bad_url = post(json!({
            "name": "town",
            "ownerId": 1,
            "fieldType": 5,
            "settingAutocomplete": {"dataUrl": "nope", "sheet": "s", "fromRow": "A1", "toRow": "A3"}
        }));
        assert_eq!(
            bad_url.validate().unwrap_err().messages_for("settingAutocomplete"),
            vec!["dataUrl: Not a valid URL."]
        );
    }

    #[test]
    fn strictness_is_ignored_where_the_type_has_none() {
        let command = post(json!({"name": "bio", "ownerId": 3, "fieldType": 3, "isStrict": true}))
            .into_new_field()
            .unwrap();
        assert_eq!(
            command,
            NewField::TextArea {
                name: "bio".into(),
                owner_id: 3,
            }
        );
    }

    #[test]
    fn converts_checkbox_request_into_command() {
        let command = post(json!({
            "name": "age",
            "ownerId": 19,
            "fieldType": 6,
            "isStrict": true,
            "choiceOptions": ["10", "11", "12"],
            "range": {"min": 1, "max": 2}
        }))
        .into_new_field()
        .expect("valid request");
        assert_eq!(
            command,
            NewField::Checkbox {
                name: "age".into(),
                owner_id: 19,
                choice_options: vec!["10".into(), "11".into(), "12".into()],
                is_strict: Some(true),
                range: Some(RangeBounds::new(Some(1), Some(2))),
            }
        );
    }

    #[test]
    fn empty_range_object_means_no_range() {
        let command = post(json!({"name": "n", "ownerId": 2, "fieldType": 2, "range": {}}))
            .into_new_field()
            .expect("valid request");
        assert!(matches!(command, NewField::TextOrNumber { range: None, .. }));
    }

    #[test]
    fn owner_is_required_for_commands() {
        let err = post(json!({"name": "n", "fieldType": 3})).into_new_field().unwrap_err();
        assert_eq!(err.messages_for("ownerId"), vec!["Missing data for required field."]);
    }

    #[test]
    fn put_cannot_update_and_delete_range() {
        let request: FieldPutRequest =
            serde_json::from_value(json!({"range": {"min": 1}, "deleteRange": true})).unwrap();
        let err = request.validate(FieldType::Number).unwrap_err();
        assert_eq!(err.messages_for("range"), vec!["Can't update and delete range"]);
    }

    #[test]
    fn put_keys_depend_on_field_type() {
        let request: FieldPutRequest = serde_json::from_value(json!({"addedChoiceOptions": ["x"]})).unwrap();
        assert!(request.validate(FieldType::Radio).is_ok());
        let err = request.validate(FieldType::Text).unwrap_err();
        assert_eq!(err.messages_for("addedChoiceOptions"), vec!["Not allowed for text fields."]);
    }

    #[test]
    fn put_converts_delete_range() {
        let request: FieldPutRequest =
            serde_json::from_value(json!({"updatedName": "renamed", "deleteRange": true})).unwrap();
        let update = request.into_update(FieldType::Checkbox).expect("valid update");
        assert_eq!(update.name.as_deref(), Some("renamed"));
        assert_eq!(update.range, RangeChange::Delete);
    }
}
