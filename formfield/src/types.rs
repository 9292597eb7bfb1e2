use chrono::{DateTime, Utc};
use serde::{
    Deserialize, Serialize, Serializer,
    ser::SerializeMap,
};
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// FieldType - the closed discriminator stored on every field row
// ═══════════════════════════════════════════════════════════════════════════════

/// Kind of input a field renders as. The discriminant is the wire and storage code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum FieldType {
    Text = 1,
    Number = 2,
    TextArea = 3,
    Radio = 4,
    Autocomplete = 5,
    Checkbox = 6,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Must be greater than or equal to 1 and less than or equal to 6.")]
pub struct InvalidFieldType(pub i64);

impl FieldType {
    pub const MIN_CODE: i64 = 1;
    pub const MAX_CODE: i64 = 6;

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: i64) -> Result<Self, InvalidFieldType> {
        match code {
            1 => Ok(FieldType::Text),
            2 => Ok(FieldType::Number),
            3 => Ok(FieldType::TextArea),
            4 => Ok(FieldType::Radio),
            5 => Ok(FieldType::Autocomplete),
            6 => Ok(FieldType::Checkbox),
            other => Err(InvalidFieldType(other)),
        }
    }

    /// Radio and Checkbox carry a list of choice options.
    pub fn has_choice_options(self) -> bool {
        matches!(self, FieldType::Radio | FieldType::Checkbox)
    }

    /// Types that may own a range row.
    pub fn accepts_range(self) -> bool {
        matches!(self, FieldType::Text | FieldType::Number | FieldType::Checkbox)
    }

    /// Types whose strictness flag is meaningful to callers.
    pub fn uses_strictness(self) -> bool {
        matches!(
            self,
            FieldType::Text | FieldType::Number | FieldType::Radio | FieldType::Checkbox
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Number => "number",
            FieldType::TextArea => "textarea",
            FieldType::Radio => "radio",
            FieldType::Autocomplete => "autocomplete",
            FieldType::Checkbox => "checkbox",
        }
    }
}

impl From<FieldType> for u8 {
    fn from(value: FieldType) -> Self {
        value.code()
    }
}

impl TryFrom<u8> for FieldType {
    type Error = InvalidFieldType;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        FieldType::from_code(i64::from(value))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Stored rows
// ═══════════════════════════════════════════════════════════════════════════════

/// Canonical field row. `field_type` never changes after insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRecord {
    pub id: String,
    pub owner_id: i64,
    pub name: String,
    pub field_type: FieldType,
    #[serde(default)]
    pub is_strict: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeRecord {
    pub id: String,
    pub min: Option<i64>,
    pub max: Option<i64>,
}

impl RangeRecord {
    pub fn bounds(&self) -> RangeBounds {
        RangeBounds::new(self.min, self.max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRangeRecord {
    pub field_id: String,
    pub range_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceOptionRecord {
    pub id: String,
    pub field_id: String,
    pub option_text: String,
    /// Insertion sequence inside the field; reads return rows ordered by it.
    pub position: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingAutocompleteRecord {
    pub id: String,
    pub field_id: String,
    pub data_url: String,
    pub sheet: String,
    pub from_row: String,
    pub to_row: String,
}

impl SettingAutocompleteRecord {
    pub fn settings(&self) -> AutocompleteSettings {
        AutocompleteSettings {
            data_url: self.data_url.clone(),
            sheet: self.sheet.clone(),
            from_row: self.from_row.clone(),
            to_row: self.to_row.clone(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Values shared by requests and representations
// ═══════════════════════════════════════════════════════════════════════════════

/// Optional numeric bounds. Either side may be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeBounds {
    #[serde(default)]
    pub min: Option<i64>,
    #[serde(default)]
    pub max: Option<i64>,
}

impl RangeBounds {
    pub fn new(min: Option<i64>, max: Option<i64>) -> Self {
        Self { min, max }
    }

    /// Returns bounds only when at least one side was supplied.
    pub fn from_parts(min: Option<i64>, max: Option<i64>) -> Option<Self> {
        if min.is_none() && max.is_none() { None } else { Some(Self { min, max }) }
    }

    /// `min <= max` whenever both are present.
    pub fn is_ordered(&self) -> bool {
        match (self.min, self.max) {
            (Some(min), Some(max)) => min <= max,
            _ => true,
        }
    }
}

/// Location of the spreadsheet cells an autocomplete field draws values from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutocompleteSettings {
    pub data_url: String,
    pub sheet: String,
    pub from_row: String,
    pub to_row: String,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Service boundary: what a caller asks for
// ═══════════════════════════════════════════════════════════════════════════════

/// A field to create, one case per variant, each carrying only its own satellite data.
#[derive(Debug, Clone, PartialEq)]
pub enum NewField {
    TextOrNumber {
        name: String,
        owner_id: i64,
        field_type: FieldType,
        is_strict: bool,
        range: Option<RangeBounds>,
    },
    TextArea {
        name: String,
        owner_id: i64,
    },
    Radio {
        name: String,
        owner_id: i64,
        choice_options: Vec<String>,
        is_strict: Option<bool>,
    },
    Checkbox {
        name: String,
        owner_id: i64,
        choice_options: Vec<String>,
        is_strict: Option<bool>,
        range: Option<RangeBounds>,
    },
    Autocomplete {
        name: String,
        owner_id: i64,
        settings: AutocompleteSettings,
    },
}

/// What an update does to a field's range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RangeChange {
    #[default]
    Keep,
    Replace(RangeBounds),
    Delete,
}

/// Changes applied to an existing field. Empty collections mean "no change".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldUpdate {
    pub name: Option<String>,
    pub is_strict: Option<bool>,
    pub range: RangeChange,
    pub added_choice_options: Vec<String>,
    pub removed_choice_options: Vec<String>,
    pub setting_autocomplete: Option<AutocompleteSettings>,
}

impl FieldUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.is_strict.is_none()
            && self.range == RangeChange::Keep
            && self.added_choice_options.is_empty()
            && self.removed_choice_options.is_empty()
            && self.setting_autocomplete.is_none()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Representations returned to callers
// ═══════════════════════════════════════════════════════════════════════════════

/// Variant-specific data reconstructed from the satellite rows of one field.
///
/// Serializes as a flat camelCase object; `Empty` becomes `{}`.
#[derive(Debug, Clone, PartialEq)]
pub enum AdditionalOptions {
    Empty,
    TextOrNumber {
        is_strict: bool,
        range: RangeBounds,
    },
    Choice {
        choice_options: Vec<String>,
        range: Option<RangeBounds>,
    },
    /// `values` is filled on reads and left out of create results.
    Autocomplete {
        setting_autocomplete: AutocompleteSettings,
        values: Option<Vec<String>>,
    },
}

impl AdditionalOptions {
    pub fn range(&self) -> Option<RangeBounds> {
        match self {
            AdditionalOptions::TextOrNumber { range, .. } => Some(*range),
            AdditionalOptions::Choice { range, .. } => *range,
            _ => None,
        }
    }

    pub fn choice_options(&self) -> Option<&[String]> {
        match self {
            AdditionalOptions::Choice { choice_options, .. } => Some(choice_options),
            _ => None,
        }
    }

    fn serialize_entries<M: SerializeMap>(&self, map: &mut M, include_strict: bool) -> Result<(), M::Error> {
        match self {
            AdditionalOptions::Empty => {}
            AdditionalOptions::TextOrNumber { is_strict, range } => {
                if include_strict {
                    map.serialize_entry("isStrict", is_strict)?;
                }
                map.serialize_entry("range", range)?;
            }
            AdditionalOptions::Choice { choice_options, range } => {
                map.serialize_entry("choiceOptions", choice_options)?;
                if let Some(range) = range {
                    map.serialize_entry("range", range)?;
                }
            }
            AdditionalOptions::Autocomplete {
                setting_autocomplete,
                values,
            } => {
                map.serialize_entry("settingAutocomplete", setting_autocomplete)?;
                if let Some(values) = values {
                    map.serialize_entry("values", values)?;
                }
            }
        }
        Ok(())
    }
}

impl Serialize for AdditionalOptions {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        self.serialize_entries(&mut map, true)?;
        map.end()
    }
}

/// A field flattened together with its satellites.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldView {
    pub id: String,
    pub name: String,
    pub owner_id: i64,
    pub field_type: FieldType,
    pub is_strict: Option<bool>,
    pub created: DateTime<Utc>,
    pub options: AdditionalOptions,
}

impl FieldView {
    pub fn from_record(record: &FieldRecord, is_strict: Option<bool>, options: AdditionalOptions) -> Self {
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            owner_id: record.owner_id,
            field_type: record.field_type,
            is_strict,
            created: record.created_at,
            options,
        }
    }
}

impl Serialize for FieldView {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("id", &self.id)?;
        map.serialize_entry("name", &self.name)?;
        map.serialize_entry("ownerId", &self.owner_id)?;
        map.serialize_entry("fieldType", &self.field_type)?;
        if let Some(is_strict) = self.is_strict {
            map.serialize_entry("isStrict", &is_strict)?;
        }
        map.serialize_entry("created", &self.created)?;
        self.options.serialize_entries(&mut map, self.is_strict.is_none())?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_type_codes_round_trip() {
        for code in FieldType::MIN_CODE..=FieldType::MAX_CODE {
            let field_type = FieldType::from_code(code).expect("valid code");
            assert_eq!(i64::from(field_type.code()), code);
        }
        assert_eq!(FieldType::from_code(0), Err(InvalidFieldType(0)));
        assert_eq!(FieldType::from_code(7), Err(InvalidFieldType(7)));
        assert_eq!(FieldType::from_code(5), Ok(FieldType::Autocomplete));
        assert_eq!(FieldType::from_code(6), Ok(FieldType::Checkbox));
    }

    #[test]
    fn field_type_serializes_as_code() {
        assert_eq!(serde_json::to_value(FieldType::Radio).unwrap(), json!(4));
        let parsed: FieldType = serde_json::from_value(json!(3)).unwrap();
        assert_eq!(parsed, FieldType::TextArea);
        assert!(serde_json::from_value::<FieldType>(json!(9)).is_err());
    }

    #[test]
    fn empty_options_serialize_to_empty_object() {
        assert_eq!(serde_json::to_value(AdditionalOptions::Empty).unwrap(), json!({}));
    }

    #[test]
    fn choice_options_omit_missing_range() {
        let options = AdditionalOptions::Choice {
            choice_options: vec!["Yes".into(), "No".into()],
            range: None,
        };
        assert_eq!(serde_json::to_value(&options).unwrap(), json!({"choiceOptions": ["Yes", "No"]}));
    }

    #[test]
    fn partial_range_keeps_null_bound() {
        let options = AdditionalOptions::TextOrNumber {
            is_strict: true,
            range: RangeBounds::new(Some(1), None),
        };
        assert_eq!(
            serde_json::to_value(&options).unwrap(),
            json!({"isStrict": true, "range": {"min": 1, "max": null}})
        );
    }

    #[test]
    fn view_does_not_repeat_strictness() {
        let created = DateTime::parse_from_rfc3339("2024-03-01T10:00:00Z").unwrap().with_timezone(&Utc);
        let view = FieldView {
            id: "fld_1".into(),
            name: "age".into(),
            owner_id: 3,
            field_type: FieldType::Number,
            is_strict: Some(false),
            created,
            options: AdditionalOptions::TextOrNumber {
                is_strict: false,
                range: RangeBounds::new(Some(2), Some(5)),
            },
        };
        assert_eq!(
            serde_json::to_value(&view).unwrap(),
            json!({
                "id": "fld_1",
                "name": "age",
                "ownerId": 3,
                "fieldType": 2,
                "isStrict": false,
                "created": "2024-03-01T10:00:00Z",
                "range": {"min": 2, "max": 5}
            })
        );
    }

    #[test]
    fn range_order_only_checked_when_complete() {
        assert!(RangeBounds::new(Some(1), None).is_ordered());
        assert!(RangeBounds::new(Some(2), Some(2)).is_ordered());
        assert!(!RangeBounds::new(Some(3), Some(2)).is_ordered());
        assert_eq!(RangeBounds::from_parts(None, None), None);
    }
}
