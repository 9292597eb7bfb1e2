//! Field assembly service.
//!
//! Writes one logical field as a single [`MutationPlan`] (the field row plus the satellite
//! rows its type needs) and reads it back by fanning out to the satellites again.
//!
//! Public operations never surface a store rejection: a create that the store refuses, or a
//! request missing required options, yields `Ok(None)`. `Err` is reserved for transport and
//! serialization failures of the store itself.
//!
//! # Example
//! ```ignore
//! let mut service = FieldService::new(MemoryStore::new(), StaticSheets::new());
//! let color = service
//!     .create_radio_field("color", 1, Some(vec!["r".into(), "g".into()]), None)
//!     .await?;
//! ```

mod read;
mod update;

use chrono::Utc;
use log::{info, warn};

use crate::{
    errors::RepoError,
    id::{RecordKind, generate_record_id},
    keys::name_key,
    repository::FieldStore,
    runtime::commands::{
        ChoiceOptionDraft, ChoiceOptionsAdd, FieldInsert, MutationCommand, MutationPlan, RangePut,
        SettingAutocompletePut,
    },
    sheets::SheetLookup,
    types::{
        AdditionalOptions, AutocompleteSettings, FieldRecord, FieldType, FieldView, NewField, RangeBounds,
        RangeRecord, SettingAutocompleteRecord,
    },
    validators::{checkbox_range_issues, repeated_values, selective_range_issues},
};

/// Assembles fields from, and decomposes them into, the store's normalized rows.
pub struct FieldService<S, L> {
    store: S,
    sheets: L,
}

impl<S, L> FieldService<S, L>
where
    S: FieldStore,
    L: SheetLookup,
{
    pub fn new(store: S, sheets: L) -> Self {
        Self { store, sheets }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_parts(self) -> (S, L) {
        (self.store, self.sheets)
    }

    /// Creates whichever variant `field` describes.
    pub async fn create(&mut self, field: NewField) -> Result<Option<FieldView>, RepoError> {
        match field {
            NewField::TextOrNumber {
                name,
                owner_id,
                field_type,
                is_strict,
                range,
            } => {
                let (range_min, range_max) = split_bounds(range);
                self.create_text_or_number_field(&name, owner_id, field_type, is_strict, range_min, range_max)
                    .await
            }
            NewField::TextArea { name, owner_id } => self.create_text_area(&name, owner_id).await,
            NewField::Radio {
                name,
                owner_id,
                choice_options,
                is_strict,
            } => self.create_radio_field(&name, owner_id, Some(choice_options), is_strict).await,
            NewField::Checkbox {
                name,
                owner_id,
                choice_options,
                is_strict,
                range,
            } => {
                let (range_min, range_max) = split_bounds(range);
                self.create_checkbox_field(&name, owner_id, Some(choice_options), is_strict, range_min, range_max)
                    .await
            }
            NewField::Autocomplete {
                name,
                owner_id,
                settings,
            } => {
                self.create_autocomplete_field(
                    &name,
                    owner_id,
                    &settings.data_url,
                    &settings.sheet,
                    &settings.from_row,
                    &settings.to_row,
                )
                .await
            }
        }
    }

    /// Creates a Text or Number field, with a range when either bound is given.
    pub async fn create_text_or_number_field(
        &mut self,
        name: &str,
        owner_id: i64,
        field_type: FieldType,
        is_strict: bool,
        range_min: Option<i64>,
        range_max: Option<i64>,
    ) -> Result<Option<FieldView>, RepoError> {
        if !matches!(field_type, FieldType::Text | FieldType::Number) {
            warn!("refusing to create {} field '{name}' as text or number", field_type.label());
            return Ok(None);
        }
        let range = RangeBounds::from_parts(range_min, range_max);
        if range.is_some_and(|range| !range.is_ordered()) {
            warn!("range of field '{name}' has min above max");
            return Ok(None);
        }

        let record = field_record(name, owner_id, field_type, is_strict);
        let mut plan = MutationPlan::new();
        plan.push(insert_field(&record));
        if let Some(range) = range {
            plan.push(put_range(&record.id, range));
        }
        if !self.commit_plan(plan).await? {
            return Ok(None);
        }

        let options = match range {
            Some(range) => AdditionalOptions::TextOrNumber { is_strict, range },
            None => AdditionalOptions::Empty,
        };
        Ok(Some(created(&record, Some(is_strict), options)))
    }

    pub async fn create_text_area(&mut self, name: &str, owner_id: i64) -> Result<Option<FieldView>, RepoError> {
        let record = field_record(name, owner_id, FieldType::TextArea, false);
        let mut plan = MutationPlan::new();
        plan.push(insert_field(&record));
        if !self.commit_plan(plan).await? {
            return Ok(None);
        }
        Ok(Some(created(&record, None, AdditionalOptions::Empty)))
    }

    /// Creates a Radio field with one option row per entry, in the given order.
    pub async fn create_radio_field(
        &mut self,
        name: &str,
        owner_id: i64,
        choice_options: Option<Vec<String>>,
        is_strict: Option<bool>,
    ) -> Result<Option<FieldView>, RepoError> {
        let Some(choice_options) = usable_options(name, choice_options) else {
            return Ok(None);
        };

        let record = field_record(name, owner_id, FieldType::Radio, is_strict.unwrap_or(false));
        let mut plan = MutationPlan::new();
        plan.push(insert_field(&record));
        plan.push(add_choice_options(&record.id, &choice_options));
        if !self.commit_plan(plan).await? {
            return Ok(None);
        }

        let options = AdditionalOptions::Choice {
            choice_options,
            range: None,
        };
        Ok(Some(created(&record, is_strict, options)))
    }

    /// Creates a Checkbox field. Range bounds count selectable options, so they are
    /// checked against the option count before anything is written.
    pub async fn create_checkbox_field(
        &mut self,
        name: &str,
        owner_id: i64,
        choice_options: Option<Vec<String>>,
        is_strict: Option<bool>,
        range_min: Option<i64>,
        range_max: Option<i64>,
    ) -> Result<Option<FieldView>, RepoError> {
        let Some(choice_options) = usable_options(name, choice_options) else {
            return Ok(None);
        };
        let range = RangeBounds::from_parts(range_min, range_max);
        if let Some(range) = range {
            let mut problems = checkbox_range_issues(&range);
            problems.extend(selective_range_issues(&range, choice_options.len()));
            if !problems.is_empty() {
                warn!("checkbox field '{name}' has an invalid range: {}", problems.join("; "));
                return Ok(None);
            }
        }

        let record = field_record(name, owner_id, FieldType::Checkbox, is_strict.unwrap_or(false));
        let mut plan = MutationPlan::new();
        plan.push(insert_field(&record));
        plan.push(add_choice_options(&record.id, &choice_options));
        if let Some(range) = range {
            plan.push(put_range(&record.id, range));
        }
        if !self.commit_plan(plan).await? {
            return Ok(None);
        }

        let options = AdditionalOptions::Choice { choice_options, range };
        Ok(Some(created(&record, is_strict, options)))
    }

    /// Creates an Autocomplete field together with its settings row. Either both rows
    /// exist afterwards or neither does.
    pub async fn create_autocomplete_field(
        &mut self,
        name: &str,
        owner_id: i64,
        data_url: &str,
        sheet: &str,
        from_row: &str,
        to_row: &str,
    ) -> Result<Option<FieldView>, RepoError> {
        let record = field_record(name, owner_id, FieldType::Autocomplete, false);
        let settings = AutocompleteSettings {
            data_url: data_url.to_string(),
            sheet: sheet.to_string(),
            from_row: from_row.to_string(),
            to_row: to_row.to_string(),
        };
        let mut plan = MutationPlan::new();
        plan.push(insert_field(&record));
        plan.push(put_setting_autocomplete(&record.id, &settings, false));
        if !self.commit_plan(plan).await? {
            return Ok(None);
        }

        let options = AdditionalOptions::Autocomplete {
            setting_autocomplete: settings,
            values: None,
        };
        Ok(Some(created(&record, None, options)))
    }

    /// Commits `plan`, reporting a store rejection as `false`.
    async fn commit_plan(&mut self, plan: MutationPlan) -> Result<bool, RepoError> {
        let field_id = plan.commands.first().map(|command| command.field_id().to_string());
        match self.store.commit(plan).await {
            Ok(()) => Ok(true),
            Err(err) if err.is_rejection() => {
                warn!("store rejected changes to field {}: {err}", field_id.unwrap_or_default());
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }
}

fn split_bounds(range: Option<RangeBounds>) -> (Option<i64>, Option<i64>) {
    range.map_or((None, None), |range| (range.min, range.max))
}

/// Options that can back a choice field, or `None` when they are absent, empty or repeated.
fn usable_options(name: &str, choice_options: Option<Vec<String>>) -> Option<Vec<String>> {
    let options = choice_options.filter(|options| !options.is_empty());
    let Some(options) = options else {
        warn!("missing choice options for field '{name}'");
        return None;
    };
    let repeated = repeated_values(&options);
    if !repeated.is_empty() {
        warn!("repeated choice options for field '{name}': {}", repeated.join(", "));
        return None;
    }
    Some(options)
}

fn field_record(name: &str, owner_id: i64, field_type: FieldType, is_strict: bool) -> FieldRecord {
    FieldRecord {
        id: generate_record_id(RecordKind::Field),
        owner_id,
        name: name.to_string(),
        field_type,
        is_strict,
        created_at: Utc::now(),
    }
}

fn created(record: &FieldRecord, is_strict: Option<bool>, options: AdditionalOptions) -> FieldView {
    info!("created {} field {} for owner {}", record.field_type.label(), record.id, record.owner_id);
    FieldView::from_record(record, is_strict, options)
}

fn insert_field(record: &FieldRecord) -> MutationCommand {
    MutationCommand::InsertField(FieldInsert {
        record: record.clone(),
        name_key: name_key(record.owner_id, &record.name),
    })
}

fn put_range(field_id: &str, range: RangeBounds) -> MutationCommand {
    MutationCommand::PutRange(RangePut {
        field_id: field_id.to_string(),
        range: RangeRecord {
            id: generate_record_id(RecordKind::Range),
            min: range.min,
            max: range.max,
        },
    })
}

fn add_choice_options(field_id: &str, texts: &[String]) -> MutationCommand {
    MutationCommand::AddChoiceOptions(ChoiceOptionsAdd {
        field_id: field_id.to_string(),
        options: texts
            .iter()
            .map(|text| ChoiceOptionDraft {
                id: generate_record_id(RecordKind::ChoiceOption),
                option_text: text.clone(),
            })
            .collect(),
    })
}

fn put_setting_autocomplete(field_id: &str, settings: &AutocompleteSettings, replace: bool) -> MutationCommand {
    MutationCommand::PutSettingAutocomplete(SettingAutocompletePut {
        record: SettingAutocompleteRecord {
            id: generate_record_id(RecordKind::SettingAutocomplete),
            field_id: field_id.to_string(),
            data_url: settings.data_url.clone(),
            sheet: settings.sheet.clone(),
            from_row: settings.from_row.clone(),
            to_row: settings.to_row.clone(),
        },
        replace,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{repository::MemoryStore, sheets::StaticSheets};

    fn service() -> FieldService<MemoryStore, StaticSheets> {
        FieldService::new(MemoryStore::new(), StaticSheets::new())
    }

    #[tokio::test]
    async fn text_area_creates_only_the_field_row() {
        let mut service = service();
        let view = service.create_text_area("bio", 4).await.unwrap().expect("created");
        assert_eq!(view.field_type, FieldType::TextArea);
        assert_eq!(view.options, AdditionalOptions::Empty);
        assert_eq!(service.store().field_count(), 1);
        assert_eq!(service.store().range_count(), 0);
    }

    #[tokio::test]
    async fn text_or_number_refuses_other_types() {
        let mut service = service();
        let view = service
            .create_text_or_number_field("x", 1, FieldType::Radio, false, None, None)
            .await
            .unwrap();
        assert!(view.is_none());
        assert_eq!(service.store().commits(), 0);
    }

    #[tokio::test]
    async fn repeated_options_write_nothing() {
        let mut service = service();
        let view = service
            .create_radio_field("color", 1, Some(vec!["r".into(), "r".into()]), None)
            .await
            .unwrap();
        assert!(view.is_none());
        assert_eq!(service.store().field_count(), 0);
    }

    #[tokio::test]
    async fn checkbox_range_above_option_count_writes_nothing() {
        let mut service = service();
        let view = service
            .create_checkbox_field("pick", 1, Some(vec!["a".into()]), None, Some(0), Some(2))
            .await
            .unwrap();
        assert!(view.is_none());
        assert_eq!(service.store().field_count(), 0);
    }

    #[tokio::test]
    async fn create_dispatches_on_variant() {
        let mut service = service();
        let view = service
            .create(NewField::TextOrNumber {
                name: "age".into(),
                owner_id: 2,
                field_type: FieldType::Number,
                is_strict: true,
                range: Some(RangeBounds::new(None, Some(120))),
            })
            .await
            .unwrap()
            .expect("created");
        assert_eq!(view.options.range(), Some(RangeBounds::new(None, Some(120))));
        assert_eq!(service.store().range_count(), 1);
    }
}
