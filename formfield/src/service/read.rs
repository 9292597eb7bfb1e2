use log::{debug, warn};
use thiserror::Error;

use super::FieldService;
use crate::{
    errors::{RepoError, SheetError},
    repository::FieldStore,
    sheets::SheetLookup,
    types::{AdditionalOptions, FieldRangeRecord, FieldType, FieldView, RangeBounds},
};

/// Why a field's additional options could not be reconstructed.
#[derive(Debug, Error)]
enum LookupError {
    #[error("field {0} does not exist")]
    FieldNotExist(String),

    #[error("range {0} does not exist")]
    RangeNotExist(String),

    #[error("autocomplete settings of field {0} do not exist")]
    SettingAutocompleteNotExist(String),

    #[error("spreadsheet lookup failed: {0}")]
    Sheet(#[from] SheetError),

    #[error(transparent)]
    Store(#[from] RepoError),
}

impl<S, L> FieldService<S, L>
where
    S: FieldStore,
    L: SheetLookup,
{
    /// Variant-specific data of a field, without the base field attributes.
    ///
    /// Returns `Ok(None)` when the field, or a satellite its type requires, is missing, or
    /// when the autocomplete values cannot be fetched.
    pub async fn get_additional_options(
        &mut self,
        field_id: &str,
        field_type: FieldType,
    ) -> Result<Option<AdditionalOptions>, RepoError> {
        let outcome = self.lookup_options(field_id, field_type, true).await;
        resolve(field_id, outcome)
    }

    /// Loads a field flattened together with its additional options.
    pub async fn get_field(&mut self, field_id: &str) -> Result<Option<FieldView>, RepoError> {
        self.load_view(field_id, true).await
    }

    /// Reads back a field a plan has just written. Unlike [`get_field`](Self::get_field), an
    /// autocomplete field whose values cannot be fetched keeps its view, without `values`.
    pub(super) async fn committed_field(&mut self, field_id: &str) -> Result<Option<FieldView>, RepoError> {
        self.load_view(field_id, false).await
    }

    async fn load_view(&mut self, field_id: &str, require_values: bool) -> Result<Option<FieldView>, RepoError> {
        let Some(record) = self.store.field(field_id).await? else {
            return Ok(None);
        };
        let outcome = self.lookup_options(field_id, record.field_type, require_values).await;
        let Some(options) = resolve(field_id, outcome)? else {
            return Ok(None);
        };
        let is_strict = record.field_type.uses_strictness().then_some(record.is_strict);
        Ok(Some(FieldView::from_record(&record, is_strict, options)))
    }

    async fn lookup_options(
        &mut self,
        field_id: &str,
        field_type: FieldType,
        require_values: bool,
    ) -> Result<AdditionalOptions, LookupError> {
        match field_type {
            FieldType::Text | FieldType::Number => self.text_or_number_options(field_id).await,
            FieldType::TextArea => Ok(AdditionalOptions::Empty),
            FieldType::Radio | FieldType::Checkbox => self.choice_options(field_id).await,
            FieldType::Autocomplete => self.autocomplete_options(field_id, require_values).await,
        }
    }

    async fn text_or_number_options(&mut self, field_id: &str) -> Result<AdditionalOptions, LookupError> {
        let Some(join) = self.store.field_range(field_id).await? else {
            return Ok(AdditionalOptions::Empty);
        };
        let field = self
            .store
            .field(field_id)
            .await?
            .ok_or_else(|| LookupError::FieldNotExist(field_id.to_string()))?;
        let range = self.joined_range(join).await?;
        Ok(AdditionalOptions::TextOrNumber {
            is_strict: field.is_strict,
            range,
        })
    }

    async fn choice_options(&mut self, field_id: &str) -> Result<AdditionalOptions, LookupError> {
        let choice_options: Vec<String> = self
            .store
            .choice_options(field_id)
            .await?
            .into_iter()
            .map(|option| option.option_text)
            .collect();
        let join = self.store.field_range(field_id).await?;

        // No rows at all: tell a missing field apart from one whose options were all removed.
        if choice_options.is_empty() && join.is_none() && self.store.field(field_id).await?.is_none() {
            return Err(LookupError::FieldNotExist(field_id.to_string()));
        }

        let range = match join {
            Some(join) => Some(self.joined_range(join).await?),
            None => None,
        };
        Ok(AdditionalOptions::Choice { choice_options, range })
    }

    async fn autocomplete_options(&mut self, field_id: &str, require_values: bool) -> Result<AdditionalOptions, LookupError> {
        let setting = self
            .store
            .setting_autocomplete(field_id)
            .await?
            .ok_or_else(|| LookupError::SettingAutocompleteNotExist(field_id.to_string()))?;
        let values = match self
            .sheets
            .values(&setting.data_url, &setting.sheet, &setting.from_row, &setting.to_row)
            .await
        {
            Ok(values) => Some(values),
            Err(err) if !require_values => {
                warn!("autocomplete values of field {field_id} unavailable: {err}");
                None
            }
            Err(err) => return Err(err.into()),
        };
        Ok(AdditionalOptions::Autocomplete {
            setting_autocomplete: setting.settings(),
            values,
        })
    }

    async fn joined_range(&mut self, join: FieldRangeRecord) -> Result<RangeBounds, LookupError> {
        self.store
            .range(&join.range_id)
            .await?
            .map(|range| range.bounds())
            .ok_or(LookupError::RangeNotExist(join.range_id))
    }
}

fn resolve(field_id: &str, outcome: Result<AdditionalOptions, LookupError>) -> Result<Option<AdditionalOptions>, RepoError> {
    match outcome {
        Ok(options) => Ok(Some(options)),
        Err(LookupError::Store(err)) => Err(err),
        Err(err @ LookupError::Sheet(_)) => {
            warn!("autocomplete values of field {field_id} unavailable: {err}");
            Ok(None)
        }
        Err(err) => {
            debug!("no additional options for field {field_id}: {err}");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{repository::MemoryStore, sheets::StaticSheets};

    #[tokio::test]
    async fn text_area_has_no_additional_options() {
        let mut service = FieldService::new(MemoryStore::new(), StaticSheets::new());
        let options = service.get_additional_options("fld_any", FieldType::TextArea).await.unwrap();
        assert_eq!(options, Some(AdditionalOptions::Empty));
    }

    #[tokio::test]
    async fn text_without_range_reads_as_empty() {
        let mut service = FieldService::new(MemoryStore::new(), StaticSheets::new());
        let view = service
            .create_text_or_number_field("nick", 1, FieldType::Text, true, None, None)
            .await
            .unwrap()
            .expect("created");
        let options = service.get_additional_options(&view.id, FieldType::Text).await.unwrap();
        assert_eq!(options, Some(AdditionalOptions::Empty));
    }

    #[tokio::test]
    async fn missing_autocomplete_settings_read_as_absent() {
        let mut service = FieldService::new(MemoryStore::new(), StaticSheets::new());
        let options = service.get_additional_options("fld_missing", FieldType::Autocomplete).await.unwrap();
        assert!(options.is_none());
    }

    #[tokio::test]
    async fn unknown_sheet_reads_as_absent() {
        let mut service = FieldService::new(MemoryStore::new(), StaticSheets::new());
        let view = service
            .create_autocomplete_field("town", 1, "https://example.com/sheet", "cities", "A1", "A2")
            .await
            .unwrap()
            .expect("created");
        assert!(service.get_field(&view.id).await.unwrap().is_none());
    }
}
