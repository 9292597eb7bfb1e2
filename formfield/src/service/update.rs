use std::collections::HashSet;

use log::{debug, info};

use super::{FieldService, add_choice_options, put_range, put_setting_autocomplete};
use crate::{
    errors::{RepoError, ValidationError, ValidationIssue},
    repository::FieldStore,
    runtime::commands::{ChoiceOptionsRemove, FieldDelete, FieldPatch, MutationCommand, MutationPlan, RangeDelete},
    schema::{not_allowed, ordered_only},
    sheets::SheetLookup,
    types::{FieldType, FieldUpdate, FieldView, RangeBounds, RangeChange},
    validators::{checkbox_range_issues, choice_option_change_issues, selective_range_issues, text_range_issues},
};

impl<S, L> FieldService<S, L>
where
    S: FieldStore,
    L: SheetLookup,
{
    /// Applies `update` to an existing field in one atomic plan and returns the field as
    /// stored afterwards.
    ///
    /// Changes the field's type does not allow, or option changes that do not fit the current
    /// option set, fail with [`RepoError::Validation`] before anything is written. An unknown
    /// field, or a plan the store rejects, yields `Ok(None)`. Once the plan is committed the
    /// field is returned even if its autocomplete values cannot be fetched.
    pub async fn update_field(&mut self, field_id: &str, update: FieldUpdate) -> Result<Option<FieldView>, RepoError> {
        let Some(record) = self.store.field(field_id).await? else {
            debug!("update of unknown field {field_id}");
            return Ok(None);
        };
        let field_type = record.field_type;
        ValidationError::check(update_issues(field_type, &update))?;
        if field_type.has_choice_options() {
            self.check_option_changes(field_id, field_type, &update).await?;
        }

        let mut plan = MutationPlan::new();
        if update.name.is_some() || update.is_strict.is_some() {
            let mut patched = record;
            if let Some(name) = &update.name {
                patched.name = name.clone();
            }
            if let Some(is_strict) = update.is_strict {
                patched.is_strict = is_strict;
            }
            plan.push(MutationCommand::PatchField(FieldPatch { record: patched }));
        }
        match update.range {
            RangeChange::Keep => {}
            RangeChange::Replace(bounds) => match RangeBounds::from_parts(bounds.min, bounds.max) {
                Some(bounds) => plan.push(put_range(field_id, bounds)),
                None => plan.push(delete_range(field_id)),
            },
            RangeChange::Delete => plan.push(delete_range(field_id)),
        }
        if !update.removed_choice_options.is_empty() {
            plan.push(MutationCommand::RemoveChoiceOptions(ChoiceOptionsRemove {
                field_id: field_id.to_string(),
                option_texts: update.removed_choice_options.clone(),
            }));
        }
        if !update.added_choice_options.is_empty() {
            plan.push(add_choice_options(field_id, &update.added_choice_options));
        }
        if let Some(settings) = &update.setting_autocomplete {
            plan.push(put_setting_autocomplete(field_id, settings, true));
        }

        if !plan.is_empty() {
            let command_count = plan.len();
            if !self.commit_plan(plan).await? {
                return Ok(None);
            }
            info!("updated field {field_id} with {command_count} commands");
        }
        self.committed_field(field_id).await
    }

    /// Deletes a field and every satellite row it owns. Returns `false` if there was no such field.
    pub async fn delete_field(&mut self, field_id: &str) -> Result<bool, RepoError> {
        if self.store.field(field_id).await?.is_none() {
            return Ok(false);
        }
        let mut plan = MutationPlan::new();
        plan.push(MutationCommand::DeleteField(FieldDelete {
            field_id: field_id.to_string(),
        }));
        let deleted = self.commit_plan(plan).await?;
        if deleted {
            info!("deleted field {field_id}");
        }
        Ok(deleted)
    }

    /// Checks added and removed options against the stored set, and a checkbox range against
    /// the number of options left once the update is applied.
    async fn check_option_changes(
        &mut self,
        field_id: &str,
        field_type: FieldType,
        update: &FieldUpdate,
    ) -> Result<(), RepoError> {
        let touches_options = !update.added_choice_options.is_empty() || !update.removed_choice_options.is_empty();
        let replaces_range = matches!(update.range, RangeChange::Replace(_));
        if !touches_options && !replaces_range {
            return Ok(());
        }

        let current: HashSet<String> = self
            .store
            .choice_options(field_id)
            .await?
            .into_iter()
            .map(|option| option.option_text)
            .collect();
        let mut issues = Vec::new();
        for option in &update.removed_choice_options {
            if !current.contains(option) {
                issues.push(ValidationIssue::new(
                    "removedChoiceOptions",
                    "not_found",
                    format!("Option '{option}' does not exist"),
                ));
            }
        }
        for option in &update.added_choice_options {
            if current.contains(option) {
                issues.push(ValidationIssue::new(
                    "addedChoiceOptions",
                    "unique",
                    format!("Option '{option}' already exists"),
                ));
            }
        }
        ValidationError::check(issues)?;

        let remaining = current.len() - update.removed_choice_options.len() + update.added_choice_options.len();
        if remaining == 0 {
            return Err(ValidationError::single(
                "removedChoiceOptions",
                "required",
                "At least one choice option must remain",
            )
            .into());
        }

        if field_type == FieldType::Checkbox {
            let range = match update.range {
                RangeChange::Replace(bounds) => Some(bounds),
                RangeChange::Delete => None,
                RangeChange::Keep => match self.store.field_range(field_id).await? {
                    Some(join) => self.store.range(&join.range_id).await?.map(|range| range.bounds()),
                    None => None,
                },
            };
            if let Some(range) = range {
                ValidationError::check(
                    selective_range_issues(&range, remaining)
                        .into_iter()
                        .map(|message| ValidationIssue::new("range", "schema", message))
                        .collect(),
                )?;
            }
        }
        Ok(())
    }
}

fn delete_range(field_id: &str) -> MutationCommand {
    MutationCommand::DeleteRange(RangeDelete {
        field_id: field_id.to_string(),
    })
}

/// Problems with `update` that depend only on the field type.
fn update_issues(field_type: FieldType, update: &FieldUpdate) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    if update.name.as_ref().is_some_and(|name| name.trim().is_empty()) {
        issues.push(ValidationIssue::new("updatedName", "required", "Field may not be empty."));
    }
    if update.is_strict.is_some() && !matches!(field_type, FieldType::Text | FieldType::Number) {
        issues.push(not_allowed("isStrict", field_type));
    }
    if update.range != RangeChange::Keep && !field_type.accepts_range() {
        issues.push(not_allowed("range", field_type));
    }
    if !field_type.has_choice_options() {
        if !update.added_choice_options.is_empty() {
            issues.push(not_allowed("addedChoiceOptions", field_type));
        }
        if !update.removed_choice_options.is_empty() {
            issues.push(not_allowed("removedChoiceOptions", field_type));
        }
    }
    if update.setting_autocomplete.is_some() && field_type != FieldType::Autocomplete {
        issues.push(not_allowed("updatedAutocomplete", field_type));
    }

    if let RangeChange::Replace(bounds) = update.range {
        let messages = match field_type {
            FieldType::Text => text_range_issues(&bounds),
            FieldType::Checkbox => checkbox_range_issues(&bounds),
            _ => ordered_only(&bounds),
        };
        issues.extend(messages.into_iter().map(|message| ValidationIssue::new("range", "schema", message)));
    }
    issues.extend(
        choice_option_change_issues(&update.added_choice_options, &update.removed_choice_options)
            .into_iter()
            .map(|message| ValidationIssue::new("choiceOptions", "schema", message)),
    );
    issues
}
