use std::collections::{BTreeMap, HashSet};

use log::debug;

use crate::{
    errors::RepoError,
    keys::name_key,
    repository::{FieldStore, StoreOptions},
    runtime::commands::{MutationCommand, MutationPlan},
    types::{ChoiceOptionRecord, FieldRangeRecord, FieldRecord, RangeRecord, SettingAutocompleteRecord},
};

#[derive(Debug, Clone, Default)]
struct Tables {
    fields: BTreeMap<String, FieldRecord>,
    ranges: BTreeMap<String, RangeRecord>,
    field_ranges: BTreeMap<String, String>,
    choice_options: BTreeMap<String, Vec<ChoiceOptionRecord>>,
    settings: BTreeMap<String, SettingAutocompleteRecord>,
    names: BTreeMap<String, String>,
}

/// In-process store with the same commit semantics as the Redis store.
///
/// A plan is applied to a copy of the tables, which replaces the live tables only
/// when every command succeeded.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Tables,
    options: StoreOptions,
    failing_commands: HashSet<&'static str>,
    commits: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: StoreOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Makes every later plan containing a command of this kind get rejected at that
    /// command, after the commands before it have been staged.
    #[doc(hidden)]
    pub fn fail_on(&mut self, command_kind: &'static str) {
        self.failing_commands.insert(command_kind);
    }

    pub fn field_count(&self) -> usize {
        self.tables.fields.len()
    }

    pub fn range_count(&self) -> usize {
        self.tables.ranges.len()
    }

    pub fn choice_option_count(&self) -> usize {
        self.tables.choice_options.values().map(Vec::len).sum()
    }

    pub fn setting_count(&self) -> usize {
        self.tables.settings.len()
    }

    /// Number of plans that committed.
    pub fn commits(&self) -> usize {
        self.commits
    }

    fn apply(&self, tables: &mut Tables, command: MutationCommand) -> Result<(), RepoError> {
        if self.failing_commands.contains(command.kind()) {
            return Err(RepoError::InvalidRequest {
                message: format!("injected failure on {}", command.kind()),
            });
        }
        match command {
            MutationCommand::InsertField(insert) => {
                let record = insert.record;
                if tables.fields.contains_key(&record.id) {
                    return Err(unique_violation(&["id"], vec![record.id.clone()], &record.id));
                }
                if self.options.unique_field_names {
                    if let Some(holder) = tables.names.get(&insert.name_key) {
                        return Err(unique_violation(
                            &["owner_id", "name"],
                            vec![record.owner_id.to_string(), record.name.clone()],
                            holder,
                        ));
                    }
                    tables.names.insert(insert.name_key, record.id.clone());
                }
                tables.fields.insert(record.id.clone(), record);
            }
            MutationCommand::PatchField(patch) => {
                let record = patch.record;
                let current = require_field(tables, &record.id)?.clone();
                if self.options.unique_field_names && record.name != current.name {
                    let new_key = name_key(current.owner_id, &record.name);
                    if let Some(holder) = tables.names.get(&new_key).filter(|holder| **holder != record.id) {
                        return Err(unique_violation(
                            &["owner_id", "name"],
                            vec![current.owner_id.to_string(), record.name.clone()],
                            holder,
                        ));
                    }
                    let previous = name_key(current.owner_id, &current.name);
                    if tables.names.get(&previous) == Some(&record.id) {
                        tables.names.remove(&previous);
                    }
                    tables.names.insert(new_key, record.id.clone());
                }
                tables.fields.insert(record.id.clone(), record);
            }
            MutationCommand::DeleteField(delete) => {
                let current = require_field(tables, &delete.field_id)?.clone();
                let guard = name_key(current.owner_id, &current.name);
                if tables.names.get(&guard) == Some(&delete.field_id) {
                    tables.names.remove(&guard);
                }
                drop_range(tables, &delete.field_id);
                tables.choice_options.remove(&delete.field_id);
                tables.settings.remove(&delete.field_id);
                tables.fields.remove(&delete.field_id);
            }
            MutationCommand::PutRange(put) => {
                require_field(tables, &put.field_id)?;
                drop_range(tables, &put.field_id);
                tables.field_ranges.insert(put.field_id, put.range.id.clone());
                tables.ranges.insert(put.range.id.clone(), put.range);
            }
            MutationCommand::DeleteRange(delete) => {
                require_field(tables, &delete.field_id)?;
                drop_range(tables, &delete.field_id);
            }
            MutationCommand::AddChoiceOptions(add) => {
                require_field(tables, &add.field_id)?;
                let rows = tables.choice_options.entry(add.field_id.clone()).or_default();
                let mut position = rows.last().map_or(0, |row| row.position + 1);
                for draft in add.options {
                    if let Some(existing) = rows.iter().find(|row| row.option_text == draft.option_text) {
                        return Err(unique_violation(
                            &["field_id", "option_text"],
                            vec![add.field_id.clone(), draft.option_text],
                            &existing.id,
                        ));
                    }
                    rows.push(ChoiceOptionRecord {
                        id: draft.id,
                        field_id: add.field_id.clone(),
                        option_text: draft.option_text,
                        position,
                    });
                    position += 1;
                }
            }
            MutationCommand::RemoveChoiceOptions(remove) => {
                require_field(tables, &remove.field_id)?;
                let rows = tables.choice_options.entry(remove.field_id.clone()).or_default();
                for text in remove.option_texts {
                    let Some(index) = rows.iter().position(|row| row.option_text == text) else {
                        return Err(RepoError::InvalidRequest {
                            message: format!("choice option '{text}' does not exist on field '{}'", remove.field_id),
                        });
                    };
                    rows.remove(index);
                }
            }
            MutationCommand::PutSettingAutocomplete(put) => {
                let field_id = put.record.field_id.clone();
                require_field(tables, &field_id)?;
                if let Some(existing) = tables.settings.get(&field_id).filter(|_| !put.replace) {
                    return Err(unique_violation(&["field_id"], vec![field_id.clone()], &existing.id));
                }
                tables.settings.insert(field_id, put.record);
            }
        }
        Ok(())
    }
}

fn require_field<'t>(tables: &'t Tables, field_id: &str) -> Result<&'t FieldRecord, RepoError> {
    tables.fields.get(field_id).ok_or_else(|| RepoError::NotFound {
        entity_id: Some(field_id.to_string()),
    })
}

fn drop_range(tables: &mut Tables, field_id: &str) {
    if let Some(range_id) = tables.field_ranges.remove(field_id) {
        tables.ranges.remove(&range_id);
    }
}

fn unique_violation(fields: &[&str], values: Vec<String>, existing_entity_id: &str) -> RepoError {
    RepoError::UniqueConstraintViolation {
        fields: fields.iter().map(|field| field.to_string()).collect(),
        values,
        existing_entity_id: existing_entity_id.to_string(),
    }
}

impl FieldStore for MemoryStore {
    async fn commit(&mut self, plan: MutationPlan) -> Result<(), RepoError> {
        let mut staged = self.tables.clone();
        let command_count = plan.len();
        for command in plan.commands {
            self.apply(&mut staged, command)?;
        }
        self.tables = staged;
        self.commits += 1;
        debug!("committed {command_count} field commands in memory");
        Ok(())
    }

    async fn field(&mut self, field_id: &str) -> Result<Option<FieldRecord>, RepoError> {
        Ok(self.tables.fields.get(field_id).cloned())
    }

    async fn range(&mut self, range_id: &str) -> Result<Option<RangeRecord>, RepoError> {
        Ok(self.tables.ranges.get(range_id).cloned())
    }

    async fn field_range(&mut self, field_id: &str) -> Result<Option<FieldRangeRecord>, RepoError> {
        Ok(self.tables.field_ranges.get(field_id).map(|range_id| FieldRangeRecord {
            field_id: field_id.to_string(),
            range_id: range_id.clone(),
        }))
    }

    async fn choice_options(&mut self, field_id: &str) -> Result<Vec<ChoiceOptionRecord>, RepoError> {
        let mut options = self.tables.choice_options.get(field_id).cloned().unwrap_or_default();
        options.sort_by_key(|option| option.position);
        Ok(options)
    }

    async fn setting_autocomplete(&mut self, field_id: &str) -> Result<Option<SettingAutocompleteRecord>, RepoError> {
        Ok(self.tables.settings.get(field_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::commands::{ChoiceOptionDraft, ChoiceOptionsAdd, FieldInsert, FieldPatch, RangePut, SettingAutocompletePut};
    use crate::types::FieldType;
    use chrono::Utc;

    fn insert(id: &str, owner_id: i64, name: &str) -> MutationCommand {
        MutationCommand::InsertField(FieldInsert {
            record: FieldRecord {
                id: id.to_string(),
                owner_id,
                name: name.to_string(),
                field_type: FieldType::Checkbox,
                is_strict: false,
                created_at: Utc::now(),
            },
            name_key: name_key(owner_id, name),
        })
    }

    fn add_options(field_id: &str, texts: &[&str]) -> MutationCommand {
        MutationCommand::AddChoiceOptions(ChoiceOptionsAdd {
            field_id: field_id.to_string(),
            options: texts
                .iter()
                .enumerate()
                .map(|(index, text)| ChoiceOptionDraft {
                    id: format!("opt_{field_id}_{index}_{text}"),
                    option_text: text.to_string(),
                })
                .collect(),
        })
    }

    #[tokio::test]
    async fn rejected_plan_leaves_no_rows() {
        let mut store = MemoryStore::new();
        let plan = MutationPlan {
            commands: vec![insert("fld_1", 1, "colors"), add_options("fld_1", &["r", "g", "r"])],
        };
        let err = store.commit(plan).await.unwrap_err();
        assert!(matches!(err, RepoError::UniqueConstraintViolation { .. }));
        assert_eq!(store.field_count(), 0);
        assert_eq!(store.choice_option_count(), 0);
        assert_eq!(store.commits(), 0);
    }

    #[tokio::test]
    async fn appended_options_continue_positions() {
        let mut store = MemoryStore::new();
        store
            .commit(MutationPlan {
                commands: vec![insert("fld_1", 1, "colors"), add_options("fld_1", &["r", "g"])],
            })
            .await
            .unwrap();
        store
            .commit(MutationPlan {
                commands: vec![add_options("fld_1", &["b"])],
            })
            .await
            .unwrap();
        let positions: Vec<(String, u32)> = store
            .choice_options("fld_1")
            .await
            .unwrap()
            .into_iter()
            .map(|row| (row.option_text, row.position))
            .collect();
        assert_eq!(positions, vec![("r".into(), 0), ("g".into(), 1), ("b".into(), 2)]);
    }

    #[tokio::test]
    async fn replacing_range_drops_orphan() {
        let mut store = MemoryStore::new();
        let put = |id: &str, max| {
            MutationCommand::PutRange(RangePut {
                field_id: "fld_1".into(),
                range: RangeRecord {
                    id: id.into(),
                    min: Some(0),
                    max: Some(max),
                },
            })
        };
        store
            .commit(MutationPlan {
                commands: vec![insert("fld_1", 1, "pick"), put("rng_a", 2)],
            })
            .await
            .unwrap();
        store.commit(MutationPlan { commands: vec![put("rng_b", 3)] }).await.unwrap();
        assert_eq!(store.range_count(), 1);
        assert_eq!(store.field_range("fld_1").await.unwrap().unwrap().range_id, "rng_b");
        assert!(store.range("rng_a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unique_names_are_opt_in() {
        let mut relaxed = MemoryStore::new();
        relaxed.commit(MutationPlan { commands: vec![insert("fld_1", 1, "age")] }).await.unwrap();
        relaxed.commit(MutationPlan { commands: vec![insert("fld_2", 1, "age")] }).await.unwrap();
        assert_eq!(relaxed.field_count(), 2);

        let mut strict = MemoryStore::with_options(StoreOptions {
            unique_field_names: true,
        });
        strict.commit(MutationPlan { commands: vec![insert("fld_1", 1, "age")] }).await.unwrap();
        let err = strict
            .commit(MutationPlan { commands: vec![insert("fld_2", 1, "age")] })
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::UniqueConstraintViolation { existing_entity_id, .. } if existing_entity_id == "fld_1"));
        strict.commit(MutationPlan { commands: vec![insert("fld_3", 2, "age")] }).await.unwrap();
    }

    #[tokio::test]
    async fn commands_against_missing_field_are_rejected() {
        let mut store = MemoryStore::new();
        let err = store
            .commit(MutationPlan {
                commands: vec![add_options("fld_missing", &["a"])],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::NotFound { entity_id: Some(id) } if id == "fld_missing"));
    }

    #[tokio::test]
    async fn settings_insert_without_replace_keeps_existing_row() {
        let mut store = MemoryStore::new();
        let put = |id: &str, sheet: &str, replace| {
            MutationCommand::PutSettingAutocomplete(SettingAutocompletePut {
                record: SettingAutocompleteRecord {
                    id: id.into(),
                    field_id: "fld_1".into(),
                    data_url: "https://example.com/towns".into(),
                    sheet: sheet.into(),
                    from_row: "A1".into(),
                    to_row: "A3".into(),
                },
                replace,
            })
        };
        store
            .commit(MutationPlan {
                commands: vec![insert("fld_1", 1, "town"), put("sac_a", "towns", false)],
            })
            .await
            .unwrap();

        let err = store
            .commit(MutationPlan { commands: vec![put("sac_b", "villages", false)] })
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::UniqueConstraintViolation { existing_entity_id, .. } if existing_entity_id == "sac_a"));
        assert_eq!(store.setting_autocomplete("fld_1").await.unwrap().unwrap().sheet, "towns");

        store
            .commit(MutationPlan { commands: vec![put("sac_b", "villages", true)] })
            .await
            .unwrap();
        assert_eq!(store.setting_autocomplete("fld_1").await.unwrap().unwrap().id, "sac_b");
        assert_eq!(store.setting_count(), 1);
    }

    #[tokio::test]
    async fn rename_releases_the_previous_name() {
        let mut store = MemoryStore::with_options(StoreOptions {
            unique_field_names: true,
        });
        store.commit(MutationPlan { commands: vec![insert("fld_1", 1, "bio")] }).await.unwrap();
        let mut renamed = store.field("fld_1").await.unwrap().unwrap();
        renamed.name = "about".into();
        store
            .commit(MutationPlan {
                commands: vec![MutationCommand::PatchField(FieldPatch { record: renamed })],
            })
            .await
            .unwrap();

        store.commit(MutationPlan { commands: vec![insert("fld_2", 1, "bio")] }).await.unwrap();
        let err = store
            .commit(MutationPlan { commands: vec![insert("fld_3", 1, "about")] })
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::UniqueConstraintViolation { existing_entity_id, .. } if existing_entity_id == "fld_1"));
    }
}
