use serde::{Serialize, Serializer};

use crate::{
    keys::name_key,
    types::{FieldRecord, RangeRecord, SettingAutocompleteRecord},
};

/// One row-level write. Commands are applied in plan order and a plan commits as a unit.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationCommand {
    InsertField(FieldInsert),
    PatchField(FieldPatch),
    DeleteField(FieldDelete),
    PutRange(RangePut),
    DeleteRange(RangeDelete),
    AddChoiceOptions(ChoiceOptionsAdd),
    RemoveChoiceOptions(ChoiceOptionsRemove),
    PutSettingAutocomplete(SettingAutocompletePut),
}

impl MutationCommand {
    /// Stable name of the command, matching its serialized tag.
    pub fn kind(&self) -> &'static str {
        match self {
            MutationCommand::InsertField(_) => "insert_field",
            MutationCommand::PatchField(_) => "patch_field",
            MutationCommand::DeleteField(_) => "delete_field",
            MutationCommand::PutRange(_) => "put_range",
            MutationCommand::DeleteRange(_) => "delete_range",
            MutationCommand::AddChoiceOptions(_) => "add_choice_options",
            MutationCommand::RemoveChoiceOptions(_) => "remove_choice_options",
            MutationCommand::PutSettingAutocomplete(_) => "put_setting_autocomplete",
        }
    }

    /// Field the command writes to.
    pub fn field_id(&self) -> &str {
        match self {
            MutationCommand::InsertField(insert) => &insert.record.id,
            MutationCommand::PatchField(patch) => &patch.record.id,
            MutationCommand::DeleteField(delete) => &delete.field_id,
            MutationCommand::PutRange(put) => &put.field_id,
            MutationCommand::DeleteRange(delete) => &delete.field_id,
            MutationCommand::AddChoiceOptions(add) => &add.field_id,
            MutationCommand::RemoveChoiceOptions(remove) => &remove.field_id,
            MutationCommand::PutSettingAutocomplete(put) => &put.record.field_id,
        }
    }
}

/// Row-carrying commands reach the script with the row already encoded under `row`, next to
/// the few attributes the script checks. The script stores `row` as is, so integers keep the
/// exact form serde wrote.
fn encode_row<T, E>(row: &T) -> Result<String, E>
where
    T: Serialize,
    E: serde::ser::Error,
{
    serde_json::to_string(row).map_err(E::custom)
}

#[derive(Debug, Clone)]
pub struct FieldInsert {
    pub record: FieldRecord,
    /// `owner_id:name`, checked when the store enforces unique field names.
    pub name_key: String,
}

impl Serialize for FieldInsert {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Wire<'a> {
            id: &'a str,
            owner_id: String,
            name: &'a str,
            name_key: &'a str,
            row: String,
        }
        Wire {
            id: &self.record.id,
            owner_id: self.record.owner_id.to_string(),
            name: &self.record.name,
            name_key: &self.name_key,
            row: encode_row::<_, S::Error>(&self.record)?,
        }
        .serialize(serializer)
    }
}

/// Replaces a field row with `record`, the stored row with the update applied.
#[derive(Debug, Clone)]
pub struct FieldPatch {
    pub record: FieldRecord,
}

impl Serialize for FieldPatch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Wire<'a> {
            field_id: &'a str,
            name: &'a str,
            name_key: String,
            row: String,
        }
        Wire {
            field_id: &self.record.id,
            name: &self.record.name,
            name_key: name_key(self.record.owner_id, &self.record.name),
            row: encode_row::<_, S::Error>(&self.record)?,
        }
        .serialize(serializer)
    }
}

/// Removes the field and every satellite row it owns.
#[derive(Debug, Clone, Serialize)]
pub struct FieldDelete {
    pub field_id: String,
}

/// Attaches `range` to the field, dropping any range it had before.
#[derive(Debug, Clone)]
pub struct RangePut {
    pub field_id: String,
    pub range: RangeRecord,
}

impl Serialize for RangePut {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Wire<'a> {
            field_id: &'a str,
            range_id: &'a str,
            row: String,
        }
        Wire {
            field_id: &self.field_id,
            range_id: &self.range.id,
            row: encode_row::<_, S::Error>(&self.range)?,
        }
        .serialize(serializer)
    }
}

/// Drops the field's range and its join row. No-op when the field has none.
#[derive(Debug, Clone, Serialize)]
pub struct RangeDelete {
    pub field_id: String,
}

/// Appends options after the field's current last position, in the given order.
#[derive(Debug, Clone, Serialize)]
pub struct ChoiceOptionsAdd {
    pub field_id: String,
    pub options: Vec<ChoiceOptionDraft>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChoiceOptionDraft {
    pub id: String,
    pub option_text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChoiceOptionsRemove {
    pub field_id: String,
    pub option_texts: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SettingAutocompletePut {
    pub record: SettingAutocompleteRecord,
    /// When false the field must not have settings yet.
    pub replace: bool,
}

impl Serialize for SettingAutocompletePut {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Wire<'a> {
            field_id: &'a str,
            id: &'a str,
            replace: bool,
            row: String,
        }
        Wire {
            field_id: &self.record.field_id,
            id: &self.record.id,
            replace: self.replace,
            row: encode_row::<_, S::Error>(&self.record)?,
        }
        .serialize(serializer)
    }
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct MutationPlan {
    pub commands: Vec<MutationCommand>,
}

impl MutationPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: MutationCommand) {
        self.commands.push(command);
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }
}
