use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use clap::Args;
use formfield::{FieldPostRequest, FieldPutRequest, FieldService, FieldStore, RepoError, SheetLookup, ValidationError};

use crate::examples::ExampleGroup;
use crate::output::OutputManager;

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// JSON file holding the field creation payload
    pub payload: PathBuf,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Id of the field to display
    pub id: String,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Id of the field to update
    pub id: String,
    /// JSON file holding the field update payload
    pub payload: PathBuf,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Id of the field to delete
    pub id: String,
}

pub const CREATE_EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Create fields from JSON payloads",
    commands: &["formfield create radio.json", "formfield --memory --output json create checkbox.json"],
}];

pub const SHOW_EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Display a stored field",
    commands: &["formfield show fld_Xb3kQ9mTz2rPw8nA", "formfield --output compact show fld_Xb3kQ9mTz2rPw8nA"],
}];

pub const UPDATE_EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Apply an update payload",
    commands: &["formfield update fld_Xb3kQ9mTz2rPw8nA rename.json"],
}];

pub const DELETE_EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Delete a field and its satellites",
    commands: &["formfield delete fld_Xb3kQ9mTz2rPw8nA"],
}];

async fn read_payload<T>(path: &Path) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

fn report_validation(output: &OutputManager, error: &ValidationError) -> anyhow::Error {
    output.error("Request failed validation");
    for issue in &error.issues {
        output.bullet(&format!("{}: {}", issue.field, issue.message));
    }
    anyhow!("{} validation issue(s)", error.issues.len())
}

pub async fn handle_create<S, L>(args: CreateArgs, service: &mut FieldService<S, L>, output: &OutputManager) -> Result<()>
where
    S: FieldStore,
    L: SheetLookup,
{
    let request: FieldPostRequest = read_payload(&args.payload).await?;
    let field = request
        .into_new_field()
        .map_err(|err| report_validation(output, &err))?;

    match service.create(field).await? {
        Some(view) => {
            output.success(&format!("Created field {}", view.id));
            output.display(&view)
        }
        None => bail!("Field was not created; see the log for the reason"),
    }
}

pub async fn handle_show<S, L>(args: ShowArgs, service: &mut FieldService<S, L>, output: &OutputManager) -> Result<()>
where
    S: FieldStore,
    L: SheetLookup,
{
    match service.get_field(&args.id).await? {
        Some(view) => output.display(&view),
        None => bail!("Field {} not found", args.id),
    }
}

pub async fn handle_update<S, L>(args: UpdateArgs, service: &mut FieldService<S, L>, output: &OutputManager) -> Result<()>
where
    S: FieldStore,
    L: SheetLookup,
{
    let request: FieldPutRequest = read_payload(&args.payload).await?;
    let Some(record) = service.store_mut().field(&args.id).await? else {
        bail!("Field {} not found", args.id);
    };
    let update = request
        .into_update(record.field_type)
        .map_err(|err| report_validation(output, &err))?;
    if update.is_empty() {
        output.warning("Payload contains no changes");
    }

    match service.update_field(&args.id, update).await {
        Ok(Some(view)) => {
            output.success(&format!("Updated field {}", view.id));
            output.display(&view)
        }
        Ok(None) => bail!("Field {} was not updated", args.id),
        Err(RepoError::Validation(err)) => Err(report_validation(output, &err)),
        Err(err) => Err(err.into()),
    }
}

pub async fn handle_delete<S, L>(args: DeleteArgs, service: &mut FieldService<S, L>, output: &OutputManager) -> Result<()>
where
    S: FieldStore,
    L: SheetLookup,
{
    if service.delete_field(&args.id).await? {
        output.success(&format!("Deleted field {}", args.id));
    } else {
        output.info(&format!("Field {} does not exist", args.id));
    }
    Ok(())
}
