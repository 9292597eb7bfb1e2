use redis::aio::ConnectionLike;
use serde_json::Value;

use crate::{
    errors::RepoError,
    runtime::{commands::MutationPlan, scripts::APPLY_PLAN_SCRIPT},
};

/// Runs the whole plan as one Lua invocation, which Redis executes atomically.
pub async fn execute_plan<C>(conn: &mut C, base: &str, unique_names: bool, plan: &MutationPlan) -> Result<Value, RepoError>
where
    C: ConnectionLike + Send,
{
    let payload = serde_json::to_string(plan)
        .map_err(|err| RepoError::other(format!("failed to serialize plan: {err}")))?;

    let mut invocation = APPLY_PLAN_SCRIPT.prepare_invoke();
    invocation.arg(base);
    invocation.arg(payload);
    invocation.arg(if unique_names { "1" } else { "0" });
    let raw: String = invocation.invoke_async(conn).await.map_err(RepoError::from)?;

    let value: Value =
        serde_json::from_str(&raw).map_err(|err| RepoError::other(format!("failed to parse lua response: {err}")))?;

    match value.get("error") {
        None => Ok(value),
        Some(Value::String(code)) => Err(error_from_response(code, &value)),
        Some(_) => Err(RepoError::other("lua_error")),
    }
}

/// Maps a script rejection onto the error a store caller sees.
pub fn error_from_response(code: &str, value: &Value) -> RepoError {
    let string_at = |name: &str| value.get(name).and_then(Value::as_str).map(str::to_string);
    match code {
        "entity_not_found" => RepoError::NotFound {
            entity_id: string_at("entity_id"),
        },
        "unique_constraint_violation" => {
            let strings = |name: &str| -> Vec<String> {
                value
                    .get(name)
                    .and_then(Value::as_array)
                    .map(|arr| {
                        arr.iter()
                            .map(|v| match v {
                                Value::String(s) => s.clone(),
                                other => other.to_string(),
                            })
                            .collect()
                    })
                    .unwrap_or_default()
            };
            RepoError::UniqueConstraintViolation {
                fields: strings("fields"),
                values: strings("values"),
                existing_entity_id: string_at("existing_entity_id").unwrap_or_default(),
            }
        }
        "choice_option_missing" => RepoError::InvalidRequest {
            message: format!(
                "choice option '{}' does not exist on field '{}'",
                string_at("option_text").unwrap_or_default(),
                string_at("field_id").unwrap_or_default()
            ),
        },
        other => RepoError::other(other.to_string()),
    }
}

#[allow(async_fn_in_trait)]
pub trait MutationExecutor {
    async fn execute(&mut self, plan: MutationPlan) -> Result<Value, RepoError>;
}

pub struct RedisExecutor<'a, C>
where
    C: ConnectionLike + Send,
{
    connection: &'a mut C,
    base: String,
    unique_names: bool,
}

impl<'a, C> RedisExecutor<'a, C>
where
    C: ConnectionLike + Send,
{
    pub fn new(connection: &'a mut C, base: impl Into<String>, unique_names: bool) -> Self {
        Self {
            connection,
            base: base.into(),
            unique_names,
        }
    }
}

impl<'a, C> MutationExecutor for RedisExecutor<'a, C>
where
    C: ConnectionLike + Send,
{
    async fn execute(&mut self, plan: MutationPlan) -> Result<Value, RepoError> {
        execute_plan(&mut *self.connection, &self.base, self.unique_names, &plan).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_unique_violation_response() {
        let response = json!({
            "error": "unique_constraint_violation",
            "fields": ["owner_id", "name"],
            "values": ["1", "color"],
            "existing_entity_id": "fld_a"
        });
        match error_from_response("unique_constraint_violation", &response) {
            RepoError::UniqueConstraintViolation {
                fields,
                values,
                existing_entity_id,
            } => {
                assert_eq!(fields, vec!["owner_id", "name"]);
                assert_eq!(values, vec!["1", "color"]);
                assert_eq!(existing_entity_id, "fld_a");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn maps_missing_entity_and_unknown_codes() {
        let missing = error_from_response("entity_not_found", &json!({"entity_id": "fld_x"}));
        assert!(matches!(missing, RepoError::NotFound { entity_id: Some(id) } if id == "fld_x"));
        let unknown = error_from_response("unknown_command", &json!({}));
        assert!(!unknown.is_rejection());
    }
}
