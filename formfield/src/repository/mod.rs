mod memory;

pub use memory::MemoryStore;

use log::debug;
use redis::{AsyncCommands, aio::ConnectionManager};
use serde::de::DeserializeOwned;

use crate::{
    errors::RepoError,
    keys::KeyContext,
    runtime::{MutationExecutor, RedisExecutor, commands::MutationPlan},
    types::{ChoiceOptionRecord, FieldRangeRecord, FieldRecord, RangeRecord, SettingAutocompleteRecord},
};

/// Behaviour shared by every store implementation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreOptions {
    /// Reject a field whose `(owner_id, name)` pair is already taken.
    pub unique_field_names: bool,
}

/// Relational view over field rows and their satellites.
///
/// `commit` applies a [`MutationPlan`] all-or-nothing: if any command is rejected, no
/// command of the plan is visible afterwards.
#[allow(async_fn_in_trait)]
pub trait FieldStore {
    async fn commit(&mut self, plan: MutationPlan) -> Result<(), RepoError>;

    async fn field(&mut self, field_id: &str) -> Result<Option<FieldRecord>, RepoError>;

    async fn range(&mut self, range_id: &str) -> Result<Option<RangeRecord>, RepoError>;

    async fn field_range(&mut self, field_id: &str) -> Result<Option<FieldRangeRecord>, RepoError>;

    /// Options of one field ordered by position.
    async fn choice_options(&mut self, field_id: &str) -> Result<Vec<ChoiceOptionRecord>, RepoError>;

    async fn setting_autocomplete(&mut self, field_id: &str) -> Result<Option<SettingAutocompleteRecord>, RepoError>;
}

/// Store backed by plain Redis strings and lists.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    prefix: String,
    service: String,
    options: StoreOptions,
}

impl RedisStore {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            conn,
            prefix: prefix.into(),
            service: service.into(),
            options: StoreOptions::default(),
        }
    }

    /// Opens a managed connection to `url`.
    pub async fn connect(url: &str, prefix: impl Into<String>, service: impl Into<String>) -> Result<Self, RepoError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self::new(conn, prefix, service))
    }

    pub fn with_options(mut self, options: StoreOptions) -> Self {
        self.options = options;
        self
    }

    /// Deletes every key of this store's namespace with SCAN + DEL, returning how many went.
    pub async fn clear(&mut self) -> Result<u64, RepoError> {
        const SCAN_COUNT: usize = 1000;
        let pattern = self.key_context().service_pattern();
        let mut cursor: u64 = 0;
        let mut total_deleted: u64 = 0;

        loop {
            let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut self.conn)
                .await?;

            if !keys.is_empty() {
                let deleted: u64 = redis::cmd("DEL").arg(&keys).query_async(&mut self.conn).await?;
                total_deleted += deleted;
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        debug!("cleared {total_deleted} keys matching {pattern}");
        Ok(total_deleted)
    }

    pub fn key_context(&self) -> KeyContext<'_> {
        KeyContext::new(&self.prefix, &self.service)
    }

    async fn get_json<T>(&mut self, key: String) -> Result<Option<T>, RepoError>
    where
        T: DeserializeOwned,
    {
        let raw: Option<String> = self.conn.get(&key).await?;
        raw.map(|json| {
            serde_json::from_str::<T>(&json)
                .map_err(|err| RepoError::other(format!("failed to deserialize {key}: {err}")))
        })
        .transpose()
    }
}

impl FieldStore for RedisStore {
    async fn commit(&mut self, plan: MutationPlan) -> Result<(), RepoError> {
        if plan.is_empty() {
            return Ok(());
        }
        let base = self.key_context().base();
        let command_count = plan.len();
        let mut executor = RedisExecutor::new(&mut self.conn, base, self.options.unique_field_names);
        executor.execute(plan).await?;
        debug!("committed {command_count} field commands");
        Ok(())
    }

    async fn field(&mut self, field_id: &str) -> Result<Option<FieldRecord>, RepoError> {
        let key = self.key_context().field(field_id);
        self.get_json(key).await
    }

    async fn range(&mut self, range_id: &str) -> Result<Option<RangeRecord>, RepoError> {
        let key = self.key_context().range(range_id);
        self.get_json(key).await
    }

    async fn field_range(&mut self, field_id: &str) -> Result<Option<FieldRangeRecord>, RepoError> {
        let key = self.key_context().field_range(field_id);
        let range_id: Option<String> = self.conn.get(&key).await?;
        Ok(range_id.map(|range_id| FieldRangeRecord {
            field_id: field_id.to_string(),
            range_id,
        }))
    }

    async fn choice_options(&mut self, field_id: &str) -> Result<Vec<ChoiceOptionRecord>, RepoError> {
        let key = self.key_context().choice_options(field_id);
        let rows: Vec<String> = self.conn.lrange(&key, 0, -1).await?;
        let mut options = rows
            .iter()
            .map(|raw| {
                serde_json::from_str::<ChoiceOptionRecord>(raw)
                    .map_err(|err| RepoError::other(format!("failed to deserialize {key}: {err}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        options.sort_by_key(|option| option.position);
        Ok(options)
    }

    async fn setting_autocomplete(&mut self, field_id: &str) -> Result<Option<SettingAutocompleteRecord>, RepoError> {
        let key = self.key_context().setting_autocomplete(field_id);
        self.get_json(key).await
    }
}
