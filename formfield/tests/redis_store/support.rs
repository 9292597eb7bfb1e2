pub(crate) use formfield::{
    FieldService, RedisStore, StaticSheets, StoreOptions, id::RecordKind, id::generate_record_id, redis,
    redis::AsyncCommands,
};
pub(crate) use std::sync::atomic::{AtomicUsize, Ordering};

pub(crate) fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1/".to_string())
}

pub(crate) static TEST_NAMESPACE_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Key prefix unique to one test, so runs never see each other's rows.
pub(crate) struct TestNamespace {
    prefix: String,
}

impl TestNamespace {
    pub(crate) fn unique() -> Self {
        let idx = TEST_NAMESPACE_COUNTER.fetch_add(1, Ordering::SeqCst);
        let salt = generate_record_id(RecordKind::Field);
        Self {
            prefix: format!("formfield_test_{idx}_{}", &salt[4..12]),
        }
    }

    pub(crate) async fn store(&self, options: StoreOptions) -> RedisStore {
        RedisStore::connect(&redis_url(), self.prefix.clone(), "forms")
            .await
            .expect("redis connection")
            .with_options(options)
    }

    pub(crate) async fn service(&self) -> FieldService<RedisStore, StaticSheets> {
        FieldService::new(self.store(StoreOptions::default()).await, StaticSheets::new())
    }
}

/// Reads a key outside the store, for asserting on keys only the script writes.
pub(crate) async fn raw_get(key: &str) -> Option<String> {
    let client = redis::Client::open(redis_url()).expect("redis client");
    let mut conn = client.get_multiplexed_async_connection().await.expect("redis connection");
    conn.get(key).await.expect("redis get")
}
