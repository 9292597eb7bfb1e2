//! Field configuration for a dynamic form builder.
//!
//! A field is one of six kinds (text, number, textarea, radio, checkbox, autocomplete). Its
//! type-specific data lives in satellite rows (range, choice options, autocomplete settings)
//! next to the field row. [`FieldService`] writes a field and its satellites as one atomic
//! plan and reads them back as a single flattened [`FieldView`].

pub mod config;
pub mod errors;
pub mod id;
pub mod keys;
pub mod repository;
pub mod runtime;
pub mod schema;
pub mod service;
pub mod sheets;
pub mod types;
pub mod validators;

pub use config::{ConfigError, FormfieldConfig};
pub use errors::*;
pub use repository::{FieldStore, MemoryStore, RedisStore, StoreOptions};
pub use schema::{FieldPostRequest, FieldPutRequest, check_for_range};
pub use service::FieldService;
pub use sheets::{SheetLookup, StaticSheets};
pub use types::{AdditionalOptions, AutocompleteSettings, FieldType, FieldUpdate, FieldView, NewField, RangeBounds};

// Re-export redis types so users don't need to depend on a specific redis version
pub use redis;
pub use redis::aio::ConnectionManager;
