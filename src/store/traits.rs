//! # Store Adapter Contracts
//!
//! Keys follow `<EntityType>:<id>`; relation sets use
//! `<EntityType>:<id>:<relationName>`. All values are strings at this layer.

use crate::error::Result;
use crate::models::ResultLocator;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};

#[async_trait]
pub trait EntityStore: Send + Sync + std::fmt::Debug {
    async fn get_field(&self, key: &str, field: &str) -> Result<Option<String>>;

    /// Present fields among `fields`; absent ones are left out of the map
    async fn get_fields(&self, key: &str, fields: &[&str]) -> Result<HashMap<String, String>>;

    async fn set_field(&self, key: &str, field: &str, value: &str) -> Result<()>;

    async fn set_fields(&self, key: &str, values: &[(&str, String)]) -> Result<()>;

    /// Atomically add `delta` to an integer field (absent counts as 0) and return the new value
    async fn atomic_increment(&self, key: &str, field: &str, delta: i64) -> Result<i64>;

    async fn add_to_set(&self, set_key: &str, member: &str) -> Result<()>;

    async fn remove_from_set(&self, set_key: &str, member: &str) -> Result<()>;

    async fn members_of(&self, set_key: &str) -> Result<BTreeSet<String>>;
}

#[async_trait]
pub trait ResultStore: Send + Sync + std::fmt::Debug {
    /// Persist `value` under a fresh key and return where it went
    async fn store_result(&self, value: &Value) -> Result<ResultLocator>;

    /// Read back a value; `None` if nothing is stored under the locator's key
    async fn fetch(&self, locator: &ResultLocator) -> Result<Option<Value>>;
}
