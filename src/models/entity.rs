//! # Entity Mapping
//!
//! Declarative field lists and relation descriptors over an [`EntityStore`].
//! An entity is one hash at `<Type>:<id>` whose fields are marshalled to and
//! from strings by the entity itself; has-many relations are sets at
//! `<Type>:<id>:<relation>`.

use crate::error::{Result, TaskhiveError};
use crate::store::EntityStore;
use std::collections::HashMap;

pub fn entity_key(type_name: &str, id: &str) -> String {
    format!("{type_name}:{id}")
}

pub fn relation_key(type_name: &str, id: &str, relation: &str) -> String {
    format!("{type_name}:{id}:{relation}")
}

/// Channel-safe token derived from an entity key
///
/// Injective for keys made of a type name and a UUID, and computable by anyone
/// holding the id.
pub fn channel_name_for(key: &str) -> String {
    key.replace(':', "-")
}

/// Has-many / belongs-to wiring between two entity types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relation {
    /// Name of the set on the owning side
    pub name: &'static str,
    pub owner_type: &'static str,
    pub member_type: &'static str,
    /// Field on the member holding the owner's id
    pub foreign_key: &'static str,
}

impl Relation {
    pub fn set_key(&self, owner_id: &str) -> String {
        relation_key(self.owner_type, owner_id, self.name)
    }
}

pub trait Entity: Sized + Send + Sync {
    /// Persisted field names, excluding the id (which lives in the key)
    fn fields(&self) -> &'static [&'static str];

    fn type_name(&self) -> &'static str;

    fn id(&self) -> &str;

    /// Marshal one field; `None` leaves it unset in the store
    fn field_value(&self, field: &str) -> Result<Option<String>>;

    /// Unmarshal one field read back from the store
    fn assign_field(&mut self, field: &str, value: &str) -> Result<()>;

    fn key(&self) -> String {
        entity_key(self.type_name(), self.id())
    }

    fn channel_name(&self) -> String {
        channel_name_for(&self.key())
    }
}

/// Persist every declared field
pub async fn save<E: Entity>(store: &dyn EntityStore, entity: &E) -> Result<()> {
    save_fields(store, entity, entity.fields()).await
}

/// Persist only `fields`
pub async fn save_fields<E: Entity>(
    store: &dyn EntityStore,
    entity: &E,
    fields: &[&str],
) -> Result<()> {
    let mut values = Vec::with_capacity(fields.len());
    for field in fields {
        if let Some(value) = entity.field_value(field)? {
            values.push((*field, value));
        }
    }
    if values.is_empty() {
        return Ok(());
    }
    store.set_fields(&entity.key(), &values).await
}

/// Refresh `fields` on `entity` from the store; absent fields keep their local value
pub async fn reload<E: Entity>(
    store: &dyn EntityStore,
    entity: &mut E,
    fields: &[&str],
) -> Result<()> {
    let values = store.get_fields(&entity.key(), fields).await?;
    assign_all(entity, &values)
}

/// Populate a blank entity (id and variant already set) from the store
pub async fn load<E: Entity>(store: &dyn EntityStore, mut blank: E) -> Result<E> {
    let key = blank.key();
    let values = store.get_fields(&key, blank.fields()).await?;
    if values.is_empty() {
        return Err(TaskhiveError::EntityNotFound(key));
    }
    assign_all(&mut blank, &values)?;
    Ok(blank)
}

fn assign_all<E: Entity>(entity: &mut E, values: &HashMap<String, String>) -> Result<()> {
    for (field, value) in values {
        entity.assign_field(field, value)?;
    }
    Ok(())
}

pub async fn increment<E: Entity>(store: &dyn EntityStore, entity: &E, field: &str) -> Result<i64> {
    store.atomic_increment(&entity.key(), field, 1).await
}

pub async fn decrement<E: Entity>(store: &dyn EntityStore, entity: &E, field: &str) -> Result<i64> {
    store.atomic_increment(&entity.key(), field, -1).await
}

pub(crate) fn parse_bool(field: &str, value: &str) -> Result<bool> {
    match value {
        "true" => Ok(true),
        "false" | "" => Ok(false),
        other => Err(TaskhiveError::Serialization(format!(
            "{field}: expected boolean, got '{other}'"
        ))),
    }
}

pub(crate) fn parse_i64(field: &str, value: &str) -> Result<i64> {
    value
        .parse()
        .map_err(|e| TaskhiveError::Serialization(format!("{field}: {e}")))
}
