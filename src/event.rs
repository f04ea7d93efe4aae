//! Change event domain types.
//!
//! A [`ChangeEvent`] describes one mutation to a tracked entity. It is
//! produced by the change-tracking collaborator, handed to the evaluator and
//! never mutated by this crate.

use anyhow::bail;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Entity type tag for tables.
pub const TABLE: &str = "table";
/// Entity type tag for data quality test cases.
pub const TEST_CASE: &str = "testCase";
/// Entity type tag for ingestion pipelines.
pub const INGESTION_PIPELINE: &str = "ingestionPipeline";

/// The kind of change an event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventType {
    EntityCreated,
    EntityUpdated,
    EntityFieldsChanged,
    EntityNoChange,
    EntitySoftDeleted,
    EntityDeleted,
    EntityRestored,
}

impl EventType {
    pub const ALL: [EventType; 7] = [
        Self::EntityCreated,
        Self::EntityUpdated,
        Self::EntityFieldsChanged,
        Self::EntityNoChange,
        Self::EntitySoftDeleted,
        Self::EntityDeleted,
        Self::EntityRestored,
    ];

    /// The external string form, as used in rule expressions and JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EntityCreated => "entityCreated",
            Self::EntityUpdated => "entityUpdated",
            Self::EntityFieldsChanged => "entityFieldsChanged",
            Self::EntityNoChange => "entityNoChange",
            Self::EntitySoftDeleted => "entitySoftDeleted",
            Self::EntityDeleted => "entityDeleted",
            Self::EntityRestored => "entityRestored",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Self::ALL.iter().find(|kind| kind.as_str() == s) {
            Some(kind) => Ok(*kind),
            None => bail!("unknown event type: '{s}'"),
        }
    }
}

/// A single field delta. Values are kept in their serialized form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange {
    pub name: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub old_value: Value,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub new_value: Value,
}

impl FieldChange {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_old_value(mut self, value: impl Into<Value>) -> Self {
        self.old_value = value.into();
        self
    }

    pub fn with_new_value(mut self, value: impl Into<Value>) -> Self {
        self.new_value = value.into();
        self
    }
}

/// The field deltas carried by an update event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ChangeDescription {
    #[serde(default)]
    pub fields_added: Vec<FieldChange>,
    #[serde(default)]
    pub fields_updated: Vec<FieldChange>,
    #[serde(default)]
    pub fields_deleted: Vec<FieldChange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_version: Option<f64>,
}

impl ChangeDescription {
    /// All field changes in order: added, then updated, then deleted.
    pub fn field_changes(&self) -> impl Iterator<Item = &FieldChange> {
        self.fields_added
            .iter()
            .chain(self.fields_updated.iter())
            .chain(self.fields_deleted.iter())
    }

    /// Finds an updated field by name.
    pub fn updated_field(&self, name: &str) -> Option<&FieldChange> {
        self.fields_updated.iter().find(|change| change.name == name)
    }

    /// Checks if the description carries no field deltas at all.
    pub fn is_empty(&self) -> bool {
        self.fields_added.is_empty()
            && self.fields_updated.is_empty()
            && self.fields_deleted.is_empty()
    }
}

/// A reference to another entity, as embedded in an entity payload.
///
/// Every field is optional: payloads are parsed leniently and a reference
/// missing a field simply cannot match on it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct EntityReference {
    #[serde(default, deserialize_with = "lenient_uuid")]
    pub id: Option<Uuid>,
    #[serde(default, rename = "type")]
    pub entity_type: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub fully_qualified_name: Option<String>,
}

/// Reads an id that is not a UUID as absent rather than failing the
/// whole reference.
fn lenient_uuid<'de, D>(deserializer: D) -> Result<Option<Uuid>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(Value::as_str)
        .and_then(|id| Uuid::parse_str(id).ok()))
}

/// One recorded mutation to a tracked entity.
///
/// Fields are private; an event is built once (via [`ChangeEvent::new`] and
/// the `with_*` builders, or by deserializing the collaborator's JSON) and
/// then only read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    event_type: EventType,
    entity_type: String,
    user_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    entity_id: Option<Uuid>,
    #[serde(
        default,
        rename = "entityFullyQualifiedName",
        skip_serializing_if = "Option::is_none"
    )]
    entity_fqn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    entity: Option<Value>,
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    previous_version: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    current_version: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    change_description: Option<ChangeDescription>,
}

impl ChangeEvent {
    /// Creates an event carrying only the fields every event must have.
    pub fn new(
        event_type: EventType,
        entity_type: impl Into<String>,
        user_name: impl Into<String>,
    ) -> Self {
        Self {
            event_type,
            entity_type: entity_type.into(),
            user_name: user_name.into(),
            entity_id: None,
            entity_fqn: None,
            entity: None,
            timestamp: None,
            previous_version: None,
            current_version: None,
            change_description: None,
        }
    }

    pub fn with_entity_id(mut self, id: Uuid) -> Self {
        self.entity_id = Some(id);
        self
    }

    pub fn with_entity_fqn(mut self, fqn: impl Into<String>) -> Self {
        self.entity_fqn = Some(fqn.into());
        self
    }

    pub fn with_entity(mut self, entity: Value) -> Self {
        self.entity = Some(entity);
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_versions(mut self, previous: f64, current: f64) -> Self {
        self.previous_version = Some(previous);
        self.current_version = Some(current);
        self
    }

    pub fn with_change_description(mut self, description: ChangeDescription) -> Self {
        self.change_description = Some(description);
        self
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    /// The entity id, falling back to the payload's `id` field.
    pub fn entity_id(&self) -> Option<Uuid> {
        self.entity_id.or_else(|| {
            self.entity
                .as_ref()
                .and_then(|entity| entity.get("id"))
                .and_then(Value::as_str)
                .and_then(|id| Uuid::parse_str(id).ok())
        })
    }

    /// The entity FQN, falling back to the payload's `fullyQualifiedName`.
    pub fn entity_fqn(&self) -> Option<&str> {
        self.entity_fqn.as_deref().or_else(|| {
            self.entity
                .as_ref()
                .and_then(|entity| entity.get("fullyQualifiedName"))
                .and_then(Value::as_str)
        })
    }

    pub fn entity(&self) -> Option<&Value> {
        self.entity.as_ref()
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    pub fn previous_version(&self) -> Option<f64> {
        self.previous_version
    }

    pub fn current_version(&self) -> Option<f64> {
        self.current_version
    }

    pub fn change_description(&self) -> Option<&ChangeDescription> {
        self.change_description.as_ref()
    }

    /// Returns every owner reference found in the entity payload.
    ///
    /// Both the single `owner` object and the `owners` array are read.
    /// Entries that do not look like a reference are skipped.
    pub fn owners(&self) -> Vec<EntityReference> {
        let Some(entity) = &self.entity else {
            return Vec::new();
        };

        let mut owners = Vec::new();
        if let Some(owner) = entity.get("owner") {
            if let Ok(reference) = EntityReference::deserialize(owner) {
                owners.push(reference);
            }
        }
        if let Some(Value::Array(list)) = entity.get("owners") {
            owners.extend(
                list.iter()
                    .filter_map(|owner| EntityReference::deserialize(owner).ok()),
            );
        }
        owners
    }
}
