//! The catalog of predicate functions available to rule expressions.
//!
//! Every function is a variant of [`Predicate`]. Names are resolved to a
//! variant once, when an expression is compiled; evaluation then dispatches
//! on the variant directly.
//!
//! All predicates follow the same contract: given the bound event and the
//! rule author's literal arguments, return `true` if the event matches any
//! argument. Missing optional data (no owner, no change description, an
//! entity type the predicate does not apply to) yields `false`.

use crate::event::{ChangeEvent, EventType, FieldChange, INGESTION_PIPELINE, TEST_CASE};
use serde::Serialize;
use serde_json::Value;

/// A named predicate over a [`ChangeEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Predicate {
    MatchAnySource,
    MatchAnyOwnerName,
    MatchAnyEntityFqn,
    MatchAnyEntityId,
    MatchAnyEventType,
    MatchTestResult,
    MatchUpdatedBy,
    MatchAnyFieldChange,
    MatchIngestionPipelineState,
}

/// The kind of value a predicate expects as arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ArgumentKind {
    EntityType,
    OwnerName,
    FullyQualifiedName,
    EntityId,
    EventType,
    TestCaseStatus,
    UserName,
    FieldName,
    PipelineState,
}

const TEST_CASE_STATUSES: &[&str] = &["Success", "Failed", "Aborted", "Queued"];
const PIPELINE_STATES: &[&str] = &["queued", "success", "failed", "running", "partialSuccess"];

impl ArgumentKind {
    /// The closed set of accepted values, for kinds that have one.
    pub fn allowed_values(&self) -> Option<Vec<&'static str>> {
        match self {
            Self::EventType => Some(EventType::ALL.iter().map(|kind| kind.as_str()).collect()),
            Self::TestCaseStatus => Some(TEST_CASE_STATUSES.to_vec()),
            Self::PipelineState => Some(PIPELINE_STATES.to_vec()),
            _ => None,
        }
    }
}

/// Describes a predicate for publishing the function catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionDescriptor {
    pub name: &'static str,
    pub input: &'static str,
    pub description: &'static str,
    pub examples: Vec<&'static str>,
    pub argument_kind: ArgumentKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<&'static str>>,
}

impl Predicate {
    pub const ALL: [Predicate; 9] = [
        Self::MatchAnySource,
        Self::MatchAnyOwnerName,
        Self::MatchAnyEntityFqn,
        Self::MatchAnyEntityId,
        Self::MatchAnyEventType,
        Self::MatchTestResult,
        Self::MatchUpdatedBy,
        Self::MatchAnyFieldChange,
        Self::MatchIngestionPipelineState,
    ];

    /// The name under which the predicate is called in rule expressions.
    pub fn name(&self) -> &'static str {
        match self {
            Self::MatchAnySource => "matchAnySource",
            Self::MatchAnyOwnerName => "matchAnyOwnerName",
            Self::MatchAnyEntityFqn => "matchAnyEntityFqn",
            Self::MatchAnyEntityId => "matchAnyEntityId",
            Self::MatchAnyEventType => "matchAnyEventType",
            Self::MatchTestResult => "matchTestResult",
            Self::MatchUpdatedBy => "matchUpdatedBy",
            Self::MatchAnyFieldChange => "matchAnyFieldChange",
            Self::MatchIngestionPipelineState => "matchIngestionPipelineState",
        }
    }

    /// Resolves a function name as written in a rule. Names are case-sensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|predicate| predicate.name() == name)
    }

    /// Descriptors for every predicate, in catalog order.
    pub fn catalog() -> Vec<FunctionDescriptor> {
        Self::ALL.iter().map(Predicate::descriptor).collect()
    }

    pub fn descriptor(&self) -> FunctionDescriptor {
        let (input, description, examples, argument_kind) = match self {
            Self::MatchAnySource => (
                "List of comma separated entity types",
                "Returns true if the change event entity being accessed has source as mentioned in condition",
                vec!["matchAnySource('table', 'topic')"],
                ArgumentKind::EntityType,
            ),
            Self::MatchAnyOwnerName => (
                "List of comma separated owner names",
                "Returns true if the change event entity being accessed has following owners from the list",
                vec!["matchAnyOwnerName('Owner1', 'Owner2')"],
                ArgumentKind::OwnerName,
            ),
            Self::MatchAnyEntityFqn => (
                "List of comma separated entity fully qualified names",
                "Returns true if the change event entity being accessed has following entity FQN",
                vec!["matchAnyEntityFqn('Name1', 'Name')"],
                ArgumentKind::FullyQualifiedName,
            ),
            Self::MatchAnyEntityId => (
                "List of comma separated entity ids",
                "Returns true if the change event entity being accessed has following entity id",
                vec!["matchAnyEntityId('f7a6b5c4-0000-4d3e-8f2a-1b2c3d4e5f60')"],
                ArgumentKind::EntityId,
            ),
            Self::MatchAnyEventType => (
                "List of comma separated event types",
                "Returns true if the change event has one of the following event types",
                vec!["matchAnyEventType('entityCreated', 'entityUpdated')"],
                ArgumentKind::EventType,
            ),
            Self::MatchTestResult => (
                "List of comma separated test case statuses",
                "Returns true if the test case result of a test case change event has one of the following statuses",
                vec!["matchTestResult('Success', 'Failed')"],
                ArgumentKind::TestCaseStatus,
            ),
            Self::MatchUpdatedBy => (
                "List of comma separated user names",
                "Returns true if the change was made by one of the following users",
                vec!["matchUpdatedBy('bot1', 'user1')"],
                ArgumentKind::UserName,
            ),
            Self::MatchAnyFieldChange => (
                "List of comma separated field names",
                "Returns true if the change event touched one of the following fields",
                vec!["matchAnyFieldChange('description', 'owner')"],
                ArgumentKind::FieldName,
            ),
            Self::MatchIngestionPipelineState => (
                "List of comma separated pipeline states",
                "Returns true if an ingestion pipeline status change has one of the following states",
                vec!["matchIngestionPipelineState('failed', 'partialSuccess')"],
                ArgumentKind::PipelineState,
            ),
        };

        FunctionDescriptor {
            name: self.name(),
            input,
            description,
            examples,
            argument_kind,
            allowed_values: argument_kind.allowed_values(),
        }
    }

    /// Evaluates the predicate against an event.
    pub fn apply(&self, event: &ChangeEvent, args: &[String]) -> bool {
        match self {
            Self::MatchAnySource => matches_any(args, event.entity_type()),
            Self::MatchAnyOwnerName => event.owners().iter().any(|owner| {
                owner.name.as_deref().is_some_and(|name| matches_any(args, name))
                    || owner
                        .display_name
                        .as_deref()
                        .is_some_and(|name| matches_any(args, name))
            }),
            Self::MatchAnyEntityFqn => event
                .entity_fqn()
                .is_some_and(|fqn| matches_any(args, fqn)),
            Self::MatchAnyEntityId => event
                .entity_id()
                .is_some_and(|id| matches_any(args, &id.to_string())),
            Self::MatchAnyEventType => matches_any(args, event.event_type().as_str()),
            Self::MatchTestResult => {
                updated_status(event, TEST_CASE, "testCaseResult", "testCaseStatus")
                    .is_some_and(|status| matches_any(args, &status))
            }
            Self::MatchUpdatedBy => matches_any(args, event.user_name()),
            Self::MatchAnyFieldChange => event.change_description().is_some_and(|description| {
                description
                    .field_changes()
                    .any(|change| matches_any(args, &change.name))
            }),
            Self::MatchIngestionPipelineState => {
                updated_status(event, INGESTION_PIPELINE, "pipelineStatus", "pipelineState")
                    .is_some_and(|state| matches_any(args, &state))
            }
        }
    }
}

fn matches_any(args: &[String], value: &str) -> bool {
    args.iter().any(|arg| arg == value)
}

/// Reads `key` from the new value of the updated field `field`, provided the
/// event is about an entity of `entity_type`.
fn updated_status(
    event: &ChangeEvent,
    entity_type: &str,
    field: &str,
    key: &str,
) -> Option<String> {
    if event.entity_type() != entity_type {
        return None;
    }
    let change = event.change_description()?.updated_field(field)?;
    new_value_key(change, key)
}

/// The new value may arrive as an object or as a string of serialized JSON.
fn new_value_key(change: &FieldChange, key: &str) -> Option<String> {
    match &change.new_value {
        Value::Object(map) => map.get(key)?.as_str().map(str::to_string),
        Value::String(raw) => {
            let parsed: Value = serde_json::from_str(raw).ok()?;
            parsed.get(key)?.as_str().map(str::to_string)
        }
        _ => None,
    }
}
