//! alertwatch - alert-condition evaluation for entity change events
//!
//! Rule expressions such as
//! `matchAnySource('table') AND NOT matchUpdatedBy('ingestion-bot')` are
//! compiled once into an immutable tree and evaluated against each incoming
//! [`ChangeEvent`]. Evaluation is synchronous, performs no I/O and can run on
//! any number of threads against the same compiled expression.

pub mod app;
pub mod cache;
pub mod cli;
pub mod config;
pub mod evaluator;
pub mod event;
pub mod expression;
pub mod functions;
pub mod subscription;

// Re-export the library boundary for convenience
pub use cache::ExpressionCache;
pub use evaluator::{evaluate, EvaluationContext};
pub use event::{ChangeDescription, ChangeEvent, EntityReference, EventType, FieldChange};
pub use expression::{compile, CompileError, CompiledExpression, Expr};
pub use functions::{FunctionDescriptor, Predicate};
pub use subscription::{Subscription, SubscriptionMatcher};
