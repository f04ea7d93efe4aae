//! Evaluates compiled rule expressions against change events.

use std::cell::Cell;
use tracing::trace;

use crate::event::ChangeEvent;
use crate::expression::{CompiledExpression, Expr};
use crate::functions::Predicate;

/// Binds one event to the predicate library for the duration of an
/// evaluation.
///
/// A context is cheap and is meant to be built per event; it is not `Sync`
/// and should not outlive the evaluation it was made for.
pub struct EvaluationContext<'a> {
    event: &'a ChangeEvent,
    calls: Cell<usize>,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(event: &'a ChangeEvent) -> Self {
        Self {
            event,
            calls: Cell::new(0),
        }
    }

    pub fn event(&self) -> &ChangeEvent {
        self.event
    }

    /// The number of predicate calls made through this context so far.
    pub fn predicate_calls(&self) -> usize {
        self.calls.get()
    }

    /// Invokes one predicate against the bound event.
    pub fn call(&self, predicate: Predicate, args: &[String]) -> bool {
        self.calls.set(self.calls.get() + 1);
        predicate.apply(self.event, args)
    }

    /// Evaluates an expression. `AND` and `OR` short-circuit.
    pub fn evaluate(&self, expression: &CompiledExpression) -> bool {
        self.eval(expression.root())
    }

    fn eval(&self, expr: &Expr) -> bool {
        match expr {
            Expr::Literal(value) => *value,
            Expr::Call { predicate, args } => self.call(*predicate, args),
            Expr::Not(inner) => !self.eval(inner),
            Expr::And(left, right) => self.eval(left) && self.eval(right),
            Expr::Or(left, right) => self.eval(left) || self.eval(right),
        }
    }
}

/// Evaluates `expression` against `event` in a fresh context.
pub fn evaluate(expression: &CompiledExpression, event: &ChangeEvent) -> bool {
    let context = EvaluationContext::new(event);
    let verdict = context.evaluate(expression);

    trace!(
        rule = expression.source(),
        entity_type = event.entity_type(),
        event_type = %event.event_type(),
        calls = context.predicate_calls(),
        verdict,
        "Evaluated rule"
    );
    metrics::counter!(
        "rule_evaluations",
        "verdict" => if verdict { "match" } else { "no_match" }
    )
    .increment(1);

    verdict
}
