mod helpers;

use alertwatch::{compile, evaluate, ChangeEvent, CompileError, EvaluationContext, EventType};
use helpers::{eval, table_event, test_case_event, USER1};
use std::sync::Arc;
use std::thread;

#[test]
fn test_unknown_function_fails_at_compile_time() {
    let result = compile("matchAnySource('table') OR matchAnyTag('PII')");

    assert!(matches!(
        result,
        Err(CompileError::UnknownFunction { ref name, .. }) if name == "matchAnyTag"
    ));
}

#[test]
fn test_unknown_function_fails_even_when_unreachable() {
    // The right operand would be short-circuited at evaluation time; the
    // rule must still be rejected.
    assert!(compile("true OR matchNothing()").is_err());
}

#[test]
fn test_malformed_rules_are_rejected() {
    for rule in [
        "",
        "matchAnySource('table'",
        "matchAnySource('table')) ",
        "(matchAnySource('table')",
        "matchAnySource('table)",
        "matchAnySource(table)",
        "matchAnySource('a',)",
        "matchAnySource('a') AND",
        "matchAnySource('a') matchUpdatedBy('b')",
        "matchAnySource('a') = true",
    ] {
        assert!(compile(rule).is_err(), "{rule:?} should not compile");
    }
}

#[test]
fn test_compiling_twice_is_deterministic() {
    let rule = concat!(
        "matchAnySource('table') AND ",
        "(matchAnyOwnerName('user1') OR NOT matchUpdatedBy('bot'))"
    );
    let first = compile(rule).unwrap();
    let second = compile(rule).unwrap();
    assert_eq!(first, second);

    let events = [
        table_event(Some(USER1)),
        table_event(None),
        test_case_event("Failed"),
        ChangeEvent::new(EventType::EntityDeleted, "table", "bot"),
    ];
    for event in &events {
        assert_eq!(evaluate(&first, event), evaluate(&second, event));
    }
}

#[test]
fn test_precedence() {
    let event = ChangeEvent::new(EventType::EntityCreated, "table", "admin");

    // OR binds looser than AND: true OR (false AND false)
    assert!(eval(
        "matchAnySource('table') OR matchAnySource('x') AND matchAnySource('y')",
        &event
    ));
    // Grouping overrides: (true OR false) AND false
    assert!(!eval(
        "(matchAnySource('table') OR matchAnySource('x')) AND matchAnySource('y')",
        &event
    ));
    // NOT applies to the nearest operand only
    assert!(eval(
        "NOT matchAnySource('x') AND matchAnySource('table')",
        &event
    ));
    assert!(!eval(
        "NOT (matchAnySource('x') OR matchAnySource('table'))",
        &event
    ));
}

#[test]
fn test_short_circuit_skips_owner_lookup() {
    // No payload at all: the owner side could never be resolved.
    let event = ChangeEvent::new(EventType::EntityCreated, "topic", "admin");
    let expr = compile("matchAnySource('x') AND matchAnyOwnerName('y')").unwrap();

    let context = EvaluationContext::new(&event);
    assert!(!context.evaluate(&expr));
    assert_eq!(context.predicate_calls(), 1);
}

#[test]
fn test_no_state_leaks_between_evaluations() {
    let expr = compile("matchAnyOwnerName('user1') AND matchAnySource('table')").unwrap();
    let owned = table_event(Some(USER1));
    let unowned = table_event(None);

    assert!(evaluate(&expr, &owned));
    assert!(!evaluate(&expr, &unowned));
    assert!(evaluate(&expr, &owned));
    assert!(!evaluate(&expr, &unowned));
}

#[test]
fn test_shared_expression_across_threads() {
    let expr =
        Arc::new(compile("matchTestResult('Failed') OR matchAnyOwnerName('user1')").unwrap());

    let verdicts: Vec<bool> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let expr = Arc::clone(&expr);
                scope.spawn(move || {
                    let event = match i % 3 {
                        0 => test_case_event("Failed"),
                        1 => table_event(Some(USER1)),
                        _ => test_case_event("Success"),
                    };
                    (0..100).all(|_| evaluate(&expr, &event))
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for (i, verdict) in verdicts.into_iter().enumerate() {
        assert_eq!(verdict, i % 3 != 2, "thread {i}");
    }
}

#[test]
fn test_quoted_arguments() {
    let event = ChangeEvent::new(EventType::EntityUpdated, "table", "O'Brien");

    assert!(eval("matchUpdatedBy('O''Brien')", &event));
    assert!(eval("matchUpdatedBy(\"O'Brien\")", &event));
    assert!(!eval("matchUpdatedBy('OBrien')", &event));
}

#[test]
fn test_deeply_nested_rule_is_a_compile_error() {
    let parens = format!("{}true{}", "(".repeat(100_000), ")".repeat(100_000));
    let negations = format!("{}true", "NOT ".repeat(100_000));

    for rule in [parens, negations] {
        let err = compile(&rule).unwrap_err();
        assert!(matches!(err, CompileError::NestingTooDeep { .. }), "{err}");
    }
}
