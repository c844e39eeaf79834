//! Tests for the dispatcher registry and its four dispatch strategies
//!
//! # Test Coverage
//!
//! - Registration: explicit keys, anonymous slots, replacement in place
//! - Default policies: none, fixed, auto-bound to the first registration
//! - `dispatch_to_key` three-tier fallback and handler failures
//! - `dispatch_to_first`, `dispatch_to_all` and `dispatch_to_pipe`
//! - `dispatch_to_matching` over registered key patterns
//! - Computed candidates evaluated with live arguments
//! - Curried handles and delegate objects

mod common;

use brrtdispatch::dispatcher::{
    Broadcast, Candidate, DefaultPolicy, DispatchError, Dispatcher, Handler, Invocable, Key,
    ReturnKeys, Slot,
};
use common::test_tracing;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn double(x: i64) -> Result<i64, String> {
    Ok(x * 2)
}

fn square(x: i64) -> Result<i64, String> {
    Ok(x * x)
}

fn negate(x: i64) -> Result<i64, String> {
    Ok(-x)
}

fn fail(x: i64) -> Result<i64, String> {
    Err(format!("cannot handle {x}"))
}

fn arithmetic() -> Dispatcher<i64, i64, String> {
    let mut d = Dispatcher::new(DefaultPolicy::None);
    d.register("double", double);
    d.register("square", square);
    d.register("negate", negate);
    d
}

fn lit(key: &str) -> Candidate<i64> {
    Candidate::from(key)
}

// ============================================================================
// Registration
// ============================================================================

#[test]
fn test_registered_key_is_dispatched_exactly_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let mut d: Dispatcher<i64, i64, String> = Dispatcher::new(DefaultPolicy::None);
    d.register("count", move |x: i64| -> Result<i64, String> {
        seen.fetch_add(1, Ordering::SeqCst);
        Ok(x + 1)
    });

    assert!(d.is_dispatchable(&lit("count"), &0));
    assert_eq!(d.dispatch_to_key("count", 41, None), Ok(42));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_reregistration_replaces_handler_in_place() {
    let (logs, _guard) = test_tracing::capture();
    let mut d = arithmetic();
    d.register("double", square);

    let keys: Vec<String> = d.keys().map(Key::to_string).collect();
    assert_eq!(keys, vec!["double", "square", "negate"]);
    assert_eq!(d.dispatch_to_key("double", 5, None), Ok(25));
    assert_eq!(d.len(), 3);
    assert!(logs.contains("Replaced existing handler"));
}

#[test]
fn test_auto_slots_are_numeric_and_increasing() {
    let mut d: Dispatcher<i64, i64, String> = Dispatcher::new(DefaultPolicy::None);
    assert_eq!(d.register(Slot::Auto, double), Key::Int(0));
    assert_eq!(d.register(Slot::Auto, square), Key::Int(1));
    assert_eq!(d.register(7_i64, negate), Key::Int(7));
    assert_eq!(d.register(Slot::Auto, double), Key::Int(8));
    assert_eq!(d.register("named", double), Key::from("named"));
    assert_eq!(d.register(Slot::Auto, double), Key::Int(9));

    assert_eq!(d.dispatch_to_key(1_i64, 4, None), Ok(16));
}

#[test]
fn test_auto_slot_never_overwrites_max_key() {
    let mut d: Dispatcher<i64, &'static str, String> = Dispatcher::default();
    d.register(i64::MAX, |_: i64| -> Result<&'static str, String> { Ok("max") });
    d.register(0_i64, |_: i64| -> Result<&'static str, String> { Ok("zero") });

    let anon = d.register(Slot::Auto, |_: i64| -> Result<&'static str, String> { Ok("anon") });
    assert_eq!(anon, Key::Int(1));
    assert_eq!(d.len(), 3);
    assert_eq!(d.dispatch_to_key(i64::MAX, 0, None), Ok("max"));
    assert_eq!(d.dispatch_to_key(anon, 0, None), Ok("anon"));
}

#[test]
fn test_auto_default_binds_first_registration() {
    let mut d: Dispatcher<i64, i64, String> = Dispatcher::new(DefaultPolicy::AutoFirstRegistered);
    assert_eq!(d.default_key(), None);

    d.register("square", square);
    d.register("double", double);
    assert_eq!(d.default_key(), Some(&Key::from("square")));
    assert_eq!(d.dispatch_to_key("missing", 3, None), Ok(9));
}

#[test]
fn test_auto_default_with_anonymous_first_is_zero() {
    let mut d: Dispatcher<i64, i64, String> = Dispatcher::new(DefaultPolicy::AutoFirstRegistered);
    d.register(Slot::Auto, negate);
    assert_eq!(d.default_key(), Some(&Key::Int(0)));
}

#[test]
fn test_with_handlers_preserves_order() {
    let d: Dispatcher<i64, i64, String> = Dispatcher::with_handlers(
        DefaultPolicy::Fixed(Key::from("b")),
        vec![
            ("a", double as fn(i64) -> Result<i64, String>),
            ("b", square),
        ],
    );
    let keys: Vec<Key> = d.keys().cloned().collect();
    assert_eq!(keys, vec![Key::from("a"), Key::from("b")]);
    assert_eq!(d.dispatch_to_key("zzz", 4, None), Ok(16));
}

// ============================================================================
// dispatch_to_key
// ============================================================================

#[test]
fn test_explicit_default_beats_global_default() {
    let mut d: Dispatcher<i64, i64, String> =
        Dispatcher::new(DefaultPolicy::Fixed(Key::from("negate")));
    d.register("double", double);
    d.register("negate", negate);

    assert_eq!(d.dispatch_to_key("missing", 3, Some(lit("double"))), Ok(6));
    assert_eq!(d.dispatch_to_key("missing", 3, Some(lit("also-missing"))), Ok(-3));
    assert_eq!(d.dispatch_to_key("missing", 3, None), Ok(-3));
}

#[test]
fn test_undispatchable_without_defaults() {
    let d = arithmetic();
    let err = d.dispatch_to_key("missing", 3, None).unwrap_err();
    assert!(err.is_undispatchable());
    match err {
        DispatchError::Undispatchable(e) => assert_eq!(e.requested.as_deref(), Some("missing")),
        DispatchError::Handler(e) => panic!("unexpected handler error {e}"),
    }
}

#[test]
fn test_handler_failure_is_not_undispatchable() {
    let mut d = arithmetic();
    d.register("fail", fail);
    let err = d.dispatch_to_key("fail", 1, Some(lit("double"))).unwrap_err();
    assert_eq!(err.into_handler_error(), Some("cannot handle 1".to_string()));
}

#[test]
fn test_computed_candidate_uses_live_args() {
    let d = arithmetic();
    let pick = Candidate::computed(|x: &i64| {
        Some(Key::from(if *x < 0 { "negate" } else { "square" }))
    });

    assert_eq!(d.dispatch_to_key(pick.clone(), -4, None), Ok(4));
    assert_eq!(d.dispatch_to_key(pick, 4, None), Ok(16));
}

#[test]
fn test_computed_candidate_resolving_to_nothing_falls_back() {
    let d = arithmetic();
    let nothing = Candidate::computed(|_: &i64| None);
    assert!(!d.is_dispatchable(&nothing, &1));
    assert_eq!(d.dispatch_to_key(nothing, 5, Some(lit("double"))), Ok(10));
}

// ============================================================================
// dispatch_to_first
// ============================================================================

#[test]
fn test_first_skips_unregistered() {
    let d = arithmetic();
    let keys = [lit("k1"), lit("square")];
    assert_eq!(d.dispatch_to_first(Some(&keys[..]), 3, None), Ok(9));
}

#[test]
fn test_first_none_registered_without_default_fails() {
    let d = arithmetic();
    let keys = [lit("k1"), lit("k2")];
    let err = d.dispatch_to_first(Some(&keys[..]), 3, None).unwrap_err();
    assert!(err.is_undispatchable());
}

#[test]
fn test_first_falls_back_to_explicit_default() {
    let d = arithmetic();
    let keys = [lit("k1"), lit("k2")];
    assert_eq!(d.dispatch_to_first(Some(&keys[..]), 3, Some(lit("negate"))), Ok(-3));
}

#[test]
fn test_first_defaults_to_registration_order() {
    let d = arithmetic();
    assert_eq!(d.dispatch_to_first(None, 3, None), Ok(6));
}

#[test]
fn test_first_skips_computed_absent() {
    let d = arithmetic();
    let keys = [Candidate::computed(|_: &i64| None), lit("negate")];
    assert_eq!(d.dispatch_to_first(Some(&keys[..]), 3, None), Ok(-3));
}

// ============================================================================
// dispatch_to_all
// ============================================================================

#[test]
fn test_all_collects_every_result_in_order() {
    let d = arithmetic();
    let results = d
        .dispatch_to_all(None, 3, None, ReturnKeys::All)
        .unwrap()
        .into_map()
        .unwrap();
    let pairs: Vec<(String, i64)> = results.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
    assert_eq!(
        pairs,
        vec![
            ("double".to_string(), 6),
            ("square".to_string(), 9),
            ("negate".to_string(), -3)
        ]
    );
}

#[test]
fn test_all_single_return_key_absent_is_no_value() {
    let d = arithmetic();
    let keys = [lit("double")];
    let out = d
        .dispatch_to_all(Some(&keys[..]), 3, None, ReturnKeys::One(Key::from("square")))
        .unwrap();
    assert_eq!(out, Broadcast::One(None));
}

#[test]
fn test_all_return_keys_intersection() {
    let d = arithmetic();
    let keys = [lit("double"), lit("square")];
    let out = d
        .dispatch_to_all(
            Some(&keys[..]),
            3,
            None,
            ReturnKeys::Some(vec![Key::from("square"), Key::from("negate")]),
        )
        .unwrap()
        .into_map()
        .unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out.get(&Key::from("square")), Some(&9));
}

#[test]
fn test_all_missing_key_uses_default_under_requested_key() {
    let d = arithmetic();
    let keys = [lit("double"), lit("ghost")];
    let out = d
        .dispatch_to_all(Some(&keys[..]), 3, Some(lit("negate")), ReturnKeys::All)
        .unwrap()
        .into_map()
        .unwrap();
    assert_eq!(out.get(&Key::from("ghost")), Some(&-3));
}

#[test]
fn test_all_fails_when_a_key_is_undispatchable() {
    let d = arithmetic();
    let keys = [lit("double"), lit("ghost")];
    let err = d
        .dispatch_to_all(Some(&keys[..]), 3, None, ReturnKeys::All)
        .unwrap_err();
    assert!(err.is_undispatchable());
}

// ============================================================================
// dispatch_to_matching
// ============================================================================

fn routes_by_pattern() -> Dispatcher<i64, String, String> {
    let mut d = Dispatcher::new(DefaultPolicy::None);
    d.register("^user:[0-9]+$", |x: i64| -> Result<String, String> { Ok(format!("user {x}")) });
    d.register("^user:", |_: i64| -> Result<String, String> { Ok("any user".into()) });
    d.register("(unclosed", |_: i64| -> Result<String, String> { Ok("never".into()) });
    d.register("^order:", |x: i64| -> Result<String, String> { Ok(format!("order {x}")) });
    d
}

#[test]
fn test_matching_picks_first_pattern_in_registration_order() {
    let d = routes_by_pattern();
    assert_eq!(d.dispatch_to_matching("user:42", 1, None), Ok("user 1".to_string()));
    assert_eq!(d.dispatch_to_matching("user:ada", 1, None), Ok("any user".to_string()));
    assert_eq!(d.dispatch_to_matching("order:7", 3, None), Ok("order 3".to_string()));
}

#[test]
fn test_matching_reuses_compiled_patterns() {
    let d = routes_by_pattern();
    let first = d.key_patterns();
    let second = d.key_patterns();

    // The invalid pattern is left out both times.
    assert_eq!(first.len(), 3);
    let keys: Vec<&Key> = second.iter().map(|(k, _)| k).collect();
    assert_eq!(
        keys,
        vec![&Key::from("^user:[0-9]+$"), &Key::from("^user:"), &Key::from("^order:")]
    );
}

#[test]
fn test_matching_falls_back_to_defaults() {
    let d = routes_by_pattern();
    assert!(d
        .dispatch_to_matching("invoice:1", 0, None)
        .unwrap_err()
        .is_undispatchable());
    assert_eq!(
        d.dispatch_to_matching("invoice:1", 5, Some(Candidate::from("^order:"))),
        Ok("order 5".to_string())
    );

    let d: Dispatcher<i64, String, String> = Dispatcher::with_handlers(
        DefaultPolicy::Fixed(Key::from("fallback")),
        vec![("fallback", |_: i64| -> Result<String, String> { Ok("global".into()) })],
    );
    assert_eq!(d.dispatch_to_matching("nothing", 0, None), Ok("global".to_string()));
}

// ============================================================================
// dispatch_to_pipe
// ============================================================================

fn json_dispatcher() -> Dispatcher<Vec<Value>, Value, Infallible> {
    let mut d: Dispatcher<Vec<Value>, Value, Infallible> = Dispatcher::new(DefaultPolicy::None);
    d.register("pair", |args: Vec<Value>| -> Result<Value, Infallible> {
        Ok(json!([args[0], "b"]))
    });
    d.register("scalar", |args: Vec<Value>| -> Result<Value, Infallible> {
        Ok(json!(format!("x{}", args.len())))
    });
    d.register("list", |_: Vec<Value>| -> Result<Value, Infallible> {
        Ok(json!([[1, 2, 3]]))
    });
    d.register("args", |args: Vec<Value>| -> Result<Value, Infallible> {
        Ok(Value::Array(args))
    });
    d
}

#[test]
fn test_pipe_spreads_returned_list() {
    let d = json_dispatcher();
    let keys = [Candidate::from("pair"), Candidate::from("args")];
    let out = d.dispatch_to_pipe(Some(&keys[..]), vec![json!("a")], None).unwrap();
    assert_eq!(out, json!(["a", "b"]));
}

#[test]
fn test_pipe_passes_scalar_as_sole_argument() {
    let d = json_dispatcher();
    let keys = [Candidate::from("scalar"), Candidate::from("args")];
    let out = d.dispatch_to_pipe(Some(&keys[..]), vec![json!(1), json!(2)], None).unwrap();
    assert_eq!(out, json!(["x2"]));
}

#[test]
fn test_pipe_wrapped_list_is_one_argument() {
    let d = json_dispatcher();
    let keys = [Candidate::from("list"), Candidate::from("scalar")];
    let out = d.dispatch_to_pipe(Some(&keys[..]), vec![], None).unwrap();
    assert_eq!(out, json!("x1"));
}

#[test]
fn test_pipe_identity_spread() {
    let d = arithmetic();
    let keys = [lit("double"), lit("square"), lit("negate")];
    assert_eq!(d.dispatch_to_pipe(Some(&keys[..]), 3, None), Ok(-36));
}

#[test]
fn test_pipe_stage_fallback_and_failure() {
    let mut d = arithmetic();
    d.register("fail", fail);

    let keys = [lit("double"), lit("ghost")];
    assert_eq!(d.dispatch_to_pipe(Some(&keys[..]), 3, Some(lit("square"))), Ok(36));

    let keys = [lit("double"), lit("fail"), lit("square")];
    let err = d.dispatch_to_pipe(Some(&keys[..]), 3, None).unwrap_err();
    assert_eq!(err.into_handler_error(), Some("cannot handle 6".to_string()));
}

#[test]
fn test_empty_pipe_is_undispatchable() {
    let d = arithmetic();
    let none: [Candidate<i64>; 0] = [];
    let err = d.dispatch_to_pipe(Some(&none[..]), 3, None).unwrap_err();
    assert!(err.is_undispatchable());
}

// ============================================================================
// Handles and delegates
// ============================================================================

struct Greeter {
    greeting: String,
}

impl Greeter {
    fn greeting(&self) -> &str {
        &self.greeting
    }
}

impl Handler<String, String, Infallible> for Greeter {
    fn call(&self, name: String) -> Result<String, Infallible> {
        Ok(format!("{}, {name}", self.greeting))
    }
}

#[test]
fn test_key_handle_is_reusable() {
    let d = arithmetic();
    let handle = d.handler_for_key("missing", Some(lit("double")));
    assert_eq!(handle.invoke(2), Ok(4));
    assert_eq!(handle.invoke(5), Ok(10));
}

#[test]
fn test_first_all_and_pipe_handles() {
    let d = arithmetic();

    let first = d.handler_for_first(Some(vec![lit("nope"), lit("negate")]), None);
    assert_eq!(first.invoke(2), Ok(-2));

    let all = d.handler_for_all(None, None, ReturnKeys::One(Key::from("square")));
    assert_eq!(all.invoke(4).unwrap().into_one(), Some(16));

    let pipe = d.handler_for_pipe(Some(vec![lit("square"), lit("double")]), None);
    assert_eq!(pipe.invoke(3), Ok(18));
}

#[test]
fn test_handle_exposes_delegate_object() {
    let mut d: Dispatcher<String, String, Infallible> = Dispatcher::new(DefaultPolicy::None);
    d.register(
        "hello",
        Greeter {
            greeting: "Hello".to_string(),
        },
    );
    d.register(
        "hi",
        Greeter {
            greeting: "Hi".to_string(),
        },
    );

    let handle = d.handler_for_key("hi", None).delegating_to("hello");
    assert_eq!(handle.invoke("Ada".to_string()), Ok("Hi, Ada".to_string()));

    let delegate = handle.delegate::<Greeter>(&String::new()).unwrap().unwrap();
    assert_eq!(delegate.greeting(), "Hello");
    assert_eq!(d.delegate::<Greeter>(&Key::from("hi")).unwrap().greeting(), "Hi");
}

#[test]
fn test_handle_without_delegate_key() {
    let d = arithmetic();
    let handle = d.handler_for_key("double", None);
    assert!(handle.as_delegate(&0).unwrap().is_none());
}

#[test]
fn test_missing_delegate_is_undispatchable() {
    let d = arithmetic();
    let handle = d.handler_for_key("double", None).delegating_to("ghost");
    let err = handle.as_delegate(&0).unwrap_err();
    assert_eq!(err.requested.as_deref(), Some("ghost"));
}

#[test]
fn test_delegate_of_wrong_type_is_none() {
    let mut d: Dispatcher<String, String, Infallible> = Dispatcher::new(DefaultPolicy::None);
    d.register(
        "hello",
        Greeter {
            greeting: "Hello".to_string(),
        },
    );
    let handle = d.handler_for_key("hello", None).delegating_to("hello");
    assert!(handle.delegate::<String>(&String::new()).unwrap().is_none());
}
