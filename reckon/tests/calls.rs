//! Function calls: binding actuals to formals, frames, and non-local exits.

mod common;

use common::*;
use pretty_assertions::assert_eq;
use reckon::binding::BindingKind;
use reckon::*;

fn seen_member(name: &str) -> VarRef {
    VarRef::id("seen").member(name)
}

/// A body that copies its parameters into the global `seen` object.
fn recorder() -> NodeRef {
    block(vec![
        assign(seen_member("a"), id("a")),
        assign(seen_member("b"), id("b")),
        assign(seen_member("rest"), id("rest")),
        assign(seen_member("count"), id("_#")),
        assign(seen_member("all"), id("_*")),
    ])
}

/// Defines `f(a, b = 10, rest...)` and the global `seen`.
fn setup() -> (Runtime, Toy) {
    init_tracing();
    let mut rt = Runtime::empty();

    let mut params = FormalParameterList::new();
    params.add("a", None, false).unwrap();
    params.add("b", Some(lit(10)), false).unwrap();
    params.add_variadic(Some("rest"), false).unwrap();
    rt.define_function(Function::new("f", params, recorder()))
        .unwrap();
    rt.define_var("seen", Value::Null).unwrap();

    (rt, Toy::default())
}

fn define(rt: &mut Runtime, name: &str, formals: &[&str], body: NodeRef) {
    let mut params = FormalParameterList::new();
    for formal in formals {
        params.add(formal, None, false).unwrap();
    }
    rt.define_function(Function::new(name, params, body)).unwrap();
}

fn call_named(rt: &mut Runtime, toy: &mut Toy, name: &str, actuals: Vec<Actual>) -> ReckonResult {
    rt.resolve(toy, &VarRef::id(name).call(actuals), Mode::Lenient)
}

fn seen(rt: &Runtime, name: &str) -> Value {
    match rt.var("seen").unwrap() {
        Value::Map(map) => map.borrow().get(name, false).unwrap_or_default(),
        other => panic!("seen is not an object: {}", other),
    }
}

fn pos(value: i32) -> Actual {
    Actual::positional(lit(value))
}

#[test]
fn test_named_then_positional() {
    let (mut rt, mut toy) = setup();
    let actuals = vec![Actual::named("b", lit(5)), pos(1), pos(2), pos(3)];
    call_named(&mut rt, &mut toy, "f", actuals).unwrap();

    assert_eq!(seen(&rt, "a"), Value::from(1));
    assert_eq!(seen(&rt, "b"), Value::from(5));
    assert_eq!(elements(&seen(&rt, "rest")), vec![Value::from(2), Value::from(3)]);
    assert_eq!(seen(&rt, "count"), Value::from(4));
    assert_eq!(
        elements(&seen(&rt, "all")),
        vec![Value::from(1), Value::from(5), Value::from(2), Value::from(3)]
    );
    assert_eq!(rt.scope_level(), 0);
}

#[test]
fn test_defaults() {
    let (mut rt, mut toy) = setup();
    call_named(&mut rt, &mut toy, "f", vec![pos(1)]).unwrap();

    assert_eq!(seen(&rt, "a"), Value::from(1));
    assert_eq!(seen(&rt, "b"), Value::from(10));
    assert_eq!(elements(&seen(&rt, "rest")), Vec::<Value>::new());
    assert_eq!(seen(&rt, "count"), Value::from(2));
}

#[test]
fn test_omitted_actual_takes_default() {
    let (mut rt, mut toy) = setup();
    let actuals = vec![pos(1), Actual::empty(), pos(3)];
    call_named(&mut rt, &mut toy, "f", actuals).unwrap();

    assert_eq!(seen(&rt, "b"), Value::from(10));
    assert_eq!(elements(&seen(&rt, "rest")), vec![Value::from(3)]);
}

#[test]
fn test_single_empty_actual_is_no_actuals() {
    let (mut rt, mut toy) = setup();
    call_named(&mut rt, &mut toy, "f", vec![Actual::empty()]).unwrap();
    assert_eq!(seen(&rt, "a"), Value::Null);
    assert_eq!(seen(&rt, "b"), Value::from(10));
    assert_eq!(elements(&seen(&rt, "rest")), Vec::<Value>::new());

    // A variadic-only function sees no parameters at all.
    let mut params = FormalParameterList::new();
    params.add_variadic(None, false).unwrap();
    rt.define_function(Function::new("v", params, leave(Some(id("_#")), None)))
        .unwrap();
    assert_eq!(
        call_named(&mut rt, &mut toy, "v", vec![Actual::empty()]),
        Ok(Value::from(0))
    );

    // So does a function with no parameters, rather than rejecting one argument.
    define(&mut rt, "g", &[], lit("ok"));
    assert_eq!(
        call_named(&mut rt, &mut toy, "g", vec![Actual::empty()]),
        Ok(Value::from("ok"))
    );
}

#[test]
fn test_unknown_parameter_name() {
    let (mut rt, mut toy) = setup();
    let result = call_named(&mut rt, &mut toy, "f", vec![pos(1), Actual::named("c", lit(2))]);
    assert!(ex_match(
        &result,
        ErrorKind::UnknownParameter {
            function: "f".into(),
            names: "c".into()
        }
    ));
    assert_eq!(rt.scope_level(), 0);
    assert_eq!(rt.var("seen"), Ok(Value::Null));
}

#[test]
fn test_duplicate_named_actual() {
    let (mut rt, mut toy) = setup();
    let actuals = vec![Actual::named("a", lit(1)), Actual::named("a", lit(2))];
    let result = call_named(&mut rt, &mut toy, "f", actuals);
    assert!(ex_match(&result, ErrorKind::DuplicateParameter("a".into())));
}

#[test]
fn test_too_many_actuals() {
    let (mut rt, mut toy) = setup();
    define(&mut rt, "one", &["x"], id("x"));
    define(&mut rt, "two", &["x", "y"], id("x"));

    assert!(ex_match(
        &call_named(&mut rt, &mut toy, "one", vec![pos(1), pos(2)]),
        ErrorKind::TooManyArgsOne {
            function: "one".into(),
            given: 2
        }
    ));
    assert!(ex_match(
        &call_named(&mut rt, &mut toy, "two", vec![pos(1), pos(2), pos(3)]),
        ErrorKind::TooManyArgs {
            function: "two".into(),
            expected: 2,
            given: 3
        }
    ));
    assert_eq!(rt.scope_level(), 0);
}

#[test]
fn test_default_sees_earlier_parameters() {
    let (mut rt, mut toy) = setup();
    let mut params = FormalParameterList::new();
    params.add("a", None, false).unwrap();
    params.add("b", Some(add(id("a"), lit(1))), false).unwrap();
    rt.define_function(Function::new("k", params, id("b"))).unwrap();

    assert_eq!(call_named(&mut rt, &mut toy, "k", vec![pos(5)]), Ok(Value::from(6)));
}

#[test]
fn test_signature() {
    let (rt, _) = setup();
    let Value::Function(f) = rt.var("f").unwrap() else {
        panic!("f is not a function");
    };
    assert_eq!(f.signature(), "f(a, b = 10, rest...)");
}

#[test]
fn test_parameters_are_read_only_unless_var() {
    let (mut rt, mut toy) = setup();
    define(&mut rt, "fixed", &["a"], assign(VarRef::id("a"), lit(2)));
    assert!(ex_match(
        &call_named(&mut rt, &mut toy, "fixed", vec![pos(1)]),
        ErrorKind::ConstantAssign("a".into())
    ));

    let mut params = FormalParameterList::new();
    params.add("a", None, true).unwrap();
    let body = block(vec![assign(VarRef::id("a"), lit(2)), id("a")]);
    rt.define_function(Function::new("loose", params, body)).unwrap();
    assert_eq!(
        call_named(&mut rt, &mut toy, "loose", vec![pos(1)]),
        Ok(Value::from(2))
    );
}

#[test]
fn test_parameter_array_is_frozen() {
    let (mut rt, mut toy) = setup();
    define(
        &mut rt,
        "poke",
        &["a"],
        assign(VarRef::id("_*").index(lit(0)), lit(9)),
    );

    let result = call_named(&mut rt, &mut toy, "poke", vec![pos(1)]);
    assert!(matches!(
        result.as_ref().map_err(|e| e.kind()),
        Err(Some(ErrorKind::Immutable { .. }))
    ));
}

#[test]
fn test_function_name_is_constant_in_its_frame() {
    let (mut rt, mut toy) = setup();
    define(&mut rt, "me", &[], assign(VarRef::id("me"), lit(1)));
    assert!(ex_match(
        &call_named(&mut rt, &mut toy, "me", vec![]),
        ErrorKind::ConstantAssign("me".into())
    ));
    assert!(rt.var("me").unwrap().is_callable());
}

#[test]
fn test_frame_sees_callers_scope() {
    let (mut rt, mut toy) = setup();
    define(&mut rt, "peek", &[], id("local"));

    rt.push_scope(BindingKind::If);
    rt.define_var("local", Value::from(7)).unwrap();
    assert_eq!(call_named(&mut rt, &mut toy, "peek", vec![]), Ok(Value::from(7)));
    rt.pop_scope();

    assert_eq!(call_named(&mut rt, &mut toy, "peek", vec![]), Ok(Value::Null));
}

#[test]
fn test_locals_are_discarded() {
    let (mut rt, mut toy) = setup();
    let mut params = FormalParameterList::new();
    params.add("x", None, false).unwrap();
    let body = block(vec![
        assign(VarRef::id("tmp"), add(id("x"), lit(1))),
        id("tmp"),
    ]);
    rt.define_function(Function::new("inc", params, body)).unwrap();

    assert_eq!(call_named(&mut rt, &mut toy, "inc", vec![pos(1)]), Ok(Value::from(2)));
    assert!(!rt.var_exists("tmp"));
    assert!(!rt.var_exists("x"));
}

#[test]
fn test_positional_names_outside_functions() {
    let (rt, _) = setup();
    assert!(ex_match(&rt.var("_0"), ErrorKind::LocalNotAvailable("_0".into())));
    assert_eq!(rt.var("$#"), Ok(Value::from(0)));
}

//------------------------------------------------------------------------------------------------
// Non-local exits

#[test]
fn test_leave_supplies_the_result() {
    let (mut rt, mut toy) = setup();
    define(&mut rt, "early", &[], block(vec![leave(Some(lit(42)), None), lit(0)]));
    define(&mut rt, "bare", &[], leave(None, None));

    assert_eq!(call_named(&mut rt, &mut toy, "early", vec![]), Ok(Value::from(42)));
    assert_eq!(call_named(&mut rt, &mut toy, "bare", vec![]), Ok(Value::Null));
}

#[test]
fn test_escaping_signals_are_errors() {
    let (mut rt, mut toy) = setup();
    define(&mut rt, "lost", &[], leave(Some(lit(1)), Some("outer")));
    define(&mut rt, "skip", &[], next());

    assert!(ex_match(
        &call_named(&mut rt, &mut toy, "lost", vec![]),
        ErrorKind::Message("invoked \"leave outer\" outside of a matching block".into())
    ));
    assert!(ex_match(
        &call_named(&mut rt, &mut toy, "skip", vec![]),
        ErrorKind::Message("invoked \"next\" outside of a loop".into())
    ));
    assert_eq!(rt.scope_level(), 0);
}

#[test]
fn test_recursion_limit() {
    let (mut rt, mut toy) = setup();
    rt.set_recursion_limit(50);
    define(&mut rt, "forever", &[], call("forever", vec![]));

    assert!(ex_match(
        &call_named(&mut rt, &mut toy, "forever", vec![]),
        ErrorKind::RecursionLimit
    ));
    assert_eq!(rt.scope_level(), 0);

    // The runtime is still usable.
    define(&mut rt, "fine", &[], lit(1));
    assert_eq!(call_named(&mut rt, &mut toy, "fine", vec![]), Ok(Value::from(1)));
}

//------------------------------------------------------------------------------------------------
// Builtins

fn sum(_rt: &mut Runtime, args: &[Value]) -> ReckonResult {
    let mut total = 0;
    for arg in args {
        total += arg
            .as_index()
            .ok_or_else(|| Exception::message("sum needs integers"))?;
    }
    reckon_ok!(total)
}

fn config(_rt: &mut Runtime, _args: &[Value]) -> ReckonResult {
    let mut map = Mapping::new();
    map.set("depth", false, Value::from(3))?;
    Ok(Value::map(map))
}

#[test]
fn test_native_call() {
    let (mut rt, mut toy) = setup();
    rt.define_native("sum", sum).unwrap();

    assert_eq!(
        call_named(&mut rt, &mut toy, "sum", vec![pos(1), pos(2), pos(3)]),
        Ok(Value::from(6))
    );
    assert_eq!(call_named(&mut rt, &mut toy, "sum", vec![Actual::empty()]), Ok(Value::from(0)));
    assert!(ex_match(
        &call_named(&mut rt, &mut toy, "sum", vec![Actual::named("x", lit(1))]),
        ErrorKind::UnknownParameter {
            function: "sum".into(),
            names: "x".into()
        }
    ));
}

#[test]
fn test_native_is_called_when_selected_through() {
    let (mut rt, mut toy) = setup();
    rt.define_native("config", config).unwrap();

    let depth = VarRef::id("config").member("depth");
    assert_eq!(rt.resolve(&mut toy, &depth, Mode::Strict), Ok(Value::from(3)));
    assert!(rt.var("config").unwrap().is_callable());
}

#[test]
fn test_calling_a_non_function() {
    let (mut rt, mut toy) = setup();
    rt.set_var("n", Value::from(1)).unwrap();
    assert!(ex_match(
        &call_named(&mut rt, &mut toy, "n", vec![]),
        ErrorKind::NotCallable("n".into())
    ));
}
