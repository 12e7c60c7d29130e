//! The predefined constants and their background computation.

#![cfg(feature = "constants")]

mod common;

use common::*;
use pretty_assertions::assert_eq;
use reckon::constants::ConstantProvider;
use reckon::*;
use std::sync::Arc;
use std::thread;

const PI_20: &str = "3.1415926535897932385";
const PI_50: &str = "3.1415926535897932384626433832795028841971693993751";
const PI_100: &str = "3.141592653589793238462643383279502884197169399375105820974944592307816406286208998628034825342117068";

#[test]
fn test_each_precision_is_computed_once() {
    init_tracing();
    let mut rt = Runtime::new();
    assert_eq!(rt.constants().precision(), Some(34));
    assert_eq!(rt.constants().computations(), 1);

    rt.set_settings(rt.settings().with_precision(50));
    let first = rt.var("pi").unwrap();
    let second = rt.var("pi").unwrap();
    assert_eq!(first.to_string(), PI_50);
    assert_eq!(first, second);
    assert_eq!(rt.constants().computations(), 2);

    rt.set_settings(rt.settings().with_precision(100));
    assert_eq!(rt.var("pi").unwrap().to_string(), PI_100);
    assert_eq!(rt.constants().computations(), 3);
}

#[test]
fn test_precision_from_settings_object() {
    init_tracing();
    let mut rt = Runtime::new();
    let mut toy = Toy::default();

    let precision = VarRef::id("settings").member("precision");
    rt.assign(&mut toy, &precision, Value::from(20)).unwrap();
    assert_eq!(rt.settings().precision, 20);
    assert_eq!(rt.var("π").unwrap().to_string(), PI_20);

    assert!(rt.assign(&mut toy, &precision, Value::from(-1)).is_err());
    assert_eq!(rt.settings().precision, 20);
}

#[test]
fn test_precision_beyond_the_maximum_is_rejected() {
    init_tracing();
    let mut rt = Runtime::new();
    let mut toy = Toy::default();

    let precision = VarRef::id("settings").member("precision");
    for digits in [u32::MAX as ReckonInt, ReckonInt::MAX] {
        assert!(rt.assign(&mut toy, &precision, Value::from(digits)).is_err());
    }
    assert_eq!(rt.settings().precision, 34);
    assert_eq!(rt.constants().precision(), Some(34));
    assert_eq!(
        rt.var("e").unwrap().to_string(),
        "2.718281828459045235360287471352662"
    );
}

#[test]
fn test_e_and_rational_mode() {
    init_tracing();
    let mut rt = Runtime::new();
    assert_eq!(
        rt.var("e").unwrap().to_string(),
        "2.718281828459045235360287471352662"
    );

    rt.set_settings(rt.settings().with_precision(5).with_rational(true));
    assert_eq!(rt.var("pi").unwrap().to_string(), "3927/1250");
}

#[test]
fn test_constants_are_read_only() {
    init_tracing();
    let mut rt = Runtime::new();
    assert!(ex_match(
        &rt.set_var("pi", Value::from(3)),
        ErrorKind::ConstantAssign("pi".into())
    ));
}

#[test]
fn test_readers_wait_for_the_new_precision() {
    init_tracing();
    let provider = Arc::new(ConstantProvider::new(50));
    assert!(provider.request(100));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let provider = Arc::clone(&provider);
            thread::spawn(move || provider.pi(100, false).unwrap().to_string())
        })
        .collect();

    for reader in readers {
        assert_eq!(reader.join().unwrap(), PI_100);
    }
    assert_eq!(provider.computations(), 2);
}

#[test]
fn test_readers_at_different_precisions() {
    init_tracing();
    let provider = Arc::new(ConstantProvider::new(20));

    let readers: Vec<_> = (0..6)
        .map(|i| {
            let provider = Arc::clone(&provider);
            thread::spawn(move || {
                let (digits, expected) = match i % 3 {
                    0 => (20, PI_20),
                    1 => (50, PI_50),
                    _ => (100, PI_100),
                };
                for _ in 0..5 {
                    assert_eq!(provider.pi(digits, false).unwrap().to_string(), expected);
                }
            })
        })
        .collect();

    for reader in readers {
        reader.join().unwrap();
    }
}
