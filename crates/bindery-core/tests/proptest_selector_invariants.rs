#![forbid(unsafe_code)]

//! Property tests for selector resolution.
//!
//! 1. Any spacing of an accepted selector resolves to the same identity.
//! 2. Resolution never panics on arbitrary input.
//! 3. Strings that are not a lone identifier or `|p| p.ident` never resolve.

use bindery_core::{BindError, Selector, bindable, resolve};
use proptest::prelude::*;

struct Panel;

bindable!(Panel {
    property heading: String,
    property width: u16,
    command close: (),
});

/// Leak a generated string so it can back a `&'static str` selector.
fn leak(expr: String) -> &'static str {
    Box::leak(expr.into_boxed_str())
}

fn spacing() -> impl Strategy<Value = String> {
    prop::collection::vec(prop_oneof![Just(' '), Just('\t'), Just('\n')], 0..3)
        .prop_map(|chars| chars.into_iter().collect())
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Whitespace never changes identity
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn spacing_is_irrelevant(
        a in spacing(),
        b in spacing(),
        c in spacing(),
        d in spacing(),
        param in "[a-z][a-z0-9_]{0,6}",
        member in prop_oneof![Just("heading"), Just("width"), Just("close")],
    ) {
        let canonical = resolve(&Selector::<Panel>::new(member)).unwrap();
        let closure = leak(format!("{a}|{b}{param}{c}|{d}{param}.{member}{a}"));
        let bare = leak(format!("{c}{member}{d}"));
        prop_assert_eq!(resolve(&Selector::<Panel>::new(closure)).unwrap(), canonical);
        prop_assert_eq!(resolve(&Selector::<Panel>::new(bare)).unwrap(), canonical);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Arbitrary input never panics
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn never_panics(expr in ".{0,40}") {
        let _ = Selector::<Panel>::new(leak(expr)).resolve();
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Computed expressions are rejected
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn computed_expressions_are_unsupported(
        member in prop_oneof![Just("heading"), Just("width")],
        suffix in prop_oneof![
            Just("()"),
            Just("[0]"),
            Just(".len()"),
            Just(" + 1"),
            Just(".inner"),
        ],
    ) {
        let expr = leak(format!("|v| v.{member}{suffix}"));
        let err = Selector::<Panel>::new(expr).resolve().unwrap_err();
        let is_unsupported = matches!(err, BindError::UnsupportedSelector { .. });
        prop_assert!(is_unsupported, "{}", err);
    }
}
