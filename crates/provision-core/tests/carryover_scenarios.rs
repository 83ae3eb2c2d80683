//! Carryover scenarios: input sequences and the states they must yield.

use provision_core::{Cacheable, CombinePrevious, IdentityBox, LoadImpulse, LoadImpulseKind, State};

#[derive(Debug, Clone, PartialEq)]
struct Account(&'static str);

impl Cacheable for Account {
    fn is_cache_compatible(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

type TestState = State<&'static str, Account, u32>;

struct Fixture {
    impulse: LoadImpulse<Account>,
}

impl Fixture {
    fn new() -> Self {
        Self {
            impulse: LoadImpulse::new(Account("main"), LoadImpulseKind::INITIAL),
        }
    }

    fn success(&self, value: &'static str) -> TestState {
        TestState::success(self.impulse.clone(), IdentityBox::new(value), None)
    }

    fn error(&self, code: u32) -> TestState {
        TestState::failure(self.impulse.clone(), code, None)
    }

    fn loading(&self) -> TestState {
        TestState::loading(self.impulse.clone(), None, None)
    }
}

fn run(input: &[TestState], prefer_fallback_value: bool) -> Vec<TestState> {
    let mut engine = CombinePrevious::new(prefer_fallback_value);
    input.iter().map(|state| engine.next(state)).collect()
}

#[test]
fn success_then_loading() {
    let f = Fixture::new();
    let s = f.success("a");
    let l = f.loading();

    let output = run(&[s.clone(), l.clone()], true);
    assert_eq!(output, vec![s.clone(), l.with_value(s.value().cloned())]);
}

#[test]
fn error_then_loading() {
    let f = Fixture::new();
    let e = f.error(1);
    let l = f.loading();

    let output = run(&[e.clone(), l.clone()], true);
    assert_eq!(output, vec![e, l.with_error(Some(1))]);
}

#[test]
fn success_error_loading_respects_preference() {
    let f = Fixture::new();
    let s = f.success("a");
    let e = f.error(1);
    let l = f.loading();
    let input = [s.clone(), e.clone(), l.clone()];

    let preferring_value = run(&input, true);
    assert_eq!(
        preferring_value,
        vec![
            s.clone(),
            e.clone().with_value(s.value().cloned()),
            l.clone().with_value(s.value().cloned()),
        ]
    );

    let preferring_error = run(&input, false);
    assert_eq!(
        preferring_error,
        vec![s.clone(), e.with_value(s.value().cloned()), l.with_error(Some(1))]
    );
}

#[test]
fn success_error_success_loading() {
    let f = Fixture::new();
    let s1 = f.success("a");
    let e = f.error(1);
    let s2 = f.success("b");
    let l = f.loading();

    let output = run(&[s1.clone(), e.clone(), s2.clone(), l.clone()], true);
    assert_eq!(
        output,
        vec![
            s1.clone(),
            e.with_value(s1.value().cloned()),
            s2.clone(),
            l.with_value(s2.value().cloned()),
        ]
    );
}

#[test]
fn not_ready_disrupts_carryover() {
    let f = Fixture::new();
    let s = f.success("a");
    let e = f.error(1);
    let l = f.loading();

    let output = run(&[s.clone(), e.clone(), TestState::not_ready(), l.clone()], true);
    assert_eq!(
        output,
        vec![s.clone(), e.with_value(s.value().cloned()), TestState::not_ready(), l]
    );
}

#[test]
fn error_not_ready_success_does_not_leak() {
    let f = Fixture::new();
    let e = f.error(1);
    let s = f.success("a");

    let output = run(&[e.clone(), TestState::not_ready(), s.clone()], true);
    assert_eq!(output, vec![e, TestState::not_ready(), s]);
}

#[test]
fn error_then_success_has_no_fallbacks() {
    let f = Fixture::new();
    let e = f.error(1);
    let s = f.success("a");

    let output = run(&[e.clone(), s.clone()], true);
    assert_eq!(output, vec![e, s]);
}

#[test]
fn success_then_success_and_error_then_error() {
    let f = Fixture::new();
    let s1 = f.success("a");
    let s2 = f.success("b");
    assert_eq!(run(&[s1.clone(), s2.clone()], true), vec![s1, s2]);

    let e1 = f.error(1);
    let e2 = f.error(2);
    assert_eq!(run(&[e1.clone(), e2.clone()], true), vec![e1, e2]);
}

#[test]
fn success_with_stale_error_passes_through_as_error() {
    let f = Fixture::new();
    let value = IdentityBox::new("fresh");
    let stale = TestState::success(f.impulse.clone(), value.clone(), Some(9));

    let output = run(&[stale], true);
    // A cache-compatible error makes this an error result
    assert_eq!(output, vec![TestState::success(f.impulse.clone(), value, Some(9))]);
}

#[test]
fn feeding_same_result_twice_is_idempotent() {
    let f = Fixture::new();
    let s = f.success("a");
    let e = f.error(1);

    let mut engine = CombinePrevious::new(true);
    engine.next(&s);
    let first = engine.next(&e);
    let second = engine.next(&e);
    assert_eq!(first, second);

    let after = engine.next(&f.loading());
    assert_eq!(after.value(), s.value());
}
