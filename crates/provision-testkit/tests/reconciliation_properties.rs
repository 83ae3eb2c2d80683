//! Property tests for state reconciliation.

#![allow(clippy::unwrap_used, missing_docs)]

use std::collections::HashMap;

use proptest::prelude::*;
use provision_core::{
    combine_upstream_with_cache, Cacheable, CombinePrevious, LoadImpulse, LoadImpulseKind, State,
};
use provision_testkit::strategies::{arb_state_op, arb_state_ops, arb_test_query, StateOp};
use provision_testkit::{TestError, TestQuery, TestState};
use uuid::Uuid;

/// Where every value and error of a generated sequence came from.
#[derive(Default)]
struct Origins {
    values: HashMap<Uuid, TestQuery>,
    errors: HashMap<TestError, TestQuery>,
}

impl Origins {
    /// Materialize `op`, giving errors a unique message so they can be traced.
    fn record(&mut self, index: usize, op: &StateOp) -> TestState {
        let state = match op {
            StateOp::Failure { query, .. } => State::failure(
                LoadImpulse::new(query.clone(), LoadImpulseKind::INITIAL),
                TestError::Request(format!("error #{}", index)),
                None,
            ),
            other => other.to_state(),
        };
        if let Some(impulse) = state.load_impulse() {
            if let Some(value) = state.value() {
                self.values.insert(value.id(), impulse.query().clone());
            }
            if let Some(error) = state.error() {
                self.errors.insert(error.clone(), impulse.query().clone());
            }
        }
        state
    }

    fn assert_no_leak(&self, emitted: &TestState) -> Result<(), TestCaseError> {
        let Some(impulse) = emitted.load_impulse() else {
            prop_assert!(emitted.value().is_none() && emitted.error().is_none());
            return Ok(());
        };
        if let Some(value) = emitted.value() {
            let origin = &self.values[&value.id()];
            prop_assert!(
                origin.is_cache_compatible(impulse.query()),
                "value from {:?} surfaced for {:?}",
                origin,
                impulse.query()
            );
        }
        if let Some(error) = emitted.error() {
            let origin = &self.errors[error];
            prop_assert!(
                origin.is_cache_compatible(impulse.query()),
                "error from {:?} surfaced for {:?}",
                origin,
                impulse.query()
            );
        }
        Ok(())
    }
}

fn is_result_op(op: &StateOp) -> bool {
    matches!(op, StateOp::Success { .. } | StateOp::Failure { .. })
}

proptest! {
    #[test]
    fn carryover_never_leaks_incompatible_data(
        ops in arb_state_ops(24),
        prefer in any::<bool>()
    ) {
        let mut origins = Origins::default();
        let mut engine = CombinePrevious::new(prefer);
        for (index, op) in ops.iter().enumerate() {
            let state = origins.record(index, op);
            let emitted = engine.next(&state);
            origins.assert_no_leak(&emitted)?;
        }
    }

    #[test]
    fn combiner_never_leaks_incompatible_data(
        upstream in arb_state_op(),
        cached in arb_state_op(),
        query in arb_test_query()
    ) {
        let mut origins = Origins::default();
        let upstream = origins.record(0, &upstream);
        let cached = origins.record(1, &cached);
        let impulse = LoadImpulse::new(query, LoadImpulseKind::SYSTEM_REFRESH);

        let combined = combine_upstream_with_cache(&upstream, &cached, &impulse);
        origins.assert_no_leak(&combined)?;
        if !combined.is_not_ready() {
            prop_assert_eq!(combined.load_impulse(), Some(&impulse));
        }
    }

    #[test]
    fn compatible_upstream_value_wins_over_cache(
        query in arb_test_query(),
        cached in arb_state_op()
    ) {
        let impulse = LoadImpulse::new(query.clone(), LoadImpulseKind::USER_REFRESH);
        let upstream: TestState = State::from_value(
            LoadImpulse::new(query, LoadImpulseKind::INITIAL),
            "upstream".to_string(),
        );
        let combined = combine_upstream_with_cache(&upstream, &cached.to_state(), &impulse);
        prop_assert_eq!(combined.value(), upstream.value());
    }

    #[test]
    fn not_ready_resets_memory(
        prefix in arb_state_ops(16),
        query in arb_test_query(),
        prefer in any::<bool>()
    ) {
        let mut engine = CombinePrevious::new(prefer);
        for op in &prefix {
            engine.next(&op.to_state());
        }
        engine.next(&State::not_ready());

        let impulse = LoadImpulse::new(query, LoadImpulseKind::USER_REFRESH);
        let emitted = engine.next(&TestState::loading(impulse.clone(), None, None));
        prop_assert_eq!(emitted, TestState::loading(impulse, None, None));
    }

    #[test]
    fn repeated_result_is_idempotent(
        prefix in arb_state_ops(16),
        result in arb_state_op().prop_filter("result states only", is_result_op),
        query in arb_test_query()
    ) {
        let mut once = CombinePrevious::new(true);
        for op in &prefix {
            once.next(&op.to_state());
        }
        let result = result.to_state();
        let first = once.next(&result);

        let mut twice = once.clone();
        let second = twice.next(&result);
        prop_assert_eq!(&first, &second);

        let loading = TestState::loading(
            LoadImpulse::new(query, LoadImpulseKind::USER_REFRESH),
            None,
            None,
        );
        prop_assert_eq!(once.next(&loading), twice.next(&loading));
    }
}
