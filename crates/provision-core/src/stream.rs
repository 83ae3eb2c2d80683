//! `Stream` adapters over resource states.

use futures::future;
use futures::stream::{Stream, StreamExt};

use crate::carryover::CombinePrevious;
use crate::query::Cacheable;
use crate::state::State;

/// Extension methods for streams of [`State`]s.
pub trait StateStreamExt<V, Q, F>: Stream<Item = State<V, Q, F>> + Sized
where
    Q: Cacheable,
    F: Clone,
{
    /// Run every state through a fresh [`CombinePrevious`] engine.
    ///
    /// # Example
    ///
    /// ```rust
    /// use futures::{executor::block_on, stream, StreamExt};
    /// use provision_core::{LoadImpulse, State, StateStreamExt};
    ///
    /// let impulse = LoadImpulse::initial();
    /// let input: Vec<State<&str, _, ()>> = vec![
    ///     State::from_value(impulse.clone(), "a"),
    ///     State::loading(impulse.clone(), None, None),
    /// ];
    ///
    /// let output: Vec<_> = block_on(stream::iter(input).combine_previous(true).collect());
    /// assert_eq!(output[1].value().map(|v| *v.value()), Some("a"));
    /// ```
    fn combine_previous(
        self,
        prefer_fallback_value_over_fallback_error: bool,
    ) -> impl Stream<Item = State<V, Q, F>> {
        self.scan(
            CombinePrevious::new(prefer_fallback_value_over_fallback_error),
            |engine, state| future::ready(Some(engine.next(&state))),
        )
    }
}

impl<S, V, Q, F> StateStreamExt<V, Q, F> for S
where
    S: Stream<Item = State<V, Q, F>> + Sized,
    Q: Cacheable,
    F: Clone,
{
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impulse::LoadImpulse;
    use crate::query::NoQuery;
    use futures::stream;

    #[tokio::test]
    async fn test_combine_previous_stream() {
        let impulse = LoadImpulse::initial();
        let input: Vec<State<&str, NoQuery, u8>> = vec![
            State::failure(impulse.clone(), 1, None),
            State::not_ready(),
            State::loading(impulse.clone(), None, None),
        ];

        let output: Vec<_> = stream::iter(input).combine_previous(true).collect().await;
        assert_eq!(output.len(), 3);
        assert!(output[1].is_not_ready());
        assert_eq!(output[2], State::loading(impulse, None, None));
    }
}
