// Copyright 2026 TempoLight Project Authors. Licensed under Apache-2.0.

use std::collections::HashSet;

use futures::stream::{self, StreamExt};
use futures::Stream;

use super::error::{QueryError, Result};
use super::{
    BoxedExecutor, ChildResponse, LabelSet, RangeVector, METRIC_NAME_LABEL,
};

/// Label-based set operation over two groups of range vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOperator {
    /// Intersection. Non-standard edge inherited from the source engine: if
    /// the right side derives an *empty* join-key set, every left vector
    /// passes through unchanged instead of the result being empty.
    And,
    /// Union: all of the left side, then right vectors whose join key was
    /// not seen on the left.
    Or,
    /// Difference: left vectors whose join key is absent from the right.
    Unless,
}

/// The execution node joining two child groups by label-subset matching.
///
/// `on` restricts the join key to the named labels; `ignoring` drops the
/// named labels (plus `__name__`) from it. The two modes are mutually
/// exclusive.
pub struct SetOperatorExec {
    lhs: Vec<BoxedExecutor>,
    rhs: Vec<BoxedExecutor>,
    op: SetOperator,
    on: Vec<String>,
    ignoring: Vec<String>,
}

impl SetOperatorExec {
    pub fn try_new(
        lhs: Vec<BoxedExecutor>,
        rhs: Vec<BoxedExecutor>,
        op: SetOperator,
        on: Vec<String>,
        ignoring: Vec<String>,
    ) -> Result<Self> {
        if !on.is_empty() && !ignoring.is_empty() {
            return Err(QueryError::invalid_join(
                "cannot use 'on' and 'ignoring' at the same time",
            ));
        }
        if on.iter().any(|label| label == METRIC_NAME_LABEL) {
            return Err(QueryError::invalid_join(format!(
                "'on' must not contain the reserved label {}",
                METRIC_NAME_LABEL
            )));
        }
        Ok(Self {
            lhs,
            rhs,
            op,
            on,
            ignoring,
        })
    }

    /// Drive all children to completion and combine their outputs.
    pub async fn execute(mut self) -> Result<Vec<RangeVector>> {
        let lhs_len = self.lhs.len();
        let rhs_len = self.rhs.len();
        let children = std::mem::take(&mut self.lhs)
            .into_iter()
            .chain(std::mem::take(&mut self.rhs));
        let responses = stream::select_all(children.enumerate().map(|(index, child)| {
            child.map(move |response| (response, index)).boxed()
        }));
        self.compose(responses, lhs_len, rhs_len).await
    }

    /// Combine a finite stream of `(response, child index)` pairs, where
    /// indices `0..lhs_len` are left children and the rest right children.
    ///
    /// A child error short-circuits and propagates unchanged. Completion
    /// requires exactly `lhs_len + rhs_len` responses.
    pub async fn compose(
        &self,
        mut responses: impl Stream<Item = (ChildResponse, usize)> + Unpin,
        lhs_len: usize,
        rhs_len: usize,
    ) -> Result<Vec<RangeVector>> {
        let expected = lhs_len + rhs_len;
        let mut slots: Vec<Vec<RangeVector>> = (0..expected).map(|_| Vec::new()).collect();
        let mut received = 0;
        while let Some((response, index)) = responses.next().await {
            match response {
                ChildResponse::Error(error) => return Err(error),
                ChildResponse::Data(result) => {
                    let slot = slots.get_mut(index).ok_or_else(|| {
                        QueryError::bad_query(format!(
                            "response from unknown child plan {}",
                            index
                        ))
                    })?;
                    slot.extend(result.range_vectors);
                    received += 1;
                }
            }
        }
        if received != expected {
            return Err(QueryError::InsufficientResponses {
                expected,
                actual: received,
            });
        }

        let rhs_vectors: Vec<_> = slots.split_off(lhs_len).into_iter().flatten().collect();
        let lhs_vectors: Vec<_> = slots.into_iter().flatten().collect();
        Ok(match self.op {
            SetOperator::And => self.set_op_and(lhs_vectors, &rhs_vectors),
            SetOperator::Or => self.set_op_or(lhs_vectors, rhs_vectors),
            SetOperator::Unless => self.set_op_unless(lhs_vectors, &rhs_vectors),
        })
    }

    /// The label subset a range vector is matched on.
    fn join_key(&self, labels: &LabelSet) -> LabelSet {
        let keep = |key: &str| {
            if !self.on.is_empty() {
                self.on.iter().any(|label| label == key)
            } else {
                key != METRIC_NAME_LABEL && !self.ignoring.iter().any(|label| label == key)
            }
        };
        labels
            .iter()
            .filter(|(key, _)| keep(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    fn set_op_and(&self, lhs: Vec<RangeVector>, rhs: &[RangeVector]) -> Vec<RangeVector> {
        // an empty join key must not match everything
        let rhs_keys: HashSet<LabelSet> = rhs
            .iter()
            .map(|rv| self.join_key(&rv.labels))
            .filter(|key| !key.is_empty())
            .collect();
        lhs.into_iter()
            .filter(|rv| rhs_keys.is_empty() || rhs_keys.contains(&self.join_key(&rv.labels)))
            .collect()
    }

    fn set_op_or(&self, lhs: Vec<RangeVector>, rhs: Vec<RangeVector>) -> Vec<RangeVector> {
        let lhs_keys: HashSet<LabelSet> =
            lhs.iter().map(|rv| self.join_key(&rv.labels)).collect();
        let mut result = lhs;
        result.extend(
            rhs.into_iter()
                .filter(|rv| !lhs_keys.contains(&self.join_key(&rv.labels))),
        );
        result
    }

    fn set_op_unless(&self, lhs: Vec<RangeVector>, rhs: &[RangeVector]) -> Vec<RangeVector> {
        let rhs_keys: HashSet<LabelSet> =
            rhs.iter().map(|rv| self.join_key(&rv.labels)).collect();
        lhs.into_iter()
            .filter(|rv| !rhs_keys.contains(&self.join_key(&rv.labels)))
            .collect()
    }
}
