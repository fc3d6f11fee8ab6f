// Copyright 2026 TempoLight Project Authors. Licensed under Apache-2.0.

//! Query execution nodes over range vectors.
//!
//! A child execution plan is a boxed stream yielding exactly one
//! [`ChildResponse`]. Composite nodes consume their children as a merged
//! stream of `(response, child index)` pairs, so child completion order
//! does not matter while input order is preserved in the output.

use std::collections::BTreeMap;

use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::types::F64;

mod error;
mod scan;
mod set_op;

pub use error::{QueryError, Result};
pub use scan::MemtableScanExec;
pub use set_op::{SetOperator, SetOperatorExec};

/// Reserved metric-name label, never part of a join key.
pub const METRIC_NAME_LABEL: &str = "__name__";

/// Labels keying a range vector.
pub type LabelSet = BTreeMap<String, String>;

/// One point of a range vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: i64,
    pub value: F64,
}

impl Sample {
    pub fn new(timestamp: i64, value: f64) -> Self {
        Self {
            timestamp,
            value: value.into(),
        }
    }
}

/// A time-series result keyed by a label map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeVector {
    pub labels: LabelSet,
    pub samples: Vec<Sample>,
}

impl RangeVector {
    pub fn new(labels: LabelSet, samples: Vec<Sample>) -> Self {
        Self { labels, samples }
    }
}

/// The successful output of one child plan.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryResult {
    pub range_vectors: Vec<RangeVector>,
}

/// What a child plan sends upstream.
#[derive(Debug)]
pub enum ChildResponse {
    Data(QueryResult),
    Error(QueryError),
}

/// A running child plan.
pub type BoxedExecutor = BoxStream<'static, ChildResponse>;
