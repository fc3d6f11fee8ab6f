// Copyright 2026 TempoLight Project Authors. Licensed under Apache-2.0.

//! TempoLight is the in-memory ingestion and chunking core of a distributed
//! time-series store.
//!
//! It accepts an append-only stream of rows addressed by a three-level key
//! (partition, segment, row key), stages them in a columnar [`memtable`],
//! and converts them into immutable fixed-size chunks of encoded
//! [`vector`]s optimized for O(1) random access. A sorted row index maps
//! every ingested row key to its physical `(chunk, row)` locator.
//!
//! On the query side, the [`executor`] module provides the set-operator
//! node that joins range vectors produced by child plans by label-subset
//! matching (`and` / `or` / `unless`).

#![deny(unused_must_use)]

pub mod executor;
pub mod memtable;
pub mod types;
pub mod vector;
