// Copyright 2026 TempoLight Project Authors. Licensed under Apache-2.0.

//! The columnar memtable.
//!
//! [`ChunkedMemtable`] stages incoming rows in a temporary buffer, flushes
//! them into fixed-size columnar chunks (synchronously when enough rows are
//! staged to fill the current chunk, or from a single-shot background
//! timer), and keeps a sorted row index from every ingested row key to its
//! packed `(chunk, row)` locator. Every chunk except possibly the last is
//! exactly `chunk_size` rows long; a sub-full last chunk is re-hydrated and
//! filled on the next flush.

use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use std::time::Duration;

use itertools::Itertools;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

mod builder;
mod chunk;
mod error;
mod index;
mod options;
mod projection;
mod scheduler;

pub use builder::ChunkBuilder;
pub use chunk::{Chunk, ChunkReader, ChunkStore, Locator, RowView};
pub use error::{MemtableError, MemtableResult};
pub use index::RowIndex;
pub use options::{MemtableOptions, CHUNK_SIZE_KEY, DEFAULT_CHUNK_SIZE, FLUSH_INTERVAL_KEY};
pub use projection::{ColumnDesc, Projection};

use scheduler::FlushScheduler;

use crate::types::{DataValue, Row};

/// A durability notification covering the staged rows `[first, last]`.
/// Fires at most once, after all of its rows are persisted into chunks, in
/// strict registration order.
struct PendingCallback {
    first: usize,
    last: usize,
    action: Box<dyn FnOnce() + Send>,
}

/// Everything the flush body mutates, under one exclusive lock: the lock
/// also makes `ingest`'s append-plus-register pair atomic with respect to
/// callback fire-and-shift.
struct Core {
    projection: Arc<Projection>,
    builder: ChunkBuilder,
    store: ChunkStore,
    index: RowIndex,
    staging: Vec<Row>,
    callbacks: VecDeque<PendingCallback>,
    /// Whether a flush timer is currently scheduled.
    flush_armed: bool,
}

/// Per-shard in-memory ingestion buffer producing immutable columnar
/// chunks.
///
/// Single-writer: one caller at a time may ingest, read and commit, while
/// the background flush timer races only for the core lock. Completion
/// callbacks run on whichever thread performs the flush and must not call
/// back into the memtable.
pub struct ChunkedMemtable {
    options: MemtableOptions,
    projection: Arc<Projection>,
    core: Arc<Mutex<Core>>,
    scheduler: FlushScheduler,
}

impl ChunkedMemtable {
    pub fn new(projection: Projection, options: MemtableOptions) -> MemtableResult<Self> {
        let projection = Arc::new(projection);
        let core = Arc::new(Mutex::new(Core {
            builder: ChunkBuilder::new(&projection, options.chunk_size)?,
            store: ChunkStore::new(projection.columns().clone()),
            index: RowIndex::new(),
            staging: Vec::new(),
            callbacks: VecDeque::new(),
            flush_armed: false,
            projection: projection.clone(),
        }));
        let weak = Arc::downgrade(&core);
        let chunk_size = options.chunk_size;
        let interval = options.flush_interval;
        let scheduler =
            FlushScheduler::spawn(move || timer_flush(&weak, chunk_size, interval));
        Ok(Self {
            options,
            projection,
            core,
            scheduler,
        })
    }

    pub fn projection(&self) -> &Arc<Projection> {
        &self.projection
    }

    pub fn options(&self) -> &MemtableOptions {
        &self.options
    }

    /// Append rows to the staging buffer and register `on_complete` for
    /// them. Flushes synchronously while enough rows are staged to fill the
    /// current chunk; otherwise arms the flush timer.
    ///
    /// On a flush error the staged rows (and the callback) survive for a
    /// later retry; chunks and index are untouched.
    pub fn ingest(
        &self,
        rows: Vec<Row>,
        on_complete: impl FnOnce() + Send + 'static,
    ) -> MemtableResult<()> {
        let mut core = self.core.lock();
        if rows.is_empty() {
            if core.staging.is_empty() {
                drop(core);
                // zero rows are trivially persisted
                on_complete();
                return Ok(());
            }
            // fires together with the previously staged rows
            let last = core.staging.len() - 1;
            let first = core.staging.len();
            core.callbacks.push_back(PendingCallback {
                first,
                last,
                action: Box::new(on_complete),
            });
            return Ok(());
        }

        let first = core.staging.len();
        core.staging.extend(rows);
        let last = core.staging.len() - 1;
        core.callbacks.push_back(PendingCallback {
            first,
            last,
            action: Box::new(on_complete),
        });

        while core.staging.len() >= rows_to_fill(&core, self.options.chunk_size) {
            if core.flush_armed {
                self.scheduler.cancel();
            }
            flush(&mut core, self.options.chunk_size)?;
        }
        if !core.staging.is_empty() && !core.flush_armed {
            core.flush_armed = true;
            self.scheduler.schedule(self.options.flush_interval);
        }
        Ok(())
    }

    /// Synchronously drain the staging buffer into chunks, cancelling any
    /// pending flush timer.
    pub fn force_commit(&self) -> MemtableResult<()> {
        let mut core = self.core.lock();
        if core.flush_armed {
            self.scheduler.cancel();
            core.flush_armed = false;
        }
        while !core.staging.is_empty() {
            flush(&mut core, self.options.chunk_size)?;
        }
        Ok(())
    }

    /// Persisted rows of one `(partition, segment)` in row-key order.
    pub fn read_rows(
        &self,
        partition: &DataValue,
        segment: &DataValue,
    ) -> MemtableResult<Vec<RowView>> {
        let core = self.core.lock();
        core.index
            .lookup(partition, segment)
            .map(|(_, locator)| view_at(&core.store, locator))
            .try_collect()
    }

    /// Persisted rows of the segments in `[segment_start, segment_end]` of
    /// one partition, in `(segment, row key)` order.
    pub fn read_range(
        &self,
        partition: &DataValue,
        segment_start: &DataValue,
        segment_end: &DataValue,
    ) -> MemtableResult<Vec<RowView>> {
        let core = self.core.lock();
        core.index
            .lookup_range(partition, segment_start, segment_end)
            .map(|(_, _, locator)| view_at(&core.store, locator))
            .try_collect()
    }

    /// Every persisted row of one partition, in `(segment, row key)` order.
    pub fn read_partition(&self, partition: &DataValue) -> MemtableResult<Vec<RowView>> {
        let core = self.core.lock();
        core.index
            .lookup_partition(partition)
            .map(|(_, _, locator)| view_at(&core.store, locator))
            .try_collect()
    }

    /// Every persisted row with its keys, in `(partition, segment, row
    /// key)` order.
    pub fn read_all_rows(
        &self,
    ) -> MemtableResult<Vec<(DataValue, DataValue, DataValue, RowView)>> {
        let core = self.core.lock();
        core.index
            .scan_all()
            .map(|(partition, segment, key, locator)| {
                Ok((
                    partition.clone(),
                    segment.clone(),
                    key.clone(),
                    view_at(&core.store, locator)?,
                ))
            })
            .try_collect()
    }

    /// Total rows persisted into chunks (excludes the staging buffer).
    pub fn num_rows(&self) -> usize {
        self.core.lock().store.num_rows()
    }

    pub fn num_chunks(&self) -> usize {
        self.core.lock().store.len()
    }

    /// Chunk lengths in id order, for persister snapshots and tests.
    pub fn chunk_lengths(&self) -> Vec<u16> {
        self.core.lock().store.chunk_lengths()
    }

    /// Drop chunks, index, staged rows and pending callbacks, interrupting
    /// the flush timer. Dropped callbacks never fire.
    pub fn clear_all_data(&self) {
        self.scheduler.cancel_now();
        let mut core = self.core.lock();
        let dropped = core.callbacks.len();
        core.store.clear();
        core.index.clear();
        core.staging.clear();
        core.callbacks.clear();
        core.builder.reset();
        core.flush_armed = false;
        if dropped > 0 {
            warn!(dropped, "cleared memtable with pending callbacks");
        } else {
            info!("cleared memtable");
        }
    }

    /// Release the flush worker. Idempotent; also run on drop.
    pub fn close(&self) {
        self.scheduler.shutdown();
    }
}

impl Drop for ChunkedMemtable {
    fn drop(&mut self) {
        self.close();
    }
}

fn view_at(store: &ChunkStore, locator: Locator) -> MemtableResult<RowView> {
    Ok(store.reader(locator.chunk_id())?.position(locator.row_no()))
}

/// Staged rows needed before a synchronous flush fills the current chunk:
/// `chunk_size`, less whatever a sub-full last chunk already holds.
fn rows_to_fill(core: &Core, chunk_size: usize) -> usize {
    let partial = core.store.last().map_or(0, |chunk| {
        let len = chunk.len() as usize;
        if len < chunk_size {
            len
        } else {
            0
        }
    });
    chunk_size - partial
}

/// Timer-driven flush body. Returns the delay to re-arm with when rows
/// remain staged afterwards.
fn timer_flush(
    core: &Weak<Mutex<Core>>,
    chunk_size: usize,
    interval: Duration,
) -> Option<Duration> {
    let core = core.upgrade()?;
    let mut core = core.lock();
    if !core.flush_armed {
        // cancelled or already flushed while this fire was in flight
        return None;
    }
    match flush(&mut core, chunk_size) {
        Ok(()) if core.staging.is_empty() => None,
        Ok(()) => {
            core.flush_armed = true;
            Some(interval)
        }
        Err(error) => {
            // surfaced here only; the timer stays disarmed until the next
            // ingest
            warn!(%error, "timed flush failed");
            None
        }
    }
}

/// The flush body. Runs under the core lock.
///
/// Re-hydrates a sub-full last chunk into the builder, fills it from the
/// staging buffer, publishes the result as one chunk, rewrites the index
/// entries of every row it touched and fires the callbacks whose rows are
/// now all persisted.
///
/// The replacement chunk and its index entries are fully built before
/// anything is popped or published, so an extraction or encoding error
/// leaves chunks, index, staging buffer and callbacks untouched.
fn flush(core: &mut Core, chunk_size: usize) -> MemtableResult<()> {
    core.flush_armed = false;

    let merge_last = core
        .store
        .last()
        .map_or(false, |chunk| (chunk.len() as usize) < chunk_size);
    if core.staging.is_empty() && !merge_last {
        return Ok(());
    }

    core.builder.reset();
    let next_chunk_id = core.store.len() as u32 - merge_last as u32;
    let mut entries = Vec::new();

    if merge_last {
        let reader = core.store.reader(next_chunk_id)?;
        for row_no in 0..reader.num_rows() {
            let row = reader.row(row_no as u32);
            let (partition, segment, key) = core.projection.keys_of(&row)?;
            entries.push((
                partition,
                segment,
                key,
                Locator::new(next_chunk_id, core.builder.len() as u32),
            ));
            core.builder.add_row(&row)?;
        }
    }

    let base = core.builder.len();
    let rows_to_add = (chunk_size - base).min(core.staging.len());
    for (offset, row) in core.staging[..rows_to_add].iter().enumerate() {
        let (partition, segment, key) = core.projection.keys_of(row)?;
        entries.push((
            partition,
            segment,
            key,
            Locator::new(next_chunk_id, (base + offset) as u32),
        ));
        core.builder.add_row(row)?;
    }

    let new_len = core.builder.len();
    let columns = core.builder.emit()?;

    // point of no return: all fallible work is done
    if merge_last {
        core.store.pop_last()?;
    }
    let chunk_id = core.store.append(columns, new_len as u16)?;
    debug_assert_eq!(chunk_id, next_chunk_id);
    for (partition, segment, key, locator) in entries {
        core.index.insert(partition, segment, key, locator);
    }
    core.staging.drain(..rows_to_add);

    let mut fired = Vec::new();
    while let Some(callback) = core.callbacks.front() {
        if callback.last >= rows_to_add {
            break;
        }
        if let Some(callback) = core.callbacks.pop_front() {
            fired.push(callback.action);
        }
    }
    for callback in &mut core.callbacks {
        callback.first = callback.first.saturating_sub(rows_to_add);
        callback.last = callback.last.saturating_sub(rows_to_add);
    }

    debug!(
        chunk_id,
        rows = new_len,
        staged = core.staging.len(),
        callbacks = fired.len(),
        "flushed chunk"
    );
    for action in fired {
        action();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::types::{DataTypeExt, DataTypeKind};

    fn test_projection() -> Projection {
        Projection::try_new(
            vec![
                ColumnDesc::new("series", DataTypeKind::String.not_null()),
                ColumnDesc::new("bucket", DataTypeKind::Int64.not_null()),
                ColumnDesc::new("timestamp", DataTypeKind::Timestamp.not_null()),
                ColumnDesc::new("value", DataTypeKind::Float64.nullable()),
            ],
            0,
            1,
            2,
        )
        .unwrap()
    }

    fn memtable(chunk_size: usize, interval: Duration) -> ChunkedMemtable {
        ChunkedMemtable::new(
            test_projection(),
            MemtableOptions::new(chunk_size, interval).unwrap(),
        )
        .unwrap()
    }

    fn row(series: &str, bucket: i64, ts: i64) -> Row {
        vec![
            DataValue::String(series.into()),
            DataValue::Int64(bucket),
            DataValue::Timestamp(ts),
            DataValue::Float64((ts as f64 * 0.5).into()),
        ]
    }

    fn rows(keys: impl IntoIterator<Item = i64>) -> Vec<Row> {
        keys.into_iter().map(|ts| row("p0", 0, ts)).collect()
    }

    fn timestamps_of(views: &[RowView]) -> Vec<i64> {
        views
            .iter()
            .map(|view| match view.value(2) {
                DataValue::Timestamp(ts) => ts,
                other => panic!("unexpected row key {:?}", other),
            })
            .collect()
    }

    #[test]
    fn threshold_flush_then_commit() {
        let memtable = memtable(3, Duration::from_secs(60));
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        memtable
            .ingest(rows(1..=5), move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        // one full chunk published, two rows staged, callback pending
        assert_eq!(memtable.chunk_lengths(), vec![3]);
        assert_eq!(memtable.num_rows(), 3);
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        memtable.force_commit().unwrap();
        assert_eq!(memtable.chunk_lengths(), vec![3, 2]);
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        let views = memtable
            .read_rows(&DataValue::String("p0".into()), &DataValue::Int64(0))
            .unwrap();
        assert_eq!(timestamps_of(&views), vec![1, 2, 3, 4, 5]);

        // idempotent: nothing left to commit
        memtable.force_commit().unwrap();
        assert_eq!(memtable.chunk_lengths(), vec![3, 2]);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn callbacks_fire_in_registration_order() {
        let memtable = memtable(3, Duration::from_secs(60));
        let log = Arc::new(Mutex::new(Vec::new()));

        let sink = log.clone();
        memtable
            .ingest(rows(1..=2), move || sink.lock().push("c1"))
            .unwrap();
        assert_eq!(memtable.num_rows(), 0);

        let sink = log.clone();
        memtable
            .ingest(rows(3..=6), move || sink.lock().push("c2"))
            .unwrap();

        assert_eq!(memtable.chunk_lengths(), vec![3, 3]);
        assert!(memtable
            .read_rows(&DataValue::String("p0".into()), &DataValue::Int64(0))
            .unwrap()
            .len()
            == 6);
        assert_eq!(*log.lock(), vec!["c1", "c2"]);
    }

    #[test]
    fn timer_flush_and_partial_chunk_merge() {
        let memtable = memtable(3, Duration::from_millis(100));
        memtable.ingest(rows(1..=2), || {}).unwrap();

        // timer publishes a partial chunk
        std::thread::sleep(Duration::from_millis(600));
        assert_eq!(memtable.chunk_lengths(), vec![2]);

        // the next ingest can fill the partial chunk, so it flushes
        // synchronously: the partial chunk is popped, re-merged and
        // republished full under the same id
        memtable.ingest(rows(3..=4), || {}).unwrap();
        assert_eq!(memtable.chunk_lengths(), vec![3]);
        {
            let core = memtable.core.lock();
            let (_, locator) = core
                .index
                .lookup(&DataValue::String("p0".into()), &DataValue::Int64(0))
                .next()
                .unwrap();
            assert_eq!(locator.chunk_id(), 0);
            assert_eq!(locator.row_no(), 0);
            assert_eq!(core.staging.len(), 1);
            assert!(core.flush_armed);
        }

        memtable.force_commit().unwrap();
        assert_eq!(memtable.chunk_lengths(), vec![3, 1]);
        let views = memtable
            .read_rows(&DataValue::String("p0".into()), &DataValue::Int64(0))
            .unwrap();
        assert_eq!(timestamps_of(&views), vec![1, 2, 3, 4]);
    }

    #[test]
    fn num_rows_counts_every_ingested_row() {
        let memtable = memtable(4, Duration::from_secs(60));
        let mut total = 0;
        for batch in [1, 7, 3, 12, 4] {
            memtable
                .ingest(rows(total..total + batch), || {})
                .unwrap();
            total += batch;
        }
        memtable.force_commit().unwrap();
        assert_eq!(memtable.num_rows(), total as usize);

        // I1: every chunk but the last is full
        let lengths = memtable.chunk_lengths();
        for len in &lengths[..lengths.len() - 1] {
            assert_eq!(*len, 4);
        }
    }

    #[test]
    fn read_all_rows_is_ordered_across_partitions() {
        let memtable = memtable(2, Duration::from_secs(60));
        memtable
            .ingest(
                vec![
                    row("p1", 1, 30),
                    row("p0", 1, 20),
                    row("p0", 0, 10),
                    row("p0", 0, 5),
                ],
                || {},
            )
            .unwrap();
        memtable.force_commit().unwrap();

        let keys: Vec<_> = memtable
            .read_all_rows()
            .unwrap()
            .into_iter()
            .map(|(partition, segment, key, _)| (partition, segment, key))
            .collect();
        assert_eq!(
            keys,
            vec![
                (
                    DataValue::String("p0".into()),
                    DataValue::Int64(0),
                    DataValue::Timestamp(5)
                ),
                (
                    DataValue::String("p0".into()),
                    DataValue::Int64(0),
                    DataValue::Timestamp(10)
                ),
                (
                    DataValue::String("p0".into()),
                    DataValue::Int64(1),
                    DataValue::Timestamp(20)
                ),
                (
                    DataValue::String("p1".into()),
                    DataValue::Int64(1),
                    DataValue::Timestamp(30)
                ),
            ]
        );
    }

    #[test]
    fn clear_all_data_resets_everything() {
        let memtable = memtable(3, Duration::from_secs(60));
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        memtable
            .ingest(rows(1..=4), move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        memtable.clear_all_data();

        assert_eq!(memtable.num_rows(), 0);
        assert_eq!(memtable.num_chunks(), 0);
        assert!(memtable.read_all_rows().unwrap().is_empty());
        // the dropped callback never fires
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        // and the memtable keeps working
        memtable.ingest(rows(1..=3), || {}).unwrap();
        assert_eq!(memtable.num_rows(), 3);
        memtable.close();
    }

    #[test]
    fn empty_batch_callback_fires_with_prior_rows() {
        let memtable = memtable(3, Duration::from_secs(60));
        let log = Arc::new(Mutex::new(Vec::new()));

        let sink = log.clone();
        memtable.ingest(vec![], move || sink.lock().push("empty")).unwrap();
        assert_eq!(*log.lock(), vec!["empty"]);

        let sink = log.clone();
        memtable
            .ingest(rows(1..=2), move || sink.lock().push("r"))
            .unwrap();
        let sink = log.clone();
        memtable.ingest(vec![], move || sink.lock().push("after")).unwrap();
        assert_eq!(log.lock().len(), 1);

        memtable.force_commit().unwrap();
        assert_eq!(*log.lock(), vec!["empty", "r", "after"]);
    }

    #[test]
    fn null_key_fails_ingest_and_keeps_staging() {
        let memtable = memtable(1, Duration::from_secs(60));
        let mut bad = row("p0", 0, 1);
        bad[1] = DataValue::Null;
        let err = memtable.ingest(vec![bad], || {}).unwrap_err();
        assert!(matches!(err, MemtableError::NullKey(_)));
        assert_eq!(memtable.num_rows(), 0);
        assert_eq!(memtable.core.lock().staging.len(), 1);
    }
}
