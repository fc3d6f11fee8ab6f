// Copyright 2026 TempoLight Project Authors. Licensed under Apache-2.0.

use std::time::Duration;

use super::error::{MemtableError, MemtableResult};

/// Property key for the number of rows per chunk.
pub const CHUNK_SIZE_KEY: &str = "memtable.filo.chunksize";
/// Property key for the maximum time a non-empty staging buffer may remain
/// unflushed.
pub const FLUSH_INTERVAL_KEY: &str = "memtable.flush.interval";

pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Options for [`ChunkedMemtable`](super::ChunkedMemtable).
#[derive(Debug, Clone)]
pub struct MemtableOptions {
    /// Target rows per chunk. Chunk lengths are u16, so at most 65535.
    pub chunk_size: usize,
    /// Delay of the single-shot flush timer armed by `ingest`.
    pub flush_interval: Duration,
}

impl MemtableOptions {
    pub fn new(chunk_size: usize, flush_interval: Duration) -> MemtableResult<Self> {
        if chunk_size == 0 || chunk_size > u16::MAX as usize {
            return Err(MemtableError::Config(format!(
                "{} must be in 1..=65535, got {}",
                CHUNK_SIZE_KEY, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            flush_interval,
        })
    }

    pub fn default_for_test() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            flush_interval: Duration::from_secs(1),
        }
    }

    /// Build options from `key = value` properties. `memtable.filo.chunksize`
    /// defaults to 1000; `memtable.flush.interval` is required and accepts
    /// the duration suffixes `ms`, `s`, `m` and `h`.
    pub fn from_properties<'a>(
        properties: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> MemtableResult<Self> {
        let mut chunk_size = DEFAULT_CHUNK_SIZE;
        let mut flush_interval = None;
        for (key, value) in properties {
            match key {
                CHUNK_SIZE_KEY => {
                    chunk_size = value.parse().map_err(|_| {
                        MemtableError::Config(format!("{}: invalid row count '{}'", key, value))
                    })?;
                }
                FLUSH_INTERVAL_KEY => flush_interval = Some(parse_duration(value)?),
                _ => {}
            }
        }
        let flush_interval = flush_interval.ok_or_else(|| {
            MemtableError::Config(format!("{} is required", FLUSH_INTERVAL_KEY))
        })?;
        Self::new(chunk_size, flush_interval)
    }
}

fn parse_duration(value: &str) -> MemtableResult<Duration> {
    let invalid =
        || MemtableError::Config(format!("invalid duration '{}' (try 500ms, 1s, 2m, 1h)", value));
    let (digits, unit) = value
        .trim()
        .split_at(value.trim().find(|c: char| !c.is_ascii_digit()).ok_or_else(invalid)?);
    let amount: u64 = digits.parse().map_err(|_| invalid())?;
    match unit {
        "ms" => Ok(Duration::from_millis(amount)),
        "s" => Ok(Duration::from_secs(amount)),
        "m" => Ok(Duration::from_secs(amount * 60)),
        "h" => Ok(Duration::from_secs(amount * 3600)),
        _ => Err(invalid()),
    }
}
