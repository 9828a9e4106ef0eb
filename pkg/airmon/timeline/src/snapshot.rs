// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Snapshot of the retained samples, written on shutdown and replayed on the
//! next start.
//!
//! Format: a JSON array of `{m, t, v}` records, oldest first. The same record
//! shape is used on the wire, so a snapshot can be inspected with any JSON tool.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::ring::{Timeline, TimelineError};
use crate::sample::{Reading, SampleRecord};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    pub records: Vec<SampleRecord>,
}

impl Snapshot {
    /// Copy the retained set, oldest first.
    pub fn capture(timeline: &Timeline<Reading>) -> Self {
        Self {
            records: timeline.iter().map(SampleRecord::from).collect(),
        }
    }

    /// Write atomically: serialize to a sibling temp file, then rename over `path`.
    pub fn write(&self, path: &Path) -> Result<(), SnapshotError> {
        let tmp_path = tmp_path_for(path);
        let bytes = serde_json::to_vec(self)?;
        std::fs::write(&tmp_path, &bytes)?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    pub fn read(path: &Path) -> Result<Self, SnapshotError> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Like [`Snapshot::read`], but a missing file is an empty snapshot.
    pub fn read_or_default(path: &Path) -> Result<Self, SnapshotError> {
        match Self::read(path) {
            Err(SnapshotError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Replay the records into a fresh timeline of `capacity`.
    ///
    /// A record older than its predecessor is skipped with a warning. When the
    /// snapshot holds more records than `capacity`, the oldest are evicted as
    /// they would have been live.
    pub fn restore(&self, capacity: usize) -> Result<Timeline<Reading>, SnapshotError> {
        let mut timeline = Timeline::new(capacity)?;
        let mut skipped = 0usize;
        for record in &self.records {
            match timeline.push(record.time, record.reading()) {
                Ok(()) => {}
                Err(TimelineError::OutOfOrder { time, max_time }) => {
                    tracing::warn!(time, max_time, "Skipping out-of-order snapshot record");
                    skipped += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
        tracing::debug!(
            records = self.records.len(),
            retained = timeline.len(),
            skipped,
            "Restored timeline from snapshot"
        );
        Ok(timeline)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Timeline error: {0}")]
    Timeline(#[from] TimelineError),
}
