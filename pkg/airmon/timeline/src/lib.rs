// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Bounded time-series store for air-quality sensor readings.
//!
//! The crate holds the pieces of the monitor that have real invariants to
//! keep; it has no async runtime and no I/O beyond snapshot files.
//!
//! ## Components
//!
//! 1. **Timeline** (`ring` module) - fixed-capacity circular buffer of
//!    timestamped samples with cached time bounds and min/max value.
//!
//! 2. **Range query** (`query` module) - everything strictly newer than a
//!    watermark, or `None` when there is nothing newer yet.
//!
//! 3. **Nearest lookup** (`nearest` module) - slot closest to a relative
//!    position on the retained time span.
//!
//! 4. **Broker** (`broker` module) - parks long-poll requests until new data,
//!    a shared deadline, or shutdown resolves them.
//!
//! 5. **Snapshot** (`snapshot` module) - JSON persistence of the retained set
//!    across restarts.

pub mod broker;
pub mod nearest;
pub mod query;
pub mod ring;
pub mod sample;
pub mod snapshot;

pub use broker::{Broker, PollResponse, PollStatus, Responder, DEFAULT_POLL_TIMEOUT};
pub use ring::{Entry, Iter, Timeline, TimelineError};
pub use sample::{Metric, Observation, Reading, SampleRecord};
pub use snapshot::{Snapshot, SnapshotError};
