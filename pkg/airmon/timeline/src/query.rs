// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Watermark range queries.

use crate::ring::{Iter, Timeline};

impl<T> Timeline<T> {
    /// Samples strictly newer than `watermark`, oldest first.
    ///
    /// Returns `None` when the timeline is empty or nothing is newer than the
    /// watermark yet; callers park the request until the next append. A
    /// watermark older than the oldest retained sample (the caller fell behind
    /// eviction) yields the whole retained set.
    ///
    /// The split point is found by walking in from whichever end of the
    /// retained span is closer to the watermark, so a client that is nearly
    /// caught up costs a few steps from the newest end.
    pub fn since(&self, watermark: i64) -> Option<Iter<'_, T>> {
        if self.is_empty() || watermark >= self.max_time {
            return None;
        }
        if watermark < self.min_time {
            return Some(self.iter());
        }

        let len = self.len();
        let from_oldest = watermark.abs_diff(self.min_time);
        let from_newest = self.max_time.abs_diff(watermark);
        let start = if from_oldest < from_newest {
            // The newest sample is past the watermark, so this stops before len.
            let mut offset = 0;
            while self.at(offset).time <= watermark {
                offset += 1;
            }
            offset
        } else {
            // The oldest sample is at or before the watermark, so this stops above 0.
            let mut offset = len;
            while self.at(offset - 1).time > watermark {
                offset -= 1;
            }
            offset
        };
        Some(Iter::new(self, start, len))
    }
}
