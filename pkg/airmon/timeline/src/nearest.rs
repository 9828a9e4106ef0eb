// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::ring::Timeline;

impl<T> Timeline<T> {
    /// Slot index of the sample closest in time to `fraction` of the retained
    /// span (0.0 is the oldest sample, 1.0 the newest).
    ///
    /// Times are non-decreasing in chronological order, so the distance to the
    /// target falls and then rises. The scan stops at the first step where the
    /// distance grows. Among samples at the same distance the older one wins.
    pub fn nearest_index(&self, fraction: f64) -> Option<usize> {
        if self.is_empty() {
            return None;
        }
        let span = self.max_time.abs_diff(self.min_time) as f64;
        let target = self.min_time as f64 + fraction * span;

        let mut best = self.oldest_index();
        let mut best_distance = f64::INFINITY;
        let mut previous = f64::INFINITY;
        for offset in 0..self.len() {
            let index = self.physical(offset);
            let distance = (self.at(offset).time as f64 - target).abs();
            if distance > previous {
                break;
            }
            if distance < best_distance {
                best = index;
                best_distance = distance;
            }
            previous = distance;
        }
        Some(best)
    }
}
