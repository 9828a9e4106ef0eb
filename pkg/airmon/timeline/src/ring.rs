// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Fixed-capacity circular store of timestamped samples.
//!
//! Samples must arrive in non-decreasing time order. Once the buffer is full
//! every append overwrites the oldest slot. The time bounds are maintained on
//! every append; the value bounds are maintained incrementally and only
//! rescanned when the evicted sample held one of them.

use std::iter::FusedIterator;

use crate::sample::Observation;

/// A stored sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry<T> {
    /// Epoch milliseconds.
    pub time: i64,
    pub item: T,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimelineError {
    #[error("timeline capacity must be greater than zero")]
    ZeroCapacity,

    #[error("sample time {time} is older than the newest retained time {max_time}")]
    OutOfOrder { time: i64, max_time: i64 },

    #[error("slot about to be overwritten holds time {found}, expected oldest time {expected}")]
    InvariantViolation { expected: i64, found: i64 },
}

impl TimelineError {
    /// Whether the timeline can no longer be trusted after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TimelineError::InvariantViolation { .. })
    }
}

/// Ring buffer of the most recent `capacity` samples.
#[derive(Debug, Clone)]
pub struct Timeline<T> {
    /// Grows to `capacity`, then slots are overwritten in place.
    slots: Vec<Entry<T>>,
    capacity: usize,
    /// Next slot to write.
    cursor: usize,
    pub(crate) min_time: i64,
    pub(crate) max_time: i64,
    min_value: f64,
    max_value: f64,
}

impl<T> Timeline<T> {
    pub fn new(capacity: usize) -> Result<Self, TimelineError> {
        if capacity == 0 {
            return Err(TimelineError::ZeroCapacity);
        }
        Ok(Self {
            slots: Vec::with_capacity(capacity),
            capacity,
            cursor: 0,
            min_time: i64::MAX,
            max_time: i64::MIN,
            min_value: f64::INFINITY,
            max_value: f64::NEG_INFINITY,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() == self.capacity
    }

    /// Time of the oldest retained sample.
    pub fn min_time(&self) -> Option<i64> {
        (!self.is_empty()).then_some(self.min_time)
    }

    /// Time of the most recently appended sample.
    pub fn max_time(&self) -> Option<i64> {
        (!self.is_empty()).then_some(self.max_time)
    }

    pub fn time_bounds(&self) -> Option<(i64, i64)> {
        (!self.is_empty()).then_some((self.min_time, self.max_time))
    }

    pub fn min_value(&self) -> Option<f64> {
        (!self.is_empty()).then_some(self.min_value)
    }

    pub fn max_value(&self) -> Option<f64> {
        (!self.is_empty()).then_some(self.max_value)
    }

    pub fn value_bounds(&self) -> Option<(f64, f64)> {
        (!self.is_empty()).then_some((self.min_value, self.max_value))
    }

    /// Slot holding the oldest sample: 0 until the buffer first fills, the
    /// cursor afterwards.
    pub fn oldest_index(&self) -> usize {
        if self.is_full() { self.cursor } else { 0 }
    }

    /// Raw slot access, for indices returned by [`Timeline::nearest_index`].
    pub fn slot(&self, index: usize) -> Option<&Entry<T>> {
        self.slots.get(index)
    }

    pub fn newest(&self) -> Option<&Entry<T>> {
        if self.is_empty() {
            return None;
        }
        Some(self.at(self.len() - 1))
    }

    /// Retained samples, oldest first.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(self, 0, self.len())
    }

    /// Slot index of the sample `offset` positions after the oldest.
    pub(crate) fn physical(&self, offset: usize) -> usize {
        let index = self.oldest_index() + offset;
        if index >= self.capacity {
            index - self.capacity
        } else {
            index
        }
    }

    pub(crate) fn at(&self, offset: usize) -> &Entry<T> {
        &self.slots[self.physical(offset)]
    }
}

impl<T: Observation> Timeline<T> {
    /// Append a sample and report whether the cached value bounds must be
    /// rebuilt with [`Timeline::recalibrate`].
    ///
    /// Fails without touching the buffer when `time` is older than the newest
    /// retained sample, or when the slot about to be evicted does not hold the
    /// oldest time (the buffer is corrupted and must not be used further).
    #[must_use = "a true result requires a call to recalibrate()"]
    pub fn append(&mut self, time: i64, item: T) -> Result<bool, TimelineError> {
        if time < self.max_time {
            return Err(TimelineError::OutOfOrder {
                time,
                max_time: self.max_time,
            });
        }

        let value = item.value();
        let mut recalibrate = false;
        if self.is_full() {
            let evicted = &self.slots[self.cursor];
            if evicted.time != self.min_time {
                return Err(TimelineError::InvariantViolation {
                    expected: self.min_time,
                    found: evicted.time,
                });
            }
            let evicted_value = evicted.item.value();
            recalibrate = evicted_value == self.min_value || evicted_value == self.max_value;
            self.slots[self.cursor] = Entry { time, item };
        } else {
            self.slots.push(Entry { time, item });
        }

        self.max_time = time;
        self.cursor += 1;
        if self.cursor == self.capacity {
            self.cursor = 0;
        }
        self.min_time = self.slots[self.oldest_index()].time;

        if !recalibrate {
            if value < self.min_value {
                self.min_value = value;
            }
            if value > self.max_value {
                self.max_value = value;
            }
        }
        Ok(recalibrate)
    }

    /// Append and recalibrate when needed.
    pub fn push(&mut self, time: i64, item: T) -> Result<(), TimelineError> {
        if self.append(time, item)? {
            self.recalibrate();
        }
        Ok(())
    }

    /// Rescan every retained sample for the exact value bounds. O(len).
    pub fn recalibrate(&mut self) {
        let mut min_value = f64::INFINITY;
        let mut max_value = f64::NEG_INFINITY;
        for entry in &self.slots {
            let value = entry.item.value();
            if value < min_value {
                min_value = value;
            }
            if value > max_value {
                max_value = value;
            }
        }
        self.min_value = min_value;
        self.max_value = max_value;
    }
}

/// Chronological iterator over a contiguous run of retained samples.
#[derive(Debug, Clone)]
pub struct Iter<'a, T> {
    timeline: &'a Timeline<T>,
    front: usize,
    back: usize,
}

impl<'a, T> Iter<'a, T> {
    pub(crate) fn new(timeline: &'a Timeline<T>, front: usize, back: usize) -> Self {
        Self {
            timeline,
            front,
            back,
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a Entry<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }
        let entry = self.timeline.at(self.front);
        self.front += 1;
        Some(entry)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.back - self.front;
        (remaining, Some(remaining))
    }
}

impl<T> DoubleEndedIterator for Iter<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }
        self.back -= 1;
        Some(self.timeline.at(self.back))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}

impl<'a, T> IntoIterator for &'a Timeline<T> {
    type Item = &'a Entry<T>;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
