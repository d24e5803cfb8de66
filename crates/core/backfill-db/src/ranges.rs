
use std::{fmt, ops::Range};

use crate::InvalidRangeError;

/// Highest block number that fits the `BIGINT` block columns.
pub const MAX_STORABLE_BLOCK: u64 = i64::MAX as u64;

/// Half-open block interval `[start, end)`. Always non-empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockInterval {
    start: u64,
    end: u64,
}

impl BlockInterval {
    pub fn new(start: u64, end: u64) -> Result<Self, InvalidRangeError> {
        if start >= end {
            return Err(InvalidRangeError::Empty { start, end });
        }
        if end > MAX_STORABLE_BLOCK {
            return Err(InvalidRangeError::ExceedsStorageBounds {
                start,
                end,
                max: MAX_STORABLE_BLOCK,
            });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    /// Exclusive upper bound.
    pub fn end(&self) -> u64 {
        self.end
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn contains(&self, block: u64) -> bool {
        self.start <= block && block < self.end
    }

    pub fn contains_interval(&self, other: &Self) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Overlapping or adjacent: the union of the two is a single interval.
    pub fn touches(&self, other: &Self) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Smallest interval covering both.
    pub fn span(&self, other: &Self) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn as_range(&self) -> Range<u64> {
        self.start..self.end
    }
}

impl fmt::Display for BlockInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

impl TryFrom<Range<u64>> for BlockInterval {
    type Error = InvalidRangeError;

    fn try_from(range: Range<u64>) -> Result<Self, Self::Error> {
        Self::new(range.start, range.end)
    }
}

/// Indices of the intervals in `sorted` that `new` overlaps or touches.
///
/// `sorted` must be ascending, disjoint and non-adjacent. When nothing is absorbed, the
/// returned range is empty and its start is the insertion point for `new`.
pub fn absorb_span(sorted: &[BlockInterval], new: &BlockInterval) -> Range<usize> {
    let first = sorted.partition_point(|iv| iv.end < new.start);
    let mut last = first;
    while last < sorted.len() && sorted[last].start <= new.end {
        last += 1;
    }
    first..last
}

/// Set of covered blocks, kept as ascending, disjoint, non-adjacent intervals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverageSet {
    intervals: Vec<BlockInterval>,
}

impl CoverageSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from arbitrary intervals, merging any that overlap or touch.
    pub fn from_intervals(intervals: impl IntoIterator<Item = BlockInterval>) -> Self {
        let mut set = Self::new();
        for interval in intervals {
            set.insert(interval);
        }
        set
    }

    pub fn intervals(&self) -> &[BlockInterval] {
        &self.intervals
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Adds `interval`, merging it with every interval it overlaps or touches.
    ///
    /// Returns the intervals that were absorbed. Inserting an interval that is already covered
    /// leaves the set unchanged and absorbs only the containing interval.
    pub fn insert(&mut self, interval: BlockInterval) -> Vec<BlockInterval> {
        let span = absorb_span(&self.intervals, &interval);
        let merged = self.intervals[span.clone()]
            .iter()
            .fold(interval, |acc, iv| acc.span(iv));
        let absorbed = self
            .intervals
            .splice(span, std::iter::once(merged))
            .collect();

        #[cfg(debug_assertions)]
        self.check_invariants();

        absorbed
    }

    /// Gaps of `window` not covered by this set, in ascending order.
    pub fn missing(&self, window: BlockInterval) -> Vec<BlockInterval> {
        let mut gaps = Vec::new();
        let mut cursor = window.start;

        let first = self.intervals.partition_point(|iv| iv.end <= window.start);
        for iv in &self.intervals[first..] {
            if iv.start >= window.end {
                break;
            }
            if iv.start > cursor {
                gaps.push(BlockInterval {
                    start: cursor,
                    end: iv.start,
                });
            }
            cursor = cursor.max(iv.end);
        }

        if cursor < window.end {
            gaps.push(BlockInterval {
                start: cursor,
                end: window.end,
            });
        }
        gaps
    }

    /// Whether every block of `window` is covered.
    pub fn covers(&self, window: &BlockInterval) -> bool {
        let idx = self.intervals.partition_point(|iv| iv.end <= window.start);
        self.intervals
            .get(idx)
            .is_some_and(|iv| iv.contains_interval(window))
    }

    pub fn contains(&self, block: u64) -> bool {
        let idx = self.intervals.partition_point(|iv| iv.end <= block);
        self.intervals.get(idx).is_some_and(|iv| iv.contains(block))
    }

    /// Number of covered blocks.
    pub fn total_len(&self) -> u64 {
        self.intervals.iter().map(BlockInterval::len).sum()
    }

    /// Panics unless the intervals are non-empty, ascending, disjoint and non-adjacent.
    #[cfg(any(test, debug_assertions))]
    pub fn check_invariants(&self) {
        for iv in &self.intervals {
            assert!(iv.start < iv.end, "empty interval {iv}");
        }
        for pair in self.intervals.windows(2) {
            assert!(
                pair[0].end < pair[1].start,
                "intervals {} and {} overlap, touch or are unsorted",
                pair[0],
                pair[1]
            );
        }
    }
}

impl FromIterator<BlockInterval> for CoverageSet {
    fn from_iter<I: IntoIterator<Item = BlockInterval>>(iter: I) -> Self {
        Self::from_intervals(iter)
    }
}
