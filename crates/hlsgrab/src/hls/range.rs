use serde::{Deserialize, Serialize};

use crate::hls::playlist::Segment;

/// Time window in seconds from the start of the playlist. A missing bound is
/// open in that direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: Option<f64>,
    pub end: Option<f64>,
}

impl TimeWindow {
    pub fn new(start: Option<f64>, end: Option<f64>) -> Self {
        Self { start, end }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Whether a segment spanning `[start, end)` overlaps the window.
    fn overlaps(&self, start: f64, end: f64) -> bool {
        let before_end = self.end.is_none_or(|window_end| start < window_end);
        let after_start = self.start.is_none_or(|window_start| end > window_start);
        before_end && after_start
    }
}

/// Segments overlapping `window`, in playlist order.
///
/// Inclusion is per whole segment: anything touching the window by any amount
/// is kept. An inverted window selects nothing.
pub fn select_segments<'a>(segments: &'a [Segment], window: &TimeWindow) -> Vec<&'a Segment> {
    if window.is_unbounded() {
        return segments.iter().collect();
    }

    let mut clock = 0.0;
    let mut selected = Vec::new();
    for segment in segments {
        let segment_end = clock + segment.duration;
        if window.overlaps(clock, segment_end) {
            selected.push(segment);
        }
        clock = segment_end;
    }
    selected
}

/// Truncate a selection to its first `max_segments` entries. `None` and
/// `Some(0)` leave it untouched.
pub fn limit_segments<T>(mut selection: Vec<T>, max_segments: Option<usize>) -> Vec<T> {
    if let Some(max) = max_segments.filter(|max| *max > 0) {
        selection.truncate(max);
    }
    selection
}
