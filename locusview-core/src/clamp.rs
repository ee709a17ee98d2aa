//! Pure clamping of coordinate pairs against sequence bounds and span limits.

use bitflags::bitflags;

use crate::types::{SeqCoord, SequenceBounds};

bitflags! {
    /// Which edges of a pair ended up on a sequence limit
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ClampType: u8 {
        const START = 1 << 0;
        const END = 1 << 1;
    }
}

/// Edge to hold still when a span has to shrink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pin {
    #[default]
    None,
    Start,
    End,
}

pub fn normalize(a: SeqCoord, b: SeqCoord) -> (SeqCoord, SeqCoord) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Clamp each edge independently into `bounds`.
pub fn clamp_to_limits(
    bounds: &SequenceBounds,
    start: SeqCoord,
    end: SeqCoord,
) -> (SeqCoord, SeqCoord, ClampType) {
    let (mut start, mut end) = normalize(start, end);
    let mut clamp = ClampType::empty();

    if start <= bounds.min {
        start = bounds.min;
        clamp |= ClampType::START;
    }
    if end >= bounds.max {
        end = bounds.max;
        clamp |= ClampType::END;
    }

    // Pairs lying wholly outside collapse onto the nearest limit
    start = start.min(bounds.max);
    end = end.max(bounds.min);

    (start, end, clamp)
}

/// Slide the pair back inside `bounds` keeping its span. A span longer than
/// the sequence is cut down to the sequence.
pub fn clamp_span_to_limits(
    bounds: &SequenceBounds,
    start: SeqCoord,
    end: SeqCoord,
) -> (SeqCoord, SeqCoord, ClampType) {
    let (mut start, mut end) = normalize(start, end);
    let mut clamp = ClampType::empty();

    if start <= bounds.min {
        end += bounds.min - start;
        start = bounds.min;
        clamp |= ClampType::START;
    }

    if end >= bounds.max {
        start -= end - bounds.max;
        end = bounds.max;
        clamp |= ClampType::END;

        if start <= bounds.min {
            start = bounds.min;
            clamp |= ClampType::START;
        }
    }

    (start, end, clamp)
}

/// Shrink the pair to at most `max_span`, taking the reduction from both
/// edges equally unless one is pinned.
pub fn limit_span(start: SeqCoord, end: SeqCoord, max_span: f64, pin: Pin) -> (SeqCoord, SeqCoord) {
    let (start, end) = normalize(start, end);
    let span = end - start;

    if span <= max_span {
        return (start, end);
    }

    match pin {
        Pin::None => {
            let excess = (span - max_span) / 2.0;
            (start + excess, end - excess)
        }
        Pin::Start => (start, start + max_span),
        Pin::End => (end - max_span, end),
    }
}
