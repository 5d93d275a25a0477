//! Slideshow timeline: how long each image is on screen and where it fades.

/// Cross-fade length applied between consecutive images, in seconds.
pub const CROSSFADE_SECS: f64 = 0.5;

/// One image's place in the slideshow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Slot {
    pub start: f64,
    pub duration: f64,
    /// Fade-in length; zero for the first slot.
    pub fade_in: f64,
    /// Fade-out length; zero for the last slot.
    pub fade_out: f64,
}

impl Slot {
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// Split `total` seconds evenly across `count` images.
///
/// Boundaries are computed from the slot index rather than accumulated, so
/// the last slot ends exactly at `total` and the durations sum to `total`
/// without drift. Fades are clamped to half a slot so fade-in and fade-out
/// never overlap.
pub fn build(total: f64, count: usize) -> Vec<Slot> {
    if count == 0 || !total.is_finite() || total <= 0.0 {
        return Vec::new();
    }

    let boundary = |i: usize| {
        if i >= count {
            total
        } else {
            total * i as f64 / count as f64
        }
    };

    (0..count)
        .map(|i| {
            let start = boundary(i);
            let duration = boundary(i + 1) - start;
            let fade = CROSSFADE_SECS.min(duration / 2.0);
            Slot {
                start,
                duration,
                fade_in: if i > 0 { fade } else { 0.0 },
                fade_out: if i + 1 < count { fade } else { 0.0 },
            }
        })
        .collect()
}

/// Whole frames each slot occupies at `fps`.
///
/// Slot edges are rounded to the nearest frame, not slot durations, so the
/// counts always add up to `round(total * fps)`.
pub fn frame_counts(slots: &[Slot], fps: u32) -> Vec<u64> {
    let to_frame = |t: f64| (t * f64::from(fps)).round() as u64;
    let mut edges: Vec<u64> = slots.iter().map(|s| to_frame(s.start)).collect();
    if let Some(last) = slots.last() {
        edges.push(to_frame(last.end()));
    }
    edges.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Largest image count that still gives every slot at least one frame.
pub fn max_slots(total: f64, fps: u32) -> usize {
    ((total * f64::from(fps)).round() as usize).max(1)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
