//! Observer distance classification
//!
//! An entity is "far" when every observer is beyond the threshold. With no
//! observers the classifier fails open and reports not-far: an empty observer
//! set means the signal is not ready, and nothing should be throttled on a
//! signal that is not ready.
//!
//! Pure and thread-safe; used synchronously as the fallback path and as the
//! inner loop of background batch jobs.

use crate::snapshot::ObserverSnapshot;
use crate::util::vec2::Vec2;

/// Squared distance from `position` to the nearest observer
///
/// Returns `None` when the observer set is empty.
#[inline]
pub fn nearest_observer_distance_sq(
    position: Vec2,
    observers: &[ObserverSnapshot],
) -> Option<f32> {
    let mut min_sq = f32::MAX;
    let mut any = false;
    for obs in observers {
        let dsq = position.distance_sq_to(obs.position);
        if dsq < min_sq {
            min_sq = dsq;
        }
        any = true;
    }
    any.then_some(min_sq)
}

/// True iff `position` is farther than `threshold` from every observer
#[inline]
pub fn is_far_from_all(position: Vec2, observers: &[ObserverSnapshot], threshold: f32) -> bool {
    match nearest_observer_distance_sq(position, observers) {
        Some(min_sq) => min_sq > threshold * threshold,
        // Fail open: never throttle when the classifier has nothing to see
        None => false,
    }
}

/// True iff `position` is within `threshold` of at least one observer
#[inline]
pub fn is_near_any(position: Vec2, observers: &[ObserverSnapshot], threshold: f32) -> bool {
    nearest_observer_distance_sq(position, observers)
        .map(|min_sq| min_sq <= threshold * threshold)
        .unwrap_or(false)
}
