// src/trajectory/model.rs
//
// Frozen per-track trajectory with time-indexed interpolation queries.
// Samples are sorted and deduplicated once at construction and never
// mutated afterwards, so every query result is cached on first compute
// and returned verbatim from then on.

use crate::types::{BoundingBox, Point, PositionSample};
use serde::{Deserialize, Serialize};
use std::cell::{OnceCell, RefCell};
use std::collections::{HashMap, HashSet};

/// Exportable digest of one trajectory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrajectorySummary {
    pub track_id: u32,
    pub samples: usize,
    pub start_time: f64,
    pub end_time: f64,
    pub stable_class: Option<String>,
    pub average_speed: Option<f64>,
    pub path_length: f64,
}

pub struct TrajectoryModel {
    track_id: u32,
    samples: Vec<PositionSample>,

    position_cache: RefCell<HashMap<u64, Option<Point>>>,
    velocity_cache: RefCell<HashMap<u64, Option<Point>>>,
    speed_cache: RefCell<HashMap<u64, Option<f64>>>,
    bbox_cache: RefCell<HashMap<u64, Option<BoundingBox>>>,
    path_length: OnceCell<f64>,
    average_speed: OnceCell<Option<f64>>,
    stable_class: OnceCell<Option<String>>,
}

impl TrajectoryModel {
    /// Build a model from accumulated samples. The samples are stably
    /// sorted by timestamp, then deduplicated by frame index with the
    /// later sample winning, and frozen.
    pub fn new(track_id: u32, mut samples: Vec<PositionSample>) -> Self {
        samples.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));

        let mut seen: HashSet<u64> = HashSet::with_capacity(samples.len());
        let mut deduped: Vec<PositionSample> = samples
            .into_iter()
            .rev()
            .filter(|s| seen.insert(s.frame_idx))
            .collect();
        deduped.reverse();

        Self {
            track_id,
            samples: deduped,
            position_cache: RefCell::new(HashMap::new()),
            velocity_cache: RefCell::new(HashMap::new()),
            speed_cache: RefCell::new(HashMap::new()),
            bbox_cache: RefCell::new(HashMap::new()),
            path_length: OnceCell::new(),
            average_speed: OnceCell::new(),
            stable_class: OnceCell::new(),
        }
    }

    pub fn track_id(&self) -> u32 {
        self.track_id
    }

    pub fn samples(&self) -> &[PositionSample] {
        &self.samples
    }

    /// (first, last) sample timestamps; `None` for an empty trajectory.
    pub fn time_range(&self) -> Option<(f64, f64)> {
        let first = self.samples.first()?;
        let last = self.samples.last()?;
        Some((first.timestamp, last.timestamp))
    }

    /// Interpolated center position at time `t`, or `None` when fewer
    /// than 2 samples exist or `t` falls outside the sampled range.
    pub fn position(&self, t: f64) -> Option<Point> {
        *self
            .position_cache
            .borrow_mut()
            .entry(t.to_bits())
            .or_insert_with(|| self.compute_position(t))
    }

    /// Finite-difference velocity over the segment bracketing `t`.
    /// A zero-duration bracket yields (0, 0), not a division error.
    pub fn velocity(&self, t: f64) -> Option<Point> {
        *self
            .velocity_cache
            .borrow_mut()
            .entry(t.to_bits())
            .or_insert_with(|| self.compute_velocity(t))
    }

    /// Magnitude of `velocity(t)`.
    pub fn segment_speed(&self, t: f64) -> Option<f64> {
        *self
            .speed_cache
            .borrow_mut()
            .entry(t.to_bits())
            .or_insert_with(|| self.compute_velocity(t).map(|v| v.x.hypot(v.y)))
    }

    /// Interpolated bounding box at time `t`, same availability rules as
    /// `position`.
    pub fn bbox_at(&self, t: f64) -> Option<BoundingBox> {
        *self
            .bbox_cache
            .borrow_mut()
            .entry(t.to_bits())
            .or_insert_with(|| self.compute_bbox(t))
    }

    /// Sum of Euclidean distances between consecutive sample centers.
    pub fn path_length(&self) -> f64 {
        *self.path_length.get_or_init(|| {
            self.samples
                .windows(2)
                .map(|w| w[0].center().distance(&w[1].center()))
                .sum()
        })
    }

    /// `path_length` over elapsed time; `None` when elapsed time is zero.
    pub fn average_speed(&self) -> Option<f64> {
        *self.average_speed.get_or_init(|| {
            let (first, last) = self.time_range()?;
            let elapsed = last - first;
            if elapsed == 0.0 {
                return None;
            }
            Some(self.path_length() / elapsed)
        })
    }

    /// Most frequent class label across all samples; ties go to the label
    /// encountered first in sample order.
    pub fn stable_class(&self) -> Option<String> {
        self.stable_class
            .get_or_init(|| {
                let mut counts: HashMap<&str, usize> = HashMap::new();
                for s in &self.samples {
                    *counts.entry(s.class_name.as_str()).or_insert(0) += 1;
                }
                let max = counts.values().copied().max()?;
                self.samples
                    .iter()
                    .find(|s| counts[s.class_name.as_str()] == max)
                    .map(|s| s.class_name.clone())
            })
            .clone()
    }

    /// The center polyline in sample order, e.g. for world-plane
    /// projection.
    pub fn centers(&self) -> Vec<Point> {
        self.samples.iter().map(|s| s.center()).collect()
    }

    pub fn summary(&self) -> Option<TrajectorySummary> {
        let (start_time, end_time) = self.time_range()?;
        Some(TrajectorySummary {
            track_id: self.track_id,
            samples: self.samples.len(),
            start_time,
            end_time,
            stable_class: self.stable_class(),
            average_speed: self.average_speed(),
            path_length: self.path_length(),
        })
    }

    fn in_range(&self, t: f64) -> bool {
        match self.time_range() {
            Some((min, max)) => self.samples.len() >= 2 && t >= min && t <= max,
            None => false,
        }
    }

    /// Index of the sample ending the segment that brackets `t`,
    /// clamped to [1, len - 1]. Only valid when `in_range(t)` holds.
    fn bracket_end(&self, t: f64) -> usize {
        let i = self.samples.partition_point(|s| s.timestamp < t);
        i.clamp(1, self.samples.len() - 1)
    }

    fn compute_position(&self, t: f64) -> Option<Point> {
        if !self.in_range(t) {
            return None;
        }

        let i = self.samples.partition_point(|s| s.timestamp < t);
        if i < self.samples.len() && self.samples[i].timestamp == t {
            return Some(self.samples[i].center());
        }

        let i = self.bracket_end(t);
        let (prev, next) = (&self.samples[i - 1], &self.samples[i]);
        let factor = interpolation_factor(prev.timestamp, next.timestamp, t);

        let p0 = prev.center();
        let p1 = next.center();
        Some(Point::new(
            p0.x + factor * (p1.x - p0.x),
            p0.y + factor * (p1.y - p0.y),
        ))
    }

    fn compute_velocity(&self, t: f64) -> Option<Point> {
        if !self.in_range(t) {
            return None;
        }

        let i = self.bracket_end(t);
        let (prev, next) = (&self.samples[i - 1], &self.samples[i]);
        let dt = next.timestamp - prev.timestamp;
        if dt == 0.0 {
            return Some(Point::new(0.0, 0.0));
        }

        let p0 = prev.center();
        let p1 = next.center();
        Some(Point::new((p1.x - p0.x) / dt, (p1.y - p0.y) / dt))
    }

    fn compute_bbox(&self, t: f64) -> Option<BoundingBox> {
        if !self.in_range(t) {
            return None;
        }

        let i = self.samples.partition_point(|s| s.timestamp < t);
        if i < self.samples.len() && self.samples[i].timestamp == t {
            return Some(self.samples[i].bbox);
        }

        let i = self.bracket_end(t);
        let (prev, next) = (&self.samples[i - 1], &self.samples[i]);
        let factor = interpolation_factor(prev.timestamp, next.timestamp, t);

        let (a, b) = (prev.bbox, next.bbox);
        Some(BoundingBox::new(
            a.x1 + factor * (b.x1 - a.x1),
            a.y1 + factor * (b.y1 - a.y1),
            a.x2 + factor * (b.x2 - a.x2),
            a.y2 + factor * (b.y2 - a.y2),
        ))
    }
}

/// Linear interpolation factor for `t` between two timestamps. An empty
/// bracket (equal timestamps) snaps to the later sample.
fn interpolation_factor(t0: f64, t1: f64, t: f64) -> f64 {
    let dt = t1 - t0;
    if dt == 0.0 {
        1.0
    } else {
        (t - t0) / dt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(track_id: u32, frame_idx: u64, timestamp: f64, cx: f64, cy: f64) -> PositionSample {
        PositionSample {
            track_id,
            frame_idx,
            timestamp,
            bbox: BoundingBox::new(cx - 1.0, cy - 1.0, cx + 1.0, cy + 1.0),
            class_name: "car".to_string(),
            confidence: 0.9,
        }
    }

    fn classed(frame_idx: u64, timestamp: f64, class_name: &str) -> PositionSample {
        PositionSample {
            class_name: class_name.to_string(),
            ..sample(1, frame_idx, timestamp, 0.0, 0.0)
        }
    }

    #[test]
    fn test_sort_and_frame_dedupe_last_wins() {
        // Unsorted input, frame 2 duplicated: the later-inserted sample
        // (cx = 9.0) must survive and the result must be time-sorted.
        let samples = vec![
            sample(1, 3, 0.3, 3.0, 0.0),
            sample(1, 1, 0.1, 1.0, 0.0),
            sample(1, 2, 0.2, 2.0, 0.0),
            sample(1, 2, 0.2, 9.0, 0.0),
        ];
        let model = TrajectoryModel::new(1, samples);

        let frames: Vec<u64> = model.samples().iter().map(|s| s.frame_idx).collect();
        assert_eq!(frames, vec![1, 2, 3]);
        let ts: Vec<f64> = model.samples().iter().map(|s| s.timestamp).collect();
        assert!(ts.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(model.samples()[1].center().x, 9.0);
    }

    #[test]
    fn test_position_exact_and_interpolated() {
        let model = TrajectoryModel::new(
            1,
            vec![sample(1, 1, 0.0, 0.0, 0.0), sample(1, 2, 1.0, 1.0, 0.0)],
        );

        let exact = model.position(1.0).unwrap();
        assert_eq!(exact, Point::new(1.0, 0.0));

        let mid = model.position(0.5).unwrap();
        assert!((mid.x - 0.5).abs() < 1e-12);
        assert!((mid.y - 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_out_of_range_and_underpopulated_are_unavailable() {
        let single = TrajectoryModel::new(1, vec![sample(1, 1, 0.0, 0.0, 0.0)]);
        assert!(single.position(0.0).is_none());
        assert!(single.velocity(0.0).is_none());

        let model = TrajectoryModel::new(
            1,
            vec![sample(1, 1, 0.0, 0.0, 0.0), sample(1, 2, 1.0, 1.0, 0.0)],
        );
        assert!(model.position(-0.1).is_none());
        assert!(model.position(1.1).is_none());
        assert!(model.segment_speed(2.0).is_none());
    }

    #[test]
    fn test_velocity_finite_difference() {
        let model = TrajectoryModel::new(
            1,
            vec![sample(1, 1, 0.0, 0.0, 0.0), sample(1, 2, 1.0, 1.0, 0.0)],
        );

        let v = model.velocity(0.5).unwrap();
        assert!((v.x - 1.0).abs() < 1e-12);
        assert!((v.y - 0.0).abs() < 1e-12);

        // Boundary times use the adjacent segment.
        let v0 = model.velocity(0.0).unwrap();
        assert!((v0.x - 1.0).abs() < 1e-12);

        assert!((model.segment_speed(0.5).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_duration_bracket_velocity_is_zero() {
        // Two frames sharing one timestamp: velocity must not divide by
        // the zero time delta.
        let model = TrajectoryModel::new(
            1,
            vec![sample(1, 1, 1.0, 0.0, 0.0), sample(1, 2, 1.0, 5.0, 0.0)],
        );
        assert_eq!(model.velocity(1.0).unwrap(), Point::new(0.0, 0.0));
    }

    #[test]
    fn test_path_length_and_average_speed() {
        let model = TrajectoryModel::new(
            1,
            vec![
                sample(1, 1, 0.0, 0.0, 0.0),
                sample(1, 2, 1.0, 3.0, 4.0),
                sample(1, 3, 2.0, 3.0, 4.0),
            ],
        );
        assert!((model.path_length() - 5.0).abs() < 1e-12);
        assert!((model.average_speed().unwrap() - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_average_speed_unavailable_for_zero_elapsed() {
        let model = TrajectoryModel::new(
            1,
            vec![sample(1, 1, 1.0, 0.0, 0.0), sample(1, 2, 1.0, 5.0, 0.0)],
        );
        assert!(model.average_speed().is_none());
    }

    #[test]
    fn test_cached_queries_are_bit_stable() {
        let model = TrajectoryModel::new(
            1,
            vec![
                sample(1, 1, 0.0, 0.0, 0.0),
                sample(1, 2, 1.0, 3.1, 4.7),
                sample(1, 3, 2.0, 5.9, 8.2),
            ],
        );

        let first = model.average_speed().unwrap();
        let second = model.average_speed().unwrap();
        assert_eq!(first.to_bits(), second.to_bits());

        let p1 = model.position(0.37).unwrap();
        let p2 = model.position(0.37).unwrap();
        assert_eq!(p1.x.to_bits(), p2.x.to_bits());
        assert_eq!(p1.y.to_bits(), p2.y.to_bits());
    }

    #[test]
    fn test_stable_class_tie_goes_to_first_encountered() {
        let model = TrajectoryModel::new(
            1,
            vec![
                classed(1, 0.0, "car"),
                classed(2, 0.1, "truck"),
                classed(3, 0.2, "car"),
                classed(4, 0.3, "truck"),
            ],
        );
        assert_eq!(model.stable_class().unwrap(), "car");

        let majority = TrajectoryModel::new(
            1,
            vec![
                classed(1, 0.0, "bus"),
                classed(2, 0.1, "car"),
                classed(3, 0.2, "car"),
            ],
        );
        assert_eq!(majority.stable_class().unwrap(), "car");
    }

    #[test]
    fn test_bbox_interpolation() {
        let model = TrajectoryModel::new(
            1,
            vec![sample(1, 1, 0.0, 0.0, 0.0), sample(1, 2, 1.0, 2.0, 0.0)],
        );
        let bbox = model.bbox_at(0.5).unwrap();
        assert!((bbox.center().x - 1.0).abs() < 1e-12);
        assert_eq!(bbox.size(), (2.0, 2.0));
    }
}
