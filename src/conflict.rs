// src/conflict.rs
//
// Pairwise conflict detection over trajectory models.
//
// The core test is closest-approach under constant velocity: it reports
// the single time of minimum separation between two agents extrapolated
// from their instantaneous velocities, not a contact duration. Geometric
// negatives (stationary pair, parallel motion, separating motion, a
// closest approach already in the past) are normal no-conflict records.

use crate::error::ConflictError;
use crate::trajectory::TrajectoryModel;
use crate::types::Point;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// History key: sample time rounded to 2 decimals, stored in
/// centiseconds so the map orders records by time.
pub type TimeKey = i64;

/// Unordered pair of track ids, normalized to (smaller, larger).
pub type PairKey = (u32, u32);

/// Result of one closest-approach check at one sampled time.
#[derive(Debug, Clone, Serialize)]
pub struct ConflictRecord {
    pub time_checked: f64,
    pub ttc: Option<f64>,
    pub collision_point: Option<Point>,
    pub min_distance: Option<f64>,
    pub track_a: u32,
    pub track_b: u32,
    pub conflict_detected: bool,
}

impl ConflictRecord {
    fn clear(a: &TrajectoryModel, b: &TrajectoryModel, time: f64) -> Self {
        Self {
            time_checked: time,
            ttc: None,
            collision_point: None,
            min_distance: None,
            track_a: a.track_id(),
            track_b: b.track_id(),
            conflict_detected: false,
        }
    }
}

/// Per-pair minimum-TTC report entry.
#[derive(Debug, Clone, Serialize)]
pub struct MinimumTtc {
    pub min_ttc: f64,
    pub time_of_min: f64,
    pub collision_point: Point,
    pub min_distance: f64,
}

/// Time window for a conflict sweep. Unset bounds default to the overlap
/// of the two trajectories' sampled ranges.
#[derive(Debug, Clone, Copy)]
pub struct SweepWindow {
    pub start: Option<f64>,
    pub end: Option<f64>,
    pub step: f64,
}

impl Default for SweepWindow {
    fn default() -> Self {
        Self {
            start: None,
            end: None,
            step: 0.1,
        }
    }
}

impl SweepWindow {
    pub fn with_step(step: f64) -> Self {
        Self {
            step,
            ..Self::default()
        }
    }
}

/// Sweeps pairs of trajectories for predicted conflicts and retains a
/// queryable history. The history only grows; records are never mutated
/// retroactively.
pub struct ConflictEngine {
    min_distance: f64,
    history: BTreeMap<PairKey, BTreeMap<TimeKey, ConflictRecord>>,
}

impl ConflictEngine {
    pub fn new(min_distance: f64) -> Self {
        debug!("Conflict engine initialized (min_distance={min_distance})");
        Self {
            min_distance,
            history: BTreeMap::new(),
        }
    }

    /// Closest-approach check for one pair at one instant.
    pub fn instant_conflict(
        &self,
        a: &TrajectoryModel,
        b: &TrajectoryModel,
        time: f64,
    ) -> ConflictRecord {
        let clear = ConflictRecord::clear(a, b, time);

        let (Some(pos_a), Some(vel_a), Some(pos_b), Some(vel_b)) = (
            a.position(time),
            a.velocity(time),
            b.position(time),
            b.velocity(time),
        ) else {
            debug!(
                "position or velocity unavailable for pair ({}, {}) at t={time}",
                a.track_id(),
                b.track_id()
            );
            return clear;
        };

        // Two stationary agents cannot collide under this model.
        if vel_a == Point::new(0.0, 0.0) && vel_b == Point::new(0.0, 0.0) {
            return clear;
        }

        let rel_pos = Point::new(pos_b.x - pos_a.x, pos_b.y - pos_a.y);
        let rel_vel = Point::new(vel_b.x - vel_a.x, vel_b.y - vel_a.y);

        let rel_vel_sq = rel_vel.x * rel_vel.x + rel_vel.y * rel_vel.y;
        // Equal velocities: parallel motion, separation never changes.
        if rel_vel_sq == 0.0 {
            return clear;
        }

        let dot = rel_pos.x * rel_vel.x + rel_pos.y * rel_vel.y;
        // Positive projection: the agents are separating.
        if dot > 0.0 {
            return clear;
        }

        let tau = -dot / rel_vel_sq;
        if tau < 0.0 {
            return clear;
        }

        let future_a = Point::new(pos_a.x + vel_a.x * tau, pos_a.y + vel_a.y * tau);
        let future_b = Point::new(pos_b.x + vel_b.x * tau, pos_b.y + vel_b.y * tau);
        let distance = future_a.distance(&future_b);

        if distance < self.min_distance {
            debug!(
                "conflict for pair ({}, {}) at t={time}: ttc={tau:.3}, distance={distance:.3}",
                a.track_id(),
                b.track_id()
            );
            return ConflictRecord {
                ttc: Some(tau),
                collision_point: Some(future_a),
                min_distance: Some(distance),
                conflict_detected: true,
                ..clear
            };
        }

        clear
    }

    /// Sweep one pair across a time window and merge the records into the
    /// history. Returns the number of sampled instants.
    pub fn analyze_pair(
        &mut self,
        a: &TrajectoryModel,
        b: &TrajectoryModel,
        window: &SweepWindow,
    ) -> usize {
        let records = self.sweep_pair(a, b, window);
        let count = records.len();
        self.history
            .entry(pair_key(a.track_id(), b.track_id()))
            .or_default()
            .extend(records);
        count
    }

    /// Sweep every unordered pair among `models`. Fewer than 2 models is
    /// a no-op with a warning.
    pub fn analyze_all(&mut self, models: &[&TrajectoryModel], window: &SweepWindow) {
        if models.len() < 2 {
            warn!("at least 2 trajectory models are required for conflict analysis");
            return;
        }

        for i in 0..models.len() - 1 {
            for j in i + 1..models.len() {
                self.analyze_pair(models[i], models[j], window);
            }
        }

        info!("Analyzed {} trajectory pairs", self.history.len());
    }

    /// Minimum-TTC record for one analyzed pair. `Ok(None)` means the
    /// pair was analyzed but never flagged. Ties in minimal ttc go to the
    /// earliest sampled time, a consequence of the time-ordered history
    /// rather than a semantic guarantee.
    pub fn minimum_ttc(&self, pair: PairKey) -> Result<Option<MinimumTtc>, ConflictError> {
        let records = self
            .history
            .get(&pair_key(pair.0, pair.1))
            .ok_or(ConflictError::UnknownPair {
                a: pair.0,
                b: pair.1,
            })?;

        let mut best: Option<&ConflictRecord> = None;
        for record in records.values().filter(|r| r.conflict_detected) {
            let better = match best {
                Some(current) => record.ttc < current.ttc,
                None => true,
            };
            if better {
                best = Some(record);
            }
        }

        Ok(best.map(|r| MinimumTtc {
            // Flagged records always carry ttc/point/distance.
            min_ttc: r.ttc.unwrap_or_default(),
            time_of_min: r.time_checked,
            collision_point: r.collision_point.unwrap_or(Point::new(0.0, 0.0)),
            min_distance: r.min_distance.unwrap_or_default(),
        }))
    }

    /// Minimum TTC for every analyzed pair, omitting pairs that were
    /// never flagged.
    pub fn all_minimum_ttc(&self) -> BTreeMap<PairKey, MinimumTtc> {
        let mut results = BTreeMap::new();
        for &pair in self.history.keys() {
            if let Ok(Some(min)) = self.minimum_ttc(pair) {
                results.insert(pair, min);
            }
        }

        info!("Found minimum TTC for {} tracked object pairs", results.len());
        results
    }

    /// Flagged records per pair, omitting conflict-free pairs.
    pub fn flagged_conflicts(&self) -> BTreeMap<PairKey, Vec<&ConflictRecord>> {
        let mut filtered = BTreeMap::new();
        for (&pair, records) in &self.history {
            let flagged: Vec<&ConflictRecord> =
                records.values().filter(|r| r.conflict_detected).collect();
            if !flagged.is_empty() {
                filtered.insert(pair, flagged);
            }
        }
        filtered
    }

    pub fn history(&self) -> &BTreeMap<PairKey, BTreeMap<TimeKey, ConflictRecord>> {
        &self.history
    }

    fn sweep_pair(
        &self,
        a: &TrajectoryModel,
        b: &TrajectoryModel,
        window: &SweepWindow,
    ) -> BTreeMap<TimeKey, ConflictRecord> {
        let mut records = BTreeMap::new();

        let (start, end) = match (window.start, window.end) {
            (Some(start), Some(end)) => (start, end),
            _ => match overlap_period(a, b) {
                Some(bounds) => bounds,
                None => return records,
            },
        };

        // floor((end - start) / step) + 1 samples, evenly spaced from
        // start to end inclusive.
        let n = ((end - start) / window.step).floor() as usize + 1;
        for k in 0..n {
            let t = if n == 1 {
                start
            } else {
                start + (end - start) * k as f64 / (n - 1) as f64
            };
            let rounded = round_time(t);
            records.insert(time_key(rounded), self.instant_conflict(a, b, rounded));
        }

        records
    }
}

fn pair_key(a: u32, b: u32) -> PairKey {
    (a.min(b), a.max(b))
}

fn round_time(t: f64) -> f64 {
    (t * 100.0).round() / 100.0
}

fn time_key(t: f64) -> TimeKey {
    (t * 100.0).round() as TimeKey
}

/// Overlap of the two trajectories' sampled time ranges, `None` when the
/// ranges are disjoint or either trajectory is empty.
fn overlap_period(a: &TrajectoryModel, b: &TrajectoryModel) -> Option<(f64, f64)> {
    let (min_a, max_a) = a.time_range()?;
    let (min_b, max_b) = b.time_range()?;

    let start = min_a.max(min_b);
    let end = max_a.min(max_b);
    if start > end {
        warn!(
            "tracks {} and {} don't overlap in time",
            a.track_id(),
            b.track_id()
        );
        return None;
    }

    info!(
        "Analyzing tracks {} and {} from {start:.2} to {end:.2}",
        a.track_id(),
        b.track_id()
    );
    Some((start, end))
}
