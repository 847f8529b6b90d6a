// src/report.rs
//
// Exportable conflict report: the per-pair minimum-TTC results plus a
// digest of every trajectory that went into the analysis.

use crate::conflict::{MinimumTtc, PairKey};
use crate::projector::{Direction, PlanarProjector};
use crate::trajectory::{TrajectoryModel, TrajectorySummary};
use crate::types::Point;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairConflict {
    pub track_a: u32,
    pub track_b: u32,
    pub min_ttc: f64,
    pub time_of_min: f64,
    /// Predicted collision point in the analysis plane.
    pub collision_point: Point,
    /// The same point projected onto the world plane, when requested.
    pub world_collision_point: Option<Point>,
    pub min_distance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictReport {
    pub pairs: Vec<PairConflict>,
    pub trajectories: Vec<TrajectorySummary>,
}

impl ConflictReport {
    pub fn new(
        minima: &BTreeMap<PairKey, MinimumTtc>,
        models: &HashMap<u32, TrajectoryModel>,
    ) -> Self {
        let pairs = minima
            .iter()
            .map(|(&(track_a, track_b), min)| PairConflict {
                track_a,
                track_b,
                min_ttc: min.min_ttc,
                time_of_min: min.time_of_min,
                collision_point: min.collision_point,
                world_collision_point: None,
                min_distance: min.min_distance,
            })
            .collect();

        let mut trajectories: Vec<TrajectorySummary> =
            models.values().filter_map(|m| m.summary()).collect();
        trajectories.sort_by_key(|s| s.track_id);

        Self {
            pairs,
            trajectories,
        }
    }

    /// Attach world-plane collision points by projecting each pair's
    /// collision point forward through `projector`.
    pub fn with_world_points(mut self, projector: &PlanarProjector) -> Result<Self> {
        for pair in &mut self.pairs {
            let projected = projector
                .project(&[pair.collision_point], Direction::Forward)
                .context("failed to project collision point")?;
            pair.world_collision_point = projected.first().copied();
        }
        Ok(self)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize conflict report")
    }

    pub fn write_json(&self, path: &str) -> Result<()> {
        fs::write(path, self.to_json()?)
            .with_context(|| format!("failed to write report to {path}"))?;
        info!("Conflict report saved to {path}");
        Ok(())
    }
}
