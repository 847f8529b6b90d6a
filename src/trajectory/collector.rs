// src/trajectory/collector.rs

use crate::error::ConflictError;
use crate::types::{PositionSample, TrackedObject};
use std::collections::HashMap;
use std::time::Instant;
use tracing::debug;

/// How sample timestamps are derived. Chosen once at construction and
/// fixed for the aggregator's lifetime.
#[derive(Debug, Clone, Copy)]
pub enum TimestampMode {
    /// timestamp = frame_idx / fps
    FrameRate(f64),
    /// timestamp = wall-clock seconds since the aggregator was created
    WallClock,
}

/// Accumulates raw per-frame tracker output into per-identifier,
/// time-ordered position sequences.
pub struct TrackAggregator {
    mode: TimestampMode,
    started: Instant,
    trajectories: HashMap<u32, Vec<PositionSample>>,
}

impl TrackAggregator {
    pub fn new(mode: TimestampMode) -> Self {
        Self {
            mode,
            started: Instant::now(),
            trajectories: HashMap::new(),
        }
    }

    /// Append one sample per tracked object that carries an identity.
    /// Unassociated entries (`track_id: None`) cannot be attributed to a
    /// trajectory and are dropped.
    pub fn collect(&mut self, frame_idx: u64, tracks: &[TrackedObject]) {
        let timestamp = match self.mode {
            TimestampMode::FrameRate(fps) => frame_idx as f64 / fps,
            TimestampMode::WallClock => self.started.elapsed().as_secs_f64(),
        };

        for track in tracks {
            let Some(tid) = track.track_id else {
                debug!("track_id for frame {frame_idx} is None, skipping");
                continue;
            };

            self.trajectories.entry(tid).or_default().push(PositionSample {
                track_id: tid,
                frame_idx,
                timestamp,
                bbox: track.bbox,
                class_name: track.class_name.clone(),
                confidence: track.confidence,
            });
        }
    }

    pub fn trajectory(&self, track_id: u32) -> Result<&[PositionSample], ConflictError> {
        self.ready()?;
        Ok(self
            .trajectories
            .get(&track_id)
            .map(Vec::as_slice)
            .unwrap_or(&[]))
    }

    pub fn all_trajectories(&self) -> Result<&HashMap<u32, Vec<PositionSample>>, ConflictError> {
        self.ready()?;
        Ok(&self.trajectories)
    }

    pub fn track_ids(&self) -> Result<Vec<u32>, ConflictError> {
        self.ready()?;
        let mut ids: Vec<u32> = self.trajectories.keys().copied().collect();
        ids.sort_unstable();
        Ok(ids)
    }

    /// Number of distinct tracks collected so far.
    pub fn len(&self) -> usize {
        self.trajectories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trajectories.is_empty()
    }

    fn ready(&self) -> Result<(), ConflictError> {
        if self.trajectories.is_empty() {
            return Err(ConflictError::NotReady);
        }
        Ok(())
    }
}
