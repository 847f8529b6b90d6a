// src/interface.rs
//
// Capability seams for the external detection and tracking stages. The
// core never inspects concrete implementations; anything that can
// produce detections and tracked objects can feed the pipeline.

use crate::types::{Detection, Frame, TrackedObject};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use tracing::info;

/// Object detection over a single frame.
pub trait Detector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>>;
}

/// Identity association across frames. Entries the tracker cannot
/// associate carry `track_id: None` and are dropped downstream.
pub trait Tracker {
    fn track(&mut self, detections: &[Detection]) -> Result<Vec<TrackedObject>>;
}

/// One frame's worth of tracker output in a recorded log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameTracks {
    pub frame_idx: u64,
    pub tracks: Vec<TrackedObject>,
}

/// Replay adapter: a tracker run recorded to JSON, replayed frame by
/// frame into the aggregator.
pub struct RecordedTracks {
    frames: Vec<FrameTracks>,
}

impl RecordedTracks {
    pub fn load(path: &str) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("failed to read track log {path}"))?;
        let recorded = Self::from_json(&contents)?;
        info!("Loaded {} recorded frames from {path}", recorded.frames.len());
        Ok(recorded)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let frames: Vec<FrameTracks> =
            serde_json::from_str(json).context("malformed track log")?;
        Ok(Self { frames })
    }

    pub fn frames(&self) -> &[FrameTracks] {
        &self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_log_parsing() {
        let json = r#"[
            {
                "frame_idx": 1,
                "tracks": [
                    {
                        "bbox": { "x1": 0.0, "y1": 0.0, "x2": 4.0, "y2": 4.0 },
                        "confidence": 0.92,
                        "class_name": "car",
                        "track_id": 1
                    },
                    {
                        "bbox": { "x1": 10.0, "y1": 0.0, "x2": 14.0, "y2": 4.0 },
                        "confidence": 0.4,
                        "class_name": "person",
                        "track_id": null
                    }
                ]
            }
        ]"#;

        let recorded = RecordedTracks::from_json(json).unwrap();
        assert_eq!(recorded.frames().len(), 1);
        let frame = &recorded.frames()[0];
        assert_eq!(frame.frame_idx, 1);
        assert_eq!(frame.tracks.len(), 2);
        assert_eq!(frame.tracks[0].track_id, Some(1));
        assert_eq!(frame.tracks[1].track_id, None);
    }

    #[test]
    fn test_malformed_log_is_an_error() {
        assert!(RecordedTracks::from_json("{\"not\": \"a list\"}").is_err());
    }
}
