// src/orchestrator.rs
//
// Composition layer: wires aggregated tracks into trajectory models and
// drives the conflict engine over all pairs. Deliberately thin; all
// geometry lives in the leaf modules.

use crate::conflict::{ConflictEngine, MinimumTtc, PairKey, SweepWindow};
use crate::error::ConflictError;
use crate::interface::{Detector, Tracker};
use crate::projector::{Direction, PlanarProjector};
use crate::trajectory::{TimestampMode, TrackAggregator, TrajectoryModel};
use crate::types::{Frame, Point, TrackedObject};
use std::collections::{BTreeMap, HashMap};
use tracing::info;

pub struct AnalysisOrchestrator {
    aggregator: TrackAggregator,
    projector: PlanarProjector,
    engine: ConflictEngine,
    models: HashMap<u32, TrajectoryModel>,
}

impl AnalysisOrchestrator {
    pub fn new(projector: PlanarProjector, mode: TimestampMode, min_distance: f64) -> Self {
        Self {
            aggregator: TrackAggregator::new(mode),
            projector,
            engine: ConflictEngine::new(min_distance),
            models: HashMap::new(),
        }
    }

    /// Feed one frame of tracker output into the aggregator.
    pub fn collect_tracks(&mut self, frame_idx: u64, tracks: &[TrackedObject]) {
        self.aggregator.collect(frame_idx, tracks);
    }

    /// Run detection and tracking on a live frame and collect the result.
    pub fn ingest_frame(
        &mut self,
        detector: &mut dyn Detector,
        tracker: &mut dyn Tracker,
        frame: &Frame,
        frame_idx: u64,
    ) -> anyhow::Result<usize> {
        let detections = detector.detect(frame)?;
        let tracks = tracker.track(&detections)?;
        self.collect_tracks(frame_idx, &tracks);
        Ok(tracks.len())
    }

    /// Freeze one trajectory model per collected track id. Returns the
    /// number of models built.
    pub fn build_models(&mut self) -> Result<usize, ConflictError> {
        let trajectories = self.aggregator.all_trajectories()?;
        self.models = trajectories
            .iter()
            .map(|(&id, samples)| (id, TrajectoryModel::new(id, samples.clone())))
            .collect();

        info!("Built {} trajectory models", self.models.len());
        Ok(self.models.len())
    }

    pub fn model(&self, track_id: u32) -> Option<&TrajectoryModel> {
        self.models.get(&track_id)
    }

    pub fn models(&self) -> &HashMap<u32, TrajectoryModel> {
        &self.models
    }

    pub fn projector(&self) -> &PlanarProjector {
        &self.projector
    }

    pub fn engine(&self) -> &ConflictEngine {
        &self.engine
    }

    /// Every trajectory's center polyline projected onto the world plane.
    pub fn world_centers(&self) -> Result<HashMap<u32, Vec<Point>>, ConflictError> {
        if self.models.is_empty() {
            return Err(ConflictError::NotReady);
        }

        self.models
            .iter()
            .map(|(&id, model)| {
                let projected = self.projector.project(&model.centers(), Direction::Forward)?;
                Ok((id, projected))
            })
            .collect()
    }

    /// Sweep every unordered pair of built models and return the
    /// per-pair minimum-TTC report.
    pub fn detect_conflicts(
        &mut self,
        window: &SweepWindow,
    ) -> Result<BTreeMap<PairKey, MinimumTtc>, ConflictError> {
        if self.models.is_empty() {
            return Err(ConflictError::NotReady);
        }

        let mut models: Vec<&TrajectoryModel> = self.models.values().collect();
        models.sort_by_key(|m| m.track_id());

        self.engine.analyze_all(&models, window);
        Ok(self.engine.all_minimum_ttc())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BoundingBox, Detection};

    fn projector() -> PlanarProjector {
        let image = vec![
            Point::new(0.0, 100.0),
            Point::new(100.0, 100.0),
            Point::new(100.0, 0.0),
            Point::new(0.0, 0.0),
        ];
        let world = vec![
            Point::new(0.0, 10.0),
            Point::new(10.0, 10.0),
            Point::new(10.0, 0.0),
            Point::new(0.0, 0.0),
        ];
        PlanarProjector::new(&image, &world).unwrap()
    }

    fn tracked(id: u32, cx: f64, cy: f64) -> TrackedObject {
        TrackedObject {
            bbox: BoundingBox::new(cx - 1.0, cy - 1.0, cx + 1.0, cy + 1.0),
            confidence: 0.9,
            class_name: "car".to_string(),
            track_id: Some(id),
        }
    }

    /// Two tracks on a head-on course along y=50, 10 fps.
    fn orchestrator_with_frames() -> AnalysisOrchestrator {
        let mut orchestrator =
            AnalysisOrchestrator::new(projector(), TimestampMode::FrameRate(10.0), 2.0);
        for frame in 1..=11u64 {
            let t = (frame - 1) as f64;
            orchestrator.collect_tracks(
                frame,
                &[
                    tracked(1, t * 2.0, 50.0),
                    tracked(2, 40.0 - t * 2.0, 50.0),
                ],
            );
        }
        orchestrator
    }

    #[test]
    fn test_end_to_end_conflict_sweep() {
        let mut orchestrator = orchestrator_with_frames();
        assert_eq!(orchestrator.build_models().unwrap(), 2);

        let minima = orchestrator
            .detect_conflicts(&SweepWindow::default())
            .unwrap();
        let min = minima.get(&(1, 2)).expect("head-on pair must be flagged");
        assert!(min.min_ttc >= 0.0);
        assert!(min.min_distance < 2.0);
        // Symmetric closing at y=50 meets at x=20.
        assert!((min.collision_point.x - 20.0).abs() < 1e-6);
        assert!((min.collision_point.y - 50.0).abs() < 1e-6);
    }

    #[test]
    fn test_conflicts_before_models_fail() {
        let mut orchestrator =
            AnalysisOrchestrator::new(projector(), TimestampMode::FrameRate(10.0), 2.0);
        assert!(matches!(
            orchestrator.detect_conflicts(&SweepWindow::default()),
            Err(ConflictError::NotReady)
        ));
        assert!(matches!(
            orchestrator.world_centers(),
            Err(ConflictError::NotReady)
        ));
    }

    struct CannedDetector {
        detections: Vec<Detection>,
    }

    impl Detector for CannedDetector {
        fn detect(&mut self, _frame: &Frame) -> anyhow::Result<Vec<Detection>> {
            Ok(self.detections.clone())
        }
    }

    struct IdentityTracker;

    impl Tracker for IdentityTracker {
        fn track(&mut self, detections: &[Detection]) -> anyhow::Result<Vec<TrackedObject>> {
            Ok(detections
                .iter()
                .map(|d| TrackedObject {
                    bbox: d.bbox,
                    confidence: d.confidence,
                    class_name: d.class_name.clone(),
                    track_id: Some(d.class_id),
                })
                .collect())
        }
    }

    #[test]
    fn test_ingest_frame_through_capability_seams() {
        let mut orchestrator =
            AnalysisOrchestrator::new(projector(), TimestampMode::FrameRate(10.0), 2.0);
        let mut detector = CannedDetector {
            detections: vec![Detection {
                bbox: BoundingBox::new(10.0, 10.0, 14.0, 14.0),
                confidence: 0.8,
                class_id: 2,
                class_name: "car".to_string(),
            }],
        };
        let mut tracker = IdentityTracker;
        let frame = Frame {
            data: Vec::new(),
            width: 100,
            height: 100,
            timestamp: 0.0,
        };

        for frame_idx in 1..=2 {
            let n = orchestrator
                .ingest_frame(&mut detector, &mut tracker, &frame, frame_idx)
                .unwrap();
            assert_eq!(n, 1);
        }

        assert_eq!(orchestrator.build_models().unwrap(), 1);
        assert!(orchestrator.model(2).is_some());
    }

    #[test]
    fn test_world_centers_are_projected() {
        let mut orchestrator = orchestrator_with_frames();
        orchestrator.build_models().unwrap();

        let centers = orchestrator.world_centers().unwrap();
        // The projector maps the 100x100 pixel quad onto a 10x10 world
        // plane, so pixel (0, 50) lands at world (0, 5).
        let first = centers[&1][0];
        assert!((first.x - 0.0).abs() < 1e-6);
        assert!((first.y - 5.0).abs() < 1e-6);
    }
}
