// src/lib.rs
//
// Traffic conflict detection core.
//
// Signal flow:
//   Tracker output → trajectory::TrackAggregator (per-frame accumulation)
//                  → trajectory::TrajectoryModel (frozen interpolation queries)
//                  → conflict::ConflictEngine    (pairwise TTC sweep)
//                  → minimum-TTC report
//   projector::PlanarProjector maps pixel-space centers onto the world
//   plane on either side of the analysis; the engine itself is
//   coordinate-plane-agnostic.

mod config;
pub mod conflict;
pub mod error;
pub mod interface;
pub mod orchestrator;
pub mod projector;
pub mod report;
pub mod trajectory;
pub mod types;

// Re-exports for ergonomic access from the binary and tests.
pub use conflict::{ConflictEngine, ConflictRecord, MinimumTtc, PairKey, SweepWindow};
pub use error::ConflictError;
pub use interface::{Detector, FrameTracks, RecordedTracks, Tracker};
pub use orchestrator::AnalysisOrchestrator;
pub use projector::{Direction, PlanarProjector, PointQuad};
pub use report::{ConflictReport, PairConflict};
pub use trajectory::{TimestampMode, TrackAggregator, TrajectoryModel, TrajectorySummary};
pub use types::{BoundingBox, Config, Detection, Frame, Point, PositionSample, TrackedObject};
