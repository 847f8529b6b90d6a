// src/trajectory/mod.rs
//
// Per-track position history.
//
// Signal flow:
//   Tracker output → collector (per-frame accumulation)
//                  → model (frozen, time-indexed interpolation queries)

pub mod collector;
pub mod model;

pub use collector::{TimestampMode, TrackAggregator};
pub use model::{TrajectoryModel, TrajectorySummary};
