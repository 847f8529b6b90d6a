use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub video: VideoConfig,
    pub conflict: ConflictConfig,
    pub homography: HomographyConfig,
    pub input: InputConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoConfig {
    pub fps: f64,
    pub use_wall_time: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictConfig {
    /// Separation threshold (same units as the trajectory plane) under
    /// which a predicted closest approach counts as a conflict.
    pub min_distance: f64,
    /// Sweep sampling interval in seconds.
    pub step: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomographyConfig {
    /// Four pixel-space reference points, any order.
    pub image_quad: Vec<[f64; 2]>,
    /// Four world-plane points corresponding to `image_quad`.
    pub world_quad: Vec<[f64; 2]>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    pub track_log: String,
    pub report_out: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

/// Planar point in whichever coordinate system the caller is working in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        ((other.x - self.x).powi(2) + (other.y - self.y).powi(2)).sqrt()
    }
}

/// Axis-aligned box in (x1, y1, x2, y2) corner form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn center(&self) -> Point {
        Point::new((self.x1 + self.x2) * 0.5, (self.y1 + self.y2) * 0.5)
    }

    /// (width, height)
    pub fn size(&self) -> (f64, f64) {
        (self.x2 - self.x1, self.y2 - self.y1)
    }
}

#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
    pub timestamp: f64,
}

/// Raw detector output for one object in one frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub confidence: f32,
    pub class_id: u32,
    pub class_name: String,
}

/// Tracker output: a detection with a persistent identity attached.
/// `track_id` of `None` means the tracker could not associate the
/// detection with any object; such entries never enter a trajectory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedObject {
    pub bbox: BoundingBox,
    pub confidence: f32,
    pub class_name: String,
    pub track_id: Option<u32>,
}

/// One time-stamped observation of a tracked object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionSample {
    pub track_id: u32,
    pub frame_idx: u64,
    pub timestamp: f64,
    pub bbox: BoundingBox,
    pub class_name: String,
    pub confidence: f32,
}

impl PositionSample {
    pub fn center(&self) -> Point {
        self.bbox.center()
    }

    pub fn size(&self) -> (f64, f64) {
        self.bbox.size()
    }
}
