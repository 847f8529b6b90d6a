// src/projector.rs
//
// Homography between camera pixel space and the real-world ground plane.
// The matrix is estimated once from 4 point correspondences via Direct
// Linear Transformation and is immutable afterwards; projection works in
// both directions through the retained inverse.

use crate::error::ConflictError;
use crate::types::Point;
use nalgebra::{Matrix3, SMatrix, SVector, Vector3};
use tracing::debug;

/// Projection direction. Forward = source plane (pixels) to destination
/// plane (world), backward = the reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Exactly four planar points in canonical order:
/// [bottom-left, bottom-right, top-right, top-left].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointQuad {
    pts: [Point; 4],
}

impl PointQuad {
    /// Validate cardinality and canonicalize point order.
    ///
    /// The four points are split by their mean y: the two points below the
    /// mean (larger y) form the bottom edge, the rest the top edge, and
    /// each edge is ordered by ascending x. Input order is arbitrary.
    pub fn canonical(pts: &[Point], argument: &'static str) -> Result<Self, ConflictError> {
        if pts.len() != 4 {
            return Err(ConflictError::Validation {
                argument,
                reason: format!("expected exactly 4 points, got {}", pts.len()),
            });
        }

        let mean_y = pts.iter().map(|p| p.y).sum::<f64>() / 4.0;
        let mut bottom: Vec<Point> = pts.iter().copied().filter(|p| p.y > mean_y).collect();
        let mut top: Vec<Point> = pts.iter().copied().filter(|p| p.y <= mean_y).collect();

        if bottom.len() != 2 || top.len() != 2 {
            return Err(ConflictError::DegenerateGeometry {
                reason: format!(
                    "{argument} cannot be split into a bottom and top edge (mean y split gave {}/{})",
                    bottom.len(),
                    top.len()
                ),
            });
        }

        bottom.sort_by(|a, b| a.x.total_cmp(&b.x));
        top.sort_by(|a, b| a.x.total_cmp(&b.x));

        Ok(Self {
            pts: [bottom[0], bottom[1], top[1], top[0]],
        })
    }

    pub fn points(&self) -> &[Point; 4] {
        &self.pts
    }
}

/// Projective transform between two coordinate planes.
#[derive(Debug)]
pub struct PlanarProjector {
    src: PointQuad,
    dst: PointQuad,
    h: Matrix3<f64>,
    h_inv: Matrix3<f64>,
}

impl PlanarProjector {
    /// Estimate the homography mapping `src_pts` onto `dst_pts`.
    ///
    /// Both arguments must contain exactly 4 points; each quad is
    /// canonicalized independently, so the two inputs may be given in
    /// different orders as long as they describe corresponding corners.
    pub fn new(src_pts: &[Point], dst_pts: &[Point]) -> Result<Self, ConflictError> {
        let src = PointQuad::canonical(src_pts, "src_pts")?;
        let dst = PointQuad::canonical(dst_pts, "dst_pts")?;

        let h = Self::solve_dlt(&src, &dst)?;
        let h_inv = h.try_inverse().ok_or_else(|| ConflictError::DegenerateGeometry {
            reason: "homography is not invertible".to_string(),
        })?;

        debug!("Homography estimated from 4 correspondences");

        Ok(Self { src, dst, h, h_inv })
    }

    /// Solve for H with Direct Linear Transformation.
    ///
    /// Each correspondence (u, v) -> (x, y) contributes two rows to a 9x9
    /// system; the ninth row pins h[8] = 1 so the 8 remaining unknowns are
    /// fully determined. H is normalized so H[2][2] = 1.
    fn solve_dlt(src: &PointQuad, dst: &PointQuad) -> Result<Matrix3<f64>, ConflictError> {
        let mut a = SMatrix::<f64, 9, 9>::zeros();
        a[(8, 8)] = 1.0;

        for (i, (s, d)) in src.points().iter().zip(dst.points().iter()).enumerate() {
            let (u, v) = (s.x, s.y);
            let (x, y) = (d.x, d.y);

            let row_x = [-u, -v, -1.0, 0.0, 0.0, 0.0, u * x, v * x, x];
            let row_y = [0.0, 0.0, 0.0, -u, -v, -1.0, u * y, v * y, y];
            for c in 0..9 {
                a[(2 * i, c)] = row_x[c];
                a[(2 * i + 1, c)] = row_y[c];
            }
        }

        let mut b = SVector::<f64, 9>::zeros();
        b[8] = 1.0;

        let h = a.lu().solve(&b).ok_or_else(|| ConflictError::DegenerateGeometry {
            reason: "DLT system is singular (collinear or duplicate source points)".to_string(),
        })?;

        let m = Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]);
        Ok(m / m[(2, 2)])
    }

    /// Transform points between the two planes. Output order matches
    /// input order; an empty slice is a no-op.
    pub fn project(&self, pts: &[Point], direction: Direction) -> Result<Vec<Point>, ConflictError> {
        if pts.is_empty() {
            return Ok(Vec::new());
        }

        let m = match direction {
            Direction::Forward => &self.h,
            Direction::Backward => &self.h_inv,
        };

        pts.iter()
            .map(|p| {
                let v = m * Vector3::new(p.x, p.y, 1.0);
                if v.z == 0.0 {
                    return Err(ConflictError::DegenerateGeometry {
                        reason: format!(
                            "point ({}, {}) maps to a zero homogeneous coordinate",
                            p.x, p.y
                        ),
                    });
                }
                Ok(Point::new(v.x / v.z, v.y / v.z))
            })
            .collect()
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.h
    }

    pub fn source_quad(&self) -> &PointQuad {
        &self.src
    }

    pub fn destination_quad(&self) -> &PointQuad {
        &self.dst
    }
}
