// src/main.rs

use anyhow::Result;
use conflict_detection::{
    AnalysisOrchestrator, Config, ConflictReport, PlanarProjector, Point, RecordedTracks,
    SweepWindow, TimestampMode,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.yaml".to_string());
    let config = Config::load(&config_path)?;

    let filter = EnvFilter::try_new(&config.logging.level)
        .unwrap_or_else(|_| EnvFilter::new("conflict_detection=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("🚦 Traffic Conflict Detection Starting");
    info!("✓ Configuration loaded from {config_path}");

    let image_quad = quad_points(&config.homography.image_quad);
    let world_quad = quad_points(&config.homography.world_quad);
    let projector = PlanarProjector::new(&image_quad, &world_quad)?;
    info!("✓ Homography ready");

    let mode = if config.video.use_wall_time {
        TimestampMode::WallClock
    } else {
        TimestampMode::FrameRate(config.video.fps)
    };
    let mut orchestrator =
        AnalysisOrchestrator::new(projector, mode, config.conflict.min_distance);

    let recorded = RecordedTracks::load(&config.input.track_log)?;
    for frame in recorded.frames() {
        orchestrator.collect_tracks(frame.frame_idx, &frame.tracks);
    }

    let built = orchestrator.build_models()?;
    info!("✓ Built {built} trajectory models");

    let window = SweepWindow::with_step(config.conflict.step);
    let minima = orchestrator.detect_conflicts(&window)?;

    if minima.is_empty() {
        info!("No conflicts detected");
    }
    for ((a, b), min) in &minima {
        info!(
            "⚠️  Conflict {a} ↔ {b}: ttc {:.2}s at t={:.2}s (separation {:.2})",
            min.min_ttc, min.time_of_min, min.min_distance
        );
    }

    let report = ConflictReport::new(&minima, orchestrator.models())
        .with_world_points(orchestrator.projector())?;

    if let Some(path) = &config.input.report_out {
        report.write_json(path)?;
    }

    Ok(())
}

fn quad_points(raw: &[[f64; 2]]) -> Vec<Point> {
    raw.iter().map(|p| Point::new(p[0], p[1])).collect()
}
