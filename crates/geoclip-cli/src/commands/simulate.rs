//! Headless viewer walk
//!
//! Builds a terrain, moves the viewer a fixed step at a time and draws every
//! frame into a `HeadlessDevice`, reporting which levels were resampled and
//! how much data went to the device.

use std::path::Path;

use anyhow::{Context, Result};
use geoclip_terrain::{HeadlessDevice, Terrain};
use glam::IVec2;
use serde::Serialize;

use super::LodArgs;
use crate::heightmap;

pub struct SimulateArgs {
    pub heightmap: Option<String>,
    pub lod: LodArgs,
    pub size: usize,
    pub steps: u32,
    pub step: [i32; 2],
    pub start: Option<[i32; 2]>,
    pub altitude: f32,
    pub format: String,
}

#[derive(Serialize)]
struct LevelReport {
    level: usize,
    scale: i32,
    anchor: [i32; 2],
    trim: &'static str,
    revision: u64,
}

#[derive(Serialize)]
struct FrameReport {
    frame: u32,
    viewer: [i32; 2],
    ground_height: f32,
    active: [usize; 2],
    resampled: Vec<usize>,
    uploads: usize,
    placements: usize,
    levels: Vec<LevelReport>,
}

#[derive(Serialize)]
struct SimulationReport {
    width: usize,
    depth: usize,
    frames: Vec<FrameReport>,
    allocations: usize,
    uploads: usize,
}

pub fn run(args: SimulateArgs) -> Result<()> {
    let config = args.lod.resolve()?;
    let field = match &args.heightmap {
        Some(path) => heightmap::load(Path::new(path))?,
        None => heightmap::synthetic(args.size)?,
    };

    let terrain = match args.start {
        Some([x, z]) => Terrain::with_viewer(field, &config, IVec2::new(x, z)),
        None => Terrain::new(field, &config),
    };

    let report = simulate(
        terrain,
        args.steps,
        IVec2::from(args.step),
        args.altitude,
    )?;

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        "text" => print_text(&report),
        _ => anyhow::bail!("Unknown format: {}", args.format),
    }
    Ok(())
}

fn simulate(
    mut terrain: Terrain,
    steps: u32,
    step: IVec2,
    altitude: f32,
) -> Result<SimulationReport> {
    let mut device = HeadlessDevice::new();
    let mut frames = Vec::with_capacity(steps as usize + 1);

    for frame in 0..=steps {
        let before: Vec<u64> = terrain.levels().iter().map(|l| l.revision()).collect();
        if frame > 0 {
            terrain.move_viewer(step.x, step.y);
        }
        let (finest, coarsest) = terrain.set_active_levels(altitude);

        let uploads_before = device.upload_count();
        let placements = terrain
            .draw(&mut device, |_, _| Ok(()))
            .with_context(|| format!("Failed to draw frame {}", frame))?;

        let resampled = terrain
            .levels()
            .iter()
            .zip(&before)
            .filter(|(level, rev)| frame == 0 || level.revision() != **rev)
            .map(|(level, _)| level.level())
            .collect();

        frames.push(FrameReport {
            frame,
            viewer: terrain.viewer().to_array(),
            ground_height: terrain.ground_height(),
            active: [finest, coarsest],
            resampled,
            uploads: device.upload_count() - uploads_before,
            placements,
            levels: terrain
                .levels()
                .iter()
                .map(|l| LevelReport {
                    level: l.level(),
                    scale: l.scale(),
                    anchor: l.anchor().to_array(),
                    trim: terrain.orientation_for_level(l.level()).name(),
                    revision: l.revision(),
                })
                .collect(),
        });
    }

    let report = SimulationReport {
        width: terrain.heightfield().width(),
        depth: terrain.heightfield().depth(),
        frames,
        allocations: device.allocation_count(),
        uploads: device.upload_count(),
    };

    terrain.release_device_buffers(&mut device);
    log::debug!("{} device buffers alive after release", device.live_buffers());
    Ok(report)
}

fn print_text(report: &SimulationReport) {
    println!("Height field: {}x{}", report.width, report.depth);
    println!();
    println!("frame  viewer         ground  active  uploads  placements  resampled");
    for f in &report.frames {
        let resampled: Vec<String> = f.resampled.iter().map(|l| l.to_string()).collect();
        println!(
            "{:>5}  {:>6},{:<6}  {:>6.3}  {:>2}..{:<2}  {:>7}  {:>10}  {}",
            f.frame,
            f.viewer[0],
            f.viewer[1],
            f.ground_height,
            f.active[1],
            f.active[0],
            f.uploads,
            f.placements,
            if resampled.is_empty() { "-".to_string() } else { resampled.join(",") }
        );
    }
    println!();
    println!(
        "Device: {} allocations, {} uploads",
        report.allocations, report.uploads
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoclip_core::LodConfig;

    fn terrain() -> Terrain {
        let field = heightmap::synthetic(128).unwrap();
        Terrain::with_viewer(field, &LodConfig::new(4, 5, 3), IVec2::new(64, 64))
    }

    #[test]
    fn first_frame_uploads_everything() {
        let report = simulate(terrain(), 0, IVec2::ZERO, 0.0).unwrap();
        assert_eq!(report.frames.len(), 1);

        let frame = &report.frames[0];
        assert_eq!(frame.viewer, [64, 64]);
        assert_eq!(frame.active, [4, 2]);
        assert_eq!(frame.resampled, vec![0, 1, 2, 3, 4]);
        // 6 footprints x 2 buffers, plus one per drawn level
        assert_eq!(frame.uploads, 12 + 3);
        assert_eq!(frame.placements, 25 + 19 + 19);
        assert_eq!(frame.levels[4].trim, "all");
        assert_eq!(report.allocations, 15);
    }

    #[test]
    fn standing_still_uploads_nothing() {
        let report = simulate(terrain(), 3, IVec2::ZERO, 0.0).unwrap();
        for frame in &report.frames[1..] {
            assert!(frame.resampled.is_empty());
            assert_eq!(frame.uploads, 0);
        }
    }

    #[test]
    fn walking_resamples_the_finest_level_first() {
        let report = simulate(terrain(), 4, IVec2::new(1, 0), 0.0).unwrap();
        let viewers: Vec<[i32; 2]> = report.frames.iter().map(|f| f.viewer).collect();
        assert_eq!(viewers, vec![[64, 64], [65, 64], [66, 64], [67, 64], [68, 64]]);

        // 64 -> 65 keeps every anchor; 65 -> 66 moves only the finest level
        assert!(report.frames[1].resampled.is_empty());
        assert_eq!(report.frames[2].resampled, vec![4]);
        assert_eq!(report.frames[2].uploads, 1);
        // 67 -> 68 crosses a scale-2 boundary too
        assert_eq!(report.frames[4].resampled, vec![3, 4]);
    }

    #[test]
    fn altitude_selects_coarser_levels() {
        let report = simulate(terrain(), 0, IVec2::ZERO, 1.0e6).unwrap();
        assert_eq!(report.frames[0].active, [0, 0]);
        assert_eq!(report.frames[0].placements, 25);
    }
}
