//! Configuration and footprint catalogue report

use anyhow::Result;
use geoclip_core::LodConfig;
use geoclip_terrain::placement::{generate_footprints, generate_placements, select_placements};
use geoclip_terrain::{Footprint, TrimOrientation};
use serde::Serialize;

use super::LodArgs;

pub struct InfoArgs {
    pub lod: LodArgs,
    pub format: String,
}

#[derive(Serialize)]
struct ConfigReport {
    k: u8,
    d: usize,
    n: usize,
    m: usize,
    d2: usize,
    h: i32,
    l: u8,
    r: u8,
    height_ratio: f32,
}

#[derive(Serialize)]
struct FootprintReport {
    kind: &'static str,
    width: usize,
    depth: usize,
    vertices: usize,
    indices: usize,
}

#[derive(Serialize)]
struct SelectionReport {
    orientation: &'static str,
    placements: usize,
}

#[derive(Serialize)]
struct InfoReport {
    config: ConfigReport,
    footprints: Vec<FootprintReport>,
    placements: usize,
    selections: Vec<SelectionReport>,
    /// Most indices submitted in one frame
    frame_indices: usize,
}

pub fn run(args: InfoArgs) -> Result<()> {
    let config = args.lod.resolve()?;
    let report = build_report(&config);

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        "text" => print_text(&report),
        _ => anyhow::bail!("Unknown format: {}", args.format),
    }
    Ok(())
}

fn build_report(config: &LodConfig) -> InfoReport {
    let footprints = generate_footprints(config);
    let placements = generate_placements(config);

    let indices_for = |orientation: TrimOrientation| -> usize {
        select_placements(&placements, orientation)
            .into_iter()
            .map(|i| placements[i].resolve(&footprints).index_count())
            .sum()
    };

    // The finest drawn level fills its centre; the others draw a corner trim.
    // The active range stops at level 0, so never more than L levels.
    let drawn = config.r().min(config.l()) as usize;
    let corner = indices_for(TrimOrientation::TopRight);
    let frame_indices = indices_for(TrimOrientation::All) + corner * (drawn - 1);

    InfoReport {
        config: ConfigReport {
            k: config.k(),
            d: config.d(),
            n: config.n(),
            m: config.m(),
            d2: config.d2(),
            h: config.h(),
            l: config.l(),
            r: config.r(),
            height_ratio: config.height_ratio(),
        },
        footprints: footprints.iter().map(footprint_report).collect(),
        placements: placements.len(),
        selections: TrimOrientation::ALL
            .iter()
            .map(|&o| SelectionReport {
                orientation: o.name(),
                placements: select_placements(&placements, o).len(),
            })
            .collect(),
        frame_indices,
    }
}

fn footprint_report(f: &Footprint) -> FootprintReport {
    FootprintReport {
        kind: f.kind().name(),
        width: f.width(),
        depth: f.depth(),
        vertices: f.vertex_count(),
        indices: f.index_count(),
    }
}

fn print_text(report: &InfoReport) {
    let c = &report.config;
    println!("Clipmap configuration:");
    println!("  K = {}  (D = {}, N = {}, M = {}, D/2 = {}, H = {})", c.k, c.d, c.n, c.m, c.d2, c.h);
    println!("  L = {} levels, R = {} drawn", c.l, c.r);
    println!("  height ratio = {}", c.height_ratio);
    println!();

    println!("Footprints:");
    for f in &report.footprints {
        println!(
            "  {:<26} {:>4} x {:<4} {:>6} vertices {:>6} indices",
            f.kind, f.width, f.depth, f.vertices, f.indices
        );
    }
    println!();

    println!("Placements: {}", report.placements);
    for s in &report.selections {
        println!("  {:<13} {}", s.orientation, s.placements);
    }
    println!();
    println!("Indices per frame: {}", report.frame_indices);
}
