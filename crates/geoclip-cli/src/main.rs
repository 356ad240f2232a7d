//! Geoclip CLI - inspect and exercise the clipmap terrain core

mod commands;
mod heightmap;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use commands::{info, init_config, simulate};

#[derive(Parser)]
#[command(name = "geoclip")]
#[command(about = "Geometry clipmap terrain tools", long_about = None)]
#[command(version)]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the effective configuration and the footprint catalogue
    Info {
        /// Path to a lod.toml file
        #[arg(long)]
        config: Option<String>,

        /// Override K (level size is 2^K)
        #[arg(short)]
        k: Option<u8>,

        /// Override the number of levels
        #[arg(short)]
        l: Option<u8>,

        /// Override the number of drawn levels
        #[arg(short)]
        r: Option<u8>,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Walk a viewer across a height map and report what each level does
    Simulate {
        /// PNG height map (red channel is height); a synthetic field is used
        /// when omitted
        heightmap: Option<String>,

        /// Path to a lod.toml file
        #[arg(long)]
        config: Option<String>,

        #[arg(short)]
        k: Option<u8>,

        #[arg(short)]
        l: Option<u8>,

        #[arg(short)]
        r: Option<u8>,

        /// Side length of the synthetic height field
        #[arg(long, default_value = "512")]
        size: usize,

        /// Number of moves
        #[arg(long, default_value = "16")]
        steps: u32,

        /// Move per step as dx,dz
        #[arg(long, default_value = "3,1", value_parser = parse_ivec2)]
        step: [i32; 2],

        /// Starting viewer cell as x,z (defaults to the field centre)
        #[arg(long, value_parser = parse_ivec2)]
        start: Option<[i32; 2]>,

        /// Camera altitude above the ground, in height field units
        #[arg(long, default_value = "0")]
        altitude: f32,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Write a default lod.toml
    InitConfig {
        /// Output path
        #[arg(default_value = "lod.toml")]
        path: String,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn parse_ivec2(s: &str) -> Result<[i32; 2], String> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != 2 {
        return Err(format!("expected 2 comma-separated values, got {}", parts.len()));
    }
    let x: i32 = parts[0].trim().parse().map_err(|e| format!("invalid x: {}", e))?;
    let z: i32 = parts[1].trim().parse().map_err(|e| format!("invalid z: {}", e))?;
    Ok([x, z])
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Info {
            config,
            k,
            l,
            r,
            format,
        } => info::run(info::InfoArgs {
            lod: commands::LodArgs { config, k, l, r },
            format,
        }),
        Commands::Simulate {
            heightmap,
            config,
            k,
            l,
            r,
            size,
            steps,
            step,
            start,
            altitude,
            format,
        } => simulate::run(simulate::SimulateArgs {
            heightmap,
            lod: commands::LodArgs { config, k, l, r },
            size,
            steps,
            step,
            start,
            altitude,
            format,
        }),
        Commands::InitConfig { path, force } => init_config::run(&path, force),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ivec2_arguments() {
        assert_eq!(parse_ivec2("3,-4"), Ok([3, -4]));
        assert_eq!(parse_ivec2(" 10 , 2 "), Ok([10, 2]));
        assert!(parse_ivec2("1").is_err());
        assert!(parse_ivec2("a,2").is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn simulate_arguments_parse() {
        let cli = Cli::try_parse_from([
            "geoclip", "-vv", "simulate", "-k", "5", "--step", "2,0", "--steps", "4",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Simulate { k, step, steps, heightmap, .. } => {
                assert_eq!(k, Some(5));
                assert_eq!(step, [2, 0]);
                assert_eq!(steps, 4);
                assert!(heightmap.is_none());
            }
            _ => panic!("expected simulate"),
        }
    }
}
