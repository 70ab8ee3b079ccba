use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use geoworld_assets::{Fetcher, HttpFetcher, OfflineFetcher};
use geoworld_common::WorldPoint;
use geoworld_render::{CameraMode, CameraUpdate};
use geoworld_runtime::{Identity, RuntimeConfig, WorldRuntime};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "geoworld-cli", about = "Headless tools for the geoworld runtime")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Runtime config (.yaml, .yml or .json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Never touch the network; imagery and avatars use fallbacks
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Run the world headless and print a summary
    Simulate {
        /// Number of frames to run
        #[arg(short, long, default_value = "120")]
        ticks: u64,
        /// Number of wandering NPCs
        #[arg(short, long, default_value = "3")]
        npcs: usize,
        /// JSON array of property records to render
        #[arg(short, long)]
        properties: Option<PathBuf>,
        /// Camera mode (first_person, top_down, isometric, third_person, freecam)
        #[arg(long)]
        camera: Option<String>,
        /// Print the scene dump after the run
        #[arg(long)]
        dump: bool,
    },
    /// Stream tiles once around a world position
    Stream {
        #[arg(short, long, default_value = "0", allow_hyphen_values = true)]
        x: f32,
        #[arg(short, long, default_value = "0", allow_hyphen_values = true)]
        z: f32,
    },
}

fn load_config(path: Option<&Path>) -> anyhow::Result<RuntimeConfig> {
    match path {
        Some(path) => RuntimeConfig::load(path).with_context(|| format!("loading {}", path.display())),
        None => Ok(RuntimeConfig::default()),
    }
}

fn fetcher(config: &RuntimeConfig, offline: bool) -> anyhow::Result<Arc<dyn Fetcher>> {
    if offline {
        return Ok(Arc::new(OfflineFetcher));
    }
    let timeout = Duration::from_secs(config.avatars.timeout_secs);
    Ok(Arc::new(HttpFetcher::new(timeout)?))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match cli.command {
        Commands::Info => {
            println!("geoworld-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common: {}", geoworld_common::crate_info());
            println!("kernel: {}", geoworld_kernel::crate_info());
            println!("assets: {}", geoworld_assets::crate_info());
            println!("stream: {}", geoworld_stream::crate_info());
            println!("render: {}", geoworld_render::crate_info());
            println!("input: {}", geoworld_input::crate_info());
            println!("property: {}", geoworld_property::crate_info());
            println!("runtime: {}", geoworld_runtime::crate_info());
        }
        Commands::Simulate {
            ticks,
            npcs,
            properties,
            camera,
            dump,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let fetcher = fetcher(&config, cli.offline)?;
            let mut world = WorldRuntime::new(config, fetcher);

            if let Some(name) = camera {
                let mode = CameraMode::from_name(&name)
                    .with_context(|| format!("unknown camera mode '{name}'"))?;
                world.set_camera(CameraUpdate {
                    mode: Some(mode),
                    ..CameraUpdate::default()
                });
            }
            if world.load_ground_imagery().await {
                println!("Ground: provider imagery");
            } else {
                println!("Ground: fallback texture");
            }

            world
                .add_player(Identity::new("player", "Player"), WorldPoint::ORIGIN)
                .await;
            for i in 0..npcs {
                let at = WorldPoint::new(i as f32 * 40.0 - 60.0, 80.0);
                world.add_npc(Identity::new(format!("npc-{i}"), format!("NPC {i}")), at);
            }
            if let Some(path) = properties {
                let json = std::fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?;
                let report = world.render_properties_json(&json)?;
                println!("Properties: rendered={} skipped={}", report.rendered, report.skipped);
            }

            world.callbacks_mut().on_entity_moved(|key, at| {
                tracing::trace!(%key, x = at.x, z = at.z, "moved");
            });
            world.apply_movement_intent(WorldPoint::new(1.0, 0.0).into());
            world.start();
            let ran = world.run(ticks, Duration::from_millis(16)).await;
            world.stop();

            println!("Simulated {ran} frames");
            println!("{}", world.summary());
            for entity in world.players().chain(world.npcs()) {
                if let Some(info) = world.inspect_entity(&entity.key) {
                    println!("  {info}");
                }
            }
            if dump {
                print!("{}", world.render_debug());
            }
            world.destroy();
        }
        Commands::Stream { x, z } => {
            let config = load_config(cli.config.as_deref())?;
            let fetcher = fetcher(&config, cli.offline)?;
            let mut world = WorldRuntime::new(config, fetcher);
            let stats = world.update_stream_at(WorldPoint::new(x, z)).await;
            println!(
                "Stream at ({x}, {z}): active={} requested={} failed={} in {:?}",
                stats.active, stats.requested, stats.failed, stats.last_update
            );
            if let Some(city) = world.streamer().nearest_city_name(x, z) {
                println!("Nearest city: {city}");
            }
            for tile in world.streamer().tiles() {
                println!(
                    "  tile {} geo={} density={:.2} buildings={}{}",
                    tile.key,
                    tile.geo,
                    tile.density,
                    tile.building_count,
                    if tile.fallback_imagery { " (fallback imagery)" } else { "" }
                );
            }
            world.destroy();
        }
    }

    Ok(())
}
