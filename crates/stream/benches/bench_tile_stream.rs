use std::hint::black_box;
use std::sync::Arc;
use std::time::Instant;

use geoworld_assets::{OfflineFetcher, TextureConfig, TextureProvider};
use geoworld_common::{CoordinateMapper, GeoPoint};
use geoworld_kernel::Scene;
use geoworld_stream::{StreamConfig, TileKey, TileStreamer, generate_field};

fn bench_generate_field(blocks: u32, iterations: usize) {
    let start = Instant::now();
    let mut total = 0;
    for i in 0..iterations {
        let key = TileKey::new(i as i32 % 17, i as i32 % 13);
        total += black_box(generate_field(black_box(key), 1000.0, blocks, 0.8, 42)).len();
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!(
        "  generate_field ({blocks}x{blocks} blocks, {iterations} iters, {total} buildings): {per_iter:?}/iter, total {elapsed:?}"
    );
}

fn bench_walk(rt: &tokio::runtime::Runtime, radius: i32, steps: usize) {
    let textures = Arc::new(TextureProvider::new(
        TextureConfig {
            fallback_size: 16,
            ..TextureConfig::default()
        },
        Arc::new(OfflineFetcher),
    ));
    let config = StreamConfig {
        neighborhood_radius: radius,
        texture_size: 16,
        ..StreamConfig::default()
    };
    let mut streamer = TileStreamer::new(config, CoordinateMapper::new(GeoPoint::new(14.5995, 120.9842)), textures);
    let mut scene = Scene::new();

    let start = Instant::now();
    for i in 0..steps {
        // walk east at 250 m per update
        let x = i as f32 * 250.0;
        let _ = black_box(rt.block_on(streamer.update_player_position(black_box(x), 0.0, &mut scene)));
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / steps as u32;
    let stats = streamer.stats();
    println!(
        "  walk (r={radius}, {steps} updates, {} loads, {} unloads): {per_iter:?}/update, total {elapsed:?}",
        stats.applied, stats.unloaded
    );
}

fn main() {
    println!("=== Tile Stream Benchmarks ===\n");

    println!("Building fields:");
    bench_generate_field(10, 10_000);
    bench_generate_field(20, 2_000);
    bench_generate_field(40, 500);

    let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to build runtime: {e}");
            return;
        }
    };

    println!("\nStreaming walk (offline imagery):");
    bench_walk(&rt, 1, 200);
    bench_walk(&rt, 2, 200);
    bench_walk(&rt, 3, 100);

    println!("\n=== Done ===");
}
