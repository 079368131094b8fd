//! Rooms demo application
//!
//! Builds a universe of rooms filled with moving cubes and runs the collision
//! world headless for the configured number of frames.
//!
//! Usage: `rooms_demo [config.toml|config.ron] [serial|parallel|accelerator]`

mod generator;

use rand::rngs::StdRng;
use rand::SeedableRng;

use world_engine::debug::dump_container;
use world_engine::foundation::logging;
use world_engine::prelude::*;

/// Frames between two progress lines
const REPORT_INTERVAL: u64 = 60;

fn load_config(args: &[String]) -> Result<WorldConfig, Box<dyn std::error::Error>> {
    let mut config = match args.get(1) {
        Some(path) => {
            log::info!("Loading configuration from {}", path);
            WorldConfig::load_from_file(path)?
        }
        None => {
            log::info!("No configuration file given, using defaults");
            WorldConfig::default()
        }
    };

    if let Some(engine) = args.get(2) {
        config.collision.engine = engine.parse()?;
    }
    Ok(config)
}

fn run(config: WorldConfig) -> Result<(), Box<dyn std::error::Error>> {
    let frames = config.universe.frames;
    let mut rng = StdRng::seed_from_u64(config.universe.seed);

    let mut world = match World::new(config) {
        Ok(world) => world,
        Err(WorldError::Collision(
            error @ (CollisionError::AcceleratorUnavailable | CollisionError::AcceleratorInit(_)),
        )) => {
            log::error!("Cannot start the accelerator engine: {}", error);
            std::process::exit(1);
        }
        Err(error) => return Err(error.into()),
    };
    if world.context().engine().granularity() != world.config().collision.granularity {
        log::warn!(
            "{} engine runs at granularity {} instead of {}",
            world.context().engine().kind(),
            world.context().engine().granularity(),
            world.config().collision.granularity
        );
    }

    let universe = generator::build_universe(&mut world, &mut rng)?;
    if let Some(player) = universe.player {
        log::info!("Controlled cube {:?} placed", player);
    }

    let mut total = FrameStats::default();
    for frame in 1..=frames {
        total += world.step()?;
        if frame % REPORT_INTERVAL == 0 {
            log::info!(
                "Frame {}: {} committed, {} rehomed, {} bounced so far",
                frame,
                total.committed,
                total.rehomed,
                total.bounced
            );
        }
    }

    log::info!(
        "Done after {} frames: {} moves, {} pairs tested, {} collisions, {} skipped by cooldown, {} requeued",
        world.frame(),
        total.moved,
        total.pairs_tested,
        total.committed,
        total.skipped,
        total.requeued
    );
    if let Some(root) = universe.root {
        let objects = world.tree().descendants_of_kind(root, MeshKind::Object).len();
        let placed = universe.objects.len() + usize::from(universe.player.is_some());
        log::info!("{} of {} placed objects still inside the universe", objects, placed);
    }

    if log::log_enabled!(log::Level::Debug) {
        let tree = world.tree();
        for (id, node) in tree.iter().filter(|(_, node)| node.kind().is_container()) {
            let dump = dump_container(tree, id)?;
            log::debug!(
                "{:?} {:?}: {} filled boxes, {} entries, busiest box holds {}",
                node.kind(),
                id,
                dump.filled_boxes(),
                dump.total_entries(),
                dump.max_occupancy()
            );
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();
    log::info!("Starting rooms demo");

    let args: Vec<String> = std::env::args().collect();
    let config = load_config(&args)?;
    run(config)
}
