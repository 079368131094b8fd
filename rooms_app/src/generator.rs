//! Procedural universe: rooms on a coarse grid, brick walls, moving cubes

use std::collections::HashSet;

use nalgebra::Vector3;
use rand::Rng;

use world_engine::prelude::*;

/// Ids of what the generator placed
#[derive(Debug, Default)]
pub struct Universe {
    /// Root container
    pub root: Option<MeshId>,
    /// Every room
    pub rooms: Vec<MeshId>,
    /// Moving cubes
    pub objects: Vec<MeshId>,
    /// The controlled cube, if placed
    pub player: Option<MeshId>,
    /// Number of wall bricks
    pub bricks: usize,
}

/// Build the universe described by the world's configuration
pub fn build_universe<R: Rng>(world: &mut World, rng: &mut R) -> Result<Universe, WorldError> {
    let config = world.config().clone();
    let room_scale = Vector3::from(config.universe.room_scale);
    let universe_boxes = IVec3::from(config.grid.universe_boxes);
    let room_boxes = IVec3::from(config.grid.room_boxes);

    let half_extents = room_scale.component_mul(&universe_boxes.cast::<f32>());
    let tree = world.tree_mut();
    let root = tree.add_root(
        MeshNode::new(MeshKind::Universe, Border::new(half_extents, half_extents)).with_grid(universe_boxes),
    );

    let mut universe = Universe {
        root: Some(root),
        ..Universe::default()
    };

    // Ground floor is always complete, upper floors are sparse
    for x in 0..universe_boxes.x {
        for y in 0..universe_boxes.y {
            for z in 0..universe_boxes.z {
                if y > 0 && !rng.gen_bool(0.5) {
                    continue;
                }
                let slot = Vector3::new(x, y, z).cast::<f32>();
                let center = (slot * 2.0).add_scalar(1.0).component_mul(&room_scale);
                let room = tree.add_child(
                    root,
                    MeshNode::new(MeshKind::Room, Border::new(center, room_scale)).with_grid(room_boxes),
                )?;
                universe.rooms.push(room);
            }
        }
    }

    let carved = carve_room_openings(tree, root)?;
    log::info!("Placed {} rooms, carved openings in {}", universe.rooms.len(), carved);

    for &room in &universe.rooms {
        universe.bricks += build_walls(tree, room)?;
        place_objects(tree, room, &config.universe, rng, &mut universe.objects)?;
    }

    if let Some(&first) = universe.rooms.first() {
        universe.player = place_player(tree, first, config.universe.object_scale)?;
    }

    log::info!(
        "Universe ready: {} bricks, {} moving objects, {} meshes total",
        universe.bricks,
        universe.objects.len(),
        tree.len()
    );
    Ok(universe)
}

/// Lower corner and box size of a room's grid
fn room_frame(tree: &MeshTree, room: MeshId) -> Result<(Vec3, Vec3, IVec3), WorldError> {
    let grid = tree.container_grid(room)?;
    Ok((grid.origin(), grid.box_dimension(), grid.boxes_count()))
}

fn cell_center(origin: Vec3, box_dimension: Vec3, cell: IVec3) -> Vec3 {
    origin + (cell.cast::<f32>().add_scalar(0.5)).component_mul(&box_dimension)
}

/// Fill every uncarved wall cell of `room` with a brick
fn build_walls(tree: &mut MeshTree, room: MeshId) -> Result<usize, WorldError> {
    let (origin, box_dimension, boxes_count) = room_frame(tree, room)?;
    let openings = tree.node(room)?.openings().copied().unwrap_or_default();

    let cells = openings.wall_cells(boxes_count);
    for &cell in &cells {
        let border = Border::new(cell_center(origin, box_dimension, cell), box_dimension / 2.0);
        tree.add_child(room, MeshNode::new(MeshKind::Brick, border))?;
    }
    Ok(cells.len())
}

/// Scatter moving cubes over distinct interior cells of `room`
fn place_objects<R: Rng>(
    tree: &mut MeshTree,
    room: MeshId,
    settings: &UniverseConfig,
    rng: &mut R,
    placed: &mut Vec<MeshId>,
) -> Result<(), WorldError> {
    let (origin, box_dimension, boxes_count) = room_frame(tree, room)?;
    if boxes_count.x < 3 || boxes_count.z < 3 {
        log::warn!("Room {:?} has no interior cells", room);
        return Ok(());
    }

    let interior = usize::try_from((boxes_count.x - 2) * (boxes_count.z - 2) * boxes_count.y).unwrap_or(0);
    let count = settings.objects_per_room.min(interior);
    let mut used = HashSet::new();

    while used.len() < count {
        let cell = IVec3::new(
            rng.gen_range(1..boxes_count.x - 1),
            rng.gen_range(0..boxes_count.y),
            rng.gen_range(1..boxes_count.z - 1),
        );
        if !used.insert((cell.x, cell.y, cell.z)) {
            continue;
        }

        let speed = settings.max_speed;
        let movement = Vec3::new(rng.gen_range(-speed..=speed), 0.0, rng.gen_range(-speed..=speed));
        let border = Border::new(cell_center(origin, box_dimension, cell), Vec3::repeat(settings.object_scale))
            .with_movement(movement);
        placed.push(tree.add_child(room, MeshNode::new(MeshKind::Object, border))?);
    }
    Ok(())
}

/// Put the controlled cube on the ground at the room centre
fn place_player(tree: &mut MeshTree, room: MeshId, scale: f32) -> Result<Option<MeshId>, WorldError> {
    let (origin, box_dimension, boxes_count) = room_frame(tree, room)?;
    let cell = IVec3::new(boxes_count.x / 2, 0, boxes_count.z / 2);
    let center = cell_center(origin, box_dimension, cell);

    let grid = tree.container_grid(room)?;
    let occupied = grid.index_of(cell).is_some_and(|id| !grid.occupants(id).is_empty());
    if occupied {
        log::warn!("Centre of {:?} is taken, no player placed", room);
        return Ok(None);
    }

    let border = Border::new(center, Vec3::repeat(scale));
    Ok(Some(tree.add_child(room, MeshNode::new(MeshKind::Object, border).controlled())?))
}
