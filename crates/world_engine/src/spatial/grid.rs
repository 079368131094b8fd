//! Dense box grid over a container mesh
//!
//! The grid covers exactly the volume of its owning mesh. Boxes live in one
//! flat vector indexed by `(x * H + y) * D + z`; a [`GridBoxId`] is that index
//! and only means something inside the grid that produced it.
//!
//! Locking: every box guards its own occupant list. Insertion and removal take
//! the grid structure lock shared, so they run concurrently; a full reset or a
//! snapshot takes it exclusively and never observes a half-cleared grid.

use std::collections::HashSet;
use std::sync::{Mutex, RwLock};

use rayon::prelude::*;

use crate::foundation::collections::MeshId;
use crate::foundation::math::{component_signum, IVec3, Vec3};
use crate::foundation::sync::{lock, read, write};
use crate::physics::{Border, CollisionError};
use crate::spatial::{Side, AABB};

/// Largest number of boxes along one grid axis
pub const MAX_BOXES_PER_AXIS: i32 = 128;

/// Index of a box inside its grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridBoxId(usize);

impl GridBoxId {
    /// Flat index in the grid's box vector
    pub fn index(self) -> usize {
        self.0
    }
}

/// One cell of a grid
#[derive(Debug)]
pub struct GridBox {
    coords: IVec3,
    occupants: Mutex<Vec<MeshId>>,
}

impl GridBox {
    fn new(coords: IVec3) -> Self {
        Self {
            coords,
            occupants: Mutex::new(Vec::new()),
        }
    }

    /// Position of this box in its grid
    pub fn coords(&self) -> IVec3 {
        self.coords
    }

    /// Copy of the current occupants
    pub fn occupants(&self) -> Vec<MeshId> {
        lock(&self.occupants).clone()
    }

    /// Whether no mesh occupies this box
    pub fn is_empty(&self) -> bool {
        lock(&self.occupants).is_empty()
    }

    /// Number of occupants
    pub fn len(&self) -> usize {
        lock(&self.occupants).len()
    }

    /// Whether `mesh` occupies this box
    pub fn contains(&self, mesh: MeshId) -> bool {
        lock(&self.occupants).contains(&mesh)
    }

    /// Add an occupant; returns false if it was already present
    fn insert(&self, mesh: MeshId) -> bool {
        let mut occupants = lock(&self.occupants);
        if occupants.contains(&mesh) {
            return false;
        }
        occupants.push(mesh);
        true
    }

    /// Remove an occupant; returns false if it was absent
    fn remove(&self, mesh: MeshId) -> bool {
        let mut occupants = lock(&self.occupants);
        if let Some(index) = occupants.iter().position(|&m| m == mesh) {
            occupants.swap_remove(index);
            true
        } else {
            false
        }
    }

    fn clear(&self) {
        lock(&self.occupants).clear();
    }
}

/// Spatial grid covering one container mesh
#[derive(Debug)]
pub struct Grid {
    /// First corner of the owning mesh
    origin: Vec3,
    /// Full extents of the owning mesh
    dimension: Vec3,
    box_dimension: Vec3,
    boxes_count: IVec3,
    boxes: Vec<GridBox>,
    structure: RwLock<()>,
}

impl Grid {
    /// Create a grid over a container at `owner_location` with full extents `owner_dimension`
    ///
    /// Box counts are clamped to `1..=MAX_BOXES_PER_AXIS` on each axis.
    pub fn new(owner_location: Vec3, owner_dimension: Vec3, boxes_count: IVec3) -> Self {
        let clamped = boxes_count.map(|n| n.clamp(1, MAX_BOXES_PER_AXIS));
        if clamped != boxes_count {
            log::warn!("Grid box counts {:?} clamped to {:?}", boxes_count, clamped);
        }
        let boxes_count = clamped;
        let box_dimension = owner_dimension.component_div(&boxes_count.cast::<f32>());
        let origin = owner_location - owner_dimension / 2.0;

        let (width, height, depth) = (boxes_count.x, boxes_count.y, boxes_count.z);
        let total = boxes_count.iter().map(|&n| n.unsigned_abs() as usize).product();
        let mut boxes = Vec::with_capacity(total);
        for x in 0..width {
            for y in 0..height {
                for z in 0..depth {
                    boxes.push(GridBox::new(IVec3::new(x, y, z)));
                }
            }
        }

        log::debug!(
            "Grid {}x{}x{} over {:?} (box {:?})",
            width, height, depth, owner_dimension, box_dimension
        );

        Self {
            origin,
            dimension: owner_dimension,
            box_dimension,
            boxes_count,
            boxes,
            structure: RwLock::new(()),
        }
    }

    /// Create a grid whose boxes are at most `box_dimension` wide on each axis
    ///
    /// Fails when a box extent is not a positive finite number or the
    /// resulting counts exceed `MAX_BOXES_PER_AXIS`.
    pub fn with_box_dimension(
        owner_location: Vec3,
        owner_dimension: Vec3,
        box_dimension: Vec3,
    ) -> Result<Self, CollisionError> {
        if box_dimension.iter().any(|&d| !d.is_finite() || d <= 0.0) {
            return Err(CollisionError::InvalidGrid(format!("box dimension {box_dimension:?}")));
        }

        let counts = owner_dimension.component_div(&box_dimension).map(f32::ceil);
        if counts.iter().any(|&n| !n.is_finite() || n > MAX_BOXES_PER_AXIS as f32) {
            return Err(CollisionError::InvalidGrid(format!(
                "{owner_dimension:?} split into boxes of {box_dimension:?} exceeds {MAX_BOXES_PER_AXIS} per axis"
            )));
        }
        Ok(Self::new(owner_location, owner_dimension, counts.map(|n| n as i32)))
    }

    /// Number of boxes per axis
    pub fn boxes_count(&self) -> IVec3 {
        self.boxes_count
    }

    /// Extents of one box
    pub fn box_dimension(&self) -> Vec3 {
        self.box_dimension
    }

    /// First corner of the grid
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    /// World-space volume covered by the grid
    pub fn bounds(&self) -> AABB {
        AABB::new(self.origin, self.origin + self.dimension)
    }

    /// Total number of boxes
    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    /// Whether the grid has no boxes (never true for a constructed grid)
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// Box by id
    pub fn get(&self, id: GridBoxId) -> Option<&GridBox> {
        self.boxes.get(id.0)
    }

    /// Occupants of a box (empty for an unknown id)
    pub fn occupants(&self, id: GridBoxId) -> Vec<MeshId> {
        self.get(id).map(GridBox::occupants).unwrap_or_default()
    }

    /// Id of the box at `coords`, if inside the grid
    pub fn index_of(&self, coords: IVec3) -> Option<GridBoxId> {
        let inside = (0..3).all(|axis| coords[axis] >= 0 && coords[axis] < self.boxes_count[axis]);
        if !inside {
            return None;
        }
        let (h, d) = (self.boxes_count.y, self.boxes_count.z);
        Some(GridBoxId(((coords.x * h + coords.y) * d + coords.z) as usize))
    }

    /// Box coordinates containing `point`, if inside the grid
    pub fn box_index_of(&self, point: Vec3) -> Option<IVec3> {
        let coords = self.raw_coords(&point);
        self.index_of(coords).map(|_| coords)
    }

    /// Whether `location` lies inside the grid volume
    pub fn is_inside(&self, location: Vec3) -> bool {
        self.bounds().contains_point(location)
    }

    /// Unclamped box coordinates of a point
    fn raw_coords(&self, point: &Vec3) -> IVec3 {
        (point - self.origin)
            .component_div(&self.box_dimension)
            .map(|v| v.floor() as i32)
    }

    /// Last box reached by a volume ending at `point`
    ///
    /// A face lying exactly on a box boundary does not reach into the next box.
    fn upper_coords(&self, point: &Vec3) -> IVec3 {
        (point - self.origin)
            .component_div(&self.box_dimension)
            .map(|v| v.ceil() as i32 - 1)
    }

    /// Index `mesh` in every box its swept volume touches
    ///
    /// Rows outside the grid are skipped. Inserting a mesh already present in
    /// a box is a no-op. Returns every touched box, in index order.
    pub fn add_item(&self, mesh: MeshId, border: &Border) -> Vec<GridBoxId> {
        let _shared = read(&self.structure);

        let swept = border.swept_aabb();
        let last = self.boxes_count - IVec3::repeat(1);
        let first = self.raw_coords(&swept.min);
        let lo = first.sup(&IVec3::zeros());
        let hi = self.upper_coords(&swept.max).sup(&first).inf(&last);

        if (0..3).any(|axis| lo[axis] > hi[axis]) {
            log::trace!("{:?} lies outside grid at {:?}", mesh, self.origin);
            return Vec::new();
        }

        let ids: Vec<GridBoxId> = (lo.x..=hi.x)
            .flat_map(|x| (lo.y..=hi.y).flat_map(move |y| (lo.z..=hi.z).map(move |z| IVec3::new(x, y, z))))
            .filter_map(|coords| self.index_of(coords))
            .collect();

        ids.par_iter().for_each(|id| {
            self.boxes[id.0].insert(mesh);
        });

        ids
    }

    /// Remove `mesh` from every box in `boxes` and clear the list
    pub fn remove_mesh(&self, mesh: MeshId, boxes: &mut Vec<GridBoxId>) {
        let _shared = read(&self.structure);
        for id in boxes.drain(..) {
            if let Some(grid_box) = self.boxes.get(id.0) {
                grid_box.remove(mesh);
            }
        }
    }

    /// Clear every box
    pub fn reset_grid(&self) {
        let _exclusive = write(&self.structure);
        for grid_box in &self.boxes {
            grid_box.clear();
        }
    }

    /// Whether the neighbour of `coords` on `side` holds any mesh
    pub fn is_position_filled(&self, coords: IVec3, side: Side) -> bool {
        self.index_of(coords + side.offset())
            .is_some_and(|id| !self.boxes[id.0].is_empty())
    }

    /// Neighbour towards -z is occupied
    pub fn is_front_position_filled(&self, coords: IVec3) -> bool {
        self.is_position_filled(coords, Side::Front)
    }

    /// Neighbour towards +x is occupied
    pub fn is_right_position_filled(&self, coords: IVec3) -> bool {
        self.is_position_filled(coords, Side::Right)
    }

    /// Neighbour towards +z is occupied
    pub fn is_back_position_filled(&self, coords: IVec3) -> bool {
        self.is_position_filled(coords, Side::Back)
    }

    /// Neighbour towards -x is occupied
    pub fn is_left_position_filled(&self, coords: IVec3) -> bool {
        self.is_position_filled(coords, Side::Left)
    }

    /// Neighbour towards -y is occupied
    pub fn is_bottom_position_filled(&self, coords: IVec3) -> bool {
        self.is_position_filled(coords, Side::Bottom)
    }

    /// Neighbour towards +y is occupied
    pub fn is_top_position_filled(&self, coords: IVec3) -> bool {
        self.is_position_filled(coords, Side::Top)
    }

    /// Offsets of the cells a mover heading in `direction` can reach next
    ///
    /// The own cell plus every non-empty combination of the moving axes'
    /// unit steps: 1 cell when stationary, up to 8 when moving diagonally.
    fn directional_offsets(direction: IVec3) -> Vec<IVec3> {
        let choices = |step: i32| if step == 0 { vec![0] } else { vec![0, step] };
        let mut offsets = Vec::with_capacity(8);
        for dx in choices(direction.x) {
            for dy in choices(direction.y) {
                for dz in choices(direction.z) {
                    offsets.push(IVec3::new(dx, dy, dz));
                }
            }
        }
        offsets
    }

    /// Meshes plausible as collision partners of `mesh`
    ///
    /// Scans every box in `boxes` plus the directionally relevant neighbours
    /// for `movement`. The result is deduplicated and never contains `mesh`.
    pub fn find_collision_neighbors(&self, mesh: MeshId, boxes: &[GridBoxId], movement: &Vec3) -> Vec<MeshId> {
        let offsets = Self::directional_offsets(component_signum(movement));
        let mut seen = HashSet::new();
        let mut neighbors = Vec::new();

        for id in boxes {
            let Some(grid_box) = self.boxes.get(id.0) else {
                continue;
            };
            for offset in &offsets {
                let Some(cell) = self.index_of(grid_box.coords + offset) else {
                    continue;
                };
                for other in self.boxes[cell.0].occupants() {
                    if other != mesh && seen.insert(other) {
                        neighbors.push(other);
                    }
                }
            }
        }

        neighbors
    }

    /// Consistent copy of every non-empty box, taken under the exclusive lock
    pub fn snapshot(&self) -> Vec<(IVec3, Vec<MeshId>)> {
        let _exclusive = write(&self.structure);
        self.boxes
            .iter()
            .filter(|grid_box| !grid_box.is_empty())
            .map(|grid_box| (grid_box.coords, grid_box.occupants()))
            .collect()
    }

    /// Number of boxes holding at least one mesh
    pub fn filled_count(&self) -> usize {
        self.boxes.iter().filter(|grid_box| !grid_box.is_empty()).count()
    }
}
