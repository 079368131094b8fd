//! Door and window carving
//!
//! Once every room is placed, each room checks its six neighbours in the
//! universe grid. Sides facing another room get a door; walls facing the
//! outside get a window. The wall builder then skips the cells an opening
//! covers.

use std::collections::BTreeSet;

use crate::foundation::collections::MeshId;
use crate::foundation::math::IVec3;
use crate::physics::CollisionError;
use crate::scene::{MeshKind, MeshTree};
use crate::spatial::{Side, Sides};

/// Carved sides of one room
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoomOpenings {
    /// Sides leading into a neighbouring room
    pub doors: Sides,
    /// Walls facing the outside
    pub windows: Sides,
}

/// Axis a side is normal to, and whether it faces the positive end
fn normal_of(side: Side) -> (usize, bool) {
    let offset = side.offset();
    let axis = (0..3).find(|&axis| offset[axis] != 0).unwrap_or(1);
    (axis, offset[axis] > 0)
}

/// Two middle cells of a row of `count` (all of them when there are two or fewer)
fn in_center_band(value: i32, count: i32) -> bool {
    if count <= 2 {
        return true;
    }
    let mid = count / 2;
    value == mid || value == mid - 1
}

impl RoomOpenings {
    /// Whether `side` has a door
    pub fn is_door(&self, side: Side) -> bool {
        self.doors.has(side)
    }

    /// Whether `side` has a window
    pub fn is_window(&self, side: Side) -> bool {
        self.windows.has(side)
    }

    /// Whether the wall cell `coords` on `side` is cut away by an opening
    ///
    /// `boxes_count` is the room grid size. Doors span the lower half of the
    /// wall, windows the middle rows, both over the two centre columns.
    pub fn is_carved(&self, side: Side, coords: IVec3, boxes_count: IVec3) -> bool {
        let (normal, _) = normal_of(side);
        let height = boxes_count.y;

        if !side.is_lateral() {
            return self.is_door(side)
                && in_center_band(coords.x, boxes_count.x)
                && in_center_band(coords.z, boxes_count.z);
        }

        let along = if normal == 0 { 2 } else { 0 };
        if !in_center_band(coords[along], boxes_count[along]) {
            return false;
        }

        let door = self.is_door(side) && coords.y < (height / 2).max(1);
        let window = self.is_window(side) && coords.y > 0 && coords.y >= height / 4 && coords.y < height - height / 4;
        door || window
    }

    /// Cells of the four walls of a room grid that keep a brick
    pub fn wall_cells(&self, boxes_count: IVec3) -> Vec<IVec3> {
        let mut cells = BTreeSet::new();
        for side in Side::ALL.into_iter().filter(|side| side.is_lateral()) {
            let (normal, positive) = normal_of(side);
            let layer = if positive { boxes_count[normal] - 1 } else { 0 };
            let along = if normal == 0 { 2 } else { 0 };

            for y in 0..boxes_count.y {
                for a in 0..boxes_count[along] {
                    let mut coords = IVec3::zeros();
                    coords[normal] = layer;
                    coords[along] = a;
                    coords.y = y;
                    if !self.is_carved(side, coords, boxes_count) {
                        cells.insert((coords.x, coords.y, coords.z));
                    }
                }
            }
        }
        cells.into_iter().map(|(x, y, z)| IVec3::new(x, y, z)).collect()
    }
}

/// Decide doors and windows for every room of `universe`
///
/// Returns the number of rooms updated.
pub fn carve_room_openings(tree: &mut MeshTree, universe: MeshId) -> Result<usize, CollisionError> {
    let carved: Vec<(MeshId, RoomOpenings)> = {
        let grid = tree.container_grid(universe)?;
        let mut carved = Vec::new();
        for room in tree.node(universe)?.children() {
            let node = tree.node(room)?;
            if node.kind() != MeshKind::Room {
                continue;
            }
            let Some(coords) = grid.box_index_of(node.border().location()) else {
                log::warn!("Room {:?} lies outside the universe grid", room);
                continue;
            };

            let mut openings = RoomOpenings::default();
            for side in Side::ALL {
                if grid.is_position_filled(coords, side) {
                    openings.doors |= side.into();
                } else if side.is_lateral() {
                    openings.windows |= side.into();
                }
            }
            carved.push((room, openings));
        }
        carved
    };

    let count = carved.len();
    for (room, openings) in carved {
        log::debug!("Room {:?}: doors {:?}, windows {:?}", room, openings.doors, openings.windows);
        tree.node_mut(room)?.openings = Some(openings);
    }
    Ok(count)
}
