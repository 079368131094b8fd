//! Grid occupancy dump

use std::fmt;

use crate::foundation::collections::MeshId;
use crate::foundation::math::{IVec3, Vec3};
use crate::physics::CollisionError;
use crate::scene::MeshTree;
use crate::spatial::Grid;

/// Consistent view of one grid's occupied boxes
#[derive(Debug, Clone, PartialEq)]
pub struct GridDump {
    /// Boxes per axis
    pub boxes_count: IVec3,
    /// Extents of one box
    pub box_dimension: Vec3,
    /// Occupied boxes with their occupants, in index order
    pub filled: Vec<(IVec3, Vec<MeshId>)>,
}

impl GridDump {
    /// Snapshot `grid` under its exclusive lock
    pub fn capture(grid: &Grid) -> Self {
        Self {
            boxes_count: grid.boxes_count(),
            box_dimension: grid.box_dimension(),
            filled: grid.snapshot(),
        }
    }

    /// Number of occupied boxes
    pub fn filled_boxes(&self) -> usize {
        self.filled.len()
    }

    /// Sum of occupant counts over all boxes (a mesh spanning boxes counts once per box)
    pub fn total_entries(&self) -> usize {
        self.filled.iter().map(|(_, occupants)| occupants.len()).sum()
    }

    /// Most occupants found in one box
    pub fn max_occupancy(&self) -> usize {
        self.filled.iter().map(|(_, occupants)| occupants.len()).max().unwrap_or(0)
    }
}

impl fmt::Display for GridDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = self.boxes_count;
        writeln!(
            f,
            "grid {}x{}x{} (box {:.2} x {:.2} x {:.2}): {} filled, {} entries",
            c.x, c.y, c.z,
            self.box_dimension.x, self.box_dimension.y, self.box_dimension.z,
            self.filled_boxes(),
            self.total_entries()
        )?;
        for (coords, occupants) in &self.filled {
            writeln!(f, "  [{}, {}, {}] {:?}", coords.x, coords.y, coords.z, occupants)?;
        }
        Ok(())
    }
}

/// Dump the grid of `container` and log it at trace level
pub fn dump_container(tree: &MeshTree, container: MeshId) -> Result<GridDump, CollisionError> {
    let dump = GridDump::capture(tree.container_grid(container)?);
    log::trace!("{:?} {}", container, dump);
    Ok(dump)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::Border;
    use crate::scene::{MeshKind, MeshNode};

    #[test]
    fn test_dump_lists_occupied_boxes() {
        let mut tree = MeshTree::new();
        let room = tree.add_root(
            MeshNode::new(MeshKind::Room, Border::new(Vec3::new(2.0, 2.0, 2.0), Vec3::new(2.0, 2.0, 2.0)))
                .with_grid(IVec3::new(4, 4, 4)),
        );
        let small = tree
            .add_child(room, MeshNode::new(MeshKind::Object, Border::new(Vec3::new(0.5, 0.5, 0.5), Vec3::repeat(0.25))))
            .unwrap();
        // Covers boxes 1..=2 on every axis
        tree.add_child(room, MeshNode::new(MeshKind::Brick, Border::new(Vec3::repeat(2.0), Vec3::repeat(1.0))))
            .unwrap();

        let dump = dump_container(&tree, room).unwrap();
        assert_eq!(dump.filled_boxes(), 9);
        assert_eq!(dump.total_entries(), 9);
        assert_eq!(dump.max_occupancy(), 1);
        assert_eq!(dump.filled[0], (IVec3::zeros(), vec![small]));

        let text = dump.to_string();
        assert!(text.starts_with("grid 4x4x4"));
        assert_eq!(text.lines().count(), 10);
    }

    #[test]
    fn test_dump_of_non_container_fails() {
        let mut tree = MeshTree::new();
        let brick = tree.add_root(MeshNode::new(MeshKind::Brick, Border::new(Vec3::zeros(), Vec3::repeat(1.0))));
        assert!(matches!(dump_container(&tree, brick), Err(CollisionError::NotAContainer(_))));
    }
}
