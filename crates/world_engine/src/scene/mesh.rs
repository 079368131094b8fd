//! Mesh nodes stored in the [`MeshTree`](super::MeshTree) arena

use std::sync::Mutex;

use crate::foundation::collections::MeshId;
use crate::foundation::math::IVec3;
use crate::foundation::sync::lock;
use crate::physics::{Border, Cooldown, Resolution};
use crate::scene::RoomOpenings;
use crate::spatial::{Grid, GridBoxId};

/// Role of a mesh in the world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshKind {
    /// Root container holding the rooms
    Universe,
    /// Container holding bricks and objects
    Room,
    /// Static wall or pillar element
    Brick,
    /// Free moving object
    Object,
}

impl MeshKind {
    /// Whether meshes of this kind usually own a grid
    pub fn is_container(self) -> bool {
        matches!(self, MeshKind::Universe | MeshKind::Room)
    }
}

/// One node of the mesh tree
///
/// Parent, children and obstacle are arena ids. The parent's child list is
/// the ownership relation: removing a node removes its subtree.
#[derive(Debug)]
pub struct MeshNode {
    pub(crate) kind: MeshKind,
    pub(crate) border: Border,
    pub(crate) parent: Option<MeshId>,
    pub(crate) children: Mutex<Vec<MeshId>>,
    pub(crate) grid: Option<Grid>,
    /// Boxes of the parent's grid this mesh occupies
    pub(crate) grid_boxes: Mutex<Vec<GridBoxId>>,
    pub(crate) resolution: Mutex<Resolution>,
    pub(crate) cooldown: Cooldown,
    pub(crate) controlled: bool,
    pub(crate) openings: Option<RoomOpenings>,
}

impl MeshNode {
    /// Create a node without children or grid
    pub fn new(kind: MeshKind, border: Border) -> Self {
        Self {
            kind,
            border,
            parent: None,
            children: Mutex::new(Vec::new()),
            grid: None,
            grid_boxes: Mutex::new(Vec::new()),
            resolution: Mutex::new(Resolution::default()),
            cooldown: Cooldown::default(),
            controlled: false,
            openings: if kind == MeshKind::Room { Some(RoomOpenings::default()) } else { None },
        }
    }

    /// Give this node a grid of `boxes_count` boxes over its volume
    #[must_use]
    pub fn with_grid(mut self, boxes_count: IVec3) -> Self {
        self.grid = Some(Grid::new(self.border.location(), self.border.dimension(), boxes_count));
        self
    }

    /// Mark this node as the camera/controlled object
    ///
    /// Other meshes do not start a cooldown against a controlled obstacle.
    #[must_use]
    pub fn controlled(mut self) -> Self {
        self.controlled = true;
        self
    }

    /// Move the grid along with a container that changed location
    pub(crate) fn refresh_grid(&mut self) {
        if let Some(grid) = &self.grid {
            let boxes_count = grid.boxes_count();
            self.grid = Some(Grid::new(self.border.location(), self.border.dimension(), boxes_count));
        }
    }

    /// Role of this mesh
    pub fn kind(&self) -> MeshKind {
        self.kind
    }

    /// Bounding proxy
    pub fn border(&self) -> &Border {
        &self.border
    }

    /// Containing mesh
    pub fn parent(&self) -> Option<MeshId> {
        self.parent
    }

    /// Copy of the child list
    pub fn children(&self) -> Vec<MeshId> {
        lock(&self.children).clone()
    }

    /// Grid, for containers
    pub fn grid(&self) -> Option<&Grid> {
        self.grid.as_ref()
    }

    /// Copy of the boxes this mesh occupies in its parent's grid
    pub fn grid_boxes(&self) -> Vec<GridBoxId> {
        lock(&self.grid_boxes).clone()
    }

    /// Current obstacle and move factor
    pub fn resolution(&self) -> Resolution {
        *lock(&self.resolution)
    }

    /// Cooldown state
    pub fn cooldown(&self) -> &Cooldown {
        &self.cooldown
    }

    /// Whether this is the camera/controlled object
    pub fn is_controlled(&self) -> bool {
        self.controlled
    }

    /// Door and window sides, for rooms
    pub fn openings(&self) -> Option<&RoomOpenings> {
        self.openings.as_ref()
    }
}
