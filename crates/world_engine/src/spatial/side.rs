//! The six cardinal sides of a grid cell or room

use bitflags::bitflags;

use crate::foundation::math::IVec3;

/// One face direction of an axis-aligned cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// Towards -z
    Front,
    /// Towards +x
    Right,
    /// Towards +z
    Back,
    /// Towards -x
    Left,
    /// Towards -y
    Bottom,
    /// Towards +y
    Top,
}

impl Side {
    /// All sides, in carving order
    pub const ALL: [Side; 6] = [
        Side::Front,
        Side::Right,
        Side::Back,
        Side::Left,
        Side::Bottom,
        Side::Top,
    ];

    /// Unit offset from a cell to its neighbour on this side
    pub fn offset(self) -> IVec3 {
        match self {
            Side::Front => IVec3::new(0, 0, -1),
            Side::Right => IVec3::new(1, 0, 0),
            Side::Back => IVec3::new(0, 0, 1),
            Side::Left => IVec3::new(-1, 0, 0),
            Side::Bottom => IVec3::new(0, -1, 0),
            Side::Top => IVec3::new(0, 1, 0),
        }
    }

    /// The side facing this one
    pub fn opposite(self) -> Side {
        match self {
            Side::Front => Side::Back,
            Side::Right => Side::Left,
            Side::Back => Side::Front,
            Side::Left => Side::Right,
            Side::Bottom => Side::Top,
            Side::Top => Side::Bottom,
        }
    }

    /// Whether this side is a wall (not floor or ceiling)
    pub fn is_lateral(self) -> bool {
        !matches!(self, Side::Bottom | Side::Top)
    }
}

bitflags! {
    /// Set of sides, one bit per cardinal side
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Sides: u8 {
        /// -z
        const FRONT = 1 << 0;
        /// +x
        const RIGHT = 1 << 1;
        /// +z
        const BACK = 1 << 2;
        /// -x
        const LEFT = 1 << 3;
        /// -y
        const BOTTOM = 1 << 4;
        /// +y
        const TOP = 1 << 5;
    }
}

impl From<Side> for Sides {
    fn from(side: Side) -> Self {
        match side {
            Side::Front => Sides::FRONT,
            Side::Right => Sides::RIGHT,
            Side::Back => Sides::BACK,
            Side::Left => Sides::LEFT,
            Side::Bottom => Sides::BOTTOM,
            Side::Top => Sides::TOP,
        }
    }
}

impl Sides {
    /// Whether the set holds `side`
    pub fn has(self, side: Side) -> bool {
        self.contains(Sides::from(side))
    }
}
