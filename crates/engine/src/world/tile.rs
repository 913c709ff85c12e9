use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use super::Vec2;

/// Placeable tile kinds. The string tag is what map files and asset folders use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TileKind {
    Decor,
    Grass,
    LargeDecor,
    Stone,
}

#[derive(Debug, Clone, Copy)]
struct KindTraits {
    name: &'static str,
    is_physics: bool,
    is_autotile: bool,
}

impl TileKind {
    /// Palette order used by the editor.
    pub const ALL: [TileKind; 4] = [
        TileKind::Decor,
        TileKind::Grass,
        TileKind::LargeDecor,
        TileKind::Stone,
    ];

    const fn traits(self) -> KindTraits {
        match self {
            TileKind::Decor => KindTraits {
                name: "decor",
                is_physics: false,
                is_autotile: false,
            },
            TileKind::Grass => KindTraits {
                name: "grass",
                is_physics: true,
                is_autotile: true,
            },
            TileKind::LargeDecor => KindTraits {
                name: "large_decor",
                is_physics: false,
                is_autotile: false,
            },
            TileKind::Stone => KindTraits {
                name: "stone",
                is_physics: true,
                is_autotile: true,
            },
        }
    }

    pub const fn name(self) -> &'static str {
        self.traits().name
    }

    /// Kinds that produce solid collision geometry.
    pub const fn is_physics(self) -> bool {
        self.traits().is_physics
    }

    /// Kinds eligible for neighbour-based variant selection.
    pub const fn is_autotile(self) -> bool {
        self.traits().is_autotile
    }
}

impl fmt::Display for TileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TileKindError {
    #[error("unknown tile kind '{name}'")]
    UnknownKind { name: String },
}

impl FromStr for TileKind {
    type Err = TileKindError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        TileKind::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| TileKindError::UnknownKind {
                name: name.to_string(),
            })
    }
}

/// Integer cell coordinate on the logically infinite grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridKeyError {
    #[error("grid key '{key}' is not of the form '<x>;<y>'")]
    Malformed { key: String },
}

impl GridPos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Cell containing a world-space point. Floors, so negative positions land in negative cells.
    pub fn from_world(position: Vec2, tile_size: u32) -> Self {
        let size = tile_size.max(1) as f32;
        Self {
            x: (position.x / size).floor() as i32,
            y: (position.y / size).floor() as i32,
        }
    }

    /// `None` when the neighbour would fall outside the `i32` coordinate range.
    pub fn offset(self, dx: i32, dy: i32) -> Option<Self> {
        Some(Self {
            x: self.x.checked_add(dx)?,
            y: self.y.checked_add(dy)?,
        })
    }

    /// Top-left corner of the cell in world space.
    pub fn to_world(self, tile_size: u32) -> Vec2 {
        Vec2::new(
            self.x as f32 * tile_size as f32,
            self.y as f32 * tile_size as f32,
        )
    }

    /// Canonical on-disk key, `"{x};{y}"`.
    pub fn key(self) -> String {
        format!("{};{}", self.x, self.y)
    }

    pub fn parse_key(key: &str) -> Result<Self, GridKeyError> {
        let malformed = || GridKeyError::Malformed {
            key: key.to_string(),
        };
        let (raw_x, raw_y) = key.split_once(';').ok_or_else(malformed)?;
        let x = raw_x.parse::<i32>().map_err(|_| malformed())?;
        let y = raw_y.parse::<i32>().map_err(|_| malformed())?;
        let pos = Self { x, y };
        // Rejects "+1;02" style keys so the encoding stays canonical.
        if pos.key() != key {
            return Err(malformed());
        }
        Ok(pos)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tile {
    pub kind: TileKind,
    pub variant: usize,
    pub pos: GridPos,
}

/// Decoration placed at a free world position, drawn without grid snapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OffgridTile {
    pub kind: TileKind,
    pub variant: usize,
    pub pos: Vec2,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_round_trip() {
        for kind in TileKind::ALL {
            assert_eq!(kind.name().parse::<TileKind>(), Ok(kind));
        }
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let err = "lava".parse::<TileKind>().expect_err("lava is not a kind");
        assert_eq!(
            err,
            TileKindError::UnknownKind {
                name: "lava".to_string()
            }
        );
    }

    #[test]
    fn only_terrain_kinds_are_solid_and_autotiled() {
        assert!(TileKind::Grass.is_physics() && TileKind::Grass.is_autotile());
        assert!(TileKind::Stone.is_physics() && TileKind::Stone.is_autotile());
        assert!(!TileKind::Decor.is_physics() && !TileKind::Decor.is_autotile());
        assert!(!TileKind::LargeDecor.is_physics() && !TileKind::LargeDecor.is_autotile());
    }

    #[test]
    fn from_world_floors_negative_positions() {
        assert_eq!(GridPos::from_world(Vec2::new(15.9, 16.0), 16), GridPos::new(0, 1));
        assert_eq!(GridPos::from_world(Vec2::new(-0.5, -16.0), 16), GridPos::new(-1, -1));
        assert_eq!(GridPos::from_world(Vec2::new(-16.5, 0.0), 16), GridPos::new(-2, 0));
    }

    #[test]
    fn key_encoding_is_canonical() {
        assert_eq!(GridPos::new(-3, 10).key(), "-3;10");
        assert_eq!(GridPos::parse_key("-3;10"), Ok(GridPos::new(-3, 10)));
        for bad in ["3", "3;", ";4", "a;b", "03;4", "+3;4", "3;4;5", "3 ;4"] {
            assert!(GridPos::parse_key(bad).is_err(), "key={bad}");
        }
    }

    #[test]
    fn offset_stops_at_the_coordinate_range() {
        let edge = GridPos::new(i32::MAX, i32::MIN);
        assert_eq!(edge.offset(-1, 1), Some(GridPos::new(i32::MAX - 1, i32::MIN + 1)));
        assert_eq!(edge.offset(1, 0), None);
        assert_eq!(edge.offset(0, -1), None);
    }
}
