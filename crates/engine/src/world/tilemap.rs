use std::collections::HashMap;

use thiserror::Error;
use tracing::info;

use crate::app::Canvas;
use crate::assets::AssetStore;

use super::{GridPos, OffgridTile, Rect, Tile, TileKind, Vec2};

pub const DEFAULT_TILE_SIZE: u32 = 16;

/// The 8 neighbours plus the cell itself, in lookup order.
const NEIGHBOR_OFFSETS: [(i32, i32); 9] = [
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
    (1, 0),
    (0, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

const EAST: u8 = 0b0001;
const SOUTH: u8 = 0b0010;
const WEST: u8 = 0b0100;
const NORTH: u8 = 0b1000;

const CARDINAL_OFFSETS: [((i32, i32), u8); 4] = [
    ((1, 0), EAST),
    ((0, 1), SOUTH),
    ((-1, 0), WEST),
    ((0, -1), NORTH),
];

/// Variant for a set of same-kind cardinal neighbours. Sets without an entry leave the tile alone.
fn autotile_variant(neighbors: u8) -> Option<usize> {
    match neighbors {
        m if m == EAST | SOUTH => Some(0),
        m if m == EAST | SOUTH | WEST => Some(1),
        m if m == WEST | SOUTH => Some(2),
        m if m == WEST | NORTH | SOUTH => Some(3),
        m if m == WEST | NORTH => Some(4),
        m if m == WEST | NORTH | EAST => Some(5),
        m if m == EAST | NORTH => Some(6),
        m if m == EAST | NORTH | SOUTH => Some(7),
        m if m == EAST | WEST | SOUTH | NORTH => Some(8),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TilemapError {
    #[error("tile size must be positive")]
    ZeroTileSize,
}

/// Inclusive range of grid cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub x_min: i32,
    pub x_max: i32,
    pub y_min: i32,
    pub y_max: i32,
}

/// Sparse tile grid plus free-placed decorations.
///
/// Grid tiles are keyed by their own [`GridPos`]; the `"{x};{y}"` string form only
/// exists in map files.
#[derive(Debug, Clone, PartialEq)]
pub struct Tilemap {
    tile_size: u32,
    tiles: HashMap<GridPos, Tile>,
    offgrid: Vec<OffgridTile>,
}

impl Default for Tilemap {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
            tiles: HashMap::new(),
            offgrid: Vec::new(),
        }
    }
}

impl Tilemap {
    pub fn new(tile_size: u32) -> Result<Self, TilemapError> {
        if tile_size == 0 {
            return Err(TilemapError::ZeroTileSize);
        }
        Ok(Self {
            tile_size,
            ..Self::default()
        })
    }

    /// Starter world: a grass floor on row 10 and a stone pillar on column 10.
    pub fn with_default_layout(tile_size: u32) -> Result<Self, TilemapError> {
        let mut tilemap = Self::new(tile_size)?;
        for i in 0..10 {
            tilemap.insert(Tile {
                kind: TileKind::Grass,
                variant: 1,
                pos: GridPos::new(3 + i, 10),
            });
            tilemap.insert(Tile {
                kind: TileKind::Stone,
                variant: 1,
                pos: GridPos::new(10, 5 + i),
            });
        }
        Ok(tilemap)
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Number of grid tiles. Off-grid tiles are counted by [`Tilemap::offgrid_tiles`].
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// True when no grid tile is placed, whatever the off-grid list holds.
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn tile_at(&self, pos: GridPos) -> Option<&Tile> {
        self.tiles.get(&pos)
    }

    /// Grid tiles sorted by position.
    pub fn grid_tiles(&self) -> Vec<&Tile> {
        let mut tiles = self.tiles.values().collect::<Vec<_>>();
        tiles.sort_by_key(|tile| tile.pos);
        tiles
    }

    pub fn offgrid_tiles(&self) -> &[OffgridTile] {
        &self.offgrid
    }

    /// Inserts a tile at its own cell, replacing whatever was there.
    pub fn insert(&mut self, tile: Tile) -> Option<Tile> {
        self.tiles.insert(tile.pos, tile)
    }

    /// Grid-snapped placement at the cell containing `position`.
    pub fn place(&mut self, position: Vec2, kind: TileKind, variant: usize) -> GridPos {
        let pos = GridPos::from_world(position, self.tile_size);
        self.insert(Tile { kind, variant, pos });
        pos
    }

    /// No-op when the cell is empty.
    pub fn remove(&mut self, pos: GridPos) -> Option<Tile> {
        self.tiles.remove(&pos)
    }

    pub fn push_offgrid(&mut self, tile: OffgridTile) {
        self.offgrid.push(tile);
    }

    /// Drops every off-grid tile for which `hit` returns true. Returns how many were removed.
    pub fn remove_offgrid_where<F>(&mut self, mut hit: F) -> usize
    where
        F: FnMut(&OffgridTile) -> bool,
    {
        let before = self.offgrid.len();
        self.offgrid.retain(|tile| !hit(tile));
        before - self.offgrid.len()
    }

    pub fn tiles_around(&self, position: Vec2) -> Vec<&Tile> {
        let center = GridPos::from_world(position, self.tile_size);
        NEIGHBOR_OFFSETS
            .iter()
            .filter_map(|&(dx, dy)| self.tiles.get(&center.offset(dx, dy)?))
            .collect()
    }

    /// Solid rectangles in the 3x3 cell window around `position`.
    pub fn physics_rects_around(&self, position: Vec2) -> Vec<Rect> {
        let size = self.tile_size as f32;
        self.tiles_around(position)
            .into_iter()
            .filter(|tile| tile.kind.is_physics())
            .map(|tile| {
                let origin = tile.pos.to_world(self.tile_size);
                Rect::new(origin.x, origin.y, size, size)
            })
            .collect()
    }

    /// Physics tile occupying the cell that contains `position`, if any.
    pub fn solid_check(&self, position: Vec2) -> Option<&Tile> {
        self.tiles
            .get(&GridPos::from_world(position, self.tile_size))
            .filter(|tile| tile.kind.is_physics())
    }

    /// Re-picks variants of autotile kinds from their cardinal same-kind neighbours.
    /// Returns the number of tiles whose variant changed.
    pub fn autotile(&mut self) -> usize {
        let updates = self
            .tiles
            .values()
            .filter(|tile| tile.kind.is_autotile())
            .filter_map(|tile| {
                let neighbors = CARDINAL_OFFSETS
                    .iter()
                    .filter(|((dx, dy), _)| {
                        tile.pos
                            .offset(*dx, *dy)
                            .and_then(|pos| self.tiles.get(&pos))
                            .is_some_and(|other| other.kind == tile.kind)
                    })
                    .fold(0u8, |mask, (_, bit)| mask | bit);
                autotile_variant(neighbors)
                    .filter(|variant| *variant != tile.variant)
                    .map(|variant| (tile.pos, variant))
            })
            .collect::<Vec<_>>();

        for (pos, variant) in &updates {
            if let Some(tile) = self.tiles.get_mut(pos) {
                tile.variant = *variant;
            }
        }
        info!(changed = updates.len(), tiles = self.tiles.len(), "autotile_applied");
        updates.len()
    }

    /// Cells overlapping the viewport `[offset, offset + size]` grown by one tile on each side.
    pub fn visible_cells(&self, offset: (i32, i32), viewport_size: (u32, u32)) -> CellRange {
        let size = self.tile_size as i32;
        let (width, height) = (viewport_size.0 as i32, viewport_size.1 as i32);
        CellRange {
            x_min: offset.0.div_euclid(size).saturating_sub(1),
            x_max: offset.0.saturating_add(width).div_euclid(size).saturating_add(1),
            y_min: offset.1.div_euclid(size).saturating_sub(1),
            y_max: offset.1.saturating_add(height).div_euclid(size).saturating_add(1),
        }
    }

    /// Draws off-grid tiles first, then the grid cells inside the viewport.
    pub fn render(&self, canvas: &mut Canvas, assets: &AssetStore, offset: (i32, i32)) {
        for tile in &self.offgrid {
            if let Some(image) = assets.tile_image(tile.kind, tile.variant) {
                let x = (tile.pos.x - offset.0 as f32) as i32;
                let y = (tile.pos.y - offset.1 as f32) as i32;
                canvas.blit(image, (x, y), false);
            }
        }

        let cells = self.visible_cells(offset, canvas.size());
        let size = self.tile_size as i32;
        for y in cells.y_min..=cells.y_max {
            for x in cells.x_min..=cells.x_max {
                let Some(tile) = self.tiles.get(&GridPos::new(x, y)) else {
                    continue;
                };
                let Some(image) = assets.tile_image(tile.kind, tile.variant) else {
                    continue;
                };
                let origin = (
                    x.saturating_mul(size).saturating_sub(offset.0),
                    y.saturating_mul(size).saturating_sub(offset.1),
                );
                canvas.blit(image, origin, false);
            }
        }
    }
}
