//! Level-editing operations on a [`Tilemap`], independent of how input is gathered.

use std::path::Path;

use tracing::info;

use crate::assets::{AssetStore, Image};
use crate::world::{GridPos, MapError, OffgridTile, Rect, Tile, TileKind, Tilemap, Vec2};

const PALETTE_LEN: usize = TileKind::ALL.len();

/// Variant counts for every [`TileKind`], in palette order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TilePalette {
    variant_counts: [usize; PALETTE_LEN],
}

impl TilePalette {
    pub fn new(variant_counts: [usize; PALETTE_LEN]) -> Self {
        Self { variant_counts }
    }

    pub fn from_assets(assets: &AssetStore) -> Self {
        Self::new(TileKind::ALL.map(|kind| assets.variant_count(kind)))
    }

    pub fn kind_count(&self) -> usize {
        PALETTE_LEN
    }

    pub fn kind(&self, index: usize) -> TileKind {
        TileKind::ALL[index % PALETTE_LEN]
    }

    pub fn variant_count(&self, index: usize) -> usize {
        self.variant_counts[index % PALETTE_LEN]
    }
}

/// What a single remove call took out of the map.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Removal {
    pub grid: Option<Tile>,
    pub offgrid: usize,
}

/// Editor state: the map being edited, the brush selection and the view scroll.
#[derive(Debug, Clone)]
pub struct EditorSession {
    tilemap: Tilemap,
    palette: TilePalette,
    kind_index: usize,
    variant: usize,
    on_grid: bool,
    scroll: Vec2,
}

impl EditorSession {
    pub fn new(tilemap: Tilemap, palette: TilePalette) -> Self {
        Self {
            tilemap,
            palette,
            kind_index: 0,
            variant: 0,
            on_grid: true,
            scroll: Vec2::ZERO,
        }
    }

    pub fn tilemap(&self) -> &Tilemap {
        &self.tilemap
    }

    pub fn current_kind(&self) -> TileKind {
        self.palette.kind(self.kind_index)
    }

    pub fn current_variant(&self) -> usize {
        self.variant
    }

    pub fn current_image<'a>(&self, assets: &'a AssetStore) -> Option<&'a Image> {
        assets.tile_image(self.current_kind(), self.variant)
    }

    pub fn is_on_grid(&self) -> bool {
        self.on_grid
    }

    pub fn scroll(&self) -> Vec2 {
        self.scroll
    }

    /// Scroll truncated to whole pixels, as used for drawing.
    pub fn render_offset(&self) -> (i32, i32) {
        (self.scroll.x as i32, self.scroll.y as i32)
    }

    pub fn scroll_by(&mut self, delta: Vec2) {
        self.scroll += delta;
    }

    /// Grid cell under a canvas-space cursor.
    pub fn cursor_cell(&self, cursor: Vec2) -> GridPos {
        GridPos::from_world(cursor + self.scroll, self.tilemap.tile_size())
    }

    /// Canvas position of the brush preview: snapped to the hovered cell on grid,
    /// at the cursor otherwise.
    pub fn preview_position(&self, cursor: Vec2) -> (i32, i32) {
        if !self.on_grid {
            return (cursor.x as i32, cursor.y as i32);
        }
        let origin = self.cursor_cell(cursor).to_world(self.tilemap.tile_size()) - self.scroll;
        (origin.x as i32, origin.y as i32)
    }

    /// Places the current brush. On grid it fills the hovered cell; off grid it drops
    /// a free tile at the cursor's world position.
    pub fn place_at_cursor(&mut self, cursor: Vec2) {
        let kind = self.current_kind();
        if self.on_grid {
            self.tilemap.place(cursor + self.scroll, kind, self.variant);
        } else {
            self.tilemap.push_offgrid(OffgridTile {
                kind,
                variant: self.variant,
                pos: cursor + self.scroll,
            });
        }
    }

    /// Removes the grid tile in the hovered cell and every off-grid tile whose image
    /// rectangle contains the cursor.
    pub fn remove_at_cursor(&mut self, cursor: Vec2, assets: &AssetStore) -> Removal {
        let grid = self.tilemap.remove(self.cursor_cell(cursor));
        let scroll = self.scroll;
        let offgrid = self.tilemap.remove_offgrid_where(|tile| {
            let Some(image) = assets.tile_image(tile.kind, tile.variant) else {
                return false;
            };
            let (width, height) = image.size();
            Rect::from_position_size(tile.pos - scroll, Vec2::new(width as f32, height as f32))
                .contains_point(cursor)
        });
        Removal { grid, offgrid }
    }

    pub fn toggle_grid_snap(&mut self) -> bool {
        self.on_grid = !self.on_grid;
        self.on_grid
    }

    /// Moves through the palette by `step` kinds, wrapping. Resets the variant.
    pub fn cycle_kind(&mut self, step: i32) {
        self.kind_index = wrap_index(self.kind_index, step, self.palette.kind_count());
        self.variant = 0;
    }

    /// Moves through the current kind's variants by `step`, wrapping.
    pub fn cycle_variant(&mut self, step: i32) {
        let count = self.palette.variant_count(self.kind_index);
        if count == 0 {
            self.variant = 0;
            return;
        }
        self.variant = wrap_index(self.variant, step, count);
    }

    pub fn run_autotile(&mut self) -> usize {
        self.tilemap.autotile()
    }

    pub fn save(&self, path: &Path) -> Result<(), MapError> {
        self.tilemap.save(path)
    }

    pub fn load(&mut self, path: &Path) -> Result<(), MapError> {
        self.tilemap = Tilemap::load(path)?;
        info!(
            path = %path.display(),
            tiles = self.tilemap.len(),
            "editor_map_reloaded"
        );
        Ok(())
    }
}

fn wrap_index(index: usize, step: i32, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    (index as i64 + step as i64).rem_euclid(len as i64) as usize
}
