use std::path::PathBuf;

use ninja_engine::{
    AssetStore, Canvas, EditorSession, InputAction, InputSnapshot, Scene, SceneCommand,
    TilePalette, Tilemap, Vec2,
};
use tracing::{debug, info, warn};

const SCROLL_SPEED: f32 = 2.0;
const CLEAR_COLOR: [u8; 4] = [0, 0, 0, 255];
const PREVIEW_OPACITY: u8 = 100;
const PALETTE_PREVIEW_POS: (i32, i32) = (5, 5);

pub(crate) struct EditorScene {
    assets: AssetStore,
    session: EditorSession,
    map_path: PathBuf,
    cursor: Option<Vec2>,
}

impl EditorScene {
    pub(crate) fn new(assets: AssetStore, tilemap: Tilemap, map_path: PathBuf) -> Self {
        let palette = TilePalette::from_assets(&assets);
        Self {
            assets,
            session: EditorSession::new(tilemap, palette),
            map_path,
            cursor: None,
        }
    }

    fn pan(&mut self, input: &InputSnapshot) {
        let held = |action: InputAction| input.is_down(action) as i32 as f32;
        let x = held(InputAction::MoveRight) - held(InputAction::MoveLeft);
        // Shift+S is the save chord, so S does not pan while shift is held.
        let down = held(InputAction::MoveDown) * (1.0 - held(InputAction::Modifier));
        let y = down - held(InputAction::MoveUp);
        self.session.scroll_by(Vec2::new(x * SCROLL_SPEED, y * SCROLL_SPEED));
    }

    fn handle_brush(&mut self, input: &InputSnapshot) {
        let steps = input.wheel_steps();
        if steps != 0 {
            // Wheel up walks backwards through the palette.
            if input.is_down(InputAction::Modifier) {
                self.session.cycle_variant(-steps);
            } else {
                self.session.cycle_kind(-steps);
            }
            debug!(
                kind = self.session.current_kind().name(),
                variant = self.session.current_variant(),
                "editor_brush_changed"
            );
        }

        let Some(cursor) = input.cursor_position() else {
            return;
        };
        if self.session.is_on_grid() {
            if input.left_mouse_down() {
                self.session.place_at_cursor(cursor);
            }
        } else if input.left_click_pressed() {
            self.session.place_at_cursor(cursor);
        }
        if input.right_mouse_down() {
            self.session.remove_at_cursor(cursor, &self.assets);
        }
    }

    fn handle_commands(&mut self, input: &InputSnapshot) {
        if input.was_pressed(InputAction::ToggleGrid) {
            let on_grid = self.session.toggle_grid_snap();
            debug!(on_grid, "editor_grid_toggled");
        }
        if input.was_pressed(InputAction::Autotile) {
            self.session.run_autotile();
        }
        if input.is_down(InputAction::Modifier) && input.was_pressed(InputAction::Save) {
            if let Err(err) = self.session.save(&self.map_path) {
                warn!(path = %self.map_path.display(), error = %err, "map_save_failed");
            }
        }
    }
}

impl Scene for EditorScene {
    fn load(&mut self) {
        info!(
            path = %self.map_path.display(),
            tiles = self.session.tilemap().len(),
            "editor_scene_loaded"
        );
    }

    fn update(&mut self, input: &InputSnapshot) -> SceneCommand {
        self.cursor = input.cursor_position();
        self.pan(input);
        self.handle_commands(input);
        self.handle_brush(input);
        SceneCommand::None
    }

    fn render(&mut self, canvas: &mut Canvas) {
        match self.assets.background() {
            Some(background) => canvas.blit(background, (0, 0), false),
            None => canvas.clear(CLEAR_COLOR),
        }
        self.session
            .tilemap()
            .render(canvas, &self.assets, self.session.render_offset());

        let Some(brush) = self.session.current_image(&self.assets) else {
            return;
        };
        if let Some(cursor) = self.cursor {
            canvas.blit_translucent(brush, self.session.preview_position(cursor), PREVIEW_OPACITY);
        }
        canvas.blit(brush, PALETTE_PREVIEW_POS, false);
    }

    fn unload(&mut self) {
        debug!(tiles = self.session.tilemap().len(), "editor_scene_unloaded");
    }

    fn debug_title(&self) -> Option<String> {
        let snap = if self.session.is_on_grid() {
            "grid"
        } else {
            "free"
        };
        Some(format!(
            "Ninja editor | {} #{} | {snap}",
            self.session.current_kind().name(),
            self.session.current_variant()
        ))
    }
}
