use ninja_engine::{
    AssetError, AssetStore, Canvas, InputAction, InputSnapshot, Player, Scene, SceneCommand,
    Tilemap, Vec2,
};
use tracing::{debug, info};

const PLAYER_SPAWN: Vec2 = Vec2::new(50.0, 50.0);
const SKY_COLOR: [u8; 4] = [14, 219, 248, 255];
/// Fraction of the remaining distance the camera closes each tick is `1 / CAMERA_EASING`.
const CAMERA_EASING: f32 = 30.0;

pub(crate) struct GameScene {
    assets: AssetStore,
    tilemap: Tilemap,
    player: Player,
    scroll: Vec2,
    viewport: Vec2,
}

impl GameScene {
    pub(crate) fn new(assets: AssetStore, tilemap: Tilemap) -> Result<Self, AssetError> {
        let player = Player::spawn(&assets, PLAYER_SPAWN)?;
        Ok(Self {
            assets,
            tilemap,
            player,
            scroll: Vec2::ZERO,
            viewport: Vec2::ZERO,
        })
    }

    fn render_offset(&self) -> (i32, i32) {
        (self.scroll.x as i32, self.scroll.y as i32)
    }

    fn follow_player(&mut self) {
        let center = self.player.body.rect().center();
        let target = Vec2::new(
            center.x - self.viewport.x / 2.0,
            center.y - self.viewport.y / 2.0,
        );
        self.scroll.x += (target.x - self.scroll.x) / CAMERA_EASING;
        self.scroll.y += (target.y - self.scroll.y) / CAMERA_EASING;
    }
}

impl Scene for GameScene {
    fn load(&mut self) {
        info!(
            tiles = self.tilemap.len(),
            offgrid = self.tilemap.offgrid_tiles().len(),
            "game_scene_loaded"
        );
    }

    fn update(&mut self, input: &InputSnapshot) -> SceneCommand {
        let left = input.is_down(InputAction::MoveLeft) as i32 as f32;
        let right = input.is_down(InputAction::MoveRight) as i32 as f32;
        if input.was_pressed(InputAction::Jump) {
            self.player.jump();
        }
        self.player.update(&self.tilemap, Vec2::new(right - left, 0.0));
        self.follow_player();
        SceneCommand::None
    }

    fn render(&mut self, canvas: &mut Canvas) {
        let (width, height) = canvas.size();
        self.viewport = Vec2::new(width as f32, height as f32);

        match self.assets.background() {
            Some(background) => canvas.blit(background, (0, 0), false),
            None => canvas.clear(SKY_COLOR),
        }
        let offset = self.render_offset();
        self.tilemap.render(canvas, &self.assets, offset);
        self.player.render(canvas, offset);
    }

    fn unload(&mut self) {
        debug!(
            x = self.player.body.position.x,
            y = self.player.body.position.y,
            "game_scene_unloaded"
        );
    }

    fn debug_title(&self) -> Option<String> {
        Some(format!("Ninja | {}", self.player.action().name()))
    }
}
