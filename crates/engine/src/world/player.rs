use crate::app::Canvas;
use crate::assets::{AssetError, AssetStore};

use super::{Animation, CollisionFlags, PhysicsBody, Tilemap, Vec2};

pub const PLAYER_ENTITY_TYPE: &str = "player";
pub const PLAYER_SIZE: Vec2 = Vec2::new(8.0, 15.0);
pub const JUMP_VELOCITY: f32 = -3.0;
const PLAYER_ANIM_OFFSET: Vec2 = Vec2::new(-3.0, -3.0);
const AIRBORNE_TICKS_FOR_JUMP: u32 = 4;

/// Behaviour label that selects which animation an entity plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Idle,
    Run,
    Jump,
}

impl Action {
    pub const ALL: [Action; 3] = [Action::Idle, Action::Run, Action::Jump];

    pub const fn name(self) -> &'static str {
        match self {
            Action::Idle => "idle",
            Action::Run => "run",
            Action::Jump => "jump",
        }
    }

    /// Asset key, `"{entity_type}/{action}"`.
    pub fn asset_key(self, entity_type: &str) -> String {
        format!("{entity_type}/{}", self.name())
    }
}

/// Animation templates for every [`Action`], resolved once when the entity is built.
#[derive(Debug, Clone)]
pub struct ActionAnimations {
    idle: Animation,
    run: Animation,
    jump: Animation,
}

impl ActionAnimations {
    pub fn new(idle: Animation, run: Animation, jump: Animation) -> Self {
        Self { idle, run, jump }
    }

    pub fn from_assets(assets: &AssetStore, entity_type: &str) -> Result<Self, AssetError> {
        Ok(Self {
            idle: assets.animation(&Action::Idle.asset_key(entity_type))?.copy(),
            run: assets.animation(&Action::Run.asset_key(entity_type))?.copy(),
            jump: assets.animation(&Action::Jump.asset_key(entity_type))?.copy(),
        })
    }

    pub fn template(&self, action: Action) -> &Animation {
        match action {
            Action::Idle => &self.idle,
            Action::Run => &self.run,
            Action::Jump => &self.jump,
        }
    }
}

/// Plays the animation for the current action and tracks facing.
#[derive(Debug, Clone)]
pub struct Animator {
    templates: ActionAnimations,
    action: Action,
    animation: Animation,
    flip: bool,
}

impl Animator {
    pub fn new(templates: ActionAnimations, initial: Action) -> Self {
        let animation = templates.template(initial).copy();
        Self {
            templates,
            action: initial,
            animation,
            flip: false,
        }
    }

    /// Swaps to a fresh copy of the action's animation. Same action keeps playing.
    pub fn set_action(&mut self, action: Action) {
        if action == self.action {
            return;
        }
        self.action = action;
        self.animation = self.templates.template(action).copy();
    }

    /// Facing follows the sign of horizontal input; zero keeps the last facing.
    pub fn face(&mut self, movement_x: f32) {
        if movement_x > 0.0 {
            self.flip = false;
        }
        if movement_x < 0.0 {
            self.flip = true;
        }
    }

    pub fn tick(&mut self) {
        self.animation.update();
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn animation(&self) -> &Animation {
        &self.animation
    }

    pub fn flipped(&self) -> bool {
        self.flip
    }
}

/// Air-time driven action selection for the player body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerBehavior {
    air_time: u32,
}

impl PlayerBehavior {
    pub fn next_action(&mut self, collisions: CollisionFlags, movement: Vec2) -> Action {
        self.air_time = self.air_time.saturating_add(1);
        if collisions.down {
            self.air_time = 0;
        }

        if self.air_time > AIRBORNE_TICKS_FOR_JUMP {
            Action::Jump
        } else if movement.x != 0.0 {
            Action::Run
        } else {
            Action::Idle
        }
    }

    pub fn air_time(&self) -> u32 {
        self.air_time
    }
}

#[derive(Debug, Clone)]
pub struct Player {
    pub body: PhysicsBody,
    animator: Animator,
    behavior: PlayerBehavior,
    anim_offset: Vec2,
}

impl Player {
    pub fn new(position: Vec2, size: Vec2, animations: ActionAnimations) -> Self {
        Self {
            body: PhysicsBody::new(position, size),
            animator: Animator::new(animations, Action::Idle),
            behavior: PlayerBehavior::default(),
            anim_offset: PLAYER_ANIM_OFFSET,
        }
    }

    pub fn spawn(assets: &AssetStore, position: Vec2) -> Result<Self, AssetError> {
        let animations = ActionAnimations::from_assets(assets, PLAYER_ENTITY_TYPE)?;
        Ok(Self::new(position, PLAYER_SIZE, animations))
    }

    pub fn update(&mut self, tilemap: &Tilemap, movement: Vec2) {
        self.body.update(tilemap, movement);
        self.animator.face(movement.x);
        self.animator.tick();

        let action = self.behavior.next_action(self.body.collisions, movement);
        self.animator.set_action(action);
    }

    pub fn jump(&mut self) {
        self.body.velocity.y = JUMP_VELOCITY;
    }

    pub fn action(&self) -> Action {
        self.animator.action()
    }

    pub fn flipped(&self) -> bool {
        self.animator.flipped()
    }

    pub fn air_time(&self) -> u32 {
        self.behavior.air_time()
    }

    pub fn animation(&self) -> &Animation {
        self.animator.animation()
    }

    pub fn render(&self, canvas: &mut Canvas, offset: (i32, i32)) {
        let x = self.body.position.x - offset.0 as f32 + self.anim_offset.x;
        let y = self.body.position.y - offset.1 as f32 + self.anim_offset.y;
        canvas.blit(
            self.animator.animation().image(),
            (x as i32, y as i32),
            self.animator.flipped(),
        );
    }
}
