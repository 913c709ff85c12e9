use super::{Rect, Tilemap, Vec2};

pub const GRAVITY_PER_TICK: f32 = 0.1;
pub const TERMINAL_VELOCITY: f32 = 5.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollisionFlags {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl CollisionFlags {
    pub fn vertical(&self) -> bool {
        self.up || self.down
    }
}

/// Moving axis-aligned body resolved against the tilemap's solid cells.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicsBody {
    pub position: Vec2,
    pub size: Vec2,
    pub velocity: Vec2,
    pub collisions: CollisionFlags,
}

impl PhysicsBody {
    pub fn new(position: Vec2, size: Vec2) -> Self {
        Self {
            position,
            size,
            velocity: Vec2::ZERO,
            collisions: CollisionFlags::default(),
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::from_position_size(self.position, self.size)
    }

    /// One fixed step: move and resolve x, then y, then apply gravity.
    ///
    /// Solid geometry comes only from [`Tilemap::physics_rects_around`] at the body's
    /// position after each axis move.
    pub fn update(&mut self, tilemap: &Tilemap, movement: Vec2) {
        self.collisions = CollisionFlags::default();
        let frame_movement = movement + self.velocity;

        self.position.x += frame_movement.x;
        let mut body_rect = self.rect();
        for solid in tilemap.physics_rects_around(self.position) {
            if !body_rect.intersects(&solid) {
                continue;
            }
            if frame_movement.x > 0.0 {
                body_rect.set_right(solid.left());
                self.collisions.right = true;
            }
            if frame_movement.x < 0.0 {
                body_rect.set_left(solid.right());
                self.collisions.left = true;
            }
            self.position.x = body_rect.x;
        }

        self.position.y += frame_movement.y;
        let mut body_rect = self.rect();
        for solid in tilemap.physics_rects_around(self.position) {
            if !body_rect.intersects(&solid) {
                continue;
            }
            if frame_movement.y > 0.0 {
                body_rect.set_bottom(solid.top());
                self.collisions.down = true;
            }
            if frame_movement.y < 0.0 {
                body_rect.set_top(solid.bottom());
                self.collisions.up = true;
            }
            self.position.y = body_rect.y;
        }

        self.velocity.y = (self.velocity.y + GRAVITY_PER_TICK).min(TERMINAL_VELOCITY);
        if self.collisions.vertical() {
            self.velocity.y = 0.0;
        }
    }
}
