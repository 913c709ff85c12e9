mod animation;
mod geometry;
mod map_file;
mod physics;
mod player;
mod tile;
mod tilemap;

pub use animation::{Animation, AnimationError};
pub use geometry::{Rect, Vec2};
pub use map_file::MapError;
pub use physics::{CollisionFlags, PhysicsBody, GRAVITY_PER_TICK, TERMINAL_VELOCITY};
pub use player::{
    Action, ActionAnimations, Animator, Player, PlayerBehavior, JUMP_VELOCITY, PLAYER_ENTITY_TYPE,
    PLAYER_SIZE,
};
pub use tile::{GridKeyError, GridPos, OffgridTile, Tile, TileKind, TileKindError};
pub use tilemap::{CellRange, Tilemap, TilemapError, DEFAULT_TILE_SIZE};
