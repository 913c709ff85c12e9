use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod app;
pub mod assets;
pub mod editor;
pub mod world;

pub use app::{
    run_app, AppError, Canvas, InputAction, InputSnapshot, LoopConfig, Renderer, Scene,
    SceneCommand,
};
pub use assets::{AnimationSpec, AssetError, AssetStore, Image};
pub use editor::{EditorSession, Removal, TilePalette};
pub use world::{
    Action, ActionAnimations, Animation, AnimationError, Animator, CellRange, CollisionFlags,
    GridKeyError, GridPos, MapError, OffgridTile, PhysicsBody, Player, PlayerBehavior, Rect, Tile,
    TileKind, TileKindError, Tilemap, TilemapError, Vec2, DEFAULT_TILE_SIZE, GRAVITY_PER_TICK,
    JUMP_VELOCITY, PLAYER_ENTITY_TYPE, PLAYER_SIZE, TERMINAL_VELOCITY,
};

pub const ROOT_ENV_VAR: &str = "NINJA_ROOT";
pub const MAP_ENV_VAR: &str = "NINJA_MAP";
const DEFAULT_MAP_FILE: &str = "map.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    pub root: PathBuf,
    pub images_dir: PathBuf,
    pub map_path: PathBuf,
}

impl AppPaths {
    pub fn for_root(root: PathBuf) -> Self {
        Self {
            images_dir: root.join("assets").join("images"),
            map_path: root.join(DEFAULT_MAP_FILE),
            root,
        }
    }

    /// Relative map paths resolve against the project root.
    pub fn with_map_path(mut self, map_path: &Path) -> Self {
        self.map_path = if map_path.is_absolute() {
            map_path.to_path_buf()
        } else {
            self.root.join(map_path)
        };
        self
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error(
        "NINJA_ROOT is set but does not point to a valid project root: {path}\n\
A valid root must contain Cargo.toml and an assets/ directory."
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not detect project root by walking upward from {start_dir}\n\
Expected a directory containing Cargo.toml and assets/.\n\
Set {env_var} explicitly, for example:\n\
export {env_var}=\"/path/to/ninja\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

/// Root from `NINJA_ROOT` or upward discovery; map path from `NINJA_MAP` when set.
pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let paths = AppPaths::for_root(resolve_root()?);
    match read_env(MAP_ENV_VAR)? {
        Some(map_path) => Ok(paths.with_map_path(Path::new(&map_path))),
        None => Ok(paths),
    }
}

fn read_env(var: &'static str) -> Result<Option<String>, StartupError> {
    match env::var(var) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(source) => Err(StartupError::EnvVar { var, source }),
    }
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    if let Some(value) = read_env(ROOT_ENV_VAR)? {
        let normalized = normalize_path(Path::new(&value));
        return if is_project_root(&normalized) {
            Ok(normalized)
        } else {
            Err(StartupError::InvalidEnvRoot { path: normalized })
        };
    }

    let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
    let exe_dir = exe
        .parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;
    if let Some(root) = find_root_above(&exe_dir) {
        return Ok(root);
    }
    if let Some(root) = env::current_dir().ok().and_then(|cwd| find_root_above(&cwd)) {
        return Ok(root);
    }

    Err(StartupError::RootNotFound {
        start_dir: normalize_path(&exe_dir),
        env_var: ROOT_ENV_VAR,
    })
}

fn find_root_above(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|candidate| is_project_root(candidate))
        .map(normalize_path)
}

fn is_project_root(path: &Path) -> bool {
    path.join("Cargo.toml").is_file() && path.join("assets").is_dir()
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn project_root() -> TempDir {
        let dir = TempDir::new().expect("temp dir");
        fs::write(dir.path().join("Cargo.toml"), "[workspace]\n").expect("cargo toml");
        fs::create_dir_all(dir.path().join("assets").join("images")).expect("assets");
        dir
    }

    #[test]
    fn project_root_needs_cargo_toml_and_assets() {
        let dir = TempDir::new().expect("temp dir");
        assert!(!is_project_root(dir.path()));
        fs::write(dir.path().join("Cargo.toml"), "").expect("cargo toml");
        assert!(!is_project_root(dir.path()));
        fs::create_dir(dir.path().join("assets")).expect("assets");
        assert!(is_project_root(dir.path()));
    }

    #[test]
    fn root_is_found_from_nested_directory() {
        let root = project_root();
        let nested = root.path().join("target").join("debug");
        fs::create_dir_all(&nested).expect("nested");

        let found = find_root_above(&nested).expect("root");
        assert_eq!(found, normalize_path(root.path()));
    }

    #[test]
    fn default_paths_live_under_root() {
        let paths = AppPaths::for_root(PathBuf::from("/game"));
        assert_eq!(paths.images_dir, PathBuf::from("/game/assets/images"));
        assert_eq!(paths.map_path, PathBuf::from("/game/map.json"));
    }

    #[test]
    fn map_override_resolves_relative_to_root() {
        let paths = AppPaths::for_root(PathBuf::from("/game"));
        assert_eq!(
            paths.clone().with_map_path(Path::new("levels/one.json")).map_path,
            PathBuf::from("/game/levels/one.json")
        );
        assert_eq!(
            paths.with_map_path(Path::new("/tmp/other.json")).map_path,
            PathBuf::from("/tmp/other.json")
        );
    }
}
