use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use ninja_engine::{
    resolve_app_paths, AppPaths, AssetError, AssetStore, LoopConfig, MapError, Scene,
    StartupError, Tilemap, TilemapError, DEFAULT_TILE_SIZE,
};
use thiserror::Error;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use super::editor_scene::EditorScene;
use super::game_scene::GameScene;

const USAGE: &str = "\
usage: ninja [editor|game] [--map <path>]

modes:
  game     play the level (default)
  editor   place and remove tiles, Shift+S saves

options:
  --map <path>  map file, relative to the project root (overrides NINJA_MAP)
  -h, --help    print this help";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum Mode {
    #[default]
    Game,
    Editor,
}

impl Mode {
    fn name(self) -> &'static str {
        match self {
            Mode::Game => "game",
            Mode::Editor => "editor",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct CliOptions {
    pub(crate) mode: Mode,
    pub(crate) map_path: Option<PathBuf>,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum CliCommand {
    Run(CliOptions),
    Help,
}

#[derive(Debug, Error)]
enum BootstrapError {
    #[error(transparent)]
    Paths(#[from] StartupError),
    #[error(transparent)]
    Assets(#[from] AssetError),
    #[error(transparent)]
    Map(#[from] MapError),
    #[error(transparent)]
    Tilemap(#[from] TilemapError),
}

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scene: Box<dyn Scene>,
}

/// `Ok(None)` means the process is done without opening a window (help text).
pub(crate) fn build_app() -> Result<Option<AppWiring>, ExitCode> {
    let args = env::args().skip(1).collect::<Vec<_>>();
    let options = match parse_args(&args) {
        Ok(CliCommand::Run(options)) => options,
        Ok(CliCommand::Help) => {
            println!("{USAGE}");
            return Ok(None);
        }
        Err(message) => {
            eprintln!("{message}\n\n{USAGE}");
            return Err(ExitCode::from(2));
        }
    };

    init_tracing();
    info!(mode = options.mode.name(), "=== Ninja Startup ===");

    match wire_scene(&options) {
        Ok(scene) => Ok(Some(AppWiring {
            config: LoopConfig::default(),
            scene,
        })),
        Err(err) => {
            error!(error = %err, "startup_failed");
            Err(ExitCode::FAILURE)
        }
    }
}

pub(crate) fn parse_args(args: &[String]) -> Result<CliCommand, String> {
    let mut options = CliOptions::default();
    let mut mode_seen = false;
    let mut index = 0usize;
    while index < args.len() {
        match args[index].as_str() {
            "-h" | "--help" => return Ok(CliCommand::Help),
            "--map" => {
                let value = args
                    .get(index + 1)
                    .ok_or_else(|| "missing value for --map".to_string())?;
                options.map_path = Some(PathBuf::from(value));
                index += 2;
            }
            mode @ ("game" | "editor") => {
                if mode_seen {
                    return Err(format!("unexpected extra mode '{mode}'"));
                }
                options.mode = if mode == "editor" {
                    Mode::Editor
                } else {
                    Mode::Game
                };
                mode_seen = true;
                index += 1;
            }
            other => return Err(format!("unknown argument '{other}'")),
        }
    }
    Ok(CliCommand::Run(options))
}

fn wire_scene(options: &CliOptions) -> Result<Box<dyn Scene>, BootstrapError> {
    let mut paths = resolve_app_paths()?;
    if let Some(map_path) = &options.map_path {
        paths = paths.with_map_path(map_path);
    }
    log_paths(&paths);

    let assets = AssetStore::load(&paths.images_dir)?;
    let scene: Box<dyn Scene> = match options.mode {
        Mode::Game => {
            let tilemap = load_or_default(&paths.map_path, Tilemap::with_default_layout)?;
            Box::new(GameScene::new(assets, tilemap)?)
        }
        Mode::Editor => {
            let tilemap = load_or_default(&paths.map_path, Tilemap::new)?;
            Box::new(EditorScene::new(assets, tilemap, paths.map_path))
        }
    };
    Ok(scene)
}

fn load_or_default(
    map_path: &Path,
    fallback: fn(u32) -> Result<Tilemap, TilemapError>,
) -> Result<Tilemap, BootstrapError> {
    match Tilemap::load_if_present(map_path)? {
        Some(tilemap) => Ok(tilemap),
        None => Ok(fallback(DEFAULT_TILE_SIZE)?),
    }
}

fn log_paths(paths: &AppPaths) {
    info!(
        root = %paths.root.display(),
        images = %paths.images_dir.display(),
        map = %paths.map_path.display(),
        "app_paths"
    );
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn no_arguments_runs_the_game_with_default_map() {
        assert_eq!(
            parse_args(&[]).expect("parse"),
            CliCommand::Run(CliOptions::default())
        );
    }

    #[test]
    fn editor_mode_with_map_override() {
        let parsed = parse_args(&args(&["editor", "--map", "levels/one.json"])).expect("parse");
        assert_eq!(
            parsed,
            CliCommand::Run(CliOptions {
                mode: Mode::Editor,
                map_path: Some(PathBuf::from("levels/one.json")),
            })
        );
    }

    #[test]
    fn map_flag_may_come_before_mode() {
        let parsed = parse_args(&args(&["--map", "a.json", "game"])).expect("parse");
        let CliCommand::Run(options) = parsed else {
            panic!("expected run command");
        };
        assert_eq!(options.mode, Mode::Game);
        assert_eq!(options.map_path, Some(PathBuf::from("a.json")));
    }

    #[test]
    fn help_wins_over_other_arguments() {
        assert_eq!(
            parse_args(&args(&["editor", "--help"])).expect("parse"),
            CliCommand::Help
        );
        assert_eq!(parse_args(&args(&["-h"])).expect("parse"), CliCommand::Help);
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(parse_args(&args(&["--map"])).is_err());
        assert!(parse_args(&args(&["editor", "game"])).is_err());
        assert!(parse_args(&args(&["--fullscreen"])).is_err());
    }
}
