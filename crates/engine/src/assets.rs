//! Image assets resolved once at startup.
//!
//! Layout under the images directory:
//! - `tiles/<kind>/*.png`: one image set per [`TileKind`], ordered by file name.
//! - `entities/<entity>/<action>/*.png`: animation frames, keyed `"<entity>/<action>"`.
//! - `background.png`: optional backdrop.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::ImageReader;
use thiserror::Error;
use tracing::info;

use crate::world::{Animation, TileKind};

const TRANSPARENT_KEY: [u8; 3] = [0, 0, 0];
const DEFAULT_FRAME_DURATION: u32 = 5;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("asset not found: '{key}'")]
    AssetNotFound { key: String },
    #[error("invalid asset key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },
    #[error("failed to load image '{path}': {detail}")]
    Decode { path: PathBuf, detail: String },
    #[error("asset '{key}' has no images")]
    EmptyImageSet { key: String },
}

/// Decoded RGBA8 image. Pixel data is shared between clones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    width: u32,
    height: u32,
    rgba: Arc<[u8]>,
}

impl Image {
    /// Returns `None` when either dimension is zero or the buffer length does not match.
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(4)?;
        if rgba.len() != expected {
            return None;
        }
        Some(Self {
            width,
            height,
            rgba: rgba.into(),
        })
    }

    /// Solid-colour image, used for placeholder frames and tests.
    pub fn filled(width: u32, height: u32, color: [u8; 4]) -> Option<Self> {
        let pixels = (width as usize).checked_mul(height as usize)?;
        Self::from_rgba(width, height, color.repeat(pixels))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let mut color = [0; 4];
        color.copy_from_slice(&self.rgba[offset..offset + 4]);
        Some(color)
    }
}

/// Frame timing for one entity action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationSpec {
    pub frame_duration: u32,
    pub looping: bool,
}

impl AnimationSpec {
    pub fn for_action(action: &str) -> Self {
        let frame_duration = match action {
            "idle" => 6,
            "run" => 4,
            _ => DEFAULT_FRAME_DURATION,
        };
        Self {
            frame_duration,
            looping: true,
        }
    }
}

/// Explicitly constructed asset context shared by the scenes for the whole run.
#[derive(Debug, Clone, Default)]
pub struct AssetStore {
    tiles: HashMap<TileKind, Vec<Image>>,
    animations: HashMap<String, Animation>,
    background: Option<Image>,
}

impl AssetStore {
    pub fn from_parts(
        tiles: HashMap<TileKind, Vec<Image>>,
        animations: HashMap<String, Animation>,
        background: Option<Image>,
    ) -> Result<Self, AssetError> {
        for (kind, images) in &tiles {
            if images.is_empty() {
                return Err(AssetError::EmptyImageSet {
                    key: kind.name().to_string(),
                });
            }
        }
        for key in animations.keys() {
            validate_asset_key(key)?;
        }
        Ok(Self {
            tiles,
            animations,
            background,
        })
    }

    /// Loads every tile kind and every entity animation found under `images_dir`.
    ///
    /// Each [`TileKind`] must have a non-empty image directory.
    pub fn load(images_dir: &Path) -> Result<Self, AssetError> {
        let mut tiles = HashMap::new();
        for kind in TileKind::ALL {
            let key = format!("tiles/{}", kind.name());
            let images = load_image_dir(&images_dir.join("tiles").join(kind.name()), &key)?;
            tiles.insert(kind, images);
        }

        let mut animations = HashMap::new();
        let entities_dir = images_dir.join("entities");
        if entities_dir.is_dir() {
            for entity in sorted_subdirectories(&entities_dir)? {
                for action in sorted_subdirectories(&entities_dir.join(&entity))? {
                    let key = format!("{entity}/{action}");
                    validate_asset_key(&key)?;
                    let frames = load_image_dir(&entities_dir.join(&entity).join(&action), &key)?;
                    let spec = AnimationSpec::for_action(&action);
                    let animation = Animation::new(frames, spec.frame_duration, spec.looping)
                        .map_err(|_| AssetError::EmptyImageSet { key: key.clone() })?;
                    animations.insert(key, animation);
                }
            }
        }

        let background_path = images_dir.join("background.png");
        let background = if background_path.is_file() {
            Some(load_image(&background_path)?)
        } else {
            None
        };

        let store = Self {
            tiles,
            animations,
            background,
        };
        info!(
            images_dir = %images_dir.display(),
            tile_kinds = store.tiles.len(),
            tile_images = store.tiles.values().map(Vec::len).sum::<usize>(),
            animations = store.animations.len(),
            background = store.background.is_some(),
            "assets_loaded"
        );
        Ok(store)
    }

    pub fn tile_images(&self, kind: TileKind) -> Result<&[Image], AssetError> {
        self.tiles
            .get(&kind)
            .map(Vec::as_slice)
            .ok_or_else(|| AssetError::AssetNotFound {
                key: format!("tiles/{}", kind.name()),
            })
    }

    /// Number of variants for `kind`; zero when the kind was never loaded.
    pub fn variant_count(&self, kind: TileKind) -> usize {
        self.tiles.get(&kind).map_or(0, Vec::len)
    }

    pub fn tile_image(&self, kind: TileKind, variant: usize) -> Option<&Image> {
        self.tiles.get(&kind).and_then(|images| images.get(variant))
    }

    /// Template animation for `"<entity>/<action>"`. Callers keep a [`Animation::copy`].
    pub fn animation(&self, key: &str) -> Result<&Animation, AssetError> {
        validate_asset_key(key)?;
        self.animations
            .get(key)
            .ok_or_else(|| AssetError::AssetNotFound {
                key: key.to_string(),
            })
    }

    pub fn background(&self) -> Option<&Image> {
        self.background.as_ref()
    }
}

fn validate_asset_key(key: &str) -> Result<(), AssetError> {
    let invalid = |reason: &str| AssetError::InvalidKey {
        key: key.to_string(),
        reason: reason.to_string(),
    };
    if key.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if key.starts_with('/') {
        return Err(invalid("must not start with '/'"));
    }
    if key.contains('\\') {
        return Err(invalid("must not contain '\\'"));
    }
    if key.contains("..") {
        return Err(invalid("must not contain '..'"));
    }
    if let Some(ch) = key
        .chars()
        .find(|ch| !(ch.is_ascii_lowercase() || ch.is_ascii_digit() || matches!(ch, '_' | '/' | '-')))
    {
        return Err(invalid(&format!("contains invalid character '{ch}'")));
    }
    Ok(())
}

fn load_image_dir(dir: &Path, key: &str) -> Result<Vec<Image>, AssetError> {
    let entries = fs::read_dir(dir).map_err(|_| AssetError::AssetNotFound {
        key: key.to_string(),
    })?;
    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|error| AssetError::Decode {
            path: dir.to_path_buf(),
            detail: error.to_string(),
        })?;
        let path = entry.path();
        if path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    if paths.is_empty() {
        return Err(AssetError::EmptyImageSet {
            key: key.to_string(),
        });
    }
    paths.iter().map(|path| load_image(path)).collect()
}

fn sorted_subdirectories(dir: &Path) -> Result<Vec<String>, AssetError> {
    let entries = fs::read_dir(dir).map_err(|error| AssetError::Decode {
        path: dir.to_path_buf(),
        detail: error.to_string(),
    })?;
    let mut names = Vec::new();
    for entry in entries.flatten() {
        if !entry.path().is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

fn load_image(path: &Path) -> Result<Image, AssetError> {
    let decode_error = |detail: String| AssetError::Decode {
        path: path.to_path_buf(),
        detail,
    };
    let reader = ImageReader::open(path).map_err(|error| decode_error(error.to_string()))?;
    let decoded = reader
        .decode()
        .map_err(|error| decode_error(error.to_string()))?;
    let image = decoded.to_rgba8();
    let (width, height) = image.dimensions();
    let mut rgba = image.into_raw();
    apply_color_key(&mut rgba);
    Image::from_rgba(width, height, rgba).ok_or_else(|| decode_error("empty image".to_string()))
}

/// Pure black pixels are treated as transparent.
fn apply_color_key(rgba: &mut [u8]) {
    for pixel in rgba.chunks_exact_mut(4) {
        if pixel[..3] == TRANSPARENT_KEY {
            pixel[3] = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_png(path: &Path, width: u32, height: u32, color: [u8; 4]) {
        fs::create_dir_all(path.parent().expect("parent")).expect("create dirs");
        let buffer = image::RgbaImage::from_pixel(width, height, image::Rgba(color));
        buffer.save(path).expect("save png");
    }

    fn write_tile_sets(images_dir: &Path) {
        for kind in TileKind::ALL {
            let dir = images_dir.join("tiles").join(kind.name());
            write_png(&dir.join("1.png"), 16, 16, [200, 10, 10, 255]);
            write_png(&dir.join("0.png"), 8, 8, [10, 200, 10, 255]);
        }
    }

    #[test]
    fn image_rejects_mismatched_buffers() {
        assert!(Image::from_rgba(2, 2, vec![0; 16]).is_some());
        assert!(Image::from_rgba(2, 2, vec![0; 15]).is_none());
        assert!(Image::from_rgba(0, 2, Vec::new()).is_none());
    }

    #[test]
    fn color_key_clears_alpha_of_black_pixels_only() {
        let mut rgba = vec![0, 0, 0, 255, 1, 0, 0, 255];
        apply_color_key(&mut rgba);
        assert_eq!(rgba, vec![0, 0, 0, 0, 1, 0, 0, 255]);
    }

    #[test]
    fn load_orders_tile_variants_by_file_name() {
        let dir = TempDir::new().expect("temp dir");
        write_tile_sets(dir.path());

        let store = AssetStore::load(dir.path()).expect("assets");

        let grass = store.tile_images(TileKind::Grass).expect("grass");
        assert_eq!(grass.len(), 2);
        assert_eq!(grass[0].size(), (8, 8));
        assert_eq!(grass[1].size(), (16, 16));
        assert_eq!(store.variant_count(TileKind::Stone), 2);
        assert!(store.tile_image(TileKind::Decor, 2).is_none());
        assert!(store.background().is_none());
    }

    #[test]
    fn load_registers_entity_animations_with_action_timing() {
        let dir = TempDir::new().expect("temp dir");
        write_tile_sets(dir.path());
        let run_dir = dir.path().join("entities").join("player").join("run");
        write_png(&run_dir.join("00.png"), 8, 15, [1, 2, 3, 255]);
        write_png(&run_dir.join("01.png"), 8, 15, [4, 5, 6, 255]);

        let store = AssetStore::load(dir.path()).expect("assets");

        let run = store.animation("player/run").expect("run");
        assert_eq!(run.frame_count(), 2);
        assert_eq!(run.frame_duration(), 4);
        assert!(run.is_looping());
        assert!(matches!(
            store.animation("player/idle"),
            Err(AssetError::AssetNotFound { .. })
        ));
    }

    #[test]
    fn missing_tile_directory_is_fatal() {
        let dir = TempDir::new().expect("temp dir");
        let err = AssetStore::load(dir.path()).expect_err("missing tiles");
        assert!(matches!(err, AssetError::AssetNotFound { ref key } if key == "tiles/decor"));
    }

    #[test]
    fn empty_tile_directory_is_fatal() {
        let dir = TempDir::new().expect("temp dir");
        write_tile_sets(dir.path());
        let stone = dir.path().join("tiles").join("stone");
        fs::remove_dir_all(&stone).expect("remove");
        fs::create_dir_all(&stone).expect("recreate");

        let err = AssetStore::load(dir.path()).expect_err("empty set");
        assert!(matches!(err, AssetError::EmptyImageSet { ref key } if key == "tiles/stone"));
    }

    #[test]
    fn loaded_black_pixels_become_transparent() {
        let dir = TempDir::new().expect("temp dir");
        write_tile_sets(dir.path());
        write_png(&dir.path().join("background.png"), 2, 1, [0, 0, 0, 255]);

        let store = AssetStore::load(dir.path()).expect("assets");
        let background = store.background().expect("background");
        assert_eq!(background.pixel(0, 0), Some([0, 0, 0, 0]));
    }

    #[test]
    fn animation_keys_are_validated() {
        let store = AssetStore::default();
        for key in ["", "/player/run", "player/../run", "Player/Run", r"player\run"] {
            assert!(
                matches!(store.animation(key), Err(AssetError::InvalidKey { .. })),
                "key={key}"
            );
        }
    }

    #[test]
    fn from_parts_rejects_empty_image_sets() {
        let mut tiles = HashMap::new();
        tiles.insert(TileKind::Grass, Vec::new());
        assert!(matches!(
            AssetStore::from_parts(tiles, HashMap::new(), None),
            Err(AssetError::EmptyImageSet { .. })
        ));
    }
}
