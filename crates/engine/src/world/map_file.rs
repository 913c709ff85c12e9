//! JSON map persistence.
//!
//! File shape:
//! `{"tile_size": 16, "tilemap": {"x;y": {"type", "variant", "pos": [x, y]}}, "offgrid": [{"type", "variant", "pos": [x, y]}]}`
//!
//! Off-grid positions are held as `f32`, like every other world position. A file
//! written with double precision positions is narrowed on load, so a load/save
//! cycle can round fractions that `f32` cannot represent. Positions made by the
//! editor are canvas pixels plus an integer scroll and survive unchanged.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use super::{GridPos, OffgridTile, Tile, TileKind, TileKindError, Tilemap, Vec2};

#[derive(Debug, Error)]
pub enum MapError {
    #[error("failed to read map '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write map '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode map: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("invalid map data at {at}: {detail}")]
    InvalidMapData { at: String, detail: String },
    #[error("invalid map data at {at}: {source}")]
    UnknownKind {
        at: String,
        #[source]
        source: TileKindError,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct MapFile {
    tile_size: u32,
    tilemap: BTreeMap<String, GridTileRecord>,
    offgrid: Vec<OffgridTileRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GridTileRecord {
    #[serde(rename = "type")]
    kind: String,
    variant: usize,
    pos: [i32; 2],
}

#[derive(Debug, Serialize, Deserialize)]
struct OffgridTileRecord {
    #[serde(rename = "type")]
    kind: String,
    variant: usize,
    pos: [f32; 2],
}

impl Tilemap {
    /// Encodes the map as pretty JSON with keys in sorted order.
    pub fn to_json(&self) -> Result<String, MapError> {
        let file = MapFile {
            tile_size: self.tile_size(),
            tilemap: self
                .grid_tiles()
                .into_iter()
                .map(|tile| {
                    (
                        tile.pos.key(),
                        GridTileRecord {
                            kind: tile.kind.name().to_string(),
                            variant: tile.variant,
                            pos: [tile.pos.x, tile.pos.y],
                        },
                    )
                })
                .collect(),
            offgrid: self
                .offgrid_tiles()
                .iter()
                .map(|tile| OffgridTileRecord {
                    kind: tile.kind.name().to_string(),
                    variant: tile.variant,
                    pos: [tile.pos.x, tile.pos.y],
                })
                .collect(),
        };
        serde_json::to_string_pretty(&file).map_err(MapError::Encode)
    }

    pub fn from_json(raw: &str) -> Result<Self, MapError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        let file = serde_path_to_error::deserialize::<_, MapFile>(&mut deserializer).map_err(
            |error| {
                let at = error.path().to_string();
                MapError::InvalidMapData {
                    at: if at.is_empty() { ".".to_string() } else { at },
                    detail: error.into_inner().to_string(),
                }
            },
        )?;

        let mut tilemap = Tilemap::new(file.tile_size).map_err(|error| MapError::InvalidMapData {
            at: "tile_size".to_string(),
            detail: error.to_string(),
        })?;

        for (key, record) in &file.tilemap {
            let at = format!("tilemap.{key}");
            let pos = GridPos::parse_key(key).map_err(|error| MapError::InvalidMapData {
                at: at.clone(),
                detail: error.to_string(),
            })?;
            if [pos.x, pos.y] != record.pos {
                return Err(MapError::InvalidMapData {
                    at: format!("{at}.pos"),
                    detail: format!(
                        "pos [{}, {}] does not match its key",
                        record.pos[0], record.pos[1]
                    ),
                });
            }
            let kind = parse_kind(&record.kind, &format!("{at}.type"))?;
            tilemap.insert(Tile {
                kind,
                variant: record.variant,
                pos,
            });
        }

        for (index, record) in file.offgrid.iter().enumerate() {
            let kind = parse_kind(&record.kind, &format!("offgrid[{index}].type"))?;
            tilemap.push_offgrid(OffgridTile {
                kind,
                variant: record.variant,
                pos: Vec2::new(record.pos[0], record.pos[1]),
            });
        }

        Ok(tilemap)
    }

    /// Overwrites `path` in place, creating missing parent directories.
    pub fn save(&self, path: &Path) -> Result<(), MapError> {
        let json = self.to_json()?;
        let write_error = |source| MapError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_error)?;
        }
        fs::write(path, json).map_err(write_error)?;
        info!(
            path = %path.display(),
            tiles = self.len(),
            offgrid = self.offgrid_tiles().len(),
            "map_saved"
        );
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, MapError> {
        let raw = fs::read_to_string(path).map_err(|source| MapError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let tilemap = Self::from_json(&raw)?;
        info!(
            path = %path.display(),
            tiles = tilemap.len(),
            offgrid = tilemap.offgrid_tiles().len(),
            "map_loaded"
        );
        Ok(tilemap)
    }

    /// Like [`Tilemap::load`], but a missing file yields `Ok(None)` so callers can keep a default world.
    pub fn load_if_present(path: &Path) -> Result<Option<Self>, MapError> {
        match Self::load(path) {
            Ok(tilemap) => Ok(Some(tilemap)),
            Err(MapError::Read { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                info!(path = %path.display(), "map_missing_using_default");
                Ok(None)
            }
            Err(error) => Err(error),
        }
    }
}

fn parse_kind(name: &str, at: &str) -> Result<TileKind, MapError> {
    name.parse::<TileKind>()
        .map_err(|source| MapError::UnknownKind {
            at: at.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_tilemap() -> Tilemap {
        let mut tilemap = Tilemap::new(16).expect("tilemap");
        tilemap.insert(Tile {
            kind: TileKind::Grass,
            variant: 1,
            pos: GridPos::new(3, 10),
        });
        tilemap.insert(Tile {
            kind: TileKind::Stone,
            variant: 4,
            pos: GridPos::new(-2, -7),
        });
        tilemap.push_offgrid(OffgridTile {
            kind: TileKind::LargeDecor,
            variant: 2,
            pos: Vec2::new(12.5, -3.25),
        });
        tilemap.push_offgrid(OffgridTile {
            kind: TileKind::LargeDecor,
            variant: 2,
            pos: Vec2::new(12.5, -3.25),
        });
        tilemap
    }

    #[test]
    fn save_then_load_reproduces_the_map() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("maps").join("map.json");
        let tilemap = sample_tilemap();

        tilemap.save(&path).expect("save");
        let loaded = Tilemap::load(&path).expect("load");

        assert_eq!(loaded, tilemap);
    }

    #[test]
    fn save_overwrites_an_existing_map() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("map.json");
        sample_tilemap().save(&path).expect("first save");

        let smaller = Tilemap::new(16).expect("tilemap");
        smaller.save(&path).expect("second save");

        assert_eq!(Tilemap::load(&path).expect("load"), smaller);
    }

    #[test]
    fn double_precision_offgrid_positions_are_narrowed() {
        let raw = r#"{"tile_size":16,"tilemap":{},"offgrid":[
            {"type":"decor","variant":0,"pos":[0.1,200.5]}]}"#;
        let tilemap = Tilemap::from_json(raw).expect("load");
        let pos = tilemap.offgrid_tiles()[0].pos;
        assert_eq!(pos, Vec2::new(0.1_f32, 200.5));

        let reloaded = Tilemap::from_json(&tilemap.to_json().expect("encode")).expect("reload");
        assert_eq!(reloaded.offgrid_tiles()[0].pos, pos);
    }

    #[test]
    fn encoding_uses_canonical_keys_and_type_field() {
        let json = sample_tilemap().to_json().expect("json");
        let value: serde_json::Value = serde_json::from_str(&json).expect("value");

        assert_eq!(value["tile_size"], 16);
        assert_eq!(value["tilemap"]["3;10"]["type"], "grass");
        assert_eq!(value["tilemap"]["3;10"]["pos"], serde_json::json!([3, 10]));
        assert_eq!(value["tilemap"]["-2;-7"]["variant"], 4);
        assert_eq!(value["offgrid"][0]["type"], "large_decor");
        assert_eq!(value["offgrid"][0]["pos"], serde_json::json!([12.5, -3.25]));
    }

    #[test]
    fn encoding_is_deterministic() {
        let tilemap = sample_tilemap();
        assert_eq!(
            tilemap.to_json().expect("first"),
            tilemap.clone().to_json().expect("second")
        );
    }

    #[test]
    fn integer_offgrid_positions_are_accepted() {
        let raw = r#"{"tile_size": 8, "tilemap": {}, "offgrid": [{"type": "decor", "variant": 0, "pos": [3, 4]}]}"#;
        let tilemap = Tilemap::from_json(raw).expect("map");
        assert_eq!(tilemap.tile_size(), 8);
        assert_eq!(tilemap.offgrid_tiles()[0].pos, Vec2::new(3.0, 4.0));
    }

    #[test]
    fn unknown_kind_fails_fast() {
        let raw = r#"{"tile_size": 16, "tilemap": {"0;0": {"type": "lava", "variant": 0, "pos": [0, 0]}}, "offgrid": []}"#;
        let err = Tilemap::from_json(raw).expect_err("unknown kind");
        match err {
            MapError::UnknownKind { at, source } => {
                assert_eq!(at, "tilemap.0;0.type");
                assert_eq!(
                    source,
                    TileKindError::UnknownKind {
                        name: "lava".to_string()
                    }
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn key_and_pos_must_agree() {
        let raw = r#"{"tile_size": 16, "tilemap": {"1;0": {"type": "grass", "variant": 0, "pos": [0, 1]}}, "offgrid": []}"#;
        let err = Tilemap::from_json(raw).expect_err("mismatch");
        assert!(
            matches!(err, MapError::InvalidMapData { ref at, .. } if at == "tilemap.1;0.pos"),
            "err={err}"
        );
    }

    #[test]
    fn malformed_json_reports_path() {
        let raw = r#"{"tile_size": 16, "tilemap": {"0;0": {"type": "grass", "variant": -1, "pos": [0, 0]}}, "offgrid": []}"#;
        let err = Tilemap::from_json(raw).expect_err("negative variant");
        match err {
            MapError::InvalidMapData { at, .. } => assert!(at.contains("variant"), "at={at}"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn zero_tile_size_is_invalid() {
        let raw = r#"{"tile_size": 0, "tilemap": {}, "offgrid": []}"#;
        assert!(matches!(
            Tilemap::from_json(raw),
            Err(MapError::InvalidMapData { .. })
        ));
    }

    #[test]
    fn missing_file_is_recoverable() {
        let dir = TempDir::new().expect("temp dir");
        let loaded = Tilemap::load_if_present(&dir.path().join("absent.json")).expect("no error");
        assert!(loaded.is_none());
    }

    #[test]
    fn malformed_file_is_not_treated_as_missing() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("map.json");
        fs::write(&path, "{ not json").expect("write");
        assert!(Tilemap::load_if_present(&path).is_err());
    }
}
