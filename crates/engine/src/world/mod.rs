//! Zone document parsing and cross-file merge into an immutable [`World`].

mod document;
mod loader;

use std::path::Path;

pub use document::{
    DoorSpecDoc, ExitDoc, ItemSpawnDoc, MobSpawnDoc, RoomDoc, ShopDefinitionDoc, ZoneDocument,
};
pub use loader::load_world;

use crate::error::WorldLoadError;

/// Reads every `*.json` file directly under `dir`, in filename order, and
/// parses each into a [`ZoneDocument`]. A missing or empty directory yields
/// an empty vec rather than an error — `load_world` rejects an empty world
/// on its own terms.
pub fn read_zone_directory(dir: &Path) -> Result<Vec<ZoneDocument>, WorldLoadError> {
    let mut paths: Vec<_> = match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some("json"))
            .collect(),
        Err(_) => Vec::new(),
    };
    paths.sort();

    paths
        .into_iter()
        .map(|path| {
            let raw = std::fs::read_to_string(&path)
                .map_err(|_| WorldLoadError::ReadFailed { path: path.display().to_string() })?;
            serde_json::from_str::<ZoneDocument>(&raw).map_err(|error| WorldLoadError::ParseFailed {
                path: path.display().to_string(),
                reason: error.to_string(),
            })
        })
        .collect()
}
