use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod assets;
pub mod config;
pub mod editor;
pub mod persistence;
pub mod render;
pub mod world;

pub use assets::{
    animation_key_for, AnimationRegistry, AssetLibrary, AssetLibraryError, AssetRecord,
    MemoryAssetLibrary, MemoryLibraryError,
};
pub use config::{
    EditorConfig, DEFAULT_ASSET_WARNING_THRESHOLD, DEFAULT_MAX_ASSETS, DEFAULT_STORAGE_KEY,
};
pub use editor::{
    EditorError, EditorKey, FrameReport, HandleKind, Modifiers, PointerButton, PointerOutcome,
    WorldEditor, WorldEvent,
};
pub use persistence::{
    FileStorage, ImportValidationError, InstanceRestoreError, MemoryStorage, PersistenceError,
    RestoreReport, SaveReceipt, StorageError, WorldDocument, WorldStorage,
    WORLD_DOCUMENT_VERSION,
};
pub use render::{
    CullingStats, HandleId, HeadlessRenderer, PoolStats, Rect, Renderer, SpriteGeometry,
    TextureKey,
};
pub use world::{
    AssetId, CameraState, InstanceId, PlacedInstance, Vec2, WorldSize, WorldStore, SCALE_MAX,
    SCALE_MIN,
};

pub const ROOT_ENV_VAR: &str = "SPRITE_WORLD_ROOT";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub saves_dir: PathBuf,
    pub library_path: PathBuf,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("SPRITE_WORLD_ROOT is not valid unicode")]
    RootNotUnicode,
    #[error("failed to locate the editor executable: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("SPRITE_WORLD_ROOT={path} is not a world root (no assets/library.json or workspace)")]
    InvalidEnvRoot { path: PathBuf },
    #[error("no world root above {start_dir}; set SPRITE_WORLD_ROOT")]
    RootNotFound { start_dir: PathBuf },
    #[error("failed to create saves directory at {path}: {source}")]
    CreateSavesDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let root = match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let path = PathBuf::from(value);
            if !is_world_root(&path) {
                return Err(StartupError::InvalidEnvRoot { path });
            }
            path
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            find_world_root(&exe)?
        }
        Err(env::VarError::NotUnicode(_)) => return Err(StartupError::RootNotUnicode),
    };
    app_paths_under(fs::canonicalize(&root).unwrap_or(root))
}

fn app_paths_under(root: PathBuf) -> Result<AppPaths, StartupError> {
    let saves_dir = root.join("saves");
    let library_path = library_path_under(&root);

    fs::create_dir_all(&saves_dir).map_err(|source| StartupError::CreateSavesDir {
        path: saves_dir.clone(),
        source,
    })?;

    Ok(AppPaths {
        root,
        saves_dir,
        library_path,
    })
}

fn library_path_under(root: &Path) -> PathBuf {
    root.join("assets").join("library.json")
}

/// Nearest ancestor of `start` that holds an asset library or this
/// workspace's sources.
fn find_world_root(start: &Path) -> Result<PathBuf, StartupError> {
    start
        .ancestors()
        .skip(1)
        .find(|candidate| is_world_root(candidate))
        .map(Path::to_path_buf)
        .ok_or_else(|| StartupError::RootNotFound {
            start_dir: start.to_path_buf(),
        })
}

fn is_world_root(path: &Path) -> bool {
    library_path_under(path).is_file() || path.join("crates").join("world_engine").is_dir()
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn world_root_needs_a_library_or_the_workspace() {
        let temp = TempDir::new().expect("temp");
        assert!(!is_world_root(temp.path()));

        fs::create_dir(temp.path().join("assets")).expect("assets dir");
        assert!(!is_world_root(temp.path()));

        fs::write(library_path_under(temp.path()), "{}").expect("library");
        assert!(is_world_root(temp.path()));
    }

    #[test]
    fn root_search_walks_up_from_the_executable() {
        let temp = TempDir::new().expect("temp");
        fs::create_dir_all(temp.path().join("crates").join("world_engine")).expect("crate dir");
        let exe = temp.path().join("target").join("debug").join("world_editor");
        fs::create_dir_all(exe.parent().expect("parent")).expect("target dir");

        assert_eq!(find_world_root(&exe).expect("root"), temp.path());
        assert!(matches!(
            find_world_root(&TempDir::new().expect("temp").path().join("bin")),
            Err(StartupError::RootNotFound { .. })
        ));
    }

    #[test]
    fn app_paths_create_saves_dir_under_root() {
        let temp = TempDir::new().expect("temp");
        let paths = app_paths_under(temp.path().to_path_buf()).expect("paths");

        assert!(paths.saves_dir.is_dir());
        assert_eq!(paths.saves_dir, temp.path().join("saves"));
        assert_eq!(
            paths.library_path,
            temp.path().join("assets").join("library.json")
        );
    }
}
