use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use thiserror::Error;
use tracing::{error, info, warn};
use world_engine::{
    resolve_app_paths, AppPaths, EditorConfig, FileStorage, HeadlessRenderer, MemoryAssetLibrary,
    MemoryLibraryError, PersistenceError, RestoreReport, StartupError, WorldEditor, WorldEvent,
};

use super::bootstrap::{AppWiring, Command};

type HostEditor = WorldEditor<HeadlessRenderer, MemoryAssetLibrary, FileStorage>;

#[derive(Debug, Error)]
pub(crate) enum HostError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Library(#[from] MemoryLibraryError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error("failed to access '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let result = resolve_app_paths()
        .map_err(HostError::from)
        .and_then(|paths| execute(&paths, app.config, &app.command));
    if let Err(err) = result {
        error!(error = %err, "command_failed");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

pub(crate) fn execute(
    paths: &AppPaths,
    config: EditorConfig,
    command: &Command,
) -> Result<(), HostError> {
    let library = open_library(&paths.library_path)?;
    let storage = FileStorage::new(&paths.saves_dir);
    let mut editor = WorldEditor::new(
        config,
        HeadlessRenderer::default(),
        library,
        storage,
        Instant::now(),
    );

    match command {
        Command::Stats => {
            let report = editor.load_world()?;
            log_restore("load", &report);
            log_stats(&mut editor);
        }
        Command::Import(path) => {
            let raw = fs::read_to_string(path).map_err(|source| HostError::Io {
                path: path.clone(),
                source,
            })?;
            let report = editor.import_json(&raw)?;
            log_restore("import", &report);
            if let Some(save_error) = &report.save_error {
                warn!(error = %save_error, "import_not_saved");
            }
            store_library(&editor, &paths.library_path)?;
            log_stats(&mut editor);
        }
        Command::Export(path) => {
            let report = editor.load_world()?;
            log_restore("load", &report);
            let json = editor.export_json()?;
            fs::write(path, json).map_err(|source| HostError::Io {
                path: path.clone(),
                source,
            })?;
            info!(
                path = %path.display(),
                instances = editor.store().len(),
                "world_exported"
            );
        }
    }
    log_events(&mut editor);

    Ok(())
}

fn open_library(path: &Path) -> Result<MemoryAssetLibrary, HostError> {
    if !path.is_file() {
        info!(path = %path.display(), "asset_library_missing_starting_empty");
        return Ok(MemoryAssetLibrary::default());
    }
    Ok(MemoryAssetLibrary::load_from_path(path)?)
}

fn store_library(editor: &HostEditor, path: &Path) -> Result<(), HostError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| HostError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    editor.library().save_to_path(path)?;
    Ok(())
}

fn log_restore(operation: &'static str, report: &RestoreReport) {
    if !report.document_found {
        info!(operation, "no_saved_world");
        return;
    }
    info!(
        operation,
        restored = report.restored,
        skipped = report.skipped.len(),
        version_mismatch = report.version_mismatch.as_deref().unwrap_or(""),
        "restore_summary"
    );
}

fn log_events(editor: &mut HostEditor) -> usize {
    let events = editor.drain_events();
    for event in &events {
        match event {
            WorldEvent::WorldSaveError { error, asset_count } => {
                warn!(event = event.name(), asset_count, error = %error, "world_event");
            }
            _ => info!(event = event.name(), "world_event"),
        }
    }
    events.len()
}

fn log_stats(editor: &mut HostEditor) {
    let frame = editor.update(Instant::now());
    let pool = editor.pool_stats();
    info!(
        world = %editor.store().meta().world_name,
        instances = editor.store().len(),
        remaining = editor.remaining_capacity(),
        visible = frame.culling.visible,
        culled = frame.culling.culled,
        pooled = pool.pooled_count,
        active = pool.active_count,
        "world_stats"
    );
}
