use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use world_engine::EditorConfig;

const MAX_ASSETS_ENV_VAR: &str = "SPRITE_WORLD_MAX_ASSETS";
const WARNING_THRESHOLD_ENV_VAR: &str = "SPRITE_WORLD_WARNING_THRESHOLD";
const CULLING_MARGIN_ENV_VAR: &str = "SPRITE_WORLD_CULLING_MARGIN";
const SAVE_DEBOUNCE_ENV_VAR: &str = "SPRITE_WORLD_SAVE_DEBOUNCE_MS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    /// Load the saved world, run one frame and log counts.
    Stats,
    Import(PathBuf),
    Export(PathBuf),
}

pub(crate) struct AppWiring {
    pub(crate) config: EditorConfig,
    pub(crate) command: Command,
}

/// `Ok(None)` means help was printed and there is nothing to run.
pub(crate) fn build_app(args: &[String]) -> Result<Option<AppWiring>, String> {
    if matches!(args.first().map(String::as_str), Some("-h" | "--help")) {
        println!("{}", usage_text());
        return Ok(None);
    }
    let command = parse_command(args)?;

    init_tracing();
    info!("=== Sprite World Editor ===");

    let mut config = EditorConfig::default();
    apply_env_overrides(&mut config, |var| std::env::var(var).ok());

    Ok(Some(AppWiring { config, command }))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

pub(crate) fn parse_command(args: &[String]) -> Result<Command, String> {
    let Some(name) = args.first() else {
        return Ok(Command::Stats);
    };
    match name.as_str() {
        "stats" => {
            expect_no_extra(args, 1)?;
            Ok(Command::Stats)
        }
        "import" | "export" => {
            let path = args
                .get(1)
                .ok_or_else(|| format!("missing file argument for '{name}'\n{}", usage_text()))?;
            expect_no_extra(args, 2)?;
            let path = PathBuf::from(path);
            Ok(if name == "import" {
                Command::Import(path)
            } else {
                Command::Export(path)
            })
        }
        other => Err(format!("unknown command '{other}'\n{}", usage_text())),
    }
}

fn expect_no_extra(args: &[String], expected: usize) -> Result<(), String> {
    match args.get(expected) {
        Some(extra) => Err(format!("unexpected argument '{extra}'\n{}", usage_text())),
        None => Ok(()),
    }
}

fn usage_text() -> String {
    [
        "usage: world_editor [command]",
        "",
        "commands:",
        "  stats            load the saved world and log culling/pool stats (default)",
        "  import <file>    replace the saved world with an exported document",
        "  export <file>    write the saved world with embedded asset data",
        "",
        "environment:",
        "  SPRITE_WORLD_ROOT, SPRITE_WORLD_MAX_ASSETS, SPRITE_WORLD_WARNING_THRESHOLD,",
        "  SPRITE_WORLD_CULLING_MARGIN, SPRITE_WORLD_SAVE_DEBOUNCE_MS, RUST_LOG",
    ]
    .join("\n")
}

/// Overrides config fields from the environment. Unparseable values are
/// logged and the default is kept.
pub(crate) fn apply_env_overrides(
    config: &mut EditorConfig,
    lookup: impl Fn(&str) -> Option<String>,
) {
    if let Some(max_assets) = parse_env::<usize>(&lookup, MAX_ASSETS_ENV_VAR) {
        config.max_assets = max_assets;
    }
    if let Some(threshold) = parse_env::<usize>(&lookup, WARNING_THRESHOLD_ENV_VAR) {
        config.asset_warning_threshold = threshold;
    }
    if let Some(margin) = parse_env::<f32>(&lookup, CULLING_MARGIN_ENV_VAR) {
        if margin.is_finite() && margin >= 0.0 {
            config.culling_margin = margin;
        } else {
            warn!(var = CULLING_MARGIN_ENV_VAR, margin, "config_env_value_ignored");
        }
    }
    if let Some(millis) = parse_env::<u64>(&lookup, SAVE_DEBOUNCE_ENV_VAR) {
        config.save_debounce = Duration::from_millis(millis);
    }
}

fn parse_env<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, var: &'static str) -> Option<T> {
    let raw = lookup(var)?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse::<T>() {
        Ok(value) => {
            info!(var, value = trimmed, "config_env_override");
            Some(value)
        }
        Err(_) => {
            warn!(var, value = trimmed, "config_env_value_ignored");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[test]
    fn no_arguments_means_stats() {
        assert_eq!(parse_command(&[]), Ok(Command::Stats));
        assert_eq!(parse_command(&args(&["stats"])), Ok(Command::Stats));
    }

    #[test]
    fn import_and_export_take_one_path() {
        assert_eq!(
            parse_command(&args(&["import", "world.json"])),
            Ok(Command::Import(PathBuf::from("world.json")))
        );
        assert_eq!(
            parse_command(&args(&["export", "out.json"])),
            Ok(Command::Export(PathBuf::from("out.json")))
        );
        assert!(parse_command(&args(&["import"]))
            .expect_err("missing path")
            .starts_with("missing file argument"));
        assert!(parse_command(&args(&["export", "a", "b"]))
            .expect_err("extra")
            .starts_with("unexpected argument 'b'"));
    }

    #[test]
    fn unknown_command_is_rejected_with_usage() {
        let message = parse_command(&args(&["draw"])).expect_err("unknown");
        assert!(message.contains("unknown command 'draw'"));
        assert!(message.contains("usage: world_editor"));
    }

    #[test]
    fn env_overrides_apply_and_bad_values_are_ignored() {
        let env = HashMap::from([
            (MAX_ASSETS_ENV_VAR, "120"),
            (WARNING_THRESHOLD_ENV_VAR, "lots"),
            (CULLING_MARGIN_ENV_VAR, "-5"),
            (SAVE_DEBOUNCE_ENV_VAR, " 250 "),
        ]);
        let mut config = EditorConfig::default();
        apply_env_overrides(&mut config, |var| env.get(var).map(|value| value.to_string()));

        assert_eq!(config.max_assets, 120);
        assert_eq!(
            config.asset_warning_threshold,
            EditorConfig::default().asset_warning_threshold
        );
        assert_eq!(config.culling_margin, EditorConfig::default().culling_margin);
        assert_eq!(config.save_debounce, Duration::from_millis(250));
    }
}
