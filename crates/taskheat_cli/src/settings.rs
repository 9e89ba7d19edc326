//! Settings file loader.
//!
//! # Invariants
//! - A missing settings file is created with defaults and those defaults are
//!   used; an unreadable or malformed file is an error, never replaced.
//! - Keys absent from the file fall back to their defaults.

use anyhow::Context;
use log::info;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use taskheat_core::StoreConfig;

/// Reads `path` into a `StoreConfig`, writing the defaults first if it does
/// not exist yet.
pub fn load_or_create(path: &Path) -> anyhow::Result<StoreConfig> {
    match fs::read_to_string(path) {
        Ok(raw) => {
            let config: StoreConfig = serde_json::from_str(&raw)
                .with_context(|| format!("malformed settings file `{}`", path.display()))?;
            info!(
                "event=settings_load module=cli status=ok auto_save={}",
                config.auto_save
            );
            Ok(config)
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {
            let config = StoreConfig::default();
            write_settings(path, &config)?;
            info!("event=settings_load module=cli status=created");
            Ok(config)
        }
        Err(err) => Err(err)
            .with_context(|| format!("failed to read settings file `{}`", path.display())),
    }
}

fn write_settings(path: &Path, config: &StoreConfig) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create `{}`", parent.display()))?;
    }
    let mut body = serde_json::to_string_pretty(config)?;
    body.push('\n');
    fs::write(path, body)
        .with_context(|| format!("failed to write settings file `{}`", path.display()))
}

#[cfg(test)]
mod tests {
    use super::load_or_create;
    use std::fs;
    use std::path::PathBuf;
    use taskheat_core::StoreConfig;

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("settings.json");

        let config = load_or_create(&path).unwrap();

        assert_eq!(config, StoreConfig::default());
        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["taskSavePath"], "./tasks-saving.data");
        assert_eq!(written["autoSave"], true);
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "taskSavePath": "/data/mine.data" }"#).unwrap();

        let config = load_or_create(&path).unwrap();

        assert_eq!(config.task_save_path, PathBuf::from("/data/mine.data"));
        assert!(config.auto_save);
        assert_eq!(
            config.autosave_queue_capacity,
            StoreConfig::default().autosave_queue_capacity
        );
    }

    #[test]
    fn malformed_file_is_an_error_and_left_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ autoSave: nope").unwrap();

        let err = load_or_create(&path).unwrap_err();

        assert!(err.to_string().contains("malformed settings file"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ autoSave: nope");
    }
}
