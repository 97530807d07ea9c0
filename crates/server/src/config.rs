use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;

#[derive(Debug)]
pub struct Settings {
    pub server_bind: String,
    pub evals_path: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8080".into(),
            evals_path: "./evals.json".into(),
        }
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("annotator.toml") {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(&raw) {
            if let Some(v) = file_cfg.get("bind_addr") {
                settings.server_bind = v.clone();
            }
            if let Some(v) = file_cfg.get("evals_path") {
                settings.evals_path = v.clone();
            }
        }
    }

    if let Ok(v) = std::env::var("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Ok(v) = std::env::var("APP__BIND_ADDR") {
        settings.server_bind = v;
    }

    if let Ok(v) = std::env::var("EVALS_PATH") {
        settings.evals_path = v;
    }
    if let Ok(v) = std::env::var("APP__EVALS_PATH") {
        settings.evals_path = v;
    }

    settings
}

pub fn prepare_evals_path(raw_evals_path: &str) -> anyhow::Result<PathBuf> {
    let raw_evals_path = raw_evals_path.trim();
    let path = if raw_evals_path.is_empty() {
        PathBuf::from(Settings::default().evals_path)
    } else {
        PathBuf::from(raw_evals_path)
    };
    ensure_parent_dir_exists(&path)?;
    Ok(path)
}

fn ensure_parent_dir_exists(path: &Path) -> anyhow::Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for evals file '{}'",
            parent.display(),
            path.display()
        )
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_path_falls_back_to_default() {
        let path = prepare_evals_path("   ").expect("prepare");
        assert_eq!(path, PathBuf::from("./evals.json"));
    }

    #[test]
    fn creates_parent_dir_for_nested_evals_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("data").join("evals.json");

        let path = prepare_evals_path(&nested.to_string_lossy()).expect("prepare");
        assert_eq!(path, nested);
        assert!(dir.path().join("data").exists());
    }
}
