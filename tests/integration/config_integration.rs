//! Integration tests for the configuration system

use super::test_utils::lock_env;
use std::fs;
use tempfile::TempDir;
use treeswap::config::ConfigLoader;

/// Point the user-level config lookup at an empty directory
fn isolate_global_config(temp_dir: &TempDir) -> Option<String> {
    let previous = std::env::var("XDG_CONFIG_HOME").ok();
    std::env::set_var("XDG_CONFIG_HOME", temp_dir.path().join("xdg"));
    previous
}

fn restore_global_config(previous: Option<String>) {
    match previous {
        Some(value) => std::env::set_var("XDG_CONFIG_HOME", value),
        None => std::env::remove_var("XDG_CONFIG_HOME"),
    }
}

#[test]
fn test_defaults_without_any_config_files() {
    let _guard = lock_env();
    let temp_dir = TempDir::new().unwrap();
    let previous = isolate_global_config(&temp_dir);

    let config = ConfigLoader::load(temp_dir.path()).unwrap();
    restore_global_config(previous);

    assert_eq!(config.hashing.workers, None);
    assert_eq!(config.relocation.original_suffix, "_orig");
    assert_eq!(config.relocation.snapshot_file, "origFiles.csv");
    assert!(config.validate().is_ok());
}

#[test]
fn test_workspace_file_and_env_override() {
    let _guard = lock_env();
    let temp_dir = TempDir::new().unwrap();
    let previous = isolate_global_config(&temp_dir);

    fs::create_dir_all(temp_dir.path().join("config")).unwrap();
    fs::write(
        temp_dir.path().join("config/config.toml"),
        r#"
[hashing]
workers = 2
chunk_size = 8192

[relocation]
original_suffix = ".bak"

[logging]
level = "debug"
"#,
    )
    .unwrap();

    std::env::set_var("TREESWAP_HASHING__WORKERS", "6");
    let config = ConfigLoader::load(temp_dir.path());
    std::env::remove_var("TREESWAP_HASHING__WORKERS");
    restore_global_config(previous);

    let config = config.unwrap();
    assert_eq!(config.hashing.workers, Some(6));
    assert_eq!(config.hashing.chunk_size, 8192);
    assert_eq!(config.relocation.original_suffix, ".bak");
    assert_eq!(config.logging.level, "debug");
}

// XDG_CONFIG_HOME only drives the user config directory on Linux
#[cfg(target_os = "linux")]
#[test]
fn test_global_file_loaded_below_workspace_file() {
    let _guard = lock_env();
    let temp_dir = TempDir::new().unwrap();
    let previous = isolate_global_config(&temp_dir);

    let global = temp_dir.path().join("xdg/treeswap/config.toml");
    fs::create_dir_all(global.parent().unwrap()).unwrap();
    fs::write(
        &global,
        "[relocation]\noriginal_suffix = \".global\"\nsnapshot_file = \"base.csv\"\n",
    )
    .unwrap();
    let workspace = temp_dir.path().join("tree");
    fs::create_dir_all(workspace.join("config")).unwrap();
    fs::write(
        workspace.join("config/config.toml"),
        "[relocation]\noriginal_suffix = \".local\"\n",
    )
    .unwrap();

    let config = ConfigLoader::load(&workspace);
    restore_global_config(previous);

    let config = config.unwrap();
    assert_eq!(config.relocation.original_suffix, ".local");
    assert_eq!(config.relocation.snapshot_file, "base.csv");
}

#[test]
fn test_load_from_explicit_file() {
    let _guard = lock_env();
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("custom.toml");
    fs::write(&file, "[hashing]\nfollow_symlinks = true\n").unwrap();

    let config = ConfigLoader::load_from_file(&file).unwrap();
    assert!(config.hashing.follow_symlinks);

    assert!(ConfigLoader::load_from_file(&temp_dir.path().join("missing.toml")).is_err());
}
