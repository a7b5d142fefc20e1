// ~/src/data_loaders/yaml.rs

use std::{
    collections::HashMap,
    fs,
    path::Path,
    sync::{LazyLock, RwLock},
    time::SystemTime,
};

use serde_yaml::Value;

/* =========================
   DOCUMENT CACHE
========================= */

// Parsed documents keyed by path, valid while the file's mtime is unchanged
static YAML_CACHE: LazyLock<RwLock<HashMap<String, (Value, SystemTime)>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));
const CACHE_LIMIT: usize = 16;

fn modified_at(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Reads and parses a YAML document. Returns `None` when the file is missing
/// or does not parse.
pub fn load_yaml(path: &Path) -> Option<Value> {
    let key = path.to_string_lossy().to_string();
    let modified = modified_at(path);

    if let (Some(modified), Ok(cache)) = (modified, YAML_CACHE.read()) {
        if let Some((v, t)) = cache.get(&key) {
            if *t == modified {
                return Some(v.clone());
            }
        }
    }

    let txt = fs::read_to_string(path).ok()?;
    let v: Value = serde_yaml::from_str(&txt).ok()?;

    if let (Some(modified), Ok(mut cache)) = (modified, YAML_CACHE.write()) {
        if cache.len() >= CACHE_LIMIT && !cache.contains_key(&key) {
            if let Some(oldest_key) = cache
                .iter()
                .min_by_key(|(_, (_, t))| *t)
                .map(|(k, _)| k.clone())
            {
                cache.remove(&oldest_key);
            }
        }
        cache.insert(key, (v.clone(), modified));
    }

    Some(v)
}

/// Serializes `value` to `path`, creating parent directories as needed.
pub fn save_yaml(path: &Path, value: &Value) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create {}: {e}", parent.display()))?;
    }

    let txt = serde_yaml::to_string(value).map_err(|e| format!("Failed to serialize YAML: {e}"))?;
    fs::write(path, txt).map_err(|e| format!("Failed to write {}: {e}", path.display()))?;

    if let Ok(mut cache) = YAML_CACHE.write() {
        cache.remove(&path.to_string_lossy().to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("simple-desktop-yaml-{}", std::process::id()));
        let _ = fs::create_dir_all(&dir);
        dir.join(name)
    }

    #[test]
    fn missing_file_loads_as_none() {
        assert!(load_yaml(&temp_file("does-not-exist.yaml")).is_none());
    }

    #[test]
    fn malformed_file_loads_as_none() {
        let path = temp_file("broken.yaml");
        fs::write(&path, "Ui: [unterminated").unwrap();
        assert!(load_yaml(&path).is_none());
    }

    #[test]
    fn save_replaces_cached_document() {
        let path = temp_file("saved.yaml");
        save_yaml(&path, &serde_yaml::from_str("a: 1").unwrap()).unwrap();
        assert_eq!(load_yaml(&path).unwrap()["a"].as_i64(), Some(1));

        save_yaml(&path, &serde_yaml::from_str("a: 2").unwrap()).unwrap();
        assert_eq!(load_yaml(&path).unwrap()["a"].as_i64(), Some(2));
    }
}
