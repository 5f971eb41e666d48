//! `recipe.json` - the manifest listing a package's scripts in apply order

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::blob::MIRROR_DIR;
use crate::{Error, Result};

pub const RECIPE_FILE: &str = "recipe.json";

/// Descriptive fields of a recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageInfo {
    pub id: String,
    pub name: String,
    pub description: String,
}

impl Default for PackageInfo {
    fn default() -> Self {
        Self {
            id: "seed-maker:seed-package:1.0.0".to_string(),
            name: "Seed package".to_string(),
            description: "Seed package created by seed-maker".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptEntry {
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DbSection {
    pub scripts: Vec<ScriptEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct S3Section {
    #[serde(rename = "filePath")]
    pub file_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: String,
    pub name: String,
    pub description: String,
    pub db: DbSection,
    pub s3: S3Section,
}

impl Recipe {
    pub fn new(info: &PackageInfo) -> Self {
        Self {
            id: info.id.clone(),
            name: info.name.clone(),
            description: info.description.clone(),
            db: DbSection::default(),
            s3: S3Section {
                file_path: MIRROR_DIR.to_string(),
            },
        }
    }

    /// Register a script unless it is already listed
    pub fn add_script(&mut self, filename: &str) {
        if !self.db.scripts.iter().any(|s| s.filename == filename) {
            self.db.scripts.push(ScriptEntry {
                filename: filename.to_string(),
            });
        }
    }

    pub fn script_names(&self) -> Vec<String> {
        self.db.scripts.iter().map(|s| s.filename.clone()).collect()
    }

    /// Load the recipe of an existing package, if there is one
    pub fn load(package_dir: &Path) -> Result<Option<Self>> {
        let path = package_dir.join(RECIPE_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).map_err(|source| Error::Output {
            path: path.clone(),
            source,
        })?;
        let recipe = serde_json::from_str(&content)
            .map_err(|e| Error::InvalidInput(format!("{}: {}", path.display(), e)))?;
        Ok(Some(recipe))
    }

    /// Write the recipe through a temporary file and a rename
    pub fn write(&self, package_dir: &Path) -> Result<PathBuf> {
        write_json_atomic(package_dir, RECIPE_FILE, self)
    }
}

/// Write `value` as pretty JSON to `<package_dir>/<file_name>`, replacing any
/// previous file only once the new content is complete
pub(crate) fn write_json_atomic<T: Serialize>(package_dir: &Path, file_name: &str, value: &T) -> Result<PathBuf> {
    let path = package_dir.join(file_name);
    let tmp = package_dir.join(format!(".{}.tmp", file_name));
    let manifest_error = |source: std::io::Error| Error::ManifestWrite {
        path: path.clone(),
        source,
    };

    let mut content = serde_json::to_string_pretty(value)
        .map_err(|e| manifest_error(std::io::Error::other(e)))?;
    content.push('\n');

    fs::write(&tmp, content).map_err(manifest_error)?;
    if let Err(e) = fs::rename(&tmp, &path) {
        let _ = fs::remove_file(&tmp);
        return Err(manifest_error(e));
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_recipe_layout() {
        let mut recipe = Recipe::new(&PackageInfo {
            id: "myorg:seed:1.0.0".into(),
            name: "Seed".into(),
            description: "Test seed".into(),
        });
        recipe.add_script("add_users.sql");
        recipe.add_script("add_users.sql");

        let json = serde_json::to_value(&recipe).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": "myorg:seed:1.0.0",
                "name": "Seed",
                "description": "Test seed",
                "db": {"scripts": [{"filename": "add_users.sql"}]},
                "s3": {"filePath": "app"}
            })
        );
    }

    #[test]
    fn test_write_then_load() {
        let tmp = TempDir::new().unwrap();
        let mut recipe = Recipe::new(&PackageInfo::default());
        recipe.add_script("add_locales.sql");

        let path = recipe.write(tmp.path()).unwrap();
        assert!(path.ends_with(RECIPE_FILE));
        assert!(!tmp.path().join(".recipe.json.tmp").exists());
        assert_eq!(Recipe::load(tmp.path()).unwrap(), Some(recipe));
    }

    #[test]
    fn test_load_missing_recipe() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(Recipe::load(tmp.path()).unwrap(), None);
    }

    #[test]
    fn test_unwritable_directory_is_a_manifest_error() {
        let tmp = TempDir::new().unwrap();
        let recipe = Recipe::new(&PackageInfo::default());
        let err = recipe.write(&tmp.path().join("missing")).unwrap_err();
        assert!(matches!(err, Error::ManifestWrite { .. }));
    }
}
