//! `exported.json` - the nodes a package already contains.
//!
//! Written next to the recipe on every run and read back when appending, so
//! a continued package never inserts the same row twice.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::manifest::write_json_atomic;
use crate::resolver::NodeKey;
use crate::{Error, Result};

pub const LEDGER_FILE: &str = "exported.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    /// Emitted nodes, in emission order across runs
    pub nodes: Vec<NodeKey>,
}

impl Ledger {
    pub fn extend(&mut self, nodes: impl IntoIterator<Item = NodeKey>) {
        self.nodes.extend(nodes);
    }

    pub fn load(package_dir: &Path) -> Result<Option<Self>> {
        let path = package_dir.join(LEDGER_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).map_err(|source| Error::Output {
            path: path.clone(),
            source,
        })?;
        let ledger = serde_json::from_str(&content)
            .map_err(|e| Error::InvalidInput(format!("{}: {}", path.display(), e)))?;
        Ok(Some(ledger))
    }

    pub fn write(&self, package_dir: &Path) -> Result<PathBuf> {
        write_json_atomic(package_dir, LEDGER_FILE, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceType;
    use tempfile::TempDir;

    #[test]
    fn test_write_then_load() {
        let tmp = TempDir::new().unwrap();
        let mut ledger = Ledger::default();
        ledger.extend([
            NodeKey::new(ResourceType::KnowledgeModels, "myorg:km:1.0.0"),
            NodeKey::new(ResourceType::Users, "ec6f8e90-2a91-49ec-aa3f-9eab2267fc66"),
        ]);

        ledger.write(tmp.path()).unwrap();
        assert_eq!(Ledger::load(tmp.path()).unwrap(), Some(ledger));

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(tmp.path().join(LEDGER_FILE)).unwrap()).unwrap();
        assert_eq!(json["nodes"][0]["resource_type"], "knowledge_models");
    }

    #[test]
    fn test_corrupt_ledger_is_invalid_input() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(LEDGER_FILE), "{not json").unwrap();
        assert!(matches!(Ledger::load(tmp.path()), Err(Error::InvalidInput(_))));
    }
}
