//! Export requests: resource type → roots to export.
//!
//! Accepted JSON shapes (type names as in listings):
//! ```json
//! {"documents": ["1034a4b0-d867-4b4b-b2a0-a3956b43cf95"]}
//! {"resources": {"locales": [{"id": "myorg:czech:1.0.0", "name": "Czech"}]}}
//! ```
//! Records are matched by the type's identifying key, so the output of
//! `list` can be fed back after filtering.

use indexmap::IndexMap;
use serde::Deserialize;

use crate::registry::Registry;
use crate::resource::ResourceType;
use crate::{Error, Result};

/// One requested root
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RootSelector {
    Id(String),
    Record(serde_json::Map<String, serde_json::Value>),
}

impl RootSelector {
    /// Identifier of the root for `resource_type`
    pub fn identifier(&self, registry: &Registry, resource_type: ResourceType) -> Result<String> {
        match self {
            RootSelector::Id(id) if !id.trim().is_empty() => Ok(id.trim().to_string()),
            RootSelector::Id(_) => Err(Error::InvalidInput(format!(
                "empty identifier for {}",
                resource_type
            ))),
            RootSelector::Record(record) => {
                let key = registry.descriptor(resource_type)?.identifying_key;
                match record.get(key) {
                    Some(serde_json::Value::String(id)) if !id.is_empty() => Ok(id.clone()),
                    Some(serde_json::Value::Number(n)) => Ok(n.to_string()),
                    _ => Err(Error::InvalidInput(format!(
                        "{} record without '{}'",
                        resource_type, key
                    ))),
                }
            }
        }
    }
}

impl From<&str> for RootSelector {
    fn from(id: &str) -> Self {
        RootSelector::Id(id.to_string())
    }
}

/// Requested roots by type, in caller order
#[derive(Debug, Clone, Default)]
pub struct ExportRequest {
    roots: IndexMap<ResourceType, Vec<RootSelector>>,
}

impl ExportRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, resource_type: ResourceType, root: impl Into<RootSelector>) -> Self {
        self.roots.entry(resource_type).or_default().push(root.into());
        self
    }

    /// Parse a request; unknown type names are rejected
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let value = match value {
            serde_json::Value::Object(mut map) if map.len() == 1 && map.contains_key("resources") => {
                map.remove("resources").unwrap_or_default()
            }
            other => other,
        };
        let raw: IndexMap<String, Vec<RootSelector>> = serde_json::from_value(value)
            .map_err(|e| Error::InvalidInput(format!("malformed export request: {}", e)))?;

        let mut roots: IndexMap<ResourceType, Vec<RootSelector>> = IndexMap::new();
        for (name, selectors) in raw {
            let resource_type: ResourceType = name.parse()?;
            roots.entry(resource_type).or_default().extend(selectors);
        }
        Ok(Self { roots })
    }

    /// Requested types, in caller order
    pub fn types(&self) -> Vec<ResourceType> {
        self.roots.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.values().all(Vec::is_empty)
    }

    /// Flatten into `(type, identifier)` pairs, validating every selector
    pub fn roots(&self, registry: &Registry) -> Result<Vec<(ResourceType, String)>> {
        let mut roots = Vec::new();
        for (resource_type, selectors) in &self.roots {
            registry.descriptor(*resource_type)?;
            for selector in selectors {
                roots.push((*resource_type, selector.identifier(registry, *resource_type)?));
            }
        }
        Ok(roots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_and_records_are_accepted() {
        let registry = Registry::builtin().unwrap();
        let request = ExportRequest::from_json(
            r#"{
                "users": [{"uuid": "ec6f8e90-2a91-49ec-aa3f-9eab2267fc66", "first_name": "Albert"}],
                "locales": ["myorg:czech:1.0.0"]
            }"#,
        )
        .unwrap();

        assert_eq!(request.types(), vec![ResourceType::Users, ResourceType::Locales]);
        assert_eq!(
            request.roots(&registry).unwrap(),
            vec![
                (ResourceType::Users, "ec6f8e90-2a91-49ec-aa3f-9eab2267fc66".to_string()),
                (ResourceType::Locales, "myorg:czech:1.0.0".to_string()),
            ]
        );
    }

    #[test]
    fn test_listing_wrapper_is_unwrapped() {
        let request =
            ExportRequest::from_json(r#"{"resources": {"documents": ["d1"], "projects": []}}"#).unwrap();
        assert_eq!(request.types(), vec![ResourceType::Documents, ResourceType::Projects]);
    }

    #[test]
    fn test_caller_order_is_kept() {
        let request = ExportRequest::from_json(r#"{"locales": [], "documents": [], "users": []}"#).unwrap();
        assert_eq!(
            request.types(),
            vec![ResourceType::Locales, ResourceType::Documents, ResourceType::Users]
        );
        assert!(request.is_empty());
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let err = ExportRequest::from_json(r#"{"tenants": ["t1"]}"#).unwrap_err();
        assert!(matches!(err, Error::UnknownResourceType(name) if name == "tenants"));
    }

    #[test]
    fn test_record_without_key_is_invalid() {
        let registry = Registry::builtin().unwrap();
        let request = ExportRequest::from_json(r#"{"locales": [{"name": "Czech"}]}"#).unwrap();
        assert!(matches!(request.roots(&registry), Err(Error::InvalidInput(_))));
    }
}
