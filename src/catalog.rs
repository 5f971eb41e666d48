//! Resource listing - what can be exported.
//!
//! Rows are projected onto each type's visible attributes. The JSON shape
//! is `{"resources": {"users": [{...}], ...}}` and can be filtered and fed
//! back as an export request.

use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use crate::registry::Registry;
use crate::resource::ResourceType;
use crate::storage::RowSource;
use crate::{Error, Result};

pub type Record = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Default, Serialize)]
pub struct Catalog {
    pub resources: IndexMap<ResourceType, Vec<Record>>,
}

impl Catalog {
    pub fn total(&self) -> usize {
        self.resources.values().map(Vec::len).sum()
    }
}

/// List one type, or every listable type when `only` is `None`.
///
/// Owned types are exported through their owner and cannot be listed.
pub fn list_resources(registry: &Registry, source: &impl RowSource, only: Option<ResourceType>) -> Result<Catalog> {
    let types = match only {
        Some(ty) if registry.descriptor(ty)?.is_owned() => {
            return Err(Error::InvalidInput(format!(
                "{} is exported through its owner and cannot be listed",
                ty
            )));
        }
        Some(ty) => vec![ty],
        None => registry.listable_types(),
    };

    let mut catalog = Catalog::default();
    for ty in types {
        let descriptor = registry.descriptor(ty)?;
        let rows = source.fetch_all(descriptor.table_name)?;
        debug!(resource_type = %ty, count = rows.len(), "Listed resources");

        let records = rows
            .iter()
            .map(|row| {
                descriptor
                    .visible_attributes
                    .iter()
                    .map(|attr| {
                        let value = row.get(attr).map(|v| v.to_json()).unwrap_or_default();
                        (attr.to_string(), value)
                    })
                    .collect::<Record>()
            })
            .collect();
        catalog.resources.insert(ty, records);
    }
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema;

    #[test]
    fn test_lists_visible_attributes_only() {
        let registry = Registry::builtin().unwrap();
        let store = schema::scenario_store();

        let catalog = list_resources(&registry, &store, Some(ResourceType::Users)).unwrap();
        let users = &catalog.resources[&ResourceType::Users];
        assert_eq!(users.len(), 1);
        assert_eq!(
            serde_json::Value::Object(users[0].clone()),
            serde_json::json!({
                "uuid": schema::USER,
                "first_name": "Albert",
                "last_name": "Einstein",
                "role": "admin"
            })
        );
    }

    #[test]
    fn test_all_lists_every_listable_type() {
        let registry = Registry::builtin().unwrap();
        let store = schema::scenario_store();

        let catalog = list_resources(&registry, &store, None).unwrap();
        let types: Vec<_> = catalog.resources.keys().copied().collect();
        assert_eq!(types, registry.listable_types());
        assert_eq!(catalog.resources[&ResourceType::KnowledgeModels].len(), 3);
        assert_eq!(catalog.resources[&ResourceType::Locales].len(), 2);

        let json = serde_json::to_value(&catalog).unwrap();
        assert!(json["resources"]["project_importers"].is_array());
    }

    #[test]
    fn test_owned_types_cannot_be_listed() {
        let registry = Registry::builtin().unwrap();
        let store = schema::scenario_store();
        let result = list_resources(&registry, &store, Some(ResourceType::DocumentTemplateFile));
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_listing_feeds_back_as_request() {
        let registry = Registry::builtin().unwrap();
        let store = schema::scenario_store();
        let catalog = list_resources(&registry, &store, Some(ResourceType::Locales)).unwrap();

        let request =
            crate::package::ExportRequest::from_value(serde_json::to_value(&catalog).unwrap()).unwrap();
        let roots = request.roots(&registry).unwrap();
        assert_eq!(roots.len(), 2);
        assert_eq!(roots[0].1, "myorg:czech:1.0.0");
    }
}
