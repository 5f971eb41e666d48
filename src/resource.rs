//! Resource types - the closed set of exportable kinds
//!
//! Every exportable record belongs to exactly one of these types:
//! - `users`, `project_importers`, `locales`: standalone records
//! - `knowledge_models`: may chain to a predecessor of the same type
//! - `document_templates`: own their assets and files
//! - `projects`, `documents`: reference the records above

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Exportable resource kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Users,
    Projects,
    Documents,
    ProjectImporters,
    KnowledgeModels,
    Locales,
    DocumentTemplates,
    DocumentTemplateAsset,
    DocumentTemplateFile,
}

impl ResourceType {
    /// Get the string representation of the resource type
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Users => "users",
            ResourceType::Projects => "projects",
            ResourceType::Documents => "documents",
            ResourceType::ProjectImporters => "project_importers",
            ResourceType::KnowledgeModels => "knowledge_models",
            ResourceType::Locales => "locales",
            ResourceType::DocumentTemplates => "document_templates",
            ResourceType::DocumentTemplateAsset => "document_template_asset",
            ResourceType::DocumentTemplateFile => "document_template_file",
        }
    }

    /// Get all resource types
    pub fn all() -> &'static [ResourceType] {
        &[
            ResourceType::Users,
            ResourceType::Projects,
            ResourceType::Documents,
            ResourceType::ProjectImporters,
            ResourceType::KnowledgeModels,
            ResourceType::Locales,
            ResourceType::DocumentTemplates,
            ResourceType::DocumentTemplateAsset,
            ResourceType::DocumentTemplateFile,
        ]
    }

    /// File name of the insert script holding rows of this type
    pub fn script_file_name(&self) -> String {
        format!("add_{}.sql", self.as_str())
    }

    /// Inverse of [`ResourceType::script_file_name`]
    pub fn from_script_file_name(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|ty| ty.script_file_name() == name)
    }
}

impl FromStr for ResourceType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "users" | "user" => Ok(ResourceType::Users),
            "projects" | "project" => Ok(ResourceType::Projects),
            "documents" | "document" => Ok(ResourceType::Documents),
            // both spellings appear in listing requests
            "project_importers" | "projects_importers" => Ok(ResourceType::ProjectImporters),
            "knowledge_models" | "knowledge_model" => Ok(ResourceType::KnowledgeModels),
            "locales" | "locale" => Ok(ResourceType::Locales),
            "document_templates" | "document_template" => Ok(ResourceType::DocumentTemplates),
            "document_template_asset" | "document_template_assets" => {
                Ok(ResourceType::DocumentTemplateAsset)
            }
            "document_template_file" | "document_template_files" => {
                Ok(ResourceType::DocumentTemplateFile)
            }
            _ => Err(crate::Error::UnknownResourceType(s.to_string())),
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trips_through_str() {
        for ty in ResourceType::all() {
            let parsed: ResourceType = ty.as_str().parse().unwrap();
            assert_eq!(parsed, *ty);
        }
    }

    #[test]
    fn test_accepts_legacy_spellings() {
        assert_eq!(
            "projects_importers".parse::<ResourceType>().unwrap(),
            ResourceType::ProjectImporters
        );
        assert_eq!("locale".parse::<ResourceType>().unwrap(), ResourceType::Locales);
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let err = "questionnaires".parse::<ResourceType>().unwrap_err();
        assert!(matches!(err, crate::Error::UnknownResourceType(name) if name == "questionnaires"));
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let json = serde_json::to_string(&ResourceType::DocumentTemplateAsset).unwrap();
        assert_eq!(json, "\"document_template_asset\"");
        assert_eq!(ResourceType::KnowledgeModels.script_file_name(), "add_knowledge_models.sql");
    }

    #[test]
    fn test_script_file_name_maps_back() {
        for ty in ResourceType::all() {
            assert_eq!(ResourceType::from_script_file_name(&ty.script_file_name()), Some(*ty));
        }
        assert_eq!(ResourceType::from_script_file_name("add_tenants.sql"), None);
    }
}
