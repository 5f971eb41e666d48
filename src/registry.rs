//! Resource Schema Registry
//!
//! Static descriptors for every [`ResourceType`]: where its rows live, how a
//! single row is identified, which attributes are listed, which other
//! resources must exist first and where its binary asset is stored.
//!
//! The registry is fixed configuration. [`Registry::new`] validates it once so
//! a broken descriptor set is reported at startup, never in the middle of a
//! traversal.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;

use crate::resource::ResourceType;
use crate::row::{Row, Value};
use crate::{Error, Result};

/// Identifier of the built-in locale present in every deployment
pub const DEFAULT_LOCALE_ID: &str = "wizard:default:1.0.0";

/// A foreign-key relation: rows of `from` carry the identifier of a `to`
/// row in `foreign_key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DependencyEdge {
    pub from: ResourceType,
    pub to: ResourceType,
    pub foreign_key: &'static str,
}

impl DependencyEdge {
    pub const fn new(from: ResourceType, to: ResourceType, foreign_key: &'static str) -> Self {
        Self { from, to, foreign_key }
    }

    pub fn is_self_reference(&self) -> bool {
        self.from == self.to
    }
}

/// Everything the exporter knows about one resource type.
#[derive(Debug, Clone)]
pub struct ResourceDescriptor {
    pub resource_type: ResourceType,
    pub table_name: &'static str,
    /// Attribute used to look up a single row
    pub identifying_key: &'static str,
    /// Attributes exposed by listings; serialization always uses the full row
    pub visible_attributes: &'static [&'static str],
    /// Prerequisites, resolved in this order before the row is emitted
    pub dependencies: &'static [DependencyEdge],
    /// Object key template, `{attribute}` placeholders are taken from the row
    pub blob_path_template: Option<&'static str>,
    /// Types owned by this one, expanded after the owner is emitted
    pub child_types: &'static [ResourceType],
    /// For owned types: the attribute holding the owner's identifier
    pub parent_key: Option<&'static str>,
    /// Identifiers that never trigger a blob fetch
    pub blob_skip_identifiers: &'static [&'static str],
}

impl ResourceDescriptor {
    /// Owned types are exported through their owner and are not listed
    pub fn is_owned(&self) -> bool {
        self.parent_key.is_some()
    }

    pub fn is_sentinel(&self, identifier: &str) -> bool {
        self.blob_skip_identifiers.contains(&identifier)
    }

    /// Lookup value for a caller-supplied identifier.
    ///
    /// UUID-keyed types get a typed value so `7EC5...` and `7ec5...` name the
    /// same node.
    pub fn key_value(&self, raw: &str) -> Value {
        if self.identifying_key == "uuid" {
            if let Ok(id) = uuid::Uuid::parse_str(raw.trim()) {
                return Value::Uuid(id);
            }
        }
        Value::Text(raw.to_string())
    }

    /// Compute the object key of this row's blob, if the type has one.
    ///
    /// Returns `None` when the type has no template or a placeholder
    /// attribute is null.
    pub fn object_key(&self, row: &Row) -> Option<String> {
        let template = self.blob_path_template?;
        let mut missing = false;
        let key = placeholder_regex().replace_all(template, |caps: &regex::Captures<'_>| {
            match row.non_null(&caps[1]) {
                Some(value) => value.to_string(),
                None => {
                    missing = true;
                    String::new()
                }
            }
        });
        if missing { None } else { Some(key.into_owned()) }
    }
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([^{}]*)\}").expect("placeholder pattern is valid"))
}

fn attribute_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z_][a-z0-9_]*$").expect("attribute pattern is valid"))
}

/// Validated set of descriptors, one per resource type.
#[derive(Debug)]
pub struct Registry {
    descriptors: HashMap<ResourceType, ResourceDescriptor>,
}

impl Registry {
    /// Build a registry, rejecting inconsistent descriptor sets
    pub fn new(descriptors: Vec<ResourceDescriptor>) -> Result<Self> {
        let mut map = HashMap::new();
        for descriptor in descriptors {
            let ty = descriptor.resource_type;
            if map.insert(ty, descriptor).is_some() {
                return Err(Error::Config(format!("duplicate descriptor for {}", ty)));
            }
        }
        let registry = Self { descriptors: map };
        registry.validate()?;
        Ok(registry)
    }

    /// The DSW schema
    pub fn builtin() -> Result<Self> {
        Self::new(builtin_descriptors())
    }

    /// Descriptor of a resource type
    pub fn descriptor(&self, ty: ResourceType) -> Result<&ResourceDescriptor> {
        self.descriptors
            .get(&ty)
            .ok_or_else(|| Error::UnknownResourceType(ty.to_string()))
    }

    /// Descriptor of a resource type given by name
    pub fn lookup(&self, name: &str) -> Result<&ResourceDescriptor> {
        let ty: ResourceType = name.parse()?;
        self.descriptor(ty)
    }

    /// Types in declaration order of [`ResourceType::all`]
    pub fn types(&self) -> impl Iterator<Item = ResourceType> + '_ {
        ResourceType::all()
            .iter()
            .copied()
            .filter(|ty| self.descriptors.contains_key(ty))
    }

    /// Types a caller may list or request directly
    pub fn listable_types(&self) -> Vec<ResourceType> {
        self.types()
            .filter(|ty| self.descriptors.get(ty).is_some_and(|d| !d.is_owned()))
            .collect()
    }

    /// All dependency edges of the registry
    pub fn edges(&self) -> impl Iterator<Item = &DependencyEdge> {
        self.types()
            .filter_map(|ty| self.descriptors.get(&ty))
            .flat_map(|d| d.dependencies.iter())
    }

    /// Order in which scripts must be registered so that replaying them in
    /// sequence never violates a foreign key.
    ///
    /// Requested types keep the caller's order; each is preceded by the types
    /// it depends on and followed by the types it owns.
    pub fn script_plan(&self, requested: &[ResourceType]) -> Result<Vec<ResourceType>> {
        let mut plan = Vec::new();
        let mut seen = HashSet::new();
        for ty in requested {
            self.plan_type(*ty, &mut plan, &mut seen)?;
        }
        Ok(plan)
    }

    fn plan_type(
        &self,
        ty: ResourceType,
        plan: &mut Vec<ResourceType>,
        seen: &mut HashSet<ResourceType>,
    ) -> Result<()> {
        if !seen.insert(ty) {
            return Ok(());
        }
        let descriptor = self.descriptor(ty)?;
        for edge in descriptor.dependencies.iter().filter(|e| !e.is_self_reference()) {
            self.plan_type(edge.to, plan, seen)?;
        }
        plan.push(ty);
        for child in descriptor.child_types {
            self.plan_type(*child, plan, seen)?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        for ty in ResourceType::all() {
            if !self.descriptors.contains_key(ty) {
                return Err(Error::Config(format!("no descriptor for resource type {}", ty)));
            }
        }

        for descriptor in self.descriptors.values() {
            let ty = descriptor.resource_type;
            if descriptor.table_name.is_empty() || descriptor.identifying_key.is_empty() {
                return Err(Error::Config(format!("{}: table and key must be set", ty)));
            }
            for edge in descriptor.dependencies {
                if edge.from != ty {
                    return Err(Error::Config(format!(
                        "{}: dependency edge declared for {}",
                        ty, edge.from
                    )));
                }
                if !attribute_regex().is_match(edge.foreign_key) {
                    return Err(Error::Config(format!(
                        "{}: invalid foreign key attribute '{}'",
                        ty, edge.foreign_key
                    )));
                }
                self.descriptor(edge.to)?;
            }
            for child in descriptor.child_types {
                let child_descriptor = self.descriptor(*child)?;
                if child_descriptor.parent_key.is_none() {
                    return Err(Error::Config(format!(
                        "{}: owned type {} has no parent key",
                        ty, child
                    )));
                }
            }
            if let Some(template) = descriptor.blob_path_template {
                for caps in placeholder_regex().captures_iter(template) {
                    if !attribute_regex().is_match(&caps[1]) {
                        return Err(Error::Config(format!(
                            "{}: invalid placeholder '{{{}}}' in blob template",
                            ty, &caps[1]
                        )));
                    }
                }
            }
        }

        self.check_acyclic()
    }

    /// Type-level dependency graph must be a DAG once self references are
    /// removed; self references are unwound row by row.
    fn check_acyclic(&self) -> Result<()> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Active,
            Done,
        }

        fn visit(
            registry: &Registry,
            ty: ResourceType,
            marks: &mut HashMap<ResourceType, Mark>,
        ) -> Result<()> {
            match marks.get(&ty) {
                Some(Mark::Done) => return Ok(()),
                Some(Mark::Active) => {
                    return Err(Error::Config(format!("dependency cycle through {}", ty)));
                }
                None => {}
            }
            marks.insert(ty, Mark::Active);
            for edge in registry.descriptor(ty)?.dependencies {
                if !edge.is_self_reference() {
                    visit(registry, edge.to, marks)?;
                }
            }
            marks.insert(ty, Mark::Done);
            Ok(())
        }

        let mut marks = HashMap::new();
        for ty in self.types() {
            visit(self, ty, &mut marks)?;
        }
        Ok(())
    }
}

use ResourceType as R;

const NO_DEPS: &[DependencyEdge] = &[];

const KM_DEPS: &[DependencyEdge] = &[DependencyEdge::new(
    R::KnowledgeModels,
    R::KnowledgeModels,
    "previous_package_id",
)];

const ASSET_DEPS: &[DependencyEdge] = &[DependencyEdge::new(
    R::DocumentTemplateAsset,
    R::DocumentTemplates,
    "document_template_id",
)];

const FILE_DEPS: &[DependencyEdge] = &[DependencyEdge::new(
    R::DocumentTemplateFile,
    R::DocumentTemplates,
    "document_template_id",
)];

const PROJECT_DEPS: &[DependencyEdge] = &[
    DependencyEdge::new(R::Projects, R::KnowledgeModels, "package_id"),
    DependencyEdge::new(R::Projects, R::DocumentTemplates, "document_template_id"),
    DependencyEdge::new(R::Projects, R::Users, "creator_uuid"),
];

const DOCUMENT_DEPS: &[DependencyEdge] = &[
    DependencyEdge::new(R::Documents, R::Projects, "questionnaire_uuid"),
    DependencyEdge::new(R::Documents, R::DocumentTemplates, "document_template_id"),
    DependencyEdge::new(R::Documents, R::Users, "created_by"),
];

/// Descriptors of the DSW schema
pub fn builtin_descriptors() -> Vec<ResourceDescriptor> {
    vec![
        ResourceDescriptor {
            resource_type: R::Users,
            table_name: "user_entity",
            identifying_key: "uuid",
            visible_attributes: &["uuid", "first_name", "last_name", "role"],
            dependencies: NO_DEPS,
            blob_path_template: None,
            child_types: &[],
            parent_key: None,
            blob_skip_identifiers: &[],
        },
        ResourceDescriptor {
            resource_type: R::ProjectImporters,
            table_name: "questionnaire_importer",
            identifying_key: "id",
            visible_attributes: &["id", "name", "description"],
            dependencies: NO_DEPS,
            blob_path_template: None,
            child_types: &[],
            parent_key: None,
            blob_skip_identifiers: &[],
        },
        ResourceDescriptor {
            resource_type: R::KnowledgeModels,
            table_name: "package",
            identifying_key: "id",
            visible_attributes: &["id", "name", "km_id", "description"],
            dependencies: KM_DEPS,
            blob_path_template: None,
            child_types: &[],
            parent_key: None,
            blob_skip_identifiers: &[],
        },
        ResourceDescriptor {
            resource_type: R::Locales,
            table_name: "locale",
            identifying_key: "id",
            visible_attributes: &["id", "name", "code", "description"],
            dependencies: NO_DEPS,
            blob_path_template: Some("locales/{id}"),
            child_types: &[],
            parent_key: None,
            blob_skip_identifiers: &[DEFAULT_LOCALE_ID],
        },
        ResourceDescriptor {
            resource_type: R::DocumentTemplates,
            table_name: "document_template",
            identifying_key: "id",
            visible_attributes: &["id", "name", "template_id"],
            dependencies: NO_DEPS,
            blob_path_template: None,
            child_types: &[R::DocumentTemplateAsset, R::DocumentTemplateFile],
            parent_key: None,
            blob_skip_identifiers: &[],
        },
        ResourceDescriptor {
            resource_type: R::DocumentTemplateAsset,
            table_name: "document_template_asset",
            identifying_key: "uuid",
            visible_attributes: &["uuid", "document_template_id", "file_name", "content_type"],
            dependencies: ASSET_DEPS,
            blob_path_template: Some("templates/{document_template_id}/{uuid}"),
            child_types: &[],
            parent_key: Some("document_template_id"),
            blob_skip_identifiers: &[],
        },
        ResourceDescriptor {
            resource_type: R::DocumentTemplateFile,
            table_name: "document_template_file",
            identifying_key: "uuid",
            visible_attributes: &["uuid", "document_template_id", "file_name"],
            dependencies: FILE_DEPS,
            blob_path_template: None,
            child_types: &[],
            parent_key: Some("document_template_id"),
            blob_skip_identifiers: &[],
        },
        ResourceDescriptor {
            resource_type: R::Projects,
            table_name: "questionnaire",
            identifying_key: "uuid",
            visible_attributes: &["uuid", "name"],
            dependencies: PROJECT_DEPS,
            blob_path_template: None,
            child_types: &[],
            parent_key: None,
            blob_skip_identifiers: &[],
        },
        ResourceDescriptor {
            resource_type: R::Documents,
            table_name: "document",
            identifying_key: "uuid",
            visible_attributes: &["uuid", "name"],
            dependencies: DOCUMENT_DEPS,
            blob_path_template: Some("documents/{uuid}"),
            child_types: &[],
            parent_key: None,
            blob_skip_identifiers: &[],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_is_valid() {
        let registry = Registry::builtin().unwrap();
        for ty in ResourceType::all() {
            assert_eq!(registry.descriptor(*ty).unwrap().resource_type, *ty);
        }
        assert_eq!(registry.lookup("locale").unwrap().table_name, "locale");
    }

    #[test]
    fn test_lookup_unknown_name_fails() {
        let registry = Registry::builtin().unwrap();
        assert!(matches!(
            registry.lookup("tenants"),
            Err(Error::UnknownResourceType(_))
        ));
    }

    #[test]
    fn test_missing_descriptor_is_a_config_error() {
        let mut descriptors = builtin_descriptors();
        descriptors.retain(|d| d.resource_type != ResourceType::Locales);
        let err = Registry::new(descriptors).unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("locales")));
    }

    #[test]
    fn test_type_level_cycle_is_rejected() {
        let mut descriptors = builtin_descriptors();
        for d in descriptors.iter_mut() {
            if d.resource_type == ResourceType::Users {
                d.dependencies = const {
                    &[DependencyEdge::new(
                        ResourceType::Users,
                        ResourceType::Documents,
                        "last_document_uuid",
                    )]
                };
            }
        }
        let err = Registry::new(descriptors).unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("cycle")));
    }

    #[test]
    fn test_bad_template_placeholder_is_rejected() {
        let mut descriptors = builtin_descriptors();
        for d in descriptors.iter_mut() {
            if d.resource_type == ResourceType::Documents {
                d.blob_path_template = Some("documents/{Uuid-Field}");
            }
        }
        assert!(Registry::new(descriptors).is_err());
    }

    #[test]
    fn test_object_key_substitutes_row_attributes() {
        let registry = Registry::builtin().unwrap();
        let asset = registry.descriptor(ResourceType::DocumentTemplateAsset).unwrap();
        let row = Row::new()
            .with("uuid", "a1")
            .with("document_template_id", "myorg:tpl:1.0.0");
        assert_eq!(
            asset.object_key(&row).as_deref(),
            Some("templates/myorg:tpl:1.0.0/a1")
        );

        let orphan = Row::new().with("uuid", "a1").with("document_template_id", Value::Null);
        assert_eq!(asset.object_key(&orphan), None);

        let users = registry.descriptor(ResourceType::Users).unwrap();
        assert_eq!(users.object_key(&row), None);
    }

    #[test]
    fn test_key_value_normalizes_uuids() {
        let registry = Registry::builtin().unwrap();
        let users = registry.descriptor(ResourceType::Users).unwrap();
        let a = users.key_value("7EC5C86A-946A-4386-BA3C-B27481288A62");
        let b = users.key_value("7ec5c86a-946a-4386-ba3c-b27481288a62");
        assert_eq!(a, b);

        let locales = registry.descriptor(ResourceType::Locales).unwrap();
        assert_eq!(locales.key_value("wizard:default:1.0.0"), Value::from("wizard:default:1.0.0"));
    }

    #[test]
    fn test_script_plan_puts_prerequisites_first() {
        let registry = Registry::builtin().unwrap();
        let plan = registry
            .script_plan(&[ResourceType::Documents, ResourceType::Users])
            .unwrap();
        assert_eq!(
            plan,
            vec![
                ResourceType::KnowledgeModels,
                ResourceType::DocumentTemplates,
                ResourceType::DocumentTemplateAsset,
                ResourceType::DocumentTemplateFile,
                ResourceType::Users,
                ResourceType::Projects,
                ResourceType::Documents,
            ]
        );
    }

    #[test]
    fn test_every_edge_is_ordered_by_the_plan() {
        let registry = Registry::builtin().unwrap();
        let plan = registry.script_plan(&registry.listable_types()).unwrap();
        let position = |ty: ResourceType| plan.iter().position(|t| *t == ty).unwrap();
        for edge in registry.edges() {
            assert!(position(edge.to) <= position(edge.from), "{:?}", edge);
        }
        assert_eq!(plan.len(), ResourceType::all().len());
    }

    #[test]
    fn test_owned_types_are_not_listable() {
        let registry = Registry::builtin().unwrap();
        let listable = registry.listable_types();
        assert!(!listable.contains(&ResourceType::DocumentTemplateAsset));
        assert!(!listable.contains(&ResourceType::DocumentTemplateFile));
        assert_eq!(listable.len(), 7);
    }
}
