//! Dependency Resolver - expands a requested root into the nodes that must
//! exist before it, in a safe emission order.
//!
//! Resolution algorithm (depth-first, per node):
//! 1. Already visited in this run → reuse the recorded state
//! 2. Mark in progress, fetch the row by the identifying key
//! 3. Resolve every non-null foreign key first (self references unwind to
//!    the oldest ancestor)
//! 4. Emit the node
//! 5. Expand owned child types, each child becoming its own node
//!
//! A [`Resolver`] is the visit state of one export run; create a new one per
//! run.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::registry::{Registry, ResourceDescriptor};
use crate::resource::ResourceType;
use crate::retry::RetryPolicy;
use crate::row::{Row, Value};
use crate::storage::RowSource;
use crate::{Error, Result};

/// Identity of a node: unique per run
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeKey {
    pub resource_type: ResourceType,
    pub identifier: String,
}

impl NodeKey {
    pub fn new(resource_type: ResourceType, identifier: impl Into<String>) -> Self {
        Self {
            resource_type,
            identifier: identifier.into(),
        }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource_type, self.identifier)
    }
}

/// A resolved node with its fetched row
#[derive(Debug, Clone)]
pub struct ResourceNode {
    pub key: NodeKey,
    pub row: Row,
}

impl ResourceNode {
    pub fn resource_type(&self) -> ResourceType {
        self.key.resource_type
    }

    pub fn identifier(&self) -> &str {
        &self.key.identifier
    }
}

/// Receives nodes in emission order.
///
/// A fatal error aborts the run; any other error fails only this node (and
/// whatever depends on it).
pub trait NodeSink {
    fn accept(&mut self, node: &ResourceNode) -> Result<()>;
}

impl<F> NodeSink for F
where
    F: FnMut(&ResourceNode) -> Result<()>,
{
    fn accept(&mut self, node: &ResourceNode) -> Result<()> {
        self(node)
    }
}

/// Per-run state of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitState {
    InProgress,
    Emitted,
    /// Not emitted, but assumed present in the target (sentinels, rows of
    /// the package being continued)
    Satisfied,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NotFound,
    Storage,
    Serialization,
    Blob,
    Dependency,
}

impl FailureKind {
    /// Classify an error raised while fetching or emitting a node
    pub fn of(error: &Error) -> Self {
        match error {
            Error::NodeNotFound { .. } => FailureKind::NotFound,
            Error::Serialization { .. } => FailureKind::Serialization,
            Error::Blob { .. } | Error::InvalidObjectKey(_) => FailureKind::Blob,
            _ => FailureKind::Storage,
        }
    }
}

/// A recoverable failure, attributed to the root that reached the node
#[derive(Debug, Clone, Serialize)]
pub struct NodeFailure {
    pub node: NodeKey,
    pub root: NodeKey,
    pub kind: FailureKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveOptions {
    /// Do not emit sentinel nodes at all
    pub skip_sentinels: bool,
}

pub struct Resolver<'a, S> {
    registry: &'a Registry,
    source: S,
    retry: RetryPolicy,
    options: ResolveOptions,
    visits: HashMap<NodeKey, VisitState>,
    emitted: Vec<NodeKey>,
    failures: Vec<NodeFailure>,
}

impl<'a, S: RowSource> Resolver<'a, S> {
    pub fn new(registry: &'a Registry, source: S) -> Self {
        Self {
            registry,
            source,
            retry: RetryPolicy::default(),
            options: ResolveOptions::default(),
            visits: HashMap::new(),
            emitted: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_options(mut self, options: ResolveOptions) -> Self {
        self.options = options;
        self
    }

    /// Nodes already present in the target: never emitted, dependents proceed
    pub fn with_present(mut self, keys: impl IntoIterator<Item = NodeKey>) -> Self {
        for key in keys {
            self.visits.insert(key, VisitState::Satisfied);
        }
        self
    }

    /// Resolve one root and collect the newly emitted nodes
    pub fn resolve(&mut self, resource_type: ResourceType, identifier: &str) -> Result<Vec<ResourceNode>> {
        let mut nodes = Vec::new();
        let mut collect = |node: &ResourceNode| -> Result<()> {
            nodes.push(node.clone());
            Ok(())
        };
        self.resolve_into(resource_type, identifier, &mut collect)?;
        Ok(nodes)
    }

    /// Resolve one root, handing every newly emitted node to `sink`.
    ///
    /// Returns the final state of the root. Only fatal errors are returned
    /// as `Err`; recoverable ones are recorded in [`Resolver::failures`].
    pub fn resolve_into(
        &mut self,
        resource_type: ResourceType,
        identifier: &str,
        sink: &mut dyn NodeSink,
    ) -> Result<VisitState> {
        let descriptor = self.registry.descriptor(resource_type)?;
        let value = descriptor.key_value(identifier);
        let root = NodeKey::new(resource_type, value.to_string());

        info!(root = %root, "Resolving root");
        let before = self.emitted.len();
        let state = self.visit(resource_type, value, &root, sink, None)?;
        debug!(root = %root, state = ?state, emitted = self.emitted.len() - before, "Root resolved");
        Ok(state)
    }

    /// State of a node in this run, if visited
    pub fn state(&self, key: &NodeKey) -> Option<VisitState> {
        self.visits.get(key).copied()
    }

    /// Emitted nodes, in emission order
    pub fn emitted(&self) -> &[NodeKey] {
        &self.emitted
    }

    pub fn failures(&self) -> &[NodeFailure] {
        &self.failures
    }

    pub fn into_outcome(self) -> (Vec<NodeKey>, Vec<NodeFailure>) {
        (self.emitted, self.failures)
    }

    fn visit(
        &mut self,
        resource_type: ResourceType,
        value: Value,
        root: &NodeKey,
        sink: &mut dyn NodeSink,
        prefetched: Option<Row>,
    ) -> Result<VisitState> {
        let registry = self.registry;
        let descriptor = registry.descriptor(resource_type)?;
        let key = NodeKey::new(resource_type, value.to_string());

        if let Some(state) = self.visits.get(&key) {
            return Ok(*state);
        }
        if self.options.skip_sentinels && descriptor.is_sentinel(&key.identifier) {
            debug!(node = %key, "Sentinel assumed present, not emitted");
            self.visits.insert(key, VisitState::Satisfied);
            return Ok(VisitState::Satisfied);
        }
        self.visits.insert(key.clone(), VisitState::InProgress);

        let row = match prefetched {
            Some(row) => row,
            None => match self.fetch_row(descriptor, &value) {
                Ok(Some(row)) => row,
                Ok(None) => {
                    let error = Error::NodeNotFound {
                        resource_type,
                        identifier: key.identifier.clone(),
                    };
                    return Ok(self.fail(key, root, FailureKind::NotFound, &error));
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => return Ok(self.fail(key, root, FailureKind::Storage, &e)),
            },
        };

        for edge in descriptor.dependencies {
            let Some(target) = row.non_null(edge.foreign_key) else {
                continue;
            };
            let target = registry.descriptor(edge.to)?.key_value(&target.to_string());
            let target_key = NodeKey::new(edge.to, target.to_string());
            match self.visit(edge.to, target, root, sink, None)? {
                VisitState::Emitted | VisitState::Satisfied => {}
                VisitState::InProgress => {
                    debug!(node = %key, dependency = %target_key, "Cycle detected, skipping edge");
                }
                VisitState::Failed => {
                    let message = format!("dependency {} could not be exported", target_key);
                    return Ok(self.fail_with(key, root, FailureKind::Dependency, message));
                }
            }
        }

        let node = ResourceNode { key, row };
        if let Err(e) = sink.accept(&node) {
            if e.is_fatal() {
                return Err(e);
            }
            return Ok(self.fail(node.key, root, FailureKind::of(&e), &e));
        }
        debug!(node = %node.key, "Emitted");
        self.visits.insert(node.key.clone(), VisitState::Emitted);
        self.emitted.push(node.key.clone());

        for child_type in descriptor.child_types {
            self.expand_children(*child_type, &node, &value, root, sink)?;
        }

        Ok(VisitState::Emitted)
    }

    /// Emit every row of `child_type` owned by `owner`
    fn expand_children(
        &mut self,
        child_type: ResourceType,
        owner: &ResourceNode,
        owner_value: &Value,
        root: &NodeKey,
        sink: &mut dyn NodeSink,
    ) -> Result<()> {
        let registry = self.registry;
        let child = registry.descriptor(child_type)?;
        let Some(parent_key) = child.parent_key else {
            return Ok(());
        };

        let source = &self.source;
        let rows = match self.retry.run("child lookup", || {
            source.fetch_many(child.table_name, parent_key, owner_value)
        }) {
            Ok(rows) => rows,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                let key = NodeKey::new(child_type, format!("{}/*", owner.identifier()));
                self.fail(key, root, FailureKind::Storage, &e);
                return Ok(());
            }
        };

        debug!(owner = %owner.key, child_type = %child_type, count = rows.len(), "Expanding owned rows");
        for row in rows {
            let Some(id) = row.non_null(child.identifying_key) else {
                warn!(owner = %owner.key, child_type = %child_type, "Owned row without identifier, skipped");
                continue;
            };
            let id = child.key_value(&id.to_string());
            self.visit(child_type, id, root, sink, Some(row))?;
        }
        Ok(())
    }

    fn fetch_row(&self, descriptor: &ResourceDescriptor, value: &Value) -> Result<Option<Row>> {
        let source = &self.source;
        self.retry.run("row lookup", || {
            source.fetch_one(descriptor.table_name, descriptor.identifying_key, value)
        })
    }

    fn fail(&mut self, node: NodeKey, root: &NodeKey, kind: FailureKind, error: &Error) -> VisitState {
        self.fail_with(node, root, kind, error.to_string())
    }

    fn fail_with(&mut self, node: NodeKey, root: &NodeKey, kind: FailureKind, message: String) -> VisitState {
        warn!(node = %node, root = %root, kind = ?kind, "{}", message);
        self.visits.insert(node.clone(), VisitState::Failed);
        self.failures.push(NodeFailure {
            node,
            root: root.clone(),
            kind,
            message,
        });
        VisitState::Failed
    }
}
