//! Resource table: absolute URI (+ fragment) → schema node.
//!
//! Filled during the compile pass and read-only afterwards. Every resource keeps its
//! anchors, dynamic anchors and the JSON-Pointer locations of every compiled
//! subschema beneath it, so lookups never walk raw JSON at evaluation time.
use std::collections::HashMap;

use serde_json::Value;
use url::Url;

use super::node::{NodeId, ResourceId};
use crate::error::{Error, Result};
use crate::pointer::JsonPointer;

#[derive(Debug)]
pub struct Resource {
    pub uri: Url,
    pub root: NodeId,
    /// Raw document subtree, kept for pointers into non-schema locations.
    pub raw: Value,
    anchors: HashMap<String, NodeId>,
    dynamic_anchors: HashMap<String, NodeId>,
    locations: HashMap<JsonPointer, NodeId>,
}

/// Outcome of looking a URI up.
#[derive(Debug, PartialEq)]
pub enum Lookup {
    Found(NodeId),
    /// The resource is known but nothing is compiled at that pointer yet.
    Uncompiled { resource: ResourceId, pointer: JsonPointer },
    UnknownResource,
    UnknownFragment,
}

#[derive(Debug, Default)]
pub struct ResourceTable {
    resources: Vec<Resource>,
    by_uri: HashMap<Url, ResourceId>,
}

impl ResourceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_resource(&mut self, uri: Url, root: NodeId, raw: Value) -> Result<ResourceId> {
        if self.by_uri.contains_key(&uri) {
            return Err(Error::DuplicateIdentifier { uri: uri.to_string() });
        }
        let id = ResourceId(self.resources.len());
        tracing::trace!(uri = %uri, node = root.0, "registered resource");
        self.by_uri.insert(uri.clone(), id);
        self.resources.push(Resource {
            uri,
            root,
            raw,
            anchors: HashMap::new(),
            dynamic_anchors: HashMap::new(),
            locations: HashMap::from([(JsonPointer::root(), root)]),
        });
        Ok(id)
    }

    /// Second name for an existing resource (e.g. the URI it was fetched from).
    pub fn alias(&mut self, uri: Url, resource: ResourceId) -> Result<()> {
        match self.by_uri.get(&uri) {
            Some(existing) if *existing == resource => Ok(()),
            Some(_) => Err(Error::DuplicateIdentifier { uri: uri.to_string() }),
            None => {
                self.by_uri.insert(uri, resource);
                Ok(())
            }
        }
    }

    /// `$anchor` / `$dynamicAnchor`. A dynamic anchor is also a plain fragment.
    pub fn register_anchor(
        &mut self,
        resource: ResourceId,
        name: &str,
        node: NodeId,
        dynamic: bool,
    ) -> Result<()> {
        let entry = &mut self.resources[resource.0];
        if let Some(existing) = entry.anchors.get(name) {
            if *existing != node {
                return Err(Error::DuplicateIdentifier { uri: format!("{}#{name}", entry.uri) });
            }
        }
        entry.anchors.insert(name.to_string(), node);
        if dynamic {
            entry.dynamic_anchors.insert(name.to_string(), node);
        }
        tracing::trace!(resource = %entry.uri, anchor = name, dynamic, "registered anchor");
        Ok(())
    }

    pub fn register_location(&mut self, resource: ResourceId, pointer: JsonPointer, node: NodeId) {
        self.resources[resource.0].locations.entry(pointer).or_insert(node);
    }

    pub fn resource_id(&self, uri: &Url) -> Option<ResourceId> {
        self.by_uri.get(uri).copied()
    }

    pub fn resource(&self, id: ResourceId) -> &Resource {
        &self.resources[id.0]
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn dynamic_anchor(&self, resource: ResourceId, name: &str) -> Option<NodeId> {
        self.resources[resource.0].dynamic_anchors.get(name).copied()
    }

    /// Resolve an absolute URI whose resource part is `resource` and whose fragment
    /// is `fragment` (empty fragment = the resource root).
    pub fn lookup_in(&self, resource: ResourceId, fragment: Option<&str>) -> Lookup {
        let entry = &self.resources[resource.0];
        let Some(fragment) = fragment else {
            return Lookup::Found(entry.root);
        };
        let decoded = crate::pointer::decode_fragment(fragment);
        if decoded.is_empty() || decoded.starts_with('/') {
            let Some(pointer) = JsonPointer::parse(&decoded) else {
                return Lookup::UnknownFragment;
            };
            match entry.locations.get(&pointer) {
                Some(node) => Lookup::Found(*node),
                None => Lookup::Uncompiled { resource, pointer },
            }
        } else {
            match entry.anchors.get(&decoded) {
                Some(node) => Lookup::Found(*node),
                None => Lookup::UnknownFragment,
            }
        }
    }

    pub fn lookup(&self, uri: &Url) -> Lookup {
        let (resource_uri, fragment) = crate::uri::split_fragment(uri);
        match self.resource_id(&resource_uri) {
            Some(resource) => self.lookup_in(resource, fragment.as_deref()),
            None => Lookup::UnknownResource,
        }
    }
}

// ------------------------------- Tests ------------------------------------ //
