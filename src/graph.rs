//! Arena of local resources linked by pointers
//!
//! Each node holds a resource and its remote state: the URL it was uploaded
//! to or downloaded from, and whether it changed since. Mutable access
//! through [`ResourceGraph::get_mut`] marks a node touched so the next
//! upload patches it.

use crate::error::{ClientError, Result};
use crate::files::Array;
use crate::resources::{MappingValue, Pointer, Resource, ResourceKind};
use crate::types::{Color, DataLocation};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Fields the server owns; never sent in upload bodies
pub const IGNORED_FIELDS: &[&str] = &[
    "uid",
    "author",
    "links",
    "type",
    "date_created",
    "date_modified",
];

/// Remote state of a graph node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeState {
    /// URL of the resource on the server
    pub url: Option<String>,
    /// Changed since the last upload or download
    pub touched: bool,
}

impl Default for NodeState {
    fn default() -> Self {
        Self {
            url: None,
            touched: true,
        }
    }
}

#[derive(Debug, Clone)]
struct Node {
    resource: Resource,
    state: NodeState,
}

#[derive(Debug, Clone, Default)]
pub struct ResourceGraph {
    nodes: HashMap<Uuid, Node>,
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, uid: Uuid) -> bool {
        self.nodes.contains_key(&uid)
    }

    /// Add a new, not yet uploaded resource
    pub fn insert(&mut self, resource: impl Into<Resource>) -> Uuid {
        self.insert_with_state(resource.into(), NodeState::default())
    }

    /// Add a resource that mirrors `url` on the server
    pub fn insert_remote(&mut self, resource: Resource, url: impl Into<String>) -> Uuid {
        self.insert_with_state(
            resource,
            NodeState {
                url: Some(url.into()),
                touched: false,
            },
        )
    }

    pub fn insert_with_state(&mut self, resource: Resource, state: NodeState) -> Uuid {
        let uid = Uuid::new_v4();
        self.nodes.insert(uid, Node { resource, state });
        uid
    }

    pub fn get(&self, uid: Uuid) -> Option<&Resource> {
        self.nodes.get(&uid).map(|node| &node.resource)
    }

    /// Mutable access; marks the node touched
    pub fn get_mut(&mut self, uid: Uuid) -> Option<&mut Resource> {
        self.nodes.get_mut(&uid).map(|node| {
            node.state.touched = true;
            &mut node.resource
        })
    }

    pub fn remove(&mut self, uid: Uuid) -> Option<Resource> {
        self.nodes.remove(&uid).map(|node| node.resource)
    }

    pub fn state(&self, uid: Uuid) -> Option<&NodeState> {
        self.nodes.get(&uid).map(|node| &node.state)
    }

    pub fn url(&self, uid: Uuid) -> Option<&str> {
        self.nodes.get(&uid).and_then(|node| node.state.url.as_deref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Uuid, &Resource)> {
        self.nodes.iter().map(|(uid, node)| (*uid, &node.resource))
    }

    pub(crate) fn require(&self, uid: Uuid) -> Result<&Resource> {
        self.get(uid)
            .ok_or_else(|| ClientError::NotFound(uid.to_string()))
    }

    /// Resource behind a local pointer; URL pointers are not resolved
    pub fn resolve(&self, pointer: &Pointer) -> Result<&Resource> {
        match pointer {
            Pointer::Local(uid) => self.require(*uid),
            Pointer::Url(url) => Err(ClientError::UnsupportedResource(format!(
                "{} has not been downloaded",
                url
            ))),
        }
    }

    /// Array behind a local pointer
    pub fn resolve_array(&self, pointer: &Pointer) -> Result<&Array> {
        match self.resolve(pointer)? {
            Resource::Array(array) => Ok(array),
            other => Err(ClientError::Validation(format!(
                "Expected files/array, found {}",
                other.kind()
            ))),
        }
    }

    /// Record a successful upload or download
    ///
    /// An existing URL is kept; the node is marked clean either way.
    pub fn mark_uploaded(&mut self, uid: Uuid, url: &str) -> Result<()> {
        let node = self
            .nodes
            .get_mut(&uid)
            .ok_or_else(|| ClientError::NotFound(uid.to_string()))?;
        if node.state.url.is_none() {
            node.state.url = Some(url.to_string());
        }
        node.state.touched = false;
        Ok(())
    }

    /// Forget the remote URL of a node, e.g. after deletion
    pub fn forget_url(&mut self, uid: Uuid) {
        if let Some(node) = self.nodes.get_mut(&uid) {
            node.state.url = None;
            node.state.touched = true;
        }
    }

    /// All resources a node depends on
    ///
    /// Depth first in field-name order: a resource's own children come
    /// before it, URL pointers are leaves, and repeats keep their first
    /// position.
    pub fn compute_children(&self, uid: Uuid) -> Result<Vec<Pointer>> {
        let mut children = Vec::new();
        let mut path = Vec::new();
        self.collect_children(uid, &mut path, &mut children)?;
        let mut seen = HashSet::new();
        children.retain(|pointer| seen.insert(pointer.clone()));
        Ok(children)
    }

    fn collect_children(
        &self,
        uid: Uuid,
        path: &mut Vec<Uuid>,
        children: &mut Vec<Pointer>,
    ) -> Result<()> {
        if path.contains(&uid) {
            return Err(ClientError::Validation(format!(
                "Resource {} refers back to itself",
                uid
            )));
        }
        path.push(uid);
        for pointer in self.require(uid)?.pointers() {
            if let Pointer::Local(child) = pointer {
                self.collect_children(*child, path, children)?;
            }
            children.push(pointer.clone());
        }
        path.pop();
        Ok(())
    }

    /// Mark a node, and optionally everything below it, as changed
    pub fn touch(&mut self, uid: Uuid, recursive: bool) -> Result<()> {
        let mut targets = vec![uid];
        if recursive {
            targets.extend(
                self.compute_children(uid)?
                    .iter()
                    .filter_map(Pointer::as_local),
            );
        }
        for target in targets {
            if let Some(node) = self.nodes.get_mut(&target) {
                node.state.touched = true;
            }
        }
        Ok(())
    }

    /// Whether the pointer target is up to date with the server
    pub fn is_uploaded(&self, pointer: &Pointer) -> bool {
        match pointer {
            Pointer::Url(_) => true,
            Pointer::Local(uid) => self
                .state(*uid)
                .map(|state| state.url.is_some() && !state.touched)
                .unwrap_or(false),
        }
    }

    /// Local nodes reachable from `uid`, root included
    pub fn reachable(&self, uid: Uuid) -> Result<Vec<Uuid>> {
        let mut nodes: Vec<Uuid> = self
            .compute_children(uid)?
            .iter()
            .filter_map(Pointer::as_local)
            .collect();
        nodes.push(uid);
        Ok(nodes)
    }

    /// Group reachable local nodes by height, leaves first
    ///
    /// Every node's children sit in earlier levels, so all nodes within one
    /// level can be uploaded concurrently.
    pub fn upload_levels(&self, uid: Uuid) -> Result<Vec<Vec<Uuid>>> {
        let order = self.reachable(uid)?;
        let mut heights: HashMap<Uuid, usize> = HashMap::new();
        // Children always precede parents in `order`
        for node in &order {
            let height = self
                .require(*node)?
                .pointers()
                .into_iter()
                .filter_map(Pointer::as_local)
                .filter_map(|child| heights.get(&child).map(|h| h + 1))
                .max()
                .unwrap_or(0);
            heights.insert(*node, height);
        }
        let depth = heights.values().copied().max().map_or(0, |h| h + 1);
        let mut levels = vec![Vec::new(); depth];
        for node in order {
            levels[heights[&node]].push(node);
        }
        Ok(levels)
    }

    /// URL of a pointer target, failing for local nodes not yet uploaded
    pub fn pointer_url(&self, pointer: &Pointer) -> Result<String> {
        match pointer {
            Pointer::Url(url) => Ok(url.clone()),
            Pointer::Local(uid) => self
                .url(*uid)
                .map(str::to_string)
                .ok_or_else(|| ClientError::NotUploaded(uid.to_string())),
        }
    }

    /// API JSON body for a node, with local pointers swapped for URLs
    pub fn upload_body(&self, uid: Uuid) -> Result<serde_json::Value> {
        let mut resource = self.require(uid)?.clone();
        for pointer in resource.pointers_mut() {
            if pointer.as_local().is_some() {
                *pointer = Pointer::Url(self.pointer_url(pointer)?);
            }
        }
        let mut body = resource.to_json()?;
        if let Some(object) = body.as_object_mut() {
            for field in IGNORED_FIELDS {
                object.remove(*field);
            }
        }
        Ok(body)
    }

    /// Replace URL pointers of a node with local nodes from `lookup`
    ///
    /// Used while assembling downloads, so the node is not touched.
    pub fn link_urls(&mut self, uid: Uuid, lookup: &HashMap<String, Uuid>) -> Result<()> {
        let node = self
            .nodes
            .get_mut(&uid)
            .ok_or_else(|| ClientError::NotFound(uid.to_string()))?;
        for pointer in node.resource.pointers_mut() {
            if let Pointer::Url(url) = pointer {
                if let Some(local) = lookup.get(url.as_str()) {
                    *pointer = Pointer::Local(*local);
                }
            }
        }
        Ok(())
    }

    fn is_continuous(&self, pointer: &Pointer) -> bool {
        matches!(
            pointer,
            Pointer::Local(uid) if matches!(self.get(*uid), Some(Resource::MappingContinuous(_)))
        )
    }

    /// Whether a mapping produces colors
    ///
    /// URL mappings cannot be inspected and are assumed to.
    pub fn is_color_mapping(&self, pointer: &Pointer) -> bool {
        let uid = match pointer {
            Pointer::Url(_) => return true,
            Pointer::Local(uid) => *uid,
        };
        match self.get(uid) {
            Some(Resource::MappingContinuous(_)) => true,
            Some(Resource::MappingDiscrete(m)) => m.values.first().is_some_and(MappingValue::is_color),
            Some(Resource::MappingCategory(m)) => m.values.first().is_some_and(MappingValue::is_color),
            _ => false,
        }
    }

    /// Ensure the first mapping of a data node is a color mapping
    ///
    /// The web viewer fails to load discrete and category data otherwise.
    /// The first non-continuous color mapping is moved to the front; failing
    /// that, color categories are prepended; failing that, a copy of the
    /// first mapping with random colors is inserted and prepended.
    pub fn sanitize_data_colormaps(&mut self, uid: Uuid) -> Result<()> {
        let (mappings, categories) = match self.require(uid)? {
            Resource::DataBasic(data) => (data.mappings.clone(), None),
            Resource::DataCategory(data) => (data.mappings.clone(), Some(data.categories.clone())),
            _ => return Ok(()),
        };
        if mappings.is_empty() && categories.is_none() {
            return Ok(());
        }
        if mappings.first().is_some_and(|m| self.is_color_mapping(m)) {
            return Ok(());
        }
        let color_index = mappings
            .iter()
            .position(|m| !self.is_continuous(m) && self.is_color_mapping(m));
        let sanitized = if let Some(index) = color_index {
            let mut reordered = mappings.clone();
            let color = reordered.remove(index);
            reordered.insert(0, color);
            reordered
        } else if let Some(cats) = categories.flatten().filter(|c| self.is_color_mapping(c)) {
            std::iter::once(cats).chain(mappings.iter().cloned()).collect()
        } else if let Some(first) = mappings.first() {
            let random = self.random_color_copy(first)?;
            let new_uid = self.insert(random);
            std::iter::once(Pointer::Local(new_uid))
                .chain(mappings.iter().cloned())
                .collect()
        } else {
            return Ok(());
        };
        tracing::debug!(data = %uid, "reordered data mappings for the web viewer");
        match self.get_mut(uid) {
            Some(Resource::DataBasic(data)) => data.mappings = sanitized,
            Some(Resource::DataCategory(data)) => data.mappings = sanitized,
            _ => {}
        }
        Ok(())
    }

    fn random_color_copy(&self, pointer: &Pointer) -> Result<Resource> {
        let random = |count: usize| vec![MappingValue::Color(Color::Random); count];
        match self.resolve(pointer)? {
            Resource::MappingDiscrete(m) => {
                let mut copy = m.clone();
                copy.values = random(copy.values.len());
                Ok(Resource::MappingDiscrete(copy))
            }
            Resource::MappingCategory(m) => {
                let mut copy = m.clone();
                copy.values = random(copy.values.len());
                Ok(Resource::MappingCategory(copy))
            }
            other => Err(ClientError::Validation(format!(
                "Cannot derive a color mapping from {}",
                other.kind()
            ))),
        }
    }

    fn expect_kind(&self, pointer: &Pointer, field: &str, kinds: &[ResourceKind]) -> Result<()> {
        if let Pointer::Local(uid) = pointer {
            let kind = self.require(*uid)?.kind();
            if !kinds.contains(&kind) {
                return Err(ClientError::Validation(format!(
                    "{} cannot refer to {}",
                    field, kind
                )));
            }
        }
        Ok(())
    }

    fn local_array(&self, pointer: &Pointer) -> Option<&Array> {
        match pointer {
            Pointer::Local(uid) => match self.get(*uid) {
                Some(Resource::Array(array)) => Some(array),
                _ => None,
            },
            Pointer::Url(_) => None,
        }
    }

    fn rows(&self, pointer: &Pointer, width: usize, what: &str) -> Result<Option<usize>> {
        match self.local_array(pointer) {
            Some(array) => {
                array.validate_rows(width, what)?;
                Ok(Some(array.shape[0]))
            }
            None => Ok(None),
        }
    }

    /// Number of nodes and cells of a local element, when known
    fn location_counts(&self, resource: &Resource) -> Result<Option<(usize, usize)>> {
        Ok(match resource {
            Resource::PointSet(e) => self.rows(&e.vertices, 3, "vertices")?.map(|n| (n, n)),
            Resource::LineSet(e) => {
                let nodes = self.rows(&e.vertices, 3, "vertices")?;
                let cells = self.rows(&e.segments, 2, "segments")?;
                nodes.zip(cells)
            }
            Resource::Surface(e) => {
                let nodes = self.rows(&e.vertices, 3, "vertices")?;
                let cells = self.rows(&e.triangles, 3, "triangles")?;
                nodes.zip(cells)
            }
            Resource::SurfaceGrid(e) => {
                let (nu, nv) = (e.tensor_u.len(), e.tensor_v.len());
                Some(((nu + 1) * (nv + 1), nu * nv))
            }
            Resource::VolumeGrid(e) => {
                let (nu, nv, nw) = (e.tensor_u.len(), e.tensor_v.len(), e.tensor_w.len());
                Some(((nu + 1) * (nv + 1) * (nw + 1), nu * nv * nw))
            }
            _ => None,
        })
    }

    fn element_data(resource: &Resource) -> &[Pointer] {
        match resource {
            Resource::PointSet(e) => &e.data,
            Resource::LineSet(e) => &e.data,
            Resource::Surface(e) => &e.data,
            Resource::SurfaceGrid(e) => &e.data,
            Resource::VolumeGrid(e) => &e.data,
            _ => &[],
        }
    }

    /// Validate a node against itself and its local neighbours
    pub fn validate(&self, uid: Uuid) -> Result<()> {
        use ResourceKind as K;
        const MAPPINGS: &[ResourceKind] = &[K::MappingContinuous, K::MappingDiscrete, K::MappingCategory];
        const DATA: &[ResourceKind] = &[K::DataBasic, K::DataCategory];
        const TEXTURED: &[ResourceKind] = &[K::DataBasic, K::DataCategory, K::TextureProjection];
        const ELEMENTS: &[ResourceKind] = &[K::PointSet, K::LineSet, K::Surface, K::SurfaceGrid, K::VolumeGrid];

        let resource = self.require(uid)?;
        resource.validate()?;
        match resource {
            Resource::DataBasic(d) => {
                self.expect_kind(&d.array, "array", &[K::Array])?;
                for mapping in &d.mappings {
                    self.expect_kind(mapping, "mappings", MAPPINGS)?;
                }
            }
            Resource::DataCategory(d) => {
                self.expect_kind(&d.array, "array", &[K::Array])?;
                if let Some(categories) = &d.categories {
                    self.expect_kind(categories, "categories", &[K::MappingCategory])?;
                }
                for mapping in &d.mappings {
                    self.expect_kind(mapping, "mappings", &[K::MappingCategory])?;
                }
            }
            Resource::MappingContinuous(m) => {
                self.expect_kind(&m.gradient, "gradient", &[K::Array])?;
                self.rows(&m.gradient, 3, "gradient")?;
            }
            Resource::TextureProjection(t) => self.expect_kind(&t.image, "image", &[K::Image])?,
            Resource::View(v) => {
                for element in &v.elements {
                    self.expect_kind(element, "elements", ELEMENTS)?;
                }
            }
            _ => {}
        }
        if resource.kind().is_element() {
            // Point sets and surfaces list their textures with their data
            let data_kinds = match resource.kind() {
                K::PointSet | K::Surface | K::SurfaceGrid => TEXTURED,
                _ => DATA,
            };
            for pointer in resource.pointers() {
                let allowed = if Self::element_data(resource).contains(pointer) {
                    data_kinds
                } else {
                    &[K::Array][..]
                };
                self.expect_kind(pointer, "element field", allowed)?;
            }
            if let Resource::SurfaceGrid(e) = resource {
                if let Some(offset) = e.offset_w.as_ref().and_then(|p| self.local_array(p)) {
                    let nodes = (e.tensor_u.len() + 1) * (e.tensor_v.len() + 1);
                    if offset.shape.first() != Some(&nodes) {
                        return Err(ClientError::Validation(format!(
                            "offset_w needs {} values, found shape {:?}",
                            nodes, offset.shape
                        )));
                    }
                }
            }
            if let Some((nodes, cells)) = self.location_counts(resource)? {
                for data in Self::element_data(resource) {
                    self.validate_data_length(data, nodes, cells)?;
                }
            }
        }
        Ok(())
    }

    fn validate_data_length(&self, data: &Pointer, nodes: usize, cells: usize) -> Result<()> {
        let (location, array) = match data {
            Pointer::Local(uid) => match self.get(*uid) {
                Some(Resource::DataBasic(d)) => (d.location, &d.array),
                Some(Resource::DataCategory(d)) => (d.location, &d.array),
                _ => return Ok(()),
            },
            Pointer::Url(_) => return Ok(()),
        };
        let expected = match location {
            DataLocation::Nodes => nodes,
            DataLocation::Cells => cells,
        };
        if let Some(array) = self.local_array(array) {
            if array.shape.first() != Some(&expected) {
                return Err(ClientError::Validation(format!(
                    "Data on {:?} needs {} values, found shape {:?}",
                    location, expected, array.shape
                )));
            }
        }
        Ok(())
    }

    /// Validate every local node reachable from `uid`
    pub fn validate_all(&self, uid: Uuid) -> Result<()> {
        for node in self.reachable(uid)? {
            self.validate(node)?;
        }
        Ok(())
    }
}
