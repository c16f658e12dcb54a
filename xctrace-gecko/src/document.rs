//! A read-only view of an exported trace document.
//!
//! `xctrace export` deduplicates its output: the first time a value is written it
//! gets an `id` attribute and its full payload, and every later occurrence is an
//! empty element with a `ref` attribute pointing back at that id. References can
//! also point forward. [`TraceDocument`] parses the XML once into an owned arena of
//! nodes and indexes every canonical node by `(tag, id)`, so resolving a
//! reference is a single hash lookup.

use crate::error::Error;
use crate::fast_hash_map::FastHashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct TagId(u32);

/// How a node relates to the export's deduplication scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identity {
    /// The node carries the full payload for this id.
    Canonical(u64),
    /// The node stands in for the canonical node with this id.
    Reference(u64),
    /// Structural nodes that take no part in deduplication.
    Anonymous,
}

#[derive(Debug)]
struct NodeData {
    tag: TagId,
    identity: Identity,
    attributes: Vec<(Box<str>, Box<str>)>,
    text: Option<Box<str>>,
    children: Vec<NodeId>,
    /// One past the last descendant; nodes are stored in document order.
    subtree_end: u32,
}

#[derive(Debug)]
pub struct TraceDocument {
    nodes: Vec<NodeData>,
    tags: Vec<String>,
    tag_index: FastHashMap<String, TagId>,
    canonical: FastHashMap<(TagId, u64), NodeId>,
    canonical_by_tag: FastHashMap<TagId, Vec<NodeId>>,
}

impl TraceDocument {
    pub fn parse(text: &str) -> Result<Self, Error> {
        let xml = roxmltree::Document::parse(text)?;
        let mut document = TraceDocument {
            nodes: Vec::new(),
            tags: Vec::new(),
            tag_index: FastHashMap::default(),
            canonical: FastHashMap::default(),
            canonical_by_tag: FastHashMap::default(),
        };

        let mut stack = vec![(xml.root_element(), None)];
        while let Some((element, parent)) = stack.pop() {
            let id = document.push_node(element);
            if let Some(parent) = parent {
                document.node_data_mut(parent).children.push(id);
            }
            let children: Vec<_> = element.children().filter(|c| c.is_element()).collect();
            stack.extend(children.into_iter().rev().map(|child| (child, Some(id))));
        }

        for index in (0..document.nodes.len()).rev() {
            let subtree_end = match document.nodes[index].children.last() {
                Some(last_child) => document.nodes[last_child.0 as usize].subtree_end,
                None => index as u32 + 1,
            };
            document.nodes[index].subtree_end = subtree_end;
        }

        Ok(document)
    }

    fn push_node(&mut self, element: roxmltree::Node<'_, '_>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let tag = self.intern_tag(element.tag_name().name());

        let mut identity = Identity::Anonymous;
        let mut attributes = Vec::new();
        for attribute in element.attributes() {
            match (attribute.name(), attribute.value().parse::<u64>()) {
                ("id", Ok(value)) => identity = Identity::Canonical(value),
                ("ref", Ok(value)) => identity = Identity::Reference(value),
                (name, _) => attributes.push((name.into(), attribute.value().into())),
            }
        }

        if let Identity::Canonical(value) = identity {
            // The first canonical node wins if an id is ever repeated.
            if let std::collections::hash_map::Entry::Vacant(entry) =
                self.canonical.entry((tag, value))
            {
                entry.insert(id);
                self.canonical_by_tag.entry(tag).or_default().push(id);
            }
        }

        let text = element
            .text()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(Into::into);

        self.nodes.push(NodeData {
            tag,
            identity,
            attributes,
            text,
            children: Vec::new(),
            subtree_end: 0,
        });
        id
    }

    fn intern_tag(&mut self, name: &str) -> TagId {
        if let Some(tag) = self.tag_index.get(name) {
            return *tag;
        }
        let tag = TagId(self.tags.len() as u32);
        self.tags.push(name.to_owned());
        self.tag_index.insert(name.to_owned(), tag);
        tag
    }

    fn node_data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0 as usize]
    }

    fn node_data_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.0 as usize]
    }

    pub fn root(&self) -> Node<'_> {
        Node {
            document: self,
            id: NodeId(0),
        }
    }

    pub fn node(&self, id: NodeId) -> Node<'_> {
        Node { document: self, id }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Finds the canonical node for `(tag, id)`.
    pub fn lookup(&self, tag: &str, id: u64) -> Result<Node<'_>, Error> {
        self.tag_index
            .get(tag)
            .and_then(|tag_id| self.canonical.get(&(*tag_id, id)))
            .map(|node| self.node(*node))
            .ok_or_else(|| Error::ReferenceResolution {
                tag: tag.to_owned(),
                id,
            })
    }

    /// All canonical nodes with this tag, in document order.
    pub fn canonical_nodes<'a>(&'a self, tag: &str) -> impl Iterator<Item = Node<'a>> + 'a {
        self.tag_index
            .get(tag)
            .and_then(|tag_id| self.canonical_by_tag.get(tag_id))
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(move |id| self.node(*id))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Node<'a> {
    document: &'a TraceDocument,
    id: NodeId,
}

impl<'a> Node<'a> {
    fn data(&self) -> &'a NodeData {
        self.document.node_data(self.id)
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn tag(&self) -> &'a str {
        &self.document.tags[self.data().tag.0 as usize]
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tag() == tag
    }

    pub fn identity(&self) -> Identity {
        self.data().identity
    }

    pub fn attribute(&self, name: &str) -> Option<&'a str> {
        self.data()
            .attributes
            .iter()
            .find(|(n, _)| &**n == name)
            .map(|(_, v)| &**v)
    }

    pub fn text(&self) -> Option<&'a str> {
        self.data().text.as_deref()
    }

    /// The `fmt` attribute, which holds the exporter's human-readable rendering.
    pub fn formatted(&self) -> Option<&'a str> {
        self.attribute("fmt")
    }

    /// Empty cells are written as `<sentinel/>`.
    pub fn is_sentinel(&self) -> bool {
        self.has_tag("sentinel")
    }

    pub fn children(&self) -> impl Iterator<Item = Node<'a>> + 'a {
        let document = self.document;
        self.data()
            .children
            .iter()
            .map(move |id| Node { document, id: *id })
    }

    /// The first direct child with this tag, not resolved.
    pub fn child(&self, tag: &str) -> Option<Node<'a>> {
        self.children().find(|child| child.has_tag(tag))
    }

    /// All descendants with this tag, in document order.
    pub fn descendants(&self, tag: &'a str) -> impl Iterator<Item = Node<'a>> + 'a {
        let document = self.document;
        (self.id.0 + 1..self.data().subtree_end)
            .map(move |id| Node {
                document,
                id: NodeId(id),
            })
            .filter(move |node| node.has_tag(tag))
    }

    /// Returns the canonical node for this node. Canonical and anonymous nodes
    /// are returned unchanged.
    pub fn resolve(self) -> Result<Node<'a>, Error> {
        match self.identity() {
            Identity::Reference(id) => self.document.lookup(self.tag(), id),
            Identity::Canonical(_) | Identity::Anonymous => Ok(self),
        }
    }

    /// Resolves the first direct child with this tag.
    pub fn resolved_child(&self, tag: &str) -> Result<Option<Node<'a>>, Error> {
        self.child(tag).map(Node::resolve).transpose()
    }
}
