//! Structural type descriptors.
//!
//! A [`TypeDescriptor`] is either a [`NodeType`] (a scalar or a single-child
//! container such as `array(int)` or `[2]int`) or a [`MapType`]
//! (`map(K, V)`). Descriptors own their children outright, so every tree is
//! finite and acyclic.
//!
//! The `Display` output is the textual form the type parser accepts, which is
//! what lets a flattened type be re-parsed into a tree.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Base kind of array descriptors.
pub const ARRAY_KIND: &str = "array";
/// Base kind reported for map descriptors.
pub const MAP_KIND: &str = "map";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum TypeDescriptor {
    Node(NodeType),
    Map(MapType),
}

impl TypeDescriptor {
    /// Base kind name: the node's kind, or `map`.
    pub fn kind_name(&self) -> &str {
        match self {
            TypeDescriptor::Node(node) => &node.kind,
            TypeDescriptor::Map(_) => MAP_KIND,
        }
    }

    pub fn as_node(&self) -> Option<&NodeType> {
        match self {
            TypeDescriptor::Node(node) => Some(node),
            TypeDescriptor::Map(_) => None,
        }
    }

    pub fn into_node(self) -> Option<NodeType> {
        match self {
            TypeDescriptor::Node(node) => Some(node),
            TypeDescriptor::Map(_) => None,
        }
    }
}

impl From<NodeType> for TypeDescriptor {
    fn from(node: NodeType) -> Self {
        TypeDescriptor::Node(node)
    }
}

impl From<MapType> for TypeDescriptor {
    fn from(map: MapType) -> Self {
        TypeDescriptor::Map(map)
    }
}

/// A scalar or single-child container type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeType {
    pub kind: String,
    /// Fixed capacity, kept as written (`"2"` for `[2]int`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child: Option<Box<NodeType>>,
}

impl NodeType {
    /// A leaf type such as `int` or `string`.
    pub fn scalar(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            size: None,
            child: None,
        }
    }

    /// `array(child)`.
    pub fn array(child: NodeType) -> Self {
        Self {
            kind: ARRAY_KIND.to_string(),
            size: None,
            child: Some(Box::new(child)),
        }
    }

    /// `[size]child`.
    pub fn sized_array(size: impl Into<String>, child: NodeType) -> Self {
        Self {
            size: Some(size.into()),
            ..Self::array(child)
        }
    }

    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self
    }

    pub fn with_child(mut self, child: NodeType) -> Self {
        self.child = Some(Box::new(child));
        self
    }

    pub fn child(&self) -> Option<&NodeType> {
        self.child.as_deref()
    }
}

/// Nesting depth of a node type: `int` is 0, `array(int)` is 1,
/// `array(array(int))` is 2.
pub fn count_child_types(node: &NodeType) -> usize {
    let mut depth = 0;
    let mut current = node;
    while let Some(child) = current.child() {
        depth += 1;
        current = child;
    }
    depth
}

/// A key/value type. Either side may be unknown.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MapType {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<Box<TypeDescriptor>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<Box<TypeDescriptor>>,
}

impl MapType {
    pub fn new(left: impl Into<TypeDescriptor>, right: impl Into<TypeDescriptor>) -> Self {
        Self {
            left: Some(Box::new(left.into())),
            right: Some(Box::new(right.into())),
        }
    }

    pub fn left(&self) -> Option<&TypeDescriptor> {
        self.left.as_deref()
    }

    pub fn right(&self) -> Option<&TypeDescriptor> {
        self.right.as_deref()
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(size) = &self.size {
            write!(f, "[{size}]")?;
            if self.kind == ARRAY_KIND {
                if let Some(child) = &self.child {
                    return write!(f, "{child}");
                }
            }
        }
        match &self.child {
            Some(child) => write!(f, "{}({})", self.kind, child),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl fmt::Display for MapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.left.is_none() && self.right.is_none() {
            return write!(f, "{MAP_KIND}");
        }
        write!(f, "{MAP_KIND}(")?;
        if let Some(left) = &self.left {
            write!(f, "{left}")?;
        }
        write!(f, ", ")?;
        if let Some(right) = &self.right {
            write!(f, "{right}")?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Node(node) => write!(f, "{node}"),
            TypeDescriptor::Map(map) => write!(f, "{map}"),
        }
    }
}
