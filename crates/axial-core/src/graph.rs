//! Coding-graph nodes and edges.
//!
//! Every node and edge is tenant-scoped by `project_id`. Codes can be merged
//! into other codes; a merged code keeps a `canonical_pointer` to the code it
//! was folded into (see [`crate::canonical`]).

use serde::{Deserialize, Serialize};

use crate::error::{AxialError, AxialResult};

/// Kinds of node in a coding graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Category,
    Code,
    Fragment,
    Interview,
}

impl NodeType {
    /// The native store node label for this type.
    pub fn label(&self) -> &'static str {
        match self {
            NodeType::Category => "Category",
            NodeType::Code => "Code",
            NodeType::Fragment => "Fragment",
            NodeType::Interview => "Interview",
        }
    }

    /// Lowercase tag used in node keys.
    pub fn tag(&self) -> &'static str {
        match self {
            NodeType::Category => "category",
            NodeType::Code => "code",
            NodeType::Fragment => "fragment",
            NodeType::Interview => "interview",
        }
    }

    /// Parse from a caller-supplied string (case-insensitive).
    pub fn parse(s: &str) -> AxialResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "category" => Ok(Self::Category),
            "code" => Ok(Self::Code),
            "fragment" => Ok(Self::Fragment),
            "interview" => Ok(Self::Interview),
            other => Err(AxialError::invalid_input(format!("unknown node type '{}'", other))),
        }
    }

    /// Pick the node type out of a native label list.
    pub fn from_labels(labels: &[String]) -> Option<Self> {
        labels.iter().find_map(|l| Self::parse(l).ok())
    }
}

/// Lifecycle status of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    #[default]
    Active,
    Merged,
}

impl NodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Active => "active",
            NodeStatus::Merged => "merged",
        }
    }

    /// Stores may hold legacy or empty values; anything but `merged` is active.
    pub fn parse_lenient(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("merged") {
            Self::Merged
        } else {
            Self::Active
        }
    }
}

/// A node of the coding graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub project_id: String,
    pub node_type: NodeType,
    pub name: String,
    pub status: NodeStatus,
    pub canonical_pointer: Option<String>,
}

/// Semantic kind of a relation between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    Causal,
    Conditional,
    Consequential,
    PartOf,
    #[default]
    Associative,
}

impl RelationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::Causal => "causal",
            RelationType::Conditional => "conditional",
            RelationType::Consequential => "consequential",
            RelationType::PartOf => "part_of",
            RelationType::Associative => "associative",
        }
    }

    /// Unknown relation kinds read from a store degrade to `associative`.
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "causal" => Self::Causal,
            "conditional" => Self::Conditional,
            "consequential" => Self::Consequential,
            "part_of" | "partof" => Self::PartOf,
            _ => Self::Associative,
        }
    }
}

/// A directed relation between two nodes of the same project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub project_id: String,
    pub source_id: String,
    pub target_id: String,
    pub relation_type: RelationType,
    pub evidence: Vec<String>,
    pub memo: Option<String>,
}

/// Key identifying a node inside an extracted graph or adjacency index.
pub fn node_key(node_type: NodeType, name: &str) -> String {
    format!("{}:{}", node_type.tag(), name)
}

/// Inverse of [`node_key`].
pub fn split_node_key(key: &str) -> Option<(NodeType, &str)> {
    let (tag, name) = key.split_once(':')?;
    let node_type = NodeType::parse(tag).ok()?;
    if name.is_empty() {
        return None;
    }
    Some((node_type, name))
}
