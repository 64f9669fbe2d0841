//! Weighted evidential edges.

use serde::{Deserialize, Serialize};
use super::NodeId;

/// Type tag of an edge.
///
/// `Conjunct` edges feed a conjunction node and have their effective weight
/// derived each round; every other relation uses its stored weight.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EdgeType {
    Conjunct,
    Relation(String),
}

impl EdgeType {
    pub fn new(name: impl AsRef<str>) -> Self {
        match name.as_ref() {
            "conjunct" => EdgeType::Conjunct,
            other => EdgeType::Relation(other.to_string()),
        }
    }

    pub fn justifies() -> Self {
        EdgeType::Relation("justifies".into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            EdgeType::Conjunct => "conjunct",
            EdgeType::Relation(name) => name,
        }
    }

    pub fn is_conjunct(&self) -> bool {
        matches!(self, EdgeType::Conjunct)
    }
}

impl std::fmt::Display for EdgeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for EdgeType {
    fn from(name: &str) -> Self {
        EdgeType::new(name)
    }
}

impl Serialize for EdgeType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EdgeType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(EdgeType::new(name))
    }
}

/// A directed evidential edge.
///
/// Parallel edges between the same pair are allowed as long as their types
/// differ. A missing, zero, negative or non-finite weight keeps the edge out
/// of propagation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub start: NodeId,
    pub end: NodeId,
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
    #[serde(default)]
    pub weight: Option<f64>,
}

impl Edge {
    pub fn new(
        start: impl Into<NodeId>,
        end: impl Into<NodeId>,
        edge_type: impl Into<EdgeType>,
        weight: f64,
    ) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
            edge_type: edge_type.into(),
            weight: Some(weight),
        }
    }

    /// A `conjunct` edge from a premise into a conjunction node.
    pub fn conjunct(start: impl Into<NodeId>, end: impl Into<NodeId>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
            edge_type: EdgeType::Conjunct,
            weight: None,
        }
    }

    /// The root's guaranteed self-loop.
    pub fn root_loop() -> Self {
        Edge::new(NodeId::root(), NodeId::root(), EdgeType::justifies(), 1.0)
    }

    pub fn key(&self) -> EdgeKey {
        EdgeKey {
            edge_type: self.edge_type.clone(),
            start: self.start.clone(),
            end: self.end.clone(),
        }
    }

    /// The stored weight, if it is usable for propagation.
    pub fn usable_weight(&self) -> Option<f64> {
        self.weight.filter(|w| w.is_finite() && *w > 0.0)
    }
}

/// Identity of an edge for "last write wins" materialization.
///
/// Text form is `"{type} {start} {end}"`, e.g. `"justifies / /"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeKey {
    pub edge_type: EdgeType,
    pub start: NodeId,
    pub end: NodeId,
}

impl EdgeKey {
    pub fn is_self_loop(&self) -> bool {
        self.start == self.end
    }
}

impl std::fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.edge_type, self.start, self.end)
    }
}
