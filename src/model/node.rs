//! Node identity in the justification graph.

use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Error, Result};

/// Id of the distinguished root node. It always has value 1.
pub const ROOT_ID: &str = "/";

/// Ids under this prefix denote conjunction nodes.
pub const CONJUNCTION_PREFIX: &str = "/and/";

/// How a node aggregates incoming justification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeKind {
    /// OR-aggregation: incoming contributions are summed.
    Ordinary,
    /// AND-aggregation: incoming premises are combined in parallel.
    Conjunction,
}

impl NodeKind {
    /// Classify a URI by its namespace.
    pub fn classify(uri: &str) -> Self {
        if uri.starts_with(CONJUNCTION_PREFIX) {
            NodeKind::Conjunction
        } else {
            NodeKind::Ordinary
        }
    }
}

/// Node identifier: a URI plus the kind resolved from it at construction.
///
/// The kind is derived exactly once, so the propagation rounds never
/// re-inspect the id string to pick an aggregation rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    uri: Arc<str>,
    kind: NodeKind,
}

impl NodeId {
    pub fn new(uri: impl AsRef<str>) -> Self {
        let uri = uri.as_ref();
        Self {
            kind: NodeKind::classify(uri),
            uri: Arc::from(uri),
        }
    }

    pub fn root() -> Self {
        Self::new(ROOT_ID)
    }

    pub fn as_str(&self) -> &str {
        &self.uri
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_root(&self) -> bool {
        &*self.uri == ROOT_ID
    }

    pub fn is_conjunction(&self) -> bool {
        self.kind == NodeKind::Conjunction
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.uri)
    }
}

impl From<&str> for NodeId {
    fn from(uri: &str) -> Self {
        NodeId::new(uri)
    }
}

impl From<String> for NodeId {
    fn from(uri: String) -> Self {
        NodeId::new(uri)
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.uri)
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let uri = String::deserialize(deserializer)?;
        Ok(NodeId::new(uri))
    }
}

/// Build the id of the conjunction of `sources`.
///
/// A single source is returned as given. Two or more are sorted and
/// de-duplicated, then each is written as a `/`-delimited segment inside
/// `/and/[...]`.
///
/// ```
/// use justify_graph::model::conjunction_id;
///
/// let id = conjunction_id(["/s/rule/parser", "/s/contributor/omcs/dev"]).unwrap();
/// assert_eq!(id.as_str(), "/and/[/s/contributor/omcs/dev/,/s/rule/parser/]");
/// assert!(id.is_conjunction());
/// ```
pub fn conjunction_id<I, T>(sources: I) -> Result<NodeId>
where
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    let mut sources: Vec<String> = sources.into_iter().map(|s| s.as_ref().to_string()).collect();

    match sources.len() {
        0 => Err(Error::Config("a conjunction needs at least one source".into())),
        1 => Ok(NodeId::new(&sources[0])),
        _ => {
            sources.sort();
            sources.dedup();
            let mut uri = String::from("/and/[");
            for (i, source) in sources.iter().enumerate() {
                if i > 0 {
                    uri.push(',');
                }
                uri.push('/');
                uri.push_str(source.trim_matches('/'));
                uri.push('/');
            }
            uri.push(']');
            Ok(NodeId::new(uri))
        }
    }
}
