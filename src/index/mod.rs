//! Composite score keys for the secondary edge index.
//!
//! Key layout (space separated, bit-exact):
//!
//! ```text
//! Aout {start} {code} {end}          edges out of a node, best first
//! Ain  {end}   {code} {start}        edges into a node, best first
//! Bout {type} {start} {code} {end}   typed edges out of a node
//! Bin  {type} {end}   {code} {start} typed edges into a node
//! ```
//!
//! `code` is always a descending-polarity ScoreCode, so an ascending scan
//! under a prefix yields the highest-scoring edges first.

use serde::{Deserialize, Serialize};

use crate::codec::{ScoreCode, ScoreCodec};
use crate::model::{EdgeType, NodeId};
use crate::{Error, Result};

/// Anchor role of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Aout,
    Ain,
    Bout,
    Bin,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Aout, Role::Ain, Role::Bout, Role::Bin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Aout => "Aout",
            Role::Ain => "Ain",
            Role::Bout => "Bout",
            Role::Bin => "Bin",
        }
    }

    /// `B*` roles carry the edge type as an extra token.
    pub fn is_typed(&self) -> bool {
        matches!(self, Role::Bout | Role::Bin)
    }

    /// `*out` roles are anchored on the edge start.
    pub fn is_outgoing(&self) -> bool {
        matches!(self, Role::Aout | Role::Bout)
    }

    fn parse(token: &str) -> Result<Self> {
        match token {
            "Aout" => Ok(Role::Aout),
            "Ain" => Ok(Role::Ain),
            "Bout" => Ok(Role::Bout),
            "Bin" => Ok(Role::Bin),
            other => Err(Error::KeyParse(format!("unknown role {other:?}"))),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One persisted index key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScoreKey {
    pub role: Role,
    /// Present exactly when `role.is_typed()`.
    pub edge_type: Option<EdgeType>,
    pub anchor: NodeId,
    pub code: ScoreCode,
    pub peer: NodeId,
}

impl ScoreKey {
    /// Build the key for an edge `start -> end` seen from `role`.
    ///
    /// Fails if an id or the edge type contains whitespace, since such a key
    /// could not be split back into its tokens.
    pub fn for_edge(
        role: Role,
        start: &NodeId,
        end: &NodeId,
        edge_type: &EdgeType,
        score: f64,
    ) -> Result<Self> {
        check_edge_tokens(start, end, edge_type)?;
        Ok(Self::build(role, start, end, edge_type, score))
    }

    /// All four keys of one scored edge.
    pub fn all_for_edge(start: &NodeId, end: &NodeId, edge_type: &EdgeType, score: f64) -> Result<[Self; 4]> {
        check_edge_tokens(start, end, edge_type)?;
        Ok(Role::ALL.map(|role| Self::build(role, start, end, edge_type, score)))
    }

    fn build(role: Role, start: &NodeId, end: &NodeId, edge_type: &EdgeType, score: f64) -> Self {
        let (anchor, peer) = if role.is_outgoing() { (start, end) } else { (end, start) };
        Self {
            role,
            edge_type: role.is_typed().then(|| edge_type.clone()),
            anchor: anchor.clone(),
            code: ScoreCodec::descending().encode(score),
            peer: peer.clone(),
        }
    }

    /// Prefix selecting every key of `role` anchored at `anchor`.
    ///
    /// Ends with a space so `/c/en/cat` does not also match `/c/en/cats`.
    pub fn prefix(role: Role, edge_type: Option<&EdgeType>, anchor: &NodeId) -> Result<String> {
        check_token("anchor", anchor.as_str())?;
        if let Some(t) = edge_type {
            check_token("edge type", t.as_str())?;
        }
        match (role.is_typed(), edge_type) {
            (true, Some(t)) => Ok(format!("{role} {t} {anchor} ")),
            (false, None) => Ok(format!("{role} {anchor} ")),
            (true, None) => Err(Error::KeyParse(format!("{role} keys need an edge type"))),
            (false, Some(_)) => Err(Error::KeyParse(format!("{role} keys carry no edge type"))),
        }
    }

    /// The score this key was built from, to single precision.
    pub fn score(&self) -> f32 {
        ScoreCodec::descending().decode(self.code)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let tokens: Vec<&str> = text.split(' ').collect();
        let role = Role::parse(tokens.first().copied().unwrap_or_default())?;
        let expected = if role.is_typed() { 5 } else { 4 };
        if tokens.len() != expected {
            return Err(Error::KeyParse(format!(
                "{role} key needs {expected} tokens, got {} in {text:?}",
                tokens.len()
            )));
        }
        let rest = &tokens[expected - 3..];
        Ok(Self {
            role,
            edge_type: role.is_typed().then(|| EdgeType::new(tokens[1])),
            anchor: NodeId::new(rest[0]),
            code: ScoreCode::parse(rest[1])?,
            peer: NodeId::new(rest[2]),
        })
    }
}

impl std::fmt::Display for ScoreKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.role)?;
        if let Some(t) = &self.edge_type {
            write!(f, " {t}")?;
        }
        write!(f, " {} {} {}", self.anchor, self.code, self.peer)
    }
}

impl std::str::FromStr for ScoreKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ScoreKey::parse(s)
    }
}

/// A key token must be non-empty and free of whitespace.
fn check_token(what: &str, token: &str) -> Result<()> {
    if token.is_empty() || token.chars().any(char::is_whitespace) {
        return Err(Error::KeyParse(format!("{what} {token:?} cannot be used in a score key")));
    }
    Ok(())
}

fn check_edge_tokens(start: &NodeId, end: &NodeId, edge_type: &EdgeType) -> Result<()> {
    check_token("start", start.as_str())?;
    check_token("end", end.as_str())?;
    check_token("edge type", edge_type.as_str())
}
