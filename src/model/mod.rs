//! # Justification Graph Model
//!
//! Plain data shared by the codec, the engine and the storage layer.
//! No I/O, no locking, no async in here.

pub mod node;
pub mod edge;
pub mod score_table;

pub use node::{NodeId, NodeKind, conjunction_id, ROOT_ID, CONJUNCTION_PREFIX};
pub use edge::{Edge, EdgeKey, EdgeType};
pub use score_table::{ScoreMap, ScoreTable};
