//! JSON-lines dump of committed score tables.
//!
//! One object per node, justification table first, then conjunctions:
//!
//! ```text
//! {"collection":"justification","id":"/","value":1.0,"code":"c07fffff"}
//! {"collection":"conjunctions","id":"/and/[/a/,/b/]","value":0.2,"code":"c1b33332"}
//! ```
//!
//! Rows within a collection are sorted by code, i.e. best score first.

use std::io::Write;

use serde::Serialize;

use crate::codec::{ScoreCode, ScoreCodec};
use crate::model::NodeId;
use crate::storage::{Collection, GraphStore};
use crate::Result;

#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    collection: &'a str,
    id: &'a NodeId,
    value: f64,
    code: ScoreCode,
}

/// Write the justification and conjunction tables of `store` to `writer`.
///
/// Returns the number of rows written.
pub async fn export_scores_jsonl<S: GraphStore>(store: &S, writer: &mut dyn Write) -> Result<usize> {
    let codec = ScoreCodec::descending();
    let mut written = 0;

    for collection in [Collection::Justification, Collection::Conjunctions] {
        let scores = store.load_scores(&collection).await?;
        let mut rows: Vec<ExportRow<'_>> = scores
            .iter()
            .map(|(id, value)| ExportRow {
                collection: collection.name(),
                id,
                value: *value,
                code: codec.encode(*value),
            })
            .collect();
        rows.sort_by(|a, b| a.code.cmp(&b.code).then_with(|| a.id.cmp(b.id)));

        for row in &rows {
            serde_json::to_writer(&mut *writer, row)?;
            writeln!(writer)?;
        }
        written += rows.len();
    }

    Ok(written)
}
