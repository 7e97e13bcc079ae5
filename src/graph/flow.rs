//! Edmonds–Karp max-flow (§4.4 step 4): BFS for the shortest augmenting path
//! by edge count, augment by the bottleneck, repeat until no path remains.

use super::Graph;
use crate::error::Result;

/// Run Edmonds–Karp from `source` to `sink` on `graph`, mutating its edge
/// flows in place. Returns the total flow pushed across this call.
///
/// Any flow already present on the graph (e.g. from a previously-committed
/// priority class, per §4.4 step 5) is treated as a sunk cost: augmenting
/// paths are only ever sought in the *current* residual graph, so earlier
/// commitments are never revisited or reduced by this call.
pub fn edmonds_karp(graph: &mut Graph, source: &str, sink: &str) -> Result<f64> {
    let mut total = 0.0;
    loop {
        let Some(parent) = graph.bfs_residual(source, sink) else {
            break;
        };
        let path = graph.reconstruct_path(&parent, source, sink);
        if path.is_empty() {
            break;
        }
        let bottleneck = graph.bottleneck(&path);
        if !bottleneck.is_finite() || bottleneck <= 1e-9 {
            break;
        }
        for edge_id in &path {
            graph.push_flow(*edge_id, bottleneck)?;
        }
        total += bottleneck;
    }
    Ok(total)
}
