//! The public entry point: graph construction, merging, and solving wired
//! together.

use std::collections::HashMap;

use logicaffeine_base::Interner;
use serde::{Deserialize, Serialize};

use crate::ast::Program;
use crate::builder::GraphBuilder;
use crate::error::InferenceError;
use crate::graph::TypesGraph;
use crate::merge::merge;
use crate::oracle::SchemaOracle;
use crate::solver::solve;
use crate::vertex::VertexArena;

/// A fully type-inferred program: every vertex in `arena` carries its final
/// inferred type, and `graphs` maps each predicate name to its edge set.
pub struct InferredProgram {
    pub arena: VertexArena,
    pub graphs: HashMap<String, TypesGraph>,
    /// The interner that produced every `Symbol` reachable from `arena` and
    /// `graphs`. Exposed so callers can resolve predicate/field/variable
    /// names back to strings when inspecting the result.
    pub interner: Interner,
}

/// One entry of the serializable edge-list form: the edge's
/// kind, its two endpoint vertex indices, and its source span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugEdge {
    pub edge_kind: &'static str,
    pub left: usize,
    pub right: usize,
    pub bounds: (usize, usize),
}

impl InferredProgram {
    /// The serializable edge-list dump used for debugging, mirroring
    /// `(edge_kind, left_handle, right_handle, bounds)`.
    pub fn debug_edges(&self) -> Vec<DebugEdge> {
        self.graphs
            .values()
            .flat_map(|graph| graph.edges())
            .map(|edge| {
                let (left, right) = edge.endpoints();
                let span = edge.span();
                DebugEdge {
                    edge_kind: edge.kind_name(),
                    left: left.index(),
                    right: right.index(),
                    bounds: (span.start, span.end),
                }
            })
            .collect()
    }
}

/// Runs the full pipeline: build one graph per rule, union by predicate
/// name, link cross-predicate references, then solve to a fixpoint.
pub fn infer(program: &Program, oracle: &dyn SchemaOracle) -> Result<InferredProgram, InferenceError> {
    let mut arena = VertexArena::new();
    let mut interner = Interner::new();

    let mut graphs = {
        let mut builder = GraphBuilder::new(&mut arena, &mut interner);
        builder.run(program)?
    };

    merge(&mut arena, &interner, &mut graphs, oracle)?;
    solve(&mut arena, &interner, &graphs)?;

    Ok(InferredProgram { arena, graphs, interner })
}
