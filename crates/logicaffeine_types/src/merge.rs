//! Links call-site vertices across predicate graphs.
//!
//! Every `PredicateAddressing(P, f, u)` vertex whose predicate `P` differs
//! from the graph that owns it is a reference to some other predicate's
//! field — either one defined in the same program (resolved by linking to
//! that predicate's own canonical, usage-0 field vertex) or an external one
//! resolved through the [`SchemaOracle`]. The `predicate_name != owner`
//! guard exists to avoid self-cross-linkage, but may be insufficient for
//! mutually recursive predicates; this implementation carries that guard
//! forward unchanged rather than attempting to fix it.

use std::collections::HashMap;

use logicaffeine_base::{Interner, Span, Symbol};

use crate::edge::Edge;
use crate::error::InferenceError;
use crate::graph::TypesGraph;
use crate::lattice::Type;
use crate::oracle::SchemaOracle;
use crate::vertex::{VertexArena, VertexId, VertexKind};

enum Resolution {
    Local { canonical: VertexId },
    External { ty: Type },
}

struct Link {
    owner: String,
    referencing: VertexId,
    resolution: Resolution,
}

/// Walks every graph, resolves foreign `PredicateAddressing` vertices, and
/// applies the resulting cross-graph edges / direct type assignments.
pub fn merge(
    arena: &mut VertexArena,
    interner: &Interner,
    graphs: &mut HashMap<String, TypesGraph>,
    oracle: &dyn SchemaOracle,
) -> Result<(), InferenceError> {
    let links = plan_links(arena, interner, graphs, oracle)?;

    for link in links {
        match link.resolution {
            Resolution::Local { canonical } => {
                let graph = graphs
                    .get_mut(&link.owner)
                    .expect("owner graph was discovered by iterating `graphs`");
                graph.connect(Edge::Equality(link.referencing, canonical, Span::default()));
            }
            Resolution::External { ty } => {
                arena.set_ty(link.referencing, ty);
            }
        }
    }

    Ok(())
}

fn plan_links(
    arena: &VertexArena,
    interner: &Interner,
    graphs: &HashMap<String, TypesGraph>,
    oracle: &dyn SchemaOracle,
) -> Result<Vec<Link>, InferenceError> {
    let mut links = Vec::new();

    for (owner_name, graph) in graphs {
        for vertex_id in graph.vertices() {
            let vertex = arena.get(vertex_id);
            let (predicate, field) = match &vertex.kind {
                VertexKind::PredicateAddressing { predicate, field, .. } => (*predicate, *field),
                _ => continue,
            };
            if !vertex.ty.is_any() {
                continue;
            }
            let predicate_name = interner.resolve(predicate);
            if predicate_name == owner_name {
                continue;
            }

            let resolution = if let Some(target_graph) = graphs.get(predicate_name) {
                let canonical = find_canonical_field(arena, target_graph, predicate, field)
                    .ok_or_else(|| unresolved(predicate_name))?;
                Resolution::Local { canonical }
            } else {
                let field_name = interner.resolve(field);
                let columns = oracle.columns(predicate_name).ok_or_else(|| unresolved(predicate_name))?;
                let ty = columns.get(field_name).cloned().ok_or_else(|| unresolved(predicate_name))?;
                Resolution::External { ty }
            };

            links.push(Link { owner: owner_name.clone(), referencing: vertex_id, resolution });
        }
    }

    Ok(links)
}

fn unresolved(predicate_name: &str) -> InferenceError {
    InferenceError::UnresolvedPredicate {
        predicate_name: predicate_name.to_string(),
        span: Span::default(),
    }
}

/// Finds `predicate`'s own field vertex for `field` at usage index 0 — its
/// canonical handle, since head fields are always addressed at usage 0.
/// The builder caches head-field vertices by `(predicate, field)` across
/// every rule that defines `predicate`, so at most one vertex in
/// `target_graph` can match here; `.find()` never has to arbitrate between
/// candidates.
fn find_canonical_field(
    arena: &VertexArena,
    target_graph: &TypesGraph,
    predicate: Symbol,
    field: Symbol,
) -> Option<VertexId> {
    target_graph.vertices().find(|&vertex_id| {
        matches!(
            &arena.get(vertex_id).kind,
            VertexKind::PredicateAddressing { predicate: p, field: f, usage: 0 }
                if *p == predicate && *f == field
        )
    })
}
