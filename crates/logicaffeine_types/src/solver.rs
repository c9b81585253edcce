//! The fixpoint solver: repeatedly applies each edge's
//! propagation step until a full pass makes no change.
//!
//! Termination follows the lattice's finite height per vertex: every
//! `changed` strictly refines at least one vertex, and `intersect` can only
//! move a type towards more information, never back towards `Any`.

use std::collections::HashMap;

use logicaffeine_base::Interner;

use crate::edge::Edge;
use crate::error::InferenceError;
use crate::graph::TypesGraph;
use crate::lattice::{intersect, intersect_list_element, RecordType, Type};
use crate::vertex::{VertexArena, VertexKind};

/// Runs the solver to a fixpoint over every graph's edges.
pub fn solve(
    arena: &mut VertexArena,
    interner: &Interner,
    graphs: &HashMap<String, TypesGraph>,
) -> Result<(), InferenceError> {
    loop {
        let mut changed = false;
        for graph in graphs.values() {
            for edge in graph.edges() {
                changed |= apply_edge(arena, interner, edge)?;
            }
        }
        if !changed {
            return Ok(());
        }
    }
}

fn apply_edge(arena: &mut VertexArena, interner: &Interner, edge: &Edge) -> Result<bool, InferenceError> {
    match edge {
        Edge::Equality(a, b, span) => {
            let ty_a = arena.ty(*a).clone();
            let ty_b = arena.ty(*b).clone();
            let refined = intersect(&ty_a, &ty_b, *span)?;

            let mut changed = false;
            if refined != ty_a {
                arena.set_ty(*a, refined.clone());
                changed = true;
            }
            if refined != ty_b {
                arena.set_ty(*b, refined);
                changed = true;
            }
            Ok(changed)
        }
        Edge::EqualityOfElement { list, element, span } => {
            let mut changed = false;
            let mut list_ty = arena.ty(*list).clone();
            if list_ty.is_any() {
                list_ty = Type::list(Type::Any);
                arena.set_ty(*list, list_ty.clone());
                changed = true;
            }

            let element_ty = arena.ty(*element).clone();
            let refined_element = intersect_list_element(&list_ty, &element_ty, *span)?;
            if refined_element != element_ty {
                arena.set_ty(*element, refined_element.clone());
                changed = true;
            }

            let refined_list = Type::list(refined_element);
            if refined_list != list_ty {
                arena.set_ty(*list, refined_list);
                changed = true;
            }
            Ok(changed)
        }
        Edge::FieldBelonging { record, subscript, span } => {
            let mut changed = false;
            let mut record_ty = arena.ty(*record).clone();
            if record_ty.is_any() {
                record_ty = Type::empty_open_record();
                arena.set_ty(*record, record_ty.clone());
                changed = true;
            }

            let record_type = match &record_ty {
                Type::Record(record_type) => record_type.clone(),
                other => {
                    return Err(InferenceError::TypeConflict {
                        message: format!("cannot match {other} and record"),
                        span: *span,
                    })
                }
            };

            let field_name = match &arena.get(*subscript).kind {
                VertexKind::SubscriptAddressing { field, .. } => interner.resolve(*field).to_string(),
                other => {
                    return Err(InferenceError::UnsupportedConstruct {
                        description: format!("FieldBelonging edge whose subscript endpoint is {other:?}"),
                        span: *span,
                    })
                }
            };
            let subscript_ty = arena.ty(*subscript).clone();

            match record_type.fields.get(&field_name) {
                Some(existing) => {
                    let refined = intersect(existing, &subscript_ty, *span)?;
                    if &refined != existing {
                        let mut fields = record_type.fields.clone();
                        fields.insert(field_name, refined.clone());
                        arena.set_ty(*record, Type::Record(RecordType { fields, openness: record_type.openness }));
                        changed = true;
                    }
                    if refined != subscript_ty {
                        arena.set_ty(*subscript, refined);
                        changed = true;
                    }
                }
                None => {
                    let mut fields = record_type.fields.clone();
                    fields.insert(field_name, subscript_ty);
                    arena.set_ty(*record, Type::Record(RecordType { fields, openness: record_type.openness }));
                    changed = true;
                }
            }
            Ok(changed)
        }
        Edge::PredicateArgument { .. } => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logicaffeine_base::Span;

    fn graph_of(edges: Vec<Edge>) -> HashMap<String, TypesGraph> {
        let mut graph = TypesGraph::new();
        for edge in edges {
            graph.connect(edge);
        }
        let mut graphs = HashMap::new();
        graphs.insert("Q".to_string(), graph);
        graphs
    }

    #[test]
    fn equality_propagates_known_type_to_unknown_side() {
        let mut arena = VertexArena::new();
        let interner = Interner::new();
        let a = arena.push(VertexKind::NumberLiteral, Type::Number);
        let b = arena.push_any(VertexKind::Variable { name: Default::default() });

        let graphs = graph_of(vec![Edge::Equality(a, b, Span::default())]);
        solve(&mut arena, &interner, &graphs).unwrap();

        assert_eq!(arena.ty(b), &Type::Number);
    }

    #[test]
    fn equality_of_element_seeds_list_any() {
        let mut arena = VertexArena::new();
        let interner = Interner::new();
        let list = arena.push_any(VertexKind::Variable { name: Default::default() });
        let element = arena.push(VertexKind::NumberLiteral, Type::Number);

        let graphs = graph_of(vec![Edge::EqualityOfElement { list, element, span: Span::default() }]);
        solve(&mut arena, &interner, &graphs).unwrap();

        assert_eq!(arena.ty(list), &Type::list(Type::Number));
    }

    #[test]
    fn field_belonging_seeds_open_record_and_inserts_field() {
        let mut arena = VertexArena::new();
        let mut interner = Interner::new();
        let a_field = interner.intern("a");

        let record = arena.push_any(VertexKind::Variable { name: Default::default() });
        let subscript = arena.push_any(VertexKind::SubscriptAddressing { record, field: a_field });
        arena.set_ty(subscript, Type::String);

        let graphs = graph_of(vec![Edge::FieldBelonging { record, subscript, span: Span::default() }]);
        solve(&mut arena, &interner, &graphs).unwrap();

        let record_type = arena.ty(record).as_record().unwrap();
        assert_eq!(record_type.fields.get("a"), Some(&Type::String));
    }

    #[test]
    fn conflicting_equality_aborts_with_type_conflict() {
        let mut arena = VertexArena::new();
        let interner = Interner::new();
        let a = arena.push(VertexKind::NumberLiteral, Type::Number);
        let b = arena.push(VertexKind::StringLiteral, Type::String);

        let graphs = graph_of(vec![Edge::Equality(a, b, Span::default())]);
        assert!(solve(&mut arena, &interner, &graphs).is_err());
    }

    #[test]
    fn solving_twice_is_idempotent() {
        let mut arena = VertexArena::new();
        let interner = Interner::new();
        let a = arena.push(VertexKind::NumberLiteral, Type::Number);
        let b = arena.push_any(VertexKind::Variable { name: Default::default() });

        let graphs = graph_of(vec![Edge::Equality(a, b, Span::default())]);
        solve(&mut arena, &interner, &graphs).unwrap();
        solve(&mut arena, &interner, &graphs).unwrap();

        assert_eq!(arena.ty(b), &Type::Number);
    }
}
