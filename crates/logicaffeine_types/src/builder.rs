//! Builds one [`TypesGraph`] per rule, then unions graphs by predicate name.
//!
//! Grounded on `original_source/type_inference/types_graph_builder.py`'s
//! `TypesGraphBuilder`: `Run`/`TraverseTree`/`FillField`/`FillConjunct`/
//! `FillFields`/`ConvertExpression`/`ConvertLiteralExpression`, adapted to
//! write into a shared [`VertexArena`] instead of building detached
//! expression objects.

use std::collections::{BTreeMap, HashMap};

use logicaffeine_base::{Interner, Span, Symbol};

use crate::ast;
use crate::edge::Edge;
use crate::error::InferenceError;
use crate::graph::TypesGraph;
use crate::lattice::{intersect, Type};
use crate::vertex::{VertexArena, VertexId, VertexKind};

const LOGICA_VALUE: &str = "logica_value";

/// Per-run scratch state plus the shared arena and interner it writes into.
///
/// `predicate_usages`, `variables`, and `subscripts` are reset at the start
/// of every rule, since usage indices and variable scope are per-rule.
/// `if_statements_counter` and `head_fields` are not reset between rules:
/// `head_fields` is what lets multiple rules defining the same predicate
/// share one `PredicateAddressing(P, f, 0)` vertex per field instead of each
/// allocating its own, so their constraints on that field actually meet at
/// solve time instead of living in disconnected vertices.
pub struct GraphBuilder<'a> {
    arena: &'a mut VertexArena,
    interner: &'a mut Interner,
    predicate_usages: HashMap<Symbol, usize>,
    variables: HashMap<Symbol, VertexId>,
    subscripts: HashMap<(VertexId, Symbol), VertexId>,
    head_fields: HashMap<(Symbol, Symbol), VertexId>,
    if_statements_counter: usize,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(arena: &'a mut VertexArena, interner: &'a mut Interner) -> Self {
        Self {
            arena,
            interner,
            predicate_usages: HashMap::new(),
            variables: HashMap::new(),
            subscripts: HashMap::new(),
            head_fields: HashMap::new(),
            if_statements_counter: 0,
        }
    }

    fn reset_rule_state(&mut self) {
        self.predicate_usages.clear();
        self.variables.clear();
        self.subscripts.clear();
    }

    fn usage_for(&mut self, predicate: Symbol) -> usize {
        *self.predicate_usages.entry(predicate).or_insert(0)
    }

    fn bump_usage(&mut self, predicate: Symbol) {
        *self.predicate_usages.entry(predicate).or_insert(0) += 1;
    }

    fn variable_vertex(&mut self, name: &str) -> VertexId {
        let symbol = self.interner.intern(name);
        if let Some(&id) = self.variables.get(&symbol) {
            return id;
        }
        let id = self.arena.push_any(VertexKind::Variable { name: symbol });
        self.variables.insert(symbol, id);
        id
    }

    /// Builds one graph per rule and unions them by head predicate name.
    pub fn run(&mut self, program: &ast::Program) -> Result<HashMap<String, TypesGraph>, InferenceError> {
        let mut graphs: HashMap<String, TypesGraph> = HashMap::new();
        for rule in &program.rule {
            let predicate_name = rule.head.predicate_name.clone();
            let graph = self.traverse_tree(&predicate_name, rule)?;
            graphs.entry(predicate_name).or_default().union(graph);
        }
        Ok(graphs)
    }

    fn traverse_tree(&mut self, predicate_name: &str, rule: &ast::Rule) -> Result<TypesGraph, InferenceError> {
        self.reset_rule_state();
        let mut graph = TypesGraph::new();
        let predicate_symbol = self.interner.intern(predicate_name);

        for field in &rule.head.record.field_value {
            self.fill_field(&mut graph, predicate_symbol, field)?;
        }

        if let Some(body) = &rule.body {
            for conjunct in &body.conjunction.conjunct {
                self.fill_conjunct(&mut graph, conjunct)?;
            }
        }

        Ok(graph)
    }

    fn fill_field(
        &mut self,
        graph: &mut TypesGraph,
        predicate_symbol: Symbol,
        field: &ast::FieldValue,
    ) -> Result<(), InferenceError> {
        let field_symbol = self.interner.intern(&field.field.normalized_name());
        let usage = self.usage_for(predicate_symbol);
        let key = (predicate_symbol, field_symbol);
        let addressing = match self.head_fields.get(&key) {
            Some(&existing) => existing,
            None => {
                let id = self.arena.push_any(VertexKind::PredicateAddressing {
                    predicate: predicate_symbol,
                    field: field_symbol,
                    usage,
                });
                self.head_fields.insert(key, id);
                id
            }
        };

        let value = match &field.value {
            ast::Value::Aggregation { aggregation } => {
                self.convert_expression(graph, &aggregation.expression)?
            }
            ast::Value::Expression { expression } => self.convert_expression(graph, expression)?,
        };

        graph.connect(Edge::Equality(addressing, value, Span::default()));
        Ok(())
    }

    fn fill_conjunct(&mut self, graph: &mut TypesGraph, conjunct: &ast::Conjunct) -> Result<(), InferenceError> {
        match conjunct {
            ast::Conjunct::Unification { unification } => {
                let lhs = self.convert_expression(graph, &unification.left_hand_side)?;
                let rhs = self.convert_expression(graph, &unification.right_hand_side)?;
                graph.connect(Edge::Equality(lhs, rhs, Span::default()));
            }
            ast::Conjunct::Inclusion { inclusion } => {
                let list = self.convert_expression(graph, &inclusion.list)?;
                let element = self.convert_expression(graph, &inclusion.element)?;
                graph.connect(Edge::EqualityOfElement { list, element, span: Span::default() });
            }
            ast::Conjunct::Predicate { predicate } => {
                let predicate_symbol = self.interner.intern(&predicate.predicate_name);
                let usage = self.usage_for(predicate_symbol);
                self.fill_fields(graph, predicate_symbol, usage, &predicate.record, None)?;
                self.bump_usage(predicate_symbol);
            }
        }
        Ok(())
    }

    /// Fills the argument fields of one predicate invocation. `result`, if
    /// present, is the call-expression's own result vertex — every argument
    /// field is linked to it via [`Edge::PredicateArgument`].
    fn fill_fields(
        &mut self,
        graph: &mut TypesGraph,
        predicate_symbol: Symbol,
        usage: usize,
        record: &ast::Record,
        result: Option<VertexId>,
    ) -> Result<(), InferenceError> {
        for field in &record.field_value {
            let ast::Value::Expression { expression } = &field.value else {
                return Err(InferenceError::UnsupportedConstruct {
                    description: "aggregation in a predicate invocation's arguments".to_string(),
                    span: Span::default(),
                });
            };
            let value = self.convert_expression(graph, expression)?;
            let field_symbol = self.interner.intern(&field.field.normalized_name());
            let predicate_field = self.arena.push_any(VertexKind::PredicateAddressing {
                predicate: predicate_symbol,
                field: field_symbol,
                usage,
            });
            graph.connect(Edge::Equality(predicate_field, value, Span::default()));

            if let Some(result) = result {
                graph.connect(Edge::PredicateArgument { result, arg: predicate_field, span: Span::default() });
            }
        }
        Ok(())
    }

    fn convert_expression(
        &mut self,
        graph: &mut TypesGraph,
        expression: &ast::Expression,
    ) -> Result<VertexId, InferenceError> {
        match expression {
            ast::Expression::Literal { literal } => self.convert_literal_expression(graph, literal),
            ast::Expression::Variable { variable } => Ok(self.variable_vertex(&variable.var_name)),
            ast::Expression::Call { call } => {
                let predicate_symbol = self.interner.intern(&call.predicate_name);
                let usage = self.usage_for(predicate_symbol);
                let value_symbol = self.interner.intern(LOGICA_VALUE);
                let result = self.arena.push_any(VertexKind::PredicateAddressing {
                    predicate: predicate_symbol,
                    field: value_symbol,
                    usage,
                });
                self.fill_fields(graph, predicate_symbol, usage, &call.record, Some(result))?;
                self.bump_usage(predicate_symbol);
                Ok(result)
            }
            ast::Expression::Subscript { subscript } => {
                let record = self.convert_expression(graph, &subscript.record)?;
                let field_name = Self::subscript_field_name(&subscript.subscript)?;
                let field_symbol = self.interner.intern(&field_name);
                let key = (record, field_symbol);
                if let Some(&existing) = self.subscripts.get(&key) {
                    return Ok(existing);
                }
                let result = self.arena.push_any(VertexKind::SubscriptAddressing {
                    record,
                    field: field_symbol,
                });
                self.subscripts.insert(key, result);
                graph.connect(Edge::FieldBelonging { record, subscript: result, span: Span::default() });
                Ok(result)
            }
            ast::Expression::Record { record } => {
                let mut fields = BTreeMap::new();
                let mut type_fields = BTreeMap::new();
                for field in &record.field_value {
                    let ast::Value::Expression { expression } = &field.value else {
                        return Err(InferenceError::UnsupportedConstruct {
                            description: "aggregation inside a record literal".to_string(),
                            span: Span::default(),
                        });
                    };
                    let value = self.convert_expression(graph, expression)?;
                    let name = field.field.normalized_name();
                    type_fields.insert(name.clone(), self.arena.ty(value).clone());
                    fields.insert(name, value);
                }
                let literal_ty = Type::closed_record(type_fields);
                Ok(self.arena.push(VertexKind::RecordLiteral { fields }, literal_ty))
            }
            ast::Expression::Implication { implication } => {
                let inner_name = format!("_IfNode{}", self.if_statements_counter);
                self.if_statements_counter += 1;
                let inner = self.variable_vertex(&inner_name);

                let otherwise = self.convert_expression(graph, &implication.otherwise)?;
                graph.connect(Edge::Equality(inner, otherwise, Span::default()));

                for branch in &implication.if_then {
                    self.convert_expression(graph, &branch.condition)?;
                    let value = self.convert_expression(graph, &branch.consequence)?;
                    graph.connect(Edge::Equality(inner, value, Span::default()));
                }

                Ok(inner)
            }
        }
    }

    fn subscript_field_name(subscript: &ast::Expression) -> Result<String, InferenceError> {
        match subscript {
            ast::Expression::Literal { literal: ast::Literal::TheSymbol { the_symbol } } => {
                Ok(the_symbol.symbol.clone())
            }
            _ => Err(InferenceError::UnsupportedConstruct {
                description: "subscript field that is not a symbol literal".to_string(),
                span: Span::default(),
            }),
        }
    }

    /// Computes the type of a literal expression, eagerly for lists and
    /// records (no additional graph edges).
    fn convert_literal_expression(
        &mut self,
        graph: &mut TypesGraph,
        literal: &ast::Literal,
    ) -> Result<VertexId, InferenceError> {
        match literal {
            ast::Literal::TheString { .. } => Ok(self.arena.push(VertexKind::StringLiteral, Type::String)),
            ast::Literal::TheNumber { .. } => Ok(self.arena.push(VertexKind::NumberLiteral, Type::Number)),
            ast::Literal::TheBool { .. } => Ok(self.arena.push(VertexKind::BooleanLiteral, Type::Bool)),
            ast::Literal::TheNull { .. } => Ok(self.arena.push(VertexKind::NullLiteral, Type::Null)),
            ast::Literal::TheSymbol { .. } => Err(InferenceError::UnsupportedConstruct {
                description: "symbol literal used outside of a subscript".to_string(),
                span: Span::default(),
            }),
            ast::Literal::TheList { the_list } => {
                let mut elements = Vec::with_capacity(the_list.element.len());
                let mut element_ty = Type::Any;
                for expression in &the_list.element {
                    let id = self.convert_expression(graph, expression)?;
                    element_ty = intersect(&element_ty, self.arena.ty(id), Span::default())?;
                    elements.push(id);
                }
                Ok(self
                    .arena
                    .push(VertexKind::ListLiteral { elements }, Type::list(element_ty)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program_from(json: &str) -> ast::Program {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn head_field_usage_index_is_always_zero() {
        let program = program_from(
            r#"{"rule":[{
                "head":{"predicate_name":"Q","record":{"field_value":[
                    {"field":0,"value":{"expression":{"variable":{"var_name":"x"}}}}
                ]}},
                "body": null
            }]}"#,
        );
        let mut arena = VertexArena::new();
        let mut interner = Interner::new();
        let mut builder = GraphBuilder::new(&mut arena, &mut interner);
        let graphs = builder.run(&program).unwrap();
        let graph = &graphs["Q"];
        assert_eq!(graph.edges().len(), 1);
    }

    #[test]
    fn repeated_variable_in_one_rule_shares_a_vertex() {
        let program = program_from(
            r#"{"rule":[{
                "head":{"predicate_name":"Q","record":{"field_value":[
                    {"field":0,"value":{"expression":{"variable":{"var_name":"x"}}}}
                ]}},
                "body": {"conjunction":{"conjunct":[
                    {"predicate":{"predicate_name":"T","record":{"field_value":[
                        {"field":0,"value":{"expression":{"variable":{"var_name":"x"}}}}
                    ]}}},
                    {"predicate":{"predicate_name":"Num","record":{"field_value":[
                        {"field":0,"value":{"expression":{"variable":{"var_name":"x"}}}}
                    ]}}}
                ]}}
            }]}"#,
        );
        let mut arena = VertexArena::new();
        let mut interner = Interner::new();
        let mut builder = GraphBuilder::new(&mut arena, &mut interner);
        let graphs = builder.run(&program).unwrap();
        let graph = &graphs["Q"];
        assert_eq!(graph.edges().len(), 3);
    }

    #[test]
    fn repeated_predicate_calls_in_one_rule_get_distinct_usage_indices() {
        let program = program_from(
            r#"{"rule":[{
                "head":{"predicate_name":"Q","record":{"field_value":[
                    {"field":0,"value":{"expression":{"variable":{"var_name":"x"}}}}
                ]}},
                "body": {"conjunction":{"conjunct":[
                    {"predicate":{"predicate_name":"T","record":{"field_value":[
                        {"field":0,"value":{"expression":{"variable":{"var_name":"x"}}}}
                    ]}}},
                    {"predicate":{"predicate_name":"T","record":{"field_value":[
                        {"field":0,"value":{"expression":{"variable":{"var_name":"y"}}}}
                    ]}}}
                ]}}
            }]}"#,
        );
        let mut arena = VertexArena::new();
        let mut interner = Interner::new();
        let mut builder = GraphBuilder::new(&mut arena, &mut interner);
        let graphs = builder.run(&program).unwrap();
        let graph = &graphs["Q"];

        let usages: Vec<usize> = graph
            .edges()
            .iter()
            .filter_map(|edge| match edge {
                Edge::Equality(a, b, _) => [*a, *b].into_iter().find_map(|id| match &arena.get(id).kind {
                    VertexKind::PredicateAddressing { predicate, usage, .. }
                        if interner.resolve(*predicate) == "T" =>
                    {
                        Some(*usage)
                    }
                    _ => None,
                }),
                _ => None,
            })
            .collect();
        assert!(usages.contains(&0));
        assert!(usages.contains(&1));
    }

    #[test]
    fn nested_subscript_shares_intermediate_vertex() {
        let program = program_from(
            r#"{"rule":[{
                "head":{"predicate_name":"Q","record":{"field_value":[
                    {"field":0,"value":{"expression":{"variable":{"var_name":"w"}}}}
                ]}},
                "body": {"conjunction":{"conjunct":[
                    {"unification":{
                        "left_hand_side":{"variable":{"var_name":"w"}},
                        "right_hand_side":{"subscript":{
                            "record":{"subscript":{
                                "record":{"variable":{"var_name":"a"}},
                                "subscript":{"literal":{"the_symbol":{"symbol":"b"}}}
                            }},
                            "subscript":{"literal":{"the_symbol":{"symbol":"c"}}}
                        }}
                    }}
                ]}}
            }]}"#,
        );
        let mut arena = VertexArena::new();
        let mut interner = Interner::new();
        let mut builder = GraphBuilder::new(&mut arena, &mut interner);
        let graphs = builder.run(&program).unwrap();
        let graph = &graphs["Q"];

        let field_belonging_count = graph
            .edges()
            .iter()
            .filter(|edge| matches!(edge, Edge::FieldBelonging { .. }))
            .count();
        assert_eq!(field_belonging_count, 2);
    }

    #[test]
    fn heterogeneous_list_literal_conflicts_eagerly() {
        let program = program_from(
            r#"{"rule":[{
                "head":{"predicate_name":"Q","record":{"field_value":[
                    {"field":0,"value":{"expression":{"record":{"field_value":[]}}}}
                ]}},
                "body": {"conjunction":{"conjunct":[
                    {"unification":{
                        "left_hand_side":{"variable":{"var_name":"x"}},
                        "right_hand_side":{"literal":{"the_list":{"element":[
                            {"literal":{"the_number":1.0}},
                            {"literal":{"the_string":"x"}}
                        ]}}}
                    }}
                ]}}
            }]}"#,
        );
        let mut arena = VertexArena::new();
        let mut interner = Interner::new();
        let mut builder = GraphBuilder::new(&mut arena, &mut interner);
        assert!(builder.run(&program).is_err());
    }

    #[test]
    fn two_rules_for_the_same_predicate_share_the_head_field_vertex() {
        let program = program_from(
            r#"{"rule":[
                {"head":{"predicate_name":"T","record":{"field_value":[
                    {"field":0,"value":{"expression":{"literal":{"the_number":1.0}}}}
                ]}}, "body": null},
                {"head":{"predicate_name":"T","record":{"field_value":[
                    {"field":0,"value":{"expression":{"literal":{"the_number":2.0}}}}
                ]}}, "body": null}
            ]}"#,
        );
        let mut arena = VertexArena::new();
        let mut interner = Interner::new();
        let mut builder = GraphBuilder::new(&mut arena, &mut interner);
        let graphs = builder.run(&program).unwrap();
        let graph = &graphs["T"];

        let addressing_vertices: std::collections::HashSet<VertexId> = graph
            .vertices()
            .filter(|&id| matches!(arena.get(id).kind, VertexKind::PredicateAddressing { usage: 0, .. }))
            .collect();
        assert_eq!(
            addressing_vertices.len(),
            1,
            "both rules' head field should address the same vertex"
        );
    }
}
