//! The parsed program tree this engine consumes.
//!
//! These types mirror the JSON a Logica-style parser emits: each `oneof`
//! position (`Value`, `Literal`, `Conjunct`, `Expression`) is an object with
//! exactly one of several possible keys present, which maps naturally onto
//! an untagged `serde` enum of single-field struct variants. This module
//! only consumes that shape — it never constructs or validates it; a
//! malformed document simply fails to deserialize.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Program {
    pub rule: Vec<Rule>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Rule {
    pub head: Head,
    pub body: Option<Body>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Head {
    pub predicate_name: String,
    pub record: Record,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Body {
    pub conjunction: Conjunction,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Conjunction {
    pub conjunct: Vec<Conjunct>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Record {
    pub field_value: Vec<FieldValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldValue {
    pub field: FieldKey,
    pub value: Value,
}

/// A field's key: positional arguments carry an integer index, named
/// arguments (and all head fields) carry a string name.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FieldKey {
    Positional(u32),
    Named(String),
}

impl FieldKey {
    /// Normalizes to the field's string name, applying the `col<k>`
    /// convention for positional fields.
    pub fn normalized_name(&self) -> String {
        match self {
            FieldKey::Positional(index) => format!("col{index}"),
            FieldKey::Named(name) => name.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Expression { expression: Expression },
    Aggregation { aggregation: Aggregation },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Aggregation {
    pub expression: Expression,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Conjunct {
    Unification { unification: Unification },
    Inclusion { inclusion: Inclusion },
    Predicate { predicate: PredicateCall },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Unification {
    pub left_hand_side: Expression,
    pub right_hand_side: Expression,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Inclusion {
    pub list: Expression,
    pub element: Expression,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PredicateCall {
    pub predicate_name: String,
    pub record: Record,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Expression {
    Literal { literal: Literal },
    Variable { variable: VariableRef },
    Call { call: PredicateCall },
    Subscript { subscript: Subscript },
    Record { record: Record },
    Implication { implication: Implication },
}

#[derive(Debug, Clone, Deserialize)]
pub struct VariableRef {
    pub var_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Subscript {
    pub record: Box<Expression>,
    pub subscript: Box<Expression>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Implication {
    pub if_then: Vec<IfThen>,
    pub otherwise: Box<Expression>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IfThen {
    pub condition: Expression,
    pub consequence: Expression,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    TheString { the_string: String },
    TheNumber { the_number: f64 },
    TheBool { the_bool: bool },
    TheNull { the_null: serde_json::Value },
    TheList { the_list: TheList },
    TheSymbol { the_symbol: TheSymbol },
}

#[derive(Debug, Clone, Deserialize)]
pub struct TheList {
    pub element: Vec<Expression>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TheSymbol {
    pub symbol: String,
}
