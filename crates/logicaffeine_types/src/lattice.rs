//! The type lattice: algebraic types with a total `intersect` (meet) operation.
//!
//! `Type` forms a lattice with [`Type::Any`] as the least-informative element.
//! [`intersect`] computes the greatest lower bound of two types, refining
//! `Any` towards whatever the other side knows and rejecting incompatible
//! atoms, list element types, or record field sets.

use std::collections::BTreeMap;
use std::fmt;

use logicaffeine_base::Span;

use crate::error::InferenceError;

/// A type in the inference lattice.
///
/// `Any` is the bottom of information and unifies with anything. Records
/// track field types in a [`BTreeMap`] so field-set comparisons and any
/// textual rendering are deterministic regardless of insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Any,
    Number,
    String,
    Bool,
    Null,
    List(Box<Type>),
    Record(RecordType),
}

/// A row-typed record: a field map plus whether new fields may still appear.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordType {
    pub fields: BTreeMap<String, Type>,
    pub openness: Openness,
}

/// Whether a record's field set is still growable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Openness {
    /// May gain fields during inference.
    Open,
    /// Field set is fixed; gaining an unknown field is a conflict.
    Closed,
}

impl Type {
    pub fn list(element: Type) -> Type {
        Type::List(Box::new(element))
    }

    pub fn open_record(fields: BTreeMap<String, Type>) -> Type {
        Type::Record(RecordType { fields, openness: Openness::Open })
    }

    pub fn closed_record(fields: BTreeMap<String, Type>) -> Type {
        Type::Record(RecordType { fields, openness: Openness::Closed })
    }

    pub fn empty_open_record() -> Type {
        Type::open_record(BTreeMap::new())
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Type::Any)
    }

    pub fn as_list(&self) -> Option<&Type> {
        match self {
            Type::List(element) => Some(element),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&RecordType> {
        match self {
            Type::Record(record) => Some(record),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Any => write!(f, "Any"),
            Type::Number => write!(f, "Number"),
            Type::String => write!(f, "String"),
            Type::Bool => write!(f, "Bool"),
            Type::Null => write!(f, "Null"),
            Type::List(element) => write!(f, "List({element})"),
            Type::Record(record) => {
                let opener = match record.openness {
                    Openness::Open => "Open",
                    Openness::Closed => "Closed",
                };
                write!(f, "{opener}{{")?;
                for (i, (name, ty)) in record.fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}: {ty}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// Orders type kinds for deterministic dispatch of the symmetric [`intersect`].
///
/// `Any < Number < String < List < OpenRecord < ClosedRecord`. `Bool` and
/// `Null` rank alongside the other atoms (`Number`/`String`) since they are
/// only ever compared against themselves or `Any` in practice; they are
/// placed just above `String` to keep the table total.
fn rank(ty: &Type) -> u8 {
    match ty {
        Type::Any => 0,
        Type::Number => 1,
        Type::String => 2,
        Type::Bool => 3,
        Type::Null => 4,
        Type::List(_) => 5,
        Type::Record(record) => match record.openness {
            Openness::Open => 6,
            Openness::Closed => 7,
        },
    }
}

/// Computes the greatest lower bound of `a` and `b` in the type lattice.
///
/// Commutative: normalizes by rank before case-analyzing, so callers never
/// need to worry about argument order. Fails with
/// [`InferenceError::TypeConflict`] when the two types cannot be unified.
pub fn intersect(a: &Type, b: &Type, span: Span) -> Result<Type, InferenceError> {
    let (a, b) = if rank(a) <= rank(b) { (a, b) } else { (b, a) };

    match a {
        Type::Any => Ok(b.clone()),
        Type::Number | Type::String | Type::Bool | Type::Null => {
            if a == b {
                Ok(b.clone())
            } else {
                Err(InferenceError::TypeConflict {
                    message: format!("cannot match {a} and {b}"),
                    span,
                })
            }
        }
        Type::List(a_element) => match b {
            Type::List(b_element) => {
                Ok(Type::list(intersect(a_element, b_element, span)?))
            }
            _ => Err(InferenceError::TypeConflict {
                message: format!("cannot match {b} and list"),
                span,
            }),
        },
        Type::Record(a_record) => {
            let b_record = match b {
                Type::Record(r) => r,
                _ => {
                    return Err(InferenceError::TypeConflict {
                        message: format!("cannot match {a} and {b}"),
                        span,
                    })
                }
            };
            intersect_records(a_record, b_record, span)
        }
    }
}

/// Intersects a list's element
/// type against a candidate element type.
pub fn intersect_list_element(
    list_type: &Type,
    element_type: &Type,
    span: Span,
) -> Result<Type, InferenceError> {
    let element = list_type.as_list().ok_or_else(|| InferenceError::TypeConflict {
        message: format!("cannot match {list_type} and list"),
        span,
    })?;
    intersect(element, element_type, span)
}

fn intersect_records(
    a: &RecordType,
    b: &RecordType,
    span: Span,
) -> Result<Type, InferenceError> {
    use Openness::*;

    match (a.openness, b.openness) {
        (Open, Open) => intersect_friendly_records(a, b, Open, span),
        (Open, Closed) => {
            let missing: Vec<&str> = a
                .fields
                .keys()
                .filter(|k| !b.fields.contains_key(*k))
                .map(String::as_str)
                .collect();
            if missing.is_empty() {
                intersect_friendly_records(a, b, Closed, span)
            } else {
                Err(InferenceError::TypeConflict {
                    message: format!("cannot match types of record keys: {missing:?}"),
                    span,
                })
            }
        }
        (Closed, Open) => intersect_records(b, a, span),
        (Closed, Closed) => {
            let a_keys: std::collections::BTreeSet<_> = a.fields.keys().collect();
            let b_keys: std::collections::BTreeSet<_> = b.fields.keys().collect();
            if a_keys == b_keys {
                intersect_friendly_records(a, b, Closed, span)
            } else {
                let symmetric_difference: Vec<_> =
                    a_keys.symmetric_difference(&b_keys).collect();
                Err(InferenceError::TypeConflict {
                    message: format!(
                        "cannot match types of records keys: {symmetric_difference:?}"
                    ),
                    span,
                })
            }
        }
    }
}

/// Intersects two records already known to have a compatible field-set
/// relationship (the `Open∩Closed` field-subset check or the
/// `Closed∩Closed` field-set-equality check has already passed).
fn intersect_friendly_records(
    a: &RecordType,
    b: &RecordType,
    openness: Openness,
    span: Span,
) -> Result<Type, InferenceError> {
    let mut fields = BTreeMap::new();
    for (name, b_ty) in &b.fields {
        match a.fields.get(name) {
            Some(a_ty) => {
                fields.insert(name.clone(), intersect(a_ty, b_ty, span)?);
            }
            None => {
                fields.insert(name.clone(), b_ty.clone());
            }
        }
    }
    for (name, a_ty) in &a.fields {
        fields.entry(name.clone()).or_insert_with(|| a_ty.clone());
    }
    Ok(Type::Record(RecordType { fields, openness }))
}
