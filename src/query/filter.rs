use std::cmp::Ordering;
use std::collections::BTreeSet;
use crate::core::types::{Entity, FieldValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    fn holds(&self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Ne => ordering != Ordering::Equal,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Le => ordering != Ordering::Greater,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Ge => ordering != Ordering::Less,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

/// Storage-side predicate over records of one model
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Every row
    All,
    /// No row; stands in for an empty key set so no `IN ()` is ever built
    Nothing,
    KeyIn {
        attribute: String,
        keys: BTreeSet<String>,
    },
    Compare {
        attribute: String,
        op: CompareOp,
        value: FieldValue,
    },
    IsNull(String),
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    /// `attribute IN keys`, collapsing to `Nothing` for an empty set
    pub fn key_in<I, S>(attribute: &str, keys: I) -> Filter
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys: BTreeSet<String> = keys.into_iter().map(Into::into).collect();
        if keys.is_empty() {
            Filter::Nothing
        } else {
            Filter::KeyIn {
                attribute: attribute.to_string(),
                keys,
            }
        }
    }

    pub fn compare(attribute: &str, op: CompareOp, value: impl Into<FieldValue>) -> Filter {
        Filter::Compare {
            attribute: attribute.to_string(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(attribute: &str, value: impl Into<FieldValue>) -> Filter {
        Filter::compare(attribute, CompareOp::Eq, value)
    }

    pub fn ne(attribute: &str, value: impl Into<FieldValue>) -> Filter {
        Filter::compare(attribute, CompareOp::Ne, value)
    }

    pub fn lt(attribute: &str, value: impl Into<FieldValue>) -> Filter {
        Filter::compare(attribute, CompareOp::Lt, value)
    }

    pub fn le(attribute: &str, value: impl Into<FieldValue>) -> Filter {
        Filter::compare(attribute, CompareOp::Le, value)
    }

    pub fn gt(attribute: &str, value: impl Into<FieldValue>) -> Filter {
        Filter::compare(attribute, CompareOp::Gt, value)
    }

    pub fn ge(attribute: &str, value: impl Into<FieldValue>) -> Filter {
        Filter::compare(attribute, CompareOp::Ge, value)
    }

    pub fn is_null(attribute: &str) -> Filter {
        Filter::IsNull(attribute.to_string())
    }

    pub fn negate(self) -> Filter {
        match self {
            Filter::All => Filter::Nothing,
            Filter::Nothing => Filter::All,
            Filter::Not(inner) => *inner,
            other => Filter::Not(Box::new(other)),
        }
    }

    /// Logical AND with the obvious simplifications
    pub fn and(self, other: Filter) -> Filter {
        match (self, other) {
            (Filter::Nothing, _) | (_, Filter::Nothing) => Filter::Nothing,
            (Filter::All, f) | (f, Filter::All) => f,
            (
                Filter::KeyIn { attribute: a, keys: left },
                Filter::KeyIn { attribute: b, keys: right },
            ) if a == b => Filter::key_in(&a, left.intersection(&right).cloned().collect::<Vec<_>>()),
            (Filter::And(mut left), Filter::And(right)) => {
                left.extend(right);
                Filter::And(left)
            }
            (Filter::And(mut left), f) => {
                left.push(f);
                Filter::And(left)
            }
            (f, Filter::And(mut right)) => {
                right.insert(0, f);
                Filter::And(right)
            }
            (left, right) => Filter::And(vec![left, right]),
        }
    }

    pub fn or(self, other: Filter) -> Filter {
        match (self, other) {
            (Filter::All, _) | (_, Filter::All) => Filter::All,
            (Filter::Nothing, f) | (f, Filter::Nothing) => f,
            (Filter::Or(mut left), f) => {
                left.push(f);
                Filter::Or(left)
            }
            (left, right) => Filter::Or(vec![left, right]),
        }
    }

    /// True when no row can ever match, without looking at any row
    pub fn is_nothing(&self) -> bool {
        matches!(self, Filter::Nothing)
    }

    pub fn matches<E: Entity + ?Sized>(&self, entity: &E) -> bool {
        match self {
            Filter::All => true,
            Filter::Nothing => false,
            Filter::KeyIn { attribute, keys } => entity
                .attribute(attribute)
                .and_then(|v| v.to_text())
                .is_some_and(|key| keys.contains(&key)),
            Filter::Compare { attribute, op, value } => entity
                .attribute(attribute)
                .and_then(|actual| actual.compare(value))
                .is_some_and(|ordering| op.holds(ordering)),
            Filter::IsNull(attribute) => entity
                .attribute(attribute)
                .is_none_or(|v| v.is_null()),
            Filter::And(filters) => filters.iter().all(|f| f.matches(entity)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(entity)),
            Filter::Not(inner) => !inner.matches(entity),
        }
    }
}
