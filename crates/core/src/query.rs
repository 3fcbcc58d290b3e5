// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A minimal, Mongo-flavored query DSL.
//!
//! The store adapter contract is expressed in terms of filters, sorts, and
//! limits over opaque documents; this type is the in-process representation
//! callers (the dispatcher, janitor, and operator surface) build and the
//! `launchpad-storage` adapter interprets. It intentionally covers only the
//! operators LaunchPad actually needs (equality, comparison, set membership,
//! existence) rather than a general query language.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single field-level condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldOp {
    Eq(serde_json::Value),
    Ne(serde_json::Value),
    Gt(serde_json::Value),
    Gte(serde_json::Value),
    Lt(serde_json::Value),
    Lte(serde_json::Value),
    In(Vec<serde_json::Value>),
    Exists(bool),
}

/// A conjunction of field conditions, addressed by dotted path (e.g.
/// `"spec._priority"`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub conditions: BTreeMap<String, Vec<FieldOp>>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, field: impl Into<String>, op: FieldOp) -> Self {
        self.conditions.entry(field.into()).or_default().push(op);
        self
    }

    pub fn eq(self, field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.push(field, FieldOp::Eq(value.into()))
    }

    pub fn ne(self, field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.push(field, FieldOp::Ne(value.into()))
    }

    pub fn gt(self, field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.push(field, FieldOp::Gt(value.into()))
    }

    pub fn gte(self, field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.push(field, FieldOp::Gte(value.into()))
    }

    pub fn lt(self, field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.push(field, FieldOp::Lt(value.into()))
    }

    pub fn lte(self, field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.push(field, FieldOp::Lte(value.into()))
    }

    pub fn in_set(self, field: impl Into<String>, values: Vec<serde_json::Value>) -> Self {
        self.push(field, FieldOp::In(values))
    }

    pub fn exists(self, field: impl Into<String>, present: bool) -> Self {
        self.push(field, FieldOp::Exists(present))
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Merge another query's conditions into this one (logical AND).
    pub fn and(mut self, other: Query) -> Self {
        for (field, ops) in other.conditions {
            self.conditions.entry(field).or_default().extend(ops);
        }
        self
    }

    /// Evaluate this query against a document represented as a flat JSON
    /// object with dotted-path lookup, matching the field addressing used
    /// when the query was built.
    pub fn matches(&self, doc: &serde_json::Value) -> bool {
        self.conditions
            .iter()
            .all(|(field, ops)| ops.iter().all(|op| eval_op(doc, field, op)))
    }
}

/// Dotted-path lookup into a document, exposed for callers (the store
/// adapter) that need to sort by the same field addressing a [`Query`] uses.
pub fn lookup<'a>(doc: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
    let mut cur = doc;
    for part in path.split('.') {
        cur = cur.get(part)?;
    }
    Some(cur)
}

fn eval_op(doc: &serde_json::Value, field: &str, op: &FieldOp) -> bool {
    let value = lookup(doc, field);
    match op {
        FieldOp::Eq(expected) => value == Some(expected),
        FieldOp::Ne(expected) => value != Some(expected),
        FieldOp::Exists(present) => value.is_some() == *present,
        FieldOp::In(values) => value.map(|v| values.contains(v)).unwrap_or(false),
        FieldOp::Gt(expected) => compare(value, expected).map(|o| o.is_gt()).unwrap_or(false),
        FieldOp::Gte(expected) => compare(value, expected).map(|o| o.is_ge()).unwrap_or(false),
        FieldOp::Lt(expected) => compare(value, expected).map(|o| o.is_lt()).unwrap_or(false),
        FieldOp::Lte(expected) => compare(value, expected).map(|o| o.is_le()).unwrap_or(false),
    }
}

fn compare(value: Option<&serde_json::Value>, expected: &serde_json::Value) -> Option<std::cmp::Ordering> {
    let value = value?;
    if let (Some(a), Some(b)) = (value.as_f64(), expected.as_f64()) {
        return a.partial_cmp(&b);
    }
    if let (Some(a), Some(b)) = (value.as_str(), expected.as_str()) {
        return Some(a.cmp(b));
    }
    None
}

/// Sort order for a field in a `find`/`find_one_and_update` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDir {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sort {
    pub fields: Vec<(String, SortDir)>,
}

impl Sort {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    pub fn by(mut self, field: impl Into<String>, dir: SortDir) -> Self {
        self.fields.push((field.into(), dir));
        self
    }
}

impl Default for Sort {
    fn default() -> Self {
        Self::new()
    }
}

impl Sort {
    /// Compare two documents field-by-field according to this sort order.
    /// Missing fields sort as less than any present value.
    pub fn compare(&self, a: &serde_json::Value, b: &serde_json::Value) -> std::cmp::Ordering {
        for (field, dir) in &self.fields {
            let av = lookup(a, field);
            let bv = lookup(b, field);
            let ord = match (av, bv) {
                (None, None) => std::cmp::Ordering::Equal,
                (None, Some(_)) => std::cmp::Ordering::Less,
                (Some(_), None) => std::cmp::Ordering::Greater,
                (Some(av), Some(bv)) => compare(Some(av), bv).unwrap_or(std::cmp::Ordering::Equal),
            };
            let ord = match dir {
                SortDir::Asc => ord,
                SortDir::Desc => ord.reverse(),
            };
            if ord != std::cmp::Ordering::Equal {
                return ord;
            }
        }
        std::cmp::Ordering::Equal
    }
}

#[cfg(test)]
#[path = "query_tests.rs"]
mod tests;
