//! The in-memory query surface: find, project, group, aggregate, join.

use std::sync::LazyLock;

use indexmap::{IndexMap, IndexSet};
use regex::Regex;
use rust_decimal::{Decimal, prelude::FromPrimitive};

use crate::{
    aggregate::{Aggregate, AggregateError, PartialState},
    path,
    value::{GroupKey, Value},
};

/// Strings that parse under the same number grammar the lexer accepts.
static NUMERIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-?(0|[1-9][0-9]*)(\.[0-9]+)?$").expect("numeric pattern compiles")
});

/// An in-memory query surface over an ordered sequence of documents.
///
/// Collections are cheap views created per query: operations never mutate
/// the underlying documents and always produce new sequences. All scans are
/// linear; there is no index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collection {
    docs: Vec<Value>,
}

impl Collection {
    /// Wrap a parsed value. A top-level array becomes the document
    /// sequence; anything else becomes a single-document collection.
    pub fn new(value: Value) -> Self {
        match value {
            Value::Array(docs) => Collection { docs },
            other => Collection { docs: vec![other] },
        }
    }

    pub fn from_documents(docs: Vec<Value>) -> Self {
        Collection { docs }
    }

    pub fn documents(&self) -> &[Value] {
        &self.docs
    }

    pub fn into_documents(self) -> Vec<Value> {
        self.docs
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Select documents where every criteria path matches its expected
    /// value under the tolerant equality policy (see [`values_match`]).
    pub fn find(&self, criteria: &IndexMap<String, Value>) -> Collection {
        let docs = self
            .docs
            .iter()
            .filter(|doc| {
                criteria
                    .iter()
                    .all(|(field, expected)| values_match(path::resolve(doc, field), expected))
            })
            .cloned()
            .collect();
        Collection { docs }
    }

    /// Project each document onto the literal requested paths.
    ///
    /// Output keys are the paths exactly as requested, not restructured
    /// into nesting; unresolved paths project as null. Projection is
    /// idempotent: projecting a projection changes nothing.
    pub fn project(&self, fields: &[String]) -> Collection {
        let docs = self
            .docs
            .iter()
            .map(|doc| {
                let mut projected = IndexMap::new();
                for field in fields {
                    let value = path::resolve(doc, field).cloned().unwrap_or(Value::Null);
                    projected.insert(field.clone(), value);
                }
                Value::Object(projected)
            })
            .collect();
        Collection { docs }
    }

    /// Bucket documents by the resolved value at `key_path`.
    ///
    /// Bucket order is first-seen order of distinct keys; documents keep
    /// input order within their bucket.
    pub fn group_by(&self, key_path: &str) -> IndexMap<GroupKey, Vec<Value>> {
        let mut groups: IndexMap<GroupKey, Vec<Value>> = IndexMap::new();
        for doc in &self.docs {
            let key = GroupKey::from_resolved(path::resolve(doc, key_path));
            groups.entry(key).or_default().push(doc.clone());
        }
        groups
    }

    /// Group by `key_path` and apply `aggregate` to each bucket.
    pub fn aggregate(
        &self,
        key_path: &str,
        aggregate: &Aggregate,
    ) -> Result<IndexMap<GroupKey, Value>, AggregateError> {
        let mut out = IndexMap::new();
        for (key, docs) in self.group_by(key_path) {
            out.insert(key, aggregate.apply(&docs)?);
        }
        Ok(out)
    }

    /// Like [`Collection::aggregate`], but keeps the mergeable partial
    /// states for chunked computation.
    pub fn aggregate_partial(
        &self,
        key_path: &str,
        aggregate: &Aggregate,
    ) -> Result<IndexMap<GroupKey, PartialState>, AggregateError> {
        let mut out = IndexMap::new();
        for (key, docs) in self.group_by(key_path) {
            out.insert(key, aggregate.eval(&docs)?);
        }
        Ok(out)
    }

    /// Hash-join against `other`.
    ///
    /// The index is built over `other` keyed by `right_key`; one key maps
    /// to every right row carrying it, so one-to-many matches emit the full
    /// cross product within a bucket. Matched right rows are tracked by row
    /// index, not by value: duplicate-valued distinct rows null-fill
    /// independently in right/full joins. Unresolved keys join as null,
    /// like any other value.
    pub fn hash_join(
        &self,
        other: &Collection,
        left_key: &str,
        right_key: &str,
        mode: JoinMode,
    ) -> Vec<JoinRecord> {
        let mut index: IndexMap<GroupKey, Vec<usize>> = IndexMap::new();
        for (i, doc) in other.docs.iter().enumerate() {
            let key = GroupKey::from_resolved(path::resolve(doc, right_key));
            index.entry(key).or_default().push(i);
        }

        let mut matched = vec![false; other.docs.len()];
        let mut records = Vec::new();

        for doc in &self.docs {
            let key = GroupKey::from_resolved(path::resolve(doc, left_key));
            match index.get(&key) {
                Some(rows) => {
                    for &i in rows {
                        matched[i] = true;
                        records.push(JoinRecord {
                            left: Some(doc.clone()),
                            right: Some(other.docs[i].clone()),
                        });
                    }
                }
                None => {
                    if mode.keeps_unmatched_left() {
                        records.push(JoinRecord {
                            left: Some(doc.clone()),
                            right: None,
                        });
                    }
                }
            }
        }

        if mode.keeps_unmatched_right() {
            for (i, doc) in other.docs.iter().enumerate() {
                if !matched[i] {
                    records.push(JoinRecord {
                        left: None,
                        right: Some(doc.clone()),
                    });
                }
            }
        }

        records
    }

    /// Distinct dotted field paths across the documents, in first-seen
    /// order.
    ///
    /// Descends nested objects, and the first element of arrays, the same
    /// shapes the dotted-path resolver reads.
    pub fn field_paths(&self) -> Vec<String> {
        let mut paths = IndexSet::new();
        for doc in &self.docs {
            collect_paths(doc, "", &mut paths);
        }
        paths.into_iter().collect()
    }
}

fn collect_paths(value: &Value, prefix: &str, out: &mut IndexSet<String>) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                let full = if prefix.is_empty() {
                    k.clone()
                } else {
                    format!("{}.{}", prefix, k)
                };
                if matches!(v, Value::Object(_) | Value::Array(_)) {
                    out.insert(full.clone());
                    collect_paths(v, &full, out);
                } else {
                    out.insert(full);
                }
            }
        }
        Value::Array(items) => {
            if let Some(first) = items.first() {
                collect_paths(first, prefix, out);
            }
        }
        _ => {}
    }
}

/// How unmatched rows are null-filled in a hash join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinMode {
    /// Matched pairs only
    Inner,
    /// Matched pairs plus unmatched left rows
    Left,
    /// Matched pairs plus unmatched right rows
    Right,
    /// Matched pairs plus unmatched rows from both sides
    Full,
}

impl JoinMode {
    fn keeps_unmatched_left(self) -> bool {
        matches!(self, JoinMode::Left | JoinMode::Full)
    }

    fn keeps_unmatched_right(self) -> bool {
        matches!(self, JoinMode::Right | JoinMode::Full)
    }
}

impl std::fmt::Display for JoinMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JoinMode::Inner => "inner",
            JoinMode::Left => "left",
            JoinMode::Right => "right",
            JoinMode::Full => "full",
        };
        write!(f, "{}", name)
    }
}

/// Error for an unrecognized join mode name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownJoinMode(pub String);

impl std::fmt::Display for UnknownJoinMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unknown join mode '{}', expected inner, left, right or full",
            self.0
        )
    }
}

impl std::error::Error for UnknownJoinMode {}

impl std::str::FromStr for JoinMode {
    type Err = UnknownJoinMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "inner" => Ok(JoinMode::Inner),
            "left" => Ok(JoinMode::Left),
            "right" => Ok(JoinMode::Right),
            "full" => Ok(JoinMode::Full),
            _ => Err(UnknownJoinMode(s.to_string())),
        }
    }
}

/// One row of a join result; `None` encodes the null-filled side.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinRecord {
    pub left: Option<Value>,
    pub right: Option<Value>,
}

impl JoinRecord {
    /// Render as a `{"left": .., "right": ..}` document.
    pub fn into_value(self) -> Value {
        let mut map = IndexMap::new();
        map.insert("left".to_string(), self.left.unwrap_or(Value::Null));
        map.insert("right".to_string(), self.right.unwrap_or(Value::Null));
        Value::Object(map)
    }
}

/// Tolerant equality between a resolved field value and an expected value.
///
/// Rules are tried in a fixed order and the first that applies decides:
/// exact equality, then case-insensitive string equality, then numeric
/// coercion (numbers and numeric-looking strings compare as decimals, so
/// `"30"` matches integer `30` and `"2.50"` matches `2.5`), then boolean
/// against `"true"`/`"false"`, then null against `"null"`/`"none"`/`""`.
/// An unresolved path behaves as null, so a wholly absent field only
/// matches an expectation that denotes null.
pub fn values_match(actual: Option<&Value>, expected: &Value) -> bool {
    let actual = actual.unwrap_or(&Value::Null);

    if actual == expected {
        return true;
    }

    if let (Value::String(a), Value::String(b)) = (actual, expected)
        && a.to_lowercase() == b.to_lowercase()
    {
        return true;
    }

    if let (Some(a), Some(b)) = (numeric_view(actual), numeric_view(expected))
        && a == b
    {
        return true;
    }

    match (actual, expected) {
        (Value::Boolean(b), Value::String(s)) | (Value::String(s), Value::Boolean(b)) => {
            match s.to_lowercase().as_str() {
                "true" => return *b,
                "false" => return !*b,
                _ => {}
            }
        }
        _ => {}
    }

    match (actual, expected) {
        (Value::Null, Value::String(s)) | (Value::String(s), Value::Null) => {
            matches!(s.to_lowercase().as_str(), "null" | "none" | "")
        }
        _ => false,
    }
}

fn numeric_view(value: &Value) -> Option<Decimal> {
    match value {
        Value::Integer(n) => Decimal::from_i64(*n),
        Value::Float(n) => Decimal::from_f64(*n),
        Value::String(s) if NUMERIC_RE.is_match(s) => s.parse().ok(),
        _ => None,
    }
}

/// Parameters of a pipeline join stage.
#[derive(Debug, Clone)]
pub struct JoinSpec {
    pub other: Collection,
    pub left_key: String,
    pub right_key: String,
    pub mode: JoinMode,
}

/// What a pipeline produced, depending on its final stage.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutput {
    Documents(Vec<Value>),
    Aggregates(IndexMap<GroupKey, Value>),
    Joined(Vec<JoinRecord>),
}

/// A fixed-order query pipeline: filter, project, group/aggregate, join.
///
/// Stages without parameters are skipped; each stage's output feeds the
/// next.
///
/// # Examples
///
/// ```
/// use quarry::{Aggregate, Collection, Pipeline, PipelineOutput, parse};
///
/// let docs = parse(r#"[{"city": "NYC", "n": 1}, {"city": "LA", "n": 2}]"#).unwrap();
/// let out = Pipeline::new()
///     .aggregate("city", Aggregate::Count)
///     .run(&Collection::new(docs))
///     .unwrap();
/// assert!(matches!(out, PipelineOutput::Aggregates(_)));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    criteria: Option<IndexMap<String, Value>>,
    fields: Option<Vec<String>>,
    grouping: Option<(String, Aggregate)>,
    join: Option<JoinSpec>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, criteria: IndexMap<String, Value>) -> Self {
        self.criteria = Some(criteria);
        self
    }

    pub fn project(mut self, fields: Vec<String>) -> Self {
        self.fields = Some(fields);
        self
    }

    pub fn aggregate(mut self, group_key: impl Into<String>, aggregate: Aggregate) -> Self {
        self.grouping = Some((group_key.into(), aggregate));
        self
    }

    pub fn join(mut self, spec: JoinSpec) -> Self {
        self.join = Some(spec);
        self
    }

    pub fn run(&self, input: &Collection) -> Result<PipelineOutput, AggregateError> {
        let mut current = input.clone();

        if let Some(criteria) = &self.criteria {
            current = current.find(criteria);
        }
        if let Some(fields) = &self.fields {
            current = current.project(fields);
        }

        let mut aggregates = None;
        if let Some((key, agg)) = &self.grouping {
            aggregates = Some(current.aggregate(key, agg)?);
        }

        if let Some(spec) = &self.join {
            // an aggregated mapping joins as one wrapped document, the same
            // normalization Collection::new applies to non-array input
            if let Some(map) = aggregates.take() {
                current = Collection::new(aggregates_to_document(map));
            }
            let records = current.hash_join(&spec.other, &spec.left_key, &spec.right_key, spec.mode);
            return Ok(PipelineOutput::Joined(records));
        }

        match aggregates {
            Some(map) => Ok(PipelineOutput::Aggregates(map)),
            None => Ok(PipelineOutput::Documents(current.into_documents())),
        }
    }
}

fn aggregates_to_document(map: IndexMap<GroupKey, Value>) -> Value {
    let mut obj = IndexMap::new();
    for (key, value) in map {
        obj.insert(key.to_string(), value);
    }
    Value::Object(obj)
}
