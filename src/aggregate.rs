//! Bucket aggregation and mergeable partial states.
//!
//! Each [`Aggregate`] evaluates a document bucket to a [`PartialState`];
//! states from disjoint buckets merge associatively and commutatively, so a
//! grouped aggregate over a large input can be folded chunk by chunk and
//! must equal the aggregate computed over the whole input in one pass.

use rust_decimal::{Decimal, prelude::FromPrimitive, prelude::ToPrimitive};

use crate::{path, value::Value};

/// A bucket aggregation, parametrized by the field it reads.
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregate {
    /// Number of documents in the bucket; reads no field
    Count,

    /// Sum of the numeric values at a field; non-numeric and missing
    /// values are ignored
    Sum(String),

    /// Smallest numeric value at a field; an error when the bucket has none
    Min(String),

    /// Largest numeric value at a field; an error when the bucket has none
    Max(String),

    /// Numeric sum at a field divided by the bucket size. Missing and
    /// non-numeric values still count in the denominator; an empty bucket
    /// averages to null.
    Avg(String),
}

/// Errors raised while applying or merging aggregations.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregateError {
    /// `min`/`max` over a bucket with no numeric values for the field
    EmptyBucket { op: &'static str, field: String },

    /// Two partial states of different kinds were merged
    StateMismatch {
        left: &'static str,
        right: &'static str,
    },
}

impl std::fmt::Display for AggregateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AggregateError::EmptyBucket { op, field } => {
                write!(f, "{} over '{}': no numeric values in bucket", op, field)
            }
            AggregateError::StateMismatch { left, right } => {
                write!(f, "cannot merge {} state with {} state", left, right)
            }
        }
    }
}

impl std::error::Error for AggregateError {}

/// Exact decimal accumulator for sums.
///
/// Keeps integer typing while every contribution is an integer, and keeps
/// merged totals identical across chunk partitions (decimal addition is
/// exact where binary float addition is not).
#[derive(Debug, Clone, PartialEq)]
pub struct SumState {
    total: Decimal,
    all_integer: bool,
}

impl SumState {
    fn new() -> Self {
        SumState {
            total: Decimal::ZERO,
            all_integer: true,
        }
    }

    fn push(&mut self, value: &Value) {
        let contribution = match value {
            Value::Integer(n) => Decimal::from_i64(*n),
            Value::Float(n) => {
                self.all_integer = false;
                Decimal::from_f64(*n)
            }
            _ => return,
        };
        if let Some(d) = contribution {
            // out-of-range additions saturate the accumulator
            self.total = self.total.checked_add(d).unwrap_or(Decimal::MAX);
        }
    }

    fn merge(self, other: SumState) -> SumState {
        SumState {
            total: self.total.checked_add(other.total).unwrap_or(Decimal::MAX),
            all_integer: self.all_integer && other.all_integer,
        }
    }

    /// The accumulated total as a document value.
    pub fn value(&self) -> Value {
        if self.all_integer
            && let Some(n) = self.total.to_i64()
        {
            return Value::Integer(n);
        }
        Value::Float(self.total.to_f64().unwrap_or(0.0))
    }
}

/// A mergeable partial result of one aggregation over one document bucket.
#[derive(Debug, Clone, PartialEq)]
pub enum PartialState {
    Count(i64),
    Sum(SumState),
    Min(Value),
    Max(Value),
    /// Weighted running average; `weight` is the size of the bucket the
    /// average was computed over, including non-numeric documents
    Avg { mean: f64, weight: i64 },
}

impl Aggregate {
    /// The operation name, as used in error messages and the CLI.
    pub fn name(&self) -> &'static str {
        match self {
            Aggregate::Count => "count",
            Aggregate::Sum(_) => "sum",
            Aggregate::Min(_) => "min",
            Aggregate::Max(_) => "max",
            Aggregate::Avg(_) => "avg",
        }
    }

    /// Evaluate one bucket to a mergeable partial state.
    pub fn eval(&self, docs: &[Value]) -> Result<PartialState, AggregateError> {
        match self {
            Aggregate::Count => Ok(PartialState::Count(docs.len() as i64)),

            Aggregate::Sum(field) => {
                let mut sum = SumState::new();
                for doc in docs {
                    if let Some(v) = numeric_field(doc, field) {
                        sum.push(v);
                    }
                }
                Ok(PartialState::Sum(sum))
            }

            Aggregate::Min(field) => match extreme_of(docs, field, |x, y| y < x) {
                Some(v) => Ok(PartialState::Min(v.clone())),
                None => Err(AggregateError::EmptyBucket {
                    op: "min",
                    field: field.clone(),
                }),
            },

            Aggregate::Max(field) => match extreme_of(docs, field, |x, y| y > x) {
                Some(v) => Ok(PartialState::Max(v.clone())),
                None => Err(AggregateError::EmptyBucket {
                    op: "max",
                    field: field.clone(),
                }),
            },

            Aggregate::Avg(field) => {
                let weight = docs.len() as i64;
                if weight == 0 {
                    return Ok(PartialState::Avg {
                        mean: 0.0,
                        weight: 0,
                    });
                }
                let mut sum = 0.0;
                for doc in docs {
                    if let Some(x) = numeric_field(doc, field).and_then(Value::as_f64) {
                        sum += x;
                    }
                }
                Ok(PartialState::Avg {
                    mean: sum / weight as f64,
                    weight,
                })
            }
        }
    }

    /// Apply to a bucket and produce the final aggregate value.
    pub fn apply(&self, docs: &[Value]) -> Result<Value, AggregateError> {
        Ok(self.eval(docs)?.finish())
    }
}

impl PartialState {
    fn kind_name(&self) -> &'static str {
        match self {
            PartialState::Count(_) => "count",
            PartialState::Sum(_) => "sum",
            PartialState::Min(_) => "min",
            PartialState::Max(_) => "max",
            PartialState::Avg { .. } => "avg",
        }
    }

    /// Combine two partial states computed over disjoint buckets.
    ///
    /// count/sum merge by addition, min/max by binary min/max, avg by
    /// weighted average. Merging states of different kinds is an error,
    /// never a panic.
    pub fn merge(self, other: PartialState) -> Result<PartialState, AggregateError> {
        match (self, other) {
            (PartialState::Count(a), PartialState::Count(b)) => Ok(PartialState::Count(a + b)),

            (PartialState::Sum(a), PartialState::Sum(b)) => Ok(PartialState::Sum(a.merge(b))),

            (PartialState::Min(a), PartialState::Min(b)) => {
                Ok(PartialState::Min(pick(a, b, |x, y| y < x)))
            }

            (PartialState::Max(a), PartialState::Max(b)) => {
                Ok(PartialState::Max(pick(a, b, |x, y| y > x)))
            }

            (
                PartialState::Avg {
                    mean: m1,
                    weight: w1,
                },
                PartialState::Avg {
                    mean: m2,
                    weight: w2,
                },
            ) => {
                let weight = w1 + w2;
                if weight == 0 {
                    return Ok(PartialState::Avg {
                        mean: 0.0,
                        weight: 0,
                    });
                }
                Ok(PartialState::Avg {
                    mean: (m1 * w1 as f64 + m2 * w2 as f64) / weight as f64,
                    weight,
                })
            }

            (a, b) => Err(AggregateError::StateMismatch {
                left: a.kind_name(),
                right: b.kind_name(),
            }),
        }
    }

    /// Collapse to the final aggregate value.
    pub fn finish(self) -> Value {
        match self {
            PartialState::Count(n) => Value::Integer(n),
            PartialState::Sum(sum) => sum.value(),
            PartialState::Min(v) | PartialState::Max(v) => v,
            PartialState::Avg { weight: 0, .. } => Value::Null,
            PartialState::Avg { mean, .. } => Value::Float(mean),
        }
    }
}

fn numeric_field<'a>(doc: &'a Value, field: &str) -> Option<&'a Value> {
    path::resolve(doc, field).filter(|v| v.is_number())
}

/// First-seen extreme of a field's numeric values under `replace`.
fn extreme_of<'a>(
    docs: &'a [Value],
    field: &str,
    replace: fn(f64, f64) -> bool,
) -> Option<&'a Value> {
    let mut best: Option<(&Value, f64)> = None;
    for doc in docs {
        if let Some(v) = numeric_field(doc, field)
            && let Some(x) = v.as_f64()
        {
            match best {
                Some((_, b)) if !replace(b, x) => {}
                _ => best = Some((v, x)),
            }
        }
    }
    best.map(|(v, _)| v)
}

fn pick(a: Value, b: Value, replace: fn(f64, f64) -> bool) -> Value {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) if replace(x, y) => b,
        _ => a,
    }
}
