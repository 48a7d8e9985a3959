use indexmap::IndexMap;
use std::hash::{Hash, Hasher};
use std::mem;

/// A JSON document value.
///
/// Integers and floats are distinct variants (unlike standard JSON, which
/// only has "number"): a lexeme with no decimal point parses as an integer.
/// Objects preserve key insertion order and keep keys unique.
///
/// # Examples
///
/// ```
/// use quarry::Value;
/// use indexmap::IndexMap;
///
/// let mut obj = IndexMap::new();
/// obj.insert("name".to_string(), Value::String("Alice".to_string()));
/// obj.insert("age".to_string(), Value::Integer(30));
/// let document = Value::Object(obj);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// JSON null
    Null,

    /// JSON boolean (true/false)
    Boolean(bool),

    /// Integer number (preserved separately from floats)
    Integer(i64),

    /// Floating-point number
    Float(f64),

    /// UTF-8 string
    String(String),

    /// Array of values
    Array(Vec<Value>),

    /// Object with string keys, insertion order preserved
    Object(IndexMap<String, Value>),
}

impl Value {
    /// Human-readable type name, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    /// Numeric view; integers widen to floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Float(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }
}

/// A resolved grouping value usable as a hash-map key.
///
/// Keys compare by value: whole-valued floats bucket together with their
/// integer counterparts, other floats are keyed by bit pattern. A path that
/// resolves to an array or object buckets by its compact JSON encoding, and
/// an unresolved path buckets as null.
#[derive(Debug, Clone)]
pub enum GroupKey {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    /// Array or object group value, keyed by its compact JSON text
    Composite(String),
}

impl GroupKey {
    /// Build a key from a resolved field value (`None` for an unresolved
    /// path).
    pub fn from_resolved(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => GroupKey::Null,
            Some(Value::Boolean(b)) => GroupKey::Boolean(*b),
            Some(Value::Integer(n)) => GroupKey::Integer(*n),
            Some(Value::Float(n)) => {
                if n.is_finite() && *n == n.trunc() && n.abs() < i64::MAX as f64 {
                    GroupKey::Integer(*n as i64)
                } else {
                    GroupKey::Float(*n)
                }
            }
            Some(Value::String(s)) => GroupKey::String(s.clone()),
            Some(v) => GroupKey::Composite(crate::output::to_json(v)),
        }
    }
}

impl PartialEq for GroupKey {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (GroupKey::Null, GroupKey::Null) => true,
            (GroupKey::Boolean(a), GroupKey::Boolean(b)) => a == b,
            (GroupKey::Integer(a), GroupKey::Integer(b)) => a == b,
            (GroupKey::Float(a), GroupKey::Float(b)) => a.to_bits() == b.to_bits(),
            (GroupKey::String(a), GroupKey::String(b)) => a == b,
            (GroupKey::Composite(a), GroupKey::Composite(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for GroupKey {}

impl Hash for GroupKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        mem::discriminant(self).hash(state);
        match self {
            GroupKey::Null => {}
            GroupKey::Boolean(b) => b.hash(state),
            GroupKey::Integer(n) => n.hash(state),
            GroupKey::Float(n) => n.to_bits().hash(state),
            GroupKey::String(s) | GroupKey::Composite(s) => s.hash(state),
        }
    }
}

impl std::fmt::Display for GroupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GroupKey::Null => write!(f, "null"),
            GroupKey::Boolean(b) => write!(f, "{}", b),
            GroupKey::Integer(n) => write!(f, "{}", n),
            GroupKey::Float(n) => write!(f, "{}", n),
            GroupKey::String(s) | GroupKey::Composite(s) => write!(f, "{}", s),
        }
    }
}
