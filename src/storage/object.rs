//! Value Objects
//!
//! Every key in the keyspace maps to exactly one [`Object`]: a typed payload
//! plus optional expiry metadata.
//!
//! ## Type Stability
//!
//! An object's type is fixed when it is created. The payload is only reachable
//! through the typed accessors [`Object::payload`] and [`Object::payload_mut`],
//! which hand out the concrete container (`Bytes`, [`HashValue`], ...) rather
//! than the [`Value`] enum, so no command can swap a hash for a string in place.
//! Changing a key's type means deleting the object and inserting a new one.
//!
//! ```text
//! ┌───────────────────────────────────────────┐
//! │ Object                                    │
//! │  ┌──────────────────────┐  ┌───────────┐  │
//! │  │ Value                │  │ expires_at│  │
//! │  │  String(Bytes)       │  │ Option<   │  │
//! │  │  Hash(HashValue)     │  │  Instant> │  │
//! │  │  List(ListValue)     │  └───────────┘  │
//! │  │  Set(SetValue)       │                 │
//! │  └──────────────────────┘                 │
//! └───────────────────────────────────────────┘
//! ```

use bytes::Bytes;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::time::{Duration, Instant};

/// Field name to field value. Numeric fields are stored in their canonical
/// decimal string form, never as parsed numbers.
pub type HashValue = HashMap<Bytes, Bytes>;

/// Ordered list elements, O(1) push/pop at both ends.
pub type ListValue = VecDeque<Bytes>;

/// Unordered unique members.
pub type SetValue = HashSet<Bytes>;

/// Rough per-element bookkeeping cost used by memory estimates.
const ELEMENT_OVERHEAD: usize = 48;

/// The type tag of a stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    String,
    Hash,
    List,
    Set,
}

impl ValueKind {
    /// The name reported by the `TYPE` command.
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::String => "string",
            ValueKind::Hash => "hash",
            ValueKind::List => "list",
            ValueKind::Set => "set",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The type-specific payload of an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    String(Bytes),
    Hash(HashValue),
    List(ListValue),
    Set(SetValue),
}

impl Value {
    /// Creates an empty payload of the given kind.
    pub fn empty(kind: ValueKind) -> Self {
        match kind {
            ValueKind::String => Value::String(Bytes::new()),
            ValueKind::Hash => Value::Hash(HashValue::new()),
            ValueKind::List => Value::List(ListValue::new()),
            ValueKind::Set => Value::Set(SetValue::new()),
        }
    }

    /// Returns the type tag of this payload.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::String(_) => ValueKind::String,
            Value::Hash(_) => ValueKind::Hash,
            Value::List(_) => ValueKind::List,
            Value::Set(_) => ValueKind::Set,
        }
    }

    /// Returns true for a hash, list or set with no elements.
    ///
    /// Strings are never "empty collections": an empty string is a valid value.
    pub fn is_empty_collection(&self) -> bool {
        match self {
            Value::String(_) => false,
            Value::Hash(map) => map.is_empty(),
            Value::List(list) => list.is_empty(),
            Value::Set(set) => set.is_empty(),
        }
    }

    /// Approximate heap footprint in bytes.
    pub fn approx_size(&self) -> usize {
        match self {
            Value::String(data) => data.len(),
            Value::Hash(map) => map
                .iter()
                .map(|(f, v)| f.len() + v.len() + ELEMENT_OVERHEAD)
                .sum(),
            Value::List(list) => list.iter().map(|e| e.len() + ELEMENT_OVERHEAD).sum(),
            Value::Set(set) => set.iter().map(|m| m.len() + ELEMENT_OVERHEAD).sum(),
        }
    }
}

/// A concrete container type that can live inside a [`Value`].
///
/// Implemented for `Bytes` (strings), [`HashValue`], [`ListValue`] and
/// [`SetValue`]. The Type Guard uses this trait to hand out typed views.
pub trait Payload: Default {
    /// The type tag this container corresponds to.
    const KIND: ValueKind;

    /// Wraps the container into a [`Value`].
    fn into_value(self) -> Value;

    /// Borrows the container if `value` holds this type.
    fn peek(value: &Value) -> Option<&Self>;

    /// Mutably borrows the container if `value` holds this type.
    fn peek_mut(value: &mut Value) -> Option<&mut Self>;
}

macro_rules! impl_payload {
    ($ty:ty, $variant:ident) => {
        impl Payload for $ty {
            const KIND: ValueKind = ValueKind::$variant;

            fn into_value(self) -> Value {
                Value::$variant(self)
            }

            fn peek(value: &Value) -> Option<&Self> {
                match value {
                    Value::$variant(inner) => Some(inner),
                    _ => None,
                }
            }

            fn peek_mut(value: &mut Value) -> Option<&mut Self> {
                match value {
                    Value::$variant(inner) => Some(inner),
                    _ => None,
                }
            }
        }
    };
}

impl_payload!(Bytes, String);
impl_payload!(HashValue, Hash);
impl_payload!(ListValue, List);
impl_payload!(SetValue, Set);

/// A stored value together with its expiry metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Object {
    value: Value,
    /// When this object expires (None = never expires)
    expires_at: Option<Instant>,
}

impl Object {
    /// Creates an object without expiry.
    pub fn new(value: Value) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    /// Creates an object that expires after `ttl`.
    ///
    /// A `ttl` too large to represent as an [`Instant`] means no expiry.
    pub fn with_ttl(value: Value, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now().checked_add(ttl),
        }
    }

    /// Creates a string object.
    pub fn string(data: impl Into<Bytes>) -> Self {
        Self::new(Value::String(data.into()))
    }

    /// Creates an empty object of the given kind.
    pub fn empty(kind: ValueKind) -> Self {
        Self::new(Value::empty(kind))
    }

    /// Returns the type tag of this object.
    #[inline]
    pub fn kind(&self) -> ValueKind {
        self.value.kind()
    }

    /// Read-only access to the raw payload.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Borrows the payload as `T`, or `None` if the object holds another type.
    pub fn payload<T: Payload>(&self) -> Option<&T> {
        T::peek(&self.value)
    }

    /// Mutably borrows the payload as `T`, or `None` if the object holds another type.
    pub fn payload_mut<T: Payload>(&mut self) -> Option<&mut T> {
        T::peek_mut(&mut self.value)
    }

    /// Checks if this object has expired.
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    #[inline]
    pub(crate) fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|exp| now >= exp)
    }

    /// Absolute expiry instant, if any.
    pub fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }

    /// Remaining time to live, or None if the object never expires.
    pub fn ttl(&self) -> Option<Duration> {
        self.expires_at
            .map(|exp| exp.saturating_duration_since(Instant::now()))
    }

    /// Sets the object to expire `ttl` from now.
    pub fn set_expiry(&mut self, ttl: Duration) {
        self.expires_at = Instant::now().checked_add(ttl);
    }

    /// Sets an absolute expiry instant (used to carry a TTL over on rewrite).
    pub fn set_expires_at(&mut self, expires_at: Option<Instant>) {
        self.expires_at = expires_at;
    }

    /// Removes any expiry. Returns true if one was set.
    pub fn clear_expiry(&mut self) -> bool {
        self.expires_at.take().is_some()
    }

    /// Approximate heap footprint of the payload in bytes.
    pub fn approx_size(&self) -> usize {
        self.value.approx_size()
    }

    pub(crate) fn is_empty_collection(&self) -> bool {
        self.value.is_empty_collection()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_is_fixed_by_payload() {
        let object = Object::empty(ValueKind::Hash);
        assert_eq!(object.kind(), ValueKind::Hash);
        assert!(object.payload::<HashValue>().is_some());
        assert!(object.payload::<Bytes>().is_none());
        assert!(object.payload::<ListValue>().is_none());
    }

    #[test]
    fn test_payload_mut_keeps_kind() {
        let mut object = Object::empty(ValueKind::Hash);
        object
            .payload_mut::<HashValue>()
            .unwrap()
            .insert(Bytes::from("field"), Bytes::from("1"));

        assert_eq!(object.kind(), ValueKind::Hash);
        assert!(object.payload_mut::<SetValue>().is_none());
        assert_eq!(object.payload::<HashValue>().unwrap().len(), 1);
    }

    #[test]
    fn test_expiry() {
        let value = Value::String(Bytes::from("v"));
        let mut object = Object::with_ttl(value, Duration::from_millis(20));
        assert!(!object.is_expired());
        assert!(object.ttl().is_some());

        std::thread::sleep(Duration::from_millis(40));
        assert!(object.is_expired());

        assert!(object.clear_expiry());
        assert!(!object.is_expired());
        assert!(!object.clear_expiry());
    }

    #[test]
    fn test_empty_collection() {
        assert!(Object::empty(ValueKind::List).is_empty_collection());
        assert!(Object::empty(ValueKind::Set).is_empty_collection());
        // An empty string is still a value
        assert!(!Object::string("").is_empty_collection());
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(ValueKind::String.name(), "string");
        assert_eq!(ValueKind::Hash.to_string(), "hash");
        assert_eq!(ValueKind::List.name(), "list");
        assert_eq!(ValueKind::Set.name(), "set");
    }
}
