use std::ops::Range;

use crate::value::{Date, Datetime, TimeValue, Value};

/// An owned row: a fixed-width sequence of field values, parallel to the
/// resultset's metadata.
///
/// String fields live in a per-row byte arena and are handed out as borrowed
/// [`Value::Bytes`] views. Fields store arena offsets rather than pointers,
/// so growing the arena during construction never invalidates anything.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    fields: Vec<OwnedField>,
    arena: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
enum OwnedField {
    Null,
    Int(i64),
    UInt(u64),
    Float(f32),
    Double(f64),
    Date(Date),
    Datetime(Datetime),
    Time(TimeValue),
    Bytes(Range<usize>),
}

impl Row {
    /// Copy a decoded row, moving its strings into the arena.
    pub(crate) fn from_values(values: &[Value<'_>]) -> Self {
        let arena_len = values
            .iter()
            .map(|v| match v {
                Value::Bytes(bytes) => bytes.len(),
                _ => 0,
            })
            .sum();
        let mut arena = Vec::with_capacity(arena_len);
        let fields = values
            .iter()
            .map(|value| match value {
                Value::Null => OwnedField::Null,
                Value::Int(v) => OwnedField::Int(*v),
                Value::UInt(v) => OwnedField::UInt(*v),
                Value::Float(v) => OwnedField::Float(*v),
                Value::Double(v) => OwnedField::Double(*v),
                Value::Date(v) => OwnedField::Date(*v),
                Value::Datetime(v) => OwnedField::Datetime(*v),
                Value::Time(v) => OwnedField::Time(*v),
                Value::Bytes(bytes) => {
                    let start = arena.len();
                    arena.extend_from_slice(bytes);
                    OwnedField::Bytes(start..arena.len())
                }
            })
            .collect();
        Self { fields, arena }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The field at `index`, or `None` past the end of the row.
    pub fn field(&self, index: usize) -> Option<Value<'_>> {
        self.fields.get(index).map(|field| match field {
            OwnedField::Null => Value::Null,
            OwnedField::Int(v) => Value::Int(*v),
            OwnedField::UInt(v) => Value::UInt(*v),
            OwnedField::Float(v) => Value::Float(*v),
            OwnedField::Double(v) => Value::Double(*v),
            OwnedField::Date(v) => Value::Date(*v),
            OwnedField::Datetime(v) => Value::Datetime(*v),
            OwnedField::Time(v) => Value::Time(*v),
            OwnedField::Bytes(range) => Value::Bytes(&self.arena[range.clone()]),
        })
    }

    /// Iterate over the fields as borrowed values.
    pub fn iter(&self) -> impl Iterator<Item = Value<'_>> + '_ {
        (0..self.fields.len()).map(|i| self.field(i).unwrap_or(Value::Null))
    }

    /// Collect the whole row into a vector of borrowed values.
    pub fn values(&self) -> Vec<Value<'_>> {
        self.iter().collect()
    }
}
