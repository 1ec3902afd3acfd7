// field_store.rs - Column-oriented data for one component type
//
// Each scalar leaf of a schema becomes one fixed-capacity column indexed by
// entity id. Columns are kept in flatten order, which is the order the
// snapshot codec walks them.

use crate::ecs::schema::{join_path, FieldType, PrimitiveKind, Schema};
use crate::ecs::EntityId;
use serde_json::Value;
use thiserror::Error;

/// A single primitive column sized to the world's entity capacity.
#[derive(Clone, Debug, PartialEq)]
pub enum Column {
    I8(Vec<i8>),
    U8(Vec<u8>),
    I16(Vec<i16>),
    U16(Vec<u16>),
    I32(Vec<i32>),
    U32(Vec<u32>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

/// Numeric value on its way into a column.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Scalar {
    Int(i64),
    Float(f64),
}

macro_rules! for_each_column {
    ($column:expr, $values:ident => $body:expr) => {
        match $column {
            Column::I8($values) => $body,
            Column::U8($values) => $body,
            Column::I16($values) => $body,
            Column::U16($values) => $body,
            Column::I32($values) => $body,
            Column::U32($values) => $body,
            Column::F32($values) => $body,
            Column::F64($values) => $body,
        }
    };
}

impl Column {
    fn zeroed(kind: PrimitiveKind, len: usize) -> Self {
        match kind {
            PrimitiveKind::I8 => Column::I8(vec![0; len]),
            PrimitiveKind::U8 => Column::U8(vec![0; len]),
            PrimitiveKind::I16 => Column::I16(vec![0; len]),
            PrimitiveKind::U16 => Column::U16(vec![0; len]),
            PrimitiveKind::I32 => Column::I32(vec![0; len]),
            PrimitiveKind::U32 => Column::U32(vec![0; len]),
            PrimitiveKind::F32 => Column::F32(vec![0.0; len]),
            PrimitiveKind::F64 => Column::F64(vec![0.0; len]),
        }
    }

    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Column::I8(_) => PrimitiveKind::I8,
            Column::U8(_) => PrimitiveKind::U8,
            Column::I16(_) => PrimitiveKind::I16,
            Column::U16(_) => PrimitiveKind::U16,
            Column::I32(_) => PrimitiveKind::I32,
            Column::U32(_) => PrimitiveKind::U32,
            Column::F32(_) => PrimitiveKind::F32,
            Column::F64(_) => PrimitiveKind::F64,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        for_each_column!(self, values => values.len())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read a row widened to `f64`. Every supported kind is exact in `f64`.
    pub fn get(&self, row: usize) -> Option<f64> {
        match self {
            Column::I8(v) => v.get(row).map(|&x| f64::from(x)),
            Column::U8(v) => v.get(row).map(|&x| f64::from(x)),
            Column::I16(v) => v.get(row).map(|&x| f64::from(x)),
            Column::U16(v) => v.get(row).map(|&x| f64::from(x)),
            Column::I32(v) => v.get(row).map(|&x| f64::from(x)),
            Column::U32(v) => v.get(row).map(|&x| f64::from(x)),
            Column::F32(v) => v.get(row).map(|&x| f64::from(x)),
            Column::F64(v) => v.get(row).copied(),
        }
    }

    fn clear_row(&mut self, row: usize) {
        for_each_column!(self, values => {
            if let Some(slot) = values.get_mut(row) {
                *slot = Default::default();
            }
        })
    }

    // Integers wrap and floats saturate, mirroring `as` casts.
    fn write(&mut self, row: usize, value: Scalar) {
        macro_rules! store {
            ($values:expr, $ty:ty) => {
                if let Some(slot) = $values.get_mut(row) {
                    *slot = match value {
                        Scalar::Int(v) => v as $ty,
                        Scalar::Float(v) => v as $ty,
                    };
                }
            };
        }
        match self {
            Column::I8(v) => store!(v, i8),
            Column::U8(v) => store!(v, u8),
            Column::I16(v) => store!(v, i16),
            Column::U16(v) => store!(v, u16),
            Column::I32(v) => store!(v, i32),
            Column::U32(v) => store!(v, u32),
            Column::F32(v) => store!(v, f32),
            Column::F64(v) => store!(v, f64),
        }
    }
}

/// One flattened column together with its dotted schema path.
#[derive(Clone, Copy, Debug)]
pub struct FlatField<'a> {
    pub path: &'a str,
    pub column: &'a Column,
}

impl FlatField<'_> {
    #[inline]
    pub fn byte_width(&self) -> usize {
        self.column.kind().byte_width()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FieldError {
    #[error("component values must be an object, got {found}")]
    NotAnObject { found: String },

    #[error("component has no field '{path}'")]
    UnknownField { path: String },

    #[error("field '{path}' expects {expected}")]
    TypeMismatch { path: String, expected: &'static str },

    #[error("array field '{path}' holds at most {max} elements, got {len}")]
    ArrayTooLong { path: String, len: usize, max: usize },

    #[error("enum field '{path}' has no variant '{variant}'")]
    UnknownVariant { path: String, variant: String },
}

/// Where the values of one schema field live inside `FieldStore::columns`.
#[derive(Clone, Debug)]
enum Slot {
    Scalar(usize),
    Nested(Vec<(String, Slot)>),
    Enum {
        column: usize,
        variants: Vec<String>,
    },
    Array {
        count: usize,
        first: usize,
        length: usize,
    },
}

/// Typed per-field storage for one component type.
#[derive(Clone, Debug)]
pub struct FieldStore {
    schema: Schema,
    layout: Vec<(String, Slot)>,
    paths: Vec<String>,
    columns: Vec<Column>,
    capacity: usize,
}

impl FieldStore {
    /// Allocate zeroed columns for every leaf of `schema`, `capacity` rows each.
    pub fn new(schema: Schema, capacity: usize) -> Self {
        let mut paths = Vec::new();
        let mut columns = Vec::new();
        let layout = Self::build_layout(&schema, "", capacity, &mut paths, &mut columns);
        Self {
            schema,
            layout,
            paths,
            columns,
            capacity,
        }
    }

    fn build_layout(
        schema: &Schema,
        prefix: &str,
        capacity: usize,
        paths: &mut Vec<String>,
        columns: &mut Vec<Column>,
    ) -> Vec<(String, Slot)> {
        fn push(
            paths: &mut Vec<String>,
            columns: &mut Vec<Column>,
            path: String,
            kind: PrimitiveKind,
            capacity: usize,
        ) -> usize {
            paths.push(path);
            columns.push(Column::zeroed(kind, capacity));
            columns.len() - 1
        }

        let mut layout = Vec::with_capacity(schema.fields().len());
        for (name, ty) in schema.fields() {
            let path = join_path(prefix, name);
            let slot = match ty {
                FieldType::Scalar(kind) => Slot::Scalar(push(paths, columns, path, *kind, capacity)),
                FieldType::Nested(inner) => {
                    Slot::Nested(Self::build_layout(inner, &path, capacity, paths, columns))
                }
                FieldType::Enum(variants) => Slot::Enum {
                    column: push(paths, columns, path, PrimitiveKind::U8, capacity),
                    variants: variants.clone(),
                },
                FieldType::Array {
                    index,
                    element,
                    length,
                } => {
                    let count = push(paths, columns, format!("{path}.len"), *index, capacity);
                    for i in 0..*length {
                        push(paths, columns, format!("{path}[{i}]"), *element, capacity);
                    }
                    Slot::Array {
                        count,
                        first: count + 1,
                        length: *length,
                    }
                }
            };
            layout.push((name.clone(), slot));
        }
        layout
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Number of entity rows in every column.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Zero every field of `entity`.
    pub fn reset(&mut self, entity: EntityId) {
        let row = entity as usize;
        for column in &mut self.columns {
            column.clear_row(row);
        }
    }

    /// Check a partial value object without writing anything.
    pub fn validate(&self, values: &Value) -> Result<(), FieldError> {
        walk(&self.layout, values, "", &mut |_, _| {})
    }

    /// Write a partial value object. Fields not mentioned keep their contents.
    ///
    /// Nothing is written unless the whole object is valid.
    pub fn set(&mut self, entity: EntityId, values: &Value) -> Result<(), FieldError> {
        self.validate(values)?;
        let row = entity as usize;
        let columns = &mut self.columns;
        walk(&self.layout, values, "", &mut |column, value| {
            columns[column].write(row, value)
        })
    }

    /// Read one flattened field for `entity`, e.g. `"world.x"` or `"points[2]"`.
    pub fn get(&self, path: &str, entity: EntityId) -> Option<f64> {
        self.column(path)?.get(entity as usize)
    }

    pub fn column(&self, path: &str) -> Option<&Column> {
        let idx = self.paths.iter().position(|p| p == path)?;
        self.columns.get(idx)
    }

    /// Flattened columns in snapshot order.
    pub fn flatten(&self) -> impl Iterator<Item = FlatField<'_>> {
        self.paths
            .iter()
            .zip(&self.columns)
            .map(|(path, column)| FlatField { path, column })
    }

    pub fn flatten_mut(&mut self) -> impl Iterator<Item = &mut Column> {
        self.columns.iter_mut()
    }

    /// Bytes one entity row occupies across all columns.
    pub fn row_width(&self) -> usize {
        self.columns.iter().map(|c| c.kind().byte_width()).sum()
    }
}

fn walk(
    layout: &[(String, Slot)],
    values: &Value,
    prefix: &str,
    sink: &mut dyn FnMut(usize, Scalar),
) -> Result<(), FieldError> {
    let map = match values {
        Value::Null => return Ok(()),
        Value::Object(map) => map,
        other => {
            return Err(FieldError::NotAnObject {
                found: type_name(other).to_string(),
            })
        }
    };

    for (name, value) in map {
        let path = join_path(prefix, name);
        let Some((_, slot)) = layout.iter().find(|(field, _)| field == name) else {
            return Err(FieldError::UnknownField { path });
        };
        match slot {
            Slot::Scalar(column) => sink(*column, scalar(value, &path)?),
            Slot::Nested(inner) => walk(inner, value, &path, sink)?,
            Slot::Enum { column, variants } => {
                let index = match value {
                    Value::String(variant) => variants
                        .iter()
                        .position(|v| v == variant)
                        .ok_or_else(|| FieldError::UnknownVariant {
                            path: path.clone(),
                            variant: variant.clone(),
                        })?,
                    Value::Number(n) => match n.as_u64() {
                        Some(i) if (i as usize) < variants.len() => i as usize,
                        _ => {
                            return Err(FieldError::UnknownVariant {
                                path,
                                variant: n.to_string(),
                            })
                        }
                    },
                    _ => {
                        return Err(FieldError::TypeMismatch {
                            path,
                            expected: "a variant name or index",
                        })
                    }
                };
                sink(*column, Scalar::Int(index as i64));
            }
            Slot::Array {
                count,
                first,
                length,
            } => {
                let Value::Array(items) = value else {
                    return Err(FieldError::TypeMismatch {
                        path,
                        expected: "an array of numbers",
                    });
                };
                if items.len() > *length {
                    return Err(FieldError::ArrayTooLong {
                        path,
                        len: items.len(),
                        max: *length,
                    });
                }
                for (i, item) in items.iter().enumerate() {
                    sink(first + i, scalar(item, &path)?);
                }
                sink(*count, Scalar::Int(items.len() as i64));
            }
        }
    }
    Ok(())
}

fn scalar(value: &Value, path: &str) -> Result<Scalar, FieldError> {
    match value {
        Value::Number(n) => {
            if let Some(v) = n.as_i64() {
                Ok(Scalar::Int(v))
            } else if let Some(v) = n.as_u64() {
                Ok(Scalar::Float(v as f64))
            } else {
                Ok(Scalar::Float(n.as_f64().unwrap_or_default()))
            }
        }
        Value::Bool(b) => Ok(Scalar::Int(i64::from(*b))),
        _ => Err(FieldError::TypeMismatch {
            path: path.to_string(),
            expected: "a number",
        }),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn polygon() -> FieldStore {
        let schema = Schema::new()
            .nested(
                "origin",
                Schema::new()
                    .scalar("x", PrimitiveKind::F32)
                    .scalar("y", PrimitiveKind::F32),
            )
            .enumeration("state", ["IDLE", "WALK", "RUN"])
            .array("points", PrimitiveKind::U8, PrimitiveKind::I16, Some(4));
        FieldStore::new(schema, 8)
    }

    #[test]
    fn flatten_follows_declaration_order() {
        let store = polygon();
        let paths: Vec<&str> = store.flatten().map(|f| f.path).collect();
        assert_eq!(
            paths,
            vec![
                "origin.x",
                "origin.y",
                "state",
                "points.len",
                "points[0]",
                "points[1]",
                "points[2]",
                "points[3]",
            ]
        );
        let widths: Vec<usize> = store.flatten().map(|f| f.byte_width()).collect();
        assert_eq!(widths, vec![4, 4, 1, 1, 2, 2, 2, 2]);
        assert_eq!(store.row_width(), 18);
        assert!(store.flatten().all(|f| f.column.len() == 8));
    }

    #[test]
    fn partial_set_leaves_other_fields_untouched() {
        let mut store = polygon();
        store
            .set(3, &json!({ "origin": { "x": 1.5, "y": -2.0 }, "state": "RUN" }))
            .unwrap();
        store.set(3, &json!({ "origin": { "y": 4 } })).unwrap();

        assert_eq!(store.get("origin.x", 3), Some(1.5));
        assert_eq!(store.get("origin.y", 3), Some(4.0));
        assert_eq!(store.get("state", 3), Some(2.0));
        assert_eq!(store.get("origin.x", 2), Some(0.0));
    }

    #[test]
    fn arrays_record_their_length() {
        let mut store = polygon();
        store.set(1, &json!({ "points": [7, -3] })).unwrap();

        assert_eq!(store.get("points.len", 1), Some(2.0));
        assert_eq!(store.get("points[0]", 1), Some(7.0));
        assert_eq!(store.get("points[1]", 1), Some(-3.0));
        assert_eq!(store.get("points[2]", 1), Some(0.0));
    }

    #[test]
    fn full_default_length_array_keeps_its_count() {
        let schema = Schema::new().array("buf", PrimitiveKind::U8, PrimitiveKind::U8, None);
        let mut store = FieldStore::new(schema, 2);
        let items: Vec<u8> = (0..=254).collect();
        store.set(0, &json!({ "buf": items })).unwrap();

        assert_eq!(store.get("buf.len", 0), Some(255.0));
        assert_eq!(store.get("buf[254]", 0), Some(254.0));
        assert_eq!(store.column("buf[255]"), None);

        let overflow: Vec<u8> = vec![1; 256];
        assert!(matches!(
            store.set(1, &json!({ "buf": overflow })),
            Err(FieldError::ArrayTooLong { len: 256, max: 255, .. })
        ));
    }

    #[test]
    fn reset_zeroes_a_single_row() {
        let mut store = polygon();
        store.set(0, &json!({ "origin": { "x": 9 }, "state": 1 })).unwrap();
        store.set(1, &json!({ "origin": { "x": 5 } })).unwrap();
        store.reset(0);

        assert_eq!(store.get("origin.x", 0), Some(0.0));
        assert_eq!(store.get("state", 0), Some(0.0));
        assert_eq!(store.get("origin.x", 1), Some(5.0));
    }

    #[test]
    fn invalid_values_write_nothing() {
        let mut store = polygon();
        let err = store
            .set(2, &json!({ "origin": { "x": 3 }, "speed": 1 }))
            .unwrap_err();
        assert_eq!(
            err,
            FieldError::UnknownField {
                path: "speed".to_string()
            }
        );
        assert_eq!(store.get("origin.x", 2), Some(0.0));

        assert!(matches!(
            store.set(2, &json!({ "state": "FLY" })),
            Err(FieldError::UnknownVariant { .. })
        ));
        assert!(matches!(
            store.set(2, &json!({ "points": [1, 2, 3, 4, 5] })),
            Err(FieldError::ArrayTooLong { len: 5, max: 4, .. })
        ));
        assert!(matches!(
            store.set(2, &json!([1, 2])),
            Err(FieldError::NotAnObject { .. })
        ));
    }

    #[test]
    fn integer_columns_wrap_like_casts() {
        let mut store = FieldStore::new(Schema::new().scalar("v", PrimitiveKind::U8), 2);
        store.set(0, &json!({ "v": 300 })).unwrap();
        assert_eq!(store.get("v", 0), Some(44.0));
    }
}
