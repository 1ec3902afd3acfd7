// schema.rs - Component data layout description
//
// A schema is an ordered tree of named fields. Every leaf ends up as one
// primitive column in the component's field store, so declaration order is
// also the snapshot order.

use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Primitive element type of a flattened column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
    F64,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 8] = [
        PrimitiveKind::I8,
        PrimitiveKind::U8,
        PrimitiveKind::I16,
        PrimitiveKind::U16,
        PrimitiveKind::I32,
        PrimitiveKind::U32,
        PrimitiveKind::F32,
        PrimitiveKind::F64,
    ];

    /// Size of one element in bytes.
    #[inline]
    pub const fn byte_width(self) -> usize {
        match self {
            PrimitiveKind::I8 | PrimitiveKind::U8 => 1,
            PrimitiveKind::I16 | PrimitiveKind::U16 => 2,
            PrimitiveKind::I32 | PrimitiveKind::U32 | PrimitiveKind::F32 => 4,
            PrimitiveKind::F64 => 8,
        }
    }

    /// Schema spelling of the type, e.g. `"uint16"`.
    pub const fn name(self) -> &'static str {
        match self {
            PrimitiveKind::I8 => "int8",
            PrimitiveKind::U8 => "uint8",
            PrimitiveKind::I16 => "int16",
            PrimitiveKind::U16 => "uint16",
            PrimitiveKind::I32 => "int32",
            PrimitiveKind::U32 => "uint32",
            PrimitiveKind::F32 => "float32",
            PrimitiveKind::F64 => "float64",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Largest element count an index of this kind can store, capped at 255.
    pub(crate) fn index_slots(self) -> usize {
        match self {
            PrimitiveKind::I8 => i8::MAX as usize,
            _ => u8::MAX as usize,
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Type of a single schema field.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldType {
    Scalar(PrimitiveKind),
    Nested(Schema),
    /// Named variants stored as a `u8` variant index.
    Enum(Vec<String>),
    /// Fixed-length per-entity array plus an element count of kind `index`.
    Array {
        index: PrimitiveKind,
        element: PrimitiveKind,
        length: usize,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("field '{path}' has unknown type '{name}'")]
    UnknownType { path: String, name: String },

    #[error("field '{path}' is declared twice")]
    DuplicateField { path: String },

    #[error("enum field '{path}' needs between 1 and 256 variants, got {count}")]
    EnumVariants { path: String, count: usize },

    #[error("array field '{path}' has length {length}, index type {index} allows at most {max}")]
    ArrayLength {
        path: String,
        index: PrimitiveKind,
        length: usize,
        max: usize,
    },

    #[error("field '{path}' has an unsupported definition")]
    Malformed { path: String },
}

/// Ordered set of named fields describing one component's data.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Schema {
    fields: Vec<(String, FieldType)>,
}

impl Schema {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// A component with no data, used purely as a membership tag.
    pub fn tag() -> Self {
        Self::new()
    }

    pub fn scalar(self, name: impl Into<String>, kind: PrimitiveKind) -> Self {
        self.field(name, FieldType::Scalar(kind))
    }

    pub fn nested(self, name: impl Into<String>, schema: Schema) -> Self {
        self.field(name, FieldType::Nested(schema))
    }

    pub fn enumeration<I, S>(self, name: impl Into<String>, variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.field(
            name,
            FieldType::Enum(variants.into_iter().map(Into::into).collect()),
        )
    }

    /// Add an array field; `length` defaults to every slot `index` can address.
    pub fn array(
        self,
        name: impl Into<String>,
        index: PrimitiveKind,
        element: PrimitiveKind,
        length: Option<usize>,
    ) -> Self {
        let length = length.unwrap_or_else(|| index.index_slots());
        self.field(
            name,
            FieldType::Array {
                index,
                element,
                length,
            },
        )
    }

    /// Append a field. Repeated names are reported by [`Schema::validate`].
    pub fn field(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.fields.push((name.into(), ty));
        self
    }

    pub fn fields(&self) -> &[(String, FieldType)] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Parse the JSON schema notation:
    ///
    /// ```ignore
    /// {
    ///   "x": "float32",
    ///   "world": { "x": "float32", "y": "float32" },
    ///   "animation": ["IDLE", "WALK", "RUN"],
    ///   "points": [{ "index": "uint8", "type": "float32", "length": 8 }]
    /// }
    /// ```
    pub fn from_json(value: &Value) -> Result<Self, SchemaError> {
        Self::parse_object(value, "")
    }

    pub fn from_json_str(json: &str) -> Result<Self, SchemaError> {
        let value: Value = serde_json::from_str(json).map_err(|_| SchemaError::Malformed {
            path: String::new(),
        })?;
        Self::from_json(&value)
    }

    /// Check the constraints the builder methods cannot enforce.
    pub fn validate(&self) -> Result<(), SchemaError> {
        self.validate_at("")
    }

    fn validate_at(&self, prefix: &str) -> Result<(), SchemaError> {
        for (i, (name, ty)) in self.fields.iter().enumerate() {
            let path = join_path(prefix, name);
            if self.fields[..i].iter().any(|(earlier, _)| earlier == name) {
                return Err(SchemaError::DuplicateField { path });
            }
            match ty {
                FieldType::Scalar(_) => {}
                FieldType::Nested(inner) => inner.validate_at(&path)?,
                FieldType::Enum(variants) => {
                    if variants.is_empty() || variants.len() > 256 {
                        return Err(SchemaError::EnumVariants {
                            path,
                            count: variants.len(),
                        });
                    }
                }
                FieldType::Array { index, length, .. } => {
                    let max = index.index_slots();
                    if *length == 0 || *length > max {
                        return Err(SchemaError::ArrayLength {
                            path,
                            index: *index,
                            length: *length,
                            max,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn parse_object(value: &Value, prefix: &str) -> Result<Self, SchemaError> {
        let Value::Object(map) = value else {
            return Err(SchemaError::Malformed {
                path: prefix.to_string(),
            });
        };

        let mut fields = Vec::with_capacity(map.len());
        for (name, def) in map {
            let path = join_path(prefix, name);
            fields.push((name.clone(), Self::parse_field(def, &path)?));
        }

        let schema = Self { fields };
        schema.validate_at(prefix)?;
        Ok(schema)
    }

    fn parse_field(def: &Value, path: &str) -> Result<FieldType, SchemaError> {
        match def {
            Value::String(name) => PrimitiveKind::parse(name)
                .map(FieldType::Scalar)
                .ok_or_else(|| SchemaError::UnknownType {
                    path: path.to_string(),
                    name: name.clone(),
                }),
            Value::Object(_) => Ok(FieldType::Nested(Self::parse_object(def, path)?)),
            Value::Array(items) => match items.as_slice() {
                [Value::Object(decl)] => {
                    let kind = |key: &str, fallback: Option<PrimitiveKind>| {
                        match decl.get(key) {
                            Some(Value::String(name)) => PrimitiveKind::parse(name).ok_or_else(
                                || SchemaError::UnknownType {
                                    path: path.to_string(),
                                    name: name.clone(),
                                },
                            ),
                            None => fallback.ok_or_else(|| SchemaError::Malformed {
                                path: path.to_string(),
                            }),
                            Some(_) => Err(SchemaError::Malformed {
                                path: path.to_string(),
                            }),
                        }
                    };
                    let index = kind("index", Some(PrimitiveKind::U8))?;
                    let element = kind("type", None)?;
                    let length = match decl.get("length") {
                        Some(raw) => Some(raw.as_u64().ok_or_else(|| SchemaError::Malformed {
                            path: path.to_string(),
                        })? as usize),
                        None => None,
                    };
                    Ok(FieldType::Array {
                        index,
                        element,
                        length: length.unwrap_or_else(|| index.index_slots()),
                    })
                }
                variants if variants.iter().all(Value::is_string) => Ok(FieldType::Enum(
                    variants
                        .iter()
                        .filter_map(|v| v.as_str().map(str::to_string))
                        .collect(),
                )),
                _ => Err(SchemaError::Malformed {
                    path: path.to_string(),
                }),
            },
            _ => Err(SchemaError::Malformed {
                path: path.to_string(),
            }),
        }
    }
}

pub(crate) fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_every_field_form_in_declaration_order() {
        let schema = Schema::from_json(&json!({
            "y": "int32",
            "x": "int32",
            "world": { "x": "float32", "y": "float32" },
            "animation": ["IDLE", "WALK", "RUN"],
            "points": [{ "index": "uint8", "type": "float32", "length": 8 }]
        }))
        .unwrap();

        let names: Vec<&str> = schema.fields().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["y", "x", "world", "animation", "points"]);
        assert_eq!(schema.fields()[0].1, FieldType::Scalar(PrimitiveKind::I32));
        assert_eq!(
            schema.fields()[4].1,
            FieldType::Array {
                index: PrimitiveKind::U8,
                element: PrimitiveKind::F32,
                length: 8
            }
        );
        assert!(matches!(&schema.fields()[3].1, FieldType::Enum(v) if v.len() == 3));
    }

    #[test]
    fn array_length_defaults_to_index_range() {
        let schema = Schema::from_json(&json!({
            "slots": [{ "index": "uint8", "type": "uint16" }]
        }))
        .unwrap();
        assert!(matches!(
            schema.fields()[0].1,
            FieldType::Array { length: 255, .. }
        ));
    }

    #[test]
    fn unknown_types_report_their_path() {
        let err = Schema::from_json(&json!({ "body": { "mass": "float128" } })).unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnknownType {
                path: "body.mass".to_string(),
                name: "float128".to_string()
            }
        );
    }

    #[test]
    fn oversized_arrays_are_rejected() {
        let schema = Schema::new().array("buf", PrimitiveKind::I8, PrimitiveKind::U8, Some(200));
        assert!(matches!(
            schema.validate(),
            Err(SchemaError::ArrayLength { max: 127, .. })
        ));
    }

    #[test]
    fn repeated_field_names_are_rejected() {
        let schema = Schema::new().nested(
            "body",
            Schema::new()
                .scalar("mass", PrimitiveKind::F32)
                .scalar("mass", PrimitiveKind::F64),
        );
        assert_eq!(
            schema.validate(),
            Err(SchemaError::DuplicateField {
                path: "body.mass".to_string()
            })
        );
    }

    #[test]
    fn byte_widths_match_primitive_sizes() {
        assert_eq!(PrimitiveKind::I8.byte_width(), std::mem::size_of::<i8>());
        assert_eq!(PrimitiveKind::U16.byte_width(), std::mem::size_of::<u16>());
        assert_eq!(PrimitiveKind::F32.byte_width(), std::mem::size_of::<f32>());
        assert_eq!(PrimitiveKind::F64.byte_width(), std::mem::size_of::<f64>());
        assert_eq!(PrimitiveKind::parse("uint32"), Some(PrimitiveKind::U32));
        assert_eq!(PrimitiveKind::parse("u32"), None);
    }
}
