//! Input schemas for query and payload validation
//!
//! A [`Schema`] is an ordered list of [`Field`]s. Resolving a schema against
//! an input map yields the coerced output plus errors keyed by field path
//! (`$.id`, `$.address.city`, `$.items[0].sku`). Schemas declared in different
//! parts of a pipeline are merged into one.

use std::fmt;

use gatehouse_core::JsonMap;
use serde_json::{Number, Value};

use crate::outcome::Errors;

/// Root of every error path
pub const ROOT_PATH: &str = "$";

/// Result of resolving input against a schema
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    /// Coerced and defaulted values for declared fields
    pub output: JsonMap,
    pub errors: Errors,
}

impl Resolution {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Anything that can validate an input map
pub trait Resolve: Send + Sync {
    fn resolve(&self, input: &JsonMap) -> Resolution;
}

/// Value type a field coerces to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl FieldType {
    fn type_error(&self) -> &'static str {
        match self {
            FieldType::String => "must be a string",
            FieldType::Integer => "must be an integer",
            FieldType::Number => "must be a number",
            FieldType::Boolean => "must be a boolean",
            FieldType::Array => "must be an array",
            FieldType::Object => "must be an object",
        }
    }

    /// Converts `value` to this type, or `None` when it cannot be converted
    fn coerce(&self, value: Value) -> Option<Value> {
        match (self, value) {
            (FieldType::String, Value::String(s)) => Some(Value::String(s)),
            (FieldType::String, Value::Number(n)) => Some(Value::String(n.to_string())),
            (FieldType::String, Value::Bool(b)) => Some(Value::String(b.to_string())),

            (FieldType::Integer, Value::Number(n)) => integer(&n),
            (FieldType::Integer, Value::String(s)) => s.trim().parse::<i64>().ok().map(Value::from),

            (FieldType::Number, Value::Number(n)) => Some(Value::Number(n)),
            (FieldType::Number, Value::String(s)) => {
                let s = s.trim();
                match s.parse::<i64>() {
                    Ok(i) => Some(Value::from(i)),
                    Err(_) => s
                        .parse::<f64>()
                        .ok()
                        .and_then(Number::from_f64)
                        .map(Value::Number),
                }
            }

            (FieldType::Boolean, Value::Bool(b)) => Some(Value::Bool(b)),
            (FieldType::Boolean, Value::String(s)) => match s.trim() {
                "true" | "1" => Some(Value::Bool(true)),
                "false" | "0" => Some(Value::Bool(false)),
                _ => None,
            },

            (FieldType::Array, Value::Array(items)) => Some(Value::Array(items)),
            (FieldType::Object, Value::Object(map)) => Some(Value::Object(map)),
            _ => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Array => "array",
            FieldType::Object => "object",
        };
        f.write_str(name)
    }
}

fn integer(n: &Number) -> Option<Value> {
    if n.is_i64() || n.is_u64() {
        return Some(Value::Number(n.clone()));
    }
    n.as_f64()
        .filter(|f| f.is_finite() && f.fract() == 0.0)
        .map(|f| Value::from(f as i64))
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// A declared input field
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    name: String,
    field_type: Option<FieldType>,
    required: bool,
    present: bool,
    default: Option<Value>,
    options: Option<Vec<Value>>,
    /// Structure of an object, or of each object in an array
    schema: Option<Schema>,
}

impl Field {
    /// Untyped field: any value passes through
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: None,
            required: false,
            present: false,
            default: None,
            options: None,
            schema: None,
        }
    }

    pub fn typed(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            field_type: Some(field_type),
            ..Self::new(name)
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::typed(name, FieldType::String)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::typed(name, FieldType::Integer)
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::typed(name, FieldType::Number)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::typed(name, FieldType::Boolean)
    }

    pub fn array(name: impl Into<String>) -> Self {
        Self::typed(name, FieldType::Array)
    }

    /// Nested object validated against `schema`
    pub fn object(name: impl Into<String>, schema: Schema) -> Self {
        Self::typed(name, FieldType::Object).schema(schema)
    }

    /// The key must be present in the input
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// The key must be present and its value must not be blank
    pub fn present(mut self) -> Self {
        self.present = true;
        self
    }

    /// Value used when the key is missing or null
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Allow-list of accepted values, compared after coercion
    pub fn options<I, V>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.options = Some(options.into_iter().map(Into::into).collect());
        self
    }

    /// Structure of an object field, or of the objects in an array field
    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> Option<FieldType> {
        self.field_type
    }

    pub fn is_required(&self) -> bool {
        self.required || self.present
    }

    fn resolve_into(&self, input: &JsonMap, prefix: &str, resolution: &mut Resolution) {
        let path = format!("{}.{}", prefix, self.name);

        let value = match input.get(&self.name) {
            None => {
                if let Some(default) = &self.default {
                    resolution.output.insert(self.name.clone(), default.clone());
                } else if self.is_required() {
                    push_error(&mut resolution.errors, &path, "is required");
                }
                return;
            }
            Some(Value::Null) => {
                if let Some(default) = &self.default {
                    resolution.output.insert(self.name.clone(), default.clone());
                } else if self.present {
                    push_error(&mut resolution.errors, &path, "must be present");
                } else {
                    resolution.output.insert(self.name.clone(), Value::Null);
                }
                return;
            }
            Some(value) => value.clone(),
        };

        let value = match self.field_type {
            Some(field_type) => match field_type.coerce(value) {
                Some(value) => value,
                None => {
                    push_error(&mut resolution.errors, &path, field_type.type_error());
                    return;
                }
            },
            None => value,
        };

        if self.present && is_blank(&value) {
            push_error(&mut resolution.errors, &path, "must be present");
            return;
        }

        if let Some(options) = &self.options {
            if !options.contains(&value) {
                let allowed: Vec<String> = options.iter().map(display_value).collect();
                let message = format!("must be one of {}", allowed.join(", "));
                push_error(&mut resolution.errors, &path, &message);
                return;
            }
        }

        let value = match &self.schema {
            Some(schema) => schema.resolve_nested(value, &path, &mut resolution.errors),
            None => value,
        };

        resolution.output.insert(self.name.clone(), value);
    }
}

fn push_error(errors: &mut Errors, path: &str, message: &str) {
    errors
        .entry(path.to_string())
        .or_default()
        .push(message.to_string());
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Ordered set of fields
///
/// # Examples
///
/// ```
/// use gatehouse_pipeline::schema::{Field, Resolve, Schema};
/// use serde_json::json;
///
/// let schema = Schema::new()
///     .field(Field::integer("id").present())
///     .field(Field::string("sort").default("name").options(["name", "price"]));
///
/// let input = json!({"id": "12"}).as_object().cloned().unwrap();
/// let resolution = schema.resolve(&input);
///
/// assert!(resolution.is_valid());
/// assert_eq!(resolution.output["id"], json!(12));
/// assert_eq!(resolution.output["sort"], json!("name"));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field, replacing any earlier field with the same name
    pub fn field(mut self, field: Field) -> Self {
        self.upsert(field);
        self
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(Field::name).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Union of both schemas; fields of `other` win, first declaration
    /// keeps its position
    pub fn merge(&self, other: &Schema) -> Schema {
        let mut merged = self.clone();
        for field in &other.fields {
            merged.upsert(field.clone());
        }
        merged
    }

    fn upsert(&mut self, field: Field) {
        match self.fields.iter_mut().find(|f| f.name == field.name) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
    }

    fn resolve_at(&self, input: &JsonMap, prefix: &str) -> Resolution {
        let mut resolution = Resolution::default();
        for field in &self.fields {
            field.resolve_into(input, prefix, &mut resolution);
        }
        resolution
    }

    /// Resolves an object, or each object of an array, keeping undeclared keys
    fn resolve_nested(&self, value: Value, path: &str, errors: &mut Errors) -> Value {
        match value {
            Value::Object(map) => Value::Object(self.overlay(map, path, errors)),
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| match item {
                        Value::Object(map) => {
                            Value::Object(self.overlay(map, &format!("{}[{}]", path, i), errors))
                        }
                        other => {
                            push_error(errors, &format!("{}[{}]", path, i), "must be an object");
                            other
                        }
                    })
                    .collect(),
            ),
            other => other,
        }
    }

    fn overlay(&self, mut map: JsonMap, path: &str, errors: &mut Errors) -> JsonMap {
        let resolution = self.resolve_at(&map, path);
        errors.extend(resolution.errors);
        map.extend(resolution.output);
        map
    }
}

impl Resolve for Schema {
    fn resolve(&self, input: &JsonMap) -> Resolution {
        self.resolve_at(input, ROOT_PATH)
    }
}

/// Merges two optional schemas, keeping whichever side is present
pub fn merge_optional(left: Option<Schema>, right: Option<Schema>) -> Option<Schema> {
    match (left, right) {
        (Some(left), Some(right)) => Some(left.merge(&right)),
        (left, None) => left,
        (None, right) => right,
    }
}
