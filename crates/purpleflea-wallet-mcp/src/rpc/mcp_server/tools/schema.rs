//! Declarative tool input schemas.
//!
//! Every tool describes its parameters once, as a static [`Param`] table. The same table renders
//! the `inputSchema` served by `tools/list` and validates `tools/call` arguments before anything
//! touches the network. A tool also names the single backend request it makes, and optionally how
//! the backend's answer is reshaped before it is returned.

use serde_json::{json, Map, Number, Value};

use crate::api::ApiRequest;
use crate::errors::ArgsError;

/// Builds the tool's one backend request from validated arguments.
pub type BuildRequest = fn(&ToolArgs) -> Result<ApiRequest, ArgsError>;

/// Turns the backend payload into the tool's result. Tools without one return the payload as is.
pub type Reshape = fn(&ToolArgs, &Value) -> Result<Value, ArgsError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Number,
}

impl ParamKind {
    pub const fn json_type(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
        }
    }

    fn accepts(self, v: &Value) -> bool {
        match self {
            Self::String => v.is_string(),
            Self::Number => v.is_number(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamDefault {
    Number(u64),
}

impl ParamDefault {
    fn to_value(self) -> Value {
        match self {
            Self::Number(n) => Value::Number(Number::from(n)),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Param {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub default: Option<ParamDefault>,
    pub description: &'static str,
}

impl Param {
    pub const fn required_str(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::String,
            required: true,
            default: None,
            description,
        }
    }

    pub const fn optional_str(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::String,
            required: false,
            default: None,
            description,
        }
    }

    pub const fn number_or(name: &'static str, default: u64, description: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::Number,
            required: false,
            default: Some(ParamDefault::Number(default)),
            description,
        }
    }

    fn schema(&self) -> Value {
        let mut prop = Map::new();
        prop.insert("type".into(), json!(self.kind.json_type()));
        prop.insert("description".into(), json!(self.description));
        if let Some(d) = self.default {
            prop.insert("default".into(), d.to_value());
        }
        Value::Object(prop)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub params: &'static [Param],
    pub request: BuildRequest,
    pub reshape: Option<Reshape>,
}

impl ToolSpec {
    pub fn input_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .params
            .iter()
            .map(|p| (p.name.to_owned(), p.schema()))
            .collect();
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name)
            .collect();

        let mut schema = Map::new();
        schema.insert("type".into(), json!("object"));
        schema.insert("properties".into(), Value::Object(properties));
        if !required.is_empty() {
            schema.insert("required".into(), json!(required));
        }
        schema.insert("additionalProperties".into(), json!(false));
        Value::Object(schema)
    }

    pub fn descriptor(&self) -> Value {
        json!({
          "name": self.name,
          "description": self.description,
          "inputSchema": self.input_schema(),
        })
    }

    /// Check `args` against the parameter table and fill in defaults.
    ///
    /// `null` (or a missing argument object) counts as `{}`; a `null` parameter counts as absent.
    pub fn validate(&self, args: Value) -> Result<ToolArgs, ArgsError> {
        let mut obj = match args {
            Value::Object(m) => m,
            Value::Null => Map::new(),
            Value::Bool(_) | Value::Number(_) | Value::String(_) | Value::Array(_) => {
                return Err(ArgsError::NotAnObject)
            }
        };
        obj.retain(|_, v| !v.is_null());

        if let Some(extra) = obj
            .keys()
            .find(|k| !self.params.iter().any(|p| p.name == k.as_str()))
        {
            return Err(ArgsError::Unexpected(extra.clone()));
        }

        for p in self.params {
            match obj.get(p.name) {
                Some(v) if !p.kind.accepts(v) => {
                    return Err(ArgsError::WrongType {
                        name: p.name,
                        expected: p.kind.json_type(),
                    });
                }
                Some(_) => {}
                None if p.required => return Err(ArgsError::Missing(p.name)),
                None => {
                    if let Some(d) = p.default {
                        obj.insert(p.name.to_owned(), d.to_value());
                    }
                }
            }
        }

        Ok(ToolArgs(obj))
    }
}

/// Arguments that passed [`ToolSpec::validate`].
#[derive(Debug, Clone, PartialEq)]
pub struct ToolArgs(Map<String, Value>);

impl ToolArgs {
    pub fn required_str(&self, name: &'static str) -> Result<&str, ArgsError> {
        self.0
            .get(name)
            .and_then(Value::as_str)
            .ok_or(ArgsError::Missing(name))
    }

    /// Optional string parameter. Empty strings count as absent.
    pub fn opt_str(&self, name: &str) -> Option<&str> {
        self.0
            .get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn number(&self, name: &'static str) -> Result<&Number, ArgsError> {
        match self.0.get(name) {
            Some(Value::Number(n)) => Ok(n),
            Some(_) => Err(ArgsError::WrongType {
                name,
                expected: ParamKind::Number.json_type(),
            }),
            None => Err(ArgsError::Missing(name)),
        }
    }
}
