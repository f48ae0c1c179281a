//! Parsed form of a `.proto` file.
//!
//! Declarations keep source order. Type references stay as written (relative
//! or fully qualified); resolution happens when converting to a descriptor.

use std::fmt;

/// A whole `.proto` file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProtoFile {
    /// `syntax = "..."` value, if declared
    pub syntax: Option<String>,
    /// `package` name, if declared
    pub package: Option<String>,
    /// Imported file paths
    pub imports: Vec<String>,
    /// Top-level `option` statements
    pub options: Vec<OptionDecl>,
    pub messages: Vec<Message>,
    pub enums: Vec<Enum>,
    pub services: Vec<Service>,
}

/// `option name = value;`
#[derive(Debug, Clone, PartialEq)]
pub struct OptionDecl {
    /// Option name; extension names keep their parentheses, e.g. `(google.api.http)`
    pub name: String,
    pub value: Constant,
}

/// Option value
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Ident(String),
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// Text-format aggregate, `{ key: value ... }`
    Aggregate(Vec<(String, Constant)>),
    List(Vec<Constant>),
}

impl Constant {
    /// Look up the first entry named `key` in an aggregate
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Constant> {
        match self {
            Self::Aggregate(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// String payload, if this is a string constant
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// `message` block
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    pub name: String,
    pub fields: Vec<Field>,
    /// `oneof` names, indexed by `Field::oneof`
    pub oneofs: Vec<String>,
    pub messages: Vec<Message>,
    pub enums: Vec<Enum>,
}

/// Field label as written
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Label {
    /// No label (proto3 implicit presence, or a oneof member)
    #[default]
    None,
    Optional,
    Required,
    Repeated,
}

/// Field type as written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    /// Scalar or a (possibly qualified) message/enum name
    Named(String),
    /// `map<key, value>`
    Map { key: String, value: String },
}

/// One field declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub number: i32,
    pub label: Label,
    pub ty: FieldType,
    /// Index into the enclosing message's `oneofs`
    pub oneof: Option<usize>,
}

/// `enum` block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enum {
    pub name: String,
    pub values: Vec<EnumValue>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    pub name: String,
    pub number: i32,
}

/// `service` block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Service {
    pub name: String,
    pub rpcs: Vec<Rpc>,
}

/// `rpc Name (Request) returns (Response)`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rpc {
    pub name: String,
    pub request: String,
    pub response: String,
    pub client_streaming: bool,
    pub server_streaming: bool,
    /// `google.api.http` annotation, if present
    pub http: Option<HttpRule>,
}

/// HTTP verb of a `google.api.http` rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    /// Parse the rule key (`get`, `post`, ...)
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "get" => Some(Self::Get),
            "post" => Some(Self::Post),
            "put" => Some(Self::Put),
            "delete" => Some(Self::Delete),
            "patch" => Some(Self::Patch),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Post => "post",
            Self::Put => "put",
            Self::Delete => "delete",
            Self::Patch => "patch",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP mapping of an RPC
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRule {
    pub method: HttpMethod,
    pub endpoint: String,
    /// `body` selector, if any
    pub body: Option<String>,
}

impl HttpRule {
    /// Extract the rule from a `google.api.http` option value
    #[must_use]
    pub fn from_constant(value: &Constant) -> Option<Self> {
        let Constant::Aggregate(entries) = value else {
            return None;
        };
        let (method, endpoint) = entries.iter().find_map(|(key, value)| {
            Some((HttpMethod::from_key(key)?, value.as_str()?.to_string()))
        })?;
        Some(Self {
            method,
            endpoint,
            body: value.get("body").and_then(Constant::as_str).map(str::to_string),
        })
    }
}
