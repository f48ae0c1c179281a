//! Conversion of a parsed file into a standard `FileDescriptorProto`.
//!
//! Type references are resolved with protobuf scoping rules: a relative name
//! is looked up from the innermost enclosing scope outwards; a leading `.`
//! makes it absolute. Only types declared in the same file can be resolved.
//! In a file with imports, a name that does not resolve locally is kept as an
//! external reference with its kind left unset, the way a descriptor looks
//! before its dependencies are linked.

use crate::ast::{self, FieldType, Label, ProtoFile};
use prost_types::field_descriptor_proto::{Label as PbLabel, Type};
use prost_types::{
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FileDescriptorProto, MessageOptions, MethodDescriptorProto, OneofDescriptorProto,
    ServiceDescriptorProto,
};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::debug;

/// Error type for descriptor conversion
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    #[error("Unresolved type {type_name:?} referenced from {scope:?}")]
    UnresolvedType { type_name: String, scope: String },

    #[error("Invalid map key type {key_type:?} for field {field:?}")]
    InvalidMapKey { field: String, key_type: String },

    #[error("Duplicate field number {number} in {message:?}")]
    DuplicateFieldNumber { message: String, number: i32 },
}

type Result<T> = std::result::Result<T, DescriptorError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Symbol {
    Message,
    Enum,
}

fn scalar_type(name: &str) -> Option<Type> {
    Some(match name {
        "double" => Type::Double,
        "float" => Type::Float,
        "int64" => Type::Int64,
        "uint64" => Type::Uint64,
        "int32" => Type::Int32,
        "fixed64" => Type::Fixed64,
        "fixed32" => Type::Fixed32,
        "bool" => Type::Bool,
        "string" => Type::String,
        "bytes" => Type::Bytes,
        "uint32" => Type::Uint32,
        "sfixed32" => Type::Sfixed32,
        "sfixed64" => Type::Sfixed64,
        "sint32" => Type::Sint32,
        "sint64" => Type::Sint64,
        _ => return None,
    })
}

fn is_valid_map_key(ty: Type) -> bool {
    !matches!(
        ty,
        Type::Double | Type::Float | Type::Bytes | Type::Message | Type::Enum | Type::Group
    )
}

fn join(scope: &str, name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{scope}.{name}")
    }
}

/// `foo_bar` -> `FooBar`, the way protoc names map entry messages
fn upper_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = true;
    for c in name.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// `foo_bar` -> `fooBar`, protoc's default JSON name
fn json_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

struct Resolver {
    symbols: HashMap<String, Symbol>,
    package: String,
    has_imports: bool,
    proto3: bool,
}

impl Resolver {
    fn new(file: &ProtoFile) -> Self {
        let mut symbols = HashMap::new();
        let package = file.package.clone().unwrap_or_default();
        for message in &file.messages {
            Self::collect_message(&mut symbols, &package, message);
        }
        for proto_enum in &file.enums {
            symbols.insert(join(&package, &proto_enum.name), Symbol::Enum);
        }
        Self {
            symbols,
            package,
            has_imports: !file.imports.is_empty(),
            proto3: file.syntax.as_deref() == Some("proto3"),
        }
    }

    fn collect_message(symbols: &mut HashMap<String, Symbol>, scope: &str, message: &ast::Message) {
        let full = join(scope, &message.name);
        for nested in &message.messages {
            Self::collect_message(symbols, &full, nested);
        }
        for proto_enum in &message.enums {
            symbols.insert(join(&full, &proto_enum.name), Symbol::Enum);
        }
        symbols.insert(full, Symbol::Message);
    }

    /// Resolve `name` as seen from `scope`, returning `.full.Name` and its
    /// kind. The kind is `None` for a reference into an imported file.
    fn resolve(&self, name: &str, scope: &str) -> Result<(String, Option<Symbol>)> {
        if let Some(local) = self.resolve_local(name, scope) {
            return Ok(local);
        }
        if !self.has_imports {
            return Err(DescriptorError::UnresolvedType {
                type_name: name.to_string(),
                scope: scope.to_string(),
            });
        }

        let external = if name.starts_with('.') {
            name.to_string()
        } else if name.contains('.') {
            format!(".{name}")
        } else {
            format!(".{}", join(&self.package, name))
        };
        debug!(type_name = name, scope, external = %external, "Assuming imported type");
        Ok((external, None))
    }

    fn resolve_local(&self, name: &str, scope: &str) -> Option<(String, Option<Symbol>)> {
        if let Some(absolute) = name.strip_prefix('.') {
            return self
                .symbols
                .get(absolute)
                .map(|&symbol| (name.to_string(), Some(symbol)));
        }

        let mut current = scope;
        loop {
            let candidate = join(current, name);
            if let Some(&symbol) = self.symbols.get(&candidate) {
                return Some((format!(".{candidate}"), Some(symbol)));
            }
            if current.is_empty() {
                return None;
            }
            current = current.rsplit_once('.').map_or("", |(parent, _)| parent);
        }
    }

    /// Fill in `type`/`type_name` for a named field type
    fn typed_field(&self, type_name: &str, scope: &str, field: &mut FieldDescriptorProto) -> Result<()> {
        if let Some(scalar) = scalar_type(type_name) {
            field.set_type(scalar);
            return Ok(());
        }
        let (full, symbol) = self.resolve(type_name, scope)?;
        match symbol {
            Some(Symbol::Message) => field.set_type(Type::Message),
            Some(Symbol::Enum) => field.set_type(Type::Enum),
            None => {}
        }
        field.type_name = Some(full);
        Ok(())
    }

    fn message(&self, message: &ast::Message, scope: &str) -> Result<DescriptorProto> {
        let full = join(scope, &message.name);
        let mut descriptor = DescriptorProto {
            name: Some(message.name.clone()),
            oneof_decl: message
                .oneofs
                .iter()
                .map(|name| OneofDescriptorProto {
                    name: Some(name.clone()),
                    ..OneofDescriptorProto::default()
                })
                .collect(),
            ..DescriptorProto::default()
        };

        let mut numbers = HashSet::new();
        let mut synthetic_oneofs = Vec::new();

        for field in &message.fields {
            if !numbers.insert(field.number) {
                return Err(DescriptorError::DuplicateFieldNumber {
                    message: full,
                    number: field.number,
                });
            }

            let mut proto = FieldDescriptorProto {
                name: Some(field.name.clone()),
                number: Some(field.number),
                json_name: Some(json_name(&field.name)),
                oneof_index: field.oneof.and_then(|i| i32::try_from(i).ok()),
                ..FieldDescriptorProto::default()
            };
            proto.set_label(match field.label {
                Label::Repeated => PbLabel::Repeated,
                Label::Required => PbLabel::Required,
                Label::Optional | Label::None => PbLabel::Optional,
            });

            match &field.ty {
                FieldType::Named(type_name) => self.typed_field(type_name, &full, &mut proto)?,
                FieldType::Map { key, value } => {
                    let entry = self.map_entry(&field.name, key, value, &full)?;
                    proto.set_type(Type::Message);
                    proto.type_name = Some(format!(".{full}.{}", entry.name()));
                    descriptor.nested_type.push(entry);
                }
            }

            if self.proto3 && field.label == Label::Optional && field.oneof.is_none() {
                proto.proto3_optional = Some(true);
                synthetic_oneofs.push((proto.name().to_string(), descriptor.field.len()));
            }
            descriptor.field.push(proto);
        }

        // Synthetic oneofs for proto3 `optional` come after the declared ones
        for (name, at) in synthetic_oneofs {
            let index = i32::try_from(descriptor.oneof_decl.len()).ok();
            descriptor.oneof_decl.push(OneofDescriptorProto {
                name: Some(format!("_{name}")),
                ..OneofDescriptorProto::default()
            });
            if let Some(field) = descriptor.field.get_mut(at) {
                field.oneof_index = index;
            }
        }

        for nested in &message.messages {
            descriptor.nested_type.push(self.message(nested, &full)?);
        }
        descriptor.enum_type = message.enums.iter().map(enum_descriptor).collect();

        Ok(descriptor)
    }

    fn map_entry(&self, field: &str, key: &str, value: &str, scope: &str) -> Result<DescriptorProto> {
        let key_type = scalar_type(key)
            .filter(|&ty| is_valid_map_key(ty))
            .ok_or_else(|| DescriptorError::InvalidMapKey {
                field: field.to_string(),
                key_type: key.to_string(),
            })?;

        let mut key_field = FieldDescriptorProto {
            name: Some("key".to_string()),
            number: Some(1),
            json_name: Some("key".to_string()),
            ..FieldDescriptorProto::default()
        };
        key_field.set_label(PbLabel::Optional);
        key_field.set_type(key_type);

        let mut value_field = FieldDescriptorProto {
            name: Some("value".to_string()),
            number: Some(2),
            json_name: Some("value".to_string()),
            ..FieldDescriptorProto::default()
        };
        value_field.set_label(PbLabel::Optional);
        self.typed_field(value, scope, &mut value_field)?;

        Ok(DescriptorProto {
            name: Some(format!("{}Entry", upper_camel(field))),
            field: vec![key_field, value_field],
            options: Some(MessageOptions {
                map_entry: Some(true),
                ..MessageOptions::default()
            }),
            ..DescriptorProto::default()
        })
    }

    fn service(&self, service: &ast::Service, package: &str) -> Result<ServiceDescriptorProto> {
        let method = service
            .rpcs
            .iter()
            .map(|rpc| {
                Ok(MethodDescriptorProto {
                    name: Some(rpc.name.clone()),
                    input_type: Some(self.resolve(&rpc.request, package)?.0),
                    output_type: Some(self.resolve(&rpc.response, package)?.0),
                    client_streaming: rpc.client_streaming.then_some(true),
                    server_streaming: rpc.server_streaming.then_some(true),
                    ..MethodDescriptorProto::default()
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ServiceDescriptorProto {
            name: Some(service.name.clone()),
            method,
            ..ServiceDescriptorProto::default()
        })
    }
}

fn enum_descriptor(proto_enum: &ast::Enum) -> EnumDescriptorProto {
    EnumDescriptorProto {
        name: Some(proto_enum.name.clone()),
        value: proto_enum
            .values
            .iter()
            .map(|v| EnumValueDescriptorProto {
                name: Some(v.name.clone()),
                number: Some(v.number),
                ..EnumValueDescriptorProto::default()
            })
            .collect(),
        ..EnumDescriptorProto::default()
    }
}

/// Convert a parsed file into a `FileDescriptorProto` named `file_name`.
///
/// # Errors
///
/// Returns a `DescriptorError` for unresolvable type references, invalid map
/// keys or duplicate field numbers.
pub fn to_descriptor(file: &ProtoFile, file_name: &str) -> Result<FileDescriptorProto> {
    let resolver = Resolver::new(file);
    let package = file.package.clone().unwrap_or_default();

    let message_type = file
        .messages
        .iter()
        .map(|m| resolver.message(m, &package))
        .collect::<Result<Vec<_>>>()?;
    let service = file
        .services
        .iter()
        .map(|s| resolver.service(s, &package))
        .collect::<Result<Vec<_>>>()?;

    debug!(
        file = file_name,
        messages = message_type.len(),
        services = service.len(),
        "Built file descriptor"
    );

    Ok(FileDescriptorProto {
        name: Some(file_name.to_string()),
        package: file.package.clone(),
        dependency: file.imports.clone(),
        message_type,
        enum_type: file.enums.iter().map(enum_descriptor).collect(),
        service,
        syntax: file.syntax.clone(),
        ..FileDescriptorProto::default()
    })
}
