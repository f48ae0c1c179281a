//! Rust source generation for a method table.
//!
//! Output is a single module meant to live inside the `proto-stub` crate: the
//! `Method` enum and a unit struct implementing `RpcTable`. Request types are
//! the prost messages generated for the same file; their descriptors come from
//! the `ReflectMessage` impls prost-reflect-build adds to them.

use common::error::StubError;
use common::types::MethodPath;
use prost_types::{DescriptorProto, FileDescriptorProto};
use proc_macro2::Span;
use quote::quote;
use std::collections::{HashMap, HashSet};
use std::ffi::CString;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Error type for code generation
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("No RPCs to generate a stub for")]
    NoRpcs,

    #[error("Type {type_name:?} is outside package {package:?}")]
    ForeignType { type_name: String, package: String },

    #[error("Unknown type {0:?}")]
    UnknownType(String),

    #[error("Invalid method path: {0}")]
    MethodPath(#[from] StubError),

    #[error("{0:?} is not a valid Rust identifier or path")]
    InvalidIdentifier(String),

    #[error("Generated code failed to parse: {0}")]
    Syntax(#[from] syn::Error),
}

type Result<T> = std::result::Result<T, GenerateError>;

/// Knobs for `generate_stub`
#[derive(Debug, Clone)]
pub struct StubOptions {
    /// Rust path of the prost message module; defaults to `proto_gen::<package>`
    pub messages_module: Option<String>,
    /// Path of the `proto-stub` crate as seen from the generated module
    pub crate_path: String,
    /// Name of the generated table struct; defaults to the first service name
    pub table_name: Option<String>,
    /// Source file named in the generated header
    pub source: String,
}

impl Default for StubOptions {
    fn default() -> Self {
        Self {
            messages_module: None,
            crate_path: "crate".to_string(),
            table_name: None,
            source: String::new(),
        }
    }
}

// ============================================================================
// Naming
// ============================================================================

/// Words that cannot be used as plain identifiers
const RUST_KEYWORDS: &[&str] = &[
    "as", "break", "const", "continue", "crate", "else", "enum", "extern", "false", "fn", "for",
    "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref", "return",
    "self", "Self", "static", "struct", "super", "trait", "true", "type", "unsafe", "use", "where",
    "while", "async", "await", "dyn", "abstract", "become", "box", "do", "final", "macro",
    "override", "priv", "typeof", "unsized", "virtual", "yield", "try",
];

/// Keywords that are not allowed as raw identifiers either
const SUFFIXED_KEYWORDS: &[&str] = &["crate", "extern", "self", "Self", "super"];

/// Escape a keyword the way prost does: `r#match`, `self_`, `Self_`
fn sanitize(name: String) -> String {
    if SUFFIXED_KEYWORDS.contains(&name.as_str()) {
        format!("{name}_")
    } else if RUST_KEYWORDS.contains(&name.as_str()) {
        format!("r#{name}")
    } else {
        name
    }
}

/// Split an identifier into words on `_`, `.` and case boundaries
fn words(name: &str) -> Vec<String> {
    let chars: Vec<char> = name.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c == '.' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        let prev = i.checked_sub(1).and_then(|j| chars.get(j)).copied();
        let next = chars.get(i + 1).copied();
        let boundary = c.is_uppercase()
            && !current.is_empty()
            && (prev.is_some_and(|p| p.is_lowercase() || p.is_ascii_digit())
                || (prev.is_some_and(char::is_uppercase) && next.is_some_and(char::is_lowercase)));
        if boundary {
            words.push(std::mem::take(&mut current));
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Type name as prost renders it, e.g. `HTTPRequest` -> `HttpRequest`
fn upper_camel(name: &str) -> String {
    sanitize(
        words(name)
            .iter()
            .map(|word| {
                let mut chars = word.chars();
                chars.next().map_or_else(String::new, |first| {
                    first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
                })
            })
            .collect(),
    )
}

/// Module name as prost renders it, e.g. `OuterMessage` -> `outer_message`
fn snake(name: &str) -> String {
    sanitize(
        words(name)
            .iter()
            .map(|w| w.to_lowercase())
            .collect::<Vec<_>>()
            .join("_"),
    )
}

fn ident(name: &str) -> Result<syn::Ident> {
    syn::parse_str(name).map_err(|_| GenerateError::InvalidIdentifier(name.to_string()))
}

fn path(path: &str) -> Result<syn::Path> {
    syn::parse_str(path).map_err(|_| GenerateError::InvalidIdentifier(path.to_string()))
}

fn doc(text: &str) -> String {
    format!(" {text}")
}

// ============================================================================
// Descriptor index
// ============================================================================

/// Messages declared in the file, by `.pkg.Outer.Inner` name
struct Index<'a> {
    package: String,
    messages: HashMap<String, &'a DescriptorProto>,
}

impl<'a> Index<'a> {
    fn new(file: &'a FileDescriptorProto, package: String) -> Self {
        let mut index = Self {
            package,
            messages: HashMap::new(),
        };
        let prefix = match file.package() {
            "" => String::new(),
            package => format!(".{package}"),
        };
        for message in &file.message_type {
            index.add_message(&prefix, message);
        }
        index
    }

    fn add_message(&mut self, prefix: &str, message: &'a DescriptorProto) {
        let full = format!("{prefix}.{}", message.name());
        for nested in &message.nested_type {
            self.add_message(&full, nested);
        }
        self.messages.insert(full, message);
    }

    /// `.pkg.Outer.Inner` -> `Outer.Inner`
    fn relative<'n>(&self, type_name: &'n str) -> Result<&'n str> {
        let stripped = type_name.strip_prefix('.').unwrap_or(type_name);
        if self.package.is_empty() {
            return Ok(stripped);
        }
        stripped
            .strip_prefix(self.package.as_str())
            .and_then(|rest| rest.strip_prefix('.'))
            .ok_or_else(|| GenerateError::ForeignType {
                type_name: type_name.to_string(),
                package: self.package.clone(),
            })
    }

    /// `pkg.Outer.Inner` without the leading dot
    fn full_name(type_name: &str) -> &str {
        type_name.strip_prefix('.').unwrap_or(type_name)
    }

    /// Rust path of a request type declared in this file.
    ///
    /// Types from imported files get no generated code in the messages
    /// module, so they are rejected here rather than at compile time.
    fn request_type(&self, module: &str, type_name: &str) -> Result<syn::Path> {
        let relative = self.relative(type_name)?;
        if !self.messages.contains_key(type_name) {
            return Err(GenerateError::UnknownType(type_name.to_string()));
        }
        self.rust_type(module, relative)
    }

    /// `Outer.Inner` -> `<module>::outer::Inner`
    fn rust_type(&self, module: &str, relative: &str) -> Result<syn::Path> {
        let mut segments: Vec<&str> = relative.split('.').collect();
        let last = segments.pop().unwrap_or_default();
        let mut rendered = module.to_string();
        for outer in segments {
            rendered.push_str("::");
            rendered.push_str(&snake(outer));
        }
        rendered.push_str("::");
        rendered.push_str(&upper_camel(last));
        path(&rendered)
    }
}

// ============================================================================
// Generation
// ============================================================================

struct MethodEntry {
    variant: syn::Ident,
    path: MethodPath,
    input_type: String,
}

fn collect_methods(file: &FileDescriptorProto, package: &str) -> Result<Vec<MethodEntry>> {
    let all: Vec<(&str, &str, &str)> = file
        .service
        .iter()
        .flat_map(|service| {
            service
                .method
                .iter()
                .map(move |method| (service.name(), method.name(), method.input_type()))
        })
        .collect();

    let mut seen = HashSet::new();
    let duplicated: HashSet<&str> = all
        .iter()
        .filter(|(_, rpc, _)| !seen.insert(*rpc))
        .map(|(_, rpc, _)| *rpc)
        .collect();

    all.into_iter()
        .map(|(service, rpc, input_type)| {
            let variant = if duplicated.contains(rpc) {
                format!("{service}{rpc}")
            } else {
                rpc.to_string()
            };
            Ok(MethodEntry {
                variant: ident(&upper_camel(&variant))?,
                path: MethodPath::new(package, service, rpc)?,
                input_type: input_type.to_string(),
            })
        })
        .collect()
}

/// Package used in method paths: the declared package, else the file stem
#[must_use]
pub fn stub_package(file: &FileDescriptorProto) -> String {
    match file.package() {
        "" => Path::new(file.name())
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default(),
        package => package.to_string(),
    }
}

/// Generate the stub module for `file`.
///
/// # Errors
///
/// Returns a `GenerateError` when the file declares no RPCs, a request type is
/// not declared in the file, or a name is not a valid method path or Rust
/// identifier.
pub fn generate_stub(file: &FileDescriptorProto, options: &StubOptions) -> Result<String> {
    let package = stub_package(file);
    let index = Index::new(file, file.package().to_string());
    let methods = collect_methods(file, &package)?;
    if methods.is_empty() {
        return Err(GenerateError::NoRpcs);
    }

    let module = options
        .messages_module
        .clone()
        .unwrap_or_else(|| format!("proto_gen::{}", snake(&package)));
    let krate = path(&options.crate_path)?;
    let table_name = options
        .table_name
        .clone()
        .or_else(|| file.service.first().map(|s| upper_camel(s.name())))
        .unwrap_or_else(|| "Table".to_string());
    let table = ident(&table_name)?;

    let variants: Vec<&syn::Ident> = methods.iter().map(|m| &m.variant).collect();
    let paths: Vec<&str> = methods.iter().map(|m| m.path.as_str()).collect();
    let c_paths = methods
        .iter()
        .map(|m| {
            CString::new(m.path.as_str())
                .map(|c| syn::LitCStr::new(&c, Span::call_site()))
                .map_err(|_| GenerateError::InvalidIdentifier(m.path.to_string()))
        })
        .collect::<Result<Vec<_>>>()?;
    let requests = methods
        .iter()
        .map(|m| index.request_type(&module, &m.input_type))
        .collect::<Result<Vec<_>>>()?;
    let variant_docs: Vec<String> = methods
        .iter()
        .map(|m| doc(&format!("`{}`, request `{}`", m.path, Index::full_name(&m.input_type))))
        .collect();

    let file_label = if options.source.is_empty() {
        file.name().to_string()
    } else {
        options.source.clone()
    };
    let file_name = Path::new(&file_label)
        .file_name()
        .map_or_else(|| file_label.clone(), |n| n.to_string_lossy().into_owned());
    let method_doc = doc(&format!("RPC methods of `{file_name}`"));
    let table_doc = doc(&format!("Method table of `{file_name}`"));

    let tokens = quote! {
        use #krate::mutator::StructuralMutator;
        use #krate::table::RpcTable;
        use std::ffi::CStr;

        #[doc = #method_doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Method {
            #(
                #[doc = #variant_docs]
                #variants,
            )*
        }

        impl Method {
            /// Every method, in table order
            pub const ALL: &'static [Self] = &[#(Self::#variants),*];

            /// Method path
            #[must_use]
            pub const fn path(self) -> &'static str {
                match self {
                    #(Self::#variants => #paths,)*
                }
            }

            /// Method path as a NUL-terminated string
            #[must_use]
            pub const fn c_path(self) -> &'static CStr {
                match self {
                    #(Self::#variants => #c_paths,)*
                }
            }

            /// Mutate `data` as this method's request type
            pub fn mutate<S: StructuralMutator>(
                self,
                mutator: &S,
                data: &mut [u8],
                size: usize,
                max_size: usize,
                seed: u32,
            ) -> usize {
                match self {
                    #(
                        Self::#variants => {
                            let mut message = #requests::default();
                            mutator.mutate(&mut message, true, data, size, max_size, seed)
                        }
                    )*
                }
            }
        }

        #[doc = #table_doc]
        #[derive(Debug, Clone, Copy, Default)]
        pub struct #table;

        impl RpcTable for #table {
            const METHODS: &'static [&'static CStr] = &[#(Method::#variants.c_path()),*];

            fn dispatch<S: StructuralMutator>(
                slot: usize,
                mutator: &S,
                data: &mut [u8],
                size: usize,
                max_size: usize,
                seed: u32,
            ) -> Option<usize> {
                let method = Method::ALL.get(slot)?;
                Some(method.mutate(mutator, data, size, max_size, seed))
            }
        }
    };

    let syntax_tree: syn::File = syn::parse2(tokens)?;
    debug!(
        file = file.name(),
        methods = methods.len(),
        table = %table_name,
        "Generated stub"
    );

    Ok(format!(
        "// @generated by stub-gen from {file_label}. Do not edit.\n\n{}",
        prettyplease::unparse(&syntax_tree)
    ))
}
