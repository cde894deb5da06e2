//! Rendering of decoded types as C declarations.
//!
//! [`TypeFormatter`] turns a [`Type`] and a variable name into declaration syntax, composing
//! pointers, arrays and blocks around the name the way C declarators do:
//!
//! | Encoding        | Declaration           |
//! |-----------------|-----------------------|
//! | `^i`            | `int *x`              |
//! | `[4^i]`         | `int *x[4]`           |
//! | `^[4i]`         | `int (*x)[4]`         |
//! | `@"NSString"`   | `NSString *x`         |
//! | `@?<v@?i>`      | `void (^x)(int)`      |
//! | `{CGPoint=dd}`  | `struct CGPoint x`    |
//!
//! Structures are looked up in the frozen structure registry and referenced by their
//! assigned name. Depending on the [`Expansion`] policy their member list is written inline
//! instead. A structure that is already being expanded is referenced by name, so
//! self-referencing structures terminate.
//!
//! Every class, protocol, structure and placeholder the formatter writes is reported to a
//! [`ReferenceDelegate`].

use std::collections::HashSet;

use crate::{
    encoding::{MethodSignature, ObjectType, Primitive, Type},
    typesystem::{registry::is_unregistered, StructureEntry, StructureLookup},
    utils::ensure_sufficient_stack,
    Result,
};

/// Types that have no declaration syntax and are written through placeholder typedefs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    /// `CDUnknownFunctionPointerType`
    FunctionPointer,
    /// `CDUnknownBlockType`
    Block,
}

impl Placeholder {
    /// The typedef name standing in for the unknown type
    #[must_use]
    pub fn type_name(self) -> &'static str {
        match self {
            Placeholder::FunctionPointer => "CDUnknownFunctionPointerType",
            Placeholder::Block => "CDUnknownBlockType",
        }
    }

    /// The typedef declaring the placeholder
    #[must_use]
    pub fn typedef(self) -> &'static str {
        match self {
            Placeholder::FunctionPointer => {
                "typedef void (*CDUnknownFunctionPointerType)(void); // return type and parameters are unknown"
            }
            Placeholder::Block => {
                "typedef void (^CDUnknownBlockType)(void); // return type and parameters are unknown"
            }
        }
    }
}

/// Receives a notification for every named type a formatter writes.
///
/// All methods default to doing nothing.
pub trait ReferenceDelegate {
    /// A class name was written, e.g. `NSString` in `NSString *`
    fn did_reference_class_name(&mut self, _name: &str) {}

    /// An adopted protocol list was written
    fn did_reference_protocol_names(&mut self, _names: &[String]) {}

    /// A structure was written, by name or inline
    fn did_reference_structure(&mut self, _entry: &StructureEntry) {}

    /// A placeholder type was written
    fn did_reference_placeholder(&mut self, _placeholder: Placeholder) {}
}

impl ReferenceDelegate for () {}

/// When to write a structure's member list instead of its name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Expansion {
    /// Every occurrence is written inline
    Always,
    /// Only the first occurrence per formatter is written inline
    FirstUse,
    /// Structures are always referenced by name
    #[default]
    Never,
}

/// Writes declarations for decoded types
pub struct TypeFormatter<'a> {
    lookup: &'a dyn StructureLookup,
    delegate: &'a mut dyn ReferenceDelegate,
    expansion: Expansion,
    base_level: usize,
    expanded: HashSet<usize>,
    expanding: Vec<usize>,
}

impl<'a> TypeFormatter<'a> {
    /// Create a formatter resolving structures through `lookup`
    ///
    /// ## Arguments
    /// * 'lookup'   - The frozen structure registry
    /// * 'delegate' - Receives a notification for every referenced name
    pub fn new(lookup: &'a dyn StructureLookup, delegate: &'a mut dyn ReferenceDelegate) -> Self {
        TypeFormatter {
            lookup,
            delegate,
            expansion: Expansion::default(),
            base_level: 0,
            expanded: HashSet::new(),
            expanding: Vec::new(),
        }
    }

    /// Set the structure expansion policy
    #[must_use]
    pub fn with_expansion(mut self, expansion: Expansion) -> Self {
        self.expansion = expansion;
        self
    }

    /// Set the nesting level of the declarations written; inline member lists are
    /// indented one level deeper
    #[must_use]
    pub fn with_base_level(mut self, level: usize) -> Self {
        self.base_level = level;
        self
    }

    /// Write `ty` as the declaration of a variable named `name`.
    ///
    /// An empty `name` yields the bare type, as used in casts and method signatures.
    ///
    /// # Errors
    /// Returns [`crate::Error::InternalInconsistency`] if `ty` contains a structure the
    /// registry does not know.
    pub fn format_variable(&mut self, name: &str, ty: &Type) -> Result<String> {
        self.declare(ty, name.to_string(), self.base_level)
    }

    /// Write `ty` without a variable name
    ///
    /// # Errors
    /// Returns [`crate::Error::InternalInconsistency`] if `ty` contains a structure the
    /// registry does not know.
    pub fn format_type(&mut self, ty: &Type) -> Result<String> {
        self.format_variable("", ty)
    }

    /// Write a method declaration without the leading `-`/`+` and trailing `;`,
    /// e.g. `(void)setValue:(id)arg1 forKey:(NSString *)arg2`.
    ///
    /// Arguments are named `arg1`, `arg2`, ... Selector parts without a matching
    /// parameter type are typed as unknown.
    ///
    /// # Errors
    /// Returns [`crate::Error::InternalInconsistency`] if a type contains a structure the
    /// registry does not know.
    pub fn format_method(&mut self, selector: &str, signature: &MethodSignature) -> Result<String> {
        let mut out = format!("({})", self.format_type(&signature.return_type.ty)?);

        if !selector.contains(':') {
            out.push_str(selector);
            return Ok(out);
        }

        let unknown = Type::Primitive(Primitive::Unknown);
        let mut arguments = signature.arguments();
        let parts: Vec<&str> = selector.split(':').collect();
        // The selector ends with ':', so the last part is empty
        let labels = &parts[..parts.len() - 1];
        for (index, label) in labels.iter().enumerate() {
            if index > 0 {
                out.push(' ');
            }
            let ty = arguments.next().map_or(&unknown, |argument| &argument.ty);
            let ty = self.format_type(ty)?;
            out.push_str(&format!("{}:({})arg{}", label, ty, index + 1));
        }
        Ok(out)
    }

    /// Write the declaration of a registry entry, as it appears in a structure block.
    ///
    /// Tagged structures are written as `struct Tag { ... };`, anonymous ones as
    /// `typedef struct { ... } CDStruct_...;` and structures without members as `struct Tag;`.
    ///
    /// # Errors
    /// Returns [`crate::Error::InternalInconsistency`] if a member contains a structure the
    /// registry does not know.
    pub fn format_structure_definition(&mut self, entry: &StructureEntry) -> Result<String> {
        if entry.is_forward_declaration() {
            return Ok(format!("{} {};", entry.kind, entry.name));
        }

        self.expanding.push(entry.id);
        let body = self.members(entry, self.base_level);
        self.expanding.pop();
        let body = body?;

        let indent = indentation(self.base_level);
        if entry.is_typedef {
            Ok(format!(
                "typedef {} {{\n{}{}}} {};",
                entry.kind, body, indent, entry.name
            ))
        } else {
            Ok(format!(
                "{} {} {{\n{}{}}};",
                entry.kind, entry.name, body, indent
            ))
        }
    }

    fn declare(&mut self, ty: &Type, declarator: String, level: usize) -> Result<String> {
        ensure_sufficient_stack(|| self.declare_node(ty, declarator, level))
    }

    fn declare_node(&mut self, ty: &Type, declarator: String, level: usize) -> Result<String> {
        match ty {
            Type::Primitive(primitive) => Ok(join(primitive.c_name(), &declarator)),
            Type::Id(object) => {
                let base = self.object_name(object);
                Ok(join(&base, &declarator))
            }
            Type::Pointer(inner) => {
                let declarator = if matches!(**inner, Type::Array { .. }) {
                    format!("(*{})", declarator)
                } else {
                    format!("*{}", declarator)
                };
                self.declare(inner, declarator, level)
            }
            Type::Array { element, count } => {
                self.declare(element, format!("{}[{}]", declarator, count), level)
            }
            Type::Struct(_) | Type::Union(_) => {
                let base = self.composite_name(ty, level)?;
                Ok(join(&base, &declarator))
            }
            Type::Bitfield(width) => Ok(format!(
                "{}:{}",
                join("unsigned int", &declarator),
                width
            )),
            Type::Block(None) => {
                self.delegate.did_reference_placeholder(Placeholder::Block);
                Ok(join(Placeholder::Block.type_name(), &declarator))
            }
            Type::Block(Some(signature)) => {
                let mut parameters = Vec::with_capacity(signature.parameters.len());
                for parameter in &signature.parameters {
                    parameters.push(self.declare(parameter, String::new(), level)?);
                }
                let parameters = if parameters.is_empty() {
                    "void".to_string()
                } else {
                    parameters.join(", ")
                };
                self.declare(
                    &signature.return_type,
                    format!("(^{})({})", declarator, parameters),
                    level,
                )
            }
            Type::FunctionPointer => {
                self.delegate
                    .did_reference_placeholder(Placeholder::FunctionPointer);
                Ok(join(Placeholder::FunctionPointer.type_name(), &declarator))
            }
            Type::Modified { qualifiers, inner } => {
                let inner = self.declare(inner, declarator, level)?;
                if qualifiers.is_empty() {
                    Ok(inner)
                } else {
                    Ok(format!("{} {}", qualifiers.keywords(), inner))
                }
            }
        }
    }

    fn object_name(&mut self, object: &ObjectType) -> String {
        if let Some(class_name) = &object.class_name {
            self.delegate.did_reference_class_name(class_name);
        }
        if !object.protocols.is_empty() {
            self.delegate.did_reference_protocol_names(&object.protocols);
        }

        let protocols = object.protocols.join(", ");
        match (&object.class_name, object.protocols.is_empty()) {
            (Some(class_name), true) => format!("{} *", class_name),
            (Some(class_name), false) => format!("{}<{}> *", class_name, protocols),
            (None, true) => "id".to_string(),
            (None, false) => format!("id <{}>", protocols),
        }
    }

    fn composite_name(&mut self, ty: &Type, level: usize) -> Result<String> {
        if is_unregistered(ty) {
            let kind = ty.composite().map(|(kind, _)| kind.to_string());
            return Ok(format!("{} {{\n{}}}", kind.unwrap_or_default(), indentation(level)));
        }

        let lookup = self.lookup;
        let entry = lookup.lookup(ty)?;
        self.delegate.did_reference_structure(entry);

        let expand = !entry.is_forward_declaration()
            && !self.expanding.contains(&entry.id)
            && match self.expansion {
                Expansion::Always => true,
                Expansion::FirstUse => !self.expanded.contains(&entry.id),
                Expansion::Never => false,
            };
        if !expand {
            return Ok(entry.reference_name());
        }

        self.expanded.insert(entry.id);
        self.expanding.push(entry.id);
        let body = self.members(entry, level);
        self.expanding.pop();
        let body = body?;

        let header = if entry.is_typedef {
            entry.kind.to_string()
        } else {
            format!("{} {}", entry.kind, entry.name)
        };
        Ok(format!("{} {{\n{}{}}}", header, body, indentation(level)))
    }

    /// One line per member, indented one level below `level`
    fn members(&mut self, entry: &StructureEntry, level: usize) -> Result<String> {
        let Some((_, body)) = entry.ty.composite() else {
            return Ok(String::new());
        };

        let indent = indentation(level + 1);
        let mut out = String::new();
        for member in &body.members {
            let name = member.name.clone().unwrap_or_default();
            let declaration = self.declare(&member.ty, name, level + 1)?;
            out.push_str(&indent);
            out.push_str(&declaration);
            out.push_str(";\n");
        }
        Ok(out)
    }
}

fn indentation(level: usize) -> String {
    " ".repeat(level * 4)
}

/// Attach a declarator to a base type; pointer bases already end in `*`
fn join(base: &str, declarator: &str) -> String {
    if declarator.is_empty() {
        base.to_string()
    } else if base.ends_with('*') {
        format!("{}{}", base, declarator)
    } else {
        format!("{} {}", base, declarator)
    }
}
