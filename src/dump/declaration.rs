//! Text of individual declarations, shared by all renderers.

use std::collections::HashSet;

use crate::{
    config::DumpConfig,
    dump::model::{CategoryDecl, ClassDecl, Ivar, Method, Property, ProtocolDecl},
    encoding::CompositeKind,
    typesystem::{
        Expansion, FrozenRegistry, Placeholder, Placeholders, ReferenceDelegate, StructureEntry,
        TypeFormatter,
    },
    Result,
};

/// Writes protocols, classes, categories and structure blocks
pub(crate) struct DeclarationWriter<'a> {
    registry: &'a FrozenRegistry,
    config: &'a DumpConfig,
}

impl<'a> DeclarationWriter<'a> {
    pub(crate) fn new(registry: &'a FrozenRegistry, config: &'a DumpConfig) -> Self {
        DeclarationWriter { registry, config }
    }

    /// `@protocol Name <Adopted>` through `@end`
    pub(crate) fn protocol(
        &self,
        protocol: &ProtocolDecl,
        delegate: &mut dyn ReferenceDelegate,
    ) -> Result<String> {
        let mut out = protocol_line(protocol);
        out.push('\n');

        let mut formatter = TypeFormatter::new(self.registry, delegate);
        let mut sections = vec![
            self.properties(&mut formatter, &protocol.properties)?,
            self.methods(&mut formatter, '+', &protocol.class_methods)?,
            self.methods(&mut formatter, '-', &protocol.instance_methods)?,
        ];

        let mut optional = self.methods(&mut formatter, '+', &protocol.optional_class_methods)?;
        optional.extend(self.methods(&mut formatter, '-', &protocol.optional_instance_methods)?);
        if !optional.is_empty() {
            optional.insert(0, "@optional".to_string());
            sections.push(optional);
        }

        write_sections(&mut out, &sections);
        out.push_str("@end\n");
        Ok(out)
    }

    /// `@interface Name : Superclass <Adopted>` with the ivar block, through `@end`
    pub(crate) fn class(
        &self,
        class: &ClassDecl,
        delegate: &mut dyn ReferenceDelegate,
    ) -> Result<String> {
        let mut out = class_line(class);
        out.push('\n');

        if !class.ivars.is_empty() {
            let mut formatter = TypeFormatter::new(self.registry, &mut *delegate)
                .with_expansion(self.config.expansion())
                .with_base_level(1);
            out.push_str("{\n");
            for ivar in &class.ivars {
                out.push_str(&self.ivar(&mut formatter, ivar)?);
                out.push('\n');
            }
            out.push_str("}\n");
        }

        let mut formatter = TypeFormatter::new(self.registry, delegate);
        let sections = [
            self.properties(&mut formatter, &class.properties)?,
            self.methods(&mut formatter, '+', &class.class_methods)?,
            self.methods(&mut formatter, '-', &class.instance_methods)?,
        ];
        write_sections(&mut out, &sections);
        out.push_str("@end\n");
        Ok(out)
    }

    /// `@interface Class (Name) <Adopted>` through `@end`
    pub(crate) fn category(
        &self,
        category: &CategoryDecl,
        delegate: &mut dyn ReferenceDelegate,
    ) -> Result<String> {
        let mut out = category_line(category);
        out.push('\n');

        let mut formatter = TypeFormatter::new(self.registry, delegate);
        let sections = [
            self.properties(&mut formatter, &category.properties)?,
            self.methods(&mut formatter, '+', &category.class_methods)?,
            self.methods(&mut formatter, '-', &category.instance_methods)?,
        ];
        write_sections(&mut out, &sections);
        out.push_str("@end\n");
        Ok(out)
    }

    /// One method declaration line, e.g. `- (void)setTitle:(NSString *)arg1;`
    pub(crate) fn method(
        &self,
        formatter: &mut TypeFormatter<'_>,
        kind: char,
        method: &Method,
    ) -> Result<String> {
        let signature = match &method.signature {
            Ok(signature) => signature,
            Err(_) => return Ok(parse_failure(&method.encoding, &method.name)),
        };

        let mut line = format!("{} {};", kind, formatter.format_method(&method.name, signature)?);
        if self.config.show_method_addresses {
            if let Some(address) = method.address {
                line.push_str(&format!("\t// IMP=0x{:x}", address));
            }
        }
        Ok(line)
    }

    fn methods(
        &self,
        formatter: &mut TypeFormatter<'_>,
        kind: char,
        methods: &[Method],
    ) -> Result<Vec<String>> {
        methods
            .iter()
            .map(|method| self.method(formatter, kind, method))
            .collect()
    }

    fn ivar(&self, formatter: &mut TypeFormatter<'_>, ivar: &Ivar) -> Result<String> {
        let ty = match &ivar.ty {
            Ok(ty) => ty,
            Err(_) => return Ok(format!("    {}", parse_failure(&ivar.encoding, &ivar.name))),
        };

        let mut line = format!("    {};", formatter.format_variable(&ivar.name, ty)?);
        if self.config.show_ivar_offsets {
            line.push_str(&format!("\t// {} = 0x{:x}", ivar.offset, ivar.offset));
        }
        Ok(line)
    }

    fn properties(
        &self,
        formatter: &mut TypeFormatter<'_>,
        properties: &[Property],
    ) -> Result<Vec<String>> {
        let mut lines = Vec::with_capacity(properties.len());
        for property in properties {
            let (attributes, ty) = match &property.decoded {
                Ok(decoded) => decoded,
                Err(_) => {
                    lines.push(parse_failure(property.raw_type(), &property.name));
                    continue;
                }
            };

            let keywords = attributes.keywords();
            let mut line = if keywords.is_empty() {
                "@property ".to_string()
            } else {
                format!("@property({}) ", keywords.join(", "))
            };
            line.push_str(&formatter.format_variable(&property.name, ty)?);
            line.push(';');
            if let Some(comment) = attributes.implementation_comment(&property.name) {
                line.push(' ');
                line.push_str(&comment);
            }
            lines.push(line);
        }
        Ok(lines)
    }

    /// Definitions of the given registry entries under `#pragma mark` headings.
    ///
    /// Named structures come first, then typedef'd structures, then typedef'd unions, each
    /// group ordered by depth. A structure is always written after the structures it
    /// references, so a dependency can pull an entry ahead of its group and open another
    /// heading.
    pub(crate) fn structures(
        &self,
        ids: &[usize],
        delegate: &mut dyn ReferenceDelegate,
    ) -> Result<String> {
        let mut roots: Vec<&StructureEntry> =
            ids.iter().filter_map(|id| self.registry.get(*id)).collect();
        roots.sort_by_key(|entry| (group_rank(entry), entry.depth, entry.id));

        let mut formatter =
            TypeFormatter::new(self.registry, delegate).with_expansion(Expansion::Never);
        let mut out = String::new();
        let mut heading = None;
        for entry in self.definition_order(&roots)? {
            let title = group_title(entry);
            if heading != Some(title) {
                out.push_str(&format!("#pragma mark {}\n\n", title));
                heading = Some(title);
            }
            out.push_str(&formatter.format_structure_definition(entry)?);
            out.push_str("\n\n");
        }
        Ok(out)
    }

    /// Depth-first post order over `roots`, so every entry follows the entries nested in it.
    /// Only entries among `roots` are written. Cycles, which can only run through
    /// pointers, are cut where they close.
    fn definition_order(&self, roots: &[&'a StructureEntry]) -> Result<Vec<&'a StructureEntry>> {
        let wanted: HashSet<usize> = roots.iter().map(|entry| entry.id).collect();
        let mut done = HashSet::new();
        let mut active = HashSet::new();
        let mut ordered = Vec::with_capacity(roots.len());

        for root in roots {
            let mut stack = vec![(root.id, false)];
            while let Some((id, expanded)) = stack.pop() {
                if done.contains(&id) {
                    continue;
                }
                if expanded {
                    active.remove(&id);
                    done.insert(id);
                    if let Some(entry) = self.registry.get(id) {
                        ordered.push(entry);
                    }
                    continue;
                }
                if !active.insert(id) {
                    continue;
                }

                stack.push((id, true));
                let nested = self.registry.nested_entries(id)?;
                for nested_id in nested.into_iter().rev() {
                    if wanted.contains(&nested_id)
                        && !done.contains(&nested_id)
                        && !active.contains(&nested_id)
                    {
                        stack.push((nested_id, false));
                    }
                }
            }
        }
        Ok(ordered)
    }
}

fn group_rank(entry: &StructureEntry) -> u8 {
    match (entry.is_typedef, entry.kind) {
        (false, _) => 0,
        (true, CompositeKind::Struct) => 1,
        (true, CompositeKind::Union) => 2,
    }
}

fn group_title(entry: &StructureEntry) -> &'static str {
    match group_rank(entry) {
        0 => "Named Structures",
        1 => "Typedef'd Structures",
        _ => "Typedef'd Unions",
    }
}

/// `@protocol Name <Adopted>`
pub(crate) fn protocol_line(protocol: &ProtocolDecl) -> String {
    format!("@protocol {}{}", protocol.name, protocol_list(&protocol.protocols))
}

/// `@interface Name : Superclass <Adopted>`
pub(crate) fn class_line(class: &ClassDecl) -> String {
    let mut line = format!("@interface {}", class.name);
    if let Some(superclass) = &class.superclass {
        line.push_str(" : ");
        line.push_str(superclass);
    }
    line.push_str(&protocol_list(&class.protocols));
    line
}

/// `@interface Class (Name) <Adopted>`
pub(crate) fn category_line(category: &CategoryDecl) -> String {
    format!(
        "@interface {} ({}){}",
        category.class_name,
        category.name,
        protocol_list(&category.protocols)
    )
}

/// The comment block opening a combined dump or a unit
pub(crate) fn banner(image: &str) -> String {
    format!(
        "//\n//     Generated by classdump {}.\n//\n//  Image: {}\n//\n",
        env!("CARGO_PKG_VERSION"),
        image
    )
}

/// The placeholder typedefs for the placeholders in use, one per line
pub(crate) fn placeholder_typedefs(placeholders: Placeholders) -> String {
    let mut out = String::new();
    if placeholders.function_pointers {
        out.push_str(Placeholder::FunctionPointer.typedef());
        out.push('\n');
    }
    if placeholders.blocks {
        out.push_str(Placeholder::Block.typedef());
        out.push('\n');
    }
    out
}

/// The comment standing in for a member whose type could not be decoded
pub(crate) fn parse_failure(encoding: &str, name: &str) -> String {
    format!("// Error parsing type: {}, name: {}", encoding, name)
}

/// ` <P1, P2>`, or nothing for an empty list
pub(crate) fn protocol_list(protocols: &[String]) -> String {
    if protocols.is_empty() {
        String::new()
    } else {
        format!(" <{}>", protocols.join(", "))
    }
}

/// Each non-empty section preceded by a blank line, and a blank line before `@end`
fn write_sections(out: &mut String, sections: &[Vec<String>]) {
    let mut written = false;
    for section in sections.iter().filter(|section| !section.is_empty()) {
        out.push('\n');
        for line in section {
            out.push_str(line);
            out.push('\n');
        }
        written = true;
    }
    if written {
        out.push('\n');
    }
}
