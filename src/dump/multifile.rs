use std::collections::{BTreeSet, HashSet};

use tracing::trace;

use crate::{
    dump::{
        declaration::{banner, placeholder_typedefs, DeclarationWriter},
        ClassDump, Node, OutputUnit, Visitor,
    },
    typesystem::{FrozenRegistry, Placeholder, Placeholders, ReferenceDelegate, StructureEntry},
    Result,
};

/// Everything a unit's declaration referenced through the type formatter
#[derive(Debug, Default)]
struct References {
    class_names: BTreeSet<String>,
    protocol_names: BTreeSet<String>,
    structures: Vec<usize>,
    placeholders: Placeholders,
}

impl ReferenceDelegate for References {
    fn did_reference_class_name(&mut self, name: &str) {
        self.class_names.insert(name.to_string());
    }

    fn did_reference_protocol_names(&mut self, names: &[String]) {
        self.protocol_names.extend(names.iter().cloned());
    }

    fn did_reference_structure(&mut self, entry: &StructureEntry) {
        if !self.structures.contains(&entry.id) {
            self.structures.push(entry.id);
        }
    }

    fn did_reference_placeholder(&mut self, placeholder: Placeholder) {
        match placeholder {
            Placeholder::FunctionPointer => self.placeholders.function_pointers = true,
            Placeholder::Block => self.placeholders.blocks = true,
        }
    }
}

/// Declarations a unit needs to see in full, and the class or protocol the unit declares
struct StrongEdges<'a> {
    own_class: Option<&'a str>,
    own_protocol: Option<&'a str>,
    classes: Vec<&'a str>,
    protocols: &'a [String],
}

/// Renders one unit per class, category and protocol.
///
/// Each unit starts with `#import` lines for its strong dependencies (superclass,
/// extended class, adopted protocols) and `@class`/`@protocol` forward declarations for
/// everything its members only reference. The structures a unit uses are defined in the
/// unit itself, together with the structures they contain.
#[derive(Debug, Default)]
pub struct MultiFileVisitor {
    banner: Option<String>,
    units: Vec<OutputUnit>,
}

impl MultiFileVisitor {
    /// Create a visitor without units
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The units written so far
    #[must_use]
    pub fn units(&self) -> &[OutputUnit] {
        &self.units
    }

    /// Take the rendered units
    #[must_use]
    pub fn into_units(self) -> Vec<OutputUnit> {
        self.units
    }

    fn push_unit(
        &mut self,
        dump: &ClassDump,
        name: String,
        strong: &StrongEdges<'_>,
        mut references: References,
        body: String,
    ) -> Result<()> {
        let writer = DeclarationWriter::new(dump.registry(), dump.config());
        let structure_ids = structure_closure(dump.registry(), &references.structures)?;
        let structures = writer.structures(&structure_ids, &mut references)?;

        let mut blocks: Vec<String> = Vec::new();
        if let Some(banner) = &self.banner {
            blocks.push(banner.clone());
        }

        let imports: Vec<String> = strong
            .classes
            .iter()
            .map(|class| format!("#import \"{}\"", class_unit_name(class)))
            .chain(
                strong
                    .protocols
                    .iter()
                    .map(|protocol| format!("#import \"{}\"", protocol_unit_name(protocol))),
            )
            .collect();
        blocks.push(imports.join("\n"));

        let mut forward = Vec::new();
        let weak_classes: Vec<&str> = references
            .class_names
            .iter()
            .map(String::as_str)
            .filter(|name| Some(*name) != strong.own_class && !strong.classes.contains(name))
            .collect();
        if !weak_classes.is_empty() {
            forward.push(format!("@class {};", weak_classes.join(", ")));
        }
        let weak_protocols: Vec<&str> = references
            .protocol_names
            .iter()
            .map(String::as_str)
            .filter(|name| {
                Some(*name) != strong.own_protocol && !strong.protocols.iter().any(|p| p == name)
            })
            .collect();
        if !weak_protocols.is_empty() {
            forward.push(format!("@protocol {};", weak_protocols.join(", ")));
        }
        blocks.push(forward.join("\n"));

        blocks.push(placeholder_typedefs(references.placeholders));
        blocks.push(structures);
        blocks.push(body);

        let mut text = blocks
            .iter()
            .map(|block| block.trim_end_matches('\n'))
            .filter(|block| !block.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");
        text.push('\n');

        trace!("generated unit {}", name);
        self.units.push(OutputUnit { name, text });
        Ok(())
    }
}

impl Visitor for MultiFileVisitor {
    fn visit(&mut self, dump: &ClassDump, node: Node<'_>) -> Result<()> {
        let writer = DeclarationWriter::new(dump.registry(), dump.config());
        match node {
            Node::Header => {
                if dump.config().show_header {
                    self.banner = Some(banner(dump.image_name()));
                }
                Ok(())
            }
            // Every unit defines the structures it uses
            Node::Structures => Ok(()),
            Node::Protocol(protocol) => {
                let mut references = References::default();
                let body = writer.protocol(protocol, &mut references)?;
                let strong = StrongEdges {
                    own_class: None,
                    own_protocol: Some(&protocol.name),
                    classes: Vec::new(),
                    protocols: &protocol.protocols,
                };
                self.push_unit(
                    dump,
                    protocol_unit_name(&protocol.name),
                    &strong,
                    references,
                    body,
                )
            }
            Node::Class(class) => {
                let mut references = References::default();
                let body = writer.class(class, &mut references)?;
                let strong = StrongEdges {
                    own_class: Some(&class.name),
                    own_protocol: None,
                    classes: class.superclass.as_deref().into_iter().collect(),
                    protocols: &class.protocols,
                };
                self.push_unit(dump, class_unit_name(&class.name), &strong, references, body)
            }
            Node::Category(category) => {
                let mut references = References::default();
                let body = writer.category(category, &mut references)?;
                let strong = StrongEdges {
                    own_class: Some(&category.class_name),
                    own_protocol: None,
                    classes: vec![category.class_name.as_str()],
                    protocols: &category.protocols,
                };
                self.push_unit(
                    dump,
                    format!("{}+{}.h", category.class_name, category.name),
                    &strong,
                    references,
                    body,
                )
            }
        }
    }
}

fn class_unit_name(class: &str) -> String {
    format!("{}.h", class)
}

fn protocol_unit_name(protocol: &str) -> String {
    format!("{}-Protocol.h", protocol)
}

/// `roots` plus every structure nested in them
fn structure_closure(registry: &FrozenRegistry, roots: &[usize]) -> Result<Vec<usize>> {
    let mut seen = HashSet::new();
    let mut closure = Vec::new();
    let mut pending: Vec<usize> = roots.to_vec();
    while let Some(id) = pending.pop() {
        if !seen.insert(id) {
            continue;
        }
        closure.push(id);
        pending.extend(registry.nested_entries(id)?);
    }
    Ok(closure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        objc::{ObjcClass, ObjcImage, ObjcIvar, ObjcMethod, ObjcProtocol},
        test::sample_image,
        DumpConfig,
    };

    fn units(image: &ObjcImage) -> Vec<OutputUnit> {
        let dump = ClassDump::new(image, DumpConfig::minimal()).unwrap();
        let mut visitor = MultiFileVisitor::new();
        dump.accept(&mut visitor).unwrap();
        visitor.into_units()
    }

    fn unit<'a>(units: &'a [OutputUnit], name: &str) -> &'a str {
        &units
            .iter()
            .find(|unit| unit.name == name)
            .unwrap_or_else(|| panic!("missing unit {}", name))
            .text
    }

    #[test]
    fn test_unit_names() {
        let units = units(&sample_image());
        let mut names: Vec<_> = units.iter().map(|unit| unit.name.as_str()).collect();
        names.sort_unstable();
        assert_eq!(
            names,
            vec!["Circle+Extras.h", "Circle.h", "Drawable-Protocol.h", "Shape.h"]
        );
    }

    #[test]
    fn test_imports_and_forward_declarations() {
        let units = units(&sample_image());

        let circle = unit(&units, "Circle.h");
        assert!(circle.starts_with("#import \"Shape.h\"\n"));
        assert!(circle.contains("@class NSColor;"));
        assert!(!circle.contains("@class Shape"));

        let category = unit(&units, "Circle+Extras.h");
        assert!(category.starts_with("#import \"Circle.h\"\n"));

        let shape = unit(&units, "Shape.h");
        assert!(shape.starts_with("#import \"NSObject.h\"\n#import \"Drawable-Protocol.h\"\n"));
    }

    #[test]
    fn test_own_name_is_only_skipped_for_its_own_kind() {
        let mut protocol = ObjcProtocol::new("Node");
        protocol
            .instance_methods
            .push(ObjcMethod::new("node", "@\"Node\"16@0:8"));
        let mut class = ObjcClass::new("Node");
        class
            .instance_methods
            .push(ObjcMethod::new("parent", "@\"Node\"16@0:8"));
        class
            .instance_methods
            .push(ObjcMethod::new("delegate", "@\"<Node>\"16@0:8"));
        let mut image = ObjcImage::new("Test");
        image.protocols.push(protocol);
        image.classes.push(class);

        let units = units(&image);
        let protocol_unit = unit(&units, "Node-Protocol.h");
        assert!(protocol_unit.contains("@class Node;"));
        assert!(!protocol_unit.contains("@protocol Node;"));

        let class_unit = unit(&units, "Node.h");
        assert!(class_unit.contains("@protocol Node;"));
        assert!(!class_unit.contains("@class Node;"));
    }

    #[test]
    fn test_units_define_their_structures() {
        let mut class = ObjcClass::new("Frame");
        class.ivars.push(ObjcIvar::new(
            "_rect",
            "{CGRect=\"origin\"{CGPoint=\"x\"d\"y\"d}\"size\"{CGSize=\"width\"d\"height\"d}}",
            8,
        ));
        let mut other = ObjcClass::new("Plain");
        other.ivars.push(ObjcIvar::new("_count", "i", 8));
        let mut image = ObjcImage::new("Test");
        image.classes = vec![class, other];

        let units = units(&image);
        let frame = unit(&units, "Frame.h");
        let point = frame.find("struct CGPoint {").unwrap();
        let size = frame.find("struct CGSize {").unwrap();
        let rect = frame.find("struct CGRect {").unwrap();
        assert!(point < rect && size < rect);
        assert!(frame.contains("    struct CGRect _rect;"));

        let plain = unit(&units, "Plain.h");
        assert!(!plain.contains("#pragma mark"));
    }

    #[test]
    fn test_placeholders_only_where_used() {
        let units = units(&sample_image());
        assert!(unit(&units, "Circle+Extras.h").contains("typedef void (^CDUnknownBlockType)(void);"));
        assert!(!unit(&units, "Shape.h").contains("CDUnknownBlockType)(void);"));
    }
}
