//! The declaration dump pipeline.
//!
//! [`ClassDump`] takes the Objective-C records of one image and runs the whole pipeline:
//!
//! 1. Every ivar, method and property encoding is decoded. Encodings that fail to decode
//!    are kept with their error and later rendered as a comment.
//! 2. Members are filtered according to the [`DumpConfig`] strip options.
//! 3. Every decoded type is registered with the structure registry, which then runs its
//!    deduplication, merge and naming phases.
//! 4. Protocols, classes and categories are ordered with the [`DependencySorter`].
//!
//! The result is walked with [`ClassDump::accept`], which hands a fixed sequence of
//! [`Node`]s to a [`Visitor`]. Three renderers are provided:
//!
//! - [`TextVisitor`] writes everything into one stream
//! - [`MultiFileVisitor`] writes one unit per class, category and protocol, each with its
//!   own imports, forward declarations and structure definitions
//! - [`FindMethodVisitor`] lists only the methods whose selector matches a search string
//!
//! # Examples
//!
//! ```rust
//! use classdump::{
//!     objc::{ObjcClass, ObjcImage, ObjcMethod},
//!     ClassDump, DumpConfig, Output,
//! };
//!
//! let mut class = ObjcClass::new("Counter").with_superclass("NSObject");
//! class.instance_methods.push(ObjcMethod::new("increment", "v16@0:8"));
//! let mut image = ObjcImage::new("Counter");
//! image.classes.push(class);
//!
//! let dump = ClassDump::new(&image, DumpConfig::minimal())?;
//! let Output::Combined(text) = dump.render()? else {
//!     unreachable!()
//! };
//! assert!(text.contains("@interface Counter : NSObject"));
//! assert!(text.contains("- (void)increment;"));
//! # Ok::<(), classdump::Error>(())
//! ```

mod declaration;
mod filter;
mod find;
mod model;
mod multifile;
mod text;

use std::{collections::HashMap, fs, path::Path};

use rayon::prelude::*;
use tracing::{debug, trace};

pub use find::FindMethodVisitor;
pub use model::{CategoryDecl, ClassDecl, Ivar, Method, Property, ProtocolDecl};
pub use multifile::MultiFileVisitor;
pub use text::TextVisitor;

use crate::{
    config::DumpConfig,
    dependencies::{DependencyNode, DependencySorter},
    objc::ObjcImage,
    typesystem::{FrozenRegistry, StructureRegistry, Usage},
    Result,
};
use filter::InheritedSelectors;

/// One step of the walk over a dump
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    /// Start of the output: banner and placeholder typedefs
    Header,
    /// The structure definitions of the whole image
    Structures,
    /// A protocol declaration
    Protocol(&'a ProtocolDecl),
    /// A class declaration
    Class(&'a ClassDecl),
    /// A category declaration
    Category(&'a CategoryDecl),
}

/// A renderer strategy, receiving every [`Node`] of a dump in order
pub trait Visitor {
    /// Handle one node
    ///
    /// # Errors
    /// Returns [`crate::Error::InternalInconsistency`] if a type references a structure
    /// the registry does not know.
    fn visit(&mut self, dump: &ClassDump, node: Node<'_>) -> Result<()>;
}

/// Position of a declaration in its list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Declaration {
    Protocol(usize),
    Class(usize),
    Category(usize),
}

/// Rendered output of a dump
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    /// Everything in one stream
    Combined(String),
    /// One unit per declaration
    Units(Vec<OutputUnit>),
}

/// A named piece of per-unit output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputUnit {
    /// File name, e.g. `NSView.h`, `NSView+Extras.h` or `NSCoding-Protocol.h`
    pub name: String,
    /// Unit contents
    pub text: String,
}

impl Output {
    /// Write the output below `dir`, creating it if needed. Combined output is written to
    /// `<image>.h`, units to one file each.
    ///
    /// ## Arguments
    /// * 'dir'   - The target directory
    /// * 'image' - Name of the dumped image
    ///
    /// # Errors
    /// Returns [`crate::Error::Io`] if the directory or a file cannot be written.
    pub fn write_to(&self, dir: impl AsRef<Path>, image: &str) -> Result<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        match self {
            Output::Combined(text) => fs::write(dir.join(format!("{}.h", image)), text)?,
            Output::Units(units) => {
                for unit in units {
                    trace!("writing {}", unit.name);
                    fs::write(dir.join(&unit.name), &unit.text)?;
                }
            }
        }
        Ok(())
    }
}

/// The decoded, registered and ordered declarations of one image
#[derive(Debug)]
pub struct ClassDump {
    image_name: String,
    config: DumpConfig,
    protocols: Vec<ProtocolDecl>,
    classes: Vec<ClassDecl>,
    categories: Vec<CategoryDecl>,
    registry: FrozenRegistry,
    order: Vec<Declaration>,
}

impl ClassDump {
    /// Run the pipeline over the records of `image`.
    ///
    /// Undecodable encodings do not fail the dump, they are rendered as comments.
    ///
    /// ## Arguments
    /// * 'image'  - The Objective-C records of the image
    /// * 'config' - Ordering, filtering and annotation options
    ///
    /// # Errors
    /// Returns [`crate::Error::InternalInconsistency`] if the structure registry reaches
    /// an inconsistent state.
    pub fn new(image: &ObjcImage, config: DumpConfig) -> Result<Self> {
        let mut protocols: Vec<ProtocolDecl> =
            image.protocols.iter().map(ProtocolDecl::decode).collect();
        let mut classes: Vec<ClassDecl> = image.classes.iter().map(ClassDecl::decode).collect();
        let mut categories: Vec<CategoryDecl> =
            image.categories.iter().map(CategoryDecl::decode).collect();

        for (class, record) in classes.iter_mut().zip(&image.classes) {
            if config.strip_overrides {
                InheritedSelectors::collect(image, record)
                    .strip(&mut class.class_methods, &mut class.instance_methods);
            }
            if config.strip_ctor_dtor {
                filter::strip_ctor_dtor(&mut class.instance_methods);
            }
            if config.strip_synthesized {
                filter::strip_synthesized(&mut class.instance_methods, &class.properties);
            }
        }
        for category in &mut categories {
            if config.strip_synthesized {
                filter::strip_synthesized(&mut category.instance_methods, &category.properties);
            }
        }

        if config.sort_methods {
            for protocol in &mut protocols {
                sort_properties(&mut protocol.properties);
                for methods in [
                    &mut protocol.class_methods,
                    &mut protocol.instance_methods,
                    &mut protocol.optional_class_methods,
                    &mut protocol.optional_instance_methods,
                ] {
                    sort_methods(methods);
                }
            }
            for class in &mut classes {
                sort_properties(&mut class.properties);
                sort_methods(&mut class.class_methods);
                sort_methods(&mut class.instance_methods);
            }
            for category in &mut categories {
                sort_properties(&mut category.properties);
                sort_methods(&mut category.class_methods);
                sort_methods(&mut category.instance_methods);
            }
        }

        let registry = build_registry(&protocols, &classes, &categories)?;
        debug!(
            "{}: {} protocols, {} classes, {} categories, {} structures",
            image.name,
            protocols.len(),
            classes.len(),
            categories.len(),
            registry.len()
        );

        let mut dump = ClassDump {
            image_name: image.name.clone(),
            config,
            protocols,
            classes,
            categories,
            registry,
            order: Vec::new(),
        };
        dump.order = dump.declaration_order();
        Ok(dump)
    }

    /// Name of the dumped image
    #[must_use]
    pub fn image_name(&self) -> &str {
        &self.image_name
    }

    /// The configuration of this dump
    #[must_use]
    pub fn config(&self) -> &DumpConfig {
        &self.config
    }

    /// The frozen structure registry of the image
    #[must_use]
    pub fn registry(&self) -> &FrozenRegistry {
        &self.registry
    }

    /// All decoded protocols in input order
    #[must_use]
    pub fn protocols(&self) -> &[ProtocolDecl] {
        &self.protocols
    }

    /// All decoded classes in input order
    #[must_use]
    pub fn classes(&self) -> &[ClassDecl] {
        &self.classes
    }

    /// All decoded categories in input order
    #[must_use]
    pub fn categories(&self) -> &[CategoryDecl] {
        &self.categories
    }

    /// The declarations that pass the name filter, in output order
    #[must_use]
    pub fn declarations(&self) -> Vec<Node<'_>> {
        self.order
            .iter()
            .filter_map(|declaration| match *declaration {
                Declaration::Protocol(index) => self.protocols.get(index).map(Node::Protocol),
                Declaration::Class(index) => self.classes.get(index).map(Node::Class),
                Declaration::Category(index) => self.categories.get(index).map(Node::Category),
            })
            .collect()
    }

    /// Walk the dump: the header, the structures, then every declaration in output order
    ///
    /// # Errors
    /// Propagates the first error returned by the visitor.
    pub fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) -> Result<()> {
        visitor.visit(self, Node::Header)?;
        visitor.visit(self, Node::Structures)?;
        for node in self.declarations() {
            visitor.visit(self, node)?;
        }
        Ok(())
    }

    /// Render with the strategy the configuration selects: method search if a search
    /// string is set, otherwise per-unit or combined output
    ///
    /// # Errors
    /// Returns [`crate::Error::InternalInconsistency`] if a type references a structure
    /// the registry does not know.
    pub fn render(&self) -> Result<Output> {
        if let Some(search) = &self.config.search_method {
            let mut visitor = FindMethodVisitor::new(search.clone());
            self.accept(&mut visitor)?;
            return Ok(Output::Combined(visitor.into_text()));
        }

        if self.config.per_unit_output {
            let mut visitor = MultiFileVisitor::new();
            self.accept(&mut visitor)?;
            Ok(Output::Units(visitor.into_units()))
        } else {
            let mut visitor = TextVisitor::new();
            self.accept(&mut visitor)?;
            Ok(Output::Combined(visitor.into_text()))
        }
    }

    fn declaration_order(&self) -> Vec<Declaration> {
        let mut named: Vec<(String, Declaration)> = Vec::new();
        for (index, protocol) in self.protocols.iter().enumerate() {
            named.push((
                DependencyNode::protocol_id(&protocol.name),
                Declaration::Protocol(index),
            ));
        }
        for (index, class) in self.classes.iter().enumerate() {
            named.push((DependencyNode::class_id(&class.name), Declaration::Class(index)));
        }
        for (index, category) in self.categories.iter().enumerate() {
            named.push((
                DependencyNode::category_id(&category.class_name, &category.name),
                Declaration::Category(index),
            ));
        }
        named.retain(|(id, _)| self.config.matches_name(id));

        if !self.config.sort_classes_by_inheritance {
            if self.config.sort_classes {
                named.sort_by(|a, b| a.0.cmp(&b.0));
            }
            return named.into_iter().map(|(_, declaration)| declaration).collect();
        }

        let mut sorter = DependencySorter::new();
        for (id, declaration) in &named {
            sorter.add(DependencyNode::new(id.clone(), self.dependencies(*declaration)));
        }

        let positions: HashMap<String, Declaration> = named.into_iter().collect();
        sorter
            .sort()
            .into_iter()
            .filter_map(|id| positions.get(&id).copied())
            .collect()
    }

    /// Identifiers a declaration must follow: superclass or extended class, and adopted
    /// protocols
    fn dependencies(&self, declaration: Declaration) -> Vec<String> {
        let (base, protocols) = match declaration {
            Declaration::Protocol(index) => (None, &self.protocols[index].protocols),
            Declaration::Class(index) => {
                let class = &self.classes[index];
                (class.superclass.as_deref(), &class.protocols)
            }
            Declaration::Category(index) => {
                let category = &self.categories[index];
                (Some(category.class_name.as_str()), &category.protocols)
            }
        };

        base.map(DependencyNode::class_id)
            .into_iter()
            .chain(protocols.iter().map(|p| DependencyNode::protocol_id(p)))
            .collect()
    }
}

fn sort_methods(methods: &mut [Method]) {
    methods.sort_by(|a, b| a.name.cmp(&b.name));
}

fn sort_properties(properties: &mut [Property]) {
    properties.sort_by(|a, b| a.name.cmp(&b.name));
}

/// Register every decoded type and run the registry phases
fn build_registry(
    protocols: &[ProtocolDecl],
    classes: &[ClassDecl],
    categories: &[CategoryDecl],
) -> Result<FrozenRegistry> {
    let mut registry = StructureRegistry::new();

    for protocol in protocols {
        register_properties(&mut registry, &protocol.properties)?;
        for methods in [
            &protocol.class_methods,
            &protocol.instance_methods,
            &protocol.optional_class_methods,
            &protocol.optional_instance_methods,
        ] {
            register_methods(&mut registry, methods)?;
        }
    }
    for class in classes {
        for ivar in &class.ivars {
            if let Ok(ty) = &ivar.ty {
                registry.register(ty, Usage::Ivar)?;
            }
        }
        register_properties(&mut registry, &class.properties)?;
        register_methods(&mut registry, &class.class_methods)?;
        register_methods(&mut registry, &class.instance_methods)?;
    }
    for category in categories {
        register_properties(&mut registry, &category.properties)?;
        register_methods(&mut registry, &category.class_methods)?;
        register_methods(&mut registry, &category.instance_methods)?;
    }

    registry.dedup()?.merge()?.freeze()
}

fn register_methods(registry: &mut StructureRegistry, methods: &[Method]) -> Result<()> {
    for method in methods {
        if let Ok(signature) = &method.signature {
            for ty in signature.types() {
                registry.register(ty, Usage::Method)?;
            }
        }
    }
    Ok(())
}

fn register_properties(registry: &mut StructureRegistry, properties: &[Property]) -> Result<()> {
    for property in properties {
        if let Ok((_, ty)) = &property.decoded {
            registry.register(ty, Usage::Property)?;
        }
    }
    Ok(())
}

/// Dump several images in parallel, one independent pipeline per image
///
/// ## Arguments
/// * 'images' - The images to dump
/// * 'config' - Options shared by every dump
#[must_use]
pub fn dump_images(images: &[ObjcImage], config: &DumpConfig) -> Vec<Result<Output>> {
    images
        .par_iter()
        .map(|image| ClassDump::new(image, config.clone())?.render())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        objc::{ObjcCategory, ObjcClass, ObjcIvar, ObjcMethod, ObjcProperty, ObjcProtocol},
        test::sample_image,
    };

    fn order(dump: &ClassDump) -> Vec<String> {
        dump.declarations()
            .into_iter()
            .map(|node| match node {
                Node::Protocol(p) => DependencyNode::protocol_id(&p.name),
                Node::Class(c) => c.name.clone(),
                Node::Category(c) => DependencyNode::category_id(&c.class_name, &c.name),
                Node::Header | Node::Structures => unreachable!(),
            })
            .collect()
    }

    #[test]
    fn test_inheritance_order() {
        let mut image = ObjcImage::new("Test");
        image.classes = vec![
            ObjcClass::new("B").with_superclass("A"),
            ObjcClass::new("A").with_superclass("NSObject"),
        ];
        let dump = ClassDump::new(&image, DumpConfig::default()).unwrap();
        assert_eq!(order(&dump), vec!["A", "B"]);

        let dump = ClassDump::new(&image, DumpConfig::minimal()).unwrap();
        assert_eq!(order(&dump), vec!["B", "A"]);
    }

    #[test]
    fn test_alphabetical_order_without_inheritance() {
        let mut image = ObjcImage::new("Test");
        image.classes = vec![ObjcClass::new("Zeta"), ObjcClass::new("Alpha")];
        image.protocols = vec![ObjcProtocol::new("Delegate")];
        let config = DumpConfig::minimal().with_sort_classes(true);
        let dump = ClassDump::new(&image, config).unwrap();
        assert_eq!(order(&dump), vec!["<Delegate>", "Alpha", "Zeta"]);
    }

    #[test]
    fn test_sample_image_order() {
        let dump = ClassDump::new(&sample_image(), DumpConfig::default()).unwrap();
        let order = order(&dump);
        let position = |id: &str| order.iter().position(|entry| entry == id).unwrap();
        assert!(position("<Drawable>") < position("Shape"));
        assert!(position("Shape") < position("Circle"));
        assert!(position("Circle") < position("Circle(Extras)"));
    }

    #[test]
    fn test_name_filter() {
        let config = DumpConfig::default().with_name_filter("Circle");
        let dump = ClassDump::new(&sample_image(), config).unwrap();
        assert_eq!(order(&dump), vec!["Circle", "Circle(Extras)"]);
    }

    #[test]
    fn test_strip_options() {
        let mut base = ObjcClass::new("Base");
        base.instance_methods.push(ObjcMethod::new("draw", "v16@0:8"));
        let mut leaf = ObjcClass::new("Leaf").with_superclass("Base");
        leaf.properties
            .push(ObjcProperty::new("name", "T@\"NSString\",C,N,V_name"));
        for selector in ["draw", ".cxx_destruct", "name", "setName:", "layout"] {
            leaf.instance_methods
                .push(ObjcMethod::new(selector, "v16@0:8"));
        }
        let mut image = ObjcImage::new("Test");
        image.classes = vec![base, leaf];

        let config = DumpConfig::default()
            .with_strip_overrides(true)
            .with_strip_ctor_dtor(true)
            .with_strip_synthesized(true);
        let dump = ClassDump::new(&image, config).unwrap();
        let leaf = &dump.classes()[1];
        let names: Vec<_> = leaf.instance_methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["layout"]);
    }

    #[test]
    fn test_sort_methods() {
        let mut class = ObjcClass::new("Sorted");
        for selector in ["zoom", "apply", "merge"] {
            class
                .instance_methods
                .push(ObjcMethod::new(selector, "v16@0:8"));
        }
        let mut image = ObjcImage::new("Test");
        image.classes.push(class);

        let dump = ClassDump::new(&image, DumpConfig::default().with_sort_methods(true)).unwrap();
        let names: Vec<_> = dump.classes()[0]
            .instance_methods
            .iter()
            .map(|m| m.name.as_str())
            .collect();
        assert_eq!(names, vec!["apply", "merge", "zoom"]);
    }

    #[test]
    fn test_structures_from_all_sources() {
        let mut class = ObjcClass::new("Geometry");
        class.ivars.push(ObjcIvar::new("_origin", "{CGPoint=\"x\"d\"y\"d}", 8));
        class
            .instance_methods
            .push(ObjcMethod::new("size", "{CGSize=dd}16@0:8"));
        let mut category = ObjcCategory::new("Geometry", "Ranges");
        category
            .properties
            .push(ObjcProperty::new("range", "T{_NSRange=QQ},R,N"));
        let mut image = ObjcImage::new("Test");
        image.classes.push(class);
        image.categories.push(category);

        let dump = ClassDump::new(&image, DumpConfig::default()).unwrap();
        let names: Vec<_> = dump
            .registry()
            .entries()
            .iter()
            .map(|entry| entry.name.as_str())
            .collect();
        assert_eq!(names, vec!["CGPoint", "CGSize", "_NSRange"]);
        assert!(!dump.registry().entries()[0].used_in_method);
        assert!(dump.registry().entries()[2].used_in_method);
    }

    #[test]
    fn test_dump_images_in_parallel() {
        let images = vec![sample_image(), ObjcImage::new("Empty")];
        let outputs = dump_images(&images, &DumpConfig::default());
        assert_eq!(outputs.len(), 2);
        assert!(outputs.iter().all(Result::is_ok));
    }

    #[test]
    fn test_render_selects_strategy() {
        let image = sample_image();
        let dump = ClassDump::new(&image, DumpConfig::default()).unwrap();
        assert!(matches!(dump.render().unwrap(), Output::Combined(_)));

        let dump = ClassDump::new(&image, DumpConfig::default().with_per_unit_output(true)).unwrap();
        assert!(matches!(dump.render().unwrap(), Output::Units(_)));
    }
}
