//! Shared helpers for unit tests.

use crate::{
    encoding::parse_ivar_type,
    objc::{ObjcCategory, ObjcClass, ObjcImage, ObjcIvar, ObjcMethod, ObjcProtocol},
    typesystem::{
        FrozenRegistry, Placeholder, ReferenceDelegate, StructureEntry, StructureRegistry, Usage,
    },
};

/// Run all registry phases over the given encodings
pub fn freeze_types(encodings: &[&str], usage: Usage) -> FrozenRegistry {
    let mut registry = StructureRegistry::new();
    for encoding in encodings {
        let ty = parse_ivar_type(encoding).unwrap();
        registry.register(&ty, usage).unwrap();
    }
    registry.dedup().unwrap().merge().unwrap().freeze().unwrap()
}

/// A delegate that remembers every notification
#[derive(Debug, Default)]
pub struct RecordingDelegate {
    pub class_names: Vec<String>,
    pub protocol_names: Vec<String>,
    pub structures: Vec<usize>,
    pub placeholders: Vec<Placeholder>,
}

impl ReferenceDelegate for RecordingDelegate {
    fn did_reference_class_name(&mut self, name: &str) {
        self.class_names.push(name.to_string());
    }

    fn did_reference_protocol_names(&mut self, names: &[String]) {
        self.protocol_names.extend(names.iter().cloned());
    }

    fn did_reference_structure(&mut self, entry: &StructureEntry) {
        self.structures.push(entry.id);
    }

    fn did_reference_placeholder(&mut self, placeholder: Placeholder) {
        self.placeholders.push(placeholder);
    }
}

/// A small image: protocol `Drawable`, classes `Shape : NSObject <Drawable>` and
/// `Circle : Shape`, and the category `Circle (Extras)`
pub fn sample_image() -> ObjcImage {
    let mut drawable = ObjcProtocol::new("Drawable");
    drawable.protocols.push("NSObject".into());
    drawable
        .instance_methods
        .push(ObjcMethod::new("draw", "v16@0:8"));

    let mut shape = ObjcClass::new("Shape")
        .with_superclass("NSObject")
        .with_protocol("Drawable");
    shape
        .ivars
        .push(ObjcIvar::new("_origin", "{CGPoint=\"x\"d\"y\"d}", 8));
    shape
        .instance_methods
        .push(ObjcMethod::new("center", "{CGPoint=dd}16@0:8").with_address(0x1000));
    shape
        .instance_methods
        .push(ObjcMethod::new("draw", "v16@0:8").with_address(0x1040));

    let mut circle = ObjcClass::new("Circle").with_superclass("Shape");
    circle.ivars.push(ObjcIvar::new("_radius", "d", 24));
    circle
        .ivars
        .push(ObjcIvar::new("_color", "@\"NSColor\"", 32));
    circle
        .instance_methods
        .push(ObjcMethod::new("radius", "d16@0:8").with_address(0x1080));
    circle
        .instance_methods
        .push(ObjcMethod::new("setRadius:", "v24@0:8d16").with_address(0x10c0));

    let mut extras = ObjcCategory::new("Circle", "Extras");
    extras
        .instance_methods
        .push(ObjcMethod::new("animateWithCompletion:", "v24@0:8@?16"));

    ObjcImage {
        name: "Shapes".into(),
        classes: vec![circle, shape],
        categories: vec![extras],
        protocols: vec![drawable],
    }
}
