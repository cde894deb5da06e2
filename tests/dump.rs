//! End-to-end tests running whole images through the dump pipeline.

use classdump::prelude::*;

fn combined(image: &ObjcImage, config: DumpConfig) -> String {
    match ClassDump::new(image, config).unwrap().render().unwrap() {
        Output::Combined(text) => text,
        Output::Units(_) => panic!("expected combined output"),
    }
}

fn image_with(classes: Vec<ObjcClass>) -> ObjcImage {
    let mut image = ObjcImage::new("Test");
    image.classes = classes;
    image
}

#[test]
fn structure_is_defined_once_and_referenced_by_name() {
    let mut document = ObjcClass::new("Document").with_superclass("NSObject");
    document.ivars.push(ObjcIvar::new(
        "_range",
        "{_NSRange=\"location\"Q\"length\"Q}",
        8,
    ));
    document
        .instance_methods
        .push(ObjcMethod::new("selectedRange", "{_NSRange=QQ}16@0:8"));
    document.instance_methods.push(ObjcMethod::new(
        "setSelectedRange:",
        "v32@0:8{_NSRange=QQ}16",
    ));

    let text = combined(&image_with(vec![document]), DumpConfig::minimal());
    assert_eq!(
        text.matches(
            "struct _NSRange {\n    unsigned long long location;\n    unsigned long long length;\n};"
        )
        .count(),
        1
    );
    assert!(text.contains("    struct _NSRange _range;\n"));
    assert!(text.contains("- (struct _NSRange)selectedRange;\n"));
    assert!(text.contains("- (void)setSelectedRange:(struct _NSRange)arg1;\n"));
}

#[test]
fn identical_structures_share_one_entry() {
    let mut first = ObjcClass::new("First");
    first
        .instance_methods
        .push(ObjcMethod::new("origin", "{Point=ff}16@0:8"));
    let mut second = ObjcClass::new("Second");
    second
        .instance_methods
        .push(ObjcMethod::new("origin", "{Point=ff}16@0:8"));

    let dump = ClassDump::new(&image_with(vec![first, second]), DumpConfig::minimal()).unwrap();
    let registry = dump.registry();
    assert_eq!(registry.len(), 1);

    let entry = &registry.entries()[0];
    assert_eq!(entry.name, "Point");
    assert_eq!(entry.reference_count, 2);
    assert!(!entry.conflict);
    assert!(entry.used_in_method);
}

#[test]
fn conflicting_structures_get_suffixed_names() {
    let mut canvas = ObjcClass::new("Canvas");
    canvas
        .instance_methods
        .push(ObjcMethod::new("floatPoint", "{Point=ff}16@0:8"));
    canvas
        .instance_methods
        .push(ObjcMethod::new("doublePoint", "{Point=dd}16@0:8"));

    let dump = ClassDump::new(&image_with(vec![canvas]), DumpConfig::minimal()).unwrap();
    let names: Vec<_> = dump
        .registry()
        .entries()
        .iter()
        .map(|entry| entry.name.as_str())
        .collect();
    assert_eq!(names, vec!["Point", "Point_1"]);

    let Output::Combined(text) = dump.render().unwrap() else {
        panic!("expected combined output");
    };
    assert!(text.contains("struct Point {\n    float field0;\n    float field1;\n};"));
    assert!(text.contains("struct Point_1 {\n    double field0;\n    double field1;\n};"));
    assert!(text.contains("- (struct Point)floatPoint;\n"));
    assert!(text.contains("- (struct Point_1)doublePoint;\n"));
}

#[test]
fn named_structure_follows_the_anonymous_structure_it_contains() {
    let mut layout = ObjcClass::new("Layout").with_superclass("NSObject");
    layout.ivars.push(ObjcIvar::new(
        "_outer",
        "{Outer=\"inner\"{?=\"x\"i\"y\"i}}",
        8,
    ));

    let dump = ClassDump::new(&image_with(vec![layout]), DumpConfig::minimal()).unwrap();
    let anonymous = dump
        .registry()
        .entries()
        .iter()
        .find(|entry| entry.is_typedef)
        .unwrap()
        .name
        .clone();
    assert!(anonymous.starts_with("CDStruct_"));

    let Output::Combined(text) = dump.render().unwrap() else {
        panic!("expected combined output");
    };
    let typedef = text
        .find(&format!("typedef struct {{\n    int x;\n    int y;\n}} {};", anonymous))
        .unwrap();
    let outer = text
        .find(&format!("struct Outer {{\n    {} inner;\n}};", anonymous))
        .unwrap();
    assert!(typedef < outer);
    assert!(text.contains("    struct Outer _outer;\n"));
}

#[test]
fn malformed_member_does_not_fail_the_declaration() {
    let mut broken = ObjcClass::new("Broken").with_superclass("NSObject");
    broken.ivars.push(ObjcIvar::new("_count", "i", 8));
    broken.ivars.push(ObjcIvar::new("_bad", "{Bad=^", 16));
    broken.ivars.push(ObjcIvar::new("_name", "@\"NSString\"", 24));
    broken
        .instance_methods
        .push(ObjcMethod::new("count", "i16@0:8"));

    assert!(matches!(
        parse_type("{Bad=^"),
        Err(Error::Syntax { offset: 6, .. })
    ));

    let text = combined(&image_with(vec![broken]), DumpConfig::minimal());
    assert!(text.starts_with("@interface Broken : NSObject\n"));
    assert!(text.contains("    int _count;\n"));
    assert!(text.contains("    // Error parsing type: {Bad=^, name: _bad\n"));
    assert!(text.contains("    NSString *_name;\n"));
    assert!(text.contains("- (int)count;\n"));
    assert!(text.contains("@end\n"));
}

#[test]
fn superclass_is_declared_before_subclass() {
    let b = ObjcClass::new("B").with_superclass("A");
    let a = ObjcClass::new("A").with_superclass("NSObject");

    let dump = ClassDump::new(&image_with(vec![b, a]), DumpConfig::default()).unwrap();
    let order: Vec<&str> = dump
        .declarations()
        .iter()
        .filter_map(|node| match node {
            Node::Class(class) => Some(class.name.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(order, vec!["A", "B"]);

    let Output::Combined(text) = dump.render().unwrap() else {
        panic!("expected combined output");
    };
    let a = text.find("@interface A : NSObject").unwrap();
    let b = text.find("@interface B : A").unwrap();
    assert!(a < b);
}

#[test]
fn per_unit_output_is_written_to_disk() {
    let mut shape = ObjcClass::new("Shape").with_superclass("NSObject");
    shape
        .instance_methods
        .push(ObjcMethod::new("area", "d16@0:8"));
    let mut image = image_with(vec![shape]);
    let mut drawable = ObjcProtocol::new("Drawable");
    drawable
        .instance_methods
        .push(ObjcMethod::new("draw", "v16@0:8"));
    image.protocols.push(drawable);

    let output = ClassDump::new(&image, DumpConfig::default().with_per_unit_output(true))
        .unwrap()
        .render()
        .unwrap();
    let Output::Units(units) = &output else {
        panic!("expected per-unit output");
    };
    assert_eq!(units.len(), 2);

    let dir = std::env::temp_dir().join(format!("classdump-units-{}", std::process::id()));
    output.write_to(&dir, "Test").unwrap();

    let shape = std::fs::read_to_string(dir.join("Shape.h")).unwrap();
    assert!(shape.contains("#import \"NSObject.h\""));
    assert!(shape.contains("@interface Shape : NSObject"));
    assert!(shape.contains("- (double)area;"));

    let protocol = std::fs::read_to_string(dir.join("Drawable-Protocol.h")).unwrap();
    assert!(protocol.contains("@protocol Drawable"));

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn combined_output_is_written_to_disk() {
    let image = image_with(vec![ObjcClass::new("Empty")]);
    let output = ClassDump::new(&image, DumpConfig::minimal())
        .unwrap()
        .render()
        .unwrap();

    let dir = std::env::temp_dir().join(format!("classdump-combined-{}", std::process::id()));
    output.write_to(&dir, "Test").unwrap();
    let text = std::fs::read_to_string(dir.join("Test.h")).unwrap();
    assert!(text.contains("@interface Empty"));

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn several_images_are_dumped_independently() {
    let images = vec![
        image_with(vec![ObjcClass::new("One")]),
        ObjcImage::new("Empty"),
        image_with(vec![ObjcClass::new("Two")]),
    ];
    let outputs = dump_images(&images, &DumpConfig::minimal());
    assert_eq!(outputs.len(), 3);

    let texts: Vec<String> = outputs
        .into_iter()
        .map(|output| match output.unwrap() {
            Output::Combined(text) => text,
            Output::Units(_) => panic!("expected combined output"),
        })
        .collect();
    assert!(texts[0].contains("@interface One"));
    assert!(texts[1].is_empty());
    assert!(texts[2].contains("@interface Two"));
}
