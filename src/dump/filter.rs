//! Member filters applied before registration and rendering.

use std::collections::{HashMap, HashSet};

use crate::{
    dump::model::{Method, Property},
    objc::{ObjcClass, ObjcImage},
};

/// Selectors of the C++ ivar constructor and destructor the compiler adds to classes
const CXX_SELECTORS: [&str; 2] = [".cxx_construct", ".cxx_destruct"];

/// Drop `.cxx_construct` and `.cxx_destruct`
pub(crate) fn strip_ctor_dtor(methods: &mut Vec<Method>) {
    methods.retain(|method| !CXX_SELECTORS.contains(&method.name.as_str()));
}

/// Drop getters and setters of the given properties
pub(crate) fn strip_synthesized(methods: &mut Vec<Method>, properties: &[Property]) {
    let accessors = accessor_selectors(properties);
    methods.retain(|method| !accessors.contains(&method.name));
}

/// Selectors of every accessor of the decoded properties
fn accessor_selectors(properties: &[Property]) -> HashSet<String> {
    let mut selectors = HashSet::new();
    for property in properties {
        let Ok((attributes, _)) = &property.decoded else {
            continue;
        };
        selectors.insert(attributes.getter_name(&property.name));
        if let Some(setter) = attributes.setter_name(&property.name) {
            selectors.insert(setter);
        }
    }
    selectors
}

/// Class and instance selectors declared by the superclasses of a class
#[derive(Debug, Default)]
pub(crate) struct InheritedSelectors {
    pub(crate) class_methods: HashSet<String>,
    pub(crate) instance_methods: HashSet<String>,
}

impl InheritedSelectors {
    /// Walk the superclass chain of `class` as far as it stays inside `image`
    pub(crate) fn collect(image: &ObjcImage, class: &ObjcClass) -> Self {
        let classes: HashMap<&str, &ObjcClass> = image
            .classes
            .iter()
            .map(|class| (class.name.as_str(), class))
            .collect();

        let mut inherited = InheritedSelectors::default();
        let mut visited = HashSet::from([class.name.as_str()]);
        let mut current = class.superclass.as_deref();
        while let Some(name) = current {
            if !visited.insert(name) {
                break;
            }
            let Some(superclass) = classes.get(name) else {
                break;
            };
            inherited
                .class_methods
                .extend(superclass.class_methods.iter().map(|m| m.name.clone()));
            inherited
                .instance_methods
                .extend(superclass.instance_methods.iter().map(|m| m.name.clone()));
            current = superclass.superclass.as_deref();
        }
        inherited
    }

    /// Drop the methods a superclass already declares
    pub(crate) fn strip(&self, class_methods: &mut Vec<Method>, instance_methods: &mut Vec<Method>) {
        class_methods.retain(|method| !self.class_methods.contains(&method.name));
        instance_methods.retain(|method| !self.instance_methods.contains(&method.name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objc::{ObjcMethod, ObjcProperty};

    fn methods(selectors: &[&str]) -> Vec<Method> {
        selectors
            .iter()
            .map(|selector| Method::decode(&ObjcMethod::new(*selector, "v16@0:8")))
            .collect()
    }

    fn names(methods: &[Method]) -> Vec<&str> {
        methods.iter().map(|method| method.name.as_str()).collect()
    }

    #[test]
    fn test_strip_ctor_dtor() {
        let mut list = methods(&[".cxx_construct", "run", ".cxx_destruct"]);
        strip_ctor_dtor(&mut list);
        assert_eq!(names(&list), vec!["run"]);
    }

    #[test]
    fn test_strip_synthesized() {
        let properties = [
            Property::decode(&ObjcProperty::new("title", "T@\"NSString\",C,N,V_title")),
            Property::decode(&ObjcProperty::new("enabled", "TB,R,GisEnabled")),
        ];
        let mut list = methods(&["title", "setTitle:", "isEnabled", "setEnabled:", "reload"]);
        strip_synthesized(&mut list, &properties);
        assert_eq!(names(&list), vec!["setEnabled:", "reload"]);
    }

    #[test]
    fn test_inherited_selectors_follow_chain() {
        let mut base = ObjcClass::new("Base");
        base.instance_methods.push(ObjcMethod::new("draw", "v16@0:8"));
        let mut middle = ObjcClass::new("Middle").with_superclass("Base");
        middle.class_methods.push(ObjcMethod::new("shared", "@16@0:8"));
        let leaf = ObjcClass::new("Leaf").with_superclass("Middle");

        let mut image = ObjcImage::new("Test");
        image.classes = vec![base, middle, leaf.clone()];

        let inherited = InheritedSelectors::collect(&image, &leaf);
        let mut class_methods = methods(&["shared", "make"]);
        let mut instance_methods = methods(&["draw", "layout"]);
        inherited.strip(&mut class_methods, &mut instance_methods);
        assert_eq!(names(&class_methods), vec!["make"]);
        assert_eq!(names(&instance_methods), vec!["layout"]);
    }

    #[test]
    fn test_inherited_selectors_stop_on_cycle() {
        let first = ObjcClass::new("A").with_superclass("B");
        let second = ObjcClass::new("B").with_superclass("A");
        let mut image = ObjcImage::new("Test");
        image.classes = vec![first.clone(), second];

        let inherited = InheritedSelectors::collect(&image, &first);
        assert!(inherited.instance_methods.is_empty());
    }
}
