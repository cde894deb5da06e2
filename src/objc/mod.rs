//! Objective-C runtime records of an image.
//!
//! These are the records a Mach-O reader extracts from an image's `__objc_*` sections,
//! with every string already resolved. Type information is kept as the raw encoding
//! strings the compiler emitted; decoding them is the job of the dump pipeline.
//!
//! # Examples
//!
//! ```rust
//! use classdump::objc::{ObjcClass, ObjcImage, ObjcIvar, ObjcMethod};
//!
//! let mut class = ObjcClass::new("Counter").with_superclass("NSObject");
//! class.ivars.push(ObjcIvar::new("_count", "q", 8));
//! class.instance_methods.push(ObjcMethod::new("increment", "v16@0:8"));
//!
//! let image = ObjcImage {
//!     name: "Counter".into(),
//!     classes: vec![class],
//!     ..Default::default()
//! };
//! assert_eq!(image.classes[0].superclass.as_deref(), Some("NSObject"));
//! ```

mod property;

pub use property::PropertyAttributes;

/// A method: selector, type encoding and implementation address
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObjcMethod {
    /// Selector, e.g. `setObject:forKey:`
    pub name: String,
    /// Method type encoding, e.g. `v32@0:8@16@24`
    pub type_encoding: String,
    /// Address of the implementation, absent for protocol methods
    pub address: Option<u64>,
}

impl ObjcMethod {
    /// Create a method without implementation address
    pub fn new(name: impl Into<String>, type_encoding: impl Into<String>) -> Self {
        ObjcMethod {
            name: name.into(),
            type_encoding: type_encoding.into(),
            address: None,
        }
    }

    /// Set the implementation address
    #[must_use]
    pub fn with_address(mut self, address: u64) -> Self {
        self.address = Some(address);
        self
    }
}

/// An instance variable
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObjcIvar {
    /// Variable name
    pub name: String,
    /// Type encoding
    pub type_encoding: String,
    /// Byte offset inside the instance
    pub offset: u64,
}

impl ObjcIvar {
    /// Create an instance variable
    pub fn new(name: impl Into<String>, type_encoding: impl Into<String>, offset: u64) -> Self {
        ObjcIvar {
            name: name.into(),
            type_encoding: type_encoding.into(),
            offset,
        }
    }
}

/// A declared property
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObjcProperty {
    /// Property name
    pub name: String,
    /// Raw attribute string, e.g. `T@"NSString",C,N,V_title`
    pub attributes: String,
}

impl ObjcProperty {
    /// Create a property
    pub fn new(name: impl Into<String>, attributes: impl Into<String>) -> Self {
        ObjcProperty {
            name: name.into(),
            attributes: attributes.into(),
        }
    }
}

/// A class with its ivars, methods and properties
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObjcClass {
    /// Class name
    pub name: String,
    /// Superclass name, absent for root classes
    pub superclass: Option<String>,
    /// Adopted protocols
    pub protocols: Vec<String>,
    /// Instance variables in layout order
    pub ivars: Vec<ObjcIvar>,
    /// Class (`+`) methods
    pub class_methods: Vec<ObjcMethod>,
    /// Instance (`-`) methods
    pub instance_methods: Vec<ObjcMethod>,
    /// Declared properties
    pub properties: Vec<ObjcProperty>,
}

impl ObjcClass {
    /// Create an empty class
    pub fn new(name: impl Into<String>) -> Self {
        ObjcClass {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the superclass
    #[must_use]
    pub fn with_superclass(mut self, superclass: impl Into<String>) -> Self {
        self.superclass = Some(superclass.into());
        self
    }

    /// Add an adopted protocol
    #[must_use]
    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocols.push(protocol.into());
        self
    }
}

/// A category extending a class
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObjcCategory {
    /// Category name
    pub name: String,
    /// Name of the extended class
    pub class_name: String,
    /// Adopted protocols
    pub protocols: Vec<String>,
    /// Class (`+`) methods
    pub class_methods: Vec<ObjcMethod>,
    /// Instance (`-`) methods
    pub instance_methods: Vec<ObjcMethod>,
    /// Declared properties
    pub properties: Vec<ObjcProperty>,
}

impl ObjcCategory {
    /// Create an empty category on `class_name`
    pub fn new(class_name: impl Into<String>, name: impl Into<String>) -> Self {
        ObjcCategory {
            name: name.into(),
            class_name: class_name.into(),
            ..Default::default()
        }
    }
}

/// A protocol with required and optional methods
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObjcProtocol {
    /// Protocol name
    pub name: String,
    /// Adopted protocols
    pub protocols: Vec<String>,
    /// Required class methods
    pub class_methods: Vec<ObjcMethod>,
    /// Required instance methods
    pub instance_methods: Vec<ObjcMethod>,
    /// Optional class methods
    pub optional_class_methods: Vec<ObjcMethod>,
    /// Optional instance methods
    pub optional_instance_methods: Vec<ObjcMethod>,
    /// Declared properties
    pub properties: Vec<ObjcProperty>,
}

impl ObjcProtocol {
    /// Create an empty protocol
    pub fn new(name: impl Into<String>) -> Self {
        ObjcProtocol {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// All Objective-C records of one image (or one architecture slice of it)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObjcImage {
    /// Image name, used in the banner
    pub name: String,
    /// Classes in section order
    pub classes: Vec<ObjcClass>,
    /// Categories in section order
    pub categories: Vec<ObjcCategory>,
    /// Protocols in section order
    pub protocols: Vec<ObjcProtocol>,
}

impl ObjcImage {
    /// Create an empty image
    pub fn new(name: impl Into<String>) -> Self {
        ObjcImage {
            name: name.into(),
            ..Default::default()
        }
    }

    /// The class named `name`
    #[must_use]
    pub fn class(&self, name: &str) -> Option<&ObjcClass> {
        self.classes.iter().find(|class| class.name == name)
    }
}
