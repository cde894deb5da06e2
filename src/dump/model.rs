use tracing::warn;

use crate::{
    encoding::{parse_ivar_type, parse_method_signature, parse_type, MethodSignature, Type},
    objc::{
        ObjcCategory, ObjcClass, ObjcIvar, ObjcMethod, ObjcProperty, ObjcProtocol,
        PropertyAttributes,
    },
    Result,
};

/// An instance variable with its decoded type
#[derive(Debug)]
pub struct Ivar {
    /// Variable name
    pub name: String,
    /// Raw type encoding
    pub encoding: String,
    /// Byte offset inside the instance
    pub offset: u64,
    /// Decoded type, or the reason decoding failed
    pub ty: Result<Type>,
}

impl Ivar {
    /// Decode an instance variable record. Decoding failures are kept, not returned.
    #[must_use]
    pub fn decode(ivar: &ObjcIvar) -> Self {
        let ty = parse_ivar_type(&ivar.type_encoding);
        if let Err(err) = &ty {
            warn!("failed to decode ivar {}: {}", ivar.name, err);
        }

        Ivar {
            name: ivar.name.clone(),
            encoding: ivar.type_encoding.clone(),
            offset: ivar.offset,
            ty,
        }
    }
}

/// A method with its decoded signature
#[derive(Debug)]
pub struct Method {
    /// Selector
    pub name: String,
    /// Raw type encoding
    pub encoding: String,
    /// Implementation address
    pub address: Option<u64>,
    /// Decoded signature, or the reason decoding failed
    pub signature: Result<MethodSignature>,
}

impl Method {
    /// Decode a method record. Decoding failures are kept, not returned.
    #[must_use]
    pub fn decode(method: &ObjcMethod) -> Self {
        let signature = parse_method_signature(&method.type_encoding);
        if let Err(err) = &signature {
            warn!("failed to decode method {}: {}", method.name, err);
        }

        Method {
            name: method.name.clone(),
            encoding: method.type_encoding.clone(),
            address: method.address,
            signature,
        }
    }
}

/// A property with its decoded attributes and type
#[derive(Debug)]
pub struct Property {
    /// Property name
    pub name: String,
    /// Raw attribute string
    pub attributes: String,
    /// Decoded attributes and type, or the reason decoding failed
    pub decoded: Result<(PropertyAttributes, Type)>,
}

impl Property {
    /// Decode a property record. Decoding failures are kept, not returned.
    #[must_use]
    pub fn decode(property: &ObjcProperty) -> Self {
        let decoded = PropertyAttributes::parse(&property.attributes).and_then(|attributes| {
            let ty = parse_type(&attributes.type_encoding)?;
            Ok((attributes, ty))
        });
        if let Err(err) = &decoded {
            warn!("failed to decode property {}: {}", property.name, err);
        }

        Property {
            name: property.name.clone(),
            attributes: property.attributes.clone(),
            decoded,
        }
    }

    /// The type encoding to show when decoding failed
    pub(crate) fn raw_type(&self) -> &str {
        self.attributes
            .strip_prefix('T')
            .and_then(|rest| rest.split(',').next())
            .unwrap_or(&self.attributes)
    }
}

fn decode_methods(methods: &[ObjcMethod]) -> Vec<Method> {
    methods.iter().map(Method::decode).collect()
}

fn decode_properties(properties: &[ObjcProperty]) -> Vec<Property> {
    properties.iter().map(Property::decode).collect()
}

/// A class ready for rendering
#[derive(Debug)]
pub struct ClassDecl {
    /// Class name
    pub name: String,
    /// Superclass name
    pub superclass: Option<String>,
    /// Adopted protocols
    pub protocols: Vec<String>,
    /// Instance variables
    pub ivars: Vec<Ivar>,
    /// Class methods
    pub class_methods: Vec<Method>,
    /// Instance methods
    pub instance_methods: Vec<Method>,
    /// Properties
    pub properties: Vec<Property>,
}

impl ClassDecl {
    /// Decode a class record
    #[must_use]
    pub fn decode(class: &ObjcClass) -> Self {
        ClassDecl {
            name: class.name.clone(),
            superclass: class.superclass.clone(),
            protocols: class.protocols.clone(),
            ivars: class.ivars.iter().map(Ivar::decode).collect(),
            class_methods: decode_methods(&class.class_methods),
            instance_methods: decode_methods(&class.instance_methods),
            properties: decode_properties(&class.properties),
        }
    }
}

/// A category ready for rendering
#[derive(Debug)]
pub struct CategoryDecl {
    /// Category name
    pub name: String,
    /// Name of the extended class
    pub class_name: String,
    /// Adopted protocols
    pub protocols: Vec<String>,
    /// Class methods
    pub class_methods: Vec<Method>,
    /// Instance methods
    pub instance_methods: Vec<Method>,
    /// Properties
    pub properties: Vec<Property>,
}

impl CategoryDecl {
    /// Decode a category record
    #[must_use]
    pub fn decode(category: &ObjcCategory) -> Self {
        CategoryDecl {
            name: category.name.clone(),
            class_name: category.class_name.clone(),
            protocols: category.protocols.clone(),
            class_methods: decode_methods(&category.class_methods),
            instance_methods: decode_methods(&category.instance_methods),
            properties: decode_properties(&category.properties),
        }
    }
}

/// A protocol ready for rendering
#[derive(Debug)]
pub struct ProtocolDecl {
    /// Protocol name
    pub name: String,
    /// Adopted protocols
    pub protocols: Vec<String>,
    /// Required class methods
    pub class_methods: Vec<Method>,
    /// Required instance methods
    pub instance_methods: Vec<Method>,
    /// Optional class methods
    pub optional_class_methods: Vec<Method>,
    /// Optional instance methods
    pub optional_instance_methods: Vec<Method>,
    /// Properties
    pub properties: Vec<Property>,
}

impl ProtocolDecl {
    /// Decode a protocol record
    #[must_use]
    pub fn decode(protocol: &ObjcProtocol) -> Self {
        ProtocolDecl {
            name: protocol.name.clone(),
            protocols: protocol.protocols.clone(),
            class_methods: decode_methods(&protocol.class_methods),
            instance_methods: decode_methods(&protocol.instance_methods),
            optional_class_methods: decode_methods(&protocol.optional_class_methods),
            optional_instance_methods: decode_methods(&protocol.optional_instance_methods),
            properties: decode_properties(&protocol.properties),
        }
    }
}
