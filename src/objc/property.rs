use crate::{encoding::EncodingParser, Error, Result};

/// Decoded property attribute string.
///
/// The attribute string is a comma separated list of single letter attributes, e.g.
/// `T@"NSString",C,N,V_title`:
///
/// | Letter | Meaning                          |
/// |--------|----------------------------------|
/// | `T`    | type encoding (always first)     |
/// | `R`    | readonly                         |
/// | `C`    | copy                             |
/// | `&`    | retain                           |
/// | `W`    | weak                             |
/// | `N`    | nonatomic                        |
/// | `G`    | custom getter                    |
/// | `S`    | custom setter                    |
/// | `D`    | dynamic                          |
/// | `V`    | backing instance variable        |
///
/// Anything else (such as `P`) is kept verbatim in [`PropertyAttributes::unknown`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct PropertyAttributes {
    /// The property's type encoding
    pub type_encoding: String,
    /// `R`
    pub read_only: bool,
    /// `C`
    pub copy: bool,
    /// `&`
    pub retain: bool,
    /// `W`
    pub weak: bool,
    /// `N`
    pub non_atomic: bool,
    /// `D`
    pub dynamic: bool,
    /// `G`
    pub getter: Option<String>,
    /// `S`
    pub setter: Option<String>,
    /// `V`
    pub ivar: Option<String>,
    /// Unrecognized attributes
    pub unknown: Vec<String>,
}

impl PropertyAttributes {
    /// Decode an attribute string
    ///
    /// ## Arguments
    /// * 'attributes' - The raw attribute string
    ///
    /// # Errors
    /// Returns [`crate::Error::Syntax`] if the string does not start with a `T` attribute.
    pub fn parse(attributes: &str) -> Result<Self> {
        let Some(rest) = attributes.strip_prefix('T') else {
            return Err(Error::syntax(attributes, 0, "expected type attribute"));
        };

        // The type can contain commas (C++ template tags), so it is measured by the parser
        let type_len = match EncodingParser::new(rest).parse_type_prefix() {
            Ok((_, consumed)) if rest[consumed..].is_empty() || rest[consumed..].starts_with(',') => {
                consumed
            }
            _ => rest.find(',').unwrap_or(rest.len()),
        };

        let mut decoded = PropertyAttributes {
            type_encoding: rest[..type_len].to_string(),
            ..Default::default()
        };

        let remaining = rest[type_len..].strip_prefix(',').unwrap_or_default();
        for attribute in remaining.split(',').filter(|a| !a.is_empty()) {
            let mut chars = attribute.chars();
            let code = chars.next();
            let value = chars.as_str();
            match code {
                Some('R') => decoded.read_only = true,
                Some('C') => decoded.copy = true,
                Some('&') => decoded.retain = true,
                Some('W') => decoded.weak = true,
                Some('N') => decoded.non_atomic = true,
                Some('D') => decoded.dynamic = true,
                Some('G') => decoded.getter = Some(value.to_string()),
                Some('S') => decoded.setter = Some(value.to_string()),
                Some('V') => decoded.ivar = Some(value.to_string()),
                _ => decoded.unknown.push(attribute.to_string()),
            }
        }

        Ok(decoded)
    }

    /// Selector of the getter for a property named `name`
    #[must_use]
    pub fn getter_name(&self, name: &str) -> String {
        self.getter.clone().unwrap_or_else(|| name.to_string())
    }

    /// Selector of the setter for a property named `name`, absent for readonly properties
    #[must_use]
    pub fn setter_name(&self, name: &str) -> Option<String> {
        if self.read_only {
            return None;
        }
        if let Some(setter) = &self.setter {
            return Some(setter.clone());
        }

        let mut chars = name.chars();
        let first = chars.next()?;
        Some(format!("set{}{}:", first.to_uppercase(), chars.as_str()))
    }

    /// Attribute keywords in declaration order, e.g. `["readonly", "nonatomic"]`
    #[must_use]
    pub fn keywords(&self) -> Vec<String> {
        let mut keywords = Vec::new();
        if self.read_only {
            keywords.push("readonly".to_string());
        }
        if self.copy {
            keywords.push("copy".to_string());
        } else if self.retain {
            keywords.push("retain".to_string());
        } else if self.weak {
            keywords.push("weak".to_string());
        }
        if self.non_atomic {
            keywords.push("nonatomic".to_string());
        }
        if let Some(getter) = &self.getter {
            keywords.push(format!("getter={}", getter));
        }
        if let Some(setter) = &self.setter {
            keywords.push(format!("setter={}", setter));
        }
        keywords
    }

    /// The trailing comment describing how the property is implemented
    #[must_use]
    pub fn implementation_comment(&self, name: &str) -> Option<String> {
        if self.dynamic {
            return Some(format!("// @dynamic {};", name));
        }
        match self.ivar.as_deref() {
            Some(ivar) if ivar == name => Some(format!("// @synthesize {};", name)),
            Some(ivar) => Some(format!("// @synthesize {}={};", name, ivar)),
            None => None,
        }
    }
}
