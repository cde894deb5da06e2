//! Canonical re-encoding of decoded types.
//!
//! The canonical form is what the parser accepts back into an identical [`Type`]:
//! qualifiers in canonical order, anonymous tags spelled `?`, member names quoted
//! in front of their type. [`encode_shape`] drops member names and is the key used
//! to compare structures by shape alone.

use std::fmt::Write;

use crate::{
    encoding::{Composite, Type},
    utils::ensure_sufficient_stack,
};

/// Encode a type into its canonical encoding string, including member names
#[must_use]
pub fn encode(ty: &Type) -> String {
    let mut out = String::new();
    write_type(&mut out, ty, true);
    out
}

/// Encode a type without any struct/union member names
#[must_use]
pub fn encode_shape(ty: &Type) -> String {
    let mut out = String::new();
    write_type(&mut out, ty, false);
    out
}

fn write_type(out: &mut String, ty: &Type, names: bool) {
    ensure_sufficient_stack(|| match ty {
        Type::Primitive(primitive) => out.push(primitive.code()),
        Type::Id(object) => {
            out.push('@');
            if object.class_name.is_some() || !object.protocols.is_empty() {
                out.push('"');
                if let Some(class_name) = &object.class_name {
                    out.push_str(class_name);
                }
                for protocol in &object.protocols {
                    out.push('<');
                    out.push_str(protocol);
                    out.push('>');
                }
                out.push('"');
            }
        }
        Type::Pointer(inner) => {
            out.push('^');
            write_type(out, inner, names);
        }
        Type::Array { element, count } => {
            let _ = write!(out, "[{}", count);
            write_type(out, element, names);
            out.push(']');
        }
        Type::Struct(body) => write_composite(out, '{', '}', body, names),
        Type::Union(body) => write_composite(out, '(', ')', body, names),
        Type::Bitfield(width) => {
            let _ = write!(out, "b{}", width);
        }
        Type::Block(None) => out.push_str("@?"),
        Type::Block(Some(signature)) => {
            out.push_str("@?<");
            write_type(out, &signature.return_type, names);
            out.push_str("@?");
            for parameter in &signature.parameters {
                write_type(out, parameter, names);
            }
            out.push('>');
        }
        Type::FunctionPointer => out.push_str("^?"),
        Type::Modified { qualifiers, inner } => {
            out.push_str(&qualifiers.codes());
            write_type(out, inner, names);
        }
    });
}

fn write_composite(out: &mut String, open: char, close: char, body: &Composite, names: bool) {
    out.push(open);
    out.push_str(body.name.as_deref().unwrap_or("?"));
    if !body.members.is_empty() {
        out.push('=');
        for member in &body.members {
            if names {
                if let Some(name) = &member.name {
                    out.push('"');
                    out.push_str(name);
                    out.push('"');
                }
            }
            write_type(out, &member.ty, names);
        }
    }
    out.push(close);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::parse_type;

    #[test]
    fn test_encode_canonical_forms() {
        let cases = [
            ("i", "i"),
            ("^v", "^v"),
            ("[8c]", "[8c]"),
            ("{_NSRange=QQ}", "{_NSRange=QQ}"),
            ("{?=\"x\"f\"y\"f}", "{?=\"x\"f\"y\"f}"),
            ("^{Opaque}", "^{Opaque}"),
            ("(?=iI)", "(?=iI)"),
            ("@", "@"),
            ("@\"NSString\"", "@\"NSString\""),
            ("@\"<NSCopying><NSCoding>\"", "@\"<NSCopying><NSCoding>\""),
            ("@?", "@?"),
            ("^?", "^?"),
            ("Vv", "Vv"),
        ];

        for (input, expected) in cases {
            assert_eq!(encode(&parse_type(input).unwrap()), expected, "{}", input);
        }
    }

    #[test]
    fn test_encode_canonicalizes_qualifier_order() {
        assert_eq!(encode(&parse_type("Nr^v").unwrap()), "rN^v");
    }

    #[test]
    fn test_encode_anonymous_tags() {
        assert_eq!(encode(&parse_type("{$_12=ii}").unwrap()), "{?=ii}");
    }

    #[test]
    fn test_encode_shape_drops_member_names() {
        let ty = parse_type("{CGPoint=\"x\"d\"y\"d}").unwrap();
        assert_eq!(encode_shape(&ty), "{CGPoint=dd}");
        assert_eq!(encode(&ty), "{CGPoint=\"x\"d\"y\"d}");
    }
}
