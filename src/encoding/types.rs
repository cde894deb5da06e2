use bitflags::bitflags;
use strum::{Display, EnumIter, IntoEnumIterator, IntoStaticStr};

use crate::{utils::ensure_sufficient_stack, Result};

/// Scalar types identified by a single encoding character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr)]
pub enum Primitive {
    /// `v`
    #[strum(serialize = "void")]
    Void,
    /// `c`
    #[strum(serialize = "char")]
    Char,
    /// `s`
    #[strum(serialize = "short")]
    Short,
    /// `i`
    #[strum(serialize = "int")]
    Int,
    /// `l`, 32bit even on 64bit targets
    #[strum(serialize = "long")]
    Long,
    /// `q`
    #[strum(serialize = "long long")]
    LongLong,
    /// `t`
    #[strum(serialize = "__int128")]
    Int128,
    /// `C`
    #[strum(serialize = "unsigned char")]
    UnsignedChar,
    /// `S`
    #[strum(serialize = "unsigned short")]
    UnsignedShort,
    /// `I`
    #[strum(serialize = "unsigned int")]
    UnsignedInt,
    /// `L`
    #[strum(serialize = "unsigned long")]
    UnsignedLong,
    /// `Q`
    #[strum(serialize = "unsigned long long")]
    UnsignedLongLong,
    /// `T`
    #[strum(serialize = "unsigned __int128")]
    UnsignedInt128,
    /// `f`
    #[strum(serialize = "float")]
    Float,
    /// `d`
    #[strum(serialize = "double")]
    Double,
    /// `D`
    #[strum(serialize = "long double")]
    LongDouble,
    /// `B`
    #[strum(serialize = "_Bool")]
    Bool,
    /// `*`
    #[strum(serialize = "char *")]
    CString,
    /// `#`
    #[strum(serialize = "Class")]
    Class,
    /// `:`
    #[strum(serialize = "SEL")]
    Selector,
    /// `%`
    #[strum(serialize = "NXAtom")]
    Atom,
    /// `?`, a type the compiler could not encode
    #[strum(serialize = "void /* unknown type */")]
    Unknown,
}

impl Primitive {
    /// The encoding character of this primitive
    #[must_use]
    pub fn code(self) -> char {
        match self {
            Primitive::Void => 'v',
            Primitive::Char => 'c',
            Primitive::Short => 's',
            Primitive::Int => 'i',
            Primitive::Long => 'l',
            Primitive::LongLong => 'q',
            Primitive::Int128 => 't',
            Primitive::UnsignedChar => 'C',
            Primitive::UnsignedShort => 'S',
            Primitive::UnsignedInt => 'I',
            Primitive::UnsignedLong => 'L',
            Primitive::UnsignedLongLong => 'Q',
            Primitive::UnsignedInt128 => 'T',
            Primitive::Float => 'f',
            Primitive::Double => 'd',
            Primitive::LongDouble => 'D',
            Primitive::Bool => 'B',
            Primitive::CString => '*',
            Primitive::Class => '#',
            Primitive::Selector => ':',
            Primitive::Atom => '%',
            Primitive::Unknown => '?',
        }
    }

    /// The primitive for an encoding character
    #[must_use]
    pub fn from_code(code: char) -> Option<Primitive> {
        Primitive::iter().find(|primitive| primitive.code() == code)
    }

    /// The C spelling of this primitive
    #[must_use]
    pub fn c_name(self) -> &'static str {
        self.into()
    }
}

bitflags! {
    /// Type qualifiers prefixing an encoded type.
    ///
    /// The declaration order of the flags is the canonical emission order.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Qualifiers: u16 {
        /// `r`
        const CONST = 0x0001;
        /// `n`
        const IN = 0x0002;
        /// `N`
        const INOUT = 0x0004;
        /// `o`
        const OUT = 0x0008;
        /// `O`
        const BYCOPY = 0x0010;
        /// `R`
        const BYREF = 0x0020;
        /// `V`
        const ONEWAY = 0x0040;
        /// `A`
        const ATOMIC = 0x0080;
        /// `j`
        const COMPLEX = 0x0100;
    }
}

/// Encoding character and C keyword for every qualifier, in canonical order
const QUALIFIER_SPELLINGS: [(Qualifiers, char, &str); 9] = [
    (Qualifiers::CONST, 'r', "const"),
    (Qualifiers::IN, 'n', "in"),
    (Qualifiers::INOUT, 'N', "inout"),
    (Qualifiers::OUT, 'o', "out"),
    (Qualifiers::BYCOPY, 'O', "bycopy"),
    (Qualifiers::BYREF, 'R', "byref"),
    (Qualifiers::ONEWAY, 'V', "oneway"),
    (Qualifiers::ATOMIC, 'A', "_Atomic"),
    (Qualifiers::COMPLEX, 'j', "_Complex"),
];

impl Qualifiers {
    /// The qualifier for an encoding character
    #[must_use]
    pub fn from_code(code: char) -> Option<Qualifiers> {
        QUALIFIER_SPELLINGS
            .iter()
            .find(|(_, c, _)| *c == code)
            .map(|(flag, _, _)| *flag)
    }

    /// Encoding characters of the set, in canonical order
    #[must_use]
    pub fn codes(self) -> String {
        QUALIFIER_SPELLINGS
            .iter()
            .filter(|(flag, _, _)| self.contains(*flag))
            .map(|(_, code, _)| *code)
            .collect()
    }

    /// Keywords of the set, in canonical order, separated by spaces
    #[must_use]
    pub fn keywords(self) -> String {
        QUALIFIER_SPELLINGS
            .iter()
            .filter(|(flag, _, _)| self.contains(*flag))
            .map(|(_, _, keyword)| *keyword)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// An object type: `id`, optionally narrowed to a class and/or a protocol list
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ObjectType {
    /// Class name, `None` for a plain `id`
    pub class_name: Option<String>,
    /// Adopted protocol names, in encoding order
    pub protocols: Vec<String>,
}

/// Decoded shape of a block literal
#[derive(Debug, Clone, PartialEq)]
pub struct BlockSignature {
    /// The block's return type
    pub return_type: Box<Type>,
    /// Parameter types, excluding the implicit block literal parameter
    pub parameters: Vec<Type>,
}

/// A structure or union member
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    /// Field name, if the encoding carried one
    pub name: Option<String>,
    /// Field type
    pub ty: Type,
}

impl Member {
    /// Create a member from an optional name and a type
    pub fn new(name: Option<&str>, ty: Type) -> Self {
        Member {
            name: name.map(ToString::to_string),
            ty,
        }
    }
}

/// The body of a struct or union
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Composite {
    /// Tag name, `None` for anonymous structures
    pub name: Option<String>,
    /// Members in declaration order. Empty for forward references such as `^{Foo}`.
    pub members: Vec<Member>,
}

impl Composite {
    /// Returns true for a tag-only reference without member list
    #[must_use]
    pub fn is_forward_reference(&self) -> bool {
        self.members.is_empty()
    }
}

/// Discriminates struct from union where both share a representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum CompositeKind {
    /// `{...}`
    #[strum(serialize = "struct")]
    Struct,
    /// `(...)`
    #[strum(serialize = "union")]
    Union,
}

/// A decoded type encoding
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    /// A scalar type
    Primitive(Primitive),
    /// `@`, `@"NSString"`, `@"<NSCopying>"`
    Id(ObjectType),
    /// `^type`
    Pointer(Box<Type>),
    /// `[Ntype]`
    Array {
        /// The element type
        element: Box<Type>,
        /// Number of elements
        count: u64,
    },
    /// `{name=members}`
    Struct(Composite),
    /// `(name=members)`
    Union(Composite),
    /// `bN`, only valid as a member
    Bitfield(u32),
    /// `@?` or `@?<...>`, `None` when the block's shape was not encoded
    Block(Option<BlockSignature>),
    /// `^?`, a function pointer of unknown shape
    FunctionPointer,
    /// Qualifier prefixes around another type
    Modified {
        /// The qualifier set
        qualifiers: Qualifiers,
        /// The qualified type
        inner: Box<Type>,
    },
}

impl Type {
    /// Wrap `inner` in a qualifier set, folding directly nested qualifier sets into one
    #[must_use]
    pub fn modified(qualifiers: Qualifiers, inner: Type) -> Type {
        match inner {
            Type::Modified {
                qualifiers: nested,
                inner,
            } => Type::Modified {
                qualifiers: qualifiers | nested,
                inner,
            },
            inner => Type::Modified {
                qualifiers,
                inner: Box::new(inner),
            },
        }
    }

    /// The composite body and its kind, for structs and unions
    #[must_use]
    pub fn composite(&self) -> Option<(CompositeKind, &Composite)> {
        match self {
            Type::Struct(body) => Some((CompositeKind::Struct, body)),
            Type::Union(body) => Some((CompositeKind::Union, body)),
            _ => None,
        }
    }

    fn composite_mut(&mut self) -> Option<&mut Composite> {
        match self {
            Type::Struct(body) | Type::Union(body) => Some(body),
            _ => None,
        }
    }

    /// Maximum nesting of struct, union, array and pointer nodes
    #[must_use]
    pub fn structure_depth(&self) -> usize {
        ensure_sufficient_stack(|| match self {
            Type::Pointer(inner) => 1 + inner.structure_depth(),
            Type::Array { element, .. } => 1 + element.structure_depth(),
            Type::Struct(body) | Type::Union(body) => {
                1 + body
                    .members
                    .iter()
                    .map(|member| member.ty.structure_depth())
                    .max()
                    .unwrap_or(0)
            }
            Type::Modified { inner, .. } => inner.structure_depth(),
            _ => 0,
        })
    }

    /// Give every unnamed struct/union member a positional name (`field0`, `field1`, ...).
    ///
    /// Already named members are never renamed, so running this twice is a no-op.
    pub fn generate_member_names(&mut self) {
        ensure_sufficient_stack(|| match self {
            Type::Struct(body) | Type::Union(body) => {
                for (index, member) in body.members.iter_mut().enumerate() {
                    if member.name.is_none() {
                        member.name = Some(format!("field{}", index));
                    }
                    member.ty.generate_member_names();
                }
            }
            Type::Pointer(inner) | Type::Modified { inner, .. } => inner.generate_member_names(),
            Type::Array { element, .. } => element.generate_member_names(),
            Type::Block(Some(signature)) => {
                signature.return_type.generate_member_names();
                for parameter in &mut signature.parameters {
                    parameter.generate_member_names();
                }
            }
            _ => {}
        });
    }

    /// Returns true if both types have the same shape.
    ///
    /// Shapes agree when every node matches except for struct/union member names, which
    /// may differ or be absent on either side. Structs and unions must carry the same tag
    /// (or both be anonymous) and the same number of members.
    #[must_use]
    pub fn can_merge_with(&self, other: &Type) -> bool {
        self.can_merge_with_by(other, &|_, _| false)
    }

    /// Like [`Type::can_merge_with`], but nested structs and unions that `equivalent`
    /// declares identical are accepted without comparing their bodies.
    ///
    /// The top-level node is always compared structurally.
    pub fn can_merge_with_by<F>(&self, other: &Type, equivalent: &F) -> bool
    where
        F: Fn(&Type, &Type) -> bool,
    {
        ensure_sufficient_stack(|| match (self, other) {
            (Type::Primitive(a), Type::Primitive(b)) => a == b,
            (Type::Id(a), Type::Id(b)) => a == b,
            (Type::Pointer(a), Type::Pointer(b)) => a.nested_merge(b, equivalent),
            (
                Type::Array {
                    element: a,
                    count: count_a,
                },
                Type::Array {
                    element: b,
                    count: count_b,
                },
            ) => count_a == count_b && a.nested_merge(b, equivalent),
            (Type::Struct(a), Type::Struct(b)) | (Type::Union(a), Type::Union(b)) => {
                a.name == b.name
                    && a.members.len() == b.members.len()
                    && a.members
                        .iter()
                        .zip(&b.members)
                        .all(|(x, y)| x.ty.nested_merge(&y.ty, equivalent))
            }
            (Type::Bitfield(a), Type::Bitfield(b)) => a == b,
            (Type::Block(a), Type::Block(b)) => match (a, b) {
                (None, None) => true,
                (Some(a), Some(b)) => {
                    a.parameters.len() == b.parameters.len()
                        && a.return_type.nested_merge(&b.return_type, equivalent)
                        && a.parameters
                            .iter()
                            .zip(&b.parameters)
                            .all(|(x, y)| x.nested_merge(y, equivalent))
                }
                _ => false,
            },
            (Type::FunctionPointer, Type::FunctionPointer) => true,
            (
                Type::Modified {
                    qualifiers: qa,
                    inner: a,
                },
                Type::Modified {
                    qualifiers: qb,
                    inner: b,
                },
            ) => qa == qb && a.nested_merge(b, equivalent),
            _ => false,
        })
    }

    fn nested_merge<F>(&self, other: &Type, equivalent: &F) -> bool
    where
        F: Fn(&Type, &Type) -> bool,
    {
        if self.composite().is_some() && other.composite().is_some() && equivalent(self, other) {
            return true;
        }
        self.can_merge_with_by(other, equivalent)
    }

    /// Merge `other` into `self`, filling in member names that `self` lacks.
    ///
    /// Where both sides name a member, the name on `self` wins.
    ///
    /// # Errors
    /// Returns [`crate::Error::InternalInconsistency`] if the shapes are not mergeable.
    /// Callers are expected to check [`Type::can_merge_with`] first.
    pub fn merge_with(&mut self, other: &Type) -> Result<()> {
        self.merge_with_by(other, &|_, _| false)
    }

    /// Merge `other` into `self` under the same equivalence used by [`Type::can_merge_with_by`].
    ///
    /// Nested structs/unions accepted only through `equivalent` are not merged member by
    /// member; the side with a member list replaces a bare forward reference.
    ///
    /// # Errors
    /// Returns [`crate::Error::InternalInconsistency`] if the shapes are not mergeable.
    pub fn merge_with_by<F>(&mut self, other: &Type, equivalent: &F) -> Result<()>
    where
        F: Fn(&Type, &Type) -> bool,
    {
        if !self.can_merge_with_by(other, equivalent) {
            return Err(inconsistency!(
                "cannot merge {} with {}",
                crate::encoding::encode(self),
                crate::encoding::encode(other)
            ));
        }
        self.merge_unchecked(other, equivalent);
        Ok(())
    }

    fn merge_unchecked<F>(&mut self, other: &Type, equivalent: &F)
    where
        F: Fn(&Type, &Type) -> bool,
    {
        ensure_sufficient_stack(|| match (self, other) {
            (Type::Pointer(a), Type::Pointer(b)) => a.merge_nested(b, equivalent),
            (Type::Array { element: a, .. }, Type::Array { element: b, .. }) => {
                a.merge_nested(b, equivalent);
            }
            (Type::Struct(a), Type::Struct(b)) | (Type::Union(a), Type::Union(b)) => {
                for (mine, theirs) in a.members.iter_mut().zip(&b.members) {
                    if mine.name.is_none() {
                        mine.name.clone_from(&theirs.name);
                    }
                    mine.ty.merge_nested(&theirs.ty, equivalent);
                }
            }
            (Type::Block(Some(a)), Type::Block(Some(b))) => {
                a.return_type.merge_nested(&b.return_type, equivalent);
                for (mine, theirs) in a.parameters.iter_mut().zip(&b.parameters) {
                    mine.merge_nested(theirs, equivalent);
                }
            }
            (Type::Modified { inner: a, .. }, Type::Modified { inner: b, .. }) => {
                a.merge_nested(b, equivalent);
            }
            _ => {}
        });
    }

    fn merge_nested<F>(&mut self, other: &Type, equivalent: &F)
    where
        F: Fn(&Type, &Type) -> bool,
    {
        if self.can_merge_with_by(other, equivalent) {
            self.merge_unchecked(other, equivalent);
            return;
        }

        // Accepted only through the equivalence: prefer the side carrying a definition
        let replace = match (self.composite_mut(), other.composite()) {
            (Some(mine), Some((_, theirs))) => {
                mine.is_forward_reference() && !theirs.is_forward_reference()
            }
            _ => false,
        };
        if replace {
            *self = other.clone();
        }
    }

    /// Returns true if `predicate` holds for this node or any node below it
    pub fn contains<F>(&self, predicate: &F) -> bool
    where
        F: Fn(&Type) -> bool,
    {
        if predicate(self) {
            return true;
        }
        ensure_sufficient_stack(|| match self {
            Type::Struct(body) | Type::Union(body) => {
                body.members.iter().any(|member| member.ty.contains(predicate))
            }
            Type::Pointer(inner) | Type::Modified { inner, .. } => inner.contains(predicate),
            Type::Array { element, .. } => element.contains(predicate),
            Type::Block(Some(signature)) => {
                signature.return_type.contains(predicate)
                    || signature
                        .parameters
                        .iter()
                        .any(|parameter| parameter.contains(predicate))
            }
            _ => false,
        })
    }

    /// Visit every struct/union node, outermost first, in encoding order.
    ///
    /// The callback receives the node and whether it was reached without passing
    /// through another struct or union.
    pub fn for_each_composite<F>(&self, f: &mut F)
    where
        F: FnMut(&Type, bool),
    {
        self.walk_composites(true, f);
    }

    fn walk_composites<F>(&self, direct: bool, f: &mut F)
    where
        F: FnMut(&Type, bool),
    {
        ensure_sufficient_stack(|| match self {
            Type::Struct(body) | Type::Union(body) => {
                f(self, direct);
                for member in &body.members {
                    member.ty.walk_composites(false, f);
                }
            }
            Type::Pointer(inner) | Type::Modified { inner, .. } => {
                inner.walk_composites(direct, f);
            }
            Type::Array { element, .. } => element.walk_composites(direct, f),
            Type::Block(Some(signature)) => {
                signature.return_type.walk_composites(direct, f);
                for parameter in &signature.parameters {
                    parameter.walk_composites(direct, f);
                }
            }
            _ => {}
        });
    }
}

/// One entry of a method signature: a type plus its recorded stack offset
#[derive(Debug, Clone, PartialEq)]
pub struct MethodType {
    /// The decoded type
    pub ty: Type,
    /// The digit run following the type, kept verbatim
    pub offset: Option<String>,
}

/// A decoded method type encoding such as `v24@0:8i16`
#[derive(Debug, Clone, PartialEq)]
pub struct MethodSignature {
    /// The return type
    pub return_type: MethodType,
    /// All runtime parameters, including the receiver and selector
    pub parameters: Vec<MethodType>,
}

impl MethodSignature {
    /// Parameters as written in source, without the implicit `self` and `_cmd`
    pub fn arguments(&self) -> impl Iterator<Item = &MethodType> {
        self.parameters.iter().skip(2)
    }

    /// Every type of the signature, return type first
    pub fn types(&self) -> impl Iterator<Item = &Type> {
        std::iter::once(&self.return_type.ty).chain(self.parameters.iter().map(|p| &p.ty))
    }
}
