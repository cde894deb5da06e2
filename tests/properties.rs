//! Property-based tests for the encoding language and the structure registry.
//!
//! These tests use proptest to generate random canonical encodings and verify:
//! 1. Idempotence: parsing the same encoding twice yields the same type
//! 2. Round trip: canonical encodings survive `parse` followed by `encode`
//! 3. Merge symmetry: shape compatibility does not depend on argument order
//! 4. Naming: `generate_member_names` is a no-op the second time
//! 5. Merging: mergeability is transitive, also across object members, and a merged
//!    type stays mergeable with everything its parts were mergeable with

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]

use classdump::prelude::*;
use proptest::prelude::*;

// -- Encoding Generation Strategies --

/// A scalar encoding character.
fn primitive_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec![
        "c", "s", "i", "l", "q", "C", "S", "I", "L", "Q", "f", "d", "D", "B", "*", "#", ":",
    ])
    .prop_map(String::from)
}

/// A structure tag, or `?` for anonymous structures.
fn tag_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        1 => Just("?".to_string()),
        3 => prop::string::string_regex("[A-Z][A-Za-z0-9_]{0,8}").expect("valid regex"),
    ]
}

/// A member name.
fn member_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9]{0,6}").expect("valid regex")
}

/// A structure tagged `S` whose members mix plain `id`, named objects and scalars.
///
/// A member right after an object member never carries a name, since a quoted name
/// there would read as the object's class.
fn object_struct_strategy() -> impl Strategy<Value = String> {
    let member = prop::sample::select(vec!["i", "d", "@", "@\"NSString\"", "@\"NSArray\""]);
    prop::collection::vec((member, prop::option::of(member_name_strategy())), 1..4).prop_map(
        |members| {
            let mut out = String::from("{S=");
            let mut after_object = false;
            for (member, name) in members {
                if let Some(name) = name.filter(|_| !after_object) {
                    out.push_str(&format!("\"{}\"", name));
                }
                out.push_str(member);
                after_object = member.starts_with('@');
            }
            out.push('}');
            out
        },
    )
}

/// A canonical encoding that is valid both standalone and as a structure member.
///
/// Objects are left out of these structure bodies, where a quoted class name followed by
/// a quoted member name does not survive a round trip. `object_struct_strategy` covers
/// them.
fn member_encoding_strategy() -> impl Strategy<Value = String> {
    primitive_strategy().prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            inner.clone().prop_map(|ty| format!("^{}", ty)),
            (1u64..16, inner.clone()).prop_map(|(count, ty)| format!("[{}{}]", count, ty)),
            (
                tag_strategy(),
                prop::collection::vec(inner.clone(), 1..4),
                any::<bool>()
            )
                .prop_map(|(tag, members, named)| composite('{', '}', &tag, &members, named)),
            (tag_strategy(), prop::collection::vec(inner, 1..3))
                .prop_map(|(tag, members)| composite('(', ')', &tag, &members, false)),
        ]
    })
}

/// Any canonical top-level encoding.
fn encoding_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => member_encoding_strategy(),
        1 => Just("@".to_string()),
        1 => prop::string::string_regex("[A-Z][A-Za-z]{1,10}")
            .expect("valid regex")
            .prop_map(|class| format!("@\"{}\"", class)),
        1 => Just("@?".to_string()),
        1 => Just("^?".to_string()),
        1 => prop::string::string_regex("[A-Z][A-Za-z]{1,10}")
            .expect("valid regex")
            .prop_map(|tag| format!("^{{{}}}", tag)),
    ]
}

fn composite(open: char, close: char, tag: &str, members: &[String], named: bool) -> String {
    let mut out = String::new();
    out.push(open);
    out.push_str(tag);
    out.push('=');
    for (index, member) in members.iter().enumerate() {
        if named {
            out.push_str(&format!("\"m{}\"", index));
        }
        out.push_str(member);
    }
    out.push(close);
    out
}

/// Strip every member name from a type.
fn strip_names(ty: &mut Type) {
    match ty {
        Type::Struct(body) | Type::Union(body) => {
            for member in &mut body.members {
                member.name = None;
                strip_names(&mut member.ty);
            }
        }
        Type::Pointer(inner) => strip_names(inner),
        Type::Array { element, .. } => strip_names(element),
        _ => {}
    }
}

// -- Property Tests --

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn parse_is_idempotent(encoding in encoding_strategy()) {
        let first = parse_type(&encoding).unwrap();
        let second = parse_type(&encoding).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn canonical_encoding_round_trips(encoding in encoding_strategy()) {
        let ty = parse_type(&encoding).unwrap();
        prop_assert_eq!(encode(&ty), encoding.clone());

        let reparsed = parse_type(&encode(&ty)).unwrap();
        prop_assert_eq!(reparsed, ty);
    }

    #[test]
    fn merge_check_is_symmetric(
        left in encoding_strategy(),
        right in encoding_strategy(),
    ) {
        let left = parse_type(&left).unwrap();
        let right = parse_type(&right).unwrap();
        prop_assert_eq!(left.can_merge_with(&right), right.can_merge_with(&left));
    }

    #[test]
    fn names_do_not_affect_mergeability(encoding in member_encoding_strategy()) {
        let named = parse_type(&encoding).unwrap();
        let mut unnamed = named.clone();
        strip_names(&mut unnamed);

        prop_assert!(named.can_merge_with(&unnamed));
        prop_assert!(unnamed.can_merge_with(&named));

        // Merging fills in the missing names from the other side
        let mut merged = unnamed.clone();
        merged.merge_with(&named).unwrap();
        prop_assert_eq!(&merged, &named);

        let mut kept = named.clone();
        kept.merge_with(&unnamed).unwrap();
        prop_assert_eq!(&kept, &named);
    }

    #[test]
    fn generate_member_names_is_idempotent(encoding in member_encoding_strategy()) {
        let mut once = parse_type(&encoding).unwrap();
        once.generate_member_names();
        let mut twice = once.clone();
        twice.generate_member_names();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn registry_never_keeps_mergeable_entries(
        encodings in prop::collection::vec(member_encoding_strategy(), 1..8),
    ) {
        let mut registry = StructureRegistry::new();
        for encoding in &encodings {
            registry.register(&parse_type(encoding).unwrap(), Usage::Ivar).unwrap();
        }
        let registry = registry.dedup().unwrap().merge().unwrap().freeze().unwrap();

        let entries = registry.entries();
        for (i, a) in entries.iter().enumerate() {
            for b in &entries[i + 1..] {
                prop_assert!(!a.ty.can_merge_with(&b.ty), "{} / {}", a.name, b.name);
            }
        }
    }

    #[test]
    fn object_members_do_not_affect_name_independence(encoding in object_struct_strategy()) {
        let named = parse_type(&encoding).unwrap();
        let mut unnamed = named.clone();
        strip_names(&mut unnamed);
        prop_assert!(named.can_merge_with(&unnamed));
    }

    #[test]
    fn merge_check_is_transitive(
        a in object_struct_strategy(),
        b in object_struct_strategy(),
        c in object_struct_strategy(),
    ) {
        let a = parse_type(&a).unwrap();
        let b = parse_type(&b).unwrap();
        let c = parse_type(&c).unwrap();
        if a.can_merge_with(&b) && b.can_merge_with(&c) {
            prop_assert!(a.can_merge_with(&c), "{} / {}", encode(&a), encode(&c));
        }
    }

    #[test]
    fn merged_type_keeps_mergeability(
        a in object_struct_strategy(),
        b in object_struct_strategy(),
        c in object_struct_strategy(),
    ) {
        let a = parse_type(&a).unwrap();
        let b = parse_type(&b).unwrap();
        let c = parse_type(&c).unwrap();
        prop_assume!(a.can_merge_with(&b));

        let mut merged = a.clone();
        merged.merge_with(&b).unwrap();
        prop_assert_eq!(merged.can_merge_with(&c), a.can_merge_with(&c));
        prop_assert_eq!(merged.can_merge_with(&c), b.can_merge_with(&c));
    }

    #[test]
    fn registry_keeps_distinct_object_structures_apart(
        encodings in prop::collection::vec(object_struct_strategy(), 1..8),
    ) {
        let mut registry = StructureRegistry::new();
        for encoding in &encodings {
            registry.register(&parse_type(encoding).unwrap(), Usage::Ivar).unwrap();
        }
        let registry = registry.dedup().unwrap().merge().unwrap().freeze().unwrap();

        let entries = registry.entries();
        for (i, a) in entries.iter().enumerate() {
            for b in &entries[i + 1..] {
                prop_assert!(!a.ty.can_merge_with(&b.ty), "{} / {}", a.name, b.name);
            }
        }
        // Every registered shape still finds exactly one entry
        for encoding in &encodings {
            let ty = parse_type(encoding).unwrap();
            prop_assert_eq!(
                entries.iter().filter(|entry| entry.ty.can_merge_with(&ty)).count(),
                1
            );
        }
    }
}
