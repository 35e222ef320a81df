//! Numbering, continuation and group lifecycle behavior of the registry.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use quarto_cite_registry::{
    EntryKey, RawInvocation, ReferenceRegistry, RegistrationContext, Warning, validator,
};

fn named(name: &str) -> EntryKey {
    EntryKey::Named(name.to_string())
}

fn cite(registry: &mut ReferenceRegistry, group: &str, name: Option<&str>) -> EntryKey {
    registry.register(
        group,
        name,
        RegistrationContext::Standalone,
        RawInvocation::default(),
    )
}

#[test]
fn test_same_name_twice_then_anonymous() {
    let mut registry = ReferenceRegistry::new();
    cite(&mut registry, "", Some("a"));
    cite(&mut registry, "", Some("a"));
    let anon = cite(&mut registry, "", None);

    let a = registry.entry("", &named("a")).unwrap();
    assert_eq!(a.number, 1);
    assert_eq!(a.occurrence_count, 2);
    assert_eq!(registry.entry("", &anon).unwrap().number, 2);
    assert_eq!(registry.group_entries("").unwrap().len(), 2);
}

#[test]
fn test_number_is_stable_across_repeats() {
    let mut registry = ReferenceRegistry::new();
    cite(&mut registry, "", Some("a"));
    let before = registry.entry("", &named("a")).unwrap().number;
    cite(&mut registry, "", Some("b"));
    cite(&mut registry, "", Some("a"));
    let after = registry.entry("", &named("a")).unwrap();
    assert_eq!(after.number, before);
    assert_eq!(after.occurrence_count, 2);
}

#[test]
fn test_groups_number_independently() {
    let mut registry = ReferenceRegistry::new();
    cite(&mut registry, "", Some("a"));
    cite(&mut registry, "notes", Some("a"));
    cite(&mut registry, "notes", Some("b"));
    cite(&mut registry, "", Some("c"));

    assert_eq!(registry.entry("notes", &named("b")).unwrap().number, 2);
    assert_eq!(registry.entry("", &named("c")).unwrap().number, 2);
    assert_eq!(registry.entry("notes", &named("a")).unwrap().number, 1);
}

#[test]
fn test_sequence_keys_are_global_and_increasing() {
    let mut registry = ReferenceRegistry::new();
    let keys = [
        cite(&mut registry, "", Some("a")),
        cite(&mut registry, "notes", Some("b")),
        cite(&mut registry, "", None),
    ];
    let groups = ["", "notes", ""];
    let seqs: Vec<u64> = keys
        .iter()
        .zip(groups)
        .map(|(key, group)| registry.entry(group, key).unwrap().sequence_key)
        .collect();
    assert_eq!(seqs, vec![1, 2, 3]);
}

#[test]
fn test_continuation_before_parent_uses_placeholder() {
    let mut registry = ReferenceRegistry::new();
    cite(&mut registry, "", Some("z"));
    let child = cite(&mut registry, "", Some("b"));
    registry.set_content("", &child, "Page 4.").unwrap();
    registry.set_extends("", &child, "a").unwrap();

    let placeholder = registry.entry("", &named("a")).unwrap();
    assert!(placeholder.is_placeholder);
    assert_eq!(placeholder.content, None);
    assert_eq!(placeholder.number, 2);

    let parent = cite(&mut registry, "", Some("a"));
    registry.set_content("", &parent, "Smith, 2020.").unwrap();

    let parent = registry.entry("", &named("a")).unwrap();
    let child = registry.entry("", &named("b")).unwrap();
    assert!(!parent.is_placeholder);
    assert_eq!(parent.number, 2);
    assert_eq!(parent.occurrence_count, 1);
    assert_eq!(child.number, 2);
    assert_eq!(child.parent_index, Some(1));
    assert_eq!(child.label(), "2.1");

    // The placeholder did not consume a number of its own.
    let next = cite(&mut registry, "", Some("c"));
    assert_eq!(registry.entry("", &next).unwrap().number, 3);
}

#[test]
fn test_continuations_share_parent_number() {
    let mut registry = ReferenceRegistry::new();
    cite(&mut registry, "", Some("a"));
    for name in ["b", "c"] {
        let key = cite(&mut registry, "", Some(name));
        registry.set_content("", &key, "more").unwrap();
        registry.set_extends("", &key, "a").unwrap();
    }
    let d = cite(&mut registry, "", Some("d"));

    let b = registry.entry("", &named("b")).unwrap();
    let c = registry.entry("", &named("c")).unwrap();
    assert_eq!((b.number, b.parent_index), (1, Some(1)));
    assert_eq!((c.number, c.parent_index), (1, Some(2)));
    assert_eq!(registry.entry("", &d).unwrap().number, 2);
    assert_eq!(registry.continuation_count("", "a"), 2);
}

#[test]
fn test_nested_continuation_is_flagged() {
    let mut registry = ReferenceRegistry::new();
    cite(&mut registry, "", Some("a"));
    let b = cite(&mut registry, "", Some("b"));
    registry.set_extends("", &b, "a").unwrap();

    assert_eq!(
        validator::check_nested_continuation(&registry, "", "b"),
        Some(Warning::NestedContinuation {
            parent: "b".to_string()
        })
    );
    assert_eq!(validator::check_nested_continuation(&registry, "", "a"), None);
}

#[test]
fn test_pop_group_returns_entries_and_forgets_group() {
    let mut registry = ReferenceRegistry::new();
    cite(&mut registry, "notes", Some("a"));
    cite(&mut registry, "notes", Some("b"));
    cite(&mut registry, "", Some("c"));

    let popped = registry.pop_group("notes");
    let numbers: Vec<(EntryKey, u32)> = popped
        .iter()
        .map(|(key, entry)| (key.clone(), entry.number))
        .collect();
    assert_eq!(numbers, vec![(named("a"), 1), (named("b"), 2)]);
    assert_eq!(registry.groups(), vec![""]);
    assert!(!registry.has_group("notes"));
    assert!(registry.log().is_empty());

    // Reopening the group starts numbering over.
    let again = cite(&mut registry, "notes", Some("d"));
    assert_eq!(registry.entry("notes", &again).unwrap().number, 1);
}

#[test]
fn test_pop_unknown_group_is_empty() {
    let mut registry = ReferenceRegistry::new();
    assert!(registry.pop_group("nothing").is_empty());
}

proptest! {
    #[test]
    fn prop_distinct_names_number_in_order(count in 1usize..40) {
        let mut registry = ReferenceRegistry::new();
        let names: Vec<String> = (0..count).map(|i| format!("ref{}", i)).collect();
        for name in &names {
            cite(&mut registry, "", Some(name));
        }
        let numbers: Vec<u32> = registry
            .group_entries("")
            .unwrap()
            .values()
            .map(|entry| entry.number)
            .collect();
        let expected: Vec<u32> = (1..=count as u32).collect();
        prop_assert_eq!(numbers, expected);
    }
}
