//! Rollback must restore the registry exactly, for every kind of registration.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use quarto_cite_registry::{
    ActionKind, Entry, EntryKey, RawInvocation, ReferenceRegistry, RegistrationContext,
};

const NAMES: [&str; 4] = ["a", "b", "c", "d"];
const GROUPS: [&str; 2] = ["", "notes"];

/// Everything rollback has to restore: entries (in order) and group counters.
#[derive(Debug, PartialEq)]
struct GroupSnapshot {
    group: String,
    entries: Vec<Entry>,
    numbers_claimed: u32,
    continuations: Vec<(String, u32)>,
}

fn snapshot(registry: &ReferenceRegistry) -> Vec<GroupSnapshot> {
    registry
        .groups()
        .into_iter()
        .map(|group| GroupSnapshot {
            group: group.to_string(),
            entries: registry
                .group_entries(group)
                .map(|entries| entries.values().cloned().collect())
                .unwrap_or_default(),
            numbers_claimed: registry.numbers_claimed(group),
            continuations: NAMES
                .iter()
                .map(|name| (name.to_string(), registry.continuation_count(group, name)))
                .filter(|(_, count)| *count > 0)
                .collect(),
        })
        .collect()
}

fn invocation(label: &str) -> RawInvocation {
    RawInvocation {
        content: Some(label.to_string()),
        args: vec![("id".to_string(), label.to_string())],
    }
}

fn cite(registry: &mut ReferenceRegistry, name: Option<&str>, content: Option<&str>) -> EntryKey {
    let key = registry.register(
        "",
        name,
        RegistrationContext::Standalone,
        invocation(name.unwrap_or("anonymous")),
    );
    if let Some(content) = content {
        registry.set_content("", &key, content).unwrap();
    }
    key
}

fn last_kind(registry: &ReferenceRegistry) -> Option<ActionKind> {
    registry.log().iter().last().map(|action| action.kind)
}

#[test]
fn test_rollback_new_into_empty_registry() {
    let mut registry = ReferenceRegistry::new();
    cite(&mut registry, Some("a"), Some("text"));
    assert_eq!(last_kind(&registry), Some(ActionKind::New));

    registry.rollback(1).unwrap();
    assert!(registry.is_empty());
    assert!(registry.groups().is_empty());
    assert_eq!(registry.numbers_claimed(""), 0);
}

#[test]
fn test_rollback_new_releases_number_and_sequence() {
    let mut registry = ReferenceRegistry::new();
    cite(&mut registry, Some("a"), None);
    let before = snapshot(&registry);

    cite(&mut registry, Some("b"), None);
    registry.rollback(1).unwrap();
    assert_eq!(snapshot(&registry), before);

    let c = cite(&mut registry, Some("c"), None);
    let c = registry.entry("", &c).unwrap();
    assert_eq!((c.number, c.sequence_key), (2, 2));
}

#[test]
fn test_rollback_new_from_placeholder() {
    let mut registry = ReferenceRegistry::new();
    let child = cite(&mut registry, Some("b"), Some("Page 3."));
    registry.set_extends("", &child, "a").unwrap();
    let before = snapshot(&registry);

    cite(&mut registry, Some("a"), Some("Smith."));
    assert_eq!(last_kind(&registry), Some(ActionKind::NewFromPlaceholder));

    registry.rollback(1).unwrap();
    assert_eq!(snapshot(&registry), before);
    let placeholder = registry.entry("", &EntryKey::Named("a".into())).unwrap();
    assert!(placeholder.is_placeholder);
    assert_eq!(placeholder.occurrence_count, 0);
}

#[test]
fn test_rollback_assign() {
    let mut registry = ReferenceRegistry::new();
    cite(&mut registry, Some("a"), None);
    let before = snapshot(&registry);

    cite(&mut registry, Some("a"), Some("late body"));
    assert_eq!(last_kind(&registry), Some(ActionKind::Assign));

    registry.rollback(1).unwrap();
    assert_eq!(snapshot(&registry), before);
}

#[test]
fn test_rollback_increment() {
    let mut registry = ReferenceRegistry::new();
    cite(&mut registry, Some("a"), Some("body"));
    let before = snapshot(&registry);

    cite(&mut registry, Some("a"), Some("body"));
    assert_eq!(last_kind(&registry), Some(ActionKind::Increment));

    registry.rollback(1).unwrap();
    assert_eq!(snapshot(&registry), before);
}

#[test]
fn test_rollback_definition_increment_keeps_count() {
    let mut registry = ReferenceRegistry::new();
    cite(&mut registry, Some("a"), None);
    let before = snapshot(&registry);

    registry.register(
        "",
        Some("a"),
        RegistrationContext::InList,
        RawInvocation::default(),
    );
    registry.rollback(1).unwrap();
    assert_eq!(snapshot(&registry), before);
}

#[test]
fn test_rollback_extends_with_placeholder_is_exact() {
    let mut registry = ReferenceRegistry::new();
    cite(&mut registry, Some("z"), Some("other"));
    let before = snapshot(&registry);

    let child = cite(&mut registry, Some("b"), Some("Page 3."));
    registry.set_extends("", &child, "a").unwrap();
    assert_eq!(registry.continuation_count("", "a"), 1);

    registry.rollback(1).unwrap();
    assert_eq!(snapshot(&registry), before);
    assert_eq!(registry.continuation_count("", "a"), 0);
    assert!(registry.entry("", &EntryKey::Named("a".into())).is_none());

    // Sequence keys used by the child and the placeholder are free again.
    let next = cite(&mut registry, Some("y"), None);
    assert_eq!(registry.entry("", &next).unwrap().sequence_key, 2);
}

#[test]
fn test_rollback_extends_known_parent_is_exact() {
    let mut registry = ReferenceRegistry::new();
    cite(&mut registry, Some("a"), Some("Smith."));
    let before = snapshot(&registry);

    let child = cite(&mut registry, Some("b"), Some("Page 3."));
    registry.set_extends("", &child, "a").unwrap();
    assert_eq!(registry.numbers_claimed(""), 1);
    let linked = registry.log().iter().last().and_then(|action| action.parent_name());
    assert_eq!(linked, Some("a"));

    registry.rollback(1).unwrap();
    assert_eq!(snapshot(&registry), before);
}

#[test]
fn test_rollback_append() {
    let mut registry = ReferenceRegistry::new();
    cite(&mut registry, Some("a"), Some("Smith."));
    let before = snapshot(&registry);

    registry
        .append_content(
            "",
            "a",
            "Continued.",
            RegistrationContext::Standalone,
            invocation("follow"),
        )
        .unwrap();
    let replay = registry.rollback(1).unwrap();
    assert_eq!(snapshot(&registry), before);
    assert_eq!(replay, vec![invocation("follow")]);
}

#[test]
fn test_rollback_returns_chronological_order_and_clears_log() {
    let mut registry = ReferenceRegistry::new();
    for name in ["a", "b", "c", "d"] {
        cite(&mut registry, Some(name), None);
    }

    let replay = registry.rollback(2).unwrap();
    assert_eq!(replay, vec![invocation("c"), invocation("d")]);
    assert!(registry.log().is_empty());
    assert_eq!(registry.len(), 2);

    // The rest of the log is gone: nothing more can be undone.
    assert!(registry.rollback(5).unwrap().is_empty());
    assert_eq!(registry.len(), 2);
}

#[test]
fn test_rollback_more_than_logged() {
    let mut registry = ReferenceRegistry::new();
    cite(&mut registry, Some("a"), None);
    assert_eq!(registry.rollback(10).unwrap().len(), 1);
    assert!(registry.is_empty());
}

#[derive(Debug, Clone)]
struct Op {
    group: usize,
    name: Option<usize>,
    in_list: bool,
    content: Option<u8>,
    extends: Option<usize>,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    (
        0..GROUPS.len(),
        proptest::option::of(0..NAMES.len()),
        any::<bool>(),
        proptest::option::weighted(0.7, 0u8..3),
        proptest::option::weighted(0.25, 0..NAMES.len()),
    )
        .prop_map(|(group, name, in_list, content, extends)| Op {
            group,
            name,
            in_list,
            content,
            extends,
        })
}

fn apply(registry: &mut ReferenceRegistry, op: &Op, index: usize) {
    let group = GROUPS[op.group];
    let context = if op.in_list {
        RegistrationContext::InList
    } else {
        RegistrationContext::Standalone
    };
    let key = registry.register(
        group,
        op.name.map(|n| NAMES[n]),
        context,
        invocation(&index.to_string()),
    );
    if let Some(content) = op.content {
        registry
            .set_content(group, &key, &format!("body {}", content))
            .unwrap();
    }
    if let Some(parent) = op.extends {
        registry.set_extends(group, &key, NAMES[parent]).unwrap();
    }
}

proptest! {
    #[test]
    fn prop_rollback_then_replay_is_exact(
        ops in proptest::collection::vec(op_strategy(), 1..24),
        undo in 0usize..30,
    ) {
        let mut registry = ReferenceRegistry::new();
        for (index, op) in ops.iter().enumerate() {
            apply(&mut registry, op, index);
        }
        let full = snapshot(&registry);

        let replay = registry.rollback(undo).unwrap();
        let kept = ops.len() - replay.len();

        let mut prefix = ReferenceRegistry::new();
        for (index, op) in ops[..kept].iter().enumerate() {
            apply(&mut prefix, op, index);
        }
        prop_assert_eq!(snapshot(&registry), snapshot(&prefix));

        let expected: Vec<RawInvocation> = (kept..ops.len())
            .map(|index| invocation(&index.to_string()))
            .collect();
        prop_assert_eq!(&replay, &expected);

        for index in kept..ops.len() {
            apply(&mut registry, &ops[index], index);
        }
        prop_assert_eq!(snapshot(&registry), full);
    }
}
