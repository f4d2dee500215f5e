use wbs_timeline::{Task, ViewKind, VisibilitySet, build_tree, flatten};

fn task(id: &str, parent: Option<&str>, order: i32) -> Task {
    let mut task = Task::new(id, "p1", format!("Task {id}")).with_order(order);
    task.parent_id = parent.map(ToOwned::to_owned);
    task
}

fn sample() -> Vec<Task> {
    vec![
        task("a", None, 0),
        task("a1", Some("a"), 0),
        task("a1x", Some("a1"), 0),
        task("a2", Some("a"), 1),
        task("b", None, 1),
    ]
}

fn flat_ids(tasks: &[Task], visibility: &VisibilitySet) -> Vec<String> {
    let forest = build_tree(tasks);
    flatten(&forest, visibility)
        .into_iter()
        .map(|n| n.task.id.clone())
        .collect()
}

#[test]
fn collapsed_forest_shows_only_roots() {
    assert_eq!(flat_ids(&sample(), &VisibilitySet::new()), vec!["a", "b"]);
}

#[test]
fn expanding_a_parent_reveals_only_direct_children() {
    let mut visibility = VisibilitySet::new();
    visibility.toggle("a");
    assert_eq!(flat_ids(&sample(), &visibility), vec!["a", "a1", "a2", "b"]);
}

#[test]
fn expanded_descendant_under_collapsed_ancestor_stays_hidden() {
    let mut visibility = VisibilitySet::new();
    visibility.toggle("a1");
    assert_eq!(flat_ids(&sample(), &visibility), vec!["a", "b"]);
}

#[test]
fn fully_expanded_is_preorder() {
    let forest = build_tree(&sample());
    let visibility = VisibilitySet::default_for(ViewKind::Timeline, &forest);
    let rows: Vec<(&str, usize)> = flatten(&forest, &visibility)
        .into_iter()
        .map(|n| (n.task.id.as_str(), n.level))
        .collect();
    assert_eq!(
        rows,
        vec![("a", 0), ("a1", 1), ("a1x", 2), ("a2", 1), ("b", 0)]
    );
}

#[test]
fn wbs_default_is_collapsed() {
    let forest = build_tree(&sample());
    assert!(VisibilitySet::default_for(ViewKind::Wbs, &forest).is_empty());
}

#[test]
fn toggle_flips_and_collapse_all_clears() {
    let mut visibility = VisibilitySet::new();
    assert!(visibility.toggle("a"));
    assert!(visibility.is_expanded("a"));
    assert!(!visibility.toggle("a"));
    assert!(!visibility.is_expanded("a"));

    visibility.expand_all(["a", "a1"]);
    assert_eq!(visibility.len(), 2);
    visibility.expand_all(["b"]);
    assert!(!visibility.is_expanded("a"));
    assert!(visibility.is_expanded("b"));

    visibility.collapse_all();
    assert!(visibility.is_empty());
}

#[test]
fn expanded_leaf_emits_nothing_extra() {
    let mut visibility = VisibilitySet::new();
    visibility.toggle("b");
    assert_eq!(flat_ids(&sample(), &visibility), vec!["a", "b"]);
}

#[test]
fn flatten_orders_siblings_by_rank_regardless_of_input() {
    let tasks = vec![
        task("parent", None, 0),
        task("rank2", Some("parent"), 2),
        task("rank0", Some("parent"), 0),
        task("rank1", Some("parent"), 1),
    ];
    let mut visibility = VisibilitySet::new();
    visibility.toggle("parent");
    assert_eq!(
        flat_ids(&tasks, &visibility),
        vec!["parent", "rank0", "rank1", "rank2"]
    );
}

#[test]
fn deep_chain_flattens_when_fully_expanded() {
    let tasks: Vec<Task> = (0..10_000)
        .map(|i: usize| {
            let parent = i.checked_sub(1).map(|p| format!("n{p}"));
            task(&format!("n{i}"), parent.as_deref(), 0)
        })
        .collect();
    let forest = build_tree(&tasks);
    let visibility = VisibilitySet::default_for(ViewKind::Timeline, &forest);
    let rows = flatten(&forest, &visibility);

    assert_eq!(rows.len(), 10_000);
    assert_eq!(rows[9_999].level, 9_999);
    assert_eq!(flatten(&forest, &VisibilitySet::new()).len(), 1);
}
