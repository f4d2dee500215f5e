use wbs_timeline::tree::{find_node, node_count, parent_ids};
use wbs_timeline::{Task, TaskTreeNode, build_tree};

fn task(id: &str, parent: Option<&str>, order: i32) -> Task {
    let mut task = Task::new(id, "p1", format!("Task {id}")).with_order(order);
    task.parent_id = parent.map(ToOwned::to_owned);
    task
}

fn ids(nodes: &[TaskTreeNode]) -> Vec<&str> {
    nodes.iter().map(|n| n.task.id.as_str()).collect()
}

fn assert_levels(nodes: &[TaskTreeNode], expected: usize) {
    for node in nodes {
        assert_eq!(node.level, expected, "node {} has wrong level", node.task.id);
        assert_levels(&node.children, expected + 1);
    }
}

#[test]
fn builds_nested_forest_with_levels() {
    let tasks = vec![
        task("a", None, 0),
        task("a1", Some("a"), 0),
        task("a1x", Some("a1"), 0),
        task("b", None, 1),
        task("a2", Some("a"), 1),
    ];
    let forest = build_tree(&tasks);

    assert_eq!(ids(&forest), vec!["a", "b"]);
    assert_eq!(ids(&forest[0].children), vec!["a1", "a2"]);
    assert_eq!(ids(&forest[0].children[0].children), vec!["a1x"]);
    assert_eq!(forest[0].children[0].children[0].level, 2);
    assert_levels(&forest, 0);
    assert_eq!(node_count(&forest), tasks.len());
}

#[test]
fn children_listed_before_their_parent_still_attach() {
    let tasks = vec![task("child", Some("parent"), 0), task("parent", None, 0)];
    let forest = build_tree(&tasks);

    assert_eq!(ids(&forest), vec!["parent"]);
    assert_eq!(ids(&forest[0].children), vec!["child"]);
    assert_eq!(forest[0].children[0].level, 1);
}

#[test]
fn dangling_parent_becomes_root() {
    let tasks = vec![task("a", None, 0), task("orphan", Some("deleted"), 1)];
    let forest = build_tree(&tasks);

    assert_eq!(ids(&forest), vec!["a", "orphan"]);
    assert_eq!(forest[1].level, 0);
}

#[test]
fn siblings_sorted_by_order_index() {
    let tasks = vec![
        task("root", None, 0),
        task("two", Some("root"), 2),
        task("zero", Some("root"), 0),
        task("one", Some("root"), 1),
    ];
    let forest = build_tree(&tasks);

    assert_eq!(ids(&forest[0].children), vec!["zero", "one", "two"]);
}

#[test]
fn equal_order_index_keeps_input_order() {
    let tasks = vec![task("c", None, 0), task("a", None, 0), task("b", None, 0)];
    let forest = build_tree(&tasks);

    assert_eq!(ids(&forest), vec!["c", "a", "b"]);
}

#[test]
fn parent_cycle_members_become_roots() {
    let tasks = vec![
        task("x", Some("y"), 0),
        task("y", Some("x"), 1),
        task("leaf", Some("x"), 0),
    ];
    let forest = build_tree(&tasks);

    assert_eq!(ids(&forest), vec!["x", "y"]);
    assert_eq!(ids(&forest[0].children), vec!["leaf"]);
    assert_eq!(node_count(&forest), 3);
    assert_levels(&forest, 0);
}

#[test]
fn self_parented_task_is_root() {
    let tasks = vec![task("loop", Some("loop"), 0)];
    let forest = build_tree(&tasks);

    assert_eq!(ids(&forest), vec!["loop"]);
    assert!(forest[0].children.is_empty());
}

#[test]
fn empty_input_yields_empty_forest() {
    assert!(build_tree(&[]).is_empty());
}

#[test]
fn helpers_find_nodes_and_parents() {
    let tasks = vec![
        task("a", None, 0),
        task("a1", Some("a"), 0),
        task("a1x", Some("a1"), 0),
        task("b", None, 1),
    ];
    let forest = build_tree(&tasks);

    assert_eq!(parent_ids(&forest), vec!["a".to_string(), "a1".to_string()]);
    assert_eq!(find_node(&forest, "a1x").map(|n| n.level), Some(2));
    assert!(find_node(&forest, "missing").is_none());
}

fn deep_chain(depth: usize) -> Vec<Task> {
    (0..depth)
        .map(|i| {
            let parent = i.checked_sub(1).map(|p| format!("t{p}"));
            task(&format!("t{i}"), parent.as_deref(), 0)
        })
        .collect()
}

#[test]
fn deep_parent_chain_builds_without_recursion() {
    let tasks = deep_chain(10_000);
    let forest = build_tree(&tasks);

    assert_eq!(ids(&forest), vec!["t0"]);
    assert_eq!(node_count(&forest), 10_000);
    assert_eq!(parent_ids(&forest).len(), 9_999);
    assert_eq!(find_node(&forest, "t9999").map(|n| n.level), Some(9_999));
    drop(forest);
}
