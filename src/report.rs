use crate::task::DailyTodoWithTask;
use chrono::NaiveDate;
use std::fmt::Write;

/// Renders the day's todos as a Markdown report.
pub fn generate_daily_report(date: NaiveDate, todos: &[DailyTodoWithTask], memo: &str) -> String {
    let (completed, incomplete): (Vec<_>, Vec<_>) =
        todos.iter().partition(|entry| entry.todo.completed);

    let mut report = format!("# Daily Report - {date}\n\n");

    report.push_str("## Completed\n");
    if completed.is_empty() {
        report.push_str("None\n");
    }
    for entry in completed {
        let _ = writeln!(report, "- [x] {}{}", project_prefix(entry), entry.todo.title);
        if let Some(note) = entry.todo.memo.as_deref().filter(|m| !m.is_empty()) {
            let _ = writeln!(report, "  - {note}");
        }
    }

    report.push_str("\n## Incomplete\n");
    if incomplete.is_empty() {
        report.push_str("None\n");
    }
    for entry in incomplete {
        let _ = writeln!(report, "- [ ] {}{}", project_prefix(entry), entry.todo.title);
    }

    if !memo.is_empty() {
        let _ = write!(report, "\n## Memo\n{memo}\n");
    }

    report
}

fn project_prefix(entry: &DailyTodoWithTask) -> String {
    entry
        .project_name
        .as_deref()
        .map(|name| format!("{name}: "))
        .unwrap_or_default()
}
