use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use wbs_timeline::{
    DragMode, NewTask, SqliteStore, TaskStatus, TaskStore, TimelineRow, TimelineSession, ViewKind,
    VisibleRow, WbsConfig, generate_daily_report, save_tasks_to_csv, save_tasks_to_json,
};

#[derive(Debug, Parser)]
#[command(name = "wbs-timeline", about = "Work breakdown and timeline editor")]
struct Args {
    /// SQLite database file (overrides configuration).
    #[arg(long)]
    db: Option<PathBuf>,
    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Project to open at startup.
    #[arg(long)]
    project: Option<String>,
    /// Timeline pivot date (YYYY-MM-DD); defaults to today.
    #[arg(long)]
    pivot: Option<NaiveDate>,
    #[arg(short, long)]
    verbose: bool,
}

struct Repl {
    store: SqliteStore,
    session: TimelineSession,
    project_id: Option<String>,
}

fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let level = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_env("WBS_TIMELINE_LOG").unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;
    Ok(())
}

fn print_help() {
    println!(
        "Commands:\n  help                               Show this help\n  projects                           List projects\n  project new <name...>              Create a project and open it\n  use <id|n>                         Open a project by id or list position\n  add <title...>                     Add a top-level task\n  sub <row> <title...>               Add a subtask under a WBS row\n  dates <row> <start|-> <end|->      Set task dates (YYYY-MM-DD, '-' clears)\n  status <row> <status>              Set status (pending|in_progress|completed|cancelled)\n  progress <row> <0-100>             Set progress\n  rename <row> <title...>            Rename a task\n  delete <row>                       Delete a task and its subtasks\n  show | wbs                         Show the WBS list\n  toggle <row>                       Expand/collapse a WBS row\n  expand | collapse                  Expand or collapse every WBS row\n  gantt                              Show the timeline\n  gtoggle <row>                      Expand/collapse a timeline row\n  prev | next | today                Move the timeline by a month / to today\n  goto <YYYY-MM-DD>                  Center the timeline on a date\n  drag <row> <move|start|end> <dx>   Drag a timeline bar by dx pixels\n  todos [date]                       List todos (default today)\n  todo new <date> <title...>         Add a free-standing todo\n  todo add <row> [date]              Put a WBS task on the todo list\n  todo toggle <n> [date]             Toggle a todo from the list\n  report [date] [memo...]            Print the daily report\n  export <json|csv> <path>           Export the open project's tasks\n  quit|exit                          Exit"
    );
}

fn parse_optional_date(raw: &str) -> Result<Option<NaiveDate>, String> {
    if raw == "-" {
        return Ok(None);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| format!("Invalid date '{raw}' (YYYY-MM-DD)"))
}

fn parse_row(raw: Option<&str>) -> Result<usize, String> {
    raw.and_then(|s| s.parse::<usize>().ok())
        .filter(|n| *n > 0)
        .ok_or_else(|| "Invalid row number".to_string())
}

fn render_wbs(rows: &[VisibleRow]) -> String {
    if rows.is_empty() {
        return "(no tasks)\n".to_string();
    }
    let mut out = String::new();
    for (idx, row) in rows.iter().enumerate() {
        let marker = match (row.has_children, row.expanded) {
            (false, _) => ' ',
            (true, true) => '-',
            (true, false) => '+',
        };
        let dates = match (row.task.start_date, row.task.end_date) {
            (Some(s), Some(e)) => format!("{s} .. {e}"),
            (Some(s), None) => format!("{s} .."),
            (None, Some(e)) => format!(".. {e}"),
            (None, None) => String::new(),
        };
        out.push_str(&format!(
            "{:>3}. {}{} {} [{}] {}% {}\n",
            idx + 1,
            "  ".repeat(row.level),
            marker,
            row.task.title,
            row.task.status,
            row.task.progress,
            dates
        ));
    }
    out
}

fn render_gantt(session: &TimelineSession, rows: &[TimelineRow]) -> String {
    const LABEL_WIDTH: usize = 28;
    let window = session.window();
    let unit = session.mapper().unit_width();
    let days = window.len();

    let mut header = " ".repeat(LABEL_WIDTH + 6);
    header.push('|');
    for (first, span) in window.month_spans() {
        let label = first.format("%Y-%m").to_string();
        let mut cell: String = label.chars().take(span).collect();
        cell.push_str(&" ".repeat(span.saturating_sub(cell.chars().count())));
        header.push_str(&cell);
    }
    header.push('|');

    let mut out = format!("{header}\n");
    for (idx, row) in rows.iter().enumerate() {
        let mut label = format!("{}{}", "  ".repeat(row.row.level), row.row.task.title);
        if label.chars().count() > LABEL_WIDTH {
            label = label.chars().take(LABEL_WIDTH - 1).collect::<String>() + "~";
        }
        let mut cells = vec!['.'; days];
        if let Some(bar) = row.bar {
            let start = (bar.offset / unit).round() as usize;
            let len = (bar.width / unit).round() as usize;
            for cell in cells.iter_mut().skip(start).take(len) {
                *cell = '#';
            }
        }
        out.push_str(&format!(
            "{:>3}. {:<width$} |{}|\n",
            idx + 1,
            label,
            cells.into_iter().collect::<String>(),
            width = LABEL_WIDTH
        ));
    }
    out.push_str(&format!(
        "window {} .. {} (pivot {})\n",
        window.first_day(),
        window.last_day(),
        window.pivot()
    ));
    out
}

impl Repl {
    fn require_project(&self) -> Result<String, String> {
        self.project_id
            .clone()
            .ok_or_else(|| "No project open. Use 'project new' or 'use'.".to_string())
    }

    fn reload(&mut self) -> Result<(), String> {
        let project_id = self.require_project()?;
        self.session
            .reload(&self.store, &project_id)
            .map_err(|e| format!("Error loading tasks: {e}"))
    }

    fn open_project(&mut self, project_id: String) -> Result<(), String> {
        match self.store.get_project(&project_id) {
            Ok(Some(project)) => {
                println!("Opened project {} ({}).", project.name, project.id);
                self.project_id = Some(project.id);
                self.reload()
            }
            Ok(None) => Err(format!("Project {project_id} not found.")),
            Err(e) => Err(format!("Error: {e}")),
        }
    }

    fn wbs_task_id(&self, raw: Option<&str>) -> Result<String, String> {
        let row = parse_row(raw)?;
        self.session
            .wbs_rows()
            .get(row - 1)
            .map(|r| r.task.id.clone())
            .ok_or_else(|| format!("Row {row} is not visible"))
    }

    fn show_wbs(&self) {
        print!("{}", render_wbs(&self.session.wbs_rows()));
    }

    fn show_gantt(&self) {
        print!("{}", render_gantt(&self.session, &self.session.timeline_rows()));
    }

    fn edit_task<F>(&mut self, raw_row: Option<&str>, edit: F) -> Result<(), String>
    where
        F: FnOnce(&mut wbs_timeline::Task) -> Result<(), String>,
    {
        let task_id = self.wbs_task_id(raw_row)?;
        let mut task = self
            .session
            .tasks()
            .iter()
            .find(|t| t.id == task_id)
            .cloned()
            .ok_or_else(|| "Task not found".to_string())?;
        edit(&mut task)?;
        self.store
            .update_task(&task)
            .map_err(|e| format!("Error: {e}"))?;
        self.reload()?;
        println!("Task updated.");
        self.show_wbs();
        Ok(())
    }

    fn handle(&mut self, input: &str) -> Result<bool, String> {
        let mut parts = input.split_whitespace();
        let cmd = parts.next().unwrap_or("");
        match cmd {
            "help" => print_help(),
            "quit" | "exit" => return Ok(false),
            "projects" => {
                let projects = self.store.list_projects().map_err(|e| format!("Error: {e}"))?;
                if projects.is_empty() {
                    println!("(no projects)");
                }
                for (idx, project) in projects.iter().enumerate() {
                    println!("{:>3}. {} ({})", idx + 1, project.name, project.id);
                }
            }
            "project" => match parts.next() {
                Some("new") => {
                    let name = parts.collect::<Vec<_>>().join(" ");
                    if name.is_empty() {
                        return Err("Usage: project new <name...>".into());
                    }
                    let project = self
                        .store
                        .create_project(&name, None, None, None)
                        .map_err(|e| format!("Error: {e}"))?;
                    println!("Created project {}.", project.name);
                    self.open_project(project.id)?;
                }
                _ => return Err("Usage: project new <name...>".into()),
            },
            "use" => {
                let key = parts.next().ok_or("Usage: use <id|n>")?;
                let project_id = match key.parse::<usize>() {
                    Ok(n) if n > 0 => self
                        .store
                        .list_projects()
                        .map_err(|e| format!("Error: {e}"))?
                        .get(n - 1)
                        .map(|p| p.id.clone())
                        .ok_or_else(|| format!("No project at position {n}"))?,
                    _ => key.to_string(),
                };
                self.open_project(project_id)?;
            }
            "add" | "sub" => {
                let project_id = self.require_project()?;
                let parent_id = if cmd == "sub" {
                    Some(self.wbs_task_id(parts.next())?)
                } else {
                    None
                };
                let title = parts.collect::<Vec<_>>().join(" ");
                if title.is_empty() {
                    return Err(format!("Usage: {cmd} {}<title...>", if cmd == "sub" { "<row> " } else { "" }));
                }
                let new_task = NewTask {
                    parent_id: parent_id.clone(),
                    ..NewTask::new(title)
                };
                let task = self
                    .store
                    .create_task(&project_id, new_task)
                    .map_err(|e| format!("Error: {e}"))?;
                self.reload()?;
                if let Some(parent_id) = parent_id {
                    if !self.session.visibility(ViewKind::Wbs).is_expanded(&parent_id) {
                        self.session.toggle(ViewKind::Wbs, &parent_id);
                    }
                }
                println!("Added task {}.", task.title);
                self.show_wbs();
            }
            "dates" => {
                let row = parts.next();
                let (Some(start), Some(end)) = (parts.next(), parts.next()) else {
                    return Err("Usage: dates <row> <start|-> <end|->".into());
                };
                let start = parse_optional_date(start)?;
                let end = parse_optional_date(end)?;
                let task_id = self.wbs_task_id(row)?;
                self.store
                    .update_task_dates(&task_id, start, end)
                    .map_err(|e| format!("Error: {e}"))?;
                self.reload()?;
                println!("Dates set.");
                self.show_wbs();
            }
            "status" => {
                let row = parts.next();
                let status = parts
                    .next()
                    .ok_or("Usage: status <row> <status>")?
                    .parse::<TaskStatus>()
                    .map_err(|e| {
                        let expected: Vec<&str> =
                            TaskStatus::variants().iter().map(TaskStatus::as_str).collect();
                        format!("{e} (expected one of: {})", expected.join(", "))
                    })?;
                self.edit_task(row, |task| {
                    task.status = status;
                    Ok(())
                })?;
            }
            "progress" => {
                let row = parts.next();
                let value = parts
                    .next()
                    .and_then(|v| v.parse::<i32>().ok())
                    .ok_or("Usage: progress <row> <0-100>")?;
                self.edit_task(row, |task| {
                    task.progress = value;
                    Ok(())
                })?;
            }
            "rename" => {
                let row = parts.next();
                let title = parts.collect::<Vec<_>>().join(" ");
                self.edit_task(row, |task| {
                    if title.is_empty() {
                        return Err("Usage: rename <row> <title...>".into());
                    }
                    task.title = title;
                    Ok(())
                })?;
            }
            "delete" => {
                let task_id = self.wbs_task_id(parts.next())?;
                match self.store.delete_task(&task_id) {
                    Ok(true) => {
                        self.reload()?;
                        println!("Deleted task.");
                        self.show_wbs();
                    }
                    Ok(false) => println!("Task not found."),
                    Err(e) => return Err(format!("Error deleting task: {e}")),
                }
            }
            "show" | "wbs" => {
                self.require_project()?;
                self.show_wbs();
            }
            "toggle" => {
                let task_id = self.wbs_task_id(parts.next())?;
                self.session.toggle(ViewKind::Wbs, &task_id);
                self.show_wbs();
            }
            "expand" => {
                self.session.expand_all(ViewKind::Wbs);
                self.show_wbs();
            }
            "collapse" => {
                self.session.collapse_all(ViewKind::Wbs);
                self.show_wbs();
            }
            "gantt" => {
                self.require_project()?;
                self.show_gantt();
            }
            "gtoggle" => {
                let row = parse_row(parts.next())?;
                let task_id = self
                    .session
                    .timeline_rows()
                    .get(row - 1)
                    .map(|r| r.row.task.id.clone())
                    .ok_or_else(|| format!("Row {row} is not visible"))?;
                self.session.toggle(ViewKind::Timeline, &task_id);
                self.show_gantt();
            }
            "prev" | "next" | "today" | "goto" => {
                match cmd {
                    "prev" => self.session.step_month(-1),
                    "next" => self.session.step_month(1),
                    "today" => self.session.reset_to_today(),
                    _ => {
                        let date = parts
                            .next()
                            .and_then(|d| parse_optional_date(d).ok().flatten())
                            .ok_or("Usage: goto <YYYY-MM-DD>")?;
                        self.session.reset_to(date);
                    }
                }
                self.show_gantt();
            }
            "drag" => {
                let row = parse_row(parts.next())?;
                let mode = parts
                    .next()
                    .ok_or("Usage: drag <row> <move|start|end> <dx>")?
                    .parse::<DragMode>()?;
                let dx = parts
                    .next()
                    .and_then(|v| v.parse::<f32>().ok())
                    .ok_or("Usage: drag <row> <move|start|end> <dx>")?;
                let task_id = self
                    .session
                    .timeline_rows()
                    .get(row - 1)
                    .map(|r| r.row.task.id.clone())
                    .ok_or_else(|| format!("Row {row} is not visible"))?;
                if !self.session.pointer_down(&task_id, mode, 0.0) {
                    return Err("Task needs both a start and an end date to be dragged.".into());
                }
                let update = self.session.pointer_move(dx);
                self.session.pointer_up();
                self.session.flush(&self.store);
                match update {
                    Some(update) => {
                        let fmt = |d: Option<NaiveDate>| d.map(|d| d.to_string()).unwrap_or_default();
                        println!("Dates now {} .. {}.", fmt(update.start), fmt(update.end));
                    }
                    None => println!("No change."),
                }
                self.reload()?;
                self.show_gantt();
            }
            "todos" => {
                let date = match parts.next() {
                    Some(raw) => parse_optional_date(raw)?.ok_or("Invalid date")?,
                    None => chrono::Local::now().date_naive(),
                };
                self.print_todos(date)?;
            }
            "todo" => self.handle_todo(parts.next(), parts.collect())?,
            "report" => {
                let date = match parts.next() {
                    Some(raw) => parse_optional_date(raw)?.ok_or("Invalid date")?,
                    None => chrono::Local::now().date_naive(),
                };
                let memo = parts.collect::<Vec<_>>().join(" ");
                let todos = self
                    .store
                    .list_todos_by_date(date)
                    .map_err(|e| format!("Error: {e}"))?;
                print!("{}", generate_daily_report(date, &todos, &memo));
            }
            "export" => {
                let project_id = self.require_project()?;
                let (Some(kind), Some(path)) = (parts.next(), parts.next()) else {
                    return Err("Usage: export <json|csv> <path>".into());
                };
                let tasks = self.session.tasks();
                let result = match kind {
                    "json" => save_tasks_to_json(&project_id, tasks, path),
                    "csv" => save_tasks_to_csv(tasks, path),
                    _ => return Err("Usage: export <json|csv> <path>".into()),
                };
                result.map_err(|e| format!("Error exporting: {e}"))?;
                println!("Exported {} tasks to {path}.", tasks.len());
            }
            _ => println!("Unknown command. Type 'help'."),
        }
        Ok(true)
    }

    fn print_todos(&self, date: NaiveDate) -> Result<(), String> {
        let todos = self
            .store
            .list_todos_by_date(date)
            .map_err(|e| format!("Error: {e}"))?;
        println!("Todos for {date}:");
        if todos.is_empty() {
            println!("(none)");
        }
        for (idx, entry) in todos.iter().enumerate() {
            let mark = if entry.todo.completed { 'x' } else { ' ' };
            let project = entry
                .project_name
                .as_deref()
                .map(|p| format!("{p}: "))
                .unwrap_or_default();
            println!("{:>3}. [{mark}] {project}{}", idx + 1, entry.todo.title);
        }
        Ok(())
    }

    fn handle_todo(&mut self, sub: Option<&str>, rest: Vec<&str>) -> Result<(), String> {
        let today = chrono::Local::now().date_naive();
        match sub {
            Some("new") => {
                let date = rest
                    .first()
                    .and_then(|d| parse_optional_date(d).ok().flatten())
                    .ok_or("Usage: todo new <date> <title...>")?;
                let title = rest[1..].join(" ");
                if title.is_empty() {
                    return Err("Usage: todo new <date> <title...>".into());
                }
                self.store
                    .create_daily_todo(None, &title, date, None)
                    .map_err(|e| format!("Error: {e}"))?;
                self.print_todos(date)
            }
            Some("add") => {
                let task_id = self.wbs_task_id(rest.first().copied())?;
                let date = match rest.get(1) {
                    Some(raw) => parse_optional_date(raw)?.ok_or("Invalid date")?,
                    None => today,
                };
                self.store
                    .add_task_to_todo(&task_id, date)
                    .map_err(|e| format!("Error: {e}"))?;
                self.print_todos(date)
            }
            Some("toggle") => {
                let n = parse_row(rest.first().copied())?;
                let date = match rest.get(1) {
                    Some(raw) => parse_optional_date(raw)?.ok_or("Invalid date")?,
                    None => today,
                };
                let todos = self
                    .store
                    .list_todos_by_date(date)
                    .map_err(|e| format!("Error: {e}"))?;
                let todo = todos.get(n - 1).ok_or_else(|| format!("No todo at position {n}"))?;
                self.store
                    .toggle_todo(&todo.todo.id)
                    .map_err(|e| format!("Error: {e}"))?;
                self.print_todos(date)
            }
            _ => Err("Usage: todo <new|add|toggle> ...".into()),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose)?;

    let mut config = WbsConfig::load_from(args.config.as_deref())?;
    if let Some(db) = args.db {
        config.database_path = db;
    }
    if let Some(dir) = config.database_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    }
    let store = SqliteStore::new(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))?;

    let pivot = args.pivot.unwrap_or_else(|| chrono::Local::now().date_naive());
    let mut repl = Repl {
        store,
        session: TimelineSession::new(pivot, config.unit_width),
        project_id: None,
    };

    println!("WBS Timeline (CLI) - type 'help' for commands\n");
    if let Some(project_id) = args.project {
        if let Err(message) = repl.open_project(project_id) {
            println!("{message}");
        }
    }

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        match repl.handle(input) {
            Ok(true) => {}
            Ok(false) => break,
            Err(message) => println!("{message}"),
        }
    }
    Ok(())
}
