use crate::drag::{DateUpdate, DragController, DragMode, PendingWrites};
use crate::persistence::{PersistenceResult, TaskStore};
use crate::task::Task;
use crate::timeline::{BarGeometry, PositionMapper, TimelineWindow};
use crate::tree::{TaskTreeNode, ViewKind, VisibilitySet, build_tree, flatten};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One rendered line of the hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisibleRow {
    pub task: Task,
    pub level: usize,
    pub has_children: bool,
    pub expanded: bool,
}

/// A hierarchy line plus its bar, when the task falls inside the window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineRow {
    #[serde(flatten)]
    pub row: VisibleRow,
    pub bar: Option<BarGeometry>,
}

/// Everything one UI session needs to render and edit a project's tasks.
#[derive(Debug)]
pub struct TimelineSession {
    tasks: Vec<Task>,
    forest: Vec<TaskTreeNode>,
    wbs_visibility: VisibilitySet,
    timeline_visibility: VisibilitySet,
    window: TimelineWindow,
    mapper: PositionMapper,
    drag: DragController,
    pending: PendingWrites,
}

impl TimelineSession {
    pub fn new(pivot: NaiveDate, unit_width: f32) -> Self {
        let mapper = PositionMapper::new(unit_width);
        Self {
            tasks: Vec::new(),
            forest: Vec::new(),
            wbs_visibility: VisibilitySet::new(),
            timeline_visibility: VisibilitySet::new(),
            window: TimelineWindow::new(pivot),
            drag: DragController::new(mapper.unit_width()),
            mapper,
            pending: PendingWrites::new(),
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn forest(&self) -> &[TaskTreeNode] {
        &self.forest
    }

    pub fn window(&self) -> &TimelineWindow {
        &self.window
    }

    pub fn mapper(&self) -> &PositionMapper {
        &self.mapper
    }

    pub fn drag(&self) -> &DragController {
        &self.drag
    }

    pub fn pending(&self) -> &PendingWrites {
        &self.pending
    }

    /// Installs a fresh task list. The timeline view re-expands everything;
    /// the WBS view keeps its expanded set.
    pub fn replace_tasks(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
        self.forest = build_tree(&self.tasks);
        self.timeline_visibility = VisibilitySet::default_for(ViewKind::Timeline, &self.forest);
    }

    /// Sends pending writes, then reloads the full task list of `project_id`.
    pub fn reload<S: TaskStore + ?Sized>(
        &mut self,
        store: &S,
        project_id: &str,
    ) -> PersistenceResult<()> {
        self.flush(store);
        let tasks = store.list_tasks(project_id)?;
        tracing::debug!(project_id, count = tasks.len(), "reloaded tasks");
        self.replace_tasks(tasks);
        Ok(())
    }

    pub fn flush<S: TaskStore + ?Sized>(&mut self, store: &S) -> usize {
        self.pending.flush(store)
    }

    fn rows_for(&self, visibility: &VisibilitySet) -> Vec<VisibleRow> {
        flatten(&self.forest, visibility)
            .into_iter()
            .map(|node| VisibleRow {
                task: node.task.clone(),
                level: node.level,
                has_children: node.has_children(),
                expanded: visibility.is_expanded(node.id()),
            })
            .collect()
    }

    pub fn wbs_rows(&self) -> Vec<VisibleRow> {
        self.rows_for(&self.wbs_visibility)
    }

    pub fn timeline_rows(&self) -> Vec<TimelineRow> {
        self.rows_for(&self.timeline_visibility)
            .into_iter()
            .map(|row| {
                let bar = self.mapper.position(&row.task, &self.window);
                TimelineRow { row, bar }
            })
            .collect()
    }

    pub fn visibility(&self, view: ViewKind) -> &VisibilitySet {
        match view {
            ViewKind::Wbs => &self.wbs_visibility,
            ViewKind::Timeline => &self.timeline_visibility,
        }
    }

    fn visibility_mut(&mut self, view: ViewKind) -> &mut VisibilitySet {
        match view {
            ViewKind::Wbs => &mut self.wbs_visibility,
            ViewKind::Timeline => &mut self.timeline_visibility,
        }
    }

    pub fn toggle(&mut self, view: ViewKind, task_id: &str) -> bool {
        self.visibility_mut(view).toggle(task_id)
    }

    pub fn expand_all(&mut self, view: ViewKind) {
        let ids = crate::tree::parent_ids(&self.forest);
        self.visibility_mut(view).expand_all(ids);
    }

    pub fn collapse_all(&mut self, view: ViewKind) {
        self.visibility_mut(view).collapse_all();
    }

    pub fn step_month(&mut self, delta: i32) {
        self.window.step_month(delta);
    }

    pub fn reset_to_today(&mut self) {
        self.window.reset_to_today();
    }

    pub fn reset_to(&mut self, pivot: NaiveDate) {
        self.window.reset_to(pivot);
    }

    pub fn pointer_down(&mut self, task_id: &str, mode: DragMode, x: f32) -> bool {
        match self.tasks.iter().find(|task| task.id == task_id) {
            Some(task) => self.drag.pointer_down(task, mode, x),
            None => false,
        }
    }

    /// Applies an accepted move locally and queues it for the store.
    pub fn pointer_move(&mut self, x: f32) -> Option<DateUpdate> {
        let update = self.drag.pointer_move(x)?;
        if let Some(task) = self.tasks.iter_mut().find(|task| task.id == update.task_id) {
            task.start_date = update.start;
            task.end_date = update.end;
        }
        self.forest = build_tree(&self.tasks);
        self.pending.push(update.clone());
        Some(update)
    }

    pub fn pointer_up(&mut self) {
        self.drag.pointer_up();
    }

    pub fn pointer_leave(&mut self) {
        self.drag.pointer_leave();
    }
}
