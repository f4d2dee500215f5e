//! Pointer gestures on timeline bars, interpreted as date changes.
//!
//! A gesture moves the controller from `Idle` to `Dragging` on pointer-down and
//! back on pointer-up or when the pointer leaves the surface. Each pointer-move
//! recomputes dates from the dates captured at pointer-down, so the emitted
//! update always carries the full pair rather than a delta.

use crate::persistence::TaskStore;
use crate::task::Task;
use crate::timeline::PositionMapper;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DragMode {
    Move,
    ResizeStart,
    ResizeEnd,
}

impl DragMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DragMode::Move => "move",
            DragMode::ResizeStart => "resize_start",
            DragMode::ResizeEnd => "resize_end",
        }
    }
}

impl fmt::Display for DragMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DragMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "move" => Ok(DragMode::Move),
            "start" | "resize_start" | "left" => Ok(DragMode::ResizeStart),
            "end" | "resize_end" | "right" => Ok(DragMode::ResizeEnd),
            other => Err(format!("unknown drag mode '{other}'")),
        }
    }
}

/// What is being dragged and where the gesture started.
#[derive(Debug, Clone, PartialEq)]
pub struct DragIntent {
    pub task_id: String,
    pub mode: DragMode,
    pub anchor_x: f32,
    pub original_start: NaiveDate,
    pub original_end: NaiveDate,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(DragIntent),
}

/// A request to overwrite a task's dates in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateUpdate {
    pub task_id: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// Dates produced by shifting `intent`'s original range by `day_delta` days,
/// or `None` when the result would invert the range.
pub fn candidate_dates(intent: &DragIntent, day_delta: i64) -> Option<(NaiveDate, NaiveDate)> {
    let shift = Duration::try_days(day_delta)?;
    match intent.mode {
        DragMode::Move => Some((
            intent.original_start.checked_add_signed(shift)?,
            intent.original_end.checked_add_signed(shift)?,
        )),
        DragMode::ResizeStart => {
            let start = intent.original_start.checked_add_signed(shift)?;
            (start <= intent.original_end).then_some((start, intent.original_end))
        }
        DragMode::ResizeEnd => {
            let end = intent.original_end.checked_add_signed(shift)?;
            (end >= intent.original_start).then_some((intent.original_start, end))
        }
    }
}

/// Whole days between two pointer positions for a given day width.
pub fn day_delta(anchor_x: f32, current_x: f32, unit_width: f32) -> i64 {
    ((current_x - anchor_x) / unit_width).round() as i64
}

#[derive(Debug, Clone)]
pub struct DragController {
    state: DragState,
    unit_width: f32,
}

impl DragController {
    /// Non-positive or non-finite widths fall back to the mapper default.
    pub fn new(unit_width: f32) -> Self {
        Self {
            state: DragState::Idle,
            unit_width: PositionMapper::new(unit_width).unit_width(),
        }
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn intent(&self) -> Option<&DragIntent> {
        match &self.state {
            DragState::Dragging(intent) => Some(intent),
            DragState::Idle => None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging(_))
    }

    /// Begins a gesture on `task`. Tasks without both dates are ignored.
    /// A gesture already in progress is released first.
    pub fn pointer_down(&mut self, task: &Task, mode: DragMode, x: f32) -> bool {
        let Some((start, end)) = task.date_range() else {
            return false;
        };
        if let DragState::Dragging(previous) = &self.state {
            tracing::debug!(task_id = %previous.task_id, "implicit release of previous drag");
        }
        self.state = DragState::Dragging(DragIntent {
            task_id: task.id.clone(),
            mode,
            anchor_x: x,
            original_start: start,
            original_end: end,
        });
        true
    }

    /// Returns the update to send for the pointer at `x`, if any.
    pub fn pointer_move(&mut self, x: f32) -> Option<DateUpdate> {
        let DragState::Dragging(intent) = &self.state else {
            return None;
        };
        let delta = day_delta(intent.anchor_x, x, self.unit_width);
        if delta == 0 {
            return None;
        }
        let Some((start, end)) = candidate_dates(intent, delta) else {
            tracing::trace!(task_id = %intent.task_id, delta, mode = %intent.mode, "rejected drag candidate");
            return None;
        };
        Some(DateUpdate {
            task_id: intent.task_id.clone(),
            start: Some(start),
            end: Some(end),
        })
    }

    pub fn pointer_up(&mut self) {
        self.state = DragState::Idle;
    }

    pub fn pointer_leave(&mut self) {
        self.state = DragState::Idle;
    }
}

/// Outbound date writes, keeping only the latest request per task.
///
/// Writes drain in the order their latest version was issued, so the store
/// receives the last-issued dates for each task last.
#[derive(Debug, Default)]
pub struct PendingWrites {
    next_seq: u64,
    slots: HashMap<String, (u64, DateUpdate)>,
}

impl PendingWrites {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, update: DateUpdate) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.slots.insert(update.task_id.clone(), (seq, update));
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn pending_for(&self, task_id: &str) -> Option<&DateUpdate> {
        self.slots.get(task_id).map(|(_, update)| update)
    }

    pub fn drain(&mut self) -> Vec<DateUpdate> {
        let mut writes: Vec<(u64, DateUpdate)> = self.slots.drain().map(|(_, slot)| slot).collect();
        writes.sort_by_key(|(seq, _)| *seq);
        writes.into_iter().map(|(_, update)| update).collect()
    }

    /// Sends every pending write to `store`. Failures are logged and dropped;
    /// returns how many writes succeeded.
    pub fn flush<S: TaskStore + ?Sized>(&mut self, store: &S) -> usize {
        let mut applied = 0;
        for update in self.drain() {
            match store.update_task_dates(&update.task_id, update.start, update.end) {
                Ok(()) => applied += 1,
                Err(err) => tracing::warn!(
                    task_id = %update.task_id,
                    error = %err,
                    "failed to write dragged dates; store will resync on next reload"
                ),
            }
        }
        applied
    }
}
