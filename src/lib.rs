pub mod config;
pub mod drag;
#[cfg(feature = "http_api")]
pub mod http_api;
pub mod persistence;
pub mod report;
pub mod session;
pub mod task;
pub mod task_validation;
pub mod timeline;
pub mod tree;

pub use config::{ConfigError, WbsConfig};
pub use drag::{DateUpdate, DragController, DragIntent, DragMode, DragState, PendingWrites};
#[cfg(feature = "sqlite")]
pub use persistence::sqlite::{NewTask, SqliteStore};
pub use persistence::{
    PersistenceError, PersistenceResult, TaskStore, load_tasks_from_csv, load_tasks_from_json,
    save_tasks_to_csv, save_tasks_to_json,
};
pub use report::generate_daily_report;
pub use session::{TimelineRow, TimelineSession, VisibleRow};
pub use task::{DailyTodo, DailyTodoWithTask, Project, Task, TaskStatus};
pub use task_validation::TaskValidationError;
pub use timeline::{BarGeometry, PositionMapper, TimelineWindow, compute_window};
pub use tree::{TaskTreeNode, ViewKind, VisibilitySet, build_tree, flatten};
