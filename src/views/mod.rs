//! Projections from a note snapshot to render state.
//!
//! Each view takes the note collection (as delivered by store
//! subscriptions) and derives the structure a renderer needs. Mutating
//! helpers return `WriteBatch` values for the caller to persist; the
//! one exception is [`toggle_item`], which writes through the store so
//! the completion notice fires exactly once.

pub mod board;
pub mod calendar;
pub mod list;
pub mod plans;
pub mod templates;
pub mod todos;

pub use board::{build_board, Board, BoardColumn, BoardSession, DropTarget, GroupBy};
pub use calendar::{build_calendar, day_view, month_view, CalendarDay, TimelineEntry};
pub use list::{project_list, ListOptions, ListScope, ListSort};
pub use plans::{archive_plan, delete_plan, group_plans, PlanGroup};
pub use templates::{builtin_templates, find_template, NoteTemplate};
pub use todos::{project_todos, toggle_item, TodoEntry};
