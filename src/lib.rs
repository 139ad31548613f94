pub mod cache;
pub mod cli;
pub mod config;
pub mod editor;
pub mod error;
pub mod flows;
pub mod gamify;
pub mod note;
pub mod notify;
pub mod prefs;
pub mod search;
pub mod storage;
pub mod views;

pub use cache::SqliteCache;
pub use error::{MemoWeaveError, Result};
pub use note::{ChecklistItem, Note, NotePriority, NoteRevision, NoteStatus};
pub use storage::{NoteStore, NoteUpdate, WriteBatch};
