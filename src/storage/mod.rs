mod note_store;

pub use note_store::{
    find_workspace_root, limits, BatchOp, NoteStore, NoteUpdate, StoreEvent, WriteBatch,
    MEMOWEAVE_DIR,
};
