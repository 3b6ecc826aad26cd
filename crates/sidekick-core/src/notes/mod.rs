//! Knowledge-note domain module.

mod merge;
mod model;
mod repository;

pub use merge::merge_notes;
pub use model::{Note, NoteList};
pub use repository::NoteRepository;
