mod normalized;
mod note_context;
mod prefix;

pub use normalized::{AcceptedTag, Disposition, NormalizedResult, Notice, RejectReason, Rejection};
pub use note_context::NoteContext;
pub use prefix::{HierarchyPrefix, UnknownPrefix};
