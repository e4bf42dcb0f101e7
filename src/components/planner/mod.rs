mod actor;
pub mod editor;
mod handle;
pub mod workspace;

pub use editor::{EventForm, MIN_SUMMARY_LEN};
pub use handle::PlannerHandle;
pub use workspace::{RequestState, Workspace, WorkspaceView};
