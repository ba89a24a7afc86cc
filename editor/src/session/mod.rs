//! Editor session: state, derived view and the controller that drives them

pub mod catalog;
pub mod controller;
pub mod state;
pub mod view;

pub use catalog::{sanitize_filename, sort_files, sort_pages};
pub use controller::{
    EditorSession, FileUpload, Observer, SessionCommand, UploadOutcome, UNLOAD_PROMPT,
};
pub use state::{ContextAction, ContextTarget, DialogState, SessionState, TargetKind};
pub use view::{DialogView, EditorView, TabView};
