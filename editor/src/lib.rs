//! Site Editor - editing sessions for a static-site CMS
//!
//! This crate holds the editor's session state machine: it keeps the page
//! and file listings, the open page and its unsaved edits, dialog state and
//! the responsive layout flags, and mediates every change through a
//! [`ContentGateway`].

pub mod config;
pub mod error;
pub mod gateway;
pub mod layout;
pub mod preview;
pub mod session;

pub use config::EditorConfig;
pub use error::{EditorError, GatewayError, Result};
pub use gateway::{ContentGateway, EditorEvent, HttpGateway, MemoryGateway};
pub use layout::{LayoutPolicy, Tab};
pub use preview::PreviewRenderer;
pub use session::{EditorSession, EditorView, SessionState};
