//! Remote content gateway
//!
//! The session never owns persistence; it talks to the CMS through the
//! [`ContentGateway`] capability injected at construction. Two
//! implementations ship with the crate:
//! - [`HttpGateway`] against the CMS REST API
//! - [`MemoryGateway`] holding a whole site in memory (tests, offline demos)
//!
//! Gateways also carry the host's event hooks (key bindings, window
//! unload, escape) so a session can register and release them by owner tag.

pub mod http;
pub mod listeners;
pub mod memory;

use async_trait::async_trait;
use shared_types::{NewPage, Page, SiteFile, UploadResponse};

use crate::error::GatewayError;

pub use http::HttpGateway;
pub use listeners::{EditorEvent, Listener, ListenerRegistry};
pub use memory::{GatewayCall, GatewayOp, MemoryGateway};

/// Async content operations the editor session depends on.
///
/// Futures are not required to be `Send`: the session runs on a single
/// event loop.
#[async_trait(?Send)]
pub trait ContentGateway {
    async fn list_pages(&self) -> Result<Vec<Page>, GatewayError>;

    async fn list_files(&self) -> Result<Vec<SiteFile>, GatewayError>;

    async fn get_page(&self, name: &str) -> Result<Page, GatewayError>;

    /// The server assigns the new page's name.
    async fn create_page(&self, page: &NewPage) -> Result<Page, GatewayError>;

    async fn edit_page(&self, page: &Page) -> Result<(), GatewayError>;

    async fn rename_page(&self, old_name: &str, new_name: &str) -> Result<(), GatewayError>;

    async fn rename_file(&self, old_name: &str, new_name: &str) -> Result<(), GatewayError>;

    async fn delete_page(&self, page: &Page) -> Result<(), GatewayError>;

    async fn delete_file(&self, name: &str) -> Result<(), GatewayError>;

    /// `on_progress` receives percentages in whatever order the transport
    /// reports them.
    async fn upload_file(
        &self,
        name: &str,
        bytes: Vec<u8>,
        on_progress: &mut dyn FnMut(u8),
    ) -> Result<UploadResponse, GatewayError>;

    async fn get_style(&self) -> Result<String, GatewayError>;

    async fn set_style(&self, style: &str) -> Result<(), GatewayError>;

    fn listeners(&self) -> &ListenerRegistry;

    fn add_listener(&self, event: EditorEvent, owner: &str, handler: Listener) {
        self.listeners().add(event, owner, handler);
    }

    fn remove_listeners(&self, owner: &str) {
        self.listeners().remove_owner(owner);
    }
}
