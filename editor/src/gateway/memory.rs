//! In-memory content gateway
//!
//! Holds a whole site (pages, files, style) in memory and behaves like the
//! CMS: it assigns names to new pages, refuses to delete `index.md`,
//! rejects rename collisions, and enforces an upload size limit and quota.
//!
//! Every call is recorded in order. Tests can make the next call of a kind
//! fail, or hold it open behind a gate until they release it.

use std::cell::RefCell;

use async_trait::async_trait;
use futures::channel::oneshot;
use shared_types::{
    NewPage, Page, SiteFile, UploadResponse, DEFAULT_STYLE, INDEX_PAGE, MAX_UPLOAD_MIB,
    UPLOAD_CODE_NO_SPACE, UPLOAD_CODE_TOO_BIG,
};
use strum::EnumDiscriminants;

use super::{ContentGateway, ListenerRegistry};
use crate::error::GatewayError;

const UNTITLED_STEM: &str = "untitled";

/// One recorded gateway call.
#[derive(Debug, Clone, PartialEq, Eq, EnumDiscriminants)]
#[strum_discriminants(name(GatewayOp), derive(Hash))]
pub enum GatewayCall {
    ListPages,
    ListFiles,
    GetPage(String),
    CreatePage,
    EditPage(String),
    RenamePage { from: String, to: String },
    RenameFile { from: String, to: String },
    DeletePage(String),
    DeleteFile(String),
    UploadFile(String),
    GetStyle,
    SetStyle(String),
}

#[derive(Debug, Clone)]
struct StoredFile {
    name: String,
    size: usize,
}

impl StoredFile {
    fn listing(&self) -> SiteFile {
        SiteFile::new(self.name.clone()).with_metadata("size", serde_json::json!(self.size))
    }
}

#[derive(Debug)]
struct Site {
    pages: Vec<Page>,
    files: Vec<StoredFile>,
    style: String,
}

pub struct MemoryGateway {
    site: RefCell<Site>,
    calls: RefCell<Vec<GatewayCall>>,
    failures: RefCell<Vec<GatewayOp>>,
    gates: RefCell<Vec<(GatewayOp, oneshot::Receiver<()>)>>,
    upload_ticks: Vec<u8>,
    max_upload_bytes: usize,
    quota_bytes: usize,
    listeners: ListenerRegistry,
}

impl Default for MemoryGateway {
    /// A site holding a single empty `index.md`.
    fn default() -> Self {
        Self::empty().with_page(INDEX_PAGE, "")
    }
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// A site with no pages at all.
    pub fn empty() -> Self {
        Self {
            site: RefCell::new(Site {
                pages: Vec::new(),
                files: Vec::new(),
                style: DEFAULT_STYLE.to_string(),
            }),
            calls: RefCell::new(Vec::new()),
            failures: RefCell::new(Vec::new()),
            gates: RefCell::new(Vec::new()),
            upload_ticks: vec![0, 25, 60, 100],
            max_upload_bytes: (MAX_UPLOAD_MIB as usize) * 1024 * 1024,
            quota_bytes: 500 * 1024 * 1024,
            listeners: ListenerRegistry::new(),
        }
    }

    /// Add or replace a page; its HTML cache is left empty.
    pub fn with_page(self, name: &str, markdown: &str) -> Self {
        self.put_page(Page::new(name, markdown, ""));
        self
    }

    pub fn with_file(self, name: &str, size: usize) -> Self {
        self.site.borrow_mut().files.push(StoredFile {
            name: name.to_string(),
            size,
        });
        self
    }

    pub fn with_style(self, style: &str) -> Self {
        self.site.borrow_mut().style = style.to_string();
        self
    }

    pub fn with_upload_limits(mut self, max_upload_bytes: usize, quota_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self.quota_bytes = quota_bytes;
        self
    }

    /// Progress percentages reported, in order, for every upload.
    pub fn with_upload_ticks(mut self, ticks: Vec<u8>) -> Self {
        self.upload_ticks = ticks;
        self
    }

    /// Make the next call of kind `op` fail with a transport error.
    pub fn fail_next(&self, op: GatewayOp) {
        self.failures.borrow_mut().push(op);
    }

    /// Hold the next call of kind `op` open until the returned sender fires
    /// (or is dropped).
    pub fn gate(&self, op: GatewayOp) -> oneshot::Sender<()> {
        let (release, wait) = oneshot::channel();
        self.gates.borrow_mut().push((op, wait));
        release
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn page(&self, name: &str) -> Option<Page> {
        self.site
            .borrow()
            .pages
            .iter()
            .find(|p| p.name == name)
            .cloned()
    }

    pub fn page_names(&self) -> Vec<String> {
        self.site.borrow().pages.iter().map(|p| p.name.clone()).collect()
    }

    pub fn file_names(&self) -> Vec<String> {
        self.site.borrow().files.iter().map(|f| f.name.clone()).collect()
    }

    pub fn style(&self) -> String {
        self.site.borrow().style.clone()
    }

    fn put_page(&self, page: Page) {
        let mut site = self.site.borrow_mut();
        match site.pages.iter_mut().find(|p| p.name == page.name) {
            Some(existing) => *existing = page,
            None => site.pages.push(page),
        }
    }

    /// Record the call, wait on its gate if one is set, then apply any
    /// injected failure.
    async fn enter(&self, call: GatewayCall) -> Result<(), GatewayError> {
        let op = GatewayOp::from(&call);
        self.calls.borrow_mut().push(call);

        let gate = {
            let mut gates = self.gates.borrow_mut();
            gates
                .iter()
                .position(|(gated, _)| *gated == op)
                .map(|idx| gates.remove(idx).1)
        };
        if let Some(wait) = gate {
            // A dropped sender releases the call as well.
            let _ = wait.await;
        }

        let mut failures = self.failures.borrow_mut();
        if let Some(idx) = failures.iter().position(|failing| *failing == op) {
            failures.remove(idx);
            return Err(GatewayError::Transport(format!("injected {op:?} failure")));
        }
        Ok(())
    }

    fn next_untitled_name(site: &Site) -> String {
        let taken = |name: &str| site.pages.iter().any(|p| p.name == name);
        let first = format!("{UNTITLED_STEM}.md");
        if !taken(&first) {
            return first;
        }
        (1..)
            .map(|n| format!("{UNTITLED_STEM}-{n}.md"))
            .find(|name| !taken(name))
            .unwrap_or(first)
    }
}

#[async_trait(?Send)]
impl ContentGateway for MemoryGateway {
    async fn list_pages(&self) -> Result<Vec<Page>, GatewayError> {
        self.enter(GatewayCall::ListPages).await?;
        Ok(self.site.borrow().pages.clone())
    }

    async fn list_files(&self) -> Result<Vec<SiteFile>, GatewayError> {
        self.enter(GatewayCall::ListFiles).await?;
        Ok(self
            .site
            .borrow()
            .files
            .iter()
            .map(StoredFile::listing)
            .collect())
    }

    async fn get_page(&self, name: &str) -> Result<Page, GatewayError> {
        self.enter(GatewayCall::GetPage(name.to_string())).await?;
        self.page(name)
            .ok_or_else(|| GatewayError::NotFound(name.to_string()))
    }

    async fn create_page(&self, page: &NewPage) -> Result<Page, GatewayError> {
        self.enter(GatewayCall::CreatePage).await?;
        let name = Self::next_untitled_name(&self.site.borrow());
        let created = Page::new(name, page.markdown.clone(), page.html.clone());
        self.put_page(created.clone());
        Ok(created)
    }

    async fn edit_page(&self, page: &Page) -> Result<(), GatewayError> {
        self.enter(GatewayCall::EditPage(page.name.clone())).await?;
        if self.page(&page.name).is_none() {
            return Err(GatewayError::NotFound(page.name.clone()));
        }
        self.put_page(page.clone());
        Ok(())
    }

    async fn rename_page(&self, old_name: &str, new_name: &str) -> Result<(), GatewayError> {
        self.enter(GatewayCall::RenamePage {
            from: old_name.to_string(),
            to: new_name.to_string(),
        })
        .await?;

        let mut site = self.site.borrow_mut();
        if old_name == INDEX_PAGE {
            return Err(GatewayError::Rejected(format!("{INDEX_PAGE} cannot be renamed")));
        }
        if site.pages.iter().any(|p| p.name == new_name) {
            return Err(GatewayError::Rejected(format!("{new_name} already exists")));
        }
        let page = site
            .pages
            .iter_mut()
            .find(|p| p.name == old_name)
            .ok_or_else(|| GatewayError::NotFound(old_name.to_string()))?;
        page.name = new_name.to_string();
        Ok(())
    }

    async fn rename_file(&self, old_name: &str, new_name: &str) -> Result<(), GatewayError> {
        self.enter(GatewayCall::RenameFile {
            from: old_name.to_string(),
            to: new_name.to_string(),
        })
        .await?;

        let mut site = self.site.borrow_mut();
        if site.files.iter().any(|f| f.name == new_name) {
            return Err(GatewayError::Rejected(format!("{new_name} already exists")));
        }
        let file = site
            .files
            .iter_mut()
            .find(|f| f.name == old_name)
            .ok_or_else(|| GatewayError::NotFound(old_name.to_string()))?;
        file.name = new_name.to_string();
        Ok(())
    }

    async fn delete_page(&self, page: &Page) -> Result<(), GatewayError> {
        self.enter(GatewayCall::DeletePage(page.name.clone())).await?;
        if page.is_index() {
            return Err(GatewayError::Rejected(format!("{INDEX_PAGE} cannot be deleted")));
        }
        let mut site = self.site.borrow_mut();
        let before = site.pages.len();
        site.pages.retain(|p| p.name != page.name);
        if site.pages.len() == before {
            return Err(GatewayError::NotFound(page.name.clone()));
        }
        Ok(())
    }

    async fn delete_file(&self, name: &str) -> Result<(), GatewayError> {
        self.enter(GatewayCall::DeleteFile(name.to_string())).await?;
        let mut site = self.site.borrow_mut();
        let before = site.files.len();
        site.files.retain(|f| f.name != name);
        if site.files.len() == before {
            return Err(GatewayError::NotFound(name.to_string()));
        }
        Ok(())
    }

    async fn upload_file(
        &self,
        name: &str,
        bytes: Vec<u8>,
        on_progress: &mut dyn FnMut(u8),
    ) -> Result<UploadResponse, GatewayError> {
        self.enter(GatewayCall::UploadFile(name.to_string())).await?;
        for tick in &self.upload_ticks {
            on_progress(*tick);
        }

        let size = bytes.len();
        if size > self.max_upload_bytes {
            return Ok(UploadResponse::rejected(UPLOAD_CODE_TOO_BIG));
        }

        let mut site = self.site.borrow_mut();
        let used: usize = site
            .files
            .iter()
            .filter(|f| f.name != name)
            .map(|f| f.size)
            .sum();
        if used + size > self.quota_bytes {
            return Ok(UploadResponse::rejected(UPLOAD_CODE_NO_SPACE));
        }

        site.files.retain(|f| f.name != name);
        site.files.push(StoredFile {
            name: name.to_string(),
            size,
        });
        Ok(UploadResponse::accepted())
    }

    async fn get_style(&self) -> Result<String, GatewayError> {
        self.enter(GatewayCall::GetStyle).await?;
        Ok(self.style())
    }

    async fn set_style(&self, style: &str) -> Result<(), GatewayError> {
        self.enter(GatewayCall::SetStyle(style.to_string())).await?;
        self.site.borrow_mut().style = style.to_string();
        Ok(())
    }

    fn listeners(&self) -> &ListenerRegistry {
        &self.listeners
    }
}
