//! Editor session controller
//!
//! Owns one [`SessionState`] for the lifetime of a mounted editor and
//! mediates every persistence call through the injected [`ContentGateway`].
//!
//! Chains that depend on an earlier call (save then fetch, delete then
//! refresh, rename then refresh) are plain sequential `async` code. Local
//! state is only committed once the gateway has confirmed. Every commit
//! after a suspension point goes through [`SessionCell::commit`], which
//! refuses to touch a session that was unmounted in the meantime.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use shared_types::{NewPage, Page, SiteFile, UploadRejection, UPLOAD_FAILED_MESSAGE};

use super::catalog::sanitize_filename;
use super::state::{ContextAction, ContextTarget, DialogState, SessionState};
use super::view::EditorView;
use crate::config::EditorConfig;
use crate::error::{EditorError, Result};
use crate::gateway::{ContentGateway, EditorEvent};
use crate::layout::{LayoutPolicy, Tab};
use crate::preview::PreviewRenderer;

pub const UNLOAD_PROMPT: &str = "You have unsaved changes. Are you sure you want to leave?";

/// Key that submits the rename dialog.
const SUBMIT_KEY: &str = "Enter";

/// Called with the new state after every transition.
pub type Observer = Rc<dyn Fn(&SessionState)>;

/// Work queued by host key bindings, drained by [`EditorSession::process_commands`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    Save,
}

/// A file picked for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Uploaded,
    /// The server refused the file; the dialog stays open with a message.
    Rejected(UploadRejection),
    /// Transport failure; the dialog shows the generic message.
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Created,
    Mounted,
    Unmounted,
}

struct SessionCell {
    lifecycle: Cell<Lifecycle>,
    state: RefCell<Option<SessionState>>,
    observers: RefCell<Vec<Observer>>,
    commands: RefCell<VecDeque<SessionCommand>>,
}

impl SessionCell {
    fn new() -> Self {
        Self {
            lifecycle: Cell::new(Lifecycle::Created),
            state: RefCell::new(None),
            observers: RefCell::new(Vec::new()),
            commands: RefCell::new(VecDeque::new()),
        }
    }

    fn read<T>(&self, f: impl FnOnce(&SessionState) -> T) -> Result<T> {
        self.state
            .borrow()
            .as_ref()
            .map(f)
            .ok_or(EditorError::Unmounted)
    }

    /// Replace the state with `f(state)` and notify observers. A torn-down
    /// session is left untouched.
    fn commit(&self, f: impl FnOnce(SessionState) -> SessionState) -> Result<()> {
        let next = {
            let mut slot = self.state.borrow_mut();
            let current = slot.take().ok_or(EditorError::Unmounted)?;
            let next = f(current);
            *slot = Some(next.clone());
            next
        };

        // Observers may subscribe or read the session themselves.
        let observers: Vec<Observer> = self.observers.borrow().iter().cloned().collect();
        for observer in observers {
            observer(&next);
        }
        Ok(())
    }
}

pub struct EditorSession<G: ContentGateway + ?Sized> {
    gateway: Rc<G>,
    renderer: PreviewRenderer,
    layout: LayoutPolicy,
    owner_tag: String,
    cell: Rc<SessionCell>,
}

impl<G: ContentGateway + ?Sized> EditorSession<G> {
    pub fn new(gateway: Rc<G>, config: &EditorConfig) -> Self {
        Self {
            gateway,
            renderer: PreviewRenderer::new(config.site_base_url.clone()),
            layout: config.layout,
            owner_tag: config.owner_tag.clone(),
            cell: Rc::new(SessionCell::new()),
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Create the session state, install host listeners and hydrate pages,
    /// files and style. The three loads run concurrently and each commits
    /// its own fields as it resolves.
    pub async fn mount(&self) -> Result<()> {
        match self.cell.lifecycle.get() {
            Lifecycle::Unmounted => return Err(EditorError::Unmounted),
            Lifecycle::Mounted => {
                tracing::debug!(owner = %self.owner_tag, "Editor session already mounted");
                return Ok(());
            }
            Lifecycle::Created => {}
        }

        self.cell.lifecycle.set(Lifecycle::Mounted);
        *self.cell.state.borrow_mut() = Some(SessionState::default());
        self.register_listeners();
        tracing::info!(owner = %self.owner_tag, "Editor session mounted");

        let (pages, files, ()) = futures::join!(self.load_pages(), self.load_files(), self.load_style());
        pages?;
        files?;
        Ok(())
    }

    async fn load_pages(&self) -> Result<()> {
        let pages = self.gateway.list_pages().await?;
        tracing::debug!(count = pages.len(), "Loaded pages");
        self.cell.commit(|s| s.with_initial_pages(pages))
    }

    async fn load_files(&self) -> Result<()> {
        let files = self.gateway.list_files().await?;
        tracing::debug!(count = files.len(), "Loaded files");
        self.cell.commit(|s| s.with_files(files))
    }

    async fn load_style(&self) {
        match self.gateway.get_style().await {
            Ok(style) => {
                let _ = self.cell.commit(|s| s.with_style(style));
            }
            Err(e) => tracing::warn!(error = %e, "Failed to load site style; keeping default"),
        }
    }

    fn register_listeners(&self) {
        let cell = Rc::downgrade(&self.cell);
        self.gateway.add_listener(
            EditorEvent::Save,
            &self.owner_tag,
            Rc::new(move || {
                if let Some(cell) = cell.upgrade() {
                    cell.commands.borrow_mut().push_back(SessionCommand::Save);
                }
                None
            }),
        );

        let cell = Rc::downgrade(&self.cell);
        self.gateway.add_listener(
            EditorEvent::WindowUnload,
            &self.owner_tag,
            Rc::new(move || unload_prompt(&cell)),
        );

        let cell = Rc::downgrade(&self.cell);
        self.gateway.add_listener(
            EditorEvent::EscapeKeyPressed,
            &self.owner_tag,
            Rc::new(move || {
                if let Some(cell) = cell.upgrade() {
                    let _ = cell.commit(SessionState::dismiss_dialog);
                }
                None
            }),
        );
    }

    /// Release this session's listeners and drop its state. In-flight
    /// gateway calls keep running but can no longer commit.
    pub fn unmount(&self) {
        if self.cell.lifecycle.replace(Lifecycle::Unmounted) != Lifecycle::Mounted {
            return;
        }
        self.gateway.remove_listeners(&self.owner_tag);
        self.cell.state.borrow_mut().take();
        self.cell.commands.borrow_mut().clear();
        tracing::info!(owner = %self.owner_tag, "Editor session unmounted");
    }

    pub fn is_mounted(&self) -> bool {
        self.cell.lifecycle.get() == Lifecycle::Mounted
    }

    // ------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------

    pub fn snapshot(&self) -> Option<SessionState> {
        self.cell.state.borrow().clone()
    }

    pub fn view(&self) -> Option<EditorView> {
        self.cell
            .read(|s| EditorView::derive(s, &self.layout))
            .ok()
    }

    pub fn subscribe(&self, observer: impl Fn(&SessionState) + 'static) {
        self.cell.observers.borrow_mut().push(Rc::new(observer));
    }

    /// Leave-page confirmation, present only while edits are unsaved.
    pub fn unload_prompt(&self) -> Option<String> {
        unload_prompt(&Rc::downgrade(&self.cell))
    }

    pub fn small_display(&self) -> bool {
        self.cell
            .read(|s| self.layout.is_small(s.container_width))
            .unwrap_or(false)
    }

    pub fn micro_display(&self) -> bool {
        self.cell
            .read(|s| self.layout.is_micro(s.container_width))
            .unwrap_or(false)
    }

    // ------------------------------------------------------------------
    // Editing and navigation
    // ------------------------------------------------------------------

    /// Re-render the preview for `markdown`. Synchronous, no I/O.
    ///
    /// Refused with [`EditorError::NoSelection`] while no page is open.
    pub fn on_text_changed(&self, markdown: &str) -> Result<()> {
        if self.cell.read(|s| s.selected_page.is_none())? {
            return Err(EditorError::NoSelection);
        }
        let html = self.renderer.render(markdown);
        let markdown = markdown.to_string();
        self.cell.commit(|s| s.with_edited_text(markdown, html))
    }

    /// Persist the open page with the current editor text.
    pub async fn save(&self) -> Result<()> {
        let page = self
            .cell
            .read(SessionState::page_to_save)?
            .ok_or(EditorError::NoSelection)?;

        tracing::debug!(page = %page.name, "Saving page");
        if let Err(e) = self.gateway.edit_page(&page).await {
            tracing::warn!(page = %page.name, error = %e, "Failed to save page");
            return Err(e.into());
        }
        self.cell.commit(|s| s.with_saved_page(page))
    }

    /// Open `name`, saving the current page first. The fetch starts only
    /// after the save has settled.
    pub async fn select_page(&self, name: &str) -> Result<()> {
        let (already_open, has_selection) = self
            .cell
            .read(|s| (s.is_selected(name), s.selected_page.is_some()))?;
        if already_open {
            return Ok(());
        }
        if has_selection {
            self.save().await?;
        }

        let page = self.gateway.get_page(name).await?;
        tracing::debug!(page = %page.name, "Opened page");
        self.cell.commit(|s| s.with_opened_page(page))
    }

    /// Hook for clicks in the file list. Files have no in-editor view.
    pub fn click_file(&self, file: &SiteFile) {
        tracing::debug!(file = %file.name, "File clicked");
    }

    pub async fn add_new_page(&self) -> Result<()> {
        if self.cell.read(|s| s.unsaved_changes)? {
            self.save().await?;
        }

        let created = self.gateway.create_page(&NewPage::default()).await?;
        tracing::info!(page = %created.name, "Created page");
        let pages = self.gateway.list_pages().await?;
        self.cell
            .commit(|s| s.with_pages(pages).with_opened_page(created))
    }

    pub async fn set_style(&self, style: &str) -> Result<()> {
        self.gateway.set_style(style).await?;
        tracing::info!(style, "Site style changed");
        let style = style.to_string();
        self.cell.commit(|s| s.with_style(style))
    }

    /// Run commands queued by key bindings. Returns how many ran.
    pub async fn process_commands(&self) -> Result<usize> {
        let mut processed = 0;
        loop {
            let next = self.cell.commands.borrow_mut().pop_front();
            match next {
                Some(SessionCommand::Save) => self.save().await?,
                None => return Ok(processed),
            }
            processed += 1;
        }
    }

    // ------------------------------------------------------------------
    // Context menu, rename and delete
    // ------------------------------------------------------------------

    pub fn open_context_action(&self, action: ContextAction, target: ContextTarget) -> Result<()> {
        self.cell
            .commit(|s| s.with_context_action(action, target))
    }

    pub fn dismiss_dialog(&self) -> Result<()> {
        self.cell.commit(SessionState::dismiss_dialog)
    }

    /// Keystroke in the rename input; the value is sanitised as typed.
    pub fn type_rename(&self, raw: &str) -> Result<()> {
        if !self.cell.read(SessionState::show_rename_popover)? {
            return Err(EditorError::NoDialog("rename"));
        }
        let value = sanitize_filename(raw);
        self.cell.commit(|s| s.with_rename_value(value))
    }

    pub async fn rename_key_pressed(&self, key: &str) -> Result<()> {
        if key == SUBMIT_KEY {
            self.submit_rename().await
        } else {
            Ok(())
        }
    }

    pub async fn submit_rename(&self) -> Result<()> {
        let (target, value) = self
            .cell
            .read(|s| match &s.dialog {
                DialogState::Rename { target, value } => Some((target.clone(), value.clone())),
                _ => None,
            })?
            .ok_or(EditorError::NoDialog("rename"))?;
        let new_name = sanitize_filename(&value);
        let old_name = target.name().to_string();

        match target {
            ContextTarget::Page(_) => {
                if let Err(e) = self.gateway.rename_page(&old_name, &new_name).await {
                    tracing::warn!(from = %old_name, to = %new_name, error = %e, "Failed to rename page");
                    return Err(e.into());
                }
                tracing::info!(from = %old_name, to = %new_name, "Renamed page");
                self.cell.commit(|s| {
                    s.without_rename_dialog()
                        .with_page_renamed(&old_name, &new_name)
                })?;
                let pages = self.gateway.list_pages().await?;
                self.cell.commit(|s| s.with_pages(pages))
            }
            ContextTarget::File(_) => {
                if let Err(e) = self.gateway.rename_file(&old_name, &new_name).await {
                    tracing::warn!(from = %old_name, to = %new_name, error = %e, "Failed to rename file");
                    return Err(e.into());
                }
                tracing::info!(from = %old_name, to = %new_name, "Renamed file");
                self.cell.commit(SessionState::without_rename_dialog)?;
                let files = self.gateway.list_files().await?;
                self.cell.commit(|s| s.with_files(files))
            }
        }
    }

    /// "Yes" in the delete dialog.
    pub async fn confirm_delete(&self) -> Result<()> {
        let target = self
            .cell
            .read(|s| match &s.dialog {
                DialogState::Delete(target) => Some(target.clone()),
                _ => None,
            })?
            .ok_or(EditorError::NoDialog("delete"))?;

        match target {
            ContextTarget::Page(page) => self.delete_page(&page).await,
            ContextTarget::File(file) => self.delete_file(&file).await,
        }
    }

    /// Delete `page` and refresh the listing. A deleted selection moves to
    /// the first remaining page. The last page is never deleted.
    pub async fn delete_page(&self, page: &Page) -> Result<()> {
        let last_page = self
            .cell
            .read(|s| s.pages.iter().all(|p| p.name == page.name))?;
        if last_page {
            tracing::warn!(page = %page.name, "Refusing to delete the only page");
            return self.cell.commit(SessionState::without_delete_dialog);
        }

        if let Err(e) = self.gateway.delete_page(page).await {
            tracing::warn!(page = %page.name, error = %e, "Failed to delete page");
            return Err(e.into());
        }
        tracing::info!(page = %page.name, "Deleted page");

        let pages = self.gateway.list_pages().await?;
        // Selection is read at commit time, not before the delete.
        let mut reopen = None;
        self.cell.commit(|s| {
            let was_selected = s.is_selected(&page.name);
            let next = s
                .with_page_deleted(&page.name, pages)
                .without_delete_dialog();
            if was_selected {
                reopen = next.selected_name().map(str::to_string);
            }
            next
        })?;

        // The listing may carry stale content; load the new selection.
        let Some(next) = reopen else {
            return Ok(());
        };
        let fresh = self.gateway.get_page(&next).await?;
        self.cell.commit(|s| {
            if s.is_selected(&fresh.name) && !s.unsaved_changes {
                s.with_opened_page(fresh)
            } else {
                s
            }
        })
    }

    pub async fn delete_file(&self, file: &SiteFile) -> Result<()> {
        if let Err(e) = self.gateway.delete_file(&file.name).await {
            tracing::warn!(file = %file.name, error = %e, "Failed to delete file");
            return Err(e.into());
        }
        tracing::info!(file = %file.name, "Deleted file");

        let files = self.gateway.list_files().await?;
        self.cell
            .commit(|s| s.with_files(files).without_delete_dialog())
    }

    // ------------------------------------------------------------------
    // Upload
    // ------------------------------------------------------------------

    pub fn open_upload_dialog(&self) -> Result<()> {
        self.cell.commit(SessionState::with_upload_dialog)
    }

    /// Upload through the open dialog. Progress ticks are shown as
    /// reported. Rejections and transport failures keep the dialog open
    /// with a message; success refreshes the file list and closes it.
    pub async fn upload_file(&self, upload: FileUpload) -> Result<UploadOutcome> {
        if !self.cell.read(SessionState::show_upload_popover)? {
            return Err(EditorError::NoDialog("upload"));
        }

        let cell = Rc::clone(&self.cell);
        let mut on_progress = move |percent: u8| {
            let _ = cell.commit(|s| s.with_upload_progress(percent));
        };
        let FileUpload { name, bytes } = upload;
        tracing::debug!(file = %name, size = bytes.len(), "Uploading file");

        let response = match self
            .gateway
            .upload_file(&name, bytes, &mut on_progress)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(file = %name, error = %e, "Upload failed");
                self.cell
                    .commit(|s| s.with_upload_error(UPLOAD_FAILED_MESSAGE.to_string()))?;
                return Ok(UploadOutcome::Failed(e.to_string()));
            }
        };

        if let Some(rejection) = response.rejection() {
            tracing::warn!(file = %name, code = rejection.code(), "Upload rejected");
            let message = rejection.user_message();
            self.cell.commit(|s| s.with_upload_error(message))?;
            return Ok(UploadOutcome::Rejected(rejection));
        }

        tracing::info!(file = %name, "Uploaded file");
        let files = self.gateway.list_files().await?;
        self.cell
            .commit(|s| s.with_files(files).without_upload_dialog())?;
        Ok(UploadOutcome::Uploaded)
    }

    // ------------------------------------------------------------------
    // Layout
    // ------------------------------------------------------------------

    pub fn click_tab(&self, tab: Tab) -> Result<()> {
        let layout = self.layout;
        self.cell.commit(|s| s.with_tab_clicked(tab, &layout))
    }

    pub fn resize(&self, container_width: u32) -> Result<()> {
        self.cell
            .commit(|s| s.with_container_width(container_width))
    }
}

impl<G: ContentGateway + ?Sized> Drop for EditorSession<G> {
    fn drop(&mut self) {
        self.unmount();
    }
}

fn unload_prompt(cell: &Weak<SessionCell>) -> Option<String> {
    let cell = cell.upgrade()?;
    cell.read(|s| s.unsaved_changes)
        .ok()
        .filter(|dirty| *dirty)
        .map(|_| UNLOAD_PROMPT.to_string())
}
