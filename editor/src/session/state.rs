//! Editor session state and its transitions
//!
//! Transitions consume the current state and return the next one; nothing
//! is mutated in place. The selected page and its entry in `pages` are
//! separate values, so renaming or saving one never aliases the other.

use shared_types::{Page, SiteFile, DEFAULT_STYLE};
use strum::{AsRefStr, Display};

use super::catalog::{sort_files, sort_pages};
use crate::layout::{LayoutPolicy, PaneVisibility, Tab, DEFAULT_CONTAINER_WIDTH};

/// Kind of item a context action targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum TargetKind {
    Page,
    File,
}

/// Item a rename/delete was invoked on. May differ from the selected page.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextTarget {
    Page(Page),
    File(SiteFile),
}

impl ContextTarget {
    pub fn name(&self) -> &str {
        match self {
            ContextTarget::Page(page) => &page.name,
            ContextTarget::File(file) => &file.name,
        }
    }

    pub fn kind(&self) -> TargetKind {
        match self {
            ContextTarget::Page(_) => TargetKind::Page,
            ContextTarget::File(_) => TargetKind::File,
        }
    }
}

/// Context menu entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum ContextAction {
    Rename,
    Delete,
}

/// The open dialog, if any. At most one can be open.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DialogState {
    #[default]
    None,
    Rename {
        target: ContextTarget,
        value: String,
    },
    Delete(ContextTarget),
    Upload {
        progress: u8,
        error: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub pages: Vec<Page>,
    pub files: Vec<SiteFile>,
    /// Open document as last persisted; edits live in `markdown`/`html`
    pub selected_page: Option<Page>,
    pub markdown: String,
    pub html: String,
    pub unsaved_changes: bool,
    pub panes: PaneVisibility,
    pub container_width: u32,
    pub dialog: DialogState,
    pub style: String,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            pages: Vec::new(),
            files: Vec::new(),
            selected_page: None,
            markdown: String::new(),
            html: String::new(),
            unsaved_changes: false,
            panes: PaneVisibility::default(),
            container_width: DEFAULT_CONTAINER_WIDTH,
            dialog: DialogState::None,
            style: DEFAULT_STYLE.to_string(),
        }
    }
}

impl SessionState {
    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn selected_name(&self) -> Option<&str> {
        self.selected_page.as_ref().map(|p| p.name.as_str())
    }

    pub fn is_selected(&self, name: &str) -> bool {
        self.selected_name() == Some(name)
    }

    /// The page as it would be persisted right now.
    pub fn page_to_save(&self) -> Option<Page> {
        self.selected_page
            .as_ref()
            .map(|page| Page::new(page.name.clone(), self.markdown.clone(), self.html.clone()))
    }

    pub fn show_rename_popover(&self) -> bool {
        matches!(self.dialog, DialogState::Rename { .. })
    }

    pub fn show_delete_page_popover(&self) -> bool {
        matches!(self.dialog, DialogState::Delete(ContextTarget::Page(_)))
    }

    pub fn show_delete_file_popover(&self) -> bool {
        matches!(self.dialog, DialogState::Delete(ContextTarget::File(_)))
    }

    pub fn show_upload_popover(&self) -> bool {
        matches!(self.dialog, DialogState::Upload { .. })
    }

    fn context_target(&self) -> Option<&ContextTarget> {
        match &self.dialog {
            DialogState::Rename { target, .. } | DialogState::Delete(target) => Some(target),
            _ => None,
        }
    }

    pub fn context_page(&self) -> Option<&Page> {
        match self.context_target() {
            Some(ContextTarget::Page(page)) => Some(page),
            _ => None,
        }
    }

    pub fn context_file(&self) -> Option<&SiteFile> {
        match self.context_target() {
            Some(ContextTarget::File(file)) => Some(file),
            _ => None,
        }
    }

    pub fn rename_value(&self) -> Option<&str> {
        match &self.dialog {
            DialogState::Rename { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn upload_progress(&self) -> u8 {
        match self.dialog {
            DialogState::Upload { progress, .. } => progress,
            _ => 0,
        }
    }

    pub fn upload_error(&self) -> Option<&str> {
        match &self.dialog {
            DialogState::Upload { error, .. } => error.as_deref(),
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Collections and selection
    // ------------------------------------------------------------------

    /// Initial page load: adopt the listing and open its first page.
    pub fn with_initial_pages(self, pages: Vec<Page>) -> Self {
        let state = self.with_pages(pages);
        match state.pages.first().cloned() {
            Some(first) => state.with_opened_page(first),
            None => state,
        }
    }

    pub fn with_pages(mut self, mut pages: Vec<Page>) -> Self {
        sort_pages(&mut pages);
        self.pages = pages;
        self
    }

    pub fn with_files(mut self, mut files: Vec<SiteFile>) -> Self {
        sort_files(&mut files);
        self.files = files;
        self
    }

    /// Make `page` the open document with its content in the editor.
    pub fn with_opened_page(mut self, page: Page) -> Self {
        self.markdown = page.markdown.clone();
        self.html = page.html.clone();
        self.selected_page = Some(page);
        self.unsaved_changes = false;
        self
    }

    fn with_no_selection(mut self) -> Self {
        self.selected_page = None;
        self.markdown.clear();
        self.html.clear();
        self.unsaved_changes = false;
        self
    }

    /// Nothing is dirty without an open page: there is nowhere to save to.
    pub fn with_edited_text(mut self, markdown: String, html: String) -> Self {
        self.unsaved_changes = self
            .selected_page
            .as_ref()
            .is_some_and(|page| page.markdown != markdown);
        self.markdown = markdown;
        self.html = html;
        self
    }

    /// `saved` is now the persisted version. Edits typed while the save was
    /// in flight keep the session dirty.
    pub fn with_saved_page(mut self, saved: Page) -> Self {
        if let Some(entry) = self.pages.iter_mut().find(|p| p.name == saved.name) {
            *entry = saved.clone();
        }
        if self.is_selected(&saved.name) {
            self.unsaved_changes = self.markdown != saved.markdown;
            self.selected_page = Some(saved);
        }
        self
    }

    /// A page was renamed on the server. Mirrors the rename into `pages`
    /// and the selection until the next listing replaces them.
    pub fn with_page_renamed(mut self, old_name: &str, new_name: &str) -> Self {
        let mut pages = std::mem::take(&mut self.pages);
        for page in pages.iter_mut().filter(|p| p.name == old_name) {
            *page = page.renamed(new_name);
        }
        if let Some(selected) = self.selected_page.take() {
            self.selected_page = Some(if selected.name == old_name {
                selected.renamed(new_name)
            } else {
                selected
            });
        }
        self.with_pages(pages)
    }

    /// Adopt the listing taken after `deleted` went away. A deleted
    /// selection moves to the first remaining page.
    pub fn with_page_deleted(self, deleted: &str, pages: Vec<Page>) -> Self {
        let was_selected = self.is_selected(deleted);
        let state = self.with_pages(pages);
        if !was_selected {
            return state;
        }
        match state.pages.first().cloned() {
            Some(first) => state.with_opened_page(first),
            None => state.with_no_selection(),
        }
    }

    // ------------------------------------------------------------------
    // Dialogs
    // ------------------------------------------------------------------

    pub fn with_context_action(mut self, action: ContextAction, target: ContextTarget) -> Self {
        self.dialog = match action {
            ContextAction::Rename => DialogState::Rename {
                value: target.name().to_string(),
                target,
            },
            ContextAction::Delete => DialogState::Delete(target),
        };
        self
    }

    pub fn with_rename_value(mut self, sanitized: String) -> Self {
        if let DialogState::Rename { value, .. } = &mut self.dialog {
            *value = sanitized;
        }
        self
    }

    pub fn with_upload_dialog(mut self) -> Self {
        self.dialog = DialogState::Upload {
            progress: 0,
            error: None,
        };
        self
    }

    /// Progress for an open upload dialog; ignored otherwise.
    pub fn with_upload_progress(mut self, percent: u8) -> Self {
        if let DialogState::Upload { progress, .. } = &mut self.dialog {
            *progress = percent.min(100);
        }
        self
    }

    pub fn with_upload_error(mut self, message: String) -> Self {
        if let DialogState::Upload { error, .. } = &mut self.dialog {
            *error = Some(message);
        }
        self
    }

    pub fn dismiss_dialog(mut self) -> Self {
        self.dialog = DialogState::None;
        self
    }

    pub fn without_rename_dialog(self) -> Self {
        if self.show_rename_popover() {
            self.dismiss_dialog()
        } else {
            self
        }
    }

    pub fn without_delete_dialog(self) -> Self {
        if matches!(self.dialog, DialogState::Delete(_)) {
            self.dismiss_dialog()
        } else {
            self
        }
    }

    pub fn without_upload_dialog(self) -> Self {
        if self.show_upload_popover() {
            self.dismiss_dialog()
        } else {
            self
        }
    }

    // ------------------------------------------------------------------
    // Layout and style
    // ------------------------------------------------------------------

    pub fn with_tab_clicked(mut self, tab: Tab, policy: &LayoutPolicy) -> Self {
        let small = policy.is_small(self.container_width);
        self.panes = self.panes.click(tab, small);
        self
    }

    pub fn with_container_width(mut self, width: u32) -> Self {
        self.container_width = width;
        self
    }

    pub fn with_style(mut self, style: String) -> Self {
        self.style = style;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded(names: &[&str]) -> SessionState {
        let pages = names
            .iter()
            .map(|n| Page::new(*n, format!("# {n}"), ""))
            .collect();
        SessionState::default().with_initial_pages(pages)
    }

    #[test]
    fn test_initial_pages_open_first_sorted() {
        let state = loaded(&["b.md", "index.md", "a.md"]);
        assert_eq!(state.selected_name(), Some("index.md"));
        assert_eq!(state.markdown, "# index.md");
        assert!(!state.unsaved_changes);
    }

    #[test]
    fn test_edit_tracks_dirty_against_persisted() {
        let state = loaded(&["index.md"]);
        let dirty = state.with_edited_text("# changed".into(), "<h1>changed</h1>".into());
        assert!(dirty.unsaved_changes);
        let clean = dirty.with_edited_text("# index.md".into(), String::new());
        assert!(!clean.unsaved_changes);
    }

    #[test]
    fn test_edit_without_selection_stays_clean() {
        let state = SessionState::default().with_edited_text("hello".into(), String::new());
        assert!(!state.unsaved_changes);
        assert!(state.page_to_save().is_none());
    }

    #[test]
    fn test_save_with_newer_edits_stays_dirty() {
        let state = loaded(&["index.md"]).with_edited_text("v2".into(), String::new());
        let snapshot = state.page_to_save().unwrap();
        let state = state.with_edited_text("v3".into(), String::new());
        let state = state.with_saved_page(snapshot);
        assert!(state.unsaved_changes);
        assert_eq!(state.selected_page.as_ref().unwrap().markdown, "v2");
        assert_eq!(state.pages[0].markdown, "v2");
    }

    #[test]
    fn test_rename_updates_selection_and_listing() {
        let state = loaded(&["index.md", "a.md"]).with_opened_page(Page::new("a.md", "# a", ""));
        let state = state.with_page_renamed("a.md", "zz.md");
        assert_eq!(state.selected_name(), Some("zz.md"));
        assert_eq!(state.selected_page.as_ref().unwrap().markdown, "# a");
        let names: Vec<&str> = state.pages.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["index.md", "zz.md"]);
    }

    #[test]
    fn test_deleting_selection_opens_first_remaining() {
        let state = loaded(&["a.md", "b.md"]);
        assert_eq!(state.selected_name(), Some("b.md"));
        let state = state.with_opened_page(Page::new("a.md", "# a.md", ""));
        let state = state.with_page_deleted("a.md", vec![Page::new("b.md", "# b.md", "")]);
        assert_eq!(state.selected_name(), Some("b.md"));
        assert_eq!(state.markdown, "# b.md");
    }

    #[test]
    fn test_deleting_everything_clears_selection() {
        let state = loaded(&["a.md"]).with_page_deleted("a.md", Vec::new());
        assert!(state.selected_page.is_none());
        assert!(state.markdown.is_empty());
    }

    #[test]
    fn test_context_actions_route_to_one_dialog() {
        let page = Page::new("a.md", "", "");
        let state = SessionState::default()
            .with_context_action(ContextAction::Rename, ContextTarget::Page(page.clone()));
        assert!(state.show_rename_popover());
        assert_eq!(state.rename_value(), Some("a.md"));
        assert_eq!(state.context_page(), Some(&page));

        let file = SiteFile::new("cat.png");
        let state = state.with_context_action(ContextAction::Delete, ContextTarget::File(file.clone()));
        assert!(!state.show_rename_popover());
        assert!(state.show_delete_file_popover());
        assert!(!state.show_delete_page_popover());
        assert_eq!(state.context_file(), Some(&file));
    }

    #[test]
    fn test_upload_dialog_resets_on_reopen() {
        let state = SessionState::default()
            .with_upload_dialog()
            .with_upload_progress(60)
            .with_upload_error("nope".into());
        assert_eq!(state.upload_progress(), 60);
        assert_eq!(state.upload_error(), Some("nope"));

        let reopened = state.dismiss_dialog().with_upload_dialog();
        assert_eq!(reopened.upload_progress(), 0);
        assert_eq!(reopened.upload_error(), None);
    }

    #[test]
    fn test_progress_ignored_without_upload_dialog() {
        let state = SessionState::default().with_upload_progress(50);
        assert_eq!(state.dialog, DialogState::None);
    }
}
