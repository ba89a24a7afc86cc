//! Derived view model
//!
//! Everything the host needs to draw the editor, computed from a state
//! snapshot and the layout policy. Deriving never touches the session.

use std::ops::Range;

use super::state::{DialogState, SessionState, TargetKind};
use crate::layout::{LayoutPolicy, Tab, VisiblePanes};

const PREVIEW_TAB_LABEL: &str = "preview";
/// Characters left out of the rename selection (".md", ".js", ...).
const EXTENSION_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabView {
    pub tab: Tab,
    pub label: String,
    pub selected: bool,
    /// Dot next to the label while the open page has unsaved edits
    pub indicator: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogView {
    Hidden,
    Rename {
        kind: TargetKind,
        from: String,
        value: String,
        /// Initial text selection inside the rename input
        selection: Range<usize>,
    },
    Delete {
        kind: TargetKind,
        name: String,
    },
    Upload {
        progress: u8,
        error: Option<String>,
    },
}

impl DialogView {
    fn derive(dialog: &DialogState) -> Self {
        match dialog {
            DialogState::None => DialogView::Hidden,
            DialogState::Rename { target, value } => DialogView::Rename {
                kind: target.kind(),
                from: target.name().to_string(),
                value: value.clone(),
                selection: rename_selection(value),
            },
            DialogState::Delete(target) => DialogView::Delete {
                kind: target.kind(),
                name: target.name().to_string(),
            },
            DialogState::Upload { progress, error } => DialogView::Upload {
                progress: *progress,
                error: error.clone(),
            },
        }
    }

    pub fn is_visible(&self) -> bool {
        !matches!(self, DialogView::Hidden)
    }
}

/// Select the stem so typing replaces the name but keeps the extension.
pub fn rename_selection(name: &str) -> Range<usize> {
    let end = name.chars().count().saturating_sub(EXTENSION_LEN);
    let end = name.char_indices().nth(end).map_or(name.len(), |(i, _)| i);
    0..end
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorView {
    pub tree_collapsed: bool,
    pub single_pane: bool,
    pub editor_tab: TabView,
    pub preview_tab: TabView,
    pub tab_spacer: bool,
    pub save_button: bool,
    pub panes: VisiblePanes,
    pub dialog: DialogView,
    pub style: String,
}

impl EditorView {
    pub fn derive(state: &SessionState, policy: &LayoutPolicy) -> Self {
        let small = policy.is_small(state.container_width);
        let label = state.selected_name().unwrap_or_default().to_string();

        Self {
            tree_collapsed: policy.is_micro(state.container_width),
            single_pane: small,
            editor_tab: TabView {
                tab: Tab::Editor,
                label,
                selected: state.panes.editor,
                indicator: state.unsaved_changes,
            },
            preview_tab: TabView {
                tab: Tab::Preview,
                label: PREVIEW_TAB_LABEL.to_string(),
                selected: state.panes.preview,
                indicator: false,
            },
            tab_spacer: state.panes.tab_spacer(small),
            save_button: state.unsaved_changes,
            panes: state.panes.rendered(small),
            dialog: DialogView::derive(&state.dialog),
            style: state.style.clone(),
        }
    }

    /// Name the open dialog is about, if it targets a page or file.
    pub fn dialog_subject(&self) -> Option<&str> {
        match &self.dialog {
            DialogView::Rename { from, .. } => Some(from),
            DialogView::Delete { name, .. } => Some(name),
            _ => None,
        }
    }
}
