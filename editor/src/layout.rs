//! Responsive display-mode policy
//!
//! Pure functions of the container width. Nothing here holds state; the
//! session stores the width and the pane flags and asks this module what
//! they mean.

use strum::{AsRefStr, Display, EnumString};

/// Below this width only one of editor/preview is shown at a time.
pub const SMALL_DISPLAY_BELOW: u32 = 1160;
/// Below this width the page/file tree collapses when inactive.
pub const MICRO_DISPLAY_BELOW: u32 = 715;
/// Width assumed until the host reports a measurement.
pub const DEFAULT_CONTAINER_WIDTH: u32 = 1280;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutPolicy {
    pub small_below: u32,
    pub micro_below: u32,
}

impl Default for LayoutPolicy {
    fn default() -> Self {
        Self {
            small_below: SMALL_DISPLAY_BELOW,
            micro_below: MICRO_DISPLAY_BELOW,
        }
    }
}

impl LayoutPolicy {
    /// Single-pane mode.
    pub fn is_small(&self, container_width: u32) -> bool {
        container_width < self.small_below
    }

    /// Tree-collapse mode.
    pub fn is_micro(&self, container_width: u32) -> bool {
        container_width < self.micro_below
    }
}

/// The two tabs above the editing area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum Tab {
    Editor,
    Preview,
}

/// Which panes the user wants visible.
///
/// In wide mode at least one flag is always set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaneVisibility {
    pub editor: bool,
    pub preview: bool,
}

impl Default for PaneVisibility {
    fn default() -> Self {
        Self {
            editor: true,
            preview: true,
        }
    }
}

/// Panes actually rendered for a given mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisiblePanes {
    pub editor: bool,
    pub preview: bool,
}

impl PaneVisibility {
    /// Result of clicking `tab`.
    ///
    /// Small mode switches exclusively. Wide mode toggles, but refuses a
    /// toggle that would leave nothing visible.
    pub fn click(self, tab: Tab, small: bool) -> Self {
        if small {
            return Self {
                editor: tab == Tab::Editor,
                preview: tab == Tab::Preview,
            };
        }

        match tab {
            Tab::Editor if self.preview || !self.editor => Self {
                editor: !self.editor,
                ..self
            },
            Tab::Preview if self.editor || !self.preview => Self {
                preview: !self.preview,
                ..self
            },
            _ => self,
        }
    }

    /// In small mode the preview wins whenever it is visible.
    pub fn rendered(self, small: bool) -> VisiblePanes {
        if small {
            VisiblePanes {
                editor: !self.preview,
                preview: self.preview,
            }
        } else {
            VisiblePanes {
                editor: self.editor,
                preview: self.preview,
            }
        }
    }

    /// Spacer between the two tabs; only when both panes sit side by side.
    pub fn tab_spacer(self, small: bool) -> bool {
        !small && self.editor && self.preview
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOTH: PaneVisibility = PaneVisibility {
        editor: true,
        preview: true,
    };

    #[test]
    fn test_thresholds() {
        let policy = LayoutPolicy::default();
        assert!(!policy.is_small(1160));
        assert!(policy.is_small(1159));
        assert!(!policy.is_micro(715));
        assert!(policy.is_micro(714));
        assert!(policy.is_small(714));
    }

    #[test]
    fn test_small_mode_switches_exclusively() {
        let editor = BOTH.click(Tab::Editor, true);
        assert_eq!(
            editor,
            PaneVisibility {
                editor: true,
                preview: false
            }
        );
        let preview = editor.click(Tab::Preview, true);
        assert_eq!(
            preview,
            PaneVisibility {
                editor: false,
                preview: true
            }
        );
    }

    #[test]
    fn test_wide_mode_toggles_independently() {
        let no_preview = BOTH.click(Tab::Preview, false);
        assert!(no_preview.editor);
        assert!(!no_preview.preview);
        assert_eq!(no_preview.click(Tab::Preview, false), BOTH);
    }

    #[test]
    fn test_wide_mode_keeps_last_visible_pane() {
        let only_editor = BOTH.click(Tab::Preview, false);
        assert_eq!(only_editor.click(Tab::Editor, false), only_editor);

        let only_preview = BOTH.click(Tab::Editor, false);
        assert_eq!(only_preview.click(Tab::Preview, false), only_preview);
    }

    #[test]
    fn test_wide_toggles_never_hide_everything() {
        let clicks = [Tab::Editor, Tab::Preview, Tab::Preview, Tab::Editor, Tab::Editor, Tab::Preview];
        let mut panes = BOTH;
        for tab in clicks.iter().cycle().take(60) {
            panes = panes.click(*tab, false);
            assert!(panes.editor || panes.preview);
        }
    }

    #[test]
    fn test_small_mode_renders_preview_when_visible() {
        assert_eq!(
            BOTH.rendered(true),
            VisiblePanes {
                editor: false,
                preview: true
            }
        );
        assert!(!BOTH.tab_spacer(true));
        assert!(BOTH.tab_spacer(false));
    }

    #[test]
    fn test_tab_names() {
        assert_eq!(Tab::Editor.to_string(), "editor");
        assert_eq!("preview".parse::<Tab>().unwrap(), Tab::Preview);
    }
}
