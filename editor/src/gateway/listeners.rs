//! Host event hooks keyed by owner tag

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use strum::{AsRefStr, Display, EnumString};

/// Events the host shell forwards to the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
pub enum EditorEvent {
    #[strum(serialize = "ctrl+s")]
    Save,
    #[strum(serialize = "windowUnload")]
    WindowUnload,
    #[strum(serialize = "escapeKeyPressed")]
    EscapeKeyPressed,
}

/// A handler may answer with a message; `windowUnload` uses it as the
/// leave-page confirmation prompt.
pub type Listener = Rc<dyn Fn() -> Option<String>>;

struct Registration {
    event: EditorEvent,
    owner: String,
    handler: Listener,
}

#[derive(Default)]
pub struct ListenerRegistry {
    registrations: RefCell<Vec<Registration>>,
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registrations = self.registrations.borrow();
        f.debug_list()
            .entries(registrations.iter().map(|r| (r.event, r.owner.as_str())))
            .finish()
    }
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, event: EditorEvent, owner: &str, handler: Listener) {
        self.registrations.borrow_mut().push(Registration {
            event,
            owner: owner.to_string(),
            handler,
        });
    }

    /// Drop every registration made under `owner`. Returns how many went.
    pub fn remove_owner(&self, owner: &str) -> usize {
        let mut registrations = self.registrations.borrow_mut();
        let before = registrations.len();
        registrations.retain(|r| r.owner != owner);
        before - registrations.len()
    }

    /// Run every handler for `event` in registration order and collect the
    /// messages they return.
    pub fn emit(&self, event: EditorEvent) -> Vec<String> {
        // Handlers may register or remove listeners themselves.
        let handlers: Vec<Listener> = self
            .registrations
            .borrow()
            .iter()
            .filter(|r| r.event == event)
            .map(|r| Rc::clone(&r.handler))
            .collect();

        handlers
            .iter()
            .filter_map(|handler| handler())
            .filter(|message| !message.is_empty())
            .collect()
    }

    pub fn count(&self, owner: &str) -> usize {
        self.registrations
            .borrow()
            .iter()
            .filter(|r| r.owner == owner)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_event_names() {
        assert_eq!(EditorEvent::Save.as_ref(), "ctrl+s");
        assert_eq!(
            "windowUnload".parse::<EditorEvent>().unwrap(),
            EditorEvent::WindowUnload
        );
        assert_eq!(EditorEvent::EscapeKeyPressed.to_string(), "escapeKeyPressed");
    }

    #[test]
    fn test_emit_only_reaches_matching_event() {
        let registry = ListenerRegistry::new();
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        registry.add(
            EditorEvent::Save,
            "editor",
            Rc::new(move || {
                counter.set(counter.get() + 1);
                None
            }),
        );

        assert!(registry.emit(EditorEvent::EscapeKeyPressed).is_empty());
        registry.emit(EditorEvent::Save);
        registry.emit(EditorEvent::Save);
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn test_remove_owner_is_scoped_and_idempotent() {
        let registry = ListenerRegistry::new();
        registry.add(EditorEvent::Save, "editor", Rc::new(|| None));
        registry.add(EditorEvent::WindowUnload, "editor", Rc::new(|| None));
        registry.add(EditorEvent::EscapeKeyPressed, "popover", Rc::new(|| None));

        assert_eq!(registry.remove_owner("editor"), 2);
        assert_eq!(registry.remove_owner("editor"), 0);
        assert_eq!(registry.count("popover"), 1);
    }

    #[test]
    fn test_emit_collects_non_empty_messages() {
        let registry = ListenerRegistry::new();
        registry.add(
            EditorEvent::WindowUnload,
            "a",
            Rc::new(|| Some("leave?".to_string())),
        );
        registry.add(EditorEvent::WindowUnload, "b", Rc::new(|| Some(String::new())));
        registry.add(EditorEvent::WindowUnload, "c", Rc::new(|| None));

        assert_eq!(registry.emit(EditorEvent::WindowUnload), vec!["leave?"]);
    }
}
