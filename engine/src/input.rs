//! Keys and the process-wide key listener registry.
//!
//! Installing a listener hands back a [`ListenerGuard`]; dropping the guard
//! removes the listener. A view holds at most one listener at a time, so a
//! view that is torn down and rebuilt never accumulates duplicate handlers.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// A key press as seen by the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Key {
    Space,
    Enter,
    Escape,
    Tab,
    Other(String),
}

impl Key {
    /// Parses a key name. Unknown names become `Key::Other`.
    pub fn from_name(s: &str) -> Key {
        match s.trim().to_ascii_lowercase().as_str() {
            "space" | " " => Key::Space,
            "enter" | "return" => Key::Enter,
            "escape" | "esc" => Key::Escape,
            "tab" => Key::Tab,
            other => Key::Other(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Key::Space => "space",
            Key::Enter => "enter",
            Key::Escape => "escape",
            Key::Tab => "tab",
            Key::Other(name) => name,
        }
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::from_name(&s)
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.name().to_string()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identifies a mounted view that may own a key listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(pub u64);

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "view-{}", self.0)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ListenerError {
    #[error("{0} already has a key listener installed")]
    AlreadyInstalled(ViewId),
}

#[derive(Debug)]
struct Listener {
    token: u64,
    view: ViewId,
    key: Key,
}

type ListenerTable = Mutex<Vec<Listener>>;

/// Shared registry of installed key listeners.
#[derive(Debug, Clone, Default)]
pub struct KeyListeners {
    table: Arc<ListenerTable>,
    next_token: Arc<AtomicU64>,
}

impl KeyListeners {
    pub fn new() -> Self {
        KeyListeners::default()
    }

    /// Installs a listener for `key` on behalf of `view`.
    pub fn install(&self, view: ViewId, key: Key) -> Result<ListenerGuard, ListenerError> {
        let mut table = self.table.lock();
        if table.iter().any(|l| l.view == view) {
            return Err(ListenerError::AlreadyInstalled(view));
        }
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        debug!(%view, %key, "key_listener_installed");
        table.push(Listener { token, view, key });
        Ok(ListenerGuard {
            token,
            view,
            table: Arc::downgrade(&self.table),
        })
    }

    /// Returns the views whose listener matches `key`, in install order.
    pub fn dispatch(&self, key: &Key) -> Vec<ViewId> {
        self.table
            .lock()
            .iter()
            .filter(|l| &l.key == key)
            .map(|l| l.view)
            .collect()
    }

    /// Number of installed listeners.
    pub fn len(&self) -> usize {
        self.table.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_installed(&self, view: ViewId) -> bool {
        self.table.lock().iter().any(|l| l.view == view)
    }
}

/// Keeps a listener installed for as long as it lives.
#[derive(Debug)]
#[must_use = "dropping the guard removes the listener"]
pub struct ListenerGuard {
    token: u64,
    view: ViewId,
    table: Weak<ListenerTable>,
}

impl ListenerGuard {
    pub fn view(&self) -> ViewId {
        self.view
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if let Some(table) = self.table.upgrade() {
            table.lock().retain(|l| l.token != self.token);
            debug!(view = %self.view, "key_listener_removed");
        }
    }
}
