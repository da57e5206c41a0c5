//! Access to the page address the verifier reads and cleans.
//!
//! The verifier only needs the current URL and a way to *replace* the current
//! history entry, never push a new one or reload. Hosts implement
//! [`Location`] over their own address bar; [`MemoryLocation`] keeps the
//! history in memory.

use url::Url;

pub trait Location {
    /// Current address, if it can be read.
    fn href(&self) -> Option<Url>;

    /// Swap the current history entry for `url` without navigating.
    fn replace(&mut self, url: &Url);
}

/// In-memory history stack.
#[derive(Debug, Clone)]
pub struct MemoryLocation {
    entries: Vec<Url>,
}

impl MemoryLocation {
    #[must_use]
    pub fn new(url: Url) -> Self {
        Self { entries: vec![url] }
    }

    /// Navigate to `url`, adding a history entry.
    pub fn push(&mut self, url: Url) {
        self.entries.push(url);
    }

    #[must_use]
    pub fn current(&self) -> Option<&Url> {
        self.entries.last()
    }

    #[must_use]
    pub fn history_len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn entries(&self) -> &[Url] {
        &self.entries
    }
}

impl Location for MemoryLocation {
    fn href(&self) -> Option<Url> {
        self.current().cloned()
    }

    fn replace(&mut self, url: &Url) {
        match self.entries.last_mut() {
            Some(current) => *current = url.clone(),
            None => self.entries.push(url.clone()),
        }
    }
}
