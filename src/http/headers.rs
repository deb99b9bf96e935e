use bytes::Bytes;

use crate::error::{Error, Result};

/// Default number of header lines a single message may carry.
pub const MAX_HEADERS: usize = 64;

/// One `name: value` pair, kept as raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderEntry {
    pub name: Bytes,
    pub value: Bytes,
}

impl HeaderEntry {
    pub fn name_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.name).ok()
    }

    pub fn value_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.value).ok()
    }
}

/// Outcome of [`HeaderStore::get_all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderMatches {
    /// Number of stored headers with the requested name.
    pub total: usize,
    /// Number of values written into the output slice.
    pub filled: usize,
}

/// Ordered, case-insensitive multi-map of headers with a fixed capacity.
///
/// Entries keep their insertion order and are never edited in place.
#[derive(Debug, Clone)]
pub struct HeaderStore {
    entries: Vec<HeaderEntry>,
    capacity: usize,
}

impl Default for HeaderStore {
    fn default() -> Self {
        Self::with_capacity(MAX_HEADERS)
    }
}

impl HeaderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity,
        }
    }

    /// Appends a header, failing once the store is full.
    pub fn add(&mut self, name: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Result<()> {
        if self.entries.len() >= self.capacity {
            return Err(Error::CapacityExceeded {
                what: "header count",
                limit: self.capacity,
            });
        }
        self.entries.push(HeaderEntry {
            name: Bytes::copy_from_slice(name.as_ref()),
            value: Bytes::copy_from_slice(value.as_ref()),
        });
        Ok(())
    }

    /// First value stored under `name`, compared case-insensitively.
    pub fn get_first(&self, name: &str) -> Option<&[u8]> {
        self.matching(name).next().map(|e| e.value.as_ref())
    }

    /// Like [`get_first`](Self::get_first) but only for UTF-8 values.
    pub fn get_first_str(&self, name: &str) -> Option<&str> {
        self.matching(name).next().and_then(HeaderEntry::value_str)
    }

    /// Copies the values stored under `name` into `out`.
    ///
    /// At most `out.len() - 1` values are written, in stored order, and the
    /// slot after the last one written is set to `None` so readers can stop
    /// there even when the list was truncated. Slots past that are left
    /// untouched. The returned `total` counts every match, not only the ones
    /// that fit.
    pub fn get_all<'a>(&'a self, name: &str, out: &mut [Option<&'a [u8]>]) -> HeaderMatches {
        let room = out.len().saturating_sub(1);
        let mut total = 0;
        let mut filled = 0;

        for entry in self.matching(name) {
            if filled < room {
                out[filled] = Some(entry.value.as_ref());
                filled += 1;
            }
            total += 1;
        }

        if let Some(slot) = out.get_mut(filled) {
            *slot = None;
        }

        HeaderMatches { total, filled }
    }

    /// Every value stored under `name`, in order.
    pub fn values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a [u8]> + 'a {
        self.matching(name).map(|e| e.value.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.matching(name).next().is_some()
    }

    /// Drops every entry named `name`, keeping the order of the rest.
    /// Used when building outgoing heads; parsed headers are never edited.
    pub fn remove_all(&mut self, name: &str) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|e| !e.name.eq_ignore_ascii_case(name.as_bytes()));
        before - self.entries.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HeaderEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn matching<'a, 'n>(
        &'a self,
        name: &'n str,
    ) -> impl Iterator<Item = &'a HeaderEntry> + use<'a, 'n> {
        self.entries
            .iter()
            .filter(move |e| e.name.eq_ignore_ascii_case(name.as_bytes()))
    }
}

impl<'a> IntoIterator for &'a HeaderStore {
    type Item = &'a HeaderEntry;
    type IntoIter = std::slice::Iter<'a, HeaderEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
