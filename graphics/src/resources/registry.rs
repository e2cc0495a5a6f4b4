//! Generational arena backing resource handles.

use super::ResourceHandle;

#[derive(Debug)]
struct Entry<T> {
    generation: u32,
    value: Option<T>,
}

/// Arena of values addressed by [`ResourceHandle`].
///
/// Removed slots go on a free list and are reused with a bumped generation.
#[derive(Debug)]
pub struct ResourceRegistry<T> {
    entries: Vec<Entry<T>>,
    free: Vec<u32>,
    len: usize,
}

impl<T> ResourceRegistry<T> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Store a value and return its handle.
    pub fn insert(&mut self, value: T) -> ResourceHandle {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let entry = &mut self.entries[index as usize];
            entry.value = Some(value);
            return ResourceHandle::new(index, entry.generation);
        }

        let index = self.entries.len() as u32;
        self.entries.push(Entry {
            generation: 0,
            value: Some(value),
        });
        ResourceHandle::new(index, 0)
    }

    /// Get the value behind a live handle.
    pub fn get(&self, handle: ResourceHandle) -> Option<&T> {
        self.entries
            .get(handle.index() as usize)
            .filter(|entry| entry.generation == handle.generation())
            .and_then(|entry| entry.value.as_ref())
    }

    /// Get the value behind a live handle mutably.
    pub fn get_mut(&mut self, handle: ResourceHandle) -> Option<&mut T> {
        self.entries
            .get_mut(handle.index() as usize)
            .filter(|entry| entry.generation == handle.generation())
            .and_then(|entry| entry.value.as_mut())
    }

    /// Returns true if `handle` refers to a live value.
    pub fn contains(&self, handle: ResourceHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Remove a value. Returns `None` if the handle is stale.
    pub fn remove(&mut self, handle: ResourceHandle) -> Option<T> {
        let entry = self.entries.get_mut(handle.index() as usize)?;
        if entry.generation != handle.generation() {
            return None;
        }
        let value = entry.value.take()?;
        entry.generation = entry.generation.wrapping_add(1);
        self.free.push(handle.index());
        self.len -= 1;
        Some(value)
    }

    /// Number of live values.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if no value is live.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterate over live values.
    pub fn iter(&self) -> impl Iterator<Item = (ResourceHandle, &T)> {
        self.entries.iter().enumerate().filter_map(|(index, entry)| {
            entry
                .value
                .as_ref()
                .map(|value| (ResourceHandle::new(index as u32, entry.generation), value))
        })
    }

    /// Iterate over live values mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ResourceHandle, &mut T)> {
        self.entries
            .iter_mut()
            .enumerate()
            .filter_map(|(index, entry)| {
                let generation = entry.generation;
                entry
                    .value
                    .as_mut()
                    .map(|value| (ResourceHandle::new(index as u32, generation), value))
            })
    }

    /// Handles of all live values.
    pub fn handles(&self) -> Vec<ResourceHandle> {
        self.iter().map(|(handle, _)| handle).collect()
    }
}

impl<T> Default for ResourceRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
