// SPDX-License-Identifier: GPL-3.0-only

//! Ordered collection of drawables with stable handles
//!
//! Renderers register their planes here instead of keeping references into
//! a scene. Handles carry a generation, so a handle to a removed entry never
//! aliases a newer one that reused the slot.

/// Opaque reference to an entry of a [`DrawList`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DrawHandle {
    index: u32,
    generation: u32,
}

struct Slot<T> {
    generation: u32,
    entry: Option<Entry<T>>,
}

struct Entry<T> {
    z_order: i32,
    sequence: u64,
    item: T,
}

pub struct DrawList<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    next_sequence: u64,
    len: usize,
}

impl<T> Default for DrawList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> DrawList<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            next_sequence: 0,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Add an item; lower `z_order` draws first
    pub fn insert(&mut self, z_order: i32, item: T) -> DrawHandle {
        let entry = Entry {
            z_order,
            sequence: self.next_sequence,
            item,
        };
        self.next_sequence += 1;
        self.len += 1;

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.entry = Some(entry);
            DrawHandle {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                entry: Some(entry),
            });
            DrawHandle {
                index,
                generation: 0,
            }
        }
    }

    /// Remove an item; stale handles return `None`
    pub fn remove(&mut self, handle: DrawHandle) -> Option<T> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let entry = slot.entry.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.len -= 1;
        Some(entry.item)
    }

    pub fn get(&self, handle: DrawHandle) -> Option<&T> {
        self.entry(handle).map(|e| &e.item)
    }

    pub fn get_mut(&mut self, handle: DrawHandle) -> Option<&mut T> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.entry.as_mut().map(|e| &mut e.item)
    }

    pub fn contains(&self, handle: DrawHandle) -> bool {
        self.entry(handle).is_some()
    }

    pub fn set_z_order(&mut self, handle: DrawHandle, z_order: i32) -> bool {
        let Some(slot) = self.slots.get_mut(handle.index as usize) else {
            return false;
        };
        if slot.generation != handle.generation {
            return false;
        }
        match slot.entry.as_mut() {
            Some(entry) => {
                entry.z_order = z_order;
                true
            }
            None => false,
        }
    }

    /// Items in draw order: ascending `z_order`, then insertion order
    pub fn iter_ordered(&self) -> impl Iterator<Item = (DrawHandle, &T)> {
        let mut live: Vec<(DrawHandle, &Entry<T>)> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| {
                slot.entry.as_ref().map(|entry| {
                    (
                        DrawHandle {
                            index: index as u32,
                            generation: slot.generation,
                        },
                        entry,
                    )
                })
            })
            .collect();
        live.sort_by_key(|(_, entry)| (entry.z_order, entry.sequence));
        live.into_iter().map(|(handle, entry)| (handle, &entry.item))
    }

    /// Remove every item, invalidating all handles
    pub fn clear(&mut self) -> Vec<T> {
        let mut items = Vec::with_capacity(self.len);
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if let Some(entry) = slot.entry.take() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index as u32);
                items.push(entry.item);
            }
        }
        self.len = 0;
        items
    }

    fn entry(&self, handle: DrawHandle) -> Option<&Entry<T>> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.entry.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut list = DrawList::new();
        let a = list.insert(0, "a");
        let b = list.insert(1, "b");
        assert_eq!(list.len(), 2);
        assert_eq!(list.get(a), Some(&"a"));
        assert_eq!(list.get(b), Some(&"b"));
    }

    #[test]
    fn test_draw_order() {
        let mut list = DrawList::new();
        list.insert(2, "front");
        list.insert(0, "back-1");
        list.insert(1, "middle");
        list.insert(0, "back-2");
        let order: Vec<_> = list.iter_ordered().map(|(_, item)| *item).collect();
        assert_eq!(order, vec!["back-1", "back-2", "middle", "front"]);
    }

    #[test]
    fn test_stale_handle_rejected() {
        let mut list = DrawList::new();
        let a = list.insert(0, 1);
        assert_eq!(list.remove(a), Some(1));
        assert_eq!(list.remove(a), None);

        // Slot is reused with a new generation
        let b = list.insert(0, 2);
        assert!(!list.contains(a));
        assert_eq!(list.get(a), None);
        assert_eq!(list.get(b), Some(&2));
        assert!(!list.set_z_order(a, 5));
    }

    #[test]
    fn test_set_z_order() {
        let mut list = DrawList::new();
        let a = list.insert(0, "a");
        list.insert(1, "b");
        assert!(list.set_z_order(a, 10));
        let order: Vec<_> = list.iter_ordered().map(|(_, item)| *item).collect();
        assert_eq!(order, vec!["b", "a"]);
    }

    #[test]
    fn test_clear_invalidates_handles() {
        let mut list = DrawList::new();
        let a = list.insert(0, 1);
        let b = list.insert(0, 2);
        let items = list.clear();
        assert_eq!(items.len(), 2);
        assert!(list.is_empty());
        assert!(!list.contains(a));
        assert!(!list.contains(b));
    }
}
