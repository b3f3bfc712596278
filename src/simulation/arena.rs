//! Slot arena for bodies.
//!
//! Bodies live in recycled slots addressed by `BodyId` (index + generation).
//! Removing a body bumps the slot generation, so a stale id held by a zone,
//! bond or UI reference can never resolve to a different body that later
//! reused the slot. The free list makes this the body pool: storage is
//! reused, never shrunk, and creation re-initializes every field.

use crate::simulation::states::Body;

/// Stable handle to a body slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId {
    pub index: u32,
    pub generation: u32,
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    body: Option<Body>,
}

#[derive(Debug, Clone)]
pub struct BodyArena {
    slots: Vec<Slot>,
    free: Vec<u32>, // vacant slot indices, last freed reused first
    live: usize,
}

impl BodyArena {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    /// Number of live bodies.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Total slot count, live or vacant. Scratch buffers are sized by this
    /// so they can be indexed directly by `BodyId::index`.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn insert(&mut self, body: Body) -> BodyId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.body = Some(body);
            BodyId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                body: Some(body),
            });
            BodyId {
                index,
                generation: 0,
            }
        }
    }

    pub fn contains(&self, id: BodyId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: BodyId) -> Option<&Body> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.body.as_ref()
    }

    pub fn get_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.body.as_mut()
    }

    /// Body stored at a raw slot index, if the slot is occupied.
    pub fn at(&self, index: u32) -> Option<&Body> {
        self.slots.get(index as usize)?.body.as_ref()
    }

    pub fn at_mut(&mut self, index: u32) -> Option<&mut Body> {
        self.slots.get_mut(index as usize)?.body.as_mut()
    }

    /// Current id of the body in a slot, if occupied.
    pub fn id_at(&self, index: u32) -> Option<BodyId> {
        let slot = self.slots.get(index as usize)?;
        slot.body.as_ref()?;
        Some(BodyId {
            index,
            generation: slot.generation,
        })
    }

    /// Mutable access to two distinct slots at once.
    pub fn pair_mut(&mut self, ia: u32, ib: u32) -> Option<(&mut Body, &mut Body)> {
        if ia == ib {
            return None;
        }
        let (lo, hi) = if ia < ib { (ia, ib) } else { (ib, ia) };
        let (left, right) = self.slots.split_at_mut(hi as usize);
        let a = left.get_mut(lo as usize)?.body.as_mut()?;
        let b = right.first_mut()?.body.as_mut()?;
        if ia < ib {
            Some((a, b))
        } else {
            Some((b, a))
        }
    }

    /// Remove a body; no-op (returns `None`) for stale or unknown ids.
    pub fn remove(&mut self, id: BodyId) -> Option<Body> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation || slot.body.is_none() {
            return None;
        }
        let body = slot.body.take();
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live -= 1;
        body
    }

    /// Re-occupy a vacant slot under its original id. Used by undo to bring
    /// a removed body back with every handle to it intact.
    pub fn restore(&mut self, id: BodyId, body: Body) -> bool {
        let Some(slot) = self.slots.get_mut(id.index as usize) else {
            return false;
        };
        if slot.body.is_some() {
            return false;
        }
        slot.generation = id.generation;
        slot.body = Some(body);
        self.free.retain(|&i| i != id.index);
        self.live += 1;
        true
    }

    /// Live bodies in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (BodyId, &Body)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.body.as_ref().map(|b| {
                (
                    BodyId {
                        index: i as u32,
                        generation: slot.generation,
                    },
                    b,
                )
            })
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (BodyId, &mut Body)> {
        self.slots.iter_mut().enumerate().filter_map(|(i, slot)| {
            let generation = slot.generation;
            slot.body.as_mut().map(move |b| {
                (
                    BodyId {
                        index: i as u32,
                        generation,
                    },
                    b,
                )
            })
        })
    }

    /// Snapshot of live ids, for passes that remove while walking.
    pub fn live_ids(&self) -> Vec<BodyId> {
        self.iter().map(|(id, _)| id).collect()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.live = 0;
    }
}

impl Default for BodyArena {
    fn default() -> Self {
        Self::new()
    }
}
