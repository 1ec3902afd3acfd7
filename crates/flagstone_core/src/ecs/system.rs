// system.rs - Entity subscription for one system
//
// `entities` is the dense list systems iterate; `indices` maps an entity id
// back to its position in that list. For every position `i`,
// `indices[entities[i]] == Some(i)`.

use crate::ecs::mask::{BitPattern, ComponentBit, MembershipMasks};
use crate::ecs::{ComponentId, EntityId};
use std::fmt;

/// Position of a system in registration order. Snapshots list systems in
/// this order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SystemHandle(u32);

impl SystemHandle {
    pub(crate) fn new(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SystemHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "system#{}", self.0)
    }
}

pub struct System {
    handle: SystemHandle,
    name: String,
    components: Vec<ComponentId>,
    pattern: BitPattern,
    entities: Vec<EntityId>,
    indices: Vec<Option<u32>>,
}

impl System {
    pub(crate) fn new(
        handle: SystemHandle,
        name: String,
        components: Vec<(ComponentId, ComponentBit)>,
        capacity: usize,
    ) -> Self {
        let pattern = BitPattern::from_bits(components.iter().map(|(_, bit)| *bit));
        Self {
            handle,
            name,
            components: components.into_iter().map(|(id, _)| id).collect(),
            pattern,
            entities: Vec::new(),
            indices: vec![None; capacity],
        }
    }

    #[inline]
    pub fn handle(&self) -> SystemHandle {
        self.handle
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Required components, by registration id.
    pub fn components(&self) -> &[ComponentId] {
        &self.components
    }

    pub fn pattern(&self) -> &BitPattern {
        &self.pattern
    }

    /// Subscribed entities in iteration order.
    #[inline]
    pub fn entities(&self) -> &[EntityId] {
        &self.entities
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    #[inline]
    pub fn contains(&self, entity: EntityId) -> bool {
        self.index_of(entity).is_some()
    }

    /// Position of `entity` in the dense list.
    #[inline]
    pub fn index_of(&self, entity: EntityId) -> Option<usize> {
        self.indices
            .get(entity as usize)
            .copied()
            .flatten()
            .map(|i| i as usize)
    }

    /// Whether `entity`'s membership satisfies every required bit.
    #[inline]
    pub fn check(&self, masks: &MembershipMasks, entity: EntityId) -> bool {
        masks.matches(&self.pattern, entity)
    }

    /// Whether a change to `bit` can affect this system at all.
    #[inline]
    pub fn check_component(&self, bit: ComponentBit) -> bool {
        self.pattern.references_generation(bit)
    }

    /// Append `entity` to the dense list. Already-subscribed or out-of-range ids are ignored.
    pub(crate) fn add(&mut self, entity: EntityId) -> bool {
        let Some(slot) = self.indices.get_mut(entity as usize) else {
            return false;
        };
        if slot.is_some() {
            return false;
        }
        *slot = Some(self.entities.len() as u32);
        self.entities.push(entity);
        true
    }

    /// Swap-remove `entity`, moving the last subscriber into its slot.
    pub(crate) fn remove(&mut self, entity: EntityId) -> bool {
        let Some(index) = self.index_of(entity) else {
            return false;
        };
        self.entities.swap_remove(index);
        self.indices[entity as usize] = None;
        if let Some(&moved) = self.entities.get(index) {
            self.indices[moved as usize] = Some(index as u32);
        }
        true
    }

    /// Drop every subscriber.
    pub(crate) fn clear(&mut self) {
        for &entity in &self.entities {
            self.indices[entity as usize] = None;
        }
        self.entities.clear();
    }

    /// Join every entity that already matches.
    pub(crate) fn sync_all(&mut self, masks: &MembershipMasks, cursor: EntityId) {
        if self.pattern.is_empty() {
            return;
        }
        for entity in 0..cursor {
            if masks.matches(&self.pattern, entity) {
                self.add(entity);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn system(capacity: usize) -> System {
        System::new(
            SystemHandle::new(0),
            "movement".to_string(),
            vec![(0, ComponentBit::from_index(0))],
            capacity,
        )
    }

    fn assert_consistent(system: &System) {
        for (i, &entity) in system.entities().iter().enumerate() {
            assert_eq!(system.index_of(entity), Some(i));
        }
    }

    #[test]
    fn remove_swaps_last_into_hole() {
        let mut system = system(8);
        for entity in [4, 1, 6, 2] {
            assert!(system.add(entity));
        }
        assert!(!system.add(1));

        assert!(system.remove(1));
        assert_eq!(system.entities(), &[4, 2, 6]);
        assert_eq!(system.index_of(1), None);
        assert_consistent(&system);

        assert!(system.remove(6));
        assert_eq!(system.entities(), &[4, 2]);
        assert!(!system.remove(6));
        assert_consistent(&system);
    }

    #[test]
    fn clear_resets_sparse_index() {
        let mut system = system(4);
        system.add(3);
        system.add(0);
        system.clear();
        assert!(system.is_empty());
        assert!(!system.contains(3));
        assert!(system.add(0));
        assert_eq!(system.index_of(0), Some(0));
    }

    #[test]
    fn out_of_range_entities_are_ignored() {
        let mut system = system(2);
        assert!(!system.add(9));
        assert!(!system.remove(9));
        assert!(system.is_empty());
    }

    #[test]
    fn check_component_is_per_generation() {
        let system = system(1);
        assert!(system.check_component(ComponentBit::from_index(5)));
        assert!(!system.check_component(ComponentBit::from_index(40)));
    }
}
