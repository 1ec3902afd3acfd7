// mask.rs - Per-entity component membership bitmasks
//
// Component `n` lives in generation word `n / 32` at bit `n % 32`. Every
// generation is a dense `u32` array indexed by entity id.

use crate::ecs::EntityId;

/// Bits per generation word.
pub const BITS_PER_GENERATION: usize = u32::BITS as usize;

/// Location of one component's membership bit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ComponentBit {
    generation: usize,
    bitflag: u32,
}

impl ComponentBit {
    /// Bit assigned to the component registered at position `index`.
    pub const fn from_index(index: usize) -> Self {
        Self {
            generation: index / BITS_PER_GENERATION,
            bitflag: 1 << (index % BITS_PER_GENERATION),
        }
    }

    #[inline]
    pub const fn generation(self) -> usize {
        self.generation
    }

    #[inline]
    pub const fn bitflag(self) -> u32 {
        self.bitflag
    }
}

/// Number of generation words needed to hold `components` bits.
#[inline]
pub const fn generations_for(components: usize) -> usize {
    components.div_ceil(BITS_PER_GENERATION)
}

/// A set of required bits, folded into one mask per generation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BitPattern {
    words: Vec<(usize, u32)>,
}

impl BitPattern {
    pub fn from_bits<I>(bits: I) -> Self
    where
        I: IntoIterator<Item = ComponentBit>,
    {
        let mut words: Vec<(usize, u32)> = Vec::new();
        for bit in bits {
            match words.iter_mut().find(|(gen, _)| *gen == bit.generation) {
                Some((_, mask)) => *mask |= bit.bitflag,
                None => words.push((bit.generation, bit.bitflag)),
            }
        }
        words.sort_unstable_by_key(|(gen, _)| *gen);
        Self { words }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Whether the pattern has any requirement in `bit`'s generation word.
    #[inline]
    pub fn references_generation(&self, bit: ComponentBit) -> bool {
        self.words.iter().any(|(gen, _)| *gen == bit.generation)
    }

    /// `(generation, mask)` pairs, ascending by generation.
    pub fn words(&self) -> &[(usize, u32)] {
        &self.words
    }
}

/// Membership words for every entity across every generation.
#[derive(Clone, Debug)]
pub struct MembershipMasks {
    generations: Vec<Vec<u32>>,
    capacity: usize,
}

impl MembershipMasks {
    pub fn new(capacity: usize) -> Self {
        Self {
            generations: Vec::new(),
            capacity,
        }
    }

    /// Grow to `count` generation words per entity. Never shrinks.
    pub fn ensure_generations(&mut self, count: usize) {
        while self.generations.len() < count {
            self.generations.push(vec![0; self.capacity]);
        }
    }

    #[inline]
    pub fn generation_count(&self) -> usize {
        self.generations.len()
    }

    #[inline]
    pub fn contains(&self, bit: ComponentBit, entity: EntityId) -> bool {
        self.word(bit.generation, entity) & bit.bitflag == bit.bitflag
    }

    #[inline]
    pub fn insert(&mut self, bit: ComponentBit, entity: EntityId) {
        if let Some(word) = self.word_mut(bit.generation, entity) {
            *word |= bit.bitflag;
        }
    }

    #[inline]
    pub fn remove(&mut self, bit: ComponentBit, entity: EntityId) {
        if let Some(word) = self.word_mut(bit.generation, entity) {
            *word &= !bit.bitflag;
        }
    }

    /// Whether `entity` carries every bit of `pattern`. Empty patterns never match.
    pub fn matches(&self, pattern: &BitPattern, entity: EntityId) -> bool {
        !pattern.is_empty()
            && pattern
                .words()
                .iter()
                .all(|&(gen, mask)| self.word(gen, entity) & mask == mask)
    }

    /// Raw generation word; out-of-range lookups read as empty.
    #[inline]
    pub fn word(&self, generation: usize, entity: EntityId) -> u32 {
        self.generations
            .get(generation)
            .and_then(|words| words.get(entity as usize))
            .copied()
            .unwrap_or(0)
    }

    #[inline]
    pub(crate) fn word_mut(&mut self, generation: usize, entity: EntityId) -> Option<&mut u32> {
        self.generations
            .get_mut(generation)
            .and_then(|words| words.get_mut(entity as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_roll_over_into_new_generations() {
        assert_eq!(ComponentBit::from_index(0), ComponentBit { generation: 0, bitflag: 1 });
        assert_eq!(ComponentBit::from_index(31).bitflag(), 1 << 31);
        assert_eq!(ComponentBit::from_index(32), ComponentBit { generation: 1, bitflag: 1 });
        assert_eq!(generations_for(0), 0);
        assert_eq!(generations_for(32), 1);
        assert_eq!(generations_for(33), 2);
    }

    #[test]
    fn insert_and_remove_touch_only_their_bit() {
        let mut masks = MembershipMasks::new(4);
        masks.ensure_generations(2);
        let a = ComponentBit::from_index(3);
        let b = ComponentBit::from_index(40);

        masks.insert(a, 2);
        masks.insert(b, 2);
        assert_eq!(masks.word(0, 2), 1 << 3);
        assert_eq!(masks.word(1, 2), 1 << 8);

        masks.remove(a, 2);
        assert!(!masks.contains(a, 2));
        assert!(masks.contains(b, 2));
        assert!(!masks.contains(b, 1));
    }

    #[test]
    fn patterns_span_generations() {
        let mut masks = MembershipMasks::new(2);
        masks.ensure_generations(2);
        let bits = [
            ComponentBit::from_index(1),
            ComponentBit::from_index(5),
            ComponentBit::from_index(33),
        ];
        let pattern = BitPattern::from_bits(bits);
        assert_eq!(pattern.words(), &[(0, 0b100010), (1, 0b10)]);

        masks.insert(bits[0], 0);
        masks.insert(bits[1], 0);
        assert!(!masks.matches(&pattern, 0));
        masks.insert(bits[2], 0);
        assert!(masks.matches(&pattern, 0));
        assert!(!masks.matches(&BitPattern::default(), 0));
    }

    #[test]
    fn out_of_range_entities_read_empty() {
        let mut masks = MembershipMasks::new(1);
        masks.ensure_generations(1);
        let bit = ComponentBit::from_index(0);
        masks.insert(bit, 5);
        assert!(!masks.contains(bit, 5));
    }
}
