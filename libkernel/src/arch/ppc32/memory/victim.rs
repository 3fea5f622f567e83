use super::{SLOTS_PER_GROUP, hash::HashAddress, pht::PhtGroup};

/// Picks which slot of a full group a refill overwrites.
pub trait VictimPolicy {
    /// Called only when every slot in `group` is valid. The result must be
    /// below [`SLOTS_PER_GROUP`].
    fn choose_victim(&self, group: &PhtGroup, hash: &HashAddress) -> usize;
}

/// Evicts slot `page index mod 8`. Deterministic and stateless; two pages
/// that collide on both group and this index thrash each other.
#[derive(Clone, Copy, Debug, Default)]
pub struct FixedVictim;

impl VictimPolicy for FixedVictim {
    fn choose_victim(&self, _group: &PhtGroup, hash: &HashAddress) -> usize {
        hash.page_index() as usize % SLOTS_PER_GROUP
    }
}
