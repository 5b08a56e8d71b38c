//! Chunk residency table.
//!
//! Tracks which world chunks occupy which buffer slots. The table has a hard
//! capacity; when it is full an emergency eviction frees room instead of
//! failing the frame.

use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};
use tilestream_common::{
    BufferSlot, ChunkPos, OVERFLOW_EVICTION_COUNT, RESIDENCY_CAPACITY, VIEW_BUFFER_CHUNKS,
};
use tracing::{debug, warn};

use crate::error::{StreamError, StreamResult};

/// Residency state of a chunk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ChunkState {
    /// Not present in the buffer.
    #[default]
    Unloaded,
    /// A streaming session is writing its tiles.
    Loading,
    /// Every tile is in the buffer.
    Loaded,
}

impl ChunkState {
    /// Returns true for the transitions the streaming state machine allows:
    /// `Unloaded → Loading → Loaded → Unloaded`, plus the immediate
    /// `Unloaded → Loaded` load.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Unloaded, Self::Loading)
                | (Self::Unloaded, Self::Loaded)
                | (Self::Loading, Self::Loaded)
                | (Self::Loaded, Self::Unloaded)
        )
    }

    /// Returns the state name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unloaded => "UNLOADED",
            Self::Loading => "LOADING",
            Self::Loaded => "LOADED",
        }
    }
}

impl std::fmt::Display for ChunkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which records an emergency eviction removes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionPolicy {
    /// Oldest records in insertion order.
    #[default]
    Fifo,
    /// Records farthest from the player chunk.
    Farthest,
}

/// One residency record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadedChunk {
    /// World chunk held by the slot
    pub chunk: ChunkPos,
    /// Residency state
    pub state: ChunkState,
    /// Buffer slot the chunk's tiles occupy
    pub slot: BufferSlot,
}

impl LoadedChunk {
    /// Creates a record for `chunk` in its toroidal slot.
    #[must_use]
    pub const fn new(chunk: ChunkPos, state: ChunkState) -> Self {
        Self {
            chunk,
            state,
            slot: chunk.buffer_slot(),
        }
    }
}

/// Bounded, insertion-ordered collection of residency records.
#[derive(Debug, Default)]
pub struct ResidencyTable {
    records: ArrayVec<LoadedChunk, RESIDENCY_CAPACITY>,
}

impl ResidencyTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Checks if the table holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Checks if the table is at capacity.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.records.is_full()
    }

    /// Maximum number of records.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        RESIDENCY_CAPACITY
    }

    /// Removes every record.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Iterates records oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &LoadedChunk> {
        self.records.iter()
    }

    /// Finds the record for a chunk.
    #[must_use]
    pub fn find(&self, chunk: ChunkPos) -> Option<&LoadedChunk> {
        self.records.iter().find(|r| r.chunk == chunk)
    }

    /// Returns the state of a chunk; `Unloaded` when it has no record.
    #[must_use]
    pub fn state_of(&self, chunk: ChunkPos) -> ChunkState {
        self.find(chunk).map_or(ChunkState::Unloaded, |r| r.state)
    }

    /// Checks if a chunk is fully loaded.
    #[must_use]
    pub fn is_loaded(&self, chunk: ChunkPos) -> bool {
        self.state_of(chunk) == ChunkState::Loaded
    }

    /// Checks if a chunk is loaded in the slot it maps to.
    #[must_use]
    pub fn is_loaded_in_slot(&self, chunk: ChunkPos) -> bool {
        self.find(chunk)
            .is_some_and(|r| r.state == ChunkState::Loaded && r.slot == chunk.buffer_slot())
    }

    /// Counts records in a given state.
    #[must_use]
    pub fn count_in_state(&self, state: ChunkState) -> usize {
        self.records.iter().filter(|r| r.state == state).count()
    }

    /// Evicts every record occupying `slot`. Returns how many were removed.
    pub fn evict_slot(&mut self, slot: BufferSlot) -> usize {
        let before = self.records.len();
        self.records.retain(|r| {
            if r.slot == slot {
                debug!("Evicting chunk {} from slot ({}, {})", r.chunk, slot.x, slot.y);
                false
            } else {
                true
            }
        });
        before - self.records.len()
    }

    /// Evicts every record farther than `range` (Chebyshev) from `center`.
    pub fn evict_outside(&mut self, center: ChunkPos, range: u32) -> usize {
        let before = self.records.len();
        self.records.retain(|r| {
            let keep = r.chunk.chebyshev_distance(center) <= range;
            if !keep {
                debug!("Evicting chunk {} outside load range of {}", r.chunk, center);
            }
            keep
        });
        before - self.records.len()
    }

    /// Moves a chunk's record to `state`. Returns false if it has no record.
    pub fn set_state(&mut self, chunk: ChunkPos, state: ChunkState) -> bool {
        match self.records.iter_mut().find(|r| r.chunk == chunk) {
            Some(record) => {
                debug_assert!(
                    record.state.can_transition_to(state),
                    "invalid chunk state transition {} -> {}",
                    record.state,
                    state
                );
                record.state = state;
                true
            },
            None => false,
        }
    }

    /// Appends a record, evicting per `policy` first if the table is full.
    ///
    /// Returns the number of records removed to make room.
    pub fn insert(&mut self, record: LoadedChunk, policy: EvictionPolicy, center: ChunkPos) -> usize {
        let record = match self.records.try_push(record) {
            Ok(()) => return 0,
            Err(overflow) => overflow.element(),
        };

        let evicted = self.evict_for_overflow(policy, center);
        warn!(
            "Residency table full ({} records), evicted {} by {:?} policy",
            RESIDENCY_CAPACITY, evicted, policy
        );

        if self.records.try_push(record).is_err() {
            warn!("Dropping residency record for chunk {}", record.chunk);
        }
        evicted
    }

    /// Emergency eviction of `OVERFLOW_EVICTION_COUNT` records.
    fn evict_for_overflow(&mut self, policy: EvictionPolicy, center: ChunkPos) -> usize {
        let count = OVERFLOW_EVICTION_COUNT.min(self.records.len());
        match policy {
            EvictionPolicy::Fifo => {
                self.records.drain(..count);
            },
            EvictionPolicy::Farthest => {
                for _ in 0..count {
                    let farthest = self
                        .records
                        .iter()
                        .enumerate()
                        .max_by(|(ia, a), (ib, b)| {
                            a.chunk
                                .chebyshev_distance(center)
                                .cmp(&b.chunk.chebyshev_distance(center))
                                // Prefer the older record on ties.
                                .then(ib.cmp(ia))
                        })
                        .map(|(index, _)| index);
                    if let Some(index) = farthest {
                        self.records.remove(index);
                    }
                }
            },
        }
        count
    }

    /// Verifies slot exclusivity and record consistency.
    pub fn check_invariants(&self) -> StreamResult<()> {
        const SLOTS: usize = VIEW_BUFFER_CHUNKS as usize;
        let mut owned = [[false; SLOTS]; SLOTS];

        for (index, record) in self.records.iter().enumerate() {
            if !record.slot.is_valid() {
                return Err(StreamError::InvariantViolation(format!(
                    "chunk {} holds out-of-range slot ({}, {})",
                    record.chunk, record.slot.x, record.slot.y
                )));
            }
            if record.slot != record.chunk.buffer_slot() {
                return Err(StreamError::InvariantViolation(format!(
                    "chunk {} recorded in slot ({}, {}) instead of its own",
                    record.chunk, record.slot.x, record.slot.y
                )));
            }
            if self.records[..index].iter().any(|r| r.chunk == record.chunk) {
                return Err(StreamError::InvariantViolation(format!(
                    "chunk {} has more than one record",
                    record.chunk
                )));
            }
            if record.state == ChunkState::Loaded {
                let owner = &mut owned[record.slot.y as usize][record.slot.x as usize];
                if *owner {
                    return Err(StreamError::InvariantViolation(format!(
                        "slot ({}, {}) owned by more than one loaded chunk",
                        record.slot.x, record.slot.y
                    )));
                }
                *owner = true;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded(x: i32, y: i32) -> LoadedChunk {
        LoadedChunk::new(ChunkPos::new(x, y), ChunkState::Loaded)
    }

    #[test]
    fn test_state_default() {
        assert_eq!(ChunkState::default(), ChunkState::Unloaded);
        assert_eq!(ChunkState::Loading.to_string(), "LOADING");
    }

    #[test]
    fn test_state_transitions() {
        use ChunkState::{Loaded, Loading, Unloaded};
        assert!(Unloaded.can_transition_to(Loading));
        assert!(Loading.can_transition_to(Loaded));
        assert!(Loaded.can_transition_to(Unloaded));
        assert!(Unloaded.can_transition_to(Loaded));
        assert!(!Loaded.can_transition_to(Loading));
        assert!(!Loading.can_transition_to(Unloaded));
        assert!(!Loaded.can_transition_to(Loaded));
    }

    #[test]
    fn test_record_uses_toroidal_slot() {
        let record = loaded(33, -1);
        assert_eq!(record.slot, BufferSlot::new(1, 15));
    }

    #[test]
    fn test_find_and_state() {
        let mut table = ResidencyTable::new();
        let center = ChunkPos::new(0, 0);
        table.insert(loaded(1, 1), EvictionPolicy::Fifo, center);
        table.insert(
            LoadedChunk::new(ChunkPos::new(2, 2), ChunkState::Loading),
            EvictionPolicy::Fifo,
            center,
        );

        assert!(table.is_loaded(ChunkPos::new(1, 1)));
        assert!(table.is_loaded_in_slot(ChunkPos::new(1, 1)));
        assert_eq!(table.state_of(ChunkPos::new(2, 2)), ChunkState::Loading);
        assert!(!table.is_loaded(ChunkPos::new(2, 2)));
        assert_eq!(table.state_of(ChunkPos::new(9, 9)), ChunkState::Unloaded);
        assert_eq!(table.count_in_state(ChunkState::Loaded), 1);
    }

    #[test]
    fn test_set_state() {
        let mut table = ResidencyTable::new();
        let chunk = ChunkPos::new(4, 4);
        table.insert(
            LoadedChunk::new(chunk, ChunkState::Loading),
            EvictionPolicy::Fifo,
            chunk,
        );
        assert!(table.set_state(chunk, ChunkState::Loaded));
        assert!(table.is_loaded(chunk));
        assert!(!table.set_state(ChunkPos::new(5, 5), ChunkState::Loaded));
    }

    #[test]
    fn test_evict_slot() {
        let mut table = ResidencyTable::new();
        let center = ChunkPos::new(0, 0);
        table.insert(loaded(3, 3), EvictionPolicy::Fifo, center);
        table.insert(loaded(4, 3), EvictionPolicy::Fifo, center);

        let removed = table.evict_slot(ChunkPos::new(19, 35).buffer_slot());
        assert_eq!(removed, 1);
        assert!(table.find(ChunkPos::new(3, 3)).is_none());
        assert!(table.is_loaded(ChunkPos::new(4, 3)));
    }

    #[test]
    fn test_evict_outside_is_square() {
        let mut table = ResidencyTable::new();
        let center = ChunkPos::new(10, 10);
        // Corner of the square: Chebyshev 2, Manhattan 4.
        table.insert(loaded(12, 12), EvictionPolicy::Fifo, center);
        table.insert(loaded(13, 10), EvictionPolicy::Fifo, center);

        let removed = table.evict_outside(center, 2);
        assert_eq!(removed, 1);
        assert!(table.is_loaded(ChunkPos::new(12, 12)));
        assert!(!table.is_loaded(ChunkPos::new(13, 10)));
    }

    #[test]
    fn test_overflow_fifo_evicts_oldest_ten() {
        let mut table = ResidencyTable::new();
        let center = ChunkPos::new(0, 0);
        for i in 0..RESIDENCY_CAPACITY as i32 {
            assert_eq!(table.insert(loaded(i, 0), EvictionPolicy::Fifo, center), 0);
        }
        assert!(table.is_full());

        let evicted = table.insert(loaded(1000, 0), EvictionPolicy::Fifo, center);
        assert_eq!(evicted, OVERFLOW_EVICTION_COUNT);
        assert_eq!(table.len(), RESIDENCY_CAPACITY - OVERFLOW_EVICTION_COUNT + 1);
        for i in 0..OVERFLOW_EVICTION_COUNT as i32 {
            assert!(table.find(ChunkPos::new(i, 0)).is_none());
        }
        assert!(table.find(ChunkPos::new(10, 0)).is_some());
        assert!(table.find(ChunkPos::new(1000, 0)).is_some());
    }

    #[test]
    fn test_overflow_farthest_evicts_distant() {
        let mut table = ResidencyTable::new();
        let center = ChunkPos::new(0, 0);
        for i in 0..RESIDENCY_CAPACITY as i32 {
            table.insert(loaded(i, 0), EvictionPolicy::Farthest, center);
        }

        let evicted = table.insert(loaded(-1, 0), EvictionPolicy::Farthest, center);
        assert_eq!(evicted, OVERFLOW_EVICTION_COUNT);
        let last = RESIDENCY_CAPACITY as i32 - 1;
        for i in 0..OVERFLOW_EVICTION_COUNT as i32 {
            assert!(table.find(ChunkPos::new(last - i, 0)).is_none());
        }
        assert!(table.find(ChunkPos::new(0, 0)).is_some());
        assert!(table.find(ChunkPos::new(-1, 0)).is_some());
        assert!(table.len() <= table.capacity());
    }

    #[test]
    fn test_invariants_detect_shared_slot() {
        let mut table = ResidencyTable::new();
        let center = ChunkPos::new(0, 0);
        table.insert(loaded(1, 1), EvictionPolicy::Fifo, center);
        assert!(table.check_invariants().is_ok());

        // Same slot, bypassing evict_slot.
        table.insert(loaded(17, 1), EvictionPolicy::Fifo, center);
        assert!(matches!(
            table.check_invariants(),
            Err(StreamError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_invariants_allow_loading_in_shared_slot() {
        let mut table = ResidencyTable::new();
        let center = ChunkPos::new(0, 0);
        table.insert(loaded(1, 1), EvictionPolicy::Fifo, center);
        table.insert(
            LoadedChunk::new(ChunkPos::new(17, 1), ChunkState::Loading),
            EvictionPolicy::Fifo,
            center,
        );
        assert!(table.check_invariants().is_ok());
    }

    #[test]
    fn test_invariants_detect_duplicate_chunk() {
        let mut table = ResidencyTable::new();
        let center = ChunkPos::new(0, 0);
        table.insert(loaded(2, 2), EvictionPolicy::Fifo, center);
        table.insert(
            LoadedChunk::new(ChunkPos::new(2, 2), ChunkState::Loading),
            EvictionPolicy::Fifo,
            center,
        );
        assert!(table.check_invariants().is_err());
    }
}
