//! Process-wide table mapping boundary integers to live taggers.
//!
//! A handle encodes `(generation << 32) | (slot + 1)`. The table checks the
//! slot range, the generation and the slot's liveness before handing out a
//! tagger, so a stale or forged integer never reaches `libmecab`.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::error::{MecabError, Result};
use crate::runtime::Tagger;

/// Shared, individually locked tagger stored in a table slot.
pub type SharedTagger = Arc<Mutex<Tagger>>;

/// Opaque integer handle exchanged with the host runtime.
///
/// `0` is never issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnalyzerHandle(i64);

impl AnalyzerHandle {
    /// The null handle.
    pub const NULL: AnalyzerHandle = AnalyzerHandle(0);

    /// Wraps a value received from the boundary.
    pub fn from_raw(value: i64) -> Self {
        Self(value)
    }

    /// Value handed across the boundary.
    pub fn into_raw(self) -> i64 {
        self.0
    }

    /// Whether this is the null handle.
    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    fn new(index: usize, generation: u32) -> Self {
        Self(((generation as i64) << 32) | (index as i64 + 1))
    }

    fn index(self) -> Option<usize> {
        let low = (self.0 as u64 & u64::from(u32::MAX)) as usize;
        low.checked_sub(1)
    }

    fn generation(self) -> u32 {
        (self.0 as u64 >> 32) as u32
    }
}

impl fmt::Display for AnalyzerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

#[derive(Default)]
struct Slot {
    generation: u32,
    tagger: Option<SharedTagger>,
}

/// Arena of tagger slots indexed by [`AnalyzerHandle`].
#[derive(Default)]
pub struct HandleTable {
    slots: Vec<Slot>,
    free: Vec<usize>,
}

impl HandleTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `tagger` and issues a fresh handle for it.
    pub fn insert(&mut self, tagger: Tagger) -> AnalyzerHandle {
        let tagger = Arc::new(Mutex::new(tagger));
        let index = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.generation += 1;
                slot.tagger = Some(tagger);
                index
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    tagger: Some(tagger),
                });
                self.slots.len() - 1
            }
        };
        let handle = AnalyzerHandle::new(index, self.slots[index].generation);
        debug!(%handle, "handle issued");
        handle
    }

    /// Returns the tagger behind `handle` if it is live.
    pub fn get(&self, handle: AnalyzerHandle) -> Result<SharedTagger> {
        let result = self.lookup(handle);
        if let Err(error) = &result {
            warn!(%handle, %error, "handle rejected");
        }
        result
    }

    fn lookup(&self, handle: AnalyzerHandle) -> Result<SharedTagger> {
        if handle.is_null() {
            return Err(MecabError::InvalidHandle("handle is null".to_string()));
        }
        let slot = handle
            .index()
            .and_then(|index| self.slots.get(index))
            .ok_or_else(|| {
                MecabError::InvalidHandle(format!("handle {handle} was never issued"))
            })?;
        if handle.generation() > slot.generation {
            return Err(MecabError::InvalidHandle(format!(
                "handle {handle} was never issued"
            )));
        }
        match &slot.tagger {
            Some(tagger) if handle.generation() == slot.generation => Ok(tagger.clone()),
            _ => Err(MecabError::InvalidHandle(format!(
                "handle {handle} has been disposed"
            ))),
        }
    }

    /// Detaches the tagger behind `handle`. Unknown or already released
    /// handles return `None`.
    pub fn remove(&mut self, handle: AnalyzerHandle) -> Option<SharedTagger> {
        self.lookup(handle).ok()?;
        let index = handle.index()?;
        let tagger = self.slots[index].tagger.take();
        self.release_slot(index);
        debug!(%handle, "handle released");
        tagger
    }

    // A slot whose generation is exhausted is retired so that a wrapped
    // generation never revives an old handle.
    fn release_slot(&mut self, index: usize) {
        if self.slots[index].generation == u32::MAX {
            debug!(index, "slot retired");
            return;
        }
        self.free.push(index);
    }

    /// Detaches every live tagger. Old handles stay rejected afterwards.
    pub fn clear(&mut self) -> Vec<SharedTagger> {
        let mut released = Vec::new();
        for index in 0..self.slots.len() {
            if let Some(tagger) = self.slots[index].tagger.take() {
                released.push(tagger);
                self.release_slot(index);
            }
        }
        released
    }

    /// Number of live handles.
    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.tagger.is_some()).count()
    }
}

/// Disposes a detached tagger, waiting for any in-flight parse on it.
pub(crate) fn dispose_shared(tagger: &SharedTagger) {
    lock_tagger(tagger).dispose();
}

pub(crate) fn lock_tagger(tagger: &SharedTagger) -> MutexGuard<'_, Tagger> {
    tagger.lock().unwrap_or_else(PoisonError::into_inner)
}

static REGISTRY: Mutex<HandleTable> = Mutex::new(HandleTable {
    slots: Vec::new(),
    free: Vec::new(),
});

/// Locks the process-wide handle table.
pub(crate) fn registry() -> MutexGuard<'static, HandleTable> {
    REGISTRY.lock().unwrap_or_else(PoisonError::into_inner)
}
