use crate::subprogram::{Subprogram, SubprogramCache, SubprogramId};
use std::{
    cmp::Reverse,
    collections::{BinaryHeap, HashMap, VecDeque},
    fmt,
    sync::Arc,
};
use tracing::debug;

/// Default number of programs kept resident at once.
pub const DEFAULT_MAX_RESIDENT_PROGRAMS: usize = 64;

/// Dense identifier of a resident program, doubling as its GPU slot index.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ProgramId(pub u16);

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "program#{}", self.0)
    }
}

/// The subprograms of one batch in order of first use.
///
/// Order matters: the position of a subprogram is its branch index in the shader.
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq)]
pub struct ProgramDescriptor(pub Vec<SubprogramId>);

#[derive(Debug)]
pub struct Program {
    pub descriptor: ProgramDescriptor,
    pub subprograms: Vec<Arc<Subprogram>>,
    pub id: ProgramId,
}

impl Program {
    /// Highest register count over every channel function of the program.
    pub fn register_count(&self) -> usize {
        self.subprograms
            .iter()
            .map(|subprogram| subprogram.register_count())
            .max()
            .unwrap_or(0)
    }
}

/// Result of [`ProgramCache::get_or_create`].
#[derive(Debug)]
pub struct ProgramLookup {
    pub id: ProgramId,
    pub program: Arc<Program>,
    /// The program was not resident and has to be compiled
    pub created: bool,
    /// A program evicted to make room, it has to be destroyed before `id` is compiled
    pub evicted: Option<ProgramId>,
}

/// Content addressed store of programs with a bound on resident entries.
///
/// When full, the oldest program (by creation) is evicted. Freed ids are handed out
/// again lowest first.
pub struct ProgramCache {
    capacity: usize,
    lookup: HashMap<ProgramDescriptor, ProgramId>,
    slots: Vec<Option<Arc<Program>>>,
    resident: VecDeque<ProgramId>,
    free: BinaryHeap<Reverse<u16>>,
}

impl Default for ProgramCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RESIDENT_PROGRAMS)
    }
}

impl ProgramCache {
    /// Create an empty cache, a capacity of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            lookup: HashMap::new(),
            slots: Vec::new(),
            resident: VecDeque::new(),
            free: BinaryHeap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of resident programs
    pub fn len(&self) -> usize {
        self.resident.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resident.is_empty()
    }

    /// Change the bound on resident programs, returning the ids evicted to meet it.
    pub fn set_capacity(&mut self, capacity: usize) -> Vec<ProgramId> {
        self.capacity = capacity.max(1);

        let mut evicted = Vec::new();
        while self.resident.len() > self.capacity {
            evicted.push(self.evict_oldest());
        }
        evicted
    }

    /// Look up the program for an ordered list of subprograms, creating it on a miss.
    ///
    /// Every listed subprogram must already exist in `subprograms`.
    pub fn get_or_create(&mut self, subprograms: &SubprogramCache, descriptor: ProgramDescriptor) -> ProgramLookup {
        assert!(!descriptor.0.is_empty(), "program without subprograms");

        if let Some(&id) = self.lookup.get(&descriptor) {
            return ProgramLookup {
                id,
                program: self.get(id),
                created: false,
                evicted: None,
            };
        }

        let evicted = (self.resident.len() >= self.capacity).then(|| self.evict_oldest());

        let id = self.allocate();
        let program = Arc::new(Program {
            subprograms: descriptor.0.iter().map(|&subprogram| subprograms.get(subprogram)).collect(),
            descriptor: descriptor.clone(),
            id,
        });

        debug!(id = id.0, subprograms = descriptor.0.len(), ?evicted, "created program");

        self.lookup.insert(descriptor, id);
        self.slots[id.0 as usize] = Some(program.clone());
        self.resident.push_back(id);

        ProgramLookup {
            id,
            program,
            created: true,
            evicted,
        }
    }

    /// The resident program with the given id, panics if the slot is empty.
    pub fn get(&self, id: ProgramId) -> Arc<Program> {
        match self.slots.get(id.0 as usize) {
            Some(Some(program)) => program.clone(),
            _ => panic!("{id} is not resident"),
        }
    }

    pub fn contains(&self, id: ProgramId) -> bool {
        matches!(self.slots.get(id.0 as usize), Some(Some(_)))
    }

    fn allocate(&mut self) -> ProgramId {
        if let Some(Reverse(index)) = self.free.pop() {
            return ProgramId(index);
        }

        let index = u16::try_from(self.slots.len()).unwrap_or_else(|_| panic!("program ids exhausted"));
        self.slots.push(None);
        ProgramId(index)
    }

    fn evict_oldest(&mut self) -> ProgramId {
        let Some(id) = self.resident.pop_front() else {
            panic!("no resident program to evict");
        };

        let Some(program) = self.slots[id.0 as usize].take() else {
            panic!("evicted {id} has no program");
        };

        if self.lookup.remove(&program.descriptor).is_none() {
            panic!("evicted {id} is missing from the lookup");
        }

        debug!(id = id.0, "evicted program");
        self.free.push(Reverse(id.0));
        id
    }
}
