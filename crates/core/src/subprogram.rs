use crate::{
    combiner::{CombinerDescriptor, ShaderContext},
    ir::{self, ChannelFunction},
};
use bumpalo::Bump;
use std::{collections::HashMap, fmt, sync::Arc};
use tracing::debug;

/// Dense identifier of a cached subprogram, assigned from zero in creation order.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct SubprogramId(pub u16);

impl fmt::Display for SubprogramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "subprogram#{}", self.0)
    }
}

/// Everything a subprogram is compiled from.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct SubprogramDescriptor {
    pub combiner: CombinerDescriptor,
    pub context: ShaderContext,
}

/// The optimized channel functions for one combiner setup.
#[derive(Debug, PartialEq, Eq)]
pub struct Subprogram {
    pub descriptor: SubprogramDescriptor,
    pub rgb: ChannelFunction,
    pub alpha: ChannelFunction,
    pub id: SubprogramId,
}

impl Subprogram {
    /// Compile a descriptor into optimized channel functions.
    pub fn compile(descriptor: SubprogramDescriptor, id: SubprogramId, arena: &Bump) -> Self {
        let SubprogramDescriptor { combiner, context } = descriptor;
        let rgb1 = context.two_cycle.then(|| &combiner.rgb[1]);
        let alpha1 = context.two_cycle.then(|| &combiner.alpha[1]);

        let mut rgb = ir::build_function(&context, &combiner.rgb[0], rgb1);
        ir::optimize(&mut rgb, arena);

        let mut alpha = ir::build_function(&context, &combiner.alpha[0], alpha1);
        ir::optimize(&mut alpha, arena);

        Self {
            descriptor,
            rgb,
            alpha,
            id,
        }
    }

    pub fn register_count(&self) -> usize {
        self.rgb.register_count().max(self.alpha.register_count())
    }
}

/// Content addressed store of compiled subprograms.
///
/// Entries live as long as the cache and are never recompiled. Two descriptors that
/// optimize to the same code share one subprogram (and its id).
#[derive(Default)]
pub struct SubprogramCache {
    arena: Bump,
    by_descriptor: HashMap<SubprogramDescriptor, SubprogramId>,
    by_code: HashMap<(ChannelFunction, ChannelFunction), SubprogramId>,
    subprograms: Vec<Arc<Subprogram>>,
}

impl SubprogramCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the subprogram for a combiner and draw context, compiling it on a miss.
    ///
    /// Returns `true` as the third element when a new subprogram was created.
    pub fn get_or_create(
        &mut self,
        combiner: &CombinerDescriptor,
        context: &ShaderContext,
    ) -> (SubprogramId, Arc<Subprogram>, bool) {
        let descriptor = SubprogramDescriptor {
            combiner: *combiner,
            context: *context,
        };

        if let Some(&id) = self.by_descriptor.get(&descriptor) {
            return (id, self.get(id), false);
        }

        let next = SubprogramId(
            u16::try_from(self.subprograms.len()).unwrap_or_else(|_| panic!("subprogram ids exhausted")),
        );
        let subprogram = Subprogram::compile(descriptor, next, &self.arena);
        self.arena.reset();

        let code = (subprogram.rgb.clone(), subprogram.alpha.clone());
        let (id, created) = match self.by_code.get(&code) {
            Some(&id) => (id, false),
            None => {
                debug!(
                    id = next.0,
                    rgb = subprogram.rgb.instructions.len(),
                    alpha = subprogram.alpha.instructions.len(),
                    combiner = %combiner,
                    "created subprogram"
                );

                self.by_code.insert(code, next);
                self.subprograms.push(Arc::new(subprogram));
                (next, true)
            }
        };

        self.by_descriptor.insert(descriptor, id);
        (id, self.get(id), created)
    }

    /// The subprogram with the given id, panics if it was never created.
    pub fn get(&self, id: SubprogramId) -> Arc<Subprogram> {
        match self.subprograms.get(id.0 as usize) {
            Some(subprogram) => subprogram.clone(),
            None => panic!("{id} is not in the cache"),
        }
    }

    pub fn len(&self) -> usize {
        self.subprograms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subprograms.is_empty()
    }
}
