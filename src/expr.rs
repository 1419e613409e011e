use std::sync::Arc;

use crate::symbol::Symbol;

use ExprKind::*;

/// A stable integer index into the arena. The only way to refer to an
/// expression — never a raw pointer, so rewiring and compaction are
/// just index remaps.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprIdx(pub u32);

impl std::fmt::Debug for ExprIdx {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl ExprIdx {
    fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// The four node shapes an expression slot can hold.
#[derive(Clone, Debug)]
pub enum ExprKind {
    Var(Symbol),
    /// A distinguished built-in operator, e.g. `trace` or `void`.
    Magic(Arc<str>),
    Fun { param: Symbol, body: ExprIdx },
    App { lhs: ExprIdx, rhs: ExprIdx },
}

/// One arena slot. `visited` and `live` are the two collector bits.
#[derive(Clone, Debug)]
pub struct Slot {
    pub kind: ExprKind,
    pub visited: bool,
    pub live: bool,
}

/// An append-mostly vector of slots plus a free-list of dead indices,
/// together with the collector's "current generation" bookkeeping. All
/// three pieces of state live on one `Arena` value rather than as
/// separate globals, so a process can host more than one independent
/// arena (e.g. under test) without aliasing.
pub struct Arena {
    slots: Vec<Slot>,
    free_list: Vec<ExprIdx>,
    /// Two-slot ring of allocation logs. New allocations are appended to
    /// `generations[current_gen]`; that is also the buffer the next
    /// `gc::collect` sweeps. Slots found live during a sweep are carried
    /// into `generations[1 - current_gen]`, which then becomes the new
    /// `current_gen` for subsequent allocations and the following sweep.
    generations: [Vec<ExprIdx>; 2],
    current_gen: usize,
}

impl Arena {
    pub fn new() -> Self {
        Arena {
            slots: Vec::new(),
            free_list: Vec::new(),
            generations: [Vec::new(), Vec::new()],
            current_gen: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|s| s.live).count()
    }

    pub fn dead_count(&self) -> usize {
        self.free_list.len()
    }

    /// Allocates a fresh slot, preferring the free-list over appending,
    /// and logs the new index onto the currently-filling generation so
    /// the next sweep can consider it.
    fn alloc(&mut self, kind: ExprKind) -> ExprIdx {
        let idx = match self.free_list.pop() {
            Some(idx) => {
                debug_assert!(!self.slots[idx.as_usize()].live);
                self.slots[idx.as_usize()] = Slot { kind, visited: false, live: true };
                idx
            }
            None => {
                let idx = ExprIdx(self.slots.len() as u32);
                self.slots.push(Slot { kind, visited: false, live: true });
                idx
            }
        };
        self.generations[self.current_gen].push(idx);
        idx
    }

    pub fn mk_var(&mut self, sym: Symbol) -> ExprIdx {
        self.alloc(Var(sym))
    }

    pub fn mk_magic(&mut self, label: Arc<str>) -> ExprIdx {
        self.alloc(Magic(label))
    }

    pub fn mk_fun(&mut self, param: Symbol, body: ExprIdx) -> ExprIdx {
        self.alloc(Fun { param, body })
    }

    pub fn mk_app(&mut self, lhs: ExprIdx, rhs: ExprIdx) -> ExprIdx {
        self.alloc(App { lhs, rhs })
    }

    pub fn get(&self, idx: ExprIdx) -> &ExprKind {
        let slot = &self.slots[idx.as_usize()];
        debug_assert!(slot.live, "index {:?} refers to a dead slot", idx);
        &slot.kind
    }

    pub fn is_live(&self, idx: ExprIdx) -> bool {
        self.slots.get(idx.as_usize()).map_or(false, |s| s.live)
    }

    pub(crate) fn slot_mut(&mut self, idx: ExprIdx) -> &mut Slot {
        &mut self.slots[idx.as_usize()]
    }

    pub(crate) fn slots_len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn slot(&self, idx: ExprIdx) -> &Slot {
        &self.slots[idx.as_usize()]
    }

    pub(crate) fn all_indices(&self) -> impl Iterator<Item = ExprIdx> {
        (0..self.slots.len() as u32).map(ExprIdx)
    }

    pub(crate) fn free_list_mut(&mut self) -> &mut Vec<ExprIdx> {
        &mut self.free_list
    }

    pub(crate) fn free_list(&self) -> &[ExprIdx] {
        &self.free_list
    }

    pub(crate) fn generations_mut(&mut self) -> &mut [Vec<ExprIdx>; 2] {
        &mut self.generations
    }

    pub(crate) fn current_gen(&self) -> usize {
        self.current_gen
    }

    pub(crate) fn swap_generation(&mut self) {
        self.current_gen = 1 - self.current_gen;
    }

    /// Rebuilds the arena as a fresh contiguous vector containing only
    /// live slots, in order, and returns the old→new index remap.
    /// Children are *not* rewritten here — that is `gc::compact`'s job,
    /// since it must also touch external holders (bindings, pool, grid,
    /// generation lists).
    pub(crate) fn take_compacted(&mut self) -> Vec<Option<ExprIdx>> {
        let mut remap = vec![None; self.slots.len()];
        let mut new_slots = Vec::with_capacity(self.live_count());
        for (old_idx, slot) in self.slots.iter().enumerate() {
            if slot.live {
                let new_idx = ExprIdx(new_slots.len() as u32);
                remap[old_idx] = Some(new_idx);
                new_slots.push(slot.clone());
            }
        }
        self.slots = new_slots;
        self.free_list.clear();
        self.generations = [Vec::new(), Vec::new()];
        self.current_gen = 0;
        remap
    }

    /// Rewrites every child index in every slot through `remap`, used
    /// immediately after `take_compacted`.
    pub(crate) fn remap_children(&mut self, remap: &[Option<ExprIdx>]) {
        for slot in self.slots.iter_mut() {
            match &mut slot.kind {
                Var(_) | Magic(_) => {}
                Fun { body, .. } => *body = remap[body.as_usize()].expect("live slot referenced a dead child"),
                App { lhs, rhs } => {
                    *lhs = remap[lhs.as_usize()].expect("live slot referenced a dead child");
                    *rhs = remap[rhs.as_usize()].expect("live slot referenced a dead child");
                }
            }
        }
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::Interner;

    #[test]
    fn alloc_prefers_free_list() {
        let mut arena = Arena::new();
        let mut interner = Interner::new();
        let x = arena.mk_var(Symbol::source(interner.intern("x")));
        let y = arena.mk_var(Symbol::source(interner.intern("y")));
        assert_ne!(x, y);
        arena.free_list_mut().push(x);
        let before = arena.len();
        let z = arena.mk_var(Symbol::source(interner.intern("z")));
        assert_eq!(z, x, "allocation should reuse the freed slot rather than grow");
        assert_eq!(arena.len(), before);
    }
}
