use crate::plan::CollectorContext;
use crate::policy::space::ContiguousSpace;
use crate::util::mark_word::MarkWord;
use crate::util::mem_region::MemRegion;
use crate::util::object_forwarding;
use crate::util::object_model;
use crate::util::{Address, ObjectReference};
use crate::vm::Scanning;

/// Computes new addresses for the marked objects and slides them there.
///
/// The spaces form one sequence, old first, then eden and from, then to if it holds objects
/// left by a failed scavenge. Objects are packed in that order into the same sequence, so an
/// object never moves up within it.
///
/// After address computation a space is a mix of marked objects, whose mark words carry
/// their forwarding pointers, and dead runs. The first word of a dead run holds the address
/// of the next marked object, so later phases skip dead runs without parsing them.
pub(super) struct Compactor<'a, S: Scanning> {
    ctx: CollectorContext<'a, S>,
    spaces: Vec<&'a ContiguousSpace>,
    /// Per space, the end of the last marked object.
    end_of_live: Vec<Address>,
    /// Per space, the top after compaction.
    new_tops: Vec<Address>,
    live_bytes: usize,
    dead_space_bytes: usize,
    moved_objects: usize,
}

impl<'a, S: Scanning> Compactor<'a, S> {
    pub fn new(ctx: CollectorContext<'a, S>) -> Self {
        let young = ctx.young;
        let mut spaces = vec![&ctx.old.space, &young.eden, &young.from];
        if !young.to.is_empty() {
            spaces.push(&young.to);
        }
        let bottoms: Vec<Address> = spaces.iter().map(|s| s.bottom()).collect();
        Compactor {
            ctx,
            spaces,
            end_of_live: bottoms.clone(),
            new_tops: bottoms,
            live_bytes: 0,
            dead_space_bytes: 0,
            moved_objects: 0,
        }
    }

    pub fn live_bytes(&self) -> usize {
        self.live_bytes
    }

    pub fn dead_space_bytes(&self) -> usize {
        self.dead_space_bytes
    }

    pub fn moved_objects(&self) -> usize {
        self.moved_objects
    }

    fn is_marked(&self, object: ObjectReference) -> bool {
        object_model::load_mark(self.ctx.memory, object).is_marked()
    }

    /// The end of the run of unmarked objects starting at `start`.
    fn dead_run_end(&self, start: Address, top: Address) -> Address {
        let memory = self.ctx.memory;
        let mut end = start;
        while end < top {
            let object = ObjectReference::from_raw_address(end);
            if self.is_marked(object) {
                break;
            }
            end += object_model::get_size(memory, object);
        }
        end
    }

    /// Give `object` the next free address of the compaction point, moving the point on to
    /// the next space when the current one is full.
    fn forward(
        &mut self,
        object: ObjectReference,
        size: usize,
        dest: &mut usize,
        compact_top: &mut Address,
    ) {
        while self.spaces[*dest].end() - *compact_top < size {
            self.new_tops[*dest] = *compact_top;
            *dest += 1;
            *compact_top = self.spaces[*dest].bottom();
        }
        let new_object = ObjectReference::from_raw_address(*compact_top);
        object_forwarding::forward_object_to(self.ctx.memory, object, new_object);
        *compact_top += size;
    }

    /// Phase 2. Unless `skip_dead`, dead runs at the start of the old space that compaction
    /// would not close up anyway are kept as fillers, within `mark_sweep_dead_ratio` percent
    /// of the space.
    pub fn compute_new_addresses(&mut self, skip_dead: bool) {
        let memory = self.ctx.memory;
        let dead_ratio = self.ctx.options.mark_sweep_dead_ratio;
        let mut dest = 0;
        let mut compact_top = self.spaces[0].bottom();

        for i in 0..self.spaces.len() {
            let space = self.spaces[i];
            let mut allowed_dead = if i == 0 && !skip_dead {
                space.capacity() / 100 * dead_ratio
            } else {
                0
            };
            let top = space.top();
            let mut q = space.bottom();
            let mut end_of_live = q;
            while q < top {
                let object = ObjectReference::from_raw_address(q);
                if self.is_marked(object) {
                    let size = object_model::get_size(memory, object);
                    self.forward(object, size, &mut dest, &mut compact_top);
                    self.live_bytes += size;
                    q += size;
                    end_of_live = q;
                    continue;
                }
                let run_end = self.dead_run_end(q, top);
                let run = run_end - q;
                if dest == i && compact_top == q && run <= allowed_dead {
                    // Nothing below has moved: leave the run in place as a marked filler.
                    object_model::fill_with_object(memory, q, run_end);
                    object_model::store_mark(memory, object, MarkWord::marked());
                    self.forward(object, run, &mut dest, &mut compact_top);
                    allowed_dead -= run;
                    self.dead_space_bytes += run;
                    end_of_live = run_end;
                } else {
                    memory.store_word(q, run_end.as_usize());
                }
                q = run_end;
            }
            self.end_of_live[i] = end_of_live;
            trace!(
                "{}: live objects end at {}, compaction point in {} at {}",
                space.name(),
                end_of_live,
                self.spaces[dest].name(),
                compact_top
            );
        }
        self.new_tops[dest] = compact_top;
    }

    /// Visit the marked objects of space `i` in address order. `f` gets each object and its
    /// size and may move it down.
    fn walk_live_objects(&self, i: usize, mut f: impl FnMut(ObjectReference, usize)) {
        let memory = self.ctx.memory;
        let mut q = self.spaces[i].bottom();
        let end = self.end_of_live[i];
        while q < end {
            let object = ObjectReference::from_raw_address(q);
            if self.is_marked(object) {
                let size = object_model::get_size(memory, object);
                f(object, size);
                q += size;
            } else {
                q = Address::from_usize(memory.load_word(q));
            }
        }
    }

    /// Phase 3, heap part: point every reference field of a live object at the new location
    /// of its target.
    pub fn adjust_pointers(&self) {
        let memory = self.ctx.memory;
        for i in 0..self.spaces.len() {
            self.walk_live_objects(i, |object, _| {
                let desc = object_model::read_descriptor(memory, object);
                for slot in object_model::reference_slots(&desc, object) {
                    let target = memory.load_reference(slot);
                    if !target.is_null() {
                        memory.store_reference(
                            slot,
                            object_forwarding::read_forwarding_pointer(memory, target),
                        );
                    }
                }
            });
        }
    }

    /// Phase 4: slide every live object to its new location, reset its mark and trim the
    /// spaces to their new tops.
    pub fn compact(&mut self) {
        let memory = self.ctx.memory;
        let mut moved = 0;
        for i in 0..self.spaces.len() {
            self.walk_live_objects(i, |object, size| {
                let new_object = object_forwarding::read_forwarding_pointer(memory, object);
                if new_object != object {
                    memory.copy(
                        object.to_raw_address(),
                        new_object.to_raw_address(),
                        size >> crate::util::constants::LOG_BYTES_IN_WORD,
                    );
                    moved += 1;
                }
                object_model::store_mark(memory, new_object, MarkWord::prototype());
            });
        }
        self.moved_objects = moved;

        let zap = self.ctx.options.zap_unused_heap_area;
        for (space, &new_top) in self.spaces.iter().zip(self.new_tops.iter()) {
            let old_top = space.top();
            space.set_top(new_top);
            space.set_saved_mark();
            if zap && new_top < old_top {
                space.mangle_region(memory, MemRegion::new(new_top, old_top));
            }
        }
    }
}
