use super::IsMarked;
use crate::plan::roots;
use crate::plan::tracing::{scan_object, CompletionBarrier, RootRelocator, SlotVisitor, VectorQueue};
use crate::plan::CollectorContext;
use crate::util::mark_word::MarkWord;
use crate::util::object_model::{self, ObjectKind, ReferenceType};
use crate::util::preserved_marks::PreservedMarks;
use crate::util::{Address, ObjectReference};
use crate::vm::Scanning;

enum MarkTask {
    Object(ObjectReference),
    /// The elements of an object array from `from` on.
    ArraySlice {
        array: ObjectReference,
        from: usize,
    },
}

/// The marking closure of the full collector: marks objects in their mark words and traces
/// them with an explicit stack.
pub(super) struct Marker<'a, S: Scanning> {
    ctx: CollectorContext<'a, S>,
    preserved_marks: &'a mut PreservedMarks,
    dedup_candidates: &'a mut Vec<ObjectReference>,
    stack: VectorQueue<MarkTask>,
    marked: usize,
}

impl<'a, S: Scanning> Marker<'a, S> {
    pub fn new(
        ctx: CollectorContext<'a, S>,
        preserved_marks: &'a mut PreservedMarks,
        dedup_candidates: &'a mut Vec<ObjectReference>,
    ) -> Self {
        Marker {
            ctx,
            preserved_marks,
            dedup_candidates,
            stack: VectorQueue::new(),
            marked: 0,
        }
    }

    pub fn marked_objects(&self) -> usize {
        self.marked
    }

    pub fn mark_from_roots(&mut self) {
        let ctx = self.ctx;
        for root in roots::marking_roots(ctx.options.class_unloading) {
            root.visit(
                ctx.scanning,
                ctx.reference_processor,
                ctx.young.reserved(),
                &mut |object| {
                    self.mark_and_push(object);
                    object
                },
            );
            self.drain();
        }
    }

    /// Set the mark bits of `object`. Returns false if it was marked already.
    fn mark_object(&mut self, object: ObjectReference) -> bool {
        let memory = self.ctx.memory;
        let mark = object_model::load_mark(memory, object);
        if mark.is_marked() {
            return false;
        }
        let options = self.ctx.options;
        if options.string_dedup
            && self.ctx.young.is_in_reserved(object.to_raw_address())
            && (mark.age() as usize) < options.string_dedup_age_threshold
            && object_model::read_descriptor(memory, object).is_string()
        {
            self.dedup_candidates.push(object);
        }
        self.preserved_marks.push_if_necessary(object, mark);
        object_model::store_mark(memory, object, MarkWord::marked());
        self.marked += 1;
        true
    }

    fn mark_and_push(&mut self, object: ObjectReference) {
        if self.mark_object(object) {
            self.stack.push(MarkTask::Object(object));
        }
    }

    /// Trace until the stack is empty. With class unloading, class loader data is strong only
    /// while its holder is marked, so the handles of newly live loaders are marked and traced
    /// until no loader comes alive.
    fn drain(&mut self) {
        loop {
            while let Some(task) = self.stack.pop() {
                match task {
                    MarkTask::Object(object) => self.follow_object(object),
                    MarkTask::ArraySlice { array, from } => self.follow_array_slice(array, from),
                }
            }
            if !self.ctx.options.class_unloading {
                return;
            }
            self.mark_live_class_loader_data();
            if self.stack.is_empty() {
                return;
            }
        }
    }

    fn mark_live_class_loader_data(&mut self) {
        let ctx = self.ctx;
        let young = ctx.young.reserved();
        let is_marked = IsMarked { memory: ctx.memory };
        ctx.scanning
            .visit_live_class_loader_data(&is_marked, &mut |slot: &mut ObjectReference| {
                if !slot.is_null() {
                    self.mark_and_push(*slot);
                }
                young.contains(slot.to_raw_address())
            });
    }

    fn follow_object(&mut self, object: ObjectReference) {
        let memory = self.ctx.memory;
        let desc = object_model::read_descriptor(memory, object);
        if desc.kind() == ObjectKind::ObjArray
            && desc.num_refs() > self.ctx.options.obj_array_marking_stride
        {
            self.follow_array_slice(object, 0);
            return;
        }
        scan_object(memory, object, &mut MarkVisitor { marker: self });
    }

    /// Mark one stride of an array, leaving the rest on the stack.
    fn follow_array_slice(&mut self, array: ObjectReference, from: usize) {
        let memory = self.ctx.memory;
        let length = object_model::read_descriptor(memory, array).num_refs();
        let end = (from + self.ctx.options.obj_array_marking_stride).min(length);
        if end < length {
            self.stack.push(MarkTask::ArraySlice { array, from: end });
        }
        for index in from..end {
            self.mark_slot(object_model::ref_slot(array, index));
        }
    }

    fn mark_slot(&mut self, slot: Address) {
        let object = self.ctx.memory.load_reference(slot);
        if !object.is_null() {
            self.mark_and_push(object);
        }
    }
}

impl<S: Scanning> RootRelocator for Marker<'_, S> {
    fn keep_alive(&mut self, object: ObjectReference) -> ObjectReference {
        self.mark_and_push(object);
        object
    }
}

impl<S: Scanning> CompletionBarrier for Marker<'_, S> {
    fn complete(&mut self) {
        self.drain();
    }
}

struct MarkVisitor<'m, 'a, S: Scanning> {
    marker: &'m mut Marker<'a, S>,
}

impl<S: Scanning> SlotVisitor for MarkVisitor<'_, '_, S> {
    fn visit_slot(&mut self, slot: Address) {
        self.marker.mark_slot(slot);
    }

    fn discover_reference(&mut self, reference: ObjectReference, rt: ReferenceType) -> bool {
        let ctx = self.marker.ctx;
        ctx.reference_processor.discover_reference(
            ctx.memory,
            reference,
            rt,
            0,
            &IsMarked { memory: ctx.memory },
        )
    }
}

