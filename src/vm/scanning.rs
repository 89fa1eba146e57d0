use crate::plan::tracing::LivenessOracle;
use crate::util::ObjectReference;

/// Visits one root slot. The visitor may overwrite the slot with the object's new location.
pub type RootVisitor<'a> = dyn FnMut(&mut ObjectReference) + 'a;

/// Visits one handle of a class loader data. Returns true if the handle still refers into the
/// young generation after the visit; the runtime then keeps the class loader data in its
/// modified set, so the next young collection visits it again.
pub type CldHandleVisitor<'a> = dyn FnMut(&mut ObjectReference) -> bool + 'a;

/// Which compiled code a code root visit covers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CodeRootScope {
    /// Code that may refer into the young generation.
    Scavengable,
    All,
}

/// Which class loader data a visit treats as strong.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CldScope {
    /// Class loader data with handles stored since it was last visited and found free of
    /// young references.
    Modified,
    /// Class loader data that is never unloaded, such as the boot loader's.
    AlwaysStrong,
    All,
}

/// VM-specific methods for scanning roots.
pub trait Scanning: Send + Sync {
    /// Visit the strong roots held by the runtime: thread stacks, JNI handles and other VM
    /// globals.
    fn visit_strong_roots(&self, visitor: &mut RootVisitor);

    /// Visit the object references embedded in compiled code.
    fn visit_code_roots(&self, scope: CodeRootScope, visitor: &mut RootVisitor);

    /// Visit the handles of class loader data. Class loader data in `scope` goes to `strong`;
    /// the rest goes to `weak` if given and is skipped otherwise.
    fn visit_class_loader_data(
        &self,
        scope: CldScope,
        strong: &mut CldHandleVisitor,
        weak: Option<&mut CldHandleVisitor>,
    );

    /// Visit the handles of the class loader data outside [`CldScope::AlwaysStrong`] whose
    /// holder `is_alive` reports live. Full collections with class unloading call this each
    /// time marking drains, until a visit marks nothing new. Unloaded class loader data is
    /// never visited again.
    fn visit_live_class_loader_data(
        &self,
        is_alive: &dyn LivenessOracle,
        visitor: &mut CldHandleVisitor,
    );

    /// Visit every weak root slot, e.g. interned strings and weak JNI handles.
    fn weak_root_slots(&self, _visitor: &mut RootVisitor) {}

    /// Clear the weak roots to dead objects and pass the others to `keep_alive`.
    fn visit_weak_roots(&self, is_alive: &dyn LivenessOracle, keep_alive: &mut RootVisitor) {
        self.weak_root_slots(&mut |slot: &mut ObjectReference| {
            if slot.is_null() {
                return;
            }
            if is_alive.is_alive(*slot) {
                keep_alive(slot);
            } else {
                *slot = ObjectReference::NULL;
            }
        });
    }

    /// Unload the class loader data whose holders are dead. Only called by full
    /// collections with class unloading enabled, after marking. Returns true if anything was
    /// unloaded.
    fn do_unloading(&self, is_alive: &dyn LivenessOracle) -> bool;
}
