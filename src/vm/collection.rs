/// VM-specific methods for stopping the world and reporting to the runtime.
pub trait Collection: Send + Sync {
    /// Stop all mutator threads. The collector calls this before a pause and
    /// [`resume_mutators`](Collection::resume_mutators) after it, from the thread that
    /// triggered the collection.
    fn stop_all_mutators(&self);

    /// Resume the mutators stopped by [`stop_all_mutators`](Collection::stop_all_mutators).
    fn resume_mutators(&self);

    /// Is any thread inside a JNI critical region? A collection cannot start while one is.
    fn is_jni_critical_active(&self) -> bool {
        false
    }

    /// Block until every thread has left its JNI critical region. Called by an allocating
    /// thread that needs a collection while critical regions are active.
    fn wait_for_jni_critical_exit(&self) {}

    /// The number of mutator threads. The young generation grows with it.
    fn number_of_mutators(&self) -> usize {
        1
    }

    /// Delegated to the VM binding when the heap runs out of memory, before the
    /// allocation reports the error.
    ///
    /// Arguments:
    /// * `requested`: the size of the failed allocation in bytes.
    fn out_of_memory(&self, requested: usize) {
        warn!("heap out of memory allocating {} bytes", requested);
    }
}
