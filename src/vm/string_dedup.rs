use crate::util::ObjectReference;

/// The runtime's string deduplication queue.
///
/// The collectors report strings that became candidates during a pause: strings reaching the
/// age threshold in a survivor space, and younger strings promoted or compacted out of the
/// young generation. The references are the strings' final locations for the pause.
pub trait StringDedup: Send + Sync {
    fn add_candidate(&self, string: ObjectReference);

    /// Called once at the end of every pause that may have reported candidates.
    fn flush(&self) {}
}
