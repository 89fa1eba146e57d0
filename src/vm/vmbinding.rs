use super::{Collection, Scanning, StringDedup};

/// The `VMBinding` trait associates the runtime's implementations of the collector interface.
pub trait VMBinding
where
    Self: Sized + 'static + Send + Sync,
{
    type VMScanning: Scanning;
    type VMCollection: Collection;
    type VMStringDedup: StringDedup;
}
