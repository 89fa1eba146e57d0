//! The building blocks of the generations: contiguous bump-pointer spaces and the side
//! tables over the old generation.

/// Contiguous spaces with bump-pointer allocation.
pub mod space;

/// The card table that records old-to-young pointers.
pub mod card_table;
/// Finds object starts in the old generation from arbitrary addresses.
pub mod block_offset_table;
