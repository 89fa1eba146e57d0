//! Utilities used by other modules, including the simulated heap memory, the object model
//! and the reference processor.

/// An abstraction of address and object reference.
pub mod address;
/// Constants used in the collector.
pub mod constants;
/// Calculation, conversion and rounding for memory related numbers.
pub mod conversions;
/// Errors the heap reports to its users.
pub mod error;
/// Linear scan through a parsable range of the heap.
pub mod linear_scan;
/// Wrapper functions for logging.
pub mod logger;
pub mod mark_word;
pub mod mem_region;
/// The word-addressed memory backing the simulated heap.
pub mod memory;
/// Forwarding pointers installed in mark words.
pub mod object_forwarding;
/// Object layout: header, descriptor and fields.
pub mod object_model;
/// Collector options.
pub mod options;
/// Mark words saved across a pause that overwrites them.
pub mod preserved_marks;
/// Field access for reference objects.
pub mod reference_glue;
/// Reference discovery and processing.
pub mod reference_processor;
/// Collection counters and averages.
pub mod statistics;


pub use self::address::Address;
pub use self::address::ObjectReference;
