use crate::util::constants::*;
use std::default::Default;
use std::str::FromStr;
use strum_macros::EnumString;

/// Which soft reference clearing policy the reference processor uses outside of
/// "clear all soft references" collections.
#[derive(Copy, Clone, EnumString, Debug, PartialEq, Eq)]
pub enum SoftRefPolicySelector {
    /// Keep soft references for `soft_ref_lru_policy_ms_per_mb` ms per free megabyte of the
    /// current heap capacity.
    LruCurrentHeap,
    /// Keep soft references for `soft_ref_lru_policy_ms_per_mb` ms per megabyte the heap could
    /// still grow to.
    LruMaxHeap,
    AlwaysClear,
    NeverClear,
}

/// Where a reference has to live for the collector to discover it.
#[derive(Copy, Clone, EnumString, Debug, PartialEq, Eq)]
pub enum RefDiscoveryPolicy {
    /// The reference object lies inside the span being collected.
    ReferenceBased,
    /// The reference object or its referent lies inside the span being collected.
    ReferentBased,
}

fn always_valid<T>(_: &T) -> bool {
    true
}

fn is_percentage(v: &usize) -> bool {
    *v <= 100
}

macro_rules! options {
    ($($(#[$outer:meta])* $name:ident: $type:ty[$validator:expr] = $default:expr),*,) => [
        options!($($(#[$outer])* $name: $type[$validator] = $default),*);
    ];
    ($($(#[$outer:meta])* $name:ident: $type:ty[$validator:expr] = $default:expr),*) => [
        /// Collector options. Values are validated when set; combinations of values are
        /// validated when the heap is built.
        #[derive(Clone, Debug)]
        pub struct Options {
            $($(#[$outer])* pub $name: $type),*
        }
        impl Options {
            /// Set an option from its snake-case name and a string value. Returns false and
            /// keeps the old value if the value cannot be parsed or is invalid.
            pub fn set_from_str(&mut self, s: &str, val: &str) -> bool {
                match s {
                    // Parse the given value from str (by env vars or by calling process()) to the right type
                    $(stringify!($name) => if let Ok(ref val) = val.parse::<$type>() {
                        // Validate
                        let validate_fn = $validator;
                        let is_valid = validate_fn(val);
                        if is_valid {
                            // Only set value if valid.
                            self.$name = val.clone();
                        } else {
                            warn!("Unable to set {}={:?}. Invalid value. Default value will be used.", s, val);
                        }
                        is_valid
                    } else {
                        warn!("Unable to set {}={:?}. Can't parse value. Default value will be used.", s, val);
                        false
                    })*
                    _ => panic!("Invalid Options key: {}", s)
                }
            }

            /// Whether `s` names an option.
            pub fn is_option(s: &str) -> bool {
                matches!(s, $(stringify!($name))|*)
            }

            /// Read options from environment variables. A variable named `SERIAL_GC_` followed
            /// by the upper-case option name (such as `SERIAL_GC_NEW_RATIO`) sets that option if
            /// its value is valid.
            pub fn read_env_var_settings(&mut self) {
                const PREFIX: &str = "SERIAL_GC_";
                for (key, val) in std::env::vars() {
                    // strip the prefix, and get the lower case string
                    if let Some(rest_of_key) = key.strip_prefix(PREFIX) {
                        let lowercase: &str = &rest_of_key.to_lowercase();
                        if Self::is_option(lowercase) {
                            self.set_from_str(lowercase, &val);
                        }
                    }
                }
            }
        }
        impl Default for Options {
            fn default() -> Self {
                Options {
                    $($name: $default),*
                }
            }
        }
    ]
}

options! {
    /// Initial committed heap size in bytes, young and old together.
    initial_heap_size:                usize                 [|v: &usize| *v > 0] = 8 << LOG_BYTES_IN_MBYTE,
    /// Size of the reserved range in bytes. The heap never grows beyond it.
    max_heap_size:                    usize                 [|v: &usize| *v > 0] = 64 << LOG_BYTES_IN_MBYTE,
    /// Initial young generation size. 0 derives it from `new_ratio`.
    new_size:                         usize                 [always_valid] = 0,
    /// Maximum young generation size. 0 derives it from `new_ratio`.
    max_new_size:                     usize                 [always_valid] = 0,
    /// Ratio of old to young generation sizes.
    new_ratio:                        usize                 [|v: &usize| *v > 0] = 2,
    /// Ratio of eden to one survivor space.
    survivor_ratio:                   usize                 [|v: &usize| *v > 0] = 8,
    /// Upper bound for the tenuring threshold.
    max_tenuring_threshold:           usize                 [|v: &usize| *v <= MAX_TENURING_THRESHOLD] = MAX_TENURING_THRESHOLD,
    /// Desired percentage of the survivor space used after a scavenge.
    target_survivor_ratio:            usize                 [is_percentage] = 50,
    /// Allocations of at least this many bytes go straight to the old generation. 0 disables it.
    pretenure_size_threshold:         usize                 [always_valid] = 0,
    /// Minimum percentage of free old generation space after a full collection.
    min_heap_free_ratio:              usize                 [is_percentage] = 40,
    /// Maximum percentage of free old generation space after a full collection.
    max_heap_free_ratio:              usize                 [is_percentage] = 70,
    /// The old generation grows by at least this many bytes at a time.
    min_heap_delta_bytes:             usize                 [always_valid] = 128 << LOG_BYTES_IN_KBYTE,
    /// Percentage of the old generation the full collector may leave as dead space.
    mark_sweep_dead_ratio:            usize                 [is_percentage] = 5,
    /// Every n-th full collection compacts without leaving dead space.
    mark_sweep_always_compact_count:  usize                 [|v: &usize| *v > 0] = 4,
    /// Milliseconds a softly reachable object is kept per free megabyte.
    soft_ref_lru_policy_ms_per_mb:    usize                 [always_valid] = 1000,
    soft_ref_policy:                  SoftRefPolicySelector [always_valid] = SoftRefPolicySelector::LruMaxHeap,
    ref_discovery_policy:             RefDiscoveryPolicy    [always_valid] = RefDiscoveryPolicy::ReferenceBased,
    /// Use one discovered list per thread, claimed with atomic operations.
    mt_ref_discovery:                 bool                  [always_valid] = false,
    /// Number of discovery queues when `mt_ref_discovery` is on.
    threads:                          usize                 [|v: &usize| *v > 0] = num_cpus::get(),
    /// Number of queues reference processing balances the discovered lists into.
    ref_processing_queues:            usize                 [|v: &usize| *v > 0] = 1,
    /// Unload classes during full collections.
    class_unloading:                  bool                  [always_valid] = true,
    string_dedup:                     bool                  [always_valid] = false,
    /// Age at which a surviving string becomes a deduplication candidate.
    string_dedup_age_threshold:       usize                 [|v: &usize| *v > 0 && *v <= MAX_TENURING_THRESHOLD] = 3,
    /// Object arrays are marked in chunks of this many elements.
    obj_array_marking_stride:         usize                 [|v: &usize| *v > 0] = 512,
    /// How many times an allocation waits for JNI critical regions before giving up.
    gc_locker_retry_allocation_count: usize                 [always_valid] = 2,
    /// Weight of the newest sample in the promotion average, as a percentage.
    adaptive_size_policy_weight:      usize                 [is_percentage] = 10,
    /// Number of deviations added to the promotion average.
    promoted_padding:                 usize                 [always_valid] = 3,
    /// Bytes the young generation grows per mutator thread.
    new_size_thread_increase:         usize                 [always_valid] = 16 << LOG_BYTES_IN_KBYTE,
    /// Fill freed memory with a recognizable pattern.
    zap_unused_heap_area:             bool                  [always_valid] = false,
    /// Verify the heap at the end of every pause.
    verify_after_gc:                  bool                  [always_valid] = false,
}

/// The largest tenuring threshold the mark word can record.
pub const MAX_TENURING_THRESHOLD: usize = crate::util::mark_word::MAX_AGE as usize;

impl Options {
    /// Set an option from a camel-case name such as `newRatio`.
    pub fn set_from_camelcase_str(&mut self, s: &str, val: &str) -> bool {
        trace!("Trying to process option pair: ({}, {})", s, val);

        let mut sr = String::with_capacity(s.len());
        for c in s.chars() {
            if c.is_uppercase() {
                sr.push('_');
                for c in c.to_lowercase() {
                    sr.push(c);
                }
            } else {
                sr.push(c)
            }
        }

        let result = self.set_from_str(sr.as_str(), val);

        if result {
            trace!("Validation passed");
        } else {
            trace!("Validation failed")
        }
        result
    }

    /// The number of discovered lists per reference type.
    pub fn discovery_queues(&self) -> usize {
        if self.mt_ref_discovery {
            self.threads
        } else {
            1
        }
    }
}

impl FromStr for Options {
    type Err = String;

    /// Parse a whitespace-separated list of `name=value` pairs on top of the defaults.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut options = Options::default();
        for pair in s.split_whitespace() {
            let (name, value) = pair
                .split_once('=')
                .ok_or_else(|| format!("expected name=value, found {:?}", pair))?;
            if !Options::is_option(name) {
                return Err(format!("unknown option {:?}", name));
            }
            if !options.set_from_str(name, value) {
                return Err(format!("invalid value for {}: {:?}", name, value));
            }
        }
        Ok(options)
    }
}
