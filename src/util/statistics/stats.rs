use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// A snapshot of the collector's counters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GCStatistics {
    /// Completed pauses of either kind.
    pub gc_count: usize,
    pub young_collections: usize,
    pub full_collections: usize,
    /// Scavenges that hit promotion failure and were completed by a full collection.
    pub promotion_failures: usize,
    /// Scavenges skipped because the old generation could not absorb the promotion volume.
    pub young_collections_skipped: usize,
    pub bytes_promoted: usize,
    pub total_pause_time: Duration,
    pub max_pause_time: Duration,
}

/// Counters updated by the pause driver.
pub struct Stats {
    gc_count: AtomicUsize,
    young_collections: AtomicUsize,
    full_collections: AtomicUsize,
    promotion_failures: AtomicUsize,
    young_collections_skipped: AtomicUsize,
    bytes_promoted: AtomicUsize,
    pause_times: Mutex<(Duration, Duration)>,
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

impl Stats {
    pub fn new() -> Self {
        Stats {
            gc_count: AtomicUsize::new(0),
            young_collections: AtomicUsize::new(0),
            full_collections: AtomicUsize::new(0),
            promotion_failures: AtomicUsize::new(0),
            young_collections_skipped: AtomicUsize::new(0),
            bytes_promoted: AtomicUsize::new(0),
            pause_times: Mutex::new((Duration::ZERO, Duration::ZERO)),
        }
    }

    /// Start a pause. Returns the pause id and the start time.
    pub fn start_gc(&self) -> (usize, Instant) {
        let id = self.gc_count.fetch_add(1, Ordering::SeqCst);
        (id, Instant::now())
    }

    /// End a pause that started at `start`. Returns the pause duration.
    pub fn end_gc(&self, start: Instant) -> Duration {
        let elapsed = start.elapsed();
        let mut times = self.pause_times.lock().unwrap();
        times.0 += elapsed;
        times.1 = times.1.max(elapsed);
        elapsed
    }

    pub fn gc_count(&self) -> usize {
        self.gc_count.load(Ordering::SeqCst)
    }

    pub fn full_collections(&self) -> usize {
        self.full_collections.load(Ordering::SeqCst)
    }

    pub fn record_young_collection(&self, promoted_bytes: usize) {
        self.young_collections.fetch_add(1, Ordering::SeqCst);
        self.bytes_promoted
            .fetch_add(promoted_bytes, Ordering::SeqCst);
    }

    pub fn record_full_collection(&self) {
        self.full_collections.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_promotion_failure(&self) {
        self.promotion_failures.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_young_collection_skipped(&self) {
        self.young_collections_skipped
            .fetch_add(1, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> GCStatistics {
        let times = self.pause_times.lock().unwrap();
        GCStatistics {
            gc_count: self.gc_count.load(Ordering::SeqCst),
            young_collections: self.young_collections.load(Ordering::SeqCst),
            full_collections: self.full_collections.load(Ordering::SeqCst),
            promotion_failures: self.promotion_failures.load(Ordering::SeqCst),
            young_collections_skipped: self.young_collections_skipped.load(Ordering::SeqCst),
            bytes_promoted: self.bytes_promoted.load(Ordering::SeqCst),
            total_pause_time: times.0,
            max_pause_time: times.1,
        }
    }

    /// Print the counters in the tab-separated form harnesses parse.
    pub fn print_stats(&self) {
        let s = self.snapshot();
        println!("============================ Serial GC Statistics Totals ============================");
        println!("GC\tyoung\tfull\tpromotion.failures\tyoung.skipped\tpromoted.bytes\ttime.gc.ms\ttime.max.ms");
        println!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{:.2}\t{:.2}",
            s.gc_count,
            s.young_collections,
            s.full_collections,
            s.promotion_failures,
            s.young_collections_skipped,
            s.bytes_promoted,
            s.total_pause_time.as_secs_f64() * 1000.0,
            s.max_pause_time.as_secs_f64() * 1000.0
        );
        println!("------------------------------ End Serial GC Statistics -----------------------------");
    }
}
