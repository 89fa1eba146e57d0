//! Exponentially decaying averages used by the generation sizing heuristics.

/// Once this many samples have been taken, the average uses its configured weight instead of
/// weighting early samples more heavily.
const OLD_THRESHOLD: u32 = 100;

/// A weighted average that adapts quickly while it has few samples, plus a padded variant of
/// the average that adds `padding` times the average deviation. The padded average of
/// promoted bytes is what the old generation must be able to absorb before a scavenge.
#[derive(Clone, Debug)]
pub struct AdaptivePaddedAverage {
    weight: u32,
    padding: u32,
    sample_count: u32,
    is_old: bool,
    average: f64,
    deviation: f64,
    padded_average: f64,
    last_sample: f64,
}

impl AdaptivePaddedAverage {
    /// `weight` is the percentage the newest sample contributes once the average is warm.
    pub fn new(weight: u32, padding: u32) -> Self {
        debug_assert!(weight <= 100);
        AdaptivePaddedAverage {
            weight,
            padding,
            sample_count: 0,
            is_old: false,
            average: 0.0,
            deviation: 0.0,
            padded_average: 0.0,
            last_sample: 0.0,
        }
    }

    fn exp_avg(avg: f64, sample: f64, weight: u32) -> f64 {
        ((100 - weight) as f64 * avg + weight as f64 * sample) / 100.0
    }

    fn compute_adaptive_average(&self, new_sample: f64, average: f64) -> f64 {
        // Until the average is old, weight each sample at least as much as a plain
        // arithmetic mean would.
        let count_weight = if self.is_old {
            0
        } else {
            OLD_THRESHOLD / self.sample_count
        };
        let adaptive_weight = self.weight.max(count_weight).min(100);
        Self::exp_avg(average, new_sample, adaptive_weight)
    }

    pub fn sample(&mut self, new_sample: f64) {
        self.sample_count = self.sample_count.saturating_add(1);
        if !self.is_old && self.sample_count > OLD_THRESHOLD {
            self.is_old = true;
        }
        self.average = self.compute_adaptive_average(new_sample, self.average);
        self.last_sample = new_sample;

        let new_deviation =
            self.compute_adaptive_average((new_sample - self.average).abs(), self.deviation);
        self.deviation = new_deviation;
        self.padded_average = self.average + self.padding as f64 * new_deviation;
    }

    pub fn average(&self) -> f64 {
        self.average
    }

    pub fn deviation(&self) -> f64 {
        self.deviation
    }

    pub fn padded_average(&self) -> f64 {
        self.padded_average
    }

    pub fn last_sample(&self) -> f64 {
        self.last_sample
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }
}
