use crate::util::mark_word::MAX_AGE;

const TABLE_SIZE: usize = MAX_AGE as usize + 1;

/// Bytes copied into the survivor space per object age during one scavenge.
pub struct AgeTable {
    sizes: [usize; TABLE_SIZE],
}

impl AgeTable {
    pub fn new() -> Self {
        AgeTable {
            sizes: [0; TABLE_SIZE],
        }
    }

    pub fn add(&mut self, age: u8, bytes: usize) {
        self.sizes[age as usize] += bytes;
    }

    pub fn get(&self, age: u8) -> usize {
        self.sizes[age as usize]
    }

    pub fn total(&self) -> usize {
        self.sizes.iter().sum()
    }

    /// The tenuring threshold for the next scavenge: the smallest age at which the bytes of
    /// all younger survivors exceed `target_survivor_ratio` percent of the survivor capacity,
    /// capped by `max_tenuring_threshold`.
    pub fn compute_tenuring_threshold(
        &self,
        survivor_capacity: usize,
        target_survivor_ratio: usize,
        max_tenuring_threshold: usize,
    ) -> usize {
        let desired_survivor_size = survivor_capacity / 100 * target_survivor_ratio;
        let mut total = 0;
        let mut age = 1;
        while age < TABLE_SIZE {
            total += self.sizes[age];
            if total > desired_survivor_size {
                break;
            }
            age += 1;
        }
        let result = age.min(max_tenuring_threshold);
        debug!(
            "desired survivor size {} bytes, new threshold {} (max threshold {})",
            desired_survivor_size, result, max_tenuring_threshold
        );
        result
    }
}

impl Default for AgeTable {
    fn default() -> Self {
        Self::new()
    }
}
