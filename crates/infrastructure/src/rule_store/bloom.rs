use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

/// Zero-allocation double-hashed (Kirsch–Mitzenmacher) bloom filter. A
/// miss is authoritative ("definitely not present"); a hit only means
/// "maybe present", which is why bloom-backed rule stores always pair this
/// with an exact-match confirmation step.
pub struct AtomicBloom {
    bits: Vec<AtomicU64>,
    num_bits: usize,
    num_hashes: usize,
}

impl AtomicBloom {
    pub fn new(capacity: usize, fp_rate: f64) -> Self {
        let num_bits = Self::optimal_num_bits(capacity.max(1), fp_rate);
        let num_hashes = Self::optimal_num_hashes(capacity.max(1), num_bits);
        let num_words = num_bits.div_ceil(64);
        Self {
            bits: (0..num_words).map(|_| AtomicU64::new(0)).collect(),
            num_bits,
            num_hashes,
        }
    }

    pub fn set(&self, key: &str) {
        let (h1, h2) = Self::double_hash(key);
        for i in 0..self.num_hashes {
            let bit = Self::nth_hash(h1, h2, i as u64, self.num_bits);
            self.bits[bit / 64].fetch_or(1u64 << (bit % 64), Ordering::Relaxed);
        }
    }

    pub fn check(&self, key: &str) -> bool {
        let (h1, h2) = Self::double_hash(key);
        for i in 0..self.num_hashes {
            let bit = Self::nth_hash(h1, h2, i as u64, self.num_bits);
            if self.bits[bit / 64].load(Ordering::Relaxed) & (1u64 << (bit % 64)) == 0 {
                return false;
            }
        }
        true
    }

    fn double_hash(key: &str) -> (u64, u64) {
        let mut hasher = FxHasher::default();
        key.hash(&mut hasher);
        let h1 = hasher.finish();
        let h2 = h1
            .wrapping_mul(0x517cc1b727220a95)
            .wrapping_add(0x6c62272e07bb0142);
        (h1, h2)
    }

    fn nth_hash(h1: u64, h2: u64, i: u64, num_bits: usize) -> usize {
        (h1.wrapping_add(i.wrapping_mul(h2)) as usize) % num_bits
    }

    fn optimal_num_bits(capacity: usize, fp_rate: f64) -> usize {
        (-1.0 * capacity as f64 * fp_rate.ln() / (2.0_f64.ln().powi(2))).ceil() as usize
    }

    fn optimal_num_hashes(capacity: usize, num_bits: usize) -> usize {
        ((num_bits as f64 / capacity as f64) * 2.0_f64.ln())
            .ceil()
            .max(1.0) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_check_is_always_true() {
        let bloom = AtomicBloom::new(1000, 0.01);
        bloom.set("ads.example");
        assert!(bloom.check("ads.example"));
    }

    #[test]
    fn unrelated_key_is_usually_absent() {
        let bloom = AtomicBloom::new(1000, 0.001);
        bloom.set("ads.example");
        assert!(!bloom.check("clean.example"));
    }
}
