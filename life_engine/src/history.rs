// history.rs - Recent generation hashes, for spotting still lifes and oscillators

pub struct StateHistory {
    hashes: Vec<u64>,
    next: usize,
    capacity: usize,
}

impl StateHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            hashes: Vec::with_capacity(capacity),
            next: 0,
            capacity,
        }
    }

    /// Records `hash`; returns true if it was already among the recent ones.
    pub fn observe(&mut self, hash: u64) -> bool {
        if self.hashes.contains(&hash) {
            return true;
        }
        if self.capacity == 0 {
            return false;
        }
        if self.hashes.len() < self.capacity {
            self.hashes.push(hash);
        } else {
            self.hashes[self.next] = hash;
        }
        self.next = (self.next + 1) % self.capacity;
        false
    }

    pub fn reset(&mut self) {
        self.hashes.clear();
        self.next = 0;
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_period_within_capacity() {
        let mut history = StateHistory::new(3);
        assert!(!history.observe(1));
        assert!(!history.observe(2));
        assert!(history.observe(1));
    }

    #[test]
    fn forgets_beyond_capacity() {
        let mut history = StateHistory::new(2);
        history.observe(1);
        history.observe(2);
        history.observe(3);
        assert_eq!(history.len(), 2);
        assert!(!history.observe(1));
    }

    #[test]
    fn reset_forgets_everything() {
        let mut history = StateHistory::new(4);
        history.observe(9);
        history.reset();
        assert!(history.is_empty());
        assert!(!history.observe(9));
    }
}
