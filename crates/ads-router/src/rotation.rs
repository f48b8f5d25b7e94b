//! Round-robin selection across the reachable members of a tier.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Shared rotation counter. Each call to [`RoundRobin::next`] advances it by
/// exactly one; concurrent callers never observe the same ticket.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index into a list of `len` candidates. Returns 0 for an empty list
    /// without advancing.
    pub fn next(&self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        self.counter.fetch_add(1, Ordering::Relaxed) % len
    }

    /// Tickets handed out so far.
    pub fn issued(&self) -> usize {
        self.counter.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    #[test]
    fn test_wraps_modulo_len() {
        let rr = RoundRobin::new();
        let picks: Vec<usize> = (0..7).map(|_| rr.next(3)).collect();
        assert_eq!(picks, vec![0, 1, 2, 0, 1, 2, 0]);
        assert_eq!(rr.issued(), 7);
    }

    #[test]
    fn test_empty_list_does_not_advance() {
        let rr = RoundRobin::new();
        assert_eq!(rr.next(0), 0);
        assert_eq!(rr.issued(), 0);
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let rr = Arc::new(RoundRobin::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let rr = Arc::clone(&rr);
                std::thread::spawn(move || (0..300).map(|_| rr.next(4)).collect::<Vec<_>>())
            })
            .collect();

        let mut counts: HashMap<usize, usize> = HashMap::new();
        for handle in handles {
            for idx in handle.join().unwrap() {
                *counts.entry(idx).or_default() += 1;
            }
        }
        assert_eq!(rr.issued(), 2_400);
        assert!(counts.values().all(|c| *c == 600), "uneven: {counts:?}");
    }
}
