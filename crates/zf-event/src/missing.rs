//! Missing-zound registry
//!
//! Names that failed to resolve, kept for diagnostics surfaces until they
//! have not been requested for the expiry window.

use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct MissingZoundRegistry {
    /// Name → engine time of the latest failed lookup
    entries: HashMap<String, f64>,
    expiry_secs: f32,
}

impl MissingZoundRegistry {
    pub fn new(expiry_secs: f32) -> Self {
        Self {
            entries: HashMap::new(),
            expiry_secs,
        }
    }

    pub fn record(&mut self, name: &str, now: f64) {
        self.entries.insert(name.to_string(), now);
    }

    /// Drop entries older than the expiry window
    pub fn prune(&mut self, now: f64) {
        let expiry = f64::from(self.expiry_secs);
        self.entries.retain(|_, seen| now - *seen < expiry);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Sorted names
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_expire() {
        let mut registry = MissingZoundRegistry::new(10.0);
        registry.record("reel_stop", 0.0);
        registry.record("big_win", 5.0);

        registry.prune(9.0);
        assert_eq!(registry.names(), vec!["big_win", "reel_stop"]);

        registry.prune(10.0);
        assert!(!registry.contains("reel_stop"));
        assert!(registry.contains("big_win"));

        // A repeated miss refreshes the entry
        registry.record("big_win", 12.0);
        registry.prune(20.0);
        assert_eq!(registry.len(), 1);
        registry.prune(22.0);
        assert!(registry.is_empty());
    }
}
