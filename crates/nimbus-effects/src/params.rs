//! Named parameter maps for the control boundary.
//!
//! Effects receive parameter changes as name→value mappings: the persistence
//! and UI layers deal in names, the audio layer deals in clamped, smoothed
//! floats. [`ParamMap`] is the carrier between them.
//!
//! The map is a small sorted-insertion vector rather than a hash map: effect
//! parameter sets have at most a handful of entries, and a `Vec` keeps the
//! type `no_std`-friendly and cheap to clone into descriptors.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::string::String;
use alloc::string::ToString;
use alloc::vec::Vec;

/// Reserved key used to forward tempo to tempo-synced effects.
pub const BPM_KEY: &str = "bpm";

/// An ordered name→value parameter mapping.
///
/// Values are `f64` at this boundary (matching host automation precision);
/// effects clamp and downconvert when applying them. Inserting an existing
/// key replaces its value.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParamMap {
    entries: Vec<(String, f64)>,
}

impl ParamMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a parameter value.
    pub fn set(&mut self, key: &str, value: f64) {
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| k == key) {
            entry.1 = value;
        } else {
            self.entries.push((key.to_string(), value));
        }
    }

    /// Look up a parameter value.
    pub fn get(&self, key: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| *v)
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<const N: usize> From<[(&str, f64); N]> for ParamMap {
    fn from(pairs: [(&str, f64); N]) -> Self {
        let mut map = Self::new();
        for (k, v) in pairs {
            map.set(k, v);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get() {
        let mut map = ParamMap::new();
        map.set("cloud", 0.5);
        map.set("depth", 0.8);
        assert_eq!(map.get("cloud"), Some(0.5));
        assert_eq!(map.get("depth"), Some(0.8));
        assert_eq!(map.get("missing"), None);
    }

    #[test]
    fn insert_replaces() {
        let mut map = ParamMap::new();
        map.set("glow", 0.1);
        map.set("glow", 0.9);
        assert_eq!(map.get("glow"), Some(0.9));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn from_pairs() {
        let map = ParamMap::from([("cloud", 0.5), ("drift", 0.2)]);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("drift"), Some(0.2));
    }

    #[test]
    fn iteration_preserves_order() {
        let map = ParamMap::from([("a", 1.0), ("b", 2.0), ("c", 3.0)]);
        let keys: Vec<&str> = map.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["a", "b", "c"]);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_roundtrip() {
        let map = ParamMap::from([("cloud", 0.5), ("depth", 0.25)]);
        let json = serde_json::to_string(&map).unwrap();
        let back: ParamMap = serde_json::from_str(&json).unwrap();
        assert_eq!(map, back);
    }
}
