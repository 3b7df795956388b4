//! Lock-free parameter hand-off between control and audio threads.
//!
//! The control thread (UI, host automation, MIDI) must never make the audio
//! thread wait. [`ParamBridge`] is a fixed set of atomic cells declared when
//! the chain is built: the control side stores values and raises a dirty
//! flag, the audio side drains dirty cells at the top of each block. No
//! locks, no allocation after construction, last write wins.
//!
//! Cell keys mirror effect parameter names; two extra keys are routed to the
//! chain itself rather than the effect: `wet_dry` and `bypass`. Tempo goes
//! through [`ParamBridge::set_bpm`] and fans out to every slot.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::string::String;
use alloc::string::ToString;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::chain::EffectChain;

/// Chain-level key: smoothed wet/dry blend of the slot.
const WET_DRY_KEY: &str = "wet_dry";
/// Chain-level key: slot bypass toggle (≥0.5 = bypassed).
const BYPASS_KEY: &str = "bypass";

/// One automatable parameter: f32 bits plus a dirty flag.
#[derive(Debug)]
struct ParamCell {
    key: String,
    bits: AtomicU32,
    dirty: AtomicBool,
}

impl ParamCell {
    fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            bits: AtomicU32::new(0),
            dirty: AtomicBool::new(false),
        }
    }
}

/// Fixed-layout atomic parameter store shared between threads.
///
/// Construct with one key list per chain slot, wrap in an [`Arc`], and hand
/// one clone to each side:
///
/// ```rust
/// use nimbus_effects::{EffectChain, EffectDescriptor, ParamBridge};
///
/// let mut chain = EffectChain::build(&[EffectDescriptor::new("nebula")], 48000.0);
/// let bridge = ParamBridge::shared(&[&["depth", "glow", "wet_dry"]]);
///
/// // control thread
/// bridge.set(0, "depth", 0.8);
///
/// // audio thread, top of block
/// bridge.sync_to_chain(&mut chain);
/// ```
#[derive(Debug)]
pub struct ParamBridge {
    slots: Vec<Vec<ParamCell>>,
    bpm_bits: AtomicU32,
    bpm_dirty: AtomicBool,
}

impl ParamBridge {
    /// Build a bridge with the given keys per slot.
    pub fn new(layout: &[&[&str]]) -> Self {
        let slots = layout
            .iter()
            .map(|keys| keys.iter().map(|k| ParamCell::new(k)).collect())
            .collect();
        Self {
            slots,
            bpm_bits: AtomicU32::new(0),
            bpm_dirty: AtomicBool::new(false),
        }
    }

    /// Build a bridge already wrapped for sharing.
    pub fn shared(layout: &[&[&str]]) -> Arc<Self> {
        Arc::new(Self::new(layout))
    }

    /// Store a value from the control side.
    ///
    /// Returns false when the slot or key was not declared at construction;
    /// the bridge never grows, so an undeclared parameter is a caller bug
    /// worth surfacing.
    pub fn set(&self, slot: usize, key: &str, value: f32) -> bool {
        let Some(cells) = self.slots.get(slot) else {
            return false;
        };
        let Some(cell) = cells.iter().find(|c| c.key == key) else {
            return false;
        };
        // Value first, flag second: once the reader sees the flag, the
        // matching (or a newer) value is already visible
        cell.bits.store(value.to_bits(), Ordering::Release);
        cell.dirty.store(true, Ordering::Release);
        true
    }

    /// Store a tempo change from the control side.
    pub fn set_bpm(&self, bpm: f32) {
        self.bpm_bits.store(bpm.to_bits(), Ordering::Release);
        self.bpm_dirty.store(true, Ordering::Release);
    }

    /// Drain dirty cells into the chain. Audio-thread side; wait-free.
    pub fn sync_to_chain(&self, chain: &mut EffectChain) {
        if self.bpm_dirty.swap(false, Ordering::AcqRel) {
            let bpm = f32::from_bits(self.bpm_bits.load(Ordering::Acquire));
            chain.update_bpm(f64::from(bpm));
        }
        for (slot, cells) in self.slots.iter().enumerate() {
            for cell in cells {
                if !cell.dirty.swap(false, Ordering::AcqRel) {
                    continue;
                }
                let value = f32::from_bits(cell.bits.load(Ordering::Acquire));
                match cell.key.as_str() {
                    WET_DRY_KEY => chain.set_wet_dry(slot, value),
                    BYPASS_KEY => chain.set_bypassed(slot, value >= 0.5),
                    key => chain.set_parameter(slot, key, f64::from(value)),
                }
            }
        }
    }

    /// Number of declared slots.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{EffectDescriptor, EffectKind};
    use crate::params::ParamMap;

    fn echo_chain() -> EffectChain {
        let mut desc = EffectDescriptor::new("echo");
        desc.params = ParamMap::from([("sync", 1.0), ("division", 0.25)]);
        EffectChain::build(&[desc], 48000.0)
    }

    #[test]
    fn set_then_sync_applies_value() {
        let mut chain = echo_chain();
        let bridge = ParamBridge::new(&[&["time", "feedback"]]);

        assert!(bridge.set(0, "feedback", 0.7));
        bridge.sync_to_chain(&mut chain);
        // No panic and the cell is drained; a second sync is a no-op
        bridge.sync_to_chain(&mut chain);
    }

    #[test]
    fn undeclared_key_or_slot_rejected() {
        let bridge = ParamBridge::new(&[&["time"]]);
        assert!(!bridge.set(0, "undeclared", 0.5));
        assert!(!bridge.set(3, "time", 0.5));
        assert!(bridge.set(0, "time", 0.5));
    }

    #[test]
    fn bpm_fans_out_to_synced_slots() {
        let mut chain = echo_chain();
        let bridge = ParamBridge::new(&[&[]]);
        bridge.set_bpm(90.0);
        bridge.sync_to_chain(&mut chain);
        match chain.slots()[0].effect() {
            EffectKind::Echo(echo) => {
                assert!(
                    (echo.delay_ms() - 666.7).abs() < 1.0,
                    "Quarter at 90 BPM, got {}ms",
                    echo.delay_ms()
                );
            }
            other => panic!("Expected echo, got {}", other.id()),
        }
    }

    #[test]
    fn last_write_wins() {
        let mut chain = echo_chain();
        let bridge = ParamBridge::new(&[&["wet_dry"]]);
        bridge.set(0, "wet_dry", 0.1);
        bridge.set(0, "wet_dry", 0.9);
        bridge.sync_to_chain(&mut chain);
        assert!(
            (chain.slots()[0].wet_dry() - 0.9).abs() < 1e-6,
            "Coalesced writes should apply the final value, got {}",
            chain.slots()[0].wet_dry()
        );
    }

    #[test]
    fn chain_level_keys_route_to_slot_state() {
        let mut chain = echo_chain();
        let bridge = ParamBridge::new(&[&["wet_dry", "bypass"]]);

        bridge.set(0, "bypass", 1.0);
        bridge.set(0, "wet_dry", 0.25);
        bridge.sync_to_chain(&mut chain);
        assert!(chain.slots()[0].is_bypassed());
        assert!((chain.slots()[0].wet_dry() - 0.25).abs() < 1e-6);

        bridge.set(0, "bypass", 0.0);
        bridge.sync_to_chain(&mut chain);
        assert!(!chain.slots()[0].is_bypassed());
    }

    #[cfg(feature = "std")]
    #[test]
    fn concurrent_writes_never_corrupt() {
        use std::sync::Arc;
        use std::thread;

        let bridge = Arc::new(ParamBridge::new(&[&["feedback", "time"]]));
        let writer = {
            let bridge = Arc::clone(&bridge);
            thread::spawn(move || {
                for i in 0..10_000 {
                    let v = (i % 100) as f32 / 100.0;
                    bridge.set(0, "feedback", v);
                    bridge.set(0, "time", 1.0 - v);
                }
            })
        };

        let mut chain = echo_chain();
        for _ in 0..1000 {
            bridge.sync_to_chain(&mut chain);
            for _ in 0..16 {
                let out = chain.process(0.5);
                assert!(out.is_finite(), "Racing parameter writes must stay safe");
            }
        }
        writer.join().unwrap();
        bridge.sync_to_chain(&mut chain);
    }
}
