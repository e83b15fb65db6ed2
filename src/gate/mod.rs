#[cfg(test)]
mod gate_test;

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{Error, Result};

/// GateArray holds one binary gate per track index.
///
/// A gate is opened for every track by `open_all` once per sampling period
/// and closed again by the first packet of that track to win `try_close`.
/// Every access is a single atomic operation on one gate; no lock is taken,
/// and `open_all` is not atomic across gates.
#[derive(Debug)]
pub struct GateArray {
    gates: Vec<AtomicBool>,
}

impl GateArray {
    /// new creates a GateArray with `capacity` gates, all closed.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::ErrZeroCapacity);
        }

        Ok(GateArray {
            gates: (0..capacity).map(|_| AtomicBool::new(false)).collect(),
        })
    }

    pub fn capacity(&self) -> usize {
        self.gates.len()
    }

    /// open_all opens every gate. Gates that are already open stay open.
    pub fn open_all(&self) {
        for gate in &self.gates {
            gate.store(true, Ordering::Release);
        }
    }

    /// try_close closes the gate at `index` if it is open and reports
    /// whether this call performed the transition. At most one caller per
    /// gate wins between two `open_all` calls.
    pub fn try_close(&self, index: usize) -> Result<bool> {
        let gate = self.gate(index)?;
        Ok(gate
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok())
    }

    pub fn is_open(&self, index: usize) -> Result<bool> {
        Ok(self.gate(index)?.load(Ordering::Acquire))
    }

    fn gate(&self, index: usize) -> Result<&AtomicBool> {
        self.gates
            .get(index)
            .ok_or(Error::ErrTrackIndexOutOfBounds {
                index,
                capacity: self.gates.len(),
            })
    }
}
