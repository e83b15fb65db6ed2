use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::policy::ErrorClass;

/// SamplerStats counts what the sampler did with every packet it was handed.
#[derive(Debug, Default)]
pub struct SamplerStats {
    packets: AtomicU64,
    recorded: AtomicU64,
    discarded: AtomicU64,
    skipped_malformed: AtomicU64,
    skipped_store_write: AtomicU64,
    skipped_out_of_bounds: AtomicU64,
}

impl SamplerStats {
    pub(crate) fn mark_packet(&self) {
        self.packets.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn mark_recorded(&self) {
        self.recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn mark_discarded(&self) {
        self.discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn mark_skipped(&self, class: ErrorClass) {
        let counter = match class {
            ErrorClass::MalformedPacket => &self.skipped_malformed,
            ErrorClass::StoreWrite => &self.skipped_store_write,
            ErrorClass::OutOfBounds => &self.skipped_out_of_bounds,
            ErrorClass::Setup => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            packets: self.packets.load(Ordering::Relaxed),
            recorded: self.recorded.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            skipped_malformed: self.skipped_malformed.load(Ordering::Relaxed),
            skipped_store_write: self.skipped_store_write.load(Ordering::Relaxed),
            skipped_out_of_bounds: self.skipped_out_of_bounds.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub struct StatsSnapshot {
    pub packets: u64,
    pub recorded: u64,
    pub discarded: u64,
    pub skipped_malformed: u64,
    pub skipped_store_write: u64,
    pub skipped_out_of_bounds: u64,
}

impl StatsSnapshot {
    pub fn skipped(&self) -> u64 {
        self.skipped_malformed + self.skipped_store_write + self.skipped_out_of_bounds
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "packets={} recorded={} discarded={} skipped(malformed={} store_write={} out_of_bounds={})",
            self.packets,
            self.recorded,
            self.discarded,
            self.skipped_malformed,
            self.skipped_store_write,
            self.skipped_out_of_bounds
        )
    }
}
