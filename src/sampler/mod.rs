
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::gate::GateArray;
use crate::policy::{ErrorClass, ErrorPolicy, FaultAction};
use crate::recorder::{MetadataRecorder, SampledRecord};
use crate::stats::SamplerStats;

/// SampleOutcome is what happened to one packet handed to the sampler.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SampleOutcome {
    /// The packet won its track's gate and its record was written.
    Recorded(SampledRecord),
    /// The gate was already closed for this period.
    Discarded,
    /// The packet won the gate but recording failed with an error the
    /// policy skips.
    Skipped(ErrorClass),
}

/// PacketSampler decides for every arriving packet whether it is the one
/// captured for its track this period.
///
/// It is shared by all packet handlers and may be called concurrently for
/// any mix of tracks.
pub struct PacketSampler {
    gates: Arc<GateArray>,
    recorder: MetadataRecorder,
    policy: ErrorPolicy,
    stats: Arc<SamplerStats>,
}

impl PacketSampler {
    pub fn new(gates: Arc<GateArray>, recorder: MetadataRecorder, policy: ErrorPolicy) -> Self {
        PacketSampler {
            gates,
            recorder,
            policy,
            stats: Arc::new(SamplerStats::default()),
        }
    }

    pub fn gates(&self) -> &Arc<GateArray> {
        &self.gates
    }

    pub fn recorder(&self) -> &MetadataRecorder {
        &self.recorder
    }

    pub fn policy(&self) -> ErrorPolicy {
        self.policy
    }

    pub fn stats(&self) -> Arc<SamplerStats> {
        Arc::clone(&self.stats)
    }

    /// on_packet closes the gate of `track` and, if this call closed it,
    /// records `pkt` before returning. A packet that finds the gate closed
    /// is dropped without side effects.
    ///
    /// Errors the policy marks fatal are returned; skipped ones are logged
    /// and reported as SampleOutcome::Skipped.
    pub async fn on_packet(
        &self,
        track: usize,
        pkt: &rtp::packet::Packet,
    ) -> Result<SampleOutcome> {
        self.stats.mark_packet();

        let won = match self.gates.try_close(track) {
            Ok(won) => won,
            Err(err) => return self.fault(track, err),
        };
        if !won {
            self.stats.mark_discarded();
            return Ok(SampleOutcome::Discarded);
        }

        match self.recorder.record(track, pkt).await {
            Ok(record) => {
                self.stats.mark_recorded();
                Ok(SampleOutcome::Recorded(record))
            }
            Err(err) => self.fault(track, err),
        }
    }

    fn fault(&self, track: usize, err: Error) -> Result<SampleOutcome> {
        let class = err.class();
        match self.policy.action(class) {
            FaultAction::Fatal => {
                log::error!("track {}: {} fault: {}", track, class, err);
                Err(err)
            }
            FaultAction::Skip => {
                log::warn!("track {}: skipping {} fault: {}", track, class, err);
                self.stats.mark_skipped(class);
                Ok(SampleOutcome::Skipped(class))
            }
        }
    }
}
