
use std::sync::Arc;
use std::time::Duration;

use crate::config::SamplerConfig;
use crate::error::{flatten_errs, Error, Result};
use crate::gate::GateArray;
use crate::recorder::MetadataRecorder;
use crate::sampler::PacketSampler;
use crate::session::{self, StreamSession};
use crate::stats::StatsSnapshot;
use crate::store::{self, PacketStore};
use crate::ticker::SampleTicker;

/// SamplingController owns the gate array of one sampling run and wires
/// the stream session, sampler, ticker and store together.
pub struct SamplingController {
    config: SamplerConfig,
    gates: Arc<GateArray>,
    ticker: SampleTicker,
    sampler: Arc<PacketSampler>,
    session: Arc<dyn StreamSession + Send + Sync>,
    store: Arc<dyn PacketStore + Send + Sync>,
}

impl SamplingController {
    /// connect opens the store and the stream session named by `config`.
    /// Nothing is sampled until `run` is called.
    pub async fn connect(config: SamplerConfig) -> Result<Self> {
        config.validate()?;

        let store = open_store(&config).await?;
        let session = match session::open(
            &config.stream_url,
            config.shutdown_grace,
            config.max_tracks,
        ) {
            Ok(session) => session,
            Err(err) => {
                if let Err(close_err) = store.close().await {
                    log::warn!("failed to close store: {}", close_err);
                }
                return Err(err);
            }
        };

        SamplingController::new(config, session, store)
    }

    /// new builds a controller over an already opened session and store.
    pub fn new(
        config: SamplerConfig,
        session: Arc<dyn StreamSession + Send + Sync>,
        store: Arc<dyn PacketStore + Send + Sync>,
    ) -> Result<Self> {
        config.validate()?;

        let gates = Arc::new(GateArray::new(config.max_tracks)?);
        let recorder = MetadataRecorder::new(Arc::clone(&store))
            .with_write_timeout(config.write_timeout)
            .with_extension_id(config.extension_id)
            .with_byte_order(config.byte_order);
        let sampler = Arc::new(PacketSampler::new(
            Arc::clone(&gates),
            recorder,
            config.error_policy,
        ));
        let ticker = SampleTicker::new(Arc::clone(&gates), config.sample_period);

        Ok(SamplingController {
            config,
            gates,
            ticker,
            sampler,
            session,
            store,
        })
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    pub fn gates(&self) -> &Arc<GateArray> {
        &self.gates
    }

    /// ticks returns how many sampling periods have started.
    pub fn ticks(&self) -> u64 {
        self.ticker.ticks()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.sampler.stats().snapshot()
    }

    /// run starts the session and the ticker and samples packets until the
    /// session ends, is closed, or a packet fails with an error the policy
    /// treats as fatal. That error is returned.
    ///
    /// A session announcing more tracks than `max_tracks` is rejected before
    /// any packet is sampled.
    pub async fn run(&self) -> Result<()> {
        let tracks = self.session.start().await?;
        if let Some(track) = tracks.iter().find(|t| t.index >= self.gates.capacity()) {
            let err = Error::ErrInvalidConfig(format!(
                "session announced track {} but max tracks is {}",
                track.index,
                self.gates.capacity()
            ));
            log::error!("{}", err);
            return Err(err);
        }
        log::info!(
            "sampling {} announced track(s) every {:?}, policy {:?}",
            tracks.len(),
            self.config.sample_period,
            self.config.error_policy
        );

        let sampler = Arc::clone(&self.sampler);
        self.session
            .on_packet(Box::new(move |track: usize, pkt: rtp::packet::Packet| {
                let sampler = Arc::clone(&sampler);
                Box::pin(async move {
                    sampler.on_packet(track, &pkt).await?;
                    Ok(())
                })
            }))
            .await;

        self.ticker.start().await;

        let result = self.session.play().await;
        if let Err(err) = &result {
            log::error!("sampling stopped: {}", err);
        }
        result
    }

    /// close stops the ticker, closes the session, waiting for in-flight
    /// packets up to the shutdown grace, and finally closes the store.
    pub async fn close(&self) -> Result<()> {
        let mut errs = vec![];

        if let Err(err) = self.ticker.close().await {
            errs.push(err);
        }
        if let Err(err) = self.session.close().await {
            errs.push(err);
        }
        if let Err(err) = self.store.close().await {
            errs.push(err);
        }

        log::info!("sampling finished: {}", self.stats());

        flatten_errs(errs)
    }
}

/// open_store opens the store at `config.store_url` and checks it accepts
/// requests, each step bounded by its configured deadline.
pub async fn open_store(config: &SamplerConfig) -> Result<Arc<dyn PacketStore + Send + Sync>> {
    let store =
        match tokio::time::timeout(config.connect_timeout, store::open(&config.store_url)).await {
            Ok(res) => res?,
            Err(_) => return Err(Error::ErrStoreConnectTimeout(config.connect_timeout)),
        };

    if let Err(err) = ping_store(store.as_ref(), config.ping_timeout).await {
        if let Err(close_err) = store.close().await {
            log::warn!("failed to close store: {}", close_err);
        }
        return Err(err);
    }
    log::info!("connected to store {}", config.store_url);

    Ok(store)
}

pub(crate) async fn ping_store(
    store: &(dyn PacketStore + Send + Sync),
    ping_timeout: Duration,
) -> Result<()> {
    match tokio::time::timeout(ping_timeout, store.ping()).await {
        Ok(res) => res,
        Err(_) => Err(Error::ErrStorePingTimeout(ping_timeout)),
    }
}
