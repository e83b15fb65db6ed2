use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use rtp_sampler::config::{DEFAULT_MAX_TRACKS, DEFAULT_STORE_URL, DEFAULT_STREAM_URL};
use rtp_sampler::policy::{ByteOrder, ErrorPolicy};
use rtp_sampler::recorder::DEFAULT_EXTENSION_ID;
use rtp_sampler::{SamplerConfig, SamplingController};

#[derive(Parser, Debug)]
#[command(
    name = "rtp-sampler",
    version,
    author = "Rain Liu <yliu@webrtc.rs>",
    about = "Records the metadata of one RTP packet per track per sampling period."
)]
struct Cli {
    /// Stream to sample, e.g. udp://0.0.0.0:5004?ssrc=1234
    #[arg(long, default_value = DEFAULT_STREAM_URL)]
    stream: String,

    /// Store for sampled records: sqlite://<path>, file://<path> or memory://
    #[arg(long, default_value = DEFAULT_STORE_URL)]
    store: String,

    /// Sampling period in seconds
    #[arg(long, value_parser = parse_secs, default_value = "5")]
    period: Duration,

    /// Number of sampled tracks
    #[arg(long, default_value_t = DEFAULT_MAX_TRACKS)]
    max_tracks: usize,

    /// Deadline of one store write in seconds
    #[arg(long, value_parser = parse_secs, default_value = "5")]
    write_timeout: Duration,

    /// Deadline of connecting to the store in seconds
    #[arg(long, value_parser = parse_secs, default_value = "10")]
    connect_timeout: Duration,

    /// Deadline of the initial store ping in seconds
    #[arg(long, value_parser = parse_secs, default_value = "2")]
    ping_timeout: Duration,

    /// Time in seconds allowed for in-flight packets on shutdown
    #[arg(long, value_parser = parse_secs, default_value = "5")]
    shutdown_grace: Duration,

    /// Header extension id carrying the send time
    #[arg(long, default_value_t = DEFAULT_EXTENSION_ID)]
    extension_id: u8,

    /// Byte order of the send time: little-endian or big-endian
    #[arg(long, default_value = "little-endian")]
    byte_order: String,

    /// Skip malformed packets and failed store writes instead of stopping
    #[arg(long)]
    tolerant: bool,

    /// Prints debug log information
    #[arg(short, long)]
    debug: bool,

    /// Log level when --debug is not given: error, warn, info, debug or trace
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn parse_secs(s: &str) -> std::result::Result<Duration, String> {
    let secs: f64 = s.parse().map_err(|e| format!("{s}: {e}"))?;
    Duration::try_from_secs_f64(secs).map_err(|e| format!("{s}: {e}"))
}

impl Cli {
    fn config(&self) -> Result<SamplerConfig> {
        let error_policy = if self.tolerant {
            ErrorPolicy::tolerant()
        } else {
            ErrorPolicy::strict()
        };

        let config = SamplerConfig::builder()
            .with_stream_url(self.stream.clone())
            .with_store_url(self.store.clone())
            .with_sample_period(self.period)
            .with_max_tracks(self.max_tracks)
            .with_write_timeout(self.write_timeout)
            .with_connect_timeout(self.connect_timeout)
            .with_ping_timeout(self.ping_timeout)
            .with_shutdown_grace(self.shutdown_grace)
            .with_extension_id(self.extension_id)
            .with_byte_order(ByteOrder::try_from(self.byte_order.as_str())?)
            .with_error_policy(error_policy)
            .build()?;

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.debug {
        log::LevelFilter::Trace
    } else {
        cli.log_level
            .parse::<log::LevelFilter>()
            .map_err(|e| anyhow::anyhow!("{}: {}", cli.log_level, e))?
    };
    env_logger::Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{}:{} [{}] {} - {}",
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.level(),
                chrono::Local::now().format("%H:%M:%S.%6f"),
                record.args()
            )
        })
        .filter(None, level)
        .init();

    let config = cli.config()?;
    let controller = Arc::new(SamplingController::connect(config).await?);

    let mut run = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move { controller.run().await })
    };

    println!("Press ctrl-c to stop");
    let result = tokio::select! {
        res = &mut run => {
            res.unwrap_or_else(|e| Err(rtp_sampler::Error::ErrOthers(e.to_string())))
        }
        _ = tokio::signal::ctrl_c() => {
            println!();
            Ok(())
        }
    };

    let closed = controller.close().await;
    if !run.is_finished() {
        // close ends the session, so the run task returns shortly
        let _ = run.await;
    }
    println!("{}", controller.stats());

    shutdown_result(result, closed)
}

/// shutdown_result reports the error that stopped sampling ahead of any
/// error met while closing, which is logged instead.
fn shutdown_result(
    run: rtp_sampler::error::Result<()>,
    close: rtp_sampler::error::Result<()>,
) -> Result<()> {
    match (run, close) {
        (Err(run_err), Err(close_err)) => {
            log::error!("failed to close after sampling stopped: {}", close_err);
            Err(run_err.into())
        }
        (Err(err), Ok(())) | (Ok(()), Err(err)) => Err(err.into()),
        (Ok(()), Ok(())) => Ok(()),
    }
}
