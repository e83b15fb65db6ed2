
pub mod mock;
pub mod udp;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::error::{Error, Result};

pub use mock::MockSession;
pub use udp::UdpSession;

pub const SCHEME_UDP: &str = "udp";

/// OnPacketHdlrFn is called for every packet the session delivers, with
/// the index of the track the packet belongs to. An Err stops the session
/// and is returned from `play`.
pub type OnPacketHdlrFn = Box<
    dyn (Fn(usize, rtp::packet::Packet) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'static>>)
        + Send
        + Sync,
>;

/// TrackInfo describes one track announced by a session.
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct TrackInfo {
    pub index: usize,
    pub ssrc: Option<u32>,
}

/// StreamSession is the source of RTP packets.
#[async_trait]
pub trait StreamSession {
    /// start sets up the session and returns the tracks known up front.
    /// Sessions that discover tracks while playing may return none.
    async fn start(&self) -> Result<Vec<TrackInfo>>;

    /// on_packet sets the handler called for every delivered packet.
    async fn on_packet(&self, f: OnPacketHdlrFn);

    /// play delivers packets until the session is closed, returning the
    /// first error a handler produced.
    async fn play(&self) -> Result<()>;

    /// close stops delivery and waits up to the session's grace period for
    /// in-flight handlers.
    async fn close(&self) -> Result<()>;
}

/// open creates the session for `url` without starting it. The session
/// delivers packets for at most `max_tracks` tracks.
pub fn open(
    url: &str,
    grace: Duration,
    max_tracks: usize,
) -> Result<Arc<dyn StreamSession + Send + Sync>> {
    let u = Url::parse(url)?;
    match u.scheme() {
        SCHEME_UDP => Ok(Arc::new(UdpSession::new(&u, grace, max_tracks)?)),
        other => Err(Error::ErrUnsupportedScheme(other.to_owned())),
    }
}
