use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, Mutex};
use url::Url;
use util::Unmarshal;
use waitgroup::WaitGroup;

use super::{OnPacketHdlrFn, StreamSession, TrackInfo, SCHEME_UDP};
use crate::error::{Error, Result};

/// Packets queued per track before the socket reader waits.
const TRACK_QUEUE_LEN: usize = 64;

/// Largest UDP payload, so no datagram is ever truncated on receive.
pub(crate) const RECEIVE_BUF_LEN: usize = 65_535;

/// Ignored SSRCs remembered for warn-once logging.
const IGNORED_SSRC_LOG_LIMIT: usize = 1024;

/// UdpSession receives plain RTP datagrams on a UDP socket.
///
/// Tracks are told apart by SSRC. With `?ssrc=` query parameters the
/// tracks are declared up front in parameter order and other SSRCs are
/// ignored; without them each new SSRC becomes the next track index until
/// `max_tracks` tracks exist, after which new SSRCs are ignored.
/// Every track is handled on its own task, so handlers for different
/// tracks run concurrently while packets of one track stay in order.
pub struct UdpSession {
    addr: String,
    declared: Vec<u32>,
    max_tracks: usize,
    grace: Duration,

    conn: Mutex<Option<Arc<UdpSocket>>>,
    on_packet_handler: Arc<ArcSwapOption<OnPacketHdlrFn>>,
    closing: Arc<AtomicBool>,

    wg: Mutex<Option<WaitGroup>>,
    close_tx: Mutex<Option<mpsc::Sender<()>>>,
    close_rx: Mutex<Option<mpsc::Receiver<()>>>,
}

impl UdpSession {
    /// new validates `url` (`udp://host:port[?ssrc=N&ssrc=M]`). At most
    /// `max_tracks` tracks are delivered.
    pub fn new(url: &Url, grace: Duration, max_tracks: usize) -> Result<Self> {
        if max_tracks == 0 {
            return Err(Error::ErrZeroCapacity);
        }
        if url.scheme() != SCHEME_UDP {
            return Err(Error::ErrUnsupportedScheme(url.scheme().to_owned()));
        }
        let host = url
            .host_str()
            .ok_or_else(|| Error::ErrInvalidUrl(format!("{url}: missing host")))?;
        let port = url
            .port()
            .ok_or_else(|| Error::ErrInvalidUrl(format!("{url}: missing port")))?;

        let mut declared = vec![];
        for (k, v) in url.query_pairs() {
            if k == "ssrc" {
                let ssrc = v
                    .parse::<u32>()
                    .map_err(|_| Error::ErrInvalidUrl(format!("{url}: bad ssrc {v}")))?;
                if declared.contains(&ssrc) {
                    return Err(Error::ErrInvalidUrl(format!("{url}: duplicate ssrc {ssrc}")));
                }
                declared.push(ssrc);
            }
        }
        if declared.len() > max_tracks {
            return Err(Error::ErrInvalidUrl(format!(
                "{url}: {} ssrcs declared, at most {max_tracks} tracks",
                declared.len()
            )));
        }

        let (close_tx, close_rx) = mpsc::channel(1);
        Ok(UdpSession {
            // IPv6 hosts come back bracketed from the url crate
            addr: format!("{host}:{port}"),
            declared,
            max_tracks,
            grace,

            conn: Mutex::new(None),
            on_packet_handler: Arc::new(ArcSwapOption::empty()),
            closing: Arc::new(AtomicBool::new(false)),

            wg: Mutex::new(Some(WaitGroup::new())),
            close_tx: Mutex::new(Some(close_tx)),
            close_rx: Mutex::new(Some(close_rx)),
        })
    }

    /// local_addr returns the bound address once started.
    pub async fn local_addr(&self) -> Result<SocketAddr> {
        let conn = self.conn.lock().await;
        match &*conn {
            Some(c) => Ok(c.local_addr()?),
            None => Err(Error::ErrSessionNotStarted),
        }
    }

    fn declared_tracks(&self) -> Vec<TrackInfo> {
        self.declared
            .iter()
            .enumerate()
            .map(|(index, ssrc)| TrackInfo {
                index,
                ssrc: Some(*ssrc),
            })
            .collect()
    }

    async fn spawn_track(
        &self,
        index: usize,
        ssrc: u32,
        handler: Arc<OnPacketHdlrFn>,
        fault_tx: mpsc::Sender<Error>,
    ) -> mpsc::Sender<rtp::packet::Packet> {
        let (tx, mut rx) = mpsc::channel::<rtp::packet::Packet>(TRACK_QUEUE_LEN);
        let mut w = {
            let wait_group = self.wg.lock().await;
            wait_group.as_ref().map(|wg| wg.worker())
        };
        let closing = Arc::clone(&self.closing);

        log::info!("track {} bound to ssrc {} ({:x})", index, ssrc, ssrc);
        tokio::spawn(async move {
            let _d = w.take();
            while let Some(pkt) = rx.recv().await {
                if closing.load(Ordering::SeqCst) {
                    break;
                }
                if let Err(err) = handler(index, pkt).await {
                    let _ = fault_tx.try_send(err);
                    break;
                }
            }
        });

        tx
    }
}

/// is_rtcp tells RTCP apart from RTP on a multiplexed port (RFC 5761).
///
/// RTP with the marker bit set and payload type 64-95 shares this range
/// and is dropped too; RFC 5761 section 4 rules those payload types out
/// for multiplexed streams, so such streams are unsupported.
pub(crate) fn is_rtcp(buf: &[u8]) -> bool {
    buf.len() >= 2 && (192..=223).contains(&buf[1])
}

#[async_trait]
impl StreamSession for UdpSession {
    async fn start(&self) -> Result<Vec<TrackInfo>> {
        let mut conn = self.conn.lock().await;
        if conn.is_some() {
            return Err(Error::ErrSessionAlreadyStarted);
        }
        if self.closing.load(Ordering::SeqCst) {
            return Err(Error::ErrSessionClosed);
        }

        let sock = UdpSocket::bind(&self.addr).await?;
        log::info!("listening for rtp on {}", sock.local_addr()?);
        *conn = Some(Arc::new(sock));

        Ok(self.declared_tracks())
    }

    async fn on_packet(&self, f: OnPacketHdlrFn) {
        self.on_packet_handler.store(Some(Arc::new(f)));
    }

    async fn play(&self) -> Result<()> {
        let conn = {
            let conn = self.conn.lock().await;
            conn.clone().ok_or(Error::ErrSessionNotStarted)?
        };
        let handler = self
            .on_packet_handler
            .load_full()
            .ok_or(Error::ErrNoPacketHandler)?;
        let mut close_rx = {
            let mut close_rx = self.close_rx.lock().await;
            close_rx.take().ok_or(Error::ErrInvalidCloseRx)?
        };

        let (fault_tx, mut fault_rx) = mpsc::channel::<Error>(1);
        let mut tracks: HashMap<u32, mpsc::Sender<rtp::packet::Packet>> = HashMap::new();
        let mut ignored: HashSet<u32> = HashSet::new();
        for info in self.declared_tracks() {
            if let Some(ssrc) = info.ssrc {
                let tx = self
                    .spawn_track(info.index, ssrc, Arc::clone(&handler), fault_tx.clone())
                    .await;
                tracks.insert(ssrc, tx);
            }
        }

        let mut buf = vec![0u8; RECEIVE_BUF_LEN];
        let result = loop {
            tokio::select! {
                _ = close_rx.recv() => {
                    break Ok(());
                }
                Some(err) = fault_rx.recv() => {
                    break Err(err);
                }
                res = conn.recv_from(&mut buf) => {
                    let (n, from) = match res {
                        Ok(r) => r,
                        Err(err) => break Err(err.into()),
                    };
                    if is_rtcp(&buf[..n]) {
                        log::trace!("ignoring rtcp from {}", from);
                        continue;
                    }

                    let mut b = &buf[..n];
                    let pkt = match rtp::packet::Packet::unmarshal(&mut b) {
                        Ok(pkt) => pkt,
                        Err(err) => {
                            log::warn!("dropping undecodable datagram from {}: {}", from, err);
                            continue;
                        }
                    };

                    let ssrc = pkt.header.ssrc;
                    if !tracks.contains_key(&ssrc) {
                        if !self.declared.is_empty() {
                            log::trace!("ignoring undeclared ssrc {}", ssrc);
                            continue;
                        }
                        if tracks.len() >= self.max_tracks {
                            if ignored.len() < IGNORED_SSRC_LOG_LIMIT && ignored.insert(ssrc) {
                                log::warn!(
                                    "ignoring ssrc {} from {}: all {} tracks are taken",
                                    ssrc,
                                    from,
                                    self.max_tracks
                                );
                            } else {
                                log::trace!("ignoring ssrc {} beyond max tracks", ssrc);
                            }
                            continue;
                        }
                        let index = tracks.len();
                        let tx = self
                            .spawn_track(index, ssrc, Arc::clone(&handler), fault_tx.clone())
                            .await;
                        tracks.insert(ssrc, tx);
                    }

                    if let Some(tx) = tracks.get(&ssrc) {
                        // a closed queue means the track task stopped on a
                        // fault, which fault_rx picks up next
                        let _ = tx.send(pkt).await;
                    }
                }
            }
        };

        self.closing.store(true, Ordering::SeqCst);
        result
    }

    async fn close(&self) -> Result<()> {
        self.closing.store(true, Ordering::SeqCst);
        {
            let mut close_tx = self.close_tx.lock().await;
            close_tx.take();
        }

        let wg = {
            let mut wait_group = self.wg.lock().await;
            wait_group.take()
        };
        if let Some(wg) = wg {
            if tokio::time::timeout(self.grace, wg.wait()).await.is_err() {
                log::warn!(
                    "abandoning in-flight packet handlers after {:?}",
                    self.grace
                );
            }
        }

        let mut conn = self.conn.lock().await;
        conn.take();

        Ok(())
    }
}
