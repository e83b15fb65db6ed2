use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use super::{OnPacketHdlrFn, StreamSession, TrackInfo};
use crate::error::{Error, Result};

type TrackPacket = (usize, rtp::packet::Packet);

/// MockSession is a helper session for tests: packets are pushed by the
/// test and delivered in push order by `play`.
pub struct MockSession {
    tracks: usize,
    start_err: Mutex<Option<Error>>,
    started: AtomicBool,

    on_packet_handler: ArcSwapOption<OnPacketHdlrFn>,

    packet_tx: Mutex<Option<mpsc::Sender<TrackPacket>>>,
    packet_rx: Mutex<Option<mpsc::Receiver<TrackPacket>>>,
    close_tx: Mutex<Option<mpsc::Sender<()>>>,
    close_rx: Mutex<Option<mpsc::Receiver<()>>>,
}

impl MockSession {
    /// new creates a session announcing `tracks` tracks.
    pub fn new(tracks: usize) -> Self {
        let (packet_tx, packet_rx) = mpsc::channel(1000);
        let (close_tx, close_rx) = mpsc::channel(1);
        MockSession {
            tracks,
            start_err: Mutex::new(None),
            started: AtomicBool::new(false),

            on_packet_handler: ArcSwapOption::empty(),

            packet_tx: Mutex::new(Some(packet_tx)),
            packet_rx: Mutex::new(Some(packet_rx)),
            close_tx: Mutex::new(Some(close_tx)),
            close_rx: Mutex::new(Some(close_rx)),
        }
    }

    /// fail_start makes the next start return `err`.
    pub async fn fail_start(&self, err: Error) {
        let mut start_err = self.start_err.lock().await;
        *start_err = Some(err);
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// push schedules a packet for delivery on `track`.
    pub async fn push(&self, track: usize, pkt: rtp::packet::Packet) -> Result<()> {
        let packet_tx = self.packet_tx.lock().await;
        match &*packet_tx {
            Some(tx) => tx
                .send((track, pkt))
                .await
                .map_err(|_| Error::ErrSessionClosed),
            None => Err(Error::ErrSessionClosed),
        }
    }

    /// finish ends the stream: `play` returns once the pushed packets are
    /// delivered.
    pub async fn finish(&self) {
        let mut packet_tx = self.packet_tx.lock().await;
        packet_tx.take();
    }

    /// deliver calls the handler directly, bypassing `play`.
    pub async fn deliver(&self, track: usize, pkt: rtp::packet::Packet) -> Result<()> {
        let handler = self
            .on_packet_handler
            .load_full()
            .ok_or(Error::ErrNoPacketHandler)?;
        handler(track, pkt).await
    }
}

#[async_trait]
impl StreamSession for MockSession {
    async fn start(&self) -> Result<Vec<TrackInfo>> {
        {
            let mut start_err = self.start_err.lock().await;
            if let Some(err) = start_err.take() {
                return Err(err);
            }
        }
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(Error::ErrSessionAlreadyStarted);
        }

        Ok((0..self.tracks)
            .map(|index| TrackInfo { index, ssrc: None })
            .collect())
    }

    async fn on_packet(&self, f: OnPacketHdlrFn) {
        self.on_packet_handler.store(Some(Arc::new(f)));
    }

    async fn play(&self) -> Result<()> {
        if !self.is_started() {
            return Err(Error::ErrSessionNotStarted);
        }
        let handler = self
            .on_packet_handler
            .load_full()
            .ok_or(Error::ErrNoPacketHandler)?;
        let mut packet_rx = {
            let mut packet_rx = self.packet_rx.lock().await;
            packet_rx.take().ok_or(Error::ErrSessionClosed)?
        };
        let mut close_rx = {
            let mut close_rx = self.close_rx.lock().await;
            close_rx.take().ok_or(Error::ErrInvalidCloseRx)?
        };

        loop {
            tokio::select! {
                _ = close_rx.recv() => return Ok(()),
                next = packet_rx.recv() => {
                    match next {
                        Some((track, pkt)) => handler(track, pkt).await?,
                        None => return Ok(()),
                    }
                }
            }
        }
    }

    async fn close(&self) -> Result<()> {
        {
            let mut close_tx = self.close_tx.lock().await;
            close_tx.take();
        }
        self.finish().await;
        Ok(())
    }
}
