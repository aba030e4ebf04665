//! Transport seam: resolving peers to channels and sending on them

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use sdkpack_errors::TransferError;

use crate::message::{ImportChunk, Message};

/// Opaque network endpoint of a peer
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerAddress(String);

impl PeerAddress {
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<SocketAddr> for PeerAddress {
    fn from(addr: SocketAddr) -> Self {
        Self(addr.to_string())
    }
}

impl From<&str> for PeerAddress {
    fn from(addr: &str) -> Self {
        Self(addr.to_string())
    }
}

/// A live connection to one peer
pub trait Channel: Send + Sync {
    /// Queue a message for the peer
    ///
    /// # Errors
    ///
    /// Returns `TransferError::SendFailed` if the channel can no longer
    /// accept messages.
    fn send(&self, message: Message) -> Result<(), TransferError>;
}

/// Lookup of live channels by peer address
pub trait ChannelRegistry: Send + Sync {
    fn find_channel(&self, peer: &PeerAddress) -> Option<Arc<dyn Channel>>;
}

/// Channel that keeps encoded frames in memory
#[derive(Debug, Default)]
pub struct MemoryChannel {
    frames: Mutex<Vec<Bytes>>,
    closed: AtomicBool,
}

impl MemoryChannel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn frames(&self) -> MutexGuard<'_, Vec<Bytes>> {
        self.frames.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stop accepting messages
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.frames().len()
    }

    /// Take every frame sent so far and decode them as archive chunks
    ///
    /// # Errors
    ///
    /// Returns `TransferError::MalformedChunk` if a frame does not decode.
    pub fn drain_chunks(&self) -> Result<Vec<ImportChunk>, TransferError> {
        let frames = std::mem::take(&mut *self.frames());
        frames
            .into_iter()
            .map(|frame| Message::decode(frame).map(|Message::ImportClientSdk(chunk)| chunk))
            .collect()
    }
}

impl Channel for MemoryChannel {
    fn send(&self, message: Message) -> Result<(), TransferError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransferError::SendFailed {
                peer: "memory".to_string(),
                message: "channel closed".to_string(),
            });
        }
        self.frames().push(message.encode());
        Ok(())
    }
}

/// Registry of in-process channels, used for loopback transfers
#[derive(Default)]
pub struct InMemoryRegistry {
    channels: Mutex<HashMap<PeerAddress, Arc<MemoryChannel>>>,
}

impl InMemoryRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn channels(&self) -> MutexGuard<'_, HashMap<PeerAddress, Arc<MemoryChannel>>> {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a channel for `peer`, replacing any previous one
    pub fn connect(&self, peer: PeerAddress) -> Arc<MemoryChannel> {
        let channel = Arc::new(MemoryChannel::new());
        self.channels().insert(peer, Arc::clone(&channel));
        channel
    }

    /// Forget the channel for `peer`
    pub fn disconnect(&self, peer: &PeerAddress) -> Option<Arc<MemoryChannel>> {
        self.channels().remove(peer)
    }
}

impl ChannelRegistry for InMemoryRegistry {
    fn find_channel(&self, peer: &PeerAddress) -> Option<Arc<dyn Channel>> {
        self.channels()
            .get(peer)
            .map(|channel| Arc::clone(channel) as Arc<dyn Channel>)
    }
}
