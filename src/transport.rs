//! # Transport Abstraction
//!
//! This module defines the traits the session drivers use to reach the network:
//! a datagram socket, a hostname resolver and an MQTT protocol client. None of
//! them are implemented here beyond thin `embassy-net` adapters in
//! [`crate::net`]; the protocol engines stay external.
//!
//! With the Rust 2024 Edition, these traits use native `async fn`, removing the
//! need for the `#[async_trait]` macro.

use core::net::Ipv4Addr;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use embassy_time::Duration;

use crate::error::{ConnectReturnCode, SendErrorKind, errno};

/// An IPv4 address and port pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub addr: Ipv4Addr,
    pub port: u16,
}

impl Endpoint {
    pub const fn new(addr: Ipv4Addr, port: u16) -> Self {
        Self { addr, port }
    }
}

/// A marker trait for adapter errors, with the hooks the sessions need to
/// classify them.
pub trait TransportError: core::fmt::Debug {
    /// Category used when this error is the result of a datagram send.
    fn send_error_kind(&self) -> SendErrorKind {
        SendErrorKind::Unspecified
    }

    /// `true` when the operation merely could not make progress yet.
    fn is_would_block(&self) -> bool {
        false
    }
}

/// An errno-style error code, as returned by socket offload drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Errno(pub i32);

impl TransportError for Errno {
    fn send_error_kind(&self) -> SendErrorKind {
        SendErrorKind::from_errno(self.0)
    }

    fn is_would_block(&self) -> bool {
        self.0.wrapping_abs() == errno::EAGAIN
    }
}

/// A connectionless socket bound for the lifetime of one session.
#[allow(async_fn_in_trait)]
pub trait DatagramSocket {
    /// The error type returned by the socket.
    type Error: TransportError;

    /// Opens (binds) the socket.
    fn open(&mut self) -> Result<(), Self::Error>;

    /// Sends one datagram to `peer`, returning the number of bytes sent.
    async fn send_to(&mut self, buf: &[u8], peer: Endpoint) -> Result<usize, Self::Error>;

    /// Receives one datagram into `buf`.
    ///
    /// With `timeout` set to `None` the call may block indefinitely.
    async fn recv_from(
        &mut self,
        buf: &mut [u8],
        timeout: Option<Duration>,
    ) -> Result<usize, Self::Error>;

    /// Closes the socket. Closing twice is harmless.
    fn close(&mut self);
}

/// Resolves hostnames to IPv4 addresses.
#[allow(async_fn_in_trait)]
pub trait Resolver {
    type Error: core::fmt::Debug;

    async fn resolve(&mut self, host: &str) -> Result<Ipv4Addr, Self::Error>;
}

/// Represents the Quality of Service (QoS) levels for MQTT messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum QoS {
    AtMostOnce = 0,
    AtLeastOnce = 1,
    ExactlyOnce = 2,
}

/// MQTT protocol revision requested on connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProtocolVersion {
    V3_1,
    V3_1_1,
}

/// Transport security of the broker connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportSecurity {
    NonSecure,
    Tls,
}

/// Options handed to the client on connect.
#[derive(Debug, Clone, Copy)]
pub struct ClientOptions<'a> {
    pub client_id: &'a str,
    pub protocol: ProtocolVersion,
    pub user_name: Option<&'a str>,
    pub password: Option<&'a [u8]>,
    pub security: TransportSecurity,
    pub keep_alive_secs: u16,
    pub rx_buffer_size: usize,
    pub tx_buffer_size: usize,
}

impl Default for ClientOptions<'_> {
    fn default() -> Self {
        Self {
            client_id: "zephyr0099",
            protocol: ProtocolVersion::V3_1_1,
            user_name: None,
            password: None,
            security: TransportSecurity::NonSecure,
            keep_alive_secs: 60,
            rx_buffer_size: 256,
            tx_buffer_size: 256,
        }
    }
}

/// A single outbound publish.
#[derive(Debug, Clone, Copy)]
pub struct Message<'a> {
    pub topic: &'a str,
    pub payload: &'a [u8],
    pub qos: QoS,
    pub message_id: u16,
    pub retain: bool,
    pub dup: bool,
}

/// Notifications the client emits while processing input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClientEvent {
    /// The broker answered the connect request.
    ConnAck(ConnectReturnCode),
    /// The connection is gone, closed by either side.
    Disconnected,
    /// A QoS 1 publish was acknowledged.
    PubAck(u16),
}

/// Mailbox between the client's event context and the publish session.
///
/// `CONNACK` and disconnect notifications are latched in [`Signal`]s that
/// hold the latest value, so neither is lost however many `PUBACK`s are
/// waiting. `PUBACK`s queue in a channel of `DEPTH` entries and are dropped
/// once it is full.
pub struct ClientEvents<M: RawMutex, const DEPTH: usize> {
    connack: Signal<M, ConnectReturnCode>,
    disconnected: Signal<M, ()>,
    pubacks: Channel<M, u16, DEPTH>,
}

impl<M: RawMutex, const DEPTH: usize> ClientEvents<M, DEPTH> {
    pub const fn new() -> Self {
        Self {
            connack: Signal::new(),
            disconnected: Signal::new(),
            pubacks: Channel::new(),
        }
    }

    pub fn sender(&self) -> ClientEventSender<'_, M, DEPTH> {
        ClientEventSender { events: self }
    }

    pub fn receiver(&self) -> ClientEventReceiver<'_, M, DEPTH> {
        ClientEventReceiver { events: self }
    }
}

impl<M: RawMutex, const DEPTH: usize> Default for ClientEvents<M, DEPTH> {
    fn default() -> Self {
        Self::new()
    }
}

/// Producer half of [`ClientEvents`], handed to the MQTT client.
pub struct ClientEventSender<'a, M: RawMutex, const DEPTH: usize> {
    events: &'a ClientEvents<M, DEPTH>,
}

impl<M: RawMutex, const DEPTH: usize> Clone for ClientEventSender<'_, M, DEPTH> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M: RawMutex, const DEPTH: usize> Copy for ClientEventSender<'_, M, DEPTH> {}

impl<M: RawMutex, const DEPTH: usize> ClientEventSender<'_, M, DEPTH> {
    /// Records an event without waiting, as the client's event context must
    /// never block. Returns `false` only when a `PUBACK` was dropped.
    pub fn deliver(&self, event: ClientEvent) -> bool {
        match event {
            ClientEvent::ConnAck(code) => {
                self.events.connack.signal(code);
                true
            }
            ClientEvent::Disconnected => {
                self.events.disconnected.signal(());
                true
            }
            ClientEvent::PubAck(id) => self.events.pubacks.try_send(id).is_ok(),
        }
    }
}

/// Consumer half of [`ClientEvents`].
pub struct ClientEventReceiver<'a, M: RawMutex, const DEPTH: usize> {
    events: &'a ClientEvents<M, DEPTH>,
}

impl<M: RawMutex, const DEPTH: usize> ClientEventReceiver<'_, M, DEPTH> {
    /// Takes the next pending event: an acknowledgment first, then a
    /// disconnect, then queued `PUBACK`s.
    pub fn try_receive(&self) -> Option<ClientEvent> {
        if let Some(code) = self.events.connack.try_take() {
            return Some(ClientEvent::ConnAck(code));
        }
        if self.events.disconnected.try_take().is_some() {
            return Some(ClientEvent::Disconnected);
        }
        self.events.pubacks.try_receive().ok().map(ClientEvent::PubAck)
    }

    /// Discards everything pending.
    pub fn clear(&self) {
        self.events.connack.reset();
        self.events.disconnected.reset();
        while self.events.pubacks.try_receive().is_ok() {}
    }
}

/// An MQTT protocol engine driven step by step by the publish session.
///
/// Implementations report `CONNACK`, `DISCONNECT` and `PUBACK` through a
/// [`ClientEventSender`] obtained from the same [`ClientEvents`] the session
/// reads.
#[allow(async_fn_in_trait)]
pub trait PubSubClient {
    type Error: TransportError;

    /// Opens the transport to `broker` and sends `CONNECT`.
    async fn connect(&mut self, broker: Endpoint, options: &ClientOptions<'_>)
    -> Result<(), Self::Error>;

    /// Waits up to `timeout` for the client socket to become readable.
    async fn poll_readable(&mut self, timeout: Duration) -> Result<bool, Self::Error>;

    /// Reads and processes whatever is pending on the socket.
    async fn input(&mut self) -> Result<(), Self::Error>;

    /// Keep-alive tick; sends `PINGREQ` when due.
    async fn live(&mut self) -> Result<(), Self::Error>;

    async fn publish(&mut self, message: &Message<'_>) -> Result<(), Self::Error>;

    async fn disconnect(&mut self) -> Result<(), Self::Error>;
}
