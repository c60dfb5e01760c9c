//! # Configuration
//!
//! Every timing, size and addressing parameter of a run lives here. The
//! `Default` impls carry the values the cellular firmware ships with; the
//! `with_*` methods override single fields.

use core::net::Ipv4Addr;

use embassy_time::Duration;

use crate::transport::{ClientOptions, Endpoint, QoS};

/// Echo protocol port.
pub const ECHO_PORT: u16 = 7;
/// Plain-text MQTT port.
pub const MQTT_PORT: u16 = 1883;

/// Settle delays of the modem power rail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerConfig {
    /// Wait after switching the rail off.
    pub off_settle: Duration,
    /// Wait after switching the rail on.
    pub on_settle: Duration,
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            off_settle: Duration::from_millis(2000),
            on_settle: Duration::from_millis(100),
        }
    }
}

/// Link bring-up timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkConfig {
    /// Number of poll iterations before giving up.
    pub timeout_secs: u32,
    /// Time between two `is_up` checks.
    pub poll_interval: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            poll_interval: Duration::from_secs(1),
        }
    }
}

impl LinkConfig {
    pub fn with_timeout_secs(mut self, timeout_secs: u32) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// Parameters of the UDP echo session.
#[derive(Debug, Clone, Copy)]
pub struct DatagramEchoConfig<'a> {
    pub peer: Endpoint,
    pub message: &'a [u8],
    pub iterations: u32,
    /// Extra wait after the link is up, before the first send.
    pub post_link_settle: Duration,
    pub round_interval: Duration,
    /// Receive deadline; `None` blocks until a datagram arrives.
    pub recv_timeout: Option<Duration>,
}

impl Default for DatagramEchoConfig<'_> {
    fn default() -> Self {
        Self {
            peer: Endpoint::new(Ipv4Addr::new(34, 192, 142, 126), ECHO_PORT),
            message: b"Hello CodeZoo!!!",
            iterations: 5,
            post_link_settle: Duration::from_secs(5),
            round_interval: Duration::from_secs(2),
            recv_timeout: Some(Duration::from_secs(10)),
        }
    }
}

impl<'a> DatagramEchoConfig<'a> {
    pub fn with_peer(mut self, peer: Endpoint) -> Self {
        self.peer = peer;
        self
    }

    pub fn with_message(mut self, message: &'a [u8]) -> Self {
        self.message = message;
        self
    }

    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_recv_timeout(mut self, recv_timeout: Option<Duration>) -> Self {
        self.recv_timeout = recv_timeout;
        self
    }
}

/// Parameters of the MQTT publish session.
#[derive(Debug, Clone, Copy)]
pub struct PublishConfig<'a> {
    pub broker_host: &'a str,
    pub broker_port: u16,
    pub topic: &'a str,
    /// Name signed into every payload: `Message <n> from <sender>`.
    pub sender: &'a str,
    pub qos: QoS,
    pub client: ClientOptions<'a>,
    pub iterations: u32,
    pub post_link_settle: Duration,
    /// Length of one readiness poll while waiting for `CONNACK`.
    pub connect_poll_slice: Duration,
    /// Number of slices before the connect attempt times out.
    pub connect_poll_slices: u32,
    /// Readiness poll at the start of every round.
    pub round_poll: Duration,
    pub round_interval: Duration,
    /// First message identifier; subsequent publishes count up from here.
    pub first_message_id: u16,
}

impl Default for PublishConfig<'_> {
    fn default() -> Self {
        Self {
            broker_host: "broker.hivemq.com",
            broker_port: MQTT_PORT,
            topic: "zephyr/mqtt/publisher",
            sender: "Zephyr",
            qos: QoS::AtMostOnce,
            client: ClientOptions::default(),
            iterations: 5,
            post_link_settle: Duration::from_secs(5),
            connect_poll_slice: Duration::from_secs(1),
            connect_poll_slices: 10,
            round_poll: Duration::from_millis(100),
            round_interval: Duration::from_secs(2),
            first_message_id: 1,
        }
    }
}

impl<'a> PublishConfig<'a> {
    pub fn with_broker(mut self, host: &'a str, port: u16) -> Self {
        self.broker_host = host;
        self.broker_port = port;
        self
    }

    pub fn with_topic(mut self, topic: &'a str) -> Self {
        self.topic = topic;
        self
    }

    pub fn with_sender(mut self, sender: &'a str) -> Self {
        self.sender = sender;
        self
    }

    pub fn with_client(mut self, client: ClientOptions<'a>) -> Self {
        self.client = client;
        self
    }

    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }
}

/// Configuration of the phases that run before any session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunConfig {
    pub power: PowerConfig,
    pub link: LinkConfig,
}

/// Converts a configured duration to the millisecond argument of
/// `DelayNs::delay_ms`, saturating at `u32::MAX`.
pub(crate) fn millis(duration: Duration) -> u32 {
    u32::try_from(duration.as_millis()).unwrap_or(u32::MAX)
}
