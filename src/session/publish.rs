//! MQTT publish session.

use core::fmt::Write as _;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal_async::delay::DelayNs;
use heapless::String;

use super::state::{ConnectionCell, SessionState};
use super::{ExchangeCounter, Session, SessionEnd, SessionReport};
use crate::config::{PublishConfig, millis};
use crate::error::SessionError;
use crate::fmt::Dbg;
use crate::link::LinkReady;
use crate::transport::{Endpoint, Message, PubSubClient, Resolver, TransportError};

/// Default payload buffer size of the publish session.
pub const PAYLOAD_BUFFER_SIZE: usize = 64;

/// Connects to a broker and publishes one numbered message per round.
///
/// The client reports connection events into the
/// [`ClientEvents`](crate::transport::ClientEvents) mailbox
/// whose receiver is wrapped in `events`. `PAYLOAD` bounds the formatted message.
pub struct PublishSession<
    'a,
    C,
    R,
    M: RawMutex,
    const DEPTH: usize,
    const PAYLOAD: usize = PAYLOAD_BUFFER_SIZE,
> {
    client: C,
    resolver: R,
    events: ConnectionCell<'a, M, DEPTH>,
    config: PublishConfig<'a>,
    broker: Option<Endpoint>,
    next_message_id: u16,
}

impl<'a, C, R, M, const DEPTH: usize, const PAYLOAD: usize>
    PublishSession<'a, C, R, M, DEPTH, PAYLOAD>
where
    C: PubSubClient,
    R: Resolver,
    M: RawMutex,
{
    pub fn new(
        client: C,
        resolver: R,
        events: ConnectionCell<'a, M, DEPTH>,
        config: PublishConfig<'a>,
    ) -> Self {
        Self {
            client,
            resolver,
            events,
            next_message_id: config.first_message_id.max(1),
            config,
            broker: None,
        }
    }

    /// Current connection state, read fresh from the event mailbox.
    pub fn state(&mut self) -> SessionState {
        self.events.refresh()
    }

    /// The broker address, once resolved.
    pub fn broker(&self) -> Option<Endpoint> {
        self.broker
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn into_client(self) -> C {
        self.client
    }

    async fn resolve_broker(&mut self) -> Result<Endpoint, SessionError<C::Error>> {
        if let Some(broker) = self.broker {
            return Ok(broker);
        }

        let host = self.config.broker_host;
        let addr = self.resolver.resolve(host).await.map_err(|e| {
            error!("Resolving {} failed: {:?}", host, Dbg(&e));
            SessionError::BrokerResolutionFailed
        })?;

        let broker = Endpoint::new(addr, self.config.broker_port);
        debug!("Broker {} at {:?}", host, Dbg(&broker));
        self.broker = Some(broker);
        Ok(broker)
    }

    /// Sends `CONNECT` and waits a bounded number of poll slices for the
    /// acknowledgment.
    async fn connect(&mut self, broker: Endpoint) -> Result<(), SessionError<C::Error>> {
        self.events.begin_connect();
        if let Err(e) = self.client.connect(broker, &self.config.client).await {
            error!("MQTT connect failed: {:?}", Dbg(&e));
            self.events.connect_failed();
            return Err(SessionError::Connect(e));
        }

        info!("Waiting for CONNACK...");
        let mut slices = self.config.connect_poll_slices;
        while slices > 0 && self.events.refresh() == SessionState::AwaitingAck {
            slices -= 1;
            match self.client.poll_readable(self.config.connect_poll_slice).await {
                Ok(true) => {
                    if let Err(e) = self.client.input().await {
                        error!("MQTT input failed: {:?}", Dbg(&e));
                        self.events.connect_failed();
                        return Err(SessionError::Input(e));
                    }
                }
                Ok(false) => {}
                Err(e) => {
                    error!("Poll failed: {:?}", Dbg(&e));
                    self.events.connect_failed();
                    return Err(SessionError::Poll(e));
                }
            }
        }

        match self.events.refresh() {
            SessionState::Connected => Ok(()),
            _ => {
                self.events.connect_failed();
                if let Some(code) = self.events.refused() {
                    return Err(SessionError::ConnectRefused(code));
                }
                error!(
                    "Failed to connect to MQTT broker within {} poll slices",
                    self.config.connect_poll_slices
                );
                Err(SessionError::ConnectTimeout)
            }
        }
    }

    /// The publish rounds. Returns how the loop ended, or the error that
    /// aborted it.
    async fn publish_rounds<D: DelayNs>(
        &mut self,
        counter: &mut ExchangeCounter,
        report: &mut SessionReport,
        delay: &mut D,
    ) -> Result<SessionEnd, SessionError<C::Error>> {
        while !counter.is_complete() {
            if !self.events.begin_round() {
                return Ok(SessionEnd::ConnectionLost);
            }

            match self.client.poll_readable(self.config.round_poll).await {
                Ok(true) => self.client.input().await.map_err(|e| {
                    error!("MQTT input failed: {:?}", Dbg(&e));
                    SessionError::Input(e)
                })?,
                Ok(false) => {}
                Err(e) => {
                    error!("Poll failed: {:?}", Dbg(&e));
                    return Err(SessionError::Poll(e));
                }
            }

            if let Err(e) = self.client.live().await {
                if !e.is_would_block() {
                    error!("MQTT keep-alive failed: {:?}", Dbg(&e));
                    return Err(SessionError::KeepAlive(e));
                }
            }

            if !self.events.refresh().is_connected() {
                return Ok(SessionEnd::ConnectionLost);
            }

            let round = counter.count() + 1;
            info!("Publishing message {}...", round);
            if !self.publish_round(round).await {
                report.send_failures += 1;
            }
            counter.advance();

            delay.delay_ms(millis(self.config.round_interval)).await;
        }

        Ok(SessionEnd::Completed)
    }

    async fn publish_round(&mut self, round: u32) -> bool {
        let mut payload: String<PAYLOAD> = String::new();
        if write!(payload, "Message {} from {}", round, self.config.sender).is_err() {
            error!("Payload for message {} exceeds {} bytes", round, PAYLOAD);
            return false;
        }

        let message = Message {
            topic: self.config.topic,
            payload: payload.as_bytes(),
            qos: self.config.qos,
            message_id: self.take_message_id(),
            retain: false,
            dup: false,
        };

        match self.client.publish(&message).await {
            Ok(()) => true,
            Err(e) => {
                error!("MQTT publish failed: {:?}", Dbg(&e));
                false
            }
        }
    }

    /// Message identifiers count up and skip zero on wrap-around.
    fn take_message_id(&mut self) -> u16 {
        let id = self.next_message_id;
        self.next_message_id = match id.wrapping_add(1) {
            0 => 1,
            next => next,
        };
        id
    }
}

impl<C, R, M, const DEPTH: usize, const PAYLOAD: usize> Session
    for PublishSession<'_, C, R, M, DEPTH, PAYLOAD>
where
    C: PubSubClient,
    R: Resolver,
    M: RawMutex,
{
    type Error = C::Error;

    async fn run<D: DelayNs>(
        &mut self,
        link: &LinkReady,
        delay: &mut D,
    ) -> Result<SessionReport, SessionError<C::Error>> {
        debug!("Publish session over link up after {} s", link.waited_secs());

        info!("Waiting for modem to settle");
        delay.delay_ms(millis(self.config.post_link_settle)).await;

        info!("Initializing MQTT client...");
        let broker = self.resolve_broker().await?;
        self.connect(broker).await?;

        let mut counter = ExchangeCounter::new(self.config.iterations);
        let mut report = SessionReport {
            rounds: 0,
            send_failures: 0,
            recv_failures: 0,
            end: SessionEnd::Completed,
        };
        let outcome = self.publish_rounds(&mut counter, &mut report, delay).await;
        report.rounds = counter.count();

        info!("Disconnecting MQTT client...");
        self.events.begin_disconnect();
        if let Err(e) = self.client.disconnect().await {
            error!("MQTT disconnect failed: {:?}", Dbg(&e));
        }
        info!("Bye!");

        report.end = outcome?;
        Ok(report)
    }
}
