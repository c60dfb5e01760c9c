//! Test doubles for the device and transport traits.

use std::cell::Cell;
use std::collections::{HashMap, VecDeque};
use std::string::String;
use std::vec::Vec;

use core::convert::Infallible;
use core::net::Ipv4Addr;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::Duration;
use embedded_hal::digital::{ErrorType, OutputPin};
use embedded_hal_async::delay::DelayNs;

use crate::device::{InterfaceKind, LinkEvent, LinkEventHandler, Modem, NetInterface, PowerRail};
use crate::error::ConnectReturnCode;
use crate::transport::{
    ClientEvent, ClientEventSender, ClientOptions, DatagramSocket, Endpoint, Errno, Message,
    PubSubClient, QoS, Resolver,
};

/// A clock that records every requested sleep instead of waiting.
#[derive(Default)]
pub struct FakeDelay {
    pub sleeps_ms: Vec<u32>,
    elapsed_ns: u64,
}

impl FakeDelay {
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ns / 1_000_000
    }
}

impl DelayNs for FakeDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ns += u64::from(ns);
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.sleeps_ms.push(ms);
        self.elapsed_ns += u64::from(ms) * 1_000_000;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RailCall {
    On,
    Off,
}

pub struct FakeRail {
    pub ready: bool,
    pub fail_on: bool,
    pub calls: Vec<RailCall>,
}

impl FakeRail {
    pub fn ready() -> Self {
        Self {
            ready: true,
            fail_on: false,
            calls: Vec::new(),
        }
    }

    pub fn not_ready() -> Self {
        Self {
            ready: false,
            ..Self::ready()
        }
    }
}

impl PowerRail for FakeRail {
    type Error = Errno;

    fn is_ready(&self) -> bool {
        self.ready
    }

    fn power_on(&mut self) -> Result<(), Errno> {
        self.calls.push(RailCall::On);
        if self.fail_on { Err(Errno(5)) } else { Ok(()) }
    }

    fn power_off(&mut self) -> Result<(), Errno> {
        self.calls.push(RailCall::Off);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakePin {
    pub high: bool,
}

impl ErrorType for FakePin {
    type Error = Infallible;
}

impl OutputPin for FakePin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.high = true;
        Ok(())
    }
}

pub struct FakeModem {
    pub ready: bool,
    pub fail_resume: bool,
    pub resumes: u32,
}

impl FakeModem {
    pub fn ready() -> Self {
        Self {
            ready: true,
            fail_resume: false,
            resumes: 0,
        }
    }

    pub fn not_ready() -> Self {
        Self {
            ready: false,
            ..Self::ready()
        }
    }
}

impl Modem for FakeModem {
    type Error = Errno;

    fn is_ready(&self) -> bool {
        self.ready
    }

    async fn resume(&mut self) -> Result<(), Errno> {
        self.resumes += 1;
        if self.fail_resume { Err(Errno(-1)) } else { Ok(()) }
    }
}

/// A PPP interface that reports up from its `(n + 1)`-th status check on.
pub struct FakeInterface {
    up_after_checks: Option<u32>,
    checks: Cell<u32>,
    pub bring_up_calls: u32,
    pub pending_events: Vec<LinkEvent>,
}

impl FakeInterface {
    pub fn up_after(checks: u32) -> Self {
        Self {
            up_after_checks: Some(checks),
            checks: Cell::new(0),
            bring_up_calls: 0,
            pending_events: Vec::new(),
        }
    }

    pub fn never_up() -> Self {
        Self {
            up_after_checks: None,
            ..Self::up_after(0)
        }
    }
}

impl NetInterface for FakeInterface {
    fn kind(&self) -> InterfaceKind {
        InterfaceKind::Ppp
    }

    fn bring_up(&mut self) {
        self.bring_up_calls += 1;
    }

    fn is_up(&self) -> bool {
        let seen = self.checks.get();
        self.checks.set(seen + 1);
        self.up_after_checks.is_some_and(|n| seen >= n)
    }

    fn next_event(&mut self) -> Option<LinkEvent> {
        if self.pending_events.is_empty() {
            None
        } else {
            Some(self.pending_events.remove(0))
        }
    }
}

#[derive(Default)]
pub struct RecordingEvents {
    pub seen: Vec<LinkEvent>,
}

impl LinkEventHandler for RecordingEvents {
    fn on_link_event(&mut self, event: LinkEvent) {
        self.seen.push(event);
    }
}

/// A datagram socket whose peer echoes every successful send.
#[derive(Default)]
pub struct FakeSocket {
    pub open_error: Option<Errno>,
    /// Errors keyed by zero-based send call index.
    pub send_errors: HashMap<usize, Errno>,
    /// Errors keyed by zero-based receive call index.
    pub recv_errors: HashMap<usize, Errno>,
    /// Fixed reply instead of the echo.
    pub reply: Option<Vec<u8>>,
    pub sent: Vec<Vec<u8>>,
    pub send_calls: usize,
    pub recv_calls: usize,
    pub last_recv_timeout: Option<Option<Duration>>,
    pub close_calls: usize,
    pub closed: bool,
}

impl FakeSocket {
    pub fn echoing() -> Self {
        Self::default()
    }
}

impl DatagramSocket for FakeSocket {
    type Error = Errno;

    fn open(&mut self) -> Result<(), Errno> {
        match self.open_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn send_to(&mut self, buf: &[u8], _peer: Endpoint) -> Result<usize, Errno> {
        let call = self.send_calls;
        self.send_calls += 1;
        if let Some(e) = self.send_errors.get(&call) {
            return Err(*e);
        }
        self.sent.push(buf.to_vec());
        Ok(buf.len())
    }

    async fn recv_from(
        &mut self,
        buf: &mut [u8],
        timeout: Option<Duration>,
    ) -> Result<usize, Errno> {
        let call = self.recv_calls;
        self.recv_calls += 1;
        self.last_recv_timeout = Some(timeout);
        if let Some(e) = self.recv_errors.get(&call) {
            return Err(*e);
        }
        let data = match (&self.reply, self.sent.last()) {
            (Some(reply), _) => reply.as_slice(),
            (None, Some(last)) => last.as_slice(),
            (None, None) => &[],
        };
        let n = data.len().min(buf.len());
        buf[..n].copy_from_slice(&data[..n]);
        Ok(n)
    }

    fn close(&mut self) {
        self.close_calls += 1;
        self.closed = true;
    }
}

pub struct FakeResolver {
    addr: Option<Ipv4Addr>,
}

impl FakeResolver {
    pub fn ok(octets: [u8; 4]) -> Self {
        Self {
            addr: Some(Ipv4Addr::from(octets)),
        }
    }

    pub fn failing() -> Self {
        Self { addr: None }
    }
}

impl Resolver for FakeResolver {
    type Error = Errno;

    async fn resolve(&mut self, _host: &str) -> Result<Ipv4Addr, Errno> {
        self.addr.ok_or(Errno(-11))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCall {
    Connect,
    PollReadable,
    Input,
    Live,
    Publish,
    Disconnect,
}

/// A scripted MQTT client. Polls report the socket readable unless
/// `poll_results` says otherwise.
pub struct FakeClient<'a> {
    tx: ClientEventSender<'a, CriticalSectionRawMutex, 4>,
    /// One-based input call that delivers the `CONNACK`.
    pub ack_on_input: Option<(u32, ConnectReturnCode)>,
    /// One-based input call that delivers a broker disconnect.
    pub disconnect_on_input: Option<u32>,
    /// Deliver a broker disconnect once this many publishes went out.
    pub disconnect_after_publishes: Option<usize>,
    /// `PUBACK`s reported for every publish.
    pub pubacks_per_publish: u16,
    pub connect_error: Option<Errno>,
    /// Results of the next polls, in order. `Ok(true)` once exhausted.
    pub poll_results: VecDeque<Result<bool, Errno>>,
    pub input_error_on: Option<u32>,
    pub publish_error_on: Option<u32>,
    pub live_error: Option<Errno>,
    pub calls: Vec<ClientCall>,
    pub connected_to: Option<(Endpoint, String)>,
    pub published: Vec<(String, Vec<u8>, QoS, u16)>,
    inputs: u32,
    publishes: u32,
}

impl<'a> FakeClient<'a> {
    pub fn acking(tx: ClientEventSender<'a, CriticalSectionRawMutex, 4>) -> Self {
        Self {
            ack_on_input: Some((1, ConnectReturnCode::Accepted)),
            ..Self::silent(tx)
        }
    }

    pub fn silent(tx: ClientEventSender<'a, CriticalSectionRawMutex, 4>) -> Self {
        Self {
            tx,
            ack_on_input: None,
            disconnect_on_input: None,
            disconnect_after_publishes: None,
            pubacks_per_publish: 0,
            connect_error: None,
            poll_results: VecDeque::new(),
            input_error_on: None,
            publish_error_on: None,
            live_error: None,
            calls: Vec::new(),
            connected_to: None,
            published: Vec::new(),
            inputs: 0,
            publishes: 0,
        }
    }

    pub fn count(&self, call: ClientCall) -> usize {
        self.calls.iter().filter(|c| **c == call).count()
    }
}

impl PubSubClient for FakeClient<'_> {
    type Error = Errno;

    async fn connect(&mut self, broker: Endpoint, options: &ClientOptions<'_>) -> Result<(), Errno> {
        self.calls.push(ClientCall::Connect);
        if let Some(e) = self.connect_error {
            return Err(e);
        }
        self.connected_to = Some((broker, String::from(options.client_id)));
        Ok(())
    }

    async fn poll_readable(&mut self, _timeout: Duration) -> Result<bool, Errno> {
        self.calls.push(ClientCall::PollReadable);
        self.poll_results.pop_front().unwrap_or(Ok(true))
    }

    async fn input(&mut self) -> Result<(), Errno> {
        self.calls.push(ClientCall::Input);
        self.inputs += 1;
        if self.input_error_on == Some(self.inputs) {
            return Err(Errno(-104));
        }
        if let Some((n, code)) = self.ack_on_input {
            if n == self.inputs {
                self.tx.deliver(ClientEvent::ConnAck(code));
            }
        }
        if self.disconnect_on_input == Some(self.inputs) {
            self.tx.deliver(ClientEvent::Disconnected);
        }
        Ok(())
    }

    async fn live(&mut self) -> Result<(), Errno> {
        self.calls.push(ClientCall::Live);
        match self.live_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn publish(&mut self, message: &Message<'_>) -> Result<(), Errno> {
        self.calls.push(ClientCall::Publish);
        self.publishes += 1;
        if self.publish_error_on == Some(self.publishes) {
            return Err(Errno(-105));
        }
        self.published.push((
            String::from(message.topic),
            message.payload.to_vec(),
            message.qos,
            message.message_id,
        ));
        for _ in 0..self.pubacks_per_publish {
            self.tx.deliver(ClientEvent::PubAck(message.message_id));
        }
        if self.disconnect_after_publishes == Some(self.published.len()) {
            self.tx.deliver(ClientEvent::Disconnected);
        }
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), Errno> {
        self.calls.push(ClientCall::Disconnect);
        self.tx.deliver(ClientEvent::Disconnected);
        Ok(())
    }
}
