//! # `embassy-net` Adapters
//!
//! Implementations of the interface and transport traits on top of an
//! `embassy-net` [`Stack`], typically one driven by a PPP runner over the
//! modem's UART.

use core::net::{IpAddr, Ipv4Addr};
use core::pin::pin;

use embassy_net::dns::{self, DnsQueryType};
use embassy_net::udp::{BindError, RecvError, SendError, UdpSocket};
use embassy_net::{IpAddress, IpEndpoint, Stack};
use embassy_time::{Duration, Timer};
use futures::future::{Either, select};

use crate::device::{InterfaceKind, LinkEvent, NetInterface};
use crate::error::SendErrorKind;
use crate::transport::{DatagramSocket, Endpoint, Resolver, TransportError};

fn ip_endpoint(endpoint: Endpoint) -> IpEndpoint {
    let [a, b, c, d] = endpoint.addr.octets();
    IpEndpoint::new(IpAddress::v4(a, b, c, d), endpoint.port)
}

/// A network stack seen as a single interface.
///
/// The stack's runner owns the link, so bringing it up only records the
/// request; `is_up` requires both the link and an IPv4 configuration.
pub struct StackInterface<'d> {
    stack: Stack<'d>,
    kind: InterfaceKind,
    link_up: bool,
    config_up: bool,
}

impl<'d> StackInterface<'d> {
    pub fn new(stack: Stack<'d>, kind: InterfaceKind) -> Self {
        Self {
            stack,
            kind,
            link_up: false,
            config_up: false,
        }
    }

    /// Wraps the stack of a PPP runner.
    pub fn ppp(stack: Stack<'d>) -> Self {
        Self::new(stack, InterfaceKind::Ppp)
    }
}

impl NetInterface for StackInterface<'_> {
    fn kind(&self) -> InterfaceKind {
        self.kind
    }

    fn bring_up(&mut self) {
        debug!("Interface up requested, waiting for the stack runner");
    }

    fn is_up(&self) -> bool {
        self.stack.is_link_up() && self.stack.is_config_up()
    }

    fn next_event(&mut self) -> Option<LinkEvent> {
        let link_up = self.stack.is_link_up();
        if link_up != self.link_up {
            self.link_up = link_up;
            return Some(if link_up { LinkEvent::Up } else { LinkEvent::Down });
        }

        let config_up = self.stack.is_config_up();
        if config_up != self.config_up {
            self.config_up = config_up;
            return Some(if config_up {
                LinkEvent::AddressAdded
            } else {
                LinkEvent::AddressRemoved
            });
        }

        None
    }
}

/// Hostname resolution through the stack's DNS client.
pub struct StackResolver<'d> {
    stack: Stack<'d>,
}

impl<'d> StackResolver<'d> {
    pub fn new(stack: Stack<'d>) -> Self {
        Self { stack }
    }
}

#[derive(Debug)]
pub enum ResolveError {
    Dns(dns::Error),
    /// The query succeeded but returned no IPv4 address.
    NoAddress,
}

impl Resolver for StackResolver<'_> {
    type Error = ResolveError;

    async fn resolve(&mut self, host: &str) -> Result<Ipv4Addr, ResolveError> {
        let addrs = self
            .stack
            .dns_query(host, DnsQueryType::A)
            .await
            .map_err(ResolveError::Dns)?;

        addrs
            .iter()
            .find_map(|addr| match IpAddr::from(*addr) {
                IpAddr::V4(v4) => Some(v4),
                IpAddr::V6(_) => None,
            })
            .ok_or(ResolveError::NoAddress)
    }
}

#[derive(Debug)]
pub enum UdpError {
    Bind(BindError),
    Send(SendError),
    Recv(RecvError),
    /// No datagram arrived before the receive deadline.
    Timeout,
}

impl TransportError for UdpError {
    fn send_error_kind(&self) -> SendErrorKind {
        match self {
            UdpError::Send(SendError::NoRoute) => SendErrorKind::NetworkUnreachable,
            _ => SendErrorKind::Unspecified,
        }
    }

    fn is_would_block(&self) -> bool {
        matches!(self, UdpError::Timeout)
    }
}

/// UDP transport implementation using `embassy-net`.
pub struct UdpTransport<'a> {
    socket: UdpSocket<'a>,
    local_port: u16,
}

impl<'a> UdpTransport<'a> {
    /// Wraps an unbound socket. It is bound to `local_port` on open.
    pub fn new(socket: UdpSocket<'a>, local_port: u16) -> Self {
        Self { socket, local_port }
    }
}

impl DatagramSocket for UdpTransport<'_> {
    type Error = UdpError;

    fn open(&mut self) -> Result<(), UdpError> {
        self.socket.bind(self.local_port).map_err(UdpError::Bind)
    }

    async fn send_to(&mut self, buf: &[u8], peer: Endpoint) -> Result<usize, UdpError> {
        self.socket
            .send_to(buf, ip_endpoint(peer))
            .await
            .map_err(UdpError::Send)?;
        Ok(buf.len())
    }

    async fn recv_from(
        &mut self,
        buf: &mut [u8],
        timeout: Option<Duration>,
    ) -> Result<usize, UdpError> {
        let recv = self.socket.recv_from(buf);
        let result = match timeout {
            None => recv.await,
            // Race the receive against a timer.
            Some(timeout) => match select(pin!(recv), pin!(Timer::after(timeout))).await {
                Either::Left((result, _)) => result,
                Either::Right(((), _)) => return Err(UdpError::Timeout),
            },
        };

        let (n, _meta) = result.map_err(UdpError::Recv)?;
        Ok(n)
    }

    fn close(&mut self) {
        self.socket.close();
    }
}
