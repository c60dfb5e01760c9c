//! # Error Types
//!
//! This module defines the error types used across the bring-up and session
//! layers, from device readiness failures to protocol-level refusals, plus the
//! classification of datagram send failures.

use core::fmt;

/// Errno values as reported by the modem's socket layer.
///
/// These follow the newlib/Zephyr numbering used by the cellular firmware
/// socket offload.
pub mod errno {
    pub const EIO: i32 = 5;
    pub const EAGAIN: i32 = 11;
    pub const EACCES: i32 = 13;
    pub const ENOBUFS: i32 = 105;
    pub const ENETUNREACH: i32 = 114;
    pub const EHOSTUNREACH: i32 = 118;
    pub const EADDRNOTAVAIL: i32 = 125;
}

/// Failures of the link bring-up phase. All of them are fatal: no session is
/// attempted after one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    /// The modem device reported it is not ready.
    DeviceNotReady,
    /// No point-to-point interface is registered.
    InterfaceNotFound,
    /// The interface did not come up before the countdown reached zero.
    LinkTimeout,
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkError::DeviceNotReady => f.write_str("modem device not ready"),
            LinkError::InterfaceNotFound => f.write_str("no PPP interface found"),
            LinkError::LinkTimeout => f.write_str("PPP link did not come up in time"),
        }
    }
}

/// The session error enum.
///
/// It is generic over the adapter error type `T`, allowing it to carry the
/// specific failure reported by the socket or MQTT client.
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionError<T> {
    /// The datagram socket could not be opened.
    TransportUnavailable(T),
    /// The broker hostname did not resolve to an IPv4 address.
    BrokerResolutionFailed,
    /// The connect request itself could not be issued.
    Connect(T),
    /// The broker answered the connect request with a refusal.
    ConnectRefused(ConnectReturnCode),
    /// No acknowledgment arrived within the allotted poll slices.
    ConnectTimeout,
    /// Waiting for socket readiness failed.
    Poll(T),
    /// The client failed to process inbound data.
    Input(T),
    /// The keep-alive tick failed with something other than "would block".
    KeepAlive(T),
}

impl<T: fmt::Debug> fmt::Display for SessionError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::TransportUnavailable(e) => write!(f, "transport unavailable: {e:?}"),
            SessionError::BrokerResolutionFailed => f.write_str("broker resolution failed"),
            SessionError::Connect(e) => write!(f, "connect request failed: {e:?}"),
            SessionError::ConnectRefused(code) => write!(f, "connection refused: {code:?}"),
            SessionError::ConnectTimeout => f.write_str("no connect acknowledgment in time"),
            SessionError::Poll(e) => write!(f, "poll failed: {e:?}"),
            SessionError::Input(e) => write!(f, "input processing failed: {e:?}"),
            SessionError::KeepAlive(e) => write!(f, "keep-alive failed: {e:?}"),
        }
    }
}

/// Any fatal failure of a complete run: either the link never became usable
/// or the session aborted.
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RunError<T> {
    Link(LinkError),
    Session(SessionError<T>),
}

impl<T> From<LinkError> for RunError<T> {
    fn from(err: LinkError) -> Self {
        RunError::Link(err)
    }
}

impl<T> From<SessionError<T>> for RunError<T> {
    fn from(err: SessionError<T>) -> Self {
        RunError::Session(err)
    }
}

impl<T: fmt::Debug> fmt::Display for RunError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::Link(e) => write!(f, "link: {e}"),
            RunError::Session(e) => write!(f, "session: {e}"),
        }
    }
}

/// Classification of a failed datagram send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SendErrorKind {
    NetworkUnreachable,
    HostUnreachable,
    AddressUnavailable,
    OutOfBuffers,
    PermissionDenied,
    IoError,
    Unspecified,
}

impl SendErrorKind {
    /// Maps an errno value to its category. Unknown values land in
    /// `Unspecified`.
    pub const fn from_errno(code: i32) -> Self {
        match code.wrapping_abs() {
            errno::ENETUNREACH => SendErrorKind::NetworkUnreachable,
            errno::EHOSTUNREACH => SendErrorKind::HostUnreachable,
            errno::EADDRNOTAVAIL => SendErrorKind::AddressUnavailable,
            errno::ENOBUFS => SendErrorKind::OutOfBuffers,
            errno::EACCES => SendErrorKind::PermissionDenied,
            errno::EIO => SendErrorKind::IoError,
            _ => SendErrorKind::Unspecified,
        }
    }

    /// Operator hint logged next to the classification.
    pub const fn hint(self) -> &'static str {
        match self {
            SendErrorKind::NetworkUnreachable => {
                "Network is unreachable. Check PPP connection and routing."
            }
            SendErrorKind::HostUnreachable => "Host is unreachable. Check server IP and network.",
            SendErrorKind::AddressUnavailable => {
                "Address not available. Check local IP configuration."
            }
            SendErrorKind::OutOfBuffers => {
                "No buffer space available. System may be out of memory."
            }
            SendErrorKind::PermissionDenied => "Permission denied. Check socket permissions.",
            SendErrorKind::IoError => "I/O error. Possible modem or driver issue.",
            SendErrorKind::Unspecified => "Send failed with unspecified error.",
        }
    }
}

/// Represents the return codes of a connection acknowledgment (`CONNACK`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectReturnCode {
    /// The connection was accepted.
    Accepted,
    /// The broker does not support the requested protocol version.
    UnacceptableProtocolVersion,
    /// The client identifier is not valid.
    IdentifierRejected,
    /// The broker is unavailable.
    ServerUnavailable,
    /// The username or password is not valid.
    BadUserNameOrPassword,
    /// The client is not authorized to connect.
    NotAuthorized,
    /// A code outside the 3.1.1 range.
    Other(u8),
}

impl ConnectReturnCode {
    pub const fn is_accepted(self) -> bool {
        matches!(self, ConnectReturnCode::Accepted)
    }
}

impl From<u8> for ConnectReturnCode {
    fn from(val: u8) -> Self {
        match val {
            0 => Self::Accepted,
            1 => Self::UnacceptableProtocolVersion,
            2 => Self::IdentifierRejected,
            3 => Self::ServerUnavailable,
            4 => Self::BadUserNameOrPassword,
            5 => Self::NotAuthorized,
            _ => Self::Other(val),
        }
    }
}
