//! Connection state of the publish session.
//!
//! The MQTT client reports `CONNACK` and `DISCONNECT` from its own event
//! context. Those reports are latched in a [`ClientEvents`] mailbox whose
//! single reader is a [`ConnectionCell`]. The round loop calls [`ConnectionCell::refresh`]
//! every time it needs the state, so it never acts on a stale value.
//!
//! [`ClientEvents`]: crate::transport::ClientEvents

use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::error::ConnectReturnCode;
use crate::transport::{ClientEvent, ClientEventReceiver};

/// State of the broker connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionState {
    Disconnected,
    AwaitingAck,
    Connected,
    Publishing,
    Disconnecting,
}

impl SessionState {
    pub const fn is_connected(self) -> bool {
        matches!(self, SessionState::Connected | SessionState::Publishing)
    }
}

/// Single-consumer view of the client's connection events.
pub struct ConnectionCell<'a, M: RawMutex, const DEPTH: usize> {
    rx: ClientEventReceiver<'a, M, DEPTH>,
    state: SessionState,
    refused: Option<ConnectReturnCode>,
}

impl<'a, M: RawMutex, const DEPTH: usize> ConnectionCell<'a, M, DEPTH> {
    pub fn new(rx: ClientEventReceiver<'a, M, DEPTH>) -> Self {
        Self {
            rx,
            state: SessionState::Disconnected,
            refused: None,
        }
    }

    /// Drains every pending event and returns the resulting state.
    pub fn refresh(&mut self) -> SessionState {
        while let Some(event) = self.rx.try_receive() {
            self.apply(event);
        }
        self.state
    }

    /// Return code of a negative acknowledgment, if one arrived.
    pub fn refused(&self) -> Option<ConnectReturnCode> {
        self.refused
    }

    /// Marks a connect request as sent. Events left over from an earlier
    /// connection are discarded first.
    pub(crate) fn begin_connect(&mut self) {
        self.rx.clear();
        self.refused = None;
        self.state = SessionState::AwaitingAck;
    }

    pub(crate) fn connect_failed(&mut self) {
        self.state = SessionState::Disconnected;
    }

    /// Enters `Publishing` if still connected. Returns `false` otherwise.
    pub(crate) fn begin_round(&mut self) -> bool {
        if self.refresh().is_connected() {
            self.state = SessionState::Publishing;
            true
        } else {
            false
        }
    }

    pub(crate) fn begin_disconnect(&mut self) {
        self.state = SessionState::Disconnecting;
    }

    fn apply(&mut self, event: ClientEvent) {
        match event {
            ClientEvent::ConnAck(code) if self.state == SessionState::AwaitingAck => {
                if code.is_accepted() {
                    info!("MQTT client connected");
                    self.state = SessionState::Connected;
                } else {
                    error!("MQTT connect refused: {:?}", code);
                    self.refused = Some(code);
                    self.state = SessionState::Disconnected;
                }
            }
            ClientEvent::ConnAck(code) => {
                warn!("Unexpected CONNACK {:?} in state {:?}", code, self.state);
            }
            ClientEvent::Disconnected => {
                info!("MQTT client disconnected");
                if self.state != SessionState::Disconnecting {
                    self.state = SessionState::Disconnected;
                }
            }
            ClientEvent::PubAck(id) => {
                info!("PUBACK packet id: {}", id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ClientEvents;
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

    type Events = ClientEvents<CriticalSectionRawMutex, 4>;

    #[test]
    fn positive_ack_connects() {
        let events = Events::new();
        let mut cell = ConnectionCell::new(events.receiver());

        cell.begin_connect();
        assert_eq!(cell.refresh(), SessionState::AwaitingAck);

        events.sender().deliver(ClientEvent::ConnAck(ConnectReturnCode::Accepted));
        assert_eq!(cell.refresh(), SessionState::Connected);
        assert!(cell.begin_round());
        assert_eq!(cell.refresh(), SessionState::Publishing);
    }

    #[test]
    fn negative_ack_disconnects_and_keeps_the_code() {
        let events = Events::new();
        let mut cell = ConnectionCell::new(events.receiver());

        cell.begin_connect();
        events.sender().deliver(ClientEvent::ConnAck(ConnectReturnCode::NotAuthorized));

        assert_eq!(cell.refresh(), SessionState::Disconnected);
        assert_eq!(cell.refused(), Some(ConnectReturnCode::NotAuthorized));
    }

    #[test]
    fn disconnect_is_seen_on_the_next_refresh() {
        let events = Events::new();
        let mut cell = ConnectionCell::new(events.receiver());
        cell.begin_connect();
        events.sender().deliver(ClientEvent::ConnAck(ConnectReturnCode::Accepted));
        assert!(cell.begin_round());

        events.sender().deliver(ClientEvent::Disconnected);

        assert!(!cell.begin_round());
        assert_eq!(cell.refresh(), SessionState::Disconnected);
    }

    #[test]
    fn stale_events_are_dropped_on_connect() {
        let events = Events::new();
        let mut cell = ConnectionCell::new(events.receiver());
        events.sender().deliver(ClientEvent::Disconnected);

        cell.begin_connect();
        events.sender().deliver(ClientEvent::ConnAck(ConnectReturnCode::Accepted));

        assert_eq!(cell.refresh(), SessionState::Connected);
    }

    #[test]
    fn disconnecting_is_terminal() {
        let events = Events::new();
        let mut cell = ConnectionCell::new(events.receiver());
        cell.begin_disconnect();
        events.sender().deliver(ClientEvent::Disconnected);

        assert_eq!(cell.refresh(), SessionState::Disconnecting);
    }

    #[test]
    fn disconnect_behind_a_full_ack_queue_stops_the_next_round() {
        let events = Events::new();
        let mut cell = ConnectionCell::new(events.receiver());
        cell.begin_connect();
        events.sender().deliver(ClientEvent::ConnAck(ConnectReturnCode::Accepted));
        assert!(cell.begin_round());

        let tx = events.sender();
        for id in 1..=4 {
            assert!(tx.deliver(ClientEvent::PubAck(id)));
        }
        assert!(!tx.deliver(ClientEvent::PubAck(5)));
        assert!(tx.deliver(ClientEvent::Disconnected));

        assert!(!cell.begin_round());
        assert_eq!(cell.refresh(), SessionState::Disconnected);
    }
}
