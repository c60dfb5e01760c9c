//! UDP echo session.

use embedded_hal_async::delay::DelayNs;

use super::{ExchangeCounter, Session, SessionEnd, SessionReport};
use crate::config::{DatagramEchoConfig, millis};
use crate::error::{SendErrorKind, SessionError};
use crate::fmt::Dbg;
use crate::link::LinkReady;
use crate::transport::{DatagramSocket, TransportError};

/// Default receive buffer size of the echo session.
pub const ECHO_BUFFER_SIZE: usize = 32;

/// Sends the configured message to an echo peer and reads back whatever
/// returns, once per round.
///
/// `BUF` is the size of the receive buffer; longer datagrams are cut by the
/// socket. A failed receive closes the socket, and every round after it
/// counts as failed without touching the handle.
pub struct DatagramEcho<'a, S, const BUF: usize = ECHO_BUFFER_SIZE> {
    socket: S,
    config: DatagramEchoConfig<'a>,
    open: bool,
}

impl<'a, S: DatagramSocket, const BUF: usize> DatagramEcho<'a, S, BUF> {
    pub fn new(socket: S, config: DatagramEchoConfig<'a>) -> Self {
        Self {
            socket,
            config,
            open: false,
        }
    }

    pub fn config(&self) -> &DatagramEchoConfig<'a> {
        &self.config
    }

    pub fn into_socket(self) -> S {
        self.socket
    }

    /// One send/receive exchange. A send failure does not end the round
    /// early.
    async fn exchange(&mut self) -> RoundOutcome {
        if !self.open {
            warn!("UDP socket is closed, skipping exchange");
            return RoundOutcome {
                sent: false,
                send_error: None,
                received: false,
            };
        }

        let peer = self.config.peer;
        let send_error = match self.socket.send_to(self.config.message, peer).await {
            Ok(n) => {
                info!("UDP test packet sent successfully ({} bytes)", n);
                None
            }
            Err(e) => {
                let kind = e.send_error_kind();
                error!("UDP send failed: {:?} ({:?})", Dbg(&e), kind);
                error!("{}", kind.hint());
                Some(kind)
            }
        };

        let mut buf = [0u8; BUF];
        let (received, len) = match self.socket.recv_from(&mut buf, self.config.recv_timeout).await {
            Ok(n) => (true, n.min(BUF)),
            Err(e) => {
                error!("UDP recv failed: {:?}", Dbg(&e));
                info!("UDP socket close");
                self.socket.close();
                self.open = false;
                (false, 0)
            }
        };

        let text = core::str::from_utf8(&buf[..len]).unwrap_or("<non-utf8>");
        info!("UDP test receive packet ( {} )", text);

        RoundOutcome {
            sent: send_error.is_none(),
            send_error,
            received,
        }
    }
}

struct RoundOutcome {
    sent: bool,
    send_error: Option<SendErrorKind>,
    received: bool,
}

impl<S: DatagramSocket, const BUF: usize> Session for DatagramEcho<'_, S, BUF> {
    type Error = S::Error;

    async fn run<D: DelayNs>(
        &mut self,
        link: &LinkReady,
        delay: &mut D,
    ) -> Result<SessionReport, SessionError<S::Error>> {
        debug!("Echo session over link up after {} s", link.waited_secs());

        if let Err(e) = self.socket.open() {
            error!("Socket creation failed: {:?}", Dbg(&e));
            return Err(SessionError::TransportUnavailable(e));
        }
        self.open = true;

        info!("Waiting for modem to settle");
        delay.delay_ms(millis(self.config.post_link_settle)).await;

        let mut counter = ExchangeCounter::new(self.config.iterations);
        let mut report = SessionReport {
            rounds: 0,
            send_failures: 0,
            recv_failures: 0,
            end: SessionEnd::Completed,
        };

        while !counter.is_complete() {
            let outcome = self.exchange().await;
            report.send_failures += u32::from(!outcome.sent);
            report.recv_failures += u32::from(!outcome.received);
            counter.advance();
            delay.delay_ms(millis(self.config.round_interval)).await;
        }

        if self.open {
            info!("UDP socket close");
            self.socket.close();
            self.open = false;
        }
        info!("UDP socket test end");

        report.rounds = counter.count();
        Ok(report)
    }
}
