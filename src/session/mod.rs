//! Session Drivers
//!
//! A session is one bounded application exchange over an established link.
//! Two variants exist:
//!
//! - [`DatagramEcho`]: sends a fixed message to a UDP echo peer and reads the
//!   answer back, a fixed number of rounds.
//! - [`PublishSession`]: connects to an MQTT broker and publishes a numbered
//!   message per round.
//!
//! Both take the same [`LinkReady`] precondition and report a
//! [`SessionReport`]. Per-round failures are counted, never propagated; only
//! the fatal conditions listed on [`SessionError`] end a session with an error.

use embedded_hal_async::delay::DelayNs;

use crate::error::SessionError;
use crate::link::LinkReady;

pub(crate) mod echo;
pub(crate) mod publish;
pub(crate) mod state;

pub use echo::DatagramEcho;
pub use publish::PublishSession;
pub use state::{ConnectionCell, SessionState};

/// How the round loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionEnd {
    /// Every configured round ran.
    Completed,
    /// The peer dropped the connection before the last round.
    ConnectionLost,
}

/// Outcome of a session that did not hit a fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SessionReport {
    pub rounds: u32,
    pub send_failures: u32,
    pub recv_failures: u32,
    pub end: SessionEnd,
}

/// One kind of application exchange.
#[allow(async_fn_in_trait)]
pub trait Session {
    type Error: core::fmt::Debug;

    async fn run<D: DelayNs>(
        &mut self,
        link: &LinkReady,
        delay: &mut D,
    ) -> Result<SessionReport, SessionError<Self::Error>>;
}

impl<S: Session + ?Sized> Session for &mut S {
    type Error = S::Error;

    async fn run<D: DelayNs>(
        &mut self,
        link: &LinkReady,
        delay: &mut D,
    ) -> Result<SessionReport, SessionError<Self::Error>> {
        (**self).run(link, delay).await
    }
}

/// Counts completed rounds up to a fixed limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeCounter {
    done: u32,
    limit: u32,
}

impl ExchangeCounter {
    pub const fn new(limit: u32) -> Self {
        Self { done: 0, limit }
    }

    pub const fn count(&self) -> u32 {
        self.done
    }

    pub const fn limit(&self) -> u32 {
        self.limit
    }

    pub const fn is_complete(&self) -> bool {
        self.done >= self.limit
    }

    /// Records one attempted round. Returns `false` once the limit is reached,
    /// in which case the count is left unchanged.
    pub fn advance(&mut self) -> bool {
        if self.is_complete() {
            return false;
        }
        self.done += 1;
        true
    }
}
