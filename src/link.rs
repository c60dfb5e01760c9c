//! # Link Bring-Up
//!
//! Brings the modem's point-to-point interface up and waits for it under a
//! bounded countdown. The only way to obtain a [`LinkReady`] is a successful
//! bring-up, so sessions cannot run over a link that is not up.

use embedded_hal_async::delay::DelayNs;

use crate::config::{LinkConfig, millis};
use crate::device::{InterfaceKind, InterfaceRegistry, LinkEventHandler, Modem, NetInterface};
use crate::error::LinkError;
use crate::fmt::Dbg;

/// Bring-up progress of the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkState {
    Down,
    BringingUp,
    Up,
    Failed,
}

impl LinkState {
    pub const fn is_terminal(self) -> bool {
        matches!(self, LinkState::Up | LinkState::Failed)
    }
}

/// Proof that the link reported up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkReady {
    waited_secs: u32,
}

impl LinkReady {
    /// Number of poll intervals that elapsed before the link came up.
    pub fn waited_secs(&self) -> u32 {
        self.waited_secs
    }

    #[cfg(test)]
    pub(crate) fn assume_up() -> Self {
        Self { waited_secs: 0 }
    }
}

/// Owns the [`LinkState`] and drives it through one bring-up attempt.
pub struct LinkController {
    state: LinkState,
    config: LinkConfig,
}

impl LinkController {
    pub fn new(config: LinkConfig) -> Self {
        Self {
            state: LinkState::Down,
            config,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Resumes the modem, requests the PPP interface up and polls it once per
    /// interval until it reports up or `timeout_secs` intervals have passed.
    ///
    /// Interface management events seen while waiting are handed to `events`.
    pub async fn bring_up<M, R, H, D>(
        &mut self,
        modem: &mut M,
        interfaces: &mut R,
        events: &mut H,
        delay: &mut D,
    ) -> Result<LinkReady, LinkError>
    where
        M: Modem,
        R: InterfaceRegistry,
        H: LinkEventHandler,
        D: DelayNs,
    {
        if !modem.is_ready() {
            error!("Modem device not ready!");
            return Err(LinkError::DeviceNotReady);
        }
        info!("Modem ready");

        if let Err(e) = modem.resume().await {
            warn!("Modem resume failed: {:?}", Dbg(&e));
        }

        info!("Bringing up PPP interface...");
        let Some(iface) = interfaces.first_by_kind(InterfaceKind::Ppp) else {
            error!("No PPP interface found");
            return Err(LinkError::InterfaceNotFound);
        };

        iface.bring_up();
        self.state = LinkState::BringingUp;

        let timeout = self.config.timeout_secs;
        let mut remaining = timeout;
        while remaining > 0 {
            forward_events(iface, events);
            if iface.is_up() {
                return Ok(self.ready(timeout - remaining));
            }
            info!("Waiting for PPP connection... {} s left", remaining);
            remaining -= 1;
            delay.delay_ms(millis(self.config.poll_interval)).await;
        }

        forward_events(iface, events);
        if iface.is_up() {
            return Ok(self.ready(timeout));
        }

        error!("PPP connection failed after {} seconds", timeout);
        self.state = LinkState::Failed;
        Err(LinkError::LinkTimeout)
    }

    fn ready(&mut self, waited_secs: u32) -> LinkReady {
        info!("PPP connected successfully after {} s", waited_secs);
        self.state = LinkState::Up;
        LinkReady { waited_secs }
    }
}

fn forward_events<I: NetInterface, H: LinkEventHandler>(iface: &mut I, events: &mut H) {
    while let Some(event) = iface.next_event() {
        debug!("Link event: {:?}", event);
        events.on_link_event(event);
    }
}

/// Runs one bring-up attempt with a fresh [`LinkController`].
pub async fn bring_up_link<M, R, H, D>(
    modem: &mut M,
    interfaces: &mut R,
    events: &mut H,
    config: LinkConfig,
    delay: &mut D,
) -> Result<LinkReady, LinkError>
where
    M: Modem,
    R: InterfaceRegistry,
    H: LinkEventHandler,
    D: DelayNs,
{
    LinkController::new(config)
        .bring_up(modem, interfaces, events, delay)
        .await
}
