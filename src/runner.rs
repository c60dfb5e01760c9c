//! # Run Sequencing
//!
//! Wires the phases together: power cycle, link bring-up, then exactly one
//! session. A failed bring-up never reaches the session.

use embedded_hal_async::delay::DelayNs;

use crate::config::RunConfig;
use crate::device::{InterfaceRegistry, LinkEventHandler, Modem, PowerRail};
use crate::error::RunError;
use crate::link::LinkController;
use crate::power::power_cycle;
use crate::session::{Session, SessionReport};

/// The hardware a run drives.
pub struct Board<'b, P, M, R, H> {
    pub rail: &'b mut P,
    pub modem: &'b mut M,
    pub interfaces: &'b mut R,
    pub link_events: &'b mut H,
}

/// Power-cycles the modem, brings the link up and runs `session` over it.
pub async fn run<P, M, R, H, S, D>(
    board: Board<'_, P, M, R, H>,
    session: &mut S,
    config: &RunConfig,
    delay: &mut D,
) -> Result<SessionReport, RunError<S::Error>>
where
    P: PowerRail,
    M: Modem,
    R: InterfaceRegistry,
    H: LinkEventHandler,
    S: Session,
    D: DelayNs,
{
    power_cycle(board.rail, &config.power, delay).await;

    let mut link = LinkController::new(config.link);
    let ready = link
        .bring_up(board.modem, board.interfaces, board.link_events, delay)
        .await?;

    let report = session.run(&ready, delay).await?;
    info!(
        "Session finished: {} rounds, {} send failures, {} receive failures",
        report.rounds,
        report.send_failures,
        report.recv_failures
    );
    Ok(report)
}
