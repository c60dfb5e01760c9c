//! # Cellular Link Bring-Up for Embedded Systems
//!
//! `myrtio-cellular` is a `no_std`, asynchronous orchestration layer that takes a
//! cellular modem from cold power to a usable data link and then runs one short
//! application session over it, built upon the [Embassy](https://embassy.dev/)
//! async ecosystem.
//!
//! ## Core Features
//!
//! - **`no_std` & `no_alloc`:** Fixed buffers only, via const generics and
//!   `heapless`.
//! - **Bounded waits:** Every phase waits with an explicit countdown or poll
//!   budget. Nothing retries behind your back.
//! - **Hardware agnostic:** The power rail, modem, network interfaces, sockets
//!   and the MQTT engine are traits. `embassy-net` adapters live in [`net`].
//! - **Testable timing:** All sleeps go through `embedded_hal_async::delay::DelayNs`,
//!   so firmware passes `embassy_time::Delay` and tests pass a fake clock.
//!
//! ## Phases
//!
//! 1. [`power::power_cycle`]: modem supply off, settle, on, settle.
//! 2. [`link::LinkController::bring_up`]: resume the modem, request the PPP
//!    interface up and poll it once per second until it is up or the countdown
//!    expires. Success yields a [`LinkReady`] token.
//! 3. A [`Session`] consumes the token: [`DatagramEcho`] for a UDP echo
//!    exchange, [`PublishSession`] for an MQTT publish run.
//!
//! [`runner::run`] chains the three:
//!
//! ```ignore
//! let board = Board {
//!     rail: &mut rail,
//!     modem: &mut modem,
//!     interfaces: &mut SingleInterface::new(StackInterface::ppp(stack)),
//!     link_events: &mut NoopLinkEvents,
//! };
//! let mut echo: DatagramEcho<'_, _> = DatagramEcho::new(udp, DatagramEchoConfig::default());
//! let report = run(board, &mut echo, &RunConfig::default(), &mut embassy_time::Delay).await?;
//! ```
//!
//! ## Connection Events
//!
//! The MQTT engine reports `CONNACK` and disconnects from its own context by
//! delivering [`transport::ClientEvent`]s into a [`transport::ClientEvents`]
//! mailbox. Connection changes are latched there and never dropped. The
//! publish session owns the only receiver and re-reads it before every
//! publish, so a broker-side disconnect stops the run before the next message.

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod config;
pub mod device;
pub mod error;
pub mod link;
pub mod net;
pub mod power;
pub mod runner;
pub mod session;
pub mod transport;

#[cfg(test)]
mod testing;

// Re-export key types for easier access at the crate root.
pub use error::{LinkError, RunError, SessionError};
pub use link::{LinkReady, LinkState};
pub use runner::{Board, run};
pub use session::{DatagramEcho, PublishSession, Session, SessionReport};
