//! # Device Boundary
//!
//! Traits for the hardware the bring-up sequence drives: the modem power rail,
//! the modem itself and the network interfaces it exposes. Board crates
//! implement these against their HAL and network driver.

/// The switchable supply of the modem.
pub trait PowerRail {
    type Error: core::fmt::Debug;

    /// Whether the rail controller can be driven at all.
    fn is_ready(&self) -> bool;

    fn power_on(&mut self) -> Result<(), Self::Error>;

    fn power_off(&mut self) -> Result<(), Self::Error>;
}

/// The modem device, as far as bring-up is concerned.
#[allow(async_fn_in_trait)]
pub trait Modem {
    type Error: core::fmt::Debug;

    fn is_ready(&self) -> bool;

    /// Wakes the modem from its power-managed state.
    async fn resume(&mut self) -> Result<(), Self::Error>;
}

/// Link-layer type of a network interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InterfaceKind {
    Ppp,
    Ethernet,
    Other,
}

/// Interface management events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkEvent {
    Up,
    Down,
    AddressAdded,
    AddressRemoved,
    Other(u32),
}

/// A network interface that can be asked to come up.
pub trait NetInterface {
    fn kind(&self) -> InterfaceKind;

    /// Requests the interface up. Completion is observed through `is_up`.
    fn bring_up(&mut self);

    fn is_up(&self) -> bool;

    /// Next pending management event, if any.
    fn next_event(&mut self) -> Option<LinkEvent> {
        None
    }
}

/// Lookup of network interfaces by kind.
pub trait InterfaceRegistry {
    type Interface: NetInterface;

    /// First interface of the given kind.
    fn first_by_kind(&mut self, kind: InterfaceKind) -> Option<&mut Self::Interface>;
}

/// A registry holding exactly one interface.
pub struct SingleInterface<I> {
    iface: I,
}

impl<I: NetInterface> SingleInterface<I> {
    pub fn new(iface: I) -> Self {
        Self { iface }
    }

    pub fn get(&self) -> &I {
        &self.iface
    }

    pub fn into_inner(self) -> I {
        self.iface
    }
}

impl<I: NetInterface> InterfaceRegistry for SingleInterface<I> {
    type Interface = I;

    fn first_by_kind(&mut self, kind: InterfaceKind) -> Option<&mut I> {
        (self.iface.kind() == kind).then_some(&mut self.iface)
    }
}

/// A registry with no interfaces at all.
pub struct NoInterfaces<I>(core::marker::PhantomData<I>);

impl<I> Default for NoInterfaces<I> {
    fn default() -> Self {
        Self(core::marker::PhantomData)
    }
}

impl<I: NetInterface> InterfaceRegistry for NoInterfaces<I> {
    type Interface = I;

    fn first_by_kind(&mut self, _kind: InterfaceKind) -> Option<&mut I> {
        None
    }
}

/// Receives interface management events during bring-up.
pub trait LinkEventHandler {
    fn on_link_event(&mut self, event: LinkEvent);
}

/// A handler that ignores every event.
///
/// Useful as a placeholder until an application attaches its own.
pub struct NoopLinkEvents;

impl LinkEventHandler for NoopLinkEvents {
    fn on_link_event(&mut self, _event: LinkEvent) {}
}

impl<H: LinkEventHandler + ?Sized> LinkEventHandler for &mut H {
    fn on_link_event(&mut self, event: LinkEvent) {
        (**self).on_link_event(event)
    }
}
