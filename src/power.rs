//! # Modem Power Sequencing
//!
//! Hard power cycle of the modem supply: off, settle, on, settle. The sequence
//! is best-effort and never fails startup.

use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;

use crate::config::{PowerConfig, millis};
use crate::device::PowerRail;
use crate::fmt::Dbg;

/// Switches the rail off and back on.
///
/// When the rail is not ready the off step is skipped silently and the on
/// step only logs; no settle delay is observed in that case.
pub async fn power_cycle<P, D>(rail: &mut P, config: &PowerConfig, delay: &mut D)
where
    P: PowerRail,
    D: DelayNs,
{
    power_off(rail, config, delay).await;
    power_on(rail, config, delay).await;
}

async fn power_off<P: PowerRail, D: DelayNs>(rail: &mut P, config: &PowerConfig, delay: &mut D) {
    if !rail.is_ready() {
        return;
    }

    info!("Turning off modem supply...");
    if let Err(e) = rail.power_off() {
        warn!("Failed to turn off modem supply: {:?}", Dbg(&e));
    }
    delay.delay_ms(millis(config.off_settle)).await;
}

async fn power_on<P: PowerRail, D: DelayNs>(rail: &mut P, config: &PowerConfig, delay: &mut D) {
    if !rail.is_ready() {
        error!("Modem supply rail not ready");
        return;
    }

    info!("Turning on modem supply...");
    if let Err(e) = rail.power_on() {
        error!("Failed to turn on modem supply: {:?}", Dbg(&e));
    }
    delay.delay_ms(millis(config.on_settle)).await;
}

/// A supply enable line driven through a GPIO, e.g. the LDO enable pin of the
/// modem regulator.
pub struct GpioPowerRail<P> {
    pin: P,
    active_low: bool,
}

impl<P: OutputPin> GpioPowerRail<P> {
    /// Creates a rail whose enable line is active high.
    pub fn new(pin: P) -> Self {
        Self {
            pin,
            active_low: false,
        }
    }

    /// Creates a rail whose enable line is active low.
    pub fn active_low(pin: P) -> Self {
        Self {
            pin,
            active_low: true,
        }
    }

    pub fn release(self) -> P {
        self.pin
    }
}

impl<P: OutputPin> PowerRail for GpioPowerRail<P> {
    type Error = P::Error;

    fn is_ready(&self) -> bool {
        true
    }

    fn power_on(&mut self) -> Result<(), Self::Error> {
        if self.active_low {
            self.pin.set_low()
        } else {
            self.pin.set_high()
        }
    }

    fn power_off(&mut self) -> Result<(), Self::Error> {
        if self.active_low {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        }
    }
}
