use super::Actuator;
use crate::error::ActuatorError;

/// A relay output with optional active-low wiring.
///
/// The logical state is what callers see; `level` is what the driving line
/// carries after `active_low` is applied.
pub struct Relay {
    label: String,
    active_low: bool,
    state: bool,
}

impl Relay {
    /// Starts switched off.
    pub fn new(label: impl Into<String>, active_low: bool) -> Self {
        let relay = Self {
            label: label.into(),
            active_low,
            state: false,
        };
        log::info!(
            "Relay {} ready ({})",
            relay.label,
            if active_low { "active low" } else { "active high" }
        );
        relay
    }

    /// Line level: `true` is high.
    pub fn level(&self) -> bool {
        self.state != self.active_low
    }

    fn drive(&mut self, on: bool) {
        self.state = on;
        log::info!(
            "Relay {} {} (line {})",
            self.label,
            if on { "on" } else { "off" },
            if self.level() { "high" } else { "low" }
        );
    }
}

impl Actuator for Relay {
    fn on(&mut self) -> Result<(), ActuatorError> {
        self.drive(true);
        Ok(())
    }

    fn off(&mut self) -> Result<(), ActuatorError> {
        self.drive(false);
        Ok(())
    }

    fn is_on(&self) -> bool {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn active_high_levels() {
        let mut relay = Relay::new("lamp", false);
        assert!(!relay.level());
        relay.on().unwrap();
        assert!(relay.is_on());
        assert!(relay.level());
    }

    #[test]
    fn active_low_inverts_line() {
        let mut relay = Relay::new("lamp", true);
        assert!(relay.level());
        relay.on().unwrap();
        assert!(relay.is_on());
        assert!(!relay.level());
    }

    #[test]
    fn toggle_and_pulse() {
        let mut relay = Relay::new("lamp", false);
        relay.toggle().unwrap();
        assert!(relay.is_on());
        relay.toggle().unwrap();
        assert!(!relay.is_on());
        relay.pulse(Duration::from_millis(1)).unwrap();
        assert!(!relay.is_on());
    }
}
