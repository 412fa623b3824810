pub mod command;
pub mod relay;

use std::time::Duration;

use crate::error::ActuatorError;

/// Something a trigger can switch: a relay, a lamp, a shell hook.
pub trait Actuator {
    fn on(&mut self) -> Result<(), ActuatorError>;
    fn off(&mut self) -> Result<(), ActuatorError>;
    fn is_on(&self) -> bool;

    fn toggle(&mut self) -> Result<(), ActuatorError> {
        if self.is_on() {
            self.off()
        } else {
            self.on()
        }
    }

    /// Switch on, hold for `duration`, switch off. Blocks the caller.
    fn pulse(&mut self, duration: Duration) -> Result<(), ActuatorError> {
        self.on()?;
        std::thread::sleep(duration);
        self.off()
    }
}

/// What an accepted trigger does to the actuator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerAction {
    Toggle,
    On,
    Off,
    Pulse(Duration),
}

impl TriggerAction {
    pub fn apply(&self, actuator: &mut dyn Actuator) -> Result<(), ActuatorError> {
        match *self {
            TriggerAction::Toggle => actuator.toggle(),
            TriggerAction::On => actuator.on(),
            TriggerAction::Off => actuator.off(),
            TriggerAction::Pulse(duration) => actuator.pulse(duration),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Remembers every state change; can be told to fail.
    #[derive(Default)]
    pub(crate) struct RecordingActuator {
        pub state: bool,
        pub history: Vec<bool>,
        pub fail: bool,
    }

    impl Actuator for RecordingActuator {
        fn on(&mut self) -> Result<(), ActuatorError> {
            if self.fail {
                return Err(ActuatorError::Stuck("relay welded".into()));
            }
            self.state = true;
            self.history.push(true);
            Ok(())
        }

        fn off(&mut self) -> Result<(), ActuatorError> {
            if self.fail {
                return Err(ActuatorError::Stuck("relay welded".into()));
            }
            self.state = false;
            self.history.push(false);
            Ok(())
        }

        fn is_on(&self) -> bool {
            self.state
        }
    }

    #[test]
    fn toggle_flips_state() {
        let mut actuator = RecordingActuator::default();
        TriggerAction::Toggle.apply(&mut actuator).unwrap();
        TriggerAction::Toggle.apply(&mut actuator).unwrap();
        assert_eq!(actuator.history, vec![true, false]);
    }

    #[test]
    fn pulse_ends_off() {
        let mut actuator = RecordingActuator::default();
        TriggerAction::Pulse(Duration::ZERO).apply(&mut actuator).unwrap();
        assert_eq!(actuator.history, vec![true, false]);
        assert!(!actuator.is_on());
    }

    #[test]
    fn failure_is_surfaced() {
        let mut actuator = RecordingActuator {
            fail: true,
            ..Default::default()
        };
        assert!(TriggerAction::On.apply(&mut actuator).is_err());
        assert!(actuator.history.is_empty());
    }
}
