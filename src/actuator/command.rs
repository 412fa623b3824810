use std::process::{Command, Stdio};

use super::Actuator;
use crate::error::ActuatorError;

/// Runs an external program on every switch, passing the new state in
/// `SNAPWATCH_STATE` (`on` or `off`).
pub struct CommandActuator {
    program: String,
    args: Vec<String>,
    state: bool,
}

impl CommandActuator {
    /// `argv[0]` is the program. Returns `None` for an empty command line.
    pub fn new(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        log::info!("Command actuator: {} {:?}", program, args);
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
            state: false,
        })
    }

    fn run(&mut self, on: bool) -> Result<(), ActuatorError> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .env("SNAPWATCH_STATE", if on { "on" } else { "off" })
            .stdin(Stdio::null())
            .status()
            .map_err(|source| ActuatorError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !status.success() {
            return Err(ActuatorError::Exit {
                program: self.program.clone(),
                status: status.to_string(),
            });
        }

        self.state = on;
        log::info!("{} switched {}", self.program, if on { "on" } else { "off" });
        Ok(())
    }
}

impl Actuator for CommandActuator {
    fn on(&mut self) -> Result<(), ActuatorError> {
        self.run(true)
    }

    fn off(&mut self) -> Result<(), ActuatorError> {
        self.run(false)
    }

    fn is_on(&self) -> bool {
        self.state
    }
}
