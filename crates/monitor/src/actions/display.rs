//! Display reset via a configured command

use crate::actions::DisplayResetService;
use crate::actions::command::{CommandRunner, CommandTemplate};
use common::ActionError;
use tracing::info;

pub struct CommandDisplayReset {
    template: CommandTemplate,
    runner: CommandRunner,
}

impl CommandDisplayReset {
    pub fn new(template: CommandTemplate, runner: CommandRunner) -> Self {
        Self { template, runner }
    }
}

impl DisplayResetService for CommandDisplayReset {
    fn reset(&self) -> Result<(), ActionError> {
        if self.template.is_empty() {
            return Err(ActionError::NotConfigured("display reset command".to_string()));
        }

        self.runner.run_parts(self.template.parts())?;
        info!("Display resolution reset");
        Ok(())
    }
}
