//! Print dispatch through the system spooler command.

use async_trait::async_trait;
use rx_intake::{CollaboratorError, PrintSpooler};
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

/// Runs `<command> -d <printer> <file>` (CUPS `lp` style).
#[derive(Debug, Clone)]
pub struct CommandPrintSpooler {
    command: String,
}

impl CommandPrintSpooler {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl Default for CommandPrintSpooler {
    fn default() -> Self {
        Self::new("lp")
    }
}

#[async_trait]
impl PrintSpooler for CommandPrintSpooler {
    async fn print(&self, document: &Path, printer: &str) -> Result<(), CollaboratorError> {
        let fail = |reason: String| CollaboratorError::Print {
            path: document.to_path_buf(),
            printer: printer.to_string(),
            reason,
        };

        let output = Command::new(&self.command)
            .arg("-d")
            .arg(printer)
            .arg(document)
            .output()
            .await
            .map_err(|err| fail(format!("{}: {}", self.command, err)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(fail(format!("{} ({})", output.status, stderr.trim())));
        }

        debug!(
            printer,
            path = %document.display(),
            "[rx-runtime] 🖨️ print job submitted"
        );
        Ok(())
    }
}
