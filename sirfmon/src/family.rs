use crate::{display::Display, driver::ProtocolDriver, error::MonitorError, session::MonitorSession};

/// Outcome of offering an operator line to a device family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    /// Handled by the family
    Match,
    /// Not a family command; the monitor loop may handle it
    Unknown,
    /// Handled, and the session must end
    Terminate,
}

/// What the monitor loop needs from a receiver family.
///
/// The loop holds one family for the whole run and never looks past this
/// trait, so adding a family does not touch the loop.
pub trait DeviceFamily {
    fn name(&self) -> &'static str;

    /// Sent once when the loop starts, usually an identification request.
    fn identify(&mut self, session: &mut MonitorSession);

    /// Decodes one complete frame and renders it.
    fn analyze(
        &mut self,
        frame: &[u8],
        session: &mut MonitorSession,
        display: &mut dyn Display,
    ) -> Result<(), MonitorError>;

    /// Creates and labels the family's panels.
    fn layout(&mut self, display: &mut dyn Display) -> Result<(), MonitorError>;

    /// Runs once per loop pass; `operator_input` is set when the pass
    /// handled an operator line.
    fn repaint(
        &mut self,
        session: &mut MonitorSession,
        display: &mut dyn Display,
        operator_input: bool,
    ) -> Result<(), MonitorError>;

    fn command(
        &mut self,
        line: &str,
        session: &mut MonitorSession,
    ) -> Result<CommandStatus, MonitorError>;

    /// Smallest usable terminal, `(rows, cols)`
    fn min_size(&self) -> (u16, u16) {
        (23, 80)
    }

    fn driver(&self) -> &dyn ProtocolDriver;
}
