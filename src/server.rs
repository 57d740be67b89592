//! Control of the `adb` background server.

use crate::devices::{get_connected_devices, DeviceRecord};
use crate::error::Result;
use crate::util::adb_utils::{command_line, Tool, ToolRunner};
use log::{info, warn};

// Exit status is not part of the contract for server control: adb reports a
// non-zero status from `kill-server` when no server was running, for example.
fn run_server_command(runner: &dyn ToolRunner, command: &str) -> Result<()> {
    let args = [command];
    let output = runner.run(Tool::Adb, &args)?;
    if !output.success() {
        warn!(
            "`{}` exited with {:?}: {}",
            command_line(Tool::Adb, &args),
            output.code,
            output.stderr.trim()
        );
    }
    Ok(())
}

/// Stop the adb server. Blocks until `adb kill-server` returns.
pub fn kill_server(runner: &dyn ToolRunner) -> Result<()> {
    run_server_command(runner, "kill-server")?;
    info!("adb server killed");
    Ok(())
}

/// Start the adb server. Blocks until `adb start-server` returns.
pub fn start_server(runner: &dyn ToolRunner) -> Result<()> {
    run_server_command(runner, "start-server")?;
    info!("adb server started");
    Ok(())
}

/// Kill and start the adb server, then enumerate devices once.
pub fn restart_server(runner: &dyn ToolRunner) -> Result<Vec<DeviceRecord>> {
    kill_server(runner)?;
    start_server(runner)?;
    get_connected_devices(runner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::test_utils::FakeRunner;
    use crate::error::MirrorError;

    #[test]
    fn restart_kills_starts_then_enumerates_once() {
        let runner = FakeRunner::new().reply(
            "adb devices",
            "List of devices attached\nA1\tdevice\nB2\tdevice\nC3\tdevice\n",
        );
        let devices = restart_server(&runner).unwrap();
        assert_eq!(devices.len(), 3);

        let calls = runner.calls.borrow();
        assert_eq!(calls[0], "adb kill-server");
        assert_eq!(calls[1], "adb start-server");
        assert_eq!(calls[2], "adb devices");
        assert_eq!(runner.count("adb devices"), 1);
    }

    #[test]
    fn non_zero_exit_still_completes() {
        let runner = FakeRunner::new().fail("adb kill-server", 1, "cannot connect to daemon");
        assert!(kill_server(&runner).is_ok());
    }

    #[test]
    fn missing_adb_is_an_error() {
        let runner = FakeRunner::new().without(Tool::Adb);
        assert!(matches!(
            kill_server(&runner),
            Err(MirrorError::ToolNotFound { .. })
        ));
        assert!(restart_server(&runner).is_err());
        assert_eq!(runner.count("adb start-server"), 0);
    }
}
