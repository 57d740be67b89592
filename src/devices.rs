//! Discovery of the devices `adb` can currently reach.
//!
//! Enumeration runs `adb devices`, keeps the lines reporting a ready
//! device and then resolves a human readable name for each serial:
//!
//! 1. `settings get global device_name`, unless it is empty or `null`;
//! 2. `getprop net.hostname`, unless it is empty;
//! 3. otherwise [`UNKNOWN_DEVICE_NAME`].
//!
//! Failures while resolving a name never reach the caller; a failure of
//! `adb devices` itself does.

use crate::error::{MirrorError, Result};
use crate::util::adb_utils::{command_line, Tool, ToolRunner};
use crate::util::UNKNOWN_DEVICE_NAME;
use log::{debug, info};
use serde::Serialize;
use std::fmt::{self, Display, Formatter};

/// Marker a line of `adb devices` must contain to count as a usable device.
const READY_STATE: &str = "device";

/// A device found by the last enumeration.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DeviceRecord {
    /// Serial reported by `adb devices`. Opaque.
    pub id: String,
    /// Display name. Not unique across devices.
    pub name: String,
}

impl Display for DeviceRecord {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}   ({})", self.name, self.id)
    }
}

/// Which branch of the naming chain produced a device's display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedName {
    /// The `device_name` global setting.
    Setting(String),
    /// The `net.hostname` property.
    Hostname(String),
    Unknown,
}

impl ResolvedName {
    pub fn into_display_name(self) -> String {
        match self {
            ResolvedName::Setting(name) | ResolvedName::Hostname(name) => name,
            ResolvedName::Unknown => UNKNOWN_DEVICE_NAME.to_string(),
        }
    }
}

/// Serials of the ready devices in `adb devices` output, in line order.
/// The first line is the `List of devices attached` header.
pub fn parse_device_ids(output: &str) -> Vec<String> {
    output
        .lines()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .filter(|line| line.contains(READY_STATE))
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_string)
        .collect()
}

// Trimmed stdout of a single-line query. Any failure is an error; callers
// decide what to fall back to.
fn query(runner: &dyn ToolRunner, args: &[&str]) -> Result<String> {
    let output = runner.run(Tool::Adb, args)?;
    if !output.success() {
        return Err(MirrorError::CommandFailed {
            command: command_line(Tool::Adb, args),
            code: output.code,
            stderr: output.stderr,
        });
    }
    let stdout = String::from_utf8(output.stdout).map_err(|_| MirrorError::Decode {
        command: command_line(Tool::Adb, args),
    })?;
    Ok(stdout.trim().to_string())
}

fn query_device_name(runner: &dyn ToolRunner, device_id: &str) -> Result<ResolvedName> {
    let setting = query(
        runner,
        &["-s", device_id, "shell", "settings", "get", "global", "device_name"],
    )?;
    if !setting.is_empty() && setting != "null" {
        return Ok(ResolvedName::Setting(setting));
    }

    let hostname = query(runner, &["-s", device_id, "shell", "getprop", "net.hostname"])?;
    if !hostname.is_empty() {
        return Ok(ResolvedName::Hostname(hostname));
    }

    Ok(ResolvedName::Unknown)
}

/// Resolve the display name of `device_id`. Never fails.
pub fn resolve_device_name(runner: &dyn ToolRunner, device_id: &str) -> ResolvedName {
    query_device_name(runner, device_id).unwrap_or_else(|e| {
        debug!("Name lookup for {} failed: {}", device_id, e);
        ResolvedName::Unknown
    })
}

/// Enumerate the devices `adb` reports as ready, with their display names.
///
/// An empty list is a normal result. An error means `adb devices` itself
/// could not be run or did not succeed.
pub fn get_connected_devices(runner: &dyn ToolRunner) -> Result<Vec<DeviceRecord>> {
    let args = ["devices"];
    let output = runner.run(Tool::Adb, &args)?;
    if !output.success() {
        return Err(MirrorError::CommandFailed {
            command: command_line(Tool::Adb, &args),
            code: output.code,
            stderr: output.stderr,
        });
    }
    let listing = String::from_utf8(output.stdout).map_err(|_| MirrorError::Decode {
        command: command_line(Tool::Adb, &args),
    })?;

    let devices: Vec<DeviceRecord> = parse_device_ids(&listing)
        .into_iter()
        .map(|id| {
            let name = resolve_device_name(runner, &id).into_display_name();
            DeviceRecord { id, name }
        })
        .collect();

    info!("Found {} device(s)", devices.len());
    debug!("Connected devices: {:?}", devices);
    Ok(devices)
}


#[cfg(test)]
mod tests {
    use super::test_utils::FakeRunner;
    use super::*;
    use crate::util::test_with_logs;

    const HEADER: &str = "List of devices attached\n";

    fn setting_cmd(id: &str) -> String {
        format!("adb -s {} shell settings get global device_name", id)
    }

    fn hostname_cmd(id: &str) -> String {
        format!("adb -s {} shell getprop net.hostname", id)
    }

    #[test]
    fn header_only_yields_no_devices() {
        assert!(parse_device_ids(HEADER).is_empty());
        assert!(parse_device_ids("List of devices attached\n\n").is_empty());
        assert!(parse_device_ids("").is_empty());
    }

    #[test]
    fn identifier_is_first_token_of_ready_lines() {
        let output = "List of devices attached\n\
                      R58M12ABCDE\tdevice\n\
                      emulator-5554\toffline\n\
                      192.168.1.20:5555 device product:panther model:Pixel_7\n\
                      0123456789\tunauthorized\n\
                      \n";
        assert_eq!(
            parse_device_ids(output),
            vec!["R58M12ABCDE".to_string(), "192.168.1.20:5555".to_string()]
        );
    }

    #[test]
    fn order_is_preserved_and_duplicates_kept() {
        let output = "List of devices attached\nb\tdevice\na\tdevice\nb\tdevice\n";
        assert_eq!(parse_device_ids(output), vec!["b", "a", "b"]);
    }

    #[test]
    fn setting_name_is_used_when_present() {
        let runner = FakeRunner::new().reply(&setting_cmd("A1"), "Pixel7\n");
        assert_eq!(
            resolve_device_name(&runner, "A1"),
            ResolvedName::Setting("Pixel7".to_string())
        );
        assert_eq!(runner.count(&hostname_cmd("A1")), 0);
    }

    #[test]
    fn empty_setting_falls_back_to_hostname() {
        let runner = FakeRunner::new()
            .reply(&setting_cmd("A1"), "")
            .reply(&hostname_cmd("A1"), "android-7f3\n");
        assert_eq!(
            resolve_device_name(&runner, "A1").into_display_name(),
            "android-7f3"
        );
    }

    #[test]
    fn null_setting_falls_back_to_hostname() {
        let runner = FakeRunner::new()
            .reply(&setting_cmd("A1"), "null\n")
            .reply(&hostname_cmd("A1"), "android-7f3");
        assert_eq!(
            resolve_device_name(&runner, "A1"),
            ResolvedName::Hostname("android-7f3".to_string())
        );
    }

    #[test]
    fn both_empty_is_unknown() {
        let runner = FakeRunner::new()
            .reply(&setting_cmd("A1"), "  \n")
            .reply(&hostname_cmd("A1"), "");
        let name = resolve_device_name(&runner, "A1");
        assert_eq!(name, ResolvedName::Unknown);
        assert_eq!(name.into_display_name(), "Unknown");
    }

    #[test]
    fn lookup_failures_are_unknown() {
        test_with_logs();
        let failing =
            FakeRunner::new().fail(&setting_cmd("A1"), 1, "error: device offline");
        assert_eq!(resolve_device_name(&failing, "A1"), ResolvedName::Unknown);

        let undecodable =
            FakeRunner::new().reply_bytes(&setting_cmd("A1"), &[0xff, 0xfe]);
        assert_eq!(resolve_device_name(&undecodable, "A1"), ResolvedName::Unknown);

        let missing = FakeRunner::new().without(Tool::Adb);
        assert_eq!(resolve_device_name(&missing, "A1"), ResolvedName::Unknown);
    }

    #[test]
    fn failing_hostname_fallback_is_unknown() {
        let runner = FakeRunner::new()
            .reply(&setting_cmd("A1"), "null")
            .fail(&hostname_cmd("A1"), 1, "error: closed");
        assert_eq!(resolve_device_name(&runner, "A1"), ResolvedName::Unknown);
        assert_eq!(runner.count(&hostname_cmd("A1")), 1);

        let runner = FakeRunner::new()
            .reply(&setting_cmd("A1"), "")
            .spawn_error(&hostname_cmd("A1"));
        assert_eq!(
            resolve_device_name(&runner, "A1").into_display_name(),
            UNKNOWN_DEVICE_NAME
        );
    }

    #[test]
    fn enumeration_names_every_device() {
        test_with_logs();
        let runner = FakeRunner::new()
            .reply("adb devices", "List of devices attached\nA1\tdevice\nB2\tdevice\n")
            .reply(&setting_cmd("A1"), "Pixel7")
            .reply(&hostname_cmd("B2"), "android-7f3");
        let devices = get_connected_devices(&runner).unwrap();
        assert_eq!(
            devices,
            vec![
                DeviceRecord {
                    id: "A1".to_string(),
                    name: "Pixel7".to_string()
                },
                DeviceRecord {
                    id: "B2".to_string(),
                    name: "android-7f3".to_string()
                },
            ]
        );
    }

    #[test]
    fn enumeration_with_no_devices_is_ok() {
        let runner = FakeRunner::new().reply("adb devices", HEADER);
        assert!(get_connected_devices(&runner).unwrap().is_empty());
    }

    #[test]
    fn enumeration_failure_is_reported() {
        let runner = FakeRunner::new().fail("adb devices", 1, "cannot connect to daemon");
        match get_connected_devices(&runner) {
            Err(MirrorError::CommandFailed { code, .. }) => assert_eq!(code, Some(1)),
            other => panic!("Unexpected result: {:?}", other),
        }

        let runner = FakeRunner::new().without(Tool::Adb);
        assert!(matches!(
            get_connected_devices(&runner),
            Err(MirrorError::ToolNotFound { tool: "adb" })
        ));
    }
}
