
use crate::devices::{get_connected_devices, DeviceRecord};
use crate::server;
use crate::util::adb_utils::ToolRunner;
use crate::util::scrcpy_utils::{self, LaunchAttempt, MaxSize};
use log::{debug, error, info};
use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};

/// Where the session is in its lifecycle. Launches and server control pass
/// through their transient states and settle back on `DeviceListPopulated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    DeviceListPopulated,
    LaunchingSession,
    ServerRestarting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Message for the user, the console counterpart of a dialog box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

impl Display for Notice {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let tag = match self.level {
            NoticeLevel::Info => "Info",
            NoticeLevel::Warning => "Warning",
            NoticeLevel::Error => "Error",
        };
        write!(f, "[{}] {}", tag, self.message)
    }
}

pub const NO_DEVICES_FOUND: &str = "No devices found!";
pub const SELECT_A_DEVICE: &str = "Please select at least one device.";
pub const SERVER_KILLED: &str = "ADB server killed.";
pub const SERVER_RESTARTED: &str = "ADB server restarted.";

/// State behind the mirror window: the current device list, which rows are
/// selected and the size the next launch will use.
///
/// Rows are addressed by index only. Two devices sharing a display name are
/// two separate rows.
pub struct Session<R: ToolRunner> {
    runner: R,
    devices: Vec<DeviceRecord>,
    selected: BTreeSet<usize>,
    size: MaxSize,
    state: SessionState,
}

impl<R: ToolRunner> Session<R> {
    pub fn new(runner: R, size: MaxSize) -> Self {
        Session {
            runner,
            devices: Vec::new(),
            selected: BTreeSet::new(),
            size,
            state: SessionState::Idle,
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn devices(&self) -> &[DeviceRecord] {
        &self.devices
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn size(&self) -> MaxSize {
        self.size
    }

    /// Selected rows, ascending.
    pub fn selection(&self) -> Vec<usize> {
        self.selected.iter().copied().collect()
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.contains(&index)
    }

    fn transition(&mut self, to: SessionState) {
        debug!("Session state: {:?} -> {:?}", self.state, to);
        self.state = to;
    }

    /// Pick the size used by subsequent launches. Replaces any earlier choice.
    pub fn set_size(&mut self, size: MaxSize) {
        debug!("Mirror size set to {}", size);
        self.size = size;
    }

    fn apply_devices(&mut self, devices: Vec<DeviceRecord>) -> Option<Notice> {
        self.devices = devices;
        self.transition(SessionState::DeviceListPopulated);
        if self.devices.is_empty() {
            return Some(Notice::warning(NO_DEVICES_FOUND));
        }
        self.selected.insert(0);
        None
    }

    fn clear_devices(&mut self) {
        self.devices.clear();
        self.selected.clear();
    }

    /// Rebuild the device list. The first row is selected afterwards.
    pub fn refresh(&mut self) -> Option<Notice> {
        self.clear_devices();
        match get_connected_devices(&self.runner) {
            Ok(devices) => self.apply_devices(devices),
            Err(e) => {
                error!("Device enumeration failed: {}", e);
                self.transition(SessionState::Idle);
                Some(Notice::error(format!("Failed to list devices: {}", e)))
            }
        }
    }

    /// Replace the selection with `indices`. Nothing changes if any index is
    /// out of range.
    pub fn select(&mut self, indices: &[usize]) -> Option<Notice> {
        if let Some(bad) = indices.iter().find(|&&i| i >= self.devices.len()) {
            return Some(Notice::warning(format!("No device in row {}.", bad + 1)));
        }
        self.selected = indices.iter().copied().collect();
        None
    }

    pub fn select_all(&mut self) {
        self.selected = (0..self.devices.len()).collect();
    }

    fn launch_rows(&mut self, rows: &[usize]) -> Vec<LaunchAttempt> {
        self.transition(SessionState::LaunchingSession);
        let size = self.size;
        let ids = rows
            .iter()
            .filter_map(|&row| self.devices.get(row))
            .map(|device| device.id.as_str());
        let attempts = scrcpy_utils::launch_all(&self.runner, ids, size);
        self.transition(SessionState::DeviceListPopulated);
        attempts
    }

    /// One detached mirror per selected row, all at the current size.
    pub fn connect_selected(&mut self) -> Result<Vec<LaunchAttempt>, Notice> {
        if self.selected.is_empty() {
            return Err(Notice::info(SELECT_A_DEVICE));
        }
        let rows = self.selection();
        Ok(self.launch_rows(&rows))
    }

    /// Mirror a single row regardless of the selection.
    pub fn open(&mut self, index: usize) -> Result<LaunchAttempt, Notice> {
        if index >= self.devices.len() {
            return Err(Notice::warning(format!("No device in row {}.", index + 1)));
        }
        let mut attempts = self.launch_rows(&[index]);
        attempts
            .pop()
            .ok_or_else(|| Notice::error("Launch was not attempted."))
    }

    // Server-control failures leave the server in an unknown state, so the
    // list is dropped and the session goes back to `Idle`.
    fn server_control_failed(&mut self, notice: Notice) -> Notice {
        self.clear_devices();
        self.transition(SessionState::Idle);
        notice
    }

    /// Stop the adb server. On success the device list is left as it was.
    pub fn kill_server(&mut self) -> Notice {
        self.transition(SessionState::ServerRestarting);
        match server::kill_server(&self.runner) {
            Ok(()) => {
                self.transition(SessionState::DeviceListPopulated);
                Notice::info(SERVER_KILLED)
            }
            Err(e) => {
                error!("ADB server kill failed: {}", e);
                self.server_control_failed(Notice::error(format!(
                    "Failed to kill ADB server: {}",
                    e
                )))
            }
        }
    }

    /// Restart the adb server and enumerate once more.
    pub fn restart_server(&mut self) -> Vec<Notice> {
        self.transition(SessionState::ServerRestarting);
        self.clear_devices();
        match server::restart_server(&self.runner) {
            Ok(devices) => {
                info!("adb server restarted");
                let mut notices = vec![Notice::info(SERVER_RESTARTED)];
                notices.extend(self.apply_devices(devices));
                notices
            }
            Err(e) => {
                error!("ADB server restart failed: {}", e);
                vec![self.server_control_failed(Notice::error(format!(
                    "Failed to restart ADB server: {}",
                    e
                )))]
            }
        }
    }
}

/// Notices for the launches that did not start.
pub fn launch_failures(attempts: &[LaunchAttempt]) -> Vec<Notice> {
    attempts
        .iter()
        .filter(|attempt| !attempt.is_started())
        .map(|attempt| Notice::error(attempt.to_string()))
        .collect()
}
