//! This module contains utility functions for scrcpy.
//! It holds the fixed set of mirror sizes and the detached, fire-and-forget
//! launcher used by both the interactive shell and the `connect` subcommand.

use super::adb_utils::{Tool, ToolRunner};
use crate::error::MirrorError;
use clap::ValueEnum;
use log::{debug, info, warn};
use std::fmt::{self, Display, Formatter};

/// Longest edge, in pixels, of the mirrored video.
/// Corresponds to the `--max-size` argument of `scrcpy`.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaxSize {
    /// 600 pixels.
    #[value(name = "s", alias = "small", alias = "600")]
    Small,
    /// 800 pixels.
    #[default]
    #[value(name = "m", alias = "medium", alias = "800")]
    Medium,
    /// 1080 pixels.
    #[value(name = "l", alias = "large", alias = "1080")]
    Large,
}

impl MaxSize {
    /// Value passed after `--max-size`.
    pub fn as_arg(self) -> &'static str {
        match self {
            MaxSize::Small => "600",
            MaxSize::Medium => "800",
            MaxSize::Large => "1080",
        }
    }

    /// Button label in the shell.
    pub fn label(self) -> &'static str {
        match self {
            MaxSize::Small => "S",
            MaxSize::Medium => "M",
            MaxSize::Large => "L",
        }
    }
}

impl Display for MaxSize {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.as_arg())
    }
}

pub fn build_scrcpy_args(device_id: &str, size: MaxSize) -> Vec<&str> {
    vec!["-s", device_id, "--max-size", size.as_arg()]
}

/// Record of one launch. The mirror process itself is never tracked; `outcome`
/// only says whether process creation succeeded.
#[derive(Debug)]
pub struct LaunchAttempt {
    pub device_id: String,
    pub size: MaxSize,
    /// Pid of the detached `scrcpy` process.
    pub outcome: Result<u32, MirrorError>,
}

impl LaunchAttempt {
    pub fn is_started(&self) -> bool {
        self.outcome.is_ok()
    }
}

impl Display for LaunchAttempt {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match &self.outcome {
            Ok(pid) => write!(
                f,
                "Started scrcpy for {} at {}px (pid {})",
                self.device_id, self.size, pid
            ),
            Err(e) => write!(f, "Failed to start scrcpy for {}: {}", self.device_id, e),
        }
    }
}

/// Start a detached `scrcpy` mirroring `device_id` at `size`.
pub fn launch(runner: &dyn ToolRunner, device_id: &str, size: MaxSize) -> LaunchAttempt {
    let args = build_scrcpy_args(device_id, size);
    let outcome = runner.spawn_detached(Tool::Scrcpy, &args);
    match &outcome {
        Ok(pid) => info!("scrcpy started for {} (pid {})", device_id, pid),
        Err(e) => warn!("scrcpy launch failed for {}: {}", device_id, e),
    }
    LaunchAttempt {
        device_id: device_id.to_string(),
        size,
        outcome,
    }
}

/// One independent launch per device, in the given order.
pub fn launch_all<'a, I>(
    runner: &dyn ToolRunner,
    device_ids: I,
    size: MaxSize,
) -> Vec<LaunchAttempt>
where
    I: IntoIterator<Item = &'a str>,
{
    let attempts: Vec<LaunchAttempt> = device_ids
        .into_iter()
        .map(|device_id| launch(runner, device_id, size))
        .collect();
    debug!(
        "Launched {} of {} scrcpy sessions",
        attempts.iter().filter(|a| a.is_started()).count(),
        attempts.len()
    );
    attempts
}
