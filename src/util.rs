pub mod scrcpy_utils;

/// Title shown at the top of the interactive shell.
pub const APP_TITLE: &str = "SNA Phone Mirror";
/// Display name used when neither the device setting nor the hostname
/// property yields anything usable.
pub const UNKNOWN_DEVICE_NAME: &str = "Unknown";
/// Environment variable to check, if `adb` messages should be logged.
pub const SNAMIRROR_LOG_ADB: &str = "SNAMIRROR_LOG_ADB";
/// Environment variable holding an absolute path to the `adb` executable.
pub const SNAMIRROR_ADB_PATH: &str = "SNAMIRROR_ADB_PATH";
/// Environment variable holding an absolute path to the `scrcpy` executable.
pub const SNAMIRROR_SCRCPY_PATH: &str = "SNAMIRROR_SCRCPY_PATH";

#[allow(dead_code)]
pub(crate) fn test_with_logs() {
    let debug_test = std::env::var("SNAMIRROR_DEBUG_TEST").unwrap_or_default() == "true";
    if debug_test {
        use env_logger::Builder;
        use log::LevelFilter;
        let mut builder = Builder::from_default_env();
        let _ = builder.filter(None, LevelFilter::Debug).try_init();
    }
}

/// Utils related to running `adb` and `scrcpy`.
pub mod adb_utils {

    use super::*;
    use crate::error::{MirrorError, Result};
    use lazy_static::lazy_static;
    use log::debug;
    use std::fmt::{self, Display, Formatter};
    use std::path::{Path, PathBuf};
    use std::process::{Command, Stdio};
    use std::sync::Mutex;

    /// External executables this crate drives.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum Tool {
        Adb,
        Scrcpy,
    }

    impl Tool {
        /// Executable name, as looked up on `PATH`.
        pub fn name(self) -> &'static str {
            match self {
                Tool::Adb => "adb",
                Tool::Scrcpy => "scrcpy",
            }
        }
    }

    impl Display for Tool {
        fn fmt(&self, f: &mut Formatter) -> fmt::Result {
            write!(f, "{}", self.name())
        }
    }

    /// Render a tool invocation the way a user would type it.
    pub fn command_line(tool: Tool, args: &[&str]) -> String {
        let mut line = tool.name().to_string();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }

    /// Captured result of a blocking tool invocation.
    #[derive(Debug, Clone, Default)]
    pub struct CommandOutput {
        pub stdout: Vec<u8>,
        pub stderr: String,
        /// `None` if the process was terminated by a signal.
        pub code: Option<i32>,
    }

    impl CommandOutput {
        pub fn success(&self) -> bool {
            self.code == Some(0)
        }
    }

    /// Seam between the device logic and process creation.
    ///
    /// Every external invocation made by the enumerator, the launcher and the
    /// server controls goes through this trait, so a scripted runner can stand
    /// in for `adb` and `scrcpy` in tests.
    pub trait ToolRunner {
        /// Run `tool` with `args` and block until it exits.
        fn run(&self, tool: Tool, args: &[&str]) -> Result<CommandOutput>;

        /// Start `tool` with `args`, detached from this process, and return
        /// the child's pid without waiting on it.
        fn spawn_detached(&self, tool: Tool, args: &[&str]) -> Result<u32>;
    }

    /// [`ToolRunner`] backed by real child processes.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct SystemRunner;

    impl ToolRunner for SystemRunner {
        fn run(&self, tool: Tool, args: &[&str]) -> Result<CommandOutput> {
            let path = resolve_tool(tool)?;
            debug!("Running: {}", command_line(tool, args));
            let stderr = if std::env::var(SNAMIRROR_LOG_ADB).is_ok() {
                Stdio::inherit()
            } else {
                Stdio::piped()
            };
            let output = Command::new(path)
                .args(args)
                .stdin(Stdio::null())
                .stderr(stderr)
                .output()
                .map_err(|source| MirrorError::Spawn {
                    tool: tool.name(),
                    source,
                })?;
            Ok(CommandOutput {
                stdout: output.stdout,
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                code: output.status.code(),
            })
        }

        fn spawn_detached(&self, tool: Tool, args: &[&str]) -> Result<u32> {
            let path = resolve_tool(tool)?;
            debug!("Spawning detached: {}", command_line(tool, args));
            let mut command = Command::new(path);
            command
                .args(args)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null());
            detach(&mut command);
            // The child handle is dropped here; the process keeps running.
            let child = command.spawn().map_err(|source| MirrorError::Spawn {
                tool: tool.name(),
                source,
            })?;
            Ok(child.id())
        }
    }

    #[cfg(windows)]
    fn detach(command: &mut Command) {
        use std::os::windows::process::CommandExt;
        const CREATE_NO_WINDOW: u32 = 0x0800_0000;
        command.creation_flags(CREATE_NO_WINDOW);
    }

    #[cfg(unix)]
    fn detach(command: &mut Command) {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    #[cfg(not(any(unix, windows)))]
    fn detach(_command: &mut Command) {}

    #[derive(Default)]
    pub(crate) struct ToolsPath {
        adb: Option<PathBuf>,
        scrcpy: Option<PathBuf>,
    }

    lazy_static! {
        static ref TOOLS_PATH: Mutex<ToolsPath> = Mutex::new(ToolsPath::default());
    }

    impl ToolsPath {
        fn set(tool: Tool, path: PathBuf) {
            let mut tools_path = TOOLS_PATH.lock().unwrap_or_else(|e| e.into_inner());
            match tool {
                Tool::Adb => tools_path.adb = Some(path),
                Tool::Scrcpy => tools_path.scrcpy = Some(path),
            }
        }

        fn get(tool: Tool) -> Option<PathBuf> {
            let tools_path = TOOLS_PATH.lock().unwrap_or_else(|e| e.into_inner());
            match tool {
                Tool::Adb => tools_path.adb.clone(),
                Tool::Scrcpy => tools_path.scrcpy.clone(),
            }
        }

        #[cfg(test)]
        pub(crate) fn reset() {
            let mut tools_path = TOOLS_PATH.lock().unwrap_or_else(|e| e.into_inner());
            *tools_path = ToolsPath::default();
        }
    }

    /// Pin `tool` to an explicit executable instead of searching `PATH`.
    pub fn set_tool_path(tool: Tool, path: PathBuf) -> Result<()> {
        validate_tool_path(tool, &path)?;
        ToolsPath::set(tool, path);
        Ok(())
    }

    fn validate_tool_path(tool: Tool, path: &Path) -> Result<()> {
        let reject = |reason| {
            Err(MirrorError::InvalidPath {
                path: path.display().to_string(),
                reason,
            })
        };
        if !path.exists() {
            return reject("Invalid path specified");
        }
        if path.is_dir() {
            return reject("Path is a directory");
        }
        if !path.is_absolute() {
            return reject("Path is not absolute");
        }
        if path.file_stem().unwrap_or_default() != tool.name() {
            return match tool {
                Tool::Adb => reject("Path not pointing to adb"),
                Tool::Scrcpy => reject("Path not pointing to scrcpy"),
            };
        }
        Ok(())
    }

    /// Location of `tool`: the pinned path if any, otherwise the first match
    /// on `PATH`. A `PATH` hit is cached for later calls.
    pub fn resolve_tool(tool: Tool) -> Result<PathBuf> {
        if let Some(path) = ToolsPath::get(tool) {
            return Ok(path);
        }
        let path = pathsearch::find_executable_in_path(tool.name())
            .ok_or(MirrorError::ToolNotFound { tool: tool.name() })?;
        debug!("{} path: {}", tool, path.display());
        ToolsPath::set(tool, path.clone());
        Ok(path)
    }

    /// Struct to hold adb version information.
    #[derive(Debug, Default, Clone, PartialEq, Eq)]
    pub struct AdbVersionInfo {
        /// The version of adb, e.g. `1.0.41`.
        pub version: String,
        /// The platform-tools revision.
        pub revision: String,
        /// Path to the adb executable.
        pub path: String,
    }

    impl Display for AdbVersionInfo {
        fn fmt(&self, f: &mut Formatter) -> fmt::Result {
            writeln!(
                f,
                "ADB Version: {}\tRevision: {}\nPath: {}",
                self.version, self.revision, self.path
            )
        }
    }

    /// Struct to hold scrcpy version information.
    #[derive(Debug, Default, Clone, PartialEq, Eq)]
    pub struct ScrcpyVersionInfo {
        pub version: String,
        /// Path to the scrcpy executable.
        pub path: String,
    }

    impl Display for ScrcpyVersionInfo {
        fn fmt(&self, f: &mut Formatter) -> fmt::Result {
            writeln!(f, "Scrcpy Version: {}\nPath: {}", self.version, self.path)
        }
    }

    // Version info is of the form:
    // Android Debug Bridge version <version>
    // Version <rev>
    // Installed as <path>
    // Newer releases append lines such as `Running on ...`; those are ignored.
    pub(crate) fn parse_adb_version(output: &str) -> AdbVersionInfo {
        let mut info = AdbVersionInfo::default();
        for line in output.lines().map(str::trim) {
            if let Some(version) = line.strip_prefix("Android Debug Bridge version ") {
                info.version = version.trim().to_string();
            } else if let Some(revision) = line.strip_prefix("Version ") {
                info.revision = revision.trim().to_string();
            } else if let Some(path) = line.strip_prefix("Installed as ") {
                info.path = path.trim().to_string();
            }
        }
        info
    }

    // Version info is of the form:
    // scrcpy 2.4 <https://github.com/Genymobile/scrcpy>
    pub(crate) fn parse_scrcpy_version(output: &str) -> String {
        output
            .lines()
            .next()
            .and_then(|line| line.split_whitespace().nth(1))
            .unwrap_or_default()
            .to_string()
    }

    fn version_output(runner: &dyn ToolRunner, tool: Tool, args: &[&str]) -> Result<String> {
        let output = runner.run(tool, args)?;
        if !output.success() {
            return Err(MirrorError::CommandFailed {
                command: command_line(tool, args),
                code: output.code,
                stderr: output.stderr,
            });
        }
        String::from_utf8(output.stdout).map_err(|_| MirrorError::Decode {
            command: command_line(tool, args),
        })
    }

    /// Get the adb version info.
    pub fn get_adb_version(runner: &dyn ToolRunner) -> Result<AdbVersionInfo> {
        let output = version_output(runner, Tool::Adb, &["version"])?;
        Ok(parse_adb_version(&output))
    }

    /// Get the scrcpy version info.
    pub fn get_scrcpy_version(runner: &dyn ToolRunner) -> Result<ScrcpyVersionInfo> {
        let output = version_output(runner, Tool::Scrcpy, &["--version"])?;
        Ok(ScrcpyVersionInfo {
            version: parse_scrcpy_version(&output),
            path: resolve_tool(Tool::Scrcpy)
                .map(|path| path.display().to_string())
                .unwrap_or_default(),
        })
    }

}
