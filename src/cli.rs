use crate::devices::get_connected_devices;
use crate::server;
use crate::session::{launch_failures, Session};
use crate::shell::Shell;
use crate::util::adb_utils::{self, set_tool_path, SystemRunner, Tool};
use crate::util::scrcpy_utils::{self, MaxSize};
use crate::util::{SNAMIRROR_ADB_PATH, SNAMIRROR_SCRCPY_PATH};
use clap::{Parser, Subcommand};

use log::error;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[clap(name = "snamirror", author, version, about, long_about = None)]
pub struct Cli {
    /// Absolute path to the `adb` executable, if not in PATH.
    /// For example: `C:\Users\user\Downloads\platform-tools\adb.exe`
    #[clap(long, value_parser, env = SNAMIRROR_ADB_PATH, global = true)]
    pub adb_path: Option<PathBuf>,
    /// Absolute path to the `scrcpy` executable, if not in PATH.
    /// For example: `C:\Users\user\Downloads\scrcpy-win64-v2.4\scrcpy.exe`
    #[clap(long, value_parser, env = SNAMIRROR_SCRCPY_PATH, global = true)]
    pub scrcpy_path: Option<PathBuf>,
    /// Defaults to `ui` when omitted.
    #[clap(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Open the interactive device list. This is the default.
    Ui {
        /// Initial mirror size: s (600), m (800) or l (1080).
        #[clap(short, long, value_enum, default_value_t = MaxSize::Medium)]
        size: MaxSize,
    },
    /// List the devices `adb` reports as ready, with their display names.
    List {
        /// Print the list as JSON.
        #[clap(long, action)]
        json: bool,
    },
    /// Start a detached `scrcpy` window for each device.
    /// If no devices are specified, every ready device is mirrored.
    Connect {
        /// Serials of the devices to mirror, as shown by `snamirror list`.
        #[clap(value_parser)]
        devices: Vec<String>,
        /// Mirror size: s (600), m (800) or l (1080).
        #[clap(short, long, value_enum, default_value_t = MaxSize::Medium)]
        size: MaxSize,
    },
    /// Kill the adb background server.
    KillServer,
    /// Kill and start the adb background server, then list devices.
    RestartServer,
    /// Check that `adb` and `scrcpy` can be found and report their versions.
    Check,
    #[cfg(feature = "mangen")]
    /// Generate manual page for `snamirror`.
    Mangen {
        /// Optional path to place generated man page in.
        /// Path must be an existing directory. Man page will be placed
        /// in that directory with the name `snamirror.man`.
        /// If path is not specified, man page will be placed
        /// in the current executable's directory.
        #[clap(short, long, value_parser)]
        path: Option<PathBuf>,
    },
}

#[cfg(feature = "mangen")]
fn mangen(path: &Option<PathBuf>) -> io::Result<PathBuf> {
    use clap::CommandFactory;
    use clap_mangen::Man;
    use std::env;
    use std::fs::File;

    let dir = match path {
        Some(dir) if dir.is_dir() => dir.clone(),
        Some(dir) => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Invalid path specified: {}", dir.display()),
            ))
        }
        None => env::current_exe()?
            .parent()
            .map(|p| p.to_path_buf())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "No executable directory"))?,
    };
    let out_path = dir.join("snamirror.man");
    let mut out_file = File::create(&out_path)?;
    Man::new(Cli::command()).render(&mut out_file)?;
    Ok(out_path)
}

fn print_devices(json: bool) -> ExitCode {
    match get_connected_devices(&SystemRunner) {
        Ok(devices) if json => match serde_json::to_string_pretty(&devices) {
            Ok(out) => {
                println!("{}", out);
                ExitCode::SUCCESS
            }
            Err(e) => {
                println!("Failed to serialize device list: {}", e);
                ExitCode::FAILURE
            }
        },
        Ok(devices) if devices.is_empty() => {
            println!("No devices found!");
            ExitCode::SUCCESS
        }
        Ok(devices) => {
            for device in devices {
                println!("{}", device);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Device enumeration failed: {}", e);
            println!("Failed to list devices: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn connect(devices: &[String], size: MaxSize) -> ExitCode {
    let ids: Vec<String> = if devices.is_empty() {
        match get_connected_devices(&SystemRunner) {
            Ok(found) if found.is_empty() => {
                println!("No devices found!");
                return ExitCode::SUCCESS;
            }
            Ok(found) => found.into_iter().map(|d| d.id).collect(),
            Err(e) => {
                println!("Failed to list devices: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        devices.to_vec()
    };

    let attempts = scrcpy_utils::launch_all(&SystemRunner, ids.iter().map(String::as_str), size);
    for attempt in attempts.iter() {
        println!("{}", attempt);
    }
    if launch_failures(&attempts).is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn check() -> ExitCode {
    let mut ok = true;
    match adb_utils::get_adb_version(&SystemRunner) {
        Ok(info) => print!("{}", info),
        Err(e) => {
            ok = false;
            println!("adb: {}", e);
        }
    }
    match adb_utils::get_scrcpy_version(&SystemRunner) {
        Ok(info) => print!("{}", info),
        Err(e) => {
            ok = false;
            println!("scrcpy: {}", e);
        }
    }
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn run_ui(size: MaxSize) -> ExitCode {
    let session = Session::new(SystemRunner, size);
    let stdin = io::stdin();
    let mut shell = Shell::new(session, stdin.lock(), io::stdout());
    match shell.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Console I/O failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

impl Cli {
    fn apply_tool_paths(&self) -> Result<(), String> {
        if let Some(path) = &self.adb_path {
            set_tool_path(Tool::Adb, path.clone()).map_err(|e| e.to_string())?;
        }
        if let Some(path) = &self.scrcpy_path {
            set_tool_path(Tool::Scrcpy, path.clone()).map_err(|e| e.to_string())?;
        }
        Ok(())
    }

    pub fn process(&self) -> ExitCode {
        #[cfg(feature = "mangen")]
        {
            // Process 'mangen' command separately.
            if let Some(Commands::Mangen { path }) = &self.command {
                return match mangen(path) {
                    Ok(out_path) => {
                        println!("Wrote man page to {}", out_path.display());
                        ExitCode::SUCCESS
                    }
                    Err(e) => {
                        println!("Error generating man page: {}", e);
                        ExitCode::FAILURE
                    }
                };
            }
        }

        if let Err(e) = self.apply_tool_paths() {
            println!("{}", e);
            return ExitCode::from(2);
        }

        match &self.command {
            None => run_ui(MaxSize::default()),
            Some(Commands::Ui { size }) => run_ui(*size),
            Some(Commands::List { json }) => print_devices(*json),
            Some(Commands::Connect { devices, size }) => connect(devices, *size),
            Some(Commands::KillServer) => match server::kill_server(&SystemRunner) {
                Ok(()) => {
                    println!("ADB server killed.");
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    println!("Failed to kill ADB server: {}", e);
                    ExitCode::FAILURE
                }
            },
            Some(Commands::RestartServer) => match server::restart_server(&SystemRunner) {
                Ok(devices) => {
                    println!("ADB server restarted.");
                    if devices.is_empty() {
                        println!("No devices found!");
                    }
                    for device in devices {
                        println!("{}", device);
                    }
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    println!("Failed to restart ADB server: {}", e);
                    ExitCode::FAILURE
                }
            },
            Some(Commands::Check) => check(),
            #[cfg(feature = "mangen")]
            Some(Commands::Mangen { .. }) => ExitCode::SUCCESS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_means_ui() {
        let cli = Cli::try_parse_from(["snamirror"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn connect_takes_serials_and_size() {
        let cli = Cli::try_parse_from(["snamirror", "connect", "A1", "B2", "--size", "l"]).unwrap();
        match cli.command {
            Some(Commands::Connect { devices, size }) => {
                assert_eq!(devices, vec!["A1", "B2"]);
                assert_eq!(size, MaxSize::Large);
            }
            _ => panic!("Unexpected command"),
        }
    }

    #[test]
    fn ui_size_defaults_to_medium_and_accepts_pixels() {
        let cli = Cli::try_parse_from(["snamirror", "ui"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Ui { size: MaxSize::Medium })));

        let cli = Cli::try_parse_from(["snamirror", "ui", "-s", "600"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Ui { size: MaxSize::Small })));

        assert!(Cli::try_parse_from(["snamirror", "ui", "-s", "720"]).is_err());
    }
}
