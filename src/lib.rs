//! This crate lists the Android devices visible to `adb` and mirrors
//! them with `scrcpy`. It is a thin layer over the two tools: nothing is
//! persisted and launched `scrcpy` processes are never tracked. If you just
//! want to use the tool, use the `snamirror` binary instead.
//!
//! ## Terminology Used
//!
//! - `device`: an entry of `adb devices` in the `device` (ready) state,
//! identified by its serial. Its display name comes from the
//! `device_name` global setting, then the `net.hostname` property,
//! then falls back to `Unknown`.
//!
//! - `session`: the state behind the interactive shell. It owns the
//! device list, the selected rows and the mirror size.
//!
//! - `size`: the `--max-size` passed to `scrcpy`, one of 600, 800 or 1080.
//!
//! ## Example
//!
//! The following example lists devices and mirrors the first one at the
//! largest size.
//!
//! ```rust no_run
//! use snamirror::{
//!     devices::get_connected_devices,
//!     util::adb_utils::SystemRunner,
//!     util::scrcpy_utils::{launch, MaxSize},
//! };
//!
//! let devices = get_connected_devices(&SystemRunner).unwrap();
//! if let Some(device) = devices.first() {
//!     let attempt = launch(&SystemRunner, &device.id, MaxSize::Large);
//!     println!("{}", attempt);
//! }
//! ```
//!

pub mod cli;

pub mod devices;

pub mod error;

pub mod server;

pub mod session;

pub mod shell;

pub mod util;
