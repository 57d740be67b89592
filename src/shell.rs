//! Interactive console front-end.
//!
//! The shell plays the role of the mirror window: it shows the device list
//! and the S/M/L size buttons, and maps typed commands onto [`Session`]
//! actions. Every adb call blocks the loop until it returns.

use crate::session::{launch_failures, Notice, Session};
use crate::util::adb_utils::ToolRunner;
use crate::util::scrcpy_utils::MaxSize;
use crate::util::APP_TITLE;
use clap::ValueEnum;
use log::debug;
use std::io::{self, BufRead, Write};

const HELP: &str = r"Commands:
    list, ls            Show the device list
    refresh, r          Re-scan devices
    s | m | l           Pick mirror size (600 / 800 / 1080)
    size <s|m|l>        Same as above
    select <n>...       Select rows (e.g. `select 1 3`), or `select all`
    connect, c [n]...   Mirror the selected rows, or the given rows
    open <n>            Mirror a single row
    kill                Kill the ADB server
    restart             Restart the ADB server and re-scan
    help, ?             Show this help
    quit, exit, ^w      Close";

/// A parsed line of user input.
#[derive(Debug, PartialEq, Eq)]
enum Action {
    List,
    Refresh,
    Size(MaxSize),
    Select(Vec<usize>),
    SelectAll,
    Connect(Vec<usize>),
    Open(usize),
    Kill,
    Restart,
    Help,
    Quit,
    Nothing,
}

// Rows are shown 1-based.
fn parse_rows(args: &[&str]) -> Result<Vec<usize>, String> {
    args.iter()
        .map(|arg| match arg.parse::<usize>() {
            Ok(row) if row > 0 => Ok(row - 1),
            _ => Err(format!("Not a row number: {}", arg)),
        })
        .collect()
}

fn parse_size(arg: &str) -> Result<MaxSize, String> {
    MaxSize::from_str(arg, true).map_err(|_| format!("Unknown size: {} (use s, m or l)", arg))
}

fn parse_action(line: &str) -> Result<Action, String> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((command, args)) = words.split_first() else {
        return Ok(Action::Nothing);
    };
    let action = match command.to_lowercase().as_str() {
        "list" | "ls" => Action::List,
        "refresh" | "r" => Action::Refresh,
        "s" | "m" | "l" => Action::Size(parse_size(command)?),
        "size" => match args {
            [size] => Action::Size(parse_size(size)?),
            _ => return Err("Usage: size <s|m|l>".to_string()),
        },
        "select" | "sel" => match args {
            ["all"] => Action::SelectAll,
            _ => Action::Select(parse_rows(args)?),
        },
        "connect" | "c" => Action::Connect(parse_rows(args)?),
        "open" | "o" => match parse_rows(args)?.as_slice() {
            [row] => Action::Open(*row),
            _ => return Err("Usage: open <n>".to_string()),
        },
        "kill" => Action::Kill,
        "restart" => Action::Restart,
        "help" | "?" => Action::Help,
        "quit" | "exit" | "q" | "^w" => Action::Quit,
        other => return Err(format!("Unknown command: {}. Type `help` for a list.", other)),
    };
    Ok(action)
}

pub struct Shell<R: ToolRunner, I: BufRead, O: Write> {
    session: Session<R>,
    input: I,
    output: O,
}

impl<R: ToolRunner, I: BufRead, O: Write> Shell<R, I, O> {
    pub fn new(session: Session<R>, input: I, output: O) -> Self {
        Shell {
            session,
            input,
            output,
        }
    }

    pub fn session(&self) -> &Session<R> {
        &self.session
    }

    fn notify(&mut self, notice: &Notice) -> io::Result<()> {
        writeln!(self.output, "{}", notice)
    }

    fn render(&mut self) -> io::Result<()> {
        writeln!(self.output)?;
        if self.session.devices().is_empty() {
            writeln!(self.output, "  (no devices)")?;
        }
        for (row, device) in self.session.devices().iter().enumerate() {
            let mark = if self.session.is_selected(row) { '*' } else { ' ' };
            writeln!(self.output, "{} {:>2}. {}", mark, row + 1, device)?;
        }
        let buttons: Vec<String> = [MaxSize::Small, MaxSize::Medium, MaxSize::Large]
            .iter()
            .map(|&size| {
                if size == self.session.size() {
                    format!("[{}]", size.label())
                } else {
                    format!(" {} ", size.label())
                }
            })
            .collect();
        writeln!(self.output, "  size: {}", buttons.join(""))?;
        Ok(())
    }

    fn refresh(&mut self) -> io::Result<()> {
        if let Some(notice) = self.session.refresh() {
            self.notify(&notice)?;
        }
        self.render()
    }

    fn report_launches(&mut self, failures: Vec<Notice>) -> io::Result<()> {
        for notice in failures {
            self.notify(&notice)?;
        }
        Ok(())
    }

    /// Run one action. Returns `false` when the shell should close.
    fn dispatch(&mut self, action: Action) -> io::Result<bool> {
        match action {
            Action::Nothing => {}
            Action::List => self.render()?,
            Action::Refresh => self.refresh()?,
            Action::Size(size) => {
                self.session.set_size(size);
                self.render()?;
            }
            Action::Select(rows) => {
                if let Some(notice) = self.session.select(&rows) {
                    self.notify(&notice)?;
                }
                self.render()?;
            }
            Action::SelectAll => {
                self.session.select_all();
                self.render()?;
            }
            Action::Connect(rows) => {
                if !rows.is_empty() {
                    if let Some(notice) = self.session.select(&rows) {
                        self.notify(&notice)?;
                        return Ok(true);
                    }
                }
                match self.session.connect_selected() {
                    Ok(attempts) => self.report_launches(launch_failures(&attempts))?,
                    Err(notice) => self.notify(&notice)?,
                }
            }
            Action::Open(row) => match self.session.open(row) {
                Ok(attempt) => self.report_launches(launch_failures(&[attempt]))?,
                Err(notice) => self.notify(&notice)?,
            },
            Action::Kill => {
                writeln!(self.output, "Killing ADB server...")?;
                self.output.flush()?;
                let notice = self.session.kill_server();
                self.notify(&notice)?;
            }
            Action::Restart => {
                writeln!(self.output, "Restarting ADB server...")?;
                self.output.flush()?;
                for notice in self.session.restart_server() {
                    self.notify(&notice)?;
                }
                self.render()?;
            }
            Action::Help => writeln!(self.output, "{}", HELP)?,
            Action::Quit => return Ok(false),
        }
        Ok(true)
    }

    /// Scan once, then serve commands until `quit` or end of input.
    pub fn run(&mut self) -> io::Result<()> {
        writeln!(self.output, "{}", APP_TITLE)?;
        writeln!(self.output, "Type `help` for commands.")?;
        self.refresh()?;

        let mut line = String::new();
        loop {
            write!(self.output, "> ")?;
            self.output.flush()?;
            line.clear();
            if self.input.read_line(&mut line)? == 0 {
                writeln!(self.output)?;
                break;
            }
            let action = match parse_action(&line) {
                Ok(action) => action,
                Err(message) => {
                    writeln!(self.output, "{}", message)?;
                    continue;
                }
            };
            debug!("Shell action: {:?}", action);
            if !self.dispatch(action)? {
                break;
            }
        }
        Ok(())
    }
}
