use clap::Parser;
use env_logger::{Builder, Env};
use snamirror::cli::Cli;
use std::io::Write;
use std::process::ExitCode;

const FILTER_ENV: &str = "SNAMIRROR_LOG_LEVEL";
const STYLE_ENV: &str = "SNAMIRROR_LOG_STYLE";

fn main() -> ExitCode {
    // Initialize the logger.
    let env = Env::default()
        .filter_or(FILTER_ENV, "info")
        .write_style_or(STYLE_ENV, "auto");

    Builder::from_env(env)
        .format(|buf, record| {
            let ts = buf.timestamp();
            writeln!(
                buf,
                "[{} {} {}::{}] {}",
                ts,
                record.level(),
                record.module_path().unwrap_or_default(),
                record.line().unwrap_or_default(),
                record.args()
            )
        })
        .init();

    let cli = Cli::parse();
    cli.process()
}
