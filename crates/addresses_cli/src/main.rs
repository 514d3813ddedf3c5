//! Address store install and inspection tool.
//!
//! # Commands
//! - `install <db-path>`: create or migrate an address database.
//! - `schema`: print every migration script.
//! - `config [path]`: print the effective configuration as JSON.
//! - `version`: print the core crate version.
//!
//! Set `ADDRESSES_LOG_DIR` to an absolute directory to enable file logging.

use addresses_core::db::migrations::{current_user_version, migration_scripts};
use addresses_core::db::open_db;
use addresses_core::{core_version, default_log_level, init_logging, AddressConfig};
use log::info;
use std::process::ExitCode;

const USAGE: &str = "usage: addresses_cli <install <db-path> | schema | config [path] | version>";
const LOG_DIR_ENV: &str = "ADDRESSES_LOG_DIR";

fn main() -> ExitCode {
    if let Ok(log_dir) = std::env::var(LOG_DIR_ENV) {
        if let Err(err) = init_logging(default_log_level(), &log_dir) {
            eprintln!("warning: {err}");
        }
    }

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let args = args.iter().map(String::as_str).collect::<Vec<_>>();
    match run(&args) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[&str]) -> Result<String, String> {
    match args {
        ["install", db_path] => install(db_path),
        ["schema"] => Ok(schema()),
        ["config"] => render_config(&AddressConfig::default()),
        ["config", path] => {
            let config = AddressConfig::from_json_file(path).map_err(|err| err.to_string())?;
            render_config(&config)
        }
        ["version"] => Ok(format!("addresses_core version={}", core_version())),
        _ => Err(USAGE.to_string()),
    }
}

fn install(db_path: &str) -> Result<String, String> {
    let conn = open_db(db_path).map_err(|err| format!("install failed: {err}"))?;
    let version = current_user_version(&conn).map_err(|err| format!("install failed: {err}"))?;
    info!("event=install module=cli status=ok schema_version={version}");
    Ok(format!("installed {db_path} schema_version={version}"))
}

fn schema() -> String {
    migration_scripts()
        .map(|(version, name, sql)| format!("-- {version:04}_{name}\n{}", sql.trim_end()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn render_config(config: &AddressConfig) -> Result<String, String> {
    serde_json::to_string_pretty(config).map_err(|err| err.to_string())
}
