#![forbid(unsafe_code)]

mod entry;
mod handlers;
mod nl;
mod session;
mod support;

#[cfg(test)]
mod tests;

use nl::NlConfig;
use session::{DEFAULT_AUTOSAVE_DEPTH, Session, SessionConfig};
use std::path::PathBuf;

fn config_from_env_and_args() -> Result<SessionConfig, String> {
    let mut data_dir = std::env::var("CSVQL_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("csvql_data"));
    let mut autosave_depth = match std::env::var("CSVQL_AUTOSAVE_DEPTH") {
        Ok(raw) => raw
            .parse::<usize>()
            .map_err(|_| format!("CSVQL_AUTOSAVE_DEPTH is not a number: {raw}"))?,
        Err(_) => DEFAULT_AUTOSAVE_DEPTH,
    };

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--data-dir" => {
                let value = args.next().ok_or("--data-dir needs a value")?;
                data_dir = PathBuf::from(value);
            }
            "--autosave-depth" => {
                let value = args.next().ok_or("--autosave-depth needs a value")?;
                autosave_depth = value
                    .parse::<usize>()
                    .map_err(|_| format!("--autosave-depth is not a number: {value}"))?;
            }
            other => return Err(format!("unknown argument: {other}")),
        }
    }

    // The bridge is wired up only when credentials are actually present;
    // otherwise nl.draft reports NL_UNCONFIGURED instead of failing mid-call.
    let mut nl_config = NlConfig::default();
    if let Ok(endpoint) = std::env::var("CSVQL_NL_ENDPOINT") {
        nl_config.endpoint = endpoint;
    }
    if let Ok(model) = std::env::var("CSVQL_NL_MODEL") {
        nl_config.model = model;
    }
    if let Ok(var) = std::env::var("CSVQL_NL_API_KEY_ENV") {
        nl_config.api_key_env = var;
    }
    let nl = if std::env::var(&nl_config.api_key_env).is_ok() {
        Some(nl_config)
    } else {
        None
    };

    Ok(SessionConfig {
        data_dir,
        autosave_depth,
        nl,
    })
}

fn main() {
    let config = match config_from_env_and_args() {
        Ok(config) => config,
        Err(message) => {
            eprintln!("csvql: {message}");
            std::process::exit(2);
        }
    };

    let (mut session, open_warnings) = match Session::new(config) {
        Ok(opened) => opened,
        Err(err) => {
            eprintln!("csvql: could not open data dir: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = entry::run_stdio(&mut session, open_warnings) {
        eprintln!("csvql: transport error: {err}");
        std::process::exit(1);
    }
}
