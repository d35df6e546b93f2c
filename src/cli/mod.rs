//! Command-line interface.

pub mod commands;
pub mod output;
pub mod types;

pub use types::{Cli, Commands};

/// Print a command failure and exit with status 1.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    let code = err
        .downcast_ref::<crate::domain::DomainError>()
        .map_or("ERROR", crate::domain::DomainError::code);

    if json_mode {
        let body = serde_json::json!({ "error": format!("{err:#}"), "code": code });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1);
}
