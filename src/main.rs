//! Plugin Bridge - plugin side of an editor host sync protocol

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = plugin_bridge::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
