use std::process::ExitCode;

use tank_arena::frameworks::server;

#[tokio::main]
async fn main() -> ExitCode {
    let mut args = std::env::args();
    let program = args.next().unwrap_or_else(|| "tank_arena".to_string());

    let result = match args.next().as_deref() {
        Some("host") => server::run_host_with_config().await,
        Some("join") => server::run_client_with_config().await,
        _ => {
            eprintln!("usage: {program} <host|join>");
            return ExitCode::FAILURE;
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{program}: {e}");
            ExitCode::FAILURE
        }
    }
}
