use std::process::ExitCode;
use testr::cli;

#[tokio::main]
async fn main() -> ExitCode {
    match cli::run().await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
