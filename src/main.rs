use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    pocket_archive::cli::main().await
}
