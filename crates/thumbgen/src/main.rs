use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    thumbgen::run::initialise_tracing();
    let cli = thumbgen::cli::parse();
    match thumbgen::run::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:?}");
            ExitCode::FAILURE
        }
    }
}
