mod cli;
mod commands;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    portunix_core::logging::init();

    let code = cli::run().await?;
    std::process::exit(code);
}
