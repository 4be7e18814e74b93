use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = herald::cli::Cli::parse();
    if let Err(e) = herald::cmd::dispatch(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
