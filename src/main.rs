#[tokio::main]
async fn main() {
    if let Err(e) = palaver::cli::run().await {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
