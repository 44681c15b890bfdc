#[tokio::main]
async fn main() {
    let exit_code = envbackup_cli::run().await;
    std::process::exit(exit_code);
}
