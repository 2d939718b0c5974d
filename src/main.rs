#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = quiz_engine::run().await {
        eprintln!("quiz-engine fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
