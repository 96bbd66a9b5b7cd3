#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = exambank::run().await {
        eprintln!("exambank fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
