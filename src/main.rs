#[tokio::main]
async fn main() -> anyhow::Result<()> {
    connwatch_lib::run().await
}
