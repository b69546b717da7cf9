//! SwiftSwap API server binary

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    swiftswap_lib::run().await
}
