#[tokio::main]
async fn main() {
    community_calendar::run().await;
}
