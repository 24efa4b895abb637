#[tokio::main]
async fn main() {
    penaltybox::start_server().await;
}
