use lifelink_api::run;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("lifelink-api error: {err}");
        std::process::exit(1);
    }
}
