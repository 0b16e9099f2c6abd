use std::env;
use std::path::Path;

use log::{info, warn};

use meet_relay::http;
use meet_relay::server::Server;

const CERT_PATH: &str = "ssl/certificate.pem";
const KEY_PATH: &str = "ssl/private.key";

#[tokio::main]
async fn main() {
    env_logger::init();

    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(5001);

    let server = Server::new();
    let routes = http::routes(server);

    if Path::new(CERT_PATH).exists() && Path::new(KEY_PATH).exists() {
        info!("Signaling server listening on port {port} (HTTPS/WSS)");
        warp::serve(routes)
            .tls()
            .cert_path(CERT_PATH)
            .key_path(KEY_PATH)
            .run(([0, 0, 0, 0], port))
            .await;
    } else {
        warn!("No TLS material under ssl/, serving plain HTTP/WS on port {port}");
        warp::serve(routes).run(([0, 0, 0, 0], port)).await;
    }
}
