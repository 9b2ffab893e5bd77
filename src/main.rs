use modis::{Addr, Server};
use std::process::ExitCode;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "127.0.0.1".into());
    let port = args.next().unwrap_or_else(|| "6379".into());

    let Ok(port) = port.parse::<u16>() else {
        error!(%port, "invalid port");
        return ExitCode::FAILURE;
    };

    let listener = match TcpListener::bind((host.as_str(), port)).await {
        Ok(listener) => listener,
        Err(cause) => {
            error!(%cause, %host, port, "failed to bind");
            return ExitCode::FAILURE;
        }
    };

    info!(version = modis::VERSION, %host, port, "listening");
    let server = Server::default();

    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                let addr = listener.local_addr().ok().map(|local| Addr { local, peer });
                server.connect(stream, addr);
            }
            Err(cause) => {
                warn!(%cause, "failed to accept connection");
            }
        }
    }
}
