use std::net::{IpAddr, SocketAddr};

use axum::Router;
use if_addrs::get_if_addrs;
use tokio::net::{TcpListener, ToSocketAddrs};

/// Bind and serve until Ctrl+C or SIGTERM. Connections carry their peer
/// address for the rate limiter.
pub async fn serve<S: ToSocketAddrs>(addr: S, router: Router) -> std::io::Result<()> {
    let tcp_listener = TcpListener::bind(addr).await?;
    log_listener_urls(&tcp_listener);

    axum::serve(
        tcp_listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
}

fn log_listener_urls(listener: &TcpListener) {
    let addr = match listener.local_addr() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::warn!(error = %e, "could not determine the listening address");
            return;
        }
    };

    let urls: Vec<String> = reachable_ips(addr.ip())
        .into_iter()
        .map(|ip| listener_url(ip, addr.port()))
        .collect();
    tracing::info!(port = addr.port(), urls = %urls.join(" "), "Server running");
}

/// The addresses a wildcard bind answers on, or the bound address itself.
fn reachable_ips(bound: IpAddr) -> Vec<IpAddr> {
    if !bound.is_unspecified() {
        return vec![bound];
    }
    match get_if_addrs() {
        Ok(interfaces) => interfaces
            .iter()
            .map(|interface| interface.ip())
            .filter(|ip| ip.is_ipv6() == bound.is_ipv6())
            .collect(),
        Err(_) => vec![bound],
    }
}

fn listener_url(ip: IpAddr, port: u16) -> String {
    match ip {
        _ if ip.is_loopback() => format!("http://localhost:{port}"),
        IpAddr::V4(v4) => format!("http://{v4}:{port}"),
        IpAddr::V6(v6) => format!("http://[{v6}]:{port}"),
    }
}

pub async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
