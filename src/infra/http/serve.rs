use std::{pin::pin, time::Duration};

use axum::Router;
use tokio::{net::TcpListener, sync::oneshot};
use tracing::info;

use crate::infra::error::InfraError;

const TARGET: &str = "drawio_renderer::serve";

/// Serve `router` until `shutdown` resolves, then give in-flight requests
/// `grace` to finish. Requests still running after that are dropped, which
/// removes their job directories and kills their renderers, and the call
/// fails.
pub async fn serve_with_grace(
    listener: TcpListener,
    router: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
    grace: Duration,
) -> Result<(), InfraError> {
    let (draining_tx, draining_rx) = oneshot::channel();
    let signal = async move {
        shutdown.await;
        let _ = draining_tx.send(());
    };
    let mut server = pin!(
        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(signal)
            .into_future()
    );

    let served = tokio::select! {
        served = &mut server => served,
        Ok(()) = draining_rx => {
            info!(
                target = TARGET,
                grace_ms = grace.as_millis() as u64,
                "Shutdown requested, draining in-flight requests"
            );
            tokio::time::timeout(grace, &mut server).await.map_err(|_| {
                InfraError::server(format!("in-flight requests still running after {grace:?}"))
            })?
        }
    };
    served.map_err(|err| InfraError::server(err.to_string()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{http::StatusCode, routing::get};
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpStream,
        sync::Notify,
    };

    use super::*;

    struct Fixture {
        addr: std::net::SocketAddr,
        stop: oneshot::Sender<()>,
        server: tokio::task::JoinHandle<Result<(), InfraError>>,
        entered: Arc<Notify>,
    }

    /// `/slow` sleeps for `handler_time` before answering.
    async fn start(handler_time: Duration, grace: Duration) -> Fixture {
        let entered = Arc::new(Notify::new());
        let notify = entered.clone();
        let router = Router::new().route(
            "/slow",
            get(move || {
                let notify = notify.clone();
                async move {
                    notify.notify_one();
                    tokio::time::sleep(handler_time).await;
                    StatusCode::NO_CONTENT
                }
            }),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let (stop, stopped) = oneshot::channel::<()>();
        let shutdown = async move {
            let _ = stopped.await;
        };
        let server = tokio::spawn(serve_with_grace(listener, router, shutdown, grace));
        Fixture {
            addr,
            stop,
            server,
            entered,
        }
    }

    async fn request_slow(addr: std::net::SocketAddr) -> String {
        let mut stream = TcpStream::connect(addr).await.expect("connect");
        stream
            .write_all(b"GET /slow HTTP/1.1\r\nhost: localhost\r\nconnection: close\r\n\r\n")
            .await
            .expect("write request");
        let mut response = String::new();
        let _ = stream.read_to_string(&mut response).await;
        response
    }

    #[tokio::test]
    async fn requests_finishing_within_grace_drain_cleanly() {
        let fixture = start(Duration::from_millis(100), Duration::from_secs(5)).await;
        let client = tokio::spawn(request_slow(fixture.addr));
        fixture.entered.notified().await;

        fixture.stop.send(()).expect("server listening for shutdown");

        let response = client.await.expect("client task");
        assert!(response.starts_with("HTTP/1.1 204"), "{response}");
        fixture
            .server
            .await
            .expect("server task")
            .expect("drained within grace");
    }

    #[tokio::test]
    async fn requests_outliving_grace_fail_the_server() {
        let fixture = start(Duration::from_secs(30), Duration::from_millis(100)).await;
        let _client = tokio::spawn(request_slow(fixture.addr));
        fixture.entered.notified().await;

        fixture.stop.send(()).expect("server listening for shutdown");

        let err = tokio::time::timeout(Duration::from_secs(5), fixture.server)
            .await
            .expect("grace period enforced")
            .expect("server task")
            .expect_err("in-flight request outlived grace");
        assert_eq!(
            err.to_string(),
            "server error: in-flight requests still running after 100ms"
        );
    }
}
