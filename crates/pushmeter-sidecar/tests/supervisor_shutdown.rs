#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod support;

use std::io;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

use pushmeter_core::{LifecycleState, PushmeterError};
use pushmeter_sidecar::supervisor::{bind, Supervisor};

use support::{fast_config, reporter, Event, RecordingPipeline, RecordingSink};

async fn raw_push(addr: std::net::SocketAddr) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(
            b"POST /api/v1/push HTTP/1.1\r\nHost: sidecar\r\nX-Trace: abc\r\nContent-Length: 2\r\nConnection: close\r\n\r\n{}",
        )
        .await
        .unwrap();
    let mut buf = String::new();
    stream.read_to_string(&mut buf).await.unwrap();
    buf
}

#[tokio::test]
async fn signal_stops_ticker_before_final_flush() {
    let pipeline = RecordingPipeline::new();
    let sup = Supervisor::with_reporter(fast_config(), reporter(pipeline.clone(), RecordingSink::new()));
    let mut state = sup.subscribe();
    assert_eq!(*state.borrow(), LifecycleState::Starting);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let run = tokio::spawn(sup.run_until(async move { Ok(listener) }, async move {
        let _ = stop_rx.await;
    }));

    state
        .wait_for(|s| *s == LifecycleState::Running)
        .await
        .unwrap();

    let response = raw_push(addr).await;
    assert!(response.starts_with("HTTP/1.1 200 OK"), "{response}");
    assert!(response.ends_with("Status code: 200"), "{response}");

    tokio::time::sleep(Duration::from_millis(2_500)).await;
    stop_tx.send(()).unwrap();

    let summary = run.await.unwrap().expect("clean run");
    assert_eq!(summary.shutdown_error, None);
    assert!(summary.reports_fired >= 1);
    assert_eq!(*state.borrow(), LifecycleState::Stopped);

    // Every record precedes the single shutdown.
    let events = pipeline.events();
    assert_eq!(events.last(), Some(&Event::Shutdown));
    assert_eq!(pipeline.shutdowns(), 1);
    assert_eq!(pipeline.records() as u64, summary.reports_fired);
}

#[tokio::test]
async fn slow_flush_times_out_but_the_run_still_completes() {
    let pipeline = RecordingPipeline::with_shutdown_delay(Duration::from_secs(10));
    let mut cfg = fast_config();
    cfg.shutdown.grace_period_ms = 100;
    let sup = Supervisor::with_reporter(cfg, reporter(pipeline, RecordingSink::new()));
    let state = sup.subscribe();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let summary = sup
        .run_until(async move { Ok(listener) }, async {})
        .await
        .expect("timeout is not fatal");

    assert_eq!(
        summary.shutdown_error,
        Some(PushmeterError::ShutdownTimeout(Duration::from_millis(100)))
    );
    assert_eq!(*state.borrow(), LifecycleState::Stopped);
}

#[tokio::test]
async fn bind_failure_is_logged_and_tolerated_by_default() {
    let pipeline = RecordingPipeline::new();
    let sup = Supervisor::with_reporter(fast_config(), reporter(pipeline.clone(), RecordingSink::new()));

    let summary = sup
        .run_until(
            async { Err(io::Error::new(io::ErrorKind::AddrInUse, "taken")) },
            tokio::time::sleep(Duration::from_millis(1_500)),
        )
        .await
        .expect("server failure is not fatal");

    // The ticker kept running without the HTTP server.
    assert_eq!(summary.reports_fired, 1);
    assert_eq!(pipeline.shutdowns(), 1);
}

#[tokio::test]
async fn bind_failure_is_fatal_when_configured() {
    let pipeline = RecordingPipeline::new();
    let mut cfg = fast_config();
    cfg.server.fail_on_server_error = true;
    let sup = Supervisor::with_reporter(cfg, reporter(pipeline.clone(), RecordingSink::new()));
    let state = sup.subscribe();

    let err = sup
        .run_until(
            async { Err(io::Error::new(io::ErrorKind::AddrInUse, "taken")) },
            std::future::pending::<()>(),
        )
        .await
        .expect_err("server failure is fatal");

    assert!(matches!(err, PushmeterError::Server(msg) if msg.contains("bind failed")));
    // Ordered shutdown still ran.
    assert_eq!(pipeline.shutdowns(), 1);
    assert_eq!(*state.borrow(), LifecycleState::Stopped);
}

#[tokio::test]
async fn unparsable_listen_address_takes_the_server_failure_path() {
    let pipeline = RecordingPipeline::new();
    let mut cfg = fast_config();
    cfg.server.fail_on_server_error = true;
    let sup = Supervisor::with_reporter(cfg, reporter(pipeline.clone(), RecordingSink::new()));
    let state = sup.subscribe();

    let err = sup
        .run_until(bind("not-an-addr".into()), std::future::pending::<()>())
        .await
        .expect_err("server failure is fatal");

    assert!(matches!(err, PushmeterError::Server(msg) if msg.contains("invalid listen address")));
    // The reporter was still flushed and the lifecycle completed.
    assert_eq!(pipeline.shutdowns(), 1);
    assert_eq!(*state.borrow(), LifecycleState::Stopped);
}

#[tokio::test]
async fn configured_address_binds() {
    let listener = bind("127.0.0.1:0".into()).await.expect("ephemeral port");
    assert!(listener.local_addr().unwrap().port() > 0);
}
