//! End-to-end scans against listeners on 127.0.0.1.

use barnacle::scanner::{
    scan_target, PortState, ScanJobConfig, ScanParameters, ScanType, StrategyOptions,
};
use barnacle::ServiceTable;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, UdpSocket};

async fn closed_tcp_port() -> u16 {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    listener.local_addr().unwrap().port()
}

fn options() -> StrategyOptions {
    StrategyOptions {
        services: Arc::new(ServiceTable::empty()),
        banner_timeout: Duration::from_millis(300),
        ..Default::default()
    }
}

fn params(ports: Vec<u16>) -> ScanParameters {
    ScanParameters {
        target: Ipv4Addr::LOCALHOST,
        ports,
        timeout: Duration::from_secs(1),
    }
}

#[tokio::test]
async fn tcp_scan_reports_listener_and_closed_port() {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    let open = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let _ = socket.write_all(b"SSH-2.0-barnacle-test\r\n").await;
        }
    });
    let closed = closed_tcp_port().await;

    let report = scan_target(
        &params(vec![open, closed]),
        ScanType::Tcp,
        options(),
        &ScanJobConfig::default(),
    )
    .await;

    assert_eq!(report.results.len(), 2);
    assert!(!report.cancelled);

    let sorted = report.sorted_results();
    let open_result = sorted.iter().find(|r| r.port == open).unwrap();
    let closed_result = sorted.iter().find(|r| r.port == closed).unwrap();

    assert_eq!(open_result.state, PortState::Open);
    assert_eq!(open_result.service, "SSH-2.0-barnacle-test");
    assert_eq!(closed_result.state, PortState::Closed);
    assert_eq!(closed_result.service, "unknown");
    assert_eq!(report.open_ports, 1);
    assert_eq!(report.closed_ports, 1);
}

#[tokio::test]
async fn repeated_scans_agree() {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    let open = listener.local_addr().unwrap().port();
    let closed = closed_tcp_port().await;
    let params = params(vec![open, closed]);

    let mut runs = Vec::new();
    for _ in 0..2 {
        let report =
            scan_target(&params, ScanType::Tcp, options(), &ScanJobConfig::default()).await;
        runs.push(
            report
                .sorted_results()
                .into_iter()
                .map(|r| (r.port, r.state))
                .collect::<Vec<_>>(),
        );
    }

    assert_eq!(runs[0], runs[1]);
    drop(listener);
}

#[tokio::test]
async fn udp_scan_distinguishes_reply_from_silence() {
    let echo = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    let answering = echo.local_addr().unwrap().port();
    tokio::spawn(async move {
        let mut buf = [0u8; 64];
        while let Ok((_, peer)) = echo.recv_from(&mut buf).await {
            let _ = echo.send_to(b"hello", peer).await;
        }
    });
    let silent_socket = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    let silent = silent_socket.local_addr().unwrap().port();

    let mut params = params(vec![answering, silent]);
    params.timeout = Duration::from_millis(300);

    let report = scan_target(&params, ScanType::Udp, options(), &ScanJobConfig::default()).await;

    let state_of = |port: u16| report.results.iter().find(|r| r.port == port).unwrap();
    assert_eq!(state_of(answering).state, PortState::Open);
    assert_eq!(state_of(answering).service, "hello");
    assert_eq!(state_of(silent).state, PortState::OpenOrFiltered);
    assert_eq!(report.open_ports, 2);
    drop(silent_socket);
}

#[tokio::test]
async fn every_requested_port_gets_one_result() {
    let first = closed_tcp_port().await;
    let ports: Vec<u16> = (0..40).map(|i| first.wrapping_add(i)).chain([first]).collect();

    let job = ScanJobConfig {
        concurrency: 8,
        ..Default::default()
    };
    let mut params = params(ports.clone());
    params.timeout = Duration::from_millis(500);

    let report = scan_target(&params, ScanType::Tcp, options(), &job).await;

    assert_eq!(report.results.len(), ports.len());
    assert!(report.results.iter().all(|r| !r.service.is_empty()));
}
