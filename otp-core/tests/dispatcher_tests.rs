#![allow(missing_docs)]
use std::net::SocketAddr;
use std::time::Duration;

use otp_core::dispatcher::ActiveWorkers;
use otp_core::{
    CipherClient, ClientConfig, Dispatcher, InputError, OtpError, Role, ServerConfig, WorkerBudget,
};
use rand::Rng;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct TestServer {
    addr: SocketAddr,
    workers: ActiveWorkers,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<otp_core::Result<()>>,
}

impl TestServer {
    async fn start(role: Role, max_workers: usize) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = ServerConfig {
            max_workers,
            ..ServerConfig::new(role, 0)
        };
        let dispatcher = Dispatcher::from_listener(listener, config).unwrap();
        let addr = dispatcher.local_addr().unwrap();
        let workers = dispatcher.active_workers();
        let (shutdown, stop) = oneshot::channel::<()>();
        let handle = tokio::spawn(dispatcher.run_until(async {
            let _ = stop.await;
        }));
        Self {
            addr,
            workers,
            shutdown,
            handle,
        }
    }

    fn client(&self, role: Role) -> CipherClient {
        CipherClient::new(ClientConfig::new(role, self.addr.port()).with_host("127.0.0.1"))
    }

    async fn stop(self) {
        self.shutdown.send(()).unwrap();
        self.handle.await.unwrap().unwrap();
    }
}

/// Opens a connection and completes the handshake, leaving the session
/// waiting for the length field.
async fn open_session(addr: SocketAddr, role: Role) -> TcpStream {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(role.tag()).await.unwrap();
    let mut tag = [0u8; 3];
    stream.read_exact(&mut tag).await.unwrap();
    assert_eq!(&tag, role.tag());
    stream
}

/// Sends a one-symbol request on a session opened by [`open_session`].
async fn finish_session(mut stream: TcpStream) -> u8 {
    stream.write_all(b"1\0\0\0\0\0\0\0\0\0").await.unwrap();
    stream.write_all(b"A").await.unwrap();
    stream.write_all(b"B").await.unwrap();
    let mut out = [0u8; 1];
    stream.read_exact(&mut out).await.unwrap();
    out[0]
}

async fn wait_for_workers(workers: &ActiveWorkers, expected: usize) {
    for _ in 0..200 {
        if workers.get() == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("expected {expected} active workers, saw {}", workers.get());
}

#[test]
fn test_budget_never_leaves_its_bounds() {
    let mut rng = rand::rng();
    for max in 1..=6 {
        let mut budget = WorkerBudget::new(max);
        let mut model = 0usize;
        for _ in 0..500 {
            if rng.random_bool(0.5) {
                let result = budget.acquire();
                if model < max {
                    assert!(result.is_ok());
                    model += 1;
                } else {
                    assert!(matches!(result, Err(OtpError::ResourceExhaustion(_))));
                }
            } else {
                let result = budget.release();
                if model > 0 {
                    assert!(result.is_ok());
                    model -= 1;
                } else {
                    assert!(matches!(result, Err(OtpError::ResourceExhaustion(_))));
                }
            }
            assert_eq!(budget.active(), model);
            assert!(budget.active() <= budget.max());
            assert_eq!(budget.has_capacity(), model < max);
        }
    }
}

#[test]
fn test_zero_workers_is_rejected() {
    let config = ServerConfig {
        max_workers: 0,
        ..ServerConfig::new(Role::Enc, 0)
    };
    assert!(matches!(config.validate(), Err(InputError::Config(_))));
}

#[tokio::test]
async fn test_encode_then_decode_through_two_daemons() {
    let enc = TestServer::start(Role::Enc, 5).await;
    let dec = TestServer::start(Role::Dec, 5).await;
    let text = b"HELLO WORLD";
    let key = b"XMCKLVFQYEIOJW";

    let ciphertext = enc.client(Role::Enc).run(text, key).await.unwrap();
    assert_eq!(ciphertext.len(), text.len());
    assert_ne!(&ciphertext[..], &text[..]);

    let plaintext = dec.client(Role::Dec).run(&ciphertext, key).await.unwrap();
    assert_eq!(&plaintext[..], &text[..]);

    enc.stop().await;
    dec.stop().await;
}

#[tokio::test]
async fn test_role_mismatch_leaves_dispatcher_running() {
    let dec = TestServer::start(Role::Dec, 5).await;

    let err = dec.client(Role::Enc).run(b"ABC", b"ABC").await.unwrap_err();
    match &err {
        OtpError::RoleMismatch { expected, .. } => assert_eq!(expected.service_name(), "otp_enc_d"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.exit_code(), 2);

    // The rejected session is reclaimed and other clients are still served.
    let out = dec.client(Role::Dec).run(b"B", b"B").await.unwrap();
    assert_eq!(out, b"A");
    wait_for_workers(&dec.workers, 0).await;

    dec.stop().await;
}

#[tokio::test]
async fn test_invalid_input_never_connects() {
    // Nothing listens on this port once the listener is dropped.
    let port = TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let client = CipherClient::new(ClientConfig::new(Role::Enc, port).with_host("127.0.0.1"));

    let err = client.run(b"AB", b"A").await.unwrap_err();
    assert!(matches!(err, OtpError::InvalidInput(InputError::KeyTooShort { .. })));

    let err = client.run(b"hELLO", b"AAAAA").await.unwrap_err();
    assert!(matches!(err, OtpError::InvalidInput(InputError::InvalidCharacter { .. })));

    // Valid input does reach the network and fails there.
    let err = client.run(b"AB", b"AB").await.unwrap_err();
    assert!(matches!(err, OtpError::Transport { .. }));
}

#[tokio::test]
async fn test_saturated_budget_defers_extra_connections() {
    let server = TestServer::start(Role::Enc, 5).await;

    let mut held = Vec::new();
    for _ in 0..5 {
        held.push(open_session(server.addr, Role::Enc).await);
    }
    wait_for_workers(&server.workers, 5).await;

    // The sixth connection lands in the listen backlog but is not served.
    let mut sixth = TcpStream::connect(server.addr).await.unwrap();
    sixth.write_all(b"enc").await.unwrap();
    let mut tag = [0u8; 3];
    let early = tokio::time::timeout(Duration::from_millis(300), sixth.read_exact(&mut tag)).await;
    assert!(early.is_err(), "sixth connection was served while the budget was full");
    assert_eq!(server.workers.get(), 5);

    // Finishing one session frees a slot for it.
    let first = held.remove(0);
    assert_eq!(finish_session(first).await, b'B');
    tokio::time::timeout(Duration::from_secs(5), sixth.read_exact(&mut tag))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&tag, b"enc");
    assert!(server.workers.get() <= 5);

    assert_eq!(finish_session(sixth).await, b'B');
    for stream in held {
        assert_eq!(finish_session(stream).await, b'B');
    }
    wait_for_workers(&server.workers, 0).await;
    server.stop().await;
}

#[tokio::test]
async fn test_concurrent_clients_all_complete() {
    let server = TestServer::start(Role::Enc, 2).await;

    let mut tasks = Vec::new();
    for i in 0..8u8 {
        let client = server.client(Role::Enc);
        tasks.push(tokio::spawn(async move {
            let text = vec![b'A' + i; 3000];
            let key = vec![b'B'; 3000];
            let out = client.run(&text, &key).await.unwrap();
            (i, out)
        }));
    }
    for task in tasks {
        let (i, out) = task.await.unwrap();
        assert_eq!(out.len(), 3000);
        assert!(out.iter().all(|&b| b == b'B' + i));
    }
    assert!(server.workers.get() <= 2);

    wait_for_workers(&server.workers, 0).await;
    server.stop().await;
}

#[tokio::test]
async fn test_shutdown_waits_for_running_sessions() {
    let server = TestServer::start(Role::Dec, 5).await;
    let stream = open_session(server.addr, Role::Dec).await;
    wait_for_workers(&server.workers, 1).await;

    server.shutdown.send(()).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!server.handle.is_finished());

    // B - B = A
    assert_eq!(finish_session(stream).await, b'A');
    server.handle.await.unwrap().unwrap();
}
