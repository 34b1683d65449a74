use bytes::Bytes;
use std::{
    net::{Ipv4Addr, SocketAddr, TcpListener, UdpSocket},
    process::{Child, Command},
    thread::JoinHandle,
    time::{Duration, Instant},
};
use tokio::time::{sleep, timeout};

use lanrelay::{ChatClient, Reactor, ReactorHandle, RelayError, ServerConfig};

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

// -----------------------------------------------------------------------------
// ----- TestServer ------------------------------------------------------------

/// A reactor running on its own thread, bound to ephemeral loopback ports.
/// Dropping it shuts the reactor down and joins the thread.
pub struct TestServer {
    pub addr: SocketAddr,
    pub discovery_addr: SocketAddr,
    pub handle: ReactorHandle,
    thread: Option<JoinHandle<Result<(), RelayError>>>,
}

#[allow(dead_code)]
pub fn start_server() -> TestServer {
    start_server_with(|_| {})
}

#[allow(dead_code)]
pub fn start_server_with(tweak: impl FnOnce(&mut ServerConfig)) -> TestServer {
    let lo = SocketAddr::from((Ipv4Addr::LOCALHOST, 0));
    let mut config = ServerConfig {
        listen_addr: lo,
        discovery_addr: lo,
        poll_timeout: Duration::from_millis(20),
        ..ServerConfig::default()
    };
    tweak(&mut config);

    let reactor = Reactor::bind(&config).expect("bind reactor");
    let addr = reactor.local_addr();
    let discovery_addr = reactor.discovery_addr();
    let handle = reactor.handle();

    let thread = std::thread::spawn(move || {
        let mut reactor = reactor;
        reactor.run()
    });

    TestServer {
        addr,
        discovery_addr,
        handle,
        thread: Some(thread),
    }
}

impl TestServer {
    /// Block until the reactor has registered exactly `n` peers.
    pub async fn wait_for_peers(&self, n: usize) {
        let deadline = Instant::now() + RECV_TIMEOUT;
        while self.handle.connection_count() != n {
            assert!(
                Instant::now() < deadline,
                "expected {n} peers, reactor has {}",
                self.handle.connection_count()
            );
            sleep(Duration::from_millis(10)).await;
        }
    }

    #[allow(dead_code)]
    pub async fn connect(&self) -> ChatClient {
        ChatClient::connect(self.addr).await.expect("connect")
    }

    /// Connect `n` clients and wait until the reactor knows about all of them.
    #[allow(dead_code)]
    pub async fn connect_many(&self, n: usize) -> Vec<ChatClient> {
        let before = self.handle.connection_count();
        let mut clients = Vec::with_capacity(n);
        for _ in 0..n {
            clients.push(self.connect().await);
        }
        self.wait_for_peers(before + n).await;
        clients
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.shutdown();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Spawned binary --------------------------------------------------------

#[allow(dead_code)]
pub fn reserve_port(host: &str) -> u16 {
    let listener = TcpListener::bind(format!("{host}:0")).expect("bind ephemeral port");
    listener.local_addr().unwrap().port()
}

#[allow(dead_code)]
pub fn reserve_udp_port(host: &str) -> u16 {
    let socket = UdpSocket::bind(format!("{host}:0")).expect("bind ephemeral udp port");
    socket.local_addr().unwrap().port()
}

#[allow(dead_code)]
pub fn spawn_lanrelay(host: &str, port: u16, discovery_port: u16) -> Child {
    Command::new(env!("CARGO_BIN_EXE_lanrelay"))
        .env("LANRELAY_HOST", host)
        .env("LANRELAY_PORT", port.to_string())
        .env("LANRELAY_DISCOVERY_PORT", discovery_port.to_string())
        .env("LANRELAY_POLL_TIMEOUT", "20ms")
        .env_remove("LANRELAY_CONFIG_FILE")
        .spawn()
        .expect("spawn lanrelay")
}

#[allow(dead_code)]
pub async fn wait_for_listen(host: &str, port: u16) {
    let addr = format!("{host}:{port}");
    for _ in 0..50 {
        if std::net::TcpStream::connect(&addr).is_ok() {
            return;
        }
        sleep(Duration::from_millis(50)).await;
    }
    panic!("lanrelay did not start listening on {addr}");
}

// -----------------------------------------------------------------------------
// ----- Client helpers --------------------------------------------------------

#[allow(dead_code)]
pub async fn recv(client: &mut ChatClient) -> Bytes {
    timeout(RECV_TIMEOUT, client.next_frame())
        .await
        .expect("timed out waiting for a frame")
        .expect("read frame")
        .expect("server closed the connection")
}

/// Assert nothing arrives within `window`.
#[allow(dead_code)]
pub async fn expect_silence(client: &mut ChatClient, window: Duration) {
    if let Ok(res) = timeout(window, client.next_frame()).await {
        panic!("expected no frame, got {res:?}");
    }
}
