use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};

use pentago_server::Registry;
use pentago_server::connection::MAX_LINE;

/// Spin up a test server on a random port.
async fn start_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let registry = Arc::new(Registry::new("test server"));
    tokio::spawn(pentago_server::serve(listener, registry));
    addr
}

struct Client {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl Client {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (reader, writer) = stream.into_split();
        Self {
            lines: BufReader::new(reader).lines(),
            writer,
        }
    }

    /// Connects, says HELLO with the given extensions and logs in.
    async fn login(addr: SocketAddr, name: &str, extensions: &str) -> Self {
        let mut client = Self::connect(addr).await;
        client.send(&format!("HELLO~test client{extensions}")).await;
        client.expect("HELLO~test server").await;
        client.send(&format!("LOGIN~{name}")).await;
        client.expect("LOGIN").await;
        client
    }

    async fn send(&mut self, line: &str) {
        self.send_raw(format!("{line}\n").as_bytes()).await;
    }

    async fn send_raw(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).await.unwrap();
    }

    async fn recv(&mut self) -> Option<String> {
        tokio::time::timeout(Duration::from_secs(5), self.lines.next_line())
            .await
            .expect("timed out waiting for a line")
            .unwrap()
    }

    async fn expect(&mut self, line: &str) {
        assert_eq!(self.recv().await.as_deref(), Some(line));
    }

    /// Round-trips a PING so everything sent before it has been handled.
    async fn sync(&mut self) {
        self.send("PING").await;
        self.expect("PONG").await;
    }
}

/// Two logged-in clients paired into one match, alice moving first.
async fn start_match(addr: SocketAddr, extensions: &str) -> (Client, Client) {
    let mut alice = Client::login(addr, "alice", extensions).await;
    let mut bob = Client::login(addr, "bob", extensions).await;
    alice.send("QUEUE").await;
    alice.sync().await;
    bob.send("QUEUE").await;
    alice.expect("NEWGAME~alice~bob").await;
    bob.expect("NEWGAME~alice~bob").await;
    (alice, bob)
}

/// Sends a move and waits until both players have seen the echo.
async fn play(mover: &mut Client, other: &mut Client, line: &str) {
    mover.send(line).await;
    mover.expect(line).await;
    other.expect(line).await;
}

#[tokio::test]
async fn full_match_flow() {
    let addr = start_server().await;
    let (mut alice, mut bob) = start_match(addr, "").await;

    bob.send("MOVE~7~0").await;
    bob.expect("ERROR~Not your turn").await;

    play(&mut alice, &mut bob, "MOVE~7~0").await;

    bob.send("MOVE~7~3").await;
    bob.expect("ERROR~Invalid move: field 7 is already taken").await;

    // Black builds row 0; white stays in the bottom-left quadrant.
    // Rotation 6 turns the empty bottom-right quadrant.
    for (white, black) in [(18, 0), (19, 1), (20, 2), (24, 3), (25, 4)] {
        play(&mut bob, &mut alice, &format!("MOVE~{white}~6")).await;
        play(&mut alice, &mut bob, &format!("MOVE~{black}~6")).await;
    }
    alice.expect("GAMEOVER~VICTORY~alice").await;
    bob.expect("GAMEOVER~VICTORY~alice").await;
}

#[tokio::test]
async fn duplicate_name_is_refused() {
    let addr = start_server().await;
    let _alice = Client::login(addr, "alice", "").await;

    let mut impostor = Client::connect(addr).await;
    impostor.send("HELLO~impostor").await;
    impostor.expect("HELLO~test server").await;
    impostor.send("LOGIN~alice").await;
    impostor.expect("ALREADYLOGGEDIN").await;
    impostor.send("LOGIN~mallory").await;
    impostor.expect("LOGIN").await;
}

#[tokio::test]
async fn disconnect_forfeits_the_match() {
    let addr = start_server().await;
    let (alice, mut bob) = start_match(addr, "~RANK").await;

    drop(alice);
    bob.expect("GAMEOVER~DISCONNECT~bob").await;

    bob.send("RANK").await;
    bob.expect("RANK~bob~1").await;

    // Back in the lobby: queueing works again.
    bob.send("QUEUE").await;
    bob.sync().await;
}

#[tokio::test]
async fn chat_reaches_chat_clients_only() {
    let addr = start_server().await;
    let mut alice = Client::login(addr, "alice", "~CHAT").await;
    let mut bob = Client::login(addr, "bob", "~RANK~CHAT").await;
    let mut carol = Client::login(addr, "carol", "").await;

    alice.send("CHAT~hello~everyone").await;
    alice.expect("CHAT~alice~hello~everyone").await;
    bob.expect("CHAT~alice~hello~everyone").await;

    bob.send("WHISPER~alice~psst").await;
    alice.expect("WHISPER~bob~psst").await;

    bob.send("WHISPER~carol~psst").await;
    bob.expect("CANNOTWHISPER~carol").await;

    // Without the extension chat is ignored.
    carol.send("CHAT~anyone?").await;
    carol.sync().await;
    alice.sync().await;
}

#[tokio::test]
async fn list_and_ping() {
    let addr = start_server().await;
    let mut bob = Client::login(addr, "bob", "").await;
    let _alice = Client::login(addr, "alice", "").await;

    bob.send("LIST").await;
    bob.expect("LIST~alice~bob").await;
    bob.send("PING").await;
    bob.expect("PONG").await;
}

#[tokio::test]
async fn garbage_is_ignored() {
    let addr = start_server().await;
    let mut client = Client::connect(addr).await;

    // Nothing but HELLO is accepted before the handshake.
    client.send("LOGIN~early").await;
    client.send("HELLO~late").await;
    client.expect("HELLO~test server").await;

    client.send("DANCE").await;
    client.send("MOVE~x~y").await;
    client.send_raw(b"\xff\xfe\n").await;
    client.send("MOVE~7~0").await;
    client.sync().await;
}

#[tokio::test]
async fn overlong_lines_are_dropped_whole() {
    let addr = start_server().await;
    let mut client = Client::login(addr, "alice", "~CHAT").await;

    // A valid command that only turns into one past the cap.
    let long = format!("CHAT~{}", "x".repeat(MAX_LINE * 4));
    client.send(&long).await;
    client.send_raw(&vec![b'y'; MAX_LINE * 2]).await;
    client.send_raw(b"\n").await;
    client.sync().await;

    client.send("CHAT~short").await;
    client.expect("CHAT~alice~short").await;
}

#[tokio::test]
async fn out_of_range_moves_are_rejected() {
    let addr = start_server().await;
    let (mut alice, mut bob) = start_match(addr, "").await;

    alice.send("MOVE~-1~0").await;
    alice
        .expect("ERROR~Invalid move: field -1 is not on the board")
        .await;
    alice.send("MOVE~7~300").await;
    alice
        .expect("ERROR~Invalid move: rotation 300 does not exist")
        .await;
    alice.send("MOVE~99999999999999999999999~0").await;
    alice
        .expect("ERROR~Invalid move: field 9223372036854775807 is not on the board")
        .await;

    play(&mut alice, &mut bob, "MOVE~7~0").await;
}

#[tokio::test]
async fn quit_closes_the_connection() {
    let addr = start_server().await;
    let mut client = Client::login(addr, "alice", "").await;
    client.send("QUIT").await;
    assert_eq!(client.recv().await, None);

    // The name is free again.
    let _again = Client::login(addr, "alice", "").await;
}
