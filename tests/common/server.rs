//! Scripted IRC server for integration testing.
//!
//! Accepts the bridge's TCP connections and lets a test read what the
//! bridge writes and write whatever the server should say.

use std::time::Duration;

use puppetbridge::irc::Message;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpListener;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

/// A listening test server.
pub struct TestIrcServer {
    listener: TcpListener,
    port: u16,
}

/// One accepted client connection.
pub struct TestIrcConn {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
}

impl TestIrcServer {
    /// Bind to an ephemeral localhost port.
    pub async fn bind() -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        Ok(Self { listener, port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Wait for the next client.
    pub async fn accept(&self) -> anyhow::Result<TestIrcConn> {
        let (stream, _) = timeout(WAIT, self.listener.accept()).await??;
        let (read_half, write_half) = stream.into_split();
        Ok(TestIrcConn {
            reader: BufReader::new(read_half),
            writer: BufWriter::new(write_half),
        })
    }
}

impl TestIrcConn {
    /// Send a raw line; CRLF is appended.
    pub async fn send_raw(&mut self, line: &str) -> anyhow::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\r\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// RPL_WELCOME for `nick`.
    pub async fn welcome(&mut self, nick: &str) -> anyhow::Result<()> {
        self.send_raw(&format!(":irc.test 001 {nick} :Welcome to the test network {nick}"))
            .await
    }

    /// Receive and parse the next line the client wrote.
    pub async fn recv(&mut self) -> anyhow::Result<Message> {
        let mut line = String::new();
        let n = timeout(WAIT, self.reader.read_line(&mut line)).await??;
        if n == 0 {
            anyhow::bail!("client closed the connection");
        }
        Ok(line.parse()?)
    }

    /// Receive lines until one with `command`, returning all of them.
    pub async fn recv_until(&mut self, command: &str) -> anyhow::Result<Vec<Message>> {
        let mut lines = Vec::new();
        loop {
            let msg = self.recv().await?;
            let done = msg.command == command;
            lines.push(msg);
            if done {
                return Ok(lines);
            }
        }
    }

    /// Read the registration burst up to and including `USER`.
    pub async fn registration(&mut self) -> anyhow::Result<Vec<Message>> {
        self.recv_until("USER").await
    }
}
