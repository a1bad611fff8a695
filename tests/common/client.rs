//! Test chat client.
//!
//! A raw line-oriented TCP client that can send commands and assert on
//! relayed lines.

use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;

/// A test chat client.
pub struct TestClient {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
}

impl TestClient {
    /// Connect, answer the name prompt, and wait for the session to become
    /// visible (the server echoes the join notice back to its sender).
    pub async fn connect(address: &str, name: &str) -> anyhow::Result<Self> {
        let mut client = Self::connect_raw(address).await?;

        let prompt = client.recv().await?;
        anyhow::ensure!(
            prompt.contains("Enter your name"),
            "unexpected prompt: {prompt}"
        );
        client.send_line(name).await?;

        let join = format!("{name} has joined the chat.");
        client.recv_until(|line| line == join).await?;

        Ok(client)
    }

    /// Connect without completing the handshake.
    pub async fn connect_raw(address: &str) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(address).await?;

        // Split stream for reading and writing
        let (read_half, write_half) = stream.into_split();

        Ok(Self {
            reader: BufReader::new(read_half),
            writer: BufWriter::new(write_half),
        })
    }

    /// Send one line.
    pub async fn send_line(&mut self, line: &str) -> anyhow::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Receive a single line from the server.
    pub async fn recv(&mut self) -> anyhow::Result<String> {
        self.recv_timeout(Duration::from_secs(5)).await
    }

    /// Receive a line with a timeout. Errors on timeout or a closed
    /// connection.
    pub async fn recv_timeout(&mut self, dur: Duration) -> anyhow::Result<String> {
        let mut line = String::new();
        let n = timeout(dur, self.reader.read_line(&mut line)).await??;
        anyhow::ensure!(n > 0, "connection closed");
        Ok(line.trim_end().to_string())
    }

    /// Receive lines until the predicate matches, returning everything read.
    pub async fn recv_until<F>(&mut self, mut predicate: F) -> anyhow::Result<Vec<String>>
    where
        F: FnMut(&str) -> bool,
    {
        let mut lines = Vec::new();
        loop {
            let line = self.recv().await?;
            let done = predicate(&line);
            lines.push(line);
            if done {
                break;
            }
        }
        Ok(lines)
    }

    /// Assert that no line arrives within `dur`.
    #[allow(dead_code)]
    pub async fn assert_silence(&mut self, dur: Duration) -> anyhow::Result<()> {
        match self.recv_timeout(dur).await {
            Ok(line) => anyhow::bail!("unexpected line: {line}"),
            Err(_) => Ok(()),
        }
    }

    /// Read until the server closes this connection, returning everything
    /// seen on the way out.
    #[allow(dead_code)]
    pub async fn recv_until_closed(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(line) = self.recv_timeout(Duration::from_secs(2)).await {
            lines.push(line);
        }
        lines
    }

    /// Send `/quit`.
    #[allow(dead_code)]
    pub async fn quit(&mut self) -> anyhow::Result<()> {
        self.send_line("/quit").await
    }
}
