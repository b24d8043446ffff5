//! Integration test common infrastructure.
//!
//! [`FakeServer`] is the server end of an in-memory duplex stream. The
//! client under test runs its dispatch loop on the other end in a spawned
//! task, so tests script the server side line by line.

#![allow(dead_code)]

use std::time::Duration;

use asif::{Client, Config, ConnectionState};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, ReadHalf, WriteHalf};
use tokio::task::JoinHandle;
use tokio::time::timeout;

pub const TIMEOUT: Duration = Duration::from_secs(5);

/// Config for a client called `nick` pointing at a server nobody dials.
pub fn config(nick: &str) -> Config {
    Config::new("irc.test", 6667, nick)
}

/// Start `client` on an in-memory stream.
pub fn start(client: &Client) -> (FakeServer, JoinHandle<asif::Result<()>>) {
    let (client_side, server_side) = tokio::io::duplex(64 * 1024);
    let runner = client.clone();
    let handle = tokio::spawn(async move { runner.run_with(client_side).await });
    (FakeServer::new(server_side), handle)
}

/// Start a client and complete registration as `nick`.
pub async fn connected(nick: &str) -> anyhow::Result<(Client, FakeServer, JoinHandle<asif::Result<()>>)> {
    let client = Client::new(config(nick));
    let (mut server, handle) = start(&client);
    server.register(&client).await?;
    Ok((client, server, handle))
}

pub struct FakeServer {
    reader: BufReader<ReadHalf<DuplexStream>>,
    writer: WriteHalf<DuplexStream>,
}

impl FakeServer {
    fn new(stream: DuplexStream) -> Self {
        let (read, write) = tokio::io::split(stream);
        Self {
            reader: BufReader::new(read),
            writer: write,
        }
    }

    /// Send one line; the terminator is added here.
    pub async fn send(&mut self, line: &str) -> anyhow::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\r\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Write `bytes` exactly as given, with no terminator.
    pub async fn send_unterminated(&mut self, bytes: &str) -> anyhow::Result<()> {
        self.writer.write_all(bytes.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Next line from the client, without its terminator.
    pub async fn recv(&mut self) -> anyhow::Result<String> {
        let mut line = String::new();
        let read = timeout(TIMEOUT, self.reader.read_line(&mut line)).await??;
        if read == 0 {
            anyhow::bail!("client closed the connection");
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Receive lines until one satisfies `predicate`; returns all of them.
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
                return Ok(lines);
            }
        }
    }

    /// Receive lines until exactly `expected` arrives.
    pub async fn expect(&mut self, expected: &str) -> anyhow::Result<()> {
        self.recv_until(|line| line == expected).await?;
        Ok(())
    }

    /// Round-trip a PING; every line sent before it has been dispatched
    /// once this returns.
    pub async fn sync(&mut self, token: &str) -> anyhow::Result<()> {
        self.send(&format!("PING :{token}")).await?;
        self.expect(&format!("PONG :{token}")).await
    }

    /// Read the NICK/USER burst, then welcome the client.
    pub async fn register(&mut self, client: &Client) -> anyhow::Result<()> {
        let nick = client.config().identity.nick.clone();
        self.recv_until(|line| line.starts_with("USER ")).await?;
        self.send(&format!(":irc.test 001 {nick} :Welcome to the test network"))
            .await?;
        self.send(&format!(":irc.test 376 {nick} :End of /MOTD command."))
            .await?;
        timeout(TIMEOUT, client.wait_for_state(ConnectionState::Connected)).await??;
        Ok(())
    }

    /// Confirm a join of `channel` with the given NAMES tokens.
    pub async fn confirm_join(&mut self, nick: &str, channel: &str, names: &str) -> anyhow::Result<()> {
        self.send(&format!(":{nick}!bot@client.test JOIN {channel}")).await?;
        self.send(&format!(":irc.test 353 {nick} = {channel} :{names}")).await?;
        self.send(&format!(":irc.test 366 {nick} {channel} :End of /NAMES list."))
            .await
    }

    /// Drop the connection, ending the client's loop.
    pub async fn close(mut self) -> anyhow::Result<()> {
        self.writer.shutdown().await?;
        Ok(())
    }
}
