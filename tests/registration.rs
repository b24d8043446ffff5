//! Integration tests for the registration handshake.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use asif::{Client, ClientError, ConnectionState};
use common::{FakeServer, config, start};

#[tokio::test]
async fn test_registration_burst_and_connected() -> anyhow::Result<()> {
    let mut config = config("me");
    config.server.password = Some("hunter2".to_string());
    config.identity.user = "asif".to_string();
    config.identity.realname = "Asif Test".to_string();
    let client = Client::new(config);
    let (mut server, _handle) = start(&client);

    assert_eq!(server.recv().await?, "PASS hunter2");
    assert_eq!(server.recv().await?, "NICK me");
    assert_eq!(server.recv().await?, "USER asif 0 * :Asif Test");

    server.send(":irc.test 001 me :Welcome").await?;
    server.sync("before-motd").await?;
    assert_eq!(client.state(), ConnectionState::Registering);

    server.send(":irc.test 376 me :End of /MOTD command.").await?;
    client.wait_for_state(ConnectionState::Connected).await?;

    // The handshake handlers are gone once registration completes.
    let stats = client.registry_stats().await?;
    assert_eq!(stats.command, 0);
    Ok(())
}

#[tokio::test]
async fn test_missing_motd_also_completes_registration() -> anyhow::Result<()> {
    let client = Client::new(config("me"));
    let (mut server, _handle) = start(&client);
    server.recv_until(|l| l.starts_with("USER ")).await?;

    server.send(":irc.test 001 me :Welcome").await?;
    server.send(":irc.test 422 me :MOTD File is missing").await?;
    client.wait_for_state(ConnectionState::Connected).await?;
    Ok(())
}

#[tokio::test]
async fn test_nick_in_use_retries_with_underscore() -> anyhow::Result<()> {
    let client = Client::new(config("me"));
    let (mut server, _handle) = start(&client);
    server.recv_until(|l| l.starts_with("USER ")).await?;

    server.send(":irc.test 433 * me :Nickname is already in use").await?;
    assert_eq!(server.recv().await?, "NICK me_");
    server.send(":irc.test 433 * me_ :Nickname is already in use").await?;
    assert_eq!(server.recv().await?, "NICK me__");

    server.send(":irc.test 001 me__ :Welcome").await?;
    server.send(":irc.test 376 me__ :End of /MOTD command.").await?;
    client.wait_for_state(ConnectionState::Connected).await?;
    assert_eq!(client.nick(), "me__");
    Ok(())
}

#[tokio::test]
async fn test_nick_retries_are_capped() -> anyhow::Result<()> {
    let mut config = config("me");
    config.limits.max_nick_attempts = 3;
    let client = Client::new(config);
    let (mut server, handle) = start(&client);
    server.recv_until(|l| l.starts_with("USER ")).await?;

    server.send(":irc.test 433 * me :in use").await?;
    assert_eq!(server.recv().await?, "NICK me_");
    server.send(":irc.test 433 * me_ :in use").await?;
    assert_eq!(server.recv().await?, "NICK me__");
    server.send(":irc.test 433 * me__ :in use").await?;

    let result = handle.await?;
    assert!(
        matches!(result, Err(ClientError::NickRetriesExhausted { attempts: 3, .. })),
        "unexpected result: {result:?}"
    );
    assert_eq!(client.state(), ConnectionState::Closed);
    Ok(())
}

#[tokio::test]
async fn test_welcome_nick_is_adopted() -> anyhow::Result<()> {
    let client = Client::new(config("me"));
    let (mut server, _handle) = start(&client);
    server.recv_until(|l| l.starts_with("USER ")).await?;

    server.send(":irc.test 001 me_truncated :Welcome").await?;
    server.send(":irc.test 376 me_truncated :End").await?;
    client.wait_for_state(ConnectionState::Connected).await?;
    assert_eq!(client.nick(), "me_truncated");
    Ok(())
}

#[tokio::test]
async fn test_isupport_prefixes_drive_member_modes() -> anyhow::Result<()> {
    let client = Client::new(config("me"));
    let (mut server, _handle) = start(&client);
    server.recv_until(|l| l.starts_with("USER ")).await?;

    server
        .send(":irc.test 005 me CHANTYPES=#! PREFIX=(qov)~@+ NETWORK=Test :are supported by this server")
        .await?;
    server.send(":irc.test 001 me :Welcome").await?;
    server.send(":irc.test 376 me :End").await?;
    client.wait_for_state(ConnectionState::Connected).await?;

    let joined = client.join_and_wait("!ops")?;
    server.expect("JOIN !ops").await?;
    server.confirm_join("me", "!ops", "~owner @op +voice plain").await?;
    let channel = joined.await?;

    let modes: Vec<_> = channel
        .members_with_modes()
        .into_iter()
        .map(|(user, mode)| (user.name().to_string(), mode))
        .collect();
    assert_eq!(
        modes,
        vec![
            ("me".to_string(), None),
            ("op".to_string(), Some('o')),
            ("owner".to_string(), Some('q')),
            ("plain".to_string(), None),
            ("voice".to_string(), Some('v')),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_ping_is_answered_without_handlers() -> anyhow::Result<()> {
    let client = Client::new(config("me"));
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    client.on_command("PING", move |_, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    let (mut server, _handle) = start(&client);
    server.recv_until(|l| l.starts_with("USER ")).await?;

    // Answered even before registration completes.
    server.send("PING :abc").await?;
    assert_eq!(server.recv().await?, "PONG :abc");
    server.send("PING irc.test").await?;
    assert_eq!(server.recv().await?, "PONG :irc.test");
    assert_eq!(seen.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn test_server_close_ends_run() -> anyhow::Result<()> {
    let client = Client::new(config("me"));
    let (mut server, handle) = start(&client);
    server.register(&client).await?;

    FakeServer::close(server).await?;
    handle.await??;
    assert_eq!(client.state(), ConnectionState::Closed);
    assert!(client.send_raw("PRIVMSG #x :late").is_err());
    Ok(())
}

#[tokio::test]
async fn test_unterminated_last_line_is_dispatched_on_close() -> anyhow::Result<()> {
    let client = Client::new(config("me"));
    let (mut server, handle) = start(&client);
    server.register(&client).await?;

    let notice = client.await_command("NOTICE");
    server.send_unterminated(":irc.test NOTICE * :hello").await?;
    FakeServer::close(server).await?;

    handle.await??;
    let msg = tokio::time::timeout(Duration::from_secs(5), notice).await??;
    assert_eq!(msg.trailing.as_deref(), Some("hello"));
    assert_eq!(client.state(), ConnectionState::Closed);
    Ok(())
}

#[tokio::test]
async fn test_registration_burst_precedes_early_sends() -> anyhow::Result<()> {
    let mut config = config("me");
    config.server.password = Some("hunter2".to_string());
    let client = Client::new(config);
    client.join("#early")?;
    client.send_raw("PRIVMSG #early :hi")?;

    let (mut server, _handle) = start(&client);
    assert_eq!(server.recv().await?, "PASS hunter2");
    assert_eq!(server.recv().await?, "NICK me");
    assert!(server.recv().await?.starts_with("USER "));
    assert_eq!(server.recv().await?, "JOIN #early");
    assert_eq!(server.recv().await?, "PRIVMSG #early :hi");
    Ok(())
}
