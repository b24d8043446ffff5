//! Integration tests for joins, membership tracking and one-shot waits.

mod common;

use std::time::Duration;

use asif::{CommandPattern, Matcher};
use common::connected;
use tokio::sync::mpsc;

#[tokio::test]
async fn test_join_and_wait_gathers_names() -> anyhow::Result<()> {
    let (client, mut server, _handle) = connected("me").await?;

    let joined = client.join_and_wait("#rust")?;
    server.expect("JOIN #rust").await?;
    server
        .confirm_join("me", "#rust", "me @nick1 +nick2 nick3")
        .await?;
    let channel = tokio::time::timeout(Duration::from_secs(5), joined).await??;

    assert_eq!(channel.name(), "#rust");
    let names: Vec<_> = channel
        .members()
        .iter()
        .map(|u| u.name().to_string())
        .collect();
    assert_eq!(names, ["me", "nick1", "nick2", "nick3"]);

    let nick1 = client.get_user("nick1").expect("nick1 is tracked");
    assert_eq!(channel.mode_of(&nick1), Some('o'));
    assert!(client.get_channel("#rust").is_some());
    Ok(())
}

#[tokio::test]
async fn test_join_handler_fires_once_per_join() -> anyhow::Result<()> {
    let (client, mut server, _handle) = connected("me").await?;
    let (tx, mut rx) = mpsc::unbounded_channel();
    client.on_join(Some("#rust"), move |channel| {
        let tx = tx.clone();
        async move {
            let _ = tx.send(channel.members().len());
            Ok(())
        }
    });

    client.join("#rust")?;
    server.expect("JOIN #rust").await?;
    server.confirm_join("me", "#rust", "me alice bob").await?;
    assert_eq!(rx.recv().await, Some(3));

    // A stray end-of-names has no gatherer left to complete.
    server.send(":irc.test 366 me #rust :End of /NAMES list.").await?;
    server.sync("after-366").await?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(rx.try_recv().is_err());
    Ok(())
}

#[tokio::test]
async fn test_join_handler_for_other_channel_is_skipped() -> anyhow::Result<()> {
    let (client, mut server, _handle) = connected("me").await?;
    let (tx, mut rx) = mpsc::unbounded_channel();
    client.on_join(Some("#other"), move |channel| {
        let tx = tx.clone();
        async move {
            let _ = tx.send(channel.name().to_string());
            Ok(())
        }
    });
    let all = client.join_and_wait("#rust")?;

    server.expect("JOIN #rust").await?;
    server.confirm_join("me", "#rust", "me").await?;
    all.await?;
    server.sync("joined").await?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(rx.try_recv().is_err());
    Ok(())
}

#[tokio::test]
async fn test_membership_follows_part_kick_quit_and_nick() -> anyhow::Result<()> {
    let (client, mut server, _handle) = connected("me").await?;
    let joined = client.join_and_wait("#rust")?;
    server.expect("JOIN #rust").await?;
    server
        .confirm_join("me", "#rust", "me alice bob carol dave")
        .await?;
    let channel = joined.await?;

    server.send(":erin!e@host JOIN :#rust").await?;
    server.send(":alice!a@host PART #rust :bye").await?;
    server.send(":op!o@host KICK #rust bob :behave").await?;
    server.send(":carol!c@host QUIT :gone").await?;
    server.send(":dave!d@host NICK :david").await?;
    server.sync("membership").await?;

    let names: Vec<_> = channel
        .members()
        .iter()
        .map(|u| u.name().to_string())
        .collect();
    assert_eq!(names, ["david", "erin", "me"]);
    assert!(client.get_user("dave").is_none());
    assert!(client.get_user("carol").is_none());
    Ok(())
}

#[tokio::test]
async fn test_own_nick_change_is_tracked() -> anyhow::Result<()> {
    let (client, mut server, _handle) = connected("me").await?;
    client.change_nick("me2")?;
    server.expect("NICK me2").await?;
    server.send(":me!bot@client.test NICK :me2").await?;
    server.sync("renamed").await?;
    assert_eq!(client.nick(), "me2");
    Ok(())
}

#[tokio::test]
async fn test_kicked_self_drops_channel() -> anyhow::Result<()> {
    let (client, mut server, _handle) = connected("me").await?;
    let joined = client.join_and_wait("#rust")?;
    server.expect("JOIN #rust").await?;
    server.confirm_join("me", "#rust", "me alice").await?;
    joined.await?;

    server.send(":alice!a@host KICK #rust me :out").await?;
    server.sync("kicked").await?;
    assert!(client.get_channel("#rust").is_none());
    assert!(client.channels().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_part_and_wait_resolves_on_own_echo() -> anyhow::Result<()> {
    let (client, mut server, _handle) = connected("me").await?;
    let joined = client.join_and_wait("#rust")?;
    server.expect("JOIN #rust").await?;
    server.confirm_join("me", "#rust", "me alice").await?;
    let channel = joined.await?;

    let parted = channel.part_and_wait(Some("later"))?;
    server.expect("PART #rust :later").await?;
    // Someone else leaving does not resolve it.
    server.send(":alice!a@host PART #rust").await?;
    server.send(":me!bot@client.test PART #rust :later").await?;
    let echo = tokio::time::timeout(Duration::from_secs(5), parted).await??;
    assert_eq!(echo.prefix.as_deref(), Some("me!bot@client.test"));
    assert!(client.get_channel("#rust").is_none());
    Ok(())
}

#[tokio::test]
async fn test_dropped_await_unregisters_its_handler() -> anyhow::Result<()> {
    let (client, mut server, _handle) = connected("me").await?;
    assert_eq!(client.registry_stats().await?.command, 0);

    let waiting = client.await_command(CommandPattern::new(["TOPIC", "#rust"]));
    assert_eq!(client.registry_stats().await?.command, 1);
    drop(waiting);
    assert_eq!(client.registry_stats().await?.command, 0);

    let waiting = client.await_message(Matcher::any());
    assert_eq!(client.registry_stats().await?.message, 1);
    drop(waiting);
    assert_eq!(client.registry_stats().await?.message, 0);

    let topic = client.await_command("TOPIC");
    server.send(":alice!a@host TOPIC #rust :new topic").await?;
    let msg = tokio::time::timeout(Duration::from_secs(5), topic).await??;
    assert_eq!(msg.trailing.as_deref(), Some("new topic"));
    assert_eq!(client.registry_stats().await?.command, 0);
    Ok(())
}
