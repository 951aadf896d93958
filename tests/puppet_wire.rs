//! Puppet sessions against a real TCP socket.

mod common;

use std::sync::Arc;

use common::{TestIrcServer, tcp_context};
use puppetbridge::address::derive_address;
use puppetbridge::config::ChannelLinkTable;
use puppetbridge::irc::SessionOutcome;
use puppetbridge::puppet::{
    CommandData, CommandKind, PuppetCommand, PuppetContext, PuppetSession, UserId,
};
use tokio::sync::mpsc;

fn puppet_context(port: u16) -> PuppetContext {
    let (direct, _rx) = mpsc::unbounded_channel();
    PuppetContext {
        irc: tcp_context(port),
        links: Arc::new(ChannelLinkTable::new([
            (1, "#general".to_string()),
            (2, "#dev".to_string()),
        ])),
        direct,
    }
}

fn command(id: UserId, kind: CommandKind, data: Option<CommandData>) -> PuppetCommand {
    PuppetCommand {
        nick: "Ann".into(),
        display_name: "Ann".into(),
        irc_nick: "Ann[ann]".into(),
        name: "ann".into(),
        id,
        channel: Some(1),
        command: kind,
        data,
        timestamp: 0.0,
        target: None,
    }
}

#[tokio::test]
async fn test_webirc_precedes_registration() -> anyhow::Result<()> {
    let server = TestIrcServer::bind().await?;
    let ctx = puppet_context(server.port());
    let session = PuppetSession::create(9, "Ann[ann]_d2".into(), [1, 2], &ctx);

    let mut conn = server.accept().await?;
    let registration = conn.registration().await?;
    let commands: Vec<&str> = registration.iter().map(|m| m.command.as_str()).collect();
    assert_eq!(commands, vec!["WEBIRC", "NICK", "USER"]);
    assert_eq!(registration[0].param(0), Some("gatewaypw"));
    assert_eq!(
        registration[0].param(3),
        Some(derive_address("Ann[ann]_d2").to_string().as_str())
    );
    assert_eq!(registration[1].param(0), Some("Ann[ann]_d2"));

    ctx.irc.shutdown.cancel();
    assert_eq!(session.join().await?, SessionOutcome::Shutdown);
    Ok(())
}

#[tokio::test]
async fn test_welcome_triggers_mode_and_joins() -> anyhow::Result<()> {
    let server = TestIrcServer::bind().await?;
    let ctx = puppet_context(server.port());
    let session = PuppetSession::create(9, "Ann[ann]_d2".into(), [1, 2], &ctx);

    let mut conn = server.accept().await?;
    conn.registration().await?;

    // Queued before the welcome; must be delivered after the joins.
    session.enqueue(command(
        9,
        CommandKind::Send,
        Some(CommandData::Text("hello from discord".into())),
    ))?;
    conn.welcome("Ann[ann]_d2").await?;

    let lines: Vec<String> = conn
        .recv_until("PRIVMSG")
        .await?
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(
        lines,
        vec![
            "MODE Ann[ann]_d2 +R",
            "JOIN #general",
            "JOIN #dev",
            "PRIVMSG #general :hello from discord",
        ]
    );

    session.enqueue(command(9, CommandKind::Die, None))?;
    let quit = conn.recv().await?;
    assert_eq!(quit.to_string(), "QUIT :has left discord");
    assert_eq!(session.join().await?, SessionOutcome::Quit);
    Ok(())
}

#[tokio::test]
async fn test_ping_answered_and_collision_recovered() -> anyhow::Result<()> {
    let server = TestIrcServer::bind().await?;
    let ctx = puppet_context(server.port());
    let session = PuppetSession::create(9, "Ann[ann]_d2".into(), [], &ctx);

    let mut conn = server.accept().await?;
    conn.registration().await?;

    conn.send_raw("PING :irc.test").await?;
    assert_eq!(conn.recv().await?.to_string(), "PONG irc.test");

    conn.send_raw(":irc.test 433 * Ann[ann]_d2 :Nickname is already in use")
        .await?;
    assert_eq!(conn.recv().await?.to_string(), "NICK _Ann[ann]_d2");

    conn.welcome("_Ann[ann]_d2").await?;
    assert_eq!(conn.recv().await?.to_string(), "MODE _Ann[ann]_d2 +R");

    ctx.irc.shutdown.cancel();
    assert_eq!(conn.recv().await?.command, "QUIT");
    assert_eq!(session.join().await?, SessionOutcome::Shutdown);
    Ok(())
}
