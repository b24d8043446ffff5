//! Registration handshake.
//!
//! Installs the temporary command handlers that watch the server's replies
//! and returns the `PASS` (if configured), `NICK` and `USER` burst. The loop
//! writes the burst before it drains the control queue, so nothing sent
//! ahead of `run` can precede it. The handlers are:
//!
//! | Reply               | Action                                        |
//! |---------------------|-----------------------------------------------|
//! | `433` nick in use   | retry with `_` appended, up to the limit      |
//! | `005` ISUPPORT      | adopt `CHANTYPES` and `PREFIX`                |
//! | `001` welcome       | adopt the nick the server confirms            |
//! | `376` / `422`       | remove all of the above, mark `Connected`     |

use asif_proto::{RawMessage, build, isupport, tokens};
use tracing::{debug, info, warn};

use super::Client;
use crate::error::{ClientError, Result};
use crate::handlers::{
    CommandContext, CommandEntry, CommandFn, CommandPattern, Effect, HandlerId, HandlerKind,
    Registry,
};

pub(super) fn begin(client: &Client, commands: &mut Registry<CommandEntry>) -> Vec<String> {
    let config = client.config();
    let nick_in_use = HandlerId::next();
    let features = HandlerId::next();
    let welcome = HandlerId::next();
    let end_of_motd = HandlerId::next();
    let no_motd = HandlerId::next();
    let temporary = [nick_in_use, features, welcome, end_of_motd, no_motd];

    let mut install = |id: HandlerId, command: &str, handler: CommandFn| {
        commands.insert(
            id,
            CommandEntry {
                pattern: CommandPattern::new([command]),
                handler,
            },
        );
    };

    install(
        nick_in_use,
        tokens::ERR_NICKNAMEINUSE,
        nick_retry(config.limits.max_nick_attempts),
    );
    install(features, tokens::RPL_ISUPPORT, Box::new(apply_isupport));
    install(welcome, tokens::RPL_WELCOME, Box::new(adopt_welcome_nick));
    install(end_of_motd, tokens::RPL_ENDOFMOTD, finish(temporary));
    install(no_motd, tokens::ERR_NOMOTD, finish(temporary));

    let identity = &config.identity;
    let mut burst = Vec::with_capacity(3);
    if let Some(password) = config.server.password.as_deref() {
        burst.push(build(&[tokens::PASS, password], None, None));
    }
    burst.push(build(&[tokens::NICK, identity.nick.as_str()], None, None));
    burst.push(build(
        &[tokens::USER, identity.user.as_str(), "0", "*"],
        None,
        Some(&identity.realname),
    ));
    debug!(nick = %identity.nick, user = %identity.user, "Registration prepared");
    burst
}

/// Append `_` and retry, failing once `max_attempts` nicks were refused.
fn nick_retry(max_attempts: u32) -> CommandFn {
    let mut attempts: u32 = 1;
    Box::new(move |_, ctx| {
        let client = ctx.client();
        let current = client.nick();
        if attempts >= max_attempts {
            return Err(ClientError::NickRetriesExhausted {
                nick: current,
                attempts,
            });
        }
        attempts += 1;

        let next = format!("{current}_");
        warn!(nick = %current, retry = %next, attempt = attempts, "Nickname in use");
        client.roster().write().set_own_nick(next.as_str());
        client.send_raw(build(&[tokens::NICK, next.as_str()], None, None))
    })
}

fn apply_isupport(msg: &RawMessage, ctx: &mut CommandContext<'_>) -> Result<()> {
    // params: 005 <nick> TOKEN[=VALUE]... :are supported by this server
    let Some(announced) = msg.params.get(2..) else {
        return Ok(());
    };
    let features = isupport::parse_params(announced);
    let mut roster = ctx.client().roster().write();
    if let Some(chantypes) = features.chantypes() {
        debug!(chantypes = %chantypes, "Server channel types");
        roster.set_chantypes(chantypes);
    }
    if let Some(prefix) = features.prefix() {
        debug!(modes = %prefix.modes, prefixes = %prefix.prefixes, "Server membership prefixes");
        roster.set_prefixes(prefix);
    }
    Ok(())
}

fn adopt_welcome_nick(msg: &RawMessage, ctx: &mut CommandContext<'_>) -> Result<()> {
    if let Some(nick) = msg.param(1) {
        ctx.client().roster().write().set_own_nick(nick);
        info!(nick = %nick, "Welcome received");
    }
    Ok(())
}

fn finish(temporary: [HandlerId; 5]) -> CommandFn {
    Box::new(move |_, ctx| {
        for id in temporary {
            ctx.remove(HandlerKind::Command, id);
        }
        ctx.push(Effect::Registered);
        Ok(())
    })
}
