//! Name-list gathering after our own JOIN.
//!
//! Two temporary command handlers per join: one records every `353` entry
//! for the channel, the other waits for `366`, removes both and reports the
//! join as complete.

use asif_proto::{RawMessage, tokens};

use crate::handlers::{CommandEntry, CommandPattern, Effect, HandlerId, HandlerKind, Registry};

/// Channel named by a `353` reply.
///
/// `353 <nick> <visibility> <channel> :names`; some servers leave out the
/// visibility marker.
fn names_channel(msg: &RawMessage) -> Option<&str> {
    match msg.param(2) {
        Some(marker) if tokens::NAMES_VISIBILITY.contains(&marker) => msg.param(3),
        other => other,
    }
}

pub(super) fn install(commands: &mut Registry<CommandEntry>, channel: &str, own_nick: &str) {
    let gather = HandlerId::next();
    let end = HandlerId::next();

    let name = channel.to_string();
    commands.insert(
        gather,
        CommandEntry {
            pattern: CommandPattern::new([tokens::RPL_NAMREPLY, own_nick]),
            handler: Box::new(move |msg, ctx| {
                if names_channel(msg) != Some(name.as_str()) {
                    return Ok(());
                }
                let listed = msg.trailing.as_deref().unwrap_or_default();
                let mut roster = ctx.client().roster().write();
                for token in listed.split_whitespace() {
                    roster.add_member(&name, token);
                }
                Ok(())
            }),
        },
    );

    let name = channel.to_string();
    commands.insert(
        end,
        CommandEntry {
            pattern: CommandPattern::new([tokens::RPL_ENDOFNAMES, own_nick, channel]),
            handler: Box::new(move |_, ctx| {
                ctx.remove(HandlerKind::Command, gather);
                ctx.remove_self();
                ctx.push(Effect::JoinCompleted(name.clone()));
                Ok(())
            }),
        },
    );
}
