//! Who may do what in a ticket channel.

use std::collections::HashSet;

use serenity::model::Permissions;

use crate::db::model::guild::{GuildConfig, TicketPermissions};
use crate::platform::{panel::Panel, Overwrite, OverwriteTarget};

/// Member triggering an interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoker {
    pub user_id: u64,
    pub username: String,
    pub roles: Vec<u64>,
    /// Holds the administrator permission in the guild.
    pub administrator: bool,
}

impl Invoker {
    pub fn mention(&self) -> String {
        format!("<@{}>", self.user_id)
    }
}

/// Administrators, configured staff users and holders of a configured staff role.
pub fn is_staff(config: &GuildConfig, invoker: &Invoker) -> bool {
    invoker.administrator
        || config.staffs.users.contains(&invoker.user_id)
        || invoker.roles.iter().any(|r| config.staffs.roles.contains(r))
}

/// Permissions of the opener, and of members added to a ticket.
pub fn member_permissions(perms: &TicketPermissions) -> Permissions {
    let mut allow = Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES | Permissions::READ_MESSAGE_HISTORY;
    if perms.attachments {
        allow |= Permissions::ATTACH_FILES;
    }
    if perms.links {
        allow |= Permissions::EMBED_LINKS;
    }
    if perms.reactions {
        allow |= Permissions::ADD_REACTIONS;
    }
    allow
}

pub fn staff_permissions() -> Permissions {
    Permissions::VIEW_CHANNEL
        | Permissions::SEND_MESSAGES
        | Permissions::READ_MESSAGE_HISTORY
        | Permissions::ADD_REACTIONS
        | Permissions::ATTACH_FILES
        | Permissions::EMBED_LINKS
}

/// Overwrites of a new ticket channel.
///
/// Everyone is denied the channel, then the opener, staff roles, staff users and the roles
/// mentioned on open are let in. Each target appears once, first entry wins.
pub fn ticket_overwrites(guild_id: u64, opener: u64, config: &GuildConfig, panel: &Panel) -> Vec<Overwrite> {
    let mut seen = HashSet::new();
    let mut overwrites = Vec::new();
    let mut push = |target: OverwriteTarget, allow: Permissions, deny: Permissions| {
        if target.id() != 0 && seen.insert(target.id()) {
            overwrites.push(Overwrite { target, allow, deny });
        }
    };
    // @everyone shares the guild id
    push(OverwriteTarget::Role(guild_id), Permissions::empty(), Permissions::VIEW_CHANNEL);
    push(OverwriteTarget::Member(opener), member_permissions(&config.ticket_permissions), Permissions::empty());
    for role in &config.staffs.roles {
        push(OverwriteTarget::Role(*role), staff_permissions(), Permissions::empty());
    }
    for user in &config.staffs.users {
        push(OverwriteTarget::Member(*user), staff_permissions(), Permissions::empty());
    }
    for role in &panel.mention_on_open {
        push(OverwriteTarget::Role(*role), staff_permissions(), Permissions::empty());
    }
    overwrites
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::model::guild::Staffs;

    fn invoker(user_id: u64, roles: Vec<u64>) -> Invoker {
        Invoker { user_id, username: "someone".into(), roles, administrator: false }
    }

    fn staffed() -> GuildConfig {
        GuildConfig {
            staffs: Staffs { roles: vec![50], users: vec![60] },
            ..Default::default()
        }
    }

    #[test]
    fn staff_detection() {
        let config = staffed();
        assert!(is_staff(&config, &invoker(60, vec![])));
        assert!(is_staff(&config, &invoker(1, vec![9, 50])));
        assert!(!is_staff(&config, &invoker(1, vec![9])));
        assert!(is_staff(&config, &Invoker { administrator: true, ..invoker(1, vec![]) }));
    }

    #[test]
    fn opener_permissions_follow_config() {
        let all = member_permissions(&TicketPermissions::default());
        assert!(all.contains(Permissions::ATTACH_FILES | Permissions::EMBED_LINKS | Permissions::ADD_REACTIONS));
        let restricted = member_permissions(&TicketPermissions { attachments: false, links: false, reactions: true });
        assert!(restricted.contains(Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES | Permissions::ADD_REACTIONS));
        assert!(!restricted.intersects(Permissions::ATTACH_FILES | Permissions::EMBED_LINKS));
    }

    #[test]
    fn overwrites_are_deduplicated() {
        let mut config = staffed();
        // the opener is also a staff user, and a staff role is mentioned on open
        config.staffs.users.push(7);
        let panel = Panel { mention_on_open: vec![50, 70], ..Default::default() };
        let overwrites = ticket_overwrites(1, 7, &config, &panel);
        let targets: Vec<OverwriteTarget> = overwrites.iter().map(|o| o.target).collect();
        assert_eq!(targets, vec![
            OverwriteTarget::Role(1),
            OverwriteTarget::Member(7),
            OverwriteTarget::Role(50),
            OverwriteTarget::Member(60),
            OverwriteTarget::Role(70),
        ]);
        assert_eq!(overwrites[0].deny, Permissions::VIEW_CHANNEL);
        assert_eq!(overwrites[1].allow, member_permissions(&config.ticket_permissions));
    }
}
