//! The catalogue of migrated entities.
//!
//! Each [`Entity`] is one step of the migration and owns one destination
//! table. Its static description says how rows are paged, how they are
//! written and which foreign keys are resolved when the entity finishes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MigrateError;
use crate::schema::seed::{GUEST_USER_ID, RESERVED_GROUPS};

/// How an entity obtains its rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Paginated source to destination copy.
    Copy,
    /// No rows of its own; recomputes derived columns of an earlier table.
    Again,
    /// Synthetic rows produced in one batch.
    FixedList,
}

/// Meaning of the cursor for an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorKind {
    /// Old primary key value.
    Id,
    /// Row offset in primary key order.
    Ordinal,
}

/// How rows reach the destination table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePolicy {
    /// Plain insert, tracked through `id_old`.
    Insert,
    /// Insert, except rows addressed to one of the seeded ids, which update
    /// that row in place.
    Reserved(&'static [i64]),
    /// Insert or update on a natural key.
    Upsert(&'static [&'static str]),
    /// Insert, skipping rows whose primary key already exists.
    InsertIgnore,
    /// Nothing is written.
    None,
}

/// What happens to a reference that cannot be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnOrphan {
    /// Store 0.
    Zero,
    /// Delete the referencing row.
    Delete,
}

/// One foreign key column resolved in the entity's finalize pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Remap {
    pub column: &'static str,
    pub target: Entity,
    pub on_orphan: OnOrphan,
    /// Values that mean the same thing in both databases.
    pub preserve: &'static [i64],
}

const fn zero(column: &'static str, target: Entity) -> Remap {
    Remap {
        column,
        target,
        on_orphan: OnOrphan::Zero,
        preserve: &[],
    }
}

const fn user(column: &'static str) -> Remap {
    Remap {
        column,
        target: Entity::Users,
        on_orphan: OnOrphan::Zero,
        preserve: &[GUEST_USER_ID],
    }
}

const fn delete(column: &'static str, target: Entity) -> Remap {
    Remap {
        column,
        target,
        on_orphan: OnOrphan::Delete,
        preserve: &[],
    }
}

/// A migrated entity, in plan order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Categories,
    Groups,
    Users,
    Forums,
    ForumPerms,
    Censoring,
    Config,
    Smilies,
    Bbcode,
    Topics,
    Posts,
    TopicsAgain,
    ForumsAgain,
    ForumSubscriptions,
    TopicSubscriptions,
    Bans,
    Reports,
    Poll,
    PollVoted,
    PmTopics,
    PmPosts,
    PmTopicsAgain,
    PmBlock,
    Attachments,
    AttachmentsPos,
    AttachmentsPosPm,
    Providers,
    ProvidersUsers,
    MarkOfForum,
    MarkOfTopic,
    UsersAgain,
}

impl Entity {
    /// Every entity in plan order.
    pub const ALL: [Entity; 31] = [
        Entity::Categories,
        Entity::Groups,
        Entity::Users,
        Entity::Forums,
        Entity::ForumPerms,
        Entity::Censoring,
        Entity::Config,
        Entity::Smilies,
        Entity::Bbcode,
        Entity::Topics,
        Entity::Posts,
        Entity::TopicsAgain,
        Entity::ForumsAgain,
        Entity::ForumSubscriptions,
        Entity::TopicSubscriptions,
        Entity::Bans,
        Entity::Reports,
        Entity::Poll,
        Entity::PollVoted,
        Entity::PmTopics,
        Entity::PmPosts,
        Entity::PmTopicsAgain,
        Entity::PmBlock,
        Entity::Attachments,
        Entity::AttachmentsPos,
        Entity::AttachmentsPosPm,
        Entity::Providers,
        Entity::ProvidersUsers,
        Entity::MarkOfForum,
        Entity::MarkOfTopic,
        Entity::UsersAgain,
    ];

    /// Stable snake_case name.
    pub fn name(self) -> &'static str {
        match self {
            Entity::Categories => "categories",
            Entity::Groups => "groups",
            Entity::Users => "users",
            Entity::Forums => "forums",
            Entity::ForumPerms => "forum_perms",
            Entity::Censoring => "censoring",
            Entity::Config => "config",
            Entity::Smilies => "smilies",
            Entity::Bbcode => "bbcode",
            Entity::Topics => "topics",
            Entity::Posts => "posts",
            Entity::TopicsAgain => "topics_again",
            Entity::ForumsAgain => "forums_again",
            Entity::ForumSubscriptions => "forum_subscriptions",
            Entity::TopicSubscriptions => "topic_subscriptions",
            Entity::Bans => "bans",
            Entity::Reports => "reports",
            Entity::Poll => "poll",
            Entity::PollVoted => "poll_voted",
            Entity::PmTopics => "pm_topics",
            Entity::PmPosts => "pm_posts",
            Entity::PmTopicsAgain => "pm_topics_again",
            Entity::PmBlock => "pm_block",
            Entity::Attachments => "attachments",
            Entity::AttachmentsPos => "attachments_pos",
            Entity::AttachmentsPosPm => "attachments_pos_pm",
            Entity::Providers => "providers",
            Entity::ProvidersUsers => "providers_users",
            Entity::MarkOfForum => "mark_of_forum",
            Entity::MarkOfTopic => "mark_of_topic",
            Entity::UsersAgain => "users_again",
        }
    }

    /// Destination table.
    pub fn table(self) -> &'static str {
        match self {
            Entity::TopicsAgain => "topics",
            Entity::ForumsAgain => "forums",
            Entity::PmTopicsAgain => "pm_topics",
            Entity::UsersAgain => "users",
            other => other.name(),
        }
    }

    pub fn role(self) -> Role {
        match self {
            Entity::TopicsAgain
            | Entity::ForumsAgain
            | Entity::PmTopicsAgain
            | Entity::UsersAgain => Role::Again,
            Entity::Config => Role::FixedList,
            _ => Role::Copy,
        }
    }

    pub fn cursor(self) -> CursorKind {
        match self {
            Entity::ForumPerms
            | Entity::ForumSubscriptions
            | Entity::TopicSubscriptions
            | Entity::Poll
            | Entity::PollVoted
            | Entity::PmBlock
            | Entity::AttachmentsPos
            | Entity::AttachmentsPosPm
            | Entity::Providers
            | Entity::ProvidersUsers
            | Entity::MarkOfForum
            | Entity::MarkOfTopic => CursorKind::Ordinal,
            _ => CursorKind::Id,
        }
    }

    pub fn write_policy(self) -> WritePolicy {
        match self {
            Entity::Groups => WritePolicy::Reserved(&RESERVED_GROUPS),
            Entity::Config => WritePolicy::Upsert(&["conf_name"]),
            Entity::Smilies => WritePolicy::Upsert(&["sm_code"]),
            Entity::Bbcode => WritePolicy::Upsert(&["bb_tag"]),
            Entity::Providers => WritePolicy::Upsert(&["pr_name"]),
            e if e.role() == Role::Again => WritePolicy::None,
            e if e.cursor() == CursorKind::Ordinal => WritePolicy::InsertIgnore,
            _ => WritePolicy::Insert,
        }
    }

    /// Whether rows are tracked through `id_old`.
    pub fn tracks_id_old(self) -> bool {
        matches!(
            self.write_policy(),
            WritePolicy::Insert | WritePolicy::Reserved(_)
        )
    }

    /// Entities that exist only to shape a fresh destination; merge mode
    /// leaves them alone.
    pub fn destination_only(self) -> bool {
        matches!(self, Entity::Config)
    }

    /// Foreign keys resolved when the entity finishes.
    pub fn remaps(self) -> &'static [Remap] {
        const GROUPS: &[Remap] = &[zero("g_promote_next_group", Entity::Groups)];
        const USERS: &[Remap] = &[zero("group_id", Entity::Groups)];
        const FORUMS: &[Remap] = &[
            zero("cat_id", Entity::Categories),
            zero("parent_forum_id", Entity::Forums),
        ];
        const FORUM_PERMS: &[Remap] = &[
            delete("group_id", Entity::Groups),
            delete("forum_id", Entity::Forums),
        ];
        const TOPICS: &[Remap] = &[
            zero("forum_id", Entity::Forums),
            zero("moved_to", Entity::Topics),
            user("poster_id"),
            user("last_poster_id"),
        ];
        const POSTS: &[Remap] = &[
            zero("topic_id", Entity::Topics),
            user("poster_id"),
            user("editor_id"),
        ];
        const FORUM_SUBSCRIPTIONS: &[Remap] = &[
            delete("user_id", Entity::Users),
            delete("forum_id", Entity::Forums),
        ];
        const TOPIC_SUBSCRIPTIONS: &[Remap] = &[
            delete("user_id", Entity::Users),
            delete("topic_id", Entity::Topics),
        ];
        const BANS: &[Remap] = &[user("ban_creator")];
        const REPORTS: &[Remap] = &[
            zero("post_id", Entity::Posts),
            zero("topic_id", Entity::Topics),
            zero("forum_id", Entity::Forums),
            user("reported_by"),
            user("zapped_by"),
        ];
        const POLL: &[Remap] = &[delete("tid", Entity::Topics)];
        const POLL_VOTED: &[Remap] = &[
            delete("tid", Entity::Topics),
            delete("uid", Entity::Users),
        ];
        const PM_TOPICS: &[Remap] = &[user("poster_id"), user("target_id")];
        const PM_POSTS: &[Remap] = &[
            delete("topic_id", Entity::PmTopics),
            user("poster_id"),
        ];
        const PM_BLOCK: &[Remap] = &[
            delete("bl_first_id", Entity::Users),
            delete("bl_second_id", Entity::Users),
        ];
        const ATTACHMENTS: &[Remap] = &[user("uid")];
        const ATTACHMENTS_POS: &[Remap] = &[
            delete("id", Entity::Attachments),
            delete("pid", Entity::Posts),
        ];
        const ATTACHMENTS_POS_PM: &[Remap] = &[
            delete("id", Entity::Attachments),
            delete("pid", Entity::PmPosts),
        ];
        const PROVIDERS_USERS: &[Remap] = &[delete("uid", Entity::Users)];
        const MARK_OF_FORUM: &[Remap] = &[
            delete("uid", Entity::Users),
            delete("fid", Entity::Forums),
        ];
        const MARK_OF_TOPIC: &[Remap] = &[
            delete("uid", Entity::Users),
            delete("tid", Entity::Topics),
        ];

        match self {
            Entity::Groups => GROUPS,
            Entity::Users => USERS,
            Entity::Forums => FORUMS,
            Entity::ForumPerms => FORUM_PERMS,
            Entity::Topics => TOPICS,
            Entity::Posts => POSTS,
            Entity::ForumSubscriptions => FORUM_SUBSCRIPTIONS,
            Entity::TopicSubscriptions => TOPIC_SUBSCRIPTIONS,
            Entity::Bans => BANS,
            Entity::Reports => REPORTS,
            Entity::Poll => POLL,
            Entity::PollVoted => POLL_VOTED,
            Entity::PmTopics => PM_TOPICS,
            Entity::PmPosts => PM_POSTS,
            Entity::PmBlock => PM_BLOCK,
            Entity::Attachments => ATTACHMENTS,
            Entity::AttachmentsPos => ATTACHMENTS_POS,
            Entity::AttachmentsPosPm => ATTACHMENTS_POS_PM,
            Entity::ProvidersUsers => PROVIDERS_USERS,
            Entity::MarkOfForum => MARK_OF_FORUM,
            Entity::MarkOfTopic => MARK_OF_TOPIC,
            _ => &[],
        }
    }

    /// Free-text columns holding usernames, rewritten through the rename map.
    pub fn username_columns(self) -> &'static [&'static str] {
        match self {
            Entity::Forums => &["last_poster"],
            Entity::Topics => &["poster", "last_poster"],
            Entity::Posts => &["poster", "editor"],
            Entity::Bans => &["username"],
            Entity::PmTopics => &["poster", "target"],
            Entity::PmPosts => &["poster"],
            _ => &[],
        }
    }

    /// Display-order column shifted past existing rows in merge mode.
    pub fn position_column(self) -> Option<&'static str> {
        match self {
            Entity::Categories => Some("disp_position"),
            Entity::Smilies => Some("sm_position"),
            _ => None,
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Entity {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Entity::ALL
            .iter()
            .copied()
            .find(|e| e.name() == s)
            .ok_or_else(|| MigrateError::Config(format!("Unknown entity: {}", s)))
    }
}
