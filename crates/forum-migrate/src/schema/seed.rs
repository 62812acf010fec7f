//! Baseline rows of a freshly created destination.
//!
//! Group ids 0..=4 are reserved by the destination product: 0 marks
//! unverified accounts (no row), 1 administrators, 2 moderators, 3 guests,
//! 4 members. User id 1 is the guest account.

use super::destination::DESTINATION_REVISION;
use crate::core::Row;

pub const GROUP_UNVERIFIED: i64 = 0;
pub const GROUP_ADMIN: i64 = 1;
pub const GROUP_MOD: i64 = 2;
pub const GROUP_GUEST: i64 = 3;
pub const GROUP_MEMBER: i64 = 4;

/// The guest account id in the destination.
pub const GUEST_USER_ID: i64 = 1;

/// Reserved destination group ids that are seeded and never inserted.
pub const RESERVED_GROUPS: [i64; 4] = [GROUP_ADMIN, GROUP_MOD, GROUP_GUEST, GROUP_MEMBER];

/// The four reserved groups.
pub fn groups() -> Vec<Row> {
    let staff = |id: i64, title: &str, user_title: &str, moderator: i64| {
        Row::new()
            .with("g_id", id)
            .with("g_title", title)
            .with("g_user_title", user_title)
            .with("g_moderator", moderator)
            .with("g_mod_edit_users", moderator)
            .with("g_mod_rename_users", moderator)
            .with("g_mod_change_passwords", moderator)
            .with("g_mod_promote_users", moderator)
            .with("g_mod_ban_users", moderator)
            .with("g_post_flood", 0)
            .with("g_search_flood", 0)
            .with("g_email_flood", 0)
            .with("g_report_flood", 0)
            .with("g_pm_limit", 0)
            .with("g_sig_length", 10000)
            .with("g_sig_lines", 255)
            .with("g_up_ext_allow", 1)
            .with("g_up_size_kb", 8192)
            .with("g_up_limit_mb", 1000)
    };

    vec![
        staff(GROUP_ADMIN, "Administrators", "Administrator", 0),
        staff(GROUP_MOD, "Moderators", "Moderator", 1),
        Row::new()
            .with("g_id", GROUP_GUEST)
            .with("g_title", "Guests")
            .with("g_post_replies", 0)
            .with("g_post_topics", 0)
            .with("g_edit_posts", 0)
            .with("g_delete_posts", 0)
            .with("g_delete_topics", 0)
            .with("g_set_title", 0)
            .with("g_send_email", 0)
            .with("g_pm", 0)
            .with("g_pm_limit", 0)
            .with("g_search_flood", 60),
        Row::new()
            .with("g_id", GROUP_MEMBER)
            .with("g_title", "Members")
            .with("g_set_title", 0)
            .with("g_post_flood", 60)
            .with("g_pm_limit", 100),
    ]
}

/// The guest account.
pub fn guest_user() -> Row {
    Row::new()
        .with("id", GUEST_USER_ID)
        .with("group_id", GROUP_GUEST)
        .with("username", "Guest")
        .with("username_normal", "guest")
        .with("password", "Guest")
        .with("email", "")
        .with("email_normal", "")
        .with("language", "en")
        .with("locale", "en")
        .with("style", "ForkBB")
        .with("u_pm", 0)
}

/// Default smilies.
pub fn smilies() -> Vec<Row> {
    [
        (":)", "smile.png"),
        ("=)", "smile.png"),
        (":|", "neutral.png"),
        ("=|", "neutral.png"),
        (":(", "sad.png"),
        ("=(", "sad.png"),
        (":D", "big_smile.png"),
        ("=D", "big_smile.png"),
        (":o", "yikes.png"),
        (":O", "yikes.png"),
        (";)", "wink.png"),
        (":/", "hmm.png"),
        (":P", "tongue.png"),
        (":p", "tongue.png"),
        (":lol:", "lol.png"),
        (":mad:", "mad.png"),
        (":rolleyes:", "roll.png"),
        (":cool:", "cool.png"),
    ]
    .iter()
    .enumerate()
    .map(|(pos, (code, image))| {
        Row::new()
            .with("sm_code", *code)
            .with("sm_image", *image)
            .with("sm_position", pos as i64)
    })
    .collect()
}

/// Default bbcode set.
pub fn bbcode() -> Vec<Row> {
    [
        ("ROOT", 0, 0),
        ("code", 0, 0),
        ("b", 1, 1),
        ("i", 1, 1),
        ("u", 1, 1),
        ("s", 1, 1),
        ("del", 1, 1),
        ("ins", 1, 1),
        ("em", 1, 1),
        ("color", 1, 1),
        ("colour", 1, 1),
        ("background", 1, 1),
        ("size", 1, 1),
        ("right", 1, 1),
        ("center", 1, 1),
        ("justify", 1, 1),
        ("mono", 1, 1),
        ("font", 1, 1),
        ("email", 1, 1),
        ("url", 0, 0),
        ("img", 0, 0),
        ("hr", 1, 1),
        ("quote", 0, 0),
        ("list", 0, 0),
        ("*", 0, 0),
        ("table", 1, 1),
        ("spoiler", 1, 1),
    ]
    .iter()
    .map(|(tag, edit, delete)| {
        let structure = serde_json::json!({
            "tag": tag,
            "type": if *tag == "ROOT" { "block" } else { "inline" },
            "handler": format!("bb_{}", tag.trim_start_matches('*')),
        });
        Row::new()
            .with("bb_tag", *tag)
            .with("bb_edit", *edit as i64)
            .with("bb_delete", *delete as i64)
            .with("bb_structure", structure.to_string())
    })
    .collect()
}

/// Default configuration of the destination product.
///
/// Source drivers overlay their own values on this list; keys that the
/// source does not know keep these defaults.
pub fn config() -> Vec<(&'static str, String)> {
    let mut list: Vec<(&'static str, String)> = vec![
        ("i_fork_revision", DESTINATION_REVISION.to_string()),
        ("o_board_title", "My ForkBB forum".into()),
        ("o_board_desc", "".into()),
        ("o_default_timezone", "UTC".into()),
        ("i_timeout_visit", "3600".into()),
        ("i_timeout_online", "900".into()),
        ("i_redirect_delay", "1".into()),
        ("b_show_user_info", "1".into()),
        ("b_show_post_count", "1".into()),
        ("b_smilies", "1".into()),
        ("b_smilies_sig", "1".into()),
        ("b_make_links", "1".into()),
        ("o_default_lang", "en".into()),
        ("o_default_style", "ForkBB".into()),
        ("i_default_user_group", "4".into()),
        ("i_topic_review", "15".into()),
        ("i_disp_topics_default", "30".into()),
        ("i_disp_posts_default", "25".into()),
        ("i_indent_num_spaces", "4".into()),
        ("b_quickpost", "1".into()),
        ("b_users_online", "1".into()),
        ("b_censoring", "0".into()),
        ("b_show_dot", "0".into()),
        ("b_topic_views", "1".into()),
        ("o_additional_navlinks", "".into()),
        ("i_report_method", "0".into()),
        ("b_regs_report", "0".into()),
        ("i_default_email_setting", "2".into()),
        ("o_mailing_list", "".into()),
        ("b_avatars", "1".into()),
        ("o_avatars_dir", "/img/avatars".into()),
        ("i_avatars_width", "60".into()),
        ("i_avatars_height", "60".into()),
        ("i_avatars_size", "10240".into()),
        ("o_admin_email", "".into()),
        ("o_webmaster_email", "".into()),
        ("b_forum_subscriptions", "1".into()),
        ("b_topic_subscriptions", "1".into()),
        ("o_smtp_host", "".into()),
        ("o_smtp_user", "".into()),
        ("o_smtp_pass", "".into()),
        ("b_smtp_ssl", "0".into()),
        ("b_regs_allow", "1".into()),
        ("b_regs_verify", "1".into()),
        ("b_announcement", "0".into()),
        ("o_announcement_message", "".into()),
        ("b_rules", "0".into()),
        ("o_rules_message", "".into()),
        ("b_maintenance", "0".into()),
        ("o_maintenance_message", "".into()),
        ("i_feed_type", "2".into()),
        ("i_feed_ttl", "0".into()),
        ("b_message_bbcode", "1".into()),
        ("b_message_img_tag", "1".into()),
        ("b_message_all_caps", "1".into()),
        ("b_subject_all_caps", "1".into()),
        ("b_sig_all_caps", "1".into()),
        ("b_sig_bbcode", "1".into()),
        ("b_sig_img_tag", "0".into()),
        ("i_sig_length", "400".into()),
        ("i_sig_lines", "4".into()),
        ("b_allow_banned_email", "1".into()),
        ("b_allow_dupe_email", "0".into()),
        ("b_force_guest_email", "1".into()),
        ("b_pm", "1".into()),
        ("b_poll_enabled", "0".into()),
        ("i_poll_max_questions", "3".into()),
        ("i_poll_max_fields", "20".into()),
        ("i_poll_time", "60".into()),
        ("i_poll_term", "3".into()),
        ("b_oauth_allow", "0".into()),
    ];
    list.sort_by(|a, b| a.0.cmp(b.0));
    list
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::table;

    #[test]
    fn test_seed_rows_fit_their_tables() {
        let groups_def = table("groups").unwrap();
        for row in groups() {
            for col in row.columns() {
                assert!(groups_def.column(col).is_some(), "groups.{}", col);
            }
        }
        let users_def = table("users").unwrap();
        for col in guest_user().columns() {
            assert!(users_def.column(col).is_some(), "users.{}", col);
        }
    }

    #[test]
    fn test_smilie_codes_are_unique() {
        let rows = smilies();
        let mut codes: Vec<_> = rows.iter().map(|r| r.text("sm_code")).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), rows.len());
    }

    #[test]
    fn test_config_carries_revision() {
        let cfg = config();
        let rev = cfg.iter().find(|(k, _)| *k == "i_fork_revision").unwrap();
        assert_eq!(rev.1, DESTINATION_REVISION.to_string());
    }
}
