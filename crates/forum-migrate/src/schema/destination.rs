//! The destination forum schema.
//!
//! All timestamps are unix seconds in `INT` columns. Every column is
//! `NOT NULL`; writers fill missing values from the defaults declared here.
//! Foreign-key columns are signed so that pending references can be stored
//! negated until their entity's finalize pass resolves them.

use super::{
    big, index, int, medium_text, serial, small, text, tiny, unique, varchar, TableDef,
};

/// Schema revision written into `config.i_fork_revision` of a new destination.
pub const DESTINATION_REVISION: i64 = 68;

/// Every destination table, in creation order.
pub const TABLES: &[TableDef] = &[
    TableDef {
        name: "categories",
        columns: &[
            serial("id"),
            varchar("cat_name", 80),
            int("disp_position", 0),
        ],
        primary_key: &["id"],
        indexes: &[],
    },
    TableDef {
        name: "groups",
        columns: &[
            serial("g_id"),
            varchar("g_title", 50),
            varchar("g_user_title", 50),
            int("g_promote_min_posts", 0),
            int("g_promote_next_group", 0),
            tiny("g_moderator", 0),
            tiny("g_mod_edit_users", 0),
            tiny("g_mod_rename_users", 0),
            tiny("g_mod_change_passwords", 0),
            tiny("g_mod_promote_users", 0),
            tiny("g_mod_ban_users", 0),
            tiny("g_read_board", 1),
            tiny("g_view_users", 1),
            tiny("g_post_replies", 1),
            tiny("g_post_topics", 1),
            tiny("g_edit_posts", 1),
            tiny("g_delete_posts", 1),
            tiny("g_delete_topics", 1),
            tiny("g_set_title", 1),
            tiny("g_search", 1),
            tiny("g_search_users", 1),
            tiny("g_send_email", 1),
            small("g_post_flood", 30),
            small("g_search_flood", 30),
            small("g_email_flood", 60),
            small("g_report_flood", 60),
            int("g_deledit_interval", 0),
            tiny("g_pm", 1),
            int("g_pm_limit", 100),
            small("g_sig_length", 400),
            tiny("g_sig_lines", 4),
            tiny("g_up_ext_allow", 0),
            int("g_up_size_kb", 0),
            int("g_up_limit_mb", 0),
        ],
        primary_key: &["g_id"],
        indexes: &[],
    },
    TableDef {
        name: "users",
        columns: &[
            serial("id"),
            int("group_id", 0),
            varchar("username", 190),
            varchar("username_normal", 190),
            varchar("password", 255),
            varchar("email", 190),
            varchar("email_normal", 190),
            tiny("email_confirmed", 0),
            varchar("title", 50),
            varchar("realname", 40),
            tiny("gender", 0),
            varchar("url", 100),
            varchar("location", 30),
            text("signature"),
            tiny("disp_topics", 0),
            tiny("disp_posts", 0),
            tiny("email_setting", 1),
            tiny("notify_with_post", 0),
            tiny("auto_notify", 0),
            tiny("show_smilies", 1),
            tiny("show_img", 1),
            tiny("show_img_sig", 1),
            tiny("show_avatars", 1),
            tiny("show_sig", 1),
            varchar("timezone", 255),
            tiny("dst", 0),
            tiny("time_format", 0),
            tiny("date_format", 0),
            varchar("language", 25),
            varchar("locale", 20),
            varchar("style", 25),
            int("num_posts", 0),
            int("num_topics", 0),
            int("last_post", 0),
            int("last_search", 0),
            int("last_email_sent", 0),
            int("last_report_sent", 0),
            int("registered", 0),
            varchar("registration_ip", 45),
            int("last_visit", 0),
            varchar("admin_note", 30),
            varchar("activate_string", 80),
            tiny("u_pm", 1),
            tiny("u_pm_notify", 0),
            int("u_pm_flash", 0),
            int("u_pm_num_new", 0),
            int("u_pm_num_all", 0),
            int("u_pm_last_post", 0),
            varchar("avatar", 30),
            big("u_mark_all_read"),
        ],
        primary_key: &["id"],
        indexes: &[
            unique("username_normal_idx", &["username_normal"]),
            unique("email_normal_idx", &["email_normal"]),
            index("registered_idx", &["registered"]),
            index("group_id_idx", &["group_id"]),
        ],
    },
    TableDef {
        name: "forums",
        columns: &[
            serial("id"),
            varchar("forum_name", 80),
            varchar("friendly_name", 80),
            text("forum_desc"),
            varchar("redirect_url", 255),
            text("moderators"),
            int("num_topics", 0),
            int("num_posts", 0),
            int("last_post", 0),
            int("last_post_id", 0),
            varchar("last_poster", 190),
            int("last_poster_id", 0),
            varchar("last_topic", 255),
            tiny("sort_by", 0),
            int("disp_position", 0),
            int("cat_id", 0),
            tiny("no_sum_mess", 0),
            int("parent_forum_id", 0),
            tiny("use_solution", 0),
            tiny("premoderation", 0),
        ],
        primary_key: &["id"],
        indexes: &[],
    },
    TableDef {
        name: "forum_perms",
        columns: &[
            int("group_id", 0),
            int("forum_id", 0),
            tiny("read_forum", 1),
            tiny("post_replies", 1),
            tiny("post_topics", 1),
        ],
        primary_key: &["group_id", "forum_id"],
        indexes: &[],
    },
    TableDef {
        name: "censoring",
        columns: &[
            serial("id"),
            varchar("search_for", 60),
            varchar("replace_with", 60),
        ],
        primary_key: &["id"],
        indexes: &[],
    },
    TableDef {
        name: "config",
        columns: &[varchar("conf_name", 190), text("conf_value")],
        primary_key: &["conf_name"],
        indexes: &[],
    },
    TableDef {
        name: "smilies",
        columns: &[
            serial("id"),
            varchar("sm_image", 40),
            varchar("sm_code", 20),
            small("sm_position", 100),
        ],
        primary_key: &["id"],
        indexes: &[unique("sm_code_idx", &["sm_code"])],
    },
    TableDef {
        name: "bbcode",
        columns: &[
            serial("id"),
            varchar("bb_tag", 11),
            tiny("bb_edit", 1),
            tiny("bb_delete", 1),
            medium_text("bb_structure"),
        ],
        primary_key: &["id"],
        indexes: &[unique("bb_tag_idx", &["bb_tag"])],
    },
    TableDef {
        name: "topics",
        columns: &[
            serial("id"),
            varchar("poster", 190),
            int("poster_id", 0),
            varchar("subject", 255),
            int("posted", 0),
            int("first_post_id", 0),
            int("last_post", 0),
            int("last_post_id", 0),
            varchar("last_poster", 190),
            int("last_poster_id", 0),
            int("num_views", 0),
            int("num_replies", 0),
            tiny("closed", 0),
            tiny("sticky", 0),
            tiny("stick_fp", 0),
            int("moved_to", 0),
            int("forum_id", 0),
            tiny("poll_type", 0),
            int("poll_time", 0),
            int("poll_term", 0),
            int("poll_kol", 0),
            int("solution", 0),
            int("solution_time", 0),
        ],
        primary_key: &["id"],
        indexes: &[
            index("forum_id_idx", &["forum_id"]),
            index("moved_to_idx", &["moved_to"]),
            index("last_post_idx", &["last_post"]),
        ],
    },
    TableDef {
        name: "posts",
        columns: &[
            serial("id"),
            varchar("poster", 190),
            int("poster_id", 1),
            varchar("poster_ip", 45),
            varchar("poster_email", 190),
            medium_text("message"),
            tiny("hide_smilies", 0),
            tiny("edit_post", 0),
            int("posted", 0),
            int("edited", 0),
            varchar("editor", 190),
            int("editor_id", 0),
            varchar("user_agent", 255),
            int("topic_id", 0),
        ],
        primary_key: &["id"],
        indexes: &[
            index("topic_id_idx", &["topic_id", "posted"]),
            index("poster_id_idx", &["poster_id"]),
        ],
    },
    TableDef {
        name: "forum_subscriptions",
        columns: &[int("user_id", 0), int("forum_id", 0)],
        primary_key: &["user_id", "forum_id"],
        indexes: &[],
    },
    TableDef {
        name: "topic_subscriptions",
        columns: &[int("user_id", 0), int("topic_id", 0)],
        primary_key: &["user_id", "topic_id"],
        indexes: &[index("topic_id_idx", &["topic_id"])],
    },
    TableDef {
        name: "bans",
        columns: &[
            serial("id"),
            varchar("username", 190),
            varchar("ip", 255),
            varchar("email", 190),
            varchar("message", 255),
            int("expire", 0),
            int("ban_creator", 0),
        ],
        primary_key: &["id"],
        indexes: &[index("username_idx", &["username"])],
    },
    TableDef {
        name: "reports",
        columns: &[
            serial("id"),
            int("post_id", 0),
            int("topic_id", 0),
            int("forum_id", 0),
            int("reported_by", 0),
            int("created", 0),
            text("message"),
            int("zapped", 0),
            int("zapped_by", 0),
        ],
        primary_key: &["id"],
        indexes: &[index("zapped_idx", &["zapped"])],
    },
    TableDef {
        name: "poll",
        columns: &[
            int("tid", 0),
            tiny("question_id", 0),
            tiny("field_id", 0),
            tiny("qna_type", 0),
            varchar("qna_text", 255),
            int("votes", 0),
        ],
        primary_key: &["tid", "question_id", "field_id"],
        indexes: &[],
    },
    TableDef {
        name: "poll_voted",
        columns: &[int("tid", 0), int("uid", 0), varchar("rez", 255)],
        primary_key: &["tid", "uid"],
        indexes: &[],
    },
    TableDef {
        name: "pm_topics",
        columns: &[
            serial("id"),
            varchar("subject", 255),
            varchar("poster", 190),
            int("poster_id", 0),
            tiny("poster_status", 0),
            int("poster_visit", 0),
            varchar("target", 190),
            int("target_id", 0),
            tiny("target_status", 0),
            int("target_visit", 0),
            int("num_replies", 0),
            int("first_post_id", 0),
            int("last_post", 0),
            int("last_post_id", 0),
            int("last_number", 0),
        ],
        primary_key: &["id"],
        indexes: &[
            index("poster_id_idx", &["poster_id", "poster_status"]),
            index("target_id_idx", &["target_id", "target_status"]),
        ],
    },
    TableDef {
        name: "pm_posts",
        columns: &[
            serial("id"),
            varchar("poster", 190),
            int("poster_id", 0),
            varchar("poster_ip", 45),
            medium_text("message"),
            tiny("hide_smilies", 0),
            int("posted", 0),
            int("edited", 0),
            int("topic_id", 0),
        ],
        primary_key: &["id"],
        indexes: &[index("topic_id_idx", &["topic_id"])],
    },
    TableDef {
        name: "pm_block",
        columns: &[int("bl_first_id", 0), int("bl_second_id", 0)],
        primary_key: &["bl_first_id", "bl_second_id"],
        indexes: &[index("second_id_idx", &["bl_second_id"])],
    },
    TableDef {
        name: "attachments",
        columns: &[
            serial("id"),
            int("uid", 0),
            int("created", 0),
            int("size_kb", 0),
            varchar("path", 255),
            varchar("uip", 45),
        ],
        primary_key: &["id"],
        indexes: &[index("uid_idx", &["uid"])],
    },
    TableDef {
        name: "attachments_pos",
        columns: &[int("id", 0), int("pid", 0)],
        primary_key: &["id", "pid"],
        indexes: &[index("pid_idx", &["pid"])],
    },
    TableDef {
        name: "attachments_pos_pm",
        columns: &[int("id", 0), int("pid", 0)],
        primary_key: &["id", "pid"],
        indexes: &[index("pid_idx", &["pid"])],
    },
    TableDef {
        name: "providers",
        columns: &[
            varchar("pr_name", 25),
            varchar("pr_display_name", 190),
            int("pr_pos", 0),
            tiny("pr_allow", 0),
            varchar("pr_cl_id", 255),
            varchar("pr_cl_sec", 255),
        ],
        primary_key: &["pr_name"],
        indexes: &[],
    },
    TableDef {
        name: "providers_users",
        columns: &[
            int("uid", 0),
            varchar("pr_name", 25),
            varchar("pu_uid", 165),
            varchar("pu_email", 190),
            varchar("pu_email_normal", 190),
            tiny("pu_email_verified", 0),
        ],
        primary_key: &["pr_name", "pu_uid"],
        indexes: &[index("uid_idx", &["uid"])],
    },
    TableDef {
        name: "mark_of_forum",
        columns: &[int("uid", 0), int("fid", 0), big("mf_mark_all_read")],
        primary_key: &["uid", "fid"],
        indexes: &[],
    },
    TableDef {
        name: "mark_of_topic",
        columns: &[
            int("uid", 0),
            int("tid", 0),
            int("mt_last_visit", 0),
            int("mt_last_read", 0),
        ],
        primary_key: &["uid", "tid"],
        indexes: &[index("tid_idx", &["tid"])],
    },
    TableDef {
        name: "online",
        columns: &[
            int("user_id", 1),
            varchar("ident", 45),
            int("logged", 0),
            varchar("o_position", 100),
            tiny("o_name", 0),
        ],
        primary_key: &["user_id", "ident"],
        indexes: &[index("logged_idx", &["logged"])],
    },
    TableDef {
        name: "search_cache",
        columns: &[
            varchar("search_data", 190),
            varchar("search_key", 190),
            int("search_time", 0),
        ],
        primary_key: &["search_key"],
        indexes: &[index("search_time_idx", &["search_time"])],
    },
    TableDef {
        name: "search_words",
        columns: &[serial("id"), varchar("word", 20)],
        primary_key: &["id"],
        indexes: &[unique("word_idx", &["word"])],
    },
    TableDef {
        name: "search_matches",
        columns: &[int("post_id", 0), int("word_id", 0), tiny("subject_match", 0)],
        primary_key: &["post_id", "word_id", "subject_match"],
        indexes: &[index("word_id_idx", &["word_id"])],
    },
];

/// Look up a destination table by logical name.
pub fn table(name: &str) -> Option<&'static TableDef> {
    TABLES.iter().find(|t| t.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_table_names_are_unique() {
        let names: HashSet<_> = TABLES.iter().map(|t| t.name).collect();
        assert_eq!(names.len(), TABLES.len());
    }

    #[test]
    fn test_primary_keys_and_indexes_reference_columns() {
        for t in TABLES {
            assert!(!t.primary_key.is_empty(), "{} has no primary key", t.name);
            for pk in t.primary_key {
                assert!(t.column(pk).is_some(), "{}.{} missing", t.name, pk);
            }
            for idx in t.indexes {
                for col in idx.columns {
                    assert!(t.column(col).is_some(), "{}.{} missing", t.name, col);
                }
            }
        }
    }

    #[test]
    fn test_serial_tables_have_single_column_key() {
        for t in TABLES {
            if let Some(serial) = t.serial_column() {
                assert_eq!(t.primary_key, &[serial], "{}", t.name);
            }
        }
    }
}
