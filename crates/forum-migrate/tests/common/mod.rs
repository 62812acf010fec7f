//! Shared fixtures: small FluxBB, PunBB and ForkBB forums in SQLite.
#![allow(dead_code)]

use std::path::{Path, PathBuf};

use forum_migrate::core::{Row, Value};
use forum_migrate::db::Statement;
use forum_migrate::schema::{seed, SchemaEvolver};
use forum_migrate::{
    Config, Database, DbType, MemoryStateBackend, MigrationSettings, Orchestrator, SqlxDatabase,
};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

pub const SOURCE_PREFIX: &str = "flux_";
pub const DEST_PREFIX: &str = "fork_";

pub struct Fixture {
    pub dir: TempDir,
    pub source_path: PathBuf,
    pub dest_path: PathBuf,
}

impl Fixture {
    fn empty(source_file: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let source_path = dir.path().join(source_file);
        let dest_path = dir.path().join("forkbb.db");
        Self {
            dir,
            source_path,
            dest_path,
        }
    }

    /// A populated FluxBB source and an empty destination.
    pub async fn fluxbb() -> Self {
        let fixture = Self::empty("fluxbb.db");
        let source = fixture.source().await;
        create_fluxbb(&source).await;
        source.close().await;
        fixture
    }

    /// A populated PunBB 1.4 source and an empty destination.
    pub async fn punbb() -> Self {
        let fixture = Self::empty("punbb.db");
        let source = fixture.source().await;
        create_punbb(&source).await;
        source.close().await;
        fixture
    }

    /// A ForkBB source at the current revision and an empty destination.
    pub async fn forkbb() -> Self {
        let fixture = Self::empty("source.db");
        let source = fixture.source().await;
        create_forkbb(&source).await;
        source.close().await;
        fixture
    }

    /// Configuration for this fixture with the given batch size and mode.
    pub fn config(&self, limit: usize, mode: &str) -> Config {
        self.config_for(&self.dest_path, limit, mode)
    }

    /// Configuration migrating this fixture's source into `dest`.
    pub fn config_for(&self, dest: &Path, limit: usize, mode: &str) -> Config {
        Config::from_yaml(&format!(
            r#"
source:
  type: sqlite
  database: {source}
  prefix: {source_prefix}
target:
  type: sqlite
  database: {dest}
  prefix: {dest_prefix}
migration:
  mode: {mode}
  limit: {limit}
  state_dir: {state}
"#,
            source = self.source_path.display(),
            source_prefix = SOURCE_PREFIX,
            dest = dest.display(),
            dest_prefix = DEST_PREFIX,
            mode = mode,
            limit = limit,
            state = self.dir.path().join("state").display(),
        ))
        .unwrap()
    }

    pub async fn dest(&self) -> SqlxDatabase {
        open(&self.dest_path, DEST_PREFIX).await
    }

    pub async fn source(&self) -> SqlxDatabase {
        open(&self.source_path, SOURCE_PREFIX).await
    }
}

pub async fn run_to_end(orchestrator: &Orchestrator, settings: &mut MigrationSettings) {
    let backend = MemoryStateBackend::new();
    orchestrator
        .run(settings, &backend, &CancellationToken::new())
        .await
        .unwrap();
}

pub async fn config_value(db: &dyn Database, name: &str) -> String {
    scalar(
        db,
        "SELECT conf_value FROM ::config WHERE conf_name = ?",
        &[Value::from(name)],
    )
    .await
    .to_text()
}

pub async fn open(path: &Path, prefix: &str) -> SqlxDatabase {
    let url = format!("sqlite://{}?mode=rwc", path.display());
    SqlxDatabase::connect_url(&url, DbType::Sqlite, prefix, 1)
        .await
        .unwrap()
}

pub async fn count(db: &dyn Database, table: &str) -> i64 {
    db.query_int(&format!("SELECT COUNT(*) AS n FROM ::{}", table), &[])
        .await
        .unwrap()
}

/// Single column of a single row.
pub async fn scalar(db: &dyn Database, sql: &str, params: &[Value]) -> Value {
    db.query_one(sql, params)
        .await
        .unwrap()
        .and_then(|r| r.iter().next().map(|(_, v)| v.clone()))
        .unwrap_or(Value::Null)
}

pub async fn user_id(db: &dyn Database, username: &str) -> i64 {
    scalar(
        db,
        "SELECT id FROM ::users WHERE username = ?",
        &[Value::from(username)],
    )
    .await
    .as_i64()
    .unwrap()
}

pub async fn insert(db: &SqlxDatabase, table: &str, row: Row) {
    let stmt = Statement::insert(db.dialect(), table, &row);
    db.execute(&stmt.sql, &stmt.params).await.unwrap();
}

const FLUXBB_DDL: &[&str] = &[
    "CREATE TABLE ::config (conf_name TEXT PRIMARY KEY, conf_value TEXT)",
    "CREATE TABLE ::categories (id INTEGER PRIMARY KEY, cat_name TEXT NOT NULL DEFAULT '', \
     disp_position INTEGER NOT NULL DEFAULT 0)",
    "CREATE TABLE ::groups (g_id INTEGER PRIMARY KEY, g_title TEXT NOT NULL DEFAULT '', \
     g_user_title TEXT, g_promote_min_posts INTEGER NOT NULL DEFAULT 0, \
     g_promote_next_group INTEGER NOT NULL DEFAULT 0, g_moderator INTEGER NOT NULL DEFAULT 0, \
     g_read_board INTEGER NOT NULL DEFAULT 1, g_post_flood INTEGER NOT NULL DEFAULT 30)",
    "CREATE TABLE ::users (id INTEGER PRIMARY KEY, group_id INTEGER NOT NULL DEFAULT 3, \
     username TEXT NOT NULL DEFAULT '', password TEXT NOT NULL DEFAULT '', \
     email TEXT NOT NULL DEFAULT '', title TEXT, timezone REAL NOT NULL DEFAULT 0, \
     language TEXT NOT NULL DEFAULT 'English', style TEXT NOT NULL DEFAULT 'Air', \
     num_posts INTEGER NOT NULL DEFAULT 0, registered INTEGER NOT NULL DEFAULT 0, \
     jabber TEXT, activate_key TEXT)",
    "CREATE TABLE ::forums (id INTEGER PRIMARY KEY, forum_name TEXT NOT NULL DEFAULT '', \
     forum_desc TEXT, redirect_url TEXT, moderators TEXT, \
     num_topics INTEGER NOT NULL DEFAULT 0, num_posts INTEGER NOT NULL DEFAULT 0, \
     last_post INTEGER, last_post_id INTEGER, last_poster TEXT, \
     sort_by INTEGER NOT NULL DEFAULT 0, disp_position INTEGER NOT NULL DEFAULT 0, \
     cat_id INTEGER NOT NULL DEFAULT 0)",
    "CREATE TABLE ::forum_perms (group_id INTEGER NOT NULL, forum_id INTEGER NOT NULL, \
     read_forum INTEGER NOT NULL DEFAULT 1, post_replies INTEGER NOT NULL DEFAULT 1, \
     post_topics INTEGER NOT NULL DEFAULT 1, PRIMARY KEY (group_id, forum_id))",
    "CREATE TABLE ::topics (id INTEGER PRIMARY KEY, poster TEXT NOT NULL DEFAULT '', \
     subject TEXT NOT NULL DEFAULT '', posted INTEGER NOT NULL DEFAULT 0, \
     first_post_id INTEGER NOT NULL DEFAULT 0, last_post INTEGER NOT NULL DEFAULT 0, \
     last_post_id INTEGER NOT NULL DEFAULT 0, last_poster TEXT, \
     num_views INTEGER NOT NULL DEFAULT 0, num_replies INTEGER NOT NULL DEFAULT 0, \
     closed INTEGER NOT NULL DEFAULT 0, sticky INTEGER NOT NULL DEFAULT 0, \
     moved_to INTEGER, forum_id INTEGER NOT NULL DEFAULT 0)",
    "CREATE TABLE ::posts (id INTEGER PRIMARY KEY, poster TEXT NOT NULL DEFAULT '', \
     poster_id INTEGER NOT NULL DEFAULT 1, poster_ip TEXT, poster_email TEXT, message TEXT, \
     hide_smilies INTEGER NOT NULL DEFAULT 0, posted INTEGER NOT NULL DEFAULT 0, \
     edited INTEGER, edited_by TEXT, topic_id INTEGER NOT NULL DEFAULT 0)",
    "CREATE TABLE ::topic_subscriptions (user_id INTEGER NOT NULL, topic_id INTEGER NOT NULL, \
     PRIMARY KEY (user_id, topic_id))",
    "CREATE TABLE ::forum_subscriptions (user_id INTEGER NOT NULL, forum_id INTEGER NOT NULL, \
     PRIMARY KEY (user_id, forum_id))",
    "CREATE TABLE ::bans (id INTEGER PRIMARY KEY, username TEXT, ip TEXT, email TEXT, \
     message TEXT, expire INTEGER, ban_creator INTEGER NOT NULL DEFAULT 0)",
];

/// FluxBB 1.5.10 with 3 categories, 2 custom groups, 5 active users (`Bob`
/// and `bob` among them) plus one unverified account, 3 topics (one moved)
/// and 5 posts.
async fn create_fluxbb(db: &SqlxDatabase) {
    for ddl in FLUXBB_DDL {
        db.execute(ddl, &[]).await.unwrap();
    }

    for (name, value) in [
        ("o_cur_version", "1.5.10"),
        ("o_board_title", "Flux Board"),
        ("o_default_lang", "English"),
        ("o_default_style", "Air"),
        ("o_default_timezone", "3"),
        ("o_default_user_group", "4"),
        ("o_smilies", "0"),
        ("p_sig_length", "250"),
        ("o_database_revision", "21"),
    ] {
        insert(
            db,
            "config",
            Row::new().with("conf_name", name).with("conf_value", value),
        )
        .await;
    }

    for (id, name, position) in [(1, "General", 1), (2, "Support", 2), (5, "Archive", 9)] {
        insert(
            db,
            "categories",
            Row::new()
                .with("id", id)
                .with("cat_name", name)
                .with("disp_position", position),
        )
        .await;
    }

    for (id, title, next, moderator) in [
        (1, "Administrators", 0, 0),
        (2, "Moderators", 0, 1),
        (3, "Guests", 0, 0),
        (4, "Members", 5, 0),
        (5, "Veterans", 0, 0),
        (6, "Newcomers", 5, 0),
    ] {
        insert(
            db,
            "groups",
            Row::new()
                .with("g_id", id)
                .with("g_title", title)
                .with("g_promote_next_group", next)
                .with("g_moderator", moderator),
        )
        .await;
    }

    for (id, group, name, email, timezone) in [
        (1, 3, "Guest", "", 0.0),
        (2, 1, "admin", "admin@example.org", 0.0),
        (3, 4, "Bob", "bob@example.org", 2.0),
        (4, 5, "bob", "bob@example.net", -5.0),
        (5, 6, "carol", "carol@example.org", 5.5),
        (6, 4, "dave", "dave@example.org", 1.0),
        (7, 0, "pending", "pending@example.org", 0.0),
    ] {
        insert(
            db,
            "users",
            Row::new()
                .with("id", id)
                .with("group_id", group)
                .with("username", name)
                .with("password", format!("sha1-{}", name))
                .with("email", email)
                .with("timezone", timezone)
                .with("registered", 1_000 + id)
                .with("jabber", "someone@jabber.org"),
        )
        .await;
    }

    for (id, name, cat, moderators) in [
        (1, "Announcements", 1, r#"a:1:{s:3:"bob";i:4;}"#),
        (2, "Help", 5, ""),
    ] {
        insert(
            db,
            "forums",
            Row::new()
                .with("id", id)
                .with("forum_name", name)
                .with("cat_id", cat)
                .with("moderators", moderators)
                .with("disp_position", id),
        )
        .await;
    }

    for (group, forum) in [(5, 1), (6, 2), (4, 2)] {
        insert(
            db,
            "forum_perms",
            Row::new()
                .with("group_id", group)
                .with("forum_id", forum)
                .with("post_topics", 0),
        )
        .await;
    }

    for (id, poster, subject, forum, moved_to) in [
        (1, "Bob", "Welcome", 1, None),
        (2, "bob", "Question", 2, None),
        (3, "Bob", "Welcome", 2, Some(1)),
    ] {
        insert(
            db,
            "topics",
            Row::new()
                .with("id", id)
                .with("poster", poster)
                .with("subject", subject)
                .with("posted", 1_000 + id * 100)
                .with("forum_id", forum)
                .with("moved_to", moved_to.map(i64::from)),
        )
        .await;
    }

    for (id, poster, poster_id, topic, edited_by) in [
        (1, "Bob", 3, 1, None),
        (2, "bob", 4, 1, Some("Bob")),
        (3, "bob", 4, 2, None),
        (4, "visitor", 1, 2, None),
        (5, "carol", 5, 2, Some("bob")),
    ] {
        insert(
            db,
            "posts",
            Row::new()
                .with("id", id)
                .with("poster", poster)
                .with("poster_id", poster_id)
                .with("message", format!("message {}", id))
                .with("posted", 1_000 + id * 100)
                .with("edited_by", edited_by)
                .with("topic_id", topic),
        )
        .await;
    }

    for (user, topic) in [(4, 1), (3, 2), (99, 1)] {
        insert(
            db,
            "topic_subscriptions",
            Row::new().with("user_id", user).with("topic_id", topic),
        )
        .await;
    }
    insert(
        db,
        "forum_subscriptions",
        Row::new().with("user_id", 4).with("forum_id", 2),
    )
    .await;

    insert(
        db,
        "bans",
        Row::new()
            .with("id", 1)
            .with("username", "bob")
            .with("message", "spam")
            .with("ban_creator", 2),
    )
    .await;
}

/// PunBB 1.4.2: the FluxBB layout with salted passwords, an `extensions`
/// table and topic subscriptions in `subscriptions`. Reserved groups use
/// PunBB numbering (2 guests, 3 members, 4 moderators).
async fn create_punbb(db: &SqlxDatabase) {
    for ddl in FLUXBB_DDL {
        db.execute(ddl, &[]).await.unwrap();
    }
    for ddl in [
        "DROP TABLE ::topic_subscriptions",
        "ALTER TABLE ::users ADD COLUMN salt TEXT",
        "CREATE TABLE ::extensions (id TEXT PRIMARY KEY, title TEXT NOT NULL DEFAULT '')",
        "CREATE TABLE ::subscriptions (user_id INTEGER NOT NULL, topic_id INTEGER NOT NULL, \
         PRIMARY KEY (user_id, topic_id))",
    ] {
        db.execute(ddl, &[]).await.unwrap();
    }

    for (name, value) in [
        ("o_cur_version", "1.4.2"),
        ("o_board_title", "Pun Board"),
        ("o_default_lang", "English"),
    ] {
        insert(
            db,
            "config",
            Row::new().with("conf_name", name).with("conf_value", value),
        )
        .await;
    }

    insert(
        db,
        "categories",
        Row::new().with("id", 1).with("cat_name", "Main"),
    )
    .await;

    for (id, title, moderator) in [
        (1, "Administrators", 0),
        (2, "Guest", 0),
        (3, "Members", 0),
        (4, "Moderators", 1),
        (5, "Veterans", 0),
    ] {
        insert(
            db,
            "groups",
            Row::new()
                .with("g_id", id)
                .with("g_title", title)
                .with("g_moderator", moderator),
        )
        .await;
    }

    for (id, group, name) in [
        (1, 2, "Guest"),
        (2, 1, "admin"),
        (3, 3, "mark"),
        (4, 4, "mona"),
        (5, 5, "vera"),
    ] {
        insert(
            db,
            "users",
            Row::new()
                .with("id", id)
                .with("group_id", group)
                .with("username", name)
                .with("password", format!("hash{}", id))
                .with("salt", format!("s{}", id))
                .with("email", format!("{}@example.org", name))
                .with("registered", 1_000 + id),
        )
        .await;
    }

    insert(
        db,
        "forums",
        Row::new()
            .with("id", 1)
            .with("forum_name", "General")
            .with("cat_id", 1)
            .with("moderators", r#"a:1:{s:4:"mona";i:4;}"#),
    )
    .await;

    insert(
        db,
        "topics",
        Row::new()
            .with("id", 1)
            .with("poster", "mark")
            .with("subject", "Hello")
            .with("posted", 1_100)
            .with("forum_id", 1),
    )
    .await;
    for (id, poster, poster_id) in [(1, "mark", 3), (2, "mona", 4)] {
        insert(
            db,
            "posts",
            Row::new()
                .with("id", id)
                .with("poster", poster)
                .with("poster_id", poster_id)
                .with("message", format!("message {}", id))
                .with("posted", 1_100 + id)
                .with("topic_id", 1),
        )
        .await;
    }

    for user in [3, 4] {
        insert(
            db,
            "subscriptions",
            Row::new().with("user_id", user).with("topic_id", 1),
        )
        .await;
    }
}

/// ForkBB at the current revision with sparse ids, one custom group, a
/// poll, a private conversation and an attachment. The default smilies
/// are edited: the first gets a new code, the second is deleted.
async fn create_forkbb(db: &SqlxDatabase) {
    SchemaEvolver::new(db)
        .create_destination_schema()
        .await
        .unwrap();

    db.execute(
        "UPDATE ::smilies SET sm_code = ? WHERE id = ?",
        &[Value::from(":smile:"), Value::from(1)],
    )
    .await
    .unwrap();
    db.execute("DELETE FROM ::smilies WHERE id = ?", &[Value::from(2)])
        .await
        .unwrap();
    insert(
        db,
        "smilies",
        Row::new()
            .with("id", 40)
            .with("sm_code", ":fork:")
            .with("sm_image", "fork.png"),
    )
    .await;

    db.execute(
        "UPDATE ::config SET conf_value = ? WHERE conf_name = ?",
        &[Value::from("Fork Source"), Value::from("o_board_title")],
    )
    .await
    .unwrap();
    insert(
        db,
        "config",
        Row::new()
            .with("conf_name", "o_custom_flag")
            .with("conf_value", "1"),
    )
    .await;

    for (id, name, position) in [(1, "Lobby", 1), (3, "Off-topic", 2)] {
        insert(
            db,
            "categories",
            Row::new()
                .with("id", id)
                .with("cat_name", name)
                .with("disp_position", position),
        )
        .await;
    }

    insert(
        db,
        "groups",
        Row::new().with("g_id", 7).with("g_title", "Editors"),
    )
    .await;

    for (id, group, name) in [
        (2, seed::GROUP_ADMIN, "admin"),
        (5, 7, "alice"),
        (9, seed::GROUP_MEMBER, "Zed"),
        (11, seed::GROUP_UNVERIFIED, "waiting"),
    ] {
        let email = format!("{}@example.org", name.to_lowercase());
        insert(
            db,
            "users",
            Row::new()
                .with("id", id)
                .with("group_id", group)
                .with("username", name)
                .with("username_normal", name.to_lowercase())
                .with("password", format!("$2y$10${}", name))
                .with("email_normal", email.clone())
                .with("email", email)
                .with("timezone", "Europe/Berlin")
                .with("num_posts", 1),
        )
        .await;
    }

    insert(
        db,
        "forums",
        Row::new()
            .with("id", 4)
            .with("forum_name", "Desk")
            .with("cat_id", 3)
            .with("moderators", r#"{"5":"alice"}"#)
            .with("num_topics", 1)
            .with("num_posts", 2)
            .with("last_post_id", 21),
    )
    .await;
    insert(
        db,
        "forum_perms",
        Row::new()
            .with("group_id", 7)
            .with("forum_id", 4)
            .with("post_topics", 0),
    )
    .await;

    insert(
        db,
        "topics",
        Row::new()
            .with("id", 10)
            .with("poster", "alice")
            .with("poster_id", 5)
            .with("subject", "Which editor?")
            .with("first_post_id", 20)
            .with("last_post_id", 21)
            .with("last_poster", "Zed")
            .with("num_replies", 1)
            .with("forum_id", 4)
            .with("poll_type", 1),
    )
    .await;
    for (id, poster, poster_id) in [(20, "alice", 5), (21, "Zed", 9)] {
        insert(
            db,
            "posts",
            Row::new()
                .with("id", id)
                .with("poster", poster)
                .with("poster_id", poster_id)
                .with("message", format!("message {}", id))
                .with("posted", 2_000 + id)
                .with("topic_id", 10),
        )
        .await;
    }
    insert(
        db,
        "topic_subscriptions",
        Row::new().with("user_id", 9).with("topic_id", 10),
    )
    .await;

    for (field, text, votes) in [(0, "Which editor?", 0), (1, "vim", 1), (2, "emacs", 0)] {
        insert(
            db,
            "poll",
            Row::new()
                .with("tid", 10)
                .with("question_id", 1)
                .with("field_id", field)
                .with("qna_text", text)
                .with("votes", votes),
        )
        .await;
    }
    insert(
        db,
        "poll_voted",
        Row::new().with("tid", 10).with("uid", 9).with("rez", "1"),
    )
    .await;

    insert(
        db,
        "pm_topics",
        Row::new()
            .with("id", 2)
            .with("subject", "Hi")
            .with("poster", "alice")
            .with("poster_id", 5)
            .with("target", "Zed")
            .with("target_id", 9)
            .with("first_post_id", 3)
            .with("last_post_id", 3),
    )
    .await;
    insert(
        db,
        "pm_posts",
        Row::new()
            .with("id", 3)
            .with("poster", "alice")
            .with("poster_id", 5)
            .with("message", "hello Zed")
            .with("topic_id", 2),
    )
    .await;
    insert(
        db,
        "pm_block",
        Row::new().with("bl_first_id", 9).with("bl_second_id", 2),
    )
    .await;

    insert(
        db,
        "attachments",
        Row::new()
            .with("id", 6)
            .with("uid", 5)
            .with("size_kb", 12)
            .with("path", "img/6.png"),
    )
    .await;
    insert(
        db,
        "attachments_pos",
        Row::new().with("id", 6).with("pid", 21),
    )
    .await;
}
