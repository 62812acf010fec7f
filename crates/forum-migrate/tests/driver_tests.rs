//! PunBB and ForkBB sources: detection, group numbering and id-preserving
//! copies.

mod common;

use common::{config_value, count, run_to_end, scalar, user_id, Fixture};
use forum_migrate::core::Value;
use forum_migrate::schema::seed;
use forum_migrate::{Database, DriverRegistry, Orchestrator, RunMode};

async fn int(db: &dyn Database, sql: &str, params: &[Value]) -> i64 {
    scalar(db, sql, params).await.as_i64().unwrap_or(-1)
}

async fn group_of(db: &dyn Database, username: &str) -> i64 {
    int(
        db,
        "SELECT group_id FROM ::users WHERE username = ?",
        &[Value::from(username)],
    )
    .await
}

async fn ids(db: &dyn Database, table: &str) -> Vec<i64> {
    db.query(&format!("SELECT id FROM ::{} ORDER BY id", table), &[])
        .await
        .unwrap()
        .iter()
        .map(|r| r.int("id"))
        .collect()
}

async fn smiley_code(db: &dyn Database, id: i64) -> Value {
    scalar(
        db,
        "SELECT sm_code FROM ::smilies WHERE id = ?",
        &[Value::from(id)],
    )
    .await
}

// =============================================================================
// PunBB
// =============================================================================

#[tokio::test]
async fn test_punbb_source_is_detected() {
    let fixture = Fixture::punbb().await;
    let source = fixture.source().await;

    let detection = DriverRegistry::with_builtins().detect(&source).await.unwrap();
    assert_eq!(detection.driver, "punbb");
    assert_eq!(detection.version, "1.4.2");
    assert!(!detection.exact);
}

#[tokio::test]
async fn test_punbb_groups_are_renumbered() {
    let fixture = Fixture::punbb().await;
    let config = fixture.config(2, "auto");
    let orchestrator = Orchestrator::connect(&config).await.unwrap();
    let mut settings = orchestrator.start(&config).await.unwrap();
    assert_eq!(settings.driver, "punbb");
    assert_eq!(settings.mode, RunMode::Copy);
    run_to_end(&orchestrator, &mut settings).await;

    let dest = fixture.dest().await;
    assert_eq!(group_of(&dest, "admin").await, seed::GROUP_ADMIN);
    assert_eq!(group_of(&dest, "mark").await, seed::GROUP_MEMBER);
    assert_eq!(group_of(&dest, "mona").await, seed::GROUP_MOD);

    let veterans = int(
        &dest,
        "SELECT g_id FROM ::groups WHERE g_title = ?",
        &[Value::from("Veterans")],
    )
    .await;
    assert!(veterans > seed::GROUP_MEMBER);
    assert_eq!(group_of(&dest, "vera").await, veterans);

    // reserved groups keep their destination slot with the source settings
    assert_eq!(count(&dest, "groups").await, 5);
    let moderators = scalar(
        &dest,
        "SELECT g_title FROM ::groups WHERE g_id = ?",
        &[Value::from(seed::GROUP_MOD)],
    )
    .await;
    assert_eq!(moderators.to_text(), "Moderators");

    let password = scalar(
        &dest,
        "SELECT password FROM ::users WHERE username = ?",
        &[Value::from("mark")],
    )
    .await;
    assert_eq!(password.to_text(), "punbb$s3$hash3");

    assert_eq!(config_value(&dest, "o_board_title").await, "Pun Board");
}

#[tokio::test]
async fn test_punbb_subscriptions_and_moderators() {
    let fixture = Fixture::punbb().await;
    let config = fixture.config(100, "copy");
    let orchestrator = Orchestrator::connect(&config).await.unwrap();
    let mut settings = orchestrator.start(&config).await.unwrap();
    run_to_end(&orchestrator, &mut settings).await;

    let dest = fixture.dest().await;
    let mark = user_id(&dest, "mark").await;
    let mona = user_id(&dest, "mona").await;
    let topic = int(&dest, "SELECT id FROM ::topics", &[]).await;

    assert_eq!(count(&dest, "topic_subscriptions").await, 2);
    for user in [mark, mona] {
        let subscribed = int(
            &dest,
            "SELECT COUNT(*) AS n FROM ::topic_subscriptions WHERE user_id = ? AND topic_id = ?",
            &[Value::from(user), Value::from(topic)],
        )
        .await;
        assert_eq!(subscribed, 1);
    }

    let moderators = scalar(&dest, "SELECT moderators FROM ::forums", &[]).await;
    assert_eq!(moderators.to_text(), format!(r#"{{"{}":"mona"}}"#, mona));

    let mona_posts = int(
        &dest,
        "SELECT COUNT(*) AS n FROM ::posts WHERE poster_id = ?",
        &[Value::from(mona)],
    )
    .await;
    assert_eq!(mona_posts, 1);
}

// =============================================================================
// ForkBB
// =============================================================================

#[tokio::test]
async fn test_forkbb_source_is_detected() {
    let fixture = Fixture::forkbb().await;
    let source = fixture.source().await;

    let detection = DriverRegistry::with_builtins().detect(&source).await.unwrap();
    assert_eq!(detection.driver, "forkbb");
    assert_eq!(detection.version, "68");
    assert!(detection.exact);
}

#[tokio::test]
async fn test_exact_copy_preserves_ids() {
    let fixture = Fixture::forkbb().await;
    let config = fixture.config(2, "auto");
    let orchestrator = Orchestrator::connect(&config).await.unwrap();
    let mut settings = orchestrator.start(&config).await.unwrap();
    assert_eq!(settings.mode, RunMode::ExactCopy);
    run_to_end(&orchestrator, &mut settings).await;
    assert!(settings.is_finished());
    assert!(settings.renames.is_empty());

    let dest = fixture.dest().await;
    assert_eq!(ids(&dest, "categories").await, vec![1, 3]);
    assert_eq!(ids(&dest, "users").await, vec![1, 2, 5, 9]);
    assert_eq!(ids(&dest, "forums").await, vec![4]);
    assert_eq!(ids(&dest, "topics").await, vec![10]);
    assert_eq!(ids(&dest, "posts").await, vec![20, 21]);
    assert_eq!(ids(&dest, "pm_topics").await, vec![2]);
    assert_eq!(ids(&dest, "pm_posts").await, vec![3]);
    assert_eq!(ids(&dest, "attachments").await, vec![6]);

    let editors = int(
        &dest,
        "SELECT group_id FROM ::users WHERE id = ?",
        &[Value::from(5)],
    )
    .await;
    assert_eq!(editors, 7);
    assert_eq!(
        scalar(&dest, "SELECT g_title FROM ::groups WHERE g_id = 7", &[])
            .await
            .to_text(),
        "Editors"
    );

    // references keep their source values
    assert_eq!(
        scalar(&dest, "SELECT moderators FROM ::forums", &[]).await.to_text(),
        r#"{"5":"alice"}"#
    );
    assert_eq!(
        int(&dest, "SELECT target_id FROM ::pm_topics", &[]).await,
        9
    );
    assert_eq!(int(&dest, "SELECT topic_id FROM ::pm_posts", &[]).await, 2);
    assert_eq!(int(&dest, "SELECT uid FROM ::attachments", &[]).await, 5);

    // stored counters are copied, not recomputed
    assert_eq!(int(&dest, "SELECT num_posts FROM ::forums", &[]).await, 2);
    assert_eq!(int(&dest, "SELECT num_replies FROM ::topics", &[]).await, 1);

    assert_eq!(config_value(&dest, "o_board_title").await, "Fork Source");
    assert_eq!(config_value(&dest, "o_custom_flag").await, "1");
    assert_eq!(config_value(&dest, "i_fork_revision").await, "68");

    assert!(!dest.column_exists("users", "id_old").await.unwrap());

    // new rows continue after the copied ids
    dest.execute(
        "INSERT INTO ::categories (cat_name) VALUES (?)",
        &[Value::from("Fresh")],
    )
    .await
    .unwrap();
    let fresh = int(
        &dest,
        "SELECT id FROM ::categories WHERE cat_name = ?",
        &[Value::from("Fresh")],
    )
    .await;
    assert_eq!(fresh, 4);
}

#[tokio::test]
async fn test_exact_copy_link_tables() {
    let fixture = Fixture::forkbb().await;
    let config = fixture.config(1, "exact_copy");
    let orchestrator = Orchestrator::connect(&config).await.unwrap();
    let mut settings = orchestrator.start(&config).await.unwrap();
    run_to_end(&orchestrator, &mut settings).await;

    let dest = fixture.dest().await;
    for (sql, expected) in [
        ("SELECT COUNT(*) AS n FROM ::forum_perms WHERE group_id = 7 AND forum_id = 4", 1),
        ("SELECT COUNT(*) AS n FROM ::topic_subscriptions WHERE user_id = 9 AND topic_id = 10", 1),
        ("SELECT COUNT(*) AS n FROM ::poll WHERE tid = 10", 3),
        ("SELECT votes FROM ::poll WHERE tid = 10 AND field_id = 1", 1),
        ("SELECT COUNT(*) AS n FROM ::poll_voted WHERE tid = 10 AND uid = 9", 1),
        ("SELECT COUNT(*) AS n FROM ::pm_block WHERE bl_first_id = 9 AND bl_second_id = 2", 1),
        ("SELECT COUNT(*) AS n FROM ::attachments_pos WHERE id = 6 AND pid = 21", 1),
    ] {
        assert_eq!(int(&dest, sql, &[]).await, expected, "{}", sql);
    }
}

/// Edited and deleted default smilies stay as the source has them; the
/// destination defaults are not seeded next to them.
#[tokio::test]
async fn test_exact_copy_keeps_edited_smilies() {
    let fixture = Fixture::forkbb().await;
    let config = fixture.config(5, "exact_copy");
    let orchestrator = Orchestrator::connect(&config).await.unwrap();
    let mut settings = orchestrator.start(&config).await.unwrap();
    run_to_end(&orchestrator, &mut settings).await;

    let source = fixture.source().await;
    let dest = fixture.dest().await;
    for table in ["smilies", "bbcode"] {
        assert_eq!(
            count(&dest, table).await,
            count(&source, table).await,
            "{}",
            table
        );
    }
    assert_eq!(count(&dest, "smilies").await, seed::smilies().len() as i64);

    assert_eq!(smiley_code(&dest, 1).await.to_text(), ":smile:");
    assert_eq!(smiley_code(&dest, 2).await, Value::Null);
    assert_eq!(smiley_code(&dest, 40).await.to_text(), ":fork:");

    let restored = int(
        &dest,
        "SELECT COUNT(*) AS n FROM ::smilies WHERE sm_code IN (?, ?)",
        &[Value::from(":)"), Value::from("=)")],
    )
    .await;
    assert_eq!(restored, 0);
}
