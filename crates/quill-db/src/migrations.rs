//! Ordered, reversible schema history.
//!
//! Each revision points at its predecessor through `down_revision`, so the
//! list forms a single linear chain. Applied revisions are recorded in
//! `schema_migrations`; `upgrade` walks the chain forward and `downgrade`
//! walks it back, one transaction per revision.

use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use crate::{DbError, Result};

pub struct Migration {
    pub revision: &'static str,
    pub down_revision: Option<&'static str>,
    pub description: &'static str,
    pub upgrade: &'static str,
    pub downgrade: &'static str,
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        revision: "c41e0a9d7b22",
        down_revision: None,
        description: "create users table",
        upgrade: "
            CREATE TABLE users (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                email       TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );
        ",
        downgrade: "DROP TABLE users;",
    },
    Migration {
        revision: "5d8f3b61e0a7",
        down_revision: Some("c41e0a9d7b22"),
        description: "create posts table",
        upgrade: "
            CREATE TABLE posts (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                title       TEXT NOT NULL,
                content     TEXT NOT NULL,
                published   INTEGER NOT NULL DEFAULT 1,
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                owner_id    INTEGER NOT NULL,
                CONSTRAINT posts_users_fk FOREIGN KEY (owner_id)
                    REFERENCES users(id) ON DELETE CASCADE
            );
        ",
        downgrade: "DROP TABLE posts;",
    },
    Migration {
        revision: "a97c2e4410fd",
        down_revision: Some("5d8f3b61e0a7"),
        description: "create votes table",
        upgrade: "
            CREATE TABLE votes (
                user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                post_id     INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                PRIMARY KEY (user_id, post_id)
            );
        ",
        downgrade: "DROP TABLE votes;",
    },
    Migration {
        revision: "e2b6d0f95c38",
        down_revision: Some("a97c2e4410fd"),
        description: "index post owners and vote targets",
        upgrade: "
            CREATE INDEX idx_posts_owner ON posts(owner_id);
            CREATE INDEX idx_votes_post ON votes(post_id);
        ",
        downgrade: "
            DROP INDEX idx_votes_post;
            DROP INDEX idx_posts_owner;
        ",
    },
];

/// Check that the revision list forms one linear chain.
pub fn validate_chain(migrations: &[Migration]) -> Result<()> {
    let mut previous: Option<&str> = None;
    for (idx, m) in migrations.iter().enumerate() {
        if migrations[..idx].iter().any(|other| other.revision == m.revision) {
            return Err(DbError::Migration(format!(
                "duplicate revision {}",
                m.revision
            )));
        }
        if m.down_revision != previous {
            return Err(DbError::Migration(format!(
                "revision {} expects parent {:?}, found {:?}",
                m.revision, m.down_revision, previous
            )));
        }
        previous = Some(m.revision);
    }
    Ok(())
}

/// Apply every pending revision. Returns the revisions applied.
pub fn upgrade(conn: &mut Connection) -> Result<Vec<&'static str>> {
    validate_chain(MIGRATIONS)?;
    ensure_history_table(conn)?;

    let applied = applied_count(conn)?;
    let mut done = Vec::new();

    for m in &MIGRATIONS[applied..] {
        let tx = conn.transaction()?;
        tx.execute_batch(m.upgrade)?;
        tx.execute(
            "INSERT INTO schema_migrations (revision) VALUES (?1)",
            [m.revision],
        )?;
        tx.commit()?;

        info!("Applied migration {} ({})", m.revision, m.description);
        done.push(m.revision);
    }

    if done.is_empty() {
        info!("Database schema is up to date");
    }
    Ok(done)
}

/// Roll back applied revisions newest-first until `target` is the head.
/// `None` rolls back everything. Returns the revisions rolled back.
pub fn downgrade(conn: &mut Connection, target: Option<&str>) -> Result<Vec<&'static str>> {
    validate_chain(MIGRATIONS)?;
    ensure_history_table(conn)?;

    let applied = applied_count(conn)?;

    let keep = match target {
        None => 0,
        Some(rev) => {
            let idx = MIGRATIONS
                .iter()
                .position(|m| m.revision == rev)
                .ok_or_else(|| DbError::Migration(format!("unknown revision {}", rev)))?;
            if idx >= applied {
                return Err(DbError::Migration(format!(
                    "revision {} is not applied",
                    rev
                )));
            }
            idx + 1
        }
    };

    let mut done = Vec::new();
    for m in MIGRATIONS[keep..applied].iter().rev() {
        let tx = conn.transaction()?;
        tx.execute_batch(m.downgrade)?;
        tx.execute(
            "DELETE FROM schema_migrations WHERE revision = ?1",
            [m.revision],
        )?;
        tx.commit()?;

        info!("Rolled back migration {} ({})", m.revision, m.description);
        done.push(m.revision);
    }
    Ok(done)
}

/// The newest applied revision, if any.
pub fn current(conn: &Connection) -> Result<Option<&'static str>> {
    ensure_history_table(conn)?;
    let applied = applied_count(conn)?;
    Ok(applied.checked_sub(1).map(|idx| MIGRATIONS[idx].revision))
}

fn ensure_history_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            revision    TEXT PRIMARY KEY,
            applied_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;
    Ok(())
}

/// Number of chain entries applied. The recorded history must be a prefix
/// of the chain.
fn applied_count(conn: &Connection) -> Result<usize> {
    let mut count = 0;
    for m in MIGRATIONS {
        let found: Option<String> = conn
            .query_row(
                "SELECT revision FROM schema_migrations WHERE revision = ?1",
                [m.revision],
                |row| row.get(0),
            )
            .optional()?;
        if found.is_none() {
            break;
        }
        count += 1;
    }

    let recorded: i64 =
        conn.query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))?;
    if recorded as usize != count {
        return Err(DbError::Migration(
            "schema_migrations does not match the known revision chain".into(),
        ));
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_exists(conn: &Connection, name: &str) -> bool {
        conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [name],
            |row| row.get::<_, i64>(0),
        )
        .unwrap()
            == 1
    }

    fn fresh() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "foreign_keys", "ON").unwrap();
        conn
    }

    #[test]
    fn shipped_chain_is_linear() {
        validate_chain(MIGRATIONS).unwrap();
    }

    #[test]
    fn broken_parent_pointer_is_rejected() {
        let chain = [
            Migration {
                revision: "aaa",
                down_revision: None,
                description: "",
                upgrade: "",
                downgrade: "",
            },
            Migration {
                revision: "bbb",
                down_revision: Some("zzz"),
                description: "",
                upgrade: "",
                downgrade: "",
            },
        ];
        assert!(matches!(validate_chain(&chain), Err(DbError::Migration(_))));
    }

    #[test]
    fn upgrade_is_idempotent() {
        let mut conn = fresh();
        let first = upgrade(&mut conn).unwrap();
        assert_eq!(first.len(), MIGRATIONS.len());

        let second = upgrade(&mut conn).unwrap();
        assert!(second.is_empty());
        assert_eq!(current(&conn).unwrap(), MIGRATIONS.last().map(|m| m.revision));
    }

    #[test]
    fn downgrade_to_target_then_upgrade_again() {
        let mut conn = fresh();
        upgrade(&mut conn).unwrap();

        let rolled = downgrade(&mut conn, Some("5d8f3b61e0a7")).unwrap();
        assert_eq!(rolled, vec!["e2b6d0f95c38", "a97c2e4410fd"]);
        assert_eq!(current(&conn).unwrap(), Some("5d8f3b61e0a7"));
        assert!(table_exists(&conn, "posts"));
        assert!(!table_exists(&conn, "votes"));

        let reapplied = upgrade(&mut conn).unwrap();
        assert_eq!(reapplied, vec!["a97c2e4410fd", "e2b6d0f95c38"]);
        assert!(table_exists(&conn, "votes"));
    }

    #[test]
    fn full_downgrade_removes_every_table() {
        let mut conn = fresh();
        upgrade(&mut conn).unwrap();
        downgrade(&mut conn, None).unwrap();

        assert_eq!(current(&conn).unwrap(), None);
        for table in ["users", "posts", "votes"] {
            assert!(!table_exists(&conn, table), "{} still present", table);
        }
    }

    #[test]
    fn downgrade_to_unknown_revision_fails() {
        let mut conn = fresh();
        upgrade(&mut conn).unwrap();
        assert!(matches!(
            downgrade(&mut conn, Some("deadbeef0000")),
            Err(DbError::Migration(_))
        ));
        assert_eq!(current(&conn).unwrap(), MIGRATIONS.last().map(|m| m.revision));
    }

    #[test]
    fn posts_owner_constraint_cascades() {
        let mut conn = fresh();
        upgrade(&mut conn).unwrap();

        conn.execute_batch(
            "INSERT INTO users (id, email, password) VALUES (1, 'a@x.com', 'h');
             INSERT INTO posts (id, title, content, owner_id) VALUES (1, 'T', 'C', 1);
             INSERT INTO votes (user_id, post_id) VALUES (1, 1);
             DELETE FROM users WHERE id = 1;",
        )
        .unwrap();

        let posts: i64 = conn
            .query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))
            .unwrap();
        let votes: i64 = conn
            .query_row("SELECT COUNT(*) FROM votes", [], |row| row.get(0))
            .unwrap();
        assert_eq!((posts, votes), (0, 0));
    }
}
