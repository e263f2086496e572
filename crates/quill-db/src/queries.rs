use crate::models::{PostFields, PostRow, PostWithVotes, UserRow, VoteDirection};
use crate::{Database, DbError, Result};
use rusqlite::{Connection, OptionalExtension, Row};

const POST_SELECT: &str = "
    SELECT p.id, p.title, p.content, p.published, p.created_at, p.owner_id, u.email, u.created_at
    FROM posts p
    JOIN users u ON u.id = p.owner_id";

// Outer join so posts without votes still come back, counted as zero.
const POST_WITH_VOTES_SELECT: &str = "
    SELECT p.id, p.title, p.content, p.published, p.created_at, p.owner_id, u.email, u.created_at,
           COUNT(v.post_id) AS votes
    FROM posts p
    JOIN users u ON u.id = p.owner_id
    LEFT JOIN votes v ON v.post_id = p.id";

impl Database {
    // -- Users --

    /// Fails with [`DbError::Conflict`] when the email is already registered.
    pub fn create_user(&self, email: &str, password_hash: &str) -> Result<UserRow> {
        self.with_tx(|tx| {
            let user = tx.query_row(
                "INSERT INTO users (email, password) VALUES (?1, ?2)
                 RETURNING id, email, password, created_at",
                (email, password_hash),
                map_user,
            )?;
            Ok(user)
        })
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let user = conn
                .query_row(
                    "SELECT id, email, password, created_at FROM users WHERE id = ?1",
                    [id],
                    map_user,
                )
                .optional()?;
            Ok(user)
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let user = conn
                .query_row(
                    "SELECT id, email, password, created_at FROM users WHERE email = ?1",
                    [email],
                    map_user,
                )
                .optional()?;
            Ok(user)
        })
    }

    // -- Posts --

    pub fn create_post(&self, owner_id: i64, fields: &PostFields<'_>) -> Result<PostRow> {
        self.with_tx(|tx| {
            let id: i64 = tx.query_row(
                "INSERT INTO posts (title, content, published, owner_id) VALUES (?1, ?2, ?3, ?4)
                 RETURNING id",
                rusqlite::params![fields.title, fields.content, fields.published, owner_id],
                |row| row.get(0),
            )?;
            query_post(tx, id)?.ok_or(DbError::NotFound)
        })
    }

    /// Plain lookup without the vote aggregate, used for ownership checks.
    pub fn find_post(&self, id: i64) -> Result<Option<PostRow>> {
        self.with_conn(|conn| query_post(conn, id))
    }

    pub fn get_post(&self, id: i64) -> Result<PostWithVotes> {
        self.with_conn(|conn| {
            let sql = format!("{POST_WITH_VOTES_SELECT} WHERE p.id = ?1 GROUP BY p.id");
            let post = conn.query_row(&sql, [id], map_post_with_votes)?;
            Ok(post)
        })
    }

    /// Posts whose title contains `search` (case-sensitive, empty matches
    /// all), ordered by id.
    pub fn list_posts(&self, search: &str, limit: u32, offset: u32) -> Result<Vec<PostWithVotes>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{POST_WITH_VOTES_SELECT}
                 WHERE instr(p.title, ?1) > 0
                 GROUP BY p.id
                 ORDER BY p.id
                 LIMIT ?2 OFFSET ?3"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params![search, limit, offset], map_post_with_votes)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_post(&self, id: i64, fields: &PostFields<'_>) -> Result<PostRow> {
        self.with_tx(|tx| {
            let changed = tx.execute(
                "UPDATE posts SET title = ?1, content = ?2, published = ?3 WHERE id = ?4",
                rusqlite::params![fields.title, fields.content, fields.published, id],
            )?;
            if changed == 0 {
                return Err(DbError::NotFound);
            }
            query_post(tx, id)?.ok_or(DbError::NotFound)
        })
    }

    pub fn delete_post(&self, id: i64) -> Result<()> {
        self.with_tx(|tx| {
            let changed = tx.execute("DELETE FROM posts WHERE id = ?1", [id])?;
            if changed == 0 {
                return Err(DbError::NotFound);
            }
            Ok(())
        })
    }

    // -- Votes --

    /// `Add` inserts the (user, post) vote and fails with
    /// [`DbError::Conflict`] if it exists; `Remove` deletes it and fails with
    /// [`DbError::NotFound`] if it does not.
    pub fn cast_vote(&self, user_id: i64, post_id: i64, direction: VoteDirection) -> Result<()> {
        self.with_tx(|tx| match direction {
            VoteDirection::Add => {
                tx.execute(
                    "INSERT INTO votes (user_id, post_id) VALUES (?1, ?2)",
                    [user_id, post_id],
                )?;
                Ok(())
            }
            VoteDirection::Remove => {
                let changed = tx.execute(
                    "DELETE FROM votes WHERE user_id = ?1 AND post_id = ?2",
                    [user_id, post_id],
                )?;
                if changed == 0 {
                    return Err(DbError::NotFound);
                }
                Ok(())
            }
        })
    }
}

fn query_post(conn: &Connection, id: i64) -> Result<Option<PostRow>> {
    let sql = format!("{POST_SELECT} WHERE p.id = ?1");
    let post = conn.query_row(&sql, [id], map_post).optional()?;
    Ok(post)
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        email: row.get(1)?,
        password: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn map_post(row: &Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        published: row.get(3)?,
        created_at: row.get(4)?,
        owner_id: row.get(5)?,
        owner_email: row.get(6)?,
        owner_created_at: row.get(7)?,
    })
}

fn map_post_with_votes(row: &Row<'_>) -> rusqlite::Result<PostWithVotes> {
    Ok(PostWithVotes {
        post: map_post(row)?,
        votes: row.get(8)?,
    })
}
