//! Database row types. These map directly to SQLite rows.
//! Distinct from quill-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: i64,
    pub email: String,
    pub password: String,
    pub created_at: String,
}

/// A post joined with its owner.
pub struct PostRow {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub published: bool,
    pub created_at: String,
    pub owner_id: i64,
    pub owner_email: String,
    pub owner_created_at: String,
}

pub struct PostWithVotes {
    pub post: PostRow,
    pub votes: i64,
}

/// Replacement values for an existing post.
pub struct PostFields<'a> {
    pub title: &'a str,
    pub content: &'a str,
    pub published: bool,
}

/// A vote is either cast or withdrawn; there is no downvote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteDirection {
    Remove,
    Add,
}

impl TryFrom<i64> for VoteDirection {
    type Error = i64;

    fn try_from(dir: i64) -> Result<Self, Self::Error> {
        match dir {
            0 => Ok(Self::Remove),
            1 => Ok(Self::Add),
            other => Err(other),
        }
    }
}
