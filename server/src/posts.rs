use crate::models::Post;
use rusqlite::{params, Connection, OptionalExtension, Row};
use thiserror::Error;
use tracing::info;

pub const TAGS_PREFIX: &str = "Tags:";
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Error, Debug)]
pub enum PostError {
    #[error("Title and content are required")]
    MissingField,
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),
}

/// Validated title and content, with tags already folded into the content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
}

impl PostDraft {
    /// Draft for a new post: tags, if any, are appended as a trailing
    /// `Tags:` line.
    pub fn new(title: &str, content: &str, tags: &str) -> Result<Self, PostError> {
        let tags = tags.trim();
        let mut content = content.trim().to_string();
        if !tags.is_empty() {
            content = format!("{}\n\n{} {}", content, TAGS_PREFIX, tags);
        }
        Self::validated(title, content)
    }

    /// Draft for an edit: a non-empty `tags` replaces whatever `Tags:` line
    /// the submitted content carries. Empty tags leave the content alone.
    pub fn edited(title: &str, content: &str, tags: &str) -> Result<Self, PostError> {
        let content = replace_tags(content.trim(), tags.trim());
        Self::validated(title, content)
    }

    fn validated(title: &str, content: String) -> Result<Self, PostError> {
        let title = title.trim();
        if title.is_empty() || content.is_empty() {
            return Err(PostError::MissingField);
        }
        Ok(PostDraft {
            title: title.to_string(),
            content,
        })
    }
}

/// Drops every line starting with `Tags:` and appends a fresh one.
///
/// Any body line that happens to start with `Tags:` is dropped too; tags have
/// no column of their own.
pub fn replace_tags(content: &str, tags: &str) -> String {
    if tags.is_empty() {
        return content.to_string();
    }
    let body = content
        .lines()
        .filter(|line| !line.starts_with(TAGS_PREFIX))
        .collect::<Vec<_>>()
        .join("\n");
    // blank lines that separated the old tags line would otherwise pile up
    let body = body.trim_end();
    format!("{}\n\n{} {}", body, TAGS_PREFIX, tags)
}

/// Tags parsed back out of the trailing `Tags:` line, for display.
pub fn extract_tags(content: &str) -> Vec<String> {
    content
        .lines()
        .rev()
        .find_map(|line| line.strip_prefix(TAGS_PREFIX))
        .map(|rest| {
            rest.split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

fn row_to_post(row: &Row) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        title: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        content: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        date: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        image: row.get(4)?,
    })
}

/// Newest first.
pub fn list(conn: &Connection) -> rusqlite::Result<Vec<Post>> {
    let mut stmt =
        conn.prepare("SELECT id, title, content, date, image FROM posts ORDER BY id DESC")?;
    let rows = stmt.query_map([], row_to_post)?;
    rows.collect()
}

pub fn get(conn: &Connection, id: i64) -> rusqlite::Result<Option<Post>> {
    conn.query_row(
        "SELECT id, title, content, date, image FROM posts WHERE id = ?1",
        [id],
        row_to_post,
    )
    .optional()
}

pub fn now_date() -> String {
    chrono::Local::now().format(DATE_FORMAT).to_string()
}

pub fn insert(
    conn: &Connection,
    draft: &PostDraft,
    date: &str,
    image: Option<&str>,
) -> rusqlite::Result<Post> {
    conn.execute(
        "INSERT INTO posts (title, content, date, image) VALUES (?1, ?2, ?3, ?4)",
        params![draft.title, draft.content, date, image],
    )?;
    let id = conn.last_insert_rowid();
    info!(id, title = %draft.title, "post created");
    Ok(Post {
        id,
        title: draft.title.clone(),
        content: draft.content.clone(),
        date: date.to_string(),
        image: image.map(String::from),
    })
}

/// Rewrites title, content and image. The creation date is never touched.
/// Returns false when the post does not exist.
pub fn update(
    conn: &Connection,
    id: i64,
    draft: &PostDraft,
    image: Option<&str>,
) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "UPDATE posts SET title = ?1, content = ?2, image = ?3 WHERE id = ?4",
        params![draft.title, draft.content, image, id],
    )?;
    if changed > 0 {
        info!(id, "post updated");
    }
    Ok(changed > 0)
}

pub fn delete(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    let changed = conn.execute("DELETE FROM posts WHERE id = ?1", [id])?;
    if changed > 0 {
        info!(id, "post deleted");
    }
    Ok(changed > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database;

    fn memory_db() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        database::migrate(&mut conn).unwrap();
        conn
    }

    #[test]
    fn new_draft_appends_tags() {
        let draft = PostDraft::new(" Hello ", "Body text", "rust, web").unwrap();
        assert_eq!(draft.title, "Hello");
        assert_eq!(draft.content, "Body text\n\nTags: rust, web");

        let untagged = PostDraft::new("Hello", "Body text", "  ").unwrap();
        assert_eq!(untagged.content, "Body text");
    }

    #[test]
    fn drafts_require_title_and_content() {
        assert!(matches!(PostDraft::new("", "Body", ""), Err(PostError::MissingField)));
        assert!(matches!(PostDraft::new("Title", "   ", ""), Err(PostError::MissingField)));
        assert!(matches!(PostDraft::edited(" ", "Body", "x"), Err(PostError::MissingField)));
    }

    #[test]
    fn replace_tags_swaps_existing_line() {
        let content = "First line\nSecond line\n\nTags: old";
        let replaced = replace_tags(content, "new, shiny");
        assert_eq!(replaced, "First line\nSecond line\n\nTags: new, shiny");
        assert_eq!(replaced.matches("Tags:").count(), 1);
    }

    #[test]
    fn replace_tags_appends_when_absent() {
        assert_eq!(replace_tags("Just a body", "rust"), "Just a body\n\nTags: rust");
    }

    #[test]
    fn replace_tags_is_stable_across_edits() {
        let once = replace_tags("Body", "a");
        let twice = replace_tags(&once, "b");
        let thrice = replace_tags(&twice, "c");
        assert_eq!(thrice, "Body\n\nTags: c");
    }

    #[test]
    fn replace_tags_without_tags_keeps_content() {
        let content = "Body\n\nTags: keep";
        assert_eq!(replace_tags(content, ""), content);
        assert_eq!(PostDraft::edited("T", content, "").unwrap().content, content);
    }

    #[test]
    fn extract_tags_reads_last_line() {
        assert_eq!(extract_tags("Body\n\nTags: rust, , web "), vec!["rust", "web"]);
        assert!(extract_tags("No tags here").is_empty());
    }

    #[test]
    fn crud_round_trip() {
        let conn = memory_db();
        let first = insert(
            &conn,
            &PostDraft::new("First", "one", "").unwrap(),
            "2024-01-01 09:30",
            None,
        )
        .unwrap();
        let second = insert(
            &conn,
            &PostDraft::new("Second", "two", "").unwrap(),
            "2024-01-02 10:00",
            Some("cover_1700000000.png"),
        )
        .unwrap();

        let ids: Vec<_> = list(&conn).unwrap().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
        assert_eq!(get(&conn, second.id).unwrap(), Some(second.clone()));

        let edit = PostDraft::edited("First (edited)", "one more", "notes").unwrap();
        assert!(update(&conn, first.id, &edit, Some("new_1.jpg")).unwrap());
        let reloaded = get(&conn, first.id).unwrap().unwrap();
        assert_eq!(reloaded.title, "First (edited)");
        assert_eq!(reloaded.content, "one more\n\nTags: notes");
        assert_eq!(reloaded.date, "2024-01-01 09:30");
        assert_eq!(reloaded.image.as_deref(), Some("new_1.jpg"));

        assert!(delete(&conn, first.id).unwrap());
        assert!(!delete(&conn, first.id).unwrap());
        assert_eq!(get(&conn, first.id).unwrap(), None);
        assert!(!update(&conn, first.id, &edit, None).unwrap());
    }

    #[test]
    fn now_date_uses_minute_precision() {
        let date = now_date();
        assert!(chrono::NaiveDateTime::parse_from_str(&date, DATE_FORMAT).is_ok());
    }
}
