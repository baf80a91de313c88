//! Ordered roadmap entries.
//!
//! Every branch keeps its `order_index` values dense: for `n` resources in a
//! branch the indices are exactly `0..n`. Append, delete and move are the only
//! ways to change an index, and each restores that property inside a single
//! transaction before returning.

use crate::models::{Direction, Resource, DEFAULT_BRANCH};
use rusqlite::{params, Connection, OptionalExtension, Row};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum OrderingError {
    #[error("Resource title and URL are required")]
    MissingField,
    #[error("Resource {0} not found")]
    NotFound(i64),
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),
}

/// What a move actually did. Moving past either end of a branch is not an
/// error, the list is simply left as it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Swapped { with: i64 },
    AtBoundary,
}

const SELECT_RESOURCE: &str = "SELECT id, title, url, order_index, COALESCE(branch, 'main'), parent_id FROM resources";

fn row_to_resource(row: &Row) -> rusqlite::Result<Resource> {
    Ok(Resource {
        id: row.get(0)?,
        title: row.get(1)?,
        url: row.get(2)?,
        order_index: row.get(3)?,
        branch: row.get(4)?,
        parent_id: row.get(5)?,
    })
}

/// All resources, grouped by branch and ordered within each.
pub fn list_all(conn: &Connection) -> rusqlite::Result<Vec<Resource>> {
    let mut stmt = conn.prepare(&format!(
        "{} ORDER BY COALESCE(branch, 'main') ASC, order_index ASC",
        SELECT_RESOURCE
    ))?;
    let rows = stmt.query_map([], row_to_resource)?;
    rows.collect()
}

pub fn list_scope(conn: &Connection, branch: &str) -> rusqlite::Result<Vec<Resource>> {
    let mut stmt = conn.prepare(&format!(
        "{} WHERE COALESCE(branch, 'main') = ?1 ORDER BY order_index ASC",
        SELECT_RESOURCE
    ))?;
    let rows = stmt.query_map([branch], row_to_resource)?;
    rows.collect()
}

/// Adds a resource at the end of `branch`.
pub fn append(
    conn: &mut Connection,
    title: &str,
    url: &str,
    branch: &str,
) -> Result<Resource, OrderingError> {
    let title = title.trim();
    let url = url.trim();
    if title.is_empty() || url.is_empty() {
        return Err(OrderingError::MissingField);
    }

    let tx = conn.transaction()?;
    let next_index: i64 = tx.query_row(
        "SELECT COALESCE(MAX(order_index), -1) + 1 FROM resources WHERE COALESCE(branch, 'main') = ?1",
        [branch],
        |row| row.get(0),
    )?;
    tx.execute(
        "INSERT INTO resources (title, url, order_index, branch, parent_id) VALUES (?1, ?2, ?3, ?4, NULL)",
        params![title, url, next_index, branch],
    )?;
    let id = tx.last_insert_rowid();
    tx.commit()?;

    info!(id, branch, order_index = next_index, "resource appended");
    Ok(Resource {
        id,
        title: title.to_string(),
        url: url.to_string(),
        order_index: next_index,
        branch: branch.to_string(),
        parent_id: None,
    })
}

/// Removes a resource and closes the gap it leaves in its branch.
/// Returns false when no such resource exists.
pub fn delete(conn: &mut Connection, id: i64) -> Result<bool, OrderingError> {
    let tx = conn.transaction()?;
    let found: Option<(i64, String)> = tx
        .query_row(
            "SELECT order_index, COALESCE(branch, 'main') FROM resources WHERE id = ?1",
            [id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    let Some((order_index, branch)) = found else {
        return Ok(false);
    };

    tx.execute("DELETE FROM resources WHERE id = ?1", [id])?;
    let shifted = tx.execute(
        "UPDATE resources SET order_index = order_index - 1
         WHERE COALESCE(branch, 'main') = ?1 AND order_index > ?2",
        params![branch, order_index],
    )?;
    tx.commit()?;

    info!(id, branch = %branch, shifted, "resource deleted");
    Ok(true)
}

/// Swaps a resource with its neighbour in `direction`.
pub fn move_resource(
    conn: &mut Connection,
    id: i64,
    direction: Direction,
) -> Result<MoveOutcome, OrderingError> {
    let tx = conn.transaction()?;
    let found: Option<(i64, String)> = tx
        .query_row(
            "SELECT order_index, COALESCE(branch, 'main') FROM resources WHERE id = ?1",
            [id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    let (current, branch) = found.ok_or(OrderingError::NotFound(id))?;
    let target = current + direction.offset();

    let other: Option<i64> = tx
        .query_row(
            "SELECT id FROM resources WHERE COALESCE(branch, 'main') = ?1 AND order_index = ?2",
            params![branch, target],
            |row| row.get(0),
        )
        .optional()?;
    let Some(other_id) = other else {
        return Ok(MoveOutcome::AtBoundary);
    };

    tx.execute(
        "UPDATE resources SET order_index = ?1 WHERE id = ?2",
        params![target, id],
    )?;
    tx.execute(
        "UPDATE resources SET order_index = ?1 WHERE id = ?2",
        params![current, other_id],
    )?;
    tx.commit()?;

    info!(id, other_id, %direction, branch = %branch, "resource moved");
    Ok(MoveOutcome::Swapped { with: other_id })
}

/// Renumbers one branch to `0..n`, keeping the existing relative order.
/// Returns how many rows changed.
pub fn compact_scope(conn: &Connection, branch: &str) -> rusqlite::Result<usize> {
    let ids: Vec<(i64, i64)> = {
        let mut stmt = conn.prepare(
            "SELECT id, order_index FROM resources
             WHERE COALESCE(branch, 'main') = ?1 ORDER BY order_index ASC, id ASC",
        )?;
        let rows = stmt.query_map([branch], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect::<rusqlite::Result<_>>()?
    };

    let mut changed = 0;
    for (position, (id, order_index)) in ids.into_iter().enumerate() {
        let position = position as i64;
        if order_index != position {
            conn.execute(
                "UPDATE resources SET order_index = ?1 WHERE id = ?2",
                params![position, id],
            )?;
            changed += 1;
        }
    }
    Ok(changed)
}

pub fn compact_all(conn: &Connection) -> rusqlite::Result<()> {
    let branches: Vec<String> = {
        let mut stmt =
            conn.prepare("SELECT DISTINCT COALESCE(branch, 'main') FROM resources")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<rusqlite::Result<_>>()?
    };
    for branch in branches {
        compact_scope(conn, &branch)?;
    }
    Ok(())
}

/// Resources drawn on the public roadmap.
pub fn roadmap(conn: &Connection) -> rusqlite::Result<Vec<Resource>> {
    list_scope(conn, DEFAULT_BRANCH)
}
