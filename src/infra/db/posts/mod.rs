mod read;
mod types;
mod write;

use super::PostgresRepositories;

/// Columns selected for every post row, with its author and group joined in.
const POST_COLUMNS: &str = "p.id, p.text, p.created_at, p.author_id, u.username AS author_username, \
     p.group_id, g.slug AS group_slug, g.title AS group_title, p.image";

/// Joins that resolve author and group for rows aliased as `p`.
const POST_JOINS: &str =
    " INNER JOIN users u ON u.id = p.author_id LEFT JOIN groups g ON g.id = p.group_id ";
