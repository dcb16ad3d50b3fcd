use gudgeon_domain::DomainError;
use sqlx::{Row, SqlitePool};

pub struct SqliteRule {
    pub domain: String,
    pub action: String,
    pub group: String,
}

/// Loads the `rules` table backing the sqlite and composite (bloom/hash +
/// sqlite) rule-store backends. Schema: `rules(domain TEXT, action TEXT,
/// group_name TEXT)`, action is `allow` or `block`.
pub async fn load_rules(pool: &SqlitePool) -> Result<Vec<SqliteRule>, DomainError> {
    let rows = sqlx::query("SELECT domain, action, group_name FROM rules")
        .fetch_all(pool)
        .await
        .map_err(|e| DomainError::Sqlite(e.to_string()))?;

    Ok(rows
        .iter()
        .map(|row| SqliteRule {
            domain: row.get::<String, _>("domain").to_ascii_lowercase(),
            action: row.get::<String, _>("action"),
            group: row.get::<String, _>("group_name"),
        })
        .collect())
}
