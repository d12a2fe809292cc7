use sqlx::SqliteConnection;

use crate::db_types::Chama;

pub async fn insert_chama(name: &str, conn: &mut SqliteConnection) -> Result<Chama, sqlx::Error> {
    sqlx::query_as("INSERT INTO chamas (name) VALUES ($1) RETURNING *").bind(name).fetch_one(conn).await
}

pub async fn fetch_chama(chama_id: i64, conn: &mut SqliteConnection) -> Result<Option<Chama>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM chamas WHERE id = $1").bind(chama_id).fetch_optional(conn).await
}
