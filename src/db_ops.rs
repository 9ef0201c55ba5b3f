use super::{config, models};
use anyhow::Result;
use sqlx::{
    query, query_as,
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions},
};
use std::str::FromStr;

pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    let options =
        SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(config::DB_MAX_CONNECTIONS)
        .connect_with(options)
        .await?;
    migrate(&pool).await?;

    Ok(pool)
}

pub async fn migrate(db: &SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations").run(db).await?;

    Ok(())
}

#[derive(sqlx::FromRow)]
struct QRes {
    id: i64,
    content: String,
    done: i64,
}

pub async fn get_todos(db: &SqlitePool) -> Result<Vec<models::Todo>> {
    let res = query_as::<_, QRes>(
        "select id, content, done from todos
        order by id",
    )
    .fetch_all(db)
    .await?;

    res.into_iter()
        .map(|row| -> Result<models::Todo> {
            Ok(models::Todo {
                id: row.id,
                content: row.content,
                done: models::Done::try_from(row.done)?,
            })
        })
        .collect()
}

pub async fn add_todo(db: &SqlitePool, content: &str) -> Result<i64> {
    let res = query("insert into todos (content, done) values (?, 0)")
        .bind(content)
        .execute(db)
        .await?;

    Ok(res.last_insert_rowid())
}

/// Returns whether a row was updated. Updating an id which does not exist is
/// not an error.
pub async fn set_done(
    db: &SqlitePool,
    id: i64,
    done: models::Done,
) -> Result<bool> {
    let res = query("update todos set done = ? where id = ?")
        .bind(i64::from(done))
        .bind(id)
        .execute(db)
        .await?;

    Ok(res.rows_affected() > 0)
}

/// Single-connection in-memory database; every connection to `:memory:` is
/// its own database, so the pool must never open a second one.
#[cfg(test)]
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    migrate(&pool).await.expect("migrations run");
    pool
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Done;

    #[tokio::test]
    async fn test_add_then_list() {
        let db = test_pool().await;
        let first = add_todo(&db, "buy milk").await.expect("insert");
        let second = add_todo(&db, "call mom").await.expect("insert");
        assert!(second > first);

        let todos = get_todos(&db).await.expect("list");
        assert_eq!(todos.len(), 2);
        assert_eq!(todos[0].content, "buy milk");
        assert_eq!(todos[1].content, "call mom");
        assert!(todos.iter().all(|t| t.done == Done::Pending));
    }

    #[tokio::test]
    async fn test_set_done() {
        let db = test_pool().await;
        let id = add_todo(&db, "buy milk").await.expect("insert");

        assert!(set_done(&db, id, Done::Complete).await.expect("update"));
        let todos = get_todos(&db).await.expect("list");
        assert_eq!(todos[0].done, Done::Complete);

        assert!(set_done(&db, id, Done::Pending).await.expect("update"));
        let todos = get_todos(&db).await.expect("list");
        assert_eq!(todos[0].done, Done::Pending);
    }

    #[tokio::test]
    async fn test_set_done_missing_id_is_noop() {
        let db = test_pool().await;
        add_todo(&db, "buy milk").await.expect("insert");

        let updated = set_done(&db, 999, Done::Complete).await.expect("update");
        assert!(!updated);
        let todos = get_todos(&db).await.expect("list");
        assert_eq!(todos[0].done, Done::Pending);
    }

    #[tokio::test]
    async fn test_corrupt_flag_is_an_error() {
        let db = test_pool().await;
        query("insert into todos (content, done) values ('weird', 7)")
            .execute(&db)
            .await
            .expect("raw insert");

        assert!(get_todos(&db).await.is_err());
    }
}
