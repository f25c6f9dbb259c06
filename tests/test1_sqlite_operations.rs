#![cfg(feature = "sqlite")]

use vsql::prelude::*;

struct Fixture {
    _dir: tempfile::TempDir,
    cs: ConnectionString,
    exec: QueryExecutor,
}

async fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let cs = ConnectionString::new(&format!("sqlite:{}", dir.path().join("ops.db").display()));
    let exec = QueryExecutor::default();
    exec.try_execute(
        &cs,
        "CREATE TABLE players (id INTEGER PRIMARY KEY, name TEXT NOT NULL, money INTEGER, note TEXT)",
        &ParamSet::new(),
    )
    .await
    .unwrap();
    Fixture {
        _dir: dir,
        cs,
        exec,
    }
}

async fn seed(f: &Fixture) {
    for (id, name, money) in [(1, "alice", 100), (2, "bob", 50), (3, "carol", 50)] {
        let params = ParamSet::new()
            .with("id", id)
            .with("name", name)
            .with("money", money);
        let affected = f
            .exec
            .execute(
                &f.cs,
                "INSERT INTO players (id, name, money) VALUES (@id, @name, @money)",
                &params,
            )
            .await;
        assert_eq!(affected, 1);
    }
}

#[tokio::test]
async fn execute_reports_rows_affected() {
    let f = fixture().await;
    seed(&f).await;

    let none = f
        .exec
        .execute(
            &f.cs,
            "UPDATE players SET money = 0 WHERE id = @id",
            &ParamSet::new().with("id", 99),
        )
        .await;
    assert_eq!(none, 0);

    let two = f
        .exec
        .execute(
            &f.cs,
            "UPDATE players SET money = money + @bonus WHERE money = @money",
            &ParamSet::new().with("bonus", 5).with("@money", 50),
        )
        .await;
    assert_eq!(two, 2);
    assert_eq!(f.exec.stats().opened(), f.exec.stats().closed());
}

#[tokio::test]
async fn fetch_scalar_returns_first_cell_or_null() {
    let f = fixture().await;
    seed(&f).await;

    let total = f
        .exec
        .fetch_scalar(&f.cs, "SELECT SUM(money), COUNT(*) FROM players", &ParamSet::new())
        .await;
    assert_eq!(total, RowValues::Int(200));

    let name = f
        .exec
        .fetch_scalar(
            &f.cs,
            "SELECT name FROM players WHERE id = :id",
            &ParamSet::new().with("id", 2),
        )
        .await;
    assert_eq!(name.as_text(), Some("bob"));

    let missing = f
        .exec
        .fetch_scalar(
            &f.cs,
            "SELECT name FROM players WHERE id = @id",
            &ParamSet::new().with("id", 42),
        )
        .await;
    assert!(missing.is_null());
}

#[tokio::test]
async fn fetch_all_keeps_every_column_and_explicit_nulls() {
    let f = fixture().await;
    seed(&f).await;

    let rows = f
        .exec
        .fetch_all(
            &f.cs,
            "SELECT id, name, money, note FROM players ORDER BY id",
            &ParamSet::new(),
        )
        .await;
    assert_eq!(rows.len(), 3);
    for row in &rows {
        assert_eq!(row.columns(), ["id", "name", "money", "note"]);
        assert_eq!(row.get("note"), Some(&RowValues::Null));
    }
    assert_eq!(rows[0].get("name").and_then(RowValues::as_text), Some("alice"));
    assert_eq!(rows[2].get("id").and_then(RowValues::as_int), Some(3));

    let empty = f
        .exec
        .fetch_all(&f.cs, "SELECT * FROM players WHERE id < 0", &ParamSet::new())
        .await;
    assert!(empty.is_empty());
}

#[tokio::test]
async fn null_parameter_binds_sql_null() {
    let f = fixture().await;
    seed(&f).await;

    let params = ParamSet::new().with("id", 1).with("note", RowValues::Null);
    f.exec
        .execute(&f.cs, "UPDATE players SET note = @note WHERE id = @id", &params)
        .await;
    let is_null = f
        .exec
        .fetch_scalar(
            &f.cs,
            "SELECT note IS NULL FROM players WHERE id = @id",
            &params,
        )
        .await;
    assert_eq!(is_null, RowValues::Int(1));
}

#[tokio::test]
async fn transaction_commits_with_shared_parameters() {
    let f = fixture().await;
    let params = ParamSet::new().with("id", 7).with("name", "dave");
    let committed = f
        .exec
        .transaction(
            &f.cs,
            &[
                "INSERT INTO players (id, name, money) VALUES (@id, @name, 0)".to_string(),
                "UPDATE players SET money = money + 10 WHERE id = @id".to_string(),
                "UPDATE players SET note = @name || ' joined' WHERE id = @id".to_string(),
            ],
            &params,
        )
        .await;
    assert!(committed);

    let rows = f
        .exec
        .fetch_all(&f.cs, "SELECT money, note FROM players WHERE id = @id", &params)
        .await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("money"), Some(&RowValues::Int(10)));
    assert_eq!(rows[0].get("note").and_then(RowValues::as_text), Some("dave joined"));
}

#[tokio::test]
async fn execute_accepts_row_returning_statements() {
    let f = fixture().await;

    let affected = f
        .exec
        .try_execute(
            &f.cs,
            "INSERT INTO players (id, name) VALUES (@id, @name) RETURNING id",
            &ParamSet::new().with("id", 5).with("name", "frank"),
        )
        .await
        .unwrap();
    assert_eq!(affected, 1);

    let selected = f
        .exec
        .try_execute(&f.cs, "SELECT 1", &ParamSet::new())
        .await
        .unwrap();
    assert_eq!(selected, 0);

    let committed = f
        .exec
        .transaction(
            &f.cs,
            &[
                "INSERT INTO players (id, name) VALUES (6, 'gina') RETURNING id".to_string(),
                "SELECT COUNT(*) FROM players".to_string(),
                "UPDATE players SET money = 5 RETURNING money".to_string(),
            ],
            &ParamSet::new(),
        )
        .await;
    assert!(committed);

    let total = f
        .exec
        .fetch_scalar(&f.cs, "SELECT SUM(money) FROM players", &ParamSet::new())
        .await;
    assert_eq!(total, RowValues::Int(10));
    assert_eq!(f.exec.stats().opened(), f.exec.stats().closed());
}

#[tokio::test]
async fn failed_statement_rolls_back_everything() {
    let f = fixture().await;
    seed(&f).await;

    let committed = f
        .exec
        .transaction(
            &f.cs,
            &[
                "UPDATE players SET money = 0".to_string(),
                "INSERT INTO players (id, name) VALUES (4, 'erin')".to_string(),
                "INSERT INTO players (id, name) VALUES (1, 'duplicate')".to_string(),
                "DELETE FROM players".to_string(),
            ],
            &ParamSet::new(),
        )
        .await;
    assert!(!committed);

    let count = f
        .exec
        .fetch_scalar(&f.cs, "SELECT COUNT(*) FROM players", &ParamSet::new())
        .await;
    assert_eq!(count, RowValues::Int(3));
    let money = f
        .exec
        .fetch_scalar(&f.cs, "SELECT SUM(money) FROM players", &ParamSet::new())
        .await;
    assert_eq!(money, RowValues::Int(200));
    assert_eq!(f.exec.stats().opened(), f.exec.stats().closed());
}

#[tokio::test]
async fn missing_parameter_is_a_failure_with_default() {
    let f = fixture().await;
    let err = f
        .exec
        .try_execute(
            &f.cs,
            "INSERT INTO players (id, name) VALUES (@id, @name)",
            &ParamSet::new().with("id", 1),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, VsqlError::ParameterError(_)));

    let affected = f
        .exec
        .execute(
            &f.cs,
            "INSERT INTO players (id, name) VALUES (@id, @name)",
            &ParamSet::new().with("id", 1),
        )
        .await;
    assert_eq!(affected, 0);
    assert_eq!(f.exec.stats().opened(), f.exec.stats().closed());
}

#[tokio::test]
async fn in_memory_database_does_not_outlive_an_operation() {
    let cs = ConnectionString::new("sqlite::memory:");
    let exec = QueryExecutor::default();
    let created = exec
        .try_execute(&cs, "CREATE TABLE scratch (id INTEGER)", &ParamSet::new())
        .await;
    assert!(created.is_ok());

    let err = exec
        .try_fetch_scalar(&cs, "SELECT COUNT(*) FROM scratch", &ParamSet::new())
        .await
        .unwrap_err();
    assert!(matches!(err, VsqlError::SqliteError(_)), "{err}");
    assert_eq!(exec.stats().opened(), 2);
    assert_eq!(exec.stats().closed(), 2);
}
