//! Integration tests using testcontainers with Postgres 18.
//!
//! The scenario schema is a movie theater: genres, movies (with a primary
//! and an optional secondary genre, both referencing genres), and sold
//! tickets referencing movies.

use std::sync::Arc;

use marquee::sql::{Expr, Value};
use marquee::{Column, Db, Error, PgType, Schema, Session, Table};
use rust_decimal::Decimal;
use testcontainers::{ImageExt, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio_postgres::NoTls;

fn movie_schema() -> Schema {
    Schema::new()
        .table(
            Table::new("genres")
                .column(
                    Column::new("GenreId", PgType::Integer)
                        .primary_key()
                        .auto_generated(),
                )
                .column(Column::new("Name", PgType::Text)),
        )
        .table(
            Table::new("movies")
                .column(
                    Column::new("MovieId", PgType::Integer)
                        .primary_key()
                        .auto_generated(),
                )
                .column(Column::new("Name", PgType::Text))
                .column(Column::new("GenreId", PgType::Integer))
                .column(Column::new("SecondaryGenreId", PgType::Integer).nullable())
                .foreign_key("GenreId", "genres", "GenreId")
                .foreign_key("SecondaryGenreId", "genres", "GenreId"),
        )
        .table(
            Table::new("tickets")
                .column(
                    Column::new("TicketId", PgType::Integer)
                        .primary_key()
                        .auto_generated(),
                )
                .column(Column::new("MovieId", PgType::Integer))
                .column(Column::new("Price", PgType::Numeric))
                .column(Column::new("SoldTo", PgType::Text))
                .column(Column::new("Age", PgType::Integer))
                .foreign_key("MovieId", "movies", "MovieId"),
        )
}

async fn create_postgres_container() -> (
    testcontainers::ContainerAsync<Postgres>,
    tokio_postgres::Client,
) {
    let container = Postgres::default()
        .with_tag("18")
        .start()
        .await
        .expect("Failed to start Postgres container");

    let host = container.get_host().await.unwrap();
    let port = container.get_host_port_ipv4(5432).await.unwrap();

    let connection_string = format!(
        "host={} port={} user=postgres password=postgres dbname=postgres",
        host, port
    );

    let (client, connection) = tokio_postgres::connect(&connection_string, NoTls)
        .await
        .expect("Failed to connect to Postgres");

    // Spawn connection handler
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            eprintln!("Connection error: {}", e);
        }
    });

    (container, client)
}

async fn bootstrap(client: &tokio_postgres::Client) {
    client
        .batch_execute(
            r#"
            CREATE TABLE genres (
                "GenreId" SERIAL PRIMARY KEY,
                "Name" TEXT NOT NULL
            );
            CREATE TABLE movies (
                "MovieId" SERIAL PRIMARY KEY,
                "Name" TEXT NOT NULL,
                "GenreId" INTEGER NOT NULL REFERENCES genres("GenreId"),
                "SecondaryGenreId" INTEGER REFERENCES genres("GenreId")
            );
            CREATE TABLE tickets (
                "TicketId" SERIAL PRIMARY KEY,
                "MovieId" INTEGER NOT NULL REFERENCES movies("MovieId"),
                "Price" NUMERIC NOT NULL,
                "SoldTo" TEXT NOT NULL,
                "Age" INTEGER NOT NULL
            );
            "#,
        )
        .await
        .expect("Failed to create schema");
}

fn field<'r>(row: &'r marquee::Row, name: &str) -> &'r Value {
    row.iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v)
        .unwrap_or_else(|| panic!("no column {name} in row {row:?}"))
}

#[tokio::test]
#[ignore = "requires a running Docker daemon"]
async fn test_single_insert_with_embedded_quote() {
    let (_container, client) = create_postgres_container().await;
    bootstrap(&client).await;

    // Connections flow through a provider-backed session.
    let session = Session::new(Arc::new(client), movie_schema());
    let lease = session.lease().await.unwrap();
    let db = lease.db();

    let result = db
        .insert("genres")
        .unwrap()
        .columns(["Name"])
        .values(["Genre's One and Only"])
        .execute()
        .await
        .unwrap();

    assert_eq!(result.rows_affected, 1);
    let id = result.generated_id.expect("generated id");

    // The quote survived the round trip intact.
    let row = db
        .select("genres")
        .unwrap()
        .columns(["Name"])
        .unwrap()
        .filter(Expr::column("GenreId").eq(Expr::param("id", id as i32)))
        .one()
        .await
        .unwrap()
        .expect("inserted row");
    assert_eq!(field(&row, "Name"), &Value::from("Genre's One and Only"));
}

#[tokio::test]
#[ignore = "requires a running Docker daemon"]
async fn test_generated_id_usable_as_foreign_key() {
    let (_container, client) = create_postgres_container().await;
    bootstrap(&client).await;
    let schema = movie_schema();
    let db = Db::new(&client, &schema);

    let genre = db
        .insert("genres")
        .unwrap()
        .columns(["Name"])
        .values(["Genre's One and Only"])
        .execute()
        .await
        .unwrap();
    let genre_id = genre.generated_id.unwrap() as i32;

    let secondary = db
        .insert("genres")
        .unwrap()
        .columns(["Name"])
        .values(["Genre's Second."])
        .execute()
        .await
        .unwrap();
    let secondary_id = secondary.generated_id.unwrap() as i32;

    let movie = db
        .insert("movies")
        .unwrap()
        .columns(["Name", "GenreId", "SecondaryGenreId"])
        .values([
            Value::from("National Lampoon's Vacation"),
            Value::from(genre_id),
            Value::from(secondary_id),
        ])
        .execute()
        .await
        .unwrap();
    assert_eq!(movie.rows_affected, 1);
    let movie_id = movie.generated_id.unwrap() as i32;

    let ticket = db
        .insert("tickets")
        .unwrap()
        .columns(["MovieId", "Price", "SoldTo", "Age"])
        .values([
            Value::from(movie_id),
            Value::from(Decimal::new(100, 2)),
            Value::from("Andy Meadows"),
            Value::from(95i32),
        ])
        .execute()
        .await
        .unwrap();
    assert_eq!(ticket.rows_affected, 1);
    assert!(ticket.generated_id.is_some());
}

#[tokio::test]
#[ignore = "requires a running Docker daemon"]
async fn test_batch_insert_in_queue_order() {
    let (_container, client) = create_postgres_container().await;
    bootstrap(&client).await;

    // Batches work over a leased connection like everything else.
    let session = Session::new(Arc::new(client), movie_schema());
    let lease = session.lease().await.unwrap();
    let db = lease.db();

    let mut batch = db.batch();
    batch.queue(
        db.insert("genres")
            .unwrap()
            .columns(["Name"])
            .values(["Genre's Third"])
            .build()
            .unwrap(),
    );
    batch.queue(
        db.insert("genres")
            .unwrap()
            .columns(["Name"])
            .values(["Genre's Fourth"])
            .build()
            .unwrap(),
    );

    let results = batch.execute().await.unwrap();
    assert_eq!(results.len(), 2);

    // Queue order: ids are assigned in sequence.
    let first = results[0].generated_id.unwrap();
    let second = results[1].generated_id.unwrap();
    assert!(second > first, "expected {second} > {first}");

    // No parameter from statement 1 leaked into statement 2.
    let rows = db
        .select("genres")
        .unwrap()
        .columns(["Name"])
        .unwrap()
        .filter(Expr::column("GenreId").eq(Expr::param("id", second as i32)))
        .all()
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(field(&rows[0], "Name"), &Value::from("Genre's Fourth"));
}

#[tokio::test]
#[ignore = "requires a running Docker daemon"]
async fn test_batch_fails_fast_and_rolls_back() {
    let (_container, client) = create_postgres_container().await;
    bootstrap(&client).await;
    let schema = movie_schema();
    let db = Db::new(&client, &schema);

    let mut batch = db.batch();
    batch.queue(
        db.insert("genres")
            .unwrap()
            .columns(["Name"])
            .values(["Genre's Third"])
            .build()
            .unwrap(),
    );
    // Violates the foreign key: no such genre.
    batch.queue(
        db.insert("movies")
            .unwrap()
            .columns(["Name", "GenreId"])
            .values([Value::from("Orphan Movie"), Value::from(999_999i32)])
            .build()
            .unwrap(),
    );
    batch.queue(
        db.insert("genres")
            .unwrap()
            .columns(["Name"])
            .values(["Genre's Fourth"])
            .build()
            .unwrap(),
    );

    let err = batch.execute().await.unwrap_err();
    match err {
        Error::BatchExecution { index, sql, .. } => {
            assert_eq!(index, 1);
            assert!(sql.contains("\"movies\""), "sql was: {sql}");
        }
        other => panic!("expected BatchExecution, got {other:?}"),
    }

    // The transaction rolled back: statement 0's insert is gone too.
    let count = db.select("genres").unwrap().count().await.unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
#[ignore = "requires a running Docker daemon"]
async fn test_contains_filter_with_quoted_values() {
    let (_container, client) = create_postgres_container().await;
    bootstrap(&client).await;
    let schema = movie_schema();
    let db = Db::new(&client, &schema);

    for name in ["Genre's One and Only", "Genre's Second", "Unrelated"] {
        db.insert("genres")
            .unwrap()
            .columns(["Name"])
            .values([name])
            .execute()
            .await
            .unwrap();
    }

    let rows = db
        .select("genres")
        .unwrap()
        .columns(["GenreId", "Name"])
        .unwrap()
        .filter(Expr::column("Name").in_list(
            "Name",
            ["Genre's One and Only", "Genre's Second"],
        ))
        .all()
        .await
        .unwrap();

    assert_eq!(rows.len(), 2);
}

#[tokio::test]
#[ignore = "requires a running Docker daemon"]
async fn test_self_join_projection() {
    let (_container, client) = create_postgres_container().await;
    bootstrap(&client).await;
    let schema = movie_schema();
    let db = Db::new(&client, &schema);

    let comedy = db
        .insert("genres")
        .unwrap()
        .columns(["Name"])
        .values(["Comedy"])
        .execute()
        .await
        .unwrap()
        .generated_id
        .unwrap() as i32;
    let road = db
        .insert("genres")
        .unwrap()
        .columns(["Name"])
        .values(["Road Movie"])
        .execute()
        .await
        .unwrap()
        .generated_id
        .unwrap() as i32;

    let movie_id = db
        .insert("movies")
        .unwrap()
        .columns(["Name", "GenreId", "SecondaryGenreId"])
        .values([
            Value::from("National Lampoon's Vacation"),
            Value::from(comedy),
            Value::from(road),
        ])
        .execute()
        .await
        .unwrap()
        .generated_id
        .unwrap() as i32;

    db.insert("tickets")
        .unwrap()
        .columns(["MovieId", "Price", "SoldTo", "Age"])
        .values([
            Value::from(movie_id),
            Value::from(Decimal::new(100, 2)),
            Value::from("Andy Meadows"),
            Value::from(95i32),
        ])
        .execute()
        .await
        .unwrap();

    // tickets → movies → genres (twice, aliased) for one movie.
    let rows = db
        .select("tickets")
        .unwrap()
        .column_of("movies", "Name")
        .column_of("g1", "Name")
        .column_of("g2", "Name")
        .column_of("tickets", "Price")
        .join(
            "movies",
            Expr::qualified_column("tickets", "MovieId")
                .eq(Expr::qualified_column("movies", "MovieId")),
        )
        .unwrap()
        .join_as(
            "genres",
            "g1",
            Expr::qualified_column("movies", "GenreId")
                .eq(Expr::qualified_column("g1", "GenreId")),
        )
        .unwrap()
        .join_as(
            "genres",
            "g2",
            Expr::qualified_column("movies", "SecondaryGenreId")
                .eq(Expr::qualified_column("g2", "GenreId")),
        )
        .unwrap()
        .filter(Expr::qualified_column("tickets", "MovieId").eq(Expr::param("MovieId", movie_id)))
        .all()
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    // Projection order: movie name, primary genre, secondary genre, price.
    assert_eq!(row[0].1, Value::from("National Lampoon's Vacation"));
    assert_eq!(row[1].1, Value::from("Comedy"));
    assert_eq!(row[2].1, Value::from("Road Movie"));
    assert_eq!(row[3].1, Value::from(Decimal::new(100, 2)));
}

#[tokio::test]
#[ignore = "requires a running Docker daemon"]
async fn test_execution_error_carries_rendered_sql() {
    let (_container, client) = create_postgres_container().await;
    bootstrap(&client).await;
    let schema = movie_schema();
    let db = Db::new(&client, &schema);

    // Valid against the descriptor, rejected by the backend (no such
    // column on the real table).
    let stale_schema = Schema::new().table(
        Table::new("genres")
            .column(Column::new("GenreId", PgType::Integer).primary_key())
            .column(Column::new("Slug", PgType::Text)),
    );
    let stale_db = Db::new(&client, &stale_schema);

    let err = stale_db
        .insert("genres")
        .unwrap()
        .columns(["Slug"])
        .values(["horror"])
        .execute()
        .await
        .unwrap_err();

    match err {
        Error::Execution { sql, params, .. } => {
            assert!(sql.contains("\"Slug\""), "sql was: {sql}");
            assert_eq!(params, vec![Value::from("horror")]);
        }
        other => panic!("expected Execution, got {other:?}"),
    }

    // count() failures carry the same context.
    let err = stale_db
        .select("genres")
        .unwrap()
        .filter(Expr::column("Slug").eq(Expr::param("slug", "horror")))
        .count()
        .await
        .unwrap_err();
    match err {
        Error::Execution { sql, params, .. } => {
            assert!(sql.contains("COUNT(*)"), "sql was: {sql}");
            assert_eq!(params, vec![Value::from("horror")]);
        }
        other => panic!("expected Execution, got {other:?}"),
    }

    // The same connection keeps working afterwards.
    db.execute_raw("delete from tickets; delete from movies; delete from genres;")
        .await
        .unwrap();
}
