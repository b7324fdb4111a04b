use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use sales_loader::error::EtlError;
use sales_loader::load::{self, PipelineOptions};
use sales_loader::test_support::{TestDatabase, TestDatabaseError};
use std::fs::File;
use std::io::Write;
use tempfile::NamedTempFile;

const HEADER: &str = "Order ID,Order Date,Product,Product_ean,Quantity Ordered,Purchase Address,Price Each,Cost price,turnover\n";

async fn provision() -> Option<TestDatabase> {
    match TestDatabase::new().await {
        Ok(db) => Some(db),
        Err(TestDatabaseError::Container(err)) => {
            eprintln!("skipping pipeline test: no container runtime ({err})");
            None
        }
        Err(err) => panic!("failed to provision test database: {err:?}"),
    }
}

/// Write a fixture CSV to disk and reopen it for reading, the way the
/// binary consumes a real export file.
fn fixture_file(rows: &str) -> File {
    let mut tmp = NamedTempFile::new().expect("create fixture csv");
    tmp.write_all(HEADER.as_bytes()).expect("write header");
    tmp.write_all(rows.as_bytes()).expect("write rows");
    tmp.flush().expect("flush fixture csv");
    tmp.reopen().expect("reopen fixture csv")
}

async fn table_count(pool: &sqlx::PgPool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .expect("count query")
}

#[tokio::test]
async fn two_row_file_loads_all_three_tables() {
    let Some(test_db) = provision().await else {
        return;
    };
    let pool = test_db.pool_clone();

    let file = fixture_file(
        "141234,2019-01-22 21:25,iPhone,5638008983335.0,1,\"944 Walnut St, Boston, MA 02215\",700.0,231.0,700.0\n\
         141235,2019-01-28 14:15,Lightning Charging Cable,5563319511488.0,1,\"185 Maple St, Portland, OR 97035\",14.95,7.475,14.95\n",
    );

    let summary = load::run(file, pool.clone(), PipelineOptions::default())
        .await
        .expect("pipeline run");

    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.decode_errors, 0);
    assert_eq!(summary.loaded, 2);
    assert_eq!(summary.attempted, summary.loaded + summary.decode_errors);

    assert_eq!(table_count(&pool, "purchase_orders").await, 2);
    assert_eq!(table_count(&pool, "line_items").await, 2);
    assert_eq!(table_count(&pool, "order_address").await, 2);

    let order_date: DateTime<Utc> =
        sqlx::query_scalar("SELECT order_date FROM purchase_orders WHERE order_id = 141234")
            .fetch_one(&pool)
            .await
            .expect("order row");
    assert_eq!(
        order_date,
        Utc.with_ymd_and_hms(2019, 1, 22, 21, 25, 0).unwrap()
    );

    let (product_ean, quantity, price): (String, i64, Decimal) = sqlx::query_as(
        "SELECT product_ean, quantity, price FROM line_items WHERE order_id = 141234",
    )
    .fetch_one(&pool)
    .await
    .expect("line item row");
    assert_eq!(product_ean, "5638008983335");
    assert_eq!(quantity, 1);
    assert_eq!(price, "700".parse().unwrap());

    let (street, city, state, zip): (String, String, String, String) = sqlx::query_as(
        "SELECT street, city, state, zip FROM order_address WHERE order_id = 141234",
    )
    .fetch_one(&pool)
    .await
    .expect("address row");
    assert_eq!(street, "944 Walnut St");
    assert_eq!(city, "Boston");
    assert_eq!(state, "MA");
    assert_eq!(zip, "02215");

    test_db.close().await.expect("drop test database");
}

#[tokio::test]
async fn shared_order_id_dedupes_the_order_header() {
    let Some(test_db) = provision().await else {
        return;
    };
    let pool = test_db.pool_clone();

    let file = fixture_file(
        "200001,2019-03-05 10:00,USB-C Cable,5011979520117.0,2,\"12 Oak St, Dallas, TX 75001\",11.95,5.975,23.90\n\
         200001,2019-03-05 10:00,Wired Headphones,5565332252796.0,1,\"12 Oak St, Dallas, TX 75001\",11.99,5.66,11.99\n",
    );

    let summary = load::run(file, pool.clone(), PipelineOptions::default())
        .await
        .expect("pipeline run");

    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.decode_errors, 0);
    assert_eq!(summary.loaded, 2);

    assert_eq!(table_count(&pool, "purchase_orders").await, 1);
    assert_eq!(table_count(&pool, "line_items").await, 2);
    assert_eq!(table_count(&pool, "order_address").await, 2);

    test_db.close().await.expect("drop test database");
}

#[tokio::test]
async fn unparsable_timestamp_is_counted_and_skipped() {
    let Some(test_db) = provision().await else {
        return;
    };
    let pool = test_db.pool_clone();

    let file = fixture_file(
        "300001,2019-06-01 09:30,Monitor,5651247550723.0,1,\"5 Pine St, Seattle, WA 98101\",150.0,97.5,150.0\n\
         300002,not-a-timestamp,Monitor,5651247550723.0,1,\"6 Pine St, Seattle, WA 98101\",150.0,97.5,150.0\n",
    );

    let summary = load::run(file, pool.clone(), PipelineOptions::default())
        .await
        .expect("pipeline run");

    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.decode_errors, 1);
    assert_eq!(summary.loaded, 1);
    assert_eq!(summary.attempted, summary.loaded + summary.decode_errors);

    // The bad row never reached the loader.
    assert_eq!(table_count(&pool, "line_items").await, 1);
    let loaded_ids: Vec<i64> = sqlx::query_scalar("SELECT order_id FROM purchase_orders")
        .fetch_all(&pool)
        .await
        .expect("order ids");
    assert_eq!(loaded_ids, vec![300001]);

    test_db.close().await.expect("drop test database");
}

#[tokio::test]
async fn malformed_address_is_counted_and_skipped() {
    let Some(test_db) = provision().await else {
        return;
    };
    let pool = test_db.pool_clone();

    let file = fixture_file(
        "400001,2019-07-11 16:45,Vareebadd Phone,5621686366493.0,1,No Commas Here,400.0,187.0,400.0\n\
         400002,2019-07-11 16:50,Vareebadd Phone,5621686366493.0,1,\"9 Elm St, Atlanta, GA 30301\",400.0,187.0,400.0\n",
    );

    let summary = load::run(file, pool.clone(), PipelineOptions::default())
        .await
        .expect("pipeline run");

    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.decode_errors, 1);
    assert_eq!(summary.loaded, 1);

    assert_eq!(table_count(&pool, "order_address").await, 1);

    test_db.close().await.expect("drop test database");
}

#[tokio::test]
async fn write_failure_aborts_the_run() {
    let Some(test_db) = provision().await else {
        return;
    };
    let pool = test_db.pool_clone();

    // Sabotage the schema so every line-item insert fails.
    sqlx::query("DROP TABLE line_items")
        .execute(&pool)
        .await
        .expect("drop line_items");

    let file = fixture_file(
        "500001,2019-09-17 11:20,Flatscreen TV,5668117685408.0,1,\"77 Birch St, Denver, CO 80014\",300.0,153.0,300.0\n",
    );

    let error = load::run(file, pool.clone(), PipelineOptions::default())
        .await
        .expect_err("pipeline must abort");

    assert!(matches!(error, EtlError::Load(_)));

    test_db.close().await.expect("drop test database");
}
