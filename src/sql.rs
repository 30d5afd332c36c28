use crate::error::DeskError;
use crate::types::{Book, BookId, CustId, LookupOutcome, OrderId, OrderRow};
use chrono::NaiveDate;
use sqlx::{Pool, Sqlite};

pub const TABLE_SCHEMA: &str = r#"

CREATE TABLE IF NOT EXISTS Customer (
	custid INTEGER NOT NULL PRIMARY KEY,
	name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS Book (
	bookid INTEGER NOT NULL PRIMARY KEY,
	bookname TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS Orders (
	orderid INTEGER NOT NULL PRIMARY KEY,
	custid INTEGER NOT NULL,
	bookid INTEGER NOT NULL,
	saleprice INTEGER NOT NULL CHECK(saleprice >= 0),
	orderdate TEXT NOT NULL,
	FOREIGN KEY(custid) REFERENCES Customer(custid),
	FOREIGN KEY(bookid) REFERENCES Book(bookid)
);

"#;

pub async fn init_schema(db: &Pool<Sqlite>) -> Result<(), DeskError> {
	// one statement per query; sqlx prepares them individually
	for stmt in TABLE_SCHEMA.split(';') {
		let stmt = stmt.trim();
		if !stmt.is_empty() {
			sqlx::query(stmt).execute(db).await?;
		}
	}
	Ok(())
}

pub async fn list_books(db: &Pool<Sqlite>) -> Result<Vec<Book>, DeskError> {
	let books = sqlx::query_as::<_, Book>("SELECT bookid, bookname FROM Book ORDER BY bookid")
		.fetch_all(db)
		.await?;
	Ok(books)
}

/// Joined order history for a customer name. Falls back to a bare Customer
/// query so a customer with no orders still resolves to their custid.
pub async fn lookup_customer(db: &Pool<Sqlite>, name: &str) -> Result<LookupOutcome, DeskError> {
	let rows = sqlx::query_as::<_, OrderRow>(
		"SELECT c.custid, c.name, b.bookname, o.orderdate, o.saleprice \
		 FROM Customer c \
		 JOIN Orders o ON c.custid = o.custid \
		 JOIN Book b ON o.bookid = b.bookid \
		 WHERE c.name = ?",
	)
	.bind(name)
	.fetch_all(db)
	.await?;

	if !rows.is_empty() {
		let custid = rows[0].custid;
		return Ok(LookupOutcome::Orders(custid, rows));
	}

	let custid = sqlx::query_scalar::<_, CustId>("SELECT custid FROM Customer WHERE name = ?")
		.bind(name)
		.fetch_optional(db)
		.await?;

	Ok(match custid {
		Some(custid) => LookupOutcome::NoOrders(custid),
		None => LookupOutcome::NotFound,
	})
}

/// Records one order. The next orderid is max(orderid)+1, computed inside
/// the same transaction as the insert so two desks can't hand out the same id.
pub async fn insert_order(
	db: &Pool<Sqlite>,
	custid: CustId,
	bookid: BookId,
	saleprice: i64,
	orderdate: NaiveDate,
) -> Result<OrderId, DeskError> {
	let mut tx = db.begin().await?;

	let max: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(orderid), 0) FROM Orders")
		.fetch_one(&mut *tx)
		.await?;
	let orderid = max + 1;

	let done = sqlx::query(
		"INSERT INTO Orders (orderid, custid, bookid, saleprice, orderdate) \
		 VALUES (?, ?, ?, ?, ?)",
	)
	.bind(orderid)
	.bind(custid)
	.bind(bookid)
	.bind(saleprice)
	.bind(orderdate)
	.execute(&mut *tx)
	.await?;

	if done.rows_affected() == 0 {
		return Err(DeskError::NothingInserted);
	}
	tx.commit().await?;

	Ok(orderid)
}

#[cfg(test)]
mod tests {
	use super::*;
	use sqlx::sqlite::SqlitePoolOptions;

	async fn desk_db() -> Pool<Sqlite> {
		// a single connection so every query sees the same :memory: database
		let db = SqlitePoolOptions::new()
			.max_connections(1)
			.connect("sqlite::memory:")
			.await
			.unwrap();
		init_schema(&db).await.unwrap();
		db
	}

	async fn seed(db: &Pool<Sqlite>) {
		for (custid, name) in [(1, "Park Jisung"), (2, "Kim Yuna")] {
			sqlx::query("INSERT INTO Customer (custid, name) VALUES (?, ?)")
				.bind(custid)
				.bind(name)
				.execute(db)
				.await
				.unwrap();
		}
		for (bookid, bookname) in [(1, "Soccer History"), (2, "Tennis Basics")] {
			sqlx::query("INSERT INTO Book (bookid, bookname) VALUES (?, ?)")
				.bind(bookid)
				.bind(bookname)
				.execute(db)
				.await
				.unwrap();
		}
	}

	fn day(s: &str) -> NaiveDate {
		s.parse().unwrap()
	}

	#[tokio::test]
	async fn unknown_name_is_not_found() {
		let db = desk_db().await;
		seed(&db).await;

		let got = lookup_customer(&db, "Nobody Here").await.unwrap();
		assert_eq!(got, LookupOutcome::NotFound);
	}

	#[tokio::test]
	async fn customer_without_orders_still_resolves() {
		let db = desk_db().await;
		seed(&db).await;

		let got = lookup_customer(&db, "Kim Yuna").await.unwrap();
		assert_eq!(got, LookupOutcome::NoOrders(2));
	}

	#[tokio::test]
	async fn lookup_joins_every_order_of_the_customer() {
		let db = desk_db().await;
		seed(&db).await;
		insert_order(&db, 1, 1, 7500, day("2026-08-01")).await.unwrap();
		insert_order(&db, 1, 2, 12000, day("2026-08-02")).await.unwrap();
		insert_order(&db, 2, 1, 8000, day("2026-08-03")).await.unwrap();

		let (custid, rows) = match lookup_customer(&db, "Park Jisung").await.unwrap() {
			LookupOutcome::Orders(custid, rows) => (custid, rows),
			other => panic!("expected order rows, got {other:?}"),
		};
		assert_eq!(custid, 1);
		assert_eq!(rows.len(), 2);
		assert!(rows.iter().all(|r| r.custid == 1 && r.name == "Park Jisung"));

		let soccer = rows.iter().find(|r| r.bookname == "Soccer History").unwrap();
		assert_eq!(soccer.saleprice, 7500);
		assert_eq!(soccer.orderdate, day("2026-08-01"));
	}

	#[tokio::test]
	async fn first_order_gets_id_one() {
		let db = desk_db().await;
		seed(&db).await;

		let orderid = insert_order(&db, 1, 1, 5000, day("2026-08-28")).await.unwrap();
		assert_eq!(orderid, 1);
	}

	#[tokio::test]
	async fn next_order_follows_the_current_max() {
		let db = desk_db().await;
		seed(&db).await;
		sqlx::query(
			"INSERT INTO Orders (orderid, custid, bookid, saleprice, orderdate) \
			 VALUES (7, 2, 2, 9000, '2026-08-20')",
		)
		.execute(&db)
		.await
		.unwrap();

		let orderid = insert_order(&db, 1, 1, 5000, day("2026-08-28")).await.unwrap();
		assert_eq!(orderid, 8);
	}

	#[tokio::test]
	async fn overlapping_inserts_never_share_an_id() {
		// two connections against one database file, so the transactions
		// can genuinely overlap instead of queueing on the pool
		let dir = tempfile::tempdir().unwrap();
		let opts = sqlx::sqlite::SqliteConnectOptions::new()
			.filename(dir.path().join("desk.db"))
			.create_if_missing(true);
		let db = SqlitePoolOptions::new()
			.max_connections(2)
			.connect_with(opts)
			.await
			.unwrap();
		init_schema(&db).await.unwrap();
		seed(&db).await;

		let (a, b) = tokio::join!(
			insert_order(&db, 1, 1, 5000, day("2026-08-28")),
			insert_order(&db, 2, 2, 6000, day("2026-08-28")),
		);

		// the write-lock loser comes back busy instead of reusing an id;
		// either way nothing ever hands out a duplicate
		let mut ids: Vec<OrderId> = [a, b].into_iter().flatten().collect();
		ids.sort_unstable();
		assert!(!ids.is_empty());

		let recorded: Vec<OrderId> =
			sqlx::query_scalar("SELECT orderid FROM Orders ORDER BY orderid")
				.fetch_all(&db)
				.await
				.unwrap();
		assert_eq!(recorded, ids);
		assert_eq!(recorded, (1..=ids.len() as OrderId).collect::<Vec<_>>());
	}

	#[tokio::test]
	async fn negative_price_never_reaches_the_table() {
		let db = desk_db().await;
		seed(&db).await;

		let got = insert_order(&db, 1, 1, -100, day("2026-08-28")).await;
		assert!(matches!(got, Err(DeskError::Db(_))));

		let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM Orders")
			.fetch_one(&db)
			.await
			.unwrap();
		assert_eq!(rows, 0);
	}
}
