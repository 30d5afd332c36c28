// bookstore order desk

mod error;
mod session;
mod sql;
mod types;

use axum::{
	Form,
	extract::State,
	routing::{get, post},
};
use maud::{Markup, html};
use session::{SESSION_COOKIE, Sessions};
use sqlx::sqlite::SqlitePoolOptions;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_cookies::{Cookie, CookieManagerLayer, Cookies};
use types::{Book, BookChoice, FormLookup, FormOrder, LookupOutcome, OrderRow, SelectedCustomer};
use uuid::Uuid;

const DEFAULT_DATABASE_URL: &str = "sqlite://orderdesk.db?mode=rwc";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[tokio::main]
async fn main() {
	dotenvy::dotenv().ok();
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("orderdesk=info")),
		)
		.init();

	let db_url =
		std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
	let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());

	tracing::info!(%db_url, "connecting to database");
	let pool = match SqlitePoolOptions::new()
		.max_connections(5)
		.acquire_timeout(std::time::Duration::from_secs(3))
		.connect(&db_url)
		.await
	{
		Ok(pool) => pool,
		Err(err) => {
			tracing::error!(%err, "can't connect to database");
			std::process::exit(1);
		}
	};

	let state = match new_state(pool).await {
		Ok(state) => state,
		Err(err) => {
			tracing::error!(%err, "can't prepare database");
			std::process::exit(1);
		}
	};

	let app = axum::Router::new()
		.route("/", get(display_desk))
		.route("/lookup", post(perform_lookup))
		.route("/order", post(perform_order))
		.layer(CookieManagerLayer::new())
		.with_state(state);

	tracing::info!(%bind_addr, "order desk up");
	let listener = tokio::net::TcpListener::bind(&bind_addr)
		.await
		.expect("can't bind listener");
	axum::serve(listener, app).await.expect("server error");
}

// the pool and book list are shared read-only; only the session map needs
// the lock, so handlers never hold it across a database await
#[derive(Clone)]
struct ServerState {
	db: sqlx::Pool<sqlx::Sqlite>,
	// dropdown options, loaded once at startup; Book rows never change
	books: Arc<Vec<Book>>,
	sessions: Arc<Mutex<Sessions>>,
}

async fn new_state(db: sqlx::Pool<sqlx::Sqlite>) -> Result<ServerState, error::DeskError> {
	sql::init_schema(&db).await?;
	let books = sql::list_books(&db).await?;
	tracing::info!(count = books.len(), "book list loaded");

	Ok(ServerState {
		db,
		books: Arc::new(books),
		sessions: Arc::new(Mutex::new(Sessions::default())),
	})
}

// resolve the session id cookie, minting one for first-time visitors
fn session_id(cookies: &Cookies) -> Uuid {
	if let Some(cookie) = cookies.get(SESSION_COOKIE) {
		if let Ok(sid) = Uuid::parse_str(cookie.value()) {
			return sid;
		}
	}
	let sid = Uuid::new_v4();
	cookies.add(Cookie::new(SESSION_COOKIE, sid.to_string()));
	sid
}

async fn display_desk(State(state): State<ServerState>, cookies: Cookies) -> Markup {
	let sid = session_id(&cookies);
	let selected = state.sessions.lock().await.selected(sid).cloned();

	render_desk(&state.books, selected.as_ref(), None, None)
}

async fn perform_lookup(
	State(state): State<ServerState>,
	cookies: Cookies,
	Form(lookup): Form<FormLookup>,
) -> Markup {
	let sid = session_id(&cookies);

	let name = lookup.name.trim();
	if name.is_empty() {
		let selected = state.sessions.lock().await.selected(sid).cloned();
		return render_desk(&state.books, selected.as_ref(), None, None);
	}

	let (orders, notice) = match sql::lookup_customer(&state.db, name).await {
		Ok(LookupOutcome::Orders(custid, rows)) => {
			tracing::info!(name, custid, rows = rows.len(), "lookup hit");
			state.sessions.lock().await.select(sid, custid, name);
			(Some(rows), Notice::Success(format!("Order history for {name}")))
		}
		Ok(LookupOutcome::NoOrders(custid)) => {
			tracing::info!(name, custid, "lookup hit, no orders");
			state.sessions.lock().await.select(sid, custid, name);
			(
				None,
				Notice::Info(format!("{name} is a customer but has no orders yet")),
			)
		}
		Ok(LookupOutcome::NotFound) => {
			tracing::info!(name, "lookup miss");
			state.sessions.lock().await.clear(sid);
			(None, Notice::Warning(format!("no customer named {name}")))
		}
		// degrade this one lookup to an empty result; the session keeps
		// whatever customer was already resolved
		Err(err) => {
			tracing::error!(%err, name, "lookup query failed");
			(None, Notice::Fail(format!("lookup failed: {err}")))
		}
	};

	let selected = state.sessions.lock().await.selected(sid).cloned();
	render_desk(
		&state.books,
		selected.as_ref(),
		orders.as_deref(),
		Some(&notice),
	)
}

async fn perform_order(
	State(state): State<ServerState>,
	cookies: Cookies,
	Form(order): Form<FormOrder>,
) -> Markup {
	let sid = session_id(&cookies);
	order_response(&state, sid, &order).await
}

async fn order_response(state: &ServerState, sid: Uuid, order: &FormOrder) -> Markup {
	// a direct POST can arrive without a lookup having happened first
	let selected = state.sessions.lock().await.selected(sid).cloned();
	let Some(customer) = selected else {
		return render_desk(
			&state.books,
			None,
			None,
			Some(&Notice::Warning(
				"search a customer in the lookup section before recording an order".to_string(),
			)),
		);
	};

	let notice = order_notice(state, &customer, order).await;
	render_desk(&state.books, Some(&customer), None, Some(&notice))
}

// validates the order form and records the row; any rejection comes back
// as the notice to show, without touching the session
async fn order_notice(state: &ServerState, customer: &SelectedCustomer, order: &FormOrder) -> Notice {
	if order.price < 0 {
		return Notice::Warning("the sale price can't be negative".to_string());
	}
	let Ok(choice) = BookChoice::from_str(&order.book) else {
		return Notice::Warning("choose a book from the list".to_string());
	};

	let today = chrono::Utc::now().date_naive();
	match sql::insert_order(&state.db, customer.custid, choice.bookid, order.price, today).await {
		Ok(orderid) => {
			tracing::info!(
				orderid,
				custid = customer.custid,
				bookid = choice.bookid,
				price = order.price,
				"order recorded"
			);
			Notice::Success(format!("order recorded, orderid {orderid}"))
		}
		Err(err) => {
			tracing::error!(%err, custid = customer.custid, "order insert failed");
			Notice::Fail(format!("order not recorded: {err}"))
		}
	}
}

enum Notice {
	Success(String),
	Info(String),
	Warning(String),
	Fail(String),
}

impl Notice {
	fn tier(&self) -> &'static str {
		match self {
			Notice::Success(_) => "success",
			Notice::Info(_) => "info",
			Notice::Warning(_) => "warning",
			Notice::Fail(_) => "fail",
		}
	}

	fn text(&self) -> &str {
		match self {
			Notice::Success(text)
			| Notice::Info(text)
			| Notice::Warning(text)
			| Notice::Fail(text) => text,
		}
	}
}

const STYLE: &str = "
	body { font-family: sans-serif; max-width: 48em; margin: 2em auto; }
	section { border: 1px solid #ccc; padding: 1em; margin-bottom: 1.5em; }
	table { border-collapse: collapse; }
	td, th { border: 1px solid #999; padding: 0.3em 0.8em; }
	.success { background: #e6ffe6; padding: 0.5em; }
	.info { background: #e6f2ff; padding: 0.5em; }
	.warning { background: #fff7e0; padding: 0.5em; }
	.fail { background: #ffe6e6; padding: 0.5em; }
";

fn render_desk(
	books: &[Book],
	selected: Option<&SelectedCustomer>,
	orders: Option<&[OrderRow]>,
	notice: Option<&Notice>,
) -> Markup {
	html! { html {
		head {
			title { "Madang Bookstore Order Desk" }
			style { (STYLE) }
		}
		body {
			h1 { "Madang Bookstore Order Desk" }

			@if let Some(notice) = notice {
				div class=(notice.tier()) { (notice.text()) }
			}

			section {
				h2 { "Customer order lookup" }
				form method="POST" action="/lookup" {
					input name="name" type="text" placeholder="customer name" {}
					button { "Search" }
				}
				@if let Some(orders) = orders {
					table {
						thead { tr {
							td { "Customer" }
							td { "Book" }
							td { "Order date" }
							td { "Sale price" }
						} }
						tbody {
							@for row in orders {
								tr {
									th { (row.name) }
									td { (row.bookname) }
									td { (row.orderdate) }
									td { (row.saleprice) }
								}
							}
						}
					}
				}
			}

			section {
				h2 { "New order" }
				@if let Some(customer) = selected {
					p {
						"Customer: " code { (customer.name) }
						" (id " code { (customer.custid) } ")"
					}
					form method="POST" action="/order" {
						select name="book" {
							option value="" { "-- choose a book --" }
							@for book in books {
								option value=(book.choice_value()) { (book.choice_value()) }
							}
						}
						input name="price" type="number" min="0" step="100" value="0" {}
						button { "Record order" }
					}
				} @else {
					p class="warning" {
						"Search a customer in the lookup section first to record an order."
					}
				}
			}
		}
	} }
}
