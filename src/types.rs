use crate::error::DeskError;
use chrono::NaiveDate;
use serde::Deserialize;

pub type CustId = i64;
pub type BookId = i64;
pub type OrderId = i64;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Book {
	pub bookid: BookId,
	pub bookname: String,
}

impl Book {
	// option value the order form posts back
	pub fn choice_value(&self) -> String {
		format!("{},{}", self.bookid, self.bookname)
	}
}

// one joined row of a customer's order history
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct OrderRow {
	pub custid: CustId,
	pub name: String,
	pub bookname: String,
	pub orderdate: NaiveDate,
	pub saleprice: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
	Orders(CustId, Vec<OrderRow>),
	NoOrders(CustId),
	NotFound,
}

// the customer a lookup resolved, kept per session for the order form
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedCustomer {
	pub custid: CustId,
	pub name: String,
}

// "bookid,bookname" as posted by the book dropdown
#[derive(Debug, Clone, PartialEq)]
pub struct BookChoice {
	pub bookid: BookId,
	pub bookname: String,
}

impl std::str::FromStr for BookChoice {
	type Err = DeskError;

	fn from_str(raw: &str) -> Result<Self, DeskError> {
		let (id, name) = raw
			.split_once(',')
			.ok_or_else(|| DeskError::BadBookChoice(raw.to_string()))?;
		let bookid = id
			.parse()
			.map_err(|_| DeskError::BadBookChoice(raw.to_string()))?;
		if name.is_empty() {
			return Err(DeskError::BadBookChoice(raw.to_string()));
		}
		Ok(BookChoice {
			bookid,
			bookname: name.to_string(),
		})
	}
}

#[derive(Deserialize, Debug)]
pub struct FormLookup {
	pub name: String,
}

#[derive(Deserialize, Debug)]
pub struct FormOrder {
	pub book: String,
	pub price: i64,
}
