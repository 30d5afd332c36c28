use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeskError {
	#[error("database error: {0}")]
	Db(#[from] sqlx::Error),
	#[error("not a book from the list: {0:?}")]
	BadBookChoice(String),
	#[error("insert affected no rows")]
	NothingInserted,
}
