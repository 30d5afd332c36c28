use crate::types::{CustId, SelectedCustomer};
use std::collections::HashMap;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "desk_session";

// per-session desk state: which customer the last lookup resolved.
// order entry stays disabled until a lookup puts an entry in here.
#[derive(Debug, Default)]
pub struct Sessions {
	selected: HashMap<Uuid, SelectedCustomer>,
}

impl Sessions {
	pub fn selected(&self, sid: Uuid) -> Option<&SelectedCustomer> {
		self.selected.get(&sid)
	}

	pub fn select(&mut self, sid: Uuid, custid: CustId, name: &str) {
		self.selected.insert(
			sid,
			SelectedCustomer {
				custid,
				name: name.to_string(),
			},
		);
	}

	pub fn clear(&mut self, sid: Uuid) {
		self.selected.remove(&sid);
	}
}
