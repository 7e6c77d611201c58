// 👤 Person Record - one line of the front-desk registry
//
// register_count is absent until the first successful lookup and never
// changes afterwards.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub first_name: String,
    pub last_name: String,

    /// Opaque bank identifier, returned verbatim
    pub bank: String,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub register_count: Option<u64>,

    /// Any other keys in the record file, written back untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Person {
    pub fn new(first_name: &str, last_name: &str, bank: &str) -> Self {
        Person {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            bank: bank.to_string(),
            register_count: None,
            extra: Map::new(),
        }
    }

    /// Builder pattern: person that was already registered
    pub fn with_register_count(mut self, count: u64) -> Self {
        self.register_count = Some(count);
        self
    }

    /// Name match used by lookups. Both sides are trimmed.
    pub fn matches_name(&self, first: &str, last: &str) -> bool {
        self.first_name.trim() == first.trim() && self.last_name.trim() == last.trim()
    }

    /// Exact (first, last, bank) identity used by the spreadsheet merge
    pub fn same_entry(&self, other: &Person) -> bool {
        self.first_name == other.first_name
            && self.last_name == other.last_name
            && self.bank == other.bank
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
