// 🔎 Registry Service - the lookup boundary the web layer calls
//
// A single mutex serializes find + assign + persist. Counters therefore follow
// lock acquisition order and only one writer touches the record file at a time.

use crate::config::AppConfig;
use crate::error::{ImportError, StorageError};
use crate::importer::SpreadsheetImporter;
use crate::person::Person;
use crate::store::PersonStore;
use serde::Serialize;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

// ============================================================================
// LOOKUP RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "LookupResponse")]
pub enum LookupOutcome {
    NotFound,
    Found { bank: String, register_count: u64 },
}

impl LookupOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, LookupOutcome::Found { .. })
    }
}

/// Wire shape: `{found:false}` or `{found:true, bank, register_count}`
#[derive(Serialize)]
struct LookupResponse {
    found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    bank: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    register_count: Option<u64>,
}

impl From<LookupOutcome> for LookupResponse {
    fn from(outcome: LookupOutcome) -> Self {
        match outcome {
            LookupOutcome::NotFound => LookupResponse {
                found: false,
                bank: None,
                register_count: None,
            },
            LookupOutcome::Found {
                bank,
                register_count,
            } => LookupResponse {
                found: true,
                bank: Some(bank),
                register_count: Some(register_count),
            },
        }
    }
}

// ============================================================================
// REGISTRY SERVICE
// ============================================================================

pub struct RegistryService {
    store: Mutex<PersonStore>,
}

impl RegistryService {
    pub fn new(store: PersonStore) -> Self {
        RegistryService {
            store: Mutex::new(store),
        }
    }

    /// Startup sequence: merge the spreadsheet (if configured), then load the
    /// record file. Import problems are logged and skipped; only a record file
    /// that cannot be loaded is returned as an error.
    pub fn bootstrap(config: &AppConfig) -> Result<Self, StorageError> {
        let record_file = &config.storage.record_file;

        if let Some(source) = &config.import.spreadsheet {
            let importer = SpreadsheetImporter::from(&config.import);
            match importer.import(source, record_file) {
                Ok(_) => {}
                Err(ImportError::Source(e)) => {
                    warn!(error = %e, "spreadsheet unreadable, continuing with existing records");
                }
                Err(ImportError::Storage(e)) => {
                    warn!(error = %e, "import merge aborted");
                }
            }
        }

        let store = PersonStore::load(record_file)?;
        info!(records = store.len(), counter = store.counter(), "registry ready");
        Ok(Self::new(store))
    }

    fn store(&self) -> MutexGuard<'_, PersonStore> {
        // A panic mid-lookup leaves the store consistent: assignment is rolled
        // back on write failure and nothing else mutates it.
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Look a person up by name, assigning their counter on the first hit
    pub fn lookup(&self, first: &str, last: &str) -> Result<LookupOutcome, StorageError> {
        let mut store = self.store();

        let Some(idx) = store.find_index(first, last) else {
            debug!(first = first.trim(), last = last.trim(), "lookup miss");
            return Ok(LookupOutcome::NotFound);
        };

        let Some(register_count) = store.assign_counter_if_absent(idx)? else {
            return Ok(LookupOutcome::NotFound);
        };
        Ok(LookupOutcome::Found {
            bank: store.people()[idx].bank.clone(),
            register_count,
        })
    }

    pub fn people_count(&self) -> usize {
        self.store().len()
    }

    pub fn counter(&self) -> u64 {
        self.store().counter()
    }

    /// Copy of every record, in file order
    pub fn snapshot(&self) -> Vec<Person> {
        self.store().people().to_vec()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{read_records, write_records};
    use std::fs;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    fn service_with(dir: &TempDir, people: &[Person]) -> (RegistryService, PathBuf) {
        let path = dir.path().join("people_list.json");
        write_records(&path, people).unwrap();
        (RegistryService::new(PersonStore::load(&path).unwrap()), path)
    }

    #[test]
    fn test_worked_example() {
        let dir = TempDir::new().unwrap();
        let (service, path) = service_with(
            &dir,
            &[
                Person::new("Ann", "Lee", "X").with_register_count(5),
                Person::new("Bo", "Kim", "Y"),
            ],
        );

        let found = LookupOutcome::Found {
            bank: "Y".to_string(),
            register_count: 6,
        };
        assert_eq!(service.lookup("Bo", "Kim").unwrap(), found);
        assert_eq!(service.lookup("Bo", "Kim").unwrap(), found);
        assert_eq!(service.lookup("Zed", "Nope").unwrap(), LookupOutcome::NotFound);

        assert_eq!(read_records(&path).unwrap()[1].register_count, Some(6));
    }

    #[test]
    fn test_new_counters_exceed_all_previous() {
        let dir = TempDir::new().unwrap();
        let (service, _) = service_with(
            &dir,
            &[
                Person::new("A", "One", "1").with_register_count(3),
                Person::new("B", "Two", "1"),
                Person::new("C", "Three", "1"),
                Person::new("D", "Four", "1").with_register_count(1),
            ],
        );

        let mut seen = vec![3, 1];
        for (first, last) in [("C", "Three"), ("B", "Two")] {
            let LookupOutcome::Found { register_count, .. } = service.lookup(first, last).unwrap()
            else {
                panic!("{first} {last} should be found");
            };
            assert!(seen.iter().all(|&prev| register_count > prev));
            seen.push(register_count);
        }
        assert_eq!(seen, vec![3, 1, 4, 5]);
    }

    #[test]
    fn test_lookup_matches_with_whitespace() {
        let dir = TempDir::new().unwrap();
        let (service, _) = service_with(&dir, &[Person::new("Jane", "Doe", "KBank")]);

        assert!(service.lookup(" Jane ", "Doe ").unwrap().is_found());
    }

    #[test]
    fn test_miss_has_no_side_effects() {
        let dir = TempDir::new().unwrap();
        let (service, path) = service_with(&dir, &[Person::new("Jane", "Doe", "KBank")]);
        let before = fs::read_to_string(&path).unwrap();

        assert_eq!(service.lookup("", "").unwrap(), LookupOutcome::NotFound);
        assert_eq!(service.lookup("John", "Doe").unwrap(), LookupOutcome::NotFound);

        assert_eq!(fs::read_to_string(&path).unwrap(), before);
        assert_eq!(service.counter(), 0);
    }

    #[test]
    fn test_concurrent_first_lookups_get_distinct_counters() {
        let dir = TempDir::new().unwrap();
        let people: Vec<Person> = (0..8)
            .map(|i| Person::new(&format!("P{i}"), "Guest", "B"))
            .collect();
        let (service, path) = service_with(&dir, &people);
        let service = Arc::new(service);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let service = Arc::clone(&service);
                thread::spawn(move || service.lookup(&format!("P{i}"), "Guest").unwrap())
            })
            .collect();

        let mut counts: Vec<u64> = handles
            .into_iter()
            .map(|h| match h.join().unwrap() {
                LookupOutcome::Found { register_count, .. } => register_count,
                LookupOutcome::NotFound => panic!("guest should be found"),
            })
            .collect();
        counts.sort_unstable();
        assert_eq!(counts, (1..=8).collect::<Vec<_>>());

        let mut on_disk: Vec<u64> = read_records(&path)
            .unwrap()
            .iter()
            .filter_map(|p| p.register_count)
            .collect();
        on_disk.sort_unstable();
        assert_eq!(on_disk, counts);
    }

    #[test]
    fn test_lookup_outcome_wire_shape() {
        let miss = serde_json::to_value(LookupOutcome::NotFound).unwrap();
        assert_eq!(miss, serde_json::json!({"found": false}));

        let hit = serde_json::to_value(LookupOutcome::Found {
            bank: "Y".to_string(),
            register_count: 6,
        })
        .unwrap();
        assert_eq!(
            hit,
            serde_json::json!({"found": true, "bank": "Y", "register_count": 6})
        );
    }

    #[test]
    fn test_bootstrap_imports_then_loads() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("guests.csv");
        fs::write(&source, "t,,,,,\nt,,,,,\nh,,,,,\n1,Mr,Bo,Kim,Acme,Y\n").unwrap();

        let mut config = AppConfig::default();
        config.storage.record_file = dir.path().join("people_list.json");
        config.import.spreadsheet = Some(source);

        let service = RegistryService::bootstrap(&config).unwrap();
        assert_eq!(service.people_count(), 1);
        assert!(service.lookup("Bo", "Kim").unwrap().is_found());
    }

    #[test]
    fn test_bootstrap_survives_corrupt_spreadsheet() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("guests.xlsx");
        fs::write(&source, b"garbage").unwrap();
        let record_file = dir.path().join("people_list.json");
        write_records(&record_file, &[Person::new("Bo", "Kim", "Y")]).unwrap();

        let mut config = AppConfig::default();
        config.storage.record_file = record_file;
        config.import.spreadsheet = Some(source);

        let service = RegistryService::bootstrap(&config).unwrap();
        assert_eq!(service.people_count(), 1);
    }

    #[test]
    fn test_bootstrap_fails_without_record_file() {
        let dir = TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.storage.record_file = dir.path().join("people_list.json");
        config.import.spreadsheet = None;

        let result = RegistryService::bootstrap(&config);
        assert!(matches!(result, Err(StorageError::Missing { .. })));
    }
}
