// 🗄️ Person Store - in-memory registry backed by a JSON record file
//
// The record file is the source of truth between restarts. Memory is a cache
// of it: every newly assigned counter is flushed with a full rewrite before
// the caller sees it.

use crate::error::StorageError;
use crate::person::Person;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

// ============================================================================
// RECORD FILE
// ============================================================================

/// Read every record from the file, in file order
pub fn read_records(path: &Path) -> Result<Vec<Person>, StorageError> {
    let contents = fs::read_to_string(path).map_err(|source| {
        if source.kind() == ErrorKind::NotFound {
            StorageError::Missing {
                path: path.to_path_buf(),
            }
        } else {
            StorageError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    serde_json::from_str(&contents).map_err(|source| StorageError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

/// Rewrite the whole record file.
///
/// Writes a sibling temp file and renames it over the target so readers never
/// observe a partially written collection.
pub fn write_records(path: &Path, people: &[Person]) -> Result<(), StorageError> {
    let write_err = |source| StorageError::Write {
        path: path.to_path_buf(),
        source,
    };

    let json = serde_json::to_string_pretty(people)
        .map_err(|e| write_err(std::io::Error::new(ErrorKind::InvalidData, e)))?;

    let tmp_path = temp_path_for(path);
    fs::write(&tmp_path, json).map_err(write_err)?;
    fs::rename(&tmp_path, path).map_err(write_err)?;

    debug!(path = %path.display(), records = people.len(), "record file written");
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "people_list.json".into());
    name.push(".tmp");
    path.with_file_name(name)
}

// ============================================================================
// PERSON STORE
// ============================================================================

pub struct PersonStore {
    path: PathBuf,
    people: Vec<Person>,

    /// Last counter handed out (0 = none yet)
    counter: u64,
}

impl PersonStore {
    /// Load the record file and seed the counter from the highest existing value
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let people = read_records(&path)?;
        let counter = max_register_count(&people);

        info!(
            path = %path.display(),
            records = people.len(),
            counter,
            "record file loaded"
        );

        Ok(PersonStore {
            path,
            people,
            counter,
        })
    }

    /// Build a store from in-memory state (no file read).
    /// Persisting still writes to `path`. A counter below an existing
    /// register_count is raised to it, so no number is handed out twice.
    pub fn from_parts(path: impl Into<PathBuf>, people: Vec<Person>, counter: u64) -> Self {
        let counter = counter.max(max_register_count(&people));
        PersonStore {
            path: path.into(),
            people,
            counter,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn people(&self) -> &[Person] {
        &self.people
    }

    pub fn len(&self) -> usize {
        self.people.len()
    }

    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
    }

    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Index of the first record whose trimmed names equal the trimmed inputs.
    /// Empty names never match.
    pub fn find_index(&self, first: &str, last: &str) -> Option<usize> {
        let first = first.trim();
        let last = last.trim();
        if first.is_empty() || last.is_empty() {
            return None;
        }

        self.people.iter().position(|p| p.matches_name(first, last))
    }

    pub fn find_by_name(&self, first: &str, last: &str) -> Option<&Person> {
        self.find_index(first, last).map(|idx| &self.people[idx])
    }

    /// Return the record's counter, assigning and persisting the next one if
    /// it has none yet. `Ok(None)` when `idx` is out of range.
    ///
    /// On a failed write the assignment is undone, so memory keeps matching
    /// the file.
    pub fn assign_counter_if_absent(&mut self, idx: usize) -> Result<Option<u64>, StorageError> {
        let Some(person) = self.people.get_mut(idx) else {
            return Ok(None);
        };
        if let Some(count) = person.register_count {
            return Ok(Some(count));
        }

        let next = self.counter + 1;
        person.register_count = Some(next);

        if let Err(e) = write_records(&self.path, &self.people) {
            self.people[idx].register_count = None;
            return Err(e);
        }

        self.counter = next;
        info!(
            person = %self.people[idx].full_name(),
            register_count = next,
            "counter assigned"
        );
        Ok(Some(next))
    }
}

fn max_register_count(people: &[Person]) -> u64 {
    people
        .iter()
        .filter_map(|p| p.register_count)
        .max()
        .unwrap_or(0)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_fixture(dir: &TempDir, people: &[Person]) -> PathBuf {
        let path = dir.path().join("people_list.json");
        fs::write(&path, serde_json::to_string(people).unwrap()).unwrap();
        path
    }

    fn sample_people() -> Vec<Person> {
        vec![
            Person::new("Ann", "Lee", "X").with_register_count(5),
            Person::new("Bo", "Kim", "Y"),
        ]
    }

    #[test]
    fn test_load_seeds_counter_from_max() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(
            &dir,
            &[
                Person::new("A", "A", "1").with_register_count(2),
                Person::new("B", "B", "1").with_register_count(9),
                Person::new("C", "C", "1"),
            ],
        );

        let store = PersonStore::load(&path).unwrap();
        assert_eq!(store.counter(), 9);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_load_without_counters_starts_at_zero() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir, &[Person::new("Bo", "Kim", "Y")]);

        let store = PersonStore::load(&path).unwrap();
        assert_eq!(store.counter(), 0);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = PersonStore::load(dir.path().join("nope.json"));
        assert!(matches!(result, Err(StorageError::Missing { .. })));
    }

    #[test]
    fn test_load_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("people_list.json");
        fs::write(&path, r#"{"first_name": "not an array"}"#).unwrap();

        let result = PersonStore::load(&path);
        assert!(matches!(result, Err(StorageError::Malformed { .. })));
    }

    #[test]
    fn test_find_by_name_trims_and_takes_first_match() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(
            &dir,
            &[
                Person::new("Jane", "Doe", "first"),
                Person::new("Jane", "Doe", "second"),
            ],
        );
        let store = PersonStore::load(&path).unwrap();

        let found = store.find_by_name(" Jane ", "Doe ").unwrap();
        assert_eq!(found.bank, "first");
    }

    #[test]
    fn test_find_by_name_rejects_empty_input() {
        let store = PersonStore::from_parts(
            "unused.json",
            vec![Person::new("", "", "ghost")],
            0,
        );

        assert!(store.find_by_name("  ", "").is_none());
        assert!(store.find_by_name("", "Doe").is_none());
    }

    #[test]
    fn test_assign_counter_persists_full_collection() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir, &sample_people());
        let mut store = PersonStore::load(&path).unwrap();

        let idx = store.find_index("Bo", "Kim").unwrap();
        assert_eq!(store.assign_counter_if_absent(idx).unwrap(), Some(6));

        let on_disk = read_records(&path).unwrap();
        assert_eq!(on_disk.len(), 2);
        assert_eq!(on_disk[0].register_count, Some(5));
        assert_eq!(on_disk[1].register_count, Some(6));
        assert!(!temp_path_for(&path).exists());
    }

    #[test]
    fn test_assign_counter_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir, &sample_people());
        let mut store = PersonStore::load(&path).unwrap();

        let idx = store.find_index("Bo", "Kim").unwrap();
        let first = store.assign_counter_if_absent(idx).unwrap();
        let second = store.assign_counter_if_absent(idx).unwrap();

        assert_eq!(first, second);
        assert_eq!(store.counter(), 6);
    }

    #[test]
    fn test_existing_counter_returned_without_write() {
        let dir = TempDir::new().unwrap();
        // Store points at a file that does not exist; any write would create it
        let path = dir.path().join("never_written.json");
        let mut store = PersonStore::from_parts(&path, sample_people(), 5);

        assert_eq!(store.assign_counter_if_absent(0).unwrap(), Some(5));
        assert!(!path.exists());
    }

    #[test]
    fn test_injected_counter_drives_next_assignment() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("people_list.json");
        let mut store = PersonStore::from_parts(&path, vec![Person::new("Bo", "Kim", "Y")], 41);

        assert_eq!(store.assign_counter_if_absent(0).unwrap(), Some(42));
        assert_eq!(read_records(&path).unwrap()[0].register_count, Some(42));
    }

    #[test]
    fn test_failed_write_rolls_back_assignment() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing_dir").join("people_list.json");
        let mut store = PersonStore::from_parts(&path, vec![Person::new("Bo", "Kim", "Y")], 0);

        let result = store.assign_counter_if_absent(0);
        assert!(matches!(result, Err(StorageError::Write { .. })));
        assert_eq!(store.people()[0].register_count, None);
        assert_eq!(store.counter(), 0);
    }

    #[test]
    fn test_injected_counter_never_below_existing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("people_list.json");
        let mut store = PersonStore::from_parts(&path, sample_people(), 1);

        assert_eq!(store.counter(), 5);
        let idx = store.find_index("Bo", "Kim").unwrap();
        assert_eq!(store.assign_counter_if_absent(idx).unwrap(), Some(6));
    }

    #[test]
    fn test_assign_out_of_range_index() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("people_list.json");
        let mut store = PersonStore::from_parts(&path, sample_people(), 5);

        assert_eq!(store.assign_counter_if_absent(7).unwrap(), None);
        assert_eq!(store.counter(), 5);
        assert!(!path.exists());
    }

    #[test]
    fn test_unknown_fields_survive_rewrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("people_list.json");
        fs::write(
            &path,
            r#"[{"first_name":"Bo","last_name":"Kim","bank":"Y","phone":"081","seat":{"row":3}}]"#,
        )
        .unwrap();
        let mut store = PersonStore::load(&path).unwrap();

        store.assign_counter_if_absent(0).unwrap();

        let on_disk: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk[0]["phone"], serde_json::json!("081"));
        assert_eq!(on_disk[0]["seat"], serde_json::json!({"row": 3}));
        assert_eq!(on_disk[0]["register_count"], serde_json::json!(1));
    }
}
