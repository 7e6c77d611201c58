// Front Desk - Core Library
// Person registry, spreadsheet import, card event relay and web layer

pub mod config;
pub mod error;
pub mod importer;
pub mod logging;
pub mod pages;
pub mod person;
pub mod registry;
pub mod store;

#[cfg(feature = "server")]
pub mod relay;
#[cfg(feature = "server")]
pub mod web;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{ImportError, ImportSourceError, MalformedRow, StorageError};
pub use importer::{
    detect_format, get_reader, Cell, ColumnLayout, CsvReader, ImportReport, RowOutcome,
    SheetReader, SourceFormat, SpreadsheetImporter, WorkbookReader,
};
pub use person::Person;
pub use registry::{LookupOutcome, RegistryService};
pub use store::{read_records, write_records, PersonStore};

#[cfg(feature = "server")]
pub use relay::{CardEvent, EventRelay};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
