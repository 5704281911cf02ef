//! Tidying of JupyterHealth Exchange observations into flat rows.
//!
//! Observations from the exchange carry their measurement as a base64 JSON
//! attachment. [`Tidier`] decodes that attachment, merges it with the
//! envelope, flattens the result into a [`FlatRecord`] and normalizes every
//! `*date_time` field. [`RecordTable`] stacks many records into a table that
//! the [`output`] writers can render.
//!
//! # Example
//!
//! ```ignore
//! use jhe_core::{RecordTable, tidy_observation};
//!
//! let record = tidy_observation(&observation)?;
//! let table = RecordTable::from_records([record]);
//! ```

pub mod error;
pub mod flatten;
pub mod output;
pub mod table;
pub mod tidy;
pub mod time;
pub mod value;

pub use error::{ErrorCategory, Result, TidyError};
pub use flatten::flatten;
pub use output::{CsvWriter, JsonArrayWriter, NdjsonWriter, OutputFormat, OutputWriter};
pub use table::RecordTable;
pub use tidy::{DecodedPayload, Tidier, tidy_observation};
pub use time::RecordedTimestamp;
pub use value::{FlatRecord, FlatValue};
