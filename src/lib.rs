//! Gantry turns loosely-structured records into a dependency-aware timeline
//! and writes timeline edits back into the records.
//!
//! The pipeline lives in [`timeline`]: role detection, record-to-task
//! mapping, dependency ordering, group headers, rendering and edit-back.
//! [`repo`] stores records and timeline settings in SQLite and [`cli`]
//! drives everything from the `gantry` binary.
//!
//! ```no_run
//! use gantry::db::DbConnection;
//! use gantry::repo::{ConfigRepo, SqliteStore};
//! use gantry::timeline::{TimelineOutcome, TimelineView};
//!
//! # fn main() -> anyhow::Result<()> {
//! let conn = DbConnection::connect()?;
//! let mut view = TimelineView::new(ConfigRepo::load(&conn)?);
//! let today = chrono::Local::now().date_naive();
//! if let TimelineOutcome::Ready(tasks) = view.refresh(&SqliteStore::new(&conn), today)? {
//!     println!("{} rows", tasks.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod db;
pub mod models;
pub mod repo;
pub mod timeline;
pub mod utils;
