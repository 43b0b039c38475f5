//! `shipcheck-io` — file IO for the audit pipeline.
//!
//! Workbook import (xlsx, xls, ods via calamine), the master-store
//! load/annotate/save cycle, input-folder scanning, mapping-config
//! loading, and the report artifacts written next to the inputs.

pub mod alias_file;
pub mod master;
pub mod reports;
pub mod scan;
pub mod workbook;

pub use alias_file::load_config;
pub use master::MasterStore;
pub use scan::scan_folder;
pub use workbook::load_sheets;
