//! CSV ingestion options. A thin re-export of [`ParseConfig`] under this
//! module's namespace so callers can write `csv::options::CsvOptions`.

pub use crate::common::config::ParseConfig as CsvOptions;
