pub mod app;
pub mod cli;
pub mod config;
pub mod document;
pub mod search;
pub mod storage;

pub use app::{SaveOutcome, Session};
pub use config::{AppConfig, ConfigLoader, ConfigPaths};
pub use document::{Document, FileFormat, Remark, RemarkId};
