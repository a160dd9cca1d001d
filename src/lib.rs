//! GEO/AEO audit pipeline: fetch one URL's HTML, robots.txt, sitemap.xml,
//! and llms.txt, run five independent analyzers over the parsed document,
//! and aggregate their scores into one weighted 0-100 report.
//!
//! The only public entry point is [`orchestrator::run_audit`]; everything
//! else is exposed so analyzers, tests, and benches can be composed
//! directly without re-running the whole pipeline.

pub mod aggregate;
pub mod analyzers;
pub mod config;
pub mod error;
pub mod fetch;
pub mod html;
pub mod http_client;
pub mod orchestrator;
pub mod probe;
pub mod report;
pub mod robots;
pub mod sitemap;
pub mod url_validator;

pub use config::AuditConfig;
pub use error::AuditError;
pub use orchestrator::{run_audit, AuditInput, AuditReport};
pub use report::AeoScore;
