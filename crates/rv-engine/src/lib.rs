// RiskVision analysis engine
// Fetches subject and benchmark series, computes metrics, shapes the report.

pub mod analyzer;
pub mod config;
pub mod service;

pub use analyzer::{RiskAnalyzer, RiskReport, RiskRequest};
pub use config::ServiceConfig;
pub use service::{route, serve, status_for, HttpResponse};
