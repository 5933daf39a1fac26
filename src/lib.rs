/// Local development server
pub mod app;
/// REST clients for outside services
pub mod client;
/// Subscription workflow handlers
pub mod controller;
/// Domain objects
pub mod domain;
/// Workflow error enums
pub mod error;
/// Serverless (API Gateway) adapter
pub mod lambda;
/// Contact store clients
pub mod repo;
/// Application settings
pub mod settings;
/// Application telemetry for tracing and logging
pub mod telemetry;
