//! Recurring availability monitor: scrapes a status page, alerts once per
//! day per offline site over SMS, and remembers who was alerted in a JSON file.
pub mod cache;
pub mod config;
pub mod cycle;
pub mod detector;
pub mod model;
pub mod notify;
pub mod scheduler;
pub mod source;
