//! Phishsim - phishing awareness simulation platform
//!
//! This library provides the core functionality for running authorised
//! phishing simulation campaigns: unguessable per-recipient tracking tokens,
//! append-only engagement events, campaign lifecycle, recipient import/export,
//! engagement analytics and a static training page shown to recipients who
//! click.
//!
//! # Features
//! - **server**: HTTP server mode (default)
//! - **cli**: Command-line interface
//!
//! # Architecture
//! - `storage`: SeaORM persistence (SQLite / MySQL / PostgreSQL)
//! - `services`: Business logic shared by HTTP handlers and the CLI
//! - `analytics`: Pure engagement metrics, timelines and retention purge
//! - `api`: HTTP services and middleware
//! - `interfaces`: User interfaces (CLI)
//! - `config`: Configuration management
//! - `runtime`: Application lifecycle and execution modes
//! - `system`: Logging setup

pub mod analytics;
pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod interfaces;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;
