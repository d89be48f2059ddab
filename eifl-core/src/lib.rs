//! EIFL Core
//!
//! Core types and abstractions for the EIFL continuous-integration system.
//!
//! This crate contains:
//! - Domain types: Core business entities (Project, Pipeline, Run, etc.)
//! - DTOs: Data transfer objects for server/runner communication
//! - Manifest: the in-repo `.eifl.json` pipeline manifest model
//! - Cron: five-field UTC cron evaluation for scheduled pipelines

pub mod cron;
pub mod domain;
pub mod dto;
pub mod manifest;
pub mod metric_line;
pub mod time;
