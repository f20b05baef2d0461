//! Bukukas: a bookkeeping engine for a small snack/produce shop. Records
//! sales and purchases, derives double-entry journal postings, tracks
//! inventory, and computes trial balance and income statement reports over a
//! pluggable storage backend.

pub mod api;
pub mod auth;
pub mod config;
pub mod engine;

pub use bukukas_core as core;
