//! Bulk record import: uploaded CSV in, one transaction per row, progress out.
//!
//! `parser` turns bytes into rows against a fixed column layout,
//! `validator` turns rows into typed records, `processor` persists a record
//! through a store unit of work, and `pipeline` drives the whole
//! run while `progress` streams events to the caller.

pub(crate) mod columns;
pub(crate) mod hasher;
pub(crate) mod parser;
pub(crate) mod pipeline;
pub(crate) mod postgres;
pub(crate) mod processor;
pub(crate) mod progress;
pub(crate) mod store;
pub(crate) mod unit_of_work;
pub(crate) mod validator;
