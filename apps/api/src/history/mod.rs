//! Per-user session history: chat and compare sessions, their storage, and
//! the derived document library.

pub mod handlers;
pub mod library;
pub mod models;
pub mod store;
