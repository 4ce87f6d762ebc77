//! HTTP handlers. Request parsing and caller resolution live here; every
//! decision is delegated to `services`.

pub mod event_handlers;
pub mod file_handlers;
pub mod health_handlers;
pub mod identity;
