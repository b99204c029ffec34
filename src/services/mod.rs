// src/services/mod.rs
//
// Database-backed building blocks shared by the handlers. Everything that
// depends on the current time takes it as an argument.

pub mod analytics;
pub mod audit;
pub mod question_store;
pub mod scorer;
pub mod session;
