// src/models/mod.rs

pub mod audit_log;
pub mod exam_session;
pub mod question;
pub mod result;
pub mod user;
