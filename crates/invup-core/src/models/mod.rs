//! Data models shared by the client front ends.

pub mod config;
pub mod file;
pub mod invoice;
pub mod response;
