pub mod config;
pub mod document;
pub mod io;
pub mod persist;
pub mod session;
