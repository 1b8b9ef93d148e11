pub mod api;
pub mod cancel;
pub mod config;
pub mod controller;
pub mod download;
pub mod insight;
pub mod repl;
pub mod session;
pub mod view;
