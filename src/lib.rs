pub mod archive;
pub mod commands;
pub mod download;
pub mod environment;
pub mod error;
pub mod http;
pub mod install;
pub mod link;
pub mod package;
pub mod platform;
pub mod provider;
pub mod recipe;
pub mod report;
pub mod runtime;
