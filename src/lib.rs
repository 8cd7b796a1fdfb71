pub mod cart;
pub mod config;
pub mod content;
pub mod i18n;
pub mod journal;
pub mod logger;
pub mod payments;
pub mod repository;
pub mod server;
pub mod shop;
mod paginator;
mod query_string;
mod text_utils;
pub mod view;
