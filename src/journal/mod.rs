pub mod article;
pub mod listing;
pub mod locale;
pub mod post;
pub mod related;
