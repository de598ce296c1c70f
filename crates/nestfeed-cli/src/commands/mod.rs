pub mod carousel;
pub mod config;
pub mod images;
pub mod search;
