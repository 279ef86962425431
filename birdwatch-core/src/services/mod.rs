// src/services/mod.rs

pub mod filter;
pub mod keywords;
pub mod pipeline;

pub use filter::AuthorFilter;
pub use keywords::KeywordRule;
pub use pipeline::EventHandler;
