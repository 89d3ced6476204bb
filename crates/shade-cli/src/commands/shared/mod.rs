pub mod limit;
pub mod manifest;
pub mod parse;
