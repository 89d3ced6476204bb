pub mod cutover;
pub mod dispatch;
pub mod history;
pub mod init;
pub mod migrations;
pub mod plan;
pub mod records;
pub mod revert;
pub mod schema;
pub mod shared;
pub mod track;
pub mod untrack;
pub mod versions;
