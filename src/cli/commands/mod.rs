pub mod data;
pub mod init;
pub mod report;
pub mod user;
