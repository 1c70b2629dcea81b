pub mod history;
pub mod report;
pub mod session;
