pub mod apply;
pub mod delete;
pub mod list;
pub mod log;
pub mod scale;
