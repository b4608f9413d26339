pub mod command;
pub mod pdf_info;
pub mod storage;
pub mod tools;
