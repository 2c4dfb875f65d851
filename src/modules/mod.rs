pub mod catalogue;
pub mod denylist;
pub mod extractor;
pub mod matcher;
pub mod patterns;
pub mod registration;
pub mod storage;
