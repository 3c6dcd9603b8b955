//! Configuration access port trait.
//!
//! Raw string lookups only; `domain::config_validation` owns parsing so a
//! malformed value is reported instead of replaced by a default.

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
}
