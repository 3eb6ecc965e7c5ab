/// Key-material origin reported by the key-management service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOrigin {
    /// Key material was imported by the customer (bring-your-own-key).
    External,
    Other(String),
}

pub trait KeyMetadataReader {
    fn key_origin(&self, key_id: &str) -> Result<KeyOrigin, String>;
}
