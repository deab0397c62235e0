macro_rules! v1_path {
    ($path:literal) => {
        concat!("/api/v1", $path)
    };
}

pub const HEALTH: &str = "/health";

/// Versioned API route definitions shared by the server and its clients
pub mod v1 {
    use crate::key::CacheKey;

    pub const ROOT: &str = "/api/v1";
    pub const VERSION: &str = "v1";

    pub mod images {
        use super::CacheKey;

        pub const MATERIALIZE: &str = v1_path!("/images/materialize");
        pub const BLOB: &str = v1_path!("/images/{sku}/{index}");
        pub const EXISTS: &str = v1_path!("/images/{sku}/{index}/exists");
        pub const ENTRY: &str = v1_path!("/images/{sku}/{index}/entry");

        pub fn blob_path(key: &CacheKey) -> String {
            format!("{}/images/{}/{}", super::ROOT, key.sku(), key.index())
        }

        pub fn exists_path(key: &CacheKey) -> String {
            format!("{}/exists", blob_path(key))
        }

        pub fn entry_path(key: &CacheKey) -> String {
            format!("{}/entry", blob_path(key))
        }
    }
}
