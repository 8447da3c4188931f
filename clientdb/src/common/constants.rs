// doc constants
pub const DOC_ID: &str = "id";

pub const CLIENTDB_VERSION: &str = env!("CARGO_PKG_VERSION");
