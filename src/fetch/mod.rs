// sdeupdater/src/fetch/mod.rs
pub(crate) mod artifact; // Scoped temporary files handed between stages
pub(crate) mod download; // Streaming HTTP download of the compressed dump
pub(crate) mod decompress; // bzip2/gzip decoding into a second temp file

pub use decompress::decompress_dump;
pub use download::download_dump;
