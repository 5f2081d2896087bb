// sdeupdater/src/fetch/decompress.rs
use bzip2::read::MultiBzDecoder;
use flate2::read::MultiGzDecoder;
use log::debug;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use super::artifact::TempArtifact;
use crate::errors::{AppError, Result};

const DECOMPRESS_BLOCK_SIZE: usize = 100 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompressionFormat {
    Bzip2,
    Gzip,
}

impl CompressionFormat {
    fn detect(magic: &[u8]) -> Option<Self> {
        if magic.starts_with(b"BZh") {
            Some(CompressionFormat::Bzip2)
        } else if magic.starts_with(&[0x1f, 0x8b]) {
            Some(CompressionFormat::Gzip)
        } else {
            None
        }
    }
}

/// Decompresses `compressed` into a new `.dmp` temp file. Decoding is
/// blocking, so it runs off the async workers.
pub async fn decompress_dump(compressed: &TempArtifact) -> Result<TempArtifact> {
    let source: PathBuf = compressed.path().to_path_buf();
    tokio::task::spawn_blocking(move || decompress_file(&source))
        .await
        .map_err(|e| AppError::Transfer(format!("decompression task failed: {}", e)))?
}

pub(crate) fn decompress_file(source: &Path) -> Result<TempArtifact> {
    let mut input = BufReader::new(File::open(source)?);
    let format = {
        let magic = input.fill_buf()?;
        CompressionFormat::detect(magic).ok_or_else(|| {
            AppError::Transfer(format!(
                "unsupported compression format in {}",
                source.display()
            ))
        })?
    };
    debug!("Decompressing {} as {:?}", source.display(), format);

    let mut reader: Box<dyn Read> = match format {
        CompressionFormat::Bzip2 => Box::new(MultiBzDecoder::new(input)),
        CompressionFormat::Gzip => Box::new(MultiGzDecoder::new(input)),
    };

    let (file, artifact) = TempArtifact::create(".dmp")?;
    let mut output = BufWriter::new(file);
    let mut block = vec![0u8; DECOMPRESS_BLOCK_SIZE];
    let mut total: u64 = 0;

    loop {
        let read = match reader.read(&mut block) {
            Ok(0) => break,
            Ok(read) => read,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(AppError::Transfer(format!(
                    "decompression of {} failed after {} bytes: {}",
                    source.display(),
                    total,
                    e
                )));
            }
        };
        output.write_all(&block[..read])?;
        total += read as u64;
    }
    output.flush()?;

    println!("✓ Decompressed {} bytes to {}", total, artifact.path().display());
    Ok(artifact)
}
