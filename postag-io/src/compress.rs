//! Body compression for model artifacts.

use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use postag_core::{PostagError, Result};

/// Compression applied to an artifact body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Compression {
    None,
    #[default]
    Gzip,
    Zstd,
}

impl Compression {
    /// One-byte tag written into the artifact header.
    pub fn tag(self) -> u8 {
        match self {
            Compression::None => 0,
            Compression::Gzip => 1,
            Compression::Zstd => 2,
        }
    }

    /// Inverse of [`tag`](Self::tag).
    ///
    /// # Errors
    ///
    /// Returns [`PostagError::Corrupt`] for an unknown tag.
    pub fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(Compression::None),
            1 => Ok(Compression::Gzip),
            2 => Ok(Compression::Zstd),
            other => Err(PostagError::Corrupt(format!(
                "unknown compression tag {other}"
            ))),
        }
    }

    /// Level used when none is configured.
    pub fn default_level(self) -> i32 {
        match self {
            Compression::None => 0,
            Compression::Gzip => 6,
            Compression::Zstd => 3,
        }
    }

    /// Check `level` against the algorithm's accepted range.
    ///
    /// # Errors
    ///
    /// Returns an error for gzip outside 0–9 or zstd outside 1–22.
    pub fn check_level(self, level: i32) -> Result<()> {
        let ok = match self {
            Compression::None => true,
            Compression::Gzip => (0..=9).contains(&level),
            Compression::Zstd => (1..=22).contains(&level),
        };
        if ok {
            Ok(())
        } else {
            Err(PostagError::InvalidInput(format!(
                "compression level {level} out of range for {self}"
            )))
        }
    }

    /// Compress `data` at `level`.
    pub fn compress(self, data: &[u8], level: i32) -> Result<Vec<u8>> {
        self.check_level(level)?;
        match self {
            Compression::None => Ok(data.to_vec()),
            Compression::Gzip => gzip_compress(data, level as u32),
            Compression::Zstd => {
                zstd::encode_all(data, level).map_err(|e| PostagError::Compression(e.to_string()))
            }
        }
    }

    /// Undo [`compress`](Self::compress).
    pub fn decompress(self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            Compression::None => Ok(data.to_vec()),
            Compression::Gzip => gzip_decompress(data),
            Compression::Zstd => {
                zstd::decode_all(data).map_err(|e| PostagError::Compression(e.to_string()))
            }
        }
    }
}

fn gzip_compress(data: &[u8], level: u32) -> Result<Vec<u8>> {
    use flate2::write::GzEncoder;

    let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::new(level));
    encoder
        .write_all(data)
        .map_err(|e| PostagError::Compression(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| PostagError::Compression(e.to_string()))
}

fn gzip_decompress(data: &[u8]) -> Result<Vec<u8>> {
    use flate2::read::GzDecoder;

    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| PostagError::Compression(e.to_string()))?;
    Ok(out)
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Compression::None => "none",
            Compression::Gzip => "gzip",
            Compression::Zstd => "zstd",
        })
    }
}

impl FromStr for Compression {
    type Err = PostagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Compression::None),
            "gzip" | "gz" => Ok(Compression::Gzip),
            "zstd" | "zst" => Ok(Compression::Zstd),
            other => Err(PostagError::InvalidInput(format!(
                "unknown compression '{other}' (expected none, gzip, or zstd)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATA: &[u8] = b"the dog runs. the dog runs. the dog runs. the dog runs.";

    #[test]
    fn each_algorithm_restores_input() {
        for c in [Compression::None, Compression::Gzip, Compression::Zstd] {
            let packed = c.compress(DATA, c.default_level()).unwrap();
            assert_eq!(c.decompress(&packed).unwrap(), DATA, "{c}");
        }
    }

    #[test]
    fn tags_are_stable() {
        assert_eq!(Compression::None.tag(), 0);
        assert_eq!(Compression::Gzip.tag(), 1);
        assert_eq!(Compression::Zstd.tag(), 2);
        assert_eq!(Compression::from_tag(2).unwrap(), Compression::Zstd);
        assert!(matches!(Compression::from_tag(9), Err(PostagError::Corrupt(_))));
    }

    #[test]
    fn level_ranges() {
        assert!(Compression::Gzip.check_level(9).is_ok());
        assert!(Compression::Gzip.check_level(10).is_err());
        assert!(Compression::Zstd.check_level(0).is_err());
        assert!(Compression::Zstd.compress(DATA, 23).is_err());
    }

    #[test]
    fn garbage_fails_to_decompress() {
        assert!(matches!(
            Compression::Gzip.decompress(b"not gzip"),
            Err(PostagError::Compression(_))
        ));
        assert!(Compression::Zstd.decompress(b"not zstd").is_err());
    }

    #[test]
    fn parse_names() {
        assert_eq!("ZSTD".parse::<Compression>().unwrap(), Compression::Zstd);
        assert_eq!("gz".parse::<Compression>().unwrap(), Compression::Gzip);
        assert_eq!(Compression::None.to_string(), "none");
        assert!("lz4".parse::<Compression>().is_err());
    }
}
