use std::io;

use thiserror::Error;

/// Reasons a heap cannot be set up over a region.
#[derive(Debug, Error)]
pub enum InitError {
  #[error("region is empty")]
  EmptyRegion,

  #[error("region start is null")]
  NullRegion,

  #[error("failed to map {size} bytes: {source}")]
  Map {
    size: usize,
    #[source]
    source: io::Error,
  },
}
