/// Largest request accepted by default, matching the classic 1 GiB cap.
pub const MAX_REQUEST_SIZE: usize = 1 << 30;

/// Tunables of a [`Heap`](crate::Heap).
///
/// The alignment is fixed at [`ALIGNMENT`](crate::align::ALIGNMENT); only
/// the request ceiling can be lowered or raised.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
  pub max_request_size: usize,
}

impl Config {
  pub const fn new() -> Self {
    Self {
      max_request_size: MAX_REQUEST_SIZE,
    }
  }

  pub const fn with_max_request_size(
    mut self,
    max_request_size: usize,
  ) -> Self {
    self.max_request_size = max_request_size;
    self
  }
}

impl Default for Config {
  fn default() -> Self {
    Self::new()
  }
}
