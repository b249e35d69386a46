//! Document lifecycle: bootstrap from bytes and resource loading.

pub mod io;
mod session;

pub use io::{DocumentIo, normalize_location};
pub use session::DocumentSession;
