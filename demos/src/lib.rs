//! Command-line front end for U2-Net: preset inspection, batch inference and
//! checkpoint conversion on a backend chosen at compile time.

pub mod backend;
#[cfg(feature = "import")]
pub mod convert;
pub mod image;
pub mod inference;
pub mod summary;

#[doc(inline)]
pub use backend::{create_device, get_backend_name, SelectedBackend, SelectedDevice};
