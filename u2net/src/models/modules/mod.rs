//! Building blocks of U2-Net.

mod conv;
mod resample;
mod rsu;

pub use conv::*;
pub use resample::*;
pub use rsu::*;
