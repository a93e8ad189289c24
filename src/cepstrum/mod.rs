//! Cepstral representations and the recursions between them.
//!
//! Buffers deref to `[f64]`; the slice-level functions are re-exported for
//! callers that keep their own workspaces.

#[macro_use]
mod buffer;

mod cepstrum;
mod coefficients;
mod generalized;
mod transform;
pub mod warp;

pub use buffer::Buffer;
pub use cepstrum::{CepstrumT, MelCepstrum, MelGeneralizedCepstrum, WarpedCepstrum};
pub use coefficients::{Coefficients, CoefficientsT, GeneralizedCoefficients};
pub use generalized::Generalized;
pub use transform::{b2c, b2mc, c2ir, freqt, frqtr, gc2gc, gnorm, ignorm, mc2b, mgc2mgc};
pub use warp::{WarpCache, WarpTables};
