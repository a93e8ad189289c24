pub mod analysis;
pub mod cepstrum;
pub mod constants;
pub mod error;
pub mod fft;
pub mod linalg;
pub mod stream;
