/// Default order of cepstrum
pub const ORDER: usize = 25;
/// Default frame length (FFT size for windowed input)
pub const FRAME_LENGTH: usize = 256;
/// Default all-pass constant
pub const ALPHA: f64 = 0.35;
/// Default gamma of generalized cepstrum
pub const GAMMA: f64 = 0.0;
/// Default minimum number of Newton-Raphson iterations
pub const MIN_ITERATIONS: usize = 2;
/// Default maximum number of Newton-Raphson iterations
pub const MAX_ITERATIONS: usize = 30;
/// Default end condition of the iteration (relative change)
pub const END_THRESHOLD: f64 = 0.001;
/// Default minimum value of the determinant of the normal matrix
pub const MIN_DETERMINANT: f64 = 0.000001;
/// Default FFT size of the second-order all-pass frequency transform tables
pub const WARP_FFT_SIZE: usize = 256 * 4;

/// Fallback of the Levinson-Durbin residual threshold when a negative value is passed
pub const LEVDUR_EPS: f64 = 1.0e-6;
