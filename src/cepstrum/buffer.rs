pub use std::ops::{Deref, DerefMut};

/// Coefficient vector owned as `Box<[f64]>`, index 0 being the gain term.
pub trait Buffer: Deref<Target = [f64]> + DerefMut + Into<Box<[f64]>> {}

macro_rules! boxed_slice {
    ($v:expr; $n:expr) => {
        vec![$v; $n].into_boxed_slice()
    };
}

/// Slice access to the `buffer` field, and release of it.
macro_rules! coefficient_buffer {
    ($t:ty) => {
        impl Deref for $t {
            type Target = [f64];

            fn deref(&self) -> &[f64] {
                &self.buffer
            }
        }

        impl DerefMut for $t {
            fn deref_mut(&mut self) -> &mut [f64] {
                &mut self.buffer
            }
        }

        impl AsRef<[f64]> for $t {
            fn as_ref(&self) -> &[f64] {
                &self.buffer
            }
        }

        impl From<$t> for Box<[f64]> {
            fn from(value: $t) -> Self {
                value.buffer
            }
        }

        impl Buffer for $t {}
    };
}
