use super::{buffer::Buffer, transform};

pub trait Generalized: Clone + Buffer {
    fn gamma(&self) -> f64;

    /// `c(0..=m)` to `(K, c'(1..=m))`.
    fn gnorm(&self) -> Self {
        let mut target = self.clone();
        transform::gnorm(&mut target, self.gamma());
        target
    }

    fn ignorm(&self) -> Self {
        let mut target = self.clone();
        transform::ignorm(&mut target, self.gamma());
        target
    }
}
