//! Dense square duration matrix.

/// An n×n travel-duration matrix in row-major order, in whole seconds.
///
/// Durations are asymmetric: `get(a, b)` and `get(b, a)` are
/// independent entries. The diagonal is always zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matrix {
    data: Vec<i64>,
    size: usize,
}

impl Matrix {
    /// Creates a matrix of the given size, initialized to zero.
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0; size * size],
            size,
        }
    }

    /// Travel duration from node `from` to node `to`.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of bounds.
    pub fn get(&self, from: usize, to: usize) -> i64 {
        self.data[from * self.size + to]
    }

    pub fn set(&mut self, from: usize, to: usize, duration: i64) {
        self.data[from * self.size + to] = duration;
    }

    /// Number of nodes covered by this matrix.
    pub fn size(&self) -> usize {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_zeroed() {
        let m = Matrix::new(3);
        for i in 0..3 {
            for j in 0..3 {
                assert_eq!(m.get(i, j), 0);
            }
        }
    }

    #[test]
    fn test_set_get_asymmetric() {
        let mut m = Matrix::new(2);
        m.set(0, 1, 10);
        m.set(1, 0, 15);
        assert_eq!(m.get(0, 1), 10);
        assert_eq!(m.get(1, 0), 15);
    }

    #[test]
    fn test_size() {
        assert_eq!(Matrix::new(4).size(), 4);
    }
}
