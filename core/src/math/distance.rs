use ndarray::{ArrayView1, ArrayView2};

pub struct DistanceHelper;

impl DistanceHelper {
    /// Euclidean distance between two coordinate columns.
    pub fn euclidean(lhs: ArrayView1<f64>, rhs: ArrayView1<f64>) -> f64 {
        lhs.iter()
            .zip(rhs.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
            .sqrt()
    }

    /// Largest pairwise distance over the columns of a 3xN position table.
    ///
    /// Returns `None` for an empty table and `Some(0.0)` for a single column.
    pub fn max_pairwise(positions: ArrayView2<f64>) -> Option<f64> {
        let count = positions.ncols();
        if count == 0 {
            return None;
        }
        let mut max = 0.0f64;
        for i in 0..count {
            for j in (i + 1)..count {
                let dist = Self::euclidean(positions.column(i), positions.column(j));
                if dist > max {
                    max = dist;
                }
            }
        }
        Some(max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn euclidean_unit_separation() {
        let table = array![[0.0, 1.0], [0.0, 0.0], [0.0, 0.0]];
        let dist = DistanceHelper::euclidean(table.column(0), table.column(1));
        assert_eq!(dist, 1.0);
    }

    #[test]
    fn max_pairwise_colinear_points() {
        let table = array![[0.0, 1.0, 2.0], [0.0, 0.0, 0.0], [0.0, 0.0, 0.0]];
        assert_eq!(DistanceHelper::max_pairwise(table.view()), Some(2.0));
    }

    #[test]
    fn max_pairwise_degenerate_tables() {
        let empty = ndarray::Array2::<f64>::zeros((3, 0));
        assert_eq!(DistanceHelper::max_pairwise(empty.view()), None);

        let single = array![[0.5], [0.0], [-0.25]];
        assert_eq!(DistanceHelper::max_pairwise(single.view()), Some(0.0));
    }
}
