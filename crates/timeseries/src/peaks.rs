//! Peak detection with prominence and width filters.
//!
//! Follows `scipy.signal.find_peaks`: plateaus report their midpoint, the
//! first and last samples are never peaks, prominence is measured against
//! the higher of the two bases, and width is taken at half prominence with
//! linear interpolation between samples.

/// A detected peak and its measurements.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    pub index: usize,
    pub prominence: f64,
    pub left_base: usize,
    pub right_base: usize,
    /// Width in samples at half prominence.
    pub width: f64,
}

/// Local maxima, with flat tops reported at their (left-leaning) midpoint.
pub fn local_maxima(x: &[f64]) -> Vec<usize> {
    let mut peaks = Vec::new();
    if x.len() < 3 {
        return peaks;
    }
    let last = x.len() - 1;
    let mut i = 1;
    while i < last {
        if x[i - 1] < x[i] {
            let mut ahead = i + 1;
            while ahead < last && x[ahead] == x[i] {
                ahead += 1;
            }
            if x[ahead] < x[i] {
                peaks.push((i + ahead - 1) / 2);
                i = ahead;
            }
        }
        i += 1;
    }
    peaks
}

/// Prominence of `peak` and its left and right bases.
///
/// Each base is the lowest point between the peak and the nearest higher
/// sample (or the end of the series) on that side.
pub fn prominence(x: &[f64], peak: usize) -> (f64, usize, usize) {
    let top = x[peak];

    let mut left_min = top;
    let mut left_base = peak;
    let mut i = peak;
    loop {
        if x[i] > top {
            break;
        }
        if x[i] < left_min {
            left_min = x[i];
            left_base = i;
        }
        if i == 0 {
            break;
        }
        i -= 1;
    }

    let mut right_min = top;
    let mut right_base = peak;
    for (j, &v) in x.iter().enumerate().skip(peak) {
        if v > top {
            break;
        }
        if v < right_min {
            right_min = v;
            right_base = j;
        }
    }

    (top - left_min.max(right_min), left_base, right_base)
}

/// Width of `peak` at `top - prominence / 2`, bounded by its bases.
pub fn width(x: &[f64], peak: usize, prominence: f64, left_base: usize, right_base: usize) -> f64 {
    let height = x[peak] - prominence * 0.5;

    let mut i = peak;
    while left_base < i && height < x[i] {
        i -= 1;
    }
    let mut left = i as f64;
    if x[i] < height {
        left += (height - x[i]) / (x[i + 1] - x[i]);
    }

    let mut i = peak;
    while i < right_base && height < x[i] {
        i += 1;
    }
    let mut right = i as f64;
    if x[i] < height {
        right -= (height - x[i]) / (x[i - 1] - x[i]);
    }

    right - left
}

/// Peaks of `x` with prominence of at least `min_prominence` and width of
/// at least `min_width` samples, in index order.
pub fn find_peaks(x: &[f64], min_prominence: f64, min_width: f64) -> Vec<Peak> {
    local_maxima(x)
        .into_iter()
        .filter_map(|index| {
            let (prominence, left_base, right_base) = prominence(x, index);
            (prominence >= min_prominence).then_some((index, prominence, left_base, right_base))
        })
        .filter_map(|(index, prominence, left_base, right_base)| {
            let width = width(x, index, prominence, left_base, right_base);
            (width >= min_width).then_some(Peak {
                index,
                prominence,
                left_base,
                right_base,
                width,
            })
        })
        .collect()
}

/// Minima of `x`, found as peaks of `-x`.
pub fn find_valleys(x: &[f64], min_prominence: f64, min_width: f64) -> Vec<Peak> {
    let negated: Vec<f64> = x.iter().map(|v| -v).collect();
    find_peaks(&negated, min_prominence, min_width)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::assert_approx_eq;

    fn indices(peaks: &[Peak]) -> Vec<usize> {
        peaks.iter().map(|p| p.index).collect()
    }

    #[test]
    fn test_local_maxima_plateaus_and_edges() {
        // Edges never count; plateau 3..=4 reports 3; 6..=8 reports 7.
        let x = [5.0, 1.0, 2.0, 4.0, 4.0, 1.0, 3.0, 3.0, 3.0, 0.0, 9.0];
        assert_eq!(local_maxima(&x), vec![3, 7]);
        // A plateau running into the last sample is not a peak.
        assert_eq!(local_maxima(&[0.0, 2.0, 2.0]), Vec::<usize>::new());
        assert!(local_maxima(&[1.0, 2.0]).is_empty());
    }

    #[test]
    fn test_prominence_uses_higher_base() {
        let x = [0.0, 3.0, 1.0, 5.0, 2.0, 4.0, 0.5];
        // Peak at 1: left min 0, right side stops at x[3]=5 with min 1.
        let (p, lb, rb) = prominence(&x, 1);
        assert_approx_eq!(p, 2.0, 1e-12);
        assert_eq!((lb, rb), (0, 2));
        // Highest peak: bases are the global minima on each side.
        let (p, lb, rb) = prominence(&x, 3);
        assert_approx_eq!(p, 4.5, 1e-12);
        assert_eq!((lb, rb), (0, 6));
        // Peak at 5: left stops at 5, min 2; right min 0.5.
        let (p, _, _) = prominence(&x, 5);
        assert_approx_eq!(p, 2.0, 1e-12);
    }

    #[test]
    fn test_width_interpolates() {
        // Triangle: prominence 4, half height 2 crossed at 1.5 and 4.5.
        let x = [0.0, 1.0, 3.0, 4.0, 3.0, 1.0, 0.0];
        let (p, lb, rb) = prominence(&x, 3);
        assert_approx_eq!(p, 4.0, 1e-12);
        assert_approx_eq!(width(&x, 3, p, lb, rb), 3.0, 1e-12);
    }

    #[test]
    fn test_find_peaks_filters() {
        let x = [0.0, 1.0, 3.0, 4.0, 3.0, 1.0, 0.0, 0.2, 0.0];
        assert_eq!(indices(&find_peaks(&x, 0.05, 1.0)), vec![3, 7]);
        assert_eq!(indices(&find_peaks(&x, 1.0, 1.0)), vec![3]);
        assert!(find_peaks(&x, 0.05, 5.0).is_empty());
    }

    #[test]
    fn test_valleys() {
        let x = [1.0, 0.8, 0.2, 0.1, 0.3, 0.9, 1.0];
        let valleys = find_valleys(&x, 0.05, 1.0);
        assert_eq!(indices(&valleys), vec![3]);
    }

    #[test]
    fn test_seasonal_series() {
        let x = test_utils::create_seasonal_series(60, 20.0, 0.5, 0.3);
        assert_eq!(indices(&find_peaks(&x, 0.05, 5.0)), vec![5, 25, 45]);
        assert_eq!(indices(&find_valleys(&x, 0.05, 5.0)), vec![15, 35, 55]);
    }
}
