//! Continuous colormaps.

use image::Rgb;

/// Evenly spaced color stops, sampled with linear interpolation.
#[derive(Debug, Clone, PartialEq)]
pub struct Colormap {
    stops: Vec<[u8; 3]>,
}

/// ColorBrewer RdYlGn, as used by matplotlib.
const RD_YL_GN: [[u8; 3]; 11] = [
    [165, 0, 38],
    [215, 48, 39],
    [244, 109, 67],
    [253, 174, 97],
    [254, 224, 139],
    [255, 255, 191],
    [217, 239, 139],
    [166, 217, 106],
    [102, 189, 99],
    [26, 152, 80],
    [0, 104, 55],
];

impl Colormap {
    /// Needs at least one stop; a single stop is a constant colormap.
    pub fn new(stops: Vec<[u8; 3]>) -> Option<Self> {
        (!stops.is_empty()).then_some(Self { stops })
    }

    /// Red (low) through yellow to green (high).
    pub fn rd_yl_gn() -> Self {
        Self {
            stops: RD_YL_GN.to_vec(),
        }
    }

    /// Color at `t` in [0, 1]; values outside are clamped.
    pub fn sample(&self, t: f64) -> Rgb<u8> {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let last = self.stops.len() - 1;
        if last == 0 {
            return Rgb(self.stops[0]);
        }
        let pos = t * last as f64;
        let i = (pos.floor() as usize).min(last - 1);
        let frac = pos - i as f64;
        Rgb(interpolate_color(self.stops[i], self.stops[i + 1], frac))
    }
}

/// Linear color interpolation
fn interpolate_color(c1: [u8; 3], c2: [u8; 3], t: f64) -> [u8; 3] {
    let t = t.clamp(0.0, 1.0);
    let mix = |a: u8, b: u8| (a as f64 * (1.0 - t) + b as f64 * t).round() as u8;
    [mix(c1[0], c2[0]), mix(c1[1], c2[1]), mix(c1[2], c2[2])]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints() {
        let cm = Colormap::rd_yl_gn();
        assert_eq!(cm.sample(0.0), Rgb([165, 0, 38]));
        assert_eq!(cm.sample(0.5), Rgb([255, 255, 191]));
        assert_eq!(cm.sample(1.0), Rgb([0, 104, 55]));
    }

    #[test]
    fn test_clamped_and_interpolated() {
        let cm = Colormap::rd_yl_gn();
        assert_eq!(cm.sample(-3.0), cm.sample(0.0));
        assert_eq!(cm.sample(7.0), cm.sample(1.0));
        // Halfway between the first two stops.
        assert_eq!(cm.sample(0.05), Rgb([190, 24, 39]));
    }

    #[test]
    fn test_single_stop() {
        let cm = Colormap::new(vec![[1, 2, 3]]).unwrap();
        assert_eq!(cm.sample(0.7), Rgb([1, 2, 3]));
        assert!(Colormap::new(vec![]).is_none());
    }
}
