/// Linear interpolation across an ordered list of color stops, spread
/// evenly between `vmin` and `vmax`. Values outside the range clamp to
/// the end stops.
#[derive(Debug, Clone)]
pub struct LinearColorMap {
    stops: Vec<[u8; 3]>,
    vmin: f64,
    vmax: f64,
}

impl LinearColorMap {
    pub fn new(colors: &[&str], vmin: f64, vmax: f64) -> Self {
        assert!(!colors.is_empty(), "a color map needs at least one stop");
        LinearColorMap {
            stops: colors.iter().map(|c| hex_to_rgb(c)).collect(),
            vmin,
            vmax,
        }
    }

    /// The `#rrggbb` color for a value.
    pub fn color(&self, value: f64) -> String {
        let last = self.stops.len() - 1;
        if last == 0 || self.vmax <= self.vmin {
            return rgb_to_hex(self.stops[0]);
        }

        let t = ((value - self.vmin) / (self.vmax - self.vmin)).clamp(0.0, 1.0) * last as f64;
        let low = t.floor() as usize;
        let high = (low + 1).min(last);
        let frac = t - low as f64;

        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;
        let [r1, g1, b1] = self.stops[low];
        let [r2, g2, b2] = self.stops[high];
        rgb_to_hex([mix(r1, r2), mix(g1, g2), mix(b1, b2)])
    }
}

fn hex_to_rgb(hex: &str) -> [u8; 3] {
    let hex = hex.trim_start_matches('#');
    let r = u8::from_str_radix(&hex[0..2], 16).unwrap_or(0);
    let g = u8::from_str_radix(&hex[2..4], 16).unwrap_or(0);
    let b = u8::from_str_radix(&hex[4..6], 16).unwrap_or(0);
    [r, g, b]
}

fn rgb_to_hex([r, g, b]: [u8; 3]) -> String {
    format!("#{r:02x}{g:02x}{b:02x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_hit_the_end_stops() {
        let map = LinearColorMap::new(&["#000000", "#ffffff"], 0.0, 100.0);
        assert_eq!(map.color(0.0), "#000000");
        assert_eq!(map.color(100.0), "#ffffff");
    }

    #[test]
    fn midpoint_interpolates() {
        let map = LinearColorMap::new(&["#000000", "#ffffff"], 0.0, 100.0);
        assert_eq!(map.color(50.0), "#808080");
    }

    #[test]
    fn values_outside_the_range_clamp() {
        let map = LinearColorMap::new(&["#0000ff", "#ff0000"], 10.0, 20.0);
        assert_eq!(map.color(-5.0), "#0000ff");
        assert_eq!(map.color(1000.0), "#ff0000");
    }

    #[test]
    fn degenerate_range_uses_the_first_stop() {
        let map = LinearColorMap::new(&["#0000ff", "#ff0000"], 7.0, 7.0);
        assert_eq!(map.color(7.0), "#0000ff");
    }

    #[test]
    fn multi_stop_maps_pick_the_right_segment() {
        let map = LinearColorMap::new(&["#000000", "#808080", "#ffffff"], 0.0, 2.0);
        assert_eq!(map.color(1.0), "#808080");
        assert_eq!(map.color(2.0), "#ffffff");
    }
}
