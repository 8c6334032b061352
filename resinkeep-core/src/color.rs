//! Hex color normalization and perceptual color difference.
//!
//! Colors are compared in CIELAB (D65 white point) with the CIEDE2000
//! formula. The alpha channel of an 8-digit hex color is ignored.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid hex color {0:?}: expected 6 or 8 hex digits")]
pub struct InvalidHexColor(pub String);

/// Strip a leading `#` and upper-case. An empty input means "no color".
pub fn normalize_hex(input: &str) -> Result<Option<String>, InvalidHexColor> {
    let digits = input.trim().trim_start_matches('#');
    if digits.is_empty() {
        return Ok(None);
    }
    if !matches!(digits.len(), 6 | 8) || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(InvalidHexColor(input.to_string()));
    }
    Ok(Some(digits.to_ascii_uppercase()))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lab {
    pub l: f64,
    pub a: f64,
    pub b: f64,
}

const WHITE_D65: (f64, f64, f64) = (95.047, 100.0, 108.883);

impl Lab {
    /// Parse a 6 or 8 digit hex color, with or without `#`.
    pub fn from_hex(hex: &str) -> Option<Lab> {
        let digits = hex.trim_start_matches('#');
        if !matches!(digits.len(), 6 | 8) {
            return None;
        }
        let channel = |at: usize| -> Option<f64> {
            let byte = u8::from_str_radix(digits.get(at..at + 2)?, 16).ok()?;
            Some(f64::from(byte) / 255.0)
        };
        Some(Lab::from_srgb(channel(0)?, channel(2)?, channel(4)?))
    }

    fn from_srgb(r: f64, g: f64, b: f64) -> Lab {
        let linear = |c: f64| {
            if c <= 0.04045 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        };
        let (r, g, b) = (linear(r) * 100.0, linear(g) * 100.0, linear(b) * 100.0);

        let x = r * 0.412_456_4 + g * 0.357_576_1 + b * 0.180_437_5;
        let y = r * 0.212_672_9 + g * 0.715_152_2 + b * 0.072_175_0;
        let z = r * 0.019_333_9 + g * 0.119_192_0 + b * 0.950_304_1;

        let f = |t: f64| {
            if t > 0.008_856 {
                t.cbrt()
            } else {
                7.787 * t + 16.0 / 116.0
            }
        };
        let fx = f(x / WHITE_D65.0);
        let fy = f(y / WHITE_D65.1);
        let fz = f(z / WHITE_D65.2);

        Lab {
            l: 116.0 * fy - 16.0,
            a: 500.0 * (fx - fy),
            b: 200.0 * (fy - fz),
        }
    }
}

fn hue_degrees(b: f64, a: f64) -> f64 {
    if a == 0.0 && b == 0.0 {
        return 0.0;
    }
    let h = b.atan2(a).to_degrees();
    if h < 0.0 { h + 360.0 } else { h }
}

/// CIEDE2000 color difference with unit weighting factors.
pub fn delta_e_2000(lab1: Lab, lab2: Lab) -> f64 {
    const POW25_7: f64 = 6_103_515_625.0;

    let c1 = lab1.a.hypot(lab1.b);
    let c2 = lab2.a.hypot(lab2.b);
    let c_bar7 = ((c1 + c2) / 2.0).powi(7);
    let g = 0.5 * (1.0 - (c_bar7 / (c_bar7 + POW25_7)).sqrt());

    let a1p = (1.0 + g) * lab1.a;
    let a2p = (1.0 + g) * lab2.a;
    let c1p = a1p.hypot(lab1.b);
    let c2p = a2p.hypot(lab2.b);
    let h1p = hue_degrees(lab1.b, a1p);
    let h2p = hue_degrees(lab2.b, a2p);

    let delta_lp = lab2.l - lab1.l;
    let delta_cp = c2p - c1p;
    let chroma_product = c1p * c2p;
    let delta_hp = if chroma_product == 0.0 {
        0.0
    } else {
        let d = h2p - h1p;
        if d > 180.0 {
            d - 360.0
        } else if d < -180.0 {
            d + 360.0
        } else {
            d
        }
    };
    let delta_big_hp = 2.0 * chroma_product.sqrt() * (delta_hp / 2.0).to_radians().sin();

    let l_bar = (lab1.l + lab2.l) / 2.0;
    let c_bar_p = (c1p + c2p) / 2.0;
    let h_bar_p = if chroma_product == 0.0 {
        h1p + h2p
    } else if (h1p - h2p).abs() <= 180.0 {
        (h1p + h2p) / 2.0
    } else if h1p + h2p < 360.0 {
        (h1p + h2p + 360.0) / 2.0
    } else {
        (h1p + h2p - 360.0) / 2.0
    };

    let t = 1.0 - 0.17 * (h_bar_p - 30.0).to_radians().cos()
        + 0.24 * (2.0 * h_bar_p).to_radians().cos()
        + 0.32 * (3.0 * h_bar_p + 6.0).to_radians().cos()
        - 0.20 * (4.0 * h_bar_p - 63.0).to_radians().cos();
    let delta_theta = 30.0 * (-((h_bar_p - 275.0) / 25.0).powi(2)).exp();
    let c_bar_p7 = c_bar_p.powi(7);
    let r_c = 2.0 * (c_bar_p7 / (c_bar_p7 + POW25_7)).sqrt();
    let l_off = (l_bar - 50.0).powi(2);
    let s_l = 1.0 + 0.015 * l_off / (20.0 + l_off).sqrt();
    let s_c = 1.0 + 0.045 * c_bar_p;
    let s_h = 1.0 + 0.015 * c_bar_p * t;
    let r_t = -(2.0 * delta_theta).to_radians().sin() * r_c;

    let dl = delta_lp / s_l;
    let dc = delta_cp / s_c;
    let dh = delta_big_hp / s_h;
    (dl * dl + dc * dc + dh * dh + r_t * dc * dh).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_hex() {
        assert_eq!(normalize_hex("#ff00aa").unwrap(), Some("FF00AA".to_string()));
        assert_eq!(normalize_hex("ff00aa80").unwrap(), Some("FF00AA80".to_string()));
        assert_eq!(normalize_hex("").unwrap(), None);
        assert!(normalize_hex("#ff00a").is_err());
        assert!(normalize_hex("zz00aa").is_err());
    }

    #[test]
    fn test_identical_colors_have_zero_difference() {
        let lab = Lab::from_hex("3A7BD5").unwrap();
        assert_eq!(delta_e_2000(lab, lab), 0.0);
    }

    #[test]
    fn test_reference_pair() {
        let a = Lab { l: 50.0, a: 2.6772, b: -79.7751 };
        let b = Lab { l: 50.0, a: 0.0, b: -82.7485 };
        assert!((delta_e_2000(a, b) - 2.0425).abs() < 1e-4);
    }

    #[test]
    fn test_white_and_black() {
        let white = Lab::from_hex("#FFFFFF").unwrap();
        assert!((white.l - 100.0).abs() < 0.01);
        assert!(white.a.abs() < 0.01 && white.b.abs() < 0.01);
        let black = Lab::from_hex("000000FF").unwrap();
        assert!(black.l.abs() < 1e-9);
        assert!(delta_e_2000(white, black) > 99.0);
    }
}
