//! Fader position to gain conversion
//!
//! Piecewise-linear curve over the 7-bit fader travel, precomputed per
//! position. The bottom of the travel is silence.

/// Significant digits kept for dB and amplitude values
const PRECISION_DIGITS: i32 = 4;

/// Default dB breakpoints spread evenly over the fader travel
pub const DEFAULT_BREAKPOINTS_DB: [f64; 8] = [-100.0, -70.0, -50.0, -30.0, -20.0, -10.0, -5.0, 0.0];

/// Round to a number of significant digits
pub fn precision_round(number: f64, digits: i32) -> f64 {
    if number == 0.0 || !number.is_finite() {
        return number;
    }
    let power = number.abs().log10().floor() as i32;
    let factor = 10f64.powi(digits - 1 - power);
    (number * factor).round() / factor
}

pub fn db_to_amplitude(level_db: f64) -> f64 {
    precision_round(10f64.powf(level_db / 20.0), PRECISION_DIGITS)
}

pub fn amplitude_to_db(amplitude: f64) -> f64 {
    precision_round(20.0 * amplitude.log10(), PRECISION_DIGITS)
}

/// Lookup table from fader position to dB
#[derive(Debug, Clone, PartialEq)]
pub struct FaderLaw {
    min_position: i32,
    table: Vec<f64>,
}

impl FaderLaw {
    /// Build a curve over `min_position..=max_position`
    ///
    /// `breakpoints_db` are placed at evenly spaced positions; `fixed` pins
    /// exact values for single positions (e.g. `(0, -inf)`).
    pub fn new(min_position: i32, max_position: i32, breakpoints_db: &[f64], fixed: &[(i32, f64)]) -> Self {
        let steps = breakpoints_db.len();
        let points: Vec<(f64, f64)> = if steps < 2 {
            vec![
                (f64::from(min_position), breakpoints_db.first().copied().unwrap_or(0.0)),
                (f64::from(max_position), breakpoints_db.first().copied().unwrap_or(0.0)),
            ]
        } else {
            let interval = f64::from(max_position - min_position) / (steps - 1) as f64;
            breakpoints_db
                .iter()
                .enumerate()
                .map(|(i, &db)| (f64::from(min_position) + i as f64 * interval, db))
                .collect()
        };

        let table = (min_position..=max_position)
            .map(|position| {
                if let Some(&(_, db)) = fixed.iter().find(|(p, _)| *p == position) {
                    return db;
                }
                Self::interpolate(&points, f64::from(position))
            })
            .collect();

        Self { min_position, table }
    }

    fn interpolate(points: &[(f64, f64)], x: f64) -> f64 {
        if let Some(&(last_x, last_db)) = points.last() {
            if x >= last_x {
                return last_db;
            }
        }
        for pair in points.windows(2) {
            let (p0, p1) = (pair[0], pair[1]);
            if x == p0.0 {
                return p0.1;
            }
            if p0.0 <= x && x < p1.0 {
                let y = p0.1 + (x - p0.0) * (p1.1 - p0.1) / (p1.0 - p0.0);
                return precision_round(y, PRECISION_DIGITS);
            }
        }
        points.first().map(|p| p.1).unwrap_or(0.0)
    }

    /// Gain in dB for a fader position, clamped to the travel
    pub fn db(&self, position: i32) -> f64 {
        let max_index = self.table.len().saturating_sub(1) as i32;
        let index = (position - self.min_position).clamp(0, max_index);
        self.table.get(index as usize).copied().unwrap_or(f64::NEG_INFINITY)
    }
}

impl Default for FaderLaw {
    fn default() -> Self {
        Self::new(0, 127, &DEFAULT_BREAKPOINTS_DB, &[(0, f64::NEG_INFINITY)])
    }
}
