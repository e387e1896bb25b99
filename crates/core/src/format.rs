/// Fixed-point rendering of a float, zero decimals by default.
///
/// Registered as the `round` filter in every template environment.
pub fn fixed_decimals(value: f64, decimals: Option<u32>) -> String {
    format!("{:.*}", decimals.unwrap_or(0) as usize, value)
}
