//! Conversions between logarithmic and linear potency.

/// Nanomolar per molar.
const NANOMOLAR: f64 = 1e9;

/// pIC50 (negative log10 of the molar IC50) to IC50 in nanomolar.
///
/// `10^(-pic50) * 1e9`: a pIC50 of 9 is 1 nM and a pIC50 of 5 is 10 000 nM (10 µM).
pub fn pic50_to_ic50_nm(pic50: f64) -> f64 {
    10f64.powf(-pic50) * NANOMOLAR
}

/// IC50 in nanomolar back to pIC50.
pub fn ic50_nm_to_pic50(ic50_nm: f64) -> f64 {
    -(ic50_nm / NANOMOLAR).log10()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() <= 1e-9 * b.abs().max(1.0), "{a} != {b}");
    }

    #[test]
    fn test_pic50_to_ic50() {
        assert_close(pic50_to_ic50_nm(9.0), 1.0);
        assert_close(pic50_to_ic50_nm(6.0), 1000.0);
        assert_close(pic50_to_ic50_nm(5.0), 10_000.0);
        assert_close(pic50_to_ic50_nm(0.0), 1e9);
    }

    #[test]
    fn test_round_trip() {
        for pic50 in [3.2, 5.0, 6.75, 8.1, 10.0] {
            assert_close(ic50_nm_to_pic50(pic50_to_ic50_nm(pic50)), pic50);
        }
    }
}
