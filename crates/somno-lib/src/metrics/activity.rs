use crate::signal::ImuWindow;

/// Motion energy: root mean square of the per-sample acceleration vector norm.
pub fn activity_index(imu: &ImuWindow) -> Option<f64> {
    if imu.is_empty() {
        return None;
    }
    let energy: f64 = imu
        .samples
        .iter()
        .map(|s| s.iter().map(|v| v * v).sum::<f64>())
        .sum();
    Some((energy / imu.len() as f64).sqrt())
}

/// Same index for a channel that already holds a combined magnitude.
pub fn activity_index_scalar(magnitude: &[f64]) -> Option<f64> {
    if magnitude.is_empty() {
        return None;
    }
    let energy: f64 = magnitude.iter().map(|v| v * v).sum();
    Some((energy / magnitude.len() as f64).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rms_of_vector_norm() {
        let imu = ImuWindow::new(32.0, vec![[3.0, 4.0, 0.0], [0.0, 0.0, 0.0]]);
        let act = activity_index(&imu).unwrap();
        assert!((act - (25.0f64 / 2.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn scalar_and_vector_forms_agree() {
        let imu = ImuWindow::new(32.0, vec![[0.0, -2.0, 0.0], [1.0, 0.0, 0.0]]);
        let magnitude = [-2.0, 1.0];
        assert_eq!(activity_index(&imu), activity_index_scalar(&magnitude));
    }

    #[test]
    fn zero_motion_is_zero_and_empty_is_undefined() {
        let still = ImuWindow::new(32.0, vec![[0.0; 3]; 16]);
        assert_eq!(activity_index(&still), Some(0.0));
        assert_eq!(activity_index(&ImuWindow::new(32.0, Vec::new())), None);
        assert_eq!(activity_index_scalar(&[]), None);
    }
}
