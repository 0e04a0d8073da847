//! Some common numeric utilities required internally but also useful for
//! external users, when working with audio frames and BPM series.

/// Lowest level in dBFS that [`rms_to_dbfs`] reports. Digital silence would
/// otherwise be `-inf`.
pub const MIN_DBFS: f32 = -120.0;

/// Returns the maximum absolute sample value of the frame.
#[inline]
pub fn peak_amplitude(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0_f32, |max, s| max.max(s.abs()))
}

/// Returns the root mean square of the frame. An empty frame has an RMS of
/// `0.0`.
#[inline]
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum = samples.iter().map(|s| s * s).sum::<f32>();
    (sum / samples.len() as f32).sqrt()
}

/// Converts a linear RMS value in range `0.0..=1.0` to dBFS.
#[inline]
pub fn rms_to_dbfs(rms: f32) -> f32 {
    if rms <= 0.0 {
        MIN_DBFS
    } else {
        (20.0 * rms.log10()).max(MIN_DBFS)
    }
}

/// Arithmetic mean. `None` for an empty input.
pub fn mean(values: impl Iterator<Item = f32>) -> Option<f32> {
    let (sum, count) = values.fold((0.0_f32, 0_usize), |(sum, n), v| (sum + v, n + 1));
    (count > 0).then(|| sum / count as f32)
}

/// Population variance (mean squared deviation from the mean). `None` for an
/// empty input.
pub fn population_variance(values: &[f32]) -> Option<f32> {
    let mean = mean(values.iter().copied())?;
    self::mean(values.iter().map(|v| (v - mean) * (v - mean)))
}

/// Median of the given values. Sorts the slice in place, so the caller can
/// use a stack buffer and avoid allocations. `None` for an empty slice.
///
/// For an even number of values, the mean of the two middle values is
/// returned.
pub fn median_in_place(values: &mut [f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;
    use float_cmp::approx_eq;

    #[test]
    fn test_peak_and_rms() {
        check!(peak_amplitude(&[]) == 0.0);
        check!(peak_amplitude(&[0.1, -0.7, 0.5]) == 0.7);
        check!(rms(&[]) == 0.0);
        check!(rms(&[0.5, -0.5, 0.5, -0.5]) == 0.5);
    }

    #[test]
    fn test_rms_to_dbfs() {
        check!(rms_to_dbfs(0.0) == MIN_DBFS);
        check!(rms_to_dbfs(1.0) == 0.0);
        check!(approx_eq!(f32, rms_to_dbfs(0.01), -40.0, epsilon = 0.001));
    }

    #[test]
    fn test_variance() {
        check!(population_variance(&[]) == None);
        check!(population_variance(&[120.0; 5]) == Some(0.0));
        check!(population_variance(&[1.0, 3.0]) == Some(1.0));
    }

    #[test]
    fn test_median() {
        check!(median_in_place(&mut [0.0_f32; 0]) == None);
        check!(median_in_place(&mut [3.0, 1.0, 2.0]) == Some(2.0));
        check!(median_in_place(&mut [4.0, 1.0, 3.0, 2.0]) == Some(2.5));
    }
}
