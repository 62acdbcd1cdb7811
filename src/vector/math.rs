//! Vector Kernels
//!
//! Small dense-vector helpers used by the decay math.

/// Euclidean norm
#[inline]
pub fn magnitude(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Multiply every component by `factor` in place.
///
/// The product is taken in `f64` and narrowed once per component.
pub fn scale_in_place(v: &mut [f32], factor: f64) {
    for x in v.iter_mut() {
        *x = (*x as f64 * factor) as f32;
    }
}

/// Scaled copy of `v`.
pub fn scaled(v: &[f32], factor: f64) -> Vec<f32> {
    v.iter().map(|&x| (x as f64 * factor) as f32).collect()
}

/// Fold `event` into the running average `avg` carrying mass `weight`.
///
/// `avg[i] = (avg[i] * weight + event_weight * event[i]) / (weight + event_weight)`
///
/// Caller guarantees equal lengths and `weight + event_weight > 0`.
pub fn weighted_average_in_place(avg: &mut [f32], weight: f64, event: &[f32], event_weight: f64) {
    debug_assert_eq!(avg.len(), event.len(), "Vector dimensions must match");

    if weight == 0.0 {
        avg.copy_from_slice(event);
        return;
    }

    let total = weight + event_weight;
    for (a, &e) in avg.iter_mut().zip(event) {
        *a = ((*a as f64 * weight + event_weight * e as f64) / total) as f32;
    }
}
