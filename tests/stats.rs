use series_engine::aggregation::stats::{
    exponential_average, pearson_correlation, triangular_weighted_average, weighted_average,
};
use series_engine::types::unstruct;

const EPS: f64 = 1e-9;

fn close(actual: Option<f64>, expected: f64) -> bool {
    actual.is_some_and(|a| (a - expected).abs() < EPS)
}

#[test]
fn test_triangular_average_weights_newest_heaviest() {
    assert!(close(triangular_weighted_average(&[10.0, 20.0, 30.0]), 140.0 / 6.0));
    assert!(close(triangular_weighted_average(&[4.0]), 4.0));
    assert_eq!(triangular_weighted_average(&[]), None);
}

#[test]
fn test_weighted_average() {
    let avg = weighted_average(&[1.0, 2.0, 3.0], &[0.0, 1.0, 3.0]).unwrap();
    assert!(close(avg, 11.0 / 4.0));
}

#[test]
fn test_weighted_average_zero_weight_is_absent() {
    assert_eq!(weighted_average(&[1.0, 2.0], &[0.0, 0.0]).unwrap(), None);
}

#[test]
fn test_weighted_average_length_mismatch() {
    let err = weighted_average(&[1.0, 2.0], &[1.0]).unwrap_err();
    assert!(err.is_validation());
}

#[test]
fn test_exponential_average() {
    assert!((exponential_average(&[1.0, 2.0, 3.0], 0.5) - 2.25).abs() < EPS);
    assert_eq!(exponential_average(&[], 0.5), 0.0);
    assert_eq!(exponential_average(&[7.0], 0.1), 7.0);
}

#[test]
fn test_pearson_correlation() {
    assert!(close(pearson_correlation(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]), 1.0));
    assert!(close(pearson_correlation(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]), -1.0));
}

#[test]
fn test_pearson_stretches_shorter_series() {
    let r = pearson_correlation(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0, 8.0, 10.0]);
    assert!(close(r, 1.0));
}

#[test]
fn test_pearson_degenerate_inputs() {
    assert_eq!(pearson_correlation(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]), None);
    assert_eq!(pearson_correlation(&[], &[1.0]), None);
}

#[test]
fn test_unstruct_zips_parallel_sequences() {
    let points = unstruct(&[1, 2], &[0.5, 1.5]).unwrap();
    assert_eq!(points.len(), 2);
    assert_eq!(points[1].timestamp, 2);
    assert_eq!(points[1].value, 1.5);

    assert!(unstruct(&[1, 2, 3], &[0.5]).unwrap_err().is_validation());
}
