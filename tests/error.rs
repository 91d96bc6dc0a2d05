//! Tests for error module

use bundlemap::error::{BundleError, OptionExt};

#[test]
fn test_error_display() {
    let err = BundleError::InsufficientPoints {
        trajectory_id: "test-1".to_string(),
        point_count: 1,
        minimum_required: 2,
    };
    assert!(err.to_string().contains("test-1"));
    assert!(err.to_string().contains("1 points"));
}

#[test]
fn test_invalid_range_display() {
    let err = BundleError::InvalidRange {
        trajectory_id: "t".to_string(),
        from: 3.0,
        to: 1.0,
        point_count: 4,
    };
    assert!(err.to_string().contains("[3, 1]"));
}

#[test]
fn test_option_ext() {
    let none: Option<i32> = None;
    let result = none.ok_or_insufficient_points("test", 0, 2);
    assert!(matches!(result, Err(BundleError::InsufficientPoints { .. })));
    assert_eq!(Some(4).ok_or_insufficient_points("test", 1, 2), Ok(4));
}

#[test]
fn test_abort_classification() {
    assert!(BundleError::Aborted.is_abort());
    assert!(!BundleError::EmptyInput.is_abort());
    assert!(!BundleError::WorkerFailed("boom".to_string()).is_abort());
}

#[test]
fn test_too_short_trajectory_rejected() {
    let result = bundlemap::Trajectory::from_xy("solo", &[(0.0, 0.0)]);
    assert!(matches!(result, Err(BundleError::InsufficientPoints { .. })));
}

#[test]
fn test_non_finite_coordinates_rejected() {
    for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
        let result = bundlemap::Trajectory::from_xy("t", &[(0.0, 0.0), (bad, 1.0)]);
        assert!(matches!(
            result,
            Err(BundleError::InvalidCoordinate { ref trajectory_id, index: 1 }) if trajectory_id == "t"
        ));
    }
    let err = BundleError::InvalidCoordinate {
        trajectory_id: "t".to_string(),
        index: 3,
    };
    assert!(err.to_string().contains("point 3"));
}

#[test]
fn test_duplicate_display() {
    let err = BundleError::DuplicateTrajectory {
        trajectory_id: "route-7".to_string(),
    };
    assert!(err.to_string().contains("route-7"));
}

#[test]
fn test_deserialized_trajectory_is_validated() {
    let ok: bundlemap::Trajectory =
        serde_json::from_str(r#"{"id": "t", "points": [{"x": 0.0, "y": 0.0}, {"x": 1.0, "y": 0.0}]}"#).unwrap();
    assert_eq!(ok.num_points(), 2);

    let short = serde_json::from_str::<bundlemap::Trajectory>(r#"{"id": "t", "points": [{"x": 0.0, "y": 0.0}]}"#);
    assert!(short.is_err());
}
