//! Tests for normalization strategies and the registry

use super::*;

fn ramp(width: u32, height: u32, max: f32) -> PixelArray {
    let n = (width * height) as usize;
    let data = (0..n).map(|i| i as f32 / (n - 1) as f32 * max).collect();
    PixelArray::grayscale(width, height, data).unwrap()
}

fn assert_in_range(out: &PixelArray, range: (f32, f32)) {
    for &v in &out.data {
        assert!(
            v >= range.0 && v <= range.1,
            "value {} outside [{}, {}]",
            v,
            range.0,
            range.1
        );
    }
}

// ========================================================================
// Registry Tests
// ========================================================================

#[test]
fn test_builtin_registry_names() {
    let registry = NormalizerRegistry::with_builtin();
    for name in ["minmax", "min-max", "max", "zscore", "robust", "equalize", "histeq"] {
        assert!(registry.contains(name), "missing strategy {}", name);
    }
}

#[test]
fn test_unknown_strategy_fails() {
    let pixels = ramp(4, 4, 100.0);
    let result = normalize(&pixels, &NormalizationSpec::new("sharpen"));
    match result {
        Err(OdmError::UnknownStrategy(name)) => assert_eq!(name, "sharpen"),
        other => panic!("expected UnknownStrategy, got {:?}", other),
    }
}

#[test]
fn test_register_custom_strategy() {
    struct Negate;
    impl Normalizer for Negate {
        fn name(&self) -> &'static str {
            "negate"
        }
        fn apply(&self, data: &[f32], _spec: &NormalizationSpec) -> Result<Vec<f32>> {
            Ok(data.iter().map(|v| 255.0 - v).collect())
        }
    }

    let mut registry = NormalizerRegistry::new();
    registry.register(Arc::new(Negate));
    let pixels = PixelArray::grayscale(2, 1, vec![0.0, 55.0]).unwrap();
    let out = registry
        .normalize(&pixels, &NormalizationSpec::new("negate"))
        .unwrap();
    assert_eq!(out.data, vec![255.0, 200.0]);
}

#[test]
fn test_all_builtin_strategies_preserve_shape() {
    let registry = NormalizerRegistry::with_builtin();
    let pixels = ramp(7, 5, 4095.0);
    for name in ["minmax", "max", "zscore", "robust", "equalize"] {
        let out = registry
            .normalize(&pixels, &NormalizationSpec::new(name))
            .unwrap();
        assert_eq!(out.shape(), pixels.shape(), "shape changed by {}", name);
        assert_eq!(out.len(), pixels.len());
    }
}

#[test]
fn test_bounded_strategies_stay_in_declared_range() {
    let registry = NormalizerRegistry::with_builtin();
    let pixels = ramp(16, 16, 65535.0);
    for spec in [
        NormalizationSpec::new("minmax"),
        NormalizationSpec::new("minmax").with_param("lo", -1.0).with_param("hi", 1.0),
        NormalizationSpec::new("max").with_param("scale", 10.0),
        NormalizationSpec::new("equalize").with_param("bins", 64.0),
    ] {
        let strategy = registry.get(&spec.name).unwrap();
        let range = strategy.output_range(&spec).unwrap().unwrap();
        let out = registry.normalize(&pixels, &spec).unwrap();
        assert_in_range(&out, range);
    }
}

// ========================================================================
// Strategy Tests
// ========================================================================

#[test]
fn test_minmax_hits_both_ends() {
    let pixels = PixelArray::grayscale(3, 1, vec![100.0, 150.0, 200.0]).unwrap();
    let spec = NormalizationSpec::new("minmax").with_param("hi", 100.0);
    let out = normalize(&pixels, &spec).unwrap();
    assert_eq!(out.data, vec![0.0, 50.0, 100.0]);
}

#[test]
fn test_minmax_constant_image_maps_to_lo() {
    let pixels = PixelArray::grayscale(2, 2, vec![42.0; 4]).unwrap();
    let spec = NormalizationSpec::new("minmax").with_param("lo", 10.0);
    let out = normalize(&pixels, &spec).unwrap();
    assert_eq!(out.data, vec![10.0; 4]);
}

#[test]
fn test_minmax_rejects_inverted_range() {
    let pixels = ramp(2, 2, 1.0);
    let spec = NormalizationSpec::new("minmax")
        .with_param("lo", 5.0)
        .with_param("hi", 5.0);
    assert!(matches!(
        normalize(&pixels, &spec),
        Err(OdmError::InvalidParameter { .. })
    ));
}

#[test]
fn test_max_scale_of_dark_image_is_zero() {
    let pixels = PixelArray::grayscale(2, 1, vec![0.0, 0.0]).unwrap();
    let out = normalize(&pixels, &NormalizationSpec::new("max")).unwrap();
    assert_eq!(out.data, vec![0.0, 0.0]);
}

#[test]
fn test_zscore_has_zero_mean_unit_std() {
    let pixels = ramp(10, 10, 1000.0);
    let out = normalize(&pixels, &NormalizationSpec::new("zscore")).unwrap();
    let n = out.len() as f64;
    let mean = out.data.iter().map(|&v| v as f64).sum::<f64>() / n;
    let var = out
        .data
        .iter()
        .map(|&v| (v as f64 - mean).powi(2))
        .sum::<f64>()
        / n;
    assert!(mean.abs() < 1e-4);
    assert!((var.sqrt() - 1.0).abs() < 1e-4);
}

#[test]
fn test_robust_centers_on_median() {
    let pixels = PixelArray::grayscale(5, 1, vec![1.0, 2.0, 3.0, 4.0, 1000.0]).unwrap();
    let out = normalize(&pixels, &NormalizationSpec::new("robust")).unwrap();
    // median 3, IQR 4 - 2 = 2
    assert_eq!(out.data[2], 0.0);
    assert_eq!(out.data[0], -1.0);
    assert_eq!(out.data[3], 0.5);
}

#[test]
fn test_equalize_spreads_skewed_image() {
    // Dark mass lands on 0, the bright tail on 255.
    let mut data = vec![10.0; 90];
    data.extend(vec![200.0; 10]);
    let pixels = PixelArray::grayscale(10, 10, data).unwrap();
    let out = normalize(&pixels, &NormalizationSpec::new("equalize")).unwrap();
    assert_eq!(out.data[0], 0.0);
    assert_eq!(out.data[99], 255.0);
}

#[test]
fn test_equalize_rejects_fractional_bins() {
    let pixels = ramp(2, 2, 1.0);
    let spec = NormalizationSpec::new("equalize").with_param("bins", 10.5);
    assert!(normalize(&pixels, &spec).is_err());
}

#[test]
fn test_equalize_bins_are_capped() {
    let pixels = ramp(2, 2, 1.0);
    let equalize = default_registry().get("equalize").unwrap();

    let huge = NormalizationSpec::new("equalize").with_param("bins", 1e12);
    assert!(matches!(
        normalize(&pixels, &huge),
        Err(OdmError::InvalidParameter { .. })
    ));
    assert!(equalize.output_range(&huge).is_err());

    let largest = NormalizationSpec::new("equalize").with_param("bins", 65536.0);
    assert!(normalize(&pixels, &largest).is_ok());
    assert!(normalize(&pixels, &largest.clone().with_param("bins", 65537.0)).is_err());
}

#[test]
fn test_normalize_is_deterministic() {
    let pixels = ramp(8, 8, 300.0);
    for name in ["minmax", "zscore", "robust", "equalize"] {
        let spec = NormalizationSpec::new(name);
        let a = normalize(&pixels, &spec).unwrap();
        let b = normalize(&pixels, &spec).unwrap();
        assert_eq!(a, b);
    }
}

#[test]
fn test_timing_does_not_change_result() {
    let pixels = ramp(8, 8, 1000.0);
    let spec = NormalizationSpec::new("minmax");
    assert_eq!(
        normalize_timed(&pixels, &spec, true).unwrap(),
        normalize(&pixels, &spec).unwrap()
    );
    assert!(normalize_timed(&pixels, &NormalizationSpec::new("nope"), true).is_err());
}
