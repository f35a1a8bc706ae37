use approx::assert_relative_eq;
use lstnet_forecast::data::{parse_timestamp, Dataset, Frequency};
use lstnet_forecast::ScaleFactors;
use pretty_assertions::assert_eq;
use tempfile::tempdir;

fn dataset(values: Vec<Vec<f64>>) -> Dataset {
    let start = parse_timestamp("2012-01-01 00:00:00").unwrap();
    Dataset::new(start, Frequency::hourly(), values).unwrap()
}

#[test]
fn test_inverse_of_normalized_values() {
    let scales = ScaleFactors::from_scales(vec![4.0]).unwrap();
    let restored = scales.inverse_transform(0, &[0.5, 1.0, 0.25]).unwrap();
    assert_eq!(restored, vec![2.0, 4.0, 1.0]);
}

#[test]
fn test_round_trip() {
    let data = dataset(vec![
        vec![3.7, -12.25, 0.001, 1e6],
        vec![-0.3, 0.7, 2.9, -8.1],
    ]);
    let scales = ScaleFactors::fit(&data).unwrap();
    let normalized = scales.transform_dataset(&data).unwrap();
    let restored = scales.inverse_transform_dataset(&normalized).unwrap();

    for (original, back) in data.series().iter().zip(restored.series()) {
        for (a, b) in original.values().iter().zip(back.values()) {
            assert_relative_eq!(*a, *b, max_relative = 1e-12);
        }
    }
}

#[test]
fn test_scales_come_from_train_only() {
    let full = dataset(vec![vec![1.0, -2.0, 4.0, 100.0], vec![0.0, 0.0, 0.0, 50.0]]);
    let split = full.train_test_split(1).unwrap();
    let scales = ScaleFactors::fit(&split.train).unwrap();

    // The held-out 100.0 and 50.0 must not leak into the scales
    assert_eq!(scales.scales(), &[4.0, 1.0]);

    let test = scales.transform_dataset(&split.test).unwrap();
    assert_eq!(test.series()[0].values(), &[0.25, -0.5, 1.0, 25.0]);
    assert_eq!(test.series()[1].values(), &[0.0, 0.0, 0.0, 50.0]);
}

#[test]
fn test_save_and_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("scales.json");
    let scales = ScaleFactors::from_scales(vec![4.0, 0.5, 1.0]).unwrap();

    scales.save(&path).unwrap();
    assert_eq!(ScaleFactors::load(&path).unwrap(), scales);
}
