use proptest::prelude::*;
use serde_json::json;
use series_prep::core::{
    AxisPosition, Cell, Cutoff, Series, SeriesGrid, align, apply_cutoff, percentile,
};

fn cells(values: &[f64]) -> Vec<Cell> {
    values.iter().copied().map(Cell::number).collect()
}

fn column_series(values: &[f64]) -> Series {
    Series {
        values: SeriesGrid::column(cells(values)),
        errors: SeriesGrid::filled(values.len(), 1, Cell::Number(0.0)),
        legend: String::new(),
        position: AxisPosition::Default,
        visible: true,
        labels: None,
        color: None,
        marker: None,
    }
}

fn cutoff_strategy() -> impl Strategy<Value = Cutoff> {
    prop_oneof![
        Just(Cutoff::None),
        (-1_000.0f64..1_000.0).prop_map(Cutoff::Absolute),
        (0.0f64..=100.0).prop_map(Cutoff::Percentile),
    ]
}

proptest! {
    #[test]
    fn removed_fraction_stays_in_unit_interval(
        values in prop::collection::vec(-1_000.0f64..1_000.0, 0..64),
        min_cutoff in cutoff_strategy(),
        max_cutoff in cutoff_strategy()
    ) {
        let input = cells(&values);
        let (filtered, fraction) = apply_cutoff(&input, min_cutoff, max_cutoff);

        prop_assert!((0.0..=1.0).contains(&fraction));
        prop_assert_eq!(filtered.len(), input.len());
        let marked = filtered.iter().filter(|cell| cell.is_missing()).count();
        prop_assert_eq!(fraction == 0.0, marked == 0);
    }

    #[test]
    fn percentile_lies_within_data_range(
        values in prop::collection::vec(-1_000.0f64..1_000.0, 1..64),
        p in 0.0f64..=100.0
    ) {
        let result = percentile(&values, p).expect("non-empty input");
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        prop_assert!(result >= min - 1e-9 && result <= max + 1e-9);
    }

    #[test]
    fn alignment_sorts_ascending_and_keeps_pairs(
        pairs in prop::collection::vec((-1_000i32..1_000, -1_000i32..1_000), 1..48)
    ) {
        let xs: Vec<f64> = pairs.iter().map(|(x, _)| f64::from(*x)).collect();
        let ys: Vec<f64> = pairs.iter().map(|(_, y)| f64::from(*y)).collect();

        let pairing = align(Some(&column_series(&xs)), &column_series(&ys)).expect("aligned");
        let sorted_x: Vec<f64> = pairing.x.values.iter().map(Cell::to_f64_lossy).collect();
        let sorted_y: Vec<f64> = pairing
            .y
            .expect("y present")
            .values
            .iter()
            .map(Cell::to_f64_lossy)
            .collect();

        prop_assert!(sorted_x.windows(2).all(|w| w[0] <= w[1]));
        let mut expected: Vec<(f64, f64)> = xs.iter().copied().zip(ys.iter().copied()).collect();
        expected.sort_by(|a, b| a.0.total_cmp(&b.0));
        let actual: Vec<(f64, f64)> = sorted_x.into_iter().zip(sorted_y).collect();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn path_resolution_is_deterministic(
        values in prop::collection::vec(-1_000i64..1_000, 1..16),
        index in 0usize..16
    ) {
        let document = json!({"outer": {"inner": values.clone()}});
        let path = series_prep::core::PathExpression::parse(&format!("outer.inner[{index}]"))
            .expect("valid path");

        let first = path.resolve(&document).ok().cloned();
        let second = path.resolve(&document).ok().cloned();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.is_some(), index < values.len());
    }
}
