use criterion::{black_box, criterion_group, criterion_main, Criterion};

use ad_rater::analysis::{simulate, simulate_null, NullInput, ProjectionInput};
use ad_rater::progress::{ProgressStage, ThrottledProgress};
use ad_rater::statistics::{amounts_to_units, EmpiricalDistribution};
use ad_rater::{AdEvaluator, DailySalesSeries};
use chrono::NaiveDate;

fn amounts(days: usize, offset: u32) -> Vec<f64> {
    (0..days)
        .map(|i| f64::from([0, 2, 1, 4, 3, 1, 2][i % 7] + offset) * 12.0)
        .collect()
}

fn bench_hot_loops(c: &mut Criterion) {
    let no_adv_amounts = amounts(90, 0);
    let adv_amounts = amounts(60, 1);
    let no_adv = EmpiricalDistribution::estimate(&amounts_to_units(&no_adv_amounts, 12.0)).unwrap();
    let adv = EmpiricalDistribution::estimate(&amounts_to_units(&adv_amounts, 12.0)).unwrap();
    let (no_adv_cdf, adv_cdf) = (no_adv.cumulative(), adv.cumulative());

    let mut group = c.benchmark_group("ad_rater");
    group.sample_size(20);

    group.bench_function("null_distribution_1000", |b| {
        let input = NullInput {
            observed_no_adv: &no_adv_amounts,
            no_adv: &no_adv_cdf,
            adv_days: adv_amounts.len(),
            unit_price: 12.0,
            number_sims: 1000,
            bins: 20,
            seed: 113,
        };
        b.iter(|| {
            let progress = ThrottledProgress::new(None, ProgressStage::NullDistribution, 1000);
            black_box(simulate_null(&input, &progress).unwrap())
        });
    });

    group.bench_function("projection_1000", |b| {
        let input = ProjectionInput {
            no_adv_cdf: &no_adv_cdf,
            no_adv_std_error: no_adv.std_error(),
            adv_cdf: &adv_cdf,
            adv_std_error: adv.std_error(),
            unit_price: 12.0,
            unit_cost: 3.0,
            annual_adv_expense: 6000.0,
            number_sims: 1000,
            bins: 20,
            seed: 113,
        };
        b.iter(|| {
            let progress = ThrottledProgress::new(None, ProgressStage::Projection, 1000);
            black_box(simulate(&input, &progress).unwrap())
        });
    });

    group.bench_function("evaluate_quick", |b| {
        let first = NaiveDate::from_ymd_opt(2018, 1, 1).unwrap();
        let series =
            DailySalesSeries::from_amounts(first, &[no_adv_amounts.clone(), adv_amounts.clone()].concat())
                .unwrap();
        let start = NaiveDate::from_ymd_opt(2018, 4, 1).unwrap();
        b.iter(|| black_box(AdEvaluator::quick(start).evaluate(&series).unwrap()));
    });

    group.finish();
}

criterion_group!(benches, bench_hot_loops);
criterion_main!(benches);
