//! End-to-end projection scenarios with known answers.

use ad_rater::{AdEvaluator, DailySalesSeries, EvaluationReport, DAYS_PER_YEAR};
use chrono::{Days, NaiveDate};

fn day(offset: u64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2019, 2, 1).unwrap() + Days::new(offset)
}

/// 60 days split 30/30; the second period adds `lift` dollars a day.
fn scenario(base: &[f64], lift: f64) -> DailySalesSeries {
    let amounts: Vec<f64> = (0..60)
        .map(|i| base[i % base.len()] + if i >= 30 { lift } else { 0.0 })
        .collect();
    DailySalesSeries::from_amounts(day(0), &amounts).unwrap()
}

fn run(series: &DailySalesSeries, seed: u64) -> EvaluationReport {
    AdEvaluator::quick(day(30))
        .unit_price(1.0)
        .seed(seed)
        .evaluate(series)
        .unwrap()
}

/// No lift: the campaign costs exactly its expense.
#[test]
fn constant_sales_lose_the_ad_expense() {
    let series = scenario(&[10.0], 0.0);
    let report = AdEvaluator::quick(day(30)).evaluate(&series).unwrap();

    let expected = -report.metadata.annual_adv_expense;
    assert!((report.expected_profit_increase() - expected).abs() < 1e-6);
    assert!(report.loss_probability() > 0.5);
    assert_eq!(report.projection.sales_increase.mean, 0.0);
    assert!((report.projection.sales_overlap - 1.0).abs() < 1e-12);
}

/// +$10 a day at $1 a unit is worth 10 × 365.25 a year.
#[test]
fn ten_dollar_lift_annualizes() {
    let series = scenario(&[3.0, 5.0, 4.0, 6.0, 2.0], 10.0);
    let expected = 10.0 * DAYS_PER_YEAR;

    let means: Vec<f64> = (1..=5)
        .map(|seed| run(&series, seed).projection.sales_increase.mean)
        .collect();
    let n = means.len() as f64;
    let grand = means.iter().sum::<f64>() / n;
    let sd = (means.iter().map(|m| (m - grand).powi(2)).sum::<f64>() / (n - 1.0)).sqrt();
    // 99.9% t interval with 4 degrees of freedom.
    let half_width = 8.610 * sd / n.sqrt();

    assert!(
        (grand - expected).abs() <= half_width.max(1e-6),
        "mean {grand} ± {half_width}, expected {expected}"
    );
    assert!((grand - expected).abs() < 0.02 * expected, "means {means:?}");
}

/// The control arm measures simulation noise, not advertising.
#[test]
fn control_arm_is_centred_on_zero() {
    let series = scenario(&[3.0, 5.0, 4.0, 6.0, 2.0], 10.0);
    let report = run(&series, 11);
    let projection = &report.projection;

    let control = &projection.control_sales_increase;
    let spread = {
        let m = control.mean;
        (control.values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / control.values.len() as f64)
            .sqrt()
    };
    assert!(control.mean.abs() < spread, "control mean {} spread {spread}", control.mean);
    // The real lift stands far above the noise floor.
    assert!(projection.sales_increase.mean > 5.0 * spread);
    // The control arm carries no advertising expense.
    assert!(projection.control_profit_increase.loss_fraction > 0.2);
    assert!(projection.control_profit_increase.loss_fraction < 0.8);
}

/// With unit cost, profit is sales times the margin minus the expense.
#[test]
fn unit_cost_scales_profit() {
    let series = scenario(&[3.0, 5.0, 4.0, 6.0, 2.0], 10.0);
    let free = run(&series, 3);
    let costly = AdEvaluator::quick(day(30))
        .unit_price(1.0)
        .unit_cost(0.25)
        .seed(3)
        .evaluate(&series)
        .unwrap();

    let expense = free.metadata.annual_adv_expense;
    let margin_profit = 0.75 * free.projection.sales_increase.mean - expense;
    assert!((costly.expected_profit_increase() - margin_profit).abs() < 1e-6);
    assert!(costly.expected_profit_increase() < free.expected_profit_increase());
}

/// Percentiles of the profit distribution are ordered and bracketed.
#[test]
fn profit_summary_is_consistent() {
    let series = scenario(&[3.0, 5.0, 4.0, 6.0, 2.0], 1.0);
    let report = run(&series, 21);
    let summary = &report.projection.profit_summary;

    let values: Vec<f64> = summary.percentiles.iter().map(|p| p.value).collect();
    assert_eq!(values.len(), 5);
    assert!(values.windows(2).all(|w| w[0] <= w[1]), "{values:?}");
    assert!(summary.min <= values[0] && values[4] <= summary.max);
    assert!((summary.mean - report.expected_profit_increase()).abs() < 1e-9);
    assert!(summary.std_dev > 0.0);
}

/// A small lift against a large expense is most likely a loss.
#[test]
fn expense_dominates_small_lift() {
    let series = scenario(&[3.0, 5.0, 4.0, 6.0, 2.0], 1.0);
    let report = AdEvaluator::quick(day(30))
        .unit_price(1.0)
        .annual_adv_expense(12_000.0)
        .evaluate(&series)
        .unwrap();
    assert!(report.loss_probability() > 0.9);
    assert!(report.expected_profit_increase() < 0.0);
}
