// ==========================================
// 周度 Flash 预测台账 - 指标计算器
// ==========================================
// 职责: (flash_estimate, actual) -> (variance, percent_variance, accuracy)
// 红线: 纯函数, 无副作用, 不做 I/O
// 红线: actual = 0 时不得触发除零, percent_variance 显式为 None
// ==========================================

use crate::domain::forecast::ForecastMetrics;

/// 计算派生指标
///
/// - variance = flash_estimate - actual
/// - percent_variance = variance / actual (actual = 0 或商溢出时为 None)
/// - accuracy = max(0, 1 - |variance| / |actual|) (actual = 0 时约定为 0)
///
/// 不假设输入非负（非负约束由表单校验负责）。
pub fn compute_metrics(flash_estimate: f64, actual: f64) -> ForecastMetrics {
    let variance = flash_estimate - actual;

    if actual == 0.0 {
        // 约定: 实际值为 0 时准确率为 0, 即使 flash 也为 0
        return ForecastMetrics {
            variance,
            percent_variance: None,
            accuracy: 0.0,
        };
    }

    // 极小的 actual（次正规数）会让商溢出为 inf, 此时按未定义处理
    let ratio = variance / actual;
    if !ratio.is_finite() {
        return ForecastMetrics {
            variance,
            percent_variance: None,
            accuracy: 0.0,
        };
    }

    ForecastMetrics {
        variance,
        percent_variance: Some(ratio),
        accuracy: (1.0 - ratio.abs()).max(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    #[test]
    fn test_over_forecast() {
        // 10000 vs 9500
        let m = compute_metrics(10_000.0, 9_500.0);
        assert_eq!(m.variance, 500.0);
        assert!((m.percent_variance.unwrap() - 0.052_631_578_947_368_42).abs() < EPS);
        assert!((m.accuracy - (1.0 - 500.0 / 9_500.0)).abs() < EPS);
    }

    #[test]
    fn test_under_forecast() {
        let m = compute_metrics(11_000.0, 10_000.0);
        assert_eq!(m.variance, 1_000.0);
        assert_eq!(m.percent_variance, Some(0.1));
        assert!((m.accuracy - 0.9).abs() < EPS);

        let m = compute_metrics(8_000.0, 10_000.0);
        assert_eq!(m.variance, -2_000.0);
        assert_eq!(m.percent_variance, Some(-0.2));
        assert!((m.accuracy - 0.8).abs() < EPS);
    }

    #[test]
    fn test_zero_actual_is_undefined_percent_and_zero_accuracy() {
        let m = compute_metrics(5_000.0, 0.0);
        assert_eq!(m.variance, 5_000.0);
        assert_eq!(m.percent_variance, None);
        assert_eq!(m.accuracy, 0.0);

        // flash 也为 0: 仍按约定准确率为 0
        let m = compute_metrics(0.0, 0.0);
        assert_eq!(m.variance, 0.0);
        assert_eq!(m.percent_variance, None);
        assert_eq!(m.accuracy, 0.0);
    }

    #[test]
    fn test_accuracy_clipped_at_zero() {
        // 偏差超过实际值本身
        let m = compute_metrics(30_000.0, 10_000.0);
        assert_eq!(m.percent_variance, Some(2.0));
        assert_eq!(m.accuracy, 0.0);
    }

    #[test]
    fn test_perfect_match() {
        let m = compute_metrics(1_234.5, 1_234.5);
        assert_eq!(m.variance, 0.0);
        assert_eq!(m.percent_variance, Some(0.0));
        assert_eq!(m.accuracy, 1.0);
    }

    #[test]
    fn test_negative_inputs_follow_formula() {
        let m = compute_metrics(-50.0, -100.0);
        assert_eq!(m.variance, 50.0);
        assert_eq!(m.percent_variance, Some(-0.5));
        assert!((m.accuracy - 0.5).abs() < EPS);
    }

    #[test]
    fn test_formula_holds_over_grid() {
        let values = [0.0, 1.0, 7.5, 99.0, 1_000.0, 123_456.78];
        for &flash in &values {
            for &actual in &values {
                let m = compute_metrics(flash, actual);
                assert_eq!(m.variance, flash - actual);
                if actual != 0.0 {
                    assert_eq!(m.percent_variance, Some((flash - actual) / actual));
                    let expected = (1.0 - (flash - actual).abs() / actual.abs()).max(0.0);
                    assert_eq!(m.accuracy, expected);
                    assert!(m.accuracy >= 0.0 && m.accuracy <= 1.0);
                } else {
                    assert_eq!(m.percent_variance, None);
                    assert_eq!(m.accuracy, 0.0);
                }
            }
        }
    }

    #[test]
    fn test_subnormal_actual_never_yields_inf() {
        let m = compute_metrics(1.0, 5e-324);
        assert_eq!(m.percent_variance, None);
        assert_eq!(m.accuracy, 0.0);
        assert!(m.variance.is_finite());

        let m = compute_metrics(f64::MAX, 0.5);
        assert_eq!(m.percent_variance, None);
        assert_eq!(m.accuracy, 0.0);
    }
}
