// ==========================================
// 裁切贴合可投产量核算系统 - 数量下限
// ==========================================
// 红线: 非负约束只在此处施加
// 适用: 层净量展示、不良净额、可投产量
// ==========================================

/// 数量下限截断到 0
#[inline]
pub fn clamp_non_negative(qty: i64) -> i64 {
    qty.max(0)
}

/// 可空数量求和，缺失按 0
pub fn sum_quantities<I>(quantities: I) -> i64
where
    I: IntoIterator<Item = Option<i64>>,
{
    quantities
        .into_iter()
        .fold(0i64, |acc, q| acc.saturating_add(q.unwrap_or(0)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_non_negative() {
        assert_eq!(clamp_non_negative(-5), 0);
        assert_eq!(clamp_non_negative(0), 0);
        assert_eq!(clamp_non_negative(42), 42);
    }

    #[test]
    fn test_sum_quantities_defaults_missing() {
        assert_eq!(sum_quantities([Some(3), None, Some(4)]), 7);
        assert_eq!(sum_quantities(Vec::<Option<i64>>::new()), 0);
    }
}
