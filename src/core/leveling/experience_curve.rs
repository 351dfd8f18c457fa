/// How much experience each level costs.
///
/// Only `required_exp` has to be provided. `level_exp` defaults to the sum of
/// every step below the level, so an implementation that overrides it with a
/// closed form must stay consistent with that sum. `None` means the level
/// costs more than a `u64` can hold.
pub trait ExperienceCurve: Send + Sync {
    /// Experience needed to go from `level` to `level + 1`.
    fn required_exp(&self, level: u32) -> u64;

    /// Cumulative experience needed to reach `level` from zero.
    fn level_exp(&self, level: u32) -> Option<u64> {
        (0..level).try_fold(0u64, |total, l| total.checked_add(self.required_exp(l)))
    }

    /// Highest level whose cumulative cost fits in `total_exp`.
    fn find_level(&self, total_exp: u64) -> u32 {
        let mut level = 0;
        let mut spent = 0u64;
        loop {
            match spent.checked_add(self.required_exp(level)) {
                Some(next) if next <= total_exp && next != spent && level < u32::MAX => {
                    spent = next;
                    level += 1;
                }
                _ => return level,
            }
        }
    }
}

/// Linear step curve: every level costs `step` more than the previous one.
///
/// With the defaults, level 0 -> 1 costs 65 XP, 1 -> 2 costs 204 XP, and so on.
#[derive(Debug, Clone, Copy)]
pub struct LinearCurve {
    pub base: u64,
    pub step: u64,
}

impl Default for LinearCurve {
    fn default() -> Self {
        Self {
            base: 65,
            step: 139,
        }
    }
}

impl ExperienceCurve for LinearCurve {
    fn required_exp(&self, level: u32) -> u64 {
        self.step * level as u64 + self.base
    }

    fn level_exp(&self, level: u32) -> Option<u64> {
        let level = u128::from(level);
        let (base, step) = (u128::from(self.base), u128::from(self.step));
        let total = base * level + step * level * level.saturating_sub(1) / 2;
        u64::try_from(total).ok()
    }

    /// Binary search over the closed form; stepping level by level would take
    /// billions of iterations near `u64::MAX`.
    fn find_level(&self, total_exp: u64) -> u32 {
        let (mut low, mut high) = (0u32, u32::MAX);
        while low < high {
            let mid = low + (high - low) / 2 + 1;
            match self.level_exp(mid) {
                Some(cost) if cost <= total_exp => low = mid,
                _ => high = mid - 1,
            }
        }
        low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_form_matches_the_sum_of_steps() {
        let curve = LinearCurve::default();
        for level in 0..60 {
            let summed: u64 = (0..level).map(|l| curve.required_exp(l)).sum();
            assert_eq!(curve.level_exp(level), Some(summed), "level {}", level);
        }
    }

    #[test]
    fn default_curve_values() {
        let curve = LinearCurve::default();
        assert_eq!(curve.required_exp(0), 65);
        assert_eq!(curve.required_exp(1), 204);
        assert_eq!(curve.level_exp(0), Some(0));
        assert_eq!(curve.level_exp(1), Some(65));
        assert_eq!(curve.level_exp(2), Some(269));
    }

    #[test]
    fn find_level_inverts_level_exp() {
        let curve = LinearCurve::default();
        assert_eq!(curve.find_level(0), 0);
        assert_eq!(curve.find_level(64), 0);
        assert_eq!(curve.find_level(65), 1);
        assert_eq!(curve.find_level(268), 1);
        assert_eq!(curve.find_level(269), 2);
        assert_eq!(curve.find_level(curve.level_exp(25).unwrap()), 25);
    }

    #[test]
    fn huge_levels_do_not_overflow() {
        let curve = LinearCurve::default();
        assert!(curve.level_exp(500_000_000).is_some());
        assert_eq!(curve.level_exp(1_000_000_000), None);
        assert_eq!(curve.level_exp(u32::MAX), None);

        let top = curve.find_level(u64::MAX);
        assert!(curve.level_exp(top).is_some());
        assert_eq!(curve.level_exp(top + 1), None);
    }

    #[test]
    fn default_sum_reports_overflow() {
        struct Flat;
        impl ExperienceCurve for Flat {
            fn required_exp(&self, _: u32) -> u64 {
                u64::MAX / 2
            }
        }

        assert_eq!(Flat.level_exp(2), Some(u64::MAX - 1));
        assert_eq!(Flat.level_exp(3), None);
        assert_eq!(Flat.find_level(u64::MAX), 2);
    }
}
