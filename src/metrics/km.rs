//! Kaplan-Meier estimation of the censoring distribution.

/// Kaplan-Meier step function for `G(t) = P(censoring > t)`.
///
/// For the censoring distribution the roles are reversed: an observation
/// counts as an "event" for `G` exactly when it is NOT a primary event
/// (right-censored or competing, under the binarized primary-event scope).
/// Ties at one time point are processed as a single step, with the step
/// applied after primary events at the same time are removed from the risk
/// set consistently for both groups.
#[derive(Debug, Clone)]
pub struct KaplanMeier {
    /// Step times, strictly increasing.
    times: Vec<f64>,
    /// Survival value just after each step time.
    surv: Vec<f64>,
}

impl KaplanMeier {
    /// Fit the censoring distribution on an evaluation cohort.
    ///
    /// `primary[i]` marks subjects whose observed event is the primary one;
    /// everyone else counts as censored for `G`.
    pub fn fit_censoring(times: &[f64], primary: &[bool]) -> Self {
        let n = times.len();
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| times[a].partial_cmp(&times[b]).unwrap_or(std::cmp::Ordering::Equal));

        let mut step_times = Vec::new();
        let mut step_surv = Vec::new();
        let mut km = 1.0f64;
        let mut at_risk = n;
        let mut i = 0;
        while i < n {
            let t = times[order[i]];
            let mut n_censor = 0usize;
            let mut n_primary = 0usize;
            let mut j = i;
            while j < n && times[order[j]] == t {
                if primary[order[j]] {
                    n_primary += 1;
                } else {
                    n_censor += 1;
                }
                j += 1;
            }
            if n_censor > 0 && at_risk > 0 {
                km *= 1.0 - n_censor as f64 / at_risk as f64;
                step_times.push(t);
                step_surv.push(km);
            }
            at_risk -= n_censor + n_primary;
            i = j;
        }
        Self {
            times: step_times,
            surv: step_surv,
        }
    }

    /// `G(t)`: right-continuous lookup.
    pub fn survival_at(&self, t: f64) -> f64 {
        let idx = self.times.partition_point(|&s| s <= t);
        if idx == 0 {
            1.0
        } else {
            self.surv[idx - 1]
        }
    }

    /// `G(t-)`: value just before `t`.
    pub fn survival_before(&self, t: f64) -> f64 {
        let idx = self.times.partition_point(|&s| s < t);
        if idx == 0 {
            1.0
        } else {
            self.surv[idx - 1]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn hand_computed_steps() {
        // 4 subjects: censoring "events" for G at t=1 and t=3,
        // primary events (removed from the risk set) at t=2 and t=4.
        let times = [1.0, 2.0, 3.0, 4.0];
        let primary = [false, true, false, true];
        let km = KaplanMeier::fit_censoring(&times, &primary);

        // t=1: 4 at risk, 1 censoring -> G = 3/4.
        // t=3: 2 at risk, 1 censoring -> G = 3/4 * 1/2 = 3/8.
        assert_abs_diff_eq!(km.survival_at(0.5), 1.0);
        assert_abs_diff_eq!(km.survival_at(1.0), 0.75);
        assert_abs_diff_eq!(km.survival_at(2.5), 0.75);
        assert_abs_diff_eq!(km.survival_at(3.0), 0.375);
        assert_abs_diff_eq!(km.survival_at(10.0), 0.375);
    }

    #[test]
    fn left_limit_excludes_the_step_at_t() {
        let times = [1.0, 2.0];
        let primary = [false, true];
        let km = KaplanMeier::fit_censoring(&times, &primary);
        assert_abs_diff_eq!(km.survival_before(1.0), 1.0);
        assert_abs_diff_eq!(km.survival_at(1.0), 0.5);
        assert_abs_diff_eq!(km.survival_before(1.5), 0.5);
    }

    #[test]
    fn all_primary_events_leave_g_at_one() {
        let times = [1.0, 2.0, 3.0];
        let primary = [true, true, true];
        let km = KaplanMeier::fit_censoring(&times, &primary);
        assert_abs_diff_eq!(km.survival_at(5.0), 1.0);
    }
}
