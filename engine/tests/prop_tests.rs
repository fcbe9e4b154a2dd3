//! Property tests for the score-update invariants under arbitrary
//! sequences of adjustment attempts.

use std::sync::Arc;

use proptest::prelude::*;

use credscore_engine::{CreditError, CreditService};
use credscore_nullables::{NullClock, NullOwnership};
use credscore_types::{CreditParams, Identity, Score, ScoreDelta, Timestamp};

fn service() -> CreditService {
    CreditService::new(
        CreditParams::default(),
        Arc::new(NullOwnership::new()),
        Arc::new(NullClock::new(0)),
        Identity::new("admin"),
    )
    .unwrap()
}

/// (integration index, delta, seconds since previous attempt)
fn arb_attempt() -> impl Strategy<Value = (usize, i32, u64)> {
    (0usize..3, -15i32..=15, 0u64..=200_000)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn score_stays_in_bounds_and_throttle_holds(attempts in prop::collection::vec(arb_attempt(), 1..60)) {
        let svc = service();
        let owner = Identity::new("alice");
        let integrations: Vec<Identity> =
            ["lender", "bank", "telco"].iter().map(|s| Identity::new(*s)).collect();
        let token = svc.create_record(&owner, svc.params().record_price).unwrap();
        for integration in &integrations {
            svc.grant_approval(&owner, integration).unwrap();
        }

        let mut last_success: Vec<Option<u64>> = vec![None; integrations.len()];
        let mut now = 0u64;
        for (who, delta, gap) in attempts {
            now += gap;
            let before = svc.record(token).unwrap();
            let result = svc.adjust_score(token, &integrations[who], ScoreDelta::new(delta), Timestamp::new(now));
            let after = svc.record(token).unwrap();

            prop_assert!(after.score >= Score::new(350) && after.score <= Score::new(900));
            match result {
                Ok(score) => {
                    prop_assert!(delta.unsigned_abs() <= 10);
                    if let Some(prev) = last_success[who] {
                        prop_assert!(now - prev >= 86_400);
                    }
                    prop_assert_eq!(score, after.score);
                    prop_assert_eq!(i64::from(score.value()), i64::from(before.score.value()) + i64::from(delta));
                    last_success[who] = Some(now);
                }
                Err(err) => {
                    prop_assert_eq!(&before, &after);
                    if delta.unsigned_abs() > 10 {
                        let is_delta_err = matches!(err, CreditError::DeltaOutOfRange { .. });
                        prop_assert!(is_delta_err);
                    }
                }
            }
        }
    }

    #[test]
    fn unapproved_integrations_never_change_scores(deltas in prop::collection::vec(-10i32..=10, 1..20)) {
        let svc = service();
        let owner = Identity::new("alice");
        let token = svc.create_record(&owner, svc.params().record_price).unwrap();
        let stranger = Identity::new("stranger");
        for (i, delta) in deltas.into_iter().enumerate() {
            let at = Timestamp::new(i as u64 * 86_400);
            let result = svc.adjust_score(token, &stranger, ScoreDelta::new(delta), at);
            let is_not_approved = matches!(result, Err(CreditError::NotApproved { .. }));
            prop_assert!(is_not_approved);
        }
        prop_assert_eq!(svc.record(token).unwrap().score, Score::new(500));
    }
}
