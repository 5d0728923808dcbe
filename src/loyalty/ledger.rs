//! Ledger evaluation and profile transitions.
//!
//! Everything here is pure: the same `(history, now)` pair always
//! produces the same tier result, so the stored `tierXp`/`tier`
//! projection can never diverge from `xpHistory`. The async service
//! layer handles persistence.

use crate::config::LoyaltyConfig;
use crate::loyalty::catalog::RewardItem;
use crate::loyalty::error::LoyaltyError;
use crate::loyalty::model::{MemberTier, UserProfile, UserVoucher, VoucherStatus, XpKind, XpRecord};
use rand::{distributions::Alphanumeric, Rng};
use serde::Serialize;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

/// Earn events at or above this amount (minor units) are assumed to be
/// real purchases; below it they are treated as manual top-ups.
const PURCHASE_CONTEXT_MIN_MINOR: u64 = 50_000;

#[derive(Debug, Clone, PartialEq)]
pub struct TierStatus {
    pub active_xp: i64,
    pub tier: MemberTier,
    pub active_records: Vec<XpRecord>,
}

pub fn tier_for(active_xp: i64, rules: &LoyaltyConfig) -> MemberTier {
    if active_xp >= rules.platinum_threshold {
        MemberTier::Platinum
    } else if active_xp >= rules.gold_threshold {
        MemberTier::Gold
    } else {
        MemberTier::Silver
    }
}

/// Evaluate the ledger against a reference time.
///
/// Records dated strictly after `now - xp_validity_days` are active;
/// a record dated exactly at the cutoff is excluded. Active XP sums
/// earn events that count toward the tier, clamping negative amounts
/// to zero per record.
pub fn evaluate(history: &[XpRecord], now: OffsetDateTime, rules: &LoyaltyConfig) -> TierStatus {
    let cutoff = now - Duration::days(rules.xp_validity_days);

    let active_records: Vec<XpRecord> = history
        .iter()
        .filter(|record| record.date > cutoff)
        .cloned()
        .collect();

    let active_xp: i64 = active_records
        .iter()
        .filter(|record| record.kind == XpKind::Earn && record.tier_eligible)
        .map(|record| record.amount.max(0))
        .sum();

    TierStatus {
        active_xp,
        tier: tier_for(active_xp, rules),
        active_records,
    }
}

/// Recompute the tier projection and prune aged-out ledger entries.
/// Runs after every read and every transition.
pub fn refresh(mut profile: UserProfile, now: OffsetDateTime, rules: &LoyaltyConfig) -> UserProfile {
    let status = evaluate(&profile.xp_history, now, rules);
    profile.tier_xp = status.active_xp;
    profile.tier = status.tier;
    profile.xp_history = status.active_records;
    profile
}

/// Credit points for a purchase of `amount_minor` minor currency
/// units, at the configured conversion rate (floor division).
pub fn apply_earn(
    mut profile: UserProfile,
    amount_minor: u64,
    now: OffsetDateTime,
    rules: &LoyaltyConfig,
) -> UserProfile {
    let rate = rules.conversion_rate.max(1) as u64;
    let earned = i64::try_from(amount_minor / rate).unwrap_or(i64::MAX);

    profile.current_points += earned;
    profile.lifetime_points += earned;
    profile.xp_history.push(XpRecord {
        id: format!("xp_{}", Uuid::new_v4()),
        date: now,
        amount: earned,
        kind: XpKind::Earn,
        context: if amount_minor >= PURCHASE_CONTEXT_MIN_MINOR {
            "Drink Purchase"
        } else {
            "Admin Top Up"
        }
        .to_string(),
        location: "Gong Cha App".to_string(),
        tier_eligible: true,
    });

    refresh(profile, now, rules)
}

/// Exchange points for a reward. The deduction, the redeem ledger
/// entry and the new voucher land in one profile value, so no state
/// exists where points are gone but the voucher is not.
pub fn apply_redeem(
    mut profile: UserProfile,
    reward: &RewardItem,
    now: OffsetDateTime,
    rules: &LoyaltyConfig,
) -> Result<UserProfile, LoyaltyError> {
    if profile.current_points < reward.points_cost {
        return Err(LoyaltyError::InsufficientBalance);
    }

    profile.current_points -= reward.points_cost;
    // Spending points never grants tier credit.
    profile.xp_history.push(XpRecord {
        id: format!("xp_redeem_{}", Uuid::new_v4()),
        date: now,
        amount: reward.points_cost,
        kind: XpKind::Redeem,
        context: reward.title.clone(),
        location: "Rewards Catalog".to_string(),
        tier_eligible: false,
    });
    profile.vouchers.insert(
        0,
        UserVoucher {
            id: format!("v_{}", Uuid::new_v4()),
            reward_id: reward.id.clone(),
            title: reward.title.clone(),
            code: voucher_code(),
            redeemed_at: now,
            expires_at: now + Duration::days(rules.voucher_validity_days),
            is_used: false,
        },
    );

    Ok(refresh(profile, now, rules))
}

/// Flip a voucher to used, exactly once. Expiry is deliberately not
/// checked here: a cashier may still honor a voucher presented at the
/// counter; self-service checkout is where expiry gates.
pub fn apply_mark_used(
    mut profile: UserProfile,
    voucher_id: &str,
) -> Result<UserProfile, LoyaltyError> {
    let voucher = profile
        .vouchers
        .iter_mut()
        .find(|v| v.id == voucher_id)
        .ok_or(LoyaltyError::NotFound("voucher"))?;

    if voucher.is_used {
        return Err(LoyaltyError::AlreadyUsed);
    }
    voucher.is_used = true;
    Ok(profile)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutPayload<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    voucher_id: &'a str,
    code: &'a str,
    user_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    issued_at: OffsetDateTime,
    nonce: String,
}

/// Opaque payload the client renders as a QR code at the counter.
/// Unlike `apply_mark_used`, this path rejects expired vouchers.
pub fn checkout_payload(
    profile: &UserProfile,
    voucher_id: &str,
    now: OffsetDateTime,
) -> Result<String, LoyaltyError> {
    let voucher = profile
        .vouchers
        .iter()
        .find(|v| v.id == voucher_id)
        .ok_or(LoyaltyError::NotFound("voucher"))?;

    match voucher.status(now) {
        VoucherStatus::Used => Err(LoyaltyError::AlreadyUsed),
        VoucherStatus::Expired => Err(LoyaltyError::Expired),
        VoucherStatus::Active => {
            let payload = CheckoutPayload {
                kind: "GONGCHA_VOUCHER",
                voucher_id: &voucher.id,
                code: &voucher.code,
                user_id: profile.id,
                issued_at: now,
                nonce: nonce(),
            };
            Ok(serde_json::to_string(&payload)?)
        }
    }
}

fn voucher_code() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(5)
        .map(|b| (b as char).to_ascii_uppercase())
        .collect();
    format!("GC-{suffix}")
}

fn nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(10)
        .map(|b| (b as char).to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loyalty::catalog;
    use time::macros::datetime;

    const NOW: OffsetDateTime = datetime!(2026-06-01 12:00 UTC);

    fn rules() -> LoyaltyConfig {
        LoyaltyConfig {
            conversion_rate: 100,
            gold_threshold: 5_000,
            platinum_threshold: 15_000,
            xp_validity_days: 365,
            voucher_validity_days: 30,
        }
    }

    fn earn(amount: i64, age_days: i64) -> XpRecord {
        XpRecord {
            id: format!("xp_test_{amount}_{age_days}"),
            date: NOW - Duration::days(age_days),
            amount,
            kind: XpKind::Earn,
            context: "Drink Purchase".into(),
            location: "Gong Cha App".into(),
            tier_eligible: true,
        }
    }

    fn redeem_record(amount: i64, age_days: i64) -> XpRecord {
        XpRecord {
            id: format!("xp_redeem_test_{amount}_{age_days}"),
            date: NOW - Duration::days(age_days),
            amount,
            kind: XpKind::Redeem,
            context: "Free Milk Tea".into(),
            location: "Rewards Catalog".into(),
            tier_eligible: false,
        }
    }

    fn profile_with(points: i64, history: Vec<XpRecord>) -> UserProfile {
        UserProfile {
            id: Uuid::new_v4(),
            name: "Test Member".into(),
            phone_number: "8123456789".into(),
            email: Some("t@example.com".into()),
            current_points: points,
            lifetime_points: points,
            tier_xp: 0,
            tier: MemberTier::Silver,
            joined_date: NOW - Duration::days(400),
            xp_history: history,
            vouchers: Vec::new(),
        }
    }

    fn voucher(expires_in_days: i64, is_used: bool) -> UserVoucher {
        UserVoucher {
            id: "v_fixed".into(),
            reward_id: "r1".into(),
            title: "Free Milk Tea".into(),
            code: "GC-TESTX".into(),
            redeemed_at: NOW - Duration::days(1),
            expires_at: NOW + Duration::days(expires_in_days),
            is_used,
        }
    }

    #[test]
    fn empty_history_is_silver() {
        let status = evaluate(&[], NOW, &rules());
        assert_eq!(status.active_xp, 0);
        assert_eq!(status.tier, MemberTier::Silver);
        assert!(status.active_records.is_empty());
    }

    #[test]
    fn tier_thresholds_are_inclusive() {
        let r = rules();
        for (xp, expected) in [
            (4_999, MemberTier::Silver),
            (5_000, MemberTier::Gold),
            (14_999, MemberTier::Gold),
            (15_000, MemberTier::Platinum),
        ] {
            let status = evaluate(&[earn(xp, 10)], NOW, &r);
            assert_eq!(status.active_xp, xp);
            assert_eq!(status.tier, expected, "xp = {xp}");
        }
    }

    #[test]
    fn evaluate_is_deterministic() {
        let history = vec![earn(3_000, 5), earn(2_500, 100), redeem_record(500, 50)];
        let a = evaluate(&history, NOW, &rules());
        let b = evaluate(&history, NOW, &rules());
        assert_eq!(a, b);
    }

    #[test]
    fn expired_only_history_is_zero_and_silver() {
        let history = vec![earn(10_000, 400), earn(8_000, 366)];
        let status = evaluate(&history, NOW, &rules());
        assert_eq!(status.active_xp, 0);
        assert_eq!(status.tier, MemberTier::Silver);
        assert!(status.active_records.is_empty());
    }

    #[test]
    fn record_exactly_at_cutoff_is_excluded() {
        // strict > comparison against the cutoff
        let at_boundary = earn(6_000, 365);
        let just_inside = XpRecord {
            date: NOW - Duration::days(365) + Duration::seconds(1),
            ..earn(6_000, 0)
        };

        let status = evaluate(&[at_boundary], NOW, &rules());
        assert_eq!(status.active_xp, 0);

        let status = evaluate(&[just_inside], NOW, &rules());
        assert_eq!(status.active_xp, 6_000);
    }

    #[test]
    fn redeem_events_grant_no_tier_credit_but_stay_in_history() {
        let history = vec![earn(1_000, 10), redeem_record(500, 5)];
        let status = evaluate(&history, NOW, &rules());
        assert_eq!(status.active_xp, 1_000);
        assert_eq!(status.active_records.len(), 2);
    }

    #[test]
    fn ineligible_earn_grants_no_tier_credit() {
        let mut record = earn(2_000, 10);
        record.tier_eligible = false;
        let status = evaluate(&[record], NOW, &rules());
        assert_eq!(status.active_xp, 0);
    }

    #[test]
    fn negative_amounts_clamp_to_zero_per_record() {
        let history = vec![earn(-300, 10), earn(700, 10)];
        let status = evaluate(&history, NOW, &rules());
        assert_eq!(status.active_xp, 700);
    }

    #[test]
    fn earn_converts_at_fixed_rate_with_floor() {
        let profile = apply_earn(profile_with(0, Vec::new()), 5_000, NOW, &rules());
        assert_eq!(profile.current_points, 50);
        assert_eq!(profile.lifetime_points, 50);
        assert_eq!(profile.xp_history.len(), 1);

        let record = &profile.xp_history[0];
        assert_eq!(record.amount, 50);
        assert_eq!(record.kind, XpKind::Earn);
        assert!(record.tier_eligible);

        // 199 minor units floors to 1 point
        let profile = apply_earn(profile, 199, NOW, &rules());
        assert_eq!(profile.current_points, 51);
    }

    #[test]
    fn earn_prunes_aged_out_records_on_write() {
        let stale = earn(4_000, 400);
        let profile = apply_earn(profile_with(40, vec![stale]), 10_000, NOW, &rules());
        assert_eq!(profile.xp_history.len(), 1);
        assert_eq!(profile.tier_xp, 100);
        // the spendable balance is untouched by pruning
        assert_eq!(profile.current_points, 140);
    }

    #[test]
    fn earn_context_distinguishes_purchases_from_top_ups() {
        let profile = apply_earn(profile_with(0, Vec::new()), 50_000, NOW, &rules());
        assert_eq!(profile.xp_history[0].context, "Drink Purchase");

        let profile = apply_earn(profile_with(0, Vec::new()), 5_000, NOW, &rules());
        assert_eq!(profile.xp_history[0].context, "Admin Top Up");
    }

    #[test]
    fn redeem_with_exact_balance_succeeds() {
        let reward = catalog::find("r1").unwrap(); // 500 points
        let profile = apply_redeem(profile_with(500, Vec::new()), reward, NOW, &rules())
            .expect("redeem should succeed");

        assert_eq!(profile.current_points, 0);
        assert_eq!(profile.vouchers.len(), 1);

        let voucher = &profile.vouchers[0];
        assert!(!voucher.is_used);
        assert_eq!(voucher.reward_id, "r1");
        assert!(voucher.code.starts_with("GC-"));
        assert_eq!(voucher.code.len(), 8);
        assert_eq!(voucher.expires_at, NOW + Duration::days(30));

        let record = profile.xp_history.last().unwrap();
        assert_eq!(record.kind, XpKind::Redeem);
        assert!(!record.tier_eligible);
        assert_eq!(record.amount, 500);
    }

    #[test]
    fn redeem_below_cost_fails_and_leaves_profile_unchanged() {
        let reward = catalog::find("r1").unwrap(); // 500 points
        let before = profile_with(499, vec![earn(499, 10)]);
        let err = apply_redeem(before.clone(), reward, NOW, &rules()).unwrap_err();
        assert!(matches!(err, LoyaltyError::InsufficientBalance));
        // apply_* consumes its input; the caller's copy is what a
        // failed transition leaves visible
        assert_eq!(before.current_points, 499);
        assert_eq!(before.vouchers.len(), 0);
        assert_eq!(before.xp_history.len(), 1);
    }

    #[test]
    fn redeem_never_lifts_tier() {
        let reward = catalog::find("r2").unwrap(); // 200 points
        let profile = apply_redeem(profile_with(4_999, vec![earn(4_999, 10)]), reward, NOW, &rules())
            .expect("redeem should succeed");
        assert_eq!(profile.tier_xp, 4_999);
        assert_eq!(profile.tier, MemberTier::Silver);
    }

    #[test]
    fn mark_used_once_then_already_used() {
        let mut profile = profile_with(0, Vec::new());
        profile.vouchers.push(voucher(10, false));

        let profile = apply_mark_used(profile, "v_fixed").expect("first use should succeed");
        assert!(profile.vouchers[0].is_used);

        let err = apply_mark_used(profile, "v_fixed").unwrap_err();
        assert!(matches!(err, LoyaltyError::AlreadyUsed));
    }

    #[test]
    fn mark_used_unknown_voucher_is_not_found() {
        let err = apply_mark_used(profile_with(0, Vec::new()), "v_missing").unwrap_err();
        assert!(matches!(err, LoyaltyError::NotFound("voucher")));
    }

    #[test]
    fn mark_used_still_accepts_expired_vouchers() {
        let mut profile = profile_with(0, Vec::new());
        profile.vouchers.push(voucher(-5, false));
        let profile = apply_mark_used(profile, "v_fixed").expect("expired may still be honored");
        assert!(profile.vouchers[0].is_used);
    }

    #[test]
    fn checkout_rejects_used_and_expired() {
        let mut profile = profile_with(0, Vec::new());
        profile.vouchers.push(voucher(-5, false));
        let err = checkout_payload(&profile, "v_fixed", NOW).unwrap_err();
        assert!(matches!(err, LoyaltyError::Expired));

        profile.vouchers[0].expires_at = NOW + Duration::days(5);
        profile.vouchers[0].is_used = true;
        let err = checkout_payload(&profile, "v_fixed", NOW).unwrap_err();
        assert!(matches!(err, LoyaltyError::AlreadyUsed));

        let err = checkout_payload(&profile, "v_missing", NOW).unwrap_err();
        assert!(matches!(err, LoyaltyError::NotFound("voucher")));
    }

    #[test]
    fn checkout_payload_carries_voucher_identity_and_nonce() {
        let mut profile = profile_with(0, Vec::new());
        profile.vouchers.push(voucher(10, false));

        let payload = checkout_payload(&profile, "v_fixed", NOW).expect("active voucher");
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();

        assert_eq!(value["type"], "GONGCHA_VOUCHER");
        assert_eq!(value["voucherId"], "v_fixed");
        assert_eq!(value["code"], "GC-TESTX");
        assert_eq!(value["userId"], profile.id.to_string());
        assert_eq!(value["nonce"].as_str().unwrap().len(), 10);
        assert!(value["issuedAt"].as_str().unwrap().starts_with("2026-06-01"));
    }

    #[test]
    fn voucher_codes_are_prefixed_uppercase() {
        for _ in 0..20 {
            let code = voucher_code();
            let suffix = code.strip_prefix("GC-").expect("GC- prefix");
            assert_eq!(suffix.len(), 5);
            assert!(suffix
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
        }
    }
}
