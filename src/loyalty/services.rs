use crate::auth::repo::Member;
use crate::loyalty::catalog::{self, RewardItem};
use crate::loyalty::error::LoyaltyError;
use crate::loyalty::model::UserProfile;
use crate::loyalty::{ledger, repo};
use crate::state::AppState;
use time::OffsetDateTime;
use tracing::{debug, warn};
use uuid::Uuid;

const MAX_WRITE_ATTEMPTS: u32 = 3;

async fn member(state: &AppState, member_id: Uuid) -> Result<Member, LoyaltyError> {
    Member::find_by_id(&state.db, member_id)
        .await?
        .ok_or(LoyaltyError::NotFound("member"))
}

/// Seed an empty profile for a newly registered member. Idempotent;
/// the read path also bootstraps one on demand.
pub async fn init_profile(state: &AppState, member: &Member) -> Result<(), LoyaltyError> {
    let profile = UserProfile::fresh(member, OffsetDateTime::now_utc());
    repo::insert(&state.db, member.id, &profile).await
}

/// Load, normalize and project the member's profile. A missing
/// document yields a fresh zeroed profile, persisted immediately.
async fn load_with_version(
    state: &AppState,
    member_id: Uuid,
    now: OffsetDateTime,
) -> Result<(UserProfile, i64), LoyaltyError> {
    if let Some((raw, version)) = repo::fetch(&state.db, member_id).await? {
        let member = member(state, member_id).await?;
        let profile = ledger::refresh(raw.normalize(&member, now), now, &state.config.loyalty);
        return Ok((profile, version));
    }

    let member = member(state, member_id).await?;
    let profile = UserProfile::fresh(&member, now);
    repo::insert(&state.db, member_id, &profile).await?;
    debug!(%member_id, "bootstrapped loyalty profile");
    Ok((profile, 1))
}

pub async fn get_profile(
    state: &AppState,
    member_id: Uuid,
    now: OffsetDateTime,
) -> Result<UserProfile, LoyaltyError> {
    Ok(load_with_version(state, member_id, now).await?.0)
}

/// Read-modify-write with an optimistic version guard. A lost race
/// re-reads and re-applies the transition; after `MAX_WRITE_ATTEMPTS`
/// the caller gets `Conflict`.
async fn mutate<F>(
    state: &AppState,
    member_id: Uuid,
    now: OffsetDateTime,
    op: F,
) -> Result<UserProfile, LoyaltyError>
where
    F: Fn(UserProfile) -> Result<UserProfile, LoyaltyError>,
{
    for attempt in 1..=MAX_WRITE_ATTEMPTS {
        let (profile, version) = load_with_version(state, member_id, now).await?;
        let next = op(profile)?;
        if repo::update_guarded(&state.db, member_id, &next, version).await? {
            return Ok(next);
        }
        warn!(%member_id, attempt, "profile version conflict, retrying");
    }
    Err(LoyaltyError::Conflict)
}

pub async fn add_earn(
    state: &AppState,
    member_id: Uuid,
    amount_minor: u64,
    now: OffsetDateTime,
) -> Result<UserProfile, LoyaltyError> {
    let rules = state.config.loyalty.clone();
    mutate(state, member_id, now, move |profile| {
        Ok(ledger::apply_earn(profile, amount_minor, now, &rules))
    })
    .await
}

pub async fn redeem(
    state: &AppState,
    member_id: Uuid,
    reward_id: &str,
    now: OffsetDateTime,
) -> Result<UserProfile, LoyaltyError> {
    let reward = catalog::find(reward_id).ok_or(LoyaltyError::NotFound("reward"))?;
    let rules = state.config.loyalty.clone();
    mutate(state, member_id, now, move |profile| {
        ledger::apply_redeem(profile, reward, now, &rules)
    })
    .await
}

pub async fn mark_used(
    state: &AppState,
    member_id: Uuid,
    voucher_id: &str,
    now: OffsetDateTime,
) -> Result<UserProfile, LoyaltyError> {
    mutate(state, member_id, now, move |profile| {
        ledger::apply_mark_used(profile, voucher_id)
    })
    .await
}

pub async fn checkout_payload(
    state: &AppState,
    member_id: Uuid,
    voucher_id: &str,
    now: OffsetDateTime,
) -> Result<String, LoyaltyError> {
    let (profile, _) = load_with_version(state, member_id, now).await?;
    ledger::checkout_payload(&profile, voucher_id, now)
}

pub async fn reset(state: &AppState, member_id: Uuid) -> Result<(), LoyaltyError> {
    repo::delete(&state.db, member_id).await
}

pub fn rewards() -> &'static [RewardItem] {
    catalog::all()
}
