use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::loyalty::model::{MemberTier, UserProfile, VoucherStatus, XpRecord};

/// Body for POST /loyalty/earn; amount in minor currency units.
#[derive(Debug, Deserialize)]
pub struct EarnRequest {
    pub amount: u64,
}

/// Body for POST /loyalty/redeem.
#[derive(Debug, Deserialize)]
pub struct RedeemRequest {
    pub reward_id: String,
}

/// Voucher as shown to the client: stored fields plus the status
/// derived at read time.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherView {
    pub id: String,
    pub reward_id: String,
    pub title: String,
    pub code: String,
    #[serde(with = "time::serde::rfc3339")]
    pub redeemed_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    pub is_used: bool,
    pub status: VoucherStatus,
}

/// The mobile client reads the profile in document shape (camelCase),
/// so the response mirrors it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: Uuid,
    pub name: String,
    pub phone_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub current_points: i64,
    pub lifetime_points: i64,
    pub tier_xp: i64,
    pub tier: MemberTier,
    #[serde(with = "time::serde::rfc3339")]
    pub joined_date: OffsetDateTime,
    pub xp_history: Vec<XpRecord>,
    pub vouchers: Vec<VoucherView>,
}

impl ProfileResponse {
    pub fn new(profile: UserProfile, now: OffsetDateTime) -> Self {
        let vouchers = profile
            .vouchers
            .into_iter()
            .map(|v| {
                let status = v.status(now);
                VoucherView {
                    id: v.id,
                    reward_id: v.reward_id,
                    title: v.title,
                    code: v.code,
                    redeemed_at: v.redeemed_at,
                    expires_at: v.expires_at,
                    is_used: v.is_used,
                    status,
                }
            })
            .collect();

        Self {
            id: profile.id,
            name: profile.name,
            phone_number: profile.phone_number,
            email: profile.email,
            current_points: profile.current_points,
            lifetime_points: profile.lifetime_points,
            tier_xp: profile.tier_xp,
            tier: profile.tier,
            joined_date: profile.joined_date,
            xp_history: profile.xp_history,
            vouchers,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub payload: String,
}
