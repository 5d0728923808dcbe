use crate::auth::repo::Member;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MemberTier {
    Silver,
    Gold,
    Platinum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum XpKind {
    Earn,
    Redeem,
}

/// One ledger entry, all fields resolved. The ledger is append-only;
/// entries are never mutated, only pruned once they age out of the
/// validity window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XpRecord {
    pub id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub amount: i64,
    #[serde(rename = "type")]
    pub kind: XpKind,
    pub context: String,
    pub location: String,
    pub tier_eligible: bool,
}

/// Ledger entry as stored. Documents written by early app versions
/// predate `type`, `tierEligible`, `context` and `location`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawXpRecord {
    pub id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub amount: i64,
    #[serde(rename = "type", default)]
    pub kind: Option<XpKind>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub tier_eligible: Option<bool>,
}

impl RawXpRecord {
    /// Migrate a legacy entry into the strict shape. Missing `type`
    /// means earn; missing `tierEligible` follows the kind (earns
    /// count toward tier, redeems never do).
    pub fn normalize(self) -> XpRecord {
        let kind = self.kind.unwrap_or(XpKind::Earn);
        XpRecord {
            context: self.context.unwrap_or_else(|| {
                match kind {
                    XpKind::Redeem => "Reward Redeem",
                    XpKind::Earn => "Drink Purchase",
                }
                .to_string()
            }),
            location: self.location.unwrap_or_else(|| "Gong Cha App".to_string()),
            tier_eligible: self.tier_eligible.unwrap_or(kind == XpKind::Earn),
            id: self.id,
            date: self.date,
            amount: self.amount,
            kind,
        }
    }
}

/// Derived at read time, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VoucherStatus {
    Active,
    Used,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserVoucher {
    pub id: String,
    pub reward_id: String,
    pub title: String,
    pub code: String,
    #[serde(with = "time::serde::rfc3339")]
    pub redeemed_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    pub is_used: bool,
}

impl UserVoucher {
    pub fn status(&self, now: OffsetDateTime) -> VoucherStatus {
        if self.is_used {
            VoucherStatus::Used
        } else if now > self.expires_at {
            VoucherStatus::Expired
        } else {
            VoucherStatus::Active
        }
    }
}

/// Member profile document. `tier_xp` and `tier` are projections of
/// `xp_history` plus the current time; they are written back for
/// document compatibility but recomputed on every read and write and
/// never trusted from storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub phone_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub current_points: i64,
    pub lifetime_points: i64,
    pub tier_xp: i64,
    pub tier: MemberTier,
    #[serde(with = "time::serde::rfc3339")]
    pub joined_date: OffsetDateTime,
    pub xp_history: Vec<XpRecord>,
    pub vouchers: Vec<UserVoucher>,
}

impl UserProfile {
    pub fn fresh(member: &Member, now: OffsetDateTime) -> Self {
        Self {
            id: member.id,
            name: member.name.clone(),
            phone_number: member.phone_number.clone(),
            email: Some(member.email.clone()),
            current_points: 0,
            lifetime_points: 0,
            tier_xp: 0,
            tier: MemberTier::Silver,
            joined_date: now,
            xp_history: Vec::new(),
            vouchers: Vec::new(),
        }
    }
}

/// Profile document as stored; tolerant of fields missing from legacy
/// documents. Stored `tierXp`/`tier` are deliberately not read.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawUserProfile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub current_points: i64,
    #[serde(default)]
    pub lifetime_points: Option<i64>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub joined_date: Option<OffsetDateTime>,
    #[serde(default)]
    pub xp_history: Vec<RawXpRecord>,
    #[serde(default)]
    pub vouchers: Vec<UserVoucher>,
}

impl RawUserProfile {
    /// Resolve a stored document against the authenticated member
    /// account. The tier projection comes out zeroed; callers run the
    /// ledger evaluator right after.
    pub fn normalize(self, member: &Member, now: OffsetDateTime) -> UserProfile {
        let lifetime_points = self.lifetime_points.unwrap_or(self.current_points);
        UserProfile {
            id: member.id,
            name: self.name.unwrap_or_else(|| member.name.clone()),
            phone_number: self.phone_number.unwrap_or_else(|| member.phone_number.clone()),
            email: self.email.or_else(|| Some(member.email.clone())),
            current_points: self.current_points,
            lifetime_points,
            tier_xp: 0,
            tier: MemberTier::Silver,
            joined_date: self.joined_date.unwrap_or(now),
            xp_history: self.xp_history.into_iter().map(RawXpRecord::normalize).collect(),
            vouchers: self.vouchers,
        }
    }
}
