//! Deal domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DealStage {
    Prospecting,
    Qualification,
    Proposal,
    Negotiation,
    ClosedWon,
    ClosedLost,
}

impl DealStage {
    pub fn is_closed(self) -> bool {
        matches!(self, DealStage::ClosedWon | DealStage::ClosedLost)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Deal {
    pub id: Uuid,
    pub team_id: Uuid,
    pub company_id: Option<Uuid>,
    pub contact_id: Option<Uuid>,
    pub title: String,
    /// Deal value in minor currency units.
    pub amount_cents: i64,
    /// ISO 4217 code, e.g. `EUR`.
    pub currency: String,
    pub stage: DealStage,
    pub expected_close_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDeal {
    pub company_id: Option<Uuid>,
    pub contact_id: Option<Uuid>,
    pub title: String,
    pub amount_cents: i64,
    pub currency: String,
    pub stage: DealStage,
    pub expected_close_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateDeal {
    pub company_id: Option<Option<Uuid>>,
    pub contact_id: Option<Option<Uuid>>,
    pub title: Option<String>,
    pub amount_cents: Option<i64>,
    pub currency: Option<String>,
    pub stage: Option<DealStage>,
    pub expected_close_at: Option<Option<DateTime<Utc>>>,
}
