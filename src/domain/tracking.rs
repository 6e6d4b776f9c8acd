//! Shipment tracking derived from the time elapsed since an order shipped.
//!
//! Nothing here is persisted: the status is recomputed on every read from the
//! shipment instant and the caller's notion of "now".

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingStatus {
    Pending,
    Embalado,
    EmTransito,
    Fiscalizacao,
    Entregue,
}

/// Day offset (from shipment) at which each shipped stage begins.
const STAGES: [(i64, TrackingStatus); 4] = [
    (0, TrackingStatus::Embalado),
    (3, TrackingStatus::EmTransito),
    (6, TrackingStatus::Fiscalizacao),
    (10, TrackingStatus::Entregue),
];

impl TrackingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TrackingStatus::Pending => "pending",
            TrackingStatus::Embalado => "embalado",
            TrackingStatus::EmTransito => "em_transito",
            TrackingStatus::Fiscalizacao => "fiscalizacao",
            TrackingStatus::Entregue => "entregue",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TrackingStatus::Pending => "Aguardando envio",
            TrackingStatus::Embalado => "Pedido embalado",
            TrackingStatus::EmTransito => "Em trânsito",
            TrackingStatus::Fiscalizacao => "Em fiscalização",
            TrackingStatus::Entregue => "Entregue",
        }
    }
}

impl std::fmt::Display for TrackingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps whole days elapsed since `shipped_at` onto a shipment stage.
///
/// Elapsed time before the shipment instant (clock skew) counts as day 0.
pub fn derive_status(shipped_at: DateTime<Utc>, now: DateTime<Utc>) -> TrackingStatus {
    let days = (now - shipped_at).num_days().max(0);
    STAGES
        .iter()
        .rev()
        .find(|(start, _)| days >= *start)
        .map(|(_, status)| *status)
        .unwrap_or(TrackingStatus::Embalado)
}

/// Like [`derive_status`], but yields `Pending` for orders that never shipped.
pub fn tracking_status(shipped_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> TrackingStatus {
    match shipped_at {
        Some(shipped_at) => derive_status(shipped_at, now),
        None => TrackingStatus::Pending,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Milestone {
    pub status: TrackingStatus,
    pub starts_at: DateTime<Utc>,
    pub reached: bool,
}

/// The shipped stages in order, each with the instant it begins.
pub fn milestones(shipped_at: DateTime<Utc>, now: DateTime<Utc>) -> Vec<Milestone> {
    let current = derive_status(shipped_at, now);
    STAGES
        .iter()
        .map(|(offset, status)| Milestone {
            status: *status,
            starts_at: shipped_at + Duration::days(*offset),
            reached: *status <= current,
        })
        .collect()
}
