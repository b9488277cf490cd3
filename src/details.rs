//! Darknode details assembled from RenVM block state and chain reads

use indexmap::IndexMap;
use serde::Serialize;

use crate::darknode_id::DarknodeId;
use crate::fees;
use crate::models::{BlockState, PendingRewards};
use crate::pending::TrackedAsset;

/// Claim status of one darknode for one cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DarknodeFeeStatus {
    NotClaimed,
    Claimed,
    Ineligible,
}

impl std::fmt::Display for DarknodeFeeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DarknodeFeeStatus::NotClaimed => write!(f, "not claimed"),
            DarknodeFeeStatus::Claimed => write!(f, "claimed"),
            DarknodeFeeStatus::Ineligible => write!(f, "ineligible"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RegistrationStatus {
    Unregistered,
    Registered,
    DeregistrationPending,
}

impl std::fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistrationStatus::Unregistered => write!(f, "Unregistered"),
            RegistrationStatus::Registered => write!(f, "Registered"),
            RegistrationStatus::DeregistrationPending => write!(f, "Deregistration pending"),
        }
    }
}

/// Network-wide cycle information
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleState {
    pub current_cycle: Option<String>,
    pub previous_cycle: Option<String>,
    /// Seconds since the current epoch started
    pub time_since_last_epoch: Option<i64>,
    /// The subgraph is behind the chain head and may report stale claims
    pub subgraph_out_of_sync: bool,
}

impl CycleState {
    pub fn from_block_state(state: &BlockState, now: i64, subgraph_out_of_sync: bool) -> Self {
        let epoch = state.state.v.system.as_ref().and_then(|s| s.epoch.as_ref());
        match epoch {
            Some(epoch) => Self {
                current_cycle: Some(epoch.number.to_string()),
                previous_cycle: epoch.number.checked_sub(1).map(|n| n.to_string()),
                time_since_last_epoch: Some((now - epoch.timestamp).max(0)),
                subgraph_out_of_sync,
            },
            None => Self {
                subgraph_out_of_sync,
                ..Self::default()
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DarknodeDetails {
    #[serde(serialize_with = "serialize_id")]
    pub id: DarknodeId,
    pub registration_status: RegistrationStatus,
    /// Cycle -> claim status, current cycle first
    pub cycle_status: IndexMap<String, DarknodeFeeStatus>,
    /// Withdrawable balances held by the payment contract
    pub fees_earned: PendingRewards,
}

fn serialize_id<S>(id: &DarknodeId, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&id.to_base58())
}

fn claim_status(
    renvm_id: &str,
    cycle: &str,
    entered_at: Option<u64>,
    assets: &[TrackedAsset],
    state: &BlockState,
) -> DarknodeFeeStatus {
    let Ok(cycle_number) = cycle.parse::<u64>() else {
        return DarknodeFeeStatus::Ineligible;
    };
    match entered_at {
        Some(entered) if entered <= cycle_number => {}
        _ => return DarknodeFeeStatus::Ineligible,
    }

    let unclaimed = assets
        .iter()
        .filter(|asset| fees::get_fees_for_asset(&asset.symbol, state).is_some())
        .any(|asset| {
            fees::get_last_epoch_claimed(renvm_id, &asset.symbol, state)
                .map_or(true, |claimed| claimed < cycle_number)
        });

    if unclaimed {
        DarknodeFeeStatus::NotClaimed
    } else {
        DarknodeFeeStatus::Claimed
    }
}

/// Claim status for the current and previous cycle, current first
pub fn cycle_status_from_block_state(
    id: &DarknodeId,
    cycles: &CycleState,
    assets: &[TrackedAsset],
    state: &BlockState,
) -> IndexMap<String, DarknodeFeeStatus> {
    let renvm_id = id.to_renvm_id();
    let entered_at = fees::get_node_entered_at(&renvm_id, state);

    [cycles.current_cycle.as_deref(), cycles.previous_cycle.as_deref()]
        .into_iter()
        .flatten()
        .map(|cycle| {
            (
                cycle.to_string(),
                claim_status(&renvm_id, cycle, entered_at, assets, state),
            )
        })
        .collect()
}

pub fn build_darknode_details(
    id: DarknodeId,
    state: &BlockState,
    cycles: &CycleState,
    assets: &[TrackedAsset],
    fees_earned: PendingRewards,
    pending_deregistration: bool,
) -> DarknodeDetails {
    let entered_at = fees::get_node_entered_at(&id.to_renvm_id(), state);
    let registration_status = match (entered_at, pending_deregistration) {
        (Some(_), true) => RegistrationStatus::DeregistrationPending,
        (Some(_), false) => RegistrationStatus::Registered,
        (None, _) => RegistrationStatus::Unregistered,
    };

    DarknodeDetails {
        id,
        registration_status,
        cycle_status: cycle_status_from_block_state(&id, cycles, assets, state),
        fees_earned,
    }
}
