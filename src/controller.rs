//! Fees controller - decides which pending rewards to show, when to warn
//! about stale claims, and gates reward withdrawals

use anyhow::Result;
use async_trait::async_trait;
use indexmap::IndexMap;

use crate::darknode_id::DarknodeId;
use crate::details::{CycleState, DarknodeDetails, DarknodeFeeStatus, RegistrationStatus};
use crate::models::PendingRewards;
use crate::pending::merge_fees;

/// How long a previous-cycle claim may stay outstanding after the epoch
/// rolled over before the operator is warned (5 hours)
pub const CLAIM_WARNING_THRESHOLD: i64 = 5 * 3600;

/// Side-effecting operations the controller delegates to the network
#[async_trait]
pub trait DarknodeNetwork {
    /// Withdraw `token_symbol` rewards for `darknodes` from the payment contract
    async fn withdraw_reward(
        &self,
        darknodes: &[DarknodeId],
        token_symbol: &str,
        token_address: &str,
    ) -> Result<()>;

    /// Re-read the darknode's details after a state change
    async fn update_darknode_details(&self, darknode: &DarknodeId) -> Result<DarknodeDetails>;
}

/// Result of a withdraw request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WithdrawOutcome {
    Submitted,
    /// No darknode details are loaded
    NoDarknode,
    /// A withdrawal already went out for the current cycle status
    Disabled,
}

pub struct FeesController<N> {
    network: N,
    details: Option<DarknodeDetails>,
    claim_warning_shown: bool,
    disable_claim: bool,
    current_cycle_status: Option<String>,
}

impl<N: DarknodeNetwork> FeesController<N> {
    pub fn new(network: N) -> Self {
        Self {
            network,
            details: None,
            claim_warning_shown: false,
            disable_claim: false,
            current_cycle_status: None,
        }
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    /// Replace the darknode details. Re-enables withdrawals once the first
    /// cycle of the claim status moved on.
    pub fn set_details(&mut self, details: DarknodeDetails) {
        let cycle_status = details.cycle_status.keys().next().cloned();
        if self.disable_claim && cycle_status != self.current_cycle_status {
            tracing::debug!("Cycle status changed, withdrawals re-enabled");
            self.disable_claim = false;
        }
        self.current_cycle_status = cycle_status;
        self.details = Some(details);
    }

    fn status_of(&self, cycle: Option<&str>) -> Option<DarknodeFeeStatus> {
        let cycle = cycle?;
        self.details.as_ref()?.cycle_status.get(cycle).copied()
    }

    /// Previous cycle is unclaimed, unless the subgraph is lagging
    pub fn show_previous_pending(&self, cycles: &CycleState) -> bool {
        self.status_of(cycles.previous_cycle.as_deref()) == Some(DarknodeFeeStatus::NotClaimed)
            && !cycles.subgraph_out_of_sync
    }

    pub fn show_current_pending(&self, cycles: &CycleState) -> bool {
        self.status_of(cycles.current_cycle.as_deref()) == Some(DarknodeFeeStatus::NotClaimed)
    }

    /// Pending rewards to surface: previous cycle, current cycle, or both merged
    pub fn pending_rewards(
        &self,
        cycles: &CycleState,
        by_cycle: &IndexMap<String, PendingRewards>,
    ) -> PendingRewards {
        let lookup = |cycle: Option<&String>| {
            cycle
                .and_then(|c| by_cycle.get(c))
                .cloned()
                .unwrap_or_default()
        };

        let previous = self.show_previous_pending(cycles);
        let current = self.show_current_pending(cycles);

        match (previous, current) {
            (true, true) => merge_fees(
                &lookup(cycles.previous_cycle.as_ref()),
                &lookup(cycles.current_cycle.as_ref()),
            ),
            (true, false) => lookup(cycles.previous_cycle.as_ref()),
            (false, true) => lookup(cycles.current_cycle.as_ref()),
            (false, false) => PendingRewards::new(),
        }
    }

    /// True the first time the previous cycle has been left unclaimed for
    /// longer than `CLAIM_WARNING_THRESHOLD`; false afterwards.
    pub fn check_claim_warning(&mut self, cycles: &CycleState) -> bool {
        if self.claim_warning_shown || !self.show_previous_pending(cycles) {
            return false;
        }
        match cycles.time_since_last_epoch {
            Some(elapsed) if elapsed > CLAIM_WARNING_THRESHOLD => {
                self.claim_warning_shown = true;
                true
            }
            _ => false,
        }
    }

    pub fn earning_fees(&self) -> bool {
        matches!(
            self.details.as_ref().map(|d| d.registration_status),
            Some(RegistrationStatus::Registered | RegistrationStatus::DeregistrationPending)
        )
    }

    pub fn withdrawable(&self) -> Option<&PendingRewards> {
        self.details.as_ref().map(|d| &d.fees_earned)
    }

    /// Withdraw one token's rewards and refresh the darknode details
    pub async fn withdraw(
        &mut self,
        token_symbol: &str,
        token_address: &str,
    ) -> Result<WithdrawOutcome> {
        let Some(id) = self.details.as_ref().map(|d| d.id) else {
            return Ok(WithdrawOutcome::NoDarknode);
        };
        if self.disable_claim {
            tracing::warn!("Withdrawal for {} skipped until the cycle status changes", id);
            return Ok(WithdrawOutcome::Disabled);
        }

        self.disable_claim = true;
        tracing::info!("Withdrawing {} rewards for {}", token_symbol, id);

        if let Err(e) = self
            .network
            .withdraw_reward(&[id], token_symbol, token_address)
            .await
        {
            self.disable_claim = false;
            return Err(e);
        }

        let refreshed = self.network.update_darknode_details(&id).await?;
        self.set_details(refreshed);
        Ok(WithdrawOutcome::Submitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AssetInfo, TokenAmount};
    use bigdecimal::BigDecimal;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct MockNetwork {
        withdrawals: Arc<Mutex<Vec<(String, String)>>>,
        next_details: Arc<Mutex<Option<DarknodeDetails>>>,
        fail: bool,
    }

    #[async_trait]
    impl DarknodeNetwork for MockNetwork {
        async fn withdraw_reward(
            &self,
            _darknodes: &[DarknodeId],
            token_symbol: &str,
            token_address: &str,
        ) -> Result<()> {
            if self.fail {
                anyhow::bail!("transaction reverted");
            }
            self.withdrawals
                .lock()
                .unwrap()
                .push((token_symbol.to_string(), token_address.to_string()));
            Ok(())
        }

        async fn update_darknode_details(&self, _darknode: &DarknodeId) -> Result<DarknodeDetails> {
            self.next_details
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| anyhow::anyhow!("no details"))
        }
    }

    fn details(statuses: &[(&str, DarknodeFeeStatus)]) -> DarknodeDetails {
        DarknodeDetails {
            id: DarknodeId::from_bytes(&[1u8; 20]).unwrap(),
            registration_status: RegistrationStatus::Registered,
            cycle_status: statuses
                .iter()
                .map(|(c, s)| (c.to_string(), *s))
                .collect(),
            fees_earned: PendingRewards::new(),
        }
    }

    fn cycles(elapsed: i64, out_of_sync: bool) -> CycleState {
        CycleState {
            current_cycle: Some("8".into()),
            previous_cycle: Some("7".into()),
            time_since_last_epoch: Some(elapsed),
            subgraph_out_of_sync: out_of_sync,
        }
    }

    fn reward(symbol: &str, amount: i64) -> Option<TokenAmount> {
        Some(TokenAmount {
            symbol: symbol.to_string(),
            asset: AssetInfo { decimals: 8 },
            amount: BigDecimal::from(amount),
            amount_in_eth: BigDecimal::from(0),
            amount_in_usd: BigDecimal::from(amount),
        })
    }

    fn by_cycle() -> IndexMap<String, PendingRewards> {
        let mut map = IndexMap::new();
        map.insert(
            "7".to_string(),
            PendingRewards::from([("BTC".to_string(), reward("BTC", 10))]),
        );
        map.insert(
            "8".to_string(),
            PendingRewards::from([
                ("BTC".to_string(), reward("BTC", 5)),
                ("ZEC".to_string(), reward("ZEC", 3)),
            ]),
        );
        map
    }

    #[test]
    fn test_pending_selection() {
        use DarknodeFeeStatus::*;
        let mut controller = FeesController::new(MockNetwork::default());

        controller.set_details(details(&[("8", NotClaimed), ("7", NotClaimed)]));
        let merged = controller.pending_rewards(&cycles(0, false), &by_cycle());
        assert_eq!(merged["BTC"].as_ref().unwrap().amount, BigDecimal::from(15));
        assert_eq!(merged["ZEC"].as_ref().unwrap().amount, BigDecimal::from(3));

        controller.set_details(details(&[("8", Claimed), ("7", NotClaimed)]));
        let previous = controller.pending_rewards(&cycles(0, false), &by_cycle());
        assert_eq!(previous["BTC"].as_ref().unwrap().amount, BigDecimal::from(10));
        assert!(!previous.contains_key("ZEC"));

        controller.set_details(details(&[("8", NotClaimed), ("7", Claimed)]));
        let current = controller.pending_rewards(&cycles(0, false), &by_cycle());
        assert_eq!(current["BTC"].as_ref().unwrap().amount, BigDecimal::from(5));

        controller.set_details(details(&[("8", Claimed), ("7", Claimed)]));
        assert!(controller
            .pending_rewards(&cycles(0, false), &by_cycle())
            .is_empty());
    }

    #[test]
    fn test_out_of_sync_subgraph_hides_previous_cycle() {
        use DarknodeFeeStatus::*;
        let mut controller = FeesController::new(MockNetwork::default());
        controller.set_details(details(&[("8", NotClaimed), ("7", NotClaimed)]));

        assert!(!controller.show_previous_pending(&cycles(0, true)));
        let pending = controller.pending_rewards(&cycles(0, true), &by_cycle());
        assert_eq!(pending["BTC"].as_ref().unwrap().amount, BigDecimal::from(5));
    }

    #[test]
    fn test_claim_warning_fires_once_after_threshold() {
        use DarknodeFeeStatus::*;
        let mut controller = FeesController::new(MockNetwork::default());
        controller.set_details(details(&[("8", Claimed), ("7", NotClaimed)]));

        assert!(!controller.check_claim_warning(&cycles(CLAIM_WARNING_THRESHOLD, false)));
        assert!(controller.check_claim_warning(&cycles(CLAIM_WARNING_THRESHOLD + 1, false)));
        assert!(!controller.check_claim_warning(&cycles(CLAIM_WARNING_THRESHOLD + 60, false)));
    }

    #[test]
    fn test_no_claim_warning_when_previous_claimed() {
        use DarknodeFeeStatus::*;
        let mut controller = FeesController::new(MockNetwork::default());
        controller.set_details(details(&[("8", NotClaimed), ("7", Claimed)]));
        assert!(!controller.check_claim_warning(&cycles(10 * 3600, false)));
    }

    #[test]
    fn test_earning_fees() {
        let mut controller = FeesController::new(MockNetwork::default());
        assert!(!controller.earning_fees());

        let mut d = details(&[]);
        d.registration_status = RegistrationStatus::DeregistrationPending;
        controller.set_details(d);
        assert!(controller.earning_fees());
    }

    #[tokio::test]
    async fn test_withdraw_without_details_is_noop() {
        let network = MockNetwork::default();
        let mut controller = FeesController::new(network.clone());
        let outcome = controller.withdraw("BTC", "0xabc").await.unwrap();
        assert_eq!(outcome, WithdrawOutcome::NoDarknode);
        assert!(network.withdrawals.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_withdraw_is_gated_until_cycle_changes() {
        use DarknodeFeeStatus::*;
        let network = MockNetwork::default();
        *network.next_details.lock().unwrap() = Some(details(&[("8", NotClaimed)]));

        let mut controller = FeesController::new(network.clone());
        controller.set_details(details(&[("8", NotClaimed)]));

        assert_eq!(
            controller.withdraw("BTC", "0xabc").await.unwrap(),
            WithdrawOutcome::Submitted
        );
        assert_eq!(
            controller.withdraw("BTC", "0xabc").await.unwrap(),
            WithdrawOutcome::Disabled
        );
        assert_eq!(network.withdrawals.lock().unwrap().len(), 1);

        controller.set_details(details(&[("9", NotClaimed), ("8", Claimed)]));
        assert_eq!(
            controller.withdraw("ZEC", "0xdef").await.unwrap(),
            WithdrawOutcome::Submitted
        );
        assert_eq!(network.withdrawals.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_withdraw_reopens_gate() {
        let network = MockNetwork {
            fail: true,
            ..MockNetwork::default()
        };
        let mut controller = FeesController::new(network);
        controller.set_details(details(&[("8", DarknodeFeeStatus::NotClaimed)]));

        assert!(controller.withdraw("BTC", "0xabc").await.is_err());
        // Not gated: the second attempt reaches the network again
        assert!(controller.withdraw("BTC", "0xabc").await.is_err());
    }
}
