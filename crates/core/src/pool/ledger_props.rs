//! Property-based tests for PoolLedger.
//!
//! - Conservation: aggregates always match the account records and custody
//!   always covers what is owed
//! - Proportionality: each share is `floor(R * s / T)` and shares never
//!   exceed the injection
//! - Atomicity: a rejected operation changes nothing
//! - Restake and withdrawal move exactly what the account held

use proptest::prelude::*;
use stakepool_shared::{MIN_UNIT, ParticipantId, Wei};

use super::access::Role;
use super::error::PoolError;
use super::ledger::PoolLedger;
use super::transport::InMemoryTransport;
use super::types::{Account, PoolSnapshot};

const USERS: usize = 4;

#[derive(Debug, Clone)]
enum Op {
    Deposit(usize, u128),
    Reward(bool, u128),
    WithdrawPool(usize),
    WithdrawRewards(usize),
    Restake(usize),
    Receive(u128),
}

/// Amounts straddle the threshold so guards are exercised.
fn amount() -> impl Strategy<Value = u128> {
    prop_oneof![
        0u128..=20_000,
        20_000u128..10_000_000_000,
    ]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..USERS, amount()).prop_map(|(u, v)| Op::Deposit(u, v)),
        2 => (any::<bool>(), amount()).prop_map(|(privileged, v)| Op::Reward(privileged, v)),
        1 => (0..USERS).prop_map(Op::WithdrawPool),
        1 => (0..USERS).prop_map(Op::WithdrawRewards),
        1 => (0..USERS).prop_map(Op::Restake),
        1 => (0u128..1_000_000).prop_map(Op::Receive),
    ]
}

struct Harness {
    ledger: PoolLedger,
    transport: InMemoryTransport,
    depositor: ParticipantId,
    users: Vec<ParticipantId>,
    /// Value that entered custody minus value paid out.
    net_inflow: u128,
}

impl Harness {
    fn new() -> Self {
        Self {
            ledger: PoolLedger::default(),
            transport: InMemoryTransport::new(),
            depositor: ParticipantId::new(),
            users: (0..USERS).map(|_| ParticipantId::new()).collect(),
            net_inflow: 0,
        }
    }

    fn apply(&mut self, op: &Op) -> Result<(), PoolError> {
        let depositor = self.depositor;
        let roles = move |who: &ParticipantId, _role: Role| *who == depositor;

        match *op {
            Op::Deposit(u, v) => {
                self.ledger.deposit_pool(self.users[u], Wei::new(v))?;
                self.net_inflow += v;
            }
            Op::Reward(privileged, v) => {
                let caller = if privileged { depositor } else { self.users[0] };
                self.ledger.deposit_rewards(&roles, caller, Wei::new(v))?;
                self.net_inflow += v;
            }
            Op::WithdrawPool(u) => {
                let paid = self.ledger.withdraw_pool(&mut self.transport, self.users[u])?;
                self.net_inflow -= paid.get();
            }
            Op::WithdrawRewards(u) => {
                let paid = self
                    .ledger
                    .withdraw_rewards(&mut self.transport, self.users[u])?;
                self.net_inflow -= paid.get();
            }
            Op::Restake(u) => {
                self.ledger.restake_rewards(self.users[u])?;
            }
            Op::Receive(v) => {
                self.ledger.receive(Wei::new(v))?;
                self.net_inflow += v;
            }
        }
        Ok(())
    }

    fn state(&self) -> (PoolSnapshot, Vec<Account>) {
        (
            self.ledger.snapshot(),
            self.users.iter().map(|u| self.ledger.account(u)).collect(),
        )
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// *For any* sequence of operations, `total_stake` equals the sum of
    /// stakes, `active_user_count` equals the number of staked accounts and
    /// custody equals net inflow while covering stake plus reward.
    #[test]
    fn prop_conservation(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let mut h = Harness::new();

        for op in &ops {
            let _ = h.apply(op);

            let stake_sum: u128 = h.users.iter().map(|u| h.ledger.stake_of(u).get()).sum();
            let reward_sum: u128 = h.users.iter().map(|u| h.ledger.reward_of(u).get()).sum();
            let staked = h.users.iter().filter(|u| h.ledger.is_active(u)).count() as u64;
            let custody = h.ledger.custody_balance().get();

            prop_assert_eq!(h.ledger.total_stake().get(), stake_sum);
            prop_assert_eq!(h.ledger.active_user_count(), staked);
            prop_assert_eq!(custody, h.net_inflow);
            prop_assert!(custody >= stake_sum + reward_sum);
            prop_assert_eq!(
                h.ledger.surplus().get(),
                custody - stake_sum - reward_sum
            );
        }

        let paid: u128 = h.users.iter().map(|u| h.transport.balance_of(u).get()).sum();
        let payouts: u128 = h.transport.payouts().iter().map(|(_, w)| w.get()).sum();
        prop_assert_eq!(paid, payouts);
    }

    /// *For any* rejected operation, the pool and every account are unchanged.
    #[test]
    fn prop_rejected_operations_change_nothing(
        ops in prop::collection::vec(op_strategy(), 1..60),
    ) {
        let mut h = Harness::new();

        for op in &ops {
            let before = h.state();
            if h.apply(op).is_err() {
                prop_assert_eq!(h.state(), before, "rejected {:?} mutated state", op);
            }
        }
    }

    /// *For any* stakes and injected reward, account `i` receives
    /// `floor(R * s_i / T)` and the shares sum to at most `R`.
    #[test]
    fn prop_proportional_distribution(
        stakes in prop::collection::vec(10_001u128..1_000_000_000_000_000_000_000, 1..12),
        reward in 10_001u128..1_000_000_000_000_000_000_000,
    ) {
        let depositor = ParticipantId::new();
        let roles = move |who: &ParticipantId, _role: Role| *who == depositor;
        let mut ledger = PoolLedger::default();
        let users: Vec<ParticipantId> = stakes.iter().map(|_| ParticipantId::new()).collect();
        for (user, stake) in users.iter().zip(&stakes) {
            ledger.deposit_pool(*user, Wei::new(*stake)).unwrap();
        }
        let total: u128 = stakes.iter().sum();

        let distribution = ledger
            .deposit_rewards(&roles, depositor, Wei::new(reward))
            .unwrap();

        let mut credited = 0u128;
        for (user, stake) in users.iter().zip(&stakes) {
            let expected = Wei::new(reward)
                .mul_div_floor(Wei::new(*stake), Wei::new(total))
                .unwrap();
            prop_assert_eq!(ledger.reward_of(user), expected);
            credited += expected.get();
        }
        prop_assert!(credited <= reward);
        prop_assert_eq!(distribution.distributed.get(), credited);
        prop_assert_eq!(distribution.dust.get(), reward - credited);
        // Each floor drops strictly less than one wei.
        prop_assert!(distribution.dust.get() < stakes.len() as u128);
    }

    /// *For any* stakes, the distribution does not depend on the order in
    /// which participants joined.
    #[test]
    fn prop_distribution_order_independent(
        stakes in prop::collection::vec(10_001u128..1_000_000_000, 2..8),
        reward in 10_001u128..1_000_000_000,
    ) {
        let depositor = ParticipantId::new();
        let roles = move |who: &ParticipantId, _role: Role| *who == depositor;
        let users: Vec<ParticipantId> = stakes.iter().map(|_| ParticipantId::new()).collect();

        let mut forward = PoolLedger::default();
        for (user, stake) in users.iter().zip(&stakes) {
            forward.deposit_pool(*user, Wei::new(*stake)).unwrap();
        }
        let mut reverse = PoolLedger::default();
        for (user, stake) in users.iter().zip(&stakes).rev() {
            reverse.deposit_pool(*user, Wei::new(*stake)).unwrap();
        }

        forward.deposit_rewards(&roles, depositor, Wei::new(reward)).unwrap();
        reverse.deposit_rewards(&roles, depositor, Wei::new(reward)).unwrap();

        for user in &users {
            prop_assert_eq!(forward.reward_of(user), reverse.reward_of(user));
        }
    }

    /// *For any* amount, deposits succeed exactly when the amount exceeds
    /// the minimum unit.
    #[test]
    fn prop_deposit_threshold(value in 0u128..40_000) {
        let mut ledger = PoolLedger::default();
        let result = ledger.deposit_pool(ParticipantId::new(), Wei::new(value));
        prop_assert_eq!(result.is_ok(), Wei::new(value) > MIN_UNIT);
    }

    /// *For any* restake, reward becomes zero and stake and total stake grow
    /// by exactly the former reward.
    #[test]
    fn prop_restake_moves_reward_into_stake(
        own in 10_001u128..1_000_000_000,
        other in 10_001u128..1_000_000_000,
        reward in 10_001u128..1_000_000_000_000,
    ) {
        let depositor = ParticipantId::new();
        let roles = move |who: &ParticipantId, _role: Role| *who == depositor;
        let alice = ParticipantId::new();
        let mut ledger = PoolLedger::default();
        ledger.deposit_pool(alice, Wei::new(own)).unwrap();
        ledger.deposit_pool(ParticipantId::new(), Wei::new(other)).unwrap();
        ledger.deposit_rewards(&roles, depositor, Wei::new(reward)).unwrap();

        let before = ledger.account(&alice);
        let total_before = ledger.total_stake();
        let count_before = ledger.active_user_count();

        match ledger.restake_rewards(alice) {
            Ok(amount) => {
                prop_assert!(before.reward > MIN_UNIT);
                prop_assert_eq!(amount, before.reward);
                prop_assert_eq!(ledger.reward_of(&alice), Wei::ZERO);
                prop_assert_eq!(
                    ledger.stake_of(&alice).get(),
                    before.stake.get() + before.reward.get()
                );
                prop_assert_eq!(
                    ledger.total_stake().get(),
                    total_before.get() + before.reward.get()
                );
            }
            Err(err) => {
                prop_assert!(before.reward <= MIN_UNIT);
                prop_assert_eq!(err.error_code(), "INSUFFICIENT_REWARD_TO_RESTAKE");
                prop_assert_eq!(ledger.account(&alice), before);
            }
        }
        prop_assert_eq!(ledger.active_user_count(), count_before);
    }

    /// *For any* staked account, a full withdrawal pays stake plus reward,
    /// zeroes the account and drops the participant count by one.
    #[test]
    fn prop_withdrawal_completeness(
        own in 10_001u128..1_000_000_000,
        other in 10_001u128..1_000_000_000,
        reward in 10_001u128..1_000_000_000_000,
    ) {
        let depositor = ParticipantId::new();
        let roles = move |who: &ParticipantId, _role: Role| *who == depositor;
        let alice = ParticipantId::new();
        let mut transport = InMemoryTransport::new();
        let mut ledger = PoolLedger::default();
        ledger.deposit_pool(alice, Wei::new(own)).unwrap();
        ledger.deposit_pool(ParticipantId::new(), Wei::new(other)).unwrap();
        ledger.deposit_rewards(&roles, depositor, Wei::new(reward)).unwrap();

        let before = ledger.account(&alice);
        let total_before = ledger.total_stake();

        let payout = ledger.withdraw_pool(&mut transport, alice).unwrap();

        prop_assert_eq!(payout.get(), before.stake.get() + before.reward.get());
        prop_assert_eq!(transport.balance_of(&alice), payout);
        prop_assert_eq!(ledger.account(&alice), Account::default());
        prop_assert_eq!(ledger.active_user_count(), 1);
        prop_assert_eq!(ledger.total_stake().get(), total_before.get() - own);
        prop_assert_eq!(
            ledger.withdraw_pool(&mut transport, alice),
            Err(PoolError::NothingToWithdraw(alice))
        );
    }
}
