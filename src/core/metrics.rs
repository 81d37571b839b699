//! Spending, income and runway metrics derived from one poll's worth of data.
//!
//! Everything here is pure: the engine hands in the fetched records and the
//! date of the poll, and receives a fresh [`AccountSnapshot`] per account.

use std::collections::{BTreeMap, HashSet};

use chrono::{Datelike, Months, NaiveDate};
use rust_decimal::Decimal;

use super::{Account, Direction, MonetaryAmount, Transaction};

/// Account id to snapshot, replaced wholesale on every poll.
pub type Snapshot = BTreeMap<String, AccountSnapshot>;

/// Runway reported when nothing was spent over the trailing window.
pub const NO_BURN_RUNWAY_DAYS: i64 = 999;
/// Floor for the days-until-payday divisor.
pub const MIN_DAYS_UNTIL_PAYDAY: i64 = 2;
/// Length of the trailing window daily burn is averaged over.
pub const TRAILING_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    Excellent,
    Good,
    Ok,
    Warning,
    Danger,
}

impl Health {
    pub fn from_margin(safety_margin: Decimal) -> Self {
        if safety_margin >= Decimal::new(20, 1) {
            Health::Excellent
        } else if safety_margin >= Decimal::new(15, 1) {
            Health::Good
        } else if safety_margin >= Decimal::ONE {
            Health::Ok
        } else if safety_margin >= Decimal::new(7, 1) {
            Health::Warning
        } else {
            Health::Danger
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Health::Excellent => "excellent",
            Health::Good => "good",
            Health::Ok => "ok",
            Health::Warning => "warning",
            Health::Danger => "danger",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Health::Excellent => "🟢",
            Health::Good => "🔵",
            Health::Ok => "🟡",
            Health::Warning => "🟠",
            Health::Danger => "🔴",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Health::Excellent => "Money will comfortably last until payday",
            Health::Good => "On track with room to spare",
            Health::Ok => "Just enough to reach payday",
            Health::Warning => "Spending faster than the balance allows",
            Health::Danger => "Balance runs out well before payday",
        }
    }
}

/// Spending and income over one window, internal transfers excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Flows {
    pub spending: Decimal,
    pub income: Decimal,
}

/// IBANs of every account in the current account listing.
pub fn own_ibans(accounts: &[Account]) -> HashSet<String> {
    accounts.iter().filter_map(|a| a.iban.clone()).collect()
}

pub fn flows(txns: &[Transaction], own: &HashSet<String>) -> Flows {
    txns.iter()
        .filter(|tx| !is_internal(tx, own))
        .fold(Flows::default(), |mut acc, tx| {
            match tx.direction {
                Direction::Debit => acc.spending += tx.amount.amount,
                Direction::Credit => acc.income += tx.amount.amount,
            }
            acc
        })
}

fn is_internal(tx: &Transaction, own: &HashSet<String>) -> bool {
    tx.counterparty()
        .map_or(false, |party| own.contains(&party.iban))
}

/// Days from `today` to the next `payday` day-of-month.
///
/// Today counts as already past payday. A payday beyond the end of the target
/// month falls on its last day, and anything closer than two days reads as two.
pub fn days_until_payday(today: NaiveDate, payday: u32) -> i64 {
    let month_start = today.with_day(1).unwrap_or(today);
    let target_month = if today.day() >= payday {
        month_start + Months::new(1)
    } else {
        month_start
    };

    let day = payday.min(days_in_month(target_month));
    let target = target_month.with_day(day).unwrap_or(target_month);

    let days = (target - today).num_days();
    if days <= 1 {
        MIN_DAYS_UNTIL_PAYDAY
    } else {
        days
    }
}

fn days_in_month(month_start: NaiveDate) -> u32 {
    (month_start + Months::new(1))
        .pred_opt()
        .map_or(28, |last| last.day())
}

pub fn spending_ratio(spending: Decimal, income: Decimal) -> Decimal {
    if income > Decimal::ZERO {
        spending / income * Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    }
}

pub fn daily_burn(spending_30d: Decimal) -> Decimal {
    spending_30d / Decimal::from(TRAILING_WINDOW_DAYS)
}

pub fn runway_days(balance: Decimal, daily_burn: Decimal) -> Decimal {
    if daily_burn > Decimal::ZERO {
        balance / daily_burn
    } else {
        Decimal::from(NO_BURN_RUNWAY_DAYS)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSnapshot {
    pub account: Account,
    pub balance: MonetaryAmount,
    pub spending_mtd: Decimal,
    pub income_mtd: Decimal,
    pub spending_30d: Decimal,
    pub income_30d: Decimal,
    pub spending_ratio: Decimal,
    pub daily_burn: Decimal,
    pub runway_days: Decimal,
    pub days_until_payday: i64,
    pub safety_margin: Decimal,
    pub health: Health,
}

/// Inputs fetched for a single account during one poll.
pub struct AccountData<'a> {
    pub account: Account,
    pub balance: MonetaryAmount,
    pub month_to_date: &'a [Transaction],
    pub trailing_30d: &'a [Transaction],
}

impl AccountSnapshot {
    pub fn derive(
        data: AccountData<'_>,
        own: &HashSet<String>,
        payday: u32,
        today: NaiveDate,
    ) -> Self {
        let mtd = flows(data.month_to_date, own);
        let last_30d = flows(data.trailing_30d, own);

        let burn = daily_burn(last_30d.spending);
        let runway = runway_days(data.balance.amount, burn);
        let until_payday = days_until_payday(today, payday);
        let margin = runway / Decimal::from(until_payday);

        Self {
            account: data.account,
            balance: data.balance,
            spending_mtd: mtd.spending,
            income_mtd: mtd.income,
            spending_30d: last_30d.spending,
            income_30d: last_30d.income,
            spending_ratio: spending_ratio(last_30d.spending, last_30d.income),
            daily_burn: burn,
            runway_days: runway,
            days_until_payday: until_payday,
            safety_margin: margin,
            health: Health::from_margin(margin),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Party, Status};

    use proptest::prelude::*;

    const OWN_A: &str = "CZ6508000000192000145399";
    const OWN_B: &str = "CZ6907101781240000004159";
    const SHOP: &str = "CZ4201000000195505030267";

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn czk(amount: i64) -> MonetaryAmount {
        MonetaryAmount::new(Decimal::from(amount), "CZK").unwrap()
    }

    fn party(iban: &str) -> Option<Party> {
        Some(Party {
            iban: iban.to_string(),
            name: None,
        })
    }

    fn debit(amount: i64, creditor: Option<Party>) -> Transaction {
        Transaction {
            reference: format!("D-{}", amount),
            amount: czk(amount),
            direction: Direction::Debit,
            status: Status::Book,
            booking_date: date(2024, 6, 3),
            value_date: date(2024, 6, 3),
            creditor,
            debitor: party(OWN_A),
        }
    }

    fn credit(amount: i64, debitor: Option<Party>) -> Transaction {
        Transaction {
            reference: format!("C-{}", amount),
            amount: czk(amount),
            direction: Direction::Credit,
            status: Status::Book,
            booking_date: date(2024, 6, 3),
            value_date: date(2024, 6, 3),
            creditor: party(OWN_A),
            debitor,
        }
    }

    fn own() -> HashSet<String> {
        [OWN_A, OWN_B].iter().map(|s| s.to_string()).collect()
    }

    fn account() -> Account {
        Account {
            id: "A1".into(),
            iban: Some(OWN_A.into()),
            display_name: "Jan Novak".into(),
            product_name: "Osobni ucet".into(),
            currency: "CZK".into(),
        }
    }

    #[test]
    fn internal_transfers_are_excluded_both_ways() {
        let txns = vec![
            debit(300, party(SHOP)),
            debit(1000, party(OWN_B)),
            debit(200, party(OWN_A)),
            credit(5000, party(SHOP)),
            credit(700, party(OWN_B)),
        ];

        assert_eq!(
            flows(&txns, &own()),
            Flows {
                spending: Decimal::from(300),
                income: Decimal::from(5000),
            }
        );
    }

    #[test]
    fn missing_counterparty_is_external() {
        let txns = vec![debit(120, None), credit(80, None)];

        assert_eq!(
            flows(&txns, &own()),
            Flows {
                spending: Decimal::from(120),
                income: Decimal::from(80),
            }
        );
    }

    #[test]
    fn own_ibans_skip_accounts_without_iban() {
        let mut other = account();
        other.id = "A2".into();
        other.iban = None;

        let set = own_ibans(&[account(), other]);
        assert_eq!(set.len(), 1);
        assert!(set.contains(OWN_A));
    }

    #[test]
    fn days_until_payday_cases() {
        let tests = vec![
            (date(2024, 6, 20), 15, 25),
            (date(2024, 6, 10), 15, 5),
            // Payday itself counts as passed.
            (date(2024, 6, 15), 15, 30),
            // Clamped to the end of February, leap and common years.
            (date(2024, 1, 31), 31, 29),
            (date(2023, 1, 31), 31, 28),
            (date(2023, 2, 27), 30, MIN_DAYS_UNTIL_PAYDAY),
            // One day out is floored to two.
            (date(2024, 6, 14), 15, MIN_DAYS_UNTIL_PAYDAY),
            (date(2024, 12, 31), 1, MIN_DAYS_UNTIL_PAYDAY),
            (date(2024, 12, 20), 1, 12),
        ];

        for (today, payday, expected) in tests {
            assert_eq!(
                days_until_payday(today, payday),
                expected,
                "today {} payday {}",
                today,
                payday
            );
        }
    }

    #[test]
    fn health_boundaries_use_upper_band() {
        let tests = vec![
            (Decimal::new(20, 1), Health::Excellent),
            (Decimal::new(15, 1), Health::Good),
            (Decimal::new(149999, 5), Health::Ok),
            (Decimal::ONE, Health::Ok),
            (Decimal::new(7, 1), Health::Warning),
            (Decimal::new(69999, 5), Health::Danger),
            (Decimal::from(-3), Health::Danger),
        ];

        for (margin, expected) in tests {
            assert_eq!(Health::from_margin(margin), expected, "margin {}", margin);
        }
        assert_eq!(Health::Ok.label(), "ok");
    }

    #[test]
    fn zero_divisors_fall_back() {
        assert_eq!(
            runway_days(Decimal::from(3000), Decimal::ZERO),
            Decimal::from(NO_BURN_RUNWAY_DAYS)
        );
        assert_eq!(
            spending_ratio(Decimal::from(1500), Decimal::ZERO),
            Decimal::ZERO
        );
    }

    #[test]
    fn derive_snapshot_for_comfortable_month() {
        let trailing = vec![debit(1500, party(SHOP)), credit(2000, party(SHOP))];
        let snapshot = AccountSnapshot::derive(
            AccountData {
                account: account(),
                balance: czk(3000),
                month_to_date: &trailing[..1],
                trailing_30d: &trailing,
            },
            &own(),
            15,
            date(2024, 6, 20),
        );

        assert_eq!(snapshot.spending_mtd, Decimal::from(1500));
        assert_eq!(snapshot.income_mtd, Decimal::ZERO);
        assert_eq!(snapshot.spending_ratio, Decimal::from(75));
        assert_eq!(snapshot.days_until_payday, 25);
        assert_eq!(snapshot.daily_burn, Decimal::from(50));
        assert_eq!(snapshot.runway_days, Decimal::from(60));
        assert_eq!(snapshot.safety_margin, Decimal::new(24, 1));
        assert_eq!(snapshot.health, Health::Excellent);
    }

    #[test]
    fn derive_snapshot_without_spending() {
        let snapshot = AccountSnapshot::derive(
            AccountData {
                account: account(),
                balance: czk(100),
                month_to_date: &[],
                trailing_30d: &[],
            },
            &own(),
            1,
            date(2024, 6, 20),
        );

        assert_eq!(snapshot.runway_days, Decimal::from(NO_BURN_RUNWAY_DAYS));
        assert_eq!(snapshot.spending_ratio, Decimal::ZERO);
        assert_eq!(snapshot.health, Health::Excellent);
    }

    proptest! {
        #[test]
        fn excluded_debits_partition_total(
            entries in prop::collection::vec((1u32..100_000, any::<bool>(), 0usize..4), 0..40)
        ) {
            let pool = [Some(OWN_A), Some(OWN_B), Some(SHOP), None];
            let own = own();
            let txns: Vec<Transaction> = entries
                .iter()
                .map(|(amount, is_debit, who)| {
                    let other = pool[*who].and_then(party);
                    if *is_debit {
                        debit(i64::from(*amount), other)
                    } else {
                        credit(i64::from(*amount), other)
                    }
                })
                .collect();

            let debits = txns.iter().filter(|t| t.direction == Direction::Debit);
            let total: Decimal = debits.clone().map(|t| t.amount.amount).sum();
            let internal: Decimal = debits
                .filter(|t| t.creditor.as_ref().map_or(false, |p| own.contains(&p.iban)))
                .map(|t| t.amount.amount)
                .sum();

            prop_assert_eq!(flows(&txns, &own).spending + internal, total);
        }

        #[test]
        fn days_until_payday_stays_in_range(
            offset in 0i64..3650,
            payday in 1u32..=31,
        ) {
            let today = date(2020, 1, 1) + chrono::Duration::days(offset);
            let days = days_until_payday(today, payday);

            prop_assert!(days >= MIN_DAYS_UNTIL_PAYDAY);
            prop_assert!(days <= 31);
        }
    }
}
