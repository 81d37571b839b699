use std::io::Write;

use anyhow::Result;
use tabwriter::TabWriter;

use crate::core::{format_amount, Account, Snapshot};

pub fn print_accounts<T: Write>(wr: T, accounts: &[Account]) -> Result<()> {
    let mut tw = TabWriter::new(wr);
    writeln!(tw, "Account\tAccount ID\tIBAN\tCurrency")?;

    for account in accounts.iter() {
        writeln!(
            tw,
            "{}\t{}\t{}\t{}",
            account.friendly_name(),
            account.id,
            account.iban.as_deref().unwrap_or("-"),
            account.currency,
        )?;
    }

    tw.flush()?;

    Ok(())
}

pub fn print_snapshot<T: Write>(wr: T, snapshot: &Snapshot) -> Result<()> {
    let mut tw = TabWriter::new(wr);
    writeln!(
        tw,
        "Account\tBalance\tSpent MTD\tIncome MTD\tSpent 30d\tIncome 30d\tRatio\tBurn/day\tRunway\tPayday in\tMargin\tHealth"
    )?;

    for entry in snapshot.values() {
        let currency = entry.balance.currency.as_str();
        writeln!(
            tw,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}%\t{}\t{}d\t{}d\t{}\t{} {}",
            entry.account.friendly_name(),
            entry.balance,
            format_amount(entry.spending_mtd, currency),
            format_amount(entry.income_mtd, currency),
            format_amount(entry.spending_30d, currency),
            format_amount(entry.income_30d, currency),
            entry.spending_ratio.round_dp(1),
            format_amount(entry.daily_burn, currency),
            entry.runway_days.round_dp(0),
            entry.days_until_payday,
            entry.safety_margin.round_dp(2),
            entry.health.icon(),
            entry.health.label(),
        )?;
    }

    writeln!(tw)?;
    for entry in snapshot.values() {
        writeln!(
            tw,
            "{}: {}",
            entry.account.friendly_name(),
            entry.health.message()
        )?;
    }

    tw.flush()?;

    Ok(())
}
