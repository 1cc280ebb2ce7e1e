//! Finance and ZIS summaries computed from a tenant's rows.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{PaymentStatus, Transaction, TransactionType, ZisFlow, ZisTransaction, ZisType};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTotal {
    pub income: u64,
    pub expense: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceSummary {
    pub total_income: u64,
    pub total_expense: u64,
    /// Income minus expense; negative when the mosque is running a deficit.
    pub balance: i128,
    pub transaction_count: usize,
    pub by_category: BTreeMap<String, CategoryTotal>,
}

pub fn finance_summary(transactions: &[Transaction]) -> FinanceSummary {
    let mut summary = FinanceSummary {
        transaction_count: transactions.len(),
        ..FinanceSummary::default()
    };

    for tx in transactions {
        let category = summary.by_category.entry(tx.category.clone()).or_default();
        match tx.kind {
            TransactionType::Income => {
                summary.total_income = summary.total_income.saturating_add(tx.amount);
                category.income = category.income.saturating_add(tx.amount);
            }
            TransactionType::Expense => {
                summary.total_expense = summary.total_expense.saturating_add(tx.amount);
                category.expense = category.expense.saturating_add(tx.amount);
            }
        }
    }

    summary.balance = i128::from(summary.total_income) - i128::from(summary.total_expense);
    summary
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZisTypeTotal {
    pub collected: u64,
    pub disbursed: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZisSummary {
    pub collected: u64,
    pub disbursed: u64,
    pub balance: i128,
    /// Collected covers disbursed. Reported, never enforced.
    pub reconciled: bool,
    pub pending_count: usize,
    pub by_type: BTreeMap<ZisType, ZisTypeTotal>,
}

/// Totals over paid ZIS rows. Pending rows are only counted; cancelled rows are ignored.
pub fn zis_summary(rows: &[ZisTransaction]) -> ZisSummary {
    let mut summary = ZisSummary::default();

    for row in rows {
        match row.payment_status {
            PaymentStatus::Cancelled => continue,
            PaymentStatus::Pending => {
                summary.pending_count += 1;
                continue;
            }
            PaymentStatus::Paid => {}
        }

        let per_type = summary.by_type.entry(row.kind).or_default();
        match row.flow {
            ZisFlow::In => {
                summary.collected = summary.collected.saturating_add(row.amount);
                per_type.collected = per_type.collected.saturating_add(row.amount);
            }
            ZisFlow::Out => {
                summary.disbursed = summary.disbursed.saturating_add(row.amount);
                per_type.disbursed = per_type.disbursed.saturating_add(row.amount);
            }
        }
    }

    summary.balance = i128::from(summary.collected) - i128::from(summary.disbursed);
    summary.reconciled = summary.collected >= summary.disbursed;
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Entity;

    fn tx(kind: TransactionType, amount: u64, category: &str) -> Transaction {
        let mut tx = Transaction::initial_state("x");
        tx.kind = kind;
        tx.amount = amount;
        tx.category = category.to_string();
        tx
    }

    fn zis(kind: ZisType, flow: ZisFlow, amount: u64, status: PaymentStatus) -> ZisTransaction {
        let mut row = ZisTransaction::initial_state("z");
        row.kind = kind;
        row.flow = flow;
        row.amount = amount;
        row.payment_status = status;
        row
    }

    #[test]
    fn test_finance_summary_totals_and_categories() {
        let rows = vec![
            tx(TransactionType::Income, 500, "Kotak Jumat"),
            tx(TransactionType::Income, 300, "Kotak Jumat"),
            tx(TransactionType::Expense, 1_000, "Renovasi"),
        ];
        let summary = finance_summary(&rows);

        assert_eq!(summary.total_income, 800);
        assert_eq!(summary.total_expense, 1_000);
        assert_eq!(summary.balance, -200);
        assert_eq!(summary.transaction_count, 3);
        assert_eq!(summary.by_category["Kotak Jumat"].income, 800);
        assert_eq!(summary.by_category["Renovasi"].expense, 1_000);
    }

    #[test]
    fn test_finance_summary_empty() {
        let summary = finance_summary(&[]);
        assert_eq!(summary, FinanceSummary::default());
    }

    #[test]
    fn test_zis_summary_counts_paid_rows_only() {
        let rows = vec![
            zis(ZisType::ZakatFitrah, ZisFlow::In, 450, PaymentStatus::Paid),
            zis(ZisType::ZakatFitrah, ZisFlow::Out, 150, PaymentStatus::Paid),
            zis(ZisType::Fidyah, ZisFlow::In, 90, PaymentStatus::Paid),
            zis(ZisType::ZakatMaal, ZisFlow::In, 10_000, PaymentStatus::Pending),
            zis(ZisType::ZakatMaal, ZisFlow::In, 7_000, PaymentStatus::Cancelled),
        ];
        let summary = zis_summary(&rows);

        assert_eq!(summary.collected, 540);
        assert_eq!(summary.disbursed, 150);
        assert_eq!(summary.balance, 390);
        assert!(summary.reconciled);
        assert_eq!(summary.pending_count, 1);
        assert_eq!(summary.by_type[&ZisType::ZakatFitrah].disbursed, 150);
        assert!(!summary.by_type.contains_key(&ZisType::ZakatMaal));
    }

    #[test]
    fn test_zis_summary_flags_over_disbursement() {
        let rows = vec![
            zis(ZisType::InfaqShadaqah, ZisFlow::In, 100, PaymentStatus::Paid),
            zis(ZisType::InfaqShadaqah, ZisFlow::Out, 250, PaymentStatus::Paid),
        ];
        let summary = zis_summary(&rows);
        assert!(!summary.reconciled);
        assert_eq!(summary.balance, -150);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["byType"]["infaq_shadaqah"]["disbursed"], 250);
    }
}
