//! Roll-ups of an amortization schedule for the table and chart.

use serde::{Deserialize, Serialize};

use crate::loan::AmortizationRow;

/// Months shown by the monthly table before it is cut off.
pub const MONTHLY_TABLE_LIMIT: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ViewMode {
    #[default]
    Yearly,
    Monthly,
}

impl ViewMode {
    pub fn window(self) -> usize {
        match self {
            ViewMode::Yearly => 12,
            ViewMode::Monthly => 1,
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            ViewMode::Yearly => ViewMode::Monthly,
            ViewMode::Monthly => ViewMode::Yearly,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ViewMode::Yearly => "Yearly",
            ViewMode::Monthly => "Monthly",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodRow {
    /// 1-based year or month number.
    pub period: usize,
    /// Months folded into this row; the last year of a schedule may be short.
    pub months: usize,
    pub payment: f64,
    pub principal: f64,
    pub interest: f64,
    /// Balance after the last month of the window.
    pub balance: f64,
}

impl PeriodRow {
    pub fn label(&self, mode: ViewMode) -> String {
        match mode {
            ViewMode::Yearly => format!("Year {}", self.period),
            ViewMode::Monthly => format!("Month {}", self.period),
        }
    }
}

/// Groups rows into fixed windows keyed by `(month - 1) / window`.
pub fn aggregate(schedule: &[AmortizationRow], mode: ViewMode) -> Vec<PeriodRow> {
    let window = mode.window();
    let mut rows: Vec<PeriodRow> = Vec::new();

    for row in schedule {
        let period = (row.month.saturating_sub(1)) / window + 1;
        match rows.last_mut() {
            Some(current) if current.period == period => {
                current.months += 1;
                current.payment += row.payment;
                current.principal += row.principal;
                current.interest += row.interest;
                current.balance = row.balance;
            }
            _ => rows.push(PeriodRow {
                period,
                months: 1,
                payment: row.payment,
                principal: row.principal,
                interest: row.interest,
                balance: row.balance,
            }),
        }
    }

    rows
}

/// Rows for the on-screen table: every year, or the first five years of
/// months.
pub fn table_rows(schedule: &[AmortizationRow], mode: ViewMode) -> Vec<PeriodRow> {
    match mode {
        ViewMode::Yearly => aggregate(schedule, mode),
        ViewMode::Monthly => {
            let end = schedule.len().min(MONTHLY_TABLE_LIMIT);
            aggregate(&schedule[..end], mode)
        }
    }
}
