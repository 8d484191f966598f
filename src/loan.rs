use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::format::value_or;

/// Balance at or below this is treated as paid off.
pub const PAYOFF_EPSILON: f64 = 0.01;

/// Hard stop for non-amortizing inputs: 50 years of monthly rows.
pub const MAX_SCHEDULE_MONTHS: usize = 600;

pub const DEFAULT_TERM_YEARS: f64 = 30.0;

pub const MAX_TERM_YEARS: u32 = (MAX_SCHEDULE_MONTHS / 12) as u32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanParameters {
    pub principal: f64,
    pub annual_rate_percent: f64,
    pub term_years: u32,
    pub extra_monthly_payment: f64,
}

impl LoanParameters {
    /// Builds parameters from raw form text. Missing or unparsable values
    /// become 0, except the term which falls back to 30 years.
    ///
    /// The term is rounded to whole years (`"15.5"` is 16 years) and capped
    /// at the 50-year schedule limit.
    pub fn from_inputs(amount: &str, rate: &str, term: &str, extra: &str) -> Self {
        Self {
            principal: value_or(amount, 0.0),
            annual_rate_percent: value_or(rate, 0.0),
            term_years: value_or(term, DEFAULT_TERM_YEARS)
                .round()
                .clamp(0.0, MAX_TERM_YEARS as f64) as u32,
            extra_monthly_payment: value_or(extra, 0.0),
        }
    }

    pub fn monthly_rate(&self) -> f64 {
        self.annual_rate_percent / 100.0 / 12.0
    }

    pub fn payment_count(&self) -> u32 {
        self.term_years.saturating_mul(12)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmortizationRow {
    pub month: usize,
    pub payment: f64,
    pub principal: f64,
    pub interest: f64,
    pub balance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSummary {
    pub total_interest: f64,
    pub total_principal: f64,
    pub total_paid: f64,
    pub payoff_months: usize,
}

/// Level payment that retires `principal` over `payments` months.
pub fn monthly_payment(principal: f64, monthly_rate: f64, payments: u32) -> f64 {
    let n = payments.max(1) as f64;
    if monthly_rate > 0.0 {
        let growth = (1.0 + monthly_rate).powf(n);
        principal * (monthly_rate * growth) / (growth - 1.0)
    } else {
        principal / n
    }
}

/// Simulates the loan month by month until the balance is gone or the
/// 600-month cap is reached. Inputs whose payment never covers the interest
/// come back truncated at the cap rather than as an error.
pub fn generate_schedule(
    principal: f64,
    monthly_rate: f64,
    base_payment: f64,
    extra_payment: f64,
) -> Vec<AmortizationRow> {
    let mut schedule = Vec::new();
    let mut balance = principal;
    let mut month = 0;

    while balance > PAYOFF_EPSILON && month < MAX_SCHEDULE_MONTHS {
        month += 1;
        let interest = balance * monthly_rate;
        let mut principal_paid = base_payment - interest + extra_payment;

        // Final payment is partial and closes the loan at exactly zero.
        if principal_paid > balance {
            principal_paid = balance;
        }
        balance -= principal_paid;

        schedule.push(AmortizationRow {
            month,
            payment: interest + principal_paid,
            principal: principal_paid,
            interest,
            balance: balance.max(0.0),
        });
    }

    if month == MAX_SCHEDULE_MONTHS && balance > PAYOFF_EPSILON {
        debug!(balance, "schedule truncated at {MAX_SCHEDULE_MONTHS} months");
    }

    schedule
}

pub fn summarize(schedule: &[AmortizationRow]) -> ScheduleSummary {
    let (total_interest, total_principal) = schedule
        .iter()
        .fold((0.0, 0.0), |(i, p), row| (i + row.interest, p + row.principal));

    ScheduleSummary {
        total_interest,
        total_principal,
        total_paid: total_interest + total_principal,
        payoff_months: schedule.len(),
    }
}

/// Standard vs. accelerated payoff of one loan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanAnalysis {
    pub params: LoanParameters,
    pub base_payment: f64,
    pub standard: Vec<AmortizationRow>,
    pub accelerated: Vec<AmortizationRow>,
    pub standard_summary: ScheduleSummary,
    pub accelerated_summary: ScheduleSummary,
}

impl LoanAnalysis {
    pub fn compute(params: &LoanParameters) -> Self {
        let monthly_rate = params.monthly_rate();
        let base_payment = monthly_payment(params.principal, monthly_rate, params.payment_count());

        let standard = generate_schedule(params.principal, monthly_rate, base_payment, 0.0);
        let accelerated = generate_schedule(
            params.principal,
            monthly_rate,
            base_payment,
            params.extra_monthly_payment,
        );

        let standard_summary = summarize(&standard);
        let accelerated_summary = summarize(&accelerated);

        info!(
            principal = params.principal,
            rate = params.annual_rate_percent,
            years = params.term_years,
            extra = params.extra_monthly_payment,
            standard_months = standard_summary.payoff_months,
            accelerated_months = accelerated_summary.payoff_months,
            "loan calculated"
        );

        Self {
            params: params.clone(),
            base_payment,
            standard,
            accelerated,
            standard_summary,
            accelerated_summary,
        }
    }

    /// Base payment plus the extra principal.
    pub fn total_monthly_payment(&self) -> f64 {
        self.base_payment + self.params.extra_monthly_payment
    }

    pub fn interest_savings(&self) -> f64 {
        self.standard_summary.total_interest - self.accelerated_summary.total_interest
    }

    pub fn months_saved(&self) -> usize {
        self.standard_summary
            .payoff_months
            .saturating_sub(self.accelerated_summary.payoff_months)
    }

    pub fn standard_years(&self) -> f64 {
        self.standard_summary.payoff_months as f64 / 12.0
    }

    pub fn accelerated_years(&self) -> f64 {
        self.accelerated_summary.payoff_months as f64 / 12.0
    }

    /// Accelerated payoff time as a fraction of the standard term, for the
    /// comparison bars.
    pub fn payoff_ratio(&self) -> f64 {
        if self.standard_summary.payoff_months == 0 {
            return 0.0;
        }
        self.accelerated_summary.payoff_months as f64 / self.standard_summary.payoff_months as f64
    }

    /// The schedule that is displayed and exported.
    pub fn schedule(&self) -> &[AmortizationRow] {
        &self.accelerated
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuickLoanEstimate {
    pub payment: f64,
    pub total_interest: f64,
}

/// Thirty-year estimate used by the home screen preview.
pub fn quick_loan_estimate(loan: f64, rate_percent: f64) -> QuickLoanEstimate {
    let payments = 360;
    let payment = monthly_payment(loan, rate_percent / 100.0 / 12.0, payments);
    QuickLoanEstimate {
        payment,
        total_interest: payment * payments as f64 - loan,
    }
}
