//! Rental property return metrics.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::format::value_or;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoiInputs {
    pub purchase_price: f64,
    pub down_payment_percent: f64,
    pub closing_costs: f64,
    pub rehab_costs: f64,
    pub monthly_rent: f64,
    pub vacancy_percent: f64,
    pub monthly_expenses: f64,
    pub mortgage_payment: f64,
}

impl RoiInputs {
    /// Field order matches [`RoiInputs`]; anything missing becomes 0.
    pub fn from_fields(fields: &[&str; 8]) -> Self {
        Self {
            purchase_price: value_or(fields[0], 0.0),
            down_payment_percent: value_or(fields[1], 0.0),
            closing_costs: value_or(fields[2], 0.0),
            rehab_costs: value_or(fields[3], 0.0),
            monthly_rent: value_or(fields[4], 0.0),
            vacancy_percent: value_or(fields[5], 0.0),
            monthly_expenses: value_or(fields[6], 0.0),
            mortgage_payment: value_or(fields[7], 0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoiAnalysis {
    pub inputs: RoiInputs,
    pub down_payment: f64,
    pub total_cash_invested: f64,
    pub noi: f64,
    pub annual_cash_flow: f64,
    pub monthly_cash_flow: f64,
    pub cap_rate: f64,
    pub cash_on_cash: f64,
    /// `None` when vacancy is 100% or more and no rent can break even.
    pub break_even_rent: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rating {
    Good,
    Moderate,
    Warning,
}

impl Rating {
    pub fn icon(self) -> &'static str {
        match self {
            Rating::Good => "✓",
            Rating::Moderate => "•",
            Rating::Warning => "!",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Insight {
    pub title: &'static str,
    pub rating: Rating,
    pub message: &'static str,
}

pub fn analyze(inputs: &RoiInputs) -> RoiAnalysis {
    let down_payment = inputs.purchase_price * (inputs.down_payment_percent / 100.0);
    let total_cash_invested = down_payment + inputs.closing_costs + inputs.rehab_costs;

    let occupancy = 1.0 - inputs.vacancy_percent / 100.0;
    let annual_rent = inputs.monthly_rent * occupancy * 12.0;
    let annual_expenses = inputs.monthly_expenses * 12.0;
    let annual_mortgage = inputs.mortgage_payment * 12.0;

    let noi = annual_rent - annual_expenses;
    let annual_cash_flow = noi - annual_mortgage;

    let cap_rate = if inputs.purchase_price > 0.0 {
        noi / inputs.purchase_price * 100.0
    } else {
        0.0
    };
    let cash_on_cash = if total_cash_invested > 0.0 {
        annual_cash_flow / total_cash_invested * 100.0
    } else {
        0.0
    };
    let break_even_rent = (occupancy > 0.0)
        .then(|| (inputs.monthly_expenses + inputs.mortgage_payment) / occupancy);

    debug!(noi, cap_rate, cash_on_cash, "roi calculated");

    RoiAnalysis {
        inputs: inputs.clone(),
        down_payment,
        total_cash_invested,
        noi,
        annual_cash_flow,
        monthly_cash_flow: annual_cash_flow / 12.0,
        cap_rate,
        cash_on_cash,
        break_even_rent,
    }
}

impl RoiAnalysis {
    pub fn insights(&self) -> [Insight; 3] {
        let coc = self.cash_on_cash;
        let cap = self.cap_rate;
        let flow = self.monthly_cash_flow;

        [
            if coc >= 8.0 {
                Insight { title: "Cash-on-Cash", rating: Rating::Good, message: "Excellent return above the 8% benchmark!" }
            } else if coc >= 4.0 {
                Insight { title: "Cash-on-Cash", rating: Rating::Moderate, message: "Moderate return. Consider ways to increase income." }
            } else {
                Insight { title: "Cash-on-Cash", rating: Rating::Warning, message: "Low return. Review expenses and rent pricing." }
            },
            if cap >= 6.0 {
                Insight { title: "CAP Rate", rating: Rating::Good, message: "Strong CAP rate indicates solid investment." }
            } else if cap >= 4.0 {
                Insight { title: "CAP Rate", rating: Rating::Moderate, message: "Average CAP rate for the market." }
            } else {
                Insight { title: "CAP Rate", rating: Rating::Warning, message: "Low CAP rate - property may be overpriced." }
            },
            if flow > 200.0 {
                Insight { title: "Cash Flow", rating: Rating::Good, message: "Strong positive cash flow!" }
            } else if flow > 0.0 {
                Insight { title: "Cash Flow", rating: Rating::Moderate, message: "Positive but thin margins." }
            } else {
                Insight { title: "Cash Flow", rating: Rating::Warning, message: "Negative cash flow - property costs more than it earns." }
            },
        ]
    }

    pub fn recommendation(&self) -> &'static str {
        if self.cash_on_cash >= 8.0 {
            "STRONG INVESTMENT - Cash on Cash return exceeds 8% benchmark."
        } else if self.cash_on_cash >= 4.0 {
            "MODERATE INVESTMENT - Consider negotiating better terms."
        } else {
            "WEAK INVESTMENT - Review pricing and expenses carefully."
        }
    }

    /// Slices of the invested cash for the donut chart.
    pub fn investment_breakdown(&self) -> [(&'static str, f64); 3] {
        [
            ("Down Payment", self.down_payment),
            ("Closing Costs", self.inputs.closing_costs),
            ("Rehab Costs", self.inputs.rehab_costs),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuickRoiEstimate {
    pub cap_rate: f64,
    pub cash_on_cash: f64,
}

/// Rule-of-thumb preview: 5% vacancy, expenses at 20% of annual rent,
/// 20% down at 6.5% interest-only.
pub fn quick_roi_estimate(price: f64, rent: f64) -> QuickRoiEstimate {
    let noi = rent * 12.0 * 0.95 - rent * 2.4;
    let annual_debt = price * 0.8 * 0.065;
    let invested = price * 0.2;
    QuickRoiEstimate {
        cap_rate: if price > 0.0 { noi / price * 100.0 } else { 0.0 },
        cash_on_cash: if invested > 0.0 { (noi - annual_debt) / invested * 100.0 } else { 0.0 },
    }
}
