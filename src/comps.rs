//! Comparable-property search for property tax appeals.
//!
//! There is no assessor data feed yet, so [`DemoSource`] fabricates a
//! plausible neighbourhood after a simulated network delay. Nothing about
//! its distribution is meant to be stable.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::{runtime::Handle, sync::oneshot, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

pub const DEFAULT_RADIUS_MILES: f64 = 0.5;
pub const DEFAULT_LATENCY: Duration = Duration::from_millis(1500);

/// Downtown Chicago; the demo neighbourhood is centred here.
const ORIGIN: (f64, f64) = (41.8781, -87.6298);

const STREETS: [&str; 8] = [
    "Oak St", "Maple Ave", "Pine Rd", "Elm Dr", "Cedar Ln", "Birch Way", "Walnut Ct", "Cherry Blvd",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub address: String,
    pub radius: f64,
}

impl SearchQuery {
    /// Trims the address and rejects an empty one.
    pub fn new(address: &str, radius: f64) -> Result<Self> {
        let address = address.trim();
        if address.is_empty() {
            return Err(Error::MissingAddress);
        }
        Ok(Self {
            address: address.to_string(),
            radius,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectProperty {
    pub address: String,
    pub value: f64,
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparable {
    pub address: String,
    pub value: f64,
    /// Year of the last assessment appeal, if any.
    pub last_appeal: Option<u16>,
    pub sqft: u32,
    pub beds: u8,
    pub baths: u8,
    /// Miles from the subject, two decimals.
    pub distance: f64,
    pub lat: f64,
    pub lng: f64,
}

impl Comparable {
    pub fn last_appeal_label(&self) -> String {
        self.last_appeal
            .map(|year| year.to_string())
            .unwrap_or_else(|| "None".to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub subject: SubjectProperty,
    pub comparables: Vec<Comparable>,
    pub radius: f64,
}

/// Fabricates 5 to 12 comparables around a base value and sorts them by
/// distance. The subject is priced 15% above the base.
pub fn generate_demo_comps<R: Rng + ?Sized>(rng: &mut R, address: &str, radius: f64) -> SearchResults {
    let base_value = 300_000.0 + rng.gen::<f64>() * 150_000.0;
    let count = rng.gen_range(5..=12);

    let mut comparables: Vec<Comparable> = (0..count)
        .map(|_| {
            let variance = (rng.gen::<f64>() - 0.5) * 0.3;
            let distance = rng.gen::<f64>() * radius;
            let number = rng.gen_range(1000..10_000);
            let street = STREETS.choose(rng).copied().unwrap_or(STREETS[0]);
            Comparable {
                address: format!("{number} {street}"),
                value: (base_value * (1.0 + variance)).round(),
                last_appeal: rng.gen_bool(0.5).then(|| rng.gen_range(2020..=2024)),
                sqft: rng.gen_range(1200..2700),
                beds: rng.gen_range(2..=4),
                baths: rng.gen_range(1..=2),
                distance: (distance * 100.0).round() / 100.0,
                lat: ORIGIN.0 + (rng.gen::<f64>() - 0.5) * 0.02,
                lng: ORIGIN.1 + (rng.gen::<f64>() - 0.5) * 0.02,
            }
        })
        .collect();

    comparables.sort_by(|a, b| a.distance.total_cmp(&b.distance));

    SearchResults {
        subject: SubjectProperty {
            address: address.to_string(),
            value: (base_value * 1.15).round(),
            lat: ORIGIN.0,
            lng: ORIGIN.1,
        },
        comparables,
        radius,
    }
}

#[async_trait]
pub trait ComparableSource: Send + Sync {
    async fn search(&self, query: &SearchQuery) -> Result<SearchResults>;
}

/// Stand-in for a real assessor lookup.
pub struct DemoSource {
    latency: Duration,
}

impl DemoSource {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

impl Default for DemoSource {
    fn default() -> Self {
        Self::new(DEFAULT_LATENCY)
    }
}

#[async_trait]
impl ComparableSource for DemoSource {
    async fn search(&self, query: &SearchQuery) -> Result<SearchResults> {
        tokio::time::sleep(self.latency).await;
        let mut rng = StdRng::from_entropy();
        Ok(generate_demo_comps(&mut rng, &query.address, query.radius))
    }
}

/// An in-flight search. Dropping it aborts the task.
pub struct PendingSearch {
    query: SearchQuery,
    result: oneshot::Receiver<Result<SearchResults>>,
    task: JoinHandle<()>,
}

impl PendingSearch {
    pub fn spawn(runtime: &Handle, source: Arc<dyn ComparableSource>, query: SearchQuery) -> Self {
        info!(address = %query.address, radius = query.radius, "comparable search started");
        let (tx, rx) = oneshot::channel();
        let task_query = query.clone();
        let task = runtime.spawn(async move {
            let outcome = source.search(&task_query).await;
            // The receiver is gone if the search was abandoned.
            let _ = tx.send(outcome);
        });
        Self {
            query,
            result: rx,
            task,
        }
    }

    pub fn query(&self) -> &SearchQuery {
        &self.query
    }

    /// Non-blocking check for the outcome.
    pub fn poll(&mut self) -> Option<Result<SearchResults>> {
        match self.result.try_recv() {
            Ok(outcome) => {
                match &outcome {
                    Ok(results) => info!(found = results.comparables.len(), "comparable search finished"),
                    Err(err) => warn!(%err, "comparable search failed"),
                }
                Some(outcome)
            }
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => {
                Some(Err(Error::Search("search ended without a result".to_string())))
            }
        }
    }

    pub fn cancel(self) {
        debug!(address = %self.query.address, "comparable search cancelled");
    }
}

impl Drop for PendingSearch {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    StronglyConsiderAppealing,
    AppealMayBeBeneficial,
    FairValuation,
}

impl Recommendation {
    pub fn headline(self) -> &'static str {
        match self {
            Recommendation::StronglyConsiderAppealing => "Strongly Consider Appealing",
            Recommendation::AppealMayBeBeneficial => "Appeal May Be Beneficial",
            Recommendation::FairValuation => "Fair Valuation",
        }
    }

    pub fn detail(self) -> &'static str {
        match self {
            Recommendation::StronglyConsiderAppealing => "Your property appears significantly overvalued.",
            Recommendation::AppealMayBeBeneficial => "Your property may be overvalued.",
            Recommendation::FairValuation => "Your valuation appears in line with comparables.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValuationSummary {
    pub subject_value: f64,
    pub average_value: f64,
    /// Subject minus average; positive means assessed above the neighbours.
    pub difference: f64,
    pub recommendation: Recommendation,
}

impl ValuationSummary {
    pub fn from_results(results: &SearchResults) -> Self {
        let count = results.comparables.len();
        let average_value = if count > 0 {
            results.comparables.iter().map(|c| c.value).sum::<f64>() / count as f64
        } else {
            0.0
        };
        let difference = results.subject.value - average_value;

        let recommendation = if difference > average_value * 0.15 {
            Recommendation::StronglyConsiderAppealing
        } else if difference > average_value * 0.05 {
            Recommendation::AppealMayBeBeneficial
        } else {
            Recommendation::FairValuation
        };

        Self {
            subject_value: results.subject.value,
            average_value,
            difference,
            recommendation,
        }
    }

    pub fn is_overvalued(&self) -> bool {
        self.difference > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comparable(value: f64, distance: f64) -> Comparable {
        Comparable {
            address: "1234 Oak St".to_string(),
            value,
            last_appeal: None,
            sqft: 1500,
            beds: 3,
            baths: 2,
            distance,
            lat: ORIGIN.0,
            lng: ORIGIN.1,
        }
    }

    fn results(subject: f64, values: &[f64]) -> SearchResults {
        SearchResults {
            subject: SubjectProperty {
                address: "100 Main St".to_string(),
                value: subject,
                lat: ORIGIN.0,
                lng: ORIGIN.1,
            },
            comparables: values.iter().map(|&v| comparable(v, 0.1)).collect(),
            radius: 0.5,
        }
    }

    #[test]
    fn empty_address_is_rejected() {
        assert!(matches!(SearchQuery::new("   ", 0.5), Err(Error::MissingAddress)));
        assert_eq!(SearchQuery::new(" 100 Main St ", 0.5).unwrap().address, "100 Main St");
    }

    #[test]
    fn recommendation_thresholds() {
        let strong = ValuationSummary::from_results(&results(120_000.0, &[100_000.0]));
        assert_eq!(strong.recommendation, Recommendation::StronglyConsiderAppealing);

        let maybe = ValuationSummary::from_results(&results(110_000.0, &[100_000.0]));
        assert_eq!(maybe.recommendation, Recommendation::AppealMayBeBeneficial);

        let fair = ValuationSummary::from_results(&results(104_000.0, &[100_000.0]));
        assert_eq!(fair.recommendation, Recommendation::FairValuation);
        assert!(fair.is_overvalued());
    }

    #[test]
    fn average_of_no_comparables_is_zero() {
        let summary = ValuationSummary::from_results(&results(100_000.0, &[]));
        assert_eq!(summary.average_value, 0.0);
    }

    #[test]
    fn last_appeal_label() {
        let mut comp = comparable(1.0, 0.0);
        assert_eq!(comp.last_appeal_label(), "None");
        comp.last_appeal = Some(2022);
        assert_eq!(comp.last_appeal_label(), "2022");
    }
}
