use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use rand::{rngs::StdRng, SeedableRng};
use taxcompare::comps::{
    generate_demo_comps, ComparableSource, DemoSource, PendingSearch, Recommendation, SearchQuery, SearchResults,
    ValuationSummary,
};
use taxcompare::Error;

// ===========================================================================
// Demo generator
// ===========================================================================

#[test]
fn test_demo_comps_shape() {
    for seed in 0..50 {
        let mut rng = StdRng::seed_from_u64(seed);
        let results = generate_demo_comps(&mut rng, "100 Main St", 0.5);

        assert!((5..=12).contains(&results.comparables.len()));
        assert_eq!(results.subject.address, "100 Main St");
        assert_eq!(results.radius, 0.5);
        assert!(results.subject.value >= 345_000.0 && results.subject.value <= 517_500.0);

        for pair in results.comparables.windows(2) {
            assert!(pair[0].distance <= pair[1].distance);
        }
        for comp in &results.comparables {
            assert!(comp.distance >= 0.0 && comp.distance <= 0.5);
            assert!((1200..2700).contains(&comp.sqft));
            assert!((2..=4).contains(&comp.beds));
            assert!((1..=2).contains(&comp.baths));
            if let Some(year) = comp.last_appeal {
                assert!((2020..=2024).contains(&year));
            }
        }
    }
}

#[test]
fn test_demo_subject_is_overvalued() {
    // Subject sits 15% above the base and comparables vary by less than 15%.
    for seed in 0..20 {
        let mut rng = StdRng::seed_from_u64(seed);
        let results = generate_demo_comps(&mut rng, "1 Elm Dr", 1.0);
        let summary = ValuationSummary::from_results(&results);
        assert!(summary.is_overvalued());
        assert!(summary.average_value > 0.0);
    }
}

#[test]
fn test_recommendation_for_fair_neighbourhood() {
    let mut rng = StdRng::seed_from_u64(3);
    let mut results = generate_demo_comps(&mut rng, "1 Elm Dr", 1.0);
    for comp in &mut results.comparables {
        comp.value = results.subject.value;
    }
    let summary = ValuationSummary::from_results(&results);
    assert_eq!(summary.recommendation, Recommendation::FairValuation);
    assert_eq!(summary.difference, 0.0);
}

// ===========================================================================
// Async search
// ===========================================================================

struct CountingSource {
    delay: Duration,
    calls: AtomicUsize,
    finished: Arc<AtomicBool>,
}

#[async_trait]
impl ComparableSource for CountingSource {
    async fn search(&self, query: &SearchQuery) -> taxcompare::Result<SearchResults> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.finished.store(true, Ordering::SeqCst);
        let mut rng = StdRng::seed_from_u64(1);
        Ok(generate_demo_comps(&mut rng, &query.address, query.radius))
    }
}

struct FailingSource;

#[async_trait]
impl ComparableSource for FailingSource {
    async fn search(&self, _query: &SearchQuery) -> taxcompare::Result<SearchResults> {
        Err(Error::Search("assessor offline".to_string()))
    }
}

async fn wait_for(pending: &mut PendingSearch) -> taxcompare::Result<SearchResults> {
    loop {
        if let Some(outcome) = pending.poll() {
            return outcome;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn test_demo_source_returns_results_for_query() {
    let source = DemoSource::new(Duration::from_millis(10));
    let query = SearchQuery::new("  742 Evergreen Ter ", 0.75).unwrap();
    let results = source.search(&query).await.unwrap();

    assert_eq!(results.subject.address, "742 Evergreen Ter");
    assert_eq!(results.radius, 0.75);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_pending_search_delivers_result() {
    let finished = Arc::new(AtomicBool::new(false));
    let source = Arc::new(CountingSource {
        delay: Duration::from_millis(20),
        calls: AtomicUsize::new(0),
        finished: finished.clone(),
    });
    let query = SearchQuery::new("100 Main St", 0.5).unwrap();
    let mut pending = PendingSearch::spawn(&tokio::runtime::Handle::current(), source.clone(), query);

    assert_eq!(pending.query().address, "100 Main St");
    let results = wait_for(&mut pending).await.unwrap();
    assert_eq!(results.subject.address, "100 Main St");
    assert!(finished.load(Ordering::SeqCst));
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancelled_search_never_completes() {
    let finished = Arc::new(AtomicBool::new(false));
    let source = Arc::new(CountingSource {
        delay: Duration::from_millis(200),
        calls: AtomicUsize::new(0),
        finished: finished.clone(),
    });
    let query = SearchQuery::new("100 Main St", 0.5).unwrap();
    let pending = PendingSearch::spawn(&tokio::runtime::Handle::current(), source, query);

    tokio::time::sleep(Duration::from_millis(20)).await;
    pending.cancel();
    tokio::time::sleep(Duration::from_millis(400)).await;

    assert!(!finished.load(Ordering::SeqCst));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failed_search_surfaces_error() {
    let query = SearchQuery::new("100 Main St", 0.5).unwrap();
    let mut pending = PendingSearch::spawn(&tokio::runtime::Handle::current(), Arc::new(FailingSource), query);

    let err = wait_for(&mut pending).await.unwrap_err();
    assert_eq!(err.to_string(), "Comparable search failed: assessor offline");
}
