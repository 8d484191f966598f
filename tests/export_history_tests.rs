use std::fs;

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use rand::{rngs::StdRng, SeedableRng};
use serde_json::json;
use taxcompare::comps::generate_demo_comps;
use taxcompare::export::{comps_csv, comps_report, schedule_csv, Exporter, COMPS_CSV_HEADER};
use taxcompare::history::{HistoryStore, HISTORY_LIMIT};
use taxcompare::loan::{LoanAnalysis, LoanParameters};

// ===========================================================================
// Exports
// ===========================================================================

#[test]
fn test_schedule_export_lands_in_output_dir() {
    let dir = tempfile::tempdir().unwrap();
    let exporter = Exporter::new(dir.path());
    let analysis = LoanAnalysis::compute(&LoanParameters::from_inputs("240000", "6.5", "30", "0"));

    let path = exporter.save(&schedule_csv(&analysis).unwrap()).unwrap();
    assert_eq!(path, dir.path().join("amortization-schedule.csv"));

    let text = fs::read_to_string(path).unwrap();
    // Header plus one line per month.
    assert_eq!(text.lines().count(), 361);
    assert!(text.lines().nth(1).unwrap().starts_with("1,1516.96,"));
}

#[test]
fn test_comparables_csv_puts_subject_first() {
    let mut rng = StdRng::seed_from_u64(9);
    let results = generate_demo_comps(&mut rng, "100 Main St", 0.5);
    let csv = comps_csv(&results).unwrap().contents;

    let mut reader = csv::Reader::from_reader(csv.as_bytes());
    let headers: Vec<String> = reader.headers().unwrap().iter().map(str::to_string).collect();
    assert_eq!(headers, COMPS_CSV_HEADER.map(str::to_string).to_vec());

    let records: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
    assert_eq!(records.len(), results.comparables.len() + 1);
    assert_eq!(&records[0][0], "100 Main St");
    assert_eq!(&records[0][2], "Your Property");
    assert_eq!(&records[0][6], "-");
    assert_eq!(&records[1][0], results.comparables[0].address.as_str());
}

#[test]
fn test_comparables_report_numbers_each_property() {
    let mut rng = StdRng::seed_from_u64(9);
    let results = generate_demo_comps(&mut rng, "100 Main St", 0.5);
    let date = NaiveDate::from_ymd_opt(2025, 11, 30).unwrap();
    let report = comps_report(&results, date).contents;

    assert!(report.contains("Generated: 11/30/2025"));
    assert!(report.contains(&"=".repeat(80)));
    assert!(report.contains("(OVERVALUED)"));
    for (n, comp) in results.comparables.iter().enumerate() {
        assert!(report.contains(&format!("{}. {}", n + 1, comp.address)));
    }
}

// ===========================================================================
// History
// ===========================================================================

#[test]
fn test_history_keeps_newest_ten() {
    let dir = tempfile::tempdir().unwrap();
    let store = HistoryStore::new(&dir.path().join("nested"));

    for i in 0..15 {
        store.save("loan", &json!({ "loan-amount": i.to_string() })).unwrap();
    }

    let entries = store.entries();
    assert_eq!(entries.len(), HISTORY_LIMIT);
    assert_eq!(entries[0].data, json!({ "loan-amount": "14" }));
    assert_eq!(entries[9].data, json!({ "loan-amount": "5" }));
    assert!(entries.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
}

#[test]
fn test_history_file_is_plain_json_array() {
    let dir = tempfile::tempdir().unwrap();
    let store = HistoryStore::new(dir.path());
    store.save("roi", &json!({ "purchase-price": "300000" })).unwrap();

    let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
    let array = raw.as_array().unwrap();
    assert_eq!(array.len(), 1);
    assert_eq!(array[0]["key"], "roi");
    assert!(array[0]["timestamp"].as_str().unwrap().contains('T'));
}
