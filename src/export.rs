//! CSV and plain-text reports for each tool, written to the output directory.

use std::{
    fmt::Write as _,
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use tracing::info;

use crate::{
    comps::{SearchResults, ValuationSummary},
    error::{Error, Result},
    format::currency,
    loan::{AmortizationRow, LoanAnalysis},
    roi::RoiAnalysis,
};

pub const SCHEDULE_CSV_HEADER: [&str; 5] = ["Month", "Payment", "Principal", "Interest", "Balance"];

pub const COMPS_CSV_HEADER: [&str; 7] = [
    "Address",
    "Taxable Value",
    "Last Appeal",
    "Home Size (sqft)",
    "Beds",
    "Baths",
    "Distance (mi)",
];

/// A file ready to be written out.
#[derive(Debug, Clone, PartialEq)]
pub struct Download {
    pub filename: &'static str,
    pub contents: String,
}

fn rule(width: usize) -> String {
    "=".repeat(width)
}

fn generated(date: NaiveDate) -> String {
    format!("Generated: {}", date.format("%-m/%-d/%Y"))
}

fn into_string(bytes: Vec<u8>) -> String {
    String::from_utf8_lossy(&bytes).into_owned()
}

pub fn write_schedule_csv<W: Write>(writer: W, schedule: &[AmortizationRow]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(SCHEDULE_CSV_HEADER)?;
    for row in schedule {
        wtr.write_record([
            row.month.to_string(),
            format!("{:.2}", row.payment),
            format!("{:.2}", row.principal),
            format!("{:.2}", row.interest),
            format!("{:.2}", row.balance),
        ])?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

pub fn schedule_csv(analysis: &LoanAnalysis) -> Result<Download> {
    let mut bytes = Vec::new();
    write_schedule_csv(&mut bytes, analysis.schedule())?;
    Ok(Download {
        filename: "amortization-schedule.csv",
        contents: into_string(bytes),
    })
}

pub fn loan_report(analysis: &LoanAnalysis, date: NaiveDate) -> Download {
    let p = &analysis.params;
    let saved = analysis.months_saved();
    let mut out = String::new();

    let _ = writeln!(out, "LOAN AMORTIZATION REPORT");
    let _ = writeln!(out, "{}", generated(date));
    let _ = writeln!(out);
    let _ = writeln!(out, "{}\nLOAN DETAILS\n{}", rule(50), rule(50));
    let _ = writeln!(out, "Loan Amount: {}", currency(p.principal));
    let _ = writeln!(out, "Interest Rate: {}%", p.annual_rate_percent);
    let _ = writeln!(out, "Loan Term: {} years", p.term_years);
    let _ = writeln!(out, "Extra Monthly Payment: {}", currency(p.extra_monthly_payment));
    let _ = writeln!(out);
    let _ = writeln!(out, "{}\nRESULTS\n{}", rule(50), rule(50));
    let _ = writeln!(out, "Monthly Payment: {}", currency(analysis.total_monthly_payment()));
    let _ = writeln!(out, "Total Interest: {}", currency(analysis.accelerated_summary.total_interest));
    let _ = writeln!(out, "Interest Savings: {}", currency(analysis.interest_savings()));
    let _ = writeln!(out, "Time Saved: {} years {} months", saved / 12, saved % 12);
    let _ = writeln!(out, "Payoff Time: {:.1} years", analysis.accelerated_years());
    let _ = writeln!(out);
    let _ = writeln!(out, "{}\nCOMPARISON\n{}", rule(50), rule(50));
    let _ = writeln!(
        out,
        "Standard Payoff: {} months ({:.1} years)",
        analysis.standard_summary.payoff_months,
        analysis.standard_years()
    );
    let _ = writeln!(out, "With Extra Payments: {} months", analysis.accelerated_summary.payoff_months);

    Download {
        filename: "loan-analysis-report.txt",
        contents: out,
    }
}

pub fn roi_csv(roi: &RoiAnalysis) -> Result<Download> {
    let i = &roi.inputs;
    let break_even = roi
        .break_even_rent
        .map(|v| v.to_string())
        .unwrap_or_else(|| "N/A".to_string());

    let rows: [(&str, String); 15] = [
        ("Purchase Price", i.purchase_price.to_string()),
        ("Down Payment", roi.down_payment.to_string()),
        ("Closing Costs", i.closing_costs.to_string()),
        ("Rehab Costs", i.rehab_costs.to_string()),
        ("Total Cash Invested", roi.total_cash_invested.to_string()),
        ("Monthly Rent", i.monthly_rent.to_string()),
        ("Vacancy Rate", format!("{}%", i.vacancy_percent)),
        ("Monthly Expenses", i.monthly_expenses.to_string()),
        ("Mortgage Payment", i.mortgage_payment.to_string()),
        ("Net Operating Income (Annual)", roi.noi.to_string()),
        ("Annual Cash Flow", roi.annual_cash_flow.to_string()),
        ("Monthly Cash Flow", roi.monthly_cash_flow.to_string()),
        ("CAP Rate", format!("{:.2}%", roi.cap_rate)),
        ("Cash on Cash Return", format!("{:.2}%", roi.cash_on_cash)),
        ("Break-Even Rent", break_even),
    ];

    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(["Metric", "Value"])?;
    for (metric, value) in &rows {
        wtr.write_record([*metric, value.as_str()])?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;

    Ok(Download {
        filename: "roi-analysis.csv",
        contents: into_string(bytes),
    })
}

pub fn roi_report(roi: &RoiAnalysis, date: NaiveDate) -> Download {
    let i = &roi.inputs;
    let break_even = roi
        .break_even_rent
        .map(currency)
        .unwrap_or_else(|| "N/A".to_string());
    let mut out = String::new();

    let _ = writeln!(out, "REAL ESTATE ROI ANALYSIS REPORT");
    let _ = writeln!(out, "{}", generated(date));
    let _ = writeln!(out);
    let _ = writeln!(out, "{}\nPROPERTY DETAILS\n{}", rule(50), rule(50));
    let _ = writeln!(out, "Purchase Price: {}", currency(i.purchase_price));
    let _ = writeln!(out, "Down Payment: {}", currency(roi.down_payment));
    let _ = writeln!(out, "Closing Costs: {}", currency(i.closing_costs));
    let _ = writeln!(out, "Rehab Costs: {}", currency(i.rehab_costs));
    let _ = writeln!(out, "Total Cash Invested: {}", currency(roi.total_cash_invested));
    let _ = writeln!(out);
    let _ = writeln!(out, "{}\nINCOME & EXPENSES\n{}", rule(50), rule(50));
    let _ = writeln!(out, "Monthly Rent: {}", currency(i.monthly_rent));
    let _ = writeln!(out, "Vacancy Rate: {}%", i.vacancy_percent);
    let _ = writeln!(out, "Monthly Operating Expenses: {}", currency(i.monthly_expenses));
    let _ = writeln!(out, "Monthly Mortgage Payment: {}", currency(i.mortgage_payment));
    let _ = writeln!(out);
    let _ = writeln!(out, "{}\nKEY METRICS\n{}", rule(50), rule(50));
    let _ = writeln!(out, "Net Operating Income (NOI): {}/year", currency(roi.noi));
    let _ = writeln!(out, "CAP Rate: {:.2}%", roi.cap_rate);
    let _ = writeln!(out, "Cash on Cash Return: {:.2}%", roi.cash_on_cash);
    let _ = writeln!(out, "Annual Cash Flow: {}", currency(roi.annual_cash_flow));
    let _ = writeln!(out, "Monthly Cash Flow: {}", currency(roi.monthly_cash_flow));
    let _ = writeln!(out, "Break-Even Rent: {break_even}/month");
    let _ = writeln!(out);
    let _ = writeln!(out, "{}\nRECOMMENDATION\n{}", rule(50), rule(50));
    let _ = writeln!(out, "{}", roi.recommendation());

    Download {
        filename: "roi-analysis-report.txt",
        contents: out,
    }
}

pub fn comps_csv(results: &SearchResults) -> Result<Download> {
    let subject_value = results.subject.value.to_string();
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(COMPS_CSV_HEADER)?;
    wtr.write_record([
        results.subject.address.as_str(),
        subject_value.as_str(),
        "Your Property",
        "-",
        "-",
        "-",
        "-",
    ])?;
    for c in &results.comparables {
        wtr.write_record([
            c.address.clone(),
            c.value.to_string(),
            c.last_appeal_label(),
            c.sqft.to_string(),
            c.beds.to_string(),
            c.baths.to_string(),
            format!("{:.2}", c.distance),
        ])?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;

    Ok(Download {
        filename: "property-comparables.csv",
        contents: into_string(bytes),
    })
}

pub fn comps_report(results: &SearchResults, date: NaiveDate) -> Download {
    let summary = ValuationSummary::from_results(results);
    let verdict = if summary.is_overvalued() { "OVERVALUED" } else { "FAIR" };
    let mut out = String::new();

    let _ = writeln!(out, "PROPERTY TAX COMPARISON REPORT");
    let _ = writeln!(out, "{}", generated(date));
    let _ = writeln!(out);
    let _ = writeln!(out, "YOUR PROPERTY");
    let _ = writeln!(out, "Address: {}", results.subject.address);
    let _ = writeln!(out, "Taxable Value: {}", currency(results.subject.value));
    let _ = writeln!(out);
    let _ = writeln!(out, "ANALYSIS SUMMARY");
    let _ = writeln!(out, "Average Comparable Value: {}", currency(summary.average_value));
    let _ = writeln!(out, "Difference: {} ({verdict})", currency(summary.difference));
    let _ = writeln!(out);
    let _ = writeln!(out, "COMPARABLE PROPERTIES ({} found)", results.comparables.len());
    let _ = writeln!(out, "{}", rule(80));
    for (n, c) in results.comparables.iter().enumerate() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}. {}", n + 1, c.address);
        let _ = writeln!(
            out,
            "   Value: {} | Size: {} sqft | Beds: {} | Baths: {} | Distance: {:.2} mi",
            currency(c.value),
            c.sqft,
            c.beds,
            c.baths,
            c.distance
        );
    }

    Download {
        filename: "property-tax-report.txt",
        contents: out,
    }
}

/// Writes downloads into a directory, creating it on first use.
#[derive(Debug, Clone)]
pub struct Exporter {
    output_dir: PathBuf,
}

impl Exporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn save(&self, download: &Download) -> Result<PathBuf> {
        let path = self.output_dir.join(download.filename);
        fs::create_dir_all(&self.output_dir).map_err(|source| Error::ExportIo {
            path: self.output_dir.clone(),
            source,
        })?;
        fs::write(&path, &download.contents).map_err(|source| Error::ExportIo {
            path: path.clone(),
            source,
        })?;
        info!(path = %path.display(), bytes = download.contents.len(), "export written");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loan::LoanParameters;
    use crate::roi::{analyze, RoiInputs};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 7).unwrap()
    }

    #[test]
    fn schedule_csv_has_fixed_header() {
        let analysis = LoanAnalysis::compute(&LoanParameters {
            principal: 1200.0,
            annual_rate_percent: 0.0,
            term_years: 1,
            extra_monthly_payment: 0.0,
        });
        let csv = schedule_csv(&analysis).unwrap().contents;
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("Month,Payment,Principal,Interest,Balance"));
        assert_eq!(lines.next(), Some("1,100.00,100.00,0.00,1100.00"));
        assert_eq!(csv.lines().count(), 13);
        assert_eq!(csv.lines().last(), Some("12,100.00,100.00,0.00,0.00"));
    }

    #[test]
    fn loan_report_lists_comparison() {
        let analysis = LoanAnalysis::compute(&LoanParameters {
            principal: 240_000.0,
            annual_rate_percent: 6.5,
            term_years: 30,
            extra_monthly_payment: 200.0,
        });
        let report = loan_report(&analysis, date()).contents;
        assert!(report.starts_with("LOAN AMORTIZATION REPORT\nGenerated: 3/7/2024\n"));
        assert!(report.contains("Interest Rate: 6.5%"));
        assert!(report.contains("Standard Payoff: 360 months (30.0 years)"));
        assert!(report.contains(&"=".repeat(50)));
    }

    #[test]
    fn roi_csv_rows_in_order() {
        let roi = analyze(&RoiInputs {
            purchase_price: 300_000.0,
            down_payment_percent: 20.0,
            closing_costs: 6000.0,
            rehab_costs: 0.0,
            monthly_rent: 2000.0,
            vacancy_percent: 0.0,
            monthly_expenses: 500.0,
            mortgage_payment: 1000.0,
        });
        let csv = roi_csv(&roi).unwrap().contents;
        let metrics: Vec<&str> = csv.lines().map(|l| l.split(',').next().unwrap_or("")).collect();
        assert_eq!(metrics[0], "Metric");
        assert_eq!(metrics[1], "Purchase Price");
        assert_eq!(metrics[15], "Break-Even Rent");
        assert!(csv.contains("Purchase Price,300000\n"));
        assert!(csv.contains("CAP Rate,6.00%\n"));
        assert!(csv.contains("Break-Even Rent,1500\n"));
    }

    #[test]
    fn roi_report_ends_with_recommendation() {
        let roi = analyze(&RoiInputs::default());
        let report = roi_report(&roi, date()).contents;
        assert!(report.trim_end().ends_with("WEAK INVESTMENT - Review pricing and expenses carefully."));
    }

    #[test]
    fn exporter_writes_into_directory() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(dir.path().join("out"));
        let path = exporter
            .save(&Download {
                filename: "x.txt",
                contents: "hello".to_string(),
            })
            .unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "hello");
    }
}
