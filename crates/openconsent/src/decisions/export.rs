use std::io::Write;

use chrono::NaiveDate;

use super::domain::Decision;

/// Suggested download name for the full export.
pub const EXPORT_FILENAME: &str = "openconsent_decision.csv";

/// Header row, in column order.
pub const CSV_COLUMNS: [&str; 10] = [
    "id",
    "short_name",
    "description",
    "status",
    "created_date",
    "decided_date",
    "effective_date",
    "review_date",
    "expiry_date",
    "archived_date",
];

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to write csv record: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush csv output: {0}")]
    Io(#[from] std::io::Error),
}

/// Write every decision as one CSV row, ordered by ascending id.
pub fn write_csv<W: Write>(writer: W, decisions: &[Decision]) -> Result<W, ExportError> {
    let mut ordered: Vec<&Decision> = decisions.iter().collect();
    ordered.sort_by_key(|decision| decision.id);

    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(CSV_COLUMNS)?;

    for decision in ordered {
        csv.write_record(row(decision))?;
    }

    csv.flush()?;
    csv.into_inner().map_err(|error| error.into_error().into())
}

/// The whole export as bytes, ready to be sent as an attachment.
pub fn export_csv(decisions: &[Decision]) -> Result<Vec<u8>, ExportError> {
    write_csv(Vec::new(), decisions)
}

fn row(decision: &Decision) -> [String; 10] {
    [
        decision
            .id
            .map(|id| id.to_string())
            .unwrap_or_default(),
        decision.short_name.clone(),
        decision.description.clone(),
        decision.status.label().to_string(),
        date_cell(decision.created_date),
        date_cell(decision.decided_date),
        date_cell(decision.effective_date),
        date_cell(decision.review_date),
        date_cell(decision.expiry_date),
        date_cell(decision.archived_date),
    ]
}

fn date_cell(date: Option<NaiveDate>) -> String {
    date.map(|value| value.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}
