//! CSV export and import of a project's task table.
//!
//! One row per task in display order. Predecessors use their comma string
//! (quoted), RACI lists are joined with `;`, and `-` marks an empty cell.
//! Import appends tasks to an existing project; rows that fail validation
//! are skipped and reported, never half-applied.

use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::db::{format_date, Database};
use crate::error::{CsvError, MilestoneError};
use crate::fields::{format_status, parse_status, SortKey, Status};
use crate::task::{Predecessors, Raci, Task, TaskDraft, TaskNo};

pub const HEADER: &str = "TaskNo,Milestone,Name,Duration,Predecessor,Start,End,ManualStart,ManualEnd,ActualStart,ActualEnd,Excluded,Progress,Status,Responsible,Accountable,Consulted,Informed";

const COLUMNS: usize = 18;

/// Escape a field that contains a separator, quote or newline.
fn escape_csv(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn or_dash(s: &str) -> &str {
    if s.is_empty() {
        "-"
    } else {
        s
    }
}

fn row(task: &Task) -> String {
    let preds = task.predecessor.to_string();
    let fields = [
        task.task_no.to_string(),
        task.milestone.clone(),
        task.name.clone(),
        task.duration.to_string(),
        or_dash(&preds).to_string(),
        format_date(task.start_date),
        format_date(task.end_date),
        task.manual_start.to_string(),
        task.manual_end.to_string(),
        format_date(task.actual_start),
        format_date(task.actual_end),
        task.excluded.to_string(),
        task.progress.to_string(),
        format_status(task.status).to_string(),
        or_dash(&task.raci.responsible.join(";")).to_string(),
        or_dash(task.raci.accountable.as_deref().unwrap_or("")).to_string(),
        or_dash(&task.raci.consulted.join(";")).to_string(),
        or_dash(&task.raci.informed.join(";")).to_string(),
    ];
    fields
        .iter()
        .map(|f| escape_csv(f))
        .collect::<Vec<_>>()
        .join(",")
}

/// Render every task of the project as CSV text.
pub fn export_tasks(db: &Database) -> String {
    let mut out = String::new();
    out.push_str(HEADER);
    out.push('\n');
    for task in db.sorted_tasks(SortKey::No) {
        out.push_str(&row(task));
        out.push('\n');
    }
    out
}

/// Write the CSV export to `path`. Returns the number of rows.
pub fn write_csv(db: &Database, path: &Path) -> Result<usize, CsvError> {
    fs::write(path, export_tasks(db))?;
    Ok(db.tasks.len())
}

/// Split one CSV line, honouring quotes and doubled-quote escapes.
fn parse_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                if in_quotes && chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = !in_quotes;
                }
            }
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    fields.push(current);
    fields
}

/// Split CSV text into records with the line each one starts on. A line
/// break inside a quoted field belongs to the field.
fn split_records(content: &str) -> Vec<(usize, String)> {
    let mut records = Vec::new();
    let mut current = String::new();
    let mut start_line = 1;
    let mut line = 1;
    let mut in_quotes = false;

    for ch in content.chars() {
        match ch {
            '"' => {
                // A doubled quote toggles twice and leaves the state as it was.
                in_quotes = !in_quotes;
                current.push(ch);
            }
            '\n' => {
                line += 1;
                if in_quotes {
                    current.push(ch);
                } else {
                    if current.ends_with('\r') {
                        current.pop();
                    }
                    records.push((start_line, std::mem::take(&mut current)));
                    start_line = line;
                }
            }
            _ => current.push(ch),
        }
    }
    if !current.is_empty() {
        records.push((start_line, current));
    }
    records
}

/// Result of an import: how many rows landed and why the others did not.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: Vec<(usize, String)>,
}

fn cell(s: &str) -> Option<&str> {
    let s = s.trim();
    if s.is_empty() || s == "-" {
        None
    } else {
        Some(s)
    }
}

fn parse_date_cell(s: &str) -> Result<Option<NaiveDate>, String> {
    cell(s)
        .map(|raw| NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| format!("invalid date '{}'", raw)))
        .transpose()
}

fn parse_bool_cell(s: &str) -> bool {
    matches!(s.trim().to_lowercase().as_str(), "true" | "yes" | "1" | "y")
}

fn parse_people(s: &str) -> Vec<String> {
    cell(s)
        .map(|raw| {
            raw.split(';')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

/// Parsed row, ready to be added to the database.
struct ImportRow {
    draft: TaskDraft,
    actual_start: Option<NaiveDate>,
    actual_end: Option<NaiveDate>,
    progress: u8,
    status: Status,
}

fn parse_row(fields: &[String]) -> Result<ImportRow, String> {
    if fields.len() != COLUMNS {
        return Err(format!("{} fields, expected {}", fields.len(), COLUMNS));
    }
    let task_no: TaskNo = fields[0].parse().map_err(|e| format!("{}", e))?;
    let milestone = cell(&fields[1]).ok_or("empty milestone")?;
    let name = cell(&fields[2]).ok_or("empty name")?;
    let duration: u32 = fields[3]
        .trim()
        .parse()
        .map_err(|_| format!("invalid duration '{}'", fields[3]))?;
    let predecessor: Predecessors = cell(&fields[4])
        .unwrap_or("")
        .parse()
        .map_err(|e| format!("{}", e))?;
    let progress: u8 = cell(&fields[12])
        .unwrap_or("0")
        .parse()
        .map_err(|_| format!("invalid progress '{}'", fields[12]))?;
    if progress > 100 {
        return Err(format!("progress {} above 100", progress));
    }
    if duration < 1 {
        return Err("duration must be at least 1".to_string());
    }
    if predecessor.contains(&task_no) {
        return Err(format!("task {} depends on itself", task_no));
    }

    let mut draft = TaskDraft::new(milestone, name, duration).with_no(task_no);
    draft.predecessor = predecessor;
    draft.start_date = parse_date_cell(&fields[5])?;
    draft.end_date = parse_date_cell(&fields[6])?;
    draft.manual_start = parse_bool_cell(&fields[7]);
    draft.manual_end = parse_bool_cell(&fields[8]);
    draft.excluded = parse_bool_cell(&fields[11]);
    draft.raci = Raci {
        responsible: parse_people(&fields[14]),
        accountable: cell(&fields[15]).map(String::from),
        consulted: parse_people(&fields[16]),
        informed: parse_people(&fields[17]),
    };

    Ok(ImportRow {
        draft,
        actual_start: parse_date_cell(&fields[9])?,
        actual_end: parse_date_cell(&fields[10])?,
        progress,
        status: parse_status(&fields[13]),
    })
}

/// Import CSV text into `db`. Unknown milestones are created; rows whose
/// task number already exists are skipped.
pub fn import_tasks(db: &mut Database, content: &str) -> Result<ImportReport, CsvError> {
    let mut records = split_records(content).into_iter();
    let (_, header) = records.next().ok_or(CsvError::Empty)?;
    if header.trim_start_matches('\u{feff}').trim() != HEADER {
        return Err(CsvError::Header {
            expected: HEADER.to_string(),
            found: header,
        });
    }

    let mut report = ImportReport::default();
    for (line_num, record) in records {
        if record.trim().is_empty() {
            continue;
        }
        let parsed = match parse_row(&parse_csv_line(&record)) {
            Ok(parsed) => parsed,
            Err(reason) => {
                warn!(line = line_num, %reason, "skipping CSV row");
                report.skipped.push((line_num, reason));
                continue;
            }
        };

        if let Some(no) = parsed.draft.task_no.filter(|no| db.find_by_no(*no).is_some()) {
            let reason = format!("task number {} is already in use", no);
            warn!(line = line_num, %reason, "skipping CSV row");
            report.skipped.push((line_num, reason));
            continue;
        }
        match db.add_milestone(&parsed.draft.milestone) {
            Ok(()) | Err(MilestoneError::Exists(_)) => {}
            Err(e) => {
                report.skipped.push((line_num, e.to_string()));
                continue;
            }
        }
        let id = match db.add_task(parsed.draft, None) {
            Ok(id) => id,
            Err(e) => {
                warn!(line = line_num, error = %e, "skipping CSV row");
                report.skipped.push((line_num, e.to_string()));
                continue;
            }
        };
        if let Some(task) = db.get_mut(id) {
            task.actual_start = parsed.actual_start;
            task.actual_end = parsed.actual_end;
            task.progress = parsed.progress;
            task.status = parsed.status;
        }
        report.imported += 1;
    }
    info!(imported = report.imported, skipped = report.skipped.len(), "CSV import finished");
    Ok(report)
}

/// Read and import a CSV file.
pub fn read_csv(db: &mut Database, path: &Path) -> Result<ImportReport, CsvError> {
    let content = fs::read_to_string(path)?;
    import_tasks(db, &content)
}
