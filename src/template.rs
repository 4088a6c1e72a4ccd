//! Built-in APQP product development template.
//!
//! Eight milestones and 43 chained tasks covering concept design through mass
//! production preparation. Each entry carries an explicit task number, a
//! duration in working days, the accountable role and its predecessor.

use crate::db::Database;
use crate::error::TaskError;
use crate::task::{Raci, TaskDraft, TaskNo};

pub const MILESTONES: [&str; 8] = [
    "Concept Design",
    "Supplier Quotation",
    "Review",
    "Finalization",
    "Design Freeze",
    "Tooling Samples",
    "Validation Testing",
    "Mass Production Prep",
];

/// (milestone index, task number, name, duration, accountable, predecessor)
type Row = (usize, TaskNo, &'static str, u32, &'static str, Option<TaskNo>);

const fn n(major: u32, minor: u32) -> TaskNo {
    TaskNo::new(major, minor)
}

const TASKS: [Row; 43] = [
    (0, n(1, 1), "Requirements review and project kickoff", 2, "Project Manager", None),
    (0, n(1, 2), "Design ideation (#1 of 3)", 5, "Design Engineer", Some(n(1, 1))),
    (0, n(1, 3), "Team evaluates design ideas (#1 of 3)", 1, "Design Team", Some(n(1, 2))),
    (0, n(1, 4), "Build and evaluate concept models", 4, "Design Engineer", Some(n(1, 3))),
    (0, n(1, 5), "Initial design (#2 of 3)", 5, "Design Engineer", Some(n(1, 4))),
    (0, n(1, 6), "Team evaluates design ideas (#2 of 3)", 1, "Design Team", Some(n(1, 5))),
    (0, n(1, 7), "User research and customer confirmation", 5, "Marketing", Some(n(1, 6))),
    (0, n(1, 8), "Build 3D evaluation model", 5, "Design Engineer", Some(n(1, 7))),
    (0, n(1, 9), "Full team design evaluation", 1, "Design Team", Some(n(1, 8))),
    (1, n(2, 1), "Create product specification", 1, "Design Engineer", Some(n(1, 9))),
    (1, n(2, 2), "Select key component suppliers", 3, "Purchasing", Some(n(2, 1))),
    (1, n(2, 3), "Product quotation", 5, "Cost Engineer", Some(n(2, 2))),
    (1, n(2, 4), "Customer approval of quotation", 5, "Marketing", Some(n(2, 3))),
    (1, n(2, 5), "Second quotation round (if needed)", 5, "Cost Engineer", Some(n(2, 4))),
    (2, n(3, 1), "Prepare design review 1", 1, "Project Manager", Some(n(2, 5))),
    (2, n(3, 2), "Design review 1", 1, "Design Team", Some(n(3, 1))),
    (3, n(4, 1), "Final design intent (#3 of 3)", 5, "Design Engineer", Some(n(3, 2))),
    (3, n(4, 2), "Team evaluates design intent (#3 of 3)", 1, "Design Team", Some(n(4, 1))),
    (4, n(5, 1), "Create product CAD drawings", 10, "Design Engineer", Some(n(4, 2))),
    (4, n(5, 2), "Create bill of materials", 3, "Design Engineer", Some(n(5, 1))),
    (4, n(5, 3), "Build functional sample 1", 10, "Sample Shop", Some(n(5, 2))),
    (4, n(5, 4), "Test and evaluate functional sample 1", 5, "Test Engineer", Some(n(5, 3))),
    (4, n(5, 5), "DFMEA", 5, "Quality Engineer", Some(n(5, 4))),
    (4, n(5, 6), "Test plan", 3, "Test Engineer", Some(n(5, 5))),
    (4, n(5, 7), "Prepare design review 2", 1, "Project Manager", Some(n(5, 6))),
    (4, n(5, 8), "Design review 2", 1, "Design Team", Some(n(5, 7))),
    (5, n(6, 1), "Receive customer tooling order", 1, "Marketing", Some(n(5, 8))),
    (5, n(6, 2), "Build tooling", 30, "Tooling Supplier", Some(n(6, 1))),
    (5, n(6, 3), "Assemble first-shot samples", 3, "Sample Shop", Some(n(6, 2))),
    (5, n(6, 4), "Test first-shot samples", 5, "Test Engineer", Some(n(6, 3))),
    (5, n(6, 5), "Tooling modification", 10, "Tooling Supplier", Some(n(6, 4))),
    (5, n(6, 6), "Assemble engineering build samples", 5, "Sample Shop", Some(n(6, 5))),
    (5, n(6, 7), "Test engineering build samples", 5, "Test Engineer", Some(n(6, 6))),
    (6, n(7, 1), "Life testing", 20, "Test Engineer", Some(n(6, 7))),
    (6, n(8, 1), "Certification testing", 15, "Certification Body", Some(n(7, 1))),
    (6, n(9, 1), "Field testing", 30, "Customer", Some(n(8, 1))),
    (7, n(10, 1), "Packaging design", 5, "Packaging Engineer", Some(n(9, 1))),
    (7, n(10, 2), "Packaging transport test", 3, "Test Engineer", Some(n(10, 1))),
    (7, n(11, 1), "Second patent review", 2, "Legal", Some(n(10, 2))),
    (7, n(12, 1), "Design review 3", 1, "Design Team", Some(n(11, 1))),
    (7, n(13, 1), "Create PPAP documents", 10, "Quality Engineer", Some(n(12, 1))),
    (7, n(13, 2), "Create quality control plan", 5, "Quality Engineer", Some(n(13, 1))),
    (7, n(13, 3), "Create production work instructions", 5, "Process Engineer", Some(n(13, 2))),
];

pub fn builtin_milestones() -> Vec<String> {
    MILESTONES.iter().map(|m| m.to_string()).collect()
}

/// Drafts for every template task, in template order.
pub fn builtin_tasks() -> Vec<TaskDraft> {
    TASKS
        .iter()
        .map(|&(milestone, no, name, duration, accountable, predecessor)| {
            let mut draft = TaskDraft::new(MILESTONES[milestone], name, duration).with_no(no);
            if let Some(pred) = predecessor {
                draft = draft.after(&[pred]);
            }
            draft.raci = Raci {
                accountable: Some(accountable.to_string()),
                ..Raci::default()
            };
            draft
        })
        .collect()
}

/// Fill a project with the template, adding any missing milestones first.
pub fn apply_builtin(db: &mut Database) -> Result<usize, TaskError> {
    for milestone in MILESTONES {
        if !db.milestones.iter().any(|m| m == milestone) {
            db.milestones.push(milestone.to_string());
        }
    }
    let drafts = builtin_tasks();
    let count = drafts.len();
    for draft in drafts {
        db.add_task(draft, None)?;
    }
    Ok(count)
}
