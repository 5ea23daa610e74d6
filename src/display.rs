use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::schedule::batch::{BatchOutcome, BatchResult};
use crate::schedule::date_utils::display_date;
use crate::schedule::{CleaningGroup, PersonId, Program, Roster};

/// Formats a person as "Full Name (#id)", or just the id when unknown
pub fn format_person(roster: &Roster, person_id: PersonId) -> String {
    match roster.get(person_id) {
        Some(person) => format!("{} (#{})", person.full_name, person_id),
        None => format!("#{person_id}"),
    }
}

/// One line per slot: "Role [n] -> Person" or "[UNFILLED]"
pub fn program_lines(program: &Program, roster: &Roster) -> Vec<String> {
    program
        .assignments
        .iter()
        .map(|a| {
            let role = if program.assignments.iter().filter(|o| o.role == a.role).count() > 1 {
                format!("{} {}", a.role, a.slot + 1)
            } else {
                a.role.clone()
            };
            match a.person_id {
                Some(id) => format!("{role} -> {}", format_person(roster, id)),
                None => {
                    let reason = program
                        .unfilled
                        .iter()
                        .find(|u| u.role == a.role && u.slot == a.slot)
                        .map(|u| u.reason.as_str())
                        .unwrap_or("unfilled");
                    format!("{role} -> [UNFILLED: {reason}]")
                }
            }
        })
        .collect()
}

/// Prints a single program in a readable format
pub fn print_program(program: &Program, roster: &Roster) {
    println!(
        "\n=== {} {} ({:?}) ===",
        program.activity_type_id,
        display_date(program.date),
        program.status
    );
    println!("Program id: {}", program.id);
    for line in program_lines(program, roster) {
        println!("  {line}");
    }
    if !program.unfilled.is_empty() {
        println!("⚠️  {} role(s) need attention", program.unfilled.len());
    }
}

/// Batch review text: per target a ready draft, a flagged draft or a failure
pub fn batch_review_lines(result: &BatchResult, roster: &Roster) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, entry) in result.entries.iter().enumerate() {
        match &entry.outcome {
            BatchOutcome::DraftProgram { program } => {
                let status = if program.unfilled.is_empty() {
                    "READY".to_string()
                } else {
                    format!("FLAGGED ({} unfilled)", program.unfilled.len())
                };
                lines.push(format!(
                    "{}. {} {} - {} [{}]",
                    i + 1,
                    entry.activity_type_id,
                    display_date(program.date),
                    status,
                    program.id
                ));
                for line in program_lines(program, roster) {
                    lines.push(format!("     {line}"));
                }
            }
            BatchOutcome::Failure { reason, .. } => {
                lines.push(format!(
                    "{}. {} {} - FAILED: {}",
                    i + 1,
                    entry.activity_type_id,
                    entry.date,
                    reason
                ));
            }
        }
    }
    lines
}

pub fn print_batch_review(result: &BatchResult, roster: &Roster) {
    println!("\n=== Batch Review ===");
    println!(
        "Targets: {}, flagged: {}, failed: {}",
        result.len(),
        result.flagged(),
        result.failures()
    );
    for line in batch_review_lines(result, roster) {
        println!("{line}");
    }
}

/// Writes the batch review to a text file
pub fn write_batch_review_to_file<P: AsRef<Path>>(
    result: &BatchResult,
    roster: &Roster,
    path: P,
) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    writeln!(file, "** Batch Review **")?;
    for line in batch_review_lines(result, roster) {
        writeln!(file, "{line}")?;
    }
    Ok(())
}

pub fn print_groups(groups: &[CleaningGroup], roster: &Roster) {
    println!("\n=== Work Groups ===");
    for group in groups {
        let last = group
            .last_assigned_date
            .map(display_date)
            .unwrap_or_else(|| "never".to_string());
        println!(
            "Group {} ({} members, last turn: {})",
            group.id,
            group.members.len(),
            last
        );
        for &member in &group.members {
            println!("  - {}", format_person(roster, member));
        }
    }
}
