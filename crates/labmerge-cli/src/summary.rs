use std::path::PathBuf;

use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use labmerge_cli::types::MergeResult;
use labmerge_model::{LabConcordance, VerificationStatus};

pub fn print_summary(result: &MergeResult) {
    if result.dry_run {
        println!("Dry run: no files written");
    } else {
        println!("Output: {}", result.output_dir.display());
    }
    print_output_line("Merged table", result.outputs.merged.as_ref());
    print_output_line("Unconfirmed report", result.outputs.unconfirmed.as_ref());
    print_output_line("Lab concordance", result.outputs.lab_concordance.as_ref());
    print_output_line("Run summary", result.outputs.report.as_ref());

    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Lab"),
        header_cell("Trial"),
        header_cell("Participant"),
        header_cell("Trial only"),
        header_cell("Participant only"),
        header_cell("Confirmed"),
        header_cell("Concordant"),
    ]);
    apply_summary_table_style(&mut table);
    for index in 1..=5 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    align_column(&mut table, 6, CellAlignment::Center);

    let mut totals = LabConcordance {
        lab: String::new(),
        trial_participants: 0,
        participant_participants: 0,
        trial_only: 0,
        participant_only: 0,
        confirmed: 0,
        concordant: true,
    };
    for row in &result.lab_summary {
        totals.trial_participants += row.trial_participants;
        totals.participant_participants += row.participant_participants;
        totals.trial_only += row.trial_only;
        totals.participant_only += row.participant_only;
        totals.confirmed += row.confirmed;
        totals.concordant &= row.concordant;
        table.add_row(vec![
            lab_cell(&row.lab),
            Cell::new(row.trial_participants),
            Cell::new(row.participant_participants),
            count_cell(row.trial_only, Color::Yellow),
            count_cell(row.participant_only, Color::Yellow),
            count_cell(row.confirmed, Color::Green),
            concordant_cell(row.concordant),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(totals.trial_participants).add_attribute(Attribute::Bold),
        Cell::new(totals.participant_participants).add_attribute(Attribute::Bold),
        count_cell(totals.trial_only, Color::Yellow).add_attribute(Attribute::Bold),
        count_cell(totals.participant_only, Color::Yellow).add_attribute(Attribute::Bold),
        count_cell(totals.confirmed, Color::Green).add_attribute(Attribute::Bold),
        concordant_cell(totals.concordant),
    ]);
    println!("{table}");

    let mut counts = Table::new();
    counts.set_header(vec![header_cell("Measure"), header_cell("Count")]);
    apply_table_style(&mut counts);
    align_column(&mut counts, 1, CellAlignment::Right);
    let rows: [(&str, usize); 7] = [
        ("Trial rows", result.inputs.trial_rows),
        ("Participant rows", result.inputs.participant_rows),
        ("Trial keys", result.inputs.trial_keys),
        ("Participant keys", result.inputs.participant_keys),
        ("Matched keys", result.matched_keys),
        ("Merged rows", result.merged_rows),
        ("Unconfirmed discrepancies", result.discrepancies.unconfirmed),
    ];
    for (label, value) in rows {
        counts.add_row(vec![Cell::new(label), Cell::new(value)]);
    }
    counts.add_row(vec![
        Cell::new("Verification"),
        verification_cell(result.verification),
    ]);
    println!("{counts}");

    if !result.rule_hits.is_empty() {
        let mut hits = Table::new();
        hits.set_header(vec![header_cell("Rule"), header_cell("Rows rewritten")]);
        apply_table_style(&mut hits);
        align_column(&mut hits, 1, CellAlignment::Right);
        for (rule, count) in &result.rule_hits {
            hits.add_row(vec![Cell::new(rule), Cell::new(count)]);
        }
        println!("{hits}");
    }
}

fn print_output_line(label: &str, path: Option<&PathBuf>) {
    if let Some(path) = path {
        println!("{label}: {}", path.display());
    }
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(140);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn lab_cell(lab: &str) -> Cell {
    if lab.is_empty() {
        dim_cell("(empty)")
    } else {
        Cell::new(lab)
            .fg(Color::Blue)
            .add_attribute(Attribute::Bold)
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn concordant_cell(concordant: bool) -> Cell {
    if concordant {
        Cell::new("✓")
            .fg(Color::Green)
            .add_attribute(Attribute::Bold)
    } else {
        Cell::new("✗").fg(Color::Red).add_attribute(Attribute::Bold)
    }
}

fn verification_cell(status: VerificationStatus) -> Cell {
    match status {
        VerificationStatus::Passed => Cell::new("passed").fg(Color::Green),
        VerificationStatus::PassedWithDuplicates => {
            Cell::new("passed (duplicates allowed)").fg(Color::Yellow)
        }
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
