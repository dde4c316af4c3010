use comfy_table::presets::ASCII_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use flightscore::analysis::{ManoeuvreOutcome, ScheduleResults};
use flightscore::criteria::library::CriteriaLibrary;
use flightscore::scoring::Results;

fn right_align(table: &mut Table, from: usize, to: usize) {
    for i in from..=to {
        if let Some(col) = table.column_mut(i) {
            col.set_cell_alignment(CellAlignment::Right);
        }
    }
}

pub fn print_schedule_report(results: &ScheduleResults) {
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.add_row(vec![
        Cell::new("Manoeuvre").add_attribute(Attribute::Bold),
        Cell::new("K"),
        Cell::new("Inter"),
        Cell::new("Intra"),
        Cell::new("Pos"),
        Cell::new("Score").fg(Color::Cyan),
        Cell::new("Total").add_attribute(Attribute::Bold),
    ]);
    right_align(&mut table, 1, 6);

    for m in &results.manoeuvres {
        match m {
            ManoeuvreOutcome::Scored {
                name,
                k,
                option,
                results,
                score,
            } => {
                let label = if *option > 0 {
                    format!("{} (option {})", name, option)
                } else {
                    name.clone()
                };
                let s = results.summary();
                table.add_row(vec![
                    Cell::new(label).add_attribute(Attribute::Bold),
                    Cell::new(format!("{:.0}", k)),
                    Cell::new(format!("{:.2}", s.inter)),
                    Cell::new(format!("{:.2}", s.intra)),
                    Cell::new(format!("{:.2}", s.positioning)),
                    Cell::new(format!("{:.2}", score)).fg(Color::Cyan),
                    Cell::new(format!("{:.1}", k * score)).add_attribute(Attribute::Bold),
                ]);
            }
            ManoeuvreOutcome::Failed { name, k, error } => {
                table.add_row(vec![
                    Cell::new(name).add_attribute(Attribute::Bold),
                    Cell::new(format!("{:.0}", k)),
                    Cell::new(error).fg(Color::Red),
                    Cell::new("-"),
                    Cell::new("-"),
                    Cell::new("0.00").fg(Color::Red),
                    Cell::new("0.0"),
                ]);
            }
        }
    }

    table.add_row(vec![
        Cell::new("TOTAL").add_attribute(Attribute::Bold),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
        Cell::new(format!("{:.1}", results.total))
            .fg(Color::Green)
            .add_attribute(Attribute::Bold),
    ]);
    println!("\n{}", table);

    let failed = results.failed();
    if failed > 0 {
        println!("⚠️  {} manoeuvre(s) could not be scored.", failed);
    }
}

fn add_results(table: &mut Table, manoeuvre: &str, group: &str, results: &Results) {
    for r in &results.results {
        let total = r.total();
        if total <= 0.0 {
            continue;
        }
        table.add_row(vec![
            Cell::new(manoeuvre),
            Cell::new(group),
            Cell::new(&r.name),
            Cell::new(r.dgs.len()),
            Cell::new(format!("{:.2}", total)).fg(if total >= 1.0 {
                Color::Red
            } else {
                Color::Yellow
            }),
        ]);
    }
}

/// Every non zero downgrade, grouped by manoeuvre and element.
pub fn print_downgrade_breakdown(results: &ScheduleResults) {
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.add_row(vec![
        Cell::new("Manoeuvre").add_attribute(Attribute::Bold),
        Cell::new("Group"),
        Cell::new("Downgrade"),
        Cell::new("N"),
        Cell::new("Value"),
    ]);
    right_align(&mut table, 3, 4);

    for m in &results.manoeuvres {
        if let ManoeuvreOutcome::Scored { name, results, .. } = m {
            add_results(&mut table, name, "inter", &results.inter);
            for el in &results.intra.elements {
                add_results(&mut table, name, &el.name, el);
            }
            add_results(&mut table, name, "positioning", &results.positioning);
        }
    }
    println!("\n{}", table);
}

pub fn print_criteria_report(lib: &CriteriaLibrary, filter: Option<&str>) {
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.add_row(vec![
        Cell::new("Criteria").add_attribute(Attribute::Bold),
        Cell::new("Kind"),
        Cell::new("Factor"),
        Cell::new("Exponent"),
        Cell::new("Limit"),
        Cell::new("Error Limit"),
    ]);
    right_align(&mut table, 2, 5);

    let mut shown = 0;
    for (key, c) in lib.iter() {
        if let Some(f) = filter {
            if !key.contains(f) {
                continue;
            }
        }
        shown += 1;
        table.add_row(vec![
            Cell::new(key).add_attribute(Attribute::Bold),
            Cell::new(c.kind.to_string()),
            Cell::new(format!("{:.3}", c.lookup.factor)),
            Cell::new(format!("{:.2}", c.lookup.exponent)),
            Cell::new(
                c.lookup
                    .limit
                    .map(|l| format!("{:.2}", l))
                    .unwrap_or_else(|| "-".to_string()),
            ),
            Cell::new(format!("{:.3}", c.lookup.error_limit())),
        ]);
    }
    println!("\n{}", table);
    println!("{} of {} criteria", shown, lib.len());
}
