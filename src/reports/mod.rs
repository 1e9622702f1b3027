use crate::api::ExperimentReport;
use crate::classifier::Classifier;
use crate::experiment::ConfusionMatrix;
use crate::labels::Label;
use comfy_table::presets::ASCII_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn right_align(table: &mut Table, from: usize, to: usize) {
    for i in from..=to {
        if let Some(col) = table.column_mut(i) {
            col.set_cell_alignment(CellAlignment::Right);
        }
    }
}

/// True labels down the side, inferred labels across, plus an
/// `Unclassified` column and per-row recall.
pub fn confusion_table(matrix: &ConfusionMatrix) -> Table {
    let names = matrix.label_names();
    let mut table = new_table();

    let mut header = vec![Cell::new("Actual \\ Inferred").add_attribute(Attribute::Bold)];
    header.extend(names.iter().map(|n| Cell::new(n).add_attribute(Attribute::Bold)));
    header.push(Cell::new("Unclassified").fg(Color::Yellow));
    header.push(Cell::new("Recall").fg(Color::Cyan));
    table.add_row(header);

    let recall = matrix.per_label_recall();
    for (i, name) in names.iter().enumerate() {
        let truth = Label(i as u16);
        let mut row = vec![Cell::new(name).add_attribute(Attribute::Bold)];
        if let Some(counts) = matrix.row(truth) {
            for (j, &count) in counts.iter().enumerate() {
                let cell = Cell::new(count);
                row.push(if j == i {
                    cell.fg(Color::Green)
                } else if j == names.len() {
                    cell.fg(Color::Yellow)
                } else {
                    cell
                });
            }
        }
        let r = recall.get(i).map(|(_, r)| *r).unwrap_or(0.0);
        row.push(Cell::new(format!("{:.1}%", r * 100.0)).fg(Color::Cyan));
        table.add_row(row);
    }

    right_align(&mut table, 1, names.len() + 2);
    table
}

/// One line per frozen detector.
pub fn classifier_table(classifier: &Classifier) -> Table {
    let mut table = new_table();
    table.add_row(vec![
        Cell::new("Label").add_attribute(Attribute::Bold),
        Cell::new("Threshold"),
        Cell::new("Schema"),
        Cell::new("Fitness").fg(Color::Cyan),
    ]);

    for d in classifier.detectors() {
        table.add_row(vec![
            Cell::new(classifier.labels().name(d.label()).unwrap_or("?"))
                .add_attribute(Attribute::Bold),
            Cell::new(format!("{:.3}", d.decoded_threshold())),
            Cell::new(d.schema()),
            Cell::new(
                d.fitness()
                    .map(|f| format!("{:.4}", f))
                    .unwrap_or_else(|| "-".to_string()),
            )
            .fg(Color::Cyan),
        ]);
    }

    right_align(&mut table, 1, 1);
    right_align(&mut table, 3, 3);
    table
}

pub fn print_experiment_report(report: &ExperimentReport) {
    println!("\nDetectors:");
    println!("{}", classifier_table(&report.classifier));

    println!("\nConfusion matrix over training set:");
    println!("{}", confusion_table(&report.train_matrix));
    println!("Hit rate over training set: {:.4}", report.train_hit_rate);

    if report.test_size > 0 {
        println!("\nConfusion matrix over test set:");
        println!("{}", confusion_table(&report.test_matrix));
        println!("Hit rate over test set: {:.4}", report.test_hit_rate);
    }

    println!(
        "\n{} generations, {} passes, stopped by {} after {:.2}s",
        report.generations, report.passes, report.stop_reason, report.elapsed_secs
    );
}
