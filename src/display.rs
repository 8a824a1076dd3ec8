use crate::types::OutputRow;
use chrono::DateTime;

const PREVIEW_ROWS: usize = 10;

fn format_micros(micros: i64) -> String {
    DateTime::from_timestamp_micros(micros)
        .unwrap_or_default()
        .format("%Y%m%d %H:%M:%S%.6f")
        .to_string()
}

fn format_value(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude < 1.0 {
        format!("{:.8}", value)
    } else if magnitude < 100.0 {
        format!("{:.6}", value)
    } else {
        format!("{:.4}", value)
    }
}

fn print_row(row: &OutputRow) {
    let trade = row.is_trade.map_or("-".to_string(), |t| if t { "trade" } else { "signal" }.to_string());
    let id = row.id.map_or("-".to_string(), |id| id.to_string());
    println!(
        "{:<26} {:<26} {:>16} {:>8} {:>10}",
        format_micros(row.emitted_at),
        format_micros(row.timestamp),
        format_value(row.value),
        trade,
        id
    );
}

/// Display a preview of the operator output
pub fn display_output_table(rows: &[OutputRow]) {
    if rows.is_empty() {
        println!("No data to display");
        return;
    }

    println!("\n{}", "=".repeat(92));
    println!("{:^92}", "OUTPUT PREVIEW");
    println!("{}", "=".repeat(92));
    println!(
        "{:<26} {:<26} {:>16} {:>8} {:>10}",
        "Emitted at", "Timestamp", "Value", "Kind", "Id"
    );
    println!("{}", "-".repeat(92));

    println!("=== FIRST {} ROWS ===", PREVIEW_ROWS);
    rows.iter().take(PREVIEW_ROWS).for_each(print_row);

    if rows.len() > PREVIEW_ROWS {
        println!("\n=== LAST {} ROWS ===", PREVIEW_ROWS);
        let tail = rows.len().saturating_sub(PREVIEW_ROWS).max(PREVIEW_ROWS);
        rows[tail..].iter().for_each(print_row);
    }

    println!("{}", "=".repeat(92));
    let groups = rows.windows(2).filter(|w| w[0].emitted_at != w[1].emitted_at).count() + 1;
    let mean = rows.iter().map(|r| r.value).sum::<f64>() / rows.len() as f64;
    println!("Total rows: {}", rows.len());
    println!("Finalize outputs: {}", groups);
    println!("Mean value: {}", format_value(mean));
    println!("{}", "=".repeat(92));
}
