use arrow::array::{Array, BooleanArray, Float64Array, Int64Array};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::env;
use std::fs::File;

type Columns<'a> = (&'a Int64Array, &'a Int64Array, &'a Float64Array, &'a BooleanArray, &'a Int64Array);

fn columns(batch: &RecordBatch) -> Result<Columns<'_>, Box<dyn std::error::Error>> {
    Ok((
        batch.column(0).as_any().downcast_ref::<Int64Array>().ok_or("Failed to cast emitted_at column")?,
        batch.column(1).as_any().downcast_ref::<Int64Array>().ok_or("Failed to cast timestamp column")?,
        batch.column(2).as_any().downcast_ref::<Float64Array>().ok_or("Failed to cast value column")?,
        batch.column(3).as_any().downcast_ref::<BooleanArray>().ok_or("Failed to cast is_trade column")?,
        batch.column(4).as_any().downcast_ref::<Int64Array>().ok_or("Failed to cast id column")?,
    ))
}

fn print_rows(batch: &RecordBatch, range: std::ops::Range<usize>) -> Result<(), Box<dyn std::error::Error>> {
    let (emitted, timestamps, values, trades, ids) = columns(batch)?;
    println!("{:<20} {:<20} {:>16} {:>8} {:>10}", "Emitted(μs)", "Timestamp(μs)", "Value", "Trade", "Id");
    println!("{}", "-".repeat(80));
    for i in range {
        let trade = if trades.is_null(i) { "-".to_string() } else { trades.value(i).to_string() };
        let id = if ids.is_null(i) { "-".to_string() } else { ids.value(i).to_string() };
        println!(
            "{:<20} {:<20} {:>16.6} {:>8} {:>10}",
            emitted.value(i),
            timestamps.value(i),
            values.value(i),
            trade,
            id
        );
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <parquet_file>", args[0]);
        std::process::exit(1);
    }

    let filepath = &args[1];
    println!("\n{}", "=".repeat(80));
    println!("Inspecting: {}", filepath);
    println!("{}", "=".repeat(80));

    let file = File::open(filepath)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
    let batches = reader.collect::<Result<Vec<_>, _>>()?;
    let total_rows: usize = batches.iter().map(|b| b.num_rows()).sum();

    println!("Total rows: {}", total_rows);
    let (Some(first), Some(last)) = (batches.first(), batches.last()) else {
        println!("No data found!");
        return Ok(());
    };

    println!("\n{} FIRST 20 ROWS {}", "=".repeat(32), "=".repeat(32));
    print_rows(first, 0..first.num_rows().min(20))?;

    println!("\n{} LAST 20 ROWS {}", "=".repeat(32), "=".repeat(32));
    print_rows(last, last.num_rows().saturating_sub(20)..last.num_rows())?;

    println!("\n{} SANITY CHECKS {}", "=".repeat(32), "=".repeat(32));

    // emitted_at must never go backwards; timestamps within one output may
    let mut prev_emitted = i64::MIN;
    let mut regressions = 0;
    let mut groups = 0;
    let mut non_finite = 0;
    let (mut min, mut max) = (f64::MAX, f64::MIN);
    for batch in &batches {
        let (emitted, _, values, _, _) = columns(batch)?;
        for i in 0..batch.num_rows() {
            let at = emitted.value(i);
            if at < prev_emitted {
                regressions += 1;
            }
            if at != prev_emitted {
                groups += 1;
            }
            prev_emitted = at;

            let v = values.value(i);
            if v.is_finite() {
                min = min.min(v);
                max = max.max(v);
            } else {
                non_finite += 1;
            }
        }
    }

    println!("✓ Emission times non-decreasing: {}", regressions == 0);
    if regressions > 0 {
        println!("  WARNING: Found {} regressions", regressions);
    }
    println!("✓ Finalize outputs: {}", groups);
    println!("✓ Value range: {:.6} .. {:.6}", min, max);
    if non_finite > 0 {
        println!("  WARNING: {} non-finite values", non_finite);
    }

    Ok(())
}
