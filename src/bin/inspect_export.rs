use fundnorm::{
    analytics::{format_millions, KeyMetrics},
    export::read_parquet,
    table::{CanonicalField, CanonicalTable},
};
use std::{env, path::Path, process::exit};

fn main() {
    // Expect exactly one CLI argument: path to an exported Parquet file.
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} <PARQUET_FILE>", args[0]);
        exit(1);
    }
    if let Err(e) = inspect_export(Path::new(&args[1])) {
        eprintln!("Error: {:#}", e);
        exit(1);
    }
}

fn inspect_export(path: &Path) -> anyhow::Result<()> {
    let table = read_parquet(path)?;
    let file_size_disk = std::fs::metadata(path)?.len();

    println!("=== Export: {} ===", path.display());
    println!("Total rows:        {}", table.len());
    println!("File-size on disk: {} bytes", file_size_disk);
    println!();

    println!("=== Schema ===");
    for field in CanonicalTable::arrow_schema().fields() {
        println!(
            "- {:<16} | {:<8} | nullable: {}",
            field.name(),
            format!("{:?}", field.data_type()),
            field.is_nullable()
        );
    }
    println!();

    let metrics = KeyMetrics::compute(&table);
    println!("=== Key metrics ===");
    println!("Total funding:     {}", format_millions(metrics.total_funding));
    println!("Startups:          {}", metrics.startups);
    println!("Deals:             {}", metrics.deals);
    println!(
        "Average deal:      {}",
        metrics
            .average_deal
            .map_or("<none>".to_string(), format_millions)
    );
    println!("Investors:         {}", metrics.investors);
    println!(
        "Years:             {:?}",
        table.years()
    );
    println!(
        "Industries:        {}",
        table.distinct(CanonicalField::Industry).len()
    );
    Ok(())
}
