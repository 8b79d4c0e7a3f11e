use orc_columnar::{OrcReader, Shape, Value};
use std::env;

fn main() {
    let args: Vec<String> = env::args().collect();
    let Some(path) = args.get(1) else {
        eprintln!("usage: orc_reader_demo <file.orc>");
        std::process::exit(2);
    };

    println!("Opening ORC file: {}", path);
    let mut reader = OrcReader::open(path).expect("Failed to open file");

    let metadata = reader.metadata();
    println!("\n=== File Metadata ===");
    println!("Compression: {:?}", metadata.codec.kind());
    println!("Rows: {}", metadata.num_rows);
    println!("Stripes: {}", metadata.stripes.len());

    let root = metadata.root().clone();
    println!("\n=== Columns ===");
    for (name, &column) in root.field_names.iter().zip(&root.sub_type_ids) {
        let kind = metadata
            .column_type(column)
            .map(|t| format!("{:?}", t.kind))
            .unwrap_or_default();
        println!("  {} (column {}): {}", name, column, kind);
    }

    println!("\n=== Sample Data (first 10 rows) ===");
    let mut columns = Vec::new();
    for &column in &root.sub_type_ids {
        match reader.read_column(column, &Shape::Native) {
            Ok(values) => columns.push(values),
            Err(e) => {
                println!("  column {} skipped: {}", column, e);
                columns.push(Vec::new());
            }
        }
    }

    println!("{}", root.field_names.join(" | "));
    println!("{}", "-".repeat(40));
    for row in 0..10.min(max_rows(&columns)) {
        let cells: Vec<String> = columns
            .iter()
            .map(|values| match values.get(row) {
                Some(Some(value)) => format_value(value),
                Some(None) => "null".to_string(),
                None => "-".to_string(),
            })
            .collect();
        println!("{}", cells.join(" | "));
    }
}

fn max_rows(columns: &[Vec<Option<Value>>]) -> usize {
    columns.iter().map(Vec::len).max().unwrap_or(0)
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Decimal(d) => d.to_string(),
        Value::Timestamp(ts) => ts.to_string(),
        Value::Date(d) => d.to_string(),
        other => format!("{:?}", other),
    }
}
