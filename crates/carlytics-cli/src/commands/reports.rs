use anyhow::Result;

use carlytics_engine::catalogue::{catalogue, ReportDescriptor};
use carlytics_engine::config::ColumnMap;

/// Execute the `reports` command: list every report with its columns and order.
pub fn execute() -> Result<()> {
    let columns = ColumnMap::default();
    for (i, descriptor) in catalogue().iter().enumerate() {
        println!("{:>2}. {}", i + 1, descriptor.name);
        println!("    columns: {}", descriptor.output_columns(&columns).join(", "));
        println!("    order:   {}", describe_order(descriptor, &columns));
    }
    Ok(())
}

fn describe_order(descriptor: &ReportDescriptor, columns: &ColumnMap) -> String {
    let mut parts: Vec<String> = descriptor
        .sort
        .iter()
        .map(|key| {
            let name = descriptor.sort_column_name(key.column, columns);
            format!("{name} {}", if key.descending { "desc" } else { "asc" })
        })
        .collect();
    if let Some(limit) = descriptor.limit {
        parts.push(format!("limit {limit}"));
    }
    parts.join(", ")
}
