// Types command - print the report type registry

use anyhow::Result;

use crate::cli::args::TypesArgs;
use crate::parser::ReportType;

pub fn handle_types(args: &TypesArgs) -> Result<()> {
    if args.is_json() {
        let types: Vec<serde_json::Value> = ReportType::ALL
            .iter()
            .map(|t| {
                serde_json::json!({
                    "id": t.id(),
                    "name": t.display_name(),
                    "inspection": t.is_inspection(),
                    "duplicates": t.is_duplication(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&types)?);
        return Ok(());
    }

    println!("Supported report types:");
    for t in ReportType::ALL {
        let kind = if t.is_inspection() {
            "inspections"
        } else if t.is_duplication() {
            "duplicates"
        } else {
            "tests"
        };
        println!("  {:<12} {:<12} {}", t.id(), t.display_name(), kind);
    }
    Ok(())
}
