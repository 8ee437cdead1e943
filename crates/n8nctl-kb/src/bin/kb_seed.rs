//! Build a `nodes.db` from the in-tree catalog records.
//!
//! Release bundles are generated from the platform's published node
//! packages; this tool seeds a database from the fixture set so local
//! development and CI have a working catalog without the full bundle.
//!
//! Usage: `kb-seed <output-path>`

use std::path::PathBuf;
use std::process::ExitCode;

use n8nctl_kb::{fixture_records, fixture_templates, SqliteCatalog};

fn main() -> ExitCode {
    let Some(path) = std::env::args().nth(1).map(PathBuf::from) else {
        eprintln!("usage: kb-seed <output-path>");
        return ExitCode::from(64);
    };

    match build(&path) {
        Ok((nodes, templates)) => {
            println!(
                "wrote {} node types and {} templates to {}",
                nodes,
                templates,
                path.display()
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("kb-seed failed: {err}");
            ExitCode::from(74)
        }
    }
}

fn build(path: &std::path::Path) -> n8nctl_kb::Result<(usize, usize)> {
    let catalog = SqliteCatalog::create(path)?;
    let records = fixture_records();
    for record in &records {
        catalog.ingest_node(record)?;
    }
    let templates = fixture_templates();
    for template in &templates {
        catalog.ingest_template(template)?;
    }
    Ok((records.len(), templates.len()))
}
