//! Knowledge base commands: node search and template lookup.

use serde_json::json;

use n8nctl_kb::SearchMode;

use crate::cli::{NodeCommand, TemplateCommand};
use crate::commands::{engine_error, usage_error};
use crate::context::AppContext;
use crate::envelope::Outcome;

pub fn run_nodes(ctx: &AppContext, command: NodeCommand) -> Outcome {
    let catalog = match ctx.catalog() {
        Ok(catalog) => catalog,
        Err(err) => return engine_error(err),
    };

    let result = match command {
        NodeCommand::Search { query, mode, limit } => {
            let Some(mode) = SearchMode::parse(&mode) else {
                return usage_error(&format!("unknown search mode '{mode}' (or, and, fuzzy)"));
            };
            catalog
                .search(&query, mode, limit)
                .map(|hits| json!({ "query": query, "results": hits }))
        }
        NodeCommand::Info { node_type } => match catalog.lookup(&node_type) {
            Ok(Some(record)) => Ok(json!(record)),
            Ok(None) => {
                let suggestions = catalog.similar_types(&node_type, 5).unwrap_or_default();
                return Outcome::error(
                    n8nctl_core::ErrorClass::Data,
                    "INVALID_NODE_TYPE_FORMAT",
                    &format!("unknown node type '{node_type}'"),
                    Some(json!({ "suggestions": suggestions })),
                );
            }
            Err(err) => Err(err),
        },
        NodeCommand::Properties {
            node_type,
            query,
            limit,
        } => catalog
            .search_properties(&node_type, &query, limit)
            .map(|hits| json!({ "nodeType": node_type, "properties": hits })),
        NodeCommand::Suggest { bad_type, limit } => catalog
            .similar_types(&bad_type, limit)
            .map(|suggestions| json!({ "input": bad_type, "suggestions": suggestions })),
    };

    match result {
        Ok(data) => Outcome::success(data),
        Err(err) => engine_error(err.into()),
    }
}

pub fn run_templates(ctx: &AppContext, command: TemplateCommand) -> Outcome {
    let catalog = match ctx.catalog() {
        Ok(catalog) => catalog,
        Err(err) => return engine_error(err),
    };

    match command {
        TemplateCommand::Search { query, limit } => match catalog.search_templates(&query, limit) {
            Ok(templates) => {
                // Listing hits keep metadata only; the full workflow comes
                // with `templates get`.
                let rows: Vec<serde_json::Value> = templates
                    .iter()
                    .map(|t| {
                        json!({
                            "id": t.id,
                            "name": t.name,
                            "description": t.description,
                            "nodeCount": t.node_count,
                            "views": t.views,
                            "complexity": t.complexity,
                            "setupMinutes": t.setup_minutes,
                        })
                    })
                    .collect();
                Outcome::success(json!({ "query": query, "templates": rows }))
            }
            Err(err) => engine_error(err.into()),
        },
        TemplateCommand::Get { id, output } => match catalog.get_template(id) {
            Ok(Some(template)) => {
                if let Some(path) = output {
                    let mut bytes = match serde_json::to_vec_pretty(&template.workflow) {
                        Ok(bytes) => bytes,
                        Err(err) => {
                            return Outcome::error(
                                n8nctl_core::ErrorClass::Software,
                                "IO_ERROR",
                                &format!("cannot serialize template: {err}"),
                                None,
                            )
                        }
                    };
                    bytes.push(b'\n');
                    if let Err(err) = std::fs::write(&path, bytes) {
                        return engine_error(err.into());
                    }
                }
                Outcome::success(json!(template))
            }
            Ok(None) => Outcome::error(
                n8nctl_core::ErrorClass::Data,
                "TEMPLATE_NOT_FOUND",
                &format!("template {id} not found"),
                None,
            ),
            Err(err) => engine_error(err.into()),
        },
    }
}
