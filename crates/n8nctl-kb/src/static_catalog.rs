//! In-memory catalog implementation.
//!
//! [`StaticCatalog`] backs unit tests across the workspace and doubles as the
//! ingestion staging type when building the bundled SQLite database. The
//! [`fixture_records`] set covers the node families the validation engine
//! dispatches on.

use std::collections::HashMap;

use serde_json::json;

use crate::catalog::{qualified_candidates, NodeCatalog, SearchMode};
use crate::error::Result;
use crate::similarity::rank_candidates;
use crate::types::{
    BreakingChange, ChangeSeverity, CredentialRequirement, NodeSearchHit, NodeTypeRecord,
    OperationDescriptor, PropertyDescriptor, PropertyKind, PropertySearchHit, TemplateRecord,
    TypeSuggestion,
};

/// A catalog held entirely in memory.
#[derive(Debug, Default)]
pub struct StaticCatalog {
    records: Vec<NodeTypeRecord>,
    by_type: HashMap<String, usize>,
    by_alias: HashMap<String, usize>,
    templates: Vec<TemplateRecord>,
}

impl StaticCatalog {
    pub fn new(records: Vec<NodeTypeRecord>) -> Self {
        let mut catalog = Self::default();
        for record in records {
            catalog.insert(record);
        }
        catalog
    }

    /// Catalog preloaded with the workspace fixture records.
    pub fn with_fixtures() -> Self {
        let mut catalog = Self::new(fixture_records());
        catalog.templates = fixture_templates();
        catalog
    }

    pub fn insert(&mut self, record: NodeTypeRecord) {
        let index = self.records.len();
        self.by_type.insert(record.node_type.clone(), index);
        self.by_alias.insert(record.alias.clone(), index);
        self.records.push(record);
    }

    pub fn insert_template(&mut self, template: TemplateRecord) {
        self.templates.push(template);
    }

    pub fn records(&self) -> &[NodeTypeRecord] {
        &self.records
    }

    pub fn templates(&self) -> &[TemplateRecord] {
        &self.templates
    }

    fn resolve(&self, type_name: &str) -> Option<&NodeTypeRecord> {
        for candidate in qualified_candidates(type_name) {
            if let Some(&index) = self.by_type.get(&candidate) {
                return Some(&self.records[index]);
            }
        }
        // Bare aliases also resolve directly, covering packages outside the
        // recognized prefix list.
        if !type_name.contains('.') {
            if let Some(&index) = self.by_alias.get(type_name.trim()) {
                return Some(&self.records[index]);
            }
        }
        None
    }
}

impl NodeCatalog for StaticCatalog {
    fn lookup(&self, type_name: &str) -> Result<Option<NodeTypeRecord>> {
        Ok(self.resolve(type_name).cloned())
    }

    fn search(&self, query: &str, mode: SearchMode, limit: usize) -> Result<Vec<NodeSearchHit>> {
        let terms: Vec<String> = query
            .split_whitespace()
            .map(|t| t.to_ascii_lowercase())
            .collect();
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut hits: Vec<NodeSearchHit> = Vec::new();
        for record in &self.records {
            let haystack = format!(
                "{} {} {} {} {}",
                record.display_name,
                record.description,
                record.category,
                record.alias,
                record.node_type
            )
            .to_ascii_lowercase();

            let matched = terms.iter().filter(|t| haystack.contains(t.as_str())).count();
            let score = match mode {
                SearchMode::Or if matched > 0 => matched as f64 / terms.len() as f64,
                SearchMode::And if matched == terms.len() => 1.0,
                SearchMode::Fuzzy => {
                    let ranked = rank_candidates(query, std::slice::from_ref(record), 1);
                    match ranked.first() {
                        Some(s) => s.confidence,
                        None => continue,
                    }
                }
                _ => continue,
            };

            // Short queries surface exact alias hits above prose matches.
            let score = if query.len() < 6 && record.alias.eq_ignore_ascii_case(query.trim()) {
                score + 1.0
            } else {
                score
            };

            hits.push(NodeSearchHit {
                node_type: record.node_type.clone(),
                display_name: record.display_name.clone(),
                category: record.category.clone(),
                description: record.description.clone(),
                score,
            });
        }

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.node_type.cmp(&b.node_type))
        });
        hits.truncate(limit);
        Ok(hits)
    }

    fn search_properties(
        &self,
        type_name: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<PropertySearchHit>> {
        let needle = query.to_ascii_lowercase();
        let Some(record) = self.resolve(type_name) else {
            return Ok(Vec::new());
        };

        let mut hits: Vec<PropertySearchHit> = record
            .properties
            .iter()
            .filter(|p| {
                p.name.to_ascii_lowercase().contains(&needle)
                    || p.description.to_ascii_lowercase().contains(&needle)
            })
            .map(|p| PropertySearchHit {
                node_type: record.node_type.clone(),
                path: p.name.clone(),
                name: p.name.clone(),
                kind: p.kind,
                description: p.description.clone(),
                score: if p.name.eq_ignore_ascii_case(query) { 2.0 } else { 1.0 },
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
        });
        hits.truncate(limit);
        Ok(hits)
    }

    fn similar_types(&self, bad_type: &str, limit: usize) -> Result<Vec<TypeSuggestion>> {
        Ok(rank_candidates(bad_type, &self.records, limit))
    }

    fn breaking_changes(
        &self,
        type_name: &str,
        from: f64,
        to: f64,
    ) -> Result<Vec<BreakingChange>> {
        Ok(self
            .resolve(type_name)
            .map(|record| record.changes_between(from, to).into_iter().cloned().collect())
            .unwrap_or_default())
    }

    fn search_templates(&self, query: &str, limit: usize) -> Result<Vec<TemplateRecord>> {
        let needle = query.to_ascii_lowercase();
        let mut hits: Vec<TemplateRecord> = self
            .templates
            .iter()
            .filter(|t| {
                t.name.to_ascii_lowercase().contains(&needle)
                    || t.description.to_ascii_lowercase().contains(&needle)
                    || t.tasks.iter().any(|x| x.to_ascii_lowercase().contains(&needle))
                    || t.services.iter().any(|x| x.to_ascii_lowercase().contains(&needle))
            })
            .cloned()
            .collect();
        hits.sort_by(|a, b| b.views.cmp(&a.views));
        hits.truncate(limit);
        Ok(hits)
    }

    fn get_template(&self, id: i64) -> Result<Option<TemplateRecord>> {
        Ok(self.templates.iter().find(|t| t.id == id).cloned())
    }
}

/// Node type records covering every family the validators dispatch on.
pub fn fixture_records() -> Vec<NodeTypeRecord> {
    fn record(
        node_type: &str,
        alias: &str,
        display_name: &str,
        category: &str,
        latest: f64,
        supported: &[f64],
    ) -> NodeTypeRecord {
        NodeTypeRecord {
            node_type: node_type.to_string(),
            alias: alias.to_string(),
            display_name: display_name.to_string(),
            category: category.to_string(),
            subcategory: String::new(),
            description: String::new(),
            latest_version: latest,
            supported_versions: supported.to_vec(),
            properties: Vec::new(),
            credentials: Vec::new(),
            operations: Vec::new(),
            is_trigger: false,
            supports_error_output: true,
            output_count: None,
            deprecated: false,
            docs: String::new(),
            breaking_changes: Vec::new(),
        }
    }

    let mut records = Vec::new();

    let mut http = record(
        "n8n-nodes-base.httpRequest",
        "httpRequest",
        "HTTP Request",
        "Core Nodes",
        4.2,
        &[1.0, 2.0, 3.0, 4.0, 4.1, 4.2],
    );
    http.description = "Makes an HTTP request and returns the response".into();
    http.properties = vec![
        PropertyDescriptor::new("method", PropertyKind::Options)
            .with_default(json!("GET"))
            .with_options(&["DELETE", "GET", "HEAD", "OPTIONS", "PATCH", "POST", "PUT"]),
        PropertyDescriptor::new("url", PropertyKind::String).required(),
        PropertyDescriptor::new("authentication", PropertyKind::Options)
            .with_default(json!("none"))
            .with_options(&["none", "predefinedCredentialType", "genericCredentialType"]),
        PropertyDescriptor::new("sendBody", PropertyKind::Boolean).with_default(json!(false)),
        PropertyDescriptor::new("contentType", PropertyKind::Options)
            .with_default(json!("json"))
            .shown_when("sendBody", vec![json!(true)]),
        PropertyDescriptor::new("options", PropertyKind::Collection),
    ];
    http.breaking_changes = vec![BreakingChange {
        from_version: 3.0,
        to_version: 4.0,
        severity: ChangeSeverity::Medium,
        description: "Authentication parameters were restructured; generic credentials move under genericAuthType".into(),
        auto_migratable: false,
        migration_hint: "Re-select the credential type on the node".into(),
    }];
    records.push(http);

    let mut webhook = record(
        "n8n-nodes-base.webhook",
        "webhook",
        "Webhook",
        "Core Nodes",
        2.0,
        &[1.0, 1.1, 2.0],
    );
    webhook.description = "Starts the workflow when a webhook is called".into();
    webhook.is_trigger = true;
    webhook.supports_error_output = false;
    webhook.properties = vec![
        PropertyDescriptor::new("httpMethod", PropertyKind::Options)
            .with_default(json!("GET"))
            .with_options(&["DELETE", "GET", "HEAD", "PATCH", "POST", "PUT"]),
        PropertyDescriptor::new("path", PropertyKind::String).required(),
        PropertyDescriptor::new("responseMode", PropertyKind::Options)
            .with_default(json!("onReceived"))
            .with_options(&["onReceived", "lastNode", "responseNode"]),
    ];
    records.push(webhook);

    let mut if_node = record(
        "n8n-nodes-base.if",
        "if",
        "If",
        "Core Nodes",
        2.2,
        &[1.0, 2.0, 2.1, 2.2],
    );
    if_node.description = "Routes items to the true or false branch".into();
    if_node.output_count = Some(2);
    if_node.properties = vec![
        PropertyDescriptor::new("conditions", PropertyKind::FixedCollection).required(),
        PropertyDescriptor::new("options", PropertyKind::Collection),
    ];
    if_node.breaking_changes = vec![BreakingChange {
        from_version: 1.0,
        to_version: 2.0,
        severity: ChangeSeverity::High,
        description: "Condition rules moved to the filter schema with typed operators".into(),
        auto_migratable: false,
        migration_hint: "Rebuild each condition with the typed operator set".into(),
    }];
    records.push(if_node);

    let mut switch = record(
        "n8n-nodes-base.switch",
        "switch",
        "Switch",
        "Core Nodes",
        3.2,
        &[1.0, 2.0, 3.0, 3.1, 3.2],
    );
    switch.description = "Routes items to one of several outputs".into();
    switch.properties = vec![
        PropertyDescriptor::new("mode", PropertyKind::Options)
            .with_default(json!("rules"))
            .with_options(&["rules", "expression"]),
        PropertyDescriptor::new("rules", PropertyKind::FixedCollection)
            .shown_when("mode", vec![json!("rules")]),
        PropertyDescriptor::new("numberOutputs", PropertyKind::Number)
            .shown_when("mode", vec![json!("expression")]),
        PropertyDescriptor::new("options", PropertyKind::Collection),
    ];
    switch.breaking_changes = vec![BreakingChange {
        from_version: 2.0,
        to_version: 3.0,
        severity: ChangeSeverity::High,
        description: "Rules schema replaced; fallback output configured via options.fallbackOutput".into(),
        auto_migratable: true,
        migration_hint: String::new(),
    }];
    records.push(switch);

    let mut code = record(
        "n8n-nodes-base.code",
        "code",
        "Code",
        "Core Nodes",
        2.0,
        &[1.0, 2.0],
    );
    code.description = "Runs custom JavaScript or Python code".into();
    code.properties = vec![
        PropertyDescriptor::new("mode", PropertyKind::Options)
            .with_default(json!("runOnceForAllItems"))
            .with_options(&["runOnceForAllItems", "runOnceForEachItem"]),
        PropertyDescriptor::new("language", PropertyKind::Options)
            .with_default(json!("javaScript"))
            .with_options(&["javaScript", "python"]),
        PropertyDescriptor::new("jsCode", PropertyKind::String)
            .required()
            .shown_when("language", vec![json!("javaScript")]),
        PropertyDescriptor::new("pythonCode", PropertyKind::String)
            .required()
            .shown_when("language", vec![json!("python")]),
    ];
    records.push(code);

    let mut set = record(
        "n8n-nodes-base.set",
        "set",
        "Edit Fields",
        "Core Nodes",
        3.4,
        &[1.0, 2.0, 3.0, 3.4],
    );
    set.description = "Adds, removes, or edits item fields".into();
    set.properties = vec![
        PropertyDescriptor::new("mode", PropertyKind::Options)
            .with_default(json!("manual"))
            .with_options(&["manual", "raw"]),
        PropertyDescriptor::new("assignments", PropertyKind::FixedCollection),
    ];
    records.push(set);

    let mut postgres = record(
        "n8n-nodes-base.postgres",
        "postgres",
        "Postgres",
        "Data & Storage",
        2.6,
        &[1.0, 2.0, 2.5, 2.6],
    );
    postgres.description = "Reads and writes data in PostgreSQL".into();
    postgres.credentials = vec![CredentialRequirement {
        name: "postgres".into(),
        required: true,
    }];
    postgres.properties = vec![
        PropertyDescriptor::new("operation", PropertyKind::Options)
            .with_default(json!("insert"))
            .with_options(&["deleteTable", "executeQuery", "insert", "select", "update", "upsert"]),
        PropertyDescriptor::new("query", PropertyKind::String)
            .required()
            .shown_when("operation", vec![json!("executeQuery")]),
        PropertyDescriptor::new("table", PropertyKind::ResourceLocator)
            .required()
            .shown_when("operation", vec![json!("insert"), json!("select"), json!("update"), json!("upsert"), json!("deleteTable")]),
    ];
    postgres.operations = vec![
        OperationDescriptor {
            resource: String::new(),
            operation: "executeQuery".into(),
            description: "Execute an SQL query".into(),
            required_parameters: vec!["query".into()],
        },
        OperationDescriptor {
            resource: String::new(),
            operation: "insert".into(),
            description: "Insert rows in a table".into(),
            required_parameters: vec!["table".into()],
        },
        OperationDescriptor {
            resource: String::new(),
            operation: "select".into(),
            description: "Select rows from a table".into(),
            required_parameters: vec!["table".into()],
        },
    ];
    records.push(postgres);

    let mut mysql = record(
        "n8n-nodes-base.mySql",
        "mySql",
        "MySQL",
        "Data & Storage",
        2.4,
        &[1.0, 2.0, 2.4],
    );
    mysql.description = "Reads and writes data in MySQL".into();
    mysql.credentials = vec![CredentialRequirement {
        name: "mySql".into(),
        required: true,
    }];
    mysql.properties = vec![
        PropertyDescriptor::new("operation", PropertyKind::Options)
            .with_default(json!("insert"))
            .with_options(&["deleteTable", "executeQuery", "insert", "select", "update"]),
        PropertyDescriptor::new("query", PropertyKind::String)
            .required()
            .shown_when("operation", vec![json!("executeQuery")]),
    ];
    records.push(mysql);

    let mut mongo = record(
        "n8n-nodes-base.mongoDb",
        "mongoDb",
        "MongoDB",
        "Data & Storage",
        1.2,
        &[1.0, 1.1, 1.2],
    );
    mongo.description = "Finds and updates documents in MongoDB".into();
    mongo.properties = vec![
        PropertyDescriptor::new("operation", PropertyKind::Options)
            .with_default(json!("find"))
            .with_options(&["aggregate", "delete", "find", "insert", "update"]),
        PropertyDescriptor::new("collection", PropertyKind::String).required(),
        PropertyDescriptor::new("query", PropertyKind::Json)
            .shown_when("operation", vec![json!("find"), json!("aggregate")]),
    ];
    records.push(mongo);

    let mut slack = record(
        "n8n-nodes-base.slack",
        "slack",
        "Slack",
        "Communication",
        2.3,
        &[1.0, 2.0, 2.2, 2.3],
    );
    slack.description = "Sends messages and manages channels in Slack".into();
    slack.credentials = vec![CredentialRequirement {
        name: "slackApi".into(),
        required: true,
    }];
    slack.properties = vec![
        PropertyDescriptor::new("resource", PropertyKind::Options)
            .with_default(json!("message"))
            .with_options(&["channel", "message", "reaction", "user"]),
        PropertyDescriptor::new("operation", PropertyKind::Options)
            .with_default(json!("post"))
            .shown_when("resource", vec![json!("message")])
            .with_options(&["delete", "post", "update"]),
        PropertyDescriptor::new("channelId", PropertyKind::ResourceLocator)
            .required()
            .shown_when("resource", vec![json!("message")]),
        PropertyDescriptor::new("text", PropertyKind::String)
            .required()
            .shown_when("resource", vec![json!("message")]),
    ];
    slack.operations = vec![OperationDescriptor {
        resource: "message".into(),
        operation: "post".into(),
        description: "Post a message to a channel".into(),
        required_parameters: vec!["channelId".into(), "text".into()],
    }];
    records.push(slack);

    let mut sheets = record(
        "n8n-nodes-base.googleSheets",
        "googleSheets",
        "Google Sheets",
        "Data & Storage",
        4.5,
        &[1.0, 2.0, 3.0, 4.0, 4.5],
    );
    sheets.description = "Reads and writes Google Sheets ranges".into();
    sheets.properties = vec![
        PropertyDescriptor::new("operation", PropertyKind::Options)
            .with_default(json!("read"))
            .with_options(&["append", "clear", "delete", "read", "update"]),
        PropertyDescriptor::new("documentId", PropertyKind::ResourceLocator).required(),
        PropertyDescriptor::new("sheetName", PropertyKind::ResourceLocator).required(),
    ];
    records.push(sheets);

    let mut schedule = record(
        "n8n-nodes-base.scheduleTrigger",
        "scheduleTrigger",
        "Schedule Trigger",
        "Core Nodes",
        1.2,
        &[1.0, 1.1, 1.2],
    );
    schedule.description = "Starts the workflow on a schedule".into();
    schedule.is_trigger = true;
    schedule.supports_error_output = false;
    schedule.properties = vec![PropertyDescriptor::new("rule", PropertyKind::FixedCollection)];
    records.push(schedule);

    let mut manual = record(
        "n8n-nodes-base.manualTrigger",
        "manualTrigger",
        "Manual Trigger",
        "Core Nodes",
        1.0,
        &[1.0],
    );
    manual.description = "Starts the workflow on manual execution".into();
    manual.is_trigger = true;
    manual.supports_error_output = false;
    records.push(manual);

    let mut start = record(
        "n8n-nodes-base.start",
        "start",
        "Start",
        "Core Nodes",
        1.0,
        &[1.0],
    );
    start.description = "Legacy workflow entry point".into();
    start.is_trigger = true;
    start.supports_error_output = false;
    start.deprecated = true;
    records.push(start);

    let mut respond = record(
        "n8n-nodes-base.respondToWebhook",
        "respondToWebhook",
        "Respond to Webhook",
        "Core Nodes",
        1.1,
        &[1.0, 1.1],
    );
    respond.description = "Returns a response to the calling webhook".into();
    records.push(respond);

    let mut agent = record(
        "@n8n/n8n-nodes-langchain.agent",
        "agent",
        "AI Agent",
        "AI",
        2.1,
        &[1.0, 1.5, 2.0, 2.1],
    );
    agent.description = "Plans and executes tool calls with a language model".into();
    agent.properties = vec![
        PropertyDescriptor::new("promptType", PropertyKind::Options)
            .with_default(json!("auto"))
            .with_options(&["auto", "define"]),
        PropertyDescriptor::new("text", PropertyKind::String)
            .shown_when("promptType", vec![json!("define")]),
        PropertyDescriptor::new("hasOutputParser", PropertyKind::Boolean)
            .with_default(json!(false)),
        PropertyDescriptor::new("needsFallback", PropertyKind::Boolean)
            .with_default(json!(false)),
        PropertyDescriptor::new("options", PropertyKind::Collection),
    ];
    records.push(agent);

    let mut chain = record(
        "@n8n/n8n-nodes-langchain.chainLlm",
        "chainLlm",
        "Basic LLM Chain",
        "AI",
        1.6,
        &[1.0, 1.4, 1.6],
    );
    chain.description = "Runs a single prompt against a language model".into();
    chain.properties = vec![
        PropertyDescriptor::new("promptType", PropertyKind::Options)
            .with_default(json!("auto"))
            .with_options(&["auto", "define"]),
        PropertyDescriptor::new("text", PropertyKind::String)
            .shown_when("promptType", vec![json!("define")]),
    ];
    records.push(chain);

    let mut chat_trigger = record(
        "@n8n/n8n-nodes-langchain.chatTrigger",
        "chatTrigger",
        "Chat Trigger",
        "AI",
        1.1,
        &[1.0, 1.1],
    );
    chat_trigger.description = "Starts the workflow from a chat message".into();
    chat_trigger.is_trigger = true;
    chat_trigger.supports_error_output = false;
    records.push(chat_trigger);

    let mut lm = record(
        "@n8n/n8n-nodes-langchain.lmChatOpenAi",
        "lmChatOpenAi",
        "OpenAI Chat Model",
        "AI",
        1.2,
        &[1.0, 1.2],
    );
    lm.description = "Chat completion model connection".into();
    lm.supports_error_output = false;
    lm.credentials = vec![CredentialRequirement {
        name: "openAiApi".into(),
        required: true,
    }];
    records.push(lm);

    let mut memory = record(
        "@n8n/n8n-nodes-langchain.memoryBufferWindow",
        "memoryBufferWindow",
        "Window Buffer Memory",
        "AI",
        1.3,
        &[1.0, 1.3],
    );
    memory.description = "Keeps the last N turns of conversation context".into();
    memory.supports_error_output = false;
    records.push(memory);

    let mut parser = record(
        "@n8n/n8n-nodes-langchain.outputParserStructured",
        "outputParserStructured",
        "Structured Output Parser",
        "AI",
        1.2,
        &[1.0, 1.2],
    );
    parser.description = "Parses model output against a JSON schema".into();
    parser.supports_error_output = false;
    records.push(parser);

    let mut tool = record(
        "@n8n/n8n-nodes-langchain.toolHttpRequest",
        "toolHttpRequest",
        "HTTP Request Tool",
        "AI",
        1.1,
        &[1.0, 1.1],
    );
    tool.description = "Exposes an HTTP request as an agent tool".into();
    tool.supports_error_output = false;
    tool.properties = vec![
        PropertyDescriptor::new("toolDescription", PropertyKind::String).required(),
        PropertyDescriptor::new("url", PropertyKind::String).required(),
        PropertyDescriptor::new("method", PropertyKind::Options)
            .with_default(json!("GET"))
            .with_options(&["DELETE", "GET", "PATCH", "POST", "PUT"]),
    ];
    records.push(tool);

    let mut embeddings = record(
        "@n8n/n8n-nodes-langchain.embeddingsOpenAi",
        "embeddingsOpenAi",
        "OpenAI Embeddings",
        "AI",
        1.2,
        &[1.0, 1.2],
    );
    embeddings.description = "Embedding model connection".into();
    embeddings.supports_error_output = false;
    records.push(embeddings);

    let mut vector = record(
        "@n8n/n8n-nodes-langchain.vectorStoreInMemory",
        "vectorStoreInMemory",
        "In-Memory Vector Store",
        "AI",
        1.1,
        &[1.0, 1.1],
    );
    vector.description = "Stores embeddings in process memory".into();
    vector.supports_error_output = false;
    records.push(vector);

    records
}

/// A small template set for search tests.
pub fn fixture_templates() -> Vec<TemplateRecord> {
    vec![
        TemplateRecord {
            id: 1001,
            name: "Webhook to Slack alert".into(),
            description: "Posts incoming webhook payloads to a Slack channel".into(),
            workflow: json!({
                "name": "Webhook to Slack alert",
                "nodes": [
                    {"name": "Webhook", "type": "n8n-nodes-base.webhook", "typeVersion": 2,
                     "position": [0, 0], "parameters": {"path": "alerts", "httpMethod": "POST"}},
                    {"name": "Slack", "type": "n8n-nodes-base.slack", "typeVersion": 2.3,
                     "position": [220, 0],
                     "parameters": {"resource": "message", "operation": "post",
                                    "channelId": "#alerts", "text": "={{ $json.body.message }}"}}
                ],
                "connections": {
                    "Webhook": {"main": [[{"node": "Slack", "type": "main", "index": 0}]]}
                }
            }),
            node_count: 2,
            views: 15320,
            complexity: "simple".into(),
            category: "DevOps".into(),
            tasks: vec!["alerting".into()],
            services: vec!["slack".into()],
            setup_minutes: 5,
        },
        TemplateRecord {
            id: 1002,
            name: "AI agent with HTTP tool".into(),
            description: "Chat-triggered agent that can call an HTTP API".into(),
            workflow: json!({
                "name": "AI agent with HTTP tool",
                "nodes": [
                    {"name": "Chat Trigger", "type": "@n8n/n8n-nodes-langchain.chatTrigger",
                     "typeVersion": 1.1, "position": [0, 0], "parameters": {}},
                    {"name": "Agent", "type": "@n8n/n8n-nodes-langchain.agent",
                     "typeVersion": 2.1, "position": [220, 0], "parameters": {}},
                    {"name": "Model", "type": "@n8n/n8n-nodes-langchain.lmChatOpenAi",
                     "typeVersion": 1.2, "position": [220, 200], "parameters": {}},
                    {"name": "Lookup", "type": "@n8n/n8n-nodes-langchain.toolHttpRequest",
                     "typeVersion": 1.1, "position": [400, 200],
                     "parameters": {"toolDescription": "Look up order status",
                                    "url": "https://api.example.com/orders"}}
                ],
                "connections": {
                    "Chat Trigger": {"main": [[{"node": "Agent", "type": "main", "index": 0}]]},
                    "Model": {"ai_languageModel": [[{"node": "Agent", "type": "ai_languageModel", "index": 0}]]},
                    "Lookup": {"ai_tool": [[{"node": "Agent", "type": "ai_tool", "index": 0}]]}
                }
            }),
            node_count: 4,
            views: 8211,
            complexity: "medium".into(),
            category: "AI".into(),
            tasks: vec!["agent".into(), "chat".into()],
            services: vec!["openai".into()],
            setup_minutes: 15,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_resolves_alias_and_qualified() {
        let catalog = StaticCatalog::with_fixtures();
        let by_alias = catalog.lookup("httpRequest").unwrap().unwrap();
        let by_type = catalog.lookup("n8n-nodes-base.httpRequest").unwrap().unwrap();
        assert_eq!(by_alias.node_type, by_type.node_type);
    }

    #[test]
    fn langchain_alias_resolves_through_prefix_list() {
        let catalog = StaticCatalog::with_fixtures();
        let agent = catalog.lookup("agent").unwrap().unwrap();
        assert_eq!(agent.node_type, "@n8n/n8n-nodes-langchain.agent");
    }

    #[test]
    fn unknown_type_is_none() {
        let catalog = StaticCatalog::with_fixtures();
        assert!(catalog.lookup("n8n-nodes-base.nope").unwrap().is_none());
    }

    #[test]
    fn or_search_ranks_matches() {
        let catalog = StaticCatalog::with_fixtures();
        let hits = catalog.search("http request", SearchMode::Or, 10).unwrap();
        assert!(!hits.is_empty());
        assert_eq!(hits[0].node_type, "n8n-nodes-base.httpRequest");
    }

    #[test]
    fn and_search_requires_all_terms() {
        let catalog = StaticCatalog::with_fixtures();
        let hits = catalog.search("slack zebra", SearchMode::And, 10).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn short_query_boosts_exact_alias() {
        let catalog = StaticCatalog::with_fixtures();
        let hits = catalog.search("set", SearchMode::Or, 5).unwrap();
        assert_eq!(hits[0].node_type, "n8n-nodes-base.set");
    }

    #[test]
    fn property_search_matches_names() {
        let catalog = StaticCatalog::with_fixtures();
        let hits = catalog
            .search_properties("httpRequest", "url", 10)
            .unwrap();
        assert!(hits.iter().any(|h| h.name == "url"));
    }

    #[test]
    fn template_search_matches_services() {
        let catalog = StaticCatalog::with_fixtures();
        let hits = catalog.search_templates("slack", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 1001);
        assert!(catalog.get_template(1001).unwrap().is_some());
    }
}
