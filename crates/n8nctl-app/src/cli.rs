//! Command-line definitions.
//!
//! The command tree mirrors the platform's resource model: `workflows` holds
//! the offline engines (validate, autofix, diff, trigger) alongside the
//! remote CRUD surface; `versions` exposes the local history store.

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "n8nctl",
    version,
    about = "Agent-first command line for n8n workflow engineering",
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Args)]
pub struct GlobalOptions {
    /// Emit the machine-readable JSON envelope
    #[arg(long, global = true)]
    pub json: bool,

    /// Write the full result envelope to a file
    #[arg(long, global = true, value_name = "PATH")]
    pub save: Option<String>,

    /// Verbose diagnostics on stderr
    #[arg(long, short = 'v', global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Errors only on stderr
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Named configuration profile
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,

    /// Instance base URL (overrides config)
    #[arg(long, global = true, value_name = "URL")]
    pub host: Option<String>,

    /// API key (overrides config; prefer N8N_API_KEY)
    #[arg(long, global = true, value_name = "KEY")]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true, value_name = "SECONDS")]
    pub timeout: Option<u64>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage, validate, repair, and mutate workflows
    Workflows {
        #[command(subcommand)]
        command: WorkflowCommand,
    },
    /// Inspect local workflow version history
    Versions {
        #[command(subcommand)]
        command: VersionCommand,
    },
    /// Search the bundled node catalog
    Nodes {
        #[command(subcommand)]
        command: NodeCommand,
    },
    /// Search and fetch bundled workflow templates
    Templates {
        #[command(subcommand)]
        command: TemplateCommand,
    },
    /// Inspect and retry executions on the instance
    Executions {
        #[command(subcommand)]
        command: ExecutionCommand,
    },
    /// Manage credentials on the instance
    Credentials {
        #[command(subcommand)]
        command: CredentialCommand,
    },
    /// Manage instance variables
    Variables {
        #[command(subcommand)]
        command: VariableCommand,
    },
    /// Manage workflow tags
    Tags {
        #[command(subcommand)]
        command: TagCommand,
    },
    /// Generate a security audit report
    Audit,
    /// Verify the configured API key against the instance
    Auth,
    /// Check instance health
    Health,
    /// Show or initialize configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Workflow input selection: a local file, a remote id, or inline JSON.
#[derive(Debug, Clone, Args)]
pub struct WorkflowInput {
    /// Read the workflow from a local JSON file
    #[arg(long, value_name = "PATH", conflicts_with_all = ["id", "inline"])]
    pub file: Option<String>,

    /// Fetch the workflow from the instance by id
    #[arg(long, value_name = "ID", conflicts_with = "inline")]
    pub id: Option<String>,

    /// Inline workflow JSON
    #[arg(long, value_name = "JSON")]
    pub inline: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum WorkflowCommand {
    /// List workflows on the instance
    List {
        /// Only active (or only inactive with =false) workflows
        #[arg(long)]
        active: Option<bool>,
        /// Filter by tag names (comma-separated)
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        cursor: Option<String>,
    },
    /// Fetch one workflow
    Get {
        #[arg(long)]
        id: String,
        /// Write the workflow JSON to a file
        #[arg(long, value_name = "PATH")]
        output: Option<String>,
    },
    /// Create a workflow from a file
    Create {
        #[arg(long, value_name = "PATH")]
        file: String,
    },
    /// Update a workflow from a file
    Update {
        #[arg(long)]
        id: String,
        #[arg(long, value_name = "PATH")]
        file: String,
    },
    /// Delete workflows
    Delete {
        /// Workflow ids (comma-separated)
        #[arg(long, value_delimiter = ',', required = true)]
        ids: Vec<String>,
        /// Skip the confirmation prompt
        #[arg(long, visible_alias = "yes")]
        force: bool,
    },
    /// Activate workflows
    Activate {
        #[arg(long, value_delimiter = ',', required = true)]
        ids: Vec<String>,
    },
    /// Deactivate workflows
    Deactivate {
        #[arg(long, value_delimiter = ',', required = true)]
        ids: Vec<String>,
    },
    /// Validate a workflow without contacting the instance
    Validate {
        #[command(flatten)]
        input: WorkflowInput,
        /// Validation profile: minimal, runtime, ai-friendly, strict
        #[arg(long, value_name = "PROFILE")]
        validation_profile: Option<String>,
        /// Property mode: minimal, operation, full
        #[arg(long, value_name = "MODE")]
        mode: Option<String>,
        /// Attempt syntax repair while parsing
        #[arg(long)]
        repair: bool,
        /// Skip expression checks
        #[arg(long)]
        no_expressions: bool,
        /// Skip typeVersion currency checks
        #[arg(long)]
        no_versions: bool,
    },
    /// Propose (and optionally apply) fixes for validation findings
    Autofix {
        #[command(flatten)]
        input: WorkflowInput,
        /// Apply the fixes instead of previewing them
        #[arg(long)]
        apply: bool,
        /// Minimum confidence: high, medium, low
        #[arg(long, value_name = "LEVEL")]
        confidence: Option<String>,
        /// Only run these fix generators (comma-separated)
        #[arg(long, value_delimiter = ',', value_name = "TYPES")]
        fix_types: Vec<String>,
        /// Cap the number of applied fixes
        #[arg(long, value_name = "N")]
        max_fixes: Option<usize>,
        /// Write the fixed workflow to a file (with --file input)
        #[arg(long, value_name = "PATH")]
        output: Option<String>,
    },
    /// Apply surgical diff operations to a workflow
    Diff {
        #[command(flatten)]
        input: WorkflowInput,
        /// Operations JSON (inline or @file)
        #[arg(long, value_name = "JSON|@PATH", required = true)]
        operations: String,
        /// Apply the result instead of previewing it
        #[arg(long)]
        apply: bool,
        /// Keep going after a failed operation
        #[arg(long)]
        continue_on_error: bool,
        /// Write the mutated workflow to a file (with --file input)
        #[arg(long, value_name = "PATH")]
        output: Option<String>,
    },
    /// Trigger a webhook URL (SSRF-guarded)
    Trigger {
        #[arg(long, value_name = "URL")]
        url: String,
        #[arg(long, default_value = "POST")]
        method: String,
        /// JSON body (inline or @file)
        #[arg(long, value_name = "JSON|@PATH")]
        body: Option<String>,
        /// Extra headers as name:value
        #[arg(long, value_name = "NAME:VALUE")]
        header: Vec<String>,
        /// Webhook request timeout in seconds
        #[arg(long = "request-timeout", value_name = "SECONDS")]
        timeout: Option<u64>,
        /// SSRF guard mode: strict, moderate, off
        #[arg(long, value_name = "MODE")]
        guard: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum VersionCommand {
    /// List stored versions of a workflow
    List {
        #[arg(long, value_name = "ID")]
        workflow_id: String,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Fetch one stored snapshot
    #[command(disable_version_flag = true)]
    Get {
        #[arg(long, value_name = "ID")]
        workflow_id: String,
        #[arg(long)]
        version: u64,
        /// Write the snapshot workflow JSON to a file
        #[arg(long, value_name = "PATH")]
        output: Option<String>,
    },
    /// Compare two stored versions
    Compare {
        #[arg(long, value_name = "ID")]
        workflow_id: String,
        #[arg(long)]
        from: u64,
        #[arg(long)]
        to: u64,
    },
    /// Roll the remote workflow back to a stored version
    Rollback {
        #[arg(long, value_name = "ID")]
        workflow_id: String,
        #[arg(long)]
        to_version: u64,
        /// Skip the pre-rollback snapshot
        #[arg(long)]
        no_backup: bool,
        /// Push the target state without validating it first
        #[arg(long)]
        no_validate: bool,
        /// Apply without confirmation
        #[arg(long, visible_alias = "yes")]
        force: bool,
    },
    /// Prune old versions of a workflow
    Prune {
        #[arg(long, value_name = "ID")]
        workflow_id: String,
        /// Versions to keep
        #[arg(long, default_value_t = 10)]
        keep: usize,
    },
    /// Delete all stored versions of a workflow
    Delete {
        #[arg(long, value_name = "ID")]
        workflow_id: String,
        #[arg(long, visible_alias = "yes")]
        force: bool,
    },
    /// Store statistics
    Stats,
}

#[derive(Debug, Subcommand)]
pub enum NodeCommand {
    /// Search node types
    Search {
        query: String,
        /// Search mode: or, and, fuzzy
        #[arg(long, default_value = "or")]
        mode: String,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Show one node type's descriptor
    Info {
        /// Qualified type or short alias
        node_type: String,
    },
    /// Search a node type's properties
    Properties {
        node_type: String,
        query: String,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Suggest replacements for an unknown node type
    Suggest {
        bad_type: String,
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
}

#[derive(Debug, Subcommand)]
pub enum TemplateCommand {
    /// Search bundled templates
    Search {
        query: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Fetch one template (workflow JSON ready to import)
    Get {
        id: i64,
        /// Write the template workflow to a file
        #[arg(long, value_name = "PATH")]
        output: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum ExecutionCommand {
    /// List executions
    List {
        #[arg(long, value_name = "ID")]
        workflow_id: Option<String>,
        /// Filter by status (success, error, waiting)
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        cursor: Option<String>,
    },
    /// Fetch one execution
    Get {
        id: String,
        /// Include full execution data
        #[arg(long)]
        data: bool,
    },
    /// Delete an execution
    Delete {
        id: String,
        #[arg(long, visible_alias = "yes")]
        force: bool,
    },
    /// Retry a failed execution
    Retry {
        id: String,
        /// Retry with the latest workflow definition
        #[arg(long)]
        load_latest: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum CredentialCommand {
    /// Create a credential from a JSON file
    Create {
        #[arg(long, value_name = "PATH")]
        file: String,
    },
    /// Delete a credential
    Delete {
        id: String,
        #[arg(long, visible_alias = "yes")]
        force: bool,
    },
    /// Show the schema of a credential type
    Schema { credential_type: String },
}

#[derive(Debug, Subcommand)]
pub enum VariableCommand {
    List,
    Create {
        #[arg(long)]
        key: String,
        #[arg(long)]
        value: String,
    },
    Delete {
        id: String,
        #[arg(long, visible_alias = "yes")]
        force: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum TagCommand {
    List,
    Create {
        name: String,
    },
    Delete {
        id: String,
        #[arg(long, visible_alias = "yes")]
        force: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration (secrets redacted)
    Show,
    /// Write a starter config file
    Init {
        /// Target path (defaults to ~/.n8nctl.toml)
        #[arg(long, value_name = "PATH")]
        path: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_tree_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn validate_accepts_file_input() {
        let cli = Cli::parse_from([
            "n8nctl",
            "--json",
            "workflows",
            "validate",
            "--file",
            "wf.json",
            "--validation-profile",
            "ai-friendly",
        ]);
        assert!(cli.global.json);
        match cli.command {
            Command::Workflows {
                command:
                    WorkflowCommand::Validate {
                        input,
                        validation_profile,
                        ..
                    },
            } => {
                assert_eq!(input.file.as_deref(), Some("wf.json"));
                assert_eq!(validation_profile.as_deref(), Some("ai-friendly"));
            }
            _ => panic!("wrong command parsed"),
        }
    }

    #[test]
    fn bulk_ids_split_on_commas() {
        let cli = Cli::parse_from(["n8nctl", "workflows", "activate", "--ids", "a,b,c"]);
        match cli.command {
            Command::Workflows {
                command: WorkflowCommand::Activate { ids },
            } => assert_eq!(ids, vec!["a", "b", "c"]),
            _ => panic!("wrong command parsed"),
        }
    }

    #[test]
    fn file_and_id_inputs_conflict() {
        let result = Cli::try_parse_from([
            "n8nctl",
            "workflows",
            "validate",
            "--file",
            "a.json",
            "--id",
            "w1",
        ]);
        assert!(result.is_err());
    }
}
