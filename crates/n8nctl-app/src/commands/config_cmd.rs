//! `config show` and `config init`.

use serde_json::json;

use crate::cli::ConfigCommand;
use crate::config::{redacted, STARTER_CONFIG};
use crate::context::AppContext;
use crate::envelope::Outcome;

pub fn run(ctx: &AppContext, command: ConfigCommand) -> Outcome {
    match command {
        ConfigCommand::Show => Outcome::success(redacted(&ctx.settings)),
        ConfigCommand::Init { path } => {
            let target = match path {
                Some(path) => std::path::PathBuf::from(path),
                None => match dirs::home_dir() {
                    Some(home) => home.join(".n8nctl.toml"),
                    None => {
                        return Outcome::error(
                            n8nctl_core::ErrorClass::Config,
                            "CONFIG_INVALID",
                            "cannot determine home directory; pass --path",
                            None,
                        )
                    }
                },
            };
            if target.exists() {
                return Outcome::error(
                    n8nctl_core::ErrorClass::CantCreate,
                    "CONFIG_EXISTS",
                    &format!("{} already exists; refusing to overwrite", target.display()),
                    None,
                );
            }
            if let Err(err) = std::fs::write(&target, STARTER_CONFIG) {
                return crate::commands::engine_error(err.into());
            }
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let _ = std::fs::set_permissions(&target, std::fs::Permissions::from_mode(0o600));
            }
            Outcome::success(json!({ "created": target.display().to_string() }))
        }
    }
}
