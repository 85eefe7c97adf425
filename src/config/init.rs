// ABOUTME: Config scaffolding for new projects.
// ABOUTME: Creates strata.yml template files.

use std::path::Path;

use crate::error::{Error, Result};

use super::{CONFIG_FILENAME, Config};

pub fn init_config(dir: &Path, project: Option<&str>, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let mut config = Config::template();

    if let Some(p) = project {
        if p.is_empty() {
            return Err(Error::InvalidConfig("project cannot be empty".to_string()));
        }
        config.project = p.to_string();
    }

    let yaml = generate_template_yaml(&config);
    std::fs::write(&config_path, yaml)?;

    Ok(())
}

fn generate_template_yaml(config: &Config) -> String {
    format!(
        r#"project: {}
template_dir: {}
api:
  endpoint: {}
  # token: {{env: STRATA_API_TOKEN}}
# Completion monitoring: polling (default) or notifications.
# monitor: notifications
# queue:
#   endpoint: queue.example.com:8701
#   queue_name: strata-events
"#,
        config.project,
        config.template_dir.display(),
        config.api.endpoint,
    )
}
