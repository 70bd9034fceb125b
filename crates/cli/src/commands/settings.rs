//! Settings Command

use anyhow::Result;
use clap::Args;

use cmdparity_common::{GpgKeyFields, Settings};

use crate::output::{print_success, print_value, print_warning, OutputFormat};

#[derive(Args)]
pub struct SettingsArgs {
    /// Print the effective settings with secrets masked
    #[arg(long)]
    pub show: bool,
}

pub fn execute(args: SettingsArgs, settings: &Settings, format: OutputFormat) -> Result<()> {
    let report = settings.validate();
    if report.is_ok() {
        print_success(&format!(
            "Settings in {} are valid",
            settings.root_dir().display()
        ));
    } else {
        // Only reachable with suite.ignore_validation_errors set
        print_warning(&format!("Settings have problems:\n{}", report));
    }

    match settings.admin_server_config() {
        Ok(config) => println!("API: {} as {}", config.url, config.username),
        Err(e) => print_warning(&e.to_string()),
    }
    println!("GPG key content: {}", default_gpg_key(settings));

    if args.show {
        let format = if format == OutputFormat::Table {
            OutputFormat::Yaml
        } else {
            format
        };
        print_value(&settings.masked(), format);
    }
    Ok(())
}

/// Content a GPG key create request gets when it names none
fn default_gpg_key(settings: &Settings) -> String {
    settings
        .gpg_key_defaults()
        .apply(GpgKeyFields::default())
        .content
        .unwrap_or_default()
}
