//! Init command handlers
//!
//! Generates editor support for release definitions: a `.luarc.json` for
//! the Lua Language Server and stub files for the sandbox globals.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use slipway_core::RunVars;
use slipway_lua::ModuleRegistry;
use std::fs;
use std::path::Path;

const STUBS_DIR: &str = ".slipway/stubs";

/// Init subcommands
#[derive(Subcommand)]
pub enum InitCommands {
    /// Generate Lua development files (.luarc.json and stubs)
    Lua {
        /// Output directory for generated files
        #[arg(short, long, default_value = ".")]
        output: String,

        /// Generate only .luarc.json
        #[arg(long)]
        config_only: bool,

        /// Generate only stub files
        #[arg(long)]
        stubs_only: bool,
    },
}

pub async fn handle_init_command(command: InitCommands) -> Result<()> {
    match command {
        InitCommands::Lua {
            output,
            config_only,
            stubs_only,
        } => generate_lua_dev_files(Path::new(&output), config_only, stubs_only),
    }
}

fn generate_lua_dev_files(output_path: &Path, config_only: bool, stubs_only: bool) -> Result<()> {
    if !stubs_only {
        generate_luarc_json(output_path)?;
    }

    if !config_only {
        generate_stub_files(output_path)?;
    }

    println!("{}", "✓ Lua development files generated!".green().bold());
    println!();
    println!("{}", "Next steps:".bold());
    println!("  1. Install Lua Language Server in your editor");
    println!("  2. Open your release.lua to see autocomplete and type hints");
    println!("  3. Use {} to check it", "slipway plan".cyan());

    Ok(())
}

/// Content of the generated .luarc.json
fn luarc_content() -> String {
    let config = serde_json::json!({
        "$schema": "https://raw.githubusercontent.com/sumneko/vscode-lua/master/setting/schema.json",
        "runtime": { "version": "Lua 5.4" },
        "diagnostics": { "globals": ["log", "env", "release"] },
        "workspace": {
            "library": [STUBS_DIR],
            "checkThirdParty": false
        },
        "completion": { "callSnippet": "Both" }
    });
    let mut content = serde_json::to_string_pretty(&config).unwrap_or_default();
    content.push('\n');
    content
}

fn generate_luarc_json(output_path: &Path) -> Result<()> {
    fs::create_dir_all(output_path)
        .with_context(|| format!("Failed to create {}", output_path.display()))?;
    let luarc_path = output_path.join(".luarc.json");

    fs::write(&luarc_path, luarc_content())
        .with_context(|| format!("Failed to write .luarc.json to {}", luarc_path.display()))?;

    println!("  {} .luarc.json", "Created".green());
    Ok(())
}

fn generate_stub_files(output_path: &Path) -> Result<()> {
    let stubs_dir = output_path.join(STUBS_DIR);
    fs::create_dir_all(&stubs_dir)
        .with_context(|| format!("Failed to create stubs directory at {}", stubs_dir.display()))?;

    // Stubs come from the same modules a run installs, so they stay in sync
    for (file_name, content) in ModuleRegistry::for_run(RunVars::new()).stub_files() {
        let stub_path = stubs_dir.join(&file_name);
        fs::write(&stub_path, content)
            .with_context(|| format!("Failed to write stub file {}", stub_path.display()))?;

        println!("  {} {}", "Created".green(), file_name);
    }

    println!(
        "  {} in {}",
        "Stubs ready".green(),
        stubs_dir.display().to_string().cyan()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_luarc_declares_sandbox_globals() {
        let value: serde_json::Value = serde_json::from_str(&luarc_content()).unwrap();
        assert_eq!(
            value["diagnostics"]["globals"],
            serde_json::json!(["log", "env", "release"])
        );
        assert_eq!(value["workspace"]["library"][0], STUBS_DIR);
    }

    #[test]
    fn test_generates_config_and_stubs() {
        let dir = tempfile::tempdir().unwrap();
        generate_lua_dev_files(dir.path(), false, false).unwrap();

        assert!(dir.path().join(".luarc.json").is_file());
        for id in ["log", "env", "release"] {
            let stub = fs::read_to_string(dir.path().join(STUBS_DIR).join(format!("{id}.lua")))
                .unwrap();
            assert!(stub.starts_with("---@meta"));
        }
    }

    #[test]
    fn test_config_only() {
        let dir = tempfile::tempdir().unwrap();
        generate_lua_dev_files(dir.path(), true, false).unwrap();

        assert!(dir.path().join(".luarc.json").is_file());
        assert!(!dir.path().join(".slipway").exists());
    }

    #[test]
    fn test_stubs_only() {
        let dir = tempfile::tempdir().unwrap();
        generate_lua_dev_files(dir.path(), false, true).unwrap();

        assert!(!dir.path().join(".luarc.json").exists());
        assert!(dir.path().join(STUBS_DIR).join("release.lua").is_file());
    }
}
