//! Diagnostic tool for fbauth.
//!
//! This module implements the `fbauth doctor` command, which checks the local
//! setup without contacting the identity provider:
//! - Existence of the config directory and manifest.
//! - Validity of the manifest.
//! - Readability and shape of every referenced service account key.
//! - Environment overrides.
//!
//! It reports issues to the user with a pass/fail/warn status.

use anstyle::AnsiColor;
use std::collections::HashSet;
use std::env;
use std::fs;

use crate::config::Manifest;
use crate::paths::Paths;
use crate::session::{EMULATOR_HOST_ENV, ServiceAccountKey};
use crate::ui::Ui;

/// Run the doctor diagnostics. Returns the number of failed checks.
pub fn run_doctor(paths: &Paths, ui: &Ui) -> usize {
    ui.section("fbauth Doctor");
    ui.newline();

    let mut failures = 0;

    // 1. Check directories
    failures += check_step(ui, "Config Directory", || {
        if paths.base_dir.is_dir() {
            ui.println(format!(
                "  {} Config directory exists: {}",
                ui.icon_ok(),
                paths.base_dir.display()
            ));
            true
        } else {
            ui.println(format!(
                "  {} Config directory missing: {}",
                ui.icon_err(),
                paths.base_dir.display()
            ));
            false
        }
    });

    // 2. Check the manifest itself
    let mut manifest = None;
    failures += check_step(ui, "Config File", || match Manifest::read(&paths.config_file) {
        Ok(parsed) => {
            ui.println(format!(
                "  {} Config file valid: {}",
                ui.icon_ok(),
                paths.config_file.display()
            ));
            if parsed.service_accounts.is_empty() {
                ui.println(format!("  {} No service accounts configured", ui.icon_err()));
                return false;
            }
            ui.println(format!(
                "  {} Default project: {}",
                ui.icon_info(),
                parsed.service_accounts[0].project_id
            ));
            manifest = Some(parsed);
            true
        }
        Err(e) => {
            if paths.config_file.exists() {
                ui.println(format!("  {} Config file invalid: {:#}", ui.icon_err(), e));
            } else {
                ui.println(format!(
                    "  {} Config file missing: {}",
                    ui.icon_err(),
                    paths.config_file.display()
                ));
            }
            false
        }
    });

    // 3. Check every credential the manifest references
    if let Some(manifest) = &manifest {
        failures += check_step(ui, "Service Accounts", || {
            ui.println(format!(
                "  Found {} service account(s):",
                manifest.service_accounts.len()
            ));
            let mut all_valid = true;
            let mut seen = HashSet::new();

            for entry in &manifest.service_accounts {
                let name = &entry.project_id;
                if !seen.insert(name.as_str()) {
                    ui.println(format!("    {} {} (configured more than once)", ui.icon_err(), name));
                    all_valid = false;
                    continue;
                }

                let path = paths.resolve_credential_path(&entry.filepath);
                let bytes = match fs::read(&path) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        ui.println(format!(
                            "    {} {} (cannot read {}: {})",
                            ui.icon_err(),
                            name,
                            path.display(),
                            e
                        ));
                        all_valid = false;
                        continue;
                    }
                };

                match ServiceAccountKey::from_slice(&bytes) {
                    Ok(key) if key.project_id != *name => {
                        ui.println(format!(
                            "    {} {} (key belongs to project '{}')",
                            ui.icon_warn(),
                            name,
                            key.project_id
                        ));
                    }
                    Ok(key) => {
                        ui.println(format!("    {} {} ({})", ui.icon_ok(), name, key.client_email));
                    }
                    Err(e) => {
                        ui.println(format!("    {} {} ({})", ui.icon_err(), name, e));
                        all_valid = false;
                    }
                }
            }
            all_valid
        });
    }

    // 4. Environment
    check_step(ui, "Environment", || {
        match env::var(EMULATOR_HOST_ENV) {
            Ok(host) => ui.println(format!(
                "  {} {} set: requests go to the emulator at {}",
                ui.icon_warn(),
                EMULATOR_HOST_ENV,
                host
            )),
            Err(_) => ui.println(format!(
                "  {} {} not set (using the production service)",
                ui.icon_info(),
                EMULATOR_HOST_ENV
            )),
        }
        if let Ok(filter) = env::var("RUST_LOG") {
            ui.println(format!("  {} RUST_LOG set to: {}", ui.icon_info(), filter));
        }
        true
    });

    failures
}

fn check_step<F>(ui: &Ui, name: &str, check_fn: F) -> usize
where
    F: FnOnce() -> bool,
{
    ui.println(ui.bold(format!("Checking {}...", name)));
    let success = check_fn();
    if !success {
        ui.println(ui.colored("  Issues detected!", AnsiColor::Red));
    }
    ui.newline();
    usize::from(!success)
}
