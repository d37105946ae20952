//! High-level command orchestration for the CLI.
//!
//! Each function here corresponds to a subcommand in `main.rs`. Handlers
//! receive everything they need as parameters: the user directory handle, the
//! UI context and the writer that receives command output. Nothing is looked
//! up from global state, so the same handlers run against a fake directory
//! in tests.

use anstyle::AnsiColor;
use anyhow::{Context, Result, bail};
use chrono::DateTime;
use std::io::Write;
use tracing::{debug, info};

use crate::claims::{parse_claims, validate_claims};
use crate::client::{UserDirectory, UserRecord};
use crate::config::{Credential, CredentialSet};
use crate::doctor::run_doctor;
use crate::paths::Paths;
use crate::session;
use crate::toolkit::IdentityToolkitClient;
use crate::ui::Ui;
use crate::uid::is_valid_uid;
use crate::{GIT_COMMIT, VERSION};

/// Users requested per listing call
pub const PAGE_SIZE: u32 = 100;

/// Open a session for `credential`. Failure aborts the invocation.
pub fn connect(credential: &Credential, ui: &Ui) -> Result<IdentityToolkitClient> {
    let spinner = ui.spinner(format!("Connecting to project '{}'...", credential.project_id));
    let result = session::open(&credential.bytes);
    spinner.finish_and_clear();

    result.with_context(|| {
        format!(
            "Failed to initialize identity client for project '{}' ({})",
            credential.project_id,
            credential.path.display()
        )
    })
}

/// Show one user, looked up by uid or email
pub fn get_user(
    directory: &dyn UserDirectory,
    uid_or_email: &str,
    out: &mut dyn Write,
) -> Result<()> {
    let user = lookup_user(directory, uid_or_email)?;
    display_user(out, &user)
}

/// Resolve a uid-or-email argument to a user record.
///
/// A uid-shaped argument is looked up by uid first. Only when no such user
/// exists is the same string tried as an email; a successful uid lookup is
/// final. Anything else is looked up by email directly.
pub fn lookup_user(directory: &dyn UserDirectory, uid_or_email: &str) -> Result<UserRecord> {
    if is_valid_uid(uid_or_email) {
        match directory.get_user(uid_or_email) {
            Ok(user) => return Ok(user),
            Err(e) if e.is_not_found() => {
                debug!(error = %e, "uid lookup missed, trying as email");
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to look up user {}", uid_or_email));
            }
        }
    }

    directory
        .get_user_by_email(uid_or_email)
        .with_context(|| format!("Failed to look up user {}", uid_or_email))
}

/// List every user with an email, one page at a time.
///
/// Each page is written and flushed before the next is requested, so rows
/// printed before a failing page stay visible. Listing is not a snapshot:
/// users created or deleted while paging may be missed or repeated.
pub fn list_users(directory: &dyn UserDirectory, ui: &Ui, out: &mut dyn Write) -> Result<()> {
    let mut page_token = String::new();
    let mut page_number = 0usize;
    let mut listed = 0usize;

    loop {
        page_number += 1;
        let page = directory
            .list_users(&page_token, PAGE_SIZE)
            .with_context(|| format!("Failed to fetch page {} of users", page_number))?;

        let mut table = ui.simple_table();
        if page_number == 1 {
            table.set_header(vec![
                ui.header_cell("UID"),
                ui.header_cell("Email"),
                ui.header_cell("DISPLAY NAME"),
            ]);
        }

        let mut rows = 0usize;
        for user in page.users.iter().filter(|u| !u.email.is_empty()) {
            table.add_row(vec![
                ui.cell(&user.uid),
                ui.cell(&user.email),
                ui.cell(&user.display_name),
            ]);
            rows += 1;
        }

        if page_number == 1 || rows > 0 {
            writeln!(out, "{table}").context("Failed to write user listing")?;
        }
        out.flush().context("Failed to write user listing")?;

        debug!(page = page_number, fetched = page.users.len(), rows, "listed page");
        listed += rows;

        if page.next_page_token.is_empty() {
            break;
        }
        page_token = page.next_page_token;
    }

    info!(pages = page_number, users = listed, "listing complete");
    Ok(())
}

/// Replace a user's custom claims and show the updated record
pub fn set_claims(
    directory: &dyn UserDirectory,
    uid: &str,
    json: &str,
    out: &mut dyn Write,
) -> Result<()> {
    if !is_valid_uid(uid) {
        bail!("User with uid {} not found.", uid);
    }

    let claims = parse_claims(json)?;
    validate_claims(&claims)?;

    directory
        .set_custom_claims(uid, &claims)
        .with_context(|| format!("Failed to set custom claims for user {}", uid))?;
    info!(%uid, keys = claims.len(), "custom claims replaced");

    let user = directory
        .get_user(uid)
        .with_context(|| format!("Failed to fetch user {} after updating claims", uid))?;
    display_user(out, &user)
}

/// Render a user record, one field per line
pub fn display_user(out: &mut dyn Write, user: &UserRecord) -> Result<()> {
    let claims =
        serde_json::to_string(&user.custom_claims).context("Failed to serialize custom claims")?;

    writeln!(out, "UID: {}", user.uid)?;
    writeln!(out, "Email: {}", user.email)?;
    writeln!(out, "Display name: {}", user.display_name)?;
    writeln!(
        out,
        "Email verified: {}",
        if user.email_verified { "Yes" } else { "No" }
    )?;
    writeln!(out, "CustomClaims: {}", claims)?;
    writeln!(out, "Created: {}", format_created(user.creation_timestamp))?;
    out.flush()?;
    Ok(())
}

/// Format an epoch-millisecond timestamp as an RFC 1123 date in UTC
pub fn format_created(millis: i64) -> String {
    match DateTime::from_timestamp(millis / 1000, 0) {
        Some(at) => at.format("%a, %d %b %Y %H:%M:%S UTC").to_string(),
        None => format!("{} ms since epoch", millis),
    }
}

/// List configured service accounts
pub fn projects(
    credentials: &CredentialSet,
    selected: &Credential,
    ui: &Ui,
    out: &mut dyn Write,
) -> Result<()> {
    let mut table = ui.simple_table();
    table.set_header(vec![
        ui.header_cell(""),
        ui.header_cell("Project"),
        ui.header_cell("Credential file"),
        ui.header_cell("Status"),
    ]);

    for credential in credentials.iter() {
        let is_selected = credential.project_id == selected.project_id;
        let icon = if is_selected { ui.icon_ok() } else { " " };
        let status = if is_selected {
            ui.colored_cell("selected", AnsiColor::Green)
        } else if credential.project_id == credentials.current().project_id {
            ui.cell("default")
        } else {
            ui.cell("-")
        };

        table.add_row(vec![
            ui.cell(icon),
            ui.cell(&credential.project_id),
            ui.cell(credential.path.display().to_string()),
            status,
        ]);
    }

    writeln!(out, "{table}")?;
    Ok(())
}

/// Print version and build commit
pub fn version(out: &mut dyn Write) -> Result<()> {
    writeln!(out, "fbauth {} ({})", VERSION, GIT_COMMIT)?;
    writeln!(out, "Version: {}", VERSION)?;
    writeln!(out, "Git commit: {}", GIT_COMMIT)?;
    Ok(())
}

/// Run diagnostics and summarize them. Failed checks are reported, not fatal.
pub fn doctor(paths: &Paths, ui: &Ui) -> Result<()> {
    let failures = run_doctor(paths, ui);
    if failures == 0 {
        ui.ok("No issues found");
    } else {
        ui.warn(format!("{} check(s) reported issues", failures));
    }
    debug!(failures, "doctor finished");
    Ok(())
}
