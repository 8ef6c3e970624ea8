//! Config synchronizer
//!
//! Persists `{app_name, framework}` into the project manifest and
//! materializes the active-application directory from the matching framework
//! template. With no arguments it re-runs materialization from the persisted
//! manifest, which makes it an idempotent repair step after a manual edit.

use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use crate::config::manifest::{APP_SRC_DIR, MANIFEST_FILE};
use crate::config::{Framework, Manifest, Project};
use crate::error::{DevkitError, DevkitResult};

/// Identifier-safe application names: letters, digits, hyphens, underscores.
const APP_NAME_PATTERN: &str = r"^[A-Za-z0-9_-]+$";

/// OCI title label in a Dockerfile embedding the application name.
const TITLE_LABEL_PATTERN: &str =
    r#"(?m)^(LABEL\s+org\.opencontainers\.image\.title=")[^"]*(")"#;

fn app_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(APP_NAME_PATTERN).expect("hard-coded pattern"))
}

fn title_label_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(TITLE_LABEL_PATTERN).expect("hard-coded pattern"))
}

/// Validate an application name against the identifier-safe pattern.
pub fn validate_app_name(name: &str) -> DevkitResult<()> {
    if name.is_empty() || !app_name_regex().is_match(name) {
        return Err(DevkitError::Usage(format!(
            "app name must contain only letters, numbers, hyphens, and underscores (got '{}')",
            name
        )));
    }
    Ok(())
}

/// Copy every regular file from the framework's template directory into the
/// active-application directory, replacing same-named files and leaving
/// unrelated destination files alone. Returns the copied file names.
pub fn materialize(
    templates_dir: &Path,
    app_dir: &Path,
    framework: Framework,
) -> DevkitResult<Vec<String>> {
    let src = templates_dir.join(framework.template_dir());
    if !src.is_dir() {
        return Err(DevkitError::Config(format!(
            "no template directory for framework '{}' (expected {})",
            framework,
            src.display()
        )));
    }

    fs::create_dir_all(app_dir)?;

    let mut entries: Vec<_> = fs::read_dir(&src)?.collect::<Result<_, _>>()?;
    entries.sort_by_key(|entry| entry.file_name());

    let mut copied = Vec::new();
    for entry in entries {
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        fs::copy(entry.path(), app_dir.join(entry.file_name()))?;
        copied.push(name);
    }

    Ok(copied)
}

/// Rewrite the application name embedded in the active application's build
/// descriptor, if it carries one. Returns whether a label was found.
pub fn sync_app_name_label(app_dir: &Path, app_name: &str) -> DevkitResult<bool> {
    let dockerfile = app_dir.join("Dockerfile");
    if !dockerfile.is_file() {
        return Ok(false);
    }

    let contents = fs::read_to_string(&dockerfile)?;
    if !title_label_regex().is_match(&contents) {
        return Ok(false);
    }

    let updated = title_label_regex()
        .replace(&contents, format!("${{1}}{}${{2}}", app_name))
        .into_owned();
    if updated != contents {
        fs::write(&dockerfile, updated)?;
        tracing::debug!(%app_name, "rewrote image title label in Dockerfile");
    }
    Ok(true)
}

/// Run the synchronizer.
///
/// `args` carries the validated-later `(app_name, framework)` pair from the
/// CLI, or `None` for the repair form that re-reads the persisted manifest.
pub fn run(project: &Project, args: Option<(String, Framework)>) -> DevkitResult<()> {
    let manifest = match args {
        Some((app_name, framework)) => {
            validate_app_name(&app_name)?;

            let mut manifest = Manifest::load_or_init(&project.manifest_path())?;
            manifest.webapp.app_name = app_name;
            manifest.webapp.framework = framework;
            manifest.save(&project.manifest_path())?;
            println!(
                "Updated {}: app_name = '{}', framework = '{}'",
                MANIFEST_FILE,
                manifest.webapp.app_name,
                manifest.webapp.framework
            );
            manifest
        }
        None => {
            let manifest = Manifest::load_or_init(&project.manifest_path())?;
            println!(
                "Syncing from {}: app_name = '{}', framework = '{}'",
                MANIFEST_FILE,
                manifest.webapp.app_name,
                manifest.webapp.framework
            );
            manifest
        }
    };

    let framework = manifest.webapp.framework;
    let copied = materialize(&project.templates_dir(), &project.app_dir(), framework)?;
    for name in &copied {
        println!("   {}", name);
    }

    if sync_app_name_label(&project.app_dir(), &manifest.webapp.app_name)? {
        println!("   Dockerfile image title set to '{}'", manifest.webapp.app_name);
    }

    println!(
        "Copied {} {} file(s) to {}/",
        copied.len(),
        framework,
        APP_SRC_DIR
    );
    Ok(())
}
