//! Schema commands

use super::Context;
use crate::format::pretty_schema;
use anyhow::{bail, Context as _, Result};
use schemaflow_registry::{
    load_schema_file, RegistryError, SchemaUpdate, SchemaVersion, UpdateCheck,
    VersionSelector,
};
use serde::Serialize;
use serde_json::json;
use tabled::Tabled;

#[derive(Serialize, Tabled)]
struct SubjectRow {
    #[tabled(rename = "Subject")]
    subject: String,
    #[tabled(rename = "Versions")]
    versions: String,
    #[tabled(rename = "Latest ID")]
    latest_id: String,
}

#[derive(Serialize, Tabled)]
struct VersionRow {
    #[tabled(rename = "Version")]
    version: i32,
    #[tabled(rename = "ID")]
    id: u32,
    #[tabled(rename = "Type")]
    schema_type: String,
}

pub async fn register(ctx: &Context, subject: &str, schema_file: &str) -> Result<()> {
    let definition = load_schema_file(schema_file)?;
    let registered = ctx
        .client
        .register_schema(subject, &definition)
        .await
        .context("Failed to register schema")?;

    if ctx.formatter.is_structured() {
        return ctx.formatter.print_value(&json!({
            "subject": subject,
            "id": registered.id,
            "version": registered.version,
        }));
    }

    ctx.formatter.print_success("Schema registered successfully!");
    ctx.formatter.print_key_value(&[
        ("Subject", subject.to_string()),
        ("Schema ID", registered.id.to_string()),
        ("Version", registered.version.to_string()),
    ]);
    Ok(())
}

pub async fn update(ctx: &Context, subject: &str, schema_file: &str, force: bool) -> Result<()> {
    let definition = load_schema_file(schema_file)?;

    let check = ctx
        .client
        .precheck_update(subject, &definition)
        .await
        .context("Failed to update schema")?;

    // Only the pre-check verdict prompts; a rejection on registration is final.
    if let UpdateCheck::Incompatible(messages) = &check {
        if !force {
            ctx.formatter
                .print_warning("New schema is not compatible with the latest version!");
            for message in messages {
                println!("  - {}", message);
            }
            if !ctx.confirm("Do you want to continue anyway?")? {
                ctx.formatter.print_info("Schema update cancelled.");
                return Ok(());
            }
        }
    }

    let update = ctx
        .client
        .apply_update(subject, &definition, check)
        .await
        .context("Failed to update schema")?;
    print_update(ctx, subject, &update)
}

fn print_update(ctx: &Context, subject: &str, update: &SchemaUpdate) -> Result<()> {
    if ctx.formatter.is_structured() {
        return ctx.formatter.print_value(&json!({
            "subject": subject,
            "id": update.registered.id,
            "version": update.registered.version,
            "first_version": update.first_version,
            "forced": update.forced,
            "warnings": update.warnings,
        }));
    }

    if update.first_version {
        ctx.formatter
            .print_info("No existing schema found. This will be the first version.");
    }
    for warning in &update.warnings {
        ctx.formatter
            .print_warning(&format!("Could not check compatibility: {}", warning));
    }
    ctx.formatter.print_success("Schema updated successfully!");
    ctx.formatter.print_key_value(&[
        ("Subject", subject.to_string()),
        ("New Schema ID", update.registered.id.to_string()),
        ("New Version", update.registered.version.to_string()),
    ]);
    Ok(())
}

pub async fn list(ctx: &Context, subject: Option<&str>) -> Result<()> {
    match subject {
        Some(subject) => list_versions(ctx, subject).await,
        None => list_subjects(ctx).await,
    }
}

async fn list_subjects(ctx: &Context) -> Result<()> {
    let subjects = ctx
        .client
        .list_subjects()
        .await
        .context("Failed to list subjects")?;

    if subjects.is_empty() && !ctx.formatter.is_structured() {
        ctx.formatter
            .print_info("No subjects found in the Schema Registry.");
        return Ok(());
    }

    let mut rows = Vec::with_capacity(subjects.len());
    for subject in subjects {
        let row = match subject_summary(ctx, &subject).await {
            Ok((versions, latest_id)) => SubjectRow {
                subject,
                versions,
                latest_id: latest_id.to_string(),
            },
            Err(e) => SubjectRow {
                subject,
                versions: "-".to_string(),
                latest_id: format!("error: {}", e),
            },
        };
        rows.push(row);
    }
    ctx.formatter.print_list(rows)
}

async fn subject_summary(ctx: &Context, subject: &str) -> Result<(String, u32), RegistryError> {
    let versions = ctx.client.list_versions(subject).await?;
    let latest = ctx.client.get_schema(subject, VersionSelector::Latest).await?;
    let versions: Vec<String> = versions.iter().map(i32::to_string).collect();
    Ok((versions.join(", "), latest.id))
}

async fn list_versions(ctx: &Context, subject: &str) -> Result<()> {
    let versions = ctx
        .client
        .list_versions(subject)
        .await
        .with_context(|| format!("Failed to list versions of '{}'", subject))?;

    let mut rows = Vec::with_capacity(versions.len());
    for version in versions {
        let schema = ctx
            .client
            .get_schema(subject, VersionSelector::Number(version))
            .await?;
        rows.push(VersionRow {
            version,
            id: schema.id,
            schema_type: schema.schema_type.to_string(),
        });
    }
    ctx.formatter.print_list(rows)
}

pub async fn get(
    ctx: &Context,
    subject: Option<&str>,
    version: VersionSelector,
    id: Option<u32>,
) -> Result<()> {
    if let Some(id) = id {
        let definition = ctx
            .client
            .get_schema_by_id(id)
            .await
            .with_context(|| format!("Failed to get schema {}", id))?;

        if ctx.formatter.is_structured() {
            return ctx.formatter.print_value(&definition);
        }
        println!("📄 Schema Details:");
        ctx.formatter.print_key_value(&[
            ("ID", id.to_string()),
            ("Type", definition.schema_type.to_string()),
        ]);
        println!("Schema:");
        println!("{}", pretty_schema(&definition.schema));
        return Ok(());
    }

    let Some(subject) = subject else {
        bail!("Must specify either --id or a subject");
    };
    let schema = ctx
        .client
        .get_schema(subject, version)
        .await
        .with_context(|| format!("Failed to get schema {} version {}", subject, version))?;

    if ctx.formatter.is_structured() {
        return ctx.formatter.print_value(&schema);
    }
    print_schema(ctx, &schema);
    Ok(())
}

fn print_schema(ctx: &Context, schema: &SchemaVersion) {
    println!("📄 Schema Details:");
    println!("{}", "=".repeat(50));
    ctx.formatter.print_key_value(&[
        ("Subject", schema.subject.clone()),
        ("Version", schema.version.to_string()),
        ("ID", schema.id.to_string()),
        ("Type", schema.schema_type.to_string()),
    ]);
    println!("Schema:");
    println!("{}", pretty_schema(&schema.schema));
}

/// Incompatible schemas exit non-zero so the command can gate CI.
pub async fn check_compatibility(
    ctx: &Context,
    subject: &str,
    schema_file: &str,
    version: VersionSelector,
) -> Result<()> {
    let definition = load_schema_file(schema_file)?;

    let check = match ctx
        .client
        .check_compatibility(subject, &definition, version)
        .await
    {
        Ok(check) => check,
        Err(e) if e.is_not_found() => {
            ctx.formatter
                .print_info("No existing schema found to check compatibility against.");
            return Ok(());
        }
        Err(e) => return Err(e).context("Failed to check compatibility"),
    };

    if ctx.formatter.is_structured() {
        ctx.formatter.print_value(&check)?;
    } else if check.is_compatible {
        ctx.formatter.print_success("Schema is compatible!");
    } else {
        println!("Compatibility issues:");
        for message in &check.messages {
            println!("  - {}", message);
        }
    }

    if !check.is_compatible {
        bail!("Schema is NOT compatible with {} version {}", subject, version);
    }
    Ok(())
}

pub async fn delete(
    ctx: &Context,
    subject: &str,
    version: Option<i32>,
    permanent: bool,
) -> Result<()> {
    let question = match version {
        Some(version) => format!(
            "Are you sure you want to delete version {} of subject '{}'?",
            version, subject
        ),
        None if permanent => format!(
            "Are you sure you want to PERMANENTLY delete subject '{}' and all its versions?",
            subject
        ),
        None => format!(
            "Are you sure you want to delete subject '{}' and all its versions?",
            subject
        ),
    };
    if !ctx.confirm(&question)? {
        ctx.formatter.print_info("Delete cancelled.");
        return Ok(());
    }

    match version {
        Some(version) => {
            let removed = ctx
                .client
                .delete_version(subject, version)
                .await
                .context("Failed to delete")?;
            if ctx.formatter.is_structured() {
                return ctx
                    .formatter
                    .print_value(&json!({ "subject": subject, "version": removed }));
            }
            ctx.formatter.print_success(&format!(
                "Deleted version {} of subject '{}'",
                removed, subject
            ));
        }
        None => {
            let removed = ctx
                .client
                .delete_subject(subject, permanent)
                .await
                .context("Failed to delete")?;
            if ctx.formatter.is_structured() {
                return ctx
                    .formatter
                    .print_value(&json!({ "subject": subject, "versions": removed }));
            }
            ctx.formatter.print_success(&format!(
                "Deleted subject '{}' (versions: {:?})",
                subject, removed
            ));
        }
    }
    Ok(())
}
