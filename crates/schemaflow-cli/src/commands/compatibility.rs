//! Compatibility level commands

use super::Context;
use anyhow::{Context as _, Result};
use schemaflow_registry::CompatibilityLevel;
use serde_json::json;

/// Show the level, or set it when `level` is given.
///
/// Without `subject` this addresses the global level.
pub async fn config(ctx: &Context, level: Option<&str>, subject: Option<&str>) -> Result<()> {
    match (level, subject) {
        (None, None) => {
            let level = ctx
                .client
                .get_global_compatibility()
                .await
                .context("Failed to get config")?;
            report(ctx, None, level, "Current global compatibility level")
        }
        (None, Some(subject)) => match ctx.client.get_subject_compatibility(subject).await {
            Ok(level) => report(ctx, Some(subject), level, "Compatibility level"),
            Err(e) if e.is_not_found() => {
                let global = ctx
                    .client
                    .get_global_compatibility()
                    .await
                    .context("Failed to get config")?;
                if ctx.formatter.is_structured() {
                    return ctx.formatter.print_value(&json!({
                        "subject": subject,
                        "compatibilityLevel": null,
                        "global": global,
                    }));
                }
                ctx.formatter.print_info(&format!(
                    "Subject '{}' has no override; the global level {} applies",
                    subject, global
                ));
                Ok(())
            }
            Err(e) => Err(e).context("Failed to get config"),
        },
        (Some(level), None) => {
            let level = ctx.client.set_global_compatibility(level).await?;
            report(ctx, None, level, "Global compatibility level set to")
        }
        (Some(level), Some(subject)) => {
            let level: CompatibilityLevel = level.parse()?;
            let level = ctx
                .client
                .set_subject_compatibility(subject, level)
                .await
                .context("Failed to set config")?;
            report(ctx, Some(subject), level, "Compatibility level set to")
        }
    }
}

fn report(
    ctx: &Context,
    subject: Option<&str>,
    level: CompatibilityLevel,
    label: &str,
) -> Result<()> {
    if ctx.formatter.is_structured() {
        return ctx.formatter.print_value(&json!({
            "subject": subject,
            "compatibilityLevel": level,
        }));
    }
    match subject {
        Some(subject) => println!("{} for '{}': {}", label, subject, level),
        None => println!("{}: {}", label, level),
    }
    Ok(())
}
