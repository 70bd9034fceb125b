//! Hammer CLI cases

use rand::Rng;
use serde_json::Value;
use tracing::{info, warn};

use crate::case::{CaseDescriptor, SkipCondition};
use crate::error::{E2eError, E2eResult};
use crate::parity::check_parity;
use crate::runner::SuiteContext;

pub const CASES: [CaseDescriptor; 2] = [
    CaseDescriptor {
        id: "hammer_all_options",
        description: "Every hammer command exposes the expected subcommands and options",
        tags: &["tier1", "upgrade"],
        dependencies: &[],
        skip: Some(SkipCondition::SettingMissing("server")),
        deselect: None,
        run: all_options,
    },
    CaseDescriptor {
        id: "hammer_disable_defaults",
        description: "--no-use-defaults ignores the organization default",
        tags: &["tier1", "upgrade", "run_in_one_thread"],
        dependencies: &[],
        skip: Some(SkipCondition::SettingMissing("server")),
        deselect: None,
        run: disable_defaults,
    },
];

const ALPHA: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Random letters, for entity names that must not collide between runs
pub fn gen_alpha(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| ALPHA[rng.gen_range(0..ALPHA.len())] as char)
        .collect()
}

fn all_options(ctx: &SuiteContext<'_>) -> E2eResult<()> {
    let settings = ctx.settings;
    check_parity(ctx, &settings.reference_file(), settings.hammer.walk_strategy)?.into_result()
}

fn disable_defaults(ctx: &SuiteContext<'_>) -> E2eResult<()> {
    disable_defaults_with(ctx, &gen_alpha(12), &gen_alpha(12))
}

/// Body of `hammer_disable_defaults` with fixed entity names
pub fn disable_defaults_with(ctx: &SuiteContext<'_>, org_name: &str, product_name: &str) -> E2eResult<()> {
    let org_id = create_organization(ctx, org_name)?;
    run_checked(
        ctx,
        &format!("product create --name {} --organization-id {}", product_name, org_id),
    )?;
    let checks = run_checked(
        ctx,
        &format!(
            "defaults add --param-name organization_id --param-value {}",
            org_id
        ),
    )
    .and_then(|_| verify_defaults(ctx, product_name));

    // The delete runs even when the add itself failed
    let cleanup = remove_default(ctx, &org_id);
    if let (Err(e), Err(_)) = (&checks, &cleanup) {
        warn!("Default cleanup also failed after: {}", e);
    }
    checks?;
    cleanup
}

fn verify_defaults(ctx: &SuiteContext<'_>, product_name: &str) -> E2eResult<()> {
    let result = ctx.hammer("product list")?;
    ensure(result.success(), "`product list` failed with the organization default set")?;

    let result = ctx.hammer("--no-use-defaults product list")?;
    ensure(!result.success(), "`--no-use-defaults product list` succeeded")?;
    ensure(
        !result.stdout.contains(product_name),
        "`--no-use-defaults product list` listed the product",
    )?;

    let result = ctx.hammer("--use-defaults product list")?;
    ensure(result.success(), "`--use-defaults product list` failed")?;
    ensure(
        result.stdout.contains(product_name),
        "`--use-defaults product list` did not list the product",
    )
}

fn remove_default(ctx: &SuiteContext<'_>, org_id: &str) -> E2eResult<()> {
    run_checked(ctx, "defaults delete --param-name organization_id")?;
    let listed = ctx.hammer("defaults list")?;
    ensure(
        !listed.stdout.contains(org_id),
        "organization default is still listed after removal",
    )
}

/// Create an organization and return its id
fn create_organization(ctx: &SuiteContext<'_>, name: &str) -> E2eResult<String> {
    run_checked(ctx, &format!("organization create --name {}", name))?;

    let args = format!("--output json organization info --name {}", name);
    let info = run_checked(ctx, &args)?;
    let value: Value = serde_json::from_str(&info).map_err(|e| E2eError::UnexpectedOutput {
        command: args.clone(),
        reason: e.to_string(),
    })?;

    let id = match value.get("Id") {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.clone(),
        _ => {
            return Err(E2eError::UnexpectedOutput {
                command: args,
                reason: "no Id field".to_string(),
            })
        }
    };
    info!("Created organization {} with id {}", name, id);
    Ok(id)
}

/// Run a hammer command that must succeed, returning its stdout
fn run_checked(ctx: &SuiteContext<'_>, args: &str) -> E2eResult<String> {
    let output = ctx.hammer(args)?;
    let command = format!("{} {}", ctx.settings.hammer.program, args);
    Ok(output.check(&command)?.stdout)
}

fn ensure(condition: bool, message: &str) -> E2eResult<()> {
    if condition {
        Ok(())
    } else {
        Err(E2eError::AssertionFailed(message.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gen_alpha() {
        let name = gen_alpha(12);
        assert_eq!(name.len(), 12);
        assert!(name.chars().all(|c| c.is_ascii_alphabetic()));
    }

    #[test]
    fn test_cases_need_a_server() {
        for case in &CASES {
            assert_eq!(case.skip, Some(SkipCondition::SettingMissing("server")));
            assert!(case.has_tag("tier1"));
        }
    }
}
