//! Session inspection.

use anyhow::{Result, bail};
use loyalty_core::guard::{RedirectTarget, Requirement, RouteGuard};
use loyalty_core::session::{UserProfile, mask_token};
use serde_json::json;

use crate::cli::AppContext;

/// Best human label for a user: name, then email, phone, id.
pub fn describe_user(user: &UserProfile) -> String {
    user.name()
        .or_else(|| user.email())
        .or_else(|| user.phone())
        .or_else(|| user.id())
        .unwrap_or_else(|| "unknown user".to_string())
}

pub fn whoami(ctx: &mut AppContext, requirement: Requirement, as_json: bool) -> Result<()> {
    let mut guard = RouteGuard::new(requirement);
    guard.check(&mut ctx.store);

    if let Some(target) = guard.redirect() {
        ctx.debug_log.append(
            format!("guard: redirect to {target}"),
            Some(json!({
                "requirement": requirement.to_string(),
                "target": target.path(),
            })),
        );
        match target {
            RedirectTarget::Login => bail!("Not logged in. Run `loyalty login` first."),
            RedirectTarget::Landing => {
                bail!("Access denied: this requires {requirement} privileges.")
            }
        }
    }

    let Some(user) = guard.protected_user() else {
        bail!("Session check did not complete");
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(user)?);
        return Ok(());
    }

    println!("Logged in as {}", describe_user(user));
    let fields = [
        ("id", user.id()),
        ("email", user.email()),
        ("phone", user.phone()),
        ("role", user.role()),
        ("business", user.business_id()),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            println!("  {label}: {value}");
        }
    }
    if user.is_admin() {
        println!("  admin: yes");
    }
    if user.is_staff() {
        println!("  staff: yes");
    }

    if let Some(session) = ctx.store.session() {
        println!("  token: {}", mask_token(&session.access_token));
        match session.expires_at {
            Some(at) => println!("  expires: {}", at.to_rfc3339()),
            None => println!("  expires: never"),
        }
    }
    Ok(())
}
