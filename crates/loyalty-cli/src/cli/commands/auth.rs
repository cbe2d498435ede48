//! Auth command handlers.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result, bail};
use loyalty_core::api::AuthMode;
use loyalty_core::auth::{AuthForm, Authenticator, FlowEvent, OtpFlow, Phase, validate};
use loyalty_core::session::{SESSION_KEY, mask_token};
use loyalty_core::storage::FileStorage;

use super::session::describe_user;
use crate::cli::AppContext;

const PHONE_PROMPT: &str = "Phone number: ";
const OTP_PROMPT: &str = "Enter the 6-digit code (r = resend, b = back): ";

/// Arguments of `loyalty register`.
pub struct RegisterOptions {
    pub phone: Option<String>,
    pub email: String,
    pub role: String,
    pub accept_terms: bool,
}

pub async fn login<R: BufRead>(
    ctx: &mut AppContext,
    phone: Option<String>,
    input: &mut R,
) -> Result<()> {
    ctx.store.ensure_initialized();
    if let Some(user) = ctx.store.user() {
        println!(
            "Already logged in as {}; a new login replaces this session.",
            describe_user(user)
        );
    }

    let Some(phone) = phone_or_prompt(phone, input)? else {
        return cancelled(AuthMode::Login);
    };
    run_flow(ctx, OtpFlow::login(), AuthForm::login(phone), input).await
}

pub async fn register<R: BufRead>(
    ctx: &mut AppContext,
    options: RegisterOptions,
    input: &mut R,
) -> Result<()> {
    let Some(phone) = phone_or_prompt(options.phone, input)? else {
        return cancelled(AuthMode::Register);
    };
    let form = AuthForm::register(
        phone,
        options.email,
        Some(options.role),
        options.accept_terms,
    );
    run_flow(ctx, OtpFlow::register(), form, input).await
}

/// Drives the OTP flow from the terminal until it authenticates or the user
/// gives up.
async fn run_flow<R: BufRead>(
    ctx: &mut AppContext,
    mut flow: OtpFlow,
    mut form: AuthForm,
    input: &mut R,
) -> Result<()> {
    let mode = flow.mode();
    let api = ctx.auth_api()?;
    let mut auth = Authenticator::new(&api, &mut ctx.store).with_debug_log(&mut ctx.debug_log);

    loop {
        match flow.phase() {
            Phase::Form => {
                println!("Requesting a code for {}...", form.phone.trim());
                auth.dispatch(&mut flow, FlowEvent::Submit(form.clone()))
                    .await;
                if flow.phase() == Phase::Form {
                    let message = flow
                        .error_message()
                        .unwrap_or_else(|| "Could not request a code.".to_string());
                    bail!(message);
                }
                println!("Code sent.");
            }
            Phase::OtpPending => {
                let Some(answer) = prompt(input, OTP_PROMPT)? else {
                    return cancelled(mode);
                };
                let event = match answer.to_ascii_lowercase().as_str() {
                    "r" | "resend" => FlowEvent::Resend,
                    "b" | "back" => FlowEvent::Back,
                    _ => FlowEvent::SubmitOtp(answer),
                };
                let resend = matches!(event, FlowEvent::Resend);

                auth.dispatch(&mut flow, event).await;

                if let Some(message) = flow.error_message() {
                    eprintln!("✗ {message}");
                    auth.dispatch(&mut flow, FlowEvent::DismissError).await;
                } else if resend {
                    println!("A new code was sent.");
                }

                // Back (or a failed resend) returns to the form: ask for the number again.
                if flow.phase() == Phase::Form {
                    let Some(phone) = prompt(input, PHONE_PROMPT)? else {
                        return cancelled(mode);
                    };
                    form.phone = phone;
                }
            }
            Phase::Authenticated => break,
            phase @ (Phase::Submitting | Phase::Verifying) => {
                bail!("Auth flow stopped while {phase}")
            }
        }
    }

    let verb = match mode {
        AuthMode::Login => "Logged in",
        AuthMode::Register => "Registered and logged in",
    };
    let store = auth.store();
    let who = store
        .user()
        .map_or_else(|| "unknown user".to_string(), describe_user);
    println!();
    println!("✓ {verb} as {who}");
    if let Some(token) = store.access_token() {
        println!("  Token: {}", mask_token(token));
    }
    println!(
        "  Session saved to: {}",
        FileStorage::open_default().entry_path(SESSION_KEY).display()
    );
    Ok(())
}

pub fn logout(ctx: &mut AppContext) -> Result<()> {
    ctx.store.ensure_initialized();
    let had_session = ctx.store.session().is_some();
    ctx.store.clear_auth();

    if had_session {
        println!("✓ Logged out");
        println!(
            "  Session removed from: {}",
            FileStorage::open_default().entry_path(SESSION_KEY).display()
        );
    } else {
        println!("Not logged in (no session found).");
    }
    Ok(())
}

pub async fn forgot_password(ctx: &mut AppContext, email: &str) -> Result<()> {
    let email = validate::validate_email(email)?;
    let api = ctx.auth_api()?;
    api.forgot_password(&email)
        .await
        .context("request password reset")?;

    println!("✓ If an account exists for {email}, a reset link is on its way.");
    Ok(())
}

pub async fn reset_password(ctx: &mut AppContext, token: &str, password: &str) -> Result<()> {
    let token = token.trim();
    if token.is_empty() {
        bail!("Reset token cannot be empty");
    }
    if password.is_empty() {
        bail!("Password cannot be empty");
    }

    let api = ctx.auth_api()?;
    api.reset_password(token, password)
        .await
        .context("reset password")?;

    println!("✓ Password updated. Run `loyalty login` to sign in.");
    Ok(())
}

fn phone_or_prompt<R: BufRead>(phone: Option<String>, input: &mut R) -> Result<Option<String>> {
    match phone {
        Some(phone) => Ok(Some(phone)),
        None => prompt(input, PHONE_PROMPT),
    }
}

fn cancelled(mode: AuthMode) -> Result<()> {
    match mode {
        AuthMode::Login => println!("Login cancelled."),
        AuthMode::Register => println!("Registration cancelled."),
    }
    Ok(())
}

/// Reads one trimmed line. Empty input and EOF both return `None`.
fn prompt<R: BufRead>(input: &mut R, label: &str) -> Result<Option<String>> {
    print!("{label}");
    io::stdout().flush()?;

    let mut line = String::new();
    if input.read_line(&mut line).context("read input")? == 0 {
        println!();
        return Ok(None);
    }
    let trimmed = line.trim();
    Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
}
