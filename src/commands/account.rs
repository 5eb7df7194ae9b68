use std::io::{self, IsTerminal, Write};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use clap::Args;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;

use super::{App, login_hint};
use crate::auth::{self, token::decode_claims};
use crate::consts::DEFAULT_HISTORY_LIMIT;
use crate::models::NewUser;
use crate::render;

#[derive(Debug, Clone, Args)]
pub struct LoginArgs {
    /// Account email
    #[arg(short, long)]
    pub email: Option<String>,

    /// Password for scripted use; visible in shell history and `ps`.
    /// Prompted for without echo when omitted.
    #[arg(short, long)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct RegisterArgs {
    #[arg(short, long)]
    pub email: Option<String>,

    /// 3-50 characters
    #[arg(short, long)]
    pub username: Option<String>,

    /// At least 8 characters. Prompted for without echo when omitted;
    /// the flag is for scripts and shows up in shell history.
    #[arg(short, long)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct HistoryArgs {
    /// How many searches to show
    #[arg(short, long, default_value_t = DEFAULT_HISTORY_LIMIT)]
    pub limit: u32,
}

fn prompt(label: &str) -> Result<String> {
    print!("{label}: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    let value = line.trim().to_string();
    if value.is_empty() {
        bail!("no {} provided", label.to_lowercase());
    }
    Ok(value)
}

enum SecretKey {
    Continue,
    Submit,
    Cancel,
}

fn edit_secret(buf: &mut String, key: KeyEvent) -> SecretKey {
    if key.kind != KeyEventKind::Press {
        return SecretKey::Continue;
    }
    match key.code {
        KeyCode::Enter => SecretKey::Submit,
        KeyCode::Esc => SecretKey::Cancel,
        KeyCode::Char('c') | KeyCode::Char('d')
            if key.modifiers.contains(KeyModifiers::CONTROL) =>
        {
            SecretKey::Cancel
        }
        KeyCode::Backspace => {
            buf.pop();
            SecretKey::Continue
        }
        KeyCode::Char(c) => {
            buf.push(c);
            SecretKey::Continue
        }
        _ => SecretKey::Continue,
    }
}

struct RawMode;

impl RawMode {
    fn enable() -> Result<Self> {
        terminal::enable_raw_mode().context("could not hide password input")?;
        Ok(Self)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Reads a password without echo. Piped stdin is read as a plain line.
fn prompt_secret(label: &str) -> Result<String> {
    if !io::stdin().is_terminal() {
        let mut line = String::new();
        io::stdin().read_line(&mut line)?;
        let value = line.trim_end_matches(['\r', '\n']).to_string();
        if value.is_empty() {
            bail!("no {} provided", label.to_lowercase());
        }
        return Ok(value);
    }

    print!("{label}: ");
    io::stdout().flush()?;
    let mut secret = String::new();
    let outcome = {
        let _raw = RawMode::enable()?;
        loop {
            if let Event::Key(key) = event::read()? {
                match edit_secret(&mut secret, key) {
                    SecretKey::Continue => continue,
                    done => break done,
                }
            }
        }
    };
    println!();
    match outcome {
        SecretKey::Cancel => bail!("cancelled"),
        _ if secret.is_empty() => bail!("no {} provided", label.to_lowercase()),
        _ => Ok(secret),
    }
}

fn or_prompt(value: &Option<String>, label: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => prompt(label),
    }
}

pub async fn login(app: &App, args: &LoginArgs) -> Result<()> {
    let email = or_prompt(&args.email, "Email")?;
    let password = match &args.password {
        Some(p) => p.clone(),
        None => prompt_secret("Password")?,
    };
    let user = auth::login(&app.client, &email, &password).await?;
    println!("✓ Logged in as {} ({})", user.username, user.email);
    Ok(())
}

pub async fn register(app: &App, args: &RegisterArgs) -> Result<()> {
    let new_user = NewUser {
        email: or_prompt(&args.email, "Email")?,
        username: or_prompt(&args.username, "Username")?,
        password: match &args.password {
            Some(p) => p.clone(),
            None => prompt_secret("Password")?,
        },
    };
    let user = auth::register(&app.client, &new_user).await?;
    println!("✓ Account created. Logged in as {} ({})", user.username, user.email);
    Ok(())
}

pub fn logout(app: &App) -> Result<()> {
    if auth::logout(&app.client)? {
        println!("✓ Logged out.");
    } else {
        println!("  not logged in");
    }
    Ok(())
}

/// `in 14m`, `expired 3m ago`.
pub fn describe_expiry(exp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = exp - now;
    let span = |d: chrono::TimeDelta| {
        let mins = d.num_minutes().abs();
        if mins < 60 {
            format!("{mins}m")
        } else if mins < 48 * 60 {
            format!("{}h", mins / 60)
        } else {
            format!("{}d", mins / (24 * 60))
        }
    };
    if delta > chrono::TimeDelta::zero() {
        format!("in {}", span(delta))
    } else {
        format!("expired {} ago", span(delta))
    }
}

pub async fn whoami(app: &App) -> Result<()> {
    let Some(session) = app.client.tokens().get()? else {
        println!("  not logged in");
        return Ok(());
    };
    let profile = app.client.me().await.map_err(login_hint)?;
    println!("  user      {} ({})", profile.user.username, profile.user.email);
    println!("  since     {}", profile.user.created_at);
    println!("  backend   {}", app.client.base_url());

    let now = Utc::now();
    // The session may have been refreshed by the call above.
    let tokens = app.client.tokens().get()?.map_or(session.tokens, |s| s.tokens);
    for (label, token) in [("access", &tokens.access_token), ("refresh", &tokens.refresh_token)] {
        match decode_claims(token).ok().and_then(|c| c.expires_at()) {
            Some(exp) => println!("  {label:<9} expires {}", describe_expiry(exp, now)),
            None => println!("  {label:<9} expiry unknown"),
        }
    }
    println!("  favorites {}", profile.favorites.len());
    println!("  searches  {}", profile.recent_searches.len());
    Ok(())
}

pub async fn history(app: &App, args: &HistoryArgs) -> Result<()> {
    let searches = app
        .client
        .search_history(args.limit)
        .await
        .map_err(login_hint)
        .context("could not load search history")?;
    print!("{}", render::history_list(&searches));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[test]
    fn expiry_in_future() {
        let now = Utc::now();
        assert_eq!(describe_expiry(now + TimeDelta::minutes(14), now), "in 14m");
        assert_eq!(describe_expiry(now + TimeDelta::days(7), now), "in 7d");
        assert_eq!(describe_expiry(now + TimeDelta::hours(5), now), "in 5h");
    }

    #[test]
    fn expiry_in_past() {
        let now = Utc::now();
        assert_eq!(
            describe_expiry(now - TimeDelta::minutes(3), now),
            "expired 3m ago"
        );
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn typed(keys: &[KeyEvent]) -> (String, Option<bool>) {
        let mut buf = String::new();
        for key in keys {
            match edit_secret(&mut buf, *key) {
                SecretKey::Continue => {}
                SecretKey::Submit => return (buf, Some(true)),
                SecretKey::Cancel => return (buf, Some(false)),
            }
        }
        (buf, None)
    }

    #[test]
    fn secret_collects_chars_until_enter() {
        let keys = [
            press(KeyCode::Char('h')),
            press(KeyCode::Char('x')),
            press(KeyCode::Backspace),
            press(KeyCode::Char('i')),
            press(KeyCode::Char('!')),
            press(KeyCode::Enter),
            press(KeyCode::Char('z')),
        ];
        assert_eq!(typed(&keys), ("hi!".to_string(), Some(true)));
    }

    #[test]
    fn secret_keeps_spaces_and_ignores_releases() {
        let mut release = press(KeyCode::Char('q'));
        release.kind = KeyEventKind::Release;
        let keys = [press(KeyCode::Char(' ')), release, press(KeyCode::Char('a'))];
        assert_eq!(typed(&keys), (" a".to_string(), None));
    }

    #[test]
    fn secret_cancels_on_ctrl_c_and_esc() {
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(typed(&[press(KeyCode::Char('p')), ctrl_c]).1, Some(false));
        assert_eq!(typed(&[press(KeyCode::Esc)]).1, Some(false));
        // A plain 'c' is part of the password.
        assert_eq!(typed(&[press(KeyCode::Char('c'))]), ("c".to_string(), None));
    }

    #[test]
    fn flag_value_skips_prompt() {
        let v = or_prompt(&Some(" me@example.com ".to_string()), "Email").unwrap();
        assert_eq!(v, "me@example.com");
    }
}
