use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
    sync::Arc,
    time::Instant,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    AnalyticsEvent, AnalyticsSink, CtaPlacement, EntryCache, FlowError, LocalEntryCache,
    SheetGateway, SignupFlow, TracingAnalytics,
};
use shared::domain::{Intent, UserType};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod prompt;

use config::{load_settings, Settings};
use prompt::{parse_choice, Prompt};

#[derive(Parser, Debug)]
#[command(name = "waitlist", about = "Join the CredUPI waitlist")]
struct Args {
    #[arg(long, default_value = "waitlist.toml")]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Walk through the signup questions; anything not passed as a flag is asked.
    Join {
        /// Option number or label.
        #[arg(long)]
        intent: Option<String>,
        /// Option number or label.
        #[arg(long)]
        user_type: Option<String>,
        /// 10-digit mobile number, without the country code.
        #[arg(long)]
        phone: Option<String>,
    },
    /// Check that the configured endpoint answers.
    Probe,
    /// Print every entry in the local backup trail.
    Cache,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();
    let args = Args::parse();
    let settings = load_settings(&args.config);

    match args.command {
        Command::Join {
            intent,
            user_type,
            phone,
        } => {
            let stdin = io::stdin();
            let mut prompt = Prompt::new(stdin.lock(), io::stdout());
            run_join(&settings, &mut prompt, JoinAnswers {
                intent,
                user_type,
                phone,
            })
            .await
        }
        Command::Probe => run_probe(&settings).await,
        Command::Cache => run_cache(&settings).await,
    }
}

struct JoinAnswers {
    intent: Option<String>,
    user_type: Option<String>,
    phone: Option<String>,
}

async fn run_join<R: BufRead, W: Write>(
    settings: &Settings,
    prompt: &mut Prompt<R, W>,
    answers: JoinAnswers,
) -> Result<()> {
    let gateway = Arc::new(SheetGateway::new(settings.gateway_config()?)?);
    let cache = Arc::new(LocalEntryCache::open(&settings.cache_database_url).await?);
    let analytics = Arc::new(TracingAnalytics);
    analytics.track(&AnalyticsEvent::CtaClick {
        placement: CtaPlacement::Hero,
    });

    let mut flow = SignupFlow::new(gateway, cache, analytics);
    flow.open();
    let walked = walk_steps(&mut flow, prompt, answers).await;
    // Every exit closes the wizard, including errors part way through.
    let closed = close(&mut flow).await;
    walked.and(closed)
}

async fn walk_steps<R: BufRead, W: Write>(
    flow: &mut SignupFlow,
    prompt: &mut Prompt<R, W>,
    answers: JoinAnswers,
) -> Result<()> {
    let intent = match answers.intent {
        Some(raw) => parse_choice(&raw, Intent::ALL)?,
        None => match prompt.choose("Why do you want to build a credit score?", Intent::ALL)? {
            Some(intent) => intent,
            None => return walk_away(prompt),
        },
    };
    flow.select_intent(intent)?;
    flow.advance(Instant::now()).await?;

    let user_type = match answers.user_type {
        Some(raw) => parse_choice(&raw, UserType::ALL)?,
        None => match prompt.choose("Tell us about yourself", UserType::ALL)? {
            Some(user_type) => user_type,
            None => return walk_away(prompt),
        },
    };
    flow.select_user_type(user_type)?;
    flow.advance(Instant::now()).await?;

    let mut given_phone = answers.phone;
    loop {
        let raw = match given_phone.take() {
            Some(raw) => raw,
            None => match prompt.ask("Enter your phone number: +91")? {
                Some(raw) => raw,
                None => return walk_away(prompt),
            },
        };
        flow.input_phone(&raw)?;
        match flow.advance(Instant::now()).await {
            Ok(_) => break,
            Err(FlowError::InvalidPhone { .. }) => {
                prompt.say("Please enter a 10-digit mobile number.")?;
            }
            Err(error) => return Err(error.into()),
        }
    }

    prompt.say("You're on the list! 🎉")?;
    prompt.say("We'll text you when CredUPI is ready. Thanks for your interest!")?;
    Ok(())
}

fn walk_away<R: BufRead, W: Write>(prompt: &mut Prompt<R, W>) -> Result<()> {
    prompt.say("No problem, come back any time.")?;
    Ok(())
}

/// Dismisses the wizard. The partial save runs detached from the flow,
/// but the process waits for it so exiting does not cut it short.
async fn close(flow: &mut SignupFlow) -> Result<()> {
    if let Some(task) = flow.dismiss(Instant::now()) {
        let outcome = task.await.context("partial save task failed")?;
        info!(?outcome, "partial waitlist entry handled");
    }
    Ok(())
}

async fn run_probe(settings: &Settings) -> Result<()> {
    let gateway = SheetGateway::new(settings.gateway_config()?)?;
    let status = gateway.health().await?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

async fn run_cache(settings: &Settings) -> Result<()> {
    let cache = LocalEntryCache::open(&settings.cache_database_url).await?;
    let entries = cache.entries().await?;
    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
