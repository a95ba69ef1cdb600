use crate::cli::commands::Cli;
use anyhow::{Context, Result, bail};
use interactive_feedback::config::{
    LanguagePreference, SettingsStore, default_settings_path, expand_path,
};
use interactive_feedback::error::SessionError;
use interactive_feedback::i18n::{Catalog, Language, Localizer, detect_language};
use interactive_feedback::process::{OutputStream, ProcessEvent};
use interactive_feedback::session::{
    FeedbackPayload, FeedbackSession, NoticeLevel, QuickReplyOutcome, SessionOptions,
};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

pub async fn dispatch(cli: Cli) -> Result<()> {
    let settings_path = match cli.config.as_deref() {
        Some(raw) => expand_path(raw),
        None => default_settings_path()?,
    };
    let mut store = SettingsStore::open(settings_path);

    let catalog = match cli.catalog.as_deref() {
        Some(raw) => Catalog::load(&expand_path(raw))
            .context("Failed to load localization resource")?,
        None => Catalog::builtin().context("Built-in localization resource is invalid")?,
    };
    if let Some(raw) = cli.export_catalog.as_deref() {
        let path = expand_path(raw);
        catalog
            .export(&path)
            .with_context(|| format!("Failed to export catalog to {}", path.display()))?;
        info!(path = %path.display(), "localization resource exported");
        return Ok(());
    }

    let language = resolve_language(cli.lang, store.settings().general.language);
    let localizer = Localizer::new(Arc::new(catalog), language);
    if cli.list_quick_replies {
        for (index, reply) in localizer.quick_replies().iter().enumerate() {
            println!("{index}: {reply}");
        }
        return Ok(());
    }

    let project_dir = resolve_project_dir(cli.project_directory.as_deref())?;
    let project = store.project(&project_dir);
    let command = cli
        .command
        .clone()
        .unwrap_or_else(|| project.run_command.clone());
    let auto_submit = cli.auto_submit.unwrap_or(project.auto_submit);

    let settings = store.settings();
    let options = SessionOptions {
        prompt: cli.prompt.clone(),
        command: command.clone(),
        execute_automatically: cli.run || project.execute_automatically,
        auto_submit,
        limits: settings.attachments,
        supervisor: (&settings.process).into(),
        ..SessionOptions::new(project_dir.clone(), localizer)
    };

    let session = FeedbackSession::open(options);
    echo_session_activity(&session);
    if !session.prompt().is_empty() {
        info!(prompt = %session.prompt(), "collecting feedback");
    }

    let payload = tokio::select! {
        payload = collect(&session, &cli) => payload?,
        _ = tokio::signal::ctrl_c() => {
            session.close().await;
            bail!("feedback cancelled");
        }
    };

    write_payload(&payload, cli.output_file.as_deref()).await?;

    store.update_project(&project_dir, |p| {
        if !command.trim().is_empty() {
            p.run_command.clone_from(&command);
        }
        if let Some(enabled) = cli.auto_submit {
            p.auto_submit = enabled;
        }
    });
    if let Some(lang) = cli.lang {
        store.settings_mut().general.language = lang;
    }
    match store.save() {
        Ok(()) => info!("{}", session.localizer().message("config_saved", &[])),
        Err(err) => warn!(error = %err, "failed to save settings"),
    }

    session.close().await;
    Ok(())
}

/// An explicit `--lang en|zh` wins; otherwise the usual detection chain.
fn resolve_language(cli: Option<LanguagePreference>, saved: LanguagePreference) -> Language {
    match cli {
        Some(LanguagePreference::En) => Language::En,
        Some(LanguagePreference::Zh) => Language::Zh,
        Some(LanguagePreference::Auto) | None => detect_language(saved),
    }
}

fn resolve_project_dir(raw: Option<&str>) -> Result<PathBuf> {
    let dir = match raw {
        Some(raw) => expand_path(raw),
        None => std::env::current_dir().context("Could not determine current directory")?,
    };
    let dir = std::path::absolute(&dir).unwrap_or(dir);
    if !dir.is_dir() {
        bail!("Project directory does not exist: {}", dir.display());
    }
    Ok(dir)
}

async fn collect(session: &Arc<FeedbackSession>, cli: &Cli) -> Result<Arc<FeedbackPayload>> {
    for raw in &cli.attachments {
        let path = expand_path(raw);
        if let Err(err) = session.add_attachment_path(&path).await {
            warn!(path = %path.display(), error = %err, "skipping attachment");
        }
    }

    if let Some(index) = cli.quick_reply {
        match session.select_quick_reply(index).await? {
            QuickReplyOutcome::Submitted(payload) => return Ok(payload),
            QuickReplyOutcome::SubmitOnExit | QuickReplyOutcome::TextSet => {}
        }
    } else {
        let text = match cli.feedback.clone() {
            Some(text) => text,
            None => read_stdin().await?,
        };
        session.set_feedback_text(text)?;
    }

    session.wait_command().await;
    match session.submit().await {
        Ok(payload) => Ok(payload),
        // Auto-submit fired when the command exited.
        Err(SessionError::AlreadySubmitted) => session
            .wait_outcome()
            .await
            .payload()
            .cloned()
            .context("Session finished without a payload"),
        Err(err) => Err(err.into()),
    }
}

async fn read_stdin() -> Result<String> {
    if std::io::stdin().is_terminal() {
        return Ok(String::new());
    }
    tokio::task::spawn_blocking(|| std::io::read_to_string(std::io::stdin()))
        .await?
        .context("Failed to read feedback from stdin")
}

/// Mirror command output and session notices on stderr.
fn echo_session_activity(session: &Arc<FeedbackSession>) {
    let mut events = session.subscribe_process();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let ProcessEvent::Output { stream, line, .. } = event {
                match stream {
                    OutputStream::Stdout | OutputStream::Stderr => eprintln!("{line}"),
                    OutputStream::System => eprintln!("» {line}"),
                }
            }
        }
    });

    let mut notices = session.subscribe_notices();
    tokio::spawn(async move {
        while let Ok(notice) = notices.recv().await {
            match notice.level {
                NoticeLevel::Info => info!("{}", notice.message),
                NoticeLevel::Warning | NoticeLevel::Error => warn!("{}", notice.message),
            }
        }
    });
}

async fn write_payload(payload: &FeedbackPayload, output_file: Option<&str>) -> Result<()> {
    let json = payload
        .to_json_pretty()
        .context("Failed to serialize feedback payload")?;
    match output_file {
        Some(raw) => {
            let path = expand_path(raw);
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            tokio::fs::write(&path, json)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), "feedback written");
        }
        None => println!("{json}"),
    }
    Ok(())
}
