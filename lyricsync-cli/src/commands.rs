use crate::Command;
use lyricsync_core::{
    acquisition, embed_lyrics, format_timestamp, has_blocking, pre_publish_lint,
    time::millis_to_duration, AcquisitionError, CoreError, EditingSession, EmbeddedLyrics,
    FetchOutcome, Finding, LyricsRepository, LyricsyncConfig, PlaybackClock, SqliteLyricsStore,
    SyncEvent, TimedDocument, TrackIdentity,
};
use lyricsync_lrclib::LrclibRepository;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

type Result<T> = std::result::Result<T, CoreError>;

/// How often `sync` samples the playback clock
const TICK_INTERVAL: Duration = Duration::from_millis(50);

/// How long `sync` keeps running after the last line starts
const TAIL_MS: i64 = 5000;

pub(crate) async fn run(command: Command, config: &LyricsyncConfig) -> Result<ExitCode> {
    match command {
        Command::Fetch { track, refresh } => fetch(&track.identity(), refresh, config).await,
        Command::Show { file, at, context } => show(&file, at, context),
        Command::Lint { file } => lint(&file),
        Command::Shift {
            file,
            by,
            steps,
            write,
        } => shift(&file, shift_delta(by, steps, config.editor.shift_step_ms), write),
        Command::Publish { file, track } => publish(&file, &track.identity(), config).await,
        Command::Embed { file, audio } => embed(&file, &audio),
        Command::Sync { file, from } => sync(&file, from).await,
    }
}

fn read_document(path: &Path) -> Result<TimedDocument> {
    let content = std::fs::read_to_string(path)?;
    Ok(TimedDocument::parse(&content)?)
}

fn repository(config: &LyricsyncConfig) -> Result<LrclibRepository> {
    LrclibRepository::from_config(&config.lrclib)
        .map_err(|e| CoreError::from(AcquisitionError::from(e)))
}

fn ctrl_c_token() -> CancellationToken {
    let token = CancellationToken::new();
    let on_signal = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, stopping");
            on_signal.cancel();
        }
    });
    token
}

async fn fetch(track: &TrackIdentity, refresh: bool, config: &LyricsyncConfig) -> Result<ExitCode> {
    let store = SqliteLyricsStore::open(&config.storage.database_path()).await?;
    let mut session = EditingSession::new(track.clone());

    if !refresh && session.load(&store).await? {
        info!("Using stored lyrics for {track}");
        println!("{}", session.document().to_lrc());
        return Ok(ExitCode::SUCCESS);
    }

    let repo: Arc<dyn LyricsRepository> = Arc::new(repository(config)?);
    let (ticket, token) = session.begin_fetch();
    let interrupt = ctrl_c_token();
    let handle = EditingSession::spawn_fetch(repo, ticket, token.clone());

    let completion = tokio::select! {
        joined = handle => joined.map_err(|e| CoreError::Io(std::io::Error::other(e)))?,
        () = interrupt.cancelled() => {
            token.cancel();
            None
        }
    };
    let Some(completion) = completion else {
        warn!("Fetch for {track} was cancelled");
        return Ok(ExitCode::FAILURE);
    };

    match session.complete_fetch(completion) {
        FetchOutcome::Applied => {
            session.save(&store).await?;
            store.checkpoint().await?;
            println!("{}", session.document().to_lrc());
            Ok(ExitCode::SUCCESS)
        }
        FetchOutcome::Stale => {
            warn!("Fetch result for {track} arrived too late");
            Ok(ExitCode::FAILURE)
        }
        FetchOutcome::Failed(e) => Err(e.into()),
    }
}

/// Lines around the active line at `at_ms`, the active one marked with `>`.
fn render_window(doc: &mut TimedDocument, at_ms: i64, context: usize) -> Vec<String> {
    if doc.is_instrumental() {
        return vec!["(instrumental)".to_string()];
    }
    if !doc.is_synced() {
        return vec!["(lyrics are not synced)".to_string()];
    }

    let view = doc.commit();
    let active = view.active_line_index(at_ms);
    let mut rendered = Vec::new();
    if active.is_none() {
        rendered.push("(before first line)".to_string());
    }
    for index in view.visible_window(active, context, context) {
        let Some(line) = view.get(index) else {
            continue;
        };
        let marker = if Some(index) == active { '>' } else { ' ' };
        rendered.push(format!(
            "{marker} [{}] {}",
            format_timestamp(line.timestamp_ms),
            line.text
        ));
    }
    rendered
}

fn show(file: &Path, at_ms: i64, context: usize) -> Result<ExitCode> {
    let mut doc = read_document(file)?;
    for line in render_window(&mut doc, at_ms, context) {
        println!("{line}");
    }
    Ok(ExitCode::SUCCESS)
}

fn print_findings(findings: &[Finding]) {
    for finding in findings {
        println!("{finding}");
    }
}

fn lint(file: &Path) -> Result<ExitCode> {
    let doc = read_document(file)?;
    let findings = pre_publish_lint(&doc);
    if findings.is_empty() {
        println!("No problems found");
    }
    print_findings(&findings);

    Ok(if has_blocking(&findings) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Explicit milliseconds win; otherwise `steps` editor steps.
fn shift_delta(by: Option<i64>, steps: Option<i64>, step_ms: i64) -> i64 {
    by.unwrap_or_else(|| steps.unwrap_or(0).saturating_mul(step_ms))
}

fn shift(file: &Path, delta_ms: i64, write: bool) -> Result<ExitCode> {
    let mut doc = read_document(file)?;
    doc.shift_all(delta_ms);
    doc.commit();
    let output = doc.to_lrc();

    if write {
        std::fs::write(file, format!("{output}\n"))?;
        info!("Shifted {} by {delta_ms}ms", file.display());
    } else {
        println!("{output}");
    }
    Ok(ExitCode::SUCCESS)
}

async fn publish(file: &Path, track: &TrackIdentity, config: &LyricsyncConfig) -> Result<ExitCode> {
    let doc = read_document(file)?;
    let repo = repository(config)?;

    match acquisition::publish(&repo, track, &doc).await {
        Ok(advisory) => {
            print_findings(&advisory);
            println!("Published lyrics for {track}");
            Ok(ExitCode::SUCCESS)
        }
        Err(AcquisitionError::Blocked { findings }) => {
            println!("Please fix the following problem(s) before publishing:");
            print_findings(&findings);
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e.into()),
    }
}

fn embed(file: &Path, audio: &Path) -> Result<ExitCode> {
    let doc = read_document(file)?;
    let lyrics = EmbeddedLyrics::from_document(&doc);
    if lyrics.is_empty() {
        info!("{} is instrumental, clearing embedded lyrics", file.display());
    }
    embed_lyrics(audio, &lyrics)?;
    println!("Embedded lyrics into {}", audio.display());
    Ok(ExitCode::SUCCESS)
}

async fn sync(file: &Path, from_ms: u64) -> Result<ExitCode> {
    let doc = read_document(file)?;
    if !doc.is_synced() {
        println!("(lyrics are not synced)");
        return Ok(ExitCode::SUCCESS);
    }

    let end_ms = doc
        .lines()
        .iter()
        .map(|l| l.timestamp_ms)
        .max()
        .unwrap_or(0)
        .saturating_add(TAIL_MS);
    let track = TrackIdentity::new(file.display().to_string(), "local")
        .with_id(file.display().to_string());
    let mut session = EditingSession::with_document(track, doc);

    let clock = PlaybackClock::new(
        true,
        Duration::from_millis(from_ms),
        millis_to_duration(end_ms),
    );
    debug!("Following {} until {end_ms}ms", file.display());

    let cancel = ctrl_c_token();
    let mut interval = tokio::time::interval(TICK_INTERVAL);
    let mut events = Vec::new();

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                session.tick(clock.position_ms(), &mut events);
                for event in events.drain(..) {
                    if let SyncEvent::ActiveLineChanged { index: Some(index), position_ms } = event {
                        if let Some(line) = session.document().line(index) {
                            println!("[{}] {}", format_timestamp(position_ms), line.text);
                        }
                    }
                }
                if clock.interpolated_position() >= clock.duration {
                    break;
                }
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
