use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tubematch_lib::channel::ChannelClient;
use tubematch_lib::config::AppConfig;
use tubematch_lib::export::{self, ExportFormat};
use tubematch_lib::matcher::{ImportSummary, SearchReport, SessionView};
use tubematch_lib::models::{Phase, SearchStatus};
use tubematch_lib::session::{FileStorage, SessionStore};
use tubematch_lib::spotify::SpotifyClient;
use tubematch_lib::youtube::YoutubeClient;
use tubematch_lib::MatchingController;

#[derive(Parser)]
#[command(name = "tubematch", version, about = "Match playlists to YouTube videos")]
struct Cli {
    /// Path to a JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, ValueEnum)]
enum Format {
    Csv,
    Ids,
    Urls,
}

impl From<Format> for ExportFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Csv => ExportFormat::Csv,
            Format::Ids => ExportFormat::Ids,
            Format::Urls => ExportFormat::Urls,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Import a Spotify playlist and search a video for every track
    Spotify {
        /// Playlist URL, URI or id
        url: String,
    },

    /// Import a text playlist, one track per line ("-" reads stdin)
    Text { file: PathBuf },

    /// Continue searching an interrupted session
    Resume,

    /// Show the current session
    Status,

    /// Choose a video for a track
    Select { track_id: String, video_id: String },

    /// Drop a track from the session
    Skip { track_id: String },

    /// Confirm the current choices
    Confirm,

    /// Print the confirmed matches
    Export {
        #[arg(long, value_enum, default_value = "csv")]
        format: Format,
    },

    /// Add the confirmed matches to a channel
    Import {
        /// Channel id
        channel_id: String,
    },

    /// Start over
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };

    let storage = FileStorage::new(config.storage_dir());
    log::debug!("Session snapshots live in {}", storage.dir().display());
    let store = SessionStore::open(Box::new(storage), config.session_key.clone());
    let search = YoutubeClient::new(&config.api_base).context("failed to build search client")?;
    let controller = MatchingController::new(store, Arc::new(search), config.clone());

    match cli.command {
        Commands::Spotify { url } => {
            let source =
                SpotifyClient::new(&config.api_base).context("failed to build Spotify client")?;
            let report = controller.import_spotify(&source, &url).await?;
            print_report(&report);
            print_session(&controller.snapshot());
        }
        Commands::Text { file } => {
            let raw = if file.as_os_str() == "-" {
                std::io::read_to_string(std::io::stdin()).context("failed to read stdin")?
            } else {
                std::fs::read_to_string(&file)
                    .with_context(|| format!("failed to read {}", file.display()))?
            };
            let report = controller.import_text(&raw).await?;
            print_report(&report);
            print_session(&controller.snapshot());
        }
        Commands::Resume => {
            let report = controller.resume().await;
            print_report(&report);
            print_session(&controller.snapshot());
        }
        Commands::Status => print_session(&controller.snapshot()),
        Commands::Select { track_id, video_id } => {
            controller.select_candidate(&track_id, &video_id)?;
            print_session(&controller.snapshot());
        }
        Commands::Skip { track_id } => {
            if !controller.skip(&track_id)? {
                println!("No track with id {}", track_id);
            }
            print_session(&controller.snapshot());
        }
        Commands::Confirm => {
            let matches = controller.confirm()?;
            println!("Confirmed {} matches", matches.len());
            print!("{}", export::to_url_list(&matches));
        }
        Commands::Export { format } => {
            let view = controller.snapshot();
            if view.phase != Phase::Confirmed {
                anyhow::bail!("Nothing to export yet: session is {}", view.phase);
            }
            print!("{}", export::render(&view.matches, format.into()));
        }
        Commands::Import { channel_id } => {
            let sink = ChannelClient::from_config(&config.channel)
                .context("failed to set up channel import")?;
            let controller = controller.with_sink(Arc::new(sink));
            let summary = controller.import_all(&channel_id).await?;
            print_import_summary(&summary);
        }
        Commands::Clear => {
            controller.clear()?;
            println!("Session cleared");
        }
    }

    Ok(())
}

fn print_report(report: &SearchReport) {
    println!(
        "Searched {} tracks: {} with videos, {} failed",
        report.searched, report.found, report.failed
    );
    if let Some(error) = &report.error {
        println!("Error! {}", error);
    }
}

fn print_import_summary(summary: &ImportSummary) {
    println!(
        "Imported {} of {} tracks",
        summary.succeeded,
        summary.attempted()
    );
    for failure in &summary.failed {
        println!("Failed: {} ({})", failure.track.title, failure.reason);
    }
}

fn print_session(view: &SessionView) {
    println!(
        "Session: {} ({}/{} searched)",
        view.phase, view.progress.current, view.progress.total
    );
    if let Some(error) = &view.last_error {
        println!("Last error: {}", error);
    }

    for (i, track) in view.tracks.iter().enumerate() {
        let status = match track.status {
            SearchStatus::Pending => "pending",
            SearchStatus::Found => "",
            SearchStatus::NotFound => "no results",
            SearchStatus::Failed => "search failed",
        };
        println!("{}. {} [{}] {}", i, track.display_title(), track.id, status);

        let selected = view.selections.get(&track.id);
        for (j, video) in track.candidates.iter().enumerate() {
            let chosen = match selected {
                Some(id) => id == &video.id,
                None => j == 0,
            };
            let mut details = Vec::new();
            if let Some(channel) = &video.channel_title {
                details.push(channel.as_str());
            }
            if let Some(views) = &video.view_count_text {
                details.push(views.as_str());
            }
            if let Some(published) = &video.published_text {
                details.push(published.as_str());
            }
            println!(
                "   {} {} {} ({})",
                if chosen { "(x)" } else { "( )" },
                video.watch_url(),
                video.title,
                details.join(", ")
            );
        }
    }

    for m in &view.matches {
        println!("= {} -> {}", m.title, m.url);
    }
}
