use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::sync::Arc;

use playlist_vibe_check::auth::{
    CallbackOutcome, authorize_url, callback_listener, code_from_request_target, handle_callback,
};
use playlist_vibe_check::client::{VibeClient, VibeGateway};
use playlist_vibe_check::config::{Config, load_config};
use playlist_vibe_check::models::AnalysisResult;
use playlist_vibe_check::session::Session;
use playlist_vibe_check::vibe::{
    ANALYSIS_STEPS, AnalysisController, AudioFeature, LifecycleState, derive_insights,
};

#[derive(Parser)]
#[command(name = "playlist-vibe-check")]
#[command(about = "Analyze the vibe of your Spotify playlists")]
#[command(version)]
struct Args {
    /// Spotify access token (falls back to SPOTIFY_ACCESS_TOKEN)
    #[arg(short = 't', long = "token", global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in with Spotify and print the access token
    Login,
    /// List your playlists
    Playlists,
    /// Analyze one playlist and print its vibe report
    Analyze {
        /// Spotify playlist ID
        playlist_id: String,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();

    // Load configuration from .env
    let config = load_config()?;
    let client = VibeClient::new(&config);

    let token = args
        .token
        .or_else(|| std::env::var("SPOTIFY_ACCESS_TOKEN").ok());
    let session = match token {
        Some(token) => Session::with_token(token),
        None => Session::new(),
    };

    match args.command {
        Command::Login => run_login(&config, &client, &session),
        Command::Playlists => run_playlists(&client, &session),
        Command::Analyze { playlist_id } => run_analyze(&config, client, session, &playlist_id),
    }
}

fn run_login(config: &Config, client: &VibeClient, session: &Session) -> Result<()> {
    let client_id = config
        .client_id
        .as_deref()
        .ok_or_else(|| anyhow!("SPOTIFY_CLIENT_ID is not set"))?;
    let (address, callback_path) = callback_listener(&config.redirect_uri)
        .ok_or_else(|| anyhow!("Redirect URI must be a local http:// address: {}", config.redirect_uri))?;

    let server = tiny_http::Server::http(&address)
        .map_err(|e| anyhow!("Failed to listen on {address}: {e}"))?;

    println!("Open this URL in your browser to sign in with Spotify:\n");
    println!("  {}\n", authorize_url(client_id, &config.redirect_uri));
    println!("Waiting for the callback on {address}...");

    let outcome = loop {
        let request = server.recv()?;
        if !request.url().starts_with(&callback_path) {
            request.respond(tiny_http::Response::empty(404))?;
            continue;
        }

        let code = code_from_request_target(request.url());
        let outcome = handle_callback(client, session, code.as_deref());

        let location = outcome.redirect_url(&config.app_url);
        let header = tiny_http::Header::from_bytes(&b"Location"[..], location.as_bytes())
            .map_err(|_| anyhow!("Invalid redirect location: {location}"))?;
        request.respond(tiny_http::Response::empty(303).with_header(header))?;
        break outcome;
    };

    match outcome {
        CallbackOutcome::Authenticated => {
            let credential = session
                .credential()
                .ok_or_else(|| anyhow!("Sign-in succeeded but no token was stored"))?;
            println!("\n✓ Signed in. Token valid until {}", credential.expires_at());
            println!("export SPOTIFY_ACCESS_TOKEN={}", credential.token());
            Ok(())
        }
        CallbackOutcome::Failed(failure) => Err(anyhow!("Sign-in failed: {}", failure.as_str())),
    }
}

fn run_playlists(client: &VibeClient, session: &Session) -> Result<()> {
    let credential = session
        .credential()
        .ok_or_else(|| anyhow!("No access token. Run `login` or pass --token."))?;

    let playlists = client.list_playlists(&credential)?;
    if playlists.is_empty() {
        println!("No playlists found.");
        return Ok(());
    }

    println!("Your Playlists\n");
    for (i, playlist) in playlists.iter().enumerate() {
        println!(
            "{:>3}. {} ({} tracks) by {}",
            i + 1,
            playlist.name,
            playlist.track_count,
            playlist.owner_display_name
        );
        if let Some(description) = &playlist.description {
            println!("     {description}");
        }
        if let Some(cover) = playlist.cover_url() {
            println!("     Cover: {cover}");
        }
        println!("     ID: {}", playlist.id);
    }
    Ok(())
}

fn run_analyze(config: &Config, client: VibeClient, session: Session, playlist_id: &str) -> Result<()> {
    let controller = AnalysisController::new(Arc::new(client), session, config.ticker);
    let updates = controller.subscribe();
    let handle = controller.start_analysis(playlist_id)?;

    println!("Analyzing Playlist");
    for state in updates.iter() {
        if state.is_terminal() {
            break;
        }
        if let LifecycleState::Requesting { progress, step, .. } = &state {
            print!(
                "\r[{}] {:>3}%  Step {} of {}: {}...        ",
                bar(*progress as f64, 30),
                progress,
                step + 1,
                ANALYSIS_STEPS.len(),
                state.step_caption().unwrap_or_default()
            );
            std::io::stdout().flush()?;
        }
    }
    println!();
    handle.wait();

    let outcome = match controller.state() {
        LifecycleState::Succeeded { result } => {
            println!("✅ Analysis complete!\n");
            print_report(&result);
            Ok(())
        }
        LifecycleState::Failed { message } => Err(anyhow!(message)),
        other => Err(anyhow!("Analysis ended in unexpected state: {other:?}")),
    };
    controller.clear_result();
    outcome
}

fn bar(percent: f64, width: usize) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

fn print_report(result: &AnalysisResult) {
    let insights = derive_insights(&result.quantitative);
    let figures = &insights.summary;

    println!("Your Vibe Report: {}", result.playlist_name);
    println!("{}", "=".repeat(18 + result.playlist_name.len()));
    println!(
        "Tracks: {} | Artists: {} | Popularity: {}% | Minutes: {}",
        figures.track_count, figures.artists_count, figures.popularity_percent, figures.total_minutes
    );
    if result.metadata.total_tracks > 0 {
        println!(
            "Analyzed {}/{} tracks",
            result.metadata.tracks_analyzed, result.metadata.total_tracks
        );
    }

    println!("\nAudio Features");
    for feature in &insights.features {
        let value = match feature.feature {
            AudioFeature::Tempo => format!("{} BPM", feature.raw.round()),
            _ => format!("{}%", feature.percent.round()),
        };
        println!(
            "  {:<14} [{}] {}",
            feature.feature.label(),
            bar(feature.percent, 20),
            value
        );
    }

    println!("\nMusic Taste Insights");
    println!(
        "  🌈 Diversity Score: {}% ({})",
        insights.diversity.score_percent,
        insights.diversity.tier.label()
    );
    println!("     {}", insights.diversity.tier.description());
    println!("  🎭 Mood Profile: {}", insights.mood.mood.label());
    println!("     {}", insights.mood.energy_level.description());
    println!("  🎧 Listening Style: {}", insights.listening.style.label());
    println!("     {}", insights.listening.vocal_description());
    println!("  📈 Popularity Trend: {}", insights.popularity.label());
    println!("     {}", insights.popularity.description());

    if !result.narrative_report.is_empty() {
        println!("\nAI Vibe Report");
        println!("{}", result.narrative_report);
    }

    if !insights.top_artists.is_empty() {
        println!("\nTop Artists");
        for (i, artist) in insights.top_artists.iter().enumerate() {
            println!(
                "  #{} {:<24} [{}] {} tracks",
                i + 1,
                artist.name,
                bar(artist.width_percent, 20),
                artist.count
            );
        }
    }

    println!("\nPlaylist Summary");
    println!(
        "  Explicit: {}% ({})",
        figures.explicit_percent,
        figures.explicit_content.description()
    );
    println!(
        "  Avg track length: {}s",
        figures.avg_seconds_per_track.round()
    );
    println!(
        "  Albums: {} ({})",
        figures.albums_count,
        figures.album_variety.description()
    );
}
