pub mod cards;
pub mod diagnostics;
pub mod quiz;
pub mod settings;

use std::path::PathBuf;
use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::persistence;
use crate::state::AppState;

#[derive(Debug, Parser)]
#[command(name = "tamil-thulir")]
#[command(about = "Learn Tamil letters with speaking cards and a listening quiz")]
#[command(version)]
pub struct Cli {
    /// Gemini API key (API_KEY is also accepted)
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// Settings file to use instead of the default location
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug logging unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Welcome screen
    Home,
    /// Uyir ezhuthukkal cards
    Vowels,
    /// Mei ezhuthukkal cards
    Consonants,
    /// Sample word cards
    Words,
    /// Speak a letter, a word, or any text
    Say {
        text: String,
        /// Write the audio to a WAV file instead of playing it
        #[arg(long)]
        wav: Option<PathBuf>,
    },
    /// Listen and pick the right letter
    Quiz {
        /// Fixed seed for reproducible rounds
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Speak every card and report which ones fail
    Diagnostics,
    /// Show or change stored settings
    Settings {
        #[command(subcommand)]
        action: Option<settings::SettingsAction>,
    },
}

pub async fn dispatch(cli: Cli) -> Result<()> {
    let settings_path = match cli.config {
        Some(path) => path,
        None => persistence::settings_path()?,
    };
    let settings = persistence::load_settings(&settings_path);
    let api_key = cli
        .api_key
        .or_else(|| std::env::var("API_KEY").ok())
        .filter(|k| !k.trim().is_empty());

    match cli.command.unwrap_or(Command::Home) {
        Command::Home => {
            cards::print_home();
            Ok(())
        }
        Command::Vowels => {
            cards::print_letters(cards::Deck::Vowels, settings.general.colored_cards);
            Ok(())
        }
        Command::Consonants => {
            cards::print_letters(cards::Deck::Consonants, settings.general.colored_cards);
            Ok(())
        }
        Command::Words => {
            cards::print_words(settings.general.colored_cards);
            Ok(())
        }
        Command::Say { text, wav } => {
            let state = AppState::new(settings, api_key);
            cards::say(&state, &text, wav.as_deref()).await
        }
        Command::Quiz { seed } => {
            let state = AppState::new(settings, api_key);
            quiz::play(&state, seed).await
        }
        Command::Diagnostics => {
            let state = AppState::new(settings, api_key);
            diagnostics::run(&state).await
        }
        Command::Settings { action } => settings::handle(&settings_path, settings, action),
    }
}
