use std::path::Path;
use std::time::Duration;
use anyhow::{Context, Result};

use crate::audio::processing;
use crate::catalog::{self, CardColor, Letter, CONSONANTS, SAMPLE_WORDS, VOWELS};
use crate::speech::SpeechNotice;
use crate::state::AppState;

const CARDS_PER_ROW: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deck {
    Vowels,
    Consonants,
}

pub fn print_home() {
    println!();
    println!("  தமிழ் துளிர்");
    println!("  Tamil Thulir");
    println!();
    println!("  Welcome kids! Let's learn the beautiful Tamil language with fun sounds and colors.");
    println!();
    println!("    vowels       Uyir ezhuthukkal");
    println!("    consonants   Mei ezhuthukkal");
    println!("    words        Learn easy Tamil words");
    println!("    say <card>   Hear a letter or word");
    println!("    quiz         Listen and find the letter");
    println!("    diagnostics  Check every card can speak");
    println!();
}

pub fn print_letters(deck: Deck, colored: bool) {
    let (title, subtitle, letters): (&str, &str, &[Letter]) = match deck {
        Deck::Vowels => ("Uyir Ezhuthukkal", "Say a card to hear the sound!", &VOWELS[..]),
        Deck::Consonants => ("Mei Ezhuthukkal", "Learn Ka, Nga, Cha!", &CONSONANTS[..]),
    };
    println!("\n  {}\n  {}\n", title, subtitle);

    for row in letters.chunks(CARDS_PER_ROW) {
        let line: Vec<String> = row
            .iter()
            .map(|l| card_label(&format!("{}  {}", l.glyph, l.transliteration.to_uppercase()), l.color, colored))
            .collect();
        println!("  {}", line.join("  "));
    }
    println!();
}

pub fn print_words(colored: bool) {
    println!("\n  Vocabulary\n  Learn easy Tamil words!\n");
    for s in SAMPLE_WORDS.iter() {
        let label = format!("{}  {}", s.word, s.transliteration);
        println!("  {}  {}", card_label(&label, s.color, colored), s.meaning);
    }
    println!();
}

/// One card's text, optionally on its background color
pub fn card_label(text: &str, color: CardColor, colored: bool) -> String {
    if colored {
        format!("\x1b[48;5;{}m\x1b[1;97m {} \x1b[0m", color.ansi_256(), text)
    } else {
        format!("[ {} ]", text)
    }
}

/// Cards may be named by their glyph or, for words, by transliteration
pub fn spoken_text(input: &str) -> String {
    let trimmed = input.trim();
    if let Some(letter) = catalog::find_letter(trimmed) {
        return letter.glyph.to_string();
    }
    if let Some(word) = catalog::find_sample(trimmed) {
        return word.word.to_string();
    }
    if let Some(word) = SAMPLE_WORDS
        .iter()
        .find(|s| s.transliteration.eq_ignore_ascii_case(trimmed))
    {
        return word.word.to_string();
    }
    trimmed.to_string()
}

/// Tap on a card
pub async fn say(state: &AppState, input: &str, wav: Option<&Path>) -> Result<()> {
    let text = spoken_text(input);

    if let Some(path) = wav {
        let buffer = state
            .speech
            .render(&text)
            .await
            .with_context(|| format!("Could not synthesize '{}'", text))?;
        if processing::peak_level(&buffer) == 0.0 {
            tracing::warn!("Audio for '{}' is silent", text);
        }
        return processing::write_wav(&buffer, path);
    }

    let mut notices = state.speech.subscribe();
    match state.speech.try_speak(&text).await {
        Ok(report) => {
            // Playback is fire-and-forget; stay alive until it has been heard
            tokio::time::sleep(Duration::from_millis(report.duration_ms + 300)).await;
            Ok(())
        }
        Err(e) => {
            if let Ok(notice) = notices.try_recv() {
                eprintln!("{}", notice.message());
            } else if matches!(e, crate::speech::SpeechError::MissingCredential) {
                eprintln!("{}", SpeechNotice::InvalidCredential.message());
            }
            Err(anyhow::anyhow!(e).context(format!("Could not speak '{}'", text)))
        }
    }
}
