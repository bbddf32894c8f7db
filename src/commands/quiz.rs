use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use super::cards::card_label;
use crate::catalog;
use crate::quiz::{Correctness, QuizCommand, QuizController, QuizSession, QuizSnapshot, QuizUpdate};
use crate::state::AppState;

/// Interactive quiz on stdin/stdout
pub async fn play(state: &AppState, seed: Option<u64>) -> Result<()> {
    let seed = seed.or(state.settings.quiz.seed);
    let rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_os_rng(),
    };
    let session = QuizSession::new(catalog::all_letters(), rng).context("Cannot start quiz")?;

    let (command_tx, command_rx) = mpsc::channel(8);
    let (update_tx, mut update_rx) = mpsc::unbounded_channel();
    let controller = QuizController::new(
        session,
        state.speech.clone(),
        state.settings.quiz.timing(),
        update_tx,
    );

    println!("\n  Fun Quiz Time!\n  Listen and find the letter\n");
    println!("  Type 1, 2 or 3 to answer, r to hear again, q to quit.\n");

    let colored = state.settings.general.colored_cards;
    let screen = tokio::spawn(async move {
        while let Some(update) = update_rx.recv().await {
            println!("{}", render(&update, colored));
        }
    });
    let input = tokio::spawn(read_commands(command_tx));

    let summary = controller.run(command_rx).await;
    input.abort();
    let _ = screen.await;

    println!("\n  Final score: {} / {}\n", summary.score, summary.total);
    Ok(())
}

async fn read_commands(commands: mpsc::Sender<QuizCommand>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("Failed to read input: {}", e);
                break;
            }
        };
        let Some(command) = parse_command(&line) else {
            continue;
        };
        let quit = command == QuizCommand::Quit;
        if commands.send(command).await.is_err() || quit {
            break;
        }
    }
}

pub fn parse_command(line: &str) -> Option<QuizCommand> {
    match line.trim().to_ascii_lowercase().as_str() {
        "" => None,
        "r" | "replay" => Some(QuizCommand::Replay),
        "q" | "quit" | "exit" => Some(QuizCommand::Quit),
        other => match other.parse::<usize>() {
            Ok(n @ 1..=3) => Some(QuizCommand::Answer(n - 1)),
            _ => None,
        },
    }
}

fn render(update: &QuizUpdate, colored: bool) -> String {
    match update {
        QuizUpdate::RoundStarted { snapshot } => render_round(snapshot, colored),
        QuizUpdate::Resolved { outcome, snapshot } => {
            let verdict = match snapshot.correctness {
                Correctness::Correct => "Awesome!".to_string(),
                _ => format!(
                    "Keep Trying! It was {} ({})",
                    outcome.target.glyph, outcome.target.transliteration
                ),
            };
            format!("  {}   Score: {}\n", verdict, snapshot.score)
        }
        QuizUpdate::Notice { notice } => format!("  ! {}", notice.message()),
    }
}

fn render_round(snapshot: &QuizSnapshot, colored: bool) -> String {
    let Some(round) = &snapshot.round else {
        return "  Loading...".to_string();
    };
    let options: Vec<String> = round
        .candidates()
        .iter()
        .enumerate()
        .map(|(i, l)| format!("{} {}", i + 1, card_label(l.glyph, l.color, colored)))
        .collect();
    format!(
        "  Score: {}\n  Which letter is this?\n\n  {}\n",
        snapshot.score,
        options.join("    ")
    )
}
