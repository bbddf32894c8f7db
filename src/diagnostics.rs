use std::fmt;
use std::time::Duration;
use serde::Serialize;

use crate::catalog::{CONSONANTS, SAMPLE_WORDS, VOWELS};
use crate::speech::SpeechPipeline;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    Vowel,
    Consonant,
    Sample,
}

impl fmt::Display for ItemCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Vowel => "VOWEL",
            Self::Consonant => "CONSONANT",
            Self::Sample => "SAMPLE",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Pending,
    Pass,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub id: String,
    pub name: &'static str,
    pub category: ItemCategory,
    pub status: CheckStatus,
    pub error: Option<String>,
}

/// Every card in the app, in display order, waiting to be checked
pub fn plan() -> Vec<CheckResult> {
    let pending = |prefix: &str, name: &'static str, category| CheckResult {
        id: format!("{}-{}", prefix, name),
        name,
        category,
        status: CheckStatus::Pending,
        error: None,
    };

    VOWELS
        .iter()
        .map(|v| pending("v", v.glyph, ItemCategory::Vowel))
        .chain(CONSONANTS.iter().map(|c| pending("c", c.glyph, ItemCategory::Consonant)))
        .chain(SAMPLE_WORDS.iter().map(|s| pending("s", s.word, ItemCategory::Sample)))
        .collect()
}

/// Speak every card once and record which ones produced audio.
///
/// `gap` keeps the run from flooding the TTS quota. `progress` is called
/// after each item with its index and result.
pub async fn run<F>(speech: &SpeechPipeline, gap: Duration, mut progress: F) -> Report
where
    F: FnMut(usize, &CheckResult),
{
    let mut results = plan();
    let count = results.len();

    for (i, item) in results.iter_mut().enumerate() {
        match speech.try_speak(item.name).await {
            Ok(_) => item.status = CheckStatus::Pass,
            Err(e) => {
                tracing::warn!("Health check failed for {} [{}]: {}", item.category, item.name, e);
                item.status = CheckStatus::Fail;
                item.error = Some(e.to_string());
            }
        }
        progress(i, item);

        if i + 1 < count {
            tokio::time::sleep(gap).await;
        }
    }

    Report { results }
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub results: Vec<CheckResult>,
}

impl Report {
    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.status == CheckStatus::Pass).count()
    }

    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| r.status == CheckStatus::Fail).count()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Total: {} | Passed: {} | Failed: {}",
            self.results.len(),
            self.passed(),
            self.failed()
        )?;
        writeln!(f)?;
        for r in &self.results {
            let status = match r.status {
                CheckStatus::Pending => "PENDING",
                CheckStatus::Pass => "PASS",
                CheckStatus::Fail => "FAIL",
            };
            write!(f, "{} [{}]: {}", r.category, r.name, status)?;
            if let Some(err) = &r.error {
                write!(f, " ({})", err)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
