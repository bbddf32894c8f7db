use serde::Serialize;

/// Display color of a card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CardColor {
    Red,
    Orange,
    Amber,
    Yellow,
    Lime,
    Green,
    Emerald,
    Teal,
    Cyan,
    Sky,
    Blue,
    Indigo,
    Violet,
    Purple,
    Fuchsia,
    Pink,
    Rose,
}

impl CardColor {
    /// Closest xterm-256 background color
    pub fn ansi_256(self) -> u8 {
        match self {
            Self::Red => 203,
            Self::Orange => 209,
            Self::Amber => 214,
            Self::Yellow => 221,
            Self::Lime => 149,
            Self::Green => 78,
            Self::Emerald => 42,
            Self::Teal => 37,
            Self::Cyan => 44,
            Self::Sky => 75,
            Self::Blue => 69,
            Self::Indigo => 99,
            Self::Violet => 141,
            Self::Purple => 135,
            Self::Fuchsia => 170,
            Self::Pink => 211,
            Self::Rose => 204,
        }
    }
}

/// A single Tamil letter card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Letter {
    pub glyph: &'static str,
    pub transliteration: &'static str,
    pub color: CardColor,
}

/// A sample word card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SampleWord {
    pub word: &'static str,
    pub transliteration: &'static str,
    pub meaning: &'static str,
    pub color: CardColor,
}

const fn letter(glyph: &'static str, transliteration: &'static str, color: CardColor) -> Letter {
    Letter { glyph, transliteration, color }
}

const fn sample(
    word: &'static str,
    transliteration: &'static str,
    meaning: &'static str,
    color: CardColor,
) -> SampleWord {
    SampleWord { word, transliteration, meaning, color }
}

/// Uyir ezhuthukkal
pub static VOWELS: [Letter; 13] = [
    letter("அ", "a", CardColor::Red),
    letter("ஆ", "aa", CardColor::Orange),
    letter("இ", "i", CardColor::Amber),
    letter("ஈ", "ee", CardColor::Yellow),
    letter("உ", "u", CardColor::Lime),
    letter("ஊ", "uu", CardColor::Green),
    letter("எ", "e", CardColor::Emerald),
    letter("ஏ", "ae", CardColor::Teal),
    letter("ஐ", "ai", CardColor::Cyan),
    letter("ஒ", "o", CardColor::Sky),
    letter("ஓ", "oo", CardColor::Blue),
    letter("ஔ", "au", CardColor::Indigo),
    letter("ஃ", "ak", CardColor::Violet),
];

/// Mei ezhuthukkal, in their base "-a" form
pub static CONSONANTS: [Letter; 18] = [
    letter("க", "ka", CardColor::Rose),
    letter("ங", "nga", CardColor::Pink),
    letter("ச", "cha", CardColor::Fuchsia),
    letter("ஞ", "nja", CardColor::Purple),
    letter("ட", "ta", CardColor::Violet),
    letter("ண", "nna", CardColor::Indigo),
    letter("த", "tha", CardColor::Blue),
    letter("ந", "na", CardColor::Sky),
    letter("ப", "pa", CardColor::Cyan),
    letter("ம", "ma", CardColor::Teal),
    letter("ய", "ya", CardColor::Emerald),
    letter("ர", "ra", CardColor::Green),
    letter("ல", "la", CardColor::Lime),
    letter("வ", "va", CardColor::Yellow),
    letter("ழ", "zha", CardColor::Amber),
    letter("ள", "lla", CardColor::Orange),
    letter("ற", "rra", CardColor::Red),
    letter("ன", "nna", CardColor::Rose),
];

pub static SAMPLE_WORDS: [SampleWord; 16] = [
    sample("அம்மா", "Amma", "Mother", CardColor::Red),
    sample("ஆடு", "Aadu", "Goat", CardColor::Orange),
    sample("இலை", "Ilai", "Leaf", CardColor::Yellow),
    sample("ஈ", "Ee", "Fly", CardColor::Lime),
    sample("உரல்", "Ural", "Mortar", CardColor::Green),
    sample("ஊசி", "Oosi", "Needle", CardColor::Teal),
    sample("எலி", "Eli", "Rat", CardColor::Cyan),
    sample("ஏணி", "Eni", "Ladder", CardColor::Sky),
    sample("ஐவர்", "Ivar", "Five People", CardColor::Blue),
    sample("ஒட்டகம்", "Ottagam", "Camel", CardColor::Indigo),
    sample("ஓடம்", "Odam", "Boat", CardColor::Violet),
    sample("ஔவை", "Avvai", "Poet", CardColor::Fuchsia),
    sample("கண்", "Kan", "Eye", CardColor::Pink),
    sample("பந்து", "Pandhu", "Ball", CardColor::Rose),
    sample("மரம்", "Maram", "Tree", CardColor::Emerald),
    sample("வானம்", "Vaanam", "Sky", CardColor::Sky),
];

/// Vowels followed by consonants; the pool quiz rounds draw from
pub fn all_letters() -> Vec<Letter> {
    VOWELS.iter().chain(CONSONANTS.iter()).copied().collect()
}

pub fn find_letter(glyph: &str) -> Option<Letter> {
    VOWELS
        .iter()
        .chain(CONSONANTS.iter())
        .find(|l| l.glyph == glyph)
        .copied()
}

pub fn find_sample(word: &str) -> Option<SampleWord> {
    SAMPLE_WORDS.iter().find(|s| s.word == word).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn quiz_pool_has_enough_distinct_letters() {
        let glyphs: HashSet<&str> = all_letters().iter().map(|l| l.glyph).collect();
        assert!(glyphs.len() >= 3);
        assert_eq!(glyphs.len(), VOWELS.len() + CONSONANTS.len());
    }

    #[test]
    fn lookup_by_glyph() {
        assert_eq!(find_letter("ழ").map(|l| l.transliteration), Some("zha"));
        assert_eq!(find_sample("மரம்").map(|s| s.meaning), Some("Tree"));
        assert!(find_letter("x").is_none());
    }

    #[test]
    fn letters_are_single_characters() {
        for l in all_letters() {
            assert_eq!(l.glyph.chars().count(), 1, "{} is not a single code point", l.glyph);
        }
    }
}
