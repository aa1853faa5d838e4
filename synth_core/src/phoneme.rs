//! Character-level phonemization over a fixed symbol alphabet.

/// Acoustic unit symbol. `Sp` marks silence and doubles as the fallback for
/// characters without a mapping of their own, so the mapping is total. `Aa`
/// has no character of its own but stays renderable for callers that feed
/// symbol sequences directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phoneme {
    Aa,
    Ah,
    B,
    D,
    Eh,
    F,
    G,
    Hh,
    Ih,
    Jh,
    K,
    Ks,
    L,
    M,
    N,
    Ow,
    P,
    R,
    S,
    T,
    Uh,
    V,
    W,
    Y,
    Z,
    Sp,
}

impl Phoneme {
    pub const COUNT: usize = 26;

    /// Every symbol, in embedding-table row order.
    pub const ALL: [Phoneme; Phoneme::COUNT] = [
        Phoneme::Aa,
        Phoneme::Ah,
        Phoneme::B,
        Phoneme::D,
        Phoneme::Eh,
        Phoneme::F,
        Phoneme::G,
        Phoneme::Hh,
        Phoneme::Ih,
        Phoneme::Jh,
        Phoneme::K,
        Phoneme::Ks,
        Phoneme::L,
        Phoneme::M,
        Phoneme::N,
        Phoneme::Ow,
        Phoneme::P,
        Phoneme::R,
        Phoneme::S,
        Phoneme::T,
        Phoneme::Uh,
        Phoneme::V,
        Phoneme::W,
        Phoneme::Y,
        Phoneme::Z,
        Phoneme::Sp,
    ];

    /// Row index into the embedding table.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            Phoneme::Aa => "AA",
            Phoneme::Ah => "AH",
            Phoneme::B => "B",
            Phoneme::D => "D",
            Phoneme::Eh => "EH",
            Phoneme::F => "F",
            Phoneme::G => "G",
            Phoneme::Hh => "HH",
            Phoneme::Ih => "IH",
            Phoneme::Jh => "JH",
            Phoneme::K => "K",
            Phoneme::Ks => "KS",
            Phoneme::L => "L",
            Phoneme::M => "M",
            Phoneme::N => "N",
            Phoneme::Ow => "OW",
            Phoneme::P => "P",
            Phoneme::R => "R",
            Phoneme::S => "S",
            Phoneme::T => "T",
            Phoneme::Uh => "UH",
            Phoneme::V => "V",
            Phoneme::W => "W",
            Phoneme::Y => "Y",
            Phoneme::Z => "Z",
            Phoneme::Sp => "SP",
        }
    }

    /// Character table. Case-folded per character; anything without an entry
    /// becomes silence.
    pub fn from_char(c: char) -> Phoneme {
        match c.to_ascii_lowercase() {
            'a' => Phoneme::Ah,
            'b' => Phoneme::B,
            'c' => Phoneme::K,
            'd' => Phoneme::D,
            'e' => Phoneme::Eh,
            'f' => Phoneme::F,
            'g' => Phoneme::G,
            'h' => Phoneme::Hh,
            'i' => Phoneme::Ih,
            'j' => Phoneme::Jh,
            'k' => Phoneme::K,
            'l' => Phoneme::L,
            'm' => Phoneme::M,
            'n' => Phoneme::N,
            'o' => Phoneme::Ow,
            'p' => Phoneme::P,
            'q' => Phoneme::K,
            'r' => Phoneme::R,
            's' => Phoneme::S,
            't' => Phoneme::T,
            'u' => Phoneme::Uh,
            'v' => Phoneme::V,
            'w' => Phoneme::W,
            'x' => Phoneme::Ks,
            'y' => Phoneme::Y,
            'z' => Phoneme::Z,
            ' ' => Phoneme::Sp,
            _ => Phoneme::Sp,
        }
    }
}

/// One symbol per input character, whitespace included, order preserved.
/// Per-character only: no pronunciation rules, no multi-character graphemes.
pub fn phonemize(text: &str) -> Vec<Phoneme> {
    text.chars().map(Phoneme::from_char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_symbol_per_char() {
        for text in ["hello world", "Grüße", "a b c", "!?.", "日本語"] {
            assert_eq!(phonemize(text).len(), text.chars().count());
        }
    }

    #[test]
    fn known_mappings() {
        assert_eq!(Phoneme::from_char('a'), Phoneme::Ah);
        assert_eq!(Phoneme::from_char('b'), Phoneme::B);
        assert_eq!(Phoneme::from_char('x'), Phoneme::Ks);
        // c, k and q share a symbol
        assert_eq!(Phoneme::from_char('c'), Phoneme::K);
        assert_eq!(Phoneme::from_char('q'), Phoneme::K);
        assert_eq!(Phoneme::from_char(' '), Phoneme::Sp);
    }

    #[test]
    fn case_folds() {
        assert_eq!(phonemize("AbC"), phonemize("abc"));
    }

    #[test]
    fn unmapped_chars_fall_back_to_silence() {
        for c in ['7', '!', 'é', '語', '\n'] {
            assert_eq!(Phoneme::from_char(c), Phoneme::Sp);
        }
    }

    #[test]
    fn indices_match_table_order() {
        for (i, p) in Phoneme::ALL.iter().enumerate() {
            assert_eq!(p.index(), i);
        }
    }

    #[test]
    fn labels_are_unique() {
        let mut labels: Vec<&str> = Phoneme::ALL.iter().map(|p| p.label()).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), Phoneme::COUNT);
    }
}
