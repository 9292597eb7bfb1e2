use nanoid::nanoid;

/// Canonical alphabet for record identifiers (no ambiguous glyphs).
const RECORD_ID_ALPHABET: &[char] = &[
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K', 'L', 'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y',
    'Z', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'j', 'm', 'n', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];
/// Length of the random part of an identifier.
const RECORD_ID_LENGTH: usize = 16;

/// Table a generated identifier belongs to. The prefix makes ids self-describing in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Field,
    Range,
    ChoiceOption,
    SettingAutocomplete,
}

impl RecordKind {
    pub fn prefix(self) -> &'static str {
        match self {
            RecordKind::Field => "fld",
            RecordKind::Range => "rng",
            RecordKind::ChoiceOption => "opt",
            RecordKind::SettingAutocomplete => "sac",
        }
    }
}

/// Generates a new identifier for a row of the given table.
pub fn generate_record_id(kind: RecordKind) -> String {
    format!("{}_{}", kind.prefix(), nanoid!(RECORD_ID_LENGTH, RECORD_ID_ALPHABET))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_has_prefix_and_expected_charset() {
        let id = generate_record_id(RecordKind::ChoiceOption);
        let (prefix, random) = id.split_once('_').expect("prefixed id");
        assert_eq!(prefix, "opt");
        assert_eq!(random.len(), RECORD_ID_LENGTH);
        assert!(random.chars().all(|c| RECORD_ID_ALPHABET.contains(&c)));
    }

    #[test]
    fn ids_do_not_repeat() {
        let first = generate_record_id(RecordKind::Field);
        let second = generate_record_id(RecordKind::Field);
        assert_ne!(first, second);
    }
}
