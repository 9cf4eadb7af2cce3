use rand::Rng;

use super::MessageSource;

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Random single-letter ordinary payloads and `S<n>` special payloads, the
/// generator shapes of the reference system.
pub struct LetterSource;

impl MessageSource for LetterSource {
    type Output = String;

    fn next_ordinary(&mut self) -> String {
        let mut rng = rand::thread_rng();
        let letter = LETTERS[rng.gen_range(0..LETTERS.len())] as char;
        letter.to_string()
    }

    fn next_special(&mut self) -> String {
        let mut rng = rand::thread_rng();
        format!("S{}", rng.gen_range(1..=100))
    }
}

/// Deterministic source for seeding and tests: `<prefix>0`, `<prefix>1`, ...
/// for ordinary messages and `S-<prefix>0`, `S-<prefix>1`, ... for specials.
pub struct SequenceSource {
    prefix: String,
    next: usize,
}

impl SequenceSource {
    pub fn new(prefix: &str) -> Self {
        SequenceSource {
            prefix: prefix.to_string(),
            next: 0,
        }
    }

    fn advance(&mut self) -> usize {
        let current = self.next;
        self.next += 1;
        current
    }
}

impl MessageSource for SequenceSource {
    type Output = String;

    fn next_ordinary(&mut self) -> String {
        let n = self.advance();
        format!("{}{}", self.prefix, n)
    }

    fn next_special(&mut self) -> String {
        let n = self.advance();
        format!("S-{}{}", self.prefix, n)
    }
}

#[cfg(test)]
mod sources_tests {
    use super::*;

    #[test]
    fn test_letter_source_produces_single_letters() {
        let mut source = LetterSource;
        for _ in 0..20 {
            let message = source.next_ordinary();
            assert_eq!(message.len(), 1);
            assert!(message.chars().all(|c| c.is_ascii_alphabetic()));
        }
    }

    #[test]
    fn test_letter_source_special_payloads_are_tagged() {
        let mut source = LetterSource;
        for _ in 0..20 {
            let message = source.next_special();
            assert!(message.starts_with('S'));
            let n: u32 = message[1..].parse().unwrap();
            assert!((1..=100).contains(&n));
        }
    }

    #[test]
    fn test_sequence_source_is_deterministic() {
        let mut source = SequenceSource::new("m");
        assert_eq!(source.next_ordinary(), "m0");
        assert_eq!(source.next_ordinary(), "m1");
        assert_eq!(source.next_special(), "S-m2");
    }
}
