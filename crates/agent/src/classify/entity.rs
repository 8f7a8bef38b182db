//! Named-entity chunking without an external NLP model.
//!
//! Three stages, mirroring a classic tokenize → tag → chunk pipeline:
//!
//! 1. **Tokenize**: split on whitespace, peel leading/trailing punctuation
//!    into their own tokens, and split clitic endings off (`module's` is
//!    `module` + `'s`, `don't` is `do` + `n't`). Other internal punctuation
//!    survives (`CI/CD`).
//! 2. **Tag**: a small deterministic heuristic assigns each token a [`Tag`].
//! 3. **Chunk**: runs of `ProperNoun`/`Acronym` tokens become one entity
//!    phrase, joined with single spaces.
//!
//! The output is deduplicated and keeps first-seen order.

/// Part-of-speech style tag for one token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    /// Capitalised mid-sentence, or mixed case (`GraphQL`, `APIs`)
    ProperNoun,
    /// Two or more letters, all uppercase (`REST`, `CI/CD`)
    Acronym,
    Number,
    Punct,
    Word,
}

impl Tag {
    fn is_entity(self) -> bool {
        matches!(self, Tag::ProperNoun | Tag::Acronym)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub tag: Tag,
}

/// Contraction and possessive endings that become tokens of their own.
const CLITICS: [&str; 7] = ["n't", "'s", "'re", "'ll", "'ve", "'d", "'m"];

fn is_clitic(token: &str) -> bool {
    CLITICS.iter().any(|c| token.eq_ignore_ascii_case(c))
}

/// Split a trailing clitic off `word`, if it has one and a stem before it.
fn split_clitic(word: &str) -> (&str, Option<&str>) {
    let lower = word.to_ascii_lowercase();
    for clitic in CLITICS {
        if lower.len() > clitic.len() && lower.ends_with(clitic) {
            let at = word.len() - clitic.len();
            if word.is_char_boundary(at) {
                return (&word[..at], Some(&word[at..]));
            }
        }
    }
    (word, None)
}

/// Split text into word and punctuation tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();

    for word in text.split_whitespace() {
        let start = word.find(char::is_alphanumeric);
        let end = word
            .char_indices()
            .rev()
            .find(|(_, c)| c.is_alphanumeric())
            .map(|(i, c)| i + c.len_utf8());

        let (Some(start), Some(end)) = (start, end) else {
            tokens.push(word.to_string());
            continue;
        };

        if start > 0 {
            tokens.push(word[..start].to_string());
        }
        let (stem, clitic) = split_clitic(&word[start..end]);
        tokens.push(stem.to_string());
        if let Some(clitic) = clitic {
            tokens.push(clitic.to_string());
        }
        if end < word.len() {
            tokens.push(word[end..].to_string());
        }
    }

    tokens
}

/// Tag a token sequence.
///
/// A capitalised token at the start of a sentence is ambiguous ("We" vs
/// "Kubernetes"); it only counts as a proper noun when the token after it
/// is itself an entity token ("New York").
pub fn tag(tokens: Vec<String>) -> Vec<Token> {
    let mut tagged = Vec::with_capacity(tokens.len());
    let mut ambiguous = Vec::new();

    for (i, text) in tokens.into_iter().enumerate() {
        let sentence_start = i == 0
            || matches!(
                tagged.last(),
                Some(Token { tag: Tag::Punct, text: prev }) if prev.ends_with(['.', '!', '?'])
            );

        let (tag, needs_lookahead) = base_tag(&text, sentence_start);
        if needs_lookahead {
            ambiguous.push(i);
        }
        tagged.push(Token { text, tag });
    }

    for i in ambiguous {
        if tagged.get(i + 1).is_some_and(|next| next.tag.is_entity()) {
            tagged[i].tag = Tag::ProperNoun;
        }
    }

    tagged
}

fn base_tag(text: &str, sentence_start: bool) -> (Tag, bool) {
    let mut chars = text.chars();
    let Some(first) = chars.next() else {
        return (Tag::Punct, false);
    };

    if !text.chars().any(char::is_alphanumeric) {
        return (Tag::Punct, false);
    }
    if first.is_ascii_digit() {
        return (Tag::Number, false);
    }
    if is_clitic(text) {
        return (Tag::Word, false);
    }

    let letters: Vec<char> = text.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.len() >= 2 && letters.iter().all(|c| c.is_uppercase()) {
        return (Tag::Acronym, false);
    }
    if chars.any(char::is_uppercase) {
        return (Tag::ProperNoun, false);
    }
    if first.is_uppercase() && letters.len() > 1 {
        if sentence_start {
            return (Tag::Word, true);
        }
        return (Tag::ProperNoun, false);
    }

    (Tag::Word, false)
}

/// Extract entity phrases from raw text.
pub fn extract_entities(text: &str) -> Vec<String> {
    let mut entities: Vec<String> = Vec::new();
    let mut chunk: Vec<String> = Vec::new();

    let mut flush = |chunk: &mut Vec<String>| {
        if chunk.is_empty() {
            return;
        }
        let phrase = chunk.join(" ");
        chunk.clear();
        if !entities.contains(&phrase) {
            entities.push(phrase);
        }
    };

    for token in tag(tokenize(text)) {
        if token.tag.is_entity() {
            chunk.push(token.text);
        } else {
            flush(&mut chunk);
        }
    }
    flush(&mut chunk);

    entities
}
