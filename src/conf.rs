//! Reader for Delphes-style detector cards.
//!
//! Cards are written in a small subset of Tcl. Only the commands that carry
//! parameters are understood:
//!
//! ```text
//! module TreeWriter TreeWriter {
//!   add Branch TrackMerger/tracks Track Track
//!   add Branch Calorimeter/towers Tower Tower
//! }
//! module ParticlePropagator ParticlePropagator {
//!   set Radius 1.29
//!   set Bz 3.8
//! }
//! ```
//!
//! Parameters declared inside a module are addressed as `<Module>::<Key>`
//! (e.g. `TreeWriter::Branch`). `set` replaces a parameter, `add` appends to
//! it. Brace groups are flattened into their words. Any other command
//! (`source`, `for`, `foreach`, ...) is skipped.

use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

/// Errors raised while reading a card.
#[derive(Debug, Error)]
pub enum ConfError {
    #[error("failed to read card {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("'{{' opened on line {line} is never closed")]
    UnclosedBrace { line: usize },
    #[error("unexpected '}}' on line {line}")]
    UnexpectedBrace { line: usize },
    #[error("unterminated string on line {line}")]
    UnterminatedString { line: usize },
    #[error("module declaration on line {line} needs a type, a name and a body")]
    MalformedModule { line: usize },
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Open,
    Close,
    EndOfCommand,
}

#[derive(Debug, Clone)]
struct Spanned {
    token: Token,
    line: usize,
}

/// One argument of a command: a bare word or a `{...}` group.
#[derive(Debug, Clone)]
enum Item {
    Word(String),
    Group(Vec<Spanned>),
}

#[derive(Debug)]
struct Command {
    line: usize,
    items: Vec<Item>,
}

fn token_regex() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| {
        Regex::new(r#"#[^\n]*|\n|;|\{|\}|"[^"\n]*"?|[^\s{}";]+"#).expect("token pattern is valid")
    })
}

fn tokenize(text: &str) -> Result<Vec<Spanned>, ConfError> {
    let mut tokens = Vec::new();
    let mut line = 1;

    for m in token_regex().find_iter(text) {
        let s = m.as_str();
        let token = match s {
            "\n" => {
                tokens.push(Spanned { token: Token::EndOfCommand, line });
                line += 1;
                continue;
            }
            ";" => Token::EndOfCommand,
            "{" => Token::Open,
            "}" => Token::Close,
            _ if s.starts_with('#') => continue,
            _ if s.starts_with('"') => {
                if s.len() < 2 || !s.ends_with('"') {
                    return Err(ConfError::UnterminatedString { line });
                }
                Token::Word(s[1..s.len() - 1].to_string())
            }
            _ => Token::Word(s.to_string()),
        };
        tokens.push(Spanned { token, line });
    }

    Ok(tokens)
}

fn parse_commands(tokens: &[Spanned]) -> Result<Vec<Command>, ConfError> {
    let mut commands = Vec::new();
    let mut current: Option<Command> = None;
    let mut i = 0;

    while i < tokens.len() {
        let Spanned { token, line } = &tokens[i];
        match token {
            Token::EndOfCommand => {
                if let Some(cmd) = current.take() {
                    commands.push(cmd);
                }
            }
            Token::Close => return Err(ConfError::UnexpectedBrace { line: *line }),
            Token::Word(word) => {
                current
                    .get_or_insert_with(|| Command { line: *line, items: Vec::new() })
                    .items
                    .push(Item::Word(word.clone()));
            }
            Token::Open => {
                let close = matching_brace(tokens, i)?;
                current
                    .get_or_insert_with(|| Command { line: *line, items: Vec::new() })
                    .items
                    .push(Item::Group(tokens[i + 1..close].to_vec()));
                i = close;
            }
        }
        i += 1;
    }

    if let Some(cmd) = current {
        commands.push(cmd);
    }
    Ok(commands)
}

fn matching_brace(tokens: &[Spanned], open: usize) -> Result<usize, ConfError> {
    let mut depth = 0usize;
    for (offset, spanned) in tokens[open..].iter().enumerate() {
        match spanned.token {
            Token::Open => depth += 1,
            Token::Close => {
                depth -= 1;
                if depth == 0 {
                    return Ok(open + offset);
                }
            }
            _ => {}
        }
    }
    Err(ConfError::UnclosedBrace { line: tokens[open].line })
}

fn flatten(items: &[Item], out: &mut Vec<String>) {
    for item in items {
        match item {
            Item::Word(w) => out.push(w.clone()),
            Item::Group(group) => out.extend(group.iter().filter_map(|s| match &s.token {
                Token::Word(w) => Some(w.clone()),
                _ => None,
            })),
        }
    }
}

/// Parameters read from a card, keyed by `<Module>::<Key>` (or `<Key>` at top level).
#[derive(Debug, Clone, Default)]
pub struct ConfReader {
    params: HashMap<String, Vec<String>>,
}

impl ConfReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse card text.
    pub fn parse_str(text: &str) -> Result<Self, ConfError> {
        let mut reader = Self::new();
        reader.read_str(text)?;
        Ok(reader)
    }

    /// Read a card from disk.
    pub fn read_file(path: impl AsRef<Path>) -> Result<Self, ConfError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfError::Io {
            path: path.display().to_string(),
            source,
        })?;
        log::info!("Reading card {}", path.display());
        Self::parse_str(&text)
    }

    /// Merge the parameters of `text` into this reader.
    pub fn read_str(&mut self, text: &str) -> Result<(), ConfError> {
        let tokens = tokenize(text)?;
        let commands = parse_commands(&tokens)?;
        self.evaluate(&commands, None)
    }

    fn evaluate(&mut self, commands: &[Command], module: Option<&str>) -> Result<(), ConfError> {
        for cmd in commands {
            let Some(Item::Word(name)) = cmd.items.first() else {
                continue;
            };

            match name.as_str() {
                "module" => {
                    let (Some(Item::Word(_kind)), Some(Item::Word(instance)), Some(Item::Group(body))) =
                        (cmd.items.get(1), cmd.items.get(2), cmd.items.last())
                    else {
                        return Err(ConfError::MalformedModule { line: cmd.line });
                    };
                    let body = parse_commands(body)?;
                    self.evaluate(&body, Some(instance.as_str()))?;
                }
                "set" | "add" => {
                    let Some(Item::Word(key)) = cmd.items.get(1) else {
                        log::warn!("'{}' without a parameter name on line {}", name, cmd.line);
                        continue;
                    };
                    let key = match module {
                        Some(m) => format!("{}::{}", m, key),
                        None => key.clone(),
                    };
                    let mut values = Vec::new();
                    flatten(&cmd.items[2..], &mut values);
                    if name == "set" {
                        self.params.insert(key, values);
                    } else {
                        self.params.entry(key).or_default().extend(values);
                    }
                }
                other => {
                    log::debug!("Skipping unsupported card command '{}' on line {}", other, cmd.line);
                }
            }
        }
        Ok(())
    }

    /// Whether the parameter was declared.
    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    /// All words of a parameter, empty if undeclared.
    pub fn get_strings(&self, key: &str) -> &[String] {
        self.params.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First word of a parameter.
    pub fn get_string(&self, key: &str, default: &str) -> String {
        self.get_strings(key)
            .first()
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }

    /// Numeric parameter. Unparseable values fall back to `default`.
    pub fn get_f64(&self, key: &str, default: f64) -> f64 {
        match self.get_strings(key).first() {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                log::warn!("Parameter {} = '{}' is not a number, using {}", key, raw, default);
                default
            }),
            None => default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CARD: &str = r#"
# Delphes card excerpt
set ExecutionPath {
  ParticlePropagator
  TreeWriter
}

module ParticlePropagator ParticlePropagator {
  set InputArray Delphes/stableParticles
  set Radius 1.29
  set HalfLength 3.00
  set Bz 3.8
}

module TreeWriter TreeWriter {
  add Branch Delphes/allParticles Particle GenParticle
  add Branch TrackMerger/tracks Track Track
  add Branch "Calorimeter/towers" Tower Tower
}
"#;

    #[test]
    fn test_module_params_are_prefixed() {
        let conf = ConfReader::parse_str(CARD).unwrap();
        assert_eq!(conf.get_f64("ParticlePropagator::Radius", 0.0), 1.29);
        assert_eq!(conf.get_f64("ParticlePropagator::Bz", 0.0), 3.8);
        assert_eq!(
            conf.get_string("ParticlePropagator::InputArray", ""),
            "Delphes/stableParticles"
        );
        assert!(!conf.contains("Radius"));
    }

    #[test]
    fn test_add_appends_in_order() {
        let conf = ConfReader::parse_str(CARD).unwrap();
        let branch = conf.get_strings("TreeWriter::Branch");
        assert_eq!(branch.len(), 9);
        assert_eq!(branch[3], "TrackMerger/tracks");
        assert_eq!(branch[6], "Calorimeter/towers");
        assert_eq!(branch[8], "Tower");
    }

    #[test]
    fn test_set_flattens_groups_and_replaces() {
        let mut conf = ConfReader::parse_str(CARD).unwrap();
        assert_eq!(conf.get_strings("ExecutionPath"), ["ParticlePropagator", "TreeWriter"]);

        conf.read_str("set ExecutionPath {TreeWriter}").unwrap();
        assert_eq!(conf.get_strings("ExecutionPath"), ["TreeWriter"]);
    }

    #[test]
    fn test_defaults_and_bad_numbers() {
        let conf = ConfReader::parse_str("set Bz fast").unwrap();
        assert_eq!(conf.get_f64("Bz", 2.0), 2.0);
        assert_eq!(conf.get_f64("Missing", 1.5), 1.5);
        assert!(conf.get_strings("Missing").is_empty());
    }

    #[test]
    fn test_unsupported_commands_are_skipped() {
        let conf = ConfReader::parse_str(
            "source other.tcl\nforeach eta {0.1 0.2} { add EtaBins $eta }\nset Radius 2.0",
        )
        .unwrap();
        assert_eq!(conf.get_f64("Radius", 0.0), 2.0);
        assert!(!conf.contains("EtaBins"));
    }

    #[test]
    fn test_syntax_errors() {
        assert!(matches!(
            ConfReader::parse_str("module A A {\n set X 1\n"),
            Err(ConfError::UnclosedBrace { line: 1 })
        ));
        assert!(matches!(
            ConfReader::parse_str("set X 1\n}"),
            Err(ConfError::UnexpectedBrace { line: 2 })
        ));
        assert!(matches!(
            ConfReader::parse_str("set X \"open"),
            Err(ConfError::UnterminatedString { line: 1 })
        ));
        assert!(matches!(
            ConfReader::parse_str("module TreeWriter"),
            Err(ConfError::MalformedModule { line: 1 })
        ));
    }
}
