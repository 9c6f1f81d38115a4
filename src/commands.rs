/// Command palette entries and autocomplete

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "comments",
    aliases: &["c", "comment"],
    description: "Comments of a movie (:comments <movie>)",
  },
  Command {
    name: "reviews",
    aliases: &["r", "review"],
    description: "Moderate reviews (:reviews [keyword])",
  },
  Command {
    name: "users",
    aliases: &["u", "user"],
    description: "Manage users (:users [keyword])",
  },
  Command {
    name: "profile",
    aliases: &["p", "me"],
    description: "Signed-in user profile",
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit marquee",
  },
];

/// A submitted command line: the command word plus whatever followed it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
  pub name: String,
  pub argument: Option<String>,
}

/// Split `line` into the command word and the trimmed remainder.
pub fn parse(line: &str) -> Invocation {
  let line = line.trim();
  let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
  let rest = rest.trim();
  Invocation {
    name: word.to_lowercase(),
    argument: (!rest.is_empty()).then(|| rest.to_string()),
  }
}

fn rank(cmd: &Command, word: &str) -> Option<u8> {
  if cmd.name == word {
    Some(0)
  } else if cmd.aliases.contains(&word) {
    Some(1)
  } else if cmd.name.starts_with(word) {
    Some(2)
  } else if cmd.aliases.iter().any(|a| a.starts_with(word)) {
    Some(3)
  } else if cmd.name.contains(word) {
    Some(4)
  } else if cmd.aliases.iter().any(|a| a.contains(word)) {
    Some(5)
  } else {
    None
  }
}

/// Autocomplete suggestions for the command word of `input`
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let word = parse(input).name;
  if word.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&'static Command, u8)> = COMMANDS
    .iter()
    .filter_map(|cmd| rank(cmd, &word).map(|r| (cmd, r)))
    .collect();
  matches.sort_by_key(|(_, r)| *r);
  matches.into_iter().map(|(cmd, _)| cmd).collect()
}
