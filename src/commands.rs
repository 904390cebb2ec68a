/// Available commands and autocomplete logic for the `:` palette.

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "dashboard",
    aliases: &["d", "dash", "home"],
    description: "Shop overview and recent orders",
  },
  Command {
    name: "products",
    aliases: &["p", "prod", "product"],
    description: "Product catalog",
  },
  Command {
    name: "categories",
    aliases: &["c", "cat", "category"],
    description: "Product categories",
  },
  Command {
    name: "orders",
    aliases: &["o", "ord", "order"],
    description: "Customer orders",
  },
  Command {
    name: "users",
    aliases: &["u", "user"],
    description: "User accounts",
  },
  Command {
    name: "keys",
    aliases: &["k", "apikeys", "api-keys"],
    description: "API keys",
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit barista",
  },
];

/// How well a command matches the typed input. Lower ranks first.
fn match_rank(cmd: &Command, input: &str) -> Option<u32> {
  if cmd.name == input {
    return Some(0);
  }
  if cmd.aliases.contains(&input) {
    return Some(1);
  }
  if cmd.name.starts_with(input) {
    return Some(2);
  }
  if cmd.aliases.iter().any(|a| a.starts_with(input)) {
    return Some(3);
  }
  if cmd.name.contains(input) {
    return Some(4);
  }
  None
}

/// Get autocomplete suggestions for a given input
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input = input.trim().to_lowercase();

  if input.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = COMMANDS
    .iter()
    .filter_map(|cmd| match_rank(cmd, &input).map(|rank| (cmd, rank)))
    .collect();

  matches.sort_by_key(|(_, rank)| *rank);
  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_input_returns_all() {
    let suggestions = get_suggestions("");
    assert_eq!(suggestions.len(), COMMANDS.len());
  }

  #[test]
  fn test_exact_match_ranks_first() {
    let suggestions = get_suggestions("orders");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "orders");
  }

  #[test]
  fn test_alias_match() {
    let suggestions = get_suggestions("p");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "products");
  }

  #[test]
  fn test_prefix_match() {
    let suggestions = get_suggestions("cat");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "categories");
  }

  #[test]
  fn test_unknown_input_matches_nothing() {
    assert!(get_suggestions("zzz").is_empty());
  }
}
