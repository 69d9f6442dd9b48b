/*!
Subject enum for the `list` / `get` verbs.

Variants come in plural/singular pairs:
  commands / command
  categories / category
  tags / tag
  aliases / alias      (routing aliases from configuration)

`list` treats both forms alike; `get` takes a NAME and uses the singular
meaning ("the command X", "commands in category X").
*/

use std::fmt;

#[derive(clap::ValueEnum, Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Subject {
    /// Registered operations
    Commands,
    /// One operation (by name or operation alias)
    Command,
    /// Command categories
    Categories,
    /// Commands in one category
    Category,
    /// Command tags
    Tags,
    /// Commands carrying one tag
    Tag,
    /// Routing aliases
    Aliases,
    /// One routing alias and its expansion
    Alias,
}

impl Subject {
    /// Plural form of this subject.
    pub fn plural(self) -> Subject {
        match self {
            Subject::Commands | Subject::Command => Subject::Commands,
            Subject::Categories | Subject::Category => Subject::Categories,
            Subject::Tags | Subject::Tag => Subject::Tags,
            Subject::Aliases | Subject::Alias => Subject::Aliases,
        }
    }

    /// Singular form of this subject.
    pub fn singular(self) -> Subject {
        match self {
            Subject::Commands | Subject::Command => Subject::Command,
            Subject::Categories | Subject::Category => Subject::Category,
            Subject::Tags | Subject::Tag => Subject::Tag,
            Subject::Aliases | Subject::Alias => Subject::Alias,
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Subject::Commands => "commands",
            Subject::Command => "command",
            Subject::Categories => "categories",
            Subject::Category => "category",
            Subject::Tags => "tags",
            Subject::Tag => "tag",
            Subject::Aliases => "aliases",
            Subject::Alias => "alias",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::Subject;
    use clap::ValueEnum;

    fn parse(s: &str) -> Option<Subject> {
        Subject::from_str(s, true).ok()
    }

    #[test]
    fn parse_case_insensitive() {
        assert_eq!(parse("COMMANDS"), Some(Subject::Commands));
        assert_eq!(parse("Alias"), Some(Subject::Alias));
        assert_eq!(parse("tools"), None);
    }

    #[test]
    fn plural_singular_pairs() {
        assert_eq!(Subject::Tag.plural(), Subject::Tags);
        assert_eq!(Subject::Categories.singular(), Subject::Category);
        assert_eq!(Subject::Aliases.plural(), Subject::Aliases);
    }

    #[test]
    fn display_round_trips() {
        for s in [
            Subject::Commands,
            Subject::Command,
            Subject::Categories,
            Subject::Category,
            Subject::Tags,
            Subject::Tag,
            Subject::Aliases,
            Subject::Alias,
        ] {
            assert_eq!(parse(&s.to_string()), Some(s));
        }
    }
}
