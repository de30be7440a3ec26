use crate::agent::CommandTable;
use crate::error::DcrpsError;
use crate::process::Pid;

/// What the positional arguments ask for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation<'a> {
    List,
    Tree,
    Help,
    Info(Pid),
    /// Neither a PID nor a command, possibly the exec name of a family process
    Named(&'a str),
    Command {
        name: &'a str,
        target: &'a str,
        params: &'a [String],
    },
}

pub fn parse_invocation<'a>(
    args: &'a [String],
    commands: &CommandTable,
) -> Result<Invocation<'a>, DcrpsError> {
    let Some((first, rest)) = args.split_first() else {
        return Ok(Invocation::List);
    };

    if let Ok(pid) = first.parse::<Pid>() {
        return Ok(Invocation::Info(pid));
    }

    match first.as_str() {
        "help" => Ok(Invocation::Help),
        "tree" => match rest.first() {
            None => Ok(Invocation::Tree),
            Some(extra) => Err(DcrpsError::usage(format!(
                "Unexpected argument {extra:?} after tree, options go before the command."
            ))),
        },
        name if commands.get(name).is_some() => {
            let (target, params) = rest
                .split_first()
                .ok_or_else(|| DcrpsError::usage("Missing PID or address."))?;
            Ok(Invocation::Command {
                name,
                target,
                params,
            })
        }
        name => Ok(Invocation::Named(name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn args(args: &[&str]) -> Vec<String> {
        args.iter().map(|a| a.to_string()).collect()
    }

    #[rstest]
    #[case(&[] as &[&str], Invocation::List)]
    #[case(&["4242"], Invocation::Info(4242))]
    #[case(&["4242", "ignored"], Invocation::Info(4242))]
    #[case(&["help"], Invocation::Help)]
    #[case(&["tree"], Invocation::Tree)]
    #[case(&["dcrd"], Invocation::Named("dcrd"))]
    #[case(&["-1"], Invocation::Named("-1"))]
    fn test_modes(#[case] input: &[&str], #[case] expected: Invocation) {
        let input = args(input);
        let table = CommandTable::default();
        assert_eq!(parse_invocation(&input, &table).unwrap(), expected);
    }

    #[test]
    fn test_command_with_params() {
        let input = args(&["setgc", "dcrd", "50", "extra"]);
        let table = CommandTable::default();

        let invocation = parse_invocation(&input, &table).unwrap();
        assert_eq!(
            invocation,
            Invocation::Command {
                name: "setgc",
                target: "dcrd",
                params: &input[2..],
            }
        );
    }

    #[rstest]
    #[case(&["tree", "--prefix", "btc"], "\"--prefix\"")]
    #[case(&["tree", "dcrd"], "\"dcrd\"")]
    fn test_tree_rejects_trailing_arguments(#[case] input: &[&str], #[case] extra: &str) {
        let input = args(input);
        let table = CommandTable::default();

        let err = parse_invocation(&input, &table).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("Unexpected argument {extra} after tree, options go before the command.")
        );
    }

    #[test]
    fn test_command_without_target() {
        let input = args(&["stack"]);
        let table = CommandTable::default();

        let err = parse_invocation(&input, &table).unwrap_err();
        assert!(matches!(err, DcrpsError::Usage(ref message) if message == "Missing PID or address."));
    }
}
