#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    Shutdown,
    Status,
    Unknown(String),
}

/// Parses one operator console line. Blank lines yield `None`.
pub fn parse_admin_command(line: &str) -> Option<AdminCommand> {
    let command = line.split_whitespace().next()?.to_ascii_lowercase();
    let parsed = match command.as_str() {
        "shutdown" | "stop" | "quit" => AdminCommand::Shutdown,
        "status" => AdminCommand::Status,
        _ => AdminCommand::Unknown(command),
    };
    Some(parsed)
}
