//! Region command grammar
//!
//! A region may carry `command` tags whose values are `name` or
//! `name(arg0,arg1,...)`. Unknown command names and malformed strings are
//! ignored; they are authoring mistakes, not runtime errors.

/// A recognized region command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionCommand {
    /// Reset the session (clear shots, reset the protocol)
    Reset,
    /// Play a sound file
    PlaySound(String),
    /// Replay an image region's animation, optionally on a different target
    Animate(Option<String>),
}

impl RegionCommand {
    /// Parse one command string. Returns `None` for unknown or malformed
    /// commands.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();

        let (name, args) = match raw.split_once('(') {
            Some((name, rest)) => {
                let Some(inner) = rest.strip_suffix(')') else {
                    log::debug!("Malformed region command: {}", raw);
                    return None;
                };
                let args: Vec<&str> = if inner.is_empty() {
                    Vec::new()
                } else {
                    inner.split(',').map(str::trim).collect()
                };
                (name.trim(), args)
            }
            None => (raw, Vec::new()),
        };

        match name {
            "reset" => Some(RegionCommand::Reset),
            "play_sound" => {
                let path = args.first()?;
                Some(RegionCommand::PlaySound(path.to_string()))
            }
            "animate" => Some(RegionCommand::Animate(
                args.first().map(|s| s.to_string()),
            )),
            _ => {
                log::debug!("Unknown region command: {}", name);
                None
            }
        }
    }
}
